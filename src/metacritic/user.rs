use crate::error::CriticError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Weight of a written review relative to a bare rating when deriving credibility.
pub const REVIEW_WEIGHT: u32 = 3;

/// A single user review as scraped from a game's user reviews page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicUser {
    pub name: String,
    pub score: u8,
}

impl BasicUser {
    pub fn new(name: impl Into<String>, score: u8) -> Self {
        Self {
            name: name.into(),
            score,
        }
    }
}

/// A reviewer with the activity counts from their profile page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub score: u8,
    pub ratings_count: u32,
    pub reviews_count: u32,
}

impl User {
    pub fn from_basic(basic: BasicUser, ratings_count: u32, reviews_count: u32) -> Self {
        Self {
            name: basic.name,
            score: basic.score,
            ratings_count,
            reviews_count,
        }
    }

    /// `ln(1 + ratings + REVIEW_WEIGHT * reviews)`; zero for a user with no activity.
    pub fn credibility(&self) -> f64 {
        let reviews = u64::from(REVIEW_WEIGHT) * u64::from(self.reviews_count);
        let activity = u64::from(self.ratings_count) + reviews;
        (1.0 + activity as f64).ln()
    }
}

/// Credibility-weighted mean of user scores.
pub fn weighted_rating(users: &[User]) -> Option<f64> {
    let (weighted_sum, total_weight) = users.iter().fold((0.0, 0.0), |(sum, weight), user| {
        let credibility = user.credibility();
        (sum + credibility * f64::from(user.score), weight + credibility)
    });

    (total_weight > 0.0).then(|| weighted_sum / total_weight)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingSummary {
    pub users: usize,
    pub mean: Option<f64>,
    pub weighted: Option<f64>,
}

pub fn rating_summary(users: &[User]) -> RatingSummary {
    let mean = (!users.is_empty()).then(|| {
        users.iter().map(|user| f64::from(user.score)).sum::<f64>() / users.len() as f64
    });

    RatingSummary {
        users: users.len(),
        mean,
        weighted: weighted_rating(users),
    }
}

impl fmt::Display for RatingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let render = |value: Option<f64>| match value {
            Some(value) => format!("{value:.2}"),
            None => "n/a".to_string(),
        };
        write!(
            f,
            "users: {}, mean score: {}, credibility-weighted score: {}",
            self.users,
            render(self.mean),
            render(self.weighted)
        )
    }
}

impl fmt::Display for BasicUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.name, self.score)
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.name, self.score, self.ratings_count, self.reviews_count
        )
    }
}

fn parse_field<T: FromStr>(field: Option<&str>, what: &str, line: &str) -> Result<T, CriticError> {
    let field = field.ok_or_else(|| CriticError::Parse(format!("Missing {what} in '{line}'")))?;
    field
        .trim()
        .parse()
        .map_err(|_| CriticError::Parse(format!("Invalid {what} '{field}' in '{line}'")))
}

fn parse_name(field: Option<&str>, line: &str) -> Result<String, CriticError> {
    match field {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(CriticError::Parse(format!("Missing name in '{line}'"))),
    }
}

impl FromStr for BasicUser {
    type Err = CriticError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut fields = line.split('\t');
        let name = parse_name(fields.next(), line)?;
        let user = Self::new(name, parse_field(fields.next(), "score", line)?);
        if fields.next().is_some() {
            return Err(CriticError::Parse(format!("Too many fields in '{line}'")));
        }
        Ok(user)
    }
}

impl FromStr for User {
    type Err = CriticError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut fields = line.split('\t');
        let user = Self {
            name: parse_name(fields.next(), line)?,
            score: parse_field(fields.next(), "score", line)?,
            ratings_count: parse_field(fields.next(), "ratings count", line)?,
            reviews_count: parse_field(fields.next(), "reviews count", line)?,
        };
        if fields.next().is_some() {
            return Err(CriticError::Parse(format!("Too many fields in '{line}'")));
        }
        Ok(user)
    }
}
