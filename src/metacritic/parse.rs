use super::BasicUser;
use crate::error::{CriticError, Result};
use scraper::{ElementRef, Html, Selector};

/// Extracts a typed result from page markup.
pub trait PageParser {
    type Output;

    fn parse(&self, markup: &str) -> Result<Self::Output>;
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| CriticError::Selector(e.to_string()))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Parses counts like `1,234`.
fn parse_count<T: std::str::FromStr>(text: &str, what: &str) -> Result<T> {
    text.replace(',', "")
        .trim()
        .parse()
        .map_err(|_| CriticError::Parse(format!("Invalid {what}: '{text}'")))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewsPage {
    Users(Vec<BasicUser>),
    /// Page index is past the last page of reviews.
    Exhausted,
}

pub struct ReviewSelectors {
    pub review: Selector,
    pub name: Selector,
    pub score: Selector,
}

impl ReviewSelectors {
    pub fn new() -> Result<Self> {
        Ok(Self {
            review: selector(r#"li.user_review[id*="user_review"]"#)?,
            name: selector(r#"a[href*="/user/"]"#)?,
            score: selector("div.metascore_w")?,
        })
    }
}

/// Parses a user reviews page for reviewer names and scores.
pub struct UserReviewsPageParser {
    selectors: ReviewSelectors,
}

impl UserReviewsPageParser {
    pub const SENTINEL: &'static str = "There are no user reviews yet";
    pub const MOVIE_PAGE_SENTINEL: &'static str = "No reviews yet.";

    pub fn new() -> Result<Self> {
        Ok(Self {
            selectors: ReviewSelectors::new()?,
        })
    }

    pub fn is_exhausted(markup: &str) -> bool {
        markup.contains(Self::SENTINEL) || markup.contains(Self::MOVIE_PAGE_SENTINEL)
    }

    fn extract_user(&self, review: ElementRef<'_>) -> Result<BasicUser> {
        let name = review
            .select(&self.selectors.name)
            .next()
            .map(element_text)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| CriticError::Parse("Review without user name".to_string()))?;

        let score_text = review
            .select(&self.selectors.score)
            .next()
            .map(element_text)
            .ok_or_else(|| CriticError::Parse(format!("Review by '{name}' without score")))?;

        let score = parse_count(&score_text, "score")?;
        Ok(BasicUser::new(name, score))
    }
}

impl PageParser for UserReviewsPageParser {
    type Output = ReviewsPage;

    fn parse(&self, markup: &str) -> Result<ReviewsPage> {
        if Self::is_exhausted(markup) {
            return Ok(ReviewsPage::Exhausted);
        }

        let document = Html::parse_document(markup);
        let users = document
            .select(&self.selectors.review)
            .map(|review| self.extract_user(review))
            .collect::<Result<Vec<_>>>()?;

        Ok(ReviewsPage::Users(users))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileCounts {
    pub ratings_count: u32,
    pub reviews_count: u32,
}

/// Parses a user profile page for the total ratings and reviews counts.
pub struct UserPageParser {
    ratings: Selector,
    reviews: Selector,
}

impl UserPageParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            ratings: selector("span.total_summary_ratings span")?,
            reviews: selector("span.total_summary_reviews span")?,
        })
    }

    fn count(document: &Html, selector: &Selector, what: &str) -> Result<u32> {
        let text = document
            .select(selector)
            .next()
            .map(element_text)
            .ok_or_else(|| CriticError::Parse(format!("No {what} on user page")))?;
        parse_count(&text, what)
    }
}

impl PageParser for UserPageParser {
    type Output = ProfileCounts;

    fn parse(&self, markup: &str) -> Result<ProfileCounts> {
        let document = Html::parse_document(markup);

        Ok(ProfileCounts {
            ratings_count: Self::count(&document, &self.ratings, "ratings count")?,
            reviews_count: Self::count(&document, &self.reviews, "reviews count")?,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn extracts_names_and_scores_from_review_items_only() {
        let markup = reviews_page(&[review(1, "Alice", "9"), review(2, "Bob", "3")]);
        let page = UserReviewsPageParser::new().unwrap().parse(&markup).unwrap();

        assert_eq!(
            page,
            ReviewsPage::Users(vec![BasicUser::new("Alice", 9), BasicUser::new("Bob", 3)])
        );
    }

    #[test]
    fn sentinel_marks_exhausted_page() {
        let parser = UserReviewsPageParser::new().unwrap();

        assert_eq!(
            parser.parse(&empty_reviews_page()).unwrap(),
            ReviewsPage::Exhausted
        );
        assert_eq!(
            parser
                .parse("<html><body><p>No reviews yet.</p></body></html>")
                .unwrap(),
            ReviewsPage::Exhausted
        );
    }

    #[test]
    fn item_without_numeric_score_is_an_error() {
        let markup = reviews_page(&[review(1, "Alice", "tbd")]);
        let result = UserReviewsPageParser::new().unwrap().parse(&markup);

        assert!(matches!(result, Err(CriticError::Parse(_))));
    }

    #[test]
    fn page_without_review_items_yields_no_users() {
        let page = UserReviewsPageParser::new()
            .unwrap()
            .parse(&reviews_page(&[]))
            .unwrap();

        assert_eq!(page, ReviewsPage::Users(vec![]));
    }

    #[test]
    fn reads_profile_counts_with_separators() {
        let counts = UserPageParser::new()
            .unwrap()
            .parse(&profile_page("1,024", "17"))
            .unwrap();

        assert_eq!(
            counts,
            ProfileCounts {
                ratings_count: 1024,
                reviews_count: 17
            }
        );
    }

    #[test]
    fn profile_without_counts_is_an_error() {
        let result = UserPageParser::new()
            .unwrap()
            .parse("<html><body><h1>Private profile</h1></body></html>");

        assert!(matches!(result, Err(CriticError::Parse(_))));
    }
}
