use crate::error::CriticError;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const DIE_CHAR: char = 'd';

static FORMULA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<multiplier>[^d]*?)\s*d(?P<die>\d+)\s*(?:(?P<operator>[+-])\s*(?P<modifier>.+?))?\s*$")
        .expect("dice formula regex is valid")
});

/// Either a number or a 5e.tools template placeholder such as `{{spellcastingMod}}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Term {
    Fixed(u32),
    Placeholder,
}

impl Term {
    fn parse(text: &str, formula: &str) -> Result<Self, CriticError> {
        if text.contains('{') {
            return Ok(Term::Placeholder);
        }
        text.trim()
            .parse()
            .map(Term::Fixed)
            .map_err(|_| CriticError::Parse(format!("Invalid formula: '{formula}'")))
    }

    fn value(&self) -> u32 {
        match self {
            Term::Fixed(value) => *value,
            Term::Placeholder => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Plus,
    Minus,
}

/// A dice formula like `2d6+3` that can roll itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dice {
    pub multiplier: Option<Term>,
    pub die: u32,
    pub modifier: Option<(Operator, Term)>,
}

impl FromStr for Dice {
    type Err = CriticError;

    fn from_str(formula: &str) -> Result<Self, Self::Err> {
        match formula.matches(DIE_CHAR).count() {
            0 => {
                return Err(CriticError::Parse(format!(
                    "No '{DIE_CHAR}' in dice formula: '{formula}'"
                )))
            }
            1 => {}
            _ => {
                return Err(CriticError::Parse(format!(
                    "More than one '{DIE_CHAR}' in dice formula: '{formula}'"
                )))
            }
        }

        let caps = FORMULA
            .captures(formula)
            .ok_or_else(|| CriticError::Parse(format!("Invalid formula: '{formula}'")))?;

        let multiplier = match caps.name("multiplier").map(|m| m.as_str()) {
            None | Some("") => None,
            Some(text) => Some(Term::parse(text, formula)?),
        };

        let die = caps["die"]
            .parse()
            .map_err(|_| CriticError::Parse(format!("Invalid die in formula: '{formula}'")))?;
        if die == 0 {
            return Err(CriticError::Parse(format!("Zero-sided die in formula: '{formula}'")));
        }

        let modifier = match (caps.name("operator"), caps.name("modifier")) {
            (Some(operator), Some(modifier)) => {
                let operator = if operator.as_str() == "+" {
                    Operator::Plus
                } else {
                    Operator::Minus
                };
                Some((operator, Term::parse(modifier.as_str(), formula)?))
            }
            _ => None,
        };

        Ok(Self {
            multiplier,
            die,
            modifier,
        })
    }
}

impl Dice {
    /// One roll per die. A missing multiplier means a single die, a placeholder means none.
    pub fn roll_results<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<u32> {
        let count = match self.multiplier {
            None => 1,
            Some(term) => term.value(),
        };
        (0..count).map(|_| rng.gen_range(1..=self.die)).collect()
    }

    fn apply_modifier(&self, total: i64) -> i64 {
        match self.modifier {
            Some((Operator::Plus, term)) => total + i64::from(term.value()),
            Some((Operator::Minus, term)) => total - i64::from(term.value()),
            None => total,
        }
    }

    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        let total: i64 = self.roll_results(rng).into_iter().map(i64::from).sum();
        self.apply_modifier(total)
    }

    /// Renders a roll like `9 ([3]+[4] + 2)`.
    pub fn roll_as_text<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let results = self.roll_results(rng);
        let sum: i64 = results.iter().copied().map(i64::from).sum();
        let text_results = results
            .iter()
            .map(|result| format!("[{result}]"))
            .collect::<Vec<_>>()
            .join("+");

        match self.modifier {
            Some((operator, Term::Fixed(value))) => {
                let sign = match operator {
                    Operator::Plus => '+',
                    Operator::Minus => '-',
                };
                format!("{} ({text_results} {sign} {value})", self.apply_modifier(sum))
            }
            _ => format!("{sum} ({text_results})"),
        }
    }

    pub fn formula(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Dice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.multiplier {
            Some(Term::Fixed(value)) => write!(f, "{value}")?,
            Some(Term::Placeholder) => f.write_str("multiplier*")?,
            None => {}
        }
        write!(f, "{DIE_CHAR}{}", self.die)?;
        if let Some((operator, term)) = self.modifier {
            f.write_str(match operator {
                Operator::Plus => "+",
                Operator::Minus => "-",
            })?;
            match term {
                Term::Fixed(value) => write!(f, "{value}")?,
                Term::Placeholder => f.write_str("modifier")?,
            }
        }
        Ok(())
    }
}

impl Serialize for Dice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn parses_common_formulas() {
        assert_eq!(
            "2d6+3".parse::<Dice>().unwrap(),
            Dice {
                multiplier: Some(Term::Fixed(2)),
                die: 6,
                modifier: Some((Operator::Plus, Term::Fixed(3))),
            }
        );
        assert_eq!(
            "d20".parse::<Dice>().unwrap(),
            Dice {
                multiplier: None,
                die: 20,
                modifier: None,
            }
        );
        assert_eq!(
            "1d8 - 1".parse::<Dice>().unwrap().modifier,
            Some((Operator::Minus, Term::Fixed(1)))
        );
    }

    #[test]
    fn placeholders_are_recognised() {
        let dice = "{{spellLevel}}d10".parse::<Dice>().unwrap();
        assert_eq!(dice.multiplier, Some(Term::Placeholder));
        assert_eq!(dice.formula(), "multiplier*d10");

        let dice = "1d6+{{bonus}}".parse::<Dice>().unwrap();
        assert_eq!(dice.modifier, Some((Operator::Plus, Term::Placeholder)));
        assert_eq!(dice.formula(), "1d6+modifier");
    }

    #[test]
    fn rejects_invalid_formulas() {
        for formula in ["", "12", "2d", "2dx", "1d6 + {{spellcastingMod}}", "xd6", "2d0"] {
            assert!(formula.parse::<Dice>().is_err(), "accepted '{formula}'");
        }
    }

    #[test]
    fn rolls_stay_within_die_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let dice: Dice = "3d4+2".parse().unwrap();

        for _ in 0..200 {
            let results = dice.roll_results(&mut rng);
            assert_eq!(results.len(), 3);
            assert!(results.iter().all(|r| (1..=4).contains(r)));

            let total = dice.roll(&mut rng);
            assert!((5..=14).contains(&total));
        }
    }

    #[test]
    fn missing_multiplier_rolls_one_die_and_placeholder_rolls_none() {
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!("d6".parse::<Dice>().unwrap().roll_results(&mut rng).len(), 1);
        assert!("{{n}}d6"
            .parse::<Dice>()
            .unwrap()
            .roll_results(&mut rng)
            .is_empty());
    }

    #[test]
    fn textual_roll_shows_each_die_and_modifier() {
        let dice: Dice = "1d1-2".parse().unwrap();
        assert_eq!(dice.roll_as_text(&mut StdRng::seed_from_u64(3)), "-1 ([1] - 2)");

        let dice: Dice = "2d1".parse().unwrap();
        assert_eq!(dice.roll_as_text(&mut StdRng::seed_from_u64(3)), "2 ([1]+[1])");
    }

    #[test]
    fn serializes_as_formula() {
        let dice: Dice = "2d8+4".parse().unwrap();
        assert_eq!(serde_json::to_string(&dice).unwrap(), "\"2d8+4\"");
    }
}
