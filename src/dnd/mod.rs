//! DnD 5e data imported from 5e.tools JSON exports.

use crate::error::{CriticError, Result};
use serde_json::Value;
use std::path::Path;

pub mod dice;
pub mod race;
pub mod spell;

pub use dice::Dice;
pub use race::parse_races;
pub use spell::parse_spells;

/// Sourcebooks whose content counts as canonical.
pub const BOOKS: [&str; 15] = [
    "PHB", "MM", "DMG", "SCAG", "AL", "VGM", "XGE", "MTF", "GGR", "AI", "ERLW", "RMR", "EGW",
    "MOT", "TCE",
];

pub fn is_canonical(source: &str) -> bool {
    BOOKS.contains(&source)
}

/// Reads a 5e.tools file and returns the top-level array stored under `key`.
pub(crate) fn load_array(path: &Path, key: &str) -> Result<Vec<Value>> {
    let content = std::fs::read_to_string(path)?;
    let mut data: Value = serde_json::from_str(&content)?;

    match data.get_mut(key).map(Value::take) {
        Some(Value::Array(entries)) => Ok(entries),
        Some(_) => Err(CriticError::Parse(format!(
            "'{key}' in {} is not an array",
            path.display()
        ))),
        None => Err(CriticError::Parse(format!(
            "No '{key}' array in {}",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowlist_matches_exact_abbreviations() {
        assert!(is_canonical("PHB"));
        assert!(is_canonical("TCE"));
        assert!(!is_canonical("phb"));
        assert!(!is_canonical("UAArtificer"));
    }

    #[test]
    fn load_array_requires_the_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spells.json");

        std::fs::write(&path, r#"{"spell": [{"name": "Light"}]}"#).unwrap();
        assert_eq!(load_array(&path, "spell").unwrap().len(), 1);
        assert!(matches!(
            load_array(&path, "race"),
            Err(CriticError::Parse(_))
        ));

        std::fs::write(&path, r#"{"spell": {"name": "Light"}}"#).unwrap();
        assert!(matches!(
            load_array(&path, "spell"),
            Err(CriticError::Parse(_))
        ));
    }

    #[test]
    fn missing_or_malformed_files_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");

        assert!(matches!(
            load_array(&path, "spell"),
            Err(CriticError::Io(_))
        ));

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            load_array(&path, "spell"),
            Err(CriticError::Serialization(_))
        ));
    }
}
