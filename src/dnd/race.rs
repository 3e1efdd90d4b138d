//! Race spell data from the 5e.tools races file.

use super::{is_canonical, load_array};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BaseRace {
    pub name: String,
    pub source: String,
}

/// A race or subrace that grants spells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaceSpells {
    pub name: String,
    pub source: String,
    pub base_race: Option<BaseRace>,
    pub innate: Option<Value>,
    pub expanded: Option<Value>,
    /// Names of the spells referenced by `innate` and `expanded`.
    pub spells: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRace {
    name: String,
    source: String,
    #[serde(default)]
    additional_spells: Vec<RawAdditionalSpells>,
    #[serde(default)]
    subraces: Vec<RawSubrace>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSubrace {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    additional_spells: Vec<RawAdditionalSpells>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawAdditionalSpells {
    #[serde(default)]
    innate: Option<Value>,
    #[serde(default)]
    expanded: Option<Value>,
}

impl RaceSpells {
    fn new(
        name: String,
        source: String,
        base_race: Option<BaseRace>,
        spells: RawAdditionalSpells,
    ) -> Self {
        let mut race = Self {
            name,
            source,
            base_race,
            innate: spells.innate,
            expanded: spells.expanded,
            spells: Vec::new(),
        };
        race.spells = race.spell_names();
        race
    }

    /// Spell names referenced by the innate and expanded blocks, deduplicated.
    ///
    /// Level keys are visited in numeric order, so level 3 spells come before level 11.
    /// References look like `misty step`, `hellish rebuke#2` or `guidance|phb#c`.
    pub fn spell_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for block in [&self.innate, &self.expanded].into_iter().flatten() {
            collect_spell_names(block, &mut names);
        }
        names
    }
}

fn collect_spell_names(value: &Value, names: &mut Vec<String>) {
    match value {
        Value::String(reference) => {
            let name = reference
                .split(['|', '#'])
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
        }
        Value::Array(items) => items
            .iter()
            .for_each(|item| collect_spell_names(item, names)),
        Value::Object(map) => {
            // `choose` and `all` hold filter expressions, not spells
            let mut entries: Vec<(&String, &Value)> = map
                .iter()
                .filter(|(key, _)| !matches!(key.as_str(), "choose" | "all"))
                .collect();
            entries.sort_by_key(|(key, _)| {
                key.parse::<u32>().map_or((1, 0), |level| (0, level))
            });
            entries
                .into_iter()
                .for_each(|(_, item)| collect_spell_names(item, names));
        }
        _ => {}
    }
}

fn is_listed(entry: &Value) -> bool {
    entry.get("_copy").is_none()
        && entry
            .get("source")
            .and_then(Value::as_str)
            .is_some_and(is_canonical)
}

/// Loads the races and subraces that grant spells from a 5e.tools races file.
pub fn parse_races(path: &Path) -> Result<Vec<RaceSpells>> {
    let entries = load_array(path, "race")?;
    let total = entries.len();

    let mut races = Vec::new();
    for entry in entries.into_iter().filter(is_listed) {
        let race: RawRace = serde_json::from_value(entry)?;

        if let Some(spells) = race.additional_spells.first() {
            races.push(RaceSpells::new(race.name, race.source, None, spells.clone()));
            continue;
        }

        for subrace in race.subraces {
            let Some(spells) = subrace.additional_spells.into_iter().next() else {
                continue;
            };
            if !subrace.source.as_deref().map_or(true, is_canonical) {
                debug!("Skipping subrace of {} from non-canonical source", race.name);
                continue;
            }

            races.push(RaceSpells::new(
                subrace.name.unwrap_or_else(|| race.name.clone()),
                subrace.source.unwrap_or_else(|| race.source.clone()),
                Some(BaseRace {
                    name: race.name.clone(),
                    source: race.source.clone(),
                }),
                spells,
            ));
        }
    }

    info!(
        "Found {} spellcasting races among {} entries in {}",
        races.len(),
        total,
        path.display()
    );
    Ok(races)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn races_file() -> Value {
        json!({
            "race": [
                {
                    "name": "Tiefling",
                    "source": "PHB",
                    "additionalSpells": [{
                        "innate": {
                            "3": {"daily": {"1": ["hellish rebuke#2"]}},
                            "5": {"daily": {"1": ["darkness"]}}
                        },
                        "known": {"1": ["thaumaturgy#c"]}
                    }]
                },
                {
                    "name": "Elf",
                    "source": "PHB",
                    "subraces": [
                        {"name": "High", "source": "PHB"},
                        {"name": "Drow", "source": "PHB", "additionalSpells": [{
                            "innate": {"3": {"daily": {"1": ["faerie fire"]}}, "5": {"daily": {"1": ["darkness"]}}}
                        }]},
                        {"name": "Pallid", "source": "EGW", "additionalSpells": [{
                            "innate": {"3": {"daily": {"1": ["sleep"]}}}
                        }]},
                        {"name": "Astral", "source": "AAG", "additionalSpells": [{
                            "innate": {"1": ["dancing lights"]}
                        }]}
                    ]
                },
                {
                    "name": "Genasi",
                    "source": "EEPC",
                    "additionalSpells": [{"innate": {"1": ["produce flame"]}}]
                },
                {
                    "name": "Tiefling (Copy)",
                    "source": "PHB",
                    "_copy": {"name": "Tiefling", "source": "PHB"}
                },
                {
                    "name": "Aasimar",
                    "source": "VGM",
                    "subraces": [{"additionalSpells": [{"innate": {"1": ["light#c"]}}]}]
                },
                {
                    "name": "Human",
                    "source": "PHB"
                }
            ]
        })
    }

    #[test]
    fn selects_spellcasting_races_from_canonical_books() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("races.json");
        std::fs::write(&path, races_file().to_string()).unwrap();

        let races = parse_races(&path).unwrap();
        let names: Vec<&str> = races.iter().map(|r| r.name.as_str()).collect();

        assert_eq!(names, vec!["Tiefling", "Drow", "Pallid", "Aasimar"]);
        assert_eq!(races[0].base_race, None);
        assert_eq!(
            races[1].base_race,
            Some(BaseRace {
                name: "Elf".to_string(),
                source: "PHB".to_string()
            })
        );
        assert_eq!(races[3].source, "VGM");
    }

    #[test]
    fn spell_names_strip_suffixes_and_dedup() {
        let race = RaceSpells {
            name: "Githyanki".to_string(),
            source: "MTF".to_string(),
            base_race: None,
            innate: Some(json!({
                "1": ["mage hand|phb#c"],
                "3": ["jump", "misty step"],
                "5": {"daily": {"1": ["misty step#2"]}}
            })),
            expanded: Some(json!({
                "s1": [{"all": "level=1|class=Wizard"}],
                "s2": [{"choose": "level=2|class=Wizard"}, "invisibility"]
            })),
            spells: Vec::new(),
        };

        assert_eq!(
            race.spell_names(),
            vec!["mage hand", "jump", "misty step", "invisibility"]
        );
    }

    #[test]
    fn tiefling_has_innate_spells_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("races.json");
        std::fs::write(&path, races_file().to_string()).unwrap();

        let races = parse_races(&path).unwrap();

        assert!(races[0].expanded.is_none());
        assert_eq!(races[0].spells, vec!["hellish rebuke", "darkness"]);
        assert_eq!(races[1].spells, vec!["faerie fire", "darkness"]);
    }

    #[test]
    fn spell_names_follow_numeric_level_order() {
        let race = RaceSpells::new(
            "Tiefling".to_string(),
            "PHB".to_string(),
            None,
            RawAdditionalSpells {
                innate: Some(json!({
                    "5": ["darkness"],
                    "3": ["hellish rebuke"],
                    "11": ["fireball"]
                })),
                expanded: None,
            },
        );

        assert_eq!(race.spells, vec!["hellish rebuke", "darkness", "fireball"]);
    }

    #[test]
    fn serialized_races_list_their_spells() {
        let race = RaceSpells::new(
            "Drow".to_string(),
            "PHB".to_string(),
            None,
            RawAdditionalSpells {
                innate: Some(json!({"3": {"daily": {"1": ["faerie fire"]}}})),
                expanded: None,
            },
        );

        let value = serde_json::to_value(&race).unwrap();
        assert_eq!(value["spells"], json!(["faerie fire"]));
    }
}
