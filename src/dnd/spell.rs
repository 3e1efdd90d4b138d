//! Spells from 5e.tools spell JSON files.
//!
//! The files come from https://get.5e.tools/ and are mirrored on Github under
//! `TheGiddyLimit.github.io/data/spells`. A boolean key appears in the JSON only when it
//! is `true`, so flags are decoded from key presence.

use super::dice::Dice;
use super::{is_canonical, load_array};
use crate::error::{CriticError, Result};
use once_cell::sync::OnceCell;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

static AOE_TAGS_MAP: OnceCell<HashMap<&'static str, &'static str>> = OnceCell::new();
static MISC_TAGS_MAP: OnceCell<HashMap<&'static str, &'static str>> = OnceCell::new();

pub fn aoe_tags_map() -> &'static HashMap<&'static str, &'static str> {
    AOE_TAGS_MAP.get_or_init(|| {
        HashMap::from([
            ("C", "cube"),
            ("H", "hemisphere"),
            ("L", "line"),
            ("MT", "multiple targets"),
            ("N", "cone"),
            ("Q", "square"),
            ("R", "circle"),
            ("S", "sphere"),
            ("ST", "single target"),
            ("W", "wall"),
            ("Y", "cylinder"),
        ])
    })
}

pub fn misc_tags_map() -> &'static HashMap<&'static str, &'static str> {
    MISC_TAGS_MAP.get_or_init(|| {
        HashMap::from([
            ("HL", "healing"),
            ("MAC", "modifies AC"),
            ("PRM", "permanent effects"),
            ("SCL", "scaling effects"),
            ("SGT", "requires sight"),
            ("SMN", "summons creature"),
            ("THP", "grants temporary hit points"),
            ("TP", "teleportation"),
        ])
    })
}

fn translate_tags(
    tags: Vec<String>,
    map: &HashMap<&'static str, &'static str>,
    spell: &str,
) -> Vec<String> {
    tags.into_iter()
        .map(|tag| match map.get(tag.as_str()) {
            Some(name) => name.to_string(),
            None => {
                warn!("Unknown tag '{}' on spell '{}'", tag, spell);
                tag
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum School {
    Abjuration,
    Conjuration,
    Divination,
    Enchantment,
    Illusion,
    Necromancy,
    Transmutation,
    Evocation,
}

impl FromStr for School {
    type Err = CriticError;

    fn from_str(code: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match code {
            "A" => School::Abjuration,
            "C" => School::Conjuration,
            "D" => School::Divination,
            "E" => School::Enchantment,
            "I" => School::Illusion,
            "N" => School::Necromancy,
            "T" => School::Transmutation,
            "V" => School::Evocation,
            _ => return Err(CriticError::Parse(format!("Unknown school code: '{code}'"))),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttackType {
    None,
    Melee,
    Ranged,
}

/// Casting time, also used for the timed part of a duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Time {
    pub amount: u32,
    pub unit: String,
    pub condition: Option<String>,
    pub up_to: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Distance {
    pub kind: String,
    pub amount: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Range {
    pub kind: String,
    pub distance: Option<Distance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterialComponent {
    pub text: String,
    pub cost: Option<u32>,
    pub is_consumed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Components {
    pub verbal: bool,
    pub somatic: bool,
    pub material: Option<MaterialComponent>,
    pub royalty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Duration {
    pub kind: String,
    pub time: Option<Time>,
    pub concentration: bool,
    pub terminations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescriptionSubsection {
    pub name: String,
    pub paragraphs: Vec<String>,
}

/// One paragraph of a spell's `entries`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Description {
    Paragraph(String),
    /// Rendered as bullet points.
    List(Vec<String>),
    Quote {
        paragraphs: Vec<String>,
        by: Option<String>,
    },
    Subsection(DescriptionSubsection),
    Table {
        caption: Option<String>,
        col_labels: Vec<String>,
        rows: Vec<Vec<String>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ScalingValue {
    Dice(Dice),
    /// Anything that isn't a dice formula, e.g. a flat modifier.
    Modifier(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScalingDice {
    pub label: String,
    pub scaling: BTreeMap<u8, ScalingValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub name: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subclass {
    pub base_class: Class,
    pub name: String,
    pub source: String,
    pub variant: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassVariant {
    pub class: Class,
    pub variant_source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Race {
    pub name: String,
    pub source: String,
    pub base_name: Option<String>,
    pub base_source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Background {
    pub name: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EldritchInvocation {
    pub name: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Spell {
    pub name: String,
    pub source: String,
    pub page: Option<u32>,
    pub in_srd: bool,
    pub level: u8,
    pub school: School,
    pub times: Vec<Time>,
    pub range: Range,
    pub is_ritual: bool,
    pub components: Components,
    pub durations: Vec<Duration>,
    pub descriptions: Vec<Description>,
    pub higher_level_description: Option<DescriptionSubsection>,
    pub scaling_dice: Vec<ScalingDice>,
    pub misc_tags: Vec<String>,
    pub aoe_tags: Vec<String>,
    pub inflicted_conditions: Vec<String>,
    pub damage_inflicted: Vec<String>,
    pub damage_resisted: Vec<String>,
    pub damage_vulnerable: Vec<String>,
    pub damage_immune: Vec<String>,
    pub saving_throws: Vec<String>,
    pub attack_type: AttackType,
    pub ability_checks: Vec<String>,
    pub classes: Vec<Class>,
    pub subclasses: Vec<Subclass>,
    pub class_variants: Vec<ClassVariant>,
    pub races: Vec<Race>,
    pub backgrounds: Vec<Background>,
    pub eldritch_invocations: Vec<EldritchInvocation>,
}

impl fmt::Display for Spell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// Raw JSON shapes, decoded by serde and then mapped into the records above.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSpell {
    name: String,
    source: String,
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    srd: Option<Value>,
    level: u8,
    school: String,
    #[serde(default)]
    time: Vec<RawTime>,
    range: RawRange,
    #[serde(default)]
    components: RawComponents,
    #[serde(default)]
    duration: Vec<RawDuration>,
    #[serde(default)]
    meta: Option<RawMeta>,
    #[serde(default)]
    entries: Vec<RawEntry>,
    #[serde(default)]
    entries_higher_level: Vec<RawEntry>,
    #[serde(default)]
    scaling_level_dice: Option<OneOrMany<RawScaling>>,
    #[serde(default)]
    condition_inflict: Vec<String>,
    #[serde(default)]
    damage_inflict: Vec<String>,
    #[serde(default)]
    damage_resist: Vec<String>,
    #[serde(default)]
    damage_immune: Vec<String>,
    #[serde(default)]
    damage_vulnerable: Vec<String>,
    #[serde(default)]
    saving_throw: Vec<String>,
    #[serde(default)]
    spell_attack: Vec<String>,
    #[serde(default)]
    ability_check: Vec<String>,
    #[serde(default)]
    misc_tags: Vec<String>,
    #[serde(default)]
    area_tags: Vec<String>,
    #[serde(default)]
    classes: RawClasses,
    #[serde(default)]
    races: Vec<RawRace>,
    #[serde(default)]
    backgrounds: Vec<Class>,
    #[serde(default)]
    eldritch_invocations: Vec<Class>,
}

#[derive(Debug, Deserialize)]
struct RawTime {
    number: u32,
    unit: String,
    #[serde(default)]
    condition: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRange {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    distance: Option<RawDistance>,
}

#[derive(Debug, Deserialize)]
struct RawDistance {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    amount: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct RawComponents {
    #[serde(default)]
    v: Option<Value>,
    #[serde(default)]
    s: Option<Value>,
    #[serde(default)]
    m: Option<RawMaterial>,
    #[serde(default)]
    r: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawMaterial {
    Text(String),
    Detailed {
        text: String,
        #[serde(default)]
        cost: Option<u32>,
        #[serde(default)]
        consume: Option<Value>,
    },
    Flag(#[allow(dead_code)] bool),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDuration {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    duration: Option<RawDurationTime>,
    #[serde(default)]
    concentration: Option<Value>,
    #[serde(default)]
    ends: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDurationTime {
    #[serde(rename = "type")]
    unit: String,
    #[serde(default)]
    amount: u32,
    #[serde(default)]
    up_to: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawMeta {
    #[serde(default)]
    ritual: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Text(String),
    Block(RawBlock),
    Unknown(IgnoredAny),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum RawBlock {
    List {
        #[serde(default)]
        items: Vec<Value>,
    },
    Quote {
        #[serde(default)]
        entries: Vec<Value>,
        #[serde(default)]
        by: Option<String>,
    },
    Entries {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        entries: Vec<Value>,
    },
    Table {
        #[serde(default)]
        caption: Option<String>,
        #[serde(default, rename = "colLabels")]
        col_labels: Vec<Value>,
        #[serde(default)]
        rows: Vec<Vec<Value>>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawScaling {
    label: String,
    scaling: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClasses {
    #[serde(default)]
    from_class_list: Vec<Class>,
    #[serde(default)]
    from_subclass: Vec<RawSubclassRef>,
    #[serde(default)]
    from_class_list_variant: Vec<RawClassVariant>,
}

#[derive(Debug, Deserialize)]
struct RawSubclassRef {
    class: Class,
    subclass: RawSubclass,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSubclass {
    name: String,
    source: String,
    #[serde(default)]
    sub_subclass: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClassVariant {
    name: String,
    source: String,
    #[serde(default)]
    defined_in_source: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRace {
    name: String,
    source: String,
    #[serde(default)]
    base_name: Option<String>,
    #[serde(default)]
    base_source: Option<String>,
}

/// Flattens nested 5e.tools entries into plain text.
fn entry_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(items) => items.iter().map(entry_text).collect::<Vec<_>>().join(" "),
        Value::Object(map) => {
            let body = ["entries", "items", "entry"]
                .iter()
                .filter_map(|key| map.get(*key))
                .map(entry_text)
                .collect::<Vec<_>>()
                .join(" ");
            match map.get("name").and_then(Value::as_str) {
                Some(name) if !body.is_empty() => format!("{name}. {body}"),
                Some(name) => name.to_string(),
                None => body,
            }
        }
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn texts(values: &[Value]) -> Vec<String> {
    values.iter().map(entry_text).collect()
}

fn description(entry: RawEntry, spell: &str) -> Option<Description> {
    match entry {
        RawEntry::Text(text) => Some(Description::Paragraph(text)),
        RawEntry::Block(RawBlock::List { items }) => Some(Description::List(texts(&items))),
        RawEntry::Block(RawBlock::Quote { entries, by }) => Some(Description::Quote {
            paragraphs: texts(&entries),
            by,
        }),
        RawEntry::Block(RawBlock::Entries { name, entries }) => {
            Some(Description::Subsection(DescriptionSubsection {
                name: name.unwrap_or_default(),
                paragraphs: texts(&entries),
            }))
        }
        RawEntry::Block(RawBlock::Table {
            caption,
            col_labels,
            rows,
        }) => Some(Description::Table {
            caption,
            col_labels: texts(&col_labels),
            rows: rows.iter().map(|row| texts(row)).collect(),
        }),
        RawEntry::Block(RawBlock::Other) | RawEntry::Unknown(_) => {
            debug!("Skipping unsupported entry on spell '{}'", spell);
            None
        }
    }
}

fn scaling_dice(raw: RawScaling, spell: &str) -> ScalingDice {
    let scaling = raw
        .scaling
        .into_iter()
        .filter_map(|(level, formula)| {
            let Ok(level) = level.parse::<u8>() else {
                warn!("Invalid scaling level '{}' on spell '{}'", level, spell);
                return None;
            };
            let value = match formula.parse::<Dice>() {
                Ok(dice) => ScalingValue::Dice(dice),
                Err(_) => ScalingValue::Modifier(formula),
            };
            Some((level, value))
        })
        .collect();

    ScalingDice {
        label: raw.label,
        scaling,
    }
}

impl TryFrom<RawSpell> for Spell {
    type Error = CriticError;

    fn try_from(raw: RawSpell) -> Result<Self> {
        let name = raw.name;

        let material = match raw.components.m {
            Some(RawMaterial::Text(text)) => Some(MaterialComponent {
                text,
                cost: None,
                is_consumed: false,
            }),
            Some(RawMaterial::Detailed {
                text,
                cost,
                consume,
            }) => Some(MaterialComponent {
                text,
                cost,
                is_consumed: consume.is_some(),
            }),
            Some(RawMaterial::Flag(_)) | None => None,
        };

        let descriptions = raw
            .entries
            .into_iter()
            .filter_map(|entry| description(entry, &name))
            .collect();

        let higher_level_description = raw.entries_higher_level.into_iter().next().and_then(
            |entry| match description(entry, &name) {
                Some(Description::Subsection(subsection)) => Some(subsection),
                _ => None,
            },
        );

        let attack_type = match raw.spell_attack.first().map(String::as_str) {
            Some("M") => AttackType::Melee,
            Some(_) => AttackType::Ranged,
            None => AttackType::None,
        };

        let classes = raw
            .classes
            .from_class_list
            .into_iter()
            .filter(|class| is_canonical(&class.source))
            .collect();

        let subclasses = raw
            .classes
            .from_subclass
            .into_iter()
            .filter(|item| is_canonical(&item.class.source) && is_canonical(&item.subclass.source))
            .map(|item| Subclass {
                base_class: item.class,
                name: item.subclass.name,
                source: item.subclass.source,
                variant: item.subclass.sub_subclass,
            })
            .collect();

        let class_variants = raw
            .classes
            .from_class_list_variant
            .into_iter()
            .filter_map(|item| match item.defined_in_source {
                Some(defined) if is_canonical(&item.source) && is_canonical(&defined) => {
                    Some(ClassVariant {
                        class: Class {
                            name: item.name,
                            source: item.source,
                        },
                        variant_source: defined,
                    })
                }
                _ => None,
            })
            .collect();

        let races = raw
            .races
            .into_iter()
            .filter(|race| {
                is_canonical(&race.source)
                    && race.base_source.as_deref().map_or(true, is_canonical)
            })
            .map(|race| Race {
                name: race.name,
                source: race.source,
                base_name: race.base_name,
                base_source: race.base_source,
            })
            .collect();

        Ok(Spell {
            source: raw.source,
            page: raw.page,
            in_srd: raw.srd.is_some_and(|srd| srd != Value::Bool(false)),
            level: raw.level,
            school: raw.school.parse()?,
            times: raw
                .time
                .into_iter()
                .map(|time| Time {
                    amount: time.number,
                    unit: time.unit,
                    condition: time.condition,
                    up_to: false,
                })
                .collect(),
            range: Range {
                kind: raw.range.kind,
                distance: raw.range.distance.map(|distance| Distance {
                    kind: distance.kind,
                    amount: distance.amount,
                }),
            },
            is_ritual: raw.meta.is_some_and(|meta| meta.ritual),
            components: Components {
                verbal: raw.components.v.is_some(),
                somatic: raw.components.s.is_some(),
                material,
                royalty: raw.components.r.is_some(),
            },
            durations: raw
                .duration
                .into_iter()
                .map(|duration| Duration {
                    kind: duration.kind,
                    time: duration.duration.map(|time| Time {
                        amount: time.amount,
                        unit: time.unit,
                        condition: None,
                        up_to: time.up_to.is_some(),
                    }),
                    concentration: duration.concentration.is_some(),
                    terminations: duration.ends,
                })
                .collect(),
            descriptions,
            higher_level_description,
            scaling_dice: raw
                .scaling_level_dice
                .map(OneOrMany::into_vec)
                .unwrap_or_default()
                .into_iter()
                .map(|raw| scaling_dice(raw, &name))
                .collect(),
            misc_tags: translate_tags(raw.misc_tags, misc_tags_map(), &name),
            aoe_tags: translate_tags(raw.area_tags, aoe_tags_map(), &name),
            inflicted_conditions: raw.condition_inflict,
            damage_inflicted: raw.damage_inflict,
            damage_resisted: raw.damage_resist,
            damage_vulnerable: raw.damage_vulnerable,
            damage_immune: raw.damage_immune,
            saving_throws: raw.saving_throw,
            attack_type,
            ability_checks: raw.ability_check,
            classes,
            subclasses,
            class_variants,
            races,
            backgrounds: raw
                .backgrounds
                .into_iter()
                .map(|item| Background {
                    name: item.name,
                    source: item.source,
                })
                .collect(),
            eldritch_invocations: raw
                .eldritch_invocations
                .into_iter()
                .map(|item| EldritchInvocation {
                    name: item.name,
                    source: item.source,
                })
                .collect(),
            name,
        })
    }
}

impl Spell {
    /// Decodes one element of the `spell` array.
    pub fn from_json(value: Value) -> Result<Self> {
        let raw: RawSpell = serde_json::from_value(value)?;
        raw.try_into()
    }
}

/// Loads all spells from canonical books in a 5e.tools spell file.
pub fn parse_spells(path: &Path) -> Result<Vec<Spell>> {
    let entries = load_array(path, "spell")?;
    let total = entries.len();

    let spells = entries
        .into_iter()
        .filter(|entry| {
            entry
                .get("source")
                .and_then(Value::as_str)
                .is_some_and(is_canonical)
        })
        .map(Spell::from_json)
        .collect::<Result<Vec<_>>>()?;

    info!(
        "Parsed {} of {} spells from {}",
        spells.len(),
        total,
        path.display()
    );
    Ok(spells)
}
