use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::grading::{FinalPolicy, WeightMap};

/// Configuration file contents.
///
/// Example YAML:
/// ```yaml
/// canvas:
///   base_url: https://school.instructure.com
///   token: "..."
/// exclusions:
///   ids: [1234]
///   name_contains: ["orientation"]
/// weights:
///   default: { Homework: 40, Exams: 60 }
///   by_course_id:
///     "210272": { Homework: 20, "Exam 1": 25, "Exam 2": 25, "Exam 3": 30 }
/// final_policy:
///   default: missing_zero_upcoming_ignore
///   by_course_id:
///     210272: all_zero
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default, deserialize_with = "null_as_default")]
    pub canvas: CanvasConfig,

    #[serde(default, deserialize_with = "null_as_default")]
    pub exclusions: ExclusionsConfig,

    #[serde(default, deserialize_with = "null_as_default")]
    pub weights: WeightsConfig,

    #[serde(default, deserialize_with = "null_as_default")]
    pub final_policy: PolicyConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CanvasConfig {
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ExclusionsConfig {
    /// Course ids to skip. Non-integer entries are ignored with a warning.
    #[serde(default, deserialize_with = "null_as_default")]
    pub ids: Vec<CourseKey>,

    /// Case-insensitive substrings of course names to skip
    #[serde(default, deserialize_with = "null_as_default")]
    pub name_contains: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WeightsConfig {
    /// Weights for every course without its own entry
    #[serde(default)]
    pub default: Option<WeightMap>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub by_course_id: BTreeMap<CourseKey, WeightMap>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    #[serde(default)]
    pub default: Option<FinalPolicy>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub by_course_id: BTreeMap<CourseKey, FinalPolicy>,
}

/// A course id as written in a config file: YAML keeps numeric keys numeric,
/// JSON (and quoted YAML) turns them into strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CourseKey {
    Id(i64),
    Text(String),
}

impl CourseKey {
    /// The numeric course id, if this key denotes one
    pub fn as_id(&self) -> Option<u64> {
        match self {
            CourseKey::Id(id) => u64::try_from(*id).ok(),
            CourseKey::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl From<u64> for CourseKey {
    fn from(id: u64) -> Self {
        match i64::try_from(id) {
            Ok(id) => CourseKey::Id(id),
            Err(_) => CourseKey::Text(id.to_string()),
        }
    }
}

impl fmt::Display for CourseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CourseKey::Id(id) => write!(f, "{}", id),
            CourseKey::Text(text) => f.write_str(text),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
