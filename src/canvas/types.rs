use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of an assignment group ("category") in the gradebook.
pub type CategoryId = i64;

/// Synthetic category id for assignments with no (or an unknown) group.
pub const UNCATEGORIZED_ID: CategoryId = -1;

/// Display name of the synthetic category.
pub const UNCATEGORIZED_NAME: &str = "Uncategorized";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Course {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
}

impl Course {
    /// Name for display, empty when Canvas did not provide one
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

/// An assignment group. Canvas calls these groups; the grading code calls
/// them categories.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AssignmentGroup {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub group_weight: Option<f64>,
}

impl AssignmentGroup {
    pub fn uncategorized() -> Self {
        Self {
            id: UNCATEGORIZED_ID,
            name: UNCATEGORIZED_NAME.to_string(),
            group_weight: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Submission {
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub workflow_state: Option<String>,
    #[serde(default)]
    pub missing: Option<bool>,
    #[serde(default)]
    pub excused: Option<bool>,
}

impl Submission {
    /// Graded means a score exists and the work was not excused
    pub fn is_graded(&self) -> bool {
        self.score.is_some() && self.excused != Some(true)
    }

    /// Score floored at zero, if graded
    pub fn earned(&self) -> Option<f64> {
        if self.is_graded() {
            self.score.map(|s| s.max(0.0))
        } else {
            None
        }
    }
}

fn default_published() -> Option<bool> {
    Some(true)
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Assignment {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub points_possible: Option<f64>,
    #[serde(default)]
    pub assignment_group_id: Option<CategoryId>,
    #[serde(default)]
    pub muted: Option<bool>,
    /// Absent means published; an explicit null does not
    #[serde(default = "default_published")]
    pub published: Option<bool>,
    #[serde(default)]
    pub due_at: Option<String>,
    #[serde(default)]
    pub submission: Option<Submission>,
}

impl Assignment {
    pub fn is_published(&self) -> bool {
        self.published == Some(true)
    }

    /// Points possible, with absent treated as zero
    pub fn points(&self) -> f64 {
        self.points_possible.unwrap_or(0.0)
    }

    /// Whether this assignment can enter any tally at all
    pub fn counts_toward_grade(&self) -> bool {
        self.is_published() && self.points() > 0.0
    }

    pub fn is_missing(&self) -> bool {
        self.submission
            .as_ref()
            .is_some_and(|s| s.missing == Some(true))
    }

    pub fn is_excused(&self) -> bool {
        self.submission
            .as_ref()
            .is_some_and(|s| s.excused == Some(true))
    }

    /// Earned points (floored at zero) when graded
    pub fn earned(&self) -> Option<f64> {
        self.submission.as_ref().and_then(Submission::earned)
    }

    pub fn due_date(&self) -> Option<DateTime<Utc>> {
        self.due_at.as_deref().and_then(parse_due)
    }
}

/// Parse a Canvas due timestamp. RFC 3339 with offset or `Z`; naive
/// timestamps are taken as UTC. Anything else yields None.
pub fn parse_due(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}
