use std::collections::BTreeSet;
use tracing::warn;

use super::schema::ExclusionsConfig;

/// Courses to leave out of every listing, merged from config and CLI.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Exclusions {
    ids: BTreeSet<u64>,
    /// Lowercased, never empty
    name_contains: Vec<String>,
}

impl Exclusions {
    pub fn new(ids: impl IntoIterator<Item = u64>, name_contains: impl IntoIterator<Item = String>) -> Self {
        let mut exclusions = Exclusions::default();
        exclusions.ids.extend(ids);
        exclusions.add_names(name_contains);
        exclusions
    }

    /// Union of the config file section and the command-line flags.
    ///
    /// Ids that are not integers are logged and skipped.
    pub fn build(config: &ExclusionsConfig, cli_ids: Option<&str>, cli_names: &[String]) -> Self {
        let mut exclusions = Exclusions::default();

        for key in &config.ids {
            match key.as_id() {
                Some(id) => {
                    exclusions.ids.insert(id);
                }
                None => warn!(value = %key, "Ignoring non-integer course id in exclusions.ids"),
            }
        }

        if let Some(raw) = cli_ids {
            let (ids, rejected) = parse_id_list(raw);
            for value in rejected {
                warn!(value = %value, "Ignoring non-integer course id in --exclude-course-ids");
            }
            exclusions.ids.extend(ids);
        }

        exclusions.add_names(config.name_contains.iter().cloned());
        exclusions.add_names(cli_names.iter().cloned());
        exclusions
    }

    fn add_names(&mut self, names: impl IntoIterator<Item = String>) {
        for name in names {
            let lowered = name.trim().to_lowercase();
            if !lowered.is_empty() && !self.name_contains.contains(&lowered) {
                self.name_contains.push(lowered);
            }
        }
    }

    pub fn excludes_id(&self, course_id: u64) -> bool {
        self.ids.contains(&course_id)
    }

    /// True when the course id is excluded or its name contains an excluded substring
    pub fn should_skip(&self, name: Option<&str>, course_id: u64) -> bool {
        if self.excludes_id(course_id) {
            return true;
        }
        let name = name.unwrap_or_default().to_lowercase();
        self.name_contains.iter().any(|needle| name.contains(needle.as_str()))
    }
}

/// Split a comma-separated id list into parsed ids and rejected entries.
/// Blank entries are dropped silently.
pub fn parse_id_list(raw: &str) -> (Vec<u64>, Vec<String>) {
    let mut ids = Vec::new();
    let mut rejected = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.parse::<u64>() {
            Ok(id) => ids.push(id),
            Err(_) => rejected.push(part.to_string()),
        }
    }
    (ids, rejected)
}
