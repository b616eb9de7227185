use std::collections::HashSet;

use crate::canvas::Course;

/// Failure to pin a `--course-name` query to exactly one course.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SelectionError {
    #[error("No course name contains '{query}'. Use --include-completed to search completed courses or pass --course-id.")]
    NoMatch { query: String },

    #[error("Multiple courses match '{query}'; be more specific or pass --course-id: {}", .matches.join(", "))]
    Ambiguous { query: String, matches: Vec<String> },
}

/// `name (ID id)`
pub fn describe(course: &Course) -> String {
    format!("{} (ID {})", course.display_name(), course.id)
}

/// Drop repeated course ids, keeping the first occurrence
pub fn dedupe_courses(courses: impl IntoIterator<Item = Course>) -> Vec<Course> {
    let mut seen = HashSet::new();
    courses
        .into_iter()
        .filter(|course| seen.insert(course.id))
        .collect()
}

/// The single course whose name contains `query`, case-insensitively.
pub fn select_by_name<'a>(courses: &'a [Course], query: &str) -> Result<&'a Course, SelectionError> {
    let needle = query.to_lowercase();
    let matches: Vec<&Course> = courses
        .iter()
        .filter(|course| course.display_name().to_lowercase().contains(&needle))
        .collect();

    match matches.as_slice() {
        [] => Err(SelectionError::NoMatch {
            query: query.to_string(),
        }),
        [only] => Ok(*only),
        many => Err(SelectionError::Ambiguous {
            query: query.to_string(),
            matches: many.iter().map(|c| describe(c)).collect(),
        }),
    }
}
