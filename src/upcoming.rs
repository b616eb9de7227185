use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::canvas::{Assignment, Course};

/// One published assignment due inside the reporting window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpcomingItem {
    pub due: DateTime<Utc>,
    pub course_id: u64,
    pub course_name: String,
    pub assignment_name: String,
    pub points_possible: f64,
}

/// Published assignments of one course due in `[now, now + window]`.
/// Assignments without a parseable due date are skipped. A window reaching
/// past the last representable instant ends there.
pub fn upcoming_in_course(
    course: &Course,
    assignments: &[Assignment],
    now: DateTime<Utc>,
    window: Duration,
) -> Vec<UpcomingItem> {
    let end = now.checked_add_signed(window).unwrap_or(DateTime::<Utc>::MAX_UTC);
    assignments
        .iter()
        .filter(|a| a.is_published())
        .filter_map(|a| a.due_date().map(|due| (a, due)))
        .filter(|(_, due)| *due >= now && *due <= end)
        .map(|(a, due)| UpcomingItem {
            due,
            course_id: course.id,
            course_name: course.display_name().to_string(),
            assignment_name: a.name.clone(),
            points_possible: a.points(),
        })
        .collect()
}

/// Order by due time, then course name case-insensitively
pub fn sort_upcoming(items: &mut [UpcomingItem]) {
    items.sort_by(|a, b| {
        a.due
            .cmp(&b.due)
            .then_with(|| a.course_name.to_lowercase().cmp(&b.course_name.to_lowercase()))
    });
}
