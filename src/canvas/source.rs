use anyhow::Result;
use async_trait::async_trait;

use super::types::{Assignment, AssignmentGroup, Course};

/// Enrollment states a course listing can be filtered by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentState {
    Active,
    Completed,
}

impl EnrollmentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentState::Active => "active",
            EnrollmentState::Completed => "completed",
        }
    }

    /// States to enumerate: active always, completed on request
    pub fn selected(include_completed: bool) -> Vec<EnrollmentState> {
        if include_completed {
            vec![EnrollmentState::Active, EnrollmentState::Completed]
        } else {
            vec![EnrollmentState::Active]
        }
    }
}

/// Supplies courses, assignment groups and assignments from a gradebook.
#[async_trait]
pub trait Gradebook: Send + Sync {
    async fn list_courses(&self, state: EnrollmentState) -> Result<Vec<Course>>;

    async fn get_course(&self, course_id: u64) -> Result<Course>;

    async fn assignment_groups(&self, course_id: u64) -> Result<Vec<AssignmentGroup>>;

    async fn assignments_with_submissions(&self, course_id: u64) -> Result<Vec<Assignment>>;
}
