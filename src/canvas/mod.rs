pub mod client;
pub mod source;
pub mod types;

pub use client::{parse_next_link, CanvasClient, CanvasError};
pub use source::{EnrollmentState, Gradebook};
pub use types::{Assignment, AssignmentGroup, CategoryId, Course, Submission};
