//! Estimate course grades from Canvas LMS assignments using weighted
//! categories.

pub mod canvas;
pub mod config;
pub mod fetch;
pub mod grading;
pub mod output;
pub mod selection;
pub mod upcoming;
