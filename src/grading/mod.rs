pub mod categorize;
pub mod engine;
pub mod policy;
pub mod rollup;
pub mod tally;
pub mod weights;

pub use categorize::{categorize, CategoryBucket};
pub use engine::{
    compute_category_results, grade_course, plan_weights, CategoryResult, CourseResult,
    GradedCourse, WeightSource,
};
pub use policy::FinalPolicy;
pub use rollup::rollup;
pub use tally::{tally, Tally};
pub use weights::{normalize_weights, WeightError, WeightMap, WeightPlan};
