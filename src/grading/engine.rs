use serde::Serialize;

use super::categorize::{categorize, CategoryBucket};
use super::policy::FinalPolicy;
use super::rollup::rollup;
use super::tally::tally;
use super::weights::{WeightError, WeightMap, WeightPlan};
use crate::canvas::types::{Assignment, AssignmentGroup, Course, CategoryId, UNCATEGORIZED_NAME};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryResult {
    pub group_id: CategoryId,
    pub group_name: String,
    pub weight_pct: f64,
    pub running_earned: f64,
    pub running_possible: f64,
    pub running_pct: Option<f64>,
    pub final_earned: f64,
    pub final_possible: f64,
    pub final_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseResult {
    pub course_id: u64,
    pub course_name: Option<String>,
    pub running_total_pct: Option<f64>,
    pub final_total_pct: Option<f64>,
    pub policy: FinalPolicy,
    pub categories: Vec<CategoryResult>,
}

/// Where the weight plan for a course came from
#[derive(Debug, Clone, PartialEq)]
pub enum WeightSource {
    /// Weights given on the command line or in the config file
    Explicit,
    /// Weights Canvas reports on the assignment groups
    Canvas,
    /// No usable weights; every observed category got an equal share
    EqualFallback(WeightError),
}

impl WeightSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, WeightSource::EqualFallback(_))
    }
}

/// A course result plus the weights that produced it
#[derive(Debug, Clone)]
pub struct GradedCourse {
    pub result: CourseResult,
    pub weights: WeightPlan,
    pub weight_source: WeightSource,
}

/// Resolve the weight plan, falling back to equal weights across the
/// categories actually present when neither explicit nor Canvas weights are
/// usable.
pub fn plan_weights(
    explicit: Option<&WeightMap>,
    groups: &[AssignmentGroup],
    buckets: &[CategoryBucket],
) -> (WeightPlan, WeightSource) {
    let has_explicit = explicit.is_some_and(|w| !w.is_empty());
    match WeightPlan::resolve(explicit, groups) {
        Ok(plan) if has_explicit => (plan, WeightSource::Explicit),
        Ok(plan) => (plan, WeightSource::Canvas),
        Err(reason) => {
            let plan = if buckets.is_empty() {
                WeightPlan::equal([UNCATEGORIZED_NAME])
            } else {
                WeightPlan::equal(buckets.iter().map(|b| b.category.name.as_str()))
            };
            (plan, WeightSource::EqualFallback(reason))
        }
    }
}

/// Tally every bucket and attach its weight from the plan
pub fn compute_category_results(
    buckets: &[CategoryBucket],
    plan: &WeightPlan,
    policy: FinalPolicy,
) -> Vec<CategoryResult> {
    buckets
        .iter()
        .map(|bucket| {
            let (running, fin) = tally(bucket.assignments.iter().copied(), policy);
            CategoryResult {
                group_id: bucket.category.id,
                group_name: bucket.category.name.clone(),
                weight_pct: plan.weight_for(&bucket.category.name),
                running_earned: running.earned,
                running_possible: running.possible,
                running_pct: running.percentage(),
                final_earned: fin.earned,
                final_possible: fin.possible,
                final_pct: fin.percentage(),
            }
        })
        .collect()
}

/// Grade one course: categorize, plan weights, tally, roll up.
pub fn grade_course(
    course: &Course,
    assignments: &[Assignment],
    groups: &[AssignmentGroup],
    explicit_weights: Option<&WeightMap>,
    policy: FinalPolicy,
) -> GradedCourse {
    let buckets = categorize(assignments, groups);
    let (weights, weight_source) = plan_weights(explicit_weights, groups, &buckets);
    let categories = compute_category_results(&buckets, &weights, policy);
    let (running_total_pct, final_total_pct) = rollup(&categories);

    GradedCourse {
        result: CourseResult {
            course_id: course.id,
            course_name: course.name.clone(),
            running_total_pct,
            final_total_pct,
            policy,
            categories,
        },
        weights,
        weight_source,
    }
}
