use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::canvas::{Assignment, AssignmentGroup, Course, EnrollmentState, Gradebook};
use crate::config::{effective_policy, effective_weights, Config, Exclusions};
use crate::grading::{grade_course, FinalPolicy, GradedCourse, WeightMap, WeightSource};
use crate::selection::dedupe_courses;
use crate::upcoming::{sort_upcoming, upcoming_in_course, UpcomingItem};

/// Courses fetched from Canvas at the same time
pub const COURSE_CONCURRENCY: usize = 4;

/// Command-line overrides plus the loaded config, consulted per course
#[derive(Debug, Clone, Copy)]
pub struct GradeOptions<'a> {
    pub config: &'a Config,
    pub cli_weights: Option<&'a WeightMap>,
    pub cli_policy: Option<FinalPolicy>,
}

/// A graded course together with the assignments it was graded from
#[derive(Debug, Clone)]
pub struct CourseGrades {
    pub graded: GradedCourse,
    pub assignments: Vec<Assignment>,
}

/// Enumerate active (and optionally completed) courses, deduplicated by id,
/// with exclusions applied.
pub async fn list_candidate_courses<G: Gradebook + ?Sized>(
    gradebook: &G,
    include_completed: bool,
    exclusions: &Exclusions,
) -> Result<Vec<Course>> {
    let mut listed = Vec::new();
    for state in EnrollmentState::selected(include_completed) {
        let courses = gradebook
            .list_courses(state)
            .await
            .with_context(|| format!("Failed to list {} courses", state.as_str()))?;
        debug!(state = state.as_str(), count = courses.len(), "Listed courses");
        listed.extend(courses);
    }

    let (kept, skipped): (Vec<Course>, Vec<Course>) = dedupe_courses(listed)
        .into_iter()
        .partition(|course| !exclusions.should_skip(course.name.as_deref(), course.id));
    for course in &skipped {
        debug!(course_id = course.id, name = course.display_name(), "Excluded course");
    }
    info!(courses = kept.len(), excluded = skipped.len(), "Selected candidate courses");
    Ok(kept)
}

fn grade_fetched(
    course: &Course,
    assignments: Vec<Assignment>,
    groups: Vec<AssignmentGroup>,
    options: &GradeOptions<'_>,
) -> CourseGrades {
    let weights = effective_weights(course.id, options.cli_weights, options.config);
    let policy = effective_policy(course.id, options.cli_policy, options.config);
    let graded = grade_course(course, &assignments, &groups, weights, policy);

    if let WeightSource::EqualFallback(reason) = &graded.weight_source {
        warn!(
            course_id = course.id,
            categories = graded.weights.len(),
            reason = %reason,
            "No usable weights; using equal weights across observed categories"
        );
    }
    debug!(
        course_id = course.id,
        policy = %policy,
        assignments = assignments.len(),
        groups = groups.len(),
        running = ?graded.result.running_total_pct,
        fin = ?graded.result.final_total_pct,
        "Graded course"
    );

    CourseGrades { graded, assignments }
}

/// Fetch groups and assignments for an already-listed course and grade it.
pub async fn grade_listed_course<G: Gradebook + ?Sized>(
    gradebook: &G,
    course: &Course,
    options: &GradeOptions<'_>,
) -> Result<CourseGrades> {
    let (groups, assignments) = tokio::try_join!(
        gradebook.assignment_groups(course.id),
        gradebook.assignments_with_submissions(course.id),
    )
    .with_context(|| format!("Failed to fetch course {}", course.id))?;

    Ok(grade_fetched(course, assignments, groups, options))
}

/// Fetch a course by id, along with its groups and assignments, and grade it.
pub async fn grade_course_by_id<G: Gradebook + ?Sized>(
    gradebook: &G,
    course_id: u64,
    options: &GradeOptions<'_>,
) -> Result<CourseGrades> {
    let (course, groups, assignments) = tokio::try_join!(
        gradebook.get_course(course_id),
        gradebook.assignment_groups(course_id),
        gradebook.assignments_with_submissions(course_id),
    )
    .with_context(|| format!("Failed to fetch course {}", course_id))?;

    Ok(grade_fetched(&course, assignments, groups, options))
}

/// Grade several courses, a few at a time, keeping their input order.
///
/// A course that fails to fetch is logged and left out. If every course
/// fails, the first error is returned.
pub async fn grade_courses<G: Gradebook + ?Sized>(
    gradebook: &G,
    courses: &[Course],
    options: &GradeOptions<'_>,
) -> Result<Vec<CourseGrades>> {
    let outcomes: Vec<Result<CourseGrades>> = stream::iter(courses)
        .map(|course| grade_listed_course(gradebook, course, options))
        .buffered(COURSE_CONCURRENCY)
        .collect()
        .await;

    keep_successes(outcomes, "Course failed")
}

/// Upcoming work across `courses`, sorted by due time then course name.
pub async fn fetch_upcoming<G: Gradebook + ?Sized>(
    gradebook: &G,
    courses: &[Course],
    now: DateTime<Utc>,
    window: Duration,
) -> Result<Vec<UpcomingItem>> {
    let outcomes: Vec<Result<Vec<UpcomingItem>>> = stream::iter(courses)
        .map(|course| async move {
            let assignments = gradebook
                .assignments_with_submissions(course.id)
                .await
                .with_context(|| format!("Failed to fetch assignments for course {}", course.id))?;
            Ok::<_, anyhow::Error>(upcoming_in_course(course, &assignments, now, window))
        })
        .buffered(COURSE_CONCURRENCY)
        .collect()
        .await;

    let mut items: Vec<UpcomingItem> = keep_successes(outcomes, "Skipping course")?
        .into_iter()
        .flatten()
        .collect();
    sort_upcoming(&mut items);
    Ok(items)
}

fn keep_successes<T>(outcomes: Vec<Result<T>>, message: &str) -> Result<Vec<T>> {
    let mut kept = Vec::with_capacity(outcomes.len());
    let mut first_error = None;

    for outcome in outcomes {
        match outcome {
            Ok(value) => kept.push(value),
            Err(e) => {
                warn!(error = %format!("{:#}", e), "{}", message);
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) if kept.is_empty() => Err(e),
        _ => Ok(kept),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{CanvasError, Submission};
    use crate::config::CourseKey;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::{HashMap, HashSet};

    #[derive(Default)]
    struct FakeGradebook {
        active: Vec<Course>,
        completed: Vec<Course>,
        groups: HashMap<u64, Vec<AssignmentGroup>>,
        assignments: HashMap<u64, Vec<Assignment>>,
        broken: HashSet<u64>,
    }

    impl FakeGradebook {
        fn check(&self, course_id: u64) -> Result<()> {
            if self.broken.contains(&course_id) {
                return Err(CanvasError::Status {
                    status: 500,
                    url: format!("/api/v1/courses/{}", course_id),
                    body: String::new(),
                }
                .into());
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Gradebook for FakeGradebook {
        async fn list_courses(&self, state: EnrollmentState) -> Result<Vec<Course>> {
            Ok(match state {
                EnrollmentState::Active => self.active.clone(),
                EnrollmentState::Completed => self.completed.clone(),
            })
        }

        async fn get_course(&self, course_id: u64) -> Result<Course> {
            self.check(course_id)?;
            self.active
                .iter()
                .chain(&self.completed)
                .find(|c| c.id == course_id)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no course {}", course_id))
        }

        async fn assignment_groups(&self, course_id: u64) -> Result<Vec<AssignmentGroup>> {
            self.check(course_id)?;
            Ok(self.groups.get(&course_id).cloned().unwrap_or_default())
        }

        async fn assignments_with_submissions(&self, course_id: u64) -> Result<Vec<Assignment>> {
            self.check(course_id)?;
            Ok(self.assignments.get(&course_id).cloned().unwrap_or_default())
        }
    }

    fn course(id: u64, name: &str) -> Course {
        Course {
            id,
            name: Some(name.to_string()),
        }
    }

    fn assignment(id: u64, group: i64, score: Option<f64>, missing: bool, due_at: Option<&str>) -> Assignment {
        Assignment {
            id,
            name: format!("A{}", id),
            points_possible: Some(10.0),
            assignment_group_id: Some(group),
            muted: None,
            published: Some(true),
            due_at: due_at.map(str::to_string),
            submission: Some(Submission {
                score,
                missing: Some(missing),
                ..Default::default()
            }),
        }
    }

    fn gradebook() -> FakeGradebook {
        let mut gradebook = FakeGradebook {
            active: vec![course(1, "Biology"), course(2, "Chemistry"), course(3, "Orientation")],
            completed: vec![course(2, "Chemistry"), course(4, "History")],
            ..Default::default()
        };
        gradebook.groups.insert(
            1,
            vec![AssignmentGroup {
                id: 10,
                name: "Homework".to_string(),
                group_weight: Some(100.0),
            }],
        );
        gradebook.assignments.insert(
            1,
            vec![
                assignment(1, 10, Some(8.0), false, Some("2024-03-02T00:00:00Z")),
                assignment(2, 10, None, true, None),
            ],
        );
        gradebook.groups.insert(
            2,
            vec![AssignmentGroup {
                id: 20,
                name: "Labs".to_string(),
                group_weight: None,
            }],
        );
        gradebook.assignments.insert(
            2,
            vec![assignment(3, 20, Some(5.0), false, Some("2024-03-01T18:00:00Z"))],
        );
        gradebook
    }

    fn options(config: &Config) -> GradeOptions<'_> {
        GradeOptions {
            config,
            cli_weights: None,
            cli_policy: None,
        }
    }

    #[tokio::test]
    async fn test_candidate_courses_dedupe_and_exclude() {
        let gradebook = gradebook();
        let exclusions = Exclusions::new([], ["orientation".to_string()]);

        let active = list_candidate_courses(&gradebook, false, &exclusions).await.unwrap();
        let ids: Vec<u64> = active.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2]);

        let all = list_candidate_courses(&gradebook, true, &exclusions).await.unwrap();
        let ids: Vec<u64> = all.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 4]);
    }

    #[tokio::test]
    async fn test_grade_course_by_id_applies_config_policy() {
        let gradebook = gradebook();
        let mut config = Config::default();
        config
            .final_policy
            .by_course_id
            .insert(CourseKey::Text("1".to_string()), FinalPolicy::IgnoreAll);

        let grades = grade_course_by_id(&gradebook, 1, &options(&config)).await.unwrap();
        let result = &grades.graded.result;
        assert_eq!(result.course_name.as_deref(), Some("Biology"));
        assert_eq!(result.policy, FinalPolicy::IgnoreAll);
        assert!((result.running_total_pct.unwrap() - 80.0).abs() < 1e-9);
        assert!((result.final_total_pct.unwrap() - 80.0).abs() < 1e-9);
        assert_eq!(grades.assignments.len(), 2);
    }

    #[tokio::test]
    async fn test_cli_policy_overrides_config() {
        let gradebook = gradebook();
        let config = Config::default();
        let opts = GradeOptions {
            cli_policy: Some(FinalPolicy::AllZero),
            ..options(&config)
        };
        let grades = grade_course_by_id(&gradebook, 1, &opts).await.unwrap();
        assert!((grades.graded.result.final_total_pct.unwrap() - 40.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unweighted_course_falls_back() {
        let gradebook = gradebook();
        let config = Config::default();
        let grades = grade_listed_course(&gradebook, &course(2, "Chemistry"), &options(&config))
            .await
            .unwrap();
        assert!(grades.graded.weight_source.is_fallback());
        assert!((grades.graded.result.running_total_pct.unwrap() - 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_grade_courses_keeps_order_and_skips_failures() {
        let mut gradebook = gradebook();
        gradebook.broken.insert(2);
        let config = Config::default();
        let courses = vec![course(2, "Chemistry"), course(1, "Biology"), course(4, "History")];

        let grades = grade_courses(&gradebook, &courses, &options(&config)).await.unwrap();
        let ids: Vec<u64> = grades.iter().map(|g| g.graded.result.course_id).collect();
        assert_eq!(ids, vec![1, 4]);
    }

    #[tokio::test]
    async fn test_grade_courses_all_failed_returns_error() {
        let mut gradebook = gradebook();
        gradebook.broken.insert(1);
        let config = Config::default();

        let err = grade_courses(&gradebook, &[course(1, "Biology")], &options(&config))
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<CanvasError>().is_some());
    }

    #[tokio::test]
    async fn test_fetch_upcoming_sorted() {
        let gradebook = gradebook();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let courses = vec![course(1, "Biology"), course(2, "Chemistry")];

        let items = fetch_upcoming(&gradebook, &courses, now, Duration::days(7)).await.unwrap();
        let names: Vec<&str> = items.iter().map(|i| i.assignment_name.as_str()).collect();
        assert_eq!(names, vec!["A3", "A1"]);
    }
}
