use canvas_grades::canvas::{Assignment, AssignmentGroup, Course, Submission};
use canvas_grades::grading::{
    grade_course, normalize_weights, rollup, CategoryResult, FinalPolicy, WeightMap, WeightPlan,
};

const EPS: f64 = 1e-6;

fn course() -> Course {
    Course {
        id: 500,
        name: Some("Scenario Course".to_string()),
    }
}

fn group(id: i64, name: &str, weight: Option<f64>) -> AssignmentGroup {
    AssignmentGroup {
        id,
        name: name.to_string(),
        group_weight: weight,
    }
}

fn assignment(id: u64, group: i64, points: f64, score: Option<f64>, missing: bool) -> Assignment {
    Assignment {
        id,
        name: format!("Assignment {}", id),
        points_possible: Some(points),
        assignment_group_id: Some(group),
        muted: None,
        published: Some(true),
        due_at: None,
        submission: Some(Submission {
            score,
            missing: Some(missing),
            ..Default::default()
        }),
    }
}

fn weights(pairs: &[(&str, f64)]) -> WeightMap {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

fn category(name: &str, weight: f64, running: Option<f64>, fin: Option<f64>) -> CategoryResult {
    CategoryResult {
        group_id: 1,
        group_name: name.to_string(),
        weight_pct: weight,
        running_earned: 0.0,
        running_possible: 0.0,
        running_pct: running,
        final_earned: 0.0,
        final_possible: 0.0,
        final_pct: fin,
    }
}

#[test]
fn test_scenario_a_upcoming_work_is_ignored() {
    let groups = vec![group(1, "Homework", Some(100.0))];
    let assignments = vec![
        assignment(1, 1, 10.0, Some(8.0), false),
        assignment(2, 1, 10.0, None, false),
    ];
    let graded = grade_course(&course(), &assignments, &groups, None, FinalPolicy::MissingZeroUpcomingIgnore);
    let homework = &graded.result.categories[0];

    assert!((homework.running_pct.unwrap() - 80.0).abs() < EPS);
    assert!((homework.final_possible - 10.0).abs() < EPS);
    assert!((homework.final_pct.unwrap() - 80.0).abs() < EPS);
}

#[test]
fn test_scenario_b_missing_work_counts_as_zero() {
    let groups = vec![group(1, "Homework", Some(100.0))];
    let assignments = vec![
        assignment(1, 1, 10.0, Some(8.0), false),
        assignment(2, 1, 10.0, None, true),
    ];
    let graded = grade_course(&course(), &assignments, &groups, None, FinalPolicy::MissingZeroUpcomingIgnore);
    let homework = &graded.result.categories[0];

    assert!((homework.running_pct.unwrap() - 80.0).abs() < EPS);
    assert!((homework.final_pct.unwrap() - 40.0).abs() < EPS);
    assert!((graded.result.final_total_pct.unwrap() - 40.0).abs() < EPS);
}

#[test]
fn test_scenario_c_ungraded_category_leaves_the_denominator() {
    let groups = vec![group(1, "Homework", Some(40.0)), group(2, "Exams", Some(60.0))];
    let assignments = vec![
        assignment(1, 1, 10.0, Some(9.0), false),
        assignment(2, 2, 100.0, None, false),
    ];
    let graded = grade_course(&course(), &assignments, &groups, None, FinalPolicy::MissingZeroUpcomingIgnore);

    let exams = graded
        .result
        .categories
        .iter()
        .find(|c| c.group_name == "Exams")
        .unwrap();
    assert_eq!(exams.running_pct, None);
    assert!((graded.result.running_total_pct.unwrap() - 90.0).abs() < EPS);
}

#[test]
fn test_scenario_d_fractional_canvas_weights_are_scaled() {
    let groups = vec![group(1, "A", Some(0.4)), group(2, "B", Some(0.6))];
    let plan = WeightPlan::from_groups(&groups).unwrap();
    assert!((plan.weight_for("A") - 40.0).abs() < EPS);
    assert!((plan.weight_for("B") - 60.0).abs() < EPS);
}

#[test]
fn test_explicit_weights_always_sum_to_one_hundred() {
    let samples = [
        weights(&[("Homework", 1.0)]),
        weights(&[("Homework", 20.0), ("Exam 1", 25.0), ("Exam 2", 25.0), ("Exam 3", 30.0)]),
        weights(&[("A", 0.1), ("B", 0.2), ("C", 0.3)]),
        weights(&[("A", 1e-9), ("B", 3e9)]),
        weights(&[("A", 0.0), ("B", 7.0)]),
        weights(&[("A", 33.0), ("B", 33.0), ("C", 33.0)]),
    ];
    for sample in &samples {
        let plan = normalize_weights(sample).unwrap();
        assert!((plan.total() - 100.0).abs() < EPS, "{:?} summed to {}", sample, plan.total());
    }
}

#[test]
fn test_resolving_twice_is_bit_identical() {
    let explicit = weights(&[("Homework", 3.0), ("Exams", 7.0), ("Labs", 1.0 / 3.0)]);
    let groups = vec![group(1, "Homework", Some(50.0))];
    let first = WeightPlan::resolve(Some(&explicit), &groups).unwrap();
    let second = WeightPlan::resolve(Some(&explicit), &groups).unwrap();
    for (name, weight) in first.sorted_by_name() {
        assert_eq!(weight.to_bits(), second.weight_for(name).to_bits());
    }
    assert_eq!(first, second);
}

#[test]
fn test_totals_stay_within_percentage_bounds() {
    let percentages = [None, Some(0.0), Some(12.5), Some(50.0), Some(99.9), Some(100.0)];
    let weight_sets = [[10.0, 90.0], [50.0, 50.0], [1.0, 1e-3]];

    for w in weight_sets {
        for a in percentages {
            for b in percentages {
                let categories = vec![category("A", w[0], a, b), category("B", w[1], b, a)];
                let (running, fin) = rollup(&categories);
                for total in [running, fin].into_iter().flatten() {
                    assert!(
                        (-EPS..=100.0 + EPS).contains(&total),
                        "total {} out of range for {:?}/{:?} at {:?}",
                        total,
                        a,
                        b,
                        w
                    );
                }
            }
        }
    }
}

#[test]
fn test_stricter_policies_never_raise_the_final_estimate() {
    let groups = vec![group(1, "Homework", Some(100.0))];
    let assignments = vec![
        assignment(1, 1, 10.0, Some(9.0), false),
        assignment(2, 1, 20.0, Some(15.0), false),
        assignment(3, 1, 10.0, None, true),
        assignment(4, 1, 5.0, None, false),
    ];

    let final_for = |policy| {
        let graded = grade_course(&course(), &assignments, &groups, None, policy);
        graded.result.categories[0].final_pct.unwrap()
    };

    let ignore_all = final_for(FinalPolicy::IgnoreAll);
    let missing_zero = final_for(FinalPolicy::MissingZeroUpcomingIgnore);
    let all_zero = final_for(FinalPolicy::AllZero);

    assert!(missing_zero <= ignore_all + EPS);
    assert!(all_zero <= missing_zero + EPS);
    assert!((ignore_all - 24.0 / 30.0 * 100.0).abs() < EPS);
    assert!((missing_zero - 24.0 / 40.0 * 100.0).abs() < EPS);
    assert!((all_zero - 24.0 / 45.0 * 100.0).abs() < EPS);
}

#[test]
fn test_no_graded_work_is_absent_not_zero() {
    let groups = vec![group(1, "Homework", Some(100.0))];
    let assignments = vec![assignment(1, 1, 10.0, None, false)];
    let graded = grade_course(&course(), &assignments, &groups, None, FinalPolicy::IgnoreAll);

    assert_eq!(graded.result.categories[0].running_pct, None);
    assert_eq!(graded.result.running_total_pct, None);
    assert_eq!(graded.result.final_total_pct, None);
}

#[test]
fn test_explicit_weights_override_canvas() {
    let groups = vec![group(1, "Homework", Some(90.0)), group(2, "Exams", Some(10.0))];
    let assignments = vec![
        assignment(1, 1, 10.0, Some(10.0), false),
        assignment(2, 2, 10.0, Some(5.0), false),
    ];
    let explicit = weights(&[("Homework", 1.0), ("Exams", 1.0)]);
    let graded = grade_course(&course(), &assignments, &groups, Some(&explicit), FinalPolicy::IgnoreAll);

    assert!((graded.result.running_total_pct.unwrap() - 75.0).abs() < EPS);
}
