use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::time::Duration;

use crate::canvas::{Assignment, Submission};
use crate::grading::{GradedCourse, WeightSource};
use crate::upcoming::UpcomingItem;

/// Placeholder for a percentage that has nothing to be computed from
pub const ABSENT: &str = "—";

const RULE_WIDTH: usize = 86;
const NAME_WIDTH: usize = 30;

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// `84.00%`, or the absent placeholder
pub fn format_pct(pct: Option<f64>) -> String {
    match pct {
        Some(pct) => format!("{:.2}%", pct),
        None => ABSENT.to_string(),
    }
}

/// Truncate text to `max_width` characters, accounting for Unicode
pub fn truncate(text: &str, max_width: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_width {
        text.to_string()
    } else if max_width > 3 {
        format!("{}...", chars[..max_width - 3].iter().collect::<String>())
    } else {
        chars[..max_width].iter().collect()
    }
}

/// "7 days", "1 day", otherwise humantime's rendering ("1day 12h", "2h 30m")
pub fn format_window(window: Duration) -> String {
    let secs = window.as_secs();
    let day = 24 * 60 * 60;
    if secs > 0 && secs % day == 0 && window.subsec_nanos() == 0 {
        let days = secs / day;
        if days == 1 {
            "1 day".to_string()
        } else {
            format!("{} days", days)
        }
    } else {
        humantime::format_duration(window).to_string()
    }
}

/// Console report for one graded course: weights, category table, totals.
pub fn format_course_report(graded: &GradedCourse, use_colors: bool) -> String {
    let result = &graded.result;
    let mut lines = Vec::new();

    let header = format!(
        "=== {} (ID {}) ===",
        result.course_name.as_deref().unwrap_or(""),
        result.course_id
    );
    lines.push(String::new());
    lines.push(if use_colors {
        header.bold().to_string()
    } else {
        header
    });

    match &graded.weight_source {
        WeightSource::EqualFallback(reason) => {
            let label = format!("Weights (equal fallback: {}):", reason);
            lines.push(if use_colors {
                label.yellow().to_string()
            } else {
                label
            });
        }
        WeightSource::Explicit | WeightSource::Canvas => lines.push("Weights:".to_string()),
    }
    for (name, weight) in graded.weights.sorted_by_name() {
        lines.push(format!("  - {}: {:.2}%", name, weight));
    }

    lines.push(format!(
        "{:<30} {:>7} {:>10} {:>10} {:>12} {:>10}",
        "Category", "Weight", "Run Earn", "Run Poss", "Run %", "Final %"
    ));
    lines.push("-".repeat(RULE_WIDTH));
    for category in &result.categories {
        lines.push(format!(
            "{:<30} {:>7} {:>10.2} {:>10.2} {:>12} {:>10}",
            truncate(&category.group_name, NAME_WIDTH),
            format!("{:.2}%", category.weight_pct),
            category.running_earned,
            category.running_possible,
            format_pct(category.running_pct),
            format_pct(category.final_pct),
        ));
    }
    lines.push("-".repeat(RULE_WIDTH));

    let running = format_pct(result.running_total_pct);
    let fin = format_pct(result.final_total_pct);
    if use_colors {
        lines.push(format!("Running total: {}", running.bold()));
        lines.push(format!("Final estimate: {}  (policy: {})", fin.bold(), result.policy.dimmed()));
    } else {
        lines.push(format!("Running total: {}", running));
        lines.push(format!("Final estimate: {}  (policy: {})", fin, result.policy));
    }

    lines.join("\n")
}

/// Every assignment of a course with its submission status, ordered by
/// group id then due date (undated last).
pub fn format_assignment_table(assignments: &[Assignment]) -> String {
    let mut sorted: Vec<&Assignment> = assignments.iter().collect();
    sorted.sort_by(|a, b| {
        a.assignment_group_id
            .unwrap_or(-1)
            .cmp(&b.assignment_group_id.unwrap_or(-1))
            .then_with(|| {
                let a_due = a.due_at.as_deref().unwrap_or("9999");
                let b_due = b.due_at.as_deref().unwrap_or("9999");
                a_due.cmp(b_due)
            })
    });

    let mut lines = vec![
        String::new(),
        "Assignments:".to_string(),
        String::new(),
        format!(
            "{:<8} {:<36} {:<20} {:>7} {:>7} {:>8} {:>8}",
            "GroupID", "Assignment", "Due", "Pts", "Score", "Missing", "Excused"
        ),
        "-".repeat(110),
    ];

    let no_submission = Submission::default();
    for assignment in sorted {
        let submission = assignment.submission.as_ref().unwrap_or(&no_submission);
        let score = submission
            .score
            .map(|s| format!("{:.2}", s))
            .unwrap_or_default();
        lines.push(format!(
            "{:<8} {:<36} {:<20} {:>7.2} {:>7} {:>8} {:>8}",
            assignment.assignment_group_id.unwrap_or(-1),
            truncate(&assignment.name, 36),
            assignment.due_at.as_deref().unwrap_or("-"),
            assignment.points(),
            score,
            assignment.is_missing(),
            assignment.is_excused(),
        ));
    }

    lines.join("\n")
}

/// Table of upcoming work, or a one-line notice when there is none.
pub fn format_upcoming(items: &[UpcomingItem], window: Duration) -> String {
    if items.is_empty() {
        return format!("No assignments due in the next {}.", format_window(window));
    }

    let mut lines = vec![
        format!(
            "{:<21}| {:<30} | {:<32} | {:>4}",
            "Due (UTC)", "Course", "Assignment", "Pts"
        ),
        "-".repeat(90),
    ];
    for item in items {
        lines.push(format!(
            "{:<21}| {:<30} | {:<32} | {:>4.0}",
            item.due.format("%Y-%m-%d %H:%M").to_string(),
            truncate(&item.course_name, 30),
            truncate(&item.assignment_name, 32),
            item.points_possible,
        ));
    }
    lines.join("\n")
}
