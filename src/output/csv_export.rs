use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::grading::{CategoryResult, CourseResult};

fn two_places(value: f64) -> String {
    format!("{:.2}", value)
}

/// Two decimals, or an empty cell when absent
fn optional_pct(value: Option<f64>) -> String {
    value.map(two_places).unwrap_or_default()
}

fn category_cells(category: &CategoryResult) -> [String; 8] {
    [
        category.group_name.clone(),
        two_places(category.weight_pct),
        two_places(category.running_earned),
        two_places(category.running_possible),
        optional_pct(category.running_pct),
        two_places(category.final_earned),
        two_places(category.final_possible),
        optional_pct(category.final_pct),
    ]
}

/// One course as labelled sections: header, category table, totals.
pub fn write_single<W: Write>(writer: W, result: &CourseResult) -> Result<()> {
    let mut csv = csv::WriterBuilder::new().flexible(true).from_writer(writer);

    csv.write_record(["Course", result.course_name.as_deref().unwrap_or("")])?;
    csv.write_record(["Course ID".to_string(), result.course_id.to_string()])?;
    csv.write_record(["Final Policy", result.policy.as_str()])?;
    csv.write_record(None::<&[u8]>)?;
    csv.write_record([
        "Category",
        "Weight %",
        "Run Earned",
        "Run Possible",
        "Run %",
        "Final Earned",
        "Final Possible",
        "Final %",
    ])?;
    for category in &result.categories {
        csv.write_record(category_cells(category))?;
    }
    csv.write_record(None::<&[u8]>)?;
    csv.write_record(["Running Total %".to_string(), optional_pct(result.running_total_pct)])?;
    csv.write_record(["Final Total %".to_string(), optional_pct(result.final_total_pct)])?;

    csv.flush().context("Failed to flush CSV output")?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct MultiCourseRow<'a> {
    #[serde(rename = "Course")]
    course: &'a str,
    #[serde(rename = "Course ID")]
    course_id: u64,
    #[serde(rename = "Category")]
    category: &'a str,
    #[serde(rename = "Weight %")]
    weight: String,
    #[serde(rename = "Run Earned")]
    running_earned: String,
    #[serde(rename = "Run Possible")]
    running_possible: String,
    #[serde(rename = "Run %")]
    running_pct: String,
    #[serde(rename = "Final Earned")]
    final_earned: String,
    #[serde(rename = "Final Possible")]
    final_possible: String,
    #[serde(rename = "Final %")]
    final_pct: String,
    #[serde(rename = "Running Total %")]
    running_total: String,
    #[serde(rename = "Final Total %")]
    final_total: String,
    #[serde(rename = "Policy")]
    policy: &'static str,
}

/// Every course flattened to one row per category, totals repeated per row.
pub fn write_multi<W: Write>(writer: W, results: &[CourseResult]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);

    if results.iter().all(|r| r.categories.is_empty()) {
        // serde only emits the header alongside the first row
        csv.write_record([
            "Course",
            "Course ID",
            "Category",
            "Weight %",
            "Run Earned",
            "Run Possible",
            "Run %",
            "Final Earned",
            "Final Possible",
            "Final %",
            "Running Total %",
            "Final Total %",
            "Policy",
        ])?;
    }

    for result in results {
        for category in &result.categories {
            csv.serialize(MultiCourseRow {
                course: result.course_name.as_deref().unwrap_or(""),
                course_id: result.course_id,
                category: &category.group_name,
                weight: two_places(category.weight_pct),
                running_earned: two_places(category.running_earned),
                running_possible: two_places(category.running_possible),
                running_pct: optional_pct(category.running_pct),
                final_earned: two_places(category.final_earned),
                final_possible: two_places(category.final_possible),
                final_pct: optional_pct(category.final_pct),
                running_total: optional_pct(result.running_total_pct),
                final_total: optional_pct(result.final_total_pct),
                policy: result.policy.as_str(),
            })?;
        }
    }

    csv.flush().context("Failed to flush CSV output")?;
    Ok(())
}

/// Write results to `path`: the sectioned layout for exactly one course,
/// the flat layout otherwise.
pub fn export_csv(path: &Path, results: &[CourseResult]) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create CSV file at {}", path.display()))?;

    match results {
        [single] => write_single(file, single),
        many => write_multi(file, many),
    }
    .with_context(|| format!("Failed to write CSV to {}", path.display()))
}
