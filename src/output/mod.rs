pub mod csv_export;
pub mod formatter;

pub use csv_export::{export_csv, write_multi, write_single};
pub use formatter::{
    format_assignment_table, format_course_report, format_pct, format_upcoming, format_window,
    should_use_colors, truncate, ABSENT,
};
