use anyhow::Context;
use clap::{ArgGroup, Args, Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

use canvas_grades::canvas::{CanvasClient, CanvasError};
use canvas_grades::config::{self, Config, Exclusions};
use canvas_grades::fetch::{self, CourseGrades, GradeOptions};
use canvas_grades::grading::{CourseResult, FinalPolicy, WeightMap};
use canvas_grades::output;
use canvas_grades::selection::{select_by_name, SelectionError};

const EXIT_SUCCESS: i32 = 0;
const EXIT_AUTH: i32 = 1;
const EXIT_NETWORK: i32 = 2;
const EXIT_CONFIG: i32 = 4;
const EXIT_SELECTION: i32 = 5;

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compute running and estimated final grades
    Grades(GradesArgs),
    /// List assignments due soon across your courses
    Week {
        /// How far ahead to look (e.g. 7d, 36h, 2weeks)
        #[arg(long, default_value = "7d", value_parser = humantime::parse_duration)]
        within: Duration,
    },
    /// Interactively create a config file
    Init {
        /// Where to write the config file
        #[arg(long, default_value = config::LOCAL_CONFIG_FILE)]
        out: PathBuf,
    },
}

#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("selection")
        .required(true)
        .args(["course_id", "course_name", "all_courses"]),
))]
struct GradesArgs {
    /// Single course id to grade
    #[arg(long)]
    course_id: Option<u64>,

    /// Pick a course by case-insensitive substring of its name
    #[arg(long)]
    course_name: Option<String>,

    /// Grade every enrolled course
    #[arg(long)]
    all_courses: bool,

    /// JSON object of category name to weight, e.g. '{"Homework":40,"Exams":60}'
    #[arg(long, conflicts_with = "weights_file")]
    weights: Option<String>,

    /// YAML or JSON file mapping category name to weight
    #[arg(long)]
    weights_file: Option<PathBuf>,

    /// How ungraded work counts toward the final estimate
    #[arg(long, value_enum)]
    final_policy: Option<FinalPolicy>,

    /// Print every assignment and its submission status
    #[arg(long)]
    show_assignments: bool,

    /// Export results to a CSV file
    #[arg(long)]
    csv: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(name = "canvas-grades")]
#[command(about = "Canvas LMS grade calculator", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ./config.yaml, then ~/.config/canvas-grades/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Canvas base URL (e.g. https://school.instructure.com)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Canvas API token
    #[arg(long, global = true)]
    token: Option<String>,

    /// Also consider completed courses
    #[arg(long, global = true)]
    include_completed: bool,

    /// Comma-separated course ids to skip (e.g. '101,202,303')
    #[arg(long, global = true)]
    exclude_course_ids: Option<String>,

    /// Skip courses whose name contains this text (case-insensitive); repeatable
    #[arg(long, global = true)]
    exclude_name_contains: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

fn init_logging(verbose: bool) {
    let default_directives = if verbose {
        "warn,canvas_grades=debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();
}

/// Map a failure to the process exit code
fn exit_code_for(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if cause.downcast_ref::<SelectionError>().is_some() {
            return EXIT_SELECTION;
        }
        if let Some(canvas) = cause.downcast_ref::<CanvasError>() {
            return match canvas {
                CanvasError::Unauthorized => EXIT_AUTH,
                _ => EXIT_NETWORK,
            };
        }
    }
    EXIT_CONFIG
}

fn report_failure(err: &anyhow::Error) -> ! {
    eprintln!("Error: {:#}", err);
    if let Some(SelectionError::Ambiguous { matches, .. }) = err.downcast_ref::<SelectionError>() {
        for course in matches {
            eprintln!("  - {}", course);
        }
    }
    std::process::exit(exit_code_for(err));
}

/// Explicit weights from `--weights` or `--weights-file`, validated
fn load_cli_weights(args: &GradesArgs) -> anyhow::Result<Option<WeightMap>> {
    let weights = match (&args.weights, &args.weights_file) {
        (Some(raw), _) => config::parse_weights_json(raw)?,
        (None, Some(path)) => config::load_weights_file(path)?,
        (None, None) => return Ok(None),
    };

    let mut errors = Vec::new();
    config::validate_weight_map("--weights", &weights, &mut errors);
    if !errors.is_empty() {
        anyhow::bail!("Invalid weights: {}", errors.join("; "));
    }
    Ok(Some(weights))
}

async fn run_grades(
    client: &CanvasClient,
    config: &Config,
    exclusions: &Exclusions,
    include_completed: bool,
    args: GradesArgs,
) -> anyhow::Result<()> {
    let cli_weights = load_cli_weights(&args)?;
    let options = GradeOptions {
        config,
        cli_weights: cli_weights.as_ref(),
        cli_policy: args.final_policy,
    };

    let grades: Vec<CourseGrades> = if let Some(course_id) = args.course_id {
        if exclusions.excludes_id(course_id) {
            println!("Course {} excluded", course_id);
            return Ok(());
        }
        vec![fetch::grade_course_by_id(client, course_id, &options).await?]
    } else {
        let courses = fetch::list_candidate_courses(client, include_completed, exclusions).await?;
        match &args.course_name {
            Some(query) => {
                let course = select_by_name(&courses, query)?;
                vec![fetch::grade_listed_course(client, course, &options).await?]
            }
            None => {
                if courses.is_empty() {
                    println!("No courses found.");
                    return Ok(());
                }
                fetch::grade_courses(client, &courses, &options).await?
            }
        }
    };

    let use_colors = output::should_use_colors();
    for course in &grades {
        println!("{}", output::format_course_report(&course.graded, use_colors));
        if args.show_assignments {
            println!("{}", output::format_assignment_table(&course.assignments));
        }
    }

    if let Some(path) = &args.csv {
        let results: Vec<CourseResult> = grades.iter().map(|g| g.graded.result.clone()).collect();
        output::export_csv(path, &results)?;
        println!();
        println!("CSV written to {}", path.display());
    }

    Ok(())
}

async fn run_week(
    client: &CanvasClient,
    exclusions: &Exclusions,
    include_completed: bool,
    within: Duration,
) -> anyhow::Result<()> {
    let window = chrono::Duration::from_std(within).context("--within is too large")?;
    let courses = fetch::list_candidate_courses(client, include_completed, exclusions).await?;
    let items = fetch::fetch_upcoming(client, &courses, chrono::Utc::now(), window).await?;
    println!("{}", output::format_upcoming(&items, within));
    Ok(())
}

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let start_time = Instant::now();

    if let Commands::Init { out } = &cli.command {
        if let Err(e) = config::init::run_init_wizard(out) {
            eprintln!("Init failed: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
        std::process::exit(EXIT_SUCCESS);
    }

    let config = match config::load_config(cli.config.clone()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    if let Err(errors) = config::validate_config(&config) {
        eprintln!("Config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        std::process::exit(EXIT_CONFIG);
    }

    let exclusions = Exclusions::build(
        &config.exclusions,
        cli.exclude_course_ids.as_deref(),
        &cli.exclude_name_contains,
    );

    let auth = match config::resolve_auth(
        cli.base_url.as_deref(),
        cli.token.as_deref(),
        &config,
        config::env_var,
    ) {
        Ok(auth) => auth,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(EXIT_AUTH);
        }
    };
    info!(base_url = %auth.base_url, "Using Canvas instance");

    let client = match CanvasClient::new(&auth.base_url, &auth.token) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to create Canvas client: {:#}", e);
            std::process::exit(EXIT_NETWORK);
        }
    };

    let outcome = match cli.command {
        Commands::Grades(args) => {
            run_grades(&client, &config, &exclusions, cli.include_completed, args).await
        }
        Commands::Week { within } => {
            run_week(&client, &exclusions, cli.include_completed, within).await
        }
        Commands::Init { .. } => Ok(()),
    };

    if let Err(e) = outcome {
        report_failure(&e);
    }

    info!(elapsed = ?start_time.elapsed(), "Done");
    std::process::exit(EXIT_SUCCESS);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_grades_requires_one_selection() {
        assert!(Cli::try_parse_from(["canvas-grades", "grades"]).is_err());
        assert!(Cli::try_parse_from(["canvas-grades", "grades", "--course-id", "1", "--all-courses"]).is_err());
        assert!(Cli::try_parse_from(["canvas-grades", "grades", "--all-courses"]).is_ok());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "canvas-grades",
            "grades",
            "--course-name",
            "bio",
            "--include-completed",
            "--exclude-name-contains",
            "orientation",
            "--exclude-name-contains",
            "sandbox",
            "--final-policy",
            "all_zero",
        ])
        .unwrap();
        assert!(cli.include_completed);
        assert_eq!(cli.exclude_name_contains.len(), 2);
        match cli.command {
            Commands::Grades(args) => assert_eq!(args.final_policy, Some(FinalPolicy::AllZero)),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_week_window_parses() {
        let cli = Cli::try_parse_from(["canvas-grades", "week", "--within", "36h"]).unwrap();
        match cli.command {
            Commands::Week { within } => assert_eq!(within, Duration::from_secs(36 * 3600)),
            other => panic!("unexpected command: {:?}", other),
        }
        let cli = Cli::try_parse_from(["canvas-grades", "week"]).unwrap();
        match cli.command {
            Commands::Week { within } => assert_eq!(within, Duration::from_secs(7 * 86_400)),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_exit_codes() {
        let selection: anyhow::Error = SelectionError::NoMatch {
            query: "bio".to_string(),
        }
        .into();
        assert_eq!(exit_code_for(&selection), EXIT_SELECTION);

        let auth = anyhow::Error::from(CanvasError::Unauthorized).context("Failed to list active courses");
        assert_eq!(exit_code_for(&auth), EXIT_AUTH);

        let network: anyhow::Error = CanvasError::Status {
            status: 503,
            url: "https://x/api/v1/courses".to_string(),
            body: String::new(),
        }
        .into();
        assert_eq!(exit_code_for(&network), EXIT_NETWORK);

        assert_eq!(exit_code_for(&anyhow::anyhow!("bad weights")), EXIT_CONFIG);
    }
}
