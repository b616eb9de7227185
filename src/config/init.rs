use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use std::io::{BufRead, Write};
use std::path::Path;

use super::exclusions::parse_id_list;
use super::precedence::{ENV_BASE_URL, ENV_TOKEN};
use super::schema::{CanvasConfig, Config, CourseKey, ExclusionsConfig, PolicyConfig, WeightsConfig};
use crate::grading::{FinalPolicy, WeightMap};

pub const DEFAULT_BASE_URL: &str = "https://school.instructure.com";

/// Line-oriented prompts over any reader/writer pair.
pub struct Prompter<R, W> {
    input: R,
    output: W,
    hide_secrets: bool,
}

impl Prompter<std::io::StdinLock<'static>, std::io::Stdout> {
    /// Prompts on the terminal; secrets are read without echo.
    pub fn stdio() -> Self {
        Prompter {
            input: std::io::stdin().lock(),
            output: std::io::stdout(),
            hide_secrets: true,
        }
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Prompter {
            input,
            output,
            hide_secrets: false,
        }
    }

    fn say(&mut self, line: &str) -> Result<()> {
        writeln!(self.output, "{}", line).context("Failed to write output")
    }

    /// Prompt user with a message and return their trimmed input.
    /// End of input reads as an empty answer.
    fn prompt(&mut self, message: &str) -> Result<String> {
        write!(self.output, "{}", message).context("Failed to write output")?;
        self.output.flush().context("Failed to flush stdout")?;
        let mut input = String::new();
        self.input
            .read_line(&mut input)
            .context("Failed to read input")?;
        Ok(input.trim().to_string())
    }

    /// Prompt user with a message and a default value. Returns default if input is empty.
    fn prompt_with_default(&mut self, message: &str, default: &str) -> Result<String> {
        let message = if default.is_empty() {
            format!("{}: ", message)
        } else {
            format!("{} [{}]: ", message, default)
        };
        let input = self.prompt(&message)?;
        if input.is_empty() {
            Ok(default.to_string())
        } else {
            Ok(input)
        }
    }

    /// Prompt user with a yes/no question. Returns bool based on input and default.
    fn prompt_yes_no(&mut self, message: &str, default_yes: bool) -> Result<bool> {
        let hint = if default_yes { "Y/n" } else { "y/N" };
        let input = self.prompt(&format!("{} [{}]: ", message, hint))?.to_lowercase();
        if input.is_empty() {
            Ok(default_yes)
        } else {
            Ok(input == "y" || input == "yes")
        }
    }

    fn prompt_secret(&mut self, message: &str) -> Result<String> {
        if self.hide_secrets {
            let secret = rpassword::prompt_password(message).context("Failed to read token")?;
            Ok(secret.trim().to_string())
        } else {
            self.prompt(message)
        }
    }

    /// Category name / weight pairs until a blank name.
    fn collect_weights(&mut self, kind: &str) -> Result<WeightMap> {
        self.say("")?;
        self.say(&format!(
            "Enter {} weights (blank name to stop). Raw numbers or percents both work; they are normalized to 100%.",
            kind
        ))?;
        let mut weights = WeightMap::new();
        loop {
            let name = self.prompt("  Category name: ")?;
            if name.is_empty() {
                break;
            }
            let raw = self.prompt("  Weight (number or %): ")?;
            match raw.trim_end_matches('%').trim().parse::<f64>() {
                Ok(weight) if weight.is_finite() && weight >= 0.0 => {
                    weights.insert(name, weight);
                }
                _ => self.say("    Invalid number; try again.")?,
            }
        }
        Ok(weights)
    }

    /// A course id, `None` on a blank answer. Re-asks on non-integers.
    fn prompt_course_id(&mut self) -> Result<Option<u64>> {
        loop {
            let raw = self.prompt("  Course ID: ")?;
            if raw.is_empty() {
                return Ok(None);
            }
            match raw.parse::<u64>() {
                Ok(id) => return Ok(Some(id)),
                Err(_) => self.say("    Course ID must be an integer; try again.")?,
            }
        }
    }
}

/// Walk through every config section and return the assembled config.
///
/// `env` supplies defaults for the Canvas connection.
pub fn collect_config<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Config> {
    prompter.say("")?;
    prompter.say("=== Canvas connection ===")?;
    let default_url = env(ENV_BASE_URL).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let base_url = prompter.prompt_with_default("Canvas base URL", &default_url)?;
    let token = prompter.prompt_secret("Canvas API token (input hidden): ")?;
    let token = Some(token)
        .filter(|t| !t.is_empty())
        .or_else(|| env(ENV_TOKEN));

    prompter.say("")?;
    prompter.say("=== Exclusions ===")?;
    let raw_ids = prompter.prompt_with_default("Exclude course IDs (comma-separated)", "")?;
    let (ids, rejected) = parse_id_list(&raw_ids);
    for value in rejected {
        prompter.say(&format!("  Skipping non-integer: {}", value))?;
    }
    let mut name_contains = Vec::new();
    loop {
        let needle =
            prompter.prompt_with_default("Exclude courses whose NAME contains (blank to stop)", "")?;
        if needle.is_empty() {
            break;
        }
        name_contains.push(needle);
    }

    prompter.say("")?;
    prompter.say("=== Weights ===")?;
    let default_weights = prompter.collect_weights("DEFAULT")?;
    prompter.say("")?;
    prompter.say("Add per-course weight overrides (blank Course ID to stop).")?;
    let mut weights_by_course = std::collections::BTreeMap::new();
    while let Some(course_id) = prompter.prompt_course_id()? {
        prompter.say(&format!("  Enter weights for course {} ...", course_id))?;
        let weights = prompter.collect_weights("course-specific")?;
        if !weights.is_empty() {
            weights_by_course.insert(CourseKey::from(course_id), weights);
        }
    }

    prompter.say("")?;
    prompter.say("=== Final policy ===")?;
    prompter.say(&format!("Options: {}", FinalPolicy::names()))?;
    let default_policy = loop {
        let raw = prompter.prompt_with_default(
            "Default final policy",
            FinalPolicy::default().as_str(),
        )?;
        match raw.parse::<FinalPolicy>() {
            Ok(policy) => break policy,
            Err(e) => prompter.say(&format!("  Invalid: {}. Try again.", e))?,
        }
    };
    prompter.say("")?;
    prompter.say("Add per-course final policy overrides (blank Course ID to stop).")?;
    let mut policy_by_course = std::collections::BTreeMap::new();
    while let Some(course_id) = prompter.prompt_course_id()? {
        let raw = prompter.prompt("  Final policy: ")?;
        match raw.parse::<FinalPolicy>() {
            Ok(policy) => {
                policy_by_course.insert(CourseKey::from(course_id), policy);
            }
            Err(e) => prompter.say(&format!("    Invalid: {}", e))?,
        }
    }

    Ok(Config {
        canvas: CanvasConfig {
            base_url: Some(base_url),
            token,
        },
        exclusions: ExclusionsConfig {
            ids: ids.into_iter().map(CourseKey::from).collect(),
            name_contains,
        },
        weights: WeightsConfig {
            default: Some(default_weights).filter(|w| !w.is_empty()),
            by_course_id: weights_by_course,
        },
        final_policy: PolicyConfig {
            default: Some(default_policy),
            by_course_id: policy_by_course,
        },
    })
}

/// Serialize a config as YAML and replace `path` atomically
pub fn write_config(config: &Config, path: &Path) -> Result<()> {
    let yaml = serde_saphyr::to_string(config)
        .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;
    file.write_all(yaml.as_bytes())
        .with_context(|| format!("Failed to write config to {}", path.display()))?;
    file.commit()
        .with_context(|| format!("Failed to write config to {}", path.display()))?;
    Ok(())
}

/// Run the wizard against `prompter`, writing to `out`.
///
/// Returns false when the user declined to overwrite an existing file.
pub fn run_wizard<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    out: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<bool> {
    if out.exists() {
        let overwrite = prompter.prompt_yes_no(
            &format!("Config already exists at {}. Overwrite?", out.display()),
            false,
        )?;
        if !overwrite {
            prompter.say("Aborted.")?;
            return Ok(false);
        }
    }

    let config = collect_config(prompter, &env)?;
    write_config(&config, out)?;

    let base_url = config.canvas.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
    let out = out.display();
    let next_steps = [
        String::new(),
        format!("Wrote {}", out),
        String::new(),
        "Next steps:".to_string(),
        "  1) (Optional) keep the token out of the file by exporting it instead:".to_string(),
        format!("     export {}=\"{}\"", ENV_BASE_URL, base_url),
        format!("     export {}=\"<your token>\"", ENV_TOKEN),
        "  2) Run the grade calculator:".to_string(),
        format!("     canvas-grades --config {} grades --all-courses", out),
        format!("     canvas-grades --config {} --include-completed grades --all-courses", out),
        format!("     canvas-grades --config {} grades --course-id 12345", out),
        format!(
            "     canvas-grades --config {} grades --course-id 210272 --weights '{{\"Homework\":20, \"Exam 1\":25, \"Exam 2\":25, \"Exam 3\":30}}' --final-policy all_zero",
            out
        ),
        format!("     canvas-grades --config {} week", out),
    ];
    for line in next_steps {
        prompter.say(&line)?;
    }
    Ok(true)
}

/// Run the interactive init wizard on the terminal.
pub fn run_init_wizard(out: &Path) -> Result<()> {
    let mut prompter = Prompter::stdio();
    run_wizard(&mut prompter, out, super::precedence::env_var)?;
    Ok(())
}
