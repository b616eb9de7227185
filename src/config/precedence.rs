use anyhow::Result;
use std::collections::BTreeMap;

use super::schema::{Config, CourseKey};
use crate::grading::{FinalPolicy, WeightMap};

pub const ENV_BASE_URL: &str = "CANVAS_BASE_URL";
pub const ENV_TOKEN: &str = "CANVAS_TOKEN";

/// First present candidate wins; candidates are listed highest precedence first.
pub fn first_match<T>(candidates: impl IntoIterator<Item = Option<T>>) -> Option<T> {
    candidates.into_iter().flatten().next()
}

/// Look a course up in a per-course map, accepting textual or numeric keys
pub fn lookup_course<T>(map: &BTreeMap<CourseKey, T>, course_id: u64) -> Option<&T> {
    map.get(&CourseKey::Text(course_id.to_string())).or_else(|| {
        i64::try_from(course_id)
            .ok()
            .and_then(|id| map.get(&CourseKey::Id(id)))
    })
}

/// Explicit weights for a course: CLI, then per-course config, then default
/// config. Empty maps count as absent. `None` means use Canvas weights.
pub fn effective_weights<'a>(
    course_id: u64,
    cli: Option<&'a WeightMap>,
    config: &'a Config,
) -> Option<&'a WeightMap> {
    let usable = |weights: Option<&'a WeightMap>| weights.filter(|w| !w.is_empty());
    first_match([
        usable(cli),
        usable(lookup_course(&config.weights.by_course_id, course_id)),
        usable(config.weights.default.as_ref()),
    ])
}

/// Final policy for a course: CLI, then per-course config, then default
/// config, then `missing_zero_upcoming_ignore`.
pub fn effective_policy(course_id: u64, cli: Option<FinalPolicy>, config: &Config) -> FinalPolicy {
    first_match([
        cli,
        lookup_course(&config.final_policy.by_course_id, course_id).copied(),
        config.final_policy.default,
    ])
    .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanvasAuth {
    pub base_url: String,
    pub token: String,
}

/// Trimmed value of an environment variable, `None` if unset or blank
pub fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(non_blank)
}

/// Resolve Canvas credentials: CLI, then config file, then environment.
///
/// `env` is consulted lazily so tests need not touch the process environment.
pub fn resolve_auth(
    cli_base_url: Option<&str>,
    cli_token: Option<&str>,
    config: &Config,
    env: impl Fn(&str) -> Option<String>,
) -> Result<CanvasAuth> {
    let base_url = first_match([
        cli_base_url.map(str::to_string).and_then(non_blank),
        config.canvas.base_url.clone().and_then(non_blank),
    ])
    .or_else(|| env(ENV_BASE_URL).and_then(non_blank));

    let token = first_match([
        cli_token.map(str::to_string).and_then(non_blank),
        config.canvas.token.clone().and_then(non_blank),
    ])
    .or_else(|| env(ENV_TOKEN).and_then(non_blank));

    match (base_url, token) {
        (Some(base_url), Some(token)) => Ok(CanvasAuth {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }),
        _ => anyhow::bail!(
            "Missing Canvas base URL or token. Pass --base-url/--token, set canvas.base_url/canvas.token \
             in the config file, or export {} and {}",
            ENV_BASE_URL,
            ENV_TOKEN
        ),
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
