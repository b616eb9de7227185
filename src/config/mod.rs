mod exclusions;
pub mod init;
mod precedence;
mod schema;
mod validation;

pub use exclusions::{parse_id_list, Exclusions};
pub use precedence::{
    effective_policy, effective_weights, env_var, first_match, lookup_course, resolve_auth,
    CanvasAuth, ENV_BASE_URL, ENV_TOKEN,
};
pub use schema::{CanvasConfig, Config, CourseKey, ExclusionsConfig, PolicyConfig, WeightsConfig};
pub use validation::{validate_config, validate_weight_map};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

use crate::grading::WeightMap;

/// Config file picked up from the working directory
pub const LOCAL_CONFIG_FILE: &str = "config.yaml";

/// Get the config directory path (~/.config/canvas-grades/)
pub fn get_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("canvas-grades"))
}

/// Get the default config file path (~/.config/canvas-grades/config.yaml)
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join("config.yaml"))
}

/// Decide which config file to read.
///
/// An explicit path must exist. Otherwise `./config.yaml` wins over the
/// per-user file; `None` means run without a config file.
pub fn resolve_config_path(explicit: Option<PathBuf>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.exists() {
            anyhow::bail!("Config file not found at {}", path.display());
        }
        return Ok(Some(path));
    }

    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Ok(Some(local));
    }

    Ok(get_config_path().filter(|path| path.exists()))
}

/// Load configuration, falling back to an empty one when no file is found.
///
/// # Errors
///
/// Returns an error if:
/// - An explicit config path does not exist
/// - The config file cannot be read
/// - The YAML or JSON cannot be parsed
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    match resolve_config_path(path)? {
        Some(config_path) => read_structured(&config_path),
        None => Ok(Config::default()),
    }
}

/// Load a name → weight map for `--weights-file`
pub fn load_weights_file(path: &Path) -> Result<WeightMap> {
    if !path.exists() {
        anyhow::bail!("Weights file not found at {}", path.display());
    }
    read_structured(path)
}

/// Parse a name → weight map given inline as JSON (`--weights`)
pub fn parse_weights_json(raw: &str) -> Result<WeightMap> {
    serde_json::from_str(raw)
        .context("Failed to parse --weights: expected a JSON object of category name to number")
}

/// Whether a path should be read as YAML rather than JSON
pub fn is_yaml_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
}

fn read_structured<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    if is_yaml_path(path) {
        serde_saphyr::from_str(&content)
            .with_context(|| format!("Failed to parse config: invalid YAML in {}", path.display()))
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: invalid JSON in {}", path.display()))
    }
}
