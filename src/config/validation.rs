use super::schema::{Config, CourseKey};
use crate::grading::WeightMap;

/// Validate configuration at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_config(config: &Config) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if let Some(ref base_url) = config.canvas.base_url {
        let trimmed = base_url.trim();
        if !trimmed.is_empty() && !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
            errors.push(format!(
                "canvas.base_url: '{}' must start with http:// or https://",
                base_url
            ));
        }
    }

    if let Some(ref weights) = config.weights.default {
        validate_weight_map("weights.default", weights, &mut errors);
    }

    for (key, weights) in &config.weights.by_course_id {
        check_course_key("weights.by_course_id", key, &mut errors);
        validate_weight_map(&format!("weights.by_course_id[{}]", key), weights, &mut errors);
    }

    for key in config.final_policy.by_course_id.keys() {
        check_course_key("final_policy.by_course_id", key, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check one name → weight map. Empty maps are valid (they mean "not set").
pub fn validate_weight_map(label: &str, weights: &WeightMap, errors: &mut Vec<String>) {
    if weights.is_empty() {
        return;
    }

    let mut entries_ok = true;
    for (name, weight) in weights {
        if !weight.is_finite() {
            errors.push(format!("{}['{}']: weight must be a finite number", label, name));
            entries_ok = false;
        } else if *weight < 0.0 {
            errors.push(format!("{}['{}']: weight must be non-negative, got {}", label, name, weight));
            entries_ok = false;
        }
    }

    if entries_ok {
        let total: f64 = weights.values().sum();
        if total <= 0.0 {
            errors.push(format!("{}: weights must sum to a positive total", label));
        }
    }
}

fn check_course_key(label: &str, key: &CourseKey, errors: &mut Vec<String>) {
    if key.as_id().is_none() {
        errors.push(format!("{}: course id '{}' is not an integer", label, key));
    }
}
