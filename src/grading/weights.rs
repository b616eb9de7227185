use serde::Serialize;
use std::collections::BTreeMap;

use crate::canvas::types::AssignmentGroup;

/// Raw category weights keyed by category name, as written by a user or
/// reported by Canvas. Values need not sum to anything in particular.
pub type WeightMap = BTreeMap<String, f64>;

/// Canvas weight totals at or below this are read as fractions (0.4 = 40%)
const FRACTION_TOTAL_CEILING: f64 = 1.001;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeightError {
    #[error("Sum of weights must be > 0 (got {0})")]
    NonPositiveTotal(f64),

    #[error("No weights provided and course does not have weighted assignment groups in Canvas")]
    NoSourceWeights,
}

/// Normalized weight percentage per category name. Sums to 100 whenever
/// non-empty.
///
/// Categories are matched by name, so two groups sharing a name share one
/// weight.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeightPlan {
    by_name: BTreeMap<String, f64>,
}

/// Rescale raw weights so they sum to 100.
pub fn normalize_weights(weights: &WeightMap) -> Result<WeightPlan, WeightError> {
    let total: f64 = weights.values().sum();
    // NaN fails this check too
    if !(total > 0.0) {
        return Err(WeightError::NonPositiveTotal(total));
    }
    let by_name = weights
        .iter()
        .map(|(name, w)| (name.clone(), w / total * 100.0))
        .collect();
    Ok(WeightPlan { by_name })
}

impl WeightPlan {
    /// Build a plan from explicit weights if given (and non-empty), otherwise
    /// from the weights Canvas reports on the assignment groups.
    pub fn resolve(
        explicit: Option<&WeightMap>,
        groups: &[AssignmentGroup],
    ) -> Result<Self, WeightError> {
        match explicit.filter(|w| !w.is_empty()) {
            Some(weights) => normalize_weights(weights),
            None => Self::from_groups(groups),
        }
    }

    /// Plan from Canvas group weights.
    ///
    /// Canvas courses are inconsistent about whether weights are fractions or
    /// percentages; a total in (0, 1.001] is taken to be fractions and scaled
    /// by 100 first. The threshold is a guess at the convention, not a rule.
    pub fn from_groups(groups: &[AssignmentGroup]) -> Result<Self, WeightError> {
        let mut weights: WeightMap = groups
            .iter()
            .filter_map(|g| g.group_weight.map(|w| (g.name.clone(), w)))
            .collect();

        if weights.is_empty() {
            return Err(WeightError::NoSourceWeights);
        }

        let total: f64 = weights.values().sum();
        if total > 0.0 && total <= FRACTION_TOTAL_CEILING {
            for w in weights.values_mut() {
                *w *= 100.0;
            }
        }
        normalize_weights(&weights)
    }

    /// Equal share for every listed name. Duplicates collapse into one.
    pub fn equal<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let weights: WeightMap = names.into_iter().map(|n| (n.to_string(), 1.0)).collect();
        normalize_weights(&weights).unwrap_or_default()
    }

    /// Weight percentage for a category name, zero if the plan has none
    pub fn weight_for(&self, name: &str) -> f64 {
        self.by_name.get(name).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.by_name.values().sum()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Entries ordered by name, case-insensitively
    pub fn sorted_by_name(&self) -> Vec<(&str, f64)> {
        let mut entries: Vec<(&str, f64)> =
            self.by_name.iter().map(|(n, w)| (n.as_str(), *w)).collect();
        entries.sort_by_key(|(name, _)| name.to_lowercase());
        entries
    }
}
