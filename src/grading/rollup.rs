use super::engine::CategoryResult;

/// Weighted sum of present percentages and the weight they carried.
#[derive(Debug, Default)]
struct WeightedSum {
    sum: f64,
    weight: f64,
}

impl WeightedSum {
    fn add(&mut self, pct: Option<f64>, weight: f64) {
        if let Some(pct) = pct {
            self.sum += pct * weight / 100.0;
            self.weight += weight;
        }
    }

    fn total(&self) -> Option<f64> {
        if self.weight > 0.0 {
            Some(self.sum * 100.0 / self.weight)
        } else {
            None
        }
    }
}

/// Combine category percentages into running and final course totals.
///
/// Categories with weight <= 0 take no part. Each total is rescaled against
/// the weight of the categories that actually have a percentage for it, so a
/// weighted category with nothing graded yet neither drags the total down
/// nor caps it below 100. A total is None when no weighted category has a
/// percentage for it.
pub fn rollup(categories: &[CategoryResult]) -> (Option<f64>, Option<f64>) {
    let mut running = WeightedSum::default();
    let mut fin = WeightedSum::default();

    for category in categories.iter().filter(|c| c.weight_pct > 0.0) {
        running.add(category.running_pct, category.weight_pct);
        fin.add(category.final_pct, category.weight_pct);
    }

    (running.total(), fin.total())
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn test_weighted_average() {
        let categories = vec![
            category("Homework", 40.0, Some(90.0), Some(90.0)),
            category("Exams", 60.0, Some(80.0), Some(70.0)),
        ];
        let (running, fin) = rollup(&categories);
        assert!((running.unwrap() - 84.0).abs() < 1e-9);
        assert!((fin.unwrap() - 78.0).abs() < 1e-9);
    }

    #[test]
    fn test_ungraded_category_does_not_cap_total() {
        let categories = vec![
            category("Homework", 40.0, Some(90.0), Some(90.0)),
            category("Exams", 60.0, None, None),
        ];
        let (running, fin) = rollup(&categories);
        assert!((running.unwrap() - 90.0).abs() < 1e-9);
        assert!((fin.unwrap() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_only_category_counts_in_final() {
        // Exams has no graded work but a missing exam: running ignores it,
        // final counts it at 0%
        let categories = vec![
            category("Homework", 40.0, Some(90.0), Some(90.0)),
            category("Exams", 60.0, None, Some(0.0)),
        ];
        let (running, fin) = rollup(&categories);
        assert!((running.unwrap() - 90.0).abs() < 1e-9);
        assert!((fin.unwrap() - 36.0).abs() < 1e-9);
    }

    #[test]
    fn test_unweighted_categories_are_ignored() {
        let categories = vec![
            category("Homework", 100.0, Some(90.0), Some(90.0)),
            category("Extra", 0.0, Some(10.0), Some(10.0)),
        ];
        let (running, _) = rollup(&categories);
        assert!((running.unwrap() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_weight_means_no_totals() {
        let categories = vec![category("Extra", 0.0, Some(50.0), Some(50.0))];
        assert_eq!(rollup(&categories), (None, None));
        assert_eq!(rollup(&[]), (None, None));
    }

    #[test]
    fn test_nothing_graded_means_no_totals() {
        let categories = vec![category("Homework", 100.0, None, None)];
        assert_eq!(rollup(&categories), (None, None));
    }

    #[test]
    fn test_partial_weight_is_rescaled() {
        let categories = vec![category("Homework", 50.0, Some(80.0), Some(80.0))];
        let (running, fin) = rollup(&categories);
        assert!((running.unwrap() - 80.0).abs() < 1e-9);
        assert!((fin.unwrap() - 80.0).abs() < 1e-9);
    }
}
