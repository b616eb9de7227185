use serde::Serialize;

use super::policy::FinalPolicy;
use crate::canvas::types::Assignment;

/// Earned and possible points for one aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Tally {
    pub earned: f64,
    pub possible: f64,
}

impl Tally {
    /// `earned / possible` as a percentage; None when nothing is possible
    pub fn percentage(&self) -> Option<f64> {
        if self.possible > 0.0 {
            Some(self.earned / self.possible * 100.0)
        } else {
            None
        }
    }

    fn add(&mut self, earned: f64, possible: f64) {
        self.earned += earned;
        self.possible += possible;
    }
}

/// Running (graded work only) and final (policy-adjusted) tallies for the
/// assignments of one category.
///
/// Unpublished assignments and those worth zero points are skipped.
pub fn tally<'a>(
    assignments: impl IntoIterator<Item = &'a Assignment>,
    policy: FinalPolicy,
) -> (Tally, Tally) {
    let mut running = Tally::default();
    let mut fin = Tally::default();

    for assignment in assignments {
        if !assignment.counts_toward_grade() {
            continue;
        }
        let points = assignment.points();

        match assignment.earned() {
            Some(earned) => {
                running.add(earned, points);
                fin.add(earned, points);
            }
            None => match policy {
                FinalPolicy::IgnoreAll => {}
                FinalPolicy::AllZero => fin.add(0.0, points),
                FinalPolicy::MissingZeroUpcomingIgnore => {
                    if assignment.is_missing() {
                        fin.add(0.0, points);
                    }
                }
            },
        }
    }

    (running, fin)
}
