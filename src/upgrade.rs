//! Post-selection stretch upgrade
//!
//! Scans the selected isolations and swaps each for a strictly better
//! alternative on the same muscle-and-pattern slot: greater loaded-stretch
//! rating at equal-or-better stimulus-to-fatigue. The pass is a fixpoint on
//! a small set, so a bounded loop of two sweeps suffices.

use tracing::debug;

use crate::beam::SelectionOutcome;
use crate::scoring::{Rejection, RejectionReason, SelectionCandidate};

/// Upper bound on upgrade sweeps; the second sweep only confirms quiescence
const MAX_SWEEPS: usize = 2;

pub struct StretchUpgrade;

impl StretchUpgrade {
    /// Apply the upgrade pass over a selection outcome.
    ///
    /// `pool` is the full feasible candidate pool (hard filters already
    /// applied). Displaced exercises land in the rejection ledger with
    /// `dominated_by_better_option`.
    pub fn apply(outcome: &mut SelectionOutcome, pool: &[SelectionCandidate]) {
        for sweep in 0..MAX_SWEEPS {
            let mut swapped = false;

            for slot in 0..outcome.selected.len() {
                if !outcome.selected[slot].exercise.is_isolation() {
                    continue;
                }
                let Some(replacement) = Self::better_alternative(outcome, slot, pool) else {
                    continue;
                };
                Self::swap(outcome, slot, replacement);
                swapped = true;
            }

            if !swapped {
                debug!(sweep, "stretch upgrade reached fixpoint");
                break;
            }
        }
    }

    /// The best strict upgrade for one selected isolation, if any exists.
    /// Candidates are ranked by length-position score, then SFR, then name.
    fn better_alternative(
        outcome: &SelectionOutcome,
        slot: usize,
        pool: &[SelectionCandidate],
    ) -> Option<SelectionCandidate> {
        let current = &outcome.selected[slot];
        let current_length = current.exercise.length_position_score.unwrap_or(3);
        let current_sfr = current.exercise.sfr_score.unwrap_or(3);

        let mut best: Option<&SelectionCandidate> = None;
        for candidate in pool {
            let exercise = &candidate.exercise;
            if exercise.is_compound || exercise.main_lift_eligible {
                continue;
            }
            if outcome
                .selected
                .iter()
                .any(|s| s.exercise.id == exercise.id)
            {
                continue;
            }
            let shares_primary = exercise
                .primary_muscles
                .iter()
                .any(|m| current.exercise.has_primary(*m));
            let shares_pattern = exercise
                .movement_patterns
                .iter()
                .any(|p| current.exercise.has_pattern(*p));
            if !shares_primary || !shares_pattern {
                continue;
            }
            let length = exercise.length_position_score.unwrap_or(3);
            let sfr = exercise.sfr_score.unwrap_or(3);
            if length <= current_length || sfr < current_sfr {
                continue;
            }

            let improves_on_best = match best {
                None => true,
                Some(held) => {
                    let held_length = held.exercise.length_position_score.unwrap_or(3);
                    let held_sfr = held.exercise.sfr_score.unwrap_or(3);
                    (length, sfr, &held.exercise.name)
                        > (held_length, held_sfr, &exercise.name)
                }
            };
            if improves_on_best {
                best = Some(candidate);
            }
        }
        best.cloned()
    }

    /// Replace the slot, keeping volume and time bookkeeping exact
    fn swap(outcome: &mut SelectionOutcome, slot: usize, replacement: SelectionCandidate) {
        let displaced = outcome.selected[slot].clone();

        // volume: subtract exactly what the displaced candidate added
        for contribution in &displaced.contributions {
            if let Some(value) = outcome.filled_volume.get_mut(&contribution.muscle) {
                *value -= contribution.effective();
                if *value <= 1e-9 {
                    outcome.filled_volume.remove(&contribution.muscle);
                }
            }
        }
        for contribution in &replacement.contributions {
            *outcome
                .filled_volume
                .entry(contribution.muscle)
                .or_insert(0.0) += contribution.effective();
        }

        outcome.time_minutes += replacement.time_minutes - displaced.time_minutes;

        if let Some(entry) = outcome
            .rationale
            .iter_mut()
            .find(|(name, _)| *name == displaced.exercise.name)
        {
            *entry = (
                replacement.exercise.name.clone(),
                format!(
                    "upgraded from {} for deeper loaded stretch",
                    displaced.exercise.name
                ),
            );
        }

        debug!(
            from = %displaced.exercise.name,
            to = %replacement.exercise.name,
            "stretch upgrade swap"
        );

        outcome.rejections.push(Rejection {
            exercise_id: displaced.exercise.id.clone(),
            exercise_name: displaced.exercise.name.clone(),
            reason: RejectionReason::DominatedByBetterOption,
        });
        outcome.selected[slot] = replacement;
    }
}
