//! Session split classification and next-intent derivation
//!
//! Classifies logged sessions into push/pull/legs by counting per-split
//! muscle hits, and derives the next session intent from the recent rotation
//! when the caller does not specify one.

use tracing::debug;

use crate::models::{
    Muscle, PatternFamily, SessionIntent, SplitType, WorkoutHistoryEntry,
};

/// The three PPL buckets a logged session can classify into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitClass {
    Push,
    Pull,
    Legs,
}

impl SplitClass {
    /// Canonical rotation order; also the final classification tie-break
    pub const ORDER: [SplitClass; 3] = [SplitClass::Push, SplitClass::Pull, SplitClass::Legs];

    fn muscles(&self) -> &'static [Muscle] {
        match self {
            SplitClass::Push => &[
                Muscle::Chest,
                Muscle::Triceps,
                Muscle::FrontDelts,
                Muscle::SideDelts,
            ],
            SplitClass::Pull => &[
                Muscle::Lats,
                Muscle::UpperBack,
                Muscle::RearDelts,
                Muscle::Biceps,
            ],
            SplitClass::Legs => &[
                Muscle::Quads,
                Muscle::Hamstrings,
                Muscle::Glutes,
                Muscle::Calves,
                Muscle::Adductors,
            ],
        }
    }

    pub fn intent(&self) -> SessionIntent {
        match self {
            SplitClass::Push => SessionIntent::Push,
            SplitClass::Pull => SessionIntent::Pull,
            SplitClass::Legs => SessionIntent::Legs,
        }
    }
}

pub struct SplitClassifier;

impl SplitClassifier {
    /// Classify an entry by per-split primary-muscle hit counts.
    ///
    /// Ties break first on the first exercise's primary movement-pattern
    /// family, then on rotation order (push, pull, legs).
    pub fn classify_entry(entry: &WorkoutHistoryEntry) -> SplitClass {
        let mut hits = [0u32; 3];
        for exercise in &entry.exercises {
            for muscle in &exercise.primary_muscles {
                for (i, class) in SplitClass::ORDER.iter().enumerate() {
                    if class.muscles().contains(muscle) {
                        hits[i] += 1;
                    }
                }
            }
        }

        let best = *hits.iter().max().unwrap_or(&0);
        let tied: Vec<SplitClass> = SplitClass::ORDER
            .iter()
            .enumerate()
            .filter(|(i, _)| hits[*i] == best)
            .map(|(_, c)| *c)
            .collect();

        if tied.len() == 1 {
            return tied[0];
        }

        // tie-break on the first exercise's leading pattern family
        if let Some(family) = entry
            .exercises
            .first()
            .and_then(|e| e.movement_patterns.first())
            .map(|p| p.family())
        {
            let preferred = match family {
                PatternFamily::Push => Some(SplitClass::Push),
                PatternFamily::Pull => Some(SplitClass::Pull),
                PatternFamily::Legs => Some(SplitClass::Legs),
                PatternFamily::Other => None,
            };
            if let Some(class) = preferred {
                if tied.contains(&class) {
                    return class;
                }
            }
        }

        tied[0]
    }

    /// Derive the next session intent when the caller supplies none.
    ///
    /// PPL rotates to the split least recently trained among the entries
    /// that advance the split; an entirely untrained split wins outright, in
    /// rotation order. Other split types cycle a fixed queue keyed by the
    /// count of advancing sessions.
    pub fn derive_next_intent(
        history: &[WorkoutHistoryEntry],
        split_type: SplitType,
    ) -> SessionIntent {
        let mut advancing: Vec<&WorkoutHistoryEntry> =
            history.iter().filter(|e| e.advances_split()).collect();
        advancing.sort_by_key(|e| e.date);

        match split_type {
            SplitType::Ppl => Self::next_ppl_intent(&advancing),
            SplitType::UpperLower => {
                let queue = [SessionIntent::Upper, SessionIntent::Lower];
                queue[advancing.len() % queue.len()].clone()
            }
            SplitType::FullBody | SplitType::BodyPart => SessionIntent::FullBody,
        }
    }

    fn next_ppl_intent(advancing: &[&WorkoutHistoryEntry]) -> SessionIntent {
        // most recent date each split was trained
        let mut last_seen: [Option<usize>; 3] = [None; 3];
        for (position, entry) in advancing.iter().enumerate() {
            let class = Self::classify_entry(entry);
            let slot = SplitClass::ORDER.iter().position(|c| *c == class).unwrap();
            last_seen[slot] = Some(position);
        }

        // an untrained split wins outright, in rotation order
        for (i, seen) in last_seen.iter().enumerate() {
            if seen.is_none() {
                debug!(split = ?SplitClass::ORDER[i], "untrained split preferred");
                return SplitClass::ORDER[i].intent();
            }
        }

        // otherwise the split least recently trained
        let (slot, _) = last_seen
            .iter()
            .enumerate()
            .min_by_key(|(_, seen)| seen.unwrap())
            .unwrap();
        SplitClass::ORDER[slot].intent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MovementPattern, PerformedExercise, SetLog, WorkoutStatus};
    use chrono::NaiveDate;

    fn exercise(
        name: &str,
        primaries: Vec<Muscle>,
        patterns: Vec<MovementPattern>,
    ) -> PerformedExercise {
        PerformedExercise {
            exercise_id: format!("ex_{}", name.to_lowercase().replace(' ', "_")),
            exercise_name: name.to_string(),
            primary_muscles: primaries,
            secondary_muscles: vec![],
            movement_patterns: patterns,
            sets: vec![SetLog {
                set_index: 1,
                reps: 8,
                rpe: None,
                load: None,
            }],
        }
    }

    fn entry(date: NaiveDate, exercises: Vec<PerformedExercise>) -> WorkoutHistoryEntry {
        WorkoutHistoryEntry {
            date,
            completed: true,
            status: WorkoutStatus::Completed,
            exercises,
            readiness: None,
            intent: None,
            selection_mode: None,
            phase: None,
            week_in_phase: None,
            advances_split: None,
        }
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, day).unwrap()
    }

    fn push_entry(date: NaiveDate) -> WorkoutHistoryEntry {
        entry(
            date,
            vec![
                exercise(
                    "Barbell Bench Press",
                    vec![Muscle::Chest, Muscle::Triceps],
                    vec![MovementPattern::HorizontalPush],
                ),
                exercise(
                    "Lateral Raise",
                    vec![Muscle::SideDelts],
                    vec![MovementPattern::Abduction],
                ),
            ],
        )
    }

    fn pull_entry(date: NaiveDate) -> WorkoutHistoryEntry {
        entry(
            date,
            vec![exercise(
                "Barbell Row",
                vec![Muscle::UpperBack, Muscle::Lats],
                vec![MovementPattern::HorizontalPull],
            )],
        )
    }

    fn legs_entry(date: NaiveDate) -> WorkoutHistoryEntry {
        entry(
            date,
            vec![exercise(
                "Barbell Back Squat",
                vec![Muscle::Quads, Muscle::Glutes],
                vec![MovementPattern::Squat],
            )],
        )
    }

    #[test]
    fn test_classify_push_pull_legs() {
        assert_eq!(
            SplitClassifier::classify_entry(&push_entry(d(1))),
            SplitClass::Push
        );
        assert_eq!(
            SplitClassifier::classify_entry(&pull_entry(d(1))),
            SplitClass::Pull
        );
        assert_eq!(
            SplitClassifier::classify_entry(&legs_entry(d(1))),
            SplitClass::Legs
        );
    }

    #[test]
    fn test_classify_tie_breaks_on_pattern_family() {
        // one push hit, one pull hit; first exercise is a pull
        let mixed = entry(
            d(1),
            vec![
                exercise(
                    "Chin Up",
                    vec![Muscle::Lats],
                    vec![MovementPattern::VerticalPull],
                ),
                exercise(
                    "Overhead Press",
                    vec![Muscle::FrontDelts],
                    vec![MovementPattern::VerticalPush],
                ),
            ],
        );
        assert_eq!(SplitClassifier::classify_entry(&mixed), SplitClass::Pull);
    }

    #[test]
    fn test_classify_final_tie_break_is_rotation_order() {
        let mixed = entry(
            d(1),
            vec![
                exercise("Plank", vec![Muscle::Chest], vec![MovementPattern::Isolation]),
                exercise("Shrug", vec![Muscle::UpperBack], vec![MovementPattern::Isolation]),
            ],
        );
        assert_eq!(SplitClassifier::classify_entry(&mixed), SplitClass::Push);
    }

    #[test]
    fn test_next_intent_least_recently_trained() {
        let history = vec![push_entry(d(1)), legs_entry(d(3)), pull_entry(d(5))];
        assert_eq!(
            SplitClassifier::derive_next_intent(&history, SplitType::Ppl),
            SessionIntent::Push
        );
    }

    #[test]
    fn test_next_intent_prefers_untrained_split() {
        let history = vec![push_entry(d(1)), pull_entry(d(3))];
        assert_eq!(
            SplitClassifier::derive_next_intent(&history, SplitType::Ppl),
            SessionIntent::Legs
        );
    }

    #[test]
    fn test_next_intent_skipped_does_not_advance() {
        let mut skipped_pull = pull_entry(d(5));
        skipped_pull.status = WorkoutStatus::Skipped;
        skipped_pull.completed = false;
        let history = vec![push_entry(d(1)), legs_entry(d(3)), skipped_pull];
        // pull never advanced, so it is the untrained split
        assert_eq!(
            SplitClassifier::derive_next_intent(&history, SplitType::Ppl),
            SessionIntent::Pull
        );
    }

    #[test]
    fn test_next_intent_empty_history_starts_at_push() {
        assert_eq!(
            SplitClassifier::derive_next_intent(&[], SplitType::Ppl),
            SessionIntent::Push
        );
    }

    #[test]
    fn test_upper_lower_cycles_by_day_index() {
        assert_eq!(
            SplitClassifier::derive_next_intent(&[], SplitType::UpperLower),
            SessionIntent::Upper
        );
        let history = vec![push_entry(d(1))];
        assert_eq!(
            SplitClassifier::derive_next_intent(&history, SplitType::UpperLower),
            SessionIntent::Lower
        );
    }

    #[test]
    fn test_full_body_queue() {
        assert_eq!(
            SplitClassifier::derive_next_intent(&[], SplitType::FullBody),
            SessionIntent::FullBody
        );
    }
}
