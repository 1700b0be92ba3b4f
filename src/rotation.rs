//! Exercise rotation and exposure tracking
//!
//! The index is keyed by exercise **name** rather than id: library ids have
//! been renumbered across database migrations while names stayed stable.
//! A future schema with stable exercise UUIDs would key on those instead;
//! until then the name is the durable identity.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::WorkoutHistoryEntry;

/// Performance direction over the last two exposures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Declining,
    Stalled,
}

/// Exposure record for one exercise name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureRecord {
    pub last_used: NaiveDate,
    pub weeks_since_last_use: f64,
    pub usage_count: u32,
    pub trend: Trend,
}

/// Name-keyed exposure index over performed history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RotationIndex {
    records: HashMap<String, ExposureRecord>,
}

impl RotationIndex {
    /// Build the index from history. Only performed entries count as
    /// exposures.
    pub fn build(history: &[WorkoutHistoryEntry], today: NaiveDate) -> Self {
        // exposures per name, oldest first
        let mut exposures: HashMap<String, Vec<&WorkoutHistoryEntry>> = HashMap::new();
        let mut sorted: Vec<&WorkoutHistoryEntry> =
            history.iter().filter(|e| e.performed()).collect();
        sorted.sort_by_key(|e| e.date);

        for &entry in &sorted {
            for exercise in &entry.exercises {
                exposures
                    .entry(exercise.exercise_name.clone())
                    .or_default()
                    .push(entry);
            }
        }

        let mut records = HashMap::new();
        for (name, entries) in exposures {
            let last_used = entries.last().map(|e| e.date).unwrap_or(today);
            let days_ago = (today - last_used).num_days().max(0) as f64;
            let trend = Self::derive_trend(&name, &entries);
            records.insert(
                name,
                ExposureRecord {
                    last_used,
                    weeks_since_last_use: days_ago / 7.0,
                    usage_count: entries.len() as u32,
                    trend,
                },
            );
        }

        RotationIndex { records }
    }

    /// Improving iff the last two exposures show strictly increasing top
    /// load, or equal load with strictly increasing performed reps.
    /// Declining mirrors that; anything else is stalled.
    fn derive_trend(name: &str, entries: &[&WorkoutHistoryEntry]) -> Trend {
        if entries.len() < 2 {
            return Trend::Stalled;
        }
        let older = entries[entries.len() - 2].find_exercise(name);
        let newer = entries[entries.len() - 1].find_exercise(name);
        let (older, newer) = match (older, newer) {
            (Some(a), Some(b)) => (a, b),
            _ => return Trend::Stalled,
        };

        let old_load = older.top_load();
        let new_load = newer.top_load();
        match (old_load, new_load) {
            (Some(a), Some(b)) if b > a => Trend::Improving,
            (Some(a), Some(b)) if b < a => Trend::Declining,
            _ => {
                let old_reps = older.total_reps();
                let new_reps = newer.total_reps();
                if new_reps > old_reps {
                    Trend::Improving
                } else if new_reps < old_reps {
                    Trend::Declining
                } else {
                    Trend::Stalled
                }
            }
        }
    }

    pub fn record(&self, name: &str) -> Option<&ExposureRecord> {
        self.records.get(name)
    }

    /// Rotation-novelty sub-score: saturates at three weeks unused.
    /// Unknown exercises are maximally novel.
    pub fn novelty_score(&self, name: &str) -> f64 {
        match self.records.get(name) {
            Some(record) => (record.weeks_since_last_use / 3.0).min(1.0),
            None => 1.0,
        }
    }

    /// Sets performed on this exercise in the most recent performed session,
    /// used as a continuity floor for proposed sets.
    pub fn continuity_sets(
        &self,
        name: &str,
        history: &[WorkoutHistoryEntry],
    ) -> Option<u32> {
        let most_recent = history
            .iter()
            .filter(|e| e.performed())
            .max_by_key(|e| e.date)?;
        most_recent
            .find_exercise(name)
            .map(|e| e.sets.len() as u32)
            .filter(|&n| n > 0)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in name order, for display
    pub fn sorted_records(&self) -> Vec<(&String, &ExposureRecord)> {
        let mut entries: Vec<_> = self.records.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Muscle, PerformedExercise, SetLog, WorkoutStatus};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn entry_with_load(date: NaiveDate, load: Decimal, reps: u32) -> WorkoutHistoryEntry {
        WorkoutHistoryEntry {
            date,
            completed: true,
            status: WorkoutStatus::Completed,
            exercises: vec![PerformedExercise {
                exercise_id: "ex_squat".to_string(),
                exercise_name: "Barbell Back Squat".to_string(),
                primary_muscles: vec![Muscle::Quads],
                secondary_muscles: vec![],
                movement_patterns: vec![],
                sets: vec![SetLog {
                    set_index: 1,
                    reps,
                    rpe: Some(8.0),
                    load: Some(load),
                }],
            }],
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

    #[test]
    fn test_weeks_since_last_use() {
        let history = vec![entry_with_load(d(1), dec!(225), 5)];
        let index = RotationIndex::build(&history, d(22));
        let record = index.record("Barbell Back Squat").unwrap();
        assert!((record.weeks_since_last_use - 3.0).abs() < 1e-9);
        assert_eq!(record.usage_count, 1);
    }

    #[test]
    fn test_novelty_saturates_at_three_weeks() {
        let history = vec![entry_with_load(d(1), dec!(225), 5)];
        let index = RotationIndex::build(&history, d(29));
        assert_eq!(index.novelty_score("Barbell Back Squat"), 1.0);

        let index = RotationIndex::build(&history, d(8));
        assert!((index.novelty_score("Barbell Back Squat") - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_exercise_is_maximally_novel() {
        let index = RotationIndex::build(&[], d(1));
        assert_eq!(index.novelty_score("Nordic Curl"), 1.0);
        assert!(index.record("Nordic Curl").is_none());
    }

    #[test]
    fn test_trend_improving_on_load_increase() {
        let history = vec![
            entry_with_load(d(1), dec!(225), 5),
            entry_with_load(d(8), dec!(235), 5),
        ];
        let index = RotationIndex::build(&history, d(10));
        assert_eq!(index.record("Barbell Back Squat").unwrap().trend, Trend::Improving);
    }

    #[test]
    fn test_trend_declining_on_load_decrease() {
        let history = vec![
            entry_with_load(d(1), dec!(235), 5),
            entry_with_load(d(8), dec!(225), 5),
        ];
        let index = RotationIndex::build(&history, d(10));
        assert_eq!(index.record("Barbell Back Squat").unwrap().trend, Trend::Declining);
    }

    #[test]
    fn test_trend_rep_tiebreak_and_stall() {
        let history = vec![
            entry_with_load(d(1), dec!(225), 5),
            entry_with_load(d(8), dec!(225), 6),
        ];
        let index = RotationIndex::build(&history, d(10));
        assert_eq!(index.record("Barbell Back Squat").unwrap().trend, Trend::Improving);

        let history = vec![
            entry_with_load(d(1), dec!(225), 5),
            entry_with_load(d(8), dec!(225), 5),
        ];
        let index = RotationIndex::build(&history, d(10));
        assert_eq!(index.record("Barbell Back Squat").unwrap().trend, Trend::Stalled);
    }

    #[test]
    fn test_skipped_sessions_are_not_exposures() {
        let mut skipped = entry_with_load(d(8), dec!(225), 5);
        skipped.status = WorkoutStatus::Skipped;
        let history = vec![entry_with_load(d(1), dec!(225), 5), skipped];
        let index = RotationIndex::build(&history, d(10));
        assert_eq!(index.record("Barbell Back Squat").unwrap().usage_count, 1);
        assert_eq!(index.record("Barbell Back Squat").unwrap().last_used, d(1));
    }

    #[test]
    fn test_continuity_sets_from_most_recent_session() {
        let mut second = entry_with_load(d(8), dec!(225), 5);
        second.exercises[0].sets.push(SetLog {
            set_index: 2,
            reps: 5,
            rpe: Some(8.5),
            load: Some(dec!(225)),
        });
        let history = vec![entry_with_load(d(1), dec!(225), 5), second];
        let index = RotationIndex::build(&history, d(10));
        assert_eq!(
            index.continuity_sets("Barbell Back Squat", &history),
            Some(2)
        );
        assert_eq!(index.continuity_sets("Nordic Curl", &history), None);
    }
}
