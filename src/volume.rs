//! Weekly volume accounting
//!
//! Builds the volume context a planning call starts from: direct and
//! effective set counts per muscle over the current seven-day window, a
//! previous-window snapshot for ramp guarding, per-muscle last-trained dates
//! for SRA alignment, and the fatigue/readiness snapshot.
//!
//! Effective sets combine direct work with a fractional credit for secondary
//! involvement: `effective = direct + INDIRECT_MULTIPLIER * indirect`. The
//! multiplier is the single process-wide constant shared by candidate
//! scoring, accounting, and cap enforcement.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::models::{Muscle, VolumeLandmarks, VolumeTargets, WorkoutHistoryEntry, WorkoutStatus};

/// Credit a secondary-muscle set contributes toward effective volume.
/// Changing this invalidates stored baselines.
pub const INDIRECT_MULTIPLIER: f64 = 0.3;

/// Direct/indirect set tallies for one window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeState {
    pub weekly_direct: BTreeMap<Muscle, f64>,
    pub weekly_indirect: BTreeMap<Muscle, f64>,
}

impl VolumeState {
    pub fn add_direct(&mut self, muscle: Muscle, sets: f64) {
        *self.weekly_direct.entry(muscle).or_insert(0.0) += sets;
    }

    pub fn add_indirect(&mut self, muscle: Muscle, sets: f64) {
        *self.weekly_indirect.entry(muscle).or_insert(0.0) += sets;
    }

    pub fn direct(&self, muscle: Muscle) -> f64 {
        self.weekly_direct.get(&muscle).copied().unwrap_or(0.0)
    }

    pub fn indirect(&self, muscle: Muscle) -> f64 {
        self.weekly_indirect.get(&muscle).copied().unwrap_or(0.0)
    }

    /// `direct + INDIRECT_MULTIPLIER * indirect`
    pub fn effective(&self, muscle: Muscle) -> f64 {
        self.direct(muscle) + INDIRECT_MULTIPLIER * self.indirect(muscle)
    }

    /// Materialized effective map, in canonical muscle order
    pub fn effective_map(&self) -> BTreeMap<Muscle, f64> {
        let mut map = BTreeMap::new();
        for muscle in Muscle::ALL {
            let effective = self.effective(muscle);
            if effective > 0.0 {
                map.insert(muscle, effective);
            }
        }
        map
    }

    pub fn is_empty(&self) -> bool {
        self.weekly_direct.is_empty() && self.weekly_indirect.is_empty()
    }
}

/// Coarse recovery classification derived from the readiness snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoveryStatus {
    Fresh,
    Normal,
    Fatigued,
}

/// Fatigue signals derived from the most recent history entry by date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FatigueState {
    /// Readiness score of the most recent entry carrying one
    pub last_readiness: Option<u8>,

    /// True iff the most recent entry by date was skipped
    pub missed_last_session: bool,

    pub status: RecoveryStatus,
}

impl FatigueState {
    pub fn is_fatigued(&self) -> bool {
        self.status == RecoveryStatus::Fatigued
    }
}

impl Default for FatigueState {
    fn default() -> Self {
        FatigueState {
            last_readiness: None,
            missed_last_session: false,
            status: RecoveryStatus::Normal,
        }
    }
}

/// Volume context for one planning call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeContext {
    /// Current window: the seven days ending on the planning date
    pub current: VolumeState,

    /// Previous seven-day window, the baseline for spike caps
    pub previous: VolumeState,

    /// Most recent date each muscle received direct work
    pub last_trained: BTreeMap<Muscle, NaiveDate>,

    pub fatigue: FatigueState,
}

impl VolumeContext {
    /// Remaining deficit against the working target for one muscle
    pub fn deficit(&self, muscle: Muscle, landmarks: &VolumeLandmarks) -> f64 {
        (self.planning_target(muscle, landmarks) - self.current.effective(muscle)).max(0.0)
    }

    /// Weekly target adjusted by the ramp guard.
    ///
    /// A week that more than halves-again the previous week's effective
    /// volume outruns recovery, so the target is capped at
    /// `prev * 1.5 + 4`, floored at MEV. With no previous window the MAV
    /// target stands as-is.
    pub fn planning_target(&self, muscle: Muscle, landmarks: &VolumeLandmarks) -> f64 {
        if self.previous.is_empty() {
            return landmarks.mav;
        }
        let cap = self.previous.effective(muscle) * 1.5 + 4.0;
        landmarks.mav.min(cap).max(landmarks.mev)
    }

    /// Remaining headroom under the weekly MRV ceiling
    pub fn headroom(&self, muscle: Muscle, landmarks: &VolumeLandmarks) -> f64 {
        (landmarks.mrv - self.current.effective(muscle)).max(0.0)
    }

    /// Deficit map over a muscle set, for scoring and reporting
    pub fn deficit_map(&self, muscles: &[Muscle], targets: &VolumeTargets) -> BTreeMap<Muscle, f64> {
        let mut map = BTreeMap::new();
        for muscle in muscles {
            if let Some(landmarks) = targets.get(muscle) {
                map.insert(*muscle, self.deficit(*muscle, landmarks));
            }
        }
        map
    }
}

/// Builds the volume context from raw history
pub struct VolumeContextBuilder;

impl VolumeContextBuilder {
    /// Aggregate performed history into the planning-call volume context.
    ///
    /// Completed and PARTIAL entries count as performed; PLANNED,
    /// IN_PROGRESS and SKIPPED do not. Absent data yields empty maps, never
    /// a failure.
    pub fn build(history: &[WorkoutHistoryEntry], today: NaiveDate) -> VolumeContext {
        let current_start = today - Duration::days(6);
        let previous_start = today - Duration::days(13);

        let mut current = VolumeState::default();
        let mut previous = VolumeState::default();
        let mut last_trained: BTreeMap<Muscle, NaiveDate> = BTreeMap::new();

        for entry in history {
            if !entry.performed() {
                continue;
            }
            let state = if entry.date >= current_start && entry.date <= today {
                &mut current
            } else if entry.date >= previous_start && entry.date < current_start {
                &mut previous
            } else {
                continue;
            };

            for exercise in &entry.exercises {
                let sets = exercise.sets.len() as f64;
                if sets == 0.0 {
                    continue;
                }
                for muscle in &exercise.primary_muscles {
                    state.add_direct(*muscle, sets);
                    let stamp = last_trained.entry(*muscle).or_insert(entry.date);
                    if entry.date > *stamp {
                        *stamp = entry.date;
                    }
                }
                for muscle in &exercise.secondary_muscles {
                    state.add_indirect(*muscle, sets);
                }
            }
        }

        let fatigue = Self::derive_fatigue(history);

        debug!(
            direct_muscles = current.weekly_direct.len(),
            missed_last = fatigue.missed_last_session,
            "volume context built"
        );

        VolumeContext {
            current,
            previous,
            last_trained,
            fatigue,
        }
    }

    /// Fatigue comes from the most recent entry by date, not input order
    fn derive_fatigue(history: &[WorkoutHistoryEntry]) -> FatigueState {
        let most_recent = history.iter().max_by_key(|e| e.date);

        let last_readiness = history
            .iter()
            .filter(|e| e.readiness.is_some())
            .max_by_key(|e| e.date)
            .and_then(|e| e.readiness);

        let missed_last_session = most_recent
            .map(|e| e.status == WorkoutStatus::Skipped)
            .unwrap_or(false);

        let status = if missed_last_session || matches!(last_readiness, Some(r) if r <= 2) {
            RecoveryStatus::Fatigued
        } else if matches!(last_readiness, Some(r) if r >= 4) {
            RecoveryStatus::Fresh
        } else {
            RecoveryStatus::Normal
        };

        FatigueState {
            last_readiness,
            missed_last_session,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PerformedExercise, SetLog, SessionIntent};

    fn set(idx: u32) -> SetLog {
        SetLog {
            set_index: idx,
            reps: 10,
            rpe: Some(8.0),
            load: None,
        }
    }

    fn entry(
        date: NaiveDate,
        status: WorkoutStatus,
        sets: usize,
        readiness: Option<u8>,
    ) -> WorkoutHistoryEntry {
        WorkoutHistoryEntry {
            date,
            completed: status == WorkoutStatus::Completed,
            status,
            exercises: vec![PerformedExercise {
                exercise_id: "ex_bench".to_string(),
                exercise_name: "Barbell Bench Press".to_string(),
                primary_muscles: vec![Muscle::Chest],
                secondary_muscles: vec![Muscle::Triceps],
                movement_patterns: vec![],
                sets: (1..=sets as u32).map(set).collect(),
            }],
            readiness,
            intent: Some(SessionIntent::Push),
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
    fn test_effective_combines_direct_and_indirect() {
        let mut state = VolumeState::default();
        state.add_direct(Muscle::Chest, 4.0);
        state.add_indirect(Muscle::Chest, 3.0);
        assert!((state.effective(Muscle::Chest) - 4.9).abs() < 1e-9);
    }

    #[test]
    fn test_build_splits_windows() {
        let history = vec![
            entry(d(20), WorkoutStatus::Completed, 3, Some(4)),
            entry(d(10), WorkoutStatus::Completed, 4, None),
        ];
        let ctx = VolumeContextBuilder::build(&history, d(20));
        assert_eq!(ctx.current.direct(Muscle::Chest), 3.0);
        assert_eq!(ctx.previous.direct(Muscle::Chest), 4.0);
        // indirect side
        assert_eq!(ctx.current.indirect(Muscle::Triceps), 3.0);
    }

    #[test]
    fn test_unperformed_statuses_do_not_count() {
        let history = vec![
            entry(d(18), WorkoutStatus::Planned, 3, None),
            entry(d(19), WorkoutStatus::InProgress, 3, None),
            entry(d(17), WorkoutStatus::Skipped, 3, None),
            entry(d(16), WorkoutStatus::Partial, 2, None),
        ];
        let ctx = VolumeContextBuilder::build(&history, d(20));
        assert_eq!(ctx.current.direct(Muscle::Chest), 2.0);
    }

    #[test]
    fn test_fatigue_uses_most_recent_by_date() {
        // input order deliberately shuffled
        let history = vec![
            entry(d(19), WorkoutStatus::Skipped, 0, None),
            entry(d(14), WorkoutStatus::Completed, 3, Some(2)),
        ];
        let ctx = VolumeContextBuilder::build(&history, d(20));
        assert!(ctx.fatigue.missed_last_session);
        assert_eq!(ctx.fatigue.last_readiness, Some(2));
        assert_eq!(ctx.fatigue.status, RecoveryStatus::Fatigued);
    }

    #[test]
    fn test_empty_history_yields_empty_maps() {
        let ctx = VolumeContextBuilder::build(&[], d(20));
        assert!(ctx.current.is_empty());
        assert!(ctx.previous.is_empty());
        assert!(!ctx.fatigue.missed_last_session);
        assert_eq!(ctx.fatigue.status, RecoveryStatus::Normal);
    }

    #[test]
    fn test_deficit_and_headroom() {
        let history = vec![entry(d(20), WorkoutStatus::Completed, 4, None)];
        let ctx = VolumeContextBuilder::build(&history, d(20));
        let landmarks = VolumeLandmarks { mev: 6.0, mav: 14.0, mrv: 22.0 };
        // no previous window, so target is the MAV
        assert!((ctx.deficit(Muscle::Chest, &landmarks) - 10.0).abs() < 1e-9);
        assert!((ctx.headroom(Muscle::Chest, &landmarks) - 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_ramp_guard_caps_target() {
        let history = vec![
            entry(d(10), WorkoutStatus::Completed, 2, None),
            entry(d(20), WorkoutStatus::Completed, 1, None),
        ];
        let ctx = VolumeContextBuilder::build(&history, d(20));
        let landmarks = VolumeLandmarks { mev: 2.0, mav: 20.0, mrv: 26.0 };
        // previous effective = 2.0 direct, cap = 2*1.5+4 = 7
        assert!((ctx.planning_target(Muscle::Chest, &landmarks) - 7.0).abs() < 1e-9);
        // MEV floors the guard
        let low = VolumeLandmarks { mev: 9.0, mav: 20.0, mrv: 26.0 };
        assert!((ctx.planning_target(Muscle::Chest, &low) - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_last_trained_tracks_latest_date() {
        let history = vec![
            entry(d(12), WorkoutStatus::Completed, 3, None),
            entry(d(18), WorkoutStatus::Completed, 3, None),
        ];
        let ctx = VolumeContextBuilder::build(&history, d(20));
        assert_eq!(ctx.last_trained.get(&Muscle::Chest), Some(&d(18)));
        // secondary muscles do not stamp last_trained
        assert_eq!(ctx.last_trained.get(&Muscle::Triceps), None);
    }
}
