//! Per-exercise prescription: rep targets, exertion, and rest
//!
//! Rep bands come from the goal and the exercise's role, intersected with
//! the exercise's own productive range. Target RPE starts from a per-goal
//! baseline, ramps with the reps-in-reserve schedule across a block, and
//! yields to an explicit user override for the applicable rep band. Rest is
//! role- and rep-range-aware.

use serde::{Deserialize, Serialize};

use crate::models::{
    BlockContext, Exercise, Goal, Preferences, TrainingAge,
};
use crate::volume::FatigueState;

/// Role an exercise plays inside a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    MainLift,
    Accessory,
}

/// Inclusive rep band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepRange {
    pub min: u32,
    pub max: u32,
}

impl RepRange {
    pub fn new(min: u32, max: u32) -> Self {
        RepRange { min, max }
    }

    /// Intersect with another band; None when they do not overlap
    pub fn intersect(&self, other: &RepRange) -> Option<RepRange> {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);
        if min <= max {
            Some(RepRange { min, max })
        } else {
            None
        }
    }
}

/// Fully resolved per-exercise prescription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    pub role: Role,
    pub sets: u32,
    pub rep_range: RepRange,
    pub target_rpe: f64,
    pub rest_seconds: u32,
}

pub struct Prescriber;

impl Prescriber {
    /// Assign sets, reps, exertion, and rest for one selected exercise.
    ///
    /// `proposed_sets` comes from selection; this pass clamps it to the
    /// training-age ceiling and applies the fatigue reduction.
    pub fn prescribe(
        exercise: &Exercise,
        role: Role,
        proposed_sets: u32,
        goal: Goal,
        training_age: TrainingAge,
        fatigue: &FatigueState,
        block: Option<&BlockContext>,
        preferences: &Preferences,
    ) -> Prescription {
        let rep_range = Self::rep_range(exercise, role, goal);
        let sets = Self::sets(proposed_sets, training_age, fatigue);
        let target_rpe = Self::target_rpe(goal, &rep_range, block, preferences);
        let rest_seconds = Self::rest_seconds(exercise, role, goal, &rep_range, block);

        Prescription {
            role,
            sets,
            rep_range,
            target_rpe,
            rest_seconds,
        }
    }

    /// Goal band intersected with the exercise's own range; the exercise
    /// range wins outright when there is no overlap
    pub fn rep_range(exercise: &Exercise, role: Role, goal: Goal) -> RepRange {
        let goal_band = match (goal, role) {
            (Goal::Hypertrophy, Role::MainLift) => RepRange::new(6, 10),
            (Goal::Hypertrophy, Role::Accessory) => RepRange::new(10, 15),
            (Goal::Strength, Role::MainLift) => RepRange::new(3, 6),
            (Goal::Strength, Role::Accessory) => RepRange::new(6, 10),
            (Goal::FatLoss, Role::MainLift) => RepRange::new(8, 10),
            (Goal::FatLoss, Role::Accessory) => RepRange::new(12, 15),
            (Goal::Athleticism, Role::MainLift) => RepRange::new(4, 8),
            (Goal::Athleticism, Role::Accessory) => RepRange::new(8, 12),
            (Goal::GeneralHealth, Role::MainLift) => RepRange::new(6, 12),
            (Goal::GeneralHealth, Role::Accessory) => RepRange::new(10, 15),
        };
        let own = RepRange::new(exercise.rep_range_min, exercise.rep_range_max);
        goal_band.intersect(&own).unwrap_or(own)
    }

    /// Training-age set ceiling with a one-set fatigue reduction
    fn sets(proposed: u32, training_age: TrainingAge, fatigue: &FatigueState) -> u32 {
        let ceiling = match training_age {
            TrainingAge::Beginner => 3,
            TrainingAge::Intermediate => 4,
            TrainingAge::Advanced => 5,
        };
        let mut sets = proposed.min(ceiling).max(1);
        if fatigue.is_fatigued() && sets > 2 {
            sets -= 1;
        }
        sets
    }

    /// Per-goal baseline, RIR-ramped across the block, overridable by the
    /// user for the applicable rep band
    fn target_rpe(
        goal: Goal,
        rep_range: &RepRange,
        block: Option<&BlockContext>,
        preferences: &Preferences,
    ) -> f64 {
        if matches!(block, Some(b) if b.is_deload()) {
            return 6.5;
        }

        let baseline = preferences
            .rpe_override_for(rep_range.min, rep_range.max)
            .unwrap_or(match goal {
                Goal::Hypertrophy => 8.0,
                Goal::Strength => 8.5,
                Goal::FatLoss => 7.5,
                Goal::Athleticism => 7.5,
                Goal::GeneralHealth => 7.0,
            });

        let Some(block) = block else {
            return baseline.clamp(5.0, 10.0);
        };

        // RIR ramps from ~4 in week one to ~1 in the final week; the
        // baseline sits at the reference RIR of 2
        let weeks = block.block_weeks.unwrap_or(4).max(1);
        let progress = if weeks == 1 {
            1.0
        } else {
            f64::from(block.week_in_block.clamp(1, weeks) - 1) / f64::from(weeks - 1)
        };
        let target_rir = 4.0 - 3.0 * progress + block.rir_adjustment;
        let ramped = baseline - (target_rir - 2.0);
        ramped.clamp(5.0, 10.0)
    }

    /// Role-, goal-, and rep-range-aware rest assignment
    fn rest_seconds(
        exercise: &Exercise,
        role: Role,
        goal: Goal,
        rep_range: &RepRange,
        block: Option<&BlockContext>,
    ) -> u32 {
        let mut rest: i64 = match (role, goal) {
            (Role::MainLift, Goal::Strength) => 210,
            (Role::MainLift, _) => 150,
            (Role::Accessory, _) => {
                if exercise.is_isolation() {
                    75
                } else {
                    120
                }
            }
        };

        // low-rep work rests longer; high-rep work rests shorter
        if rep_range.max < 6 {
            rest += 60;
        } else if rep_range.min > 12 {
            rest -= 15;
        }

        if let Some(block) = block {
            rest = (rest as f64 * block.rest_multiplier).round() as i64;
        }

        // role floors hold regardless of adjustments
        let floor = match (role, goal) {
            (Role::MainLift, Goal::Strength) => 180,
            (Role::MainLift, _) => 120,
            (Role::Accessory, _) => 60,
        };
        rest.max(floor) as u32
    }
}
