//! Warmup ramp generation for main lifts
//!
//! Main lifts with a resolvable top-set load get a short ramp of fixed
//! fractions with descending reps. Pure bodyweight movements and unresolved
//! loads get no ramp.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Exercise, TrainingAge};
use crate::progression::snap_to_increment;

/// One ramp set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarmupSet {
    pub load: Decimal,
    pub reps: u32,
    pub rest_seconds: u32,
}

/// Ramp fractions of the top-set load with their rep targets
const RAMP_STEPS: [(f64, u32); 3] = [(0.50, 8), (0.70, 5), (0.85, 3)];

/// Build the ramp for a main lift. Returns an empty ramp when the top-set
/// load is unresolved, zero, or the exercise is purely bodyweight.
pub fn build_ramp(
    exercise: &Exercise,
    top_set_load: Option<Decimal>,
    training_age: TrainingAge,
) -> Vec<WarmupSet> {
    let Some(top) = top_set_load else {
        return Vec::new();
    };
    if top <= Decimal::ZERO || exercise.is_pure_bodyweight() {
        return Vec::new();
    }

    let steps = match training_age {
        TrainingAge::Beginner => &RAMP_STEPS[..2],
        _ => &RAMP_STEPS[..],
    };

    steps
        .iter()
        .enumerate()
        .map(|(index, (fraction, reps))| WarmupSet {
            load: snap_to_increment(
                top * Decimal::from_f64_retain(*fraction).unwrap_or(Decimal::ONE),
                exercise.plate_increment,
            ),
            reps: *reps,
            rest_seconds: if index == 0 { 60 } else { 90 },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Equipment, JointStress, Muscle, MovementPattern};
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn squat() -> Exercise {
        Exercise {
            id: "ex_squat".to_string(),
            name: "Barbell Back Squat".to_string(),
            primary_muscles: vec![Muscle::Quads, Muscle::Glutes],
            secondary_muscles: vec![],
            movement_patterns: vec![MovementPattern::Squat],
            split_tags: vec![],
            joint_stress: JointStress::High,
            equipment: vec![Equipment::Barbell],
            rep_range_min: 5,
            rep_range_max: 8,
            is_compound: true,
            main_lift_eligible: true,
            fatigue_cost: 5,
            sfr_score: Some(4),
            length_position_score: Some(4),
            time_per_set_seconds: Some(45),
            sra_recovery_hours: BTreeMap::new(),
            contraindications: vec![],
            plate_increment: dec!(5),
        }
    }

    #[test]
    fn test_three_set_ramp_for_intermediates() {
        let ramp = build_ramp(&squat(), Some(dec!(300)), TrainingAge::Intermediate);
        assert_eq!(ramp.len(), 3);
        assert_eq!(ramp[0].load, dec!(150));
        assert_eq!(ramp[1].load, dec!(210));
        assert_eq!(ramp[2].load, dec!(255));
        assert_eq!(ramp[0].reps, 8);
        assert_eq!(ramp[2].reps, 3);
        assert_eq!(ramp[0].rest_seconds, 60);
        assert_eq!(ramp[1].rest_seconds, 90);
    }

    #[test]
    fn test_two_set_ramp_for_beginners() {
        let ramp = build_ramp(&squat(), Some(dec!(200)), TrainingAge::Beginner);
        assert_eq!(ramp.len(), 2);
        assert_eq!(ramp[0].load, dec!(100));
        assert_eq!(ramp[1].load, dec!(140));
    }

    #[test]
    fn test_ramp_loads_snap_to_increment() {
        let ramp = build_ramp(&squat(), Some(dec!(315)), TrainingAge::Advanced);
        for set in &ramp {
            assert_eq!(set.load % dec!(5), Decimal::ZERO);
        }
        // 315 * 0.7 = 220.5, 44.1 increments, snaps to 220
        assert_eq!(ramp[1].load, dec!(220));
    }

    #[test]
    fn test_no_ramp_without_load() {
        assert!(build_ramp(&squat(), None, TrainingAge::Intermediate).is_empty());
        assert!(build_ramp(&squat(), Some(Decimal::ZERO), TrainingAge::Intermediate).is_empty());
    }

    #[test]
    fn test_no_ramp_for_pure_bodyweight() {
        let mut dips = squat();
        dips.equipment = vec![Equipment::DipBars];
        assert!(build_ramp(&dips, Some(dec!(25)), TrainingAge::Intermediate).is_empty());
    }
}
