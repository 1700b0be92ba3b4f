//! Load assignment and progression
//!
//! Computes the target top-set load for each prescribed exercise from
//! performed history, in a strict priority order: modal anchor from the most
//! recent same-intent session, mesocycle-aware baselines at block
//! boundaries, then the progression rule for the user's training age.
//! With no usable history the assigner falls back to a donor exercise, then
//! a body-weight ratio, and finally reports the load as unspecified rather
//! than fabricating one.
//!
//! Loads are Decimal throughout and snapped to the exercise's plate
//! increment exactly once, after every multiplicative factor has been
//! composed.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::HashMap;
use tracing::debug;

use crate::config::FeatureFlags;
use crate::error::ProgressionError;
use crate::models::{
    Baselines, BlockContext, Exercise, Goal, MesocyclePhase, PatternFamily, SelectionMode,
    SessionIntent, SetLog, TrainingAge, UserProfile, WorkoutHistoryEntry,
};
use crate::prescription::{Prescription, Role};

/// Working sets report at least this exertion; quieter sets are warmups
const WORKING_SET_RPE_FLOOR: f64 = 6.0;

/// Holding the modal load when its session RPE already sits here or above
const HOLD_RPE: f64 = 9.0;

/// Set-load spread beyond this fraction of the mean triggers the
/// conservative hold
const VARIANCE_GUARD_RATIO: f64 = 0.2;

/// Global deload back-off on computed loads
const DELOAD_BACKOFF: Decimal = dec!(0.75);

/// Extra back-off on later working sets for strength main lifts in a deload
const STRENGTH_BACKOFF: Decimal = dec!(0.90);

/// Sessions examined by plateau detection
const PLATEAU_WINDOW: usize = 3;

const READINESS_PLATEAU_THRESHOLD: u8 = 2;

/// Where a target load came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadSource {
    ModalHold,
    RepProgression,
    DoubleProgressionIncrement,
    DoubleProgressionDecrement,
    LinearProgression,
    PeriodizedProgression,
    BodyweightContinuity,
    DonorEstimate,
    BodyweightRatio,
    Unspecified,
}

/// Resolved load targets for one exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadDecision {
    pub top_set_load: Option<Decimal>,
    /// Per-working-set targets; index 0 is the top set
    pub set_loads: Vec<Option<Decimal>>,
    pub source: LoadSource,
    pub notes: Vec<String>,
}

impl LoadDecision {
    fn unspecified(sets: u32, notes: Vec<String>) -> Self {
        LoadDecision {
            top_set_load: None,
            set_loads: vec![None; sets as usize],
            source: LoadSource::Unspecified,
            notes,
        }
    }
}

/// Anchor extracted from one performed session
#[derive(Debug, Clone)]
struct Anchor {
    modal_load: Decimal,
    modal_rpe: Option<f64>,
    top_reps: u32,
    top_rpe: Option<f64>,
    set_loads: Vec<Decimal>,
    /// Same-intent sessions backing this anchor, for progression confidence
    prior_sessions: usize,
}

impl Anchor {
    fn confidence(&self) -> f64 {
        match self.prior_sessions {
            0 | 1 => 0.8,
            2 => 0.9,
            _ => 1.0,
        }
    }
}

/// Read-only inputs the assigner operates over
pub struct LoadInputs<'a> {
    pub history: &'a [WorkoutHistoryEntry],
    pub baselines: &'a Baselines,
    pub library: &'a [Exercise],
    pub profile: &'a UserProfile,
    pub goal: Goal,
    pub intent: &'a SessionIntent,
    pub block: Option<&'a BlockContext>,
    pub flags: &'a FeatureFlags,
}

pub struct LoadAssigner<'a> {
    inputs: LoadInputs<'a>,
    deload: bool,
}

impl<'a> LoadAssigner<'a> {
    pub fn new(inputs: LoadInputs<'a>) -> Self {
        let plateau = should_deload(inputs.history, inputs.library, inputs.flags);
        let block_deload = inputs.block.map(|b| b.is_deload()).unwrap_or(false);
        let deload = plateau || block_deload;
        if deload {
            debug!(plateau, block_deload, "deload back-off active");
        }
        LoadAssigner { inputs, deload }
    }

    pub fn is_deload(&self) -> bool {
        self.deload
    }

    /// Compute the load decision for one prescribed exercise
    pub fn assign(&self, exercise: &Exercise, prescription: &Prescription) -> LoadDecision {
        let mut notes = Vec::new();

        let resolved = match self.find_anchor(exercise, &mut notes) {
            Some(anchor) => self.progress_from_anchor(exercise, prescription, &anchor, &mut notes),
            None => match self.fallback(exercise, prescription, &mut notes) {
                Ok(pair) => Some(pair),
                Err(error) => {
                    debug!(error = %error, "load unresolved");
                    notes.push(error.to_string());
                    None
                }
            },
        };

        let Some((raw, source)) = resolved else {
            return LoadDecision::unspecified(prescription.sets, notes);
        };

        // bodyweight continuity never scales or snaps
        if source == LoadSource::BodyweightContinuity {
            return LoadDecision {
                top_set_load: Some(Decimal::ZERO),
                set_loads: vec![Some(Decimal::ZERO); prescription.sets as usize],
                source,
                notes,
            };
        }

        let mut top_factor = Decimal::ONE;
        let mut backoff_factor = Decimal::ONE;
        if self.deload {
            top_factor *= DELOAD_BACKOFF;
            notes.push("deload back-off applied".to_string());
            if self.inputs.goal == Goal::Strength && prescription.role == Role::MainLift {
                backoff_factor = STRENGTH_BACKOFF;
            }
        }

        let top = snap_to_increment(raw * top_factor, exercise.plate_increment);
        let later = snap_to_increment(raw * top_factor * backoff_factor, exercise.plate_increment);

        let mut set_loads = Vec::with_capacity(prescription.sets as usize);
        for index in 0..prescription.sets {
            set_loads.push(Some(if index == 0 { top } else { later }));
        }

        LoadDecision {
            top_set_load: Some(top),
            set_loads,
            source,
            notes,
        }
    }

    /// Anchor selection in spec priority order
    fn find_anchor(&self, exercise: &Exercise, notes: &mut Vec<String>) -> Option<Anchor> {
        let fresh_mesocycle = self
            .inputs
            .block
            .and_then(|b| b.accumulation_sessions_completed)
            == Some(0);

        if fresh_mesocycle {
            if let Some(anchor) = self.mesocycle_baseline(exercise, notes) {
                return Some(anchor);
            }
        }

        self.same_intent_anchor(exercise, notes)
            .or_else(|| self.any_intent_anchor(exercise, notes))
    }

    /// Most recent same-intent performed session, with MANUAL history
    /// down-weighted (0.7) against INTENT/AUTO history (1.0): when both
    /// exist the higher-weight source's modal wins whole.
    fn same_intent_anchor(&self, exercise: &Exercise, notes: &mut Vec<String>) -> Option<Anchor> {
        let sessions: Vec<&WorkoutHistoryEntry> = self
            .inputs
            .history
            .iter()
            .filter(|e| {
                e.performed()
                    && e.intent.as_ref() == Some(self.inputs.intent)
                    && e.find_exercise(&exercise.name).is_some()
            })
            .collect();
        if sessions.is_empty() {
            return None;
        }

        let manual: Vec<&&WorkoutHistoryEntry> = sessions
            .iter()
            .filter(|e| e.selection_mode == Some(SelectionMode::Manual))
            .collect();
        let full_weight: Vec<&&WorkoutHistoryEntry> = sessions
            .iter()
            .filter(|e| e.selection_mode != Some(SelectionMode::Manual))
            .collect();

        let chosen = if !full_weight.is_empty() {
            if !manual.is_empty() {
                notes.push("manual history down-weighted against planned history".to_string());
            }
            full_weight.iter().max_by_key(|e| e.date).copied()
        } else {
            manual.iter().max_by_key(|e| e.date).copied()
        }?;

        self.anchor_from_entry(exercise, chosen, sessions.len())
    }

    fn any_intent_anchor(&self, exercise: &Exercise, notes: &mut Vec<String>) -> Option<Anchor> {
        let chosen = self
            .inputs
            .history
            .iter()
            .filter(|e| e.performed() && e.find_exercise(&exercise.name).is_some())
            .max_by_key(|e| e.date)?;
        notes.push("no same-intent history; anchored on most recent exposure".to_string());
        self.anchor_from_entry(exercise, chosen, 1)
    }

    /// Baseline for a fresh mesocycle: the highest-week ACCUMULATION
    /// snapshot, else the most recent non-deload performed session. Deload
    /// entries never seed.
    fn mesocycle_baseline(&self, exercise: &Exercise, notes: &mut Vec<String>) -> Option<Anchor> {
        let with_exercise: Vec<&WorkoutHistoryEntry> = self
            .inputs
            .history
            .iter()
            .filter(|e| {
                e.performed()
                    && e.phase != Some(MesocyclePhase::Deload)
                    && e.find_exercise(&exercise.name).is_some()
            })
            .collect();

        let accumulation = with_exercise
            .iter()
            .filter(|e| e.phase == Some(MesocyclePhase::Accumulation))
            .max_by_key(|e| (e.week_in_phase.unwrap_or(0), e.date));

        let chosen = accumulation
            .copied()
            .or_else(|| with_exercise.iter().max_by_key(|e| e.date).copied())?;

        notes.push(format!(
            "mesocycle start: seeded from {} session",
            match chosen.phase {
                Some(MesocyclePhase::Accumulation) => "peak accumulation",
                _ => "most recent non-deload",
            }
        ));
        self.anchor_from_entry(exercise, chosen, 1)
    }

    /// Extract modal load, modal RPE, and the top set from one session,
    /// filtering warmup-grade sets out
    fn anchor_from_entry(
        &self,
        exercise: &Exercise,
        entry: &WorkoutHistoryEntry,
        prior_sessions: usize,
    ) -> Option<Anchor> {
        let performed = entry.find_exercise(&exercise.name)?;
        let sanitized: Vec<SetLog> = performed
            .sets
            .iter()
            .cloned()
            .map(SetLog::sanitized)
            .collect();

        let working: Vec<&SetLog> = sanitized
            .iter()
            .filter(|s| s.rpe.map_or(true, |r| r >= WORKING_SET_RPE_FLOOR))
            .collect();
        let working = if working.is_empty() {
            sanitized.iter().collect::<Vec<_>>()
        } else {
            working
        };

        let set_loads: Vec<Decimal> = working.iter().filter_map(|s| s.load).collect();
        if set_loads.is_empty() {
            return None;
        }

        let modal_load = modal(&set_loads)?;
        let rpes: Vec<Decimal> = working
            .iter()
            .filter_map(|s| s.rpe)
            .filter_map(Decimal::from_f64_retain)
            .collect();
        let modal_rpe = modal(&rpes).and_then(|d| d.to_f64());

        let top = working.iter().min_by_key(|s| s.set_index)?;

        Some(Anchor {
            modal_load,
            modal_rpe,
            top_reps: top.reps,
            top_rpe: top.rpe,
            set_loads,
            prior_sessions,
        })
    }

    /// Progression rules over an anchor, by training age
    fn progress_from_anchor(
        &self,
        exercise: &Exercise,
        prescription: &Prescription,
        anchor: &Anchor,
        notes: &mut Vec<String>,
    ) -> Option<(Decimal, LoadSource)> {
        // a modal load of exactly zero is a valid bodyweight anchor
        if anchor.modal_load == Decimal::ZERO {
            notes.push("bodyweight exercise — rep progression only".to_string());
            return Some((Decimal::ZERO, LoadSource::BodyweightContinuity));
        }

        // variance guard: wildly uneven set loads mean the session was not a
        // clean read, so hold the conservative modal
        if set_load_spread(&anchor.set_loads) > VARIANCE_GUARD_RATIO {
            notes.push("set loads inconsistent; holding modal load".to_string());
            return Some((anchor.modal_load, LoadSource::ModalHold));
        }

        if matches!(anchor.modal_rpe, Some(r) if r >= HOLD_RPE) {
            notes.push("session exertion already high; holding load".to_string());
            return Some((anchor.modal_load, LoadSource::ModalHold));
        }

        match self.inputs.profile.training_age {
            TrainingAge::Beginner => self.linear_progression(exercise, prescription, anchor, notes),
            TrainingAge::Advanced => {
                self.periodized_progression(exercise, prescription, anchor, notes)
            }
            TrainingAge::Intermediate => {
                Some(self.double_progression(prescription, anchor, notes))
            }
        }
    }

    /// Double progression: reps fill the range first, then load moves
    fn double_progression(
        &self,
        prescription: &Prescription,
        anchor: &Anchor,
        notes: &mut Vec<String>,
    ) -> (Decimal, LoadSource) {
        let range = prescription.rep_range;
        let target = prescription.target_rpe;
        let rpe_met = anchor.top_rpe.map_or(true, |r| r <= target);
        let rpe_overshot = anchor.top_rpe.map_or(false, |r| r >= target + 1.0);

        if anchor.top_reps >= range.max && rpe_met {
            let confidence = Decimal::from_f64_retain(anchor.confidence()).unwrap_or(Decimal::ONE);
            let increment = anchor.modal_load * dec!(0.025) * confidence;
            notes.push(format!(
                "range ceiling met at target exertion; adding ~2.5% (confidence {:.1})",
                anchor.confidence()
            ));
            (
                anchor.modal_load + increment,
                LoadSource::DoubleProgressionIncrement,
            )
        } else if anchor.top_reps < range.min || rpe_overshot {
            notes.push("under range floor or over target exertion; backing off ~3%".to_string());
            (
                anchor.modal_load * dec!(0.97),
                LoadSource::DoubleProgressionDecrement,
            )
        } else {
            notes.push("holding load, targeting more reps".to_string());
            (anchor.modal_load, LoadSource::RepProgression)
        }
    }

    /// Beginner linear progression until two stalls, then double progression
    fn linear_progression(
        &self,
        exercise: &Exercise,
        prescription: &Prescription,
        anchor: &Anchor,
        notes: &mut Vec<String>,
    ) -> Option<(Decimal, LoadSource)> {
        if self.stall_count(exercise) >= 2 {
            notes.push("linear progression stalled twice; switching to double progression".to_string());
            return Some(self.double_progression(prescription, anchor, notes));
        }
        let lower_body = exercise.primary_muscles.iter().any(|m| m.is_lower_body());
        let jump = if lower_body { dec!(5) } else { dec!(2.5) };
        notes.push(format!("linear progression: +{} per session", jump));
        Some((anchor.modal_load + jump, LoadSource::LinearProgression))
    }

    /// Sessions in a row, most recent first, where the top load failed to
    /// climb
    fn stall_count(&self, exercise: &Exercise) -> usize {
        let mut loads: Vec<(chrono::NaiveDate, Decimal)> = self
            .inputs
            .history
            .iter()
            .filter(|e| e.performed())
            .filter_map(|e| {
                e.find_exercise(&exercise.name)
                    .and_then(|p| p.top_load())
                    .map(|l| (e.date, l))
            })
            .collect();
        loads.sort_by_key(|(date, _)| *date);

        let mut stalls = 0;
        for pair in loads.windows(2).rev() {
            if pair[1].1 <= pair[0].1 {
                stalls += 1;
            } else {
                break;
            }
        }
        stalls
    }

    /// Advanced lifters ride the block: anchor scaled by the intensity
    /// multiplier for the week and the caller's back-off
    fn periodized_progression(
        &self,
        _exercise: &Exercise,
        prescription: &Prescription,
        anchor: &Anchor,
        notes: &mut Vec<String>,
    ) -> Option<(Decimal, LoadSource)> {
        let Some(block) = self.inputs.block else {
            return Some(self.double_progression(prescription, anchor, notes));
        };
        let intensity =
            Decimal::from_f64_retain(block.intensity_multiplier).unwrap_or(Decimal::ONE);
        let backoff = block.backoff_multiplier.unwrap_or(Decimal::ONE);
        notes.push(format!(
            "periodized: week {} intensity x{}",
            block.week_in_block, block.intensity_multiplier
        ));
        Some((
            anchor.modal_load * intensity * backoff,
            LoadSource::PeriodizedProgression,
        ))
    }

    /// No history at all: donor estimate, then body-weight ratio
    fn fallback(
        &self,
        exercise: &Exercise,
        _prescription: &Prescription,
        notes: &mut Vec<String>,
    ) -> Result<(Decimal, LoadSource), ProgressionError> {
        if let Some((load, donor_name)) = self.donor_estimate(exercise) {
            notes.push(format!("estimated from {} baseline", donor_name));
            return Ok((load, LoadSource::DonorEstimate));
        }
        match self.bodyweight_ratio(exercise) {
            Ok(load) => {
                notes.push("estimated from body weight".to_string());
                Ok((load, LoadSource::BodyweightRatio))
            }
            Err(error) => {
                notes.push(error.to_string());
                Err(ProgressionError::Unavailable {
                    exercise: exercise.name.clone(),
                })
            }
        }
    }

    /// Best-overlap donor: 4x muscle overlap + 3x pattern overlap +
    /// equipment compatibility + compound agreement, scaled down by the
    /// transfer factor
    fn donor_estimate(&self, exercise: &Exercise) -> Option<(Decimal, String)> {
        let mut best: Option<(f64, &Exercise, Decimal)> = None;

        for baseline in &self.inputs.baselines.entries {
            if baseline.exercise_name == exercise.name {
                // a direct baseline for the exercise itself wins outright
                if let Some(load) = baseline_load(baseline.top_set_weight, baseline.one_rep_max) {
                    return Some((
                        snap_to_increment(load, exercise.plate_increment),
                        baseline.exercise_name.clone(),
                    ));
                }
                continue;
            }
            let Some(donor) = self
                .inputs
                .library
                .iter()
                .find(|e| e.name == baseline.exercise_name)
            else {
                continue;
            };
            let Some(load) = baseline_load(baseline.top_set_weight, baseline.one_rep_max) else {
                continue;
            };

            let score = donor_overlap(exercise, donor);
            if score <= 0.0 {
                continue;
            }
            let better = match &best {
                None => true,
                Some((held, held_donor, _)) => {
                    score > *held || (score == *held && donor.name < held_donor.name)
                }
            };
            if better {
                best = Some((score, donor, load));
            }
        }

        let (_, donor, load) = best?;
        let factor = transfer_factor(exercise, donor);
        let scaled = load * Decimal::from_f64_retain(factor).unwrap_or(dec!(0.45));
        Some((
            snap_to_increment(scaled, exercise.plate_increment),
            donor.name.clone(),
        ))
    }

    /// Last resort: a class-based fraction of body weight
    fn bodyweight_ratio(&self, exercise: &Exercise) -> Result<Decimal, ProgressionError> {
        let body_weight = self.inputs.profile.body_weight.ok_or_else(|| {
            ProgressionError::MissingBodyWeight {
                exercise: exercise.name.clone(),
            }
        })?;
        let ratio = bodyweight_class_ratio(exercise);
        Ok(snap_to_increment(body_weight * ratio, exercise.plate_increment))
    }
}

/// Most frequent value; ties break to the larger value
fn modal(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let mut counts: HashMap<Decimal, u32> = HashMap::new();
    for value in values {
        *counts.entry(*value).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)))
        .map(|(value, _)| value)
}

/// Sample standard deviation of set loads as a fraction of their mean
fn set_load_spread(loads: &[Decimal]) -> f64 {
    if loads.len() < 2 {
        return 0.0;
    }
    let values: Vec<f64> = loads.iter().filter_map(|l| l.to_f64()).collect();
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().copied().sum::<f64>() / values.len() as f64;
    if mean == 0.0 {
        return 0.0;
    }
    let sd = values.as_slice().std_dev();
    sd / mean
}

fn baseline_load(top_set: Option<Decimal>, one_rep_max: Option<Decimal>) -> Option<Decimal> {
    top_set.or_else(|| one_rep_max.map(|orm| orm / (Decimal::ONE + dec!(8) / dec!(30))))
}

/// Donor relevance: 4x primary-muscle overlap + 3x pattern overlap +
/// equipment compatibility + compound agreement
fn donor_overlap(target: &Exercise, donor: &Exercise) -> f64 {
    let muscle_overlap = if target.primary_muscles.is_empty() {
        0.0
    } else {
        let shared = target
            .primary_muscles
            .iter()
            .filter(|m| donor.has_primary(**m))
            .count();
        shared as f64 / target.primary_muscles.len() as f64
    };
    let pattern_overlap = if target.movement_patterns.is_empty() {
        0.0
    } else {
        let shared = target
            .movement_patterns
            .iter()
            .filter(|p| donor.has_pattern(**p))
            .count();
        shared as f64 / target.movement_patterns.len() as f64
    };
    let equipment_compat = if target.equipment.iter().any(|e| donor.equipment.contains(e)) {
        1.0
    } else {
        0.0
    };
    let compound_bonus = if target.is_compound == donor.is_compound {
        1.0
    } else {
        0.0
    };
    4.0 * muscle_overlap + 3.0 * pattern_overlap + equipment_compat + compound_bonus
}

/// Donor-to-target load transfer factor, clamped to [0.45, 0.9]
fn transfer_factor(target: &Exercise, donor: &Exercise) -> f64 {
    let equipment_factor = if target.equipment.first() == donor.equipment.first() {
        1.0
    } else {
        0.85
    };
    let compound_factor = if donor.is_compound && !target.is_compound {
        0.6
    } else if !donor.is_compound && target.is_compound {
        1.1
    } else {
        1.0
    };
    let isolation_penalty = if target.is_isolation() { 0.85 } else { 1.0 };
    let fatigue_factor: f64 = 0.95;
    (equipment_factor * compound_factor * isolation_penalty * fatigue_factor).clamp(0.45, 0.9)
}

/// Class ratio for the body-weight fallback
fn bodyweight_class_ratio(exercise: &Exercise) -> Decimal {
    use crate::models::Muscle;
    if exercise.is_isolation() {
        if exercise.has_primary(Muscle::SideDelts) {
            return dec!(0.22);
        }
        if exercise.has_primary(Muscle::Biceps) {
            return dec!(0.25);
        }
        if exercise.has_primary(Muscle::Triceps) {
            return dec!(0.30);
        }
    }
    let family = exercise
        .movement_patterns
        .first()
        .map(|p| p.family())
        .unwrap_or(PatternFamily::Other);
    match family {
        PatternFamily::Pull => dec!(0.60),
        PatternFamily::Push => dec!(0.50),
        PatternFamily::Legs => dec!(0.75),
        PatternFamily::Other => dec!(0.35),
    }
}

/// Snap to the nearest multiple of the plate increment, half away from zero
pub fn snap_to_increment(load: Decimal, increment: Decimal) -> Decimal {
    if increment <= Decimal::ZERO {
        return load;
    }
    let steps = (load / increment)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    (steps * increment).normalize()
}

/// Epley estimated one-rep max
pub fn estimate_one_rep_max(load: Decimal, reps: u32) -> Decimal {
    load * (Decimal::ONE + Decimal::from(reps) / dec!(30))
}

/// Plateau detection: consecutive low readiness, or no main-lift e1RM
/// improvement across the window (total-rep stagnation when the main-lift
/// feature is off)
pub fn should_deload(
    history: &[WorkoutHistoryEntry],
    library: &[Exercise],
    flags: &FeatureFlags,
) -> bool {
    let mut performed: Vec<&WorkoutHistoryEntry> =
        history.iter().filter(|e| e.performed()).collect();
    performed.sort_by_key(|e| e.date);
    if performed.len() < PLATEAU_WINDOW {
        return false;
    }
    let window = &performed[performed.len() - PLATEAU_WINDOW..];

    // (a) readiness floor breached in every session of the window
    let low_readiness = window
        .iter()
        .all(|e| matches!(e.readiness, Some(r) if r <= READINESS_PLATEAU_THRESHOLD));
    if low_readiness {
        return true;
    }

    // (b) performance stagnation
    let metrics: Vec<f64> = window
        .iter()
        .map(|entry| {
            if flags.use_main_lift_plateau_detection {
                best_main_lift_e1rm(entry, library)
            } else {
                f64::from(entry.exercises.iter().map(|e| e.total_reps()).sum::<u32>())
            }
        })
        .collect();

    // any strict improvement anywhere in the window clears the plateau
    !metrics.windows(2).any(|pair| pair[1] > pair[0])
}

fn best_main_lift_e1rm(entry: &WorkoutHistoryEntry, library: &[Exercise]) -> f64 {
    entry
        .exercises
        .iter()
        .filter(|performed| {
            library
                .iter()
                .any(|e| e.name == performed.exercise_name && e.main_lift_eligible)
        })
        .flat_map(|performed| &performed.sets)
        .filter_map(|set| {
            set.load
                .map(|load| estimate_one_rep_max(load, set.reps))
                .and_then(|d| d.to_f64())
        })
        .fold(0.0, f64::max)
}
