//! Candidate building and multi-objective scoring
//!
//! For every library exercise that survives the hard filters, this module
//! computes a proposed set count, the candidate's direct/indirect volume
//! contribution, an estimated time cost, and seven normalized sub-scores
//! blended into a weighted total. The sub-score record is fixed-width by
//! design; the beam search later re-computes only the movement-diversity
//! component as its state evolves.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::models::{
    BlockContext, Exercise, MesocyclePhase, Muscle, MovementPattern, SessionIntent, UserContext,
    VolumeTargets, WorkoutHistoryEntry,
};
use crate::rotation::RotationIndex;
use crate::volume::{VolumeContext, INDIRECT_MULTIPLIER};

/// Why an exercise was rejected at any stage of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    PainConflict,
    UserAvoided,
    EquipmentUnavailable,
    SplitMismatch,
    VolumeCeilingReached,
    StructureConstraintViolated,
    MovementPatternCap,
    SessionDirectSetCap,
    TricepsIsolationCap,
    FrontDeltSuppression,
    IsolationDuplicate,
    DominatedByBetterOption,
    SessionTimeExceeded,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RejectionReason::PainConflict => "pain_conflict",
            RejectionReason::UserAvoided => "user_avoided",
            RejectionReason::EquipmentUnavailable => "equipment_unavailable",
            RejectionReason::SplitMismatch => "split_mismatch",
            RejectionReason::VolumeCeilingReached => "volume_ceiling_reached",
            RejectionReason::StructureConstraintViolated => "structure_constraint_violated",
            RejectionReason::MovementPatternCap => "movement_pattern_cap",
            RejectionReason::SessionDirectSetCap => "session_direct_set_cap",
            RejectionReason::TricepsIsolationCap => "triceps_isolation_cap",
            RejectionReason::FrontDeltSuppression => "front_delt_suppression",
            RejectionReason::IsolationDuplicate => "isolation_duplicate",
            RejectionReason::DominatedByBetterOption => "dominated_by_better_option",
            RejectionReason::SessionTimeExceeded => "session_time_exceeded",
        };
        write!(f, "{}", label)
    }
}

/// One rejected exercise with its reason, in discovery order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub exercise_id: String,
    pub exercise_name: String,
    pub reason: RejectionReason,
}

/// Blend weights over the seven sub-scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub deficit_fill: f64,
    pub rotation_novelty: f64,
    pub lengthened: f64,
    pub sfr: f64,
    pub movement_diversity: f64,
    pub sra_readiness: f64,
    pub user_preference: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        ScoreWeights {
            deficit_fill: 0.35,
            rotation_novelty: 0.22,
            lengthened: 0.20,
            sfr: 0.12,
            movement_diversity: 0.07,
            sra_readiness: 0.03,
            user_preference: 0.01,
        }
    }
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.deficit_fill
            + self.rotation_novelty
            + self.lengthened
            + self.sfr
            + self.movement_diversity
            + self.sra_readiness
            + self.user_preference
    }

    /// Rescale overridden weights so totals stay comparable to defaults
    pub fn normalized(&self) -> ScoreWeights {
        let sum = self.sum();
        if sum <= 0.0 {
            return ScoreWeights::default();
        }
        ScoreWeights {
            deficit_fill: self.deficit_fill / sum,
            rotation_novelty: self.rotation_novelty / sum,
            lengthened: self.lengthened / sum,
            sfr: self.sfr / sum,
            movement_diversity: self.movement_diversity / sum,
            sra_readiness: self.sra_readiness / sum,
            user_preference: self.user_preference / sum,
        }
    }
}

/// The seven normalized sub-scores, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub deficit_fill: f64,
    pub rotation_novelty: f64,
    pub sfr: f64,
    pub lengthened: f64,
    pub movement_novelty: f64,
    pub sra_alignment: f64,
    pub user_preference: f64,
}

impl SubScores {
    pub fn weighted_total(&self, weights: &ScoreWeights) -> f64 {
        self.deficit_fill * weights.deficit_fill
            + self.rotation_novelty * weights.rotation_novelty
            + self.lengthened * weights.lengthened
            + self.sfr * weights.sfr
            + self.movement_novelty * weights.movement_diversity
            + self.sra_alignment * weights.sra_readiness
            + self.user_preference * weights.user_preference
    }
}

/// Per-muscle set contribution of a candidate, as a small dense list
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeContribution {
    pub muscle: Muscle,
    pub direct: f64,
    pub indirect: f64,
}

impl VolumeContribution {
    pub fn effective(&self) -> f64 {
        self.direct + INDIRECT_MULTIPLIER * self.indirect
    }
}

/// A scored, fully costed selection candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionCandidate {
    pub exercise: Exercise,
    pub proposed_sets: u32,
    pub contributions: Vec<VolumeContribution>,
    pub time_minutes: f64,
    pub scores: SubScores,
    pub total: f64,
    pub is_favorite: bool,
}

impl SelectionCandidate {
    pub fn contribution_for(&self, muscle: Muscle) -> Option<&VolumeContribution> {
        self.contributions.iter().find(|c| c.muscle == muscle)
    }

    /// Effective contribution map for volume bookkeeping
    pub fn effective_contributions(&self) -> BTreeMap<Muscle, f64> {
        self.contributions
            .iter()
            .map(|c| (c.muscle, c.effective()))
            .collect()
    }
}

/// Estimated ramp cost attached to main-lift candidates (3 sets x ~75s)
const WARMUP_BLOCK_MINUTES: f64 = 3.0 * 75.0 / 60.0;

const DEFAULT_WORK_SECONDS: u32 = 40;

/// Block-dependent default rest used for time estimation
pub fn default_rest_seconds(block: Option<&BlockContext>) -> u32 {
    match block.map(|b| b.phase) {
        Some(MesocyclePhase::Accumulation) | Some(MesocyclePhase::Intensification) => 120,
        Some(MesocyclePhase::Realization) => 180,
        Some(MesocyclePhase::Deload) => 60,
        None => 90,
    }
}

/// Everything candidate building reads; all borrowed, all read-only
pub struct CandidateInputs<'a> {
    pub library: &'a [Exercise],
    pub intent: &'a SessionIntent,
    pub volume: &'a VolumeContext,
    pub rotation: &'a RotationIndex,
    pub user: &'a UserContext,
    pub targets: &'a VolumeTargets,
    pub history: &'a [WorkoutHistoryEntry],
    pub today: NaiveDate,
    pub weights: &'a ScoreWeights,
}

/// Output of the candidate-building pass
#[derive(Debug, Clone)]
pub struct CandidatePool {
    pub candidates: Vec<SelectionCandidate>,
    pub rejections: Vec<Rejection>,
}

pub struct CandidateBuilder;

impl CandidateBuilder {
    /// Build and score the feasible candidate pool.
    ///
    /// Hard filters run first and fail fast; pain conflicts take precedence
    /// over user avoids when both apply. Rejections preserve library order.
    pub fn build(inputs: &CandidateInputs<'_>) -> CandidatePool {
        let mut candidates = Vec::new();
        let mut rejections = Vec::new();
        let required = inputs.intent.required_muscles();

        for exercise in inputs.library {
            if let Some(reason) = Self::hard_filter(exercise, inputs) {
                rejections.push(Rejection {
                    exercise_id: exercise.id.clone(),
                    exercise_name: exercise.name.clone(),
                    reason,
                });
                continue;
            }
            candidates.push(Self::score_candidate(exercise, &required, inputs));
        }

        // deterministic presentation order: score desc, then name asc
        candidates.sort_by(|a, b| {
            b.total
                .total_cmp(&a.total)
                .then_with(|| a.exercise.name.cmp(&b.exercise.name))
        });

        debug!(
            feasible = candidates.len(),
            rejected = rejections.len(),
            "candidate pool built"
        );

        CandidatePool {
            candidates,
            rejections,
        }
    }

    fn hard_filter(exercise: &Exercise, inputs: &CandidateInputs<'_>) -> Option<RejectionReason> {
        let prefs = &inputs.user.preferences;
        let injuries = &inputs.user.profile.injury_flags;

        // pain conflict outranks an avoid on the same exercise
        if exercise
            .contraindications
            .iter()
            .any(|flag| injuries.contains(flag))
        {
            return Some(RejectionReason::PainConflict);
        }
        if prefs.avoid_ids.contains(&exercise.id) {
            return Some(RejectionReason::UserAvoided);
        }
        let available = &inputs.user.constraints.available_equipment;
        if !exercise.equipment.iter().all(|e| available.contains(e)) {
            return Some(RejectionReason::EquipmentUnavailable);
        }
        if !inputs.intent.admits(exercise) {
            return Some(RejectionReason::SplitMismatch);
        }
        None
    }

    fn score_candidate(
        exercise: &Exercise,
        required: &[Muscle],
        inputs: &CandidateInputs<'_>,
    ) -> SelectionCandidate {
        let proposed_sets = Self::propose_sets(exercise, required, inputs);

        let contributions = Self::contributions(exercise, proposed_sets);
        let time_minutes = Self::time_minutes(exercise, proposed_sets, inputs.user.block.as_ref());

        let is_favorite = inputs
            .user
            .preferences
            .favorite_ids
            .contains(&exercise.id);

        let scores = SubScores {
            deficit_fill: Self::deficit_fill(&contributions, inputs),
            rotation_novelty: inputs.rotation.novelty_score(&exercise.name),
            sfr: f64::from(exercise.sfr_score.unwrap_or(3)) / 5.0,
            lengthened: f64::from(exercise.length_position_score.unwrap_or(3)) / 5.0,
            // frozen at build time; the beam re-computes it per state
            movement_novelty: 1.0,
            sra_alignment: Self::sra_alignment(exercise, inputs),
            user_preference: if is_favorite { 1.0 } else { 0.5 },
        };

        let total = scores.weighted_total(inputs.weights);

        SelectionCandidate {
            exercise: exercise.clone(),
            proposed_sets,
            contributions,
            time_minutes,
            scores,
            total,
            is_favorite,
        }
    }

    /// Set heuristic: half the largest primary-muscle deficit, clamped to
    /// [2, 5]; floored at 3 when the exercise serves a required muscle;
    /// floored further at last session's set count for continuity. Hard cap
    /// of 12 regardless.
    fn propose_sets(
        exercise: &Exercise,
        required: &[Muscle],
        inputs: &CandidateInputs<'_>,
    ) -> u32 {
        let max_deficit = exercise
            .primary_muscles
            .iter()
            .filter_map(|m| {
                inputs
                    .targets
                    .get(m)
                    .map(|landmarks| inputs.volume.deficit(*m, landmarks))
            })
            .fold(0.0f64, f64::max);

        let mut sets = ((max_deficit / 2.0).ceil() as u32).clamp(2, 5);

        if exercise
            .primary_muscles
            .iter()
            .any(|m| required.contains(m))
        {
            sets = sets.max(3);
        }

        if let Some(continuity) =
            inputs.rotation.continuity_sets(&exercise.name, inputs.history)
        {
            sets = sets.max(continuity);
        }

        sets.min(12)
    }

    fn contributions(exercise: &Exercise, sets: u32) -> Vec<VolumeContribution> {
        let mut list: Vec<VolumeContribution> = Vec::new();
        for muscle in &exercise.primary_muscles {
            list.push(VolumeContribution {
                muscle: *muscle,
                direct: sets as f64,
                indirect: 0.0,
            });
        }
        for muscle in &exercise.secondary_muscles {
            if let Some(existing) = list.iter_mut().find(|c| c.muscle == *muscle) {
                existing.indirect += sets as f64;
            } else {
                list.push(VolumeContribution {
                    muscle: *muscle,
                    direct: 0.0,
                    indirect: sets as f64,
                });
            }
        }
        list.sort_by_key(|c| c.muscle);
        list
    }

    fn time_minutes(exercise: &Exercise, sets: u32, block: Option<&BlockContext>) -> f64 {
        let work = exercise.time_per_set_seconds.unwrap_or(DEFAULT_WORK_SECONDS);
        let rest = default_rest_seconds(block);
        let mut minutes = f64::from(work + rest) * f64::from(sets) / 60.0;
        if exercise.main_lift_eligible {
            minutes += WARMUP_BLOCK_MINUTES;
        }
        minutes
    }

    /// Share of the remaining weekly deficit this candidate fills, over the
    /// muscles it touches
    fn deficit_fill(contributions: &[VolumeContribution], inputs: &CandidateInputs<'_>) -> f64 {
        let mut filled = 0.0;
        let mut total_deficit = 0.0;
        for contribution in contributions {
            let Some(landmarks) = inputs.targets.get(&contribution.muscle) else {
                continue;
            };
            let deficit = inputs.volume.deficit(contribution.muscle, landmarks);
            total_deficit += deficit;
            filled += contribution.effective().min(deficit);
        }
        if total_deficit <= 0.0 {
            0.0
        } else {
            filled / total_deficit
        }
    }

    /// Mean SRA recovery fraction across primary muscles, defaulting to
    /// fully recovered when the exercise declares no horizon
    fn sra_alignment(exercise: &Exercise, inputs: &CandidateInputs<'_>) -> f64 {
        if exercise.primary_muscles.is_empty() {
            return 1.0;
        }
        let mut sum = 0.0;
        for muscle in &exercise.primary_muscles {
            let recovery = match (
                exercise.sra_recovery_hours.get(muscle),
                inputs.volume.last_trained.get(muscle),
            ) {
                (Some(&horizon), Some(&last)) if horizon > 0 => {
                    let hours = (inputs.today - last).num_days().max(0) as f64 * 24.0;
                    (hours / f64::from(horizon)).min(1.0)
                }
                _ => 1.0,
            };
            sum += recovery;
        }
        sum / exercise.primary_muscles.len() as f64
    }
}

/// Movement-novelty for a pattern set against the patterns a beam state
/// already covers. Shared by build-time scoring and beam-time rescoring.
pub fn movement_novelty(
    patterns: &[MovementPattern],
    covered: &BTreeMap<MovementPattern, u32>,
) -> f64 {
    if patterns.is_empty() {
        return 0.0;
    }
    let novel = patterns
        .iter()
        .filter(|p| !covered.contains_key(*p))
        .count();
    novel as f64 / patterns.len() as f64
}
