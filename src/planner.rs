//! Session assembly and the top-level planning pipeline
//!
//! `SessionPlanner::plan_session` is the single entry point: a pure function
//! from (library, user context, history, baselines, intent, seed, date) to a
//! fully prescribed session plan. The pipeline runs leaves-first: volume
//! context and rotation index feed candidate scoring, the beam search picks
//! the session, the stretch upgrade polishes isolations, then prescription,
//! load assignment, and warmups fill in the numbers before assembly orders
//! and trims the final plan.

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::beam::{BeamSelector, SelectionOutcome, SessionStructure, PATTERN_CAP, SESSION_DIRECT_SET_CAP};
use crate::config::PlannerConfig;
use crate::error::PlanningError;
use crate::models::{
    Baselines, Exercise, Goal, Muscle, SessionIntent, UserContext, WorkoutHistoryEntry,
};
use crate::prescription::{Prescriber, Prescription, RepRange, Role};
use crate::progression::{LoadAssigner, LoadInputs, LoadSource};
use crate::rotation::RotationIndex;
use crate::scoring::{
    CandidateBuilder, CandidateInputs, Rejection, RejectionReason, SelectionCandidate,
};
use crate::split::SplitClassifier;
use crate::upgrade::StretchUpgrade;
use crate::volume::{VolumeContext, VolumeContextBuilder};
use crate::warmup::{build_ramp, WarmupSet};

/// Minutes of slack required before the seeded bonus accessory is considered
const BONUS_SLACK_MINUTES: f64 = 8.0;

const DEFAULT_WORK_SECONDS: u32 = 40;

/// Seconds of bar time assumed per warmup set when estimating duration
const WARMUP_SET_WORK_SECONDS: u32 = 30;

/// Inputs to one planning call; everything is borrowed and read-only
pub struct PlanRequest<'a> {
    pub library: &'a [Exercise],
    pub user: &'a UserContext,
    pub history: &'a [WorkoutHistoryEntry],
    pub baselines: &'a Baselines,
    /// Session intent; derived from recent history when absent
    pub intent: Option<SessionIntent>,
    /// Seed for the bonus-accessory weighted pick
    pub seed: u64,
    /// Date the session is planned for
    pub date: NaiveDate,
}

/// One prescribed working set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedSet {
    pub set_number: u32,
    pub target_reps: u32,
    pub target_rpe: Option<f64>,
    pub target_load: Option<Decimal>,
    pub rest_seconds: u32,
}

/// One exercise slot in the plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedExercise {
    pub exercise_id: String,
    pub exercise_name: String,
    pub role: Role,
    pub rep_range: RepRange,
    pub sets: Vec<PlannedSet>,
    pub load_source: LoadSource,
    pub rationale: Vec<String>,
}

/// Warmup ramp attached ahead of a main lift
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarmupEntry {
    pub exercise_id: String,
    pub exercise_name: String,
    pub sets: Vec<WarmupSet>,
}

/// The planner's only output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPlan {
    pub id: String,
    pub scheduled_date: NaiveDate,
    pub intent: SessionIntent,
    pub warmup: Vec<WarmupEntry>,
    pub main_lifts: Vec<PlannedExercise>,
    pub accessories: Vec<PlannedExercise>,
    pub estimated_minutes: u32,
    pub notes: Vec<String>,
    /// Effective session volume added per muscle
    pub filled_volume: BTreeMap<Muscle, f64>,
    /// Weekly deficit left after this session
    pub remaining_deficit: BTreeMap<Muscle, f64>,
    pub rejections: Vec<Rejection>,
    pub constraints_satisfied: bool,
}

impl SessionPlan {
    /// All prescribed exercises in session order
    pub fn exercises(&self) -> impl Iterator<Item = &PlannedExercise> {
        self.main_lifts.iter().chain(self.accessories.iter())
    }

    pub fn exercise_count(&self) -> usize {
        self.main_lifts.len() + self.accessories.len()
    }

    /// Equality modulo the generated id
    pub fn same_plan(&self, other: &SessionPlan) -> bool {
        self.scheduled_date == other.scheduled_date
            && self.intent == other.intent
            && self.warmup == other.warmup
            && self.main_lifts == other.main_lifts
            && self.accessories == other.accessories
            && self.estimated_minutes == other.estimated_minutes
            && self.notes == other.notes
            && self.filled_volume == other.filled_volume
            && self.remaining_deficit == other.remaining_deficit
            && self.rejections == other.rejections
            && self.constraints_satisfied == other.constraints_satisfied
    }
}

pub struct SessionPlanner;

impl SessionPlanner {
    /// Plan one session. Pure and deterministic: identical inputs (seed
    /// included) produce identical plans.
    pub fn plan_session(request: &PlanRequest<'_>, config: &PlannerConfig) -> SessionPlan {
        let mut history: Vec<WorkoutHistoryEntry> = request.history.to_vec();
        history.sort_by_key(|e| e.date);

        let volume = VolumeContextBuilder::build(&history, request.date);
        let rotation = RotationIndex::build(&history, request.date);

        let intent = request.intent.clone().unwrap_or_else(|| {
            SplitClassifier::derive_next_intent(&history, request.user.constraints.split_type)
        });
        info!(intent = %intent, date = %request.date, "planning session");

        // unknown preference ids are ignored, not fatal; surface them
        for id in request
            .user
            .preferences
            .favorite_ids
            .iter()
            .chain(request.user.preferences.avoid_ids.iter())
        {
            if !request.library.iter().any(|e| &e.id == id) {
                let error = PlanningError::UnknownPreference {
                    exercise_id: id.clone(),
                };
                warn!(error = %error, "inconsistent input ignored");
            }
        }

        let targets = request.user.effective_landmarks();
        let weights = config.effective_weights();

        let inputs = CandidateInputs {
            library: request.library,
            intent: &intent,
            volume: &volume,
            rotation: &rotation,
            user: request.user,
            targets: &targets,
            history: &history,
            today: request.date,
            weights: &weights,
        };
        let pool = CandidateBuilder::build(&inputs);

        let structure = SessionStructure::derive(request.user);
        let selector = BeamSelector::new(
            &pool.candidates,
            &volume,
            &targets,
            structure,
            config.beam_params(),
            &weights,
        );
        let mut outcome = selector.select();

        // hard-filter rejections come first in discovery order
        let mut rejections = pool.rejections.clone();
        rejections.append(&mut outcome.rejections);
        outcome.rejections = rejections;

        StretchUpgrade::apply(&mut outcome, &pool.candidates);

        Self::bonus_accessory(&mut outcome, &pool.candidates, request, &volume, &targets);

        Self::assemble(request, config, &history, &volume, &targets, intent, structure, outcome)
    }

    /// Seeded weighted pick of one extra accessory when the session has
    /// spare time. The only randomized step in the pipeline.
    fn bonus_accessory(
        outcome: &mut SelectionOutcome,
        pool: &[SelectionCandidate],
        request: &PlanRequest<'_>,
        volume: &VolumeContext,
        targets: &crate::models::VolumeTargets,
    ) {
        let Some(budget) = request.user.constraints.session_minutes else {
            return;
        };
        if outcome.selected.is_empty()
            || f64::from(budget) - outcome.time_minutes < BONUS_SLACK_MINUTES
        {
            return;
        }

        let eligible: Vec<&SelectionCandidate> = pool
            .iter()
            .filter(|candidate| {
                let exercise = &candidate.exercise;
                if exercise.main_lift_eligible {
                    return false;
                }
                if outcome
                    .selected
                    .iter()
                    .any(|s| s.exercise.id == exercise.id)
                {
                    return false;
                }
                Self::bonus_fits(candidate, outcome, volume, targets)
            })
            .collect();
        if eligible.is_empty() {
            return;
        }

        let total_weight: f64 = eligible.iter().map(|c| c.total.max(1e-6)).sum();
        let mut rng = StdRng::seed_from_u64(request.seed);
        let mut roll = rng.gen::<f64>() * total_weight;
        let mut chosen: &SelectionCandidate = eligible[eligible.len() - 1];
        for &candidate in &eligible {
            roll -= candidate.total.max(1e-6);
            if roll <= 0.0 {
                chosen = candidate;
                break;
            }
        }

        debug!(exercise = %chosen.exercise.name, "bonus accessory added");
        for contribution in &chosen.contributions {
            *outcome
                .filled_volume
                .entry(contribution.muscle)
                .or_insert(0.0) += contribution.effective();
        }
        outcome.time_minutes += chosen.time_minutes;
        outcome.rationale.push((
            chosen.exercise.name.clone(),
            "bonus accessory (seeded pick)".to_string(),
        ));
        outcome.selected.push((*chosen).clone());
    }

    /// Ceiling and cap checks for the bonus pick, mirroring the in-search
    /// constraints
    fn bonus_fits(
        candidate: &SelectionCandidate,
        outcome: &SelectionOutcome,
        volume: &VolumeContext,
        targets: &crate::models::VolumeTargets,
    ) -> bool {
        for contribution in &candidate.contributions {
            if let Some(landmarks) = targets.get(&contribution.muscle) {
                let weekly = volume.current.effective(contribution.muscle)
                    + outcome
                        .filled_volume
                        .get(&contribution.muscle)
                        .copied()
                        .unwrap_or(0.0)
                    + contribution.effective();
                if weekly > landmarks.mrv {
                    return false;
                }
            }
        }

        let mut patterns: BTreeMap<crate::models::MovementPattern, u32> = BTreeMap::new();
        let mut direct: BTreeMap<Muscle, f64> = BTreeMap::new();
        for selected in &outcome.selected {
            for pattern in &selected.exercise.movement_patterns {
                *patterns.entry(*pattern).or_insert(0) += 1;
            }
            for contribution in &selected.contributions {
                *direct.entry(contribution.muscle).or_insert(0.0) += contribution.direct;
            }
        }
        for pattern in &candidate.exercise.movement_patterns {
            if patterns.get(pattern).copied().unwrap_or(0) + 1 > PATTERN_CAP {
                return false;
            }
        }
        for contribution in &candidate.contributions {
            let total = direct
                .get(&contribution.muscle)
                .copied()
                .unwrap_or(0.0)
                + contribution.direct;
            if contribution.direct > 0.0 && total > SESSION_DIRECT_SET_CAP {
                return false;
            }
        }

        let exercise = &candidate.exercise;
        if exercise.is_isolation() {
            // no second isolation on the same muscle-and-pattern slot
            for selected in &outcome.selected {
                let other = &selected.exercise;
                if !other.is_isolation() {
                    continue;
                }
                let shares_pattern = exercise
                    .movement_patterns
                    .iter()
                    .any(|p| other.has_pattern(*p));
                let shares_primary = exercise
                    .primary_muscles
                    .iter()
                    .any(|m| other.has_primary(*m));
                if shares_pattern && shares_primary {
                    return false;
                }
            }
            // triceps isolation cap under two pressing compounds
            if exercise.has_primary(Muscle::Triceps) {
                let pressing = outcome
                    .selected
                    .iter()
                    .filter(|s| s.exercise.is_pressing_triceps_compound())
                    .count();
                let triceps_isolations = outcome
                    .selected
                    .iter()
                    .filter(|s| {
                        s.exercise.is_isolation() && s.exercise.has_primary(Muscle::Triceps)
                    })
                    .count();
                if pressing >= 2 && triceps_isolations >= 1 {
                    return false;
                }
            }
        }
        if exercise.has_primary(Muscle::FrontDelts)
            && outcome
                .filled_volume
                .get(&Muscle::FrontDelts)
                .copied()
                .unwrap_or(0.0)
                >= crate::beam::FRONT_DELT_SUPPRESSION_THRESHOLD
        {
            return false;
        }
        true
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        request: &PlanRequest<'_>,
        config: &PlannerConfig,
        history: &[WorkoutHistoryEntry],
        volume: &VolumeContext,
        targets: &crate::models::VolumeTargets,
        intent: SessionIntent,
        structure: SessionStructure,
        outcome: SelectionOutcome,
    ) -> SessionPlan {
        let user = request.user;
        let goal = user.goals.primary;
        let block = user.block.as_ref();
        let required = intent.required_muscles();

        let assigner = LoadAssigner::new(LoadInputs {
            history,
            baselines: request.baselines,
            library: request.library,
            profile: &user.profile,
            goal,
            intent: &intent,
            block,
            flags: &config.flags,
        });

        let rationale: BTreeMap<String, Vec<String>> = {
            let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for (name, text) in &outcome.rationale {
                map.entry(name.clone()).or_default().push(text.clone());
            }
            map
        };

        let mut planned: Vec<(PlannedExercise, SelectionCandidate)> = Vec::new();
        let mut warmup: Vec<WarmupEntry> = Vec::new();

        for candidate in &outcome.selected {
            let exercise = &candidate.exercise;
            let role = if exercise.main_lift_eligible {
                Role::MainLift
            } else {
                Role::Accessory
            };

            let mut proposed = candidate.proposed_sets;
            if let Some(block) = block {
                proposed =
                    ((f64::from(proposed) * block.volume_multiplier).round() as u32).max(1);
            }

            let mut prescription = Prescriber::prescribe(
                exercise,
                role,
                proposed,
                goal,
                user.profile.training_age,
                &volume.fatigue,
                block,
                &user.preferences,
            );

            // revised fat-loss policy biases toward density
            if config.flags.use_revised_fat_loss_policy && goal == Goal::FatLoss {
                let cap = match role {
                    Role::MainLift => 150,
                    Role::Accessory => 75,
                };
                prescription.rest_seconds = prescription.rest_seconds.min(cap);
            }

            let decision = assigner.assign(exercise, &prescription);

            if role == Role::MainLift {
                let ramp = build_ramp(exercise, decision.top_set_load, user.profile.training_age);
                if !ramp.is_empty() {
                    warmup.push(WarmupEntry {
                        exercise_id: exercise.id.clone(),
                        exercise_name: exercise.name.clone(),
                        sets: ramp,
                    });
                }
            }

            let sets = Self::planned_sets(&prescription, &decision.set_loads);
            let mut exercise_rationale =
                rationale.get(&exercise.name).cloned().unwrap_or_default();
            exercise_rationale.extend(decision.notes.clone());

            planned.push((
                PlannedExercise {
                    exercise_id: exercise.id.clone(),
                    exercise_name: exercise.name.clone(),
                    role,
                    rep_range: prescription.rep_range,
                    sets,
                    load_source: decision.source,
                    rationale: exercise_rationale,
                },
                candidate.clone(),
            ));
        }

        let mut rejections = outcome.rejections;
        let mut filled_volume = outcome.filled_volume;

        let (mut main_lifts, mut accessories) = Self::order_sections(planned, &required);

        // volume-cap trim precedes the time trim, accessories only
        if config.flags.use_effective_volume_caps {
            Self::volume_trim(
                &mut accessories,
                &mut warmup,
                &mut filled_volume,
                &mut rejections,
                volume,
                targets,
                main_lifts.len(),
                structure.min_exercises,
            );
        }
        if let Some(budget) = user.constraints.session_minutes {
            Self::time_trim(
                &mut accessories,
                &warmup,
                &main_lifts,
                &mut filled_volume,
                &mut rejections,
                budget,
                main_lifts.len(),
                structure.min_exercises,
            );
        }

        let estimated_minutes =
            Self::estimate_minutes(&main_lifts, &accessories, &warmup).round() as u32;

        let mut notes = vec![format!("{} session", intent)];
        if assigner.is_deload() {
            notes.push("deload: loads backed off".to_string());
        }
        if main_lifts.is_empty() && accessories.is_empty() {
            notes.push(PlanningError::EmptyFeasiblePool.to_string());
        } else if !outcome.constraints_satisfied {
            notes.push(PlanningError::StructureShortfall.to_string());
        }

        let constraints_satisfied =
            outcome.constraints_satisfied && !(main_lifts.is_empty() && accessories.is_empty());

        let id = Uuid::new_v5(
            &Uuid::NAMESPACE_OID,
            format!("liftrs:{}:{}:{}", request.date, intent, request.seed).as_bytes(),
        )
        .to_string();

        // strip trim casualties out of the main-lift warmup list
        let remaining_main_ids: BTreeSet<&str> = main_lifts
            .iter()
            .map(|(p, _)| p.exercise_id.as_str())
            .collect();
        warmup.retain(|w| remaining_main_ids.contains(w.exercise_id.as_str()));

        let remaining_deficit = {
            let mut map = BTreeMap::new();
            for (muscle, landmarks) in targets {
                let left = (volume.planning_target(*muscle, landmarks)
                    - volume.current.effective(*muscle)
                    - filled_volume.get(muscle).copied().unwrap_or(0.0))
                .max(0.0);
                if left > 0.0 {
                    map.insert(*muscle, left);
                }
            }
            map
        };

        SessionPlan {
            id,
            scheduled_date: request.date,
            intent,
            warmup,
            main_lifts: main_lifts.into_iter().map(|(p, _)| p).collect(),
            accessories: accessories.into_iter().map(|(p, _)| p).collect(),
            estimated_minutes,
            notes,
            filled_volume,
            remaining_deficit,
            rejections,
            constraints_satisfied,
        }
    }

    fn planned_sets(
        prescription: &Prescription,
        set_loads: &[Option<Decimal>],
    ) -> Vec<PlannedSet> {
        (0..prescription.sets)
            .map(|index| PlannedSet {
                set_number: index + 1,
                target_reps: prescription.rep_range.max,
                target_rpe: Some(prescription.target_rpe),
                target_load: set_loads.get(index as usize).copied().flatten(),
                rest_seconds: prescription.rest_seconds,
            })
            .collect()
    }

    /// Main lifts by descending required-muscle overlap; accessories with
    /// isolations last
    fn order_sections(
        planned: Vec<(PlannedExercise, SelectionCandidate)>,
        required: &[Muscle],
    ) -> (
        Vec<(PlannedExercise, SelectionCandidate)>,
        Vec<(PlannedExercise, SelectionCandidate)>,
    ) {
        let (mut main_lifts, mut accessories): (Vec<_>, Vec<_>) = planned
            .into_iter()
            .partition(|(p, _)| p.role == Role::MainLift);

        main_lifts.sort_by(|(_, a), (_, b)| {
            let overlap = |c: &SelectionCandidate| {
                c.exercise
                    .primary_muscles
                    .iter()
                    .filter(|m| required.contains(*m))
                    .count()
            };
            overlap(b)
                .cmp(&overlap(a))
                .then_with(|| a.exercise.name.cmp(&b.exercise.name))
        });

        accessories.sort_by(|(_, a), (_, b)| {
            a.exercise
                .is_isolation()
                .cmp(&b.exercise.is_isolation())
                .then_with(|| b.total.total_cmp(&a.total))
                .then_with(|| a.exercise.name.cmp(&b.exercise.name))
        });

        (main_lifts, accessories)
    }

    /// Removal priority: high fatigue first, unique movement patterns last
    fn trim_score(
        candidate: &SelectionCandidate,
        others: &[&SelectionCandidate],
    ) -> f64 {
        let fatigue = f64::from(candidate.exercise.fatigue_cost) / 5.0;
        let uniqueness = if candidate.exercise.movement_patterns.is_empty() {
            0.0
        } else {
            let covered: BTreeSet<_> = others
                .iter()
                .flat_map(|c| c.exercise.movement_patterns.iter().copied())
                .collect();
            let unique = candidate
                .exercise
                .movement_patterns
                .iter()
                .filter(|p| !covered.contains(*p))
                .count();
            unique as f64 / candidate.exercise.movement_patterns.len() as f64
        };
        fatigue + (1.0 - uniqueness)
    }

    #[allow(clippy::too_many_arguments)]
    fn volume_trim(
        accessories: &mut Vec<(PlannedExercise, SelectionCandidate)>,
        _warmup: &mut [WarmupEntry],
        filled_volume: &mut BTreeMap<Muscle, f64>,
        rejections: &mut Vec<Rejection>,
        volume: &VolumeContext,
        targets: &crate::models::VolumeTargets,
        main_count: usize,
        min_exercises: usize,
    ) {
        loop {
            let over: Vec<Muscle> = targets
                .iter()
                .filter(|(muscle, landmarks)| {
                    volume.current.effective(**muscle)
                        + filled_volume.get(*muscle).copied().unwrap_or(0.0)
                        > landmarks.mrv
                })
                .map(|(m, _)| *m)
                .collect();
            if over.is_empty() || main_count + accessories.len() <= min_exercises {
                break;
            }

            let victim = Self::pick_trim_victim(accessories, Some(&over));
            let Some(index) = victim else { break };
            let (planned, candidate) = accessories.remove(index);
            Self::subtract_volume(filled_volume, &candidate);
            debug!(exercise = %planned.exercise_name, "volume-cap trim");
            rejections.push(Rejection {
                exercise_id: planned.exercise_id,
                exercise_name: planned.exercise_name,
                reason: RejectionReason::VolumeCeilingReached,
            });
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn time_trim(
        accessories: &mut Vec<(PlannedExercise, SelectionCandidate)>,
        warmup: &[WarmupEntry],
        main_lifts: &[(PlannedExercise, SelectionCandidate)],
        filled_volume: &mut BTreeMap<Muscle, f64>,
        rejections: &mut Vec<Rejection>,
        budget_minutes: u32,
        main_count: usize,
        min_exercises: usize,
    ) {
        while Self::estimate_minutes(main_lifts, accessories, warmup) > f64::from(budget_minutes)
            && main_count + accessories.len() > min_exercises
        {
            let Some(index) = Self::pick_trim_victim(accessories, None) else {
                break;
            };
            let (planned, candidate) = accessories.remove(index);
            Self::subtract_volume(filled_volume, &candidate);
            debug!(exercise = %planned.exercise_name, "time-budget trim");
            rejections.push(Rejection {
                exercise_id: planned.exercise_id,
                exercise_name: planned.exercise_name,
                reason: RejectionReason::SessionTimeExceeded,
            });
        }
    }

    /// Index of the accessory to remove next, optionally restricted to
    /// those feeding an over-ceiling muscle
    fn pick_trim_victim(
        accessories: &[(PlannedExercise, SelectionCandidate)],
        over: Option<&[Muscle]>,
    ) -> Option<usize> {
        let candidates: Vec<usize> = accessories
            .iter()
            .enumerate()
            .filter(|(_, (_, c))| match over {
                Some(muscles) => c
                    .contributions
                    .iter()
                    .any(|contribution| muscles.contains(&contribution.muscle)),
                None => true,
            })
            .map(|(i, _)| i)
            .collect();
        candidates.into_iter().max_by(|&a, &b| {
            let others_a: Vec<&SelectionCandidate> = accessories
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != a)
                .map(|(_, (_, c))| c)
                .collect();
            let others_b: Vec<&SelectionCandidate> = accessories
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != b)
                .map(|(_, (_, c))| c)
                .collect();
            Self::trim_score(&accessories[a].1, &others_a)
                .total_cmp(&Self::trim_score(&accessories[b].1, &others_b))
                .then_with(|| accessories[b].1.exercise.name.cmp(&accessories[a].1.exercise.name))
        })
    }

    fn subtract_volume(filled_volume: &mut BTreeMap<Muscle, f64>, candidate: &SelectionCandidate) {
        for contribution in &candidate.contributions {
            if let Some(value) = filled_volume.get_mut(&contribution.muscle) {
                *value -= contribution.effective();
                if *value <= 1e-9 {
                    filled_volume.remove(&contribution.muscle);
                }
            }
        }
    }

    /// Duration estimate from the final prescriptions and ramps
    fn estimate_minutes(
        main_lifts: &[(PlannedExercise, SelectionCandidate)],
        accessories: &[(PlannedExercise, SelectionCandidate)],
        warmup: &[WarmupEntry],
    ) -> f64 {
        let mut minutes = 0.0;
        for (planned, candidate) in main_lifts.iter().chain(accessories.iter()) {
            let work = candidate
                .exercise
                .time_per_set_seconds
                .unwrap_or(DEFAULT_WORK_SECONDS);
            for set in &planned.sets {
                minutes += f64::from(work + set.rest_seconds) / 60.0;
            }
        }
        for entry in warmup {
            for set in &entry.sets {
                minutes += f64::from(WARMUP_SET_WORK_SECONDS + set.rest_seconds) / 60.0;
            }
        }
        minutes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Constraints, Equipment, Goals, JointStress, MovementPattern, Preferences, SplitTag,
        SplitType, TrainingAge, UserProfile,
    };
    use rust_decimal_macros::dec;

    fn exercise(
        id: &str,
        name: &str,
        primaries: Vec<Muscle>,
        patterns: Vec<MovementPattern>,
        main: bool,
    ) -> Exercise {
        Exercise {
            id: id.to_string(),
            name: name.to_string(),
            primary_muscles: primaries,
            secondary_muscles: vec![],
            movement_patterns: patterns,
            split_tags: vec![SplitTag::Push, SplitTag::Upper],
            joint_stress: JointStress::Medium,
            equipment: vec![Equipment::Barbell, Equipment::Bench],
            rep_range_min: 6,
            rep_range_max: 12,
            is_compound: main,
            main_lift_eligible: main,
            fatigue_cost: if main { 4 } else { 2 },
            sfr_score: Some(3),
            length_position_score: Some(3),
            time_per_set_seconds: Some(40),
            sra_recovery_hours: BTreeMap::new(),
            contraindications: vec![],
            plate_increment: dec!(2.5),
        }
    }

    fn push_library() -> Vec<Exercise> {
        vec![
            exercise(
                "ex_bench",
                "Barbell Bench Press",
                vec![Muscle::Chest, Muscle::Triceps],
                vec![MovementPattern::HorizontalPush],
                true,
            ),
            {
                let mut e = exercise(
                    "ex_ohp",
                    "Overhead Press",
                    vec![Muscle::FrontDelts, Muscle::Triceps],
                    vec![MovementPattern::VerticalPush],
                    true,
                );
                e.equipment = vec![Equipment::Barbell];
                e
            },
            {
                let mut e = exercise(
                    "ex_lateral",
                    "Dumbbell Lateral Raise",
                    vec![Muscle::SideDelts],
                    vec![MovementPattern::Abduction],
                    false,
                );
                e.equipment = vec![Equipment::Dumbbell];
                e
            },
            {
                let mut e = exercise(
                    "ex_fly",
                    "Cable Fly",
                    vec![Muscle::Chest],
                    vec![MovementPattern::Isolation],
                    false,
                );
                e.equipment = vec![Equipment::Cable];
                e
            },
            {
                let mut e = exercise(
                    "ex_pushdown",
                    "Cable Pushdown",
                    vec![Muscle::Triceps],
                    vec![MovementPattern::Extension],
                    false,
                );
                e.equipment = vec![Equipment::Cable];
                e
            },
        ]
    }

    fn user() -> UserContext {
        UserContext {
            profile: UserProfile {
                training_age: TrainingAge::Intermediate,
                body_weight: Some(dec!(180)),
                injury_flags: vec![],
            },
            goals: Goals { primary: Goal::Hypertrophy, secondary: None },
            constraints: Constraints {
                days_per_week: 4,
                session_minutes: Some(75),
                split_type: SplitType::Ppl,
                available_equipment: vec![
                    Equipment::Barbell,
                    Equipment::Dumbbell,
                    Equipment::Cable,
                    Equipment::Bench,
                ],
            },
            preferences: Preferences::default(),
            block: None,
            volume_landmarks: BTreeMap::new(),
        }
    }

    fn d() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 20).unwrap()
    }

    fn plan(library: &[Exercise], user: &UserContext, seed: u64) -> SessionPlan {
        let baselines = Baselines::default();
        let request = PlanRequest {
            library,
            user,
            history: &[],
            baselines: &baselines,
            intent: Some(SessionIntent::Push),
            seed,
            date: d(),
        };
        SessionPlanner::plan_session(&request, &PlannerConfig::default())
    }

    #[test]
    fn test_plan_has_required_shape() {
        let library = push_library();
        let plan = plan(&library, &user(), 42);
        assert!(plan.exercise_count() >= 4);
        assert!(!plan.main_lifts.is_empty());
        assert!(plan.accessories.len() >= 2);
        assert!(plan.estimated_minutes > 0);
        for planned in plan.exercises() {
            assert!(!planned.sets.is_empty());
            for set in &planned.sets {
                assert!(set.target_reps >= 1);
                if let Some(rpe) = set.target_rpe {
                    assert!((5.0..=10.0).contains(&rpe));
                }
            }
        }
    }

    #[test]
    fn test_plan_is_deterministic() {
        let library = push_library();
        let a = plan(&library, &user(), 7);
        let b = plan(&library, &user(), 7);
        assert!(a.same_plan(&b));
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn test_no_duplicate_exercises() {
        let library = push_library();
        let plan = plan(&library, &user(), 1);
        let mut ids: Vec<&str> = plan.exercises().map(|p| p.exercise_id.as_str()).collect();
        let before = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(before, ids.len());
    }

    #[test]
    fn test_empty_library_yields_empty_plan() {
        let plan = plan(&[], &user(), 1);
        assert_eq!(plan.exercise_count(), 0);
        assert!(!plan.constraints_satisfied);
        assert!(plan.notes.iter().any(|n| n == "no feasible exercises"));
    }

    #[test]
    fn test_warmups_only_for_resolvable_main_lifts() {
        // no history, no baselines, no body weight: loads unresolvable
        let mut user = user();
        user.profile.body_weight = None;
        let library = push_library();
        let plan = plan(&library, &user, 1);
        for entry in &plan.warmup {
            let main = plan
                .main_lifts
                .iter()
                .find(|m| m.exercise_id == entry.exercise_id)
                .expect("warmup references a main lift");
            assert!(main.sets[0].target_load.is_some());
        }
    }

    #[test]
    fn test_time_trim_respects_budget_and_floor() {
        let mut user = user();
        user.constraints.session_minutes = Some(35);
        let library = push_library();
        let plan = plan(&library, &user, 1);
        // trimmed accessories appear in the ledger
        if plan.estimated_minutes > 35 {
            // floor held: could not trim further
            assert!(plan.exercise_count() >= 3);
        } else {
            assert!(plan.exercise_count() >= 3);
        }
    }

    #[test]
    fn test_isolations_ordered_last_in_accessories() {
        let library = push_library();
        let plan = plan(&library, &user(), 1);
        let mut seen_isolation = false;
        for accessory in &plan.accessories {
            let exercise = library
                .iter()
                .find(|e| e.id == accessory.exercise_id)
                .unwrap();
            if exercise.is_isolation() {
                seen_isolation = true;
            } else {
                assert!(!seen_isolation, "compound accessory after an isolation");
            }
        }
    }

    #[test]
    fn test_intent_derived_when_absent() {
        let library = push_library();
        let baselines = Baselines::default();
        let user = user();
        let request = PlanRequest {
            library: &library,
            user: &user,
            history: &[],
            baselines: &baselines,
            intent: None,
            seed: 3,
            date: d(),
        };
        let plan = SessionPlanner::plan_session(&request, &PlannerConfig::default());
        // empty PPL history starts at push
        assert_eq!(plan.intent, SessionIntent::Push);
    }
}
