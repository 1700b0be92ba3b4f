//! Constrained beam-search exercise selection
//!
//! A deterministic beam search over the scored candidate pool. States carry
//! their own volume, pattern, and time bookkeeping; every failed extension is
//! recorded with an enumerated reason, making the rejection ledger the
//! primary observability surface of selection. Ordering ties always resolve
//! through (score desc, favorite count desc, selected-names lexicographic),
//! so identical inputs produce identical beams on every platform.

use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::models::{Goal, Muscle, MovementPattern, TrainingAge, UserContext, VolumeTargets};
use crate::scoring::{
    movement_novelty, Rejection, RejectionReason, ScoreWeights, SelectionCandidate,
};
use crate::volume::VolumeContext;

/// At most this many exercises may share one movement pattern in a session
pub const PATTERN_CAP: u32 = 2;

/// Hard per-session ceiling on direct sets for any single muscle
pub const SESSION_DIRECT_SET_CAP: f64 = 12.0;

/// Effective front-delt volume within a state beyond which direct-primary
/// front-delt accessories are suppressed
pub const FRONT_DELT_SUPPRESSION_THRESHOLD: f64 = 1.0;

/// Structural minimums and maximums a session must satisfy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStructure {
    pub min_exercises: usize,
    pub min_main_lifts: usize,
    pub max_main_lifts: usize,
    pub min_accessories: usize,
}

impl SessionStructure {
    /// Structure derived from goal, training age, and the session budget
    pub fn derive(user: &UserContext) -> Self {
        let strength = user.goals.primary == Goal::Strength;
        let mut structure = SessionStructure {
            min_exercises: 4,
            min_main_lifts: if strength { 2 } else { 1 },
            max_main_lifts: if strength { 3 } else { 2 },
            min_accessories: if strength { 1 } else { 2 },
        };
        if user.profile.training_age == TrainingAge::Beginner {
            structure.min_exercises = 3;
        }
        if matches!(user.constraints.session_minutes, Some(m) if m < 40) {
            structure.min_exercises = structure.min_exercises.min(3);
            structure.min_accessories = structure.min_accessories.min(1);
        }
        structure
    }
}

/// Search-width parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeamParams {
    pub beam_width: usize,
    pub max_depth: usize,
    pub epsilon: f64,
}

impl Default for BeamParams {
    fn default() -> Self {
        BeamParams {
            beam_width: 7,
            max_depth: 8,
            epsilon: 0.05,
        }
    }
}

impl BeamParams {
    /// Cold-start levels shrink the search: 1 narrows, 2 narrows further
    pub fn with_cold_start(mut self, level: u8) -> Self {
        match level {
            1 => {
                self.beam_width = self.beam_width.min(5);
                self.max_depth = self.max_depth.min(6);
            }
            2 => {
                self.beam_width = self.beam_width.min(3);
                self.max_depth = self.max_depth.min(5);
            }
            _ => {}
        }
        self
    }
}

/// Record a rejection once per (exercise, reason), preserving encounter order
fn record_rejection(
    rejections: &mut Vec<Rejection>,
    keys: &mut HashSet<(String, RejectionReason)>,
    candidate: &SelectionCandidate,
    reason: RejectionReason,
) {
    if keys.insert((candidate.exercise.id.clone(), reason)) {
        rejections.push(Rejection {
            exercise_id: candidate.exercise.id.clone(),
            exercise_name: candidate.exercise.name.clone(),
            reason,
        });
    }
}

/// One partial selection under construction
#[derive(Debug, Clone)]
struct BeamState {
    selected: Vec<usize>,
    effective: BTreeMap<Muscle, f64>,
    direct_sets: BTreeMap<Muscle, f64>,
    patterns: BTreeMap<MovementPattern, u32>,
    time_minutes: f64,
    score: f64,
    favorite_count: u32,
    main_lift_count: usize,
    pressing_triceps_compounds: u32,
    triceps_isolations: u32,
}

impl BeamState {
    fn empty() -> Self {
        BeamState {
            selected: Vec::new(),
            effective: BTreeMap::new(),
            direct_sets: BTreeMap::new(),
            patterns: BTreeMap::new(),
            time_minutes: 0.0,
            score: 0.0,
            favorite_count: 0,
            main_lift_count: 0,
            pressing_triceps_compounds: 0,
            triceps_isolations: 0,
        }
    }

    fn effective_for(&self, muscle: Muscle) -> f64 {
        self.effective.get(&muscle).copied().unwrap_or(0.0)
    }

    fn accessory_count(&self) -> usize {
        self.selected.len() - self.main_lift_count
    }

    /// Sorted selected names, the stable last-resort tiebreak key
    fn name_key(&self, candidates: &[SelectionCandidate]) -> Vec<String> {
        let mut names: Vec<String> = self
            .selected
            .iter()
            .map(|&i| candidates[i].exercise.name.clone())
            .collect();
        names.sort();
        names
    }

    fn sorted_ids(&self) -> Vec<usize> {
        let mut ids = self.selected.clone();
        ids.sort_unstable();
        ids
    }
}

/// Final outcome of selection, including the rejection ledger
#[derive(Debug, Clone)]
pub struct SelectionOutcome {
    pub selected: Vec<SelectionCandidate>,
    /// Effective session volume added per muscle
    pub filled_volume: BTreeMap<Muscle, f64>,
    /// Weekly deficit left after this session
    pub remaining_deficit: BTreeMap<Muscle, f64>,
    pub time_minutes: f64,
    /// Per-exercise selection rationale, in selection order
    pub rationale: Vec<(String, String)>,
    pub rejections: Vec<Rejection>,
    pub constraints_satisfied: bool,
}

/// Read-only context the selector operates over
pub struct BeamSelector<'a> {
    candidates: &'a [SelectionCandidate],
    volume: &'a VolumeContext,
    targets: &'a VolumeTargets,
    structure: SessionStructure,
    params: BeamParams,
    weights: &'a ScoreWeights,
}

impl<'a> BeamSelector<'a> {
    pub fn new(
        candidates: &'a [SelectionCandidate],
        volume: &'a VolumeContext,
        targets: &'a VolumeTargets,
        structure: SessionStructure,
        params: BeamParams,
        weights: &'a ScoreWeights,
    ) -> Self {
        BeamSelector {
            candidates,
            volume,
            targets,
            structure,
            params,
            weights,
        }
    }

    /// Run the search, then greedily repair structural shortfalls
    pub fn select(&self) -> SelectionOutcome {
        let mut rejections: Vec<Rejection> = Vec::new();
        let mut rejected_keys: HashSet<(String, RejectionReason)> = HashSet::new();

        let mut beam = vec![BeamState::empty()];
        let mut terminal: Vec<BeamState> = Vec::new();

        for depth in 0..self.params.max_depth {
            let mut next: Vec<BeamState> = Vec::new();
            let mut seen: HashSet<Vec<usize>> = HashSet::new();

            for state in &beam {
                let mut extended = false;
                for (index, candidate) in self.candidates.iter().enumerate() {
                    if state.selected.contains(&index) {
                        continue;
                    }
                    match self.try_extend(state, index, candidate) {
                        Ok(new_state) => {
                            extended = true;
                            if seen.insert(new_state.sorted_ids()) {
                                next.push(new_state);
                            }
                        }
                        Err(reason) => {
                            record_rejection(&mut rejections, &mut rejected_keys, candidate, reason);
                        }
                    }
                }
                if !extended {
                    terminal.push(state.clone());
                }
            }

            if next.is_empty() {
                // every live state is already in the terminal set
                beam.clear();
                break;
            }
            self.prune(&mut next);
            debug!(depth, live = next.len(), "beam depth expanded");
            beam = next;
        }

        terminal.extend(beam);
        let best = self.pick_best(terminal);
        let best = self.greedy_repair(best, &mut rejections, &mut rejected_keys);
        self.finish(best, rejections)
    }

    /// Attempt to add a candidate to a state, enforcing every in-search
    /// constraint. The error names the first violated constraint.
    fn try_extend(
        &self,
        state: &BeamState,
        index: usize,
        candidate: &SelectionCandidate,
    ) -> Result<BeamState, RejectionReason> {
        let exercise = &candidate.exercise;

        // weekly MRV ceiling on effective volume
        for contribution in &candidate.contributions {
            if let Some(landmarks) = self.targets.get(&contribution.muscle) {
                let weekly = self.volume.current.effective(contribution.muscle)
                    + state.effective_for(contribution.muscle)
                    + contribution.effective();
                if weekly > landmarks.mrv {
                    return Err(RejectionReason::VolumeCeilingReached);
                }
            }
        }

        // structural bounds
        let new_main = state.main_lift_count + usize::from(exercise.main_lift_eligible);
        if new_main > self.structure.max_main_lifts {
            return Err(RejectionReason::StructureConstraintViolated);
        }
        let new_len = state.selected.len() + 1;
        if new_len >= self.structure.min_exercises {
            let remaining = self.params.max_depth.saturating_sub(new_len);
            let new_accessories = new_len - new_main;
            let need_main = self.structure.min_main_lifts.saturating_sub(new_main);
            let need_acc = self.structure.min_accessories.saturating_sub(new_accessories);
            if remaining < need_main + need_acc {
                return Err(RejectionReason::StructureConstraintViolated);
            }
        }

        // per-session movement pattern cap
        for pattern in &exercise.movement_patterns {
            let count = state.patterns.get(pattern).copied().unwrap_or(0);
            if count + 1 > PATTERN_CAP {
                return Err(RejectionReason::MovementPatternCap);
            }
        }

        // per-session direct-set ceiling
        for contribution in &candidate.contributions {
            if contribution.direct > 0.0 {
                let direct = state
                    .direct_sets
                    .get(&contribution.muscle)
                    .copied()
                    .unwrap_or(0.0)
                    + contribution.direct;
                if direct > SESSION_DIRECT_SET_CAP {
                    return Err(RejectionReason::SessionDirectSetCap);
                }
            }
        }

        // triceps isolation cap once two pressing compounds hit triceps
        let is_triceps_isolation =
            exercise.is_isolation() && exercise.has_primary(Muscle::Triceps);
        if is_triceps_isolation
            && state.pressing_triceps_compounds >= 2
            && state.triceps_isolations >= 1
        {
            return Err(RejectionReason::TricepsIsolationCap);
        }

        // front-delt suppression for direct-primary accessories
        if !exercise.main_lift_eligible
            && exercise.has_primary(Muscle::FrontDelts)
            && state.effective_for(Muscle::FrontDelts) >= FRONT_DELT_SUPPRESSION_THRESHOLD
        {
            return Err(RejectionReason::FrontDeltSuppression);
        }

        // isolation duplicates: same pattern and same primary muscle
        if exercise.is_isolation() {
            for &selected_index in &state.selected {
                let other = &self.candidates[selected_index].exercise;
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
                    return Err(RejectionReason::IsolationDuplicate);
                }
            }
        }

        // accepted: rebuild the state with dynamic movement-novelty rescore
        let mut new_state = state.clone();
        new_state.selected.push(index);
        for contribution in &candidate.contributions {
            *new_state.effective.entry(contribution.muscle).or_insert(0.0) +=
                contribution.effective();
            if contribution.direct > 0.0 {
                *new_state
                    .direct_sets
                    .entry(contribution.muscle)
                    .or_insert(0.0) += contribution.direct;
            }
        }

        let dynamic_novelty = movement_novelty(&exercise.movement_patterns, &state.patterns);
        let rescored_total = candidate.total
            - candidate.scores.movement_novelty * self.weights.movement_diversity
            + dynamic_novelty * self.weights.movement_diversity;
        new_state.score += rescored_total;

        for pattern in &exercise.movement_patterns {
            *new_state.patterns.entry(*pattern).or_insert(0) += 1;
        }
        new_state.time_minutes += candidate.time_minutes;
        new_state.favorite_count += u32::from(candidate.is_favorite);
        new_state.main_lift_count = new_main;
        if exercise.is_pressing_triceps_compound() {
            new_state.pressing_triceps_compounds += 1;
        }
        if is_triceps_isolation {
            new_state.triceps_isolations += 1;
        }
        Ok(new_state)
    }

    /// Sort survivors and keep the top beam-width states. States whose
    /// scores differ by less than epsilon prefer the higher favorite count;
    /// the preference applies across whole chains of transitively-adjacent
    /// near ties, not just immediate neighbors.
    fn prune(&self, states: &mut Vec<BeamState>) {
        states.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b.favorite_count.cmp(&a.favorite_count))
                .then_with(|| a.name_key(self.candidates).cmp(&b.name_key(self.candidates)))
        });
        // each maximal epsilon-chain re-ranks by favorites
        let mut start = 0;
        while start < states.len() {
            let mut end = start + 1;
            while end < states.len()
                && (states[end - 1].score - states[end].score).abs() < self.params.epsilon
            {
                end += 1;
            }
            if end - start > 1 {
                states[start..end].sort_by(|a, b| {
                    b.favorite_count
                        .cmp(&a.favorite_count)
                        .then_with(|| b.score.total_cmp(&a.score))
                        .then_with(|| {
                            a.name_key(self.candidates).cmp(&b.name_key(self.candidates))
                        })
                });
            }
            start = end;
        }
        states.truncate(self.params.beam_width);
    }

    fn meets_structure(&self, state: &BeamState) -> bool {
        state.selected.len() >= self.structure.min_exercises
            && state.main_lift_count >= self.structure.min_main_lifts
            && state.main_lift_count <= self.structure.max_main_lifts
            && state.accessory_count() >= self.structure.min_accessories
    }

    fn pick_best(&self, mut states: Vec<BeamState>) -> BeamState {
        if states.is_empty() {
            return BeamState::empty();
        }
        states.sort_by(|a, b| {
            let a_ok = self.meets_structure(a);
            let b_ok = self.meets_structure(b);
            b_ok.cmp(&a_ok)
                .then_with(|| b.score.total_cmp(&a.score))
                .then_with(|| b.favorite_count.cmp(&a.favorite_count))
                .then_with(|| a.name_key(self.candidates).cmp(&b.name_key(self.candidates)))
        });
        states.into_iter().next().unwrap()
    }

    /// Add (or swap) candidates until structural minimums hold, without ever
    /// violating a ceiling
    fn greedy_repair(
        &self,
        mut state: BeamState,
        rejections: &mut Vec<Rejection>,
        rejected_keys: &mut HashSet<(String, RejectionReason)>,
    ) -> BeamState {
        // fill to the exercise floor
        while state.selected.len() < self.structure.min_exercises {
            let Some(next) = self.first_extendable(&state, |_| true) else {
                break;
            };
            state = next;
        }

        // main-lift floor: add, or swap out the weakest accessory
        while state.main_lift_count < self.structure.min_main_lifts {
            if let Some(next) =
                self.first_extendable(&state, |c| c.exercise.main_lift_eligible)
            {
                state = next;
                continue;
            }
            let Some(victim) = self.weakest_accessory(&state) else {
                break;
            };
            let reduced = self.rebuild_without(&state, victim);
            match self.first_extendable(&reduced, |c| c.exercise.main_lift_eligible) {
                Some(next) => {
                    let displaced = &self.candidates[victim];
                    record_rejection(
                        rejections,
                        rejected_keys,
                        displaced,
                        RejectionReason::StructureConstraintViolated,
                    );
                    state = next;
                }
                None => break,
            }
        }

        // accessory floor
        while state.accessory_count() < self.structure.min_accessories {
            let Some(next) =
                self.first_extendable(&state, |c| !c.exercise.main_lift_eligible)
            else {
                break;
            };
            state = next;
        }

        state
    }

    /// Highest-scoring candidate passing the predicate that extends cleanly
    fn first_extendable<F>(&self, state: &BeamState, predicate: F) -> Option<BeamState>
    where
        F: Fn(&SelectionCandidate) -> bool,
    {
        for (index, candidate) in self.candidates.iter().enumerate() {
            if state.selected.contains(&index) || !predicate(candidate) {
                continue;
            }
            if let Ok(next) = self.try_extend(state, index, candidate) {
                return Some(next);
            }
        }
        None
    }

    fn weakest_accessory(&self, state: &BeamState) -> Option<usize> {
        state
            .selected
            .iter()
            .copied()
            .filter(|&i| !self.candidates[i].exercise.main_lift_eligible)
            .min_by(|&a, &b| {
                self.candidates[a]
                    .total
                    .total_cmp(&self.candidates[b].total)
                    .then_with(|| {
                        self.candidates[b]
                            .exercise
                            .name
                            .cmp(&self.candidates[a].exercise.name)
                    })
            })
    }

    /// Replay a state from scratch without one member
    fn rebuild_without(&self, state: &BeamState, removed: usize) -> BeamState {
        let mut rebuilt = BeamState::empty();
        for &index in &state.selected {
            if index == removed {
                continue;
            }
            if let Ok(next) = self.try_extend(&rebuilt, index, &self.candidates[index]) {
                rebuilt = next;
            }
        }
        rebuilt
    }

    fn finish(&self, state: BeamState, rejections: Vec<Rejection>) -> SelectionOutcome {
        let selected: Vec<SelectionCandidate> = state
            .selected
            .iter()
            .map(|&i| self.candidates[i].clone())
            .collect();

        let mut remaining_deficit = BTreeMap::new();
        for (muscle, landmarks) in self.targets {
            let left = (self.volume.planning_target(*muscle, landmarks)
                - self.volume.current.effective(*muscle)
                - state.effective_for(*muscle))
            .max(0.0);
            if left > 0.0 {
                remaining_deficit.insert(*muscle, left);
            }
        }

        let rationale = selected
            .iter()
            .map(|c| {
                let text = format!(
                    "score {:.3} (deficit {:.2}, novelty {:.2}, stretch {:.2}), {} sets",
                    c.total, c.scores.deficit_fill, c.scores.rotation_novelty,
                    c.scores.lengthened, c.proposed_sets
                );
                (c.exercise.name.clone(), text)
            })
            .collect();

        let constraints_satisfied = self.meets_structure(&state) && !selected.is_empty();

        SelectionOutcome {
            selected,
            filled_volume: state.effective,
            remaining_deficit,
            time_minutes: state.time_minutes,
            rationale,
            rejections,
            constraints_satisfied,
        }
    }
}
