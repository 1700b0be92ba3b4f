use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Muscles tracked by the volume accounting and selection systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Muscle {
    Chest,
    FrontDelts,
    SideDelts,
    RearDelts,
    Lats,
    UpperBack,
    LowerBack,
    Traps,
    Biceps,
    Triceps,
    Forearms,
    Abs,
    Obliques,
    Quads,
    Hamstrings,
    Glutes,
    Calves,
    Adductors,
}

impl Muscle {
    /// All muscles in canonical (ordinal) order
    pub const ALL: [Muscle; 18] = [
        Muscle::Chest,
        Muscle::FrontDelts,
        Muscle::SideDelts,
        Muscle::RearDelts,
        Muscle::Lats,
        Muscle::UpperBack,
        Muscle::LowerBack,
        Muscle::Traps,
        Muscle::Biceps,
        Muscle::Triceps,
        Muscle::Forearms,
        Muscle::Abs,
        Muscle::Obliques,
        Muscle::Quads,
        Muscle::Hamstrings,
        Muscle::Glutes,
        Muscle::Calves,
        Muscle::Adductors,
    ];

    /// Lower-body muscles use larger linear-progression jumps
    pub fn is_lower_body(&self) -> bool {
        matches!(
            self,
            Muscle::Quads
                | Muscle::Hamstrings
                | Muscle::Glutes
                | Muscle::Calves
                | Muscle::Adductors
                | Muscle::LowerBack
        )
    }
}

impl fmt::Display for Muscle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Muscle::Chest => "Chest",
            Muscle::FrontDelts => "Front Delts",
            Muscle::SideDelts => "Side Delts",
            Muscle::RearDelts => "Rear Delts",
            Muscle::Lats => "Lats",
            Muscle::UpperBack => "Upper Back",
            Muscle::LowerBack => "Lower Back",
            Muscle::Traps => "Traps",
            Muscle::Biceps => "Biceps",
            Muscle::Triceps => "Triceps",
            Muscle::Forearms => "Forearms",
            Muscle::Abs => "Abs",
            Muscle::Obliques => "Obliques",
            Muscle::Quads => "Quads",
            Muscle::Hamstrings => "Hamstrings",
            Muscle::Glutes => "Glutes",
            Muscle::Calves => "Calves",
            Muscle::Adductors => "Adductors",
        };
        write!(f, "{}", name)
    }
}

/// Movement patterns used for diversity scoring and per-session caps
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MovementPattern {
    HorizontalPush,
    VerticalPush,
    HorizontalPull,
    VerticalPull,
    Squat,
    Hinge,
    Lunge,
    Carry,
    Extension,
    Flexion,
    Abduction,
    Adduction,
    Rotation,
    Isolation,
}

/// Coarse grouping of movement patterns, used as a split tie-breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternFamily {
    Push,
    Pull,
    Legs,
    Other,
}

impl MovementPattern {
    pub fn family(&self) -> PatternFamily {
        match self {
            MovementPattern::HorizontalPush | MovementPattern::VerticalPush => PatternFamily::Push,
            MovementPattern::HorizontalPull | MovementPattern::VerticalPull => PatternFamily::Pull,
            MovementPattern::Squat | MovementPattern::Hinge | MovementPattern::Lunge => {
                PatternFamily::Legs
            }
            _ => PatternFamily::Other,
        }
    }
}

/// Equipment classes an exercise can require
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Equipment {
    Barbell,
    Dumbbell,
    Cable,
    Machine,
    SmithMachine,
    Kettlebell,
    Band,
    Bodyweight,
    Bench,
    PullUpBar,
    DipBars,
}

impl Equipment {
    /// Equipment that adds no external load on its own
    pub fn is_bodyweight_class(&self) -> bool {
        matches!(
            self,
            Equipment::Bodyweight | Equipment::PullUpBar | Equipment::DipBars
        )
    }
}

/// Joint stress rating for an exercise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JointStress {
    Low,
    Medium,
    High,
}

impl JointStress {
    fn default_medium() -> Self {
        JointStress::Medium
    }
}

/// Splits an exercise can be tagged for in the library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitTag {
    Push,
    Pull,
    Legs,
    Upper,
    Lower,
    FullBody,
}

fn default_plate_increment() -> Decimal {
    dec!(2.5)
}

fn default_fatigue_cost() -> u8 {
    3
}

/// Immutable exercise library entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    /// Unique identifier within the library
    pub id: String,

    /// Display name; also the durable key into the rotation index
    pub name: String,

    /// Muscles receiving a full set of direct stimulus per working set
    pub primary_muscles: Vec<Muscle>,

    /// Muscles receiving fractional (indirect) stimulus per working set
    #[serde(default)]
    pub secondary_muscles: Vec<Muscle>,

    /// Movement patterns this exercise expresses
    pub movement_patterns: Vec<MovementPattern>,

    /// Splits in which this exercise is eligible; empty means all
    #[serde(default)]
    pub split_tags: Vec<SplitTag>,

    /// Joint stress level
    #[serde(default = "JointStress::default_medium")]
    pub joint_stress: JointStress,

    /// Equipment required to perform the exercise
    pub equipment: Vec<Equipment>,

    /// Productive rep range for this movement
    pub rep_range_min: u32,
    pub rep_range_max: u32,

    /// Multi-joint movement flag
    #[serde(default)]
    pub is_compound: bool,

    /// Eligible to anchor a session as a main lift
    #[serde(default)]
    pub main_lift_eligible: bool,

    /// Systemic fatigue cost, 1 (trivial) to 5 (very taxing)
    #[serde(default = "default_fatigue_cost")]
    pub fatigue_cost: u8,

    /// Stimulus-to-fatigue rating, 1-5
    #[serde(default)]
    pub sfr_score: Option<u8>,

    /// Loaded-stretch (lengthened position) rating, 1-5
    #[serde(default)]
    pub length_position_score: Option<u8>,

    /// Seconds of work per set, when known
    #[serde(default)]
    pub time_per_set_seconds: Option<u32>,

    /// Per-muscle stimulus-recovery-adaptation horizon in hours
    #[serde(default)]
    pub sra_recovery_hours: BTreeMap<Muscle, u32>,

    /// Injury flags this exercise conflicts with
    #[serde(default)]
    pub contraindications: Vec<String>,

    /// Smallest load step the equipment supports
    #[serde(default = "default_plate_increment")]
    pub plate_increment: Decimal,
}

impl Exercise {
    pub fn has_primary(&self, muscle: Muscle) -> bool {
        self.primary_muscles.contains(&muscle)
    }

    pub fn has_secondary(&self, muscle: Muscle) -> bool {
        self.secondary_muscles.contains(&muscle)
    }

    /// Direct or indirect involvement
    pub fn targets(&self, muscle: Muscle) -> bool {
        self.has_primary(muscle) || self.has_secondary(muscle)
    }

    pub fn has_pattern(&self, pattern: MovementPattern) -> bool {
        self.movement_patterns.contains(&pattern)
    }

    /// Single-joint accessory that can never anchor a session
    pub fn is_isolation(&self) -> bool {
        !self.is_compound && !self.main_lift_eligible
    }

    /// Pressing compound with triceps as a primary mover
    pub fn is_pressing_triceps_compound(&self) -> bool {
        self.is_compound
            && self.has_primary(Muscle::Triceps)
            && self
                .movement_patterns
                .iter()
                .any(|p| p.family() == PatternFamily::Push)
    }

    /// True when the exercise carries no external load at all
    pub fn is_pure_bodyweight(&self) -> bool {
        !self.equipment.is_empty() && self.equipment.iter().all(|e| e.is_bodyweight_class())
    }

    pub fn rep_range(&self) -> (u32, u32) {
        (self.rep_range_min, self.rep_range_max)
    }
}

/// One performed set within a logged workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetLog {
    /// Set position within the exercise; 0- and 1-based histories both occur
    pub set_index: u32,

    /// Reps performed
    pub reps: u32,

    /// Rate of perceived exertion, 6-10 when present
    #[serde(default)]
    pub rpe: Option<f64>,

    /// External load; 0 is a meaningful value for bodyweight work
    #[serde(default)]
    pub load: Option<Decimal>,
}

impl SetLog {
    /// Coerce out-of-range values at ingest; still-invalid entries become None
    pub fn sanitized(mut self) -> Self {
        if let Some(rpe) = self.rpe {
            if !(1.0..=10.0).contains(&rpe) {
                self.rpe = None;
            } else if rpe < 5.0 {
                self.rpe = Some(5.0);
            }
        }
        if let Some(load) = self.load {
            if load < Decimal::ZERO {
                self.load = None;
            }
        }
        self
    }
}

/// Exercise block inside a logged workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformedExercise {
    pub exercise_id: String,
    pub exercise_name: String,
    pub primary_muscles: Vec<Muscle>,
    #[serde(default)]
    pub secondary_muscles: Vec<Muscle>,
    #[serde(default)]
    pub movement_patterns: Vec<MovementPattern>,
    pub sets: Vec<SetLog>,
}

impl PerformedExercise {
    /// The top set is the lowest-indexed set, whatever base the log uses
    pub fn top_set(&self) -> Option<&SetLog> {
        self.sets.iter().min_by_key(|s| s.set_index)
    }

    pub fn total_reps(&self) -> u32 {
        self.sets.iter().map(|s| s.reps).sum()
    }

    pub fn top_load(&self) -> Option<Decimal> {
        self.sets.iter().filter_map(|s| s.load).max()
    }
}

/// Lifecycle status of a logged workout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkoutStatus {
    Planned,
    InProgress,
    Completed,
    Partial,
    Skipped,
}

/// How the exercises of a logged workout were chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SelectionMode {
    Auto,
    Manual,
    Intent,
    Bonus,
}

/// Periodization phase snapshot stored on a workout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MesocyclePhase {
    Accumulation,
    Intensification,
    Realization,
    Deload,
}

/// One past session as the caller's store provides it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutHistoryEntry {
    pub date: NaiveDate,

    #[serde(default)]
    pub completed: bool,

    pub status: WorkoutStatus,

    pub exercises: Vec<PerformedExercise>,

    /// Subjective readiness, 1 (wrecked) to 5 (fresh)
    #[serde(default)]
    pub readiness: Option<u8>,

    #[serde(default)]
    pub intent: Option<SessionIntent>,

    #[serde(default)]
    pub selection_mode: Option<SelectionMode>,

    /// Mesocycle phase snapshot at the time of the session
    #[serde(default)]
    pub phase: Option<MesocyclePhase>,

    /// 1-indexed week within the mesocycle
    #[serde(default)]
    pub week_in_phase: Option<u32>,

    /// Whether this entry advances the split rotation; defaults by status
    #[serde(default)]
    pub advances_split: Option<bool>,
}

impl WorkoutHistoryEntry {
    /// Completed and partial sessions count as performed work
    pub fn performed(&self) -> bool {
        matches!(self.status, WorkoutStatus::Completed | WorkoutStatus::Partial)
    }

    pub fn advances_split(&self) -> bool {
        self.advances_split.unwrap_or_else(|| self.performed())
    }

    pub fn find_exercise(&self, name: &str) -> Option<&PerformedExercise> {
        self.exercises.iter().find(|e| e.exercise_name == name)
    }
}

/// Training age bracket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingAge {
    Beginner,
    Intermediate,
    Advanced,
}

/// Primary or secondary training goal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    Hypertrophy,
    Strength,
    FatLoss,
    Athleticism,
    GeneralHealth,
}

/// Weekly split organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitType {
    Ppl,
    UpperLower,
    FullBody,
    BodyPart,
}

/// What kind of session to plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionIntent {
    Push,
    Pull,
    Legs,
    Upper,
    Lower,
    FullBody,
    BodyPart(Vec<Muscle>),
}

impl SessionIntent {
    /// Muscles the session is required to serve
    pub fn required_muscles(&self) -> Vec<Muscle> {
        match self {
            SessionIntent::Push => vec![
                Muscle::Chest,
                Muscle::FrontDelts,
                Muscle::SideDelts,
                Muscle::Triceps,
            ],
            SessionIntent::Pull => vec![
                Muscle::Lats,
                Muscle::UpperBack,
                Muscle::RearDelts,
                Muscle::Biceps,
            ],
            SessionIntent::Legs => vec![
                Muscle::Quads,
                Muscle::Hamstrings,
                Muscle::Glutes,
                Muscle::Calves,
            ],
            SessionIntent::Upper => vec![
                Muscle::Chest,
                Muscle::Lats,
                Muscle::UpperBack,
                Muscle::FrontDelts,
                Muscle::SideDelts,
                Muscle::RearDelts,
                Muscle::Biceps,
                Muscle::Triceps,
            ],
            SessionIntent::Lower => vec![
                Muscle::Quads,
                Muscle::Hamstrings,
                Muscle::Glutes,
                Muscle::Calves,
                Muscle::Adductors,
            ],
            SessionIntent::FullBody => vec![
                Muscle::Chest,
                Muscle::Lats,
                Muscle::UpperBack,
                Muscle::Quads,
                Muscle::Hamstrings,
                Muscle::Glutes,
            ],
            SessionIntent::BodyPart(targets) => targets.clone(),
        }
    }

    /// Whether an exercise's split tags make it eligible for this intent
    pub fn admits(&self, exercise: &Exercise) -> bool {
        if exercise.split_tags.is_empty() {
            return true;
        }
        match self {
            SessionIntent::Push => exercise.split_tags.contains(&SplitTag::Push),
            SessionIntent::Pull => exercise.split_tags.contains(&SplitTag::Pull),
            SessionIntent::Legs => exercise.split_tags.contains(&SplitTag::Legs),
            SessionIntent::Upper => exercise
                .split_tags
                .iter()
                .any(|t| matches!(t, SplitTag::Upper | SplitTag::Push | SplitTag::Pull)),
            SessionIntent::Lower => exercise
                .split_tags
                .iter()
                .any(|t| matches!(t, SplitTag::Lower | SplitTag::Legs)),
            SessionIntent::FullBody => true,
            SessionIntent::BodyPart(targets) => targets.iter().any(|m| exercise.targets(*m)),
        }
    }
}

impl fmt::Display for SessionIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionIntent::Push => write!(f, "push"),
            SessionIntent::Pull => write!(f, "pull"),
            SessionIntent::Legs => write!(f, "legs"),
            SessionIntent::Upper => write!(f, "upper"),
            SessionIntent::Lower => write!(f, "lower"),
            SessionIntent::FullBody => write!(f, "full_body"),
            SessionIntent::BodyPart(targets) => {
                let names: Vec<String> = targets.iter().map(|m| m.to_string()).collect();
                write!(f, "body_part({})", names.join(", "))
            }
        }
    }
}

/// Who is being planned for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub training_age: TrainingAge,

    /// Body weight in the user's load unit, consistent with logged loads
    #[serde(default)]
    pub body_weight: Option<Decimal>,

    /// Active injury flags matched against exercise contraindications
    #[serde(default)]
    pub injury_flags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goals {
    pub primary: Goal,
    #[serde(default)]
    pub secondary: Option<Goal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    pub days_per_week: u32,

    /// Hard session-length budget; None means untimed
    #[serde(default)]
    pub session_minutes: Option<u32>,

    pub split_type: SplitType,

    pub available_equipment: Vec<Equipment>,
}

/// Target RPE override for a rep-range band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpeOverride {
    pub rep_min: u32,
    pub rep_max: u32,
    pub rpe: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub favorite_ids: Vec<String>,

    #[serde(default)]
    pub avoid_ids: Vec<String>,

    #[serde(default)]
    pub rpe_overrides: Vec<RpeOverride>,
}

impl Preferences {
    /// Override applying to the band that contains the prescription midpoint
    pub fn rpe_override_for(&self, rep_min: u32, rep_max: u32) -> Option<f64> {
        let midpoint = (rep_min + rep_max) / 2;
        self.rpe_overrides
            .iter()
            .find(|o| o.rep_min <= midpoint && midpoint <= o.rep_max)
            .map(|o| o.rpe)
    }
}

/// Block type within a periodized mesocycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Volume,
    Intensity,
    Peak,
    Deload,
}

fn one() -> f64 {
    1.0
}

/// Where the session sits inside a periodized block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockContext {
    pub phase: MesocyclePhase,

    pub block_type: BlockType,

    /// 1-indexed week within the block
    pub week_in_block: u32,

    /// Total weeks in the block, for RIR ramping
    #[serde(default)]
    pub block_weeks: Option<u32>,

    #[serde(default = "one")]
    pub volume_multiplier: f64,

    #[serde(default = "one")]
    pub intensity_multiplier: f64,

    /// Added to the target-RIR ramp (positive = easier)
    #[serde(default)]
    pub rir_adjustment: f64,

    #[serde(default = "one")]
    pub rest_multiplier: f64,

    /// Sessions completed in the current accumulation; 0 starts a mesocycle
    #[serde(default)]
    pub accumulation_sessions_completed: Option<u32>,

    /// Caller-supplied back-off for advanced periodized progression
    #[serde(default)]
    pub backoff_multiplier: Option<Decimal>,
}

impl BlockContext {
    pub fn is_deload(&self) -> bool {
        self.phase == MesocyclePhase::Deload || self.block_type == BlockType::Deload
    }
}

/// Weekly volume landmarks for one muscle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeLandmarks {
    /// Minimum effective volume: floor below which the muscle detrains
    pub mev: f64,
    /// Maximum adaptive volume: the weekly working target
    pub mav: f64,
    /// Maximum recoverable volume: the hard weekly ceiling
    pub mrv: f64,
}

/// Per-muscle weekly landmark table
pub type VolumeTargets = BTreeMap<Muscle, VolumeLandmarks>;

/// Built-in landmark defaults, overridden per muscle by the caller
pub fn default_volume_targets() -> VolumeTargets {
    let mut targets = BTreeMap::new();
    for muscle in Muscle::ALL {
        let landmarks = match muscle {
            Muscle::Chest => VolumeLandmarks { mev: 6.0, mav: 14.0, mrv: 22.0 },
            Muscle::FrontDelts => VolumeLandmarks { mev: 0.0, mav: 8.0, mrv: 14.0 },
            Muscle::SideDelts => VolumeLandmarks { mev: 6.0, mav: 16.0, mrv: 26.0 },
            Muscle::RearDelts => VolumeLandmarks { mev: 4.0, mav: 14.0, mrv: 22.0 },
            Muscle::Lats => VolumeLandmarks { mev: 8.0, mav: 16.0, mrv: 24.0 },
            Muscle::UpperBack => VolumeLandmarks { mev: 6.0, mav: 14.0, mrv: 22.0 },
            Muscle::LowerBack => VolumeLandmarks { mev: 2.0, mav: 8.0, mrv: 12.0 },
            Muscle::Traps => VolumeLandmarks { mev: 2.0, mav: 10.0, mrv: 18.0 },
            Muscle::Biceps => VolumeLandmarks { mev: 6.0, mav: 14.0, mrv: 22.0 },
            Muscle::Triceps => VolumeLandmarks { mev: 6.0, mav: 12.0, mrv: 20.0 },
            Muscle::Forearms => VolumeLandmarks { mev: 0.0, mav: 6.0, mrv: 12.0 },
            Muscle::Abs => VolumeLandmarks { mev: 0.0, mav: 12.0, mrv: 20.0 },
            Muscle::Obliques => VolumeLandmarks { mev: 0.0, mav: 8.0, mrv: 14.0 },
            Muscle::Quads => VolumeLandmarks { mev: 8.0, mav: 14.0, mrv: 20.0 },
            Muscle::Hamstrings => VolumeLandmarks { mev: 4.0, mav: 10.0, mrv: 16.0 },
            Muscle::Glutes => VolumeLandmarks { mev: 4.0, mav: 10.0, mrv: 16.0 },
            Muscle::Calves => VolumeLandmarks { mev: 6.0, mav: 12.0, mrv: 18.0 },
            Muscle::Adductors => VolumeLandmarks { mev: 2.0, mav: 8.0, mrv: 14.0 },
        };
        targets.insert(muscle, landmarks);
    }
    targets
}

/// Everything the planner needs to know about the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    pub profile: UserProfile,
    pub goals: Goals,
    pub constraints: Constraints,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub block: Option<BlockContext>,
    /// Caller-supplied landmark overrides; defaults fill the gaps
    #[serde(default)]
    pub volume_landmarks: VolumeTargets,
}

impl UserContext {
    /// Landmark table with caller overrides merged over the defaults
    pub fn effective_landmarks(&self) -> VolumeTargets {
        let mut targets = default_volume_targets();
        for (muscle, landmarks) in &self.volume_landmarks {
            targets.insert(*muscle, *landmarks);
        }
        targets
    }
}

/// Context tag for a stored baseline estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaselineContext {
    Default,
    Volume,
}

/// Per-exercise strength estimate from the caller's store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseBaseline {
    pub exercise_id: String,
    pub exercise_name: String,
    #[serde(default)]
    pub top_set_weight: Option<Decimal>,
    #[serde(default)]
    pub one_rep_max: Option<Decimal>,
    pub context: BaselineContext,
}

/// Collection of baselines with name-keyed lookup
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Baselines {
    pub entries: Vec<ExerciseBaseline>,
}

impl Baselines {
    pub fn for_exercise(&self, name: &str) -> Option<&ExerciseBaseline> {
        self.entries
            .iter()
            .find(|b| b.exercise_name == name && b.context == BaselineContext::Default)
            .or_else(|| self.entries.iter().find(|b| b.exercise_name == name))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bench_press() -> Exercise {
        Exercise {
            id: "ex_bench".to_string(),
            name: "Barbell Bench Press".to_string(),
            primary_muscles: vec![Muscle::Chest, Muscle::Triceps],
            secondary_muscles: vec![Muscle::FrontDelts],
            movement_patterns: vec![MovementPattern::HorizontalPush],
            split_tags: vec![SplitTag::Push, SplitTag::Upper],
            joint_stress: JointStress::Medium,
            equipment: vec![Equipment::Barbell, Equipment::Bench],
            rep_range_min: 5,
            rep_range_max: 10,
            is_compound: true,
            main_lift_eligible: true,
            fatigue_cost: 4,
            sfr_score: Some(4),
            length_position_score: Some(3),
            time_per_set_seconds: Some(40),
            sra_recovery_hours: BTreeMap::new(),
            contraindications: vec!["shoulder_impingement".to_string()],
            plate_increment: dec!(2.5),
        }
    }

    #[test]
    fn test_exercise_muscle_queries() {
        let bench = bench_press();
        assert!(bench.has_primary(Muscle::Chest));
        assert!(bench.has_secondary(Muscle::FrontDelts));
        assert!(bench.targets(Muscle::FrontDelts));
        assert!(!bench.targets(Muscle::Quads));
        assert!(bench.is_pressing_triceps_compound());
        assert!(!bench.is_isolation());
        assert!(!bench.is_pure_bodyweight());
    }

    #[test]
    fn test_exercise_serde_defaults() {
        let json = r#"{
            "id": "ex_row",
            "name": "Cable Row",
            "primary_muscles": ["UpperBack", "Lats"],
            "movement_patterns": ["HorizontalPull"],
            "equipment": ["Cable"],
            "rep_range_min": 8,
            "rep_range_max": 12
        }"#;
        let exercise: Exercise = serde_json::from_str(json).unwrap();
        assert_eq!(exercise.fatigue_cost, 3);
        assert_eq!(exercise.plate_increment, dec!(2.5));
        assert!(exercise.split_tags.is_empty());
        assert!(!exercise.is_compound);
        assert_eq!(exercise.joint_stress, JointStress::Medium);
    }

    #[test]
    fn test_set_log_sanitize() {
        let set = SetLog {
            set_index: 1,
            reps: 8,
            rpe: Some(12.0),
            load: Some(dec!(-5)),
        }
        .sanitized();
        assert_eq!(set.rpe, None);
        assert_eq!(set.load, None);

        let set = SetLog {
            set_index: 1,
            reps: 8,
            rpe: Some(3.0),
            load: Some(dec!(135)),
        }
        .sanitized();
        assert_eq!(set.rpe, Some(5.0));
        assert_eq!(set.load, Some(dec!(135)));
    }

    #[test]
    fn test_top_set_is_lowest_index() {
        let performed = PerformedExercise {
            exercise_id: "ex_bench".to_string(),
            exercise_name: "Barbell Bench Press".to_string(),
            primary_muscles: vec![Muscle::Chest],
            secondary_muscles: vec![],
            movement_patterns: vec![MovementPattern::HorizontalPush],
            sets: vec![
                SetLog { set_index: 2, reps: 8, rpe: Some(8.0), load: Some(dec!(175)) },
                SetLog { set_index: 1, reps: 10, rpe: Some(7.5), load: Some(dec!(185)) },
                SetLog { set_index: 3, reps: 7, rpe: Some(8.5), load: Some(dec!(175)) },
            ],
        };
        assert_eq!(performed.top_set().unwrap().reps, 10);
        assert_eq!(performed.total_reps(), 25);
        assert_eq!(performed.top_load(), Some(dec!(185)));
    }

    #[test]
    fn test_history_entry_performed() {
        let mut entry = WorkoutHistoryEntry {
            date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            completed: true,
            status: WorkoutStatus::Completed,
            exercises: vec![],
            readiness: Some(4),
            intent: Some(SessionIntent::Push),
            selection_mode: Some(SelectionMode::Auto),
            phase: None,
            week_in_phase: None,
            advances_split: None,
        };
        assert!(entry.performed());
        assert!(entry.advances_split());

        entry.status = WorkoutStatus::Skipped;
        assert!(!entry.performed());
        assert!(!entry.advances_split());

        entry.status = WorkoutStatus::Partial;
        assert!(entry.performed());
    }

    #[test]
    fn test_intent_required_muscles() {
        assert!(SessionIntent::Push
            .required_muscles()
            .contains(&Muscle::Chest));
        assert!(SessionIntent::Pull.required_muscles().contains(&Muscle::Lats));
        let targets = vec![Muscle::Biceps, Muscle::Forearms];
        assert_eq!(
            SessionIntent::BodyPart(targets.clone()).required_muscles(),
            targets
        );
    }

    #[test]
    fn test_intent_admits_by_split_tag() {
        let bench = bench_press();
        assert!(SessionIntent::Push.admits(&bench));
        assert!(SessionIntent::Upper.admits(&bench));
        assert!(!SessionIntent::Legs.admits(&bench));
        assert!(SessionIntent::FullBody.admits(&bench));
        assert!(SessionIntent::BodyPart(vec![Muscle::Chest]).admits(&bench));
        assert!(!SessionIntent::BodyPart(vec![Muscle::Calves]).admits(&bench));
    }

    #[test]
    fn test_rpe_override_band_lookup() {
        let prefs = Preferences {
            favorite_ids: vec![],
            avoid_ids: vec![],
            rpe_overrides: vec![RpeOverride { rep_min: 10, rep_max: 15, rpe: 9.0 }],
        };
        assert_eq!(prefs.rpe_override_for(10, 15), Some(9.0));
        assert_eq!(prefs.rpe_override_for(3, 6), None);
    }

    #[test]
    fn test_landmark_overrides_merge() {
        let mut overrides = BTreeMap::new();
        overrides.insert(Muscle::Chest, VolumeLandmarks { mev: 8.0, mav: 18.0, mrv: 26.0 });
        let user = UserContext {
            profile: UserProfile {
                training_age: TrainingAge::Intermediate,
                body_weight: None,
                injury_flags: vec![],
            },
            goals: Goals { primary: Goal::Hypertrophy, secondary: None },
            constraints: Constraints {
                days_per_week: 4,
                session_minutes: None,
                split_type: SplitType::Ppl,
                available_equipment: vec![Equipment::Barbell],
            },
            preferences: Preferences::default(),
            block: None,
            volume_landmarks: overrides,
        };
        let merged = user.effective_landmarks();
        assert_eq!(merged[&Muscle::Chest].mav, 18.0);
        assert_eq!(merged[&Muscle::Quads].mav, 14.0);
    }

    #[test]
    fn test_baseline_prefers_default_context() {
        let baselines = Baselines {
            entries: vec![
                ExerciseBaseline {
                    exercise_id: "ex_bench".to_string(),
                    exercise_name: "Barbell Bench Press".to_string(),
                    top_set_weight: Some(dec!(150)),
                    one_rep_max: None,
                    context: BaselineContext::Volume,
                },
                ExerciseBaseline {
                    exercise_id: "ex_bench".to_string(),
                    exercise_name: "Barbell Bench Press".to_string(),
                    top_set_weight: Some(dec!(185)),
                    one_rep_max: Some(dec!(225)),
                    context: BaselineContext::Default,
                },
            ],
        };
        let found = baselines.for_exercise("Barbell Bench Press").unwrap();
        assert_eq!(found.top_set_weight, Some(dec!(185)));
    }

    #[test]
    fn test_workout_status_serialization() {
        let json = serde_json::to_string(&WorkoutStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
        let status: WorkoutStatus = serde_json::from_str("\"SKIPPED\"").unwrap();
        assert_eq!(status, WorkoutStatus::Skipped);
    }

    #[test]
    fn test_muscle_ordering_is_stable() {
        // BTreeMap iteration must follow the canonical ordinal order
        let mut map = BTreeMap::new();
        for muscle in Muscle::ALL.iter().rev() {
            map.insert(*muscle, 0u32);
        }
        let keys: Vec<Muscle> = map.keys().copied().collect();
        assert_eq!(keys, Muscle::ALL.to_vec());
    }
}
