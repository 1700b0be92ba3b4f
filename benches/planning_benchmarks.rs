//! Planning-call benchmarks
//!
//! A full plan over a synthetic library of ~120 exercises must stay in the
//! low-millisecond range; this guards the beam search and candidate scorer
//! against regressions.

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

use liftrs::config::PlannerConfig;
use liftrs::models::*;
use liftrs::planner::{PlanRequest, SessionPlanner};

fn synthetic_library(size: usize) -> Vec<Exercise> {
    use MovementPattern::*;
    use Muscle::*;

    let primaries = [
        Chest, FrontDelts, SideDelts, Lats, UpperBack, Biceps, Triceps, Quads, Hamstrings,
        Glutes, Calves, Abs,
    ];
    let patterns = [
        HorizontalPush,
        VerticalPush,
        HorizontalPull,
        VerticalPull,
        Squat,
        Hinge,
        Lunge,
        Extension,
        Flexion,
        Abduction,
        Isolation,
        Carry,
    ];

    (0..size)
        .map(|index| {
            let muscle = primaries[index % primaries.len()];
            let pattern = patterns[index % patterns.len()];
            let main = index % 5 == 0;
            Exercise {
                id: format!("ex_{:03}", index),
                name: format!("Exercise {:03}", index),
                primary_muscles: vec![muscle],
                secondary_muscles: vec![primaries[(index + 3) % primaries.len()]],
                movement_patterns: vec![pattern],
                split_tags: vec![],
                joint_stress: JointStress::Medium,
                equipment: vec![Equipment::Barbell],
                rep_range_min: 6,
                rep_range_max: 12,
                is_compound: main,
                main_lift_eligible: main,
                fatigue_cost: 1 + (index % 5) as u8,
                sfr_score: Some(1 + (index % 5) as u8),
                length_position_score: Some(1 + ((index + 2) % 5) as u8),
                time_per_set_seconds: Some(40),
                sra_recovery_hours: BTreeMap::new(),
                contraindications: vec![],
                plate_increment: dec!(2.5),
            }
        })
        .collect()
}

fn synthetic_history(library: &[Exercise]) -> Vec<WorkoutHistoryEntry> {
    (0..6)
        .map(|session| {
            let date = NaiveDate::from_ymd_opt(2025, 7, 2 + session * 3).unwrap();
            let exercises = library
                .iter()
                .skip(session as usize * 4)
                .take(5)
                .map(|exercise| PerformedExercise {
                    exercise_id: exercise.id.clone(),
                    exercise_name: exercise.name.clone(),
                    primary_muscles: exercise.primary_muscles.clone(),
                    secondary_muscles: exercise.secondary_muscles.clone(),
                    movement_patterns: exercise.movement_patterns.clone(),
                    sets: (1..=3)
                        .map(|index| SetLog {
                            set_index: index,
                            reps: 8,
                            rpe: Some(8.0),
                            load: Some(dec!(135)),
                        })
                        .collect(),
                })
                .collect();
            WorkoutHistoryEntry {
                date,
                completed: true,
                status: WorkoutStatus::Completed,
                exercises,
                readiness: Some(4),
                intent: Some(SessionIntent::FullBody),
                selection_mode: Some(SelectionMode::Auto),
                phase: None,
                week_in_phase: None,
                advances_split: None,
            }
        })
        .collect()
}

fn bench_user() -> UserContext {
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
            available_equipment: vec![Equipment::Barbell],
        },
        preferences: Preferences::default(),
        block: None,
        volume_landmarks: BTreeMap::new(),
    }
}

fn benchmark_plan_session(c: &mut Criterion) {
    let library = synthetic_library(120);
    let history = synthetic_history(&library);
    let user = bench_user();
    let baselines = Baselines::default();
    let config = PlannerConfig::default();

    c.bench_function("plan_session_120_exercises", |b| {
        b.iter(|| {
            let request = PlanRequest {
                library: black_box(&library),
                user: &user,
                history: &history,
                baselines: &baselines,
                intent: Some(SessionIntent::FullBody),
                seed: 42,
                date: NaiveDate::from_ymd_opt(2025, 7, 20).unwrap(),
            };
            black_box(SessionPlanner::plan_session(&request, &config))
        })
    });
}

fn benchmark_volume_context(c: &mut Criterion) {
    let library = synthetic_library(120);
    let history = synthetic_history(&library);

    c.bench_function("volume_context_build", |b| {
        b.iter(|| {
            liftrs::volume::VolumeContextBuilder::build(
                black_box(&history),
                NaiveDate::from_ymd_opt(2025, 7, 20).unwrap(),
            )
        })
    });
}

criterion_group!(benches, benchmark_plan_session, benchmark_volume_context);
criterion_main!(benches);
