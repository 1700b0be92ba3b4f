use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::*;
use std::fs;
use std::path::PathBuf;
use tabled::{settings::Style, Table, Tabled};

use liftrs::config::PlannerConfig;
use liftrs::logging::{init_logging, LogConfig, LogFormat, LogLevel};
use liftrs::models::{
    Baselines, Exercise, Muscle, SessionIntent, UserContext, WorkoutHistoryEntry,
};
use liftrs::planner::{PlanRequest, SessionPlan, SessionPlanner};
use liftrs::rotation::RotationIndex;
use liftrs::split::SplitClassifier;
use liftrs::volume::VolumeContextBuilder;

/// LiftRS - Strength Session Planning CLI
///
/// A Rust-based engine that turns training history, preferences, recovery
/// state, and periodization position into a fully prescribed session plan.
#[derive(Parser)]
#[command(name = "liftrs")]
#[command(author = "LiftRS Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Strength Session Planning CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log output format (pretty, json, compact)
    #[arg(long, global = true, default_value = "compact")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan the next session from a workout-context fixture
    Plan {
        /// JSON file with library, user context, history, and baselines
        #[arg(short, long)]
        file: PathBuf,

        /// Session intent (push, pull, legs, upper, lower, full_body);
        /// derived from history when omitted
        #[arg(short, long)]
        intent: Option<String>,

        /// Seed for the bonus-accessory pick
        #[arg(short, long, default_value_t = 0)]
        seed: u64,

        /// Planning date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Session-minutes override
        #[arg(short, long)]
        minutes: Option<u32>,

        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Show weekly volume per muscle against the landmark table
    Volume {
        /// JSON file with library, user context, history, and baselines
        #[arg(short, long)]
        file: PathBuf,

        /// Reference date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Show the derived next session intent
    NextSplit {
        /// JSON file with library, user context, history, and baselines
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Show the exercise rotation index
    Rotation {
        /// JSON file with library, user context, history, and baselines
        #[arg(short, long)]
        file: PathBuf,

        /// Reference date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
}

/// Everything the persistence collaborator hands the planner, as one file
#[derive(serde::Deserialize)]
struct PlanningFixture {
    library: Vec<Exercise>,
    user: UserContext,
    #[serde(default)]
    history: Vec<WorkoutHistoryEntry>,
    #[serde(default)]
    baselines: Baselines,
}

fn load_fixture(path: &PathBuf) -> Result<PlanningFixture> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("could not read fixture {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("could not parse fixture {}", path.display()))
}

fn parse_intent(value: &str) -> Result<SessionIntent> {
    match value.to_lowercase().as_str() {
        "push" => Ok(SessionIntent::Push),
        "pull" => Ok(SessionIntent::Pull),
        "legs" => Ok(SessionIntent::Legs),
        "upper" => Ok(SessionIntent::Upper),
        "lower" => Ok(SessionIntent::Lower),
        "full_body" | "full-body" | "fullbody" => Ok(SessionIntent::FullBody),
        other => bail!("unknown intent: {}", other),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        LogLevel::Error
    } else {
        match cli.verbose {
            0 => LogLevel::Info,
            1 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    };
    let format: LogFormat = cli.log_format.parse().unwrap_or(LogFormat::Compact);
    init_logging(&LogConfig {
        level,
        format,
        file_path: None,
    })?;

    let config = PlannerConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Plan {
            file,
            intent,
            seed,
            date,
            minutes,
            format,
        } => {
            let mut fixture = load_fixture(&file)?;
            if let Some(minutes) = minutes {
                fixture.user.constraints.session_minutes = Some(minutes);
            }
            let intent = intent.as_deref().map(parse_intent).transpose()?;
            let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());

            let request = PlanRequest {
                library: &fixture.library,
                user: &fixture.user,
                history: &fixture.history,
                baselines: &fixture.baselines,
                intent,
                seed,
                date,
            };
            let plan = SessionPlanner::plan_session(&request, &config);

            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&plan)?),
                _ => print_plan(&plan),
            }
        }

        Commands::Volume { file, date } => {
            let fixture = load_fixture(&file)?;
            let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            print_volume(&fixture, date);
        }

        Commands::NextSplit { file } => {
            let fixture = load_fixture(&file)?;
            let mut history = fixture.history.clone();
            history.sort_by_key(|e| e.date);
            let intent = SplitClassifier::derive_next_intent(
                &history,
                fixture.user.constraints.split_type,
            );
            println!("next intent: {}", intent.to_string().green().bold());
            for entry in history.iter().rev().take(5) {
                let class = SplitClassifier::classify_entry(entry);
                println!(
                    "  {}  {:?}  (advances: {})",
                    entry.date,
                    class,
                    entry.advances_split()
                );
            }
        }

        Commands::Rotation { file, date } => {
            let fixture = load_fixture(&file)?;
            let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            let index = RotationIndex::build(&fixture.history, date);
            print_rotation(&index);
        }
    }

    Ok(())
}

#[derive(Tabled)]
struct SetRow {
    #[tabled(rename = "Exercise")]
    exercise: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Sets")]
    sets: String,
    #[tabled(rename = "Reps")]
    reps: String,
    #[tabled(rename = "Load")]
    load: String,
    #[tabled(rename = "RPE")]
    rpe: String,
    #[tabled(rename = "Rest")]
    rest: String,
}

fn print_plan(plan: &SessionPlan) {
    println!();
    println!(
        "{} {} ({})",
        "Session Plan".bold(),
        plan.intent.to_string().green().bold(),
        plan.scheduled_date
    );
    println!("estimated {} minutes", plan.estimated_minutes);

    if !plan.warmup.is_empty() {
        println!("\n{}", "Warmup".bold().underline());
        for entry in &plan.warmup {
            let ramp: Vec<String> = entry
                .sets
                .iter()
                .map(|s| format!("{}x{}", s.load, s.reps))
                .collect();
            println!("  {}: {}", entry.exercise_name, ramp.join(" / "));
        }
    }

    let mut rows = Vec::new();
    for planned in plan.exercises() {
        let top = planned.sets.first();
        rows.push(SetRow {
            exercise: planned.exercise_name.clone(),
            role: match planned.role {
                liftrs::prescription::Role::MainLift => "main".to_string(),
                liftrs::prescription::Role::Accessory => "accessory".to_string(),
            },
            sets: planned.sets.len().to_string(),
            reps: format!("{}-{}", planned.rep_range.min, planned.rep_range.max),
            load: top
                .and_then(|s| s.target_load)
                .map(|l| l.to_string())
                .unwrap_or_else(|| "—".to_string()),
            rpe: top
                .and_then(|s| s.target_rpe)
                .map(|r| format!("{:.1}", r))
                .unwrap_or_else(|| "—".to_string()),
            rest: top
                .map(|s| format!("{}s", s.rest_seconds))
                .unwrap_or_else(|| "—".to_string()),
        });
    }
    if !rows.is_empty() {
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("\n{}", table);
    }

    if !plan.notes.is_empty() {
        println!("\n{}", "Notes".bold().underline());
        for note in &plan.notes {
            println!("  - {}", note);
        }
    }

    if !plan.rejections.is_empty() {
        println!("\n{}", "Rejections".dimmed());
        for rejection in &plan.rejections {
            println!(
                "  {} {}",
                rejection.exercise_name.dimmed(),
                rejection.reason.to_string().yellow()
            );
        }
    }
}

#[derive(Tabled)]
struct VolumeRow {
    #[tabled(rename = "Muscle")]
    muscle: String,
    #[tabled(rename = "Direct")]
    direct: String,
    #[tabled(rename = "Effective")]
    effective: String,
    #[tabled(rename = "MEV")]
    mev: String,
    #[tabled(rename = "MAV")]
    mav: String,
    #[tabled(rename = "MRV")]
    mrv: String,
    #[tabled(rename = "Deficit")]
    deficit: String,
}

fn print_volume(fixture: &PlanningFixture, date: NaiveDate) {
    let mut history = fixture.history.clone();
    history.sort_by_key(|e| e.date);
    let context = VolumeContextBuilder::build(&history, date);
    let targets = fixture.user.effective_landmarks();

    let mut rows = Vec::new();
    for muscle in Muscle::ALL {
        let Some(landmarks) = targets.get(&muscle) else {
            continue;
        };
        let effective = context.current.effective(muscle);
        if effective == 0.0 && landmarks.mev == 0.0 {
            continue;
        }
        rows.push(VolumeRow {
            muscle: muscle.to_string(),
            direct: format!("{:.1}", context.current.direct(muscle)),
            effective: format!("{:.1}", effective),
            mev: format!("{:.0}", landmarks.mev),
            mav: format!("{:.0}", landmarks.mav),
            mrv: format!("{:.0}", landmarks.mrv),
            deficit: format!("{:.1}", context.deficit(muscle, landmarks)),
        });
    }
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);

    if let Some(readiness) = context.fatigue.last_readiness {
        println!("last readiness: {}", readiness);
    }
    if context.fatigue.missed_last_session {
        println!("{}", "last session was skipped".yellow());
    }
}

#[derive(Tabled)]
struct RotationRow {
    #[tabled(rename = "Exercise")]
    exercise: String,
    #[tabled(rename = "Last Used")]
    last_used: String,
    #[tabled(rename = "Weeks Ago")]
    weeks: String,
    #[tabled(rename = "Uses")]
    uses: String,
    #[tabled(rename = "Trend")]
    trend: String,
}

fn print_rotation(index: &RotationIndex) {
    let mut rows = Vec::new();
    for (name, record) in index.sorted_records() {
        rows.push(RotationRow {
            exercise: name.clone(),
            last_used: record.last_used.to_string(),
            weeks: format!("{:.1}", record.weeks_since_last_use),
            uses: record.usage_count.to_string(),
            trend: format!("{:?}", record.trend).to_lowercase(),
        });
    }
    if rows.is_empty() {
        println!("no performed history");
        return;
    }
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
}
