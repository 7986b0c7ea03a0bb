//! `presence` CLI — resolve group availability from a JSON scenario file.
//!
//! A scenario lists the people in the group, their busy intervals and any
//! presence overrides. The CLI loads it into in-memory collaborators and
//! prints the requested view as JSON on stdout. Logs go to stderr and are
//! controlled with `RUST_LOG`.
//!
//! ## Usage
//!
//! ```sh
//! # Full report: verdicts, heat-map, common free times
//! presence --scenario team.json report --start 2026-03-16T09:00:00Z --end 2026-03-16T17:00:00Z
//!
//! # Two-hour meeting candidates on a 30 minute grid
//! presence --scenario team.json best --start ... --end ... --resolution 30 --duration 120
//!
//! # Who is free right now (pin "now" for reproducible output)
//! presence --scenario team.json --now 2026-03-16T10:05:00Z free-now
//!
//! # One person's presence record
//! presence --scenario team.json presence alice
//! ```

use std::fs;
use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use presence_engine::{
    AvailabilityEngine, BroadcastNotifier, BusyInterval, Clock, EngineConfig, InMemoryIntervals,
    InMemoryPresenceStore, ManualClock, PersonId, PresenceLookup, SystemClock, TimeWindow,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "presence",
    version,
    about = "Group availability with presence overrides"
)]
struct Cli {
    /// Scenario file with people, busy intervals and presence records
    #[arg(short, long)]
    scenario: String,

    /// Engine config file (JSON); built-in defaults when omitted
    #[arg(short, long)]
    config: Option<String>,

    /// Pin the current instant (RFC 3339) instead of reading the system clock
    #[arg(long, value_parser = parse_instant)]
    now: Option<DateTime<Utc>>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct WindowArgs {
    /// Window start (RFC 3339)
    #[arg(long, value_parser = parse_instant)]
    start: DateTime<Utc>,
    /// Window end (RFC 3339)
    #[arg(long, value_parser = parse_instant)]
    end: DateTime<Utc>,
    /// Slot width in minutes (config default when omitted)
    #[arg(long)]
    resolution: Option<i64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Per-person verdicts plus heat-map and common free times
    Report {
        #[command(flatten)]
        window: WindowArgs,
        /// Also search for meeting windows of this many minutes
        #[arg(long)]
        duration: Option<i64>,
    },
    /// Slots at which everyone is free
    Common {
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Free count and percentage per slot
    Heatmap {
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Non-overlapping meeting windows of the requested duration
    Best {
        #[command(flatten)]
        window: WindowArgs,
        /// Meeting length in minutes
        #[arg(long)]
        duration: i64,
    },
    /// People free in the current slot
    FreeNow {
        /// Slot width in minutes (config default when omitted)
        #[arg(long)]
        resolution: Option<i64>,
    },
    /// Live presence record for one person
    Presence {
        /// Person identifier
        person: String,
    },
}

/// Scenario file layout.
#[derive(Deserialize)]
struct Scenario {
    people: Vec<PersonId>,
    #[serde(default)]
    intervals: Vec<BusyInterval>,
    #[serde(default)]
    presence: Vec<PresenceEntry>,
}

#[derive(Deserialize)]
struct PresenceEntry {
    person_id: PersonId,
    status: String,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct PresenceView<'a> {
    person_id: &'a PersonId,
    state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence: Option<&'a presence_engine::PresenceOverride>,
}

fn parse_instant(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC 3339 instant '{}': {}", s, e))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path))?;
            EngineConfig::from_json(&json).context("Failed to load engine config")?
        }
        None => EngineConfig::default(),
    };

    let clock: Arc<dyn Clock> = match cli.now {
        Some(now) => Arc::new(ManualClock::new(now)),
        None => Arc::new(SystemClock),
    };

    let raw = fs::read_to_string(&cli.scenario)
        .with_context(|| format!("Failed to read scenario file: {}", cli.scenario))?;
    let scenario: Scenario =
        serde_json::from_str(&raw).context("Failed to parse scenario JSON")?;

    let engine = build_engine(&scenario, config, clock).await?;
    let people = &scenario.people;

    let output = match cli.command {
        Commands::Report { window, duration } => {
            let window = to_window(&engine, &window)?;
            serde_json::to_value(engine.group_report(people, &window, duration).await?)?
        }
        Commands::Common { window } => {
            let window = to_window(&engine, &window)?;
            serde_json::to_value(engine.common_free_times(people, &window).await?)?
        }
        Commands::Heatmap { window } => {
            let window = to_window(&engine, &window)?;
            serde_json::to_value(engine.heatmap(people, &window).await?)?
        }
        Commands::Best { window, duration } => {
            let window = to_window(&engine, &window)?;
            serde_json::to_value(
                engine
                    .best_meeting_windows(people, &window, duration)
                    .await?,
            )?
        }
        Commands::FreeNow { resolution } => {
            serde_json::to_value(engine.free_now(people, resolution).await?)?
        }
        Commands::Presence { person } => {
            let id = PersonId::from(person);
            let lookup = engine.presence(&id).await;
            let state = match &lookup {
                PresenceLookup::Live(_) => "live",
                PresenceLookup::Absent => "absent",
                PresenceLookup::Unavailable => "unavailable",
            };
            serde_json::to_value(PresenceView {
                person_id: &id,
                state,
                presence: lookup.record(),
            })?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Load the scenario into in-memory collaborators.
async fn build_engine(
    scenario: &Scenario,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
) -> Result<AvailabilityEngine> {
    let intervals = InMemoryIntervals::from_intervals(scenario.intervals.iter().cloned());
    let store = InMemoryPresenceStore::new(clock.clone());
    let notifier = BroadcastNotifier::new(config.channel_capacity);

    let engine = AvailabilityEngine::new(
        Arc::new(intervals),
        Arc::new(store),
        Arc::new(notifier),
        clock,
        config,
    );

    for entry in &scenario.presence {
        engine
            .update_presence(&entry.person_id, &entry.status, entry.expires_at)
            .await
            .with_context(|| format!("Invalid presence entry for {}", entry.person_id))?;
    }
    info!(
        people = scenario.people.len(),
        intervals = scenario.intervals.len(),
        presence = scenario.presence.len(),
        "scenario loaded"
    );

    Ok(engine)
}

fn to_window(engine: &AvailabilityEngine, args: &WindowArgs) -> Result<TimeWindow> {
    let window = engine
        .window(args.start, args.end, args.resolution)
        .context("Invalid query window")?;
    debug!(slots = window.slot_count(), "query window");
    Ok(window)
}
