//! jtimer Demo Server
//!
//! Loads a map (from `JTIMER_MAP_PATH` or a built-in layout) and drives two
//! scripted players through it: one clean run, one that skips a checkpoint.

use std::collections::BTreeMap;
use std::sync::Arc;
use anyhow::Context;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use jtimer::{
    TICK_RATE, VERSION,
    host::{HudSink, HudSnapshot, JoinRequest, PlayerProfile, StaticProfiles},
    scoring::{RecordBook, ScoreMessage, ScoringConfig},
    timer::{
        format_ticks, Map, MapDefinition, PlayerClass, PlayerId, SegmentDefinition, Timer,
        TimerConfig, ZoneDefinition,
    },
    RawTransform,
};

/// Ticks the demo runs for.
const DEMO_TICKS: u32 = 400;

/// Horizontal speed of the scripted players (units per tick).
const RUN_SPEED: f32 = 20.0;

/// HUD that writes to the log.
struct LogHud;

impl HudSink for LogHud {
    fn draw_timer(&self, snapshot: &HudSnapshot) {
        let clock = snapshot
            .elapsed_ticks
            .map(|t| format_ticks(t, TICK_RATE))
            .unwrap_or_else(|| "--:--.---".to_string());
        debug!(
            "[HUD] {} {:?} {} cp={} speed={:.0}",
            snapshot.name, snapshot.phase, clock, snapshot.checkpoints, snapshot.speed
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("jtimer v{}", VERSION);

    let config = TimerConfig::from_env();
    let scoring = ScoringConfig::from_env();
    info!("Tick Rate: {} Hz, HUD every {} ticks", config.tick_rate, config.hud_interval);

    let map = match &config.map_path {
        Some(path) => Map::load(path).with_context(|| format!("loading map {}", path.display()))?,
        None => Map::from_definition(&demo_map()),
    };

    demo_session(config, scoring, map).await;
    Ok(())
}

/// Built-in straight-line layout: start, two checkpoints, end, plus a course
/// over the second half.
fn demo_map() -> MapDefinition {
    let zone = |name: &str, x: f32| ZoneDefinition::from_center(name, [x, 0.0, 64.0], [64.0, 128.0, 64.0]);
    MapDefinition {
        name: "jump_demo".into(),
        start: Some(zone("map_start", 0.0)),
        end: Some(zone("map_end", 3000.0)),
        checkpoints: vec![zone("cp1", 1000.0), zone("cp2", 2000.0)],
        courses: vec![SegmentDefinition {
            name: "second half".into(),
            start: Some(zone("course_start", 1500.0)),
            end: Some(zone("course_end", 2500.0)),
            checkpoints: Vec::new(),
        }],
        bonuses: Vec::new(),
    }
}

/// X position of a scripted player at `tick`.
///
/// Both wait in the start zone, then run along +X. The cutter teleports over
/// the first checkpoint.
fn scripted_x(tick: u32, cutter: bool) -> f32 {
    let moving = tick.saturating_sub(10) as f32 * RUN_SPEED;
    let x = moving.min(3000.0);
    if cutter && (800.0..1200.0).contains(&x) {
        return 1200.0;
    }
    x
}

async fn demo_session(config: TimerConfig, scoring: ScoringConfig, map: Map) {
    info!("=== Starting Demo Session ===");

    let profiles = StaticProfiles::new()
        .with("STEAM_0:0:1001", PlayerProfile { ranked: true, points: 0 });
    let mut timer = Timer::new(config)
        .with_profiles(Arc::new(profiles))
        .with_hud(Arc::new(LogHud));
    timer.load_map(map);

    let runner = timer.add_player(JoinRequest::new("STEAM_0:0:1001", "runner", 1));
    let cutter = timer.add_player(JoinRequest::new("STEAM_0:0:1002", "cutter", 2));
    let joined = timer.settle_joins().await;
    info!("{} players joined", joined);

    for (id, class) in [(runner, PlayerClass::Soldier), (cutter, PlayerClass::Demoman)] {
        if let Err(e) = timer.player_spawned(&id, class) {
            info!("Spawn ignored: {}", e);
        }
    }

    let mut book = RecordBook::new(scoring);
    let mut total_events = 0;

    for t in 0..DEMO_TICKS {
        let mut transforms: BTreeMap<PlayerId, RawTransform> = BTreeMap::new();
        for (id, cutter) in [(runner, false), (cutter, true)] {
            let x = scripted_x(t, cutter);
            transforms.insert(id, RawTransform::new([x, 0.0, 0.0], [24.0, 24.0, 82.0], [RUN_SPEED * 66.0, 0.0, 0.0]));
        }

        let result = timer.update_timers(&transforms);
        total_events += result.events.len();

        let outcomes = book.apply(&result.events, |id| {
            timer.player(id).map_or(false, |p| p.profile.ranked)
        });
        for outcome in outcomes {
            let name = timer.player(&outcome.player_id).map_or("?", |p| p.name.as_str());
            for message in outcome.messages() {
                match message {
                    ScoreMessage::Finish { elapsed_ticks } => {
                        info!("{} finished {} in {}", name, outcome.segment, format_ticks(elapsed_ticks, TICK_RATE))
                    }
                    ScoreMessage::FinishNoSplit { elapsed_ticks } => {
                        info!("{} finished {} in {} (no split)", name, outcome.segment, format_ticks(elapsed_ticks, TICK_RATE))
                    }
                    ScoreMessage::Improvement { ticks } => {
                        info!("{} improved by {}", name, format_ticks(ticks, TICK_RATE))
                    }
                    ScoreMessage::Record { record_ticks } => {
                        info!("Record is {}", format_ticks(record_ticks, TICK_RATE))
                    }
                    ScoreMessage::RecordSet => info!("{} set a new record!", name),
                    ScoreMessage::PointsGain { points } => info!("{} gained {} points", name, points),
                }
            }
        }
    }

    info!("=== Demo Session Complete ===");
    info!("Total events: {}", total_events);
    if let Some(map) = timer.map() {
        for segment in map.segments() {
            info!("{}", book.describe(segment.id(), TICK_RATE));
        }
    }

    timer.remove_player(&cutter);
    timer.clear();
}
