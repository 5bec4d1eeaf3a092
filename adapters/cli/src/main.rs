#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless command-line adapter for the Bulwark tower-defence engine.
//!
//! Generates a level, wires the pure systems to the authoritative world in
//! a fixed-step frame loop, and narrates the event stream to stdout. Tower
//! layouts can be imported and shared as single-line codes, and audio cue
//! preferences persist across runs.

mod layout_code;
mod settings;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, trace};
use tracing_subscriber::EnvFilter;

use bulwark_core::{
    Command, EnemyTypeDefinition, EnemyTypeId, Event, GameStatus, GridCoord, Phase,
    TargetingPolicy, TowerKind,
};
use bulwark_system_path_generation::{LevelConfig, LevelPlan};
use bulwark_system_spawning::{Config as SpawnConfig, Spawning};
use bulwark_system_tower_combat::TowerCombat;
use bulwark_system_tower_targeting::TowerTargeting;
use bulwark_world::{apply, query, WaveConfig, World, WorldConfig};

use crate::layout_code::{LayoutTower, TowerLayoutCode};
use crate::settings::AudioPreferences;

/// Headless Bulwark tower-defence simulation.
#[derive(Debug, Parser)]
#[command(name = "bulwark", version, about)]
struct Args {
    /// Grid width in cells.
    #[arg(long, default_value_t = 16)]
    grid_width: u32,
    /// Grid height in cells.
    #[arg(long, default_value_t = 8)]
    grid_height: u32,
    /// Minimum number of path cells in the generated route.
    #[arg(long, default_value_t = 30)]
    min_path_length: usize,
    /// Session seed driving level generation and spawn rolls.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Number of waves to survive for victory.
    #[arg(long, default_value_t = 10)]
    final_wave: u32,
    /// Leaked enemies that end the session in defeat.
    #[arg(long, default_value_t = 5)]
    max_leaks: u32,
    /// Simulated frame length in milliseconds.
    #[arg(long, default_value_t = 100)]
    frame_ms: u64,
    /// Upper bound on simulated frames before the run is abandoned.
    #[arg(long, default_value_t = 36_000)]
    max_frames: u64,
    /// Import a tower layout code before the session starts.
    #[arg(long)]
    layout: Option<String>,
    /// Print the active layout as a shareable code after imports resolve.
    #[arg(long)]
    share: bool,
    /// Buy towers automatically during placement phases.
    #[arg(long)]
    auto_build: bool,
    /// Override the persisted master volume, `0.0` to `1.0`.
    #[arg(long)]
    volume: Option<f32>,
    /// Mute every audio cue for this and future runs.
    #[arg(long)]
    mute: bool,
    /// Location of the audio preference file.
    #[arg(long, default_value = "bulwark-audio.json")]
    audio_prefs: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let args = Args::parse();

    let mut preferences = AudioPreferences::load_or_default(&args.audio_prefs)?;
    if let Some(volume) = args.volume {
        preferences.master_volume = volume.clamp(0.0, 1.0);
    }
    if args.mute {
        preferences.muted = true;
    }
    preferences.save(&args.audio_prefs)?;

    let plan = LevelPlan::generate(
        LevelConfig {
            width: args.grid_width,
            height: args.grid_height,
            min_path_length: args.min_path_length,
        },
        args.seed,
    )
    .context("generating the level route")?;

    let mut world = World::new(WorldConfig {
        grid_width: args.grid_width,
        grid_height: args.grid_height,
        enemy_types: standard_catalog(),
        waves: WaveConfig {
            final_wave: args.final_wave,
            max_leaks: args.max_leaks,
            ..WaveConfig::default()
        },
        ..WorldConfig::default()
    })
    .context("constructing the world")?;

    let mut events = Vec::new();
    apply(
        &mut world,
        Command::SetPath {
            path: plan.into_path(),
        },
        &mut events,
    );
    info!(seed = args.seed, "session ready");
    render_map(&world);

    if let Some(code) = &args.layout {
        import_layout(&mut world, code, args.grid_width, args.grid_height, &mut events)?;
    }
    if args.share {
        println!("{}", export_layout(&world).encode());
    }

    let catalog = query::enemy_catalog(&world);
    let mut spawning = Spawning::new(SpawnConfig::new(
        args.seed,
        Duration::from_secs(1),
        Duration::from_millis(200),
        Duration::from_millis(50),
    ));
    let mut targeting = TowerTargeting::new();
    let mut combat = TowerCombat::new();
    let mut targets = Vec::new();
    let mut commands = Vec::new();
    let dt = Duration::from_millis(args.frame_ms);
    let mut built_for_wave = 0;

    for _ in 0..args.max_frames {
        if query::status(&world) != GameStatus::Playing {
            break;
        }
        let phase = query::phase(&world);
        if args.auto_build && phase == Phase::Placement && built_for_wave < query::wave(&world) {
            built_for_wave = query::wave(&world);
            auto_build(&mut world, &mut events);
        }

        let towers = query::tower_view(&world);
        let enemies = query::enemy_view(&world);
        targeting.handle(phase, &towers, &enemies, &mut targets);
        commands.clear();
        combat.handle(phase, &towers, &targets, &mut commands);
        spawning.handle(&events, &catalog, &mut commands);

        events.clear();
        for command in commands.drain(..) {
            apply(&mut world, command, &mut events);
        }
        apply(&mut world, Command::Tick { dt }, &mut events);
        for shot in query::projectile_view(&world) {
            trace!(
                weapon = ?shot.weapon,
                x = shot.position.x(),
                y = shot.position.y(),
                height = shot.height,
                "projectile in flight"
            );
        }
        present(&events, &preferences);
    }

    println!(
        "session over: {:?} after wave {} (score {}, money {}, leaks {})",
        query::status(&world),
        query::wave(&world),
        query::score(&world),
        query::money(&world),
        query::leaks(&world),
    );
    Ok(())
}

/// Enemy catalog mirroring the stock roster: a steady grunt, a fast runner
/// gated to later waves, and a rare heavy.
fn standard_catalog() -> Vec<EnemyTypeDefinition> {
    vec![
        EnemyTypeDefinition {
            id: EnemyTypeId::new(0),
            max_health: 100.0,
            speed: 2.0,
            reward: 5,
            score_value: 10,
            base_count: 8,
            additional_per_wave: 3,
            spawn_delay: Duration::from_millis(900),
            spawn_chance: 1.0,
            min_wave: 1,
        },
        EnemyTypeDefinition {
            id: EnemyTypeId::new(1),
            max_health: 60.0,
            speed: 3.5,
            reward: 8,
            score_value: 15,
            base_count: 2,
            additional_per_wave: 2,
            spawn_delay: Duration::from_millis(1400),
            spawn_chance: 0.8,
            min_wave: 3,
        },
        EnemyTypeDefinition {
            id: EnemyTypeId::new(2),
            max_health: 400.0,
            speed: 1.0,
            reward: 25,
            score_value: 40,
            base_count: 1,
            additional_per_wave: 1,
            spawn_delay: Duration::from_millis(4000),
            spawn_chance: 0.6,
            min_wave: 5,
        },
    ]
}

/// Prints the committed route as an ASCII map, origin at the bottom left.
fn render_map(world: &World) {
    let Some(path) = query::path(world) else {
        return;
    };
    let (width, height) = query::grid_size(world);
    let start = path.start();
    let end = path.end();
    for y in (0..height).rev() {
        let mut row = String::with_capacity(width as usize);
        for x in 0..width {
            let cell = GridCoord::new(x, y);
            let glyph = if cell == start {
                'S'
            } else if cell == end {
                'E'
            } else if path.contains(cell) {
                '#'
            } else {
                '.'
            };
            row.push(glyph);
        }
        println!("{row}");
    }
    println!("route length: {} cells", path.len());
}

/// Applies every tower of a layout code, reporting rejections per tower.
fn import_layout(
    world: &mut World,
    code: &str,
    grid_width: u32,
    grid_height: u32,
    events: &mut Vec<Event>,
) -> anyhow::Result<()> {
    let layout = TowerLayoutCode::decode(code)
        .map_err(anyhow::Error::from)
        .context("decoding the layout code")?;
    anyhow::ensure!(
        layout.width == grid_width && layout.height == grid_height,
        "layout was captured on a {}x{} grid, session uses {}x{}",
        layout.width,
        layout.height,
        grid_width,
        grid_height,
    );
    for tower in layout.towers {
        apply(
            world,
            Command::PlaceTower {
                kind: tower.kind,
                at: tower.at,
                policy: tower.policy,
            },
            events,
        );
    }
    for event in events.iter() {
        if let Event::TowerPlacementRejected { kind, at, reason } = event {
            println!("layout tower {kind:?} at {at:?} rejected: {reason:?}");
        }
    }
    Ok(())
}

/// Captures the active towers as a shareable layout code.
fn export_layout(world: &World) -> TowerLayoutCode {
    let (width, height) = query::grid_size(world);
    let towers = query::tower_view(world)
        .iter()
        .map(|snapshot| LayoutTower {
            kind: snapshot.kind,
            at: snapshot.at,
            policy: snapshot.policy,
        })
        .collect();
    TowerLayoutCode {
        width,
        height,
        towers,
    }
}

/// Buys marksman towers on ground cells bordering the route until the
/// balance runs out.
fn auto_build(world: &mut World, events: &mut Vec<Event>) {
    let candidates: Vec<GridCoord> = {
        let Some(path) = query::path(world) else {
            return;
        };
        let (width, height) = query::grid_size(world);
        let mut seen = Vec::new();
        for cell in path.cells() {
            let (x, y) = (cell.x() as i64, cell.y() as i64);
            for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
                let (nx, ny) = (x + dx, y + dy);
                if nx < 0 || ny < 0 || nx >= i64::from(width) || ny >= i64::from(height) {
                    continue;
                }
                let neighbor = GridCoord::new(nx as u32, ny as u32);
                if !path.contains(neighbor) && !seen.contains(&neighbor) {
                    seen.push(neighbor);
                }
            }
        }
        seen
    };

    for at in candidates {
        if query::money(world) < TowerKind::Marksman.cost() {
            break;
        }
        apply(
            world,
            Command::PlaceTower {
                kind: TowerKind::Marksman,
                at,
                policy: TargetingPolicy::First,
            },
            events,
        );
    }
}

/// Narrates one frame's events and fires audio cues.
fn present(events: &[Event], preferences: &AudioPreferences) {
    for event in events {
        match event {
            Event::PhaseChanged {
                phase,
                wave,
                time_remaining,
            } => println!(
                "wave {wave}: {phase:?} phase ({}s)",
                time_remaining.as_secs()
            ),
            Event::WaveCompleted { wave } => println!("wave {wave} cleared"),
            Event::VictoryAchieved { waves_survived } => {
                println!("victory after {waves_survived} waves");
                cue(preferences, "fanfare");
            }
            Event::GameOver { leaks } => {
                println!("defeat: {leaks} enemies leaked through");
                cue(preferences, "defeat");
            }
            Event::EnemyDefeated { type_id, .. } => {
                println!("enemy {} down", type_id.get());
                cue(preferences, "enemy-down");
            }
            Event::EnemyLeaked { type_id, .. } => {
                println!("enemy {} leaked", type_id.get());
                cue(preferences, "enemy-leak");
            }
            Event::ProjectileImpact { weapon, .. } => cue(preferences, impact_cue(*weapon)),
            Event::ScoreChanged { score } => println!("score {score}"),
            Event::MoneyChanged { money } => println!("money {money}"),
            Event::MultiplierChanged { from, to } => {
                println!("multiplier {from} -> {to}");
                if to < from {
                    cue(preferences, "streak-broken");
                }
            }
            Event::TowerPlaced { kind, at, .. } => {
                println!("placed {kind:?} at ({}, {})", at.x(), at.y());
            }
            _ => {}
        }
    }
}

/// Audio cue name for a weapon category's impact.
fn impact_cue(weapon: TowerKind) -> &'static str {
    match weapon {
        TowerKind::Marksman => "impact-rifle",
        TowerKind::Turret => "impact-shell",
        TowerKind::Tesla => "impact-arc",
        TowerKind::Catapult => "impact-boulder",
    }
}

/// Emits a fire-and-forget audio cue line when cues are audible.
fn cue(preferences: &AudioPreferences, name: &str) {
    if preferences.audible() {
        println!("[audio] {name} (volume {:.2})", preferences.master_volume);
    }
}
