//! Spawning schedule behavior over synthetic and real event streams.

use std::time::Duration;

use bulwark_core::{
    Command, EnemyTypeDefinition, EnemyTypeId, Event, GridCoord, Path, Phase,
};
use bulwark_system_spawning::{Config, Spawning};
use bulwark_world::{apply, query, WaveConfig, World, WorldConfig};

fn definition(id: u32) -> EnemyTypeDefinition {
    EnemyTypeDefinition {
        base_count: 3,
        additional_per_wave: 2,
        spawn_delay: Duration::from_millis(100),
        spawn_chance: 1.0,
        ..EnemyTypeDefinition::fallback(EnemyTypeId::new(id))
    }
}

fn config() -> Config {
    Config::new(
        42,
        Duration::from_millis(200),
        Duration::from_millis(50),
        Duration::from_millis(10),
    )
}

fn defense_start(wave: u32) -> Event {
    Event::PhaseChanged {
        phase: Phase::Defense,
        wave,
        time_remaining: Duration::from_secs(18),
    }
}

fn tick(dt_ms: u64) -> Event {
    Event::TimeAdvanced {
        dt: Duration::from_millis(dt_ms),
    }
}

fn drain(spawning: &mut Spawning, catalog: &[EnemyTypeDefinition], frames: u32) -> Vec<Command> {
    let mut out = Vec::new();
    for _ in 0..frames {
        spawning.handle(&[tick(100)], catalog, &mut out);
    }
    out
}

fn spawn_count(commands: &[Command]) -> usize {
    commands
        .iter()
        .filter(|command| matches!(command, Command::SpawnEnemy { .. }))
        .count()
}

#[test]
fn schedule_drains_and_reports_completion() {
    let catalog = vec![definition(0)];
    let mut spawning = Spawning::new(config());
    let mut out = Vec::new();
    spawning.handle(&[defense_start(1)], &catalog, &mut out);
    assert!(out.is_empty(), "no spawn before the initial delay");

    let commands = drain(&mut spawning, &catalog, 20);
    assert_eq!(spawn_count(&commands), 3);
    assert_eq!(
        commands.last(),
        Some(&Command::CompleteWaveSpawning { wave: 1 })
    );

    // Drained: further time produces nothing.
    assert!(drain(&mut spawning, &catalog, 10).is_empty());
}

#[test]
fn counts_scale_with_the_wave_number() {
    let catalog = vec![definition(0)];
    let mut spawning = Spawning::new(config());
    let mut out = Vec::new();
    spawning.handle(&[defense_start(3)], &catalog, &mut out);
    let commands = drain(&mut spawning, &catalog, 40);
    // base 3 plus 2 per wave past the first.
    assert_eq!(spawn_count(&commands), 7);
}

#[test]
fn types_below_their_first_wave_are_left_out() {
    let late = EnemyTypeDefinition {
        min_wave: 4,
        ..definition(1)
    };
    let catalog = vec![definition(0), late];
    let mut spawning = Spawning::new(config());
    let mut out = Vec::new();
    spawning.handle(&[defense_start(2)], &catalog, &mut out);
    let commands = drain(&mut spawning, &catalog, 40);
    assert!(commands
        .iter()
        .all(|command| !matches!(
            command,
            Command::SpawnEnemy { type_id } if *type_id == EnemyTypeId::new(1)
        )));
    assert_eq!(spawn_count(&commands), 5);
}

#[test]
fn the_same_seed_replays_the_same_wave() {
    let catalog = vec![EnemyTypeDefinition {
        spawn_chance: 0.5,
        ..definition(0)
    }];
    let mut first = Spawning::new(config());
    let mut second = Spawning::new(config());
    let mut out_first = Vec::new();
    let mut out_second = Vec::new();
    first.handle(&[defense_start(1)], &catalog, &mut out_first);
    second.handle(&[defense_start(1)], &catalog, &mut out_second);
    for _ in 0..200 {
        first.handle(&[tick(100)], &catalog, &mut out_first);
        second.handle(&[tick(100)], &catalog, &mut out_second);
    }
    assert_eq!(out_first, out_second);
}

#[test]
fn a_phase_change_back_to_placement_cancels_the_schedule() {
    let catalog = vec![definition(0)];
    let mut spawning = Spawning::new(config());
    let mut out = Vec::new();
    spawning.handle(&[defense_start(1)], &catalog, &mut out);
    spawning.handle(
        &[Event::PhaseChanged {
            phase: Phase::Placement,
            wave: 2,
            time_remaining: Duration::from_secs(5),
        }],
        &catalog,
        &mut out,
    );
    assert!(drain(&mut spawning, &catalog, 30).is_empty());
}

#[test]
fn spawned_commands_materialize_enemies_in_the_world() {
    let catalog = vec![definition(0)];
    let mut world = World::new(WorldConfig {
        enemy_types: catalog.clone(),
        waves: WaveConfig {
            placement_duration: Duration::from_millis(100),
            ..WaveConfig::default()
        },
        ..WorldConfig::default()
    })
    .expect("valid config");
    let mut spawning = Spawning::new(config());

    let cells = (0..16).map(|x| GridCoord::new(x, 4)).collect();
    let mut events = Vec::new();
    apply(
        &mut world,
        Command::SetPath {
            path: Path::from_cells(cells).expect("straight route"),
        },
        &mut events,
    );

    let mut total_spawned = 0;
    for _ in 0..60 {
        let mut commands = Vec::new();
        spawning.handle(&events, &catalog, &mut commands);
        events.clear();
        for command in commands {
            apply(&mut world, command, &mut events);
        }
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(100),
            },
            &mut events,
        );
        total_spawned += events
            .iter()
            .filter(|event| matches!(event, Event::EnemySpawned { .. }))
            .count();
    }

    assert_eq!(total_spawned, 3);
    assert!(query::enemy_view(&world).len() <= 3);
}
