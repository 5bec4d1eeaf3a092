#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic wave spawning system.
//!
//! Listens for defense-phase starts, builds a per-type spawn schedule from
//! the enemy catalog, and emits [`Command::SpawnEnemy`] as each type's timer
//! expires. Every roll comes from a linear congruential generator seeded per
//! wave by hashing the session seed with the wave number, so a session seed
//! fully determines every spawn decision.

use std::time::Duration;

use bulwark_core::{Command, EnemyTypeDefinition, EnemyTypeId, Event, Phase};
use sha2::{Digest, Sha256};
use tracing::debug;

const RNG_MULTIPLIER: u64 = 6_364_136_223_846_793_005;
const RNG_INCREMENT: u64 = 1;

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    session_seed: u64,
    initial_delay: Duration,
    min_spawn_delay: Duration,
    delay_reduction_per_wave: Duration,
}

impl Config {
    /// Creates a configuration from the session seed and cadence tunables.
    #[must_use]
    pub const fn new(
        session_seed: u64,
        initial_delay: Duration,
        min_spawn_delay: Duration,
        delay_reduction_per_wave: Duration,
    ) -> Self {
        Self {
            session_seed,
            initial_delay,
            min_spawn_delay,
            delay_reduction_per_wave,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session_seed: 0,
            initial_delay: Duration::from_secs(1),
            min_spawn_delay: Duration::from_millis(200),
            delay_reduction_per_wave: Duration::from_millis(50),
        }
    }
}

#[derive(Debug)]
struct TypeRun {
    type_id: EnemyTypeId,
    remaining: u32,
    next_in: Duration,
    cadence: Duration,
    spawn_chance: f32,
}

#[derive(Debug)]
struct WaveRun {
    wave: u32,
    initial_delay_left: Duration,
    runs: Vec<TypeRun>,
    rng_state: u64,
}

/// Pure system that deterministically emits enemy spawn commands.
#[derive(Debug)]
pub struct Spawning {
    config: Config,
    active: Option<WaveRun>,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            active: None,
        }
    }

    /// Consumes world events and the enemy catalog, emitting spawn commands
    /// and a final `CompleteWaveSpawning` once the schedule drains.
    pub fn handle(
        &mut self,
        events: &[Event],
        catalog: &[EnemyTypeDefinition],
        out: &mut Vec<Command>,
    ) {
        for event in events {
            match event {
                Event::PhaseChanged {
                    phase: Phase::Defense,
                    wave,
                    ..
                } => self.begin_wave(*wave, catalog),
                Event::PhaseChanged {
                    phase: Phase::Placement,
                    ..
                }
                | Event::GameOver { .. }
                | Event::VictoryAchieved { .. } => self.active = None,
                Event::TimeAdvanced { dt } => self.advance(*dt, out),
                _ => {}
            }
        }
    }

    fn begin_wave(&mut self, wave: u32, catalog: &[EnemyTypeDefinition]) {
        let runs: Vec<TypeRun> = catalog
            .iter()
            .filter_map(|definition| {
                let count = scheduled_count(definition, wave);
                (count > 0).then(|| TypeRun {
                    type_id: definition.id,
                    remaining: count,
                    next_in: Duration::ZERO,
                    cadence: self.cadence(definition, wave),
                    spawn_chance: definition.spawn_chance,
                })
            })
            .collect();
        debug!(
            wave,
            types = runs.len(),
            total = runs.iter().map(|run| run.remaining).sum::<u32>(),
            "wave schedule built"
        );
        self.active = Some(WaveRun {
            wave,
            initial_delay_left: self.config.initial_delay,
            runs,
            rng_state: wave_seed(self.config.session_seed, wave),
        });
    }

    fn advance(&mut self, dt: Duration, out: &mut Vec<Command>) {
        let Some(run) = &mut self.active else {
            return;
        };
        if !run.initial_delay_left.is_zero() {
            run.initial_delay_left = run.initial_delay_left.saturating_sub(dt);
            return;
        }
        for type_run in &mut run.runs {
            type_run.next_in = type_run.next_in.saturating_sub(dt);
            if !type_run.next_in.is_zero() {
                continue;
            }
            if roll(&mut run.rng_state) <= type_run.spawn_chance {
                out.push(Command::SpawnEnemy {
                    type_id: type_run.type_id,
                });
                type_run.remaining -= 1;
            }
            // A failed roll still consumes the slot; the count carries over.
            type_run.next_in = type_run.cadence;
        }
        run.runs.retain(|type_run| type_run.remaining > 0);
        if run.runs.is_empty() {
            out.push(Command::CompleteWaveSpawning { wave: run.wave });
            self.active = None;
        }
    }

    fn cadence(&self, definition: &EnemyTypeDefinition, wave: u32) -> Duration {
        let reduction = self
            .config
            .delay_reduction_per_wave
            .saturating_mul(wave.saturating_sub(1));
        definition
            .spawn_delay
            .saturating_sub(reduction)
            .max(self.config.min_spawn_delay)
    }
}

/// Spawn count for one type at the given wave; zero before its first wave.
fn scheduled_count(definition: &EnemyTypeDefinition, wave: u32) -> u32 {
    if wave < definition.min_wave {
        return 0;
    }
    definition
        .base_count
        .saturating_add(wave.saturating_sub(1).saturating_mul(definition.additional_per_wave))
}

/// Derives the per-wave generator state by hashing the session seed with the
/// wave number.
fn wave_seed(session_seed: u64, wave: u32) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(session_seed.to_le_bytes());
    hasher.update(wave.to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Advances the generator and maps the draw into `[0, 1)`.
fn roll(state: &mut u64) -> f32 {
    *state = state.wrapping_mul(RNG_MULTIPLIER).wrapping_add(RNG_INCREMENT);
    ((*state >> 40) as f32) / ((1_u64 << 24) as f32)
}
