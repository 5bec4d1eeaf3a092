#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative simulation state for the Bulwark tower-defence engine.
//!
//! The [`World`] owns the committed route, the pooled enemy registry, the
//! placed towers, in-flight projectiles, the economy ledger, and the wave
//! tracker. All mutation flows through [`apply`], which executes one
//! [`Command`] and appends the resulting [`Event`] values to the caller's
//! buffer. Systems and adapters observe the world exclusively through the
//! [`query`] module and the event stream.

mod economy;
mod projectiles;
mod registry;
mod towers;
mod waves;

pub use economy::EconomyConfig;
pub use registry::SummonError;
pub use waves::WaveConfig;

use std::collections::VecDeque;
use std::f32::consts::{PI, TAU};
use std::time::Duration;

use bulwark_core::{
    Command, DamageDelivery, EnemyHandle, EnemyTypeDefinition, EnemyTypeId, Event, GameStatus,
    GridCoord, Path, Phase, PlacementError, Position, RemovalError, TargetingPolicy, TowerId,
    TowerKind, WAYPOINT_EPSILON,
};
use thiserror::Error;
use tracing::warn;

use crate::economy::EconomyLedger;
use crate::projectiles::{Flight, ImpactReport, Projectile};
use crate::registry::EnemyRegistry;
use crate::towers::TowerRegistry;
use crate::waves::WaveTracker;

/// Angular rate at which enemies rotate toward their travel direction,
/// in radians per second.
const ENEMY_TURN_RATE: f32 = 8.0;

/// Startup configuration for a world instance.
#[derive(Debug, Clone)]
pub struct WorldConfig {
    /// Grid width in cells.
    pub grid_width: u32,
    /// Grid height in cells.
    pub grid_height: u32,
    /// Enemy catalog registered with the pooled registry. Must not be empty.
    pub enemy_types: Vec<EnemyTypeDefinition>,
    /// Economy ledger tunables.
    pub economy: EconomyConfig,
    /// Wave pacing and loss-condition tunables.
    pub waves: WaveConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            grid_width: 16,
            grid_height: 8,
            enemy_types: Vec::new(),
            economy: EconomyConfig::default(),
            waves: WaveConfig::default(),
        }
    }
}

/// Failure to construct a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WorldInitError {
    /// The configuration carried no enemy type definitions.
    #[error("at least one enemy type definition is required")]
    NoEnemyTypes,
}

/// Cosmetic in-flight projectile state surfaced to presentation layers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileSnapshot {
    /// Weapon category that launched the projectile.
    pub weapon: TowerKind,
    /// Ground-plane position of the projectile.
    pub position: Position,
    /// Altitude above the ground plane; zero for flat trajectories.
    pub height: f32,
}

/// Authoritative world state. See the crate documentation for the mutation
/// discipline.
#[derive(Debug)]
pub struct World {
    grid_width: u32,
    grid_height: u32,
    path: Option<Path>,
    registry: EnemyRegistry,
    towers: TowerRegistry,
    projectiles: Vec<Projectile>,
    economy: EconomyLedger,
    waves: WaveTracker,
    pending_spawns: VecDeque<EnemyTypeId>,
    pending_despawns: VecDeque<EnemyHandle>,
}

impl World {
    /// Builds a world and registers the enemy catalog with the pooled
    /// registry.
    pub fn new(config: WorldConfig) -> Result<Self, WorldInitError> {
        if config.enemy_types.is_empty() {
            return Err(WorldInitError::NoEnemyTypes);
        }
        let mut registry = EnemyRegistry::new();
        registry.init(&config.enemy_types);
        Ok(Self {
            grid_width: config.grid_width,
            grid_height: config.grid_height,
            path: None,
            registry,
            towers: TowerRegistry::new(),
            projectiles: Vec::new(),
            economy: EconomyLedger::new(config.economy),
            waves: WaveTracker::new(config.waves),
            pending_spawns: VecDeque::new(),
            pending_despawns: VecDeque::new(),
        })
    }

    fn tick(&mut self, dt: Duration, events: &mut Vec<Event>) {
        if self.waves.status() != GameStatus::Playing {
            return;
        }
        events.push(Event::TimeAdvanced { dt });
        self.drain_spawns(events);
        self.towers.advance_cooldowns(dt);
        self.advance_projectiles(dt, events);
        self.advance_enemies(dt, events);
        self.drain_despawns();
        self.waves.advance(dt, self.registry.alive_count(), events);
    }

    /// Activates every spawn queued before this tick. Requests queued while
    /// draining wait for the next tick.
    fn drain_spawns(&mut self, events: &mut Vec<Event>) {
        let budget = self.pending_spawns.len();
        for _ in 0..budget {
            let Some(type_id) = self.pending_spawns.pop_front() else {
                break;
            };
            let Some(path) = &self.path else {
                warn!(?type_id, "spawn requested before a path was committed, dropped");
                continue;
            };
            let spawn_at = path.start().position();
            let first_leg = path.cell(1).map(GridCoord::position);
            match self.registry.summon(type_id, spawn_at) {
                Ok(handle) => {
                    if let (Some(slot), Some(waypoint)) =
                        (self.registry.get_mut(handle), first_leg)
                    {
                        slot.facing = heading(spawn_at, waypoint);
                    }
                    events.push(Event::EnemySpawned {
                        handle,
                        type_id,
                        at: spawn_at,
                    });
                }
                Err(error) => warn!(%error, "enemy summon failed"),
            }
        }
    }

    fn advance_projectiles(&mut self, dt: Duration, events: &mut Vec<Event>) {
        let mut impacts: Vec<ImpactReport> = Vec::new();
        let registry = &self.registry;
        self.projectiles
            .retain_mut(|projectile| match projectile.advance(dt, registry) {
                Some(report) => {
                    impacts.push(report);
                    false
                }
                None => true,
            });
        for report in impacts {
            self.resolve_impact(report, events);
        }
    }

    fn resolve_impact(&mut self, report: ImpactReport, events: &mut Vec<Event>) {
        if report.splash_radius > 0.0 {
            let victims: Vec<(EnemyHandle, f32)> = self
                .registry
                .alive()
                .iter()
                .filter_map(|&handle| {
                    let slot = self.registry.get(handle)?;
                    let distance = slot.position.distance_to(report.at);
                    (distance <= report.splash_radius).then_some((handle, distance))
                })
                .collect();
            for (handle, distance) in victims {
                let falloff = (1.0 - distance / report.splash_radius).clamp(0.0, 1.0);
                self.damage_enemy(handle, report.damage * falloff, events);
            }
        } else if let Some(target) = report.direct_target {
            self.damage_enemy(target, report.damage, events);
        }
        events.push(Event::ProjectileImpact {
            weapon: report.weapon,
            at: report.at,
        });
    }

    /// Applies damage to an alive enemy. Stale handles and already-depleted
    /// slots are no-ops, so an enemy is never defeated twice.
    fn damage_enemy(&mut self, handle: EnemyHandle, amount: f32, events: &mut Vec<Event>) {
        let Some(slot) = self.registry.get_mut(handle) else {
            return;
        };
        if slot.health <= 0.0 {
            return;
        }
        slot.health -= amount;
        if slot.health > 0.0 {
            return;
        }
        let type_id = slot.type_id;
        let _ = self.registry.mark_dead(handle);
        self.pending_despawns.push_back(handle);
        events.push(Event::EnemyDefeated { handle, type_id });
        let definition = self.registry.definition_or_fallback(type_id);
        self.with_economy_events(events, |ledger| ledger.record_defeat(&definition));
    }

    fn advance_enemies(&mut self, dt: Duration, events: &mut Vec<Event>) {
        if self.path.is_none() {
            return;
        }
        let handles: Vec<EnemyHandle> = self.registry.alive().to_vec();
        let mut leaked: Vec<EnemyHandle> = Vec::new();
        for handle in handles {
            let Some(slot) = self.registry.get(handle) else {
                continue;
            };
            let type_id = slot.type_id;
            let path_index = slot.path_index;
            let speed = self.registry.definition_or_fallback(type_id).speed;
            let Some(path) = &self.path else {
                return;
            };
            let Some(waypoint) = path.cell(path_index) else {
                leaked.push(handle);
                continue;
            };
            let waypoint = waypoint.position();
            let last_index = path.len() - 1;
            let Some(slot) = self.registry.get_mut(handle) else {
                continue;
            };
            let step = speed * dt.as_secs_f32();
            slot.position = slot.position.step_toward(waypoint, step);
            slot.facing = rotate_toward(
                slot.facing,
                heading(slot.position, waypoint),
                ENEMY_TURN_RATE * dt.as_secs_f32(),
            );
            if slot.position.distance_to(waypoint) <= WAYPOINT_EPSILON {
                if slot.path_index >= last_index {
                    leaked.push(handle);
                } else {
                    slot.path_index += 1;
                }
            }
        }
        for handle in leaked {
            self.leak_enemy(handle, events);
        }
    }

    fn leak_enemy(&mut self, handle: EnemyHandle, events: &mut Vec<Event>) {
        let Some(slot) = self.registry.get(handle) else {
            return;
        };
        let type_id = slot.type_id;
        let _ = self.registry.mark_dead(handle);
        self.pending_despawns.push_back(handle);
        events.push(Event::EnemyLeaked { handle, type_id });
        let definition = self.registry.definition_or_fallback(type_id);
        self.with_economy_events(events, |ledger| ledger.record_leak(&definition));
        if self.waves.record_leak() {
            events.push(Event::GameOver {
                leaks: self.waves.leaks(),
            });
        }
    }

    /// Recycles every despawn queued before this tick back into its pool.
    fn drain_despawns(&mut self) {
        let budget = self.pending_despawns.len();
        for _ in 0..budget {
            let Some(handle) = self.pending_despawns.pop_front() else {
                break;
            };
            self.registry.recycle(handle);
        }
    }

    fn fire_weapon(&mut self, tower_id: TowerId, target: EnemyHandle, events: &mut Vec<Event>) {
        if self.waves.status() != GameStatus::Playing {
            return;
        }
        let Some(tower) = self.towers.get(tower_id) else {
            warn!(?tower_id, "fire command for a missing tower ignored");
            return;
        };
        if !tower.cooldown.is_zero() {
            return;
        }
        let kind = tower.kind;
        let muzzle = tower.at.position();
        let cycle = tower.firing_cycle();
        let discharged = match kind.delivery() {
            DamageDelivery::Direct => {
                if self.registry.get(target).is_some() {
                    self.damage_enemy(target, kind.damage(), events);
                    true
                } else {
                    false
                }
            }
            DamageDelivery::Projectile {
                speed,
                explosion_radius,
            } => match self.registry.get(target) {
                Some(slot) => {
                    let last_known = slot.position;
                    self.projectiles.push(Projectile {
                        weapon: kind,
                        position: muzzle,
                        speed,
                        damage: kind.damage(),
                        splash_radius: explosion_radius,
                        flight: Flight::Seeking { target, last_known },
                    });
                    true
                }
                None => false,
            },
            DamageDelivery::Area { radius } => {
                let victims: Vec<EnemyHandle> = self
                    .registry
                    .alive()
                    .iter()
                    .filter(|&&handle| {
                        self.registry
                            .get(handle)
                            .is_some_and(|slot| slot.position.distance_to(muzzle) <= radius)
                    })
                    .copied()
                    .collect();
                for handle in victims {
                    self.damage_enemy(handle, kind.damage(), events);
                }
                events.push(Event::ProjectileImpact {
                    weapon: kind,
                    at: muzzle,
                });
                true
            }
            DamageDelivery::Ballistic {
                speed,
                arc_height,
                splash_radius,
            } => match self.registry.get(target) {
                Some(slot) => {
                    let target_pos = slot.position;
                    let path_index = slot.path_index;
                    let type_id = slot.type_id;
                    let flight_secs = (muzzle.distance_to(target_pos) / speed).max(1e-3);
                    let enemy_speed = self.registry.definition_or_fallback(type_id).speed;
                    let impact = predict_impact(
                        target_pos,
                        self.path.as_ref().and_then(|path| path.cell(path_index)),
                        enemy_speed,
                        flight_secs,
                    );
                    self.projectiles.push(Projectile {
                        weapon: kind,
                        position: muzzle,
                        speed,
                        damage: kind.damage(),
                        splash_radius,
                        flight: Flight::Ballistic {
                            origin: muzzle,
                            impact,
                            flight_time: Duration::from_secs_f32(flight_secs),
                            elapsed: Duration::ZERO,
                            arc_height,
                        },
                    });
                    true
                }
                None => false,
            },
        };
        if discharged {
            if let Some(tower) = self.towers.get_mut(tower_id) {
                tower.cooldown = cycle;
            }
        }
    }

    fn place_tower(
        &mut self,
        kind: TowerKind,
        at: GridCoord,
        policy: TargetingPolicy,
        events: &mut Vec<Event>,
    ) {
        let reason = self.placement_obstacle(at);
        if let Some(reason) = reason {
            events.push(Event::TowerPlacementRejected { kind, at, reason });
            return;
        }
        let mut purchased = false;
        self.with_economy_events(events, |ledger| {
            purchased = ledger.try_purchase(kind.cost());
        });
        if !purchased {
            events.push(Event::TowerPlacementRejected {
                kind,
                at,
                reason: PlacementError::InsufficientFunds,
            });
            return;
        }
        let tower = self.towers.place(kind, at, policy);
        events.push(Event::TowerPlaced {
            tower,
            kind,
            at,
            policy,
        });
    }

    fn placement_obstacle(&self, at: GridCoord) -> Option<PlacementError> {
        if self.waves.status() != GameStatus::Playing || self.waves.phase() != Phase::Placement {
            return Some(PlacementError::InvalidPhase);
        }
        if at.x() >= self.grid_width || at.y() >= self.grid_height {
            return Some(PlacementError::OutOfBounds);
        }
        if self.path.as_ref().is_some_and(|path| path.contains(at)) {
            return Some(PlacementError::OnPath);
        }
        if self.towers.occupied(at) {
            return Some(PlacementError::Occupied);
        }
        None
    }

    fn remove_tower(&mut self, tower: TowerId, events: &mut Vec<Event>) {
        if self.waves.status() != GameStatus::Playing || self.waves.phase() != Phase::Placement {
            events.push(Event::TowerRemovalRejected {
                tower,
                reason: RemovalError::InvalidPhase,
            });
            return;
        }
        match self.towers.remove(tower) {
            Some(_) => events.push(Event::TowerRemoved { tower }),
            None => events.push(Event::TowerRemovalRejected {
                tower,
                reason: RemovalError::MissingTower,
            }),
        }
    }

    /// Runs an economy mutation and surfaces every observable change as an
    /// event.
    fn with_economy_events(
        &mut self,
        events: &mut Vec<Event>,
        mutate: impl FnOnce(&mut EconomyLedger),
    ) {
        let score_before = self.economy.score();
        let money_before = self.economy.money();
        let multiplier_before = self.economy.multiplier();
        mutate(&mut self.economy);
        if self.economy.score() != score_before {
            events.push(Event::ScoreChanged {
                score: self.economy.score(),
            });
        }
        if self.economy.money() != money_before {
            events.push(Event::MoneyChanged {
                money: self.economy.money(),
            });
        }
        if self.economy.multiplier() != multiplier_before {
            events.push(Event::MultiplierChanged {
                from: multiplier_before,
                to: self.economy.multiplier(),
            });
        }
    }
}

/// Executes one command against the world, appending resulting events.
///
/// Spawn requests are queued and activated at the start of the next tick so
/// that every consumer observes a new enemy in the same frame.
pub fn apply(world: &mut World, command: Command, events: &mut Vec<Event>) {
    match command {
        Command::SetPath { path } => {
            events.push(Event::PathCommitted { length: path.len() });
            world.path = Some(path);
        }
        Command::Tick { dt } => world.tick(dt, events),
        Command::SpawnEnemy { type_id } => {
            if world.waves.status() == GameStatus::Playing {
                world.pending_spawns.push_back(type_id);
            }
        }
        Command::FireWeapon { tower, target } => world.fire_weapon(tower, target, events),
        Command::PlaceTower { kind, at, policy } => world.place_tower(kind, at, policy, events),
        Command::RemoveTower { tower } => world.remove_tower(tower, events),
        Command::CompleteWaveSpawning { wave } => world.waves.mark_spawning_complete(wave),
    }
}

/// Angle in radians from `from` toward `to`; zero when the points coincide.
fn heading(from: Position, to: Position) -> f32 {
    let dx = to.x() - from.x();
    let dy = to.y() - from.y();
    if dx == 0.0 && dy == 0.0 {
        0.0
    } else {
        dy.atan2(dx)
    }
}

/// Rotates `current` toward `target` by at most `max_delta`, taking the
/// shortest arc across the wrap.
fn rotate_toward(current: f32, target: f32, max_delta: f32) -> f32 {
    let mut difference = (target - current) % TAU;
    if difference > PI {
        difference -= TAU;
    }
    if difference < -PI {
        difference += TAU;
    }
    if difference.abs() <= max_delta {
        target
    } else {
        current + max_delta * difference.signum()
    }
}

/// Linear extrapolation of a walking target over the payload flight time.
fn predict_impact(
    target_pos: Position,
    waypoint: Option<GridCoord>,
    enemy_speed: f32,
    flight_secs: f32,
) -> Position {
    let Some(waypoint) = waypoint else {
        return target_pos;
    };
    let waypoint = waypoint.position();
    let distance = target_pos.distance_to(waypoint);
    if distance == 0.0 {
        return target_pos;
    }
    let scale = enemy_speed * flight_secs / distance;
    Position::new(
        target_pos.x() + (waypoint.x() - target_pos.x()) * scale,
        target_pos.y() + (waypoint.y() - target_pos.y()) * scale,
    )
}

/// Read-only views over world state for systems and adapters.
pub mod query {
    use super::*;
    use bulwark_core::{EnemySnapshot, EnemyView, Health, TowerSnapshot, TowerView};

    /// Committed route, when one has been set.
    #[must_use]
    pub fn path(world: &World) -> Option<&Path> {
        world.path.as_ref()
    }

    /// Grid dimensions in cells as `(width, height)`.
    #[must_use]
    pub fn grid_size(world: &World) -> (u32, u32) {
        (world.grid_width, world.grid_height)
    }

    /// Phase currently in progress.
    #[must_use]
    pub fn phase(world: &World) -> Phase {
        world.waves.phase()
    }

    /// Session status, terminal states included.
    #[must_use]
    pub fn status(world: &World) -> GameStatus {
        world.waves.status()
    }

    /// One-based wave counter.
    #[must_use]
    pub fn wave(world: &World) -> u32 {
        world.waves.wave()
    }

    /// Time left in the current phase.
    #[must_use]
    pub fn time_remaining(world: &World) -> Duration {
        world.waves.time_remaining()
    }

    /// Cumulative leaked enemies this session.
    #[must_use]
    pub fn leaks(world: &World) -> u32 {
        world.waves.leaks()
    }

    /// Current score.
    #[must_use]
    pub fn score(world: &World) -> u32 {
        world.economy.score()
    }

    /// Current money balance.
    #[must_use]
    pub fn money(world: &World) -> u32 {
        world.economy.money()
    }

    /// Current streak multiplier.
    #[must_use]
    pub fn multiplier(world: &World) -> i32 {
        world.economy.multiplier()
    }

    /// Registered enemy catalog in id order.
    #[must_use]
    pub fn enemy_catalog(world: &World) -> Vec<EnemyTypeDefinition> {
        world.registry.catalog().copied().collect()
    }

    /// Snapshot of every alive enemy in deterministic handle order.
    #[must_use]
    pub fn enemy_view(world: &World) -> EnemyView {
        let snapshots = world
            .registry
            .alive()
            .iter()
            .filter_map(|&handle| {
                let slot = world.registry.get(handle)?;
                Some(EnemySnapshot {
                    handle,
                    type_id: slot.type_id,
                    position: slot.position,
                    health: Health::new(slot.health.max(0.0)),
                    max_health: Health::new(slot.max_health),
                    path_index: slot.path_index,
                    facing: slot.facing,
                })
            })
            .collect();
        EnemyView::from_snapshots(snapshots)
    }

    /// Snapshot of every placed tower in deterministic id order.
    #[must_use]
    pub fn tower_view(world: &World) -> TowerView {
        let snapshots = world
            .towers
            .iter()
            .map(|tower| TowerSnapshot {
                id: tower.id,
                kind: tower.kind,
                at: tower.at,
                policy: tower.policy,
                ready_in: tower.cooldown,
            })
            .collect();
        TowerView::from_snapshots(snapshots)
    }

    /// Cosmetic snapshot of in-flight projectiles for presentation.
    #[must_use]
    pub fn projectile_view(world: &World) -> Vec<ProjectileSnapshot> {
        world
            .projectiles
            .iter()
            .map(|projectile| ProjectileSnapshot {
                weapon: projectile.weapon,
                position: projectile.position,
                height: projectile.height(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<EnemyTypeDefinition> {
        vec![EnemyTypeDefinition {
            max_health: 20.0,
            speed: 1.0,
            ..EnemyTypeDefinition::fallback(EnemyTypeId::new(0))
        }]
    }

    fn world() -> World {
        World::new(WorldConfig {
            enemy_types: catalog(),
            ..WorldConfig::default()
        })
        .expect("catalog is non-empty")
    }

    fn straight_path(length: u32) -> Path {
        let cells = (0..length).map(|x| GridCoord::new(x, 4)).collect();
        Path::from_cells(cells).expect("straight path is valid")
    }

    fn start_defense(world: &mut World) {
        let mut events = Vec::new();
        apply(
            world,
            Command::Tick {
                dt: WaveConfig::default().placement_duration,
            },
            &mut events,
        );
        assert_eq!(query::phase(world), Phase::Defense);
    }

    fn spawn_one(world: &mut World) -> EnemyHandle {
        let mut events = Vec::new();
        apply(
            world,
            Command::SpawnEnemy {
                type_id: EnemyTypeId::new(0),
            },
            &mut events,
        );
        apply(
            world,
            Command::Tick {
                dt: Duration::from_millis(1),
            },
            &mut events,
        );
        events
            .iter()
            .find_map(|event| match event {
                Event::EnemySpawned { handle, .. } => Some(*handle),
                _ => None,
            })
            .expect("spawn should activate on the next tick")
    }

    #[test]
    fn empty_catalog_is_a_hard_setup_failure() {
        let result = World::new(WorldConfig::default());
        assert_eq!(result.err(), Some(WorldInitError::NoEnemyTypes));
    }

    #[test]
    fn spawns_queue_until_the_next_tick() {
        let mut world = world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SetPath {
                path: straight_path(6),
            },
            &mut events,
        );
        start_defense(&mut world);
        apply(
            &mut world,
            Command::SpawnEnemy {
                type_id: EnemyTypeId::new(0),
            },
            &mut events,
        );
        assert!(query::enemy_view(&world).is_empty());
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(16),
            },
            &mut events,
        );
        assert_eq!(query::enemy_view(&world).len(), 1);
    }

    #[test]
    fn enemies_walk_the_path_and_leak_off_the_end() {
        let mut world = world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SetPath {
                path: straight_path(3),
            },
            &mut events,
        );
        start_defense(&mut world);
        let handle = spawn_one(&mut world);
        events.clear();
        // Speed 1 over a 2-cell walk: well under 4 seconds to leak.
        for _ in 0..40 {
            apply(
                &mut world,
                Command::Tick {
                    dt: Duration::from_millis(100),
                },
                &mut events,
            );
        }
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::EnemyLeaked { handle: leaked, .. } if *leaked == handle)));
        assert_eq!(query::leaks(&world), 1);
        assert!(query::enemy_view(&world).is_empty());
    }

    #[test]
    fn fifth_leak_ends_the_session() {
        let mut world = world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SetPath {
                path: straight_path(3),
            },
            &mut events,
        );
        start_defense(&mut world);
        for _ in 0..5 {
            let _ = spawn_one(&mut world);
        }
        events.clear();
        for _ in 0..60 {
            apply(
                &mut world,
                Command::Tick {
                    dt: Duration::from_millis(100),
                },
                &mut events,
            );
        }
        assert_eq!(query::status(&world), GameStatus::GameOver);
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::GameOver { leaks: 5 })));
        // Frozen: further commands mutate nothing.
        events.clear();
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_secs(1),
            },
            &mut events,
        );
        assert!(events.is_empty());
    }

    #[test]
    fn direct_fire_defeats_and_pays_out() {
        let mut world = world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SetPath {
                path: straight_path(8),
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Marksman,
                at: GridCoord::new(2, 5),
                policy: TargetingPolicy::First,
            },
            &mut events,
        );
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::TowerPlaced { .. })));
        start_defense(&mut world);
        let handle = spawn_one(&mut world);
        let tower = query::tower_view(&world).as_slice()[0].id;
        events.clear();
        // Two 10-damage hits deplete 20 health.
        for _ in 0..2 {
            apply(
                &mut world,
                Command::FireWeapon {
                    tower,
                    target: handle,
                },
                &mut events,
            );
            apply(
                &mut world,
                Command::Tick {
                    dt: Duration::from_secs(1),
                },
                &mut events,
            );
        }
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::EnemyDefeated { .. })));
        assert!(query::money(&world) > 100 - TowerKind::Marksman.cost());
        assert!(query::score(&world) > 0);
    }

    #[test]
    fn fire_respects_the_cooldown_snapshot() {
        let mut world = world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SetPath {
                path: straight_path(8),
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Marksman,
                at: GridCoord::new(2, 5),
                policy: TargetingPolicy::First,
            },
            &mut events,
        );
        start_defense(&mut world);
        let handle = spawn_one(&mut world);
        let tower = query::tower_view(&world).as_slice()[0].id;
        events.clear();
        // Back-to-back fires without time advancing: only the first lands.
        apply(
            &mut world,
            Command::FireWeapon {
                tower,
                target: handle,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::FireWeapon {
                tower,
                target: handle,
            },
            &mut events,
        );
        let view = query::enemy_view(&world);
        let snapshot = view.iter().next().expect("enemy is alive");
        assert_eq!(snapshot.health.value(), 10.0);
    }

    #[test]
    fn overlapping_lethal_shots_defeat_only_once() {
        let mut world = World::new(WorldConfig {
            enemy_types: vec![EnemyTypeDefinition {
                max_health: 10.0,
                speed: 1.0,
                ..EnemyTypeDefinition::fallback(EnemyTypeId::new(0))
            }],
            ..WorldConfig::default()
        })
        .expect("catalog is non-empty");
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SetPath {
                path: straight_path(8),
            },
            &mut events,
        );
        for x in [1, 2] {
            apply(
                &mut world,
                Command::PlaceTower {
                    kind: TowerKind::Marksman,
                    at: GridCoord::new(x, 5),
                    policy: TargetingPolicy::First,
                },
                &mut events,
            );
        }
        let towers: Vec<TowerId> = events
            .iter()
            .filter_map(|event| match event {
                Event::TowerPlaced { tower, .. } => Some(*tower),
                _ => None,
            })
            .collect();
        assert_eq!(towers.len(), 2);
        start_defense(&mut world);
        let handle = spawn_one(&mut world);
        events.clear();
        // Both towers resolve the same 10-health target in one frame. The
        // first shot defeats it; the second finds the handle already dead.
        for tower in towers {
            apply(
                &mut world,
                Command::FireWeapon {
                    tower,
                    target: handle,
                },
                &mut events,
            );
        }
        let defeats = events
            .iter()
            .filter(|event| matches!(event, Event::EnemyDefeated { .. }))
            .count();
        assert_eq!(defeats, 1);
        let payouts = events
            .iter()
            .filter(|event| matches!(event, Event::MoneyChanged { .. }))
            .count();
        assert_eq!(payouts, 1);
        assert_eq!(
            query::money(&world),
            100 - 2 * TowerKind::Marksman.cost() + 5
        );
        assert!(query::enemy_view(&world).is_empty());
    }

    #[test]
    fn placement_rules_reject_in_order() {
        let mut world = world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SetPath {
                path: straight_path(8),
            },
            &mut events,
        );
        let place = |world: &mut World, at, events: &mut Vec<Event>| {
            apply(
                world,
                Command::PlaceTower {
                    kind: TowerKind::Marksman,
                    at,
                    policy: TargetingPolicy::First,
                },
                events,
            );
        };
        events.clear();
        place(&mut world, GridCoord::new(30, 2), &mut events);
        place(&mut world, GridCoord::new(2, 4), &mut events);
        place(&mut world, GridCoord::new(2, 5), &mut events);
        place(&mut world, GridCoord::new(2, 5), &mut events);
        let reasons: Vec<PlacementError> = events
            .iter()
            .filter_map(|event| match event {
                Event::TowerPlacementRejected { reason, .. } => Some(*reason),
                _ => None,
            })
            .collect();
        assert_eq!(
            reasons,
            vec![
                PlacementError::OutOfBounds,
                PlacementError::OnPath,
                PlacementError::Occupied,
            ]
        );
    }

    #[test]
    fn placement_is_rejected_during_defense() {
        let mut world = world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SetPath {
                path: straight_path(8),
            },
            &mut events,
        );
        start_defense(&mut world);
        events.clear();
        apply(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Marksman,
                at: GridCoord::new(2, 6),
                policy: TargetingPolicy::First,
            },
            &mut events,
        );
        assert!(events.iter().any(|event| matches!(
            event,
            Event::TowerPlacementRejected {
                reason: PlacementError::InvalidPhase,
                ..
            }
        )));
    }

    #[test]
    fn insufficient_funds_deducts_nothing() {
        let mut world = world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Marksman,
                at: GridCoord::new(2, 5),
                policy: TargetingPolicy::First,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Catapult,
                at: GridCoord::new(3, 5),
                policy: TargetingPolicy::First,
            },
            &mut events,
        );
        assert!(events.iter().any(|event| matches!(
            event,
            Event::TowerPlacementRejected {
                reason: PlacementError::InsufficientFunds,
                ..
            }
        )));
        assert_eq!(query::money(&world), 100 - TowerKind::Marksman.cost());
    }

    #[test]
    fn removal_requires_placement_phase_and_an_existing_tower() {
        let mut world = world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::RemoveTower {
                tower: TowerId::new(99),
            },
            &mut events,
        );
        assert!(events.iter().any(|event| matches!(
            event,
            Event::TowerRemovalRejected {
                reason: RemovalError::MissingTower,
                ..
            }
        )));
        apply(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Marksman,
                at: GridCoord::new(2, 5),
                policy: TargetingPolicy::First,
            },
            &mut events,
        );
        let tower = query::tower_view(&world).as_slice()[0].id;
        start_defense(&mut world);
        events.clear();
        apply(&mut world, Command::RemoveTower { tower }, &mut events);
        assert!(events.iter().any(|event| matches!(
            event,
            Event::TowerRemovalRejected {
                reason: RemovalError::InvalidPhase,
                ..
            }
        )));
    }

    #[test]
    fn rotate_toward_takes_the_short_arc() {
        let rotated = rotate_toward(0.1, -0.1, 1.0);
        assert!((rotated + 0.1).abs() < 1e-6);
        let wrapped = rotate_toward(PI - 0.05, -PI + 0.05, 0.02);
        assert!(wrapped > PI - 0.05);
    }

    #[test]
    fn predicted_impact_leads_the_target() {
        let impact = predict_impact(
            Position::new(2.0, 4.0),
            Some(GridCoord::new(6, 4)),
            2.0,
            1.0,
        );
        assert!((impact.x() - 4.0).abs() < 1e-5);
        assert!((impact.y() - 4.0).abs() < 1e-5);
    }
}
