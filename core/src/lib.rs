#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Bulwark tower-defence engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! for systems to react to deterministically. Systems consume event streams,
//! query immutable snapshots, and respond exclusively with new command
//! batches.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Distance below which an enemy is considered to have reached a waypoint,
/// measured in grid units.
pub const WAYPOINT_EPSILON: f32 = 0.05;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Commits the walkable route enemies follow for the rest of the session.
    SetPath {
        /// Validated route produced by the path generator.
        path: Path,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests that an enemy of the given type join the route.
    SpawnEnemy {
        /// Type of enemy to summon from the registry pools.
        type_id: EnemyTypeId,
    },
    /// Requests that a tower discharge its weapon at the resolved target.
    FireWeapon {
        /// Tower attempting to fire.
        tower: TowerId,
        /// Enemy selected by the targeting system this frame.
        target: EnemyHandle,
    },
    /// Requests placement of a tower on the provided ground cell.
    PlaceTower {
        /// Kind of tower to construct.
        kind: TowerKind,
        /// Cell the tower should occupy.
        at: GridCoord,
        /// Targeting policy the tower applies every frame.
        policy: TargetingPolicy,
    },
    /// Requests removal of an existing tower from the world.
    RemoveTower {
        /// Identifier of the tower targeted for removal.
        tower: TowerId,
    },
    /// Reports that the spawning schedule for a wave has been fully emitted.
    CompleteWaveSpawning {
        /// Wave whose schedule drained.
        wave: u32,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a route was committed to the world.
    PathCommitted {
        /// Number of cells composing the committed route.
        length: usize,
    },
    /// Confirms that an enemy was summoned onto the route.
    EnemySpawned {
        /// Generation-checked handle assigned to the enemy.
        handle: EnemyHandle,
        /// Type of the summoned enemy.
        type_id: EnemyTypeId,
        /// Continuous position the enemy occupies after spawning.
        at: Position,
    },
    /// Announces that an enemy's health was depleted by tower damage.
    EnemyDefeated {
        /// Handle of the defeated enemy; stale once the recycle completes.
        handle: EnemyHandle,
        /// Type of the defeated enemy.
        type_id: EnemyTypeId,
    },
    /// Announces that an enemy reached the end of the route undefeated.
    EnemyLeaked {
        /// Handle of the leaked enemy; stale once the recycle completes.
        handle: EnemyHandle,
        /// Type of the leaked enemy.
        type_id: EnemyTypeId,
    },
    /// Reports a projectile or pulse landing; keys audio cues by weapon.
    ProjectileImpact {
        /// Weapon category responsible for the impact.
        weapon: TowerKind,
        /// Continuous position where the impact resolved.
        at: Position,
    },
    /// Confirms that a tower was placed into the world.
    TowerPlaced {
        /// Identifier assigned to the tower by the world.
        tower: TowerId,
        /// Kind of tower that was placed.
        kind: TowerKind,
        /// Cell occupied by the tower.
        at: GridCoord,
        /// Targeting policy assigned at placement time.
        policy: TargetingPolicy,
    },
    /// Reports that a tower placement request was rejected.
    TowerPlacementRejected {
        /// Kind of tower requested for placement.
        kind: TowerKind,
        /// Cell provided in the placement request.
        at: GridCoord,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Confirms that a tower was removed from the world.
    TowerRemoved {
        /// Identifier of the tower that was removed.
        tower: TowerId,
    },
    /// Reports that a tower removal request was rejected.
    TowerRemovalRejected {
        /// Identifier of the tower targeted for removal.
        tower: TowerId,
        /// Specific reason the removal failed.
        reason: RemovalError,
    },
    /// Announces that the simulation entered a new phase.
    PhaseChanged {
        /// Phase that became active.
        phase: Phase,
        /// Wave the phase belongs to.
        wave: u32,
        /// Full duration allotted to the phase.
        time_remaining: Duration,
    },
    /// Announces that a defense phase finished and the wave is over.
    WaveCompleted {
        /// Wave that completed.
        wave: u32,
    },
    /// Announces that every configured wave has been survived.
    VictoryAchieved {
        /// Number of waves survived.
        waves_survived: u32,
    },
    /// Announces that the leak limit was reached and the session is lost.
    GameOver {
        /// Cumulative leak count at the moment of defeat.
        leaks: u32,
    },
    /// Reports the score after an economy mutation.
    ScoreChanged {
        /// Current score, floored at zero.
        score: u32,
    },
    /// Reports the money balance after an economy mutation.
    MoneyChanged {
        /// Current money, floored at zero.
        money: u32,
    },
    /// Reports a multiplier change driven by kill or leak streaks.
    MultiplierChanged {
        /// Multiplier before the mutation.
        from: i32,
        /// Multiplier after the mutation.
        to: i32,
    },
}

/// Location of a single grid cell expressed as x and y coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoord {
    x: u32,
    y: u32,
}

impl GridCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: GridCoord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Reports whether two cells are 4-adjacent (one step on one axis).
    #[must_use]
    pub fn is_cardinal_neighbor(self, other: GridCoord) -> bool {
        self.manhattan_distance(other) == 1
    }

    /// Continuous position at the centre of the cell.
    #[must_use]
    pub fn position(self) -> Position {
        Position::new(self.x as f32, self.y as f32)
    }
}

/// Continuous point in grid units used for enemy and projectile positions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Position {
    x: f32,
    y: f32,
}

impl Position {
    /// Creates a new continuous position.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Horizontal component measured in grid units.
    #[must_use]
    pub const fn x(&self) -> f32 {
        self.x
    }

    /// Vertical component measured in grid units.
    #[must_use]
    pub const fn y(&self) -> f32 {
        self.y
    }

    /// Euclidean distance to another position.
    #[must_use]
    pub fn distance_to(self, other: Position) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Moves up to `max_step` toward `target` without overshooting.
    #[must_use]
    pub fn step_toward(self, target: Position, max_step: f32) -> Position {
        let distance = self.distance_to(target);
        if distance <= max_step || distance == 0.0 {
            return target;
        }
        let scale = max_step / distance;
        Position::new(
            self.x + (target.x - self.x) * scale,
            self.y + (target.y - self.y) * scale,
        )
    }
}

/// Ordered, validated sequence of cells enemies walk from start to goal.
///
/// Construction enforces the route invariants once; the committed value is
/// immutable and shared read-only by every consumer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    cells: Vec<GridCoord>,
}

impl Path {
    /// Builds a path from ordered cells, validating the route invariants.
    ///
    /// A valid route has at least two cells, consecutive cells differ by
    /// exactly one grid step on exactly one axis, and no cell repeats
    /// consecutively. Revisiting a cell later in the route is allowed, which
    /// is how crossroad loops re-enter their anchor cell.
    pub fn from_cells(cells: Vec<GridCoord>) -> Result<Self, PathError> {
        if cells.len() < 2 {
            return Err(PathError::TooShort { len: cells.len() });
        }

        for (index, window) in cells.windows(2).enumerate() {
            if window[0] == window[1] {
                return Err(PathError::RepeatedCell { index });
            }
            if !window[0].is_cardinal_neighbor(window[1]) {
                return Err(PathError::NotAdjacent { index });
            }
        }

        Ok(Self { cells })
    }

    /// Ordered cells composing the route.
    #[must_use]
    pub fn cells(&self) -> &[GridCoord] {
        &self.cells
    }

    /// Number of cells in the route.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether the route holds no cells; never true for a valid path.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Retrieves the cell at the provided route index, if present.
    #[must_use]
    pub fn cell(&self, index: usize) -> Option<GridCoord> {
        self.cells.get(index).copied()
    }

    /// Cell enemies spawn on.
    #[must_use]
    pub fn start(&self) -> GridCoord {
        self.cells[0]
    }

    /// Cell enemies leak from when reached undefeated.
    #[must_use]
    pub fn end(&self) -> GridCoord {
        self.cells[self.cells.len() - 1]
    }

    /// Reports whether the provided cell lies on the route.
    #[must_use]
    pub fn contains(&self, cell: GridCoord) -> bool {
        self.cells.contains(&cell)
    }
}

/// Reasons a cell sequence fails route validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PathError {
    /// The sequence held fewer than two cells.
    TooShort {
        /// Number of cells provided.
        len: usize,
    },
    /// Two consecutive cells were not 4-adjacent.
    NotAdjacent {
        /// Index of the first cell in the offending pair.
        index: usize,
    },
    /// The same cell appeared twice in a row.
    RepeatedCell {
        /// Index of the first cell in the offending pair.
        index: usize,
    },
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooShort { len } => {
                write!(f, "sequence held fewer than two cells (len {len})")
            }
            Self::NotAdjacent { index } => {
                write!(f, "cells at indices {index} and {} are not 4-adjacent", index + 1)
            }
            Self::RepeatedCell { index } => {
                write!(f, "cell at index {index} is repeated at index {}", index + 1)
            }
        }
    }
}

impl std::error::Error for PathError {}

/// Unique identifier assigned to an enemy type template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyTypeId(u32);

impl EnemyTypeId {
    /// Creates a new enemy type identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Generation-checked handle referencing a pooled enemy slot.
///
/// Handles are the only way components outside the registry refer to an
/// enemy. The generation counter is bumped every time a slot returns to its
/// pool, so a handle retained across a recycle reads back as absent instead
/// of aliasing the slot's next occupant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnemyHandle {
    index: u32,
    generation: u32,
}

impl EnemyHandle {
    /// Creates a handle from a slot index and generation counter.
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Dense slot index the handle refers to.
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Generation the slot carried when the handle was issued.
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

/// Unique identifier assigned to a tower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TowerId(u32);

impl TowerId {
    /// Creates a new tower identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the tower identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Static per-type enemy template loaded once at startup.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnemyTypeDefinition {
    /// Identifier the registry keys its pool by.
    pub id: EnemyTypeId,
    /// Health assigned on every summon.
    pub max_health: f32,
    /// Movement speed in grid units per second.
    pub speed: f32,
    /// Money awarded when the enemy is defeated.
    pub reward: u32,
    /// Score value multiplied by the economy multiplier on defeat or leak.
    pub score_value: u32,
    /// Spawn count at wave one before per-wave scaling.
    pub base_count: u32,
    /// Additional spawns added for every wave past the first.
    pub additional_per_wave: u32,
    /// Delay between consecutive spawn attempts of this type.
    pub spawn_delay: Duration,
    /// Probability in `[0, 1]` that an eligible spawn attempt succeeds.
    pub spawn_chance: f32,
    /// Earliest wave this type appears in.
    pub min_wave: u32,
}

impl EnemyTypeDefinition {
    /// Synthesizes the degrade-gracefully default used when upstream data is
    /// missing for a requested type id.
    #[must_use]
    pub const fn fallback(id: EnemyTypeId) -> Self {
        Self {
            id,
            max_health: 100.0,
            speed: 2.0,
            reward: 5,
            score_value: 10,
            base_count: 0,
            additional_per_wave: 0,
            spawn_delay: Duration::from_secs(1),
            spawn_chance: 1.0,
            min_wave: 1,
        }
    }
}

/// Observable health of an enemy, floored at zero for presentation.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Health(f32);

impl Health {
    /// Creates a health value from the provided amount.
    #[must_use]
    pub const fn new(value: f32) -> Self {
        Self(value)
    }

    /// Raw health amount; never negative.
    #[must_use]
    pub const fn value(&self) -> f32 {
        self.0
    }

    /// Reports whether the health pool is empty.
    #[must_use]
    pub fn is_depleted(&self) -> bool {
        self.0 <= 0.0
    }
}

/// Types of towers that can be constructed on ground cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TowerKind {
    /// Instant-hit tower that damages its target the frame it fires.
    Marksman,
    /// Tower that launches a seeking projectile with optional splash.
    Turret,
    /// Pulse tower that damages every enemy within its radius.
    Tesla,
    /// Arcing tower that lobs a splash payload at a predicted impact point.
    Catapult,
}

impl TowerKind {
    /// Damage applied per hit, before any splash falloff.
    #[must_use]
    pub const fn damage(self) -> f32 {
        match self {
            Self::Marksman => 10.0,
            Self::Turret => 14.0,
            Self::Tesla => 6.0,
            Self::Catapult => 25.0,
        }
    }

    /// Shots per second the tower sustains while a target resolves.
    #[must_use]
    pub const fn fire_rate(self) -> f32 {
        match self {
            Self::Marksman => 2.0,
            Self::Turret => 1.0,
            Self::Tesla => 0.8,
            Self::Catapult => 0.4,
        }
    }

    /// Targeting range measured in grid units from the tower cell.
    #[must_use]
    pub const fn range(self) -> f32 {
        match self {
            Self::Marksman => 3.5,
            Self::Turret => 5.0,
            Self::Tesla => 2.5,
            Self::Catapult => 7.0,
        }
    }

    /// Purchase cost deducted from the economy on placement.
    #[must_use]
    pub const fn cost(self) -> u32 {
        match self {
            Self::Marksman => 50,
            Self::Turret => 80,
            Self::Tesla => 100,
            Self::Catapult => 120,
        }
    }

    /// Damage-delivery strategy the tower arms its weapon with.
    #[must_use]
    pub const fn delivery(self) -> DamageDelivery {
        match self {
            Self::Marksman => DamageDelivery::Direct,
            Self::Turret => DamageDelivery::Projectile {
                speed: 15.0,
                explosion_radius: 0.0,
            },
            Self::Tesla => DamageDelivery::Area { radius: 2.5 },
            Self::Catapult => DamageDelivery::Ballistic {
                speed: 8.0,
                arc_height: 5.0,
                splash_radius: 1.5,
            },
        }
    }
}

/// Damage-delivery strategies towers arm exactly one of.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DamageDelivery {
    /// Applies damage to the resolved target the frame the tower fires.
    Direct,
    /// Spawns a seeking projectile that homes toward the live target.
    Projectile {
        /// Travel speed in grid units per second.
        speed: f32,
        /// Splash radius; zero applies full damage to the target only.
        explosion_radius: f32,
    },
    /// Damages every alive enemy within the radius of the tower cell.
    Area {
        /// Pulse radius in grid units.
        radius: f32,
    },
    /// Lobs a payload along an arc toward a predicted impact point.
    Ballistic {
        /// Horizontal travel speed in grid units per second.
        speed: f32,
        /// Peak height of the sine arc; cosmetic, does not affect timing.
        arc_height: f32,
        /// Splash radius applied at the impact point.
        splash_radius: f32,
    },
}

/// Policies that select a victim among the enemies in range of a tower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetingPolicy {
    /// Enemy furthest along the route (highest path index), not spawn order.
    First,
    /// Enemy earliest on the route (lowest path index).
    Last,
    /// Enemy at minimum Euclidean distance from the tower.
    Closest,
    /// Enemy with the highest current health.
    Strongest,
}

/// Phases the simulation alternates between while the session is live.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Towers may be purchased and placed; no enemies are active.
    Placement,
    /// Enemies spawn and advance; placement is disabled.
    Defense,
}

/// Terminal-aware session status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameStatus {
    /// The session is live and ticks mutate state.
    Playing,
    /// Every configured wave was survived; the simulation is frozen.
    Victory,
    /// The leak limit was reached; the simulation is frozen.
    GameOver,
}

/// Reasons a tower placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementError {
    /// The simulation is not in the placement phase.
    InvalidPhase,
    /// The requested cell lies beyond the configured grid bounds.
    OutOfBounds,
    /// The requested cell is part of the committed route.
    OnPath,
    /// Another tower already occupies the requested cell.
    Occupied,
    /// The economy balance cannot cover the tower cost.
    InsufficientFunds,
}

/// Reasons a tower removal request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemovalError {
    /// The simulation is not in the placement phase.
    InvalidPhase,
    /// No tower with the provided identifier exists.
    MissingTower,
}

/// Immutable representation of a single enemy's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemySnapshot {
    /// Generation-checked handle of the enemy.
    pub handle: EnemyHandle,
    /// Type of the enemy.
    pub type_id: EnemyTypeId,
    /// Continuous position on the grid.
    pub position: Position,
    /// Current health, floored at zero.
    pub health: Health,
    /// Health assigned at summon time.
    pub max_health: Health,
    /// Route cursor: index of the waypoint the enemy walks toward.
    pub path_index: usize,
    /// Orientation in radians, rotated toward the travel direction.
    pub facing: f32,
}

/// Read-only snapshot describing all alive enemies.
#[derive(Clone, Debug, Default)]
pub struct EnemyView {
    snapshots: Vec<EnemySnapshot>,
}

impl EnemyView {
    /// Creates a new enemy view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<EnemySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.handle);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic handle order.
    pub fn iter(&self) -> impl Iterator<Item = &EnemySnapshot> {
        self.snapshots.iter()
    }

    /// Number of alive enemies captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view captured no enemies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Immutable representation of a single tower's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerSnapshot {
    /// Identifier allocated to the tower by the world.
    pub id: TowerId,
    /// Kind of tower that was constructed.
    pub kind: TowerKind,
    /// Cell occupied by the tower.
    pub at: GridCoord,
    /// Targeting policy the tower applies every frame.
    pub policy: TargetingPolicy,
    /// Time remaining until the tower may fire again; zero means ready.
    pub ready_in: Duration,
}

/// Read-only snapshot describing all towers placed in the world.
#[derive(Clone, Debug, Default)]
pub struct TowerView {
    snapshots: Vec<TowerSnapshot>,
}

impl TowerView {
    /// Creates a new tower view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<TowerSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic id order.
    pub fn iter(&self) -> impl Iterator<Item = &TowerSnapshot> {
        self.snapshots.iter()
    }

    /// Snapshots sorted by tower id, suitable for binary search.
    #[must_use]
    pub fn as_slice(&self) -> &[TowerSnapshot] {
        &self.snapshots
    }

    /// Reports whether the view captured no towers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Target assignment computed by the targeting system for one tower.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TowerTarget {
    /// Tower the assignment belongs to.
    pub tower: TowerId,
    /// Enemy the tower should attack this frame.
    pub enemy: EnemyHandle,
}

#[cfg(test)]
mod tests {
    use super::{
        EnemyTypeDefinition, EnemyTypeId, GridCoord, Path, PathError, PlacementError, Position,
        RemovalError, TargetingPolicy, TowerId, TowerKind,
    };
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = GridCoord::new(1, 1);
        let destination = GridCoord::new(4, 3);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(destination.manhattan_distance(origin), 5);
    }

    #[test]
    fn step_toward_caps_at_target() {
        let origin = Position::new(0.0, 0.0);
        let target = Position::new(1.0, 0.0);
        let stepped = origin.step_toward(target, 0.25);
        assert!((stepped.x() - 0.25).abs() < f32::EPSILON);

        let snapped = origin.step_toward(target, 5.0);
        assert_eq!(snapped, target);
    }

    #[test]
    fn path_rejects_short_sequences() {
        assert_eq!(
            Path::from_cells(vec![GridCoord::new(0, 0)]),
            Err(PathError::TooShort { len: 1 })
        );
        assert_eq!(
            Path::from_cells(Vec::new()),
            Err(PathError::TooShort { len: 0 })
        );
    }

    #[test]
    fn path_rejects_diagonal_steps() {
        let cells = vec![GridCoord::new(0, 0), GridCoord::new(1, 1)];
        assert_eq!(
            Path::from_cells(cells),
            Err(PathError::NotAdjacent { index: 0 })
        );
    }

    #[test]
    fn path_rejects_consecutive_duplicates() {
        let cells = vec![
            GridCoord::new(0, 0),
            GridCoord::new(1, 0),
            GridCoord::new(1, 0),
        ];
        assert_eq!(
            Path::from_cells(cells),
            Err(PathError::RepeatedCell { index: 1 })
        );
    }

    #[test]
    fn path_allows_nonconsecutive_revisits() {
        let cells = vec![
            GridCoord::new(0, 0),
            GridCoord::new(1, 0),
            GridCoord::new(1, 1),
            GridCoord::new(0, 1),
            GridCoord::new(0, 0),
            GridCoord::new(0, 1),
        ];
        let path = Path::from_cells(cells).expect("loop route is valid");
        assert_eq!(path.len(), 6);
        assert_eq!(path.end(), GridCoord::new(0, 1));
    }

    #[test]
    fn fallback_definition_matches_degradation_policy() {
        let definition = EnemyTypeDefinition::fallback(EnemyTypeId::new(9));
        assert_eq!(definition.id, EnemyTypeId::new(9));
        assert!((definition.max_health - 100.0).abs() < f32::EPSILON);
        assert!((definition.speed - 2.0).abs() < f32::EPSILON);
        assert_eq!(definition.reward, 5);
        assert_eq!(definition.score_value, 10);
    }

    #[test]
    fn tower_id_round_trips_through_bincode() {
        assert_round_trip(&TowerId::new(42));
    }

    #[test]
    fn tower_kind_round_trips_through_bincode() {
        assert_round_trip(&TowerKind::Catapult);
    }

    #[test]
    fn targeting_policy_round_trips_through_bincode() {
        assert_round_trip(&TargetingPolicy::Strongest);
    }

    #[test]
    fn placement_error_round_trips_through_bincode() {
        assert_round_trip(&PlacementError::InsufficientFunds);
    }

    #[test]
    fn removal_error_round_trips_through_bincode() {
        assert_round_trip(&RemovalError::MissingTower);
    }

    #[test]
    fn grid_coord_round_trips_through_bincode() {
        assert_round_trip(&GridCoord::new(5, 7));
    }
}
