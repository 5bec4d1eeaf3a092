#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that resolves a victim for every tower from world snapshots.
//!
//! Each tower linearly scans the alive enemies within its Euclidean range
//! and keeps the best candidate under its targeting policy. Comparisons are
//! strict, so among tied candidates the first one encountered in the
//! deterministic view order wins.

use bulwark_core::{
    EnemyHandle, EnemySnapshot, EnemyView, Phase, Position, TargetingPolicy, TowerTarget,
    TowerView,
};

/// Tower targeting system reusing one candidate buffer across frames.
#[derive(Debug, Default)]
pub struct TowerTargeting {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    enemy: EnemyHandle,
    position: Position,
    health: f32,
    path_index: usize,
}

impl TowerTargeting {
    /// Creates a new targeting system with an empty scratch buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes target assignments for the provided snapshots.
    ///
    /// The output buffer is cleared before populating it. During the
    /// placement phase no assignments are produced.
    pub fn handle(
        &mut self,
        phase: Phase,
        towers: &TowerView,
        enemies: &EnemyView,
        out: &mut Vec<TowerTarget>,
    ) {
        out.clear();
        if phase != Phase::Defense {
            return;
        }
        if towers.is_empty() || enemies.is_empty() {
            return;
        }

        self.candidates.clear();
        self.candidates.reserve(enemies.len());
        self.candidates.extend(enemies.iter().map(Candidate::from_snapshot));

        for tower in towers.iter() {
            let muzzle = tower.at.position();
            let range = tower.kind.range();
            let mut best: Option<&Candidate> = None;
            for candidate in &self.candidates {
                if candidate.position.distance_to(muzzle) > range {
                    continue;
                }
                best = Some(match best {
                    None => candidate,
                    Some(current) if prefer(tower.policy, candidate, current, muzzle) => candidate,
                    Some(current) => current,
                });
            }
            if let Some(best) = best {
                out.push(TowerTarget {
                    tower: tower.id,
                    enemy: best.enemy,
                });
            }
        }
    }
}

impl Candidate {
    fn from_snapshot(snapshot: &EnemySnapshot) -> Self {
        Self {
            enemy: snapshot.handle,
            position: snapshot.position,
            health: snapshot.health.value(),
            path_index: snapshot.path_index,
        }
    }
}

/// Whether `challenger` strictly beats `incumbent` under the policy. Ties
/// keep the incumbent, so the first-seen candidate wins them.
fn prefer(
    policy: TargetingPolicy,
    challenger: &Candidate,
    incumbent: &Candidate,
    muzzle: Position,
) -> bool {
    match policy {
        TargetingPolicy::First => challenger.path_index > incumbent.path_index,
        TargetingPolicy::Last => challenger.path_index < incumbent.path_index,
        TargetingPolicy::Closest => {
            challenger.position.distance_to(muzzle) < incumbent.position.distance_to(muzzle)
        }
        TargetingPolicy::Strongest => challenger.health > incumbent.health,
    }
}
