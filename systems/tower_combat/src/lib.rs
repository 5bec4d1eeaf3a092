#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that turns target assignments into weapon discharges.
//!
//! A tower fires the frame its cooldown snapshot reads zero and a target was
//! assigned. Cooldown bookkeeping itself lives in the world; this system
//! only decides which discharges to request.

use bulwark_core::{Command, Phase, TowerId, TowerSnapshot, TowerTarget, TowerView};

/// Tower combat system that queues firing commands for ready towers.
#[derive(Debug, Default)]
pub struct TowerCombat {
    scratch: Vec<Command>,
}

impl TowerCombat {
    /// Creates a new tower combat system with an empty scratch buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits `Command::FireWeapon` entries for ready towers with targets.
    pub fn handle(
        &mut self,
        phase: Phase,
        towers: &TowerView,
        targets: &[TowerTarget],
        out: &mut Vec<Command>,
    ) {
        if phase != Phase::Defense {
            return;
        }
        if targets.is_empty() || towers.is_empty() {
            return;
        }

        self.scratch.clear();
        for assignment in targets {
            if let Some(snapshot) = find_tower(towers.as_slice(), assignment.tower) {
                if snapshot.ready_in.is_zero() {
                    self.scratch.push(Command::FireWeapon {
                        tower: assignment.tower,
                        target: assignment.enemy,
                    });
                }
            }
        }

        if self.scratch.is_empty() {
            return;
        }
        out.reserve(self.scratch.len());
        out.append(&mut self.scratch);
    }
}

fn find_tower(towers: &[TowerSnapshot], tower: TowerId) -> Option<&TowerSnapshot> {
    towers
        .binary_search_by_key(&tower, |snapshot| snapshot.id)
        .ok()
        .map(|index| &towers[index])
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulwark_core::{EnemyHandle, GridCoord, TargetingPolicy, TowerKind};
    use std::time::Duration;

    fn snapshot(id: u32, ready_in: Duration) -> TowerSnapshot {
        TowerSnapshot {
            id: TowerId::new(id),
            kind: TowerKind::Marksman,
            at: GridCoord::new(0, 0),
            policy: TargetingPolicy::First,
            ready_in,
        }
    }

    fn assignment(tower: u32, enemy: u32) -> TowerTarget {
        TowerTarget {
            tower: TowerId::new(tower),
            enemy: EnemyHandle::new(enemy, 0),
        }
    }

    #[test]
    fn placement_phase_is_silent() {
        let mut combat = TowerCombat::new();
        let towers = TowerView::from_snapshots(vec![snapshot(1, Duration::ZERO)]);
        let mut out = Vec::new();
        combat.handle(Phase::Placement, &towers, &[assignment(1, 7)], &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn ready_towers_fire_at_their_assignment() {
        let mut combat = TowerCombat::new();
        let towers = TowerView::from_snapshots(vec![
            snapshot(3, Duration::ZERO),
            snapshot(1, Duration::ZERO),
        ]);
        let mut out = Vec::new();
        combat.handle(
            Phase::Defense,
            &towers,
            &[assignment(1, 7), assignment(3, 9)],
            &mut out,
        );
        assert_eq!(
            out,
            vec![
                Command::FireWeapon {
                    tower: TowerId::new(1),
                    target: EnemyHandle::new(7, 0),
                },
                Command::FireWeapon {
                    tower: TowerId::new(3),
                    target: EnemyHandle::new(9, 0),
                },
            ]
        );
    }

    #[test]
    fn cooling_towers_hold_their_fire() {
        let mut combat = TowerCombat::new();
        let towers = TowerView::from_snapshots(vec![
            snapshot(1, Duration::from_millis(120)),
            snapshot(2, Duration::ZERO),
        ]);
        let mut out = Vec::new();
        combat.handle(
            Phase::Defense,
            &towers,
            &[assignment(1, 7), assignment(2, 8)],
            &mut out,
        );
        assert_eq!(
            out,
            vec![Command::FireWeapon {
                tower: TowerId::new(2),
                target: EnemyHandle::new(8, 0),
            }]
        );
    }

    #[test]
    fn assignments_for_unknown_towers_are_dropped() {
        let mut combat = TowerCombat::new();
        let towers = TowerView::from_snapshots(vec![snapshot(1, Duration::ZERO)]);
        let mut out = Vec::new();
        combat.handle(Phase::Defense, &towers, &[assignment(9, 7)], &mut out);
        assert!(out.is_empty());
    }
}
