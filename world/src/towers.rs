//! Tower placement records and weapon cooldowns.

use std::collections::BTreeMap;
use std::time::Duration;

use bulwark_core::{GridCoord, TargetingPolicy, TowerId, TowerKind};

/// One placed tower. The cooldown counts down toward zero while time
/// advances and is rearmed when the weapon discharges.
#[derive(Debug, Clone)]
pub(crate) struct TowerState {
    pub(crate) id: TowerId,
    pub(crate) kind: TowerKind,
    pub(crate) at: GridCoord,
    pub(crate) policy: TargetingPolicy,
    pub(crate) cooldown: Duration,
}

impl TowerState {
    /// Duration of one full firing cycle for this tower's kind.
    pub(crate) fn firing_cycle(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.kind.fire_rate())
    }
}

#[derive(Debug, Default)]
pub(crate) struct TowerRegistry {
    entries: BTreeMap<TowerId, TowerState>,
    next_id: u32,
}

impl TowerRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Inserts a tower that is ready to fire immediately.
    pub(crate) fn place(
        &mut self,
        kind: TowerKind,
        at: GridCoord,
        policy: TargetingPolicy,
    ) -> TowerId {
        let id = TowerId::new(self.next_id);
        self.next_id += 1;
        let _ = self.entries.insert(
            id,
            TowerState {
                id,
                kind,
                at,
                policy,
                cooldown: Duration::ZERO,
            },
        );
        id
    }

    pub(crate) fn remove(&mut self, id: TowerId) -> Option<TowerState> {
        self.entries.remove(&id)
    }

    pub(crate) fn get(&self, id: TowerId) -> Option<&TowerState> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: TowerId) -> Option<&mut TowerState> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &TowerState> {
        self.entries.values()
    }

    pub(crate) fn occupied(&self, at: GridCoord) -> bool {
        self.entries.values().any(|tower| tower.at == at)
    }

    /// Ticks every weapon cooldown down by `dt`.
    pub(crate) fn advance_cooldowns(&mut self, dt: Duration) {
        for tower in self.entries.values_mut() {
            tower.cooldown = tower.cooldown.saturating_sub(dt);
        }
    }
}
