//! Pooled enemy storage with generation-checked handles.
//!
//! Slots live in one dense vector and are never dropped once allocated.
//! Recycling pushes a slot's index onto a per-type FIFO queue and bumps the
//! slot generation, which invalidates every handle issued for the previous
//! occupant. Stale handles degrade to warnings, never to wrong reads.

use std::collections::{BTreeMap, VecDeque};

use bulwark_core::{EnemyHandle, EnemyTypeDefinition, EnemyTypeId, Position};
use thiserror::Error;
use tracing::warn;

/// Failure to summon an enemy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SummonError {
    /// No pool was registered for the requested type id.
    #[error("no enemy pool registered for type id {0:?}")]
    UnknownType(EnemyTypeId),
}

/// One dense slot. `active` means the slot currently participates in the
/// session; a dead-but-not-yet-recycled slot is inactive while its index
/// waits in the despawn queue.
#[derive(Debug, Clone)]
pub(crate) struct EnemySlot {
    pub(crate) generation: u32,
    pub(crate) type_id: EnemyTypeId,
    pub(crate) health: f32,
    pub(crate) max_health: f32,
    pub(crate) position: Position,
    pub(crate) path_index: usize,
    pub(crate) facing: f32,
    active: bool,
}

#[derive(Debug)]
pub(crate) struct EnemyRegistry {
    definitions: BTreeMap<EnemyTypeId, EnemyTypeDefinition>,
    slots: Vec<EnemySlot>,
    pools: BTreeMap<EnemyTypeId, VecDeque<u32>>,
    alive: Vec<EnemyHandle>,
    initialized: bool,
}

impl EnemyRegistry {
    pub(crate) fn new() -> Self {
        Self {
            definitions: BTreeMap::new(),
            slots: Vec::new(),
            pools: BTreeMap::new(),
            alive: Vec::new(),
            initialized: false,
        }
    }

    /// Registers the enemy catalog and creates one empty pool per type.
    /// Calling this a second time is a warned no-op.
    pub(crate) fn init(&mut self, definitions: &[EnemyTypeDefinition]) {
        if self.initialized {
            warn!("enemy registry already initialized, ignoring repeat init");
            return;
        }
        for definition in definitions {
            let _ = self.definitions.insert(definition.id, *definition);
            let _ = self.pools.insert(definition.id, VecDeque::new());
        }
        self.initialized = true;
    }

    pub(crate) fn definition(&self, type_id: EnemyTypeId) -> Option<&EnemyTypeDefinition> {
        self.definitions.get(&type_id)
    }

    /// Looks up a definition, falling back to conservative defaults when the
    /// catalog has no entry. The miss is warned so missing data is visible.
    pub(crate) fn definition_or_fallback(&self, type_id: EnemyTypeId) -> EnemyTypeDefinition {
        match self.definition(type_id) {
            Some(definition) => *definition,
            None => {
                warn!(?type_id, "no definition for enemy type, using fallback stats");
                EnemyTypeDefinition::fallback(type_id)
            }
        }
    }

    pub(crate) fn catalog(&self) -> impl Iterator<Item = &EnemyTypeDefinition> {
        self.definitions.values()
    }

    /// Activates an enemy of the given type at `spawn_at`, reusing a pooled
    /// slot when one is free and growing the slot vector otherwise.
    pub(crate) fn summon(
        &mut self,
        type_id: EnemyTypeId,
        spawn_at: Position,
    ) -> Result<EnemyHandle, SummonError> {
        let pool = self
            .pools
            .get_mut(&type_id)
            .ok_or(SummonError::UnknownType(type_id))?;
        let definition = self
            .definitions
            .get(&type_id)
            .copied()
            .unwrap_or_else(|| EnemyTypeDefinition::fallback(type_id));
        let index = match pool.pop_front() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.type_id = type_id;
                slot.health = definition.max_health;
                slot.max_health = definition.max_health;
                slot.position = spawn_at;
                slot.path_index = 1;
                slot.facing = 0.0;
                slot.active = true;
                index
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(EnemySlot {
                    generation: 0,
                    type_id,
                    health: definition.max_health,
                    max_health: definition.max_health,
                    position: spawn_at,
                    path_index: 1,
                    facing: 0.0,
                    active: true,
                });
                index
            }
        };
        let handle = EnemyHandle::new(index, self.slots[index as usize].generation);
        self.alive.push(handle);
        Ok(handle)
    }

    pub(crate) fn get(&self, handle: EnemyHandle) -> Option<&EnemySlot> {
        self.slots
            .get(handle.index() as usize)
            .filter(|slot| slot.active && slot.generation == handle.generation())
    }

    pub(crate) fn get_mut(&mut self, handle: EnemyHandle) -> Option<&mut EnemySlot> {
        self.slots
            .get_mut(handle.index() as usize)
            .filter(|slot| slot.active && slot.generation == handle.generation())
    }

    /// Withdraws the enemy from the live set without recycling its slot.
    /// The handle stays valid for the recycle step that follows.
    pub(crate) fn mark_dead(&mut self, handle: EnemyHandle) -> bool {
        match self.slots.get_mut(handle.index() as usize) {
            Some(slot) if slot.active && slot.generation == handle.generation() => {
                slot.active = false;
                self.alive.retain(|alive| *alive != handle);
                true
            }
            _ => {
                warn!(?handle, "mark_dead on stale enemy handle ignored");
                false
            }
        }
    }

    /// Returns the slot to its type pool and bumps the generation so every
    /// outstanding handle for this occupant goes stale.
    pub(crate) fn recycle(&mut self, handle: EnemyHandle) {
        let Some(slot) = self.slots.get_mut(handle.index() as usize) else {
            warn!(?handle, "recycle on out-of-range enemy handle ignored");
            return;
        };
        if slot.generation != handle.generation() {
            warn!(?handle, "recycle on stale enemy handle ignored");
            return;
        }
        slot.active = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.alive.retain(|alive| *alive != handle);
        match self.pools.get_mut(&slot.type_id) {
            Some(pool) => pool.push_back(handle.index()),
            // The slot is still deactivated so the enemy does disappear.
            None => warn!(?handle, "no pool for recycled enemy type, slot leaked"),
        }
    }

    pub(crate) fn alive(&self) -> &[EnemyHandle] {
        &self.alive
    }

    pub(crate) fn alive_count(&self) -> usize {
        self.alive.len()
    }
}
