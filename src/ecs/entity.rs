//! Entity management

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use super::{Entity, Signature, MAX_ENTITIES};
use crate::error::{EcsError, EcsResult};
use crate::logging::Logger;

/// Owns the id pool and one signature slot per possible id.
pub struct EntityManager {
    available: VecDeque<Entity>,
    existing: BTreeSet<Entity>,
    signatures: Box<[Signature]>,
    logger: Arc<dyn Logger>,
}

impl EntityManager {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            available: (0..MAX_ENTITIES).collect(),
            existing: BTreeSet::new(),
            signatures: vec![Signature::EMPTY; MAX_ENTITIES as usize].into_boxed_slice(),
            logger,
        }
    }

    /// Hand out the id that has been free the longest.
    pub fn create_entity(&mut self) -> EcsResult<Entity> {
        let Some(entity) = self.available.pop_front() else {
            self.logger
                .critical("Tried to create new entity, when no more entities are available");
            return Err(EcsError::EntitiesExhausted { max: MAX_ENTITIES });
        };
        self.existing.insert(entity);
        tracing::trace!(entity, living = self.existing.len(), "entity created");
        Ok(entity)
    }

    /// Clear the signature and recycle the id. Components and system
    /// membership are left to the caller. Returns `false` on misuse.
    pub fn destroy_entity(&mut self, entity: Entity) -> bool {
        if entity >= MAX_ENTITIES {
            self.logger
                .error("Tried to delete out-of-range entity - deleting nothing");
            return false;
        }
        if !self.existing.remove(&entity) {
            self.logger
                .error("Tried to delete entity that is not alive - deleting nothing");
            return false;
        }

        self.signatures[entity as usize].reset();
        self.available.push_back(entity);
        tracing::trace!(entity, living = self.existing.len(), "entity destroyed");
        true
    }

    pub fn set_signature(&mut self, entity: Entity, signature: Signature) {
        match self.signatures.get_mut(entity as usize) {
            Some(slot) => *slot = signature,
            None => self
                .logger
                .error("Tried to change signature of out-of-range entity - changing nothing"),
        }
    }

    /// Out-of-range ids log an error and read as the empty signature.
    pub fn signature(&self, entity: Entity) -> Signature {
        match self.signatures.get(entity as usize) {
            Some(signature) => *signature,
            None => {
                self.logger
                    .error("Tried to get signature of out-of-range entity");
                Signature::EMPTY
            }
        }
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.existing.contains(&entity)
    }

    pub fn living_count(&self) -> usize {
        self.existing.len()
    }

    /// Living entities in ascending id order.
    pub fn living(&self) -> impl Iterator<Item = Entity> + '_ {
        self.existing.iter().copied()
    }

    /// Living entities paired with their current signature.
    pub fn living_signatures(&self) -> impl Iterator<Item = (Entity, Signature)> + '_ {
        self.existing
            .iter()
            .map(|&entity| (entity, self.signatures[entity as usize]))
    }
}
