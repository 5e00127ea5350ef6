//! Systems and signature-driven membership

use std::any::{type_name, Any, TypeId};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use super::{Entity, Signature};
use crate::error::{EcsError, EcsResult};
use crate::logging::Logger;

/// A processing unit interested in entities whose signature is a superset of
/// its required signature. Both hooks default to no-ops.
pub trait System: 'static {
    /// The entity just started matching this system.
    fn entity_registered(&mut self, _entity: Entity) {}

    /// The entity stopped matching this system. Not called on destruction.
    fn entity_erased(&mut self, _entity: Entity) {}
}

trait AnySystem: System {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: System> AnySystem for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct SystemSlot {
    name: &'static str,
    system: Box<dyn AnySystem>,
    signature: Signature,
    entities: BTreeSet<Entity>,
}

impl SystemSlot {
    fn evaluate(&mut self, entity: Entity, signature: &Signature) {
        if signature.contains_all(&self.signature) {
            if self.entities.insert(entity) {
                self.system.entity_registered(entity);
            }
        } else if self.entities.remove(&entity) {
            self.system.entity_erased(entity);
        }
    }
}

/// Owns one instance per system type, kept in registration order.
pub struct SystemManager {
    slots: Vec<SystemSlot>,
    index: HashMap<TypeId, usize>,
    logger: Arc<dyn Logger>,
}

impl SystemManager {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
            logger,
        }
    }

    pub fn register_system<T: System>(&mut self, system: T) -> EcsResult<&mut T> {
        if self.index.contains_key(&TypeId::of::<T>()) {
            self.logger.critical("Tried registering a system multiple times!");
            return Err(EcsError::DuplicateSystem {
                system: type_name::<T>(),
            });
        }

        self.index.insert(TypeId::of::<T>(), self.slots.len());
        self.slots.push(SystemSlot {
            name: type_name::<T>(),
            system: Box::new(system),
            signature: Signature::EMPTY,
            entities: BTreeSet::new(),
        });
        tracing::debug!(system = type_name::<T>(), "system registered");
        self.system_mut::<T>()
    }

    /// Record `T`'s required signature and re-check every living entity
    /// against it, so membership is correct even for late configuration.
    pub fn set_signature<T: System>(
        &mut self,
        signature: Signature,
        living: impl IntoIterator<Item = (Entity, Signature)>,
    ) {
        let Some(&slot) = self.index.get(&TypeId::of::<T>()) else {
            self.logger
                .error("Tried setting Signature for unregistered System - setting nothing");
            return;
        };

        let slot = &mut self.slots[slot];
        slot.signature = signature;
        for (entity, entity_signature) in living {
            slot.evaluate(entity, &entity_signature);
        }
        tracing::debug!(
            system = slot.name,
            members = slot.entities.len(),
            "system signature set"
        );
    }

    /// Re-evaluate membership of `entity` in every system.
    pub fn entity_signature_changed(&mut self, entity: Entity, signature: Signature) {
        for slot in &mut self.slots {
            slot.evaluate(entity, &signature);
        }
    }

    /// Drop `entity` from every membership set without firing `entity_erased`.
    pub fn entity_destroyed(&mut self, entity: Entity) {
        for slot in &mut self.slots {
            slot.entities.remove(&entity);
        }
    }

    pub fn is_registered<T: System>(&self) -> bool {
        self.index.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn system<T: System>(&self) -> EcsResult<&T> {
        self.slot::<T>()?
            .system
            .as_any()
            .downcast_ref::<T>()
            .ok_or(EcsError::UnregisteredSystem {
                system: type_name::<T>(),
            })
    }

    pub fn system_mut<T: System>(&mut self) -> EcsResult<&mut T> {
        let slot = self.slot_index::<T>()?;
        self.slots[slot]
            .system
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or(EcsError::UnregisteredSystem {
                system: type_name::<T>(),
            })
    }

    pub fn entities<T: System>(&self) -> EcsResult<&BTreeSet<Entity>> {
        Ok(&self.slot::<T>()?.entities)
    }

    pub fn signature<T: System>(&self) -> EcsResult<Signature> {
        Ok(self.slot::<T>()?.signature)
    }

    fn slot<T: System>(&self) -> EcsResult<&SystemSlot> {
        let slot = self.slot_index::<T>()?;
        Ok(&self.slots[slot])
    }

    fn slot_index<T: System>(&self) -> EcsResult<usize> {
        match self.index.get(&TypeId::of::<T>()) {
            Some(&slot) => Ok(slot),
            None => {
                self.logger.critical("Tried to use unregistered system!");
                Err(EcsError::UnregisteredSystem {
                    system: type_name::<T>(),
                })
            }
        }
    }
}
