//! Coordinator - the single entry point tying the managers together
//!
//! Every mutating call finishes all of its cross-cutting work (signature
//! recomputation, system membership) before it returns.

use std::any::type_name;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;
use std::sync::Arc;

use super::component::{Component, ComponentArray, ComponentManager};
use super::entity::EntityManager;
use super::resource::{ResourceManager, ResourceSet, Shared};
use super::system::{System, SystemManager};
use super::{ComponentType, Entity, Signature, MAX_ENTITIES};
use crate::error::{EcsError, EcsResult};
use crate::logging::{Logger, NullLogger};

pub struct Coordinator {
    entities: EntityManager,
    components: ComponentManager,
    systems: SystemManager,
    resources: ResourceManager,
    logger: Arc<dyn Logger>,
}

impl Coordinator {
    /// A coordinator whose misuse reports go nowhere.
    pub fn new() -> Self {
        Self::with_logger(Arc::new(NullLogger))
    }

    pub fn with_logger(logger: Arc<dyn Logger>) -> Self {
        Self {
            entities: EntityManager::new(logger.clone()),
            components: ComponentManager::new(logger.clone()),
            systems: SystemManager::new(logger.clone()),
            resources: ResourceManager::new(logger.clone()),
            logger,
        }
    }

    /// Drop every entity, component, system and resource mapping and start
    /// over with fresh managers. The logger is kept.
    pub fn init(&mut self) {
        *self = Self::with_logger(self.logger.clone());
    }

    pub fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }

    // Entities

    /// A fresh entity joins every system whose signature is empty.
    pub fn create_entity(&mut self) -> EcsResult<Entity> {
        let entity = self.entities.create_entity()?;
        self.systems.entity_signature_changed(entity, Signature::EMPTY);
        Ok(entity)
    }

    /// Destroy an entity, its components and its system memberships
    pub fn destroy_entity(&mut self, entity: Entity) {
        if self.entities.destroy_entity(entity) {
            self.components.entity_destroyed(entity);
            self.systems.entity_destroyed(entity);
        }
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    pub fn living_entity_count(&self) -> usize {
        self.entities.living_count()
    }

    pub fn living_entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.living()
    }

    pub fn signature(&self, entity: Entity) -> Signature {
        self.entities.signature(entity)
    }

    // Components

    pub fn register_component<T: Component>(&mut self) -> EcsResult<()> {
        self.components.register_component::<T>()
    }

    pub fn get_component_type<T: Component>(&self) -> EcsResult<ComponentType> {
        self.components.component_type::<T>()
    }

    pub fn add_component<T: Component>(&mut self, entity: Entity, component: T) -> EcsResult<()> {
        let component_type = self.components.component_type::<T>()?;
        if !self.accepts(entity, "Tried adding component to") {
            return Ok(());
        }
        if self.components.add_component(entity, component)? {
            self.update_signature(entity, component_type, true);
        }
        Ok(())
    }

    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> EcsResult<()> {
        let component_type = self.components.component_type::<T>()?;
        if !self.accepts(entity, "Tried removing component from") {
            return Ok(());
        }
        if self.components.remove_component::<T>(entity)? {
            self.update_signature(entity, component_type, false);
        }
        Ok(())
    }

    /// Mutable access; the entity must hold a `T`.
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> EcsResult<&mut T> {
        self.components.get_component::<T>(entity)
    }

    pub fn get_component<T: Component>(&self, entity: Entity) -> EcsResult<&T> {
        self.components
            .component_array::<T>()?
            .get(entity)
            .ok_or_else(|| {
                self.logger
                    .critical("Tried to retrieve data of non-existent entity");
                EcsError::MissingComponent {
                    entity,
                    component: type_name::<T>(),
                }
            })
    }

    pub fn has_component<T: Component>(&self, entity: Entity) -> EcsResult<bool> {
        self.components.has_component::<T>(entity)
    }

    /// Dense storage for `T`, for tight iteration.
    pub fn component_array<T: Component>(&self) -> EcsResult<&ComponentArray<T>> {
        self.components.component_array::<T>()
    }

    pub fn component_array_mut<T: Component>(&mut self) -> EcsResult<&mut ComponentArray<T>> {
        self.components.component_array_mut::<T>()
    }

    // Systems

    /// Register `system` with an empty signature, so it starts out holding
    /// every living entity.
    pub fn register_system<T: System>(&mut self, system: T) -> EcsResult<&mut T> {
        self.systems.register_system(system)?;
        self.systems
            .set_signature::<T>(Signature::EMPTY, self.entities.living_signatures());
        self.systems.system_mut::<T>()
    }

    pub fn set_system_signature<T: System>(&mut self, signature: Signature) {
        self.systems
            .set_signature::<T>(signature, self.entities.living_signatures());
    }

    pub fn system<T: System>(&self) -> EcsResult<&T> {
        self.systems.system::<T>()
    }

    pub fn system_mut<T: System>(&mut self) -> EcsResult<&mut T> {
        self.systems.system_mut::<T>()
    }

    /// Current members of `T`, in ascending id order.
    pub fn system_entities<T: System>(&self) -> EcsResult<&BTreeSet<Entity>> {
        self.systems.entities::<T>()
    }

    pub fn system_signature<T: System>(&self) -> EcsResult<Signature> {
        self.systems.signature::<T>()
    }

    // Resources

    pub fn register_resource_type<T: 'static>(&mut self) {
        self.resources.register_resource_type::<T>();
    }

    /// `Ok(None)` when nothing is stored under `key`.
    pub fn get_resource<T: 'static>(&self, key: &str) -> EcsResult<Option<Shared<T>>> {
        self.resources.get_resource::<T>(key)
    }

    pub fn set_resource<T: 'static>(
        &mut self,
        key: impl Into<String>,
        value: Shared<T>,
    ) -> EcsResult<()> {
        self.resources.set_resource(key, value)
    }

    /// Store `value` under `key` and hand back the caller's handle.
    pub fn insert_resource<T: 'static>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) -> EcsResult<Shared<T>> {
        let shared: Shared<T> = Rc::new(RefCell::new(value));
        self.resources.set_resource(key, shared.clone())?;
        Ok(shared)
    }

    /// Unregister `key`; values still held by callers are untouched.
    pub fn delete_resource<T: 'static>(&mut self, key: &str) -> EcsResult<()> {
        self.resources.delete_resource::<T>(key)?;
        Ok(())
    }

    pub fn contains_resource<T: 'static>(&self, key: &str) -> EcsResult<bool> {
        Ok(self.resources.resource_array::<T>()?.contains(key))
    }

    pub fn resource_keys<T: 'static>(&self) -> EcsResult<Vec<String>> {
        let mut keys: Vec<String> = self
            .resources
            .resource_array::<T>()?
            .keys()
            .map(str::to_string)
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// Unregister every key of every type in the tuple `S`.
    pub fn delete_all_resources<S: ResourceSet>(&mut self) -> EcsResult<()> {
        self.resources.delete_all::<S>()
    }

    fn accepts(&self, entity: Entity, action: &str) -> bool {
        if entity >= MAX_ENTITIES {
            self.logger
                .error(&format!("{action} out-of-range entity - changing nothing"));
            return false;
        }
        if !self.entities.is_alive(entity) {
            self.logger
                .error(&format!("{action} entity that is not alive - changing nothing"));
            return false;
        }
        true
    }

    fn update_signature(&mut self, entity: Entity, component_type: ComponentType, present: bool) {
        let mut signature = self.entities.signature(entity);
        signature.set(component_type, present);
        self.entities.set_signature(entity, signature);
        self.systems.entity_signature_changed(entity, signature);
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}
