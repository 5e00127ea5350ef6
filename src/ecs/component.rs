//! Dense component storage and the per-type registry

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use super::{ComponentType, Entity, MAX_COMPONENTS, MAX_ENTITIES};
use crate::error::{EcsError, EcsResult};
use crate::logging::Logger;

/// Trait for components
pub trait Component: 'static {}

/// Type-erased view of a [`ComponentArray`], enough for destroy fan-out and
/// a checked downcast back to the concrete array.
pub trait ComponentStore {
    fn entity_destroyed(&mut self, entity: Entity);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Packed storage for one component type.
///
/// Values live in `values[..len]` with no gaps; `entities[i]` owns
/// `values[i]` and `index_of[entities[i]] == i`. Removal swaps the last
/// value into the hole.
pub struct ComponentArray<T: Component> {
    values: Vec<T>,
    entities: Vec<Entity>,
    index_of: HashMap<Entity, usize>,
    logger: Arc<dyn Logger>,
}

impl<T: Component> ComponentArray<T> {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            values: Vec::new(),
            entities: Vec::new(),
            index_of: HashMap::new(),
            logger,
        }
    }

    /// Append `component` for `entity`. Returns `false` (and logs) when the
    /// entity already holds one or is out of range.
    pub fn insert_data(&mut self, entity: Entity, component: T) -> bool {
        if entity >= MAX_ENTITIES {
            self.logger
                .error("Tried adding component to out-of-range entity - adding nothing");
            return false;
        }
        if self.index_of.contains_key(&entity) {
            self.logger
                .error("Tried adding same component to entity multiple times - adding nothing");
            return false;
        }

        self.index_of.insert(entity, self.values.len());
        self.entities.push(entity);
        self.values.push(component);
        true
    }

    /// Swap-remove the entity's value. Returns `false` (and logs) when the
    /// entity holds none.
    pub fn remove_data(&mut self, entity: Entity) -> bool {
        let Some(index) = self.index_of.remove(&entity) else {
            self.logger
                .error("Tried removing non-existent entity - removing nothing");
            return false;
        };

        self.values.swap_remove(index);
        self.entities.swap_remove(index);
        if let Some(&moved) = self.entities.get(index) {
            self.index_of.insert(moved, index);
        }
        true
    }

    pub fn get_data(&mut self, entity: Entity) -> EcsResult<&mut T> {
        match self.index_of.get(&entity) {
            Some(&index) => Ok(&mut self.values[index]),
            None => {
                self.logger
                    .critical("Tried to retrieve data of non-existent entity");
                Err(EcsError::MissingComponent {
                    entity,
                    component: type_name::<T>(),
                })
            }
        }
    }

    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.index_of.get(&entity).map(|&index| &self.values[index])
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.index_of
            .get(&entity)
            .map(|&index| &mut self.values[index])
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.index_of.contains_key(&entity)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.values
    }

    /// Owners of the dense slots, index-aligned with [`as_slice`](Self::as_slice).
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.entities.iter().copied().zip(self.values.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.entities.iter().copied().zip(self.values.iter_mut())
    }
}

impl<T: Component> ComponentStore for ComponentArray<T> {
    fn entity_destroyed(&mut self, entity: Entity) {
        if self.contains(entity) {
            self.remove_data(entity);
        }
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Hands out component ids in registration order and owns one array per type.
pub struct ComponentManager {
    types: HashMap<TypeId, ComponentType>,
    arrays: Vec<Box<dyn ComponentStore>>,
    logger: Arc<dyn Logger>,
}

impl ComponentManager {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            types: HashMap::new(),
            arrays: Vec::new(),
            logger,
        }
    }

    pub fn register_component<T: Component>(&mut self) -> EcsResult<()> {
        if self.types.contains_key(&TypeId::of::<T>()) {
            self.logger.error(
                "Tried to register already registered component type - not registering anything",
            );
            return Ok(());
        }
        if self.arrays.len() >= MAX_COMPONENTS as usize {
            self.logger
                .critical("Tried to register more component types than MAX_COMPONENTS");
            return Err(EcsError::TooManyComponents {
                max: MAX_COMPONENTS,
            });
        }

        let component_type = self.arrays.len() as ComponentType;
        self.types.insert(TypeId::of::<T>(), component_type);
        self.arrays
            .push(Box::new(ComponentArray::<T>::new(self.logger.clone())));
        tracing::debug!(component = type_name::<T>(), component_type, "component registered");
        Ok(())
    }

    pub fn component_type<T: Component>(&self) -> EcsResult<ComponentType> {
        match self.types.get(&TypeId::of::<T>()) {
            Some(&component_type) => Ok(component_type),
            None => {
                self.logger.critical("Tried to access unregistered component!");
                Err(EcsError::UnregisteredComponent {
                    component: type_name::<T>(),
                })
            }
        }
    }

    pub fn is_registered<T: Component>(&self) -> bool {
        self.types.contains_key(&TypeId::of::<T>())
    }

    pub fn registered_count(&self) -> usize {
        self.arrays.len()
    }

    pub fn add_component<T: Component>(&mut self, entity: Entity, component: T) -> EcsResult<bool> {
        Ok(self.component_array_mut::<T>()?.insert_data(entity, component))
    }

    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> EcsResult<bool> {
        Ok(self.component_array_mut::<T>()?.remove_data(entity))
    }

    pub fn get_component<T: Component>(&mut self, entity: Entity) -> EcsResult<&mut T> {
        self.component_array_mut::<T>()?.get_data(entity)
    }

    pub fn has_component<T: Component>(&self, entity: Entity) -> EcsResult<bool> {
        Ok(self.component_array::<T>()?.contains(entity))
    }

    /// Tell every array, whether or not it tracks `entity`.
    pub fn entity_destroyed(&mut self, entity: Entity) {
        for array in &mut self.arrays {
            array.entity_destroyed(entity);
        }
    }

    pub fn component_array<T: Component>(&self) -> EcsResult<&ComponentArray<T>> {
        let component_type = self.component_type::<T>()?;
        self.arrays
            .get(component_type as usize)
            .and_then(|array| array.as_any().downcast_ref::<ComponentArray<T>>())
            .ok_or(EcsError::UnregisteredComponent {
                component: type_name::<T>(),
            })
    }

    pub fn component_array_mut<T: Component>(&mut self) -> EcsResult<&mut ComponentArray<T>> {
        let component_type = self.component_type::<T>()?;
        self.arrays
            .get_mut(component_type as usize)
            .and_then(|array| array.as_any_mut().downcast_mut::<ComponentArray<T>>())
            .ok_or(EcsError::UnregisteredComponent {
                component: type_name::<T>(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{NullLogger, RecordingLogger, Severity};

    #[derive(Debug, Clone, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }
    impl Component for Position {}

    #[derive(Debug, Clone, PartialEq)]
    struct Velocity {
        dx: f32,
        dy: f32,
    }
    impl Component for Velocity {}

    fn assert_dense<T: Component>(array: &ComponentArray<T>) {
        assert_eq!(array.entities().len(), array.len());
        assert_eq!(array.index_of.len(), array.len());
        for (index, entity) in array.entities().iter().enumerate() {
            assert_eq!(array.index_of[entity], index);
        }
    }

    #[test]
    fn test_component_storage() {
        let mut storage = ComponentArray::<Position>::new(Arc::new(NullLogger));

        assert!(storage.insert_data(1, Position { x: 1.0, y: 2.0 }));
        assert!(storage.insert_data(2, Position { x: 3.0, y: 4.0 }));

        assert_eq!(storage.len(), 2);
        assert!(storage.contains(1));
        assert!(storage.contains(2));
        assert!(!storage.contains(3));

        let pos = storage.get_data(1).unwrap();
        assert_eq!(pos.x, 1.0);
        assert_eq!(pos.y, 2.0);

        assert!(storage.remove_data(1));
        assert!(!storage.contains(1));
        assert_eq!(storage.len(), 1);
        assert_eq!(storage.get(2), Some(&Position { x: 3.0, y: 4.0 }));
        assert_dense(&storage);
    }

    #[test]
    fn test_swap_remove_keeps_storage_packed() {
        let mut storage = ComponentArray::<Velocity>::new(Arc::new(NullLogger));
        for entity in 0..5 {
            storage.insert_data(entity, Velocity { dx: entity as f32, dy: 0.0 });
        }

        storage.remove_data(1);
        assert_eq!(storage.entities(), &[0, 4, 2, 3]);
        assert_eq!(storage.get(4).unwrap().dx, 4.0);
        assert_dense(&storage);

        storage.remove_data(3);
        storage.remove_data(0);
        assert_eq!(storage.len(), 2);
        assert_dense(&storage);

        let xs: Vec<f32> = storage.as_slice().iter().map(|v| v.dx).collect();
        assert_eq!(xs, vec![2.0, 4.0]);
    }

    #[test]
    fn test_duplicate_and_missing_are_rejected() {
        let logger = Arc::new(RecordingLogger::new());
        let mut storage = ComponentArray::<Position>::new(logger.clone());

        assert!(storage.insert_data(7, Position { x: 1.0, y: 1.0 }));
        assert!(!storage.insert_data(7, Position { x: 9.0, y: 9.0 }));
        assert_eq!(storage.get(7), Some(&Position { x: 1.0, y: 1.0 }));
        assert!(!storage.remove_data(8));
        assert!(!storage.insert_data(MAX_ENTITIES, Position { x: 0.0, y: 0.0 }));
        assert_eq!(logger.count(Severity::Error), 3);
        assert_eq!(storage.len(), 1);

        let err = storage.get_data(8).unwrap_err();
        assert!(matches!(err, EcsError::MissingComponent { entity: 8, .. }));
        assert_eq!(logger.count(Severity::Critical), 1);
    }

    #[test]
    fn test_entity_destroyed_is_silent() {
        let logger = Arc::new(RecordingLogger::new());
        let mut storage = ComponentArray::<Position>::new(logger.clone());
        storage.insert_data(3, Position { x: 0.0, y: 0.0 });

        storage.entity_destroyed(4);
        storage.entity_destroyed(3);
        assert!(storage.is_empty());
        assert!(logger.entries().is_empty());
    }

    #[test]
    fn test_registration_assigns_ids_in_order() {
        let logger = Arc::new(RecordingLogger::new());
        let mut components = ComponentManager::new(logger.clone());

        components.register_component::<Position>().unwrap();
        components.register_component::<Velocity>().unwrap();
        components.register_component::<Position>().unwrap();

        assert_eq!(components.component_type::<Position>().unwrap(), 0);
        assert_eq!(components.component_type::<Velocity>().unwrap(), 1);
        assert_eq!(components.registered_count(), 2);
        assert_eq!(logger.count(Severity::Error), 1);
    }

    /// One distinct component type per three-digit number.
    struct Marker<const H: usize, const T: usize, const O: usize>;
    impl<const H: usize, const T: usize, const O: usize> Component for Marker<H, T, O> {}

    macro_rules! for_each_digit {
        ($f:ident $(::<$($fixed:ident),+>)? ($components:expr)) => {
            $f::<$($($fixed,)+)? 0>($components);
            $f::<$($($fixed,)+)? 1>($components);
            $f::<$($($fixed,)+)? 2>($components);
            $f::<$($($fixed,)+)? 3>($components);
            $f::<$($($fixed,)+)? 4>($components);
            $f::<$($($fixed,)+)? 5>($components);
            $f::<$($($fixed,)+)? 6>($components);
            $f::<$($($fixed,)+)? 7>($components);
            $f::<$($($fixed,)+)? 8>($components);
            $f::<$($($fixed,)+)? 9>($components);
        };
    }

    fn register_one<const H: usize, const T: usize, const O: usize>(
        components: &mut ComponentManager,
    ) {
        components.register_component::<Marker<H, T, O>>().unwrap();
    }

    fn register_ten<const H: usize, const T: usize>(components: &mut ComponentManager) {
        for_each_digit!(register_one::<H, T>(components));
    }

    fn register_hundred<const H: usize>(components: &mut ComponentManager) {
        for_each_digit!(register_ten::<H>(components));
    }

    #[test]
    fn test_component_limit_is_fatal() {
        let logger = Arc::new(RecordingLogger::new());
        let mut components = ComponentManager::new(logger.clone());
        for_each_digit!(register_hundred(&mut components));
        assert_eq!(components.registered_count(), MAX_COMPONENTS as usize);
        assert!(logger.entries().is_empty());

        let err = components.register_component::<Position>().unwrap_err();
        assert_eq!(err, EcsError::TooManyComponents { max: MAX_COMPONENTS });
        assert_eq!(logger.count(Severity::Critical), 1);
        assert!(!components.is_registered::<Position>());
        assert_eq!(components.registered_count(), MAX_COMPONENTS as usize);
    }

    #[test]
    fn test_unregistered_type_is_an_error() {
        let mut components = ComponentManager::new(Arc::new(NullLogger));
        let err = components
            .add_component(0, Position { x: 0.0, y: 0.0 })
            .unwrap_err();
        assert!(matches!(err, EcsError::UnregisteredComponent { .. }));
        assert!(components.component_type::<Velocity>().is_err());
    }

    #[test]
    fn test_destroy_fans_out_to_every_array() {
        let mut components = ComponentManager::new(Arc::new(NullLogger));
        components.register_component::<Position>().unwrap();
        components.register_component::<Velocity>().unwrap();

        components.add_component(1, Position { x: 1.0, y: 1.0 }).unwrap();
        components.add_component(1, Velocity { dx: 1.0, dy: 1.0 }).unwrap();
        components.add_component(2, Position { x: 2.0, y: 2.0 }).unwrap();

        components.entity_destroyed(1);
        assert!(!components.has_component::<Position>(1).unwrap());
        assert!(!components.has_component::<Velocity>(1).unwrap());
        assert!(components.has_component::<Position>(2).unwrap());

        components.get_component::<Position>(2).unwrap().x = 5.0;
        let array = components.component_array::<Position>().unwrap();
        assert_eq!(array.get(2).unwrap().x, 5.0);
    }
}
