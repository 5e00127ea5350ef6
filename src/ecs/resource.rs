//! Type-partitioned, string-keyed global resources.
//!
//! Resources are unrelated to entities: each registered type gets its own
//! namespace of named singletons. The store never owns a resource outright.
//! It keeps a clone of the caller's [`Shared`] handle, so deleting a key
//! unregisters the mapping and the value lives on in any handle the caller
//! still holds.

use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use crate::error::{EcsError, EcsResult};
use crate::logging::Logger;

/// Handle shared between the store and its callers.
pub type Shared<T> = Rc<RefCell<T>>;

trait ResourceStore {
    fn len(&self) -> usize;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Named slots for one resource type.
pub struct ResourceArray<T: 'static> {
    data: HashMap<String, Shared<T>>,
}

impl<T: 'static> ResourceArray<T> {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    /// `None` when nothing is stored under `key`.
    pub fn get_resource(&self, key: &str) -> Option<Shared<T>> {
        self.data.get(key).cloned()
    }

    pub fn set_resource(&mut self, key: impl Into<String>, value: Shared<T>) {
        self.data.insert(key.into(), value);
    }

    /// Forget `key`. The store's handle is dropped, not the value.
    pub fn delete_resource(&mut self, key: &str) -> Option<Shared<T>> {
        self.data.remove(key)
    }

    /// Forget every key of this type.
    pub fn delete_all(&mut self) {
        self.data.clear();
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<T: 'static> Default for ResourceArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> ResourceStore for ResourceArray<T> {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub struct ResourceManager {
    arrays: HashMap<TypeId, Box<dyn ResourceStore>>,
    logger: Arc<dyn Logger>,
}

impl ResourceManager {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            arrays: HashMap::new(),
            logger,
        }
    }

    pub fn register_resource_type<T: 'static>(&mut self) {
        if self.arrays.contains_key(&TypeId::of::<T>()) {
            self.logger
                .error("Tried to register resource multiple times - registering nothing");
            return;
        }
        self.arrays
            .insert(TypeId::of::<T>(), Box::new(ResourceArray::<T>::new()));
        tracing::debug!(resource = type_name::<T>(), "resource type registered");
    }

    pub fn is_registered<T: 'static>(&self) -> bool {
        self.arrays.contains_key(&TypeId::of::<T>())
    }

    pub fn get_resource<T: 'static>(&self, key: &str) -> EcsResult<Option<Shared<T>>> {
        Ok(self.resource_array::<T>()?.get_resource(key))
    }

    pub fn set_resource<T: 'static>(
        &mut self,
        key: impl Into<String>,
        value: Shared<T>,
    ) -> EcsResult<()> {
        self.resource_array_mut::<T>()?.set_resource(key, value);
        Ok(())
    }

    pub fn delete_resource<T: 'static>(&mut self, key: &str) -> EcsResult<Option<Shared<T>>> {
        Ok(self.resource_array_mut::<T>()?.delete_resource(key))
    }

    /// Clear every type in the tuple `S`. Nothing is cleared unless every
    /// type is registered.
    pub fn delete_all<S: ResourceSet>(&mut self) -> EcsResult<()> {
        S::delete_all(self)
    }

    /// Total number of keys across all registered types.
    pub fn len(&self) -> usize {
        self.arrays.values().map(|array| array.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn resource_array<T: 'static>(&self) -> EcsResult<&ResourceArray<T>> {
        self.arrays
            .get(&TypeId::of::<T>())
            .and_then(|array| array.as_any().downcast_ref::<ResourceArray<T>>())
            .ok_or_else(|| self.unregistered::<T>())
    }

    pub fn resource_array_mut<T: 'static>(&mut self) -> EcsResult<&mut ResourceArray<T>> {
        if !self.arrays.contains_key(&TypeId::of::<T>()) {
            return Err(self.unregistered::<T>());
        }
        self.arrays
            .get_mut(&TypeId::of::<T>())
            .and_then(|array| array.as_any_mut().downcast_mut::<ResourceArray<T>>())
            .ok_or(EcsError::UnregisteredResource {
                resource: type_name::<T>(),
            })
    }

    fn unregistered<T: 'static>(&self) -> EcsError {
        self.logger.critical("Tried to use unregistered resource!");
        EcsError::UnregisteredResource {
            resource: type_name::<T>(),
        }
    }
}

/// A tuple of resource types cleared together by
/// [`ResourceManager::delete_all`].
pub trait ResourceSet {
    fn delete_all(manager: &mut ResourceManager) -> EcsResult<()>;
}

impl ResourceSet for () {
    fn delete_all(_manager: &mut ResourceManager) -> EcsResult<()> {
        Ok(())
    }
}

macro_rules! impl_resource_set {
    ($($name:ident),+) => {
        impl<$($name: 'static),+> ResourceSet for ($($name,)+) {
            fn delete_all(manager: &mut ResourceManager) -> EcsResult<()> {
                $(manager.resource_array::<$name>()?;)+
                $(manager.resource_array_mut::<$name>()?.delete_all();)+
                Ok(())
            }
        }
    };
}

impl_resource_set!(A);
impl_resource_set!(A, B);
impl_resource_set!(A, B, C);
impl_resource_set!(A, B, C, D);
impl_resource_set!(A, B, C, D, E);
impl_resource_set!(A, B, C, D, E, F);
impl_resource_set!(A, B, C, D, E, F, G);
impl_resource_set!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{NullLogger, RecordingLogger, Severity};

    #[derive(Debug, PartialEq)]
    struct Config {
        volume: u8,
    }

    #[derive(Debug, PartialEq)]
    struct Atlas(&'static str);

    #[test]
    fn test_set_get_delete() {
        let mut resources = ResourceManager::new(Arc::new(NullLogger));
        resources.register_resource_type::<Config>();

        let main = Rc::new(RefCell::new(Config { volume: 3 }));
        resources.set_resource("main", main.clone()).unwrap();

        let fetched = resources.get_resource::<Config>("main").unwrap().unwrap();
        assert!(Rc::ptr_eq(&fetched, &main));
        fetched.borrow_mut().volume = 9;
        assert_eq!(main.borrow().volume, 9);

        resources.delete_resource::<Config>("main").unwrap();
        assert!(resources.get_resource::<Config>("main").unwrap().is_none());
        // The caller's handle outlives the mapping.
        assert_eq!(main.borrow().volume, 9);
    }

    #[test]
    fn test_delete_all_clears_listed_types() {
        let mut resources = ResourceManager::new(Arc::new(NullLogger));
        resources.register_resource_type::<Config>();
        resources.register_resource_type::<Atlas>();
        resources.register_resource_type::<u32>();

        resources
            .set_resource("a", Rc::new(RefCell::new(Config { volume: 1 })))
            .unwrap();
        resources
            .set_resource("b", Rc::new(RefCell::new(Atlas("tiles"))))
            .unwrap();
        resources.set_resource("c", Rc::new(RefCell::new(7u32))).unwrap();
        assert_eq!(resources.len(), 3);

        resources.delete_all::<(Config, Atlas)>().unwrap();
        assert_eq!(resources.len(), 1);
        assert!(resources.resource_array::<u32>().unwrap().contains("c"));
    }

    #[test]
    fn test_registration_misuse() {
        let logger = Arc::new(RecordingLogger::new());
        let mut resources = ResourceManager::new(logger.clone());
        resources.register_resource_type::<Config>();
        resources.register_resource_type::<Config>();
        assert_eq!(logger.count(Severity::Error), 1);

        resources
            .set_resource("main", Rc::new(RefCell::new(Config { volume: 4 })))
            .unwrap();

        let err = resources.get_resource::<Atlas>("x").unwrap_err();
        assert!(matches!(err, EcsError::UnregisteredResource { .. }));
        assert!(resources.delete_all::<(Config, Atlas)>().is_err());
        assert_eq!(logger.count(Severity::Critical), 2);
        // A failed clear leaves the registered types alone.
        assert!(resources.resource_array::<Config>().unwrap().contains("main"));
        assert_eq!(resources.len(), 1);
    }
}
