//! Entity Component System core
//!
//! Entities are plain ids, components live in dense per-type arrays, and
//! systems receive every entity whose signature covers their own.
//! [`Coordinator`] is the only type most callers need.

pub mod component;
pub mod coordinator;
pub mod entity;
pub mod resource;
pub mod system;
pub mod types;

pub use component::{Component, ComponentArray, ComponentManager, ComponentStore};
pub use coordinator::Coordinator;
pub use entity::EntityManager;
pub use resource::{ResourceArray, ResourceManager, ResourceSet, Shared};
pub use system::{System, SystemManager};
pub use types::{ComponentType, Entity, Signature, MAX_COMPONENTS, MAX_ENTITIES};
