//! Error types for misuse the core refuses to paper over.
//!
//! Recoverable misuse never shows up here: it is reported through the
//! injected [`Logger`](crate::logging::Logger) and the call becomes a no-op.
//! Everything in [`EcsError`] is an invariant violation the caller must fix.

use thiserror::Error;

use crate::ecs::Entity;

pub type EcsResult<T> = Result<T, EcsError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    #[error("no entity ids left: {max} entities are already alive")]
    EntitiesExhausted { max: u32 },

    #[error("entity {entity} holds no `{component}` component")]
    MissingComponent {
        entity: Entity,
        component: &'static str,
    },

    #[error("component type `{component}` was never registered")]
    UnregisteredComponent { component: &'static str },

    #[error("resource type `{resource}` was never registered")]
    UnregisteredResource { resource: &'static str },

    #[error("system type `{system}` was never registered")]
    UnregisteredSystem { system: &'static str },

    #[error("system type `{system}` is already registered")]
    DuplicateSystem { system: &'static str },

    #[error("cannot register more than {max} component types")]
    TooManyComponents { max: u32 },
}

impl EcsError {
    /// Every variant belongs to the fatal tier; hosts may still match on it.
    pub fn is_invariant_violation(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_type() {
        let err = EcsError::MissingComponent {
            entity: 7,
            component: "Position",
        };
        assert_eq!(err.to_string(), "entity 7 holds no `Position` component");
        assert!(err.is_invariant_violation());
    }
}
