//! Errors returned by world and query operations.

use super::{entity::Entity, storage::component::ComponentTypeId};

/// Error type representing a failed world or query operation.
///
/// All variants are local and recoverable. A failed operation never leaves an
/// archetype in an inconsistent state.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Hash)]
pub enum WorldError {
    /// The entity handle is stale or was never issued by this world.
    #[error("entity {0} does not exist")]
    InvalidEntity(Entity),
    /// The entity already has the component.
    #[error("entity {entity} already has component {component}")]
    DuplicateComponent {
        /// The entity being modified.
        entity: Entity,
        /// The component type which was already present.
        component: ComponentTypeId,
    },
    /// The entity does not have the component.
    #[error("entity {entity} does not have component {component}")]
    MissingComponent {
        /// The entity being modified.
        entity: Entity,
        /// The component type which was absent.
        component: ComponentTypeId,
    },
    /// The query or its world has been disposed.
    #[error("the query or its world has been disposed")]
    Disposed,
    /// The query was created by a different world.
    #[error("the query belongs to a different world")]
    WorldMismatch,
    /// The stream selection would allow two mutable references to the same column.
    #[error("conflicting access to component {0}")]
    ConflictingAccess(ComponentTypeId),
    /// A column required by the operation is already borrowed incompatibly.
    #[error("component {0} is already borrowed")]
    ComponentBorrowed(ComponentTypeId),
}
