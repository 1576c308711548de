//! Archetype storage.
//!
//! Entities with exactly the same set of component types share an
//! [`Archetype`]. Each archetype stores one densely packed [`Column`] per
//! component type, all of the same length, next to a column of entity IDs.
//! Row `r` of every column belongs to the same entity, so the columns can be
//! iterated together as zipped slices.
//!
//! Removing a row moves the archetype's last row into its place. Row indices
//! are therefore not stable across structural changes.

pub use crate::internals::storage::{
    archetype::{Archetype, ArchetypeIndex},
    column::Column,
    component::{Component, ComponentTypeId, Target},
    index::SearchIndex,
    signature::{QueryFilter, Signature},
    ComponentIndex, ComponentMeta, UnknownComponentStorage,
};
