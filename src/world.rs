//! Contains types related to the [`World`] entity collection.

pub use crate::internals::{
    entity::{Entity, EntityLocation, LocationMap},
    error::WorldError,
    world::{World, WorldId, WorldLock, WorldOptions, DEFAULT_CHUNK_SIZE},
};
