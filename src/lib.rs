//! Warren is an archetype based entity component system.
//!
//! Entities which share an identical set of component types are stored
//! together in densely packed archetype tables. Queries select every archetype
//! whose components satisfy a filter and stay up to date as new archetypes are
//! created. Query data can be visited on the calling thread or split into
//! fixed size chunks which run on a worker pool.
//!
//! # Getting Started
//!
//! ```rust
//! use warren::prelude::*;
//!
//! // Define our entity data types
//! #[derive(Clone, Copy, Debug, PartialEq)]
//! struct Position {
//!     x: f32,
//!     y: f32,
//! }
//!
//! #[derive(Clone, Copy, Debug, PartialEq)]
//! struct Velocity {
//!     dx: f32,
//!     dy: f32,
//! }
//!
//! // Create a world to store our entities
//! let mut world = World::default();
//!
//! // Create entities with `Position` and `Velocity` data
//! for _ in 0..999 {
//!     let entity = world.spawn();
//!     world.add_component(entity, Position { x: 0.0, y: 0.0 }).unwrap();
//!     world.add_component(entity, Velocity { dx: 1.0, dy: 0.0 }).unwrap();
//! }
//!
//! // Create a query which finds all `Position` and `Velocity` components
//! let query = world.query::<(&mut Position, &Velocity)>().build().unwrap();
//!
//! // Iterate through all entities that match the query in the world
//! query.guard(&world).unwrap().par_for_each(|(pos, vel)| {
//!     pos.x += vel.dx;
//!     pos.y += vel.dy;
//! });
//! ```
//!
//! # Relations
//!
//! A component can be attached with an entity target. `Likes -> alice` and
//! `Likes -> bob` are then distinct component types sharing one Rust type.
//! Queries match relations with a [`Target`](storage::Target); wildcard targets
//! yield one join result per matching relation.
//!
//! ```rust
//! use warren::prelude::*;
//!
//! struct Likes(u32);
//!
//! let mut world = World::default();
//! let alice = world.spawn();
//! let bob = world.spawn();
//! let carol = world.spawn();
//! world.add_relation(carol, alice, Likes(1)).unwrap();
//! world.add_relation(carol, bob, Likes(2)).unwrap();
//!
//! let query = world
//!     .query::<(Entity, &Likes)>()
//!     .matching::<Likes>(Target::AnyEntity)
//!     .build()
//!     .unwrap();
//!
//! let mut total = 0;
//! query.guard(&world).unwrap().for_each(|(_, likes)| total += likes.0);
//! assert_eq!(total, 3);
//! ```
//!
//! # Feature Flags
//!
//! * `parallel` (default): runs parallel dispatch on a rayon thread pool.
//!   Without it, parallel dispatch runs the same chunks on the calling thread.

#![warn(missing_docs)]

mod internals;

pub mod query;
pub mod storage;
pub mod systems;
pub mod world;

pub use crate::{
    query::{Query, Read, Write},
    storage::Target,
    world::{Entity, World, WorldError, WorldOptions},
};

/// The most commonly used types.
pub mod prelude {
    pub use crate::{
        query::{IntoView, Query, QueryGuard, Read, Write},
        storage::{Component, Target},
        systems::{system_fn, CommandBuffer, Phase, Schedule, System},
        world::{Entity, World, WorldError, WorldOptions},
    };
}
