//! Queries select archetypes by their component types and iterate their rows.
//!
//! A query is built from a view, such as `(&mut Position, &Velocity)`, plus
//! optional filter terms. Iteration goes through a [`QueryGuard`], which locks
//! the world and borrows every selected column up front, and then visits rows
//! either on the calling thread or split into chunks on a worker pool.
//!
//! ```
//! # use warren::prelude::*;
//! #[derive(Debug)]
//! struct Position(f32);
//! struct Velocity(f32);
//!
//! let mut world = World::default();
//! for i in 0..10 {
//!     let e = world.spawn();
//!     world.add_component(e, Position(0.)).unwrap();
//!     world.add_component(e, Velocity(i as f32)).unwrap();
//! }
//!
//! let query = world.query::<(&mut Position, &Velocity)>().build().unwrap();
//! query
//!     .guard(&world)
//!     .unwrap()
//!     .par_for_each_with(0.5f32, |(pos, vel), dt| pos.0 += vel.0 * dt);
//! ```

pub use crate::internals::{
    dispatch::{Dispatcher, QueryGuard},
    query::{
        join::CrossJoin,
        view::{read::Read, write::Write, Access, IntoView, Item, StreamSlice, StreamType, View},
        Query, QueryBuilder, QueryState,
    },
};
