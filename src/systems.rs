//! Systems executed in phases, and deferred world commands.

pub use crate::internals::systems::{
    command::{CommandBuffer, WorldWritable},
    schedule::{Builder, Phase, Schedule},
    system::{system_fn, FnSystem, System},
};
