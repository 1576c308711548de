//! Contains types related to defining systems.

use std::fmt;

use downcast_rs::{impl_downcast, Downcast};

use crate::internals::{error::WorldError, world::World};

use super::command::CommandBuffer;

/// A unit of game logic driven by a [`Schedule`](super::schedule::Schedule).
///
/// Systems build their queries when attached to a world and run them every
/// time the schedule executes their phase. Structural changes made while
/// executing are recorded in the supplied command buffer, which the schedule
/// flushes as soon as the system returns.
pub trait System: Downcast + Send {
    /// A human readable name used in logs and tooling.
    fn name(&self) -> &str { std::any::type_name::<Self>() }

    /// Called once when the system is attached to a world.
    fn on_attach(&mut self, _world: &mut World) -> Result<(), WorldError> { Ok(()) }

    /// Called once when the system is detached from a world.
    fn on_detach(&mut self, _world: &mut World) {}

    /// Runs the system.
    fn execute(&mut self, world: &World, commands: &CommandBuffer) -> Result<(), WorldError>;
}
impl_downcast!(System);

/// A [`System`] backed by a closure.
pub struct FnSystem<F> {
    name: String,
    run: F,
}

impl<F> fmt::Debug for FnSystem<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSystem").field("name", &self.name).finish()
    }
}

impl<F> System for FnSystem<F>
where
    F: FnMut(&World, &CommandBuffer) -> Result<(), WorldError> + Send + 'static,
{
    fn name(&self) -> &str { &self.name }

    fn execute(&mut self, world: &World, commands: &CommandBuffer) -> Result<(), WorldError> {
        (self.run)(world, commands)
    }
}

/// Wraps a closure as a named [`System`].
pub fn system_fn<F, T: Into<String>>(name: T, run: F) -> FnSystem<F>
where
    F: FnMut(&World, &CommandBuffer) -> Result<(), WorldError> + Send,
{
    FnSystem {
        name: name.into(),
        run,
    }
}
