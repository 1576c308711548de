//! Contains types related to executing systems in phase order.

use std::fmt;

use tracing::{debug, info, span, Level};

use super::{command::CommandBuffer, system::System};
use crate::internals::{
    error::WorldError,
    world::{World, WorldId},
};

/// The point in a frame at which a system runs. Phases execute in declaration order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    /// Runs before [`Update`](Phase::Update).
    PreUpdate,
    /// The main phase.
    Update,
    /// Runs after [`Update`](Phase::Update).
    PostUpdate,
}

impl Phase {
    /// Every phase, in execution order.
    pub const ALL: [Phase; 3] = [Phase::PreUpdate, Phase::Update, Phase::PostUpdate];

    fn slot(self) -> usize {
        match self {
            Phase::PreUpdate => 0,
            Phase::Update => 1,
            Phase::PostUpdate => 2,
        }
    }
}

/// A factory for [`Schedule`].
#[derive(Default)]
pub struct Builder {
    phases: [Vec<Box<dyn System>>; 3],
}

impl Builder {
    /// Adds a system to the given phase. Systems within a phase run in insertion order.
    pub fn add_system<S: System + 'static>(&mut self, phase: Phase, system: S) -> &mut Self {
        self.phases[phase.slot()].push(Box::new(system));
        self
    }

    /// Finalizes the builder into a `Schedule`.
    pub fn build(&mut self) -> Schedule {
        Schedule {
            phases: std::mem::take(&mut self.phases),
            attached: None,
        }
    }
}

/// Systems grouped by [`Phase`], executed against one world.
///
/// ```
/// # use warren::prelude::*;
/// let mut world = World::default();
/// let mut schedule = Schedule::builder()
///     .add_system(Phase::Update, system_fn("noop", |_, _| Ok(())))
///     .build();
///
/// schedule.execute(&mut world).unwrap();
/// ```
#[derive(Default)]
pub struct Schedule {
    phases: [Vec<Box<dyn System>>; 3],
    attached: Option<WorldId>,
}

impl fmt::Debug for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schedule")
            .field("systems", &self.system_names())
            .field("attached", &self.attached)
            .finish()
    }
}

impl Schedule {
    /// Creates a new schedule builder.
    pub fn builder() -> Builder { Builder::default() }

    /// Lists every system with its phase, in execution order.
    pub fn system_names(&self) -> Vec<(Phase, &str)> {
        Phase::ALL
            .iter()
            .flat_map(|&phase| {
                self.phases[phase.slot()]
                    .iter()
                    .map(move |system| (phase, system.name()))
            })
            .collect()
    }

    /// Finds the first system of type `S`, in execution order.
    pub fn system<S: System>(&self) -> Option<&S> {
        self.phases
            .iter()
            .flatten()
            .find_map(|system| system.downcast_ref::<S>())
    }

    /// Finds the first system of type `S` for mutation, in execution order.
    pub fn system_mut<S: System>(&mut self) -> Option<&mut S> {
        self.phases
            .iter_mut()
            .flatten()
            .find_map(|system| system.downcast_mut::<S>())
    }

    /// Returns the world the schedule is attached to.
    pub fn attached(&self) -> Option<WorldId> { self.attached }

    /// Attaches every system to `world`. Does nothing if already attached to it.
    pub fn attach(&mut self, world: &mut World) -> Result<(), WorldError> {
        match self.attached {
            Some(id) if id == world.id() => return Ok(()),
            Some(_) => return Err(WorldError::WorldMismatch),
            None => {}
        }
        for system in self.phases.iter_mut().flatten() {
            debug!(system = system.name(), "attaching system");
            system.on_attach(world)?;
        }
        self.attached = Some(world.id());
        Ok(())
    }

    /// Detaches every system from `world`.
    pub fn detach(&mut self, world: &mut World) -> Result<(), WorldError> {
        if self.attached != Some(world.id()) {
            return Err(WorldError::WorldMismatch);
        }
        for system in self.phases.iter_mut().flatten() {
            debug!(system = system.name(), "detaching system");
            system.on_detach(world);
        }
        self.attached = None;
        Ok(())
    }

    /// Runs the systems of one phase, flushing each system's commands after it returns.
    ///
    /// Attaches the schedule first if needed. Stops at the first failing system.
    pub fn execute_phase(&mut self, world: &mut World, phase: Phase) -> Result<(), WorldError> {
        self.attach(world)?;
        for system in &mut self.phases[phase.slot()] {
            let span = span!(Level::INFO, "System", system = %system.name(), ?phase);
            let _guard = span.enter();

            info!("Running");
            let commands = CommandBuffer::new(world);
            system.execute(world, &commands)?;
            commands.flush(world)?;
        }
        Ok(())
    }

    /// Runs every phase in order.
    pub fn execute(&mut self, world: &mut World) -> Result<(), WorldError> {
        for phase in Phase::ALL {
            self.execute_phase(world, phase)?;
        }
        Ok(())
    }
}
