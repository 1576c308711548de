//! Contains types related to command buffers.
//!
//! Use command buffers to enqueue structural changes to a world while it is
//! locked by a dispatch, for example destroying entities from inside a
//! parallel iteration. Command buffers are flushed by the [`Schedule`](super::schedule::Schedule)
//! after each system runs, or manually with [`CommandBuffer::flush`].

use std::{any::type_name, collections::VecDeque, fmt, marker::PhantomData};

use parking_lot::Mutex;
use tracing::{span, trace, Level};

use crate::internals::{
    entity::Entity,
    error::WorldError,
    storage::component::Component,
    world::{World, WorldId},
};

/// A deferred world modification which can be queued in a [`CommandBuffer`].
pub trait WorldWritable: Send {
    /// Destructs the writer and performs the write operations on the world.
    fn write(self: Box<Self>, world: &mut World) -> Result<(), WorldError>;
}

struct DespawnCommand(Entity);

impl fmt::Debug for DespawnCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DespawnCommand({})", self.0)
    }
}

impl WorldWritable for DespawnCommand {
    fn write(self: Box<Self>, world: &mut World) -> Result<(), WorldError> { world.despawn(self.0) }
}

struct AddComponentCommand<C> {
    entity: Entity,
    target: Option<Entity>,
    component: C,
}

impl<C> fmt::Debug for AddComponentCommand<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AddComponentCommand<{}>({})", type_name::<C>(), self.entity)
    }
}

impl<C: Component> WorldWritable for AddComponentCommand<C> {
    fn write(self: Box<Self>, world: &mut World) -> Result<(), WorldError> {
        match self.target {
            Some(target) => world.add_relation(self.entity, target, self.component),
            None => world.add_component(self.entity, self.component),
        }
    }
}

struct RemoveComponentCommand<C> {
    entity: Entity,
    target: Option<Entity>,
    _marker: PhantomData<fn() -> C>,
}

impl<C> fmt::Debug for RemoveComponentCommand<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RemoveComponentCommand<{}>({})", type_name::<C>(), self.entity)
    }
}

impl<C: Component> WorldWritable for RemoveComponentCommand<C> {
    fn write(self: Box<Self>, world: &mut World) -> Result<(), WorldError> {
        match self.target {
            Some(target) => world.remove_relation::<C>(self.entity, target).map(drop),
            None => world.remove_component::<C>(self.entity).map(drop),
        }
    }
}

type ExecFn = Box<dyn FnOnce(&mut World) -> Result<(), WorldError> + Send>;

enum Command {
    WriteWorld(Box<dyn WorldWritable>),
    ExecMutWorld(ExecFn),
}

/// A queue of structural changes to apply to a world later.
///
/// Commands can be recorded through a shared reference, including from inside
/// a parallel dispatch, and are applied in the order they were recorded.
///
/// ```
/// # use warren::prelude::*;
/// # struct Health(i32);
/// let mut world = World::default();
/// let entity = world.spawn();
/// world.add_component(entity, Health(0)).unwrap();
///
/// let query = world.query::<(Entity, &Health)>().build().unwrap();
/// let commands = CommandBuffer::new(&world);
/// query.guard(&world).unwrap().par_for_each(|(entity, health)| {
///     if health.0 <= 0 {
///         commands.despawn(*entity);
///     }
/// });
///
/// commands.flush(&mut world).unwrap();
/// assert!(!world.is_alive(entity));
/// ```
pub struct CommandBuffer {
    world_id: WorldId,
    commands: Mutex<VecDeque<Command>>,
}

impl fmt::Debug for CommandBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBuffer")
            .field("world", &self.world_id)
            .field("len", &self.len())
            .finish()
    }
}

impl CommandBuffer {
    /// Constructs an empty command buffer.
    pub fn new(world: &World) -> Self {
        Self {
            world_id: world.id(),
            commands: Default::default(),
        }
    }

    /// Gets the ID of the world this command buffer belongs to.
    pub fn world(&self) -> WorldId { self.world_id }

    /// Applies and drains every queued command, oldest first.
    ///
    /// A failing command does not stop the flush; the first error is returned
    /// once every command has been applied.
    pub fn flush(&self, world: &mut World) -> Result<(), WorldError> {
        if self.world_id != world.id() {
            return Err(WorldError::WorldMismatch);
        }
        let span = span!(Level::TRACE, "Draining command buffer");
        let _guard = span.enter();

        let commands = std::mem::take(&mut *self.commands.lock());
        let mut first = None;
        for command in commands {
            let result = match command {
                Command::WriteWorld(writer) => writer.write(world),
                Command::ExecMutWorld(closure) => closure(world),
            };
            if let Err(err) = result {
                trace!(%err, "command failed");
                first.get_or_insert(err);
            }
        }
        first.map_or(Ok(()), Err)
    }

    /// Queues an arbitrary writer.
    pub fn insert_writer<W>(&self, writer: W)
    where
        W: 'static + WorldWritable,
    {
        self.commands
            .lock()
            .push_back(Command::WriteWorld(Box::new(writer)));
    }

    /// Queues a closure with exclusive access to the world.
    pub fn exec_mut<F>(&self, f: F)
    where
        F: 'static + FnOnce(&mut World) -> Result<(), WorldError> + Send,
    {
        self.commands
            .lock()
            .push_back(Command::ExecMutWorld(Box::new(f)));
    }

    /// Queues the creation of an entity, which `init` can then populate.
    pub fn spawn_with<F>(&self, init: F)
    where
        F: 'static + FnOnce(&mut World, Entity) -> Result<(), WorldError> + Send,
    {
        self.exec_mut(move |world| {
            let entity = world.spawn();
            init(world, entity)
        });
    }

    /// Queues the destruction of an entity.
    pub fn despawn(&self, entity: Entity) { self.insert_writer(DespawnCommand(entity)); }

    /// Queues the addition of a component to an entity.
    pub fn add_component<C: Component>(&self, entity: Entity, component: C) {
        self.insert_writer(AddComponentCommand {
            entity,
            target: None,
            component,
        });
    }

    /// Queues the removal of a component from an entity. The removed value is dropped.
    pub fn remove_component<C: Component>(&self, entity: Entity) {
        self.insert_writer(RemoveComponentCommand::<C> {
            entity,
            target: None,
            _marker: PhantomData,
        });
    }

    /// Queues the addition of a relation from `entity` to `target`.
    pub fn add_relation<C: Component>(&self, entity: Entity, target: Entity, component: C) {
        self.insert_writer(AddComponentCommand {
            entity,
            target: Some(target),
            component,
        });
    }

    /// Queues the removal of a relation from `entity` to `target`.
    pub fn remove_relation<C: Component>(&self, entity: Entity, target: Entity) {
        self.insert_writer(RemoveComponentCommand::<C> {
            entity,
            target: Some(target),
            _marker: PhantomData,
        });
    }

    /// Returns the number of queued commands.
    #[inline]
    pub fn len(&self) -> usize { self.commands.lock().len() }

    /// Returns `true` if no commands are queued.
    #[inline]
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}
