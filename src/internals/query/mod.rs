//! Queries select the archetypes which satisfy a component filter and expose a
//! typed stream selection over their rows.
//!
//! Each distinct filter owns one cached [`QueryState`] per world. The world
//! appends every newly created matching archetype to the cached state, so a
//! query never needs to rescan the world.

use std::{
    marker::PhantomData,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use parking_lot::RwLock;

use self::{
    join::CrossJoin,
    view::{Access, StreamType, View},
};
use crate::internals::{
    dispatch::QueryGuard,
    entity::Entity,
    error::WorldError,
    storage::{
        archetype::ArchetypeIndex,
        component::{Component, ComponentTypeId, Target},
        signature::{QueryFilter, Signature},
    },
    world::{World, WorldId},
};

pub mod join;
pub mod view;

/// The cached list of archetypes matching one filter.
#[derive(Debug)]
pub struct QueryState {
    world: WorldId,
    filter: QueryFilter,
    archetypes: RwLock<Vec<ArchetypeIndex>>,
    disposed: AtomicBool,
}

impl QueryState {
    pub(crate) fn new(
        world: WorldId,
        filter: QueryFilter,
        archetypes: impl IntoIterator<Item = ArchetypeIndex>,
    ) -> Self {
        Self {
            world,
            filter,
            archetypes: RwLock::new(archetypes.into_iter().collect()),
            disposed: AtomicBool::new(false),
        }
    }

    /// Returns the filter the state caches matches for.
    pub fn filter(&self) -> &QueryFilter { &self.filter }

    /// Returns a snapshot of the matching archetypes, in the order they were created.
    pub fn archetypes(&self) -> Vec<ArchetypeIndex> { self.archetypes.read().clone() }

    pub(crate) fn push(&self, archetype: ArchetypeIndex) { self.archetypes.write().push(archetype); }

    pub(crate) fn dispose(&self) { self.disposed.store(true, Ordering::Release); }

    /// Returns `true` once the owning world has been torn down.
    pub fn is_disposed(&self) -> bool { self.disposed.load(Ordering::Acquire) }
}

/// Builds a [`Query`] from a view and additional filter terms.
///
/// ```
/// # use warren::prelude::*;
/// # struct Position(f32);
/// # struct Velocity(f32);
/// # struct Frozen;
/// let mut world = World::default();
/// let query = world
///     .query::<(&mut Position, &Velocity)>()
///     .without::<Frozen>()
///     .build()
///     .unwrap();
/// ```
pub struct QueryBuilder<'a, V: View> {
    world: &'a mut World,
    streams: Vec<StreamType>,
    with: Vec<ComponentTypeId>,
    without: Vec<ComponentTypeId>,
    _view: PhantomData<fn() -> V>,
}

impl<'a, V: View> QueryBuilder<'a, V> {
    pub(crate) fn new(world: &'a mut World) -> Self {
        let mut streams = Vec::new();
        V::streams(&mut streams);
        Self {
            world,
            streams,
            with: Vec::new(),
            without: Vec::new(),
            _view: PhantomData,
        }
    }

    /// Requires component `T` without streaming it.
    pub fn with<T: Component>(mut self) -> Self {
        self.with.push(ComponentTypeId::of::<T>());
        self
    }

    /// Rejects archetypes containing component `T`.
    pub fn without<T: Component>(mut self) -> Self {
        self.without.push(ComponentTypeId::of::<T>());
        self
    }

    /// Requires a relation of type `T` matching `target`.
    pub fn with_relation<T: Component>(mut self, target: Target) -> Self {
        self.with.push(ComponentTypeId::matching::<T>(target));
        self
    }

    /// Rejects archetypes containing a relation of type `T` matching `target`.
    pub fn without_relation<T: Component>(mut self, target: Target) -> Self {
        self.without.push(ComponentTypeId::matching::<T>(target));
        self
    }

    /// Makes every stream of component type `T` select columns matching `target`
    /// instead of the plain component.
    ///
    /// Wildcard targets expand each archetype into one join result per matching column.
    pub fn matching<T: Component>(mut self, target: Target) -> Self {
        let expr = ComponentTypeId::matching::<T>(target);
        for stream in &mut self.streams {
            if stream.type_id.type_id() == expr.type_id() {
                stream.type_id = expr;
            }
        }
        self
    }

    /// Validates the stream selection and registers the query with the world.
    pub fn build(self) -> Result<Query<V>, WorldError> {
        validate_access(&self.streams)?;
        let all = Signature::new(
            self.streams
                .iter()
                .map(|s| s.type_id)
                .chain(self.with.iter().copied()),
        );
        let none = Signature::new(self.without.iter().copied());
        let state = self.world.register_query(QueryFilter::new(all, none));
        Ok(Query {
            state,
            streams: self.streams,
            disposed: false,
            _view: PhantomData,
        })
    }
}

/// Rejects stream selections which could hand out aliasing mutable slices.
///
/// A written component type must not appear in any other stream. When the
/// selection contains a wildcard, join results of one archetype share every
/// non-wildcard column, so the only stream allowed to write is a single wildcard.
fn validate_access(streams: &[StreamType]) -> Result<(), WorldError> {
    let wildcards = streams.iter().filter(|s| s.type_id.is_wildcard()).count();
    for (i, stream) in streams.iter().enumerate() {
        if stream.access != Access::Write {
            continue;
        }
        let shared = streams
            .iter()
            .enumerate()
            .any(|(j, other)| j != i && other.type_id.type_id() == stream.type_id.type_id());
        let fanned_out = wildcards > 1 || (wildcards == 1 && !stream.type_id.is_wildcard());
        if shared || fanned_out {
            return Err(WorldError::ConflictingAccess(stream.type_id));
        }
    }
    Ok(())
}

/// A live view over every archetype matching a filter.
///
/// Queries are independent of the world borrow; each operation takes the world
/// it was built from.
pub struct Query<V: View> {
    state: Arc<QueryState>,
    streams: Vec<StreamType>,
    disposed: bool,
    _view: PhantomData<fn() -> V>,
}

impl<V: View> Clone for Query<V> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            streams: self.streams.clone(),
            disposed: self.disposed,
            _view: PhantomData,
        }
    }
}

impl<V: View> std::fmt::Debug for Query<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("filter", self.state.filter())
            .field("streams", &self.streams)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl<V: View> Query<V> {
    /// Returns `Disposed` if this query or its world has been disposed.
    pub fn assert_not_disposed(&self) -> Result<(), WorldError> {
        if self.is_disposed() {
            Err(WorldError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Returns `true` if this query or its world has been disposed.
    pub fn is_disposed(&self) -> bool { self.disposed || self.state.is_disposed() }

    /// Disposes this query handle. Other handles sharing the cached state are unaffected.
    pub fn dispose(&mut self) { self.disposed = true; }

    /// Returns the filter the query matches archetypes with.
    pub fn filter(&self) -> &QueryFilter { self.state.filter() }

    /// Returns the query's stream types, in slot order.
    pub fn streams(&self) -> &[StreamType] { &self.streams }

    /// Returns the archetypes the query currently matches.
    pub fn archetypes(&self) -> Vec<ArchetypeIndex> { self.state.archetypes() }

    fn check(&self, world: &World) -> Result<(), WorldError> {
        self.assert_not_disposed()?;
        if self.state.world != world.id() {
            return Err(WorldError::WorldMismatch);
        }
        Ok(())
    }

    /// Returns the number of entities matched by the query.
    pub fn count(&self, world: &World) -> Result<usize, WorldError> {
        self.check(world)?;
        let _lock = world.lock();
        let archetypes = self.state.archetypes.read();
        Ok(archetypes
            .iter()
            .map(|&index| world.archetypes()[index].len())
            .sum())
    }

    /// Returns `true` if the query matches the given entity.
    pub fn contains(&self, world: &World, entity: Entity) -> Result<bool, WorldError> {
        self.check(world)?;
        let location = world
            .entity_location(entity)
            .ok_or(WorldError::InvalidEntity(entity))?;
        Ok(self
            .state
            .archetypes
            .read()
            .contains(&location.archetype()))
    }

    /// Locks the world and borrows every column of every non-empty join result.
    ///
    /// Borrowing is all-or-nothing: if any column is already borrowed
    /// incompatibly, no guard is returned.
    pub fn guard<'w>(&self, world: &'w World) -> Result<QueryGuard<'w, V>, WorldError> {
        self.check(world)?;
        let lock = world.lock();
        let mut joins = Vec::new();
        for &index in self.state.archetypes.read().iter() {
            let archetype = &world.archetypes()[index];
            let join = CrossJoin::new(archetype, &self.streams);
            if join.is_empty() {
                continue;
            }
            for columns in join.combinations() {
                let guard = V::lock(archetype, &mut columns.iter())?;
                joins.push((join.rows(), guard));
            }
        }
        Ok(QueryGuard::new(lock, joins, world.options().chunk_size, world.dispatcher()))
    }
}
