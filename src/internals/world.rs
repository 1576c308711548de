//! Contains types related to the [`World`] entity collection.

use std::{
    any::TypeId,
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
};

use parking_lot::{MappedRwLockReadGuard, RwLockReadGuard};
use tracing::{debug, trace};

use super::{
    dispatch::Dispatcher,
    entity::{Entity, EntityLocation, LocationMap},
    error::WorldError,
    query::{view::IntoView, QueryBuilder, QueryState},
    storage::{
        archetype::{Archetype, ArchetypeIndex},
        column::Column,
        component::{Component, ComponentTypeId, Target},
        index::SearchIndex,
        signature::{QueryFilter, Signature},
        ComponentIndex, ComponentMeta, UnknownComponentStorage,
    },
};

/// The number of rows per unit of work used by parallel dispatch unless overridden.
pub const DEFAULT_CHUNK_SIZE: usize = 128;

/// Unique identifier for a [`World`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorldId(u64);
static WORLD_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

impl WorldId {
    fn next() -> Self { WorldId(WORLD_ID_COUNTER.fetch_add(1, Ordering::Relaxed)) }
}

impl Default for WorldId {
    fn default() -> Self { Self::next() }
}

/// Describes configuration options for the creation of a new [`World`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldOptions {
    /// The number of worker threads in a pool dedicated to this world. `None`
    /// shares the process-wide pool.
    pub threads: Option<usize>,
    /// The default number of rows per unit of work in parallel dispatch.
    pub chunk_size: usize,
}

impl Default for WorldOptions {
    fn default() -> Self {
        Self {
            threads: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// A container of entities.
///
/// Each entity stored inside a world is uniquely identified by an [`Entity`] ID and may have an
/// arbitrary collection of [`Component`]s attached. Entities with identical component types are
/// stored together in an [`Archetype`].
///
/// Structural changes take `&mut self`, while iteration holds a [`WorldLock`] borrowed from
/// `&self`; the two can never overlap. Changes needed during iteration are recorded in a
/// [`CommandBuffer`](crate::systems::CommandBuffer).
#[derive(Debug)]
pub struct World {
    id: WorldId,
    options: WorldOptions,
    archetypes: Vec<Archetype>,
    signatures: HashMap<Signature, ArchetypeIndex>,
    index: SearchIndex,
    relation_targets: HashMap<Entity, Vec<ArchetypeIndex>>,
    entities: LocationMap,
    queries: HashMap<QueryFilter, Arc<QueryState>>,
    components: HashMap<TypeId, ComponentMeta>,
    readers: AtomicUsize,
    dispatcher: Dispatcher,
}

impl Default for World {
    fn default() -> Self { Self::new(WorldOptions::default()) }
}

impl World {
    /// Creates a new world with the given options.
    pub fn new(options: WorldOptions) -> Self {
        let dispatcher = Dispatcher::new(options.threads);
        let mut world = Self {
            id: WorldId::next(),
            options,
            archetypes: Vec::new(),
            signatures: HashMap::new(),
            index: SearchIndex::default(),
            relation_targets: HashMap::new(),
            entities: LocationMap::default(),
            queries: HashMap::new(),
            components: HashMap::new(),
            readers: AtomicUsize::new(0),
            dispatcher,
        };
        world.insert_archetype(Signature::empty(), Vec::new());
        debug!(world = world.id.0, chunk_size = world.options.chunk_size, "created world");
        world
    }

    /// Returns the world's unique ID.
    pub fn id(&self) -> WorldId { self.id }

    /// Returns the options the world was created with.
    pub fn options(&self) -> &WorldOptions { &self.options }

    /// Returns the number of live entities.
    pub fn len(&self) -> usize { self.entities.len() }

    /// Returns `true` if the world contains no entities.
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Returns `true` if the handle refers to a live entity.
    pub fn is_alive(&self, entity: Entity) -> bool { self.entities.contains(entity) }

    /// Returns the storage location of a live entity.
    pub fn entity_location(&self, entity: Entity) -> Option<EntityLocation> {
        self.entities.get(entity)
    }

    /// Returns all archetypes, indexed by [`ArchetypeIndex`].
    pub fn archetypes(&self) -> &[Archetype] { &self.archetypes }

    /// Returns the number of archetypes, including the empty one.
    pub fn archetype_count(&self) -> usize { self.archetypes.len() }

    /// Returns the component types of an entity.
    pub fn signature_of(&self, entity: Entity) -> Result<&Signature, WorldError> {
        let location = self.location(entity)?;
        Ok(self.archetypes[location.archetype()].signature())
    }

    /// Returns metadata for every component type which has been added to this world,
    /// sorted by type name.
    pub fn component_types(&self) -> Vec<ComponentMeta> {
        let mut types: Vec<_> = self.components.values().copied().collect();
        types.sort_by_key(|meta| meta.name());
        types
    }

    /// Takes a shared structural lock. Held by every query-consuming operation.
    pub fn lock(&self) -> WorldLock<'_> {
        self.readers.fetch_add(1, Ordering::AcqRel);
        WorldLock { world: self }
    }

    /// Returns `true` while any [`WorldLock`] is outstanding.
    pub fn is_locked(&self) -> bool { self.readers.load(Ordering::Acquire) > 0 }

    pub(crate) fn dispatcher(&self) -> &Dispatcher { &self.dispatcher }

    /// Starts building a query over the given view.
    pub fn query<Q: IntoView>(&mut self) -> QueryBuilder<'_, Q::View> { QueryBuilder::new(self) }

    /// Creates a new entity with no components.
    pub fn spawn(&mut self) -> Entity {
        self.assert_unlocked();
        let entity = self.entities.allocate();
        let root = ArchetypeIndex(0);
        let row = self.archetypes[root].push(entity);
        self.entities.set(entity, EntityLocation::new(root, row));
        trace!(%entity, "spawned entity");
        entity
    }

    /// Destroys an entity and drops all of its components.
    ///
    /// Relations targeting the entity are removed from every other entity.
    pub fn despawn(&mut self, entity: Entity) -> Result<(), WorldError> {
        self.assert_unlocked();
        let location = self
            .entities
            .remove(entity)
            .ok_or(WorldError::InvalidEntity(entity))?;
        if let Some(moved) = self.archetypes[location.archetype()].swap_remove(location.component()) {
            self.entities.set(moved, location);
        }
        trace!(%entity, "despawned entity");
        self.remove_relations_to(entity);
        Ok(())
    }

    /// Attaches a component to an entity, moving it to a new archetype.
    pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) -> Result<(), WorldError> {
        self.insert_component(entity, ComponentTypeId::of::<T>(), value)
    }

    /// Detaches a component from an entity and returns it.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<T, WorldError> {
        self.take_component(entity, ComponentTypeId::of::<T>())
    }

    /// Attaches a relation of type `T` from `entity` to `target`.
    pub fn add_relation<T: Component>(
        &mut self,
        entity: Entity,
        target: Entity,
        value: T,
    ) -> Result<(), WorldError> {
        if !self.is_alive(target) {
            return Err(WorldError::InvalidEntity(target));
        }
        self.insert_component(entity, ComponentTypeId::relation::<T>(target), value)
    }

    /// Detaches the relation of type `T` from `entity` to `target` and returns it.
    pub fn remove_relation<T: Component>(
        &mut self,
        entity: Entity,
        target: Entity,
    ) -> Result<T, WorldError> {
        self.take_component(entity, ComponentTypeId::relation::<T>(target))
    }

    /// Returns `true` if the entity is alive and has component `T`.
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.has(entity, &ComponentTypeId::of::<T>())
    }

    /// Returns `true` if the entity is alive and has a relation of type `T` to `target`.
    pub fn has_relation<T: Component>(&self, entity: Entity, target: Entity) -> bool {
        self.has(entity, &ComponentTypeId::relation::<T>(target))
    }

    /// Borrows a component of an entity.
    pub fn get_component<T: Component>(
        &self,
        entity: Entity,
    ) -> Result<MappedRwLockReadGuard<'_, T>, WorldError> {
        self.read_component(entity, ComponentTypeId::of::<T>())
    }

    /// Borrows the relation of type `T` from `entity` to `target`.
    pub fn get_relation<T: Component>(
        &self,
        entity: Entity,
        target: Entity,
    ) -> Result<MappedRwLockReadGuard<'_, T>, WorldError> {
        self.read_component(entity, ComponentTypeId::relation::<T>(target))
    }

    /// Mutably borrows a component of an entity.
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T, WorldError> {
        let type_id = ComponentTypeId::of::<T>();
        let location = self.location(entity)?;
        let missing = WorldError::MissingComponent {
            entity,
            component: type_id,
        };
        let archetype = &mut self.archetypes[location.archetype()];
        let Some(index) = archetype.column_index(&type_id) else {
            return Err(missing);
        };
        archetype
            .column_of_mut::<T>(index)
            .and_then(|column| column.get_mut(location.component()))
            .ok_or(missing)
    }

    /// Consumes the world, disposing every query created from it.
    pub fn dispose(self) { drop(self) }

    fn location(&self, entity: Entity) -> Result<EntityLocation, WorldError> {
        self.entities
            .get(entity)
            .ok_or(WorldError::InvalidEntity(entity))
    }

    fn has(&self, entity: Entity, type_id: &ComponentTypeId) -> bool {
        self.entities
            .get(entity)
            .map(|location| self.archetypes[location.archetype()].signature().contains(type_id))
            .unwrap_or(false)
    }

    fn read_component<T: Component>(
        &self,
        entity: Entity,
        type_id: ComponentTypeId,
    ) -> Result<MappedRwLockReadGuard<'_, T>, WorldError> {
        let location = self.location(entity)?;
        let archetype = &self.archetypes[location.archetype()];
        let column = archetype
            .column_index(&type_id)
            .and_then(|index| archetype.column_of::<T>(index))
            .ok_or(WorldError::MissingComponent {
                entity,
                component: type_id,
            })?;
        let guard = column
            .try_read()
            .ok_or(WorldError::ComponentBorrowed(type_id))?;
        let ComponentIndex(row) = location.component();
        Ok(RwLockReadGuard::map(guard, |data| &data[row]))
    }

    fn insert_component<T: Component>(
        &mut self,
        entity: Entity,
        type_id: ComponentTypeId,
        value: T,
    ) -> Result<(), WorldError> {
        self.assert_unlocked();
        let location = self.location(entity)?;
        let source = location.archetype();
        if self.archetypes[source].signature().contains(&type_id) {
            return Err(WorldError::DuplicateComponent {
                entity,
                component: type_id,
            });
        }
        self.components
            .entry(TypeId::of::<T>())
            .or_insert_with(ComponentMeta::of::<T>);

        let signature = self.archetypes[source].signature().with(type_id);
        let target = self.archetype_for(source, signature, Some(Column::<T>::boxed));
        self.transfer(entity, location, target, None);

        let archetype = &mut self.archetypes[target];
        let column = archetype
            .column_index(&type_id)
            .and_then(|index| archetype.column_of_mut::<T>(index))
            .expect("target archetype is missing the inserted column");
        column.push(value);
        Ok(())
    }

    fn take_component<T: Component>(
        &mut self,
        entity: Entity,
        type_id: ComponentTypeId,
    ) -> Result<T, WorldError> {
        self.assert_unlocked();
        let location = self.location(entity)?;
        let source = location.archetype();
        let column = self.archetypes[source].column_index(&type_id);
        let Some(column) = column.and_then(|i| self.archetypes[source].column_of_mut::<T>(i)) else {
            return Err(WorldError::MissingComponent {
                entity,
                component: type_id,
            });
        };
        let value = column.swap_remove_take(location.component());

        let signature = self.archetypes[source].signature().without(type_id);
        let target = self.archetype_for(source, signature, None);
        self.transfer(entity, location, target, Some(type_id));
        Ok(value)
    }

    /// Strips every relation targeting `target` from the entities holding one.
    fn remove_relations_to(&mut self, target: Entity) {
        let Some(affected) = self.relation_targets.remove(&target) else {
            return;
        };

        for source in affected {
            if self.archetypes[source].is_empty() {
                continue;
            }
            let removed = self.archetypes[source].signature().relations_targeting(target);
            let signature = self.archetypes[source].signature().without_all(&removed);
            let destination = self.archetype_for(source, signature, None);
            while let Some(&entity) = self.archetypes[source].entities().last() {
                let row = ComponentIndex(self.archetypes[source].len() - 1);
                self.transfer(entity, EntityLocation::new(source, row), destination, None);
            }
            trace!(%target, archetype = source.0, "removed dangling relations");
        }
    }

    /// Finds the archetype for `signature`, creating it from the column types of
    /// `template` plus the column built by `extra` if it does not exist yet.
    fn archetype_for(
        &mut self,
        template: ArchetypeIndex,
        signature: Signature,
        extra: Option<fn() -> Box<dyn UnknownComponentStorage>>,
    ) -> ArchetypeIndex {
        if let Some(&index) = self.signatures.get(&signature) {
            return index;
        }
        let columns = self.archetypes[template].columns_for(&signature, extra);
        self.insert_archetype(signature, columns)
    }

    fn insert_archetype(
        &mut self,
        signature: Signature,
        columns: Vec<Box<dyn UnknownComponentStorage>>,
    ) -> ArchetypeIndex {
        let index = ArchetypeIndex(self.archetypes.len() as u32);
        self.index.push(&signature);
        self.signatures.insert(signature.clone(), index);
        for type_id in signature.iter() {
            if let Target::Entity(target) = type_id.target() {
                let archetypes = self.relation_targets.entry(target).or_default();
                if archetypes.last() != Some(&index) {
                    archetypes.push(index);
                }
            }
        }

        // states no query handle refers to any more are rebuilt on demand
        self.queries.retain(|_, state| Arc::strong_count(state) > 1);
        for (filter, state) in &self.queries {
            if filter.matches(&signature) {
                state.push(index);
            }
        }

        debug!(world = self.id.0, archetype = index.0, %signature, "created archetype");
        self.archetypes.push(Archetype::new(index, signature, columns));
        index
    }

    pub(crate) fn register_query(&mut self, filter: QueryFilter) -> Arc<QueryState> {
        if let Some(state) = self.queries.get(&filter) {
            return state.clone();
        }
        let state = Arc::new(QueryState::new(
            self.id,
            filter.clone(),
            self.index.search(&filter),
        ));
        trace!(
            world = self.id.0,
            required = %filter.required(),
            excluded = %filter.excluded(),
            matches = state.archetypes().len(),
            "registered query"
        );
        self.queries.insert(filter, state.clone());
        state
    }

    /// Moves an entity's row to another archetype. Components the target does not
    /// store are dropped, except `skip`, which the caller has already taken out.
    fn transfer(
        &mut self,
        entity: Entity,
        location: EntityLocation,
        target: ArchetypeIndex,
        skip: Option<ComponentTypeId>,
    ) {
        let EntityLocation(source, row) = location;
        let (src, dst) = pair_mut(&mut self.archetypes, source, target);
        for i in 0..src.signature().len() {
            let type_id = src.signature().component_types()[i];
            if skip == Some(type_id) {
                continue;
            }
            match dst.column_index(&type_id) {
                Some(j) => src.column_mut(i).move_component(row, dst.column_mut(j)),
                None => src.column_mut(i).swap_remove(row),
            }
        }
        let moved = src.swap_remove_entity(row);
        let new_row = dst.push(entity);

        if let Some(moved) = moved {
            self.entities.set(moved, location);
        }
        self.entities.set(entity, EntityLocation::new(target, new_row));
        trace!(%entity, from = source.0, to = target.0, "moved entity");
    }

    fn assert_unlocked(&self) {
        debug_assert!(!self.is_locked(), "structural change while the world is locked");
    }
}

impl Drop for World {
    fn drop(&mut self) {
        for state in self.queries.values() {
            state.dispose();
        }
        debug!(world = self.id.0, entities = self.len(), "disposed world");
    }
}

fn pair_mut(
    archetypes: &mut [Archetype],
    a: ArchetypeIndex,
    b: ArchetypeIndex,
) -> (&mut Archetype, &mut Archetype) {
    let (a, b) = (a.0 as usize, b.0 as usize);
    assert_ne!(a, b, "cannot transfer within one archetype");
    if a < b {
        let (left, right) = archetypes.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = archetypes.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

/// A shared structural lock on a [`World`].
///
/// While any lock is outstanding the world cannot be structurally modified,
/// since modification requires `&mut World`.
#[derive(Debug)]
pub struct WorldLock<'w> {
    world: &'w World,
}

impl<'w> WorldLock<'w> {
    /// Returns the locked world.
    pub fn world(&self) -> &'w World { self.world }
}

impl<'w> Drop for WorldLock<'w> {
    fn drop(&mut self) { self.world.readers.fetch_sub(1, Ordering::AcqRel); }
}
