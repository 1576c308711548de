//! Archetypes are sets of entities which all contain exactly the same
//! set of component types.
//!
//! Entities in the same archetype have all of their components stored next
//! to each other and in the same order, so their components can be accessed
//! as zipped slices. All query filtering happens at the archetype level;
//! decisions are never made per-entity.

use std::ops::{Index, IndexMut};

use super::{
    column::Column,
    component::{Component, ComponentTypeId},
    signature::Signature,
    ComponentIndex, UnknownComponentStorage,
};
use crate::internals::entity::Entity;

/// The index of an archetype in a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ArchetypeIndex(pub u32);

impl Index<ArchetypeIndex> for [Archetype] {
    type Output = Archetype;

    fn index(&self, index: ArchetypeIndex) -> &Self::Output { &self[index.0 as usize] }
}

impl IndexMut<ArchetypeIndex> for [Archetype] {
    fn index_mut(&mut self, index: ArchetypeIndex) -> &mut Self::Output {
        &mut self[index.0 as usize]
    }
}

impl Index<ArchetypeIndex> for Vec<Archetype> {
    type Output = Archetype;

    fn index(&self, index: ArchetypeIndex) -> &Self::Output { &self[index.0 as usize] }
}

impl IndexMut<ArchetypeIndex> for Vec<Archetype> {
    fn index_mut(&mut self, index: ArchetypeIndex) -> &mut Self::Output {
        &mut self[index.0 as usize]
    }
}

/// An archetype is a collection of entities which all have identical component types.
///
/// Column `i` holds the components of the `i`th type of the signature, and row `r`
/// of every column belongs to `entities()[r]`.
#[derive(Debug)]
pub struct Archetype {
    index: ArchetypeIndex,
    signature: Signature,
    entities: Vec<Entity>,
    columns: Vec<Box<dyn UnknownComponentStorage>>,
}

impl Archetype {
    pub(crate) fn new(
        index: ArchetypeIndex,
        signature: Signature,
        columns: Vec<Box<dyn UnknownComponentStorage>>,
    ) -> Self {
        debug_assert_eq!(signature.len(), columns.len());
        Self {
            index,
            signature,
            entities: Vec::new(),
            columns,
        }
    }

    /// Returns the index of the archetype.
    pub fn index(&self) -> ArchetypeIndex { self.index }

    /// Returns the component types stored in the archetype.
    pub fn signature(&self) -> &Signature { &self.signature }

    /// Returns a slice of entity IDs for all entities which belong to the archetype.
    pub fn entities(&self) -> &[Entity] { &self.entities }

    /// Returns the number of rows in the archetype.
    pub fn len(&self) -> usize { self.entities.len() }

    /// Returns `true` if the archetype has no rows.
    pub fn is_empty(&self) -> bool { self.entities.is_empty() }

    /// Returns the column position of the given component type.
    pub fn column_index(&self, type_id: &ComponentTypeId) -> Option<usize> {
        self.signature.position(type_id)
    }

    /// Returns the type-erased column at `index`.
    pub fn column(&self, index: usize) -> &dyn UnknownComponentStorage {
        self.columns[index].as_ref()
    }

    pub(crate) fn column_mut(&mut self, index: usize) -> &mut dyn UnknownComponentStorage {
        self.columns[index].as_mut()
    }

    /// Returns the typed column at `index`, if it stores components of type `T`.
    pub fn column_of<T: Component>(&self, index: usize) -> Option<&Column<T>> {
        self.columns.get(index)?.downcast_ref::<Column<T>>()
    }

    pub(crate) fn column_of_mut<T: Component>(&mut self, index: usize) -> Option<&mut Column<T>> {
        self.columns.get_mut(index)?.downcast_mut::<Column<T>>()
    }

    /// Returns `true` if every column holds exactly one component per row.
    pub fn is_consistent(&self) -> bool {
        self.columns.iter().all(|c| c.len() == self.entities.len())
    }

    /// Builds empty columns for a signature, reusing this archetype's column
    /// types where they overlap. `extra` constructs the column for the one type
    /// this archetype does not have.
    pub(crate) fn columns_for(
        &self,
        signature: &Signature,
        extra: Option<fn() -> Box<dyn UnknownComponentStorage>>,
    ) -> Vec<Box<dyn UnknownComponentStorage>> {
        let columns: Vec<_> = signature
            .iter()
            .filter_map(|type_id| match self.column_index(type_id) {
                Some(i) => Some(self.columns[i].fresh()),
                None => extra.map(|build| build()),
            })
            .collect();
        debug_assert_eq!(columns.len(), signature.len());
        columns
    }

    pub(crate) fn push(&mut self, entity: Entity) -> ComponentIndex {
        self.entities.push(entity);
        ComponentIndex(self.entities.len() - 1)
    }

    /// Removes the entity column entry at `row`, returning the entity which was
    /// swapped into its place.
    pub(crate) fn swap_remove_entity(&mut self, ComponentIndex(row): ComponentIndex) -> Option<Entity> {
        self.entities.swap_remove(row);
        self.entities.get(row).copied()
    }

    /// Drops every component at `row` and removes the row, returning the entity
    /// which was swapped into its place.
    pub(crate) fn swap_remove(&mut self, row: ComponentIndex) -> Option<Entity> {
        for column in &mut self.columns {
            column.swap_remove(row);
        }
        self.swap_remove_entity(row)
    }
}
