//! Entity handles and the index which maps them to their storage location.

use std::fmt::{Display, Formatter};

use super::storage::{archetype::ArchetypeIndex, ComponentIndex};

/// An opaque identifier for an entity.
///
/// The `index` of a destroyed entity is recycled by later spawns, while the
/// `generation` is incremented on every reuse so that stale handles can be
/// detected.
#[derive(Debug, Copy, Clone, Ord, PartialOrd, PartialEq, Eq, Hash)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    pub(crate) fn new(index: u32, generation: u32) -> Self { Self { index, generation } }

    /// Returns the slot index of the entity.
    pub fn index(&self) -> u32 { self.index }

    /// Returns the generation of the entity's slot at the time the handle was created.
    pub fn generation(&self) -> u32 { self.generation }
}

impl Display for Entity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// The storage location of an entity's data.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EntityLocation(pub(crate) ArchetypeIndex, pub(crate) ComponentIndex);

impl EntityLocation {
    /// Constructs a new entity location.
    pub fn new(archetype: ArchetypeIndex, component: ComponentIndex) -> Self {
        EntityLocation(archetype, component)
    }

    /// Returns the entity's archetype index.
    pub fn archetype(&self) -> ArchetypeIndex { self.0 }

    /// Returns the entity's component index within its archetype.
    pub fn component(&self) -> ComponentIndex { self.1 }
}

#[derive(Debug, Copy, Clone, Default)]
struct Slot {
    generation: u32,
    location: Option<EntityLocation>,
}

/// Allocates entity handles and maps live entities to their storage locations.
#[derive(Debug, Default)]
pub struct LocationMap {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
}

impl LocationMap {
    /// Returns the number of live entities in the map.
    pub fn len(&self) -> usize { self.len }

    /// Returns `true` if the location map is empty.
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Returns `true` if the location map contains the given entity.
    pub fn contains(&self, entity: Entity) -> bool { self.get(entity).is_some() }

    /// Reserves a slot and returns a handle for it. Recycled slots are preferred.
    ///
    /// The entity does not count as alive until a location is assigned with [`set`](Self::set).
    pub(crate) fn allocate(&mut self) -> Entity {
        if let Some(index) = self.free.pop() {
            let slot = &self.slots[index as usize];
            Entity::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot::default());
            Entity::new(index, 0)
        }
    }

    /// Updates the location of a live entity, or makes a freshly allocated entity live.
    pub(crate) fn set(&mut self, entity: Entity, location: EntityLocation) {
        let slot = &mut self.slots[entity.index as usize];
        debug_assert_eq!(slot.generation, entity.generation);
        if slot.location.replace(location).is_none() {
            self.len += 1;
        }
    }

    /// Returns the location of an entity, or `None` if the handle is stale.
    pub fn get(&self, entity: Entity) -> Option<EntityLocation> {
        self.slots
            .get(entity.index as usize)
            .filter(|slot| slot.generation == entity.generation)
            .and_then(|slot| slot.location)
    }

    /// Removes an entity from the location map and retires its handle.
    pub(crate) fn remove(&mut self, entity: Entity) -> Option<EntityLocation> {
        let slot = self.slots.get_mut(entity.index as usize)?;
        if slot.generation != entity.generation {
            return None;
        }
        let location = slot.location.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(entity.index);
        self.len -= 1;
        Some(location)
    }

    /// Iterates over all live entities and their locations, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, EntityLocation)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.location
                .map(|loc| (Entity::new(i as u32, slot.generation), loc))
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn loc(arch: u32, row: usize) -> EntityLocation {
        EntityLocation::new(ArchetypeIndex(arch), ComponentIndex(row))
    }

    #[test]
    fn allocate_set_get() {
        let mut map = LocationMap::default();
        let a = map.allocate();
        let b = map.allocate();
        assert_ne!(a, b);
        assert!(!map.contains(a));

        map.set(a, loc(0, 0));
        map.set(b, loc(0, 1));
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(b), Some(loc(0, 1)));

        map.set(b, loc(3, 0));
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(b), Some(loc(3, 0)));
    }

    #[test]
    fn reuse_bumps_generation() {
        let mut map = LocationMap::default();
        let a = map.allocate();
        map.set(a, loc(0, 0));
        assert_eq!(map.remove(a), Some(loc(0, 0)));
        assert_eq!(map.remove(a), None);
        assert!(map.is_empty());

        let b = map.allocate();
        assert_eq!(b.index(), a.index());
        assert_eq!(b.generation(), a.generation() + 1);
        map.set(b, loc(1, 0));
        assert!(!map.contains(a));
        assert!(map.contains(b));
    }

    #[test]
    fn display() {
        assert_eq!(Entity::new(4, 2).to_string(), "4v2");
    }
}
