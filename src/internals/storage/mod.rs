//! Component storage: columns, archetypes and the archetype search index.

use component::Component;
use downcast_rs::{impl_downcast, Downcast};

pub mod archetype;
pub mod column;
pub mod component;
pub mod index;
pub mod signature;

/// Contains information about the type of a component.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ComponentMeta {
    name: &'static str,
    size: usize,
    align: usize,
}

impl ComponentMeta {
    /// Returns the component meta of component type `T`.
    pub fn of<T: Component>() -> Self {
        ComponentMeta {
            name: std::any::type_name::<T>(),
            size: std::mem::size_of::<T>(),
            align: std::mem::align_of::<T>(),
        }
    }

    /// Returns the type name of the component.
    pub fn name(&self) -> &'static str { self.name }

    /// Returns the size of the component.
    pub fn size(&self) -> usize { self.size }

    /// Returns the alignment of the component.
    pub fn align(&self) -> usize { self.align }
}

/// The index of a component within an archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct ComponentIndex(pub(crate) usize);

impl ComponentIndex {
    /// Returns the row number.
    pub fn row(&self) -> usize { self.0 }
}

/// A type-erased column of component data belonging to one archetype.
///
/// All structural operations require exclusive access to the column; shared
/// access is only used to lock the column for iteration.
pub trait UnknownComponentStorage: Downcast + Send + Sync {
    /// Returns the component metadata.
    fn meta(&self) -> ComponentMeta;

    /// Returns the number of components in the column. Never blocks on a dispatch borrow.
    fn len(&self) -> usize;

    /// Returns `true` if the column is empty.
    fn is_empty(&self) -> bool { self.len() == 0 }

    /// Drops the component at `index`, moving the last component into its place.
    fn swap_remove(&mut self, index: ComponentIndex);

    /// Moves the component at `index` onto the end of `dst`, moving the last component into its place.
    ///
    /// `dst` must be a column of the same component type.
    fn move_component(&mut self, index: ComponentIndex, dst: &mut dyn UnknownComponentStorage);

    /// Constructs a new empty column of the same component type.
    fn fresh(&self) -> Box<dyn UnknownComponentStorage>;
}
impl_downcast!(UnknownComponentStorage);

impl std::fmt::Debug for dyn UnknownComponentStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnknownComponentStorage")
            .field("component", &self.meta().name())
            .finish()
    }
}
