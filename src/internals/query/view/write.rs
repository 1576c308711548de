use std::{marker::PhantomData, slice::Iter};

use parking_lot::RwLockWriteGuard;

use super::{next_column, IntoView, StreamType, View};
use crate::internals::{
    error::WorldError,
    storage::{
        archetype::Archetype,
        component::{Component, ComponentTypeId},
    },
};

/// Writes to a single component type in each row.
#[derive(Debug, Copy, Clone)]
pub struct Write<T>(PhantomData<fn() -> T>);

impl<T> Default for Write<T> {
    fn default() -> Self { Self(PhantomData) }
}

impl<T: Component> IntoView for Write<T> {
    type View = Self;
}

impl<T: Component> View for Write<T> {
    type Guard<'w> = RwLockWriteGuard<'w, Vec<T>> where Self: 'w;
    type Slice<'b> = &'b mut [T] where Self: 'b;

    #[inline]
    fn streams(out: &mut Vec<StreamType>) { out.push(StreamType::write(ComponentTypeId::of::<T>())); }

    fn lock<'w>(
        archetype: &'w Archetype,
        columns: &mut Iter<'_, usize>,
    ) -> Result<Self::Guard<'w>, WorldError> {
        let (type_id, column) = next_column::<T>(archetype, columns);
        column
            .try_write()
            .ok_or(WorldError::ComponentBorrowed(type_id))
    }

    #[inline]
    fn slice<'b, 'w>(guard: &'b mut Self::Guard<'w>) -> Self::Slice<'b>
    where
        Self: 'b,
    {
        guard.as_mut_slice()
    }
}
