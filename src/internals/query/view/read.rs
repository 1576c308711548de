use std::{marker::PhantomData, slice::Iter};

use parking_lot::RwLockReadGuard;

use super::{next_column, IntoView, StreamType, View};
use crate::internals::{
    error::WorldError,
    storage::{
        archetype::Archetype,
        component::{Component, ComponentTypeId},
    },
};

/// Reads a single component type from each row.
#[derive(Debug, Copy, Clone)]
pub struct Read<T>(PhantomData<fn() -> T>);

impl<T> Default for Read<T> {
    fn default() -> Self { Self(PhantomData) }
}

impl<T: Component> IntoView for Read<T> {
    type View = Self;
}

impl<T: Component> View for Read<T> {
    type Guard<'w> = RwLockReadGuard<'w, Vec<T>> where Self: 'w;
    type Slice<'b> = &'b [T] where Self: 'b;

    #[inline]
    fn streams(out: &mut Vec<StreamType>) { out.push(StreamType::read(ComponentTypeId::of::<T>())); }

    fn lock<'w>(
        archetype: &'w Archetype,
        columns: &mut Iter<'_, usize>,
    ) -> Result<Self::Guard<'w>, WorldError> {
        let (type_id, column) = next_column::<T>(archetype, columns);
        column
            .try_read()
            .ok_or(WorldError::ComponentBorrowed(type_id))
    }

    #[inline]
    fn slice<'b, 'w>(guard: &'b mut Self::Guard<'w>) -> Self::Slice<'b>
    where
        Self: 'b,
    {
        guard.as_slice()
    }
}
