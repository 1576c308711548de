use std::slice::Iter;

use super::{StreamType, View};
use crate::internals::{entity::Entity, error::WorldError, storage::archetype::Archetype};

impl View for Entity {
    type Guard<'w> = &'w [Entity];
    type Slice<'b> = &'b [Entity];

    #[inline]
    fn streams(_: &mut Vec<StreamType>) {}

    #[inline]
    fn lock<'w>(
        archetype: &'w Archetype,
        _: &mut Iter<'_, usize>,
    ) -> Result<Self::Guard<'w>, WorldError> {
        Ok(archetype.entities())
    }

    #[inline]
    fn slice<'b, 'w>(guard: &'b mut Self::Guard<'w>) -> Self::Slice<'b>
    where
        Self: 'b,
    {
        *guard
    }
}
