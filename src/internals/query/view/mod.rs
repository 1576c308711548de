//! Defines all view types. Views declare which component streams a [query](super::Query)
//! exposes, and how each stream is borrowed from an archetype.

use std::slice::Iter;

use crate::internals::{
    entity::Entity,
    error::WorldError,
    storage::{
        archetype::Archetype,
        column::Column,
        component::{Component, ComponentTypeId},
    },
};

pub mod entity;
pub mod read;
pub mod write;

/// Converts a reference-style type such as `(&mut Pos, &Vel)` into its view.
pub trait IntoView {
    /// The view type.
    type View: View;
}

impl<'a, T: Component> IntoView for &'a T {
    type View = read::Read<T>;
}

impl<'a, T: Component> IntoView for &'a mut T {
    type View = write::Write<T>;
}

impl IntoView for Entity {
    type View = Entity;
}

/// How a stream accesses its column.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Access {
    /// Shared access; many streams may read the same column.
    Read,
    /// Exclusive access.
    Write,
}

/// One component stream of a view: the component expression it selects and how
/// it accesses the selected column.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct StreamType {
    pub(crate) type_id: ComponentTypeId,
    pub(crate) access: Access,
}

impl StreamType {
    /// A read stream of `type_id`.
    pub fn read(type_id: ComponentTypeId) -> Self {
        Self {
            type_id,
            access: Access::Read,
        }
    }

    /// A write stream of `type_id`.
    pub fn write(type_id: ComponentTypeId) -> Self {
        Self {
            type_id,
            access: Access::Write,
        }
    }

    /// Returns the component expression selected by the stream. This may be a wildcard.
    pub fn type_id(&self) -> ComponentTypeId { self.type_id }

    /// Returns the stream's access mode.
    pub fn access(&self) -> Access { self.access }
}

/// A type which can borrow entity data out of an archetype.
///
/// A view is locked once per join result, producing a guard which keeps the
/// borrowed columns locked. Slices are then taken from the guard for the duration
/// of a dispatch.
pub trait View: 'static {
    /// The column borrows held for one join result.
    type Guard<'w>
    where
        Self: 'w;
    /// Typed slices over the rows of one join result.
    type Slice<'b>: StreamSlice
    where
        Self: 'b;

    /// Appends the view's stream types, in slot order.
    fn streams(out: &mut Vec<StreamType>);

    /// Borrows the columns selected for this view. `columns` yields one column
    /// index per stream, in slot order.
    fn lock<'w>(
        archetype: &'w Archetype,
        columns: &mut Iter<'_, usize>,
    ) -> Result<Self::Guard<'w>, WorldError>;

    /// Produces slices from a locked guard.
    fn slice<'b, 'w>(guard: &'b mut Self::Guard<'w>) -> Self::Slice<'b>
    where
        Self: 'b;
}

/// The per-row item yielded by view `V`.
pub type Item<'b, V> = <<V as View>::Slice<'b> as StreamSlice>::Item;

/// A set of equally long slices which can be split into disjoint row ranges.
pub trait StreamSlice: Send + Sized {
    /// The item produced for each row.
    type Item;
    /// An iterator over the rows.
    type Rows: Iterator<Item = Self::Item>;

    /// Returns the number of rows.
    fn rows(&self) -> usize;

    /// Splits into rows `[0, mid)` and `[mid, rows)`.
    fn split(self, mid: usize) -> (Self, Self);

    /// Converts into an iterator over the rows.
    fn into_rows(self) -> Self::Rows;
}

impl<'b, T: Sync> StreamSlice for &'b [T] {
    type Item = &'b T;
    type Rows = std::slice::Iter<'b, T>;

    fn rows(&self) -> usize { <[T]>::len(self) }

    fn split(self, mid: usize) -> (Self, Self) { <[T]>::split_at(self, mid) }

    fn into_rows(self) -> Self::Rows { self.iter() }
}

impl<'b, T: Send> StreamSlice for &'b mut [T] {
    type Item = &'b mut T;
    type Rows = std::slice::IterMut<'b, T>;

    fn rows(&self) -> usize { <[T]>::len(self) }

    fn split(self, mid: usize) -> (Self, Self) { <[T]>::split_at_mut(self, mid) }

    fn into_rows(self) -> Self::Rows { self.iter_mut() }
}

/// Takes the next column index for a stream and resolves it to a typed column.
pub(crate) fn next_column<'w, T: Component>(
    archetype: &'w Archetype,
    columns: &mut Iter<'_, usize>,
) -> (ComponentTypeId, &'w Column<T>) {
    let index = *columns.next().expect("join yielded too few columns");
    let column = archetype
        .column_of::<T>(index)
        .expect("join selected a column of the wrong type");
    (archetype.signature().component_types()[index], column)
}

macro_rules! view_tuple {
    ($head_ty:ident) => {
        impl_view_tuple!($head_ty);
    };
    ($head_ty:ident, $( $tail_ty:ident ),*) => (
        impl_view_tuple!($head_ty, $( $tail_ty ),*);
        view_tuple!($( $tail_ty ),*);
    );
}

macro_rules! impl_view_tuple {
    ( $( $ty: ident ),* ) => {
        impl<$( $ty: IntoView ),*> IntoView for ($( $ty, )*) {
            type View = ($( $ty::View, )*);
        }

        impl<$( $ty: View ),*> View for ($( $ty, )*) {
            type Guard<'w> = ($( $ty::Guard<'w>, )*) where Self: 'w;
            type Slice<'b> = ($( $ty::Slice<'b>, )*) where Self: 'b;

            fn streams(out: &mut Vec<StreamType>) {
                $( $ty::streams(out); )*
            }

            fn lock<'w>(
                archetype: &'w Archetype,
                columns: &mut Iter<'_, usize>,
            ) -> Result<Self::Guard<'w>, WorldError> {
                Ok(($( $ty::lock(archetype, columns)?, )*))
            }

            #[allow(non_snake_case)]
            fn slice<'b, 'w>(guard: &'b mut Self::Guard<'w>) -> Self::Slice<'b>
            where
                Self: 'b,
            {
                let ($( $ty, )*) = guard;
                ($( <$ty as View>::slice($ty), )*)
            }
        }

        impl<$( $ty: StreamSlice ),*> StreamSlice for ($( $ty, )*) {
            type Item = ($( $ty::Item, )*);
            type Rows = itertools::Zip<($( $ty::Rows, )*)>;

            #[allow(non_snake_case)]
            fn rows(&self) -> usize {
                let ($( $ty, )*) = self;
                let mut rows = usize::MAX;
                $( rows = rows.min($ty.rows()); )*
                rows
            }

            #[allow(non_snake_case)]
            fn split(self, mid: usize) -> (Self, Self) {
                let ($( $ty, )*) = self;
                $( let $ty = $ty.split(mid); )*
                (($( $ty.0, )*), ($( $ty.1, )*))
            }

            #[allow(non_snake_case)]
            fn into_rows(self) -> Self::Rows {
                let ($( $ty, )*) = self;
                itertools::multizip(($( $ty.into_rows(), )*))
            }
        }
    };
}

view_tuple!(A, B, C, D, E, F, G, H);
