//! Densely packed per-archetype component columns.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{component::Component, ComponentIndex, ComponentMeta, UnknownComponentStorage};

/// A contiguous vector of components of type `T` for a single archetype.
///
/// The data sits behind a lock so that dispatches can borrow columns through a
/// shared world reference; structural changes bypass the lock through `&mut self`.
/// The row count is mirrored outside the lock, since only `&mut self` can change it.
#[derive(Debug)]
pub struct Column<T: Component> {
    data: RwLock<Vec<T>>,
    len: usize,
}

impl<T: Component> Default for Column<T> {
    fn default() -> Self {
        Self {
            data: RwLock::new(Vec::new()),
            len: 0,
        }
    }
}

impl<T: Component> Column<T> {
    pub(crate) fn boxed() -> Box<dyn UnknownComponentStorage> { Box::new(Self::default()) }

    pub(crate) fn push(&mut self, value: T) {
        self.data.get_mut().push(value);
        self.len += 1;
    }

    pub(crate) fn swap_remove_take(&mut self, ComponentIndex(index): ComponentIndex) -> T {
        let value = self.data.get_mut().swap_remove(index);
        self.len -= 1;
        value
    }

    /// Returns a mutable reference to the component at `index`.
    pub fn get_mut(&mut self, ComponentIndex(index): ComponentIndex) -> Option<&mut T> {
        self.data.get_mut().get_mut(index)
    }

    /// Borrows the column for reading, failing if it is mutably borrowed.
    ///
    /// Recursive read borrows on the same thread always succeed.
    pub fn try_read(&self) -> Option<RwLockReadGuard<'_, Vec<T>>> {
        self.data.try_read_recursive()
    }

    /// Borrows the column for writing, failing if it is borrowed at all.
    pub fn try_write(&self) -> Option<RwLockWriteGuard<'_, Vec<T>>> { self.data.try_write() }
}

impl<T: Component> UnknownComponentStorage for Column<T> {
    fn meta(&self) -> ComponentMeta { ComponentMeta::of::<T>() }

    fn len(&self) -> usize { self.len }

    fn swap_remove(&mut self, index: ComponentIndex) { drop(self.swap_remove_take(index)); }

    fn move_component(&mut self, index: ComponentIndex, dst: &mut dyn UnknownComponentStorage) {
        let dst = dst
            .downcast_mut::<Self>()
            .expect("component column type mismatch");
        let value = self.swap_remove_take(index);
        dst.push(value);
    }

    fn fresh(&self) -> Box<dyn UnknownComponentStorage> { Self::boxed() }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn move_between_columns() {
        let mut a = Column::<usize>::default();
        let mut b = a.fresh();
        a.push(1);
        a.push(2);
        a.push(3);

        a.move_component(ComponentIndex(0), b.as_mut());
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 1);
        assert_eq!(*a.try_read().unwrap(), vec![3, 2]);
        assert_eq!(
            *b.downcast_ref::<Column<usize>>().unwrap().try_read().unwrap(),
            vec![1]
        );
    }

    #[test]
    fn borrow_rules() {
        let column = Column::<u8>::default();
        let read = column.try_read();
        assert!(read.is_some());
        assert!(column.try_read().is_some());
        assert!(column.try_write().is_none());
        drop(read);
        let write = column.try_write();
        assert!(write.is_some());
        assert!(column.try_read().is_none());
    }

    #[test]
    fn len_while_write_borrowed() {
        let mut column = Column::<u8>::default();
        column.push(1);
        column.push(2);
        let write = column.try_write().unwrap();
        assert_eq!(UnknownComponentStorage::len(&column), 2);
        drop(write);
    }
}
