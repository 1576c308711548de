//! Sequential and chunked parallel execution over locked query data.

use parking_lot::Mutex;
use tracing::{span, Level};

use super::{
    query::view::{Item, StreamSlice, View},
    world::WorldLock,
};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Runs independent units of work and blocks until all of them complete.
///
/// With the `parallel` feature the units run on a rayon pool: a pool dedicated
/// to the world when one was configured, otherwise the global pool. Without it
/// they run in order on the calling thread.
#[derive(Debug, Default)]
pub struct Dispatcher {
    #[cfg(feature = "parallel")]
    pool: Option<rayon::ThreadPool>,
}

impl Dispatcher {
    /// Creates a dispatcher with a dedicated pool of `threads` workers, or one
    /// using the global pool.
    #[cfg(feature = "parallel")]
    pub fn new(threads: Option<usize>) -> Self {
        let pool = threads.and_then(|threads| {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("warren-worker-{}", i))
                .build()
            {
                Ok(pool) => Some(pool),
                Err(err) => {
                    tracing::warn!(%err, threads, "failed to build worker pool, using the global pool");
                    None
                }
            }
        });
        Self { pool }
    }

    /// Creates a dispatcher which runs every unit on the calling thread.
    #[cfg(not(feature = "parallel"))]
    pub fn new(_: Option<usize>) -> Self { Self {} }

    /// Returns the number of threads units may run on.
    pub fn threads(&self) -> usize {
        #[cfg(feature = "parallel")]
        {
            self.pool
                .as_ref()
                .map(|pool| pool.current_num_threads())
                .unwrap_or_else(rayon::current_num_threads)
        }
        #[cfg(not(feature = "parallel"))]
        {
            1
        }
    }

    /// Runs `f` once for every unit.
    pub fn run<T, F>(&self, units: Vec<T>, f: F)
    where
        T: Send,
        F: Fn(T) + Send + Sync,
    {
        #[cfg(feature = "parallel")]
        match &self.pool {
            Some(pool) => pool.install(|| units.into_par_iter().for_each(f)),
            None => units.into_par_iter().for_each(f),
        }
        #[cfg(not(feature = "parallel"))]
        units.into_iter().for_each(f);
    }

    /// Runs `f` for every unit and returns the first error observed.
    ///
    /// Units which have not started once an error is recorded are skipped. Units
    /// already running finish before this returns.
    pub fn try_run<T, E, F>(&self, units: Vec<T>, f: F) -> Result<(), E>
    where
        T: Send,
        E: Send,
        F: Fn(T) -> Result<(), E> + Send + Sync,
    {
        let first = Mutex::new(None);
        self.run(units, |unit| {
            if first.lock().is_some() {
                return;
            }
            if let Err(err) = f(unit) {
                first.lock().get_or_insert(err);
            }
        });
        match first.into_inner() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Locked column borrows for every non-empty join result of a query.
///
/// Holds a [`WorldLock`] for its whole lifetime. Items yielded by the iteration
/// methods borrow from the guard, so each call gets exclusive use of the data.
pub struct QueryGuard<'w, V: View> {
    _lock: WorldLock<'w>,
    joins: Vec<(usize, V::Guard<'w>)>,
    chunk_size: usize,
    dispatcher: &'w Dispatcher,
}

impl<'w, V: View> QueryGuard<'w, V> {
    pub(crate) fn new(
        lock: WorldLock<'w>,
        joins: Vec<(usize, V::Guard<'w>)>,
        chunk_size: usize,
        dispatcher: &'w Dispatcher,
    ) -> Self {
        Self {
            _lock: lock,
            joins,
            chunk_size,
            dispatcher,
        }
    }

    /// Sets the maximum number of rows per unit of parallel work. Zero is treated as one.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Returns the maximum number of rows per unit of parallel work.
    pub fn chunk_size(&self) -> usize { self.chunk_size.max(1) }

    /// Returns the number of join results.
    pub fn join_count(&self) -> usize { self.joins.len() }

    /// Returns the total number of rows across all join results.
    pub fn len(&self) -> usize { self.joins.iter().map(|(rows, _)| rows).sum() }

    /// Returns `true` if there are no rows to visit.
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Returns the number of units of work a parallel dispatch will submit.
    pub fn unit_count(&self) -> usize {
        let chunk = self.chunk_size();
        self.joins
            .iter()
            .map(|(rows, _)| rows.div_ceil(chunk))
            .sum()
    }

    fn slices<'b>(&'b mut self) -> Vec<V::Slice<'b>> {
        self.joins
            .iter_mut()
            .map(|(_, guard)| V::slice(guard))
            .collect()
    }

    fn units<'b>(&'b mut self) -> Vec<V::Slice<'b>> {
        let chunk = self.chunk_size();
        let mut units = Vec::with_capacity(self.unit_count());
        for mut rest in self.slices() {
            while rest.rows() > chunk {
                let (head, tail) = rest.split(chunk);
                units.push(head);
                rest = tail;
            }
            units.push(rest);
        }
        units
    }

    /// Calls `f` once per row, in join order then row order, on the calling thread.
    pub fn for_each<'b, F>(&'b mut self, mut f: F)
    where
        F: FnMut(Item<'b, V>),
    {
        let span = span!(Level::TRACE, "for_each", joins = self.joins.len(), rows = self.len());
        let _guard = span.enter();
        for slice in self.slices() {
            slice.into_rows().for_each(&mut f);
        }
    }

    /// Like [`for_each`](Self::for_each), stopping at the first error.
    pub fn try_for_each<'b, E, F>(&'b mut self, mut f: F) -> Result<(), E>
    where
        F: FnMut(Item<'b, V>) -> Result<(), E>,
    {
        let span = span!(Level::TRACE, "try_for_each", joins = self.joins.len(), rows = self.len());
        let _guard = span.enter();
        for slice in self.slices() {
            slice.into_rows().try_for_each(&mut f)?;
        }
        Ok(())
    }

    /// Like [`for_each`](Self::for_each), passing a copy of `uniform` to every call.
    pub fn for_each_with<'b, U, F>(&'b mut self, uniform: U, mut f: F)
    where
        U: Copy,
        F: FnMut(Item<'b, V>, U),
    {
        self.for_each(|item| f(item, uniform));
    }

    /// Calls `f` once per join result with the slices of all its rows.
    pub fn for_each_join<'b, F>(&'b mut self, f: F)
    where
        F: FnMut(V::Slice<'b>),
    {
        self.slices().into_iter().for_each(f);
    }

    /// Calls `f` once per row, splitting every join result into units of at most
    /// [`chunk_size`](Self::chunk_size) rows which run on the worker pool.
    ///
    /// Blocks until every unit has finished.
    pub fn par_for_each<'b, F>(&'b mut self, f: F)
    where
        F: Fn(Item<'b, V>) + Send + Sync,
    {
        self.par_for_each_chunk(|unit| unit.into_rows().for_each(&f));
    }

    /// Like [`par_for_each`](Self::par_for_each), passing a copy of `uniform` to every call.
    pub fn par_for_each_with<'b, U, F>(&'b mut self, uniform: U, f: F)
    where
        U: Copy + Send + Sync,
        F: Fn(Item<'b, V>, U) + Send + Sync,
    {
        self.par_for_each_chunk(|unit| {
            for item in unit.into_rows() {
                f(item, uniform);
            }
        });
    }

    /// Like [`par_for_each`](Self::par_for_each) with a fallible action.
    ///
    /// Every running unit is joined before returning. If any call failed, the
    /// first error observed is returned.
    pub fn try_par_for_each<'b, E, F>(&'b mut self, f: F) -> Result<(), E>
    where
        E: Send,
        F: Fn(Item<'b, V>) -> Result<(), E> + Send + Sync,
    {
        let span = span!(Level::TRACE, "try_par_for_each", joins = self.joins.len(), rows = self.len());
        let _guard = span.enter();
        let dispatcher = self.dispatcher;
        let units = self.units();
        dispatcher.try_run(units, |unit| unit.into_rows().try_for_each(&f))
    }

    /// Calls `f` once per unit of work with the unit's slices.
    pub fn par_for_each_chunk<'b, F>(&'b mut self, f: F)
    where
        F: Fn(V::Slice<'b>) + Send + Sync,
    {
        let span = span!(
            Level::TRACE,
            "par_for_each",
            joins = self.joins.len(),
            rows = self.len(),
            chunk_size = self.chunk_size()
        );
        let _guard = span.enter();
        let dispatcher = self.dispatcher;
        let units = self.units();
        dispatcher.run(units, f);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        thread,
        time::Duration,
    };

    #[test]
    fn run_visits_every_unit() {
        let dispatcher = Dispatcher::new(Some(2));
        let sum = AtomicUsize::new(0);
        dispatcher.run((1..=100).collect(), |n: usize| {
            sum.fetch_add(n, Ordering::Relaxed);
        });
        assert_eq!(sum.into_inner(), 5050);
    }

    #[test]
    fn try_run_reports_an_error() {
        let dispatcher = Dispatcher::default();
        let result = dispatcher.try_run((0..64).collect(), |n: usize| {
            if n == 13 {
                Err(n)
            } else {
                Ok(())
            }
        });
        assert_eq!(result, Err(13));
        assert_eq!(dispatcher.try_run(vec![1, 2], |_: i32| Ok::<(), ()>(())), Ok(()));
    }

    #[test]
    fn try_run_joins_running_units() {
        let dispatcher = Dispatcher::new(Some(4));
        let started = AtomicUsize::new(0);
        let finished = AtomicUsize::new(0);
        let result = dispatcher.try_run((0..32).collect(), |n: usize| {
            started.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                finished.fetch_add(1, Ordering::SeqCst);
                return Err(n);
            }
            thread::sleep(Duration::from_millis(5));
            finished.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert_eq!(result, Err(0));
        let started = started.load(Ordering::SeqCst);
        assert!(started >= 1);
        assert_eq!(finished.load(Ordering::SeqCst), started);
    }
}
