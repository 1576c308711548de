//! Per-archetype column selection for a stream list.

use itertools::Itertools;
use smallvec::SmallVec;

use super::view::StreamType;
use crate::internals::storage::archetype::Archetype;

/// The columns of one archetype selected by a list of streams.
///
/// Each stream selects every column its expression matches. Plain streams match
/// at most one column, while wildcard streams may match several; the join then
/// yields one result per combination, in the archetype's column order.
#[derive(Debug)]
pub struct CrossJoin {
    rows: usize,
    candidates: SmallVec<[SmallVec<[usize; 2]>; 8]>,
}

impl CrossJoin {
    /// Selects the columns of `archetype` matched by `streams`.
    pub fn new(archetype: &Archetype, streams: &[StreamType]) -> Self {
        let signature = archetype.signature();
        let candidates = streams
            .iter()
            .map(|stream| signature.positions_matching(&stream.type_id).collect())
            .collect();
        Self {
            rows: archetype.len(),
            candidates,
        }
    }

    /// Returns the number of rows in each join result.
    pub fn rows(&self) -> usize { self.rows }

    /// Returns `true` if the join has no rows or some stream matched no column.
    ///
    /// Empty joins are skipped by every dispatch.
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.candidates.iter().any(|c| c.is_empty())
    }

    /// Returns the number of join results.
    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.candidates.iter().map(|c| c.len()).product()
        }
    }

    /// Iterates over each join result as one column index per stream.
    pub fn combinations(&self) -> Box<dyn Iterator<Item = Vec<usize>> + '_> {
        if self.is_empty() {
            Box::new(std::iter::empty())
        } else if self.candidates.is_empty() {
            Box::new(std::iter::once(Vec::new()))
        } else {
            Box::new(
                self.candidates
                    .iter()
                    .map(|c| c.iter().copied())
                    .multi_cartesian_product(),
            )
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::internals::{
        entity::Entity,
        storage::{
            archetype::ArchetypeIndex,
            column::Column,
            component::{ComponentTypeId, Target},
            signature::Signature,
        },
    };

    struct Likes;

    fn archetype(types: Vec<ComponentTypeId>, rows: u32) -> Archetype {
        let signature = Signature::new(types);
        let columns = signature.iter().map(|_| Column::<Likes>::boxed()).collect();
        let mut arch = Archetype::new(ArchetypeIndex(0), signature, columns);
        for i in 0..rows {
            arch.push(Entity::new(i, 0));
        }
        arch
    }

    #[test]
    fn wildcard_expands_per_target() {
        let a = Entity::new(10, 0);
        let b = Entity::new(11, 0);
        let arch = archetype(
            vec![
                ComponentTypeId::relation::<Likes>(a),
                ComponentTypeId::relation::<Likes>(b),
            ],
            2,
        );
        let streams = [StreamType::read(ComponentTypeId::matching::<Likes>(
            Target::AnyEntity,
        ))];
        let join = CrossJoin::new(&arch, &streams);
        assert_eq!(join.len(), 2);
        assert_eq!(
            join.combinations().collect::<Vec<_>>(),
            vec![vec![0], vec![1]]
        );

        let pair = [streams[0], streams[0]];
        assert_eq!(CrossJoin::new(&arch, &pair).combinations().count(), 4);
    }

    #[test]
    fn empty_archetype_is_skipped() {
        let arch = archetype(vec![ComponentTypeId::of::<Likes>()], 0);
        let streams = [StreamType::read(ComponentTypeId::of::<Likes>())];
        let join = CrossJoin::new(&arch, &streams);
        assert!(join.is_empty());
        assert_eq!(join.combinations().count(), 0);
    }

    #[test]
    fn no_streams_yields_one_result() {
        let arch = archetype(vec![], 3);
        let join = CrossJoin::new(&arch, &[]);
        assert_eq!(join.len(), 1);
        assert_eq!(join.combinations().collect::<Vec<_>>(), vec![Vec::<usize>::new()]);
    }
}
