//! An index of archetype signatures used to accelerate query evaluation.

use super::{
    archetype::ArchetypeIndex,
    signature::{QueryFilter, Signature},
};

/// An index of archetype signatures used to accelerate query evaluation.
#[derive(Default, Debug)]
pub struct SearchIndex {
    signatures: Vec<Signature>,
}

impl SearchIndex {
    pub(crate) fn push(&mut self, signature: &Signature) { self.signatures.push(signature.clone()); }

    /// Returns the number of indexed archetypes.
    pub fn len(&self) -> usize { self.signatures.len() }

    /// Returns `true` if no archetypes are indexed.
    pub fn is_empty(&self) -> bool { self.signatures.is_empty() }

    /// Returns an iterator over archetype indexes for archetypes which match the given filter,
    /// starting from the given index.
    pub fn search_from<'a>(
        &'a self,
        filter: &'a QueryFilter,
        start: usize,
    ) -> impl Iterator<Item = ArchetypeIndex> + 'a {
        self.signatures
            .iter()
            .enumerate()
            .skip(start)
            .filter(move |(_, signature)| filter.matches(signature))
            .map(|(i, _)| ArchetypeIndex(i as u32))
    }

    /// Returns an iterator over archetype indexes for archetypes which match the given filter.
    pub fn search<'a>(&'a self, filter: &'a QueryFilter) -> impl Iterator<Item = ArchetypeIndex> + 'a {
        self.search_from(filter, 0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::internals::storage::component::ComponentTypeId;

    #[test]
    fn search_skips_earlier_archetypes() {
        let a = ComponentTypeId::of::<u8>();
        let b = ComponentTypeId::of::<u16>();
        let mut index = SearchIndex::default();
        index.push(&Signature::empty());
        index.push(&Signature::new([a]));
        index.push(&Signature::new([a, b]));

        let filter = QueryFilter::new(Signature::new([a]), Signature::empty());
        let all: Vec<_> = index.search(&filter).collect();
        assert_eq!(all, vec![ArchetypeIndex(1), ArchetypeIndex(2)]);
        let tail: Vec<_> = index.search_from(&filter, 2).collect();
        assert_eq!(tail, vec![ArchetypeIndex(2)]);
    }
}
