//! Canonical sets of component types.

use std::fmt::{Display, Formatter};

use itertools::Itertools;
use smallvec::SmallVec;

use super::component::{ComponentTypeId, Target};
use crate::internals::entity::Entity;

/// An ordered, deduplicated set of component type IDs.
///
/// Signatures built from the same set of types are equal regardless of the order
/// the types were supplied in. A signature is immutable; the `with` and `without`
/// methods return new signatures.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature(SmallVec<[ComponentTypeId; 8]>);

impl Signature {
    /// Constructs a signature from the given component types.
    pub fn new(types: impl IntoIterator<Item = ComponentTypeId>) -> Self {
        let mut types: SmallVec<[ComponentTypeId; 8]> = types.into_iter().collect();
        types.sort_unstable();
        types.dedup();
        Self(types)
    }

    /// The signature of an entity with no components.
    pub fn empty() -> Self { Self::default() }

    /// Returns a new signature which also contains `type_id`.
    pub fn with(&self, type_id: ComponentTypeId) -> Self {
        let mut types = self.0.clone();
        if let Err(i) = types.binary_search(&type_id) {
            types.insert(i, type_id);
        }
        Self(types)
    }

    /// Returns a new signature which does not contain `type_id`.
    pub fn without(&self, type_id: ComponentTypeId) -> Self {
        let mut types = self.0.clone();
        if let Ok(i) = types.binary_search(&type_id) {
            types.remove(i);
        }
        Self(types)
    }

    /// Returns a new signature with every type in `removed` taken out.
    pub fn without_all(&self, removed: &[ComponentTypeId]) -> Self {
        Self(
            self.0
                .iter()
                .filter(|t| !removed.contains(t))
                .copied()
                .collect(),
        )
    }

    /// Returns the component types in canonical order.
    pub fn component_types(&self) -> &[ComponentTypeId] { &self.0 }

    /// Returns an iterator over the component types in canonical order.
    pub fn iter(&self) -> std::slice::Iter<'_, ComponentTypeId> { self.0.iter() }

    /// Returns the number of component types in the signature.
    pub fn len(&self) -> usize { self.0.len() }

    /// Returns `true` if the signature has no component types.
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Returns `true` if the signature contains exactly `type_id`.
    pub fn contains(&self, type_id: &ComponentTypeId) -> bool {
        self.0.binary_search(type_id).is_ok()
    }

    /// Returns the position of `type_id` within the signature.
    pub fn position(&self, type_id: &ComponentTypeId) -> Option<usize> {
        self.0.binary_search(type_id).ok()
    }

    /// Returns `true` if any component type in the signature satisfies `expr`.
    ///
    /// `expr` may be a wildcard.
    pub fn matches(&self, expr: &ComponentTypeId) -> bool {
        if expr.is_wildcard() {
            self.0.iter().any(|t| expr.matches(t))
        } else {
            self.contains(expr)
        }
    }

    /// Returns the positions of all component types satisfying `expr`, in canonical order.
    pub fn positions_matching<'a>(
        &'a self,
        expr: &'a ComponentTypeId,
    ) -> impl Iterator<Item = usize> + 'a {
        self.0
            .iter()
            .positions(move |t| expr.matches(t))
    }

    /// Returns all relation types which target `entity`.
    pub fn relations_targeting(&self, entity: Entity) -> SmallVec<[ComponentTypeId; 4]> {
        self.0
            .iter()
            .filter(|t| t.target() == Target::Entity(entity))
            .copied()
            .collect()
    }

    /// Returns `true` if every type in `other` is contained in this signature.
    pub fn is_superset(&self, other: &Signature) -> bool {
        other.iter().all(|t| self.contains(t))
    }

    /// Returns `true` if every type in this signature is contained in `other`.
    pub fn is_subset(&self, other: &Signature) -> bool { other.is_superset(self) }

    /// Returns `true` if the signatures share at least one component type.
    pub fn intersects(&self, other: &Signature) -> bool { self.iter().any(|t| other.contains(t)) }
}

impl FromIterator<ComponentTypeId> for Signature {
    fn from_iter<I: IntoIterator<Item = ComponentTypeId>>(iter: I) -> Self { Self::new(iter) }
}

impl<'a> IntoIterator for &'a Signature {
    type Item = &'a ComponentTypeId;
    type IntoIter = std::slice::Iter<'a, ComponentTypeId>;

    fn into_iter(self) -> Self::IntoIter { self.iter() }
}

impl Display for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.0.iter().join(", "))
    }
}

/// Selects archetypes by the component types they must and must not contain.
///
/// Both halves may contain wildcard expressions. Equal filters share one cached
/// query state within a world.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct QueryFilter {
    all: Signature,
    none: Signature,
}

impl QueryFilter {
    /// Constructs a filter requiring every expression in `all` and rejecting any in `none`.
    pub fn new(all: Signature, none: Signature) -> Self { Self { all, none } }

    /// Returns the required component expressions.
    pub fn required(&self) -> &Signature { &self.all }

    /// Returns the excluded component expressions.
    pub fn excluded(&self) -> &Signature { &self.none }

    /// Returns `true` if an archetype with the given signature satisfies the filter.
    pub fn matches(&self, signature: &Signature) -> bool {
        self.all.iter().all(|expr| signature.matches(expr))
            && !self.none.iter().any(|expr| signature.matches(expr))
    }
}
