//! Contains types related to entity components.

use std::{
    any::TypeId,
    cmp::Ordering,
    fmt::{Display, Formatter},
    hash::Hasher,
};

use crate::internals::entity::Entity;

/// The relation target carried by a [`ComponentTypeId`].
///
/// Stored components are either [`Plain`](Target::Plain) or target a specific
/// [`Entity`](Target::Entity). The remaining variants are wildcards which only
/// appear in query expressions.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Target {
    /// An ordinary component without a relation target.
    #[default]
    Plain,
    /// A relation to the given entity.
    Entity(Entity),
    /// Matches a relation to any entity.
    AnyEntity,
    /// Matches the plain component and relations to any entity.
    Any,
}

impl Target {
    /// Returns `true` if this target expands to more than one concrete target.
    pub fn is_wildcard(&self) -> bool { matches!(self, Target::AnyEntity | Target::Any) }

    /// Returns `true` if a component stored with target `stored` satisfies this target.
    pub fn matches(&self, stored: &Target) -> bool {
        match (self, stored) {
            (Target::Any, Target::Plain | Target::Entity(_)) => true,
            (Target::AnyEntity, Target::Entity(_)) => true,
            (a, b) => a == b,
        }
    }
}

/// A unique ID for a component type.
///
/// Relations share a Rust type but differ by target, so `Likes -> a` and
/// `Likes -> b` have distinct IDs.
#[derive(Copy, Clone, Debug)]
pub struct ComponentTypeId {
    pub(crate) type_id: TypeId,
    target: Target,
    name: &'static str,
}

impl ComponentTypeId {
    /// Constructs the component type ID for the given component type.
    pub fn of<T: Component>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            target: Target::Plain,
            name: std::any::type_name::<T>(),
        }
    }

    /// Constructs the ID of a relation of type `T` targeting `target`.
    pub fn relation<T: Component>(target: Entity) -> Self {
        Self::of::<T>().with_target(Target::Entity(target))
    }

    /// Constructs an ID which matches components of type `T` stored with a matching target.
    pub fn matching<T: Component>(target: Target) -> Self { Self::of::<T>().with_target(target) }

    /// Returns a copy of this ID with a different target.
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    /// Returns the internal TypeID of the component.
    pub fn type_id(&self) -> TypeId { self.type_id }

    /// Returns the relation target.
    pub fn target(&self) -> Target { self.target }

    /// Returns the Rust type name of the component.
    pub fn name(&self) -> &'static str { self.name }

    /// Returns `true` if this ID is a relation to a concrete entity.
    pub fn is_relation(&self) -> bool { matches!(self.target, Target::Entity(_)) }

    /// Returns `true` if this ID is a query wildcard.
    pub fn is_wildcard(&self) -> bool { self.target.is_wildcard() }

    /// Returns `true` if a stored component with ID `stored` satisfies this ID.
    pub fn matches(&self, stored: &ComponentTypeId) -> bool {
        self.type_id == stored.type_id && self.target.matches(&stored.target)
    }
}

impl std::hash::Hash for ComponentTypeId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.target.hash(state);
    }
}

impl PartialEq for ComponentTypeId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.target == other.target
    }
}

impl Eq for ComponentTypeId {}

impl PartialOrd for ComponentTypeId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for ComponentTypeId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.type_id
            .cmp(&other.type_id)
            .then_with(|| self.target.cmp(&other.target))
    }
}

impl Display for ComponentTypeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.target {
            Target::Plain => write!(f, "{}", self.name),
            Target::Entity(e) => write!(f, "{}->{}", self.name, e),
            Target::AnyEntity => write!(f, "{}->*", self.name),
            Target::Any => write!(f, "{}(*)", self.name),
        }
    }
}

/// A marker trait for all types which can be attached to an entity.
///
/// This trait has a blanket impl for all applicable types.
pub trait Component: 'static + Sized + Send + Sync {}

impl<T: 'static + Sized + Send + Sync> Component for T {}

#[cfg(test)]
mod test {
    use super::*;

    struct Likes;
    struct Pos;

    #[test]
    fn relation_ids_differ_by_target() {
        let a = Entity::new(0, 0);
        let b = Entity::new(1, 0);
        assert_ne!(ComponentTypeId::relation::<Likes>(a), ComponentTypeId::relation::<Likes>(b));
        assert_ne!(ComponentTypeId::of::<Likes>(), ComponentTypeId::relation::<Likes>(a));
        assert_eq!(ComponentTypeId::relation::<Likes>(a), ComponentTypeId::relation::<Likes>(a));
    }

    #[test]
    fn wildcard_matching() {
        let a = Entity::new(0, 0);
        let plain = ComponentTypeId::of::<Likes>();
        let rel = ComponentTypeId::relation::<Likes>(a);

        let any_entity = ComponentTypeId::matching::<Likes>(Target::AnyEntity);
        assert!(any_entity.matches(&rel));
        assert!(!any_entity.matches(&plain));

        let any = ComponentTypeId::matching::<Likes>(Target::Any);
        assert!(any.matches(&rel));
        assert!(any.matches(&plain));
        assert!(!any.matches(&ComponentTypeId::of::<Pos>()));

        assert!(plain.matches(&plain));
        assert!(!plain.matches(&rel));
    }
}
