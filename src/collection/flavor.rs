use super::{CollectionKey, ManagedCollection, PersistentKind, PlainCollection};
use crate::core::{EntityClass, Identifier, ModelError, Result};
use crate::session::UnitOfWork;
use serde::{Deserialize, Serialize};

/// Supported collection shapes.
///
/// Each flavor knows how to snapshot an initialized managed collection into a
/// [`PlainCollection`] and how to ask a unit of work for a fresh lazy one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionFlavor {
    List,
    Bag,
    Set,
    OrderedSet,
    SortedSet,
    Map,
    OrderedMap,
    SortedMap,
}

impl CollectionFlavor {
    pub fn name(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Bag => "bag",
            Self::Set => "set",
            Self::OrderedSet => "ordered-set",
            Self::SortedSet => "sorted-set",
            Self::Map => "map",
            Self::OrderedMap => "ordered-map",
            Self::SortedMap => "sorted-map",
        }
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Self::Map | Self::OrderedMap | Self::SortedMap)
    }

    pub fn is_sorted(&self) -> bool {
        matches!(self, Self::SortedSet | Self::SortedMap)
    }

    /// Sets and maps hold each element (or key) at most once.
    pub fn is_unique(&self) -> bool {
        !matches!(self, Self::List | Self::Bag)
    }

    /// Whether iteration order is part of the collection's value.
    pub fn is_order_significant(&self) -> bool {
        !matches!(self, Self::Set | Self::Map | Self::Bag)
    }

    pub fn persistent_kind(&self) -> PersistentKind {
        match self {
            Self::List => PersistentKind::List,
            Self::Bag => PersistentKind::Bag,
            Self::Set => PersistentKind::Set,
            Self::OrderedSet => PersistentKind::OrderedSet,
            Self::SortedSet => PersistentKind::SortedSet,
            Self::Map => PersistentKind::Map,
            Self::OrderedMap => PersistentKind::OrderedMap,
            Self::SortedMap => PersistentKind::SortedMap,
        }
    }

    /// Picks the flavor from the managed collection's concrete category.
    pub fn classify(collection: &ManagedCollection) -> Result<Self> {
        Self::from_kind(collection.kind()).ok_or_else(|| {
            ModelError::UnsupportedCollection(format!(
                "{} for role '{}'",
                collection.kind(),
                collection.key().role
            ))
        })
    }

    pub fn from_kind(kind: PersistentKind) -> Option<Self> {
        match kind {
            PersistentKind::List => Some(Self::List),
            PersistentKind::Bag => Some(Self::Bag),
            PersistentKind::Set => Some(Self::Set),
            PersistentKind::OrderedSet => Some(Self::OrderedSet),
            PersistentKind::SortedSet => Some(Self::SortedSet),
            PersistentKind::Map => Some(Self::Map),
            PersistentKind::OrderedMap => Some(Self::OrderedMap),
            PersistentKind::SortedMap => Some(Self::SortedMap),
            PersistentKind::Array | PersistentKind::IdentifierBag => None,
        }
    }

    /// Copies the already-loaded elements; never triggers a load.
    pub fn materialize(&self, collection: &ManagedCollection) -> Result<PlainCollection> {
        let elements = collection.snapshot().ok_or_else(|| {
            ModelError::PreconditionViolation(format!(
                "collection '{}' is not initialized and cannot be materialized",
                collection.key()
            ))
        })?;
        PlainCollection::from_elements(*self, elements)
    }

    /// A lazy collection for `owner_class.property` of `owner_id`, bound to `uow`.
    pub fn create_placeholder(
        &self,
        owner_class: &EntityClass,
        owner_id: Identifier,
        property: &str,
        uow: &dyn UnitOfWork,
    ) -> Result<ManagedCollection> {
        self.placeholder_for(CollectionKey::of(owner_class, owner_id, property), uow)
    }

    pub fn placeholder_for(
        &self,
        key: CollectionKey,
        uow: &dyn UnitOfWork,
    ) -> Result<ManagedCollection> {
        uow.lazy_collection(key, self.persistent_kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_flavor_maps_back_to_itself() {
        for flavor in [
            CollectionFlavor::List,
            CollectionFlavor::Bag,
            CollectionFlavor::Set,
            CollectionFlavor::OrderedSet,
            CollectionFlavor::SortedSet,
            CollectionFlavor::Map,
            CollectionFlavor::OrderedMap,
            CollectionFlavor::SortedMap,
        ] {
            assert_eq!(CollectionFlavor::from_kind(flavor.persistent_kind()), Some(flavor));
        }
    }

    #[test]
    fn test_arrays_and_idbags_have_no_flavor() {
        assert_eq!(CollectionFlavor::from_kind(PersistentKind::Array), None);
        assert_eq!(CollectionFlavor::from_kind(PersistentKind::IdentifierBag), None);
    }

    #[test]
    fn test_insertion_ordered_set_is_not_unordered() {
        assert!(CollectionFlavor::OrderedSet.is_order_significant());
        assert!(!CollectionFlavor::Set.is_order_significant());
    }
}
