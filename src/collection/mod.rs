//! Collection values: plain snapshots, lazy managed collections, and the
//! flavor table that converts between the two.

pub mod flavor;
pub mod managed;
pub mod plain;

pub use flavor::CollectionFlavor;
pub use managed::ManagedCollection;
pub use plain::PlainCollection;

use crate::core::{EntityClass, Identifier, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The persistent collection category reported by the unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PersistentKind {
    Bag,
    IdentifierBag,
    List,
    Array,
    Set,
    OrderedSet,
    SortedSet,
    Map,
    OrderedMap,
    SortedMap,
}

impl PersistentKind {
    pub fn is_map(&self) -> bool {
        matches!(self, Self::Map | Self::OrderedMap | Self::SortedMap)
    }
}

impl fmt::Display for PersistentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bag => "bag",
            Self::IdentifierBag => "idbag",
            Self::List => "list",
            Self::Array => "array",
            Self::Set => "set",
            Self::OrderedSet => "ordered-set",
            Self::SortedSet => "sorted-set",
            Self::Map => "map",
            Self::OrderedMap => "ordered-map",
            Self::SortedMap => "sorted-map",
        };
        f.write_str(name)
    }
}

/// Persistent identity of a collection: its role plus the owning entity's id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionKey {
    pub role: String,
    pub owner_id: Identifier,
}

impl CollectionKey {
    /// Builds the `"<OwnerClass>.<property>"` role for an owner property.
    pub fn of(owner_class: &EntityClass, owner_id: Identifier, property: &str) -> Self {
        Self {
            role: format!("{}.{}", owner_class, property),
            owner_id,
        }
    }

    pub fn owner_class(&self) -> EntityClass {
        match self.role.rsplit_once('.') {
            Some((class, _)) => EntityClass::new(class),
            None => EntityClass::new(self.role.as_str()),
        }
    }

    pub fn property(&self) -> &str {
        match self.role.rsplit_once('.') {
            Some((_, property)) => property,
            None => &self.role,
        }
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.role, self.owner_id)
    }
}

/// Contents of a collection, in iteration order.
#[derive(Debug, Clone)]
pub enum CollectionElements {
    Sequence(Vec<Value>),
    Entries(Vec<(Value, Value)>),
}

impl CollectionElements {
    pub fn len(&self) -> usize {
        match self {
            Self::Sequence(values) => values.len(),
            Self::Entries(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every contained value; map keys come before their values.
    pub fn values(&self) -> Vec<&Value> {
        match self {
            Self::Sequence(values) => values.iter().collect(),
            Self::Entries(entries) => entries.iter().flat_map(|(k, v)| [k, v]).collect(),
        }
    }

    pub fn values_mut(&mut self) -> Vec<&mut Value> {
        match self {
            Self::Sequence(values) => values.iter_mut().collect(),
            Self::Entries(entries) => entries
                .iter_mut()
                .flat_map(|(k, v)| [k, v])
                .collect(),
        }
    }
}

/// A collection-valued property: either plain data or still managed by a unit of work.
#[derive(Debug, Clone)]
pub enum Collection {
    Plain(PlainCollection),
    Managed(ManagedCollection),
}

impl Collection {
    pub fn flavor_tag(&self) -> &'static str {
        match self {
            Self::Plain(plain) => plain.flavor().name(),
            Self::Managed(_) => "managed",
        }
    }

    pub fn as_plain(&self) -> Option<&PlainCollection> {
        match self {
            Self::Plain(plain) => Some(plain),
            Self::Managed(_) => None,
        }
    }

    pub fn as_managed(&self) -> Option<&ManagedCollection> {
        match self {
            Self::Managed(managed) => Some(managed),
            Self::Plain(_) => None,
        }
    }
}

impl PartialEq for Collection {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Plain(a), Self::Plain(b)) => a == b,
            (Self::Managed(a), Self::Managed(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}
