//! Lightweight pointers standing in for lazy values in a detached graph.

use crate::collection::{CollectionFlavor, CollectionKey};
use crate::core::{EntityClass, EntityKey, Identifier, ObjectId, ObjectRef};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The object a pointer belongs to. `id` is `None` for plain (non-entity)
/// owners and for entities that have no identifier yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointerOwner {
    pub class: EntityClass,
    pub id: Option<Identifier>,
}

impl PointerOwner {
    pub fn new(class: EntityClass, id: Option<Identifier>) -> Self {
        Self { class, id }
    }
}

impl fmt::Display for PointerOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}#{}", self.class, id),
            None => write!(f, "{}#?", self.class),
        }
    }
}

/// What an unresolved property pointed at when it was detached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerTarget {
    /// A single-valued lazy reference.
    Reference(EntityKey),
    /// A lazy collection of a given flavor.
    Collection {
        flavor: CollectionFlavor,
        key: CollectionKey,
    },
}

/// One property of one owner that was lazily unresolved at detach time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyPointer {
    owner: PointerOwner,
    property: String,
    target: PointerTarget,
}

impl PropertyPointer {
    pub fn reference(owner: PointerOwner, property: impl Into<String>, target: EntityKey) -> Self {
        Self {
            owner,
            property: property.into(),
            target: PointerTarget::Reference(target),
        }
    }

    pub fn collection(
        owner: PointerOwner,
        property: impl Into<String>,
        flavor: CollectionFlavor,
        key: CollectionKey,
    ) -> Self {
        Self {
            owner,
            property: property.into(),
            target: PointerTarget::Collection { flavor, key },
        }
    }

    pub fn owner(&self) -> &PointerOwner {
        &self.owner
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn target(&self) -> &PointerTarget {
        &self.target
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.target, PointerTarget::Collection { .. })
    }

    /// Owner class, owner id and property all match.
    pub fn same_slot(&self, other: &PropertyPointer) -> bool {
        self.owner == other.owner && self.property == other.property
    }
}

impl fmt::Display for PropertyPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            PointerTarget::Reference(key) => {
                write!(f, "{}.{} -> {}", self.owner, self.property, key)
            }
            PointerTarget::Collection { flavor, key } => {
                write!(f, "{}.{} -> {} {}", self.owner, self.property, flavor.name(), key)
            }
        }
    }
}

/// Receives pointers as the walker produces them.
pub trait PointerSink {
    fn record(&mut self, owner: &ObjectRef, pointer: PropertyPointer);
}

struct OwnerPointers {
    owner: ObjectRef,
    pointers: Vec<PropertyPointer>,
}

/// Pointers grouped by owning object, keyed by identity rather than value.
///
/// Each entry keeps its owner handle alive, so an identity can never be
/// reused by another object while the map holds it.
#[derive(Default)]
pub struct DetachedProperties {
    entries: HashMap<ObjectId, OwnerPointers>,
    order: Vec<ObjectId>,
}

impl DetachedProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pointer; an existing pointer for the same owner property is replaced.
    pub fn add(&mut self, owner: &ObjectRef, pointer: PropertyPointer) {
        let id = owner.id();
        let entry = self.entries.entry(id).or_insert_with(|| {
            self.order.push(id);
            OwnerPointers {
                owner: owner.clone(),
                pointers: Vec::new(),
            }
        });
        entry
            .pointers
            .retain(|existing| existing.property != pointer.property);
        entry.pointers.push(pointer);
    }

    pub fn pointer_for(&self, owner: &ObjectRef, property: &str) -> Option<&PropertyPointer> {
        self.entries
            .get(&owner.id())
            .and_then(|entry| entry.pointers.iter().find(|p| p.property == property))
    }

    pub fn pointers_of(&self, owner: &ObjectRef) -> &[PropertyPointer] {
        self.entries
            .get(&owner.id())
            .map(|entry| entry.pointers.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains_owner(&self, owner: &ObjectRef) -> bool {
        self.entries.contains_key(&owner.id())
    }

    /// Owners with their pointers, in the order owners were first recorded.
    pub fn iter(&self) -> impl Iterator<Item = (&ObjectRef, &[PropertyPointer])> {
        self.order.iter().filter_map(|id| {
            self.entries
                .get(id)
                .map(|entry| (&entry.owner, entry.pointers.as_slice()))
        })
    }

    pub fn owners(&self) -> Vec<ObjectRef> {
        self.iter().map(|(owner, _)| owner.clone()).collect()
    }

    pub fn remove(&mut self, owner: &ObjectRef, property: &str) -> Option<PropertyPointer> {
        let id = owner.id();
        let entry = self.entries.get_mut(&id)?;
        let position = entry.pointers.iter().position(|p| p.property == property)?;
        let removed = entry.pointers.remove(position);
        if entry.pointers.is_empty() {
            self.entries.remove(&id);
            self.order.retain(|candidate| *candidate != id);
        }
        Some(removed)
    }

    /// Total number of pointers across all owners.
    pub fn len(&self) -> usize {
        self.entries.values().map(|entry| entry.pointers.len()).sum()
    }

    pub fn owner_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn collection_count(&self) -> usize {
        self.entries
            .values()
            .flat_map(|entry| entry.pointers.iter())
            .filter(|p| p.is_collection())
            .count()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

impl PointerSink for DetachedProperties {
    fn record(&mut self, owner: &ObjectRef, pointer: PropertyPointer) {
        self.add(owner, pointer);
    }
}

impl fmt::Debug for DetachedProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (owner, pointers) in self.iter() {
            let rendered: Vec<String> = pointers.iter().map(ToString::to_string).collect();
            map.entry(owner, &rendered);
        }
        map.finish()
    }
}
