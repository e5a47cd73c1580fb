//! Lazily-initialized single-valued references.

use crate::collection::{CollectionElements, CollectionKey};
use crate::core::{EntityKey, ObjectRef, Result};
use std::fmt;
use std::sync::{Arc, RwLock};

/// The loading half of a unit of work, held by every lazy value it hands out.
pub trait LazyLoader: Send + Sync {
    /// Loads the entity behind a reference.
    fn load_entity(&self, key: &EntityKey) -> Result<ObjectRef>;

    /// Loads the elements of a lazy collection wired at `epoch`.
    fn load_collection(&self, key: &CollectionKey, epoch: u64) -> Result<CollectionElements>;
}

struct LazyReference {
    key: EntityKey,
    target: RwLock<Option<ObjectRef>>,
    loader: Arc<dyn LazyLoader>,
}

/// Placeholder for an entity that may not be loaded yet.
///
/// The key is always readable without a load, which is what lets a detach
/// turn the proxy into a pointer.
#[derive(Clone)]
pub struct EntityProxy(Arc<LazyReference>);

impl EntityProxy {
    pub fn new(key: EntityKey, loader: Arc<dyn LazyLoader>) -> Self {
        Self(Arc::new(LazyReference {
            key,
            target: RwLock::new(None),
            loader,
        }))
    }

    /// A proxy whose target is already known.
    pub fn resolved(key: EntityKey, target: ObjectRef, loader: Arc<dyn LazyLoader>) -> Self {
        Self(Arc::new(LazyReference {
            key,
            target: RwLock::new(Some(target)),
            loader,
        }))
    }

    pub fn key(&self) -> &EntityKey {
        &self.0.key
    }

    pub fn is_initialized(&self) -> bool {
        self.0
            .target
            .read()
            .map(|target| target.is_some())
            .unwrap_or(false)
    }

    /// The loaded target, if any. Never triggers a load.
    pub fn implementation(&self) -> Option<ObjectRef> {
        self.0.target.read().ok().and_then(|target| target.clone())
    }

    /// Returns the target, loading it through the bound unit of work on first use.
    pub fn initialize(&self) -> Result<ObjectRef> {
        if let Some(target) = self.implementation() {
            return Ok(target);
        }
        let loaded = self.0.loader.load_entity(&self.0.key)?;
        let mut target = self.0.target.write()?;
        Ok(target.get_or_insert(loaded).clone())
    }

    pub fn ptr_eq(&self, other: &EntityProxy) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for EntityProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_initialized() {
            "initialized"
        } else {
            "uninitialized"
        };
        write!(f, "EntityProxy({}, {})", self.0.key, state)
    }
}
