use super::{CollectionElements, CollectionKey, PersistentKind};
use crate::core::Result;
use crate::proxy::LazyLoader;
use std::fmt;
use std::sync::{Arc, RwLock};

struct ManagedState {
    key: CollectionKey,
    kind: PersistentKind,
    epoch: u64,
    elements: RwLock<Option<CollectionElements>>,
    loader: Arc<dyn LazyLoader>,
}

/// A collection owned by a unit of work, loaded from it at most once.
#[derive(Clone)]
pub struct ManagedCollection(Arc<ManagedState>);

impl ManagedCollection {
    /// An uninitialized collection. Construction never loads.
    pub fn lazy(
        key: CollectionKey,
        kind: PersistentKind,
        epoch: u64,
        loader: Arc<dyn LazyLoader>,
    ) -> Self {
        Self(Arc::new(ManagedState {
            key,
            kind,
            epoch,
            elements: RwLock::new(None),
            loader,
        }))
    }

    /// A collection whose elements are already loaded.
    pub fn initialized(
        key: CollectionKey,
        kind: PersistentKind,
        epoch: u64,
        elements: CollectionElements,
        loader: Arc<dyn LazyLoader>,
    ) -> Self {
        Self(Arc::new(ManagedState {
            key,
            kind,
            epoch,
            elements: RwLock::new(Some(elements)),
            loader,
        }))
    }

    pub fn key(&self) -> &CollectionKey {
        &self.0.key
    }

    pub fn kind(&self) -> PersistentKind {
        self.0.kind
    }

    pub fn epoch(&self) -> u64 {
        self.0.epoch
    }

    pub fn is_initialized(&self) -> bool {
        self.0
            .elements
            .read()
            .map(|elements| elements.is_some())
            .unwrap_or(false)
    }

    /// Loaded elements, if any. Never triggers a load.
    pub fn snapshot(&self) -> Option<CollectionElements> {
        self.0.elements.read().ok().and_then(|elements| elements.clone())
    }

    /// Returns the elements, loading them on first access.
    pub fn elements(&self) -> Result<CollectionElements> {
        if let Some(elements) = self.snapshot() {
            return Ok(elements);
        }
        let mut slot = self.0.elements.write()?;
        if let Some(elements) = slot.as_ref() {
            return Ok(elements.clone());
        }
        let loaded = self.0.loader.load_collection(&self.0.key, self.0.epoch)?;
        *slot = Some(loaded.clone());
        Ok(loaded)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.elements()?.len())
    }

    pub fn ptr_eq(&self, other: &ManagedCollection) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ManagedCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_initialized() {
            "initialized"
        } else {
            "uninitialized"
        };
        write!(f, "ManagedCollection({} {}, {})", self.0.kind, self.0.key, state)
    }
}
