//! The unit-of-work seam: what the detach machinery needs from an ORM session.

pub mod catalog;
pub mod memory;
pub mod metadata;

pub use catalog::MetadataCatalog;
pub use memory::{
    LoadStats, MemorySession, MemoryStore, Record, RequestScope, StoredElement, StoredValue,
};
pub use metadata::{EntityMetadata, PropertyDescriptor, PropertyKind};

use crate::collection::{CollectionKey, ManagedCollection, PersistentKind};
use crate::core::{EntityClass, Identifier, Result, Value};
use crate::proxy::EntityProxy;
use std::sync::Arc;

/// A live unit of work. The detach core only reads from it.
pub trait UnitOfWork {
    /// A reference to `class#id`. Must not initialize it.
    fn load(&self, class: &EntityClass, id: &Identifier) -> Result<EntityProxy>;

    /// Metadata for a managed class, `None` for plain classes.
    fn metadata(&self, class: &EntityClass) -> Option<Arc<EntityMetadata>>;

    fn is_initialized(&self, value: &Value) -> bool {
        value.is_initialized()
    }

    /// A lazy collection for `key`, bound to this unit of work. Must not load.
    fn lazy_collection(&self, key: CollectionKey, kind: PersistentKind)
    -> Result<ManagedCollection>;
}

/// Source of the unit of work scoped to the current request.
pub trait UnitOfWorkProvider {
    fn current(&self) -> Result<Arc<dyn UnitOfWork>>;
}

impl<P: UnitOfWorkProvider + ?Sized> UnitOfWorkProvider for &P {
    fn current(&self) -> Result<Arc<dyn UnitOfWork>> {
        (**self).current()
    }
}

impl<P: UnitOfWorkProvider + ?Sized> UnitOfWorkProvider for Arc<P> {
    fn current(&self) -> Result<Arc<dyn UnitOfWork>> {
        (**self).current()
    }
}
