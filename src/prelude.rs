//! Common imports for hosts and tests.

pub use crate::collection::{
    Collection, CollectionFlavor, CollectionKey, ManagedCollection, PersistentKind,
    PlainCollection,
};
pub use crate::config::{ElementProxyPolicy, ModelConfig};
pub use crate::core::{EntityClass, EntityKey, Identifier, ModelError, Object, ObjectRef, Value};
pub use crate::model::{DetachableModel, EntityModel, ModelState, ProvidedModel};
pub use crate::pointer::{DetachedProperties, PointerOwner, PointerTarget, PropertyPointer};
pub use crate::session::memory::{
    MemorySession, MemoryStore, Record, RequestScope, StoredElement,
};
pub use crate::session::{
    EntityMetadata, MetadataCatalog, UnitOfWork, UnitOfWorkProvider,
};
pub use crate::snapshot::ModelImage;
