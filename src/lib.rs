// ============================================================================
// lazymodel
// ============================================================================

//! Detachable models over lazily-loaded entity graphs.
//!
//! An [`EntityModel`] holds an entity graph between requests. Detaching it
//! walks the graph, turns every unloaded reference and collection into a
//! [`PropertyPointer`], and keeps a plain copy. Attaching it to the next
//! request's unit of work turns the pointers back into lazy values without
//! loading them.
//!
//! ```
//! use lazymodel::prelude::*;
//!
//! # fn main() -> lazymodel::Result<()> {
//! let catalog = MetadataCatalog::new()
//!     .with_entity(EntityMetadata::new("Customer", "id").scalar("name").association("address"))?
//!     .with_entity(EntityMetadata::new("Address", "id").scalar("city"))?;
//! let store = MemoryStore::new(catalog);
//! store.insert("Address", 5, Record::new().scalar("city", "Leiden"))?;
//! store.insert(
//!     "Customer",
//!     1,
//!     Record::new()
//!         .scalar("name", "Ann")
//!         .reference("address", Some(EntityKey::new("Address", 5))),
//! )?;
//!
//! let first = store.open_session();
//! let mut model = EntityModel::new(Value::Object(first.get("Customer", 1)?));
//! model.detach(&first)?;
//! first.close();
//!
//! let second = store.open_session();
//! let customer = model.object(&second)?;
//! let address = customer.as_object().unwrap().get("address")?;
//! assert!(!address.is_initialized());
//! # Ok(())
//! # }
//! ```

pub mod attach;
pub mod collection;
pub mod config;
pub mod copier;
pub mod core;
pub mod model;
pub mod pointer;
pub mod prelude;
pub mod proxy;
pub mod session;
pub mod snapshot;
pub mod walker;

pub use attach::Attacher;
pub use config::{ElementProxyPolicy, ModelConfig};
pub use crate::core::{EntityClass, EntityKey, Identifier, ModelError, Object, ObjectRef, Result, Value};
pub use model::{DetachableModel, EntityModel, ModelState, ProvidedModel};
pub use pointer::{DetachedProperties, PropertyPointer};
pub use session::{UnitOfWork, UnitOfWorkProvider};
pub use snapshot::ModelImage;
pub use walker::ObjectWalker;
