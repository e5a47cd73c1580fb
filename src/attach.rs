//! Re-binding detached pointers to a live unit of work.

use crate::collection::Collection;
use crate::core::{ObjectRef, Result, Value};
use crate::pointer::{DetachedProperties, PointerTarget, PropertyPointer};
use crate::session::UnitOfWork;
use crate::walker::write_property;

pub struct Attacher<'a> {
    uow: &'a dyn UnitOfWork,
}

impl<'a> Attacher<'a> {
    pub fn new(uow: &'a dyn UnitOfWork) -> Self {
        Self { uow }
    }

    /// Writes an uninitialized reference into every field that had a reference
    /// pointer, and removes each pointer once its field holds the reference.
    ///
    /// Stops at the first pointer the unit of work cannot resolve; pointers
    /// already restored stay removed.
    pub fn restore_scalars(&self, properties: &mut DetachedProperties) -> Result<usize> {
        let scalars: Vec<(ObjectRef, PropertyPointer)> = properties
            .iter()
            .flat_map(|(owner, pointers)| {
                pointers
                    .iter()
                    .filter(|pointer| !pointer.is_collection())
                    .map(move |pointer| (owner.clone(), pointer.clone()))
            })
            .collect();

        let mut restored = 0;
        for (owner, pointer) in scalars {
            let PointerTarget::Reference(key) = pointer.target() else {
                continue;
            };
            let proxy = self.uow.load(&key.class, &key.id)?;
            if write_property(&owner, pointer.property(), Value::Reference(proxy)) {
                properties.remove(&owner, pointer.property());
                restored += 1;
            }
        }
        Ok(restored)
    }

    /// Writes a fresh lazy collection into every field that had a collection
    /// pointer. Pointers are kept, so this can run on every access.
    pub fn restore_collections(&self, properties: &DetachedProperties) -> Result<usize> {
        let mut restored = 0;
        for (owner, pointers) in properties.iter() {
            for pointer in pointers {
                let PointerTarget::Collection { flavor, key } = pointer.target() else {
                    continue;
                };
                let placeholder = match &pointer.owner().id {
                    Some(id) => flavor.create_placeholder(
                        &pointer.owner().class,
                        id.clone(),
                        pointer.property(),
                        self.uow,
                    )?,
                    None => flavor.placeholder_for(key.clone(), self.uow)?,
                };
                let value = Value::Collection(Collection::Managed(placeholder));
                if write_property(owner, pointer.property(), value) {
                    restored += 1;
                }
            }
        }
        Ok(restored)
    }
}
