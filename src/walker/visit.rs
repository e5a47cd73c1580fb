use super::{ObjectWalker, read_property, write_property};
use crate::collection::{Collection, CollectionElements, CollectionFlavor, PlainCollection};
use crate::config::ElementProxyPolicy;
use crate::core::{ModelError, ObjectRef, Result, Value};
use crate::pointer::{PointerOwner, PropertyPointer};
use crate::session::EntityMetadata;
use log::warn;

impl ObjectWalker<'_> {
    /// Visits one object and returns the objects it refers to.
    pub(super) fn visit(&mut self, object: &ObjectRef) -> Result<Vec<ObjectRef>> {
        let class = object.class()?;
        match self.uow.metadata(&class) {
            Some(meta) => self.visit_entity(object, &meta),
            None if self.config.walk_plain_objects => self.visit_plain(object),
            None => Ok(Vec::new()),
        }
    }

    /// Managed entity: only declared associations are inspected.
    fn visit_entity(&mut self, object: &ObjectRef, meta: &EntityMetadata) -> Result<Vec<ObjectRef>> {
        let owner = PointerOwner::new(meta.class().clone(), meta.identifier_of(object)?);
        let mut children = Vec::new();
        for name in meta.associations() {
            let Some(value) = read_property(object, name) else {
                continue;
            };
            self.visit_property(object, &owner, name, value, &mut children)?;
        }
        Ok(children)
    }

    /// Plain bean: every readable non-scalar property is inspected.
    fn visit_plain(&mut self, object: &ObjectRef) -> Result<Vec<ObjectRef>> {
        let owner = PointerOwner::new(object.class()?, None);
        let mut children = Vec::new();
        for name in object.property_names()? {
            let Some(value) = read_property(object, &name) else {
                continue;
            };
            if value.is_scalar() {
                continue;
            }
            self.visit_property(object, &owner, &name, value, &mut children)?;
        }
        Ok(children)
    }

    fn visit_property(
        &mut self,
        object: &ObjectRef,
        owner: &PointerOwner,
        name: &str,
        value: Value,
        children: &mut Vec<ObjectRef>,
    ) -> Result<()> {
        let initialized = self.uow.is_initialized(&value);
        match value {
            Value::Reference(proxy) => {
                if !initialized {
                    self.handle_proxy(
                        object,
                        name,
                        PropertyPointer::reference(owner.clone(), name, proxy.key().clone()),
                    );
                    return Ok(());
                }
                if let Some(target) = proxy.implementation() {
                    write_property(object, name, Value::Object(target.clone()));
                    children.push(target);
                }
            }
            Value::Collection(Collection::Managed(managed)) => {
                let flavor = CollectionFlavor::classify(&managed)?;
                if !initialized {
                    self.handle_proxy(
                        object,
                        name,
                        PropertyPointer::collection(owner.clone(), name, flavor, managed.key().clone()),
                    );
                    return Ok(());
                }
                let plain = flavor.materialize(&managed)?;
                let (plain, _) = self.resolve_collection(plain, children)?;
                write_property(object, name, Value::Collection(Collection::Plain(plain)));
            }
            Value::Collection(Collection::Plain(plain)) => {
                let (plain, changed) = self.resolve_collection(plain, children)?;
                if changed {
                    write_property(object, name, Value::Collection(Collection::Plain(plain)));
                }
            }
            Value::Object(child) => children.push(child),
            _ => {}
        }
        Ok(())
    }

    /// Records the pointer against the current object and nulls the field.
    fn handle_proxy(&mut self, object: &ObjectRef, name: &str, pointer: PropertyPointer) {
        self.sink.record(object, pointer);
        write_property(object, name, Value::Null);
    }

    /// Resolves element proxies of a plain collection, collecting element objects.
    ///
    /// Sorted flavors are rebuilt after a change since an object and the proxy
    /// it replaced do not compare alike.
    pub(super) fn resolve_collection(
        &mut self,
        mut plain: PlainCollection,
        children: &mut Vec<ObjectRef>,
    ) -> Result<(PlainCollection, bool)> {
        let changed = self.resolve_elements(plain.elements_mut(), children)?;
        if changed && plain.flavor().is_sorted() {
            let elements = plain.elements().clone();
            plain = PlainCollection::from_elements(plain.flavor(), elements)?;
        }
        Ok((plain, changed))
    }

    fn resolve_elements(
        &mut self,
        elements: &mut CollectionElements,
        children: &mut Vec<ObjectRef>,
    ) -> Result<bool> {
        let mut changed = false;
        for slot in elements.values_mut() {
            match slot {
                Value::Reference(proxy) => {
                    let target = match proxy.implementation() {
                        Some(target) => target,
                        None => match self.config.element_proxy_policy {
                            ElementProxyPolicy::Initialize => {
                                warn!("initializing collection element {} during detach", proxy.key());
                                proxy.initialize()?
                            }
                            ElementProxyPolicy::Reject => {
                                return Err(ModelError::PreconditionViolation(format!(
                                    "unresolved collection element {}",
                                    proxy.key()
                                )));
                            }
                        },
                    };
                    children.push(target.clone());
                    *slot = Value::Object(target);
                    changed = true;
                }
                Value::Collection(Collection::Managed(managed)) => {
                    if !managed.is_initialized() {
                        return Err(ModelError::PreconditionViolation(format!(
                            "nested collection {} is not initialized",
                            managed.key()
                        )));
                    }
                    let plain = CollectionFlavor::classify(managed)?.materialize(managed)?;
                    let (plain, _) = self.resolve_collection(plain, children)?;
                    *slot = Value::Collection(Collection::Plain(plain));
                    changed = true;
                }
                Value::Collection(Collection::Plain(plain)) => {
                    let (resolved, nested) = self.resolve_collection(plain.clone(), children)?;
                    if nested {
                        *plain = resolved;
                        changed = true;
                    }
                }
                Value::Object(object) => children.push(object.clone()),
                _ => {}
            }
        }
        Ok(changed)
    }
}
