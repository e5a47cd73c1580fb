//! Generic deep copy of initialized object graphs, with a per-field hook.

mod relay;

pub use relay::PointerRelay;

use crate::collection::{Collection, CollectionElements, CollectionFlavor, PlainCollection};
use crate::core::{ModelError, Object, ObjectId, ObjectRef, Result, Value};
use std::collections::{HashMap, VecDeque};

/// Intercepts a field while an object is being copied.
pub trait FieldMapper {
    /// Returns `true` when the field was handled and must not be copied.
    /// A skipped field is left null on `dest`.
    fn map_field(
        &mut self,
        source: &ObjectRef,
        dest: &ObjectRef,
        field: &str,
        value: &Value,
    ) -> Result<bool>;
}

/// Mapper that never intercepts.
pub struct DefaultMapping;

impl FieldMapper for DefaultMapping {
    fn map_field(&mut self, _: &ObjectRef, _: &ObjectRef, _: &str, _: &Value) -> Result<bool> {
        Ok(false)
    }
}

pub trait ObjectCopier {
    /// Copies `source` into a graph of fresh, session-free objects.
    fn copy(&mut self, source: &Value, mapper: &mut dyn FieldMapper) -> Result<Value>;
}

/// Identity-preserving deep copier.
///
/// Every source object is copied exactly once, so shared subgraphs stay shared
/// and cycles are reproduced in the copy. Initialized proxies and managed
/// collections are copied as their plain contents; anything still unloaded
/// is an error, since only the mapper may account for it.
#[derive(Default)]
pub struct GraphCopier {
    copies: HashMap<ObjectId, (ObjectRef, ObjectRef)>,
    pending: VecDeque<(ObjectRef, ObjectRef)>,
}

impl GraphCopier {
    pub fn new() -> Self {
        Self::default()
    }

    /// The copy made for `source` during the last run, if any.
    pub fn copy_of(&self, source: &ObjectRef) -> Option<ObjectRef> {
        self.copies.get(&source.id()).map(|(_, copy)| copy.clone())
    }

    pub fn copied(&self) -> usize {
        self.copies.len()
    }

    fn copy_object(&mut self, source: &ObjectRef) -> Result<ObjectRef> {
        if let Some((_, copy)) = self.copies.get(&source.id()) {
            return Ok(copy.clone());
        }
        let copy = ObjectRef::new(Object::new(source.class()?));
        self.copies.insert(source.id(), (source.clone(), copy.clone()));
        self.pending.push_back((source.clone(), copy.clone()));
        Ok(copy)
    }

    fn copy_value(&mut self, value: &Value) -> Result<Value> {
        match value {
            Value::Object(object) => Ok(Value::Object(self.copy_object(object)?)),
            Value::Reference(proxy) => match proxy.implementation() {
                Some(target) => Ok(Value::Object(self.copy_object(&target)?)),
                None => Err(ModelError::PreconditionViolation(format!(
                    "cannot copy unresolved reference {}",
                    proxy.key()
                ))),
            },
            Value::Collection(Collection::Managed(managed)) => {
                let plain = CollectionFlavor::classify(managed)?.materialize(managed)?;
                self.copy_collection(&plain)
            }
            Value::Collection(Collection::Plain(plain)) => self.copy_collection(plain),
            scalar => Ok(scalar.clone()),
        }
    }

    fn copy_collection(&mut self, plain: &PlainCollection) -> Result<Value> {
        let elements = match plain.elements() {
            CollectionElements::Sequence(values) => CollectionElements::Sequence(
                values
                    .iter()
                    .map(|value| self.copy_value(value))
                    .collect::<Result<_>>()?,
            ),
            CollectionElements::Entries(entries) => CollectionElements::Entries(
                entries
                    .iter()
                    .map(|(key, value)| -> Result<(Value, Value)> {
                        Ok((self.copy_value(key)?, self.copy_value(value)?))
                    })
                    .collect::<Result<_>>()?,
            ),
        };
        let copy = PlainCollection::from_elements(plain.flavor(), elements)?;
        Ok(Value::Collection(Collection::Plain(copy)))
    }

    fn copy_fields(
        &mut self,
        source: &ObjectRef,
        dest: &ObjectRef,
        mapper: &mut dyn FieldMapper,
    ) -> Result<()> {
        let (fields, read_only) = {
            let object = source.read()?;
            let fields: Vec<(String, Value)> = object
                .fields()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect();
            (fields, object.is_read_only())
        };

        for (name, value) in fields {
            let copied = if mapper.map_field(source, dest, &name, &value)? {
                Value::Null
            } else {
                self.copy_value(&value)?
            };
            dest.write()?.set_field(name, copied)?;
        }
        dest.write()?.set_read_only(read_only);
        Ok(())
    }
}

impl ObjectCopier for GraphCopier {
    fn copy(&mut self, source: &Value, mapper: &mut dyn FieldMapper) -> Result<Value> {
        self.copies.clear();
        self.pending.clear();

        let root = self.copy_value(source)?;
        while let Some((source, dest)) = self.pending.pop_front() {
            self.copy_fields(&source, &dest, mapper)?;
        }
        Ok(root)
    }
}
