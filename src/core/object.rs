use crate::core::{EntityClass, ModelError, Result, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A bag of named properties tagged with its class.
///
/// Both managed entities and plain (session-free) beans use this shape; what
/// separates them is whether the unit of work has metadata for `class`.
#[derive(Debug, Clone)]
pub struct Object {
    class: EntityClass,
    fields: BTreeMap<String, Value>,
    read_only: bool,
}

impl Object {
    pub fn new(class: impl Into<EntityClass>) -> Self {
        Self {
            class: class.into(),
            fields: BTreeMap::new(),
            read_only: false,
        }
    }

    /// Builder-style field assignment.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Marks the object so every setter fails. Getters keep working.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn class(&self) -> &EntityClass {
        &self.class
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: Value) -> Result<()> {
        let name = name.into();
        if self.read_only {
            return Err(ModelError::Reflection(format!(
                "property '{}' of {} is not writable",
                name, self.class
            )));
        }
        self.fields.insert(name, value);
        Ok(())
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }
}

/// Identity of an [`ObjectRef`], stable for as long as some handle is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(usize);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{:x}", self.0)
    }
}

/// Shared handle to an [`Object`]. Equality and hashing are by identity.
#[derive(Clone)]
pub struct ObjectRef(Arc<RwLock<Object>>);

impl ObjectRef {
    pub fn new(object: Object) -> Self {
        Self(Arc::new(RwLock::new(object)))
    }

    pub fn id(&self) -> ObjectId {
        ObjectId(Arc::as_ptr(&self.0) as *const () as usize)
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn read(&self) -> Result<RwLockReadGuard<'_, Object>> {
        Ok(self.0.read()?)
    }

    pub fn write(&self) -> Result<RwLockWriteGuard<'_, Object>> {
        Ok(self.0.write()?)
    }

    pub fn class(&self) -> Result<EntityClass> {
        Ok(self.read()?.class().clone())
    }

    /// Reads a property. Unknown properties are a reflection failure.
    pub fn get(&self, name: &str) -> Result<Value> {
        let object = self.read()?;
        object.field(name).cloned().ok_or_else(|| {
            ModelError::Reflection(format!(
                "no readable property '{}' on {}",
                name,
                object.class()
            ))
        })
    }

    pub fn set(&self, name: &str, value: Value) -> Result<()> {
        self.write()?.set_field(name, value)
    }

    pub fn property_names(&self) -> Result<Vec<String>> {
        Ok(self.read()?.field_names())
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ObjectRef {}

impl Hash for ObjectRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

// Never recurse into fields: graphs are allowed to be cyclic.
impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_read() {
            Ok(object) => write!(f, "{}{}", object.class(), self.id()),
            Err(_) => write!(f, "<locked>{}", self.id()),
        }
    }
}

impl From<Object> for ObjectRef {
    fn from(object: Object) -> Self {
        Self::new(object)
    }
}
