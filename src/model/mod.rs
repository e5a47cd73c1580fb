//! The detachable model: a holder that can drop its unit-of-work state between
//! requests and pick it up again from a later one.

mod provided;

pub use provided::ProvidedModel;

use crate::attach::Attacher;
use crate::config::ModelConfig;
use crate::copier::{GraphCopier, ObjectCopier, PointerRelay};
use crate::core::{EntityClass, Identifier, Result, Value};
use crate::pointer::DetachedProperties;
use crate::session::UnitOfWork;
use crate::walker::ObjectWalker;
use log::{debug, warn};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tracing::{Level, event, info_span};

/// The get/set/detach contract a host framework drives.
pub trait DetachableModel {
    fn object(&mut self) -> Result<Value>;
    fn set_object(&mut self, object: Value);
    fn detach(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    /// Holds nothing.
    Empty,
    /// Holds a usable object, possibly still bound to a unit of work.
    Live,
    /// Holds only a plain snapshot and its pointers.
    Detached,
}

/// Model over an entity graph.
///
/// # Equality
///
/// There is no `PartialEq` or `Hash`. [`resolved_eq`](Self::resolved_eq) and
/// [`resolved_hash`](Self::resolved_hash) compare the *attached* objects and
/// therefore attach a detached model as a side effect. Use
/// [`same_snapshot`](Self::same_snapshot) where a pure comparison is needed.
///
/// Attached objects compare by identity. Two models detached separately from
/// the same row hold distinct copies and are never `resolved_eq`, even after
/// both are attached to one unit of work.
pub struct EntityModel {
    object: Option<Value>,
    detached: Option<Value>,
    properties: DetachedProperties,
    object_class: Option<EntityClass>,
    config: ModelConfig,
}

impl EntityModel {
    pub fn new(object: Value) -> Self {
        if let Value::Reference(proxy) = &object {
            warn!("model created over proxy {}; it will be initialized on detach", proxy.key());
        }
        Self::build(object, ModelConfig::default())
    }

    pub fn with_config(object: Value, config: ModelConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(object, config))
    }

    /// A live model over an uninitialized reference to `class#id`.
    pub fn load(uow: &dyn UnitOfWork, class: &EntityClass, id: &Identifier) -> Result<Self> {
        let proxy = uow.load(class, id)?;
        Ok(Self::build(Value::Reference(proxy), ModelConfig::default()))
    }

    pub fn empty() -> Self {
        Self::build(Value::Null, ModelConfig::default())
    }

    fn build(object: Value, config: ModelConfig) -> Self {
        let object_class = class_of(&object);
        Self {
            object: if object.is_null() { None } else { Some(object) },
            detached: None,
            properties: DetachedProperties::new(),
            object_class,
            config,
        }
    }

    pub(crate) fn from_parts(
        detached: Option<Value>,
        properties: DetachedProperties,
        object_class: Option<EntityClass>,
        config: ModelConfig,
    ) -> Self {
        Self {
            object: None,
            detached,
            properties,
            object_class,
            config,
        }
    }

    pub fn state(&self) -> ModelState {
        if self.object.is_some() {
            ModelState::Live
        } else if self.detached.is_some() {
            ModelState::Detached
        } else {
            ModelState::Empty
        }
    }

    /// Class of the last object set, known even while only a proxy is held.
    pub fn object_class(&self) -> Option<&EntityClass> {
        self.object_class.as_ref()
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn detached_properties(&self) -> &DetachedProperties {
        &self.properties
    }

    /// The plain snapshot, present only while detached.
    pub fn snapshot(&self) -> Option<&Value> {
        self.detached.as_ref()
    }

    /// Replaces the held object. Recorded pointers are left as they are.
    pub fn set_object(&mut self, object: Value) {
        self.object_class = class_of(&object);
        self.object = if object.is_null() { None } else { Some(object) };
        self.detached = None;
    }

    /// Drops every unit-of-work binding and keeps a plain copy instead.
    ///
    /// Does nothing when already detached or empty. On error the model is left
    /// live and unchanged apart from whatever the walk already nulled out.
    pub fn detach(&mut self, uow: &dyn UnitOfWork) -> Result<()> {
        let Some(root) = self.object.clone() else {
            return Ok(());
        };
        let class = self
            .object_class
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        let span = info_span!("model.detach", class = %class);
        let _enter = span.enter();

        let root = match root {
            Value::Reference(proxy) => Value::Object(proxy.initialize()?),
            other => other,
        };

        let mut walked = DetachedProperties::new();
        let root = ObjectWalker::new(uow, &mut walked, &self.config).walk(&root)?;

        let mut properties = DetachedProperties::new();
        let mut relay = PointerRelay::new(&walked, &mut properties);
        let copy = GraphCopier::new().copy(&root, &mut relay)?;

        self.properties = properties;
        self.detached = Some(copy);
        self.object = None;

        event!(
            Level::DEBUG,
            pointers = self.properties.len(),
            collections = self.properties.collection_count(),
            "model detached"
        );
        if self.config.log_detached_properties {
            debug!("detached properties of {}: {:?}", class, self.properties);
        }
        Ok(())
    }

    /// The held object, attaching it to `uow` first when detached.
    ///
    /// Reference pointers are restored once per detach. Collection pointers
    /// are re-wired on every call, live or not, since a flush may have made
    /// the previous placeholders stale.
    pub fn object(&mut self, uow: &dyn UnitOfWork) -> Result<Value> {
        let span = info_span!("model.attach", state = ?self.state());
        let _enter = span.enter();
        let attacher = Attacher::new(uow);

        if self.object.is_none() && self.detached.is_some() {
            let restored = attacher.restore_scalars(&mut self.properties)?;
            self.object = self.detached.take();
            event!(Level::DEBUG, restored, "model scalars restored");
        }

        let rewired = attacher.restore_collections(&self.properties)?;
        if rewired > 0 {
            event!(Level::DEBUG, rewired, "model collections re-wired");
        }
        Ok(self.object.clone().unwrap_or(Value::Null))
    }

    /// Identity equality of the attached objects. Attaches both models.
    pub fn resolved_eq(&mut self, other: &mut EntityModel, uow: &dyn UnitOfWork) -> Result<bool> {
        let this = self.object(uow)?;
        let that = other.object(uow)?;
        Ok(this == that)
    }

    /// Hash of the attached object. Attaches the model.
    pub fn resolved_hash(&mut self, uow: &dyn UnitOfWork) -> Result<u64> {
        let object = self.object(uow)?;
        let mut hasher = DefaultHasher::new();
        object.hash(&mut hasher);
        Ok(hasher.finish())
    }

    /// Whether both models hold the very same live object or snapshot.
    /// Never attaches.
    pub fn same_snapshot(&self, other: &EntityModel) -> bool {
        self.object == other.object && self.detached == other.detached
    }
}

impl Default for EntityModel {
    fn default() -> Self {
        Self::empty()
    }
}

fn class_of(object: &Value) -> Option<EntityClass> {
    match object {
        Value::Reference(proxy) => Some(proxy.key().class.clone()),
        Value::Object(object) => object.class().ok(),
        _ => None,
    }
}
