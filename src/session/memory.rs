//! In-memory unit of work.
//!
//! Rows are stored with associations expressed as keys; loading an entity
//! yields an object whose references are lazy proxies and whose collections
//! are lazy managed collections, the same shape an ORM session hands out.

use super::{EntityMetadata, MetadataCatalog, UnitOfWork, UnitOfWorkProvider};
use crate::collection::{
    Collection, CollectionElements, CollectionKey, ManagedCollection, PersistentKind,
};
use crate::core::{
    EntityClass, EntityKey, Identifier, ModelError, Object, ObjectRef, Result, Value,
};
use crate::proxy::{EntityProxy, LazyLoader};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

/// A collection element as stored: a scalar or a key to another row.
#[derive(Debug, Clone)]
pub enum StoredElement {
    Scalar(Value),
    Entity(EntityKey),
}

impl StoredElement {
    pub fn entity(class: impl Into<EntityClass>, id: impl Into<Identifier>) -> Self {
        Self::Entity(EntityKey::new(class, id))
    }

    pub fn scalar(value: impl Into<Value>) -> Self {
        Self::Scalar(value.into())
    }
}

#[derive(Debug, Clone)]
pub enum StoredValue {
    Scalar(Value),
    Reference(Option<EntityKey>),
    Sequence(PersistentKind, Vec<StoredElement>),
    Entries(PersistentKind, Vec<(StoredElement, StoredElement)>),
}

/// One stored row, minus its identifier.
#[derive(Debug, Clone, Default)]
pub struct Record {
    fields: BTreeMap<String, StoredValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scalar(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields
            .insert(name.into(), StoredValue::Scalar(value.into()));
        self
    }

    pub fn reference(mut self, name: impl Into<String>, target: Option<EntityKey>) -> Self {
        self.fields
            .insert(name.into(), StoredValue::Reference(target));
        self
    }

    pub fn collection(
        mut self,
        name: impl Into<String>,
        kind: PersistentKind,
        elements: Vec<StoredElement>,
    ) -> Self {
        self.fields
            .insert(name.into(), StoredValue::Sequence(kind, elements));
        self
    }

    pub fn map(
        mut self,
        name: impl Into<String>,
        kind: PersistentKind,
        entries: Vec<(StoredElement, StoredElement)>,
    ) -> Self {
        self.fields
            .insert(name.into(), StoredValue::Entries(kind, entries));
        self
    }

    pub fn field(&self, name: &str) -> Option<&StoredValue> {
        self.fields.get(name)
    }
}

/// Lazy loads performed against a store, across all of its sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub entity_loads: u64,
    pub collection_loads: u64,
}

struct StoreState {
    catalog: MetadataCatalog,
    rows: HashMap<EntityKey, Record>,
    stats: LoadStats,
}

/// Shared backing store for [`MemorySession`]s.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl MemoryStore {
    pub fn new(catalog: MetadataCatalog) -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState {
                catalog,
                rows: HashMap::new(),
                stats: LoadStats::default(),
            })),
        }
    }

    pub fn insert(
        &self,
        class: impl Into<EntityClass>,
        id: impl Into<Identifier>,
        record: Record,
    ) -> Result<()> {
        let key = EntityKey::new(class, id);
        let mut state = self.state.write()?;
        if !state.catalog.contains(&key.class) {
            return Err(ModelError::InvalidConfig(format!(
                "entity '{}' is not registered",
                key.class
            )));
        }
        state.rows.insert(key, record);
        Ok(())
    }

    pub fn remove(&self, key: &EntityKey) -> Result<bool> {
        Ok(self.state.write()?.rows.remove(key).is_some())
    }

    pub fn catalog(&self) -> Result<MetadataCatalog> {
        Ok(self.state.read()?.catalog.clone())
    }

    pub fn stats(&self) -> Result<LoadStats> {
        Ok(self.state.read()?.stats)
    }

    pub fn open_session(&self) -> MemorySession {
        MemorySession::open(self.clone())
    }
}

struct SessionState {
    me: Weak<SessionState>,
    store: MemoryStore,
    identity: RwLock<HashMap<EntityKey, ObjectRef>>,
    open: AtomicBool,
    epoch: AtomicU64,
}

/// Loader handed to lazy values. The session owns those values through its
/// identity map, so the loader only holds it weakly.
struct SessionLoader {
    state: Weak<SessionState>,
}

impl SessionLoader {
    fn session(&self) -> Result<Arc<SessionState>> {
        self.state.upgrade().ok_or(ModelError::SessionClosed)
    }
}

impl LazyLoader for SessionLoader {
    fn load_entity(&self, key: &EntityKey) -> Result<ObjectRef> {
        self.session()?.materialize(key)
    }

    fn load_collection(&self, key: &CollectionKey, epoch: u64) -> Result<CollectionElements> {
        self.session()?.load_collection(key, epoch)
    }
}

impl SessionState {
    fn loader(&self) -> Arc<dyn LazyLoader> {
        Arc::new(SessionLoader {
            state: self.me.clone(),
        })
    }

    fn check_open(&self) -> Result<()> {
        if self.open.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(ModelError::SessionClosed)
        }
    }

    fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    fn cached(&self, key: &EntityKey) -> Result<Option<ObjectRef>> {
        Ok(self.identity.read()?.get(key).cloned())
    }

    fn proxy_for(&self, key: EntityKey) -> Result<EntityProxy> {
        let loader = self.loader();
        Ok(match self.cached(&key)? {
            Some(target) => EntityProxy::resolved(key, target, loader),
            None => EntityProxy::new(key, loader),
        })
    }

    fn materialize(&self, key: &EntityKey) -> Result<ObjectRef> {
        self.check_open()?;
        if let Some(object) = self.cached(key)? {
            return Ok(object);
        }

        let (metadata, record) = {
            let mut store = self.store.state.write()?;
            let metadata = store
                .catalog
                .get(&key.class)
                .ok_or_else(|| unresolved(key))?;
            let record = store.rows.get(key).cloned().ok_or_else(|| unresolved(key))?;
            store.stats.entity_loads += 1;
            (metadata, record)
        };

        let object = ObjectRef::new(self.build_object(key, &metadata, &record)?);
        let mut identity = self.identity.write()?;
        Ok(identity.entry(key.clone()).or_insert(object).clone())
    }

    fn build_object(
        &self,
        key: &EntityKey,
        metadata: &EntityMetadata,
        record: &Record,
    ) -> Result<Object> {
        let mut object = Object::new(key.class.clone());
        object.set_field(metadata.identifier_property(), Value::from(&key.id))?;

        for name in metadata.property_names() {
            let value = match record.field(name) {
                None | Some(StoredValue::Reference(None)) => Value::Null,
                Some(StoredValue::Scalar(value)) => value.clone(),
                Some(StoredValue::Reference(Some(target))) => {
                    Value::Reference(self.proxy_for(target.clone())?)
                }
                Some(StoredValue::Sequence(kind, _)) | Some(StoredValue::Entries(kind, _)) => {
                    let collection_key = CollectionKey::of(&key.class, key.id.clone(), name);
                    Value::Collection(Collection::Managed(
                        ManagedCollection::lazy(collection_key, *kind, self.epoch(), self.loader()),
                    ))
                }
            };
            object.set_field(name, value)?;
        }
        Ok(object)
    }

    fn element_value(&self, element: &StoredElement) -> Result<Value> {
        match element {
            StoredElement::Scalar(value) => Ok(value.clone()),
            StoredElement::Entity(key) => Ok(Value::Object(self.materialize(key)?)),
        }
    }
}

impl SessionState {
    fn load_collection(&self, key: &CollectionKey, epoch: u64) -> Result<CollectionElements> {
        self.check_open()?;
        if epoch != self.epoch() {
            return Err(ModelError::StaleCollection(key.to_string()));
        }

        let owner = EntityKey {
            class: key.owner_class(),
            id: key.owner_id.clone(),
        };
        let stored = {
            let mut store = self.store.state.write()?;
            let stored = store
                .rows
                .get(&owner)
                .and_then(|record| record.field(key.property()))
                .cloned()
                .ok_or_else(|| unresolved(&owner))?;
            store.stats.collection_loads += 1;
            stored
        };

        match stored {
            StoredValue::Sequence(_, elements) => Ok(CollectionElements::Sequence(
                elements
                    .iter()
                    .map(|element| self.element_value(element))
                    .collect::<Result<Vec<_>>>()?,
            )),
            StoredValue::Entries(_, entries) => Ok(CollectionElements::Entries(
                entries
                    .iter()
                    .map(|(k, v)| -> Result<(Value, Value)> {
                        Ok((self.element_value(k)?, self.element_value(v)?))
                    })
                    .collect::<Result<Vec<_>>>()?,
            )),
            _ => Err(ModelError::PreconditionViolation(format!(
                "property '{}' of {} is not a collection",
                key.property(),
                owner
            ))),
        }
    }
}

fn unresolved(key: &EntityKey) -> ModelError {
    ModelError::UnresolvedReference {
        class: key.class.to_string(),
        id: key.id.to_string(),
    }
}

/// A unit of work over a [`MemoryStore`], with its own identity map.
#[derive(Clone)]
pub struct MemorySession {
    state: Arc<SessionState>,
}

impl MemorySession {
    fn open(store: MemoryStore) -> Self {
        Self {
            state: Arc::new_cyclic(|me| SessionState {
                me: me.clone(),
                store,
                identity: RwLock::new(HashMap::new()),
                open: AtomicBool::new(true),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Loads and initializes `class#id`. Its own associations stay lazy.
    pub fn get(&self, class: impl Into<EntityClass>, id: impl Into<Identifier>) -> Result<ObjectRef> {
        self.state.materialize(&EntityKey::new(class, id))
    }

    /// Ends the unit of work: every lazy value it handed out stops loading.
    pub fn close(&self) {
        self.state.open.store(false, Ordering::Release);
    }

    pub fn is_open(&self) -> bool {
        self.state.open.load(Ordering::Acquire)
    }

    /// Re-wraps collections: lazy collections wired before the flush go stale.
    pub fn flush(&self) -> Result<()> {
        self.state.check_open()?;
        self.state.epoch.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    pub fn epoch(&self) -> u64 {
        self.state.epoch()
    }

    pub fn store(&self) -> &MemoryStore {
        &self.state.store
    }
}

impl UnitOfWork for MemorySession {
    fn load(&self, class: &EntityClass, id: &Identifier) -> Result<EntityProxy> {
        self.state.check_open()?;
        let key = EntityKey {
            class: class.clone(),
            id: id.clone(),
        };
        {
            let store = self.state.store.state.read()?;
            if !store.catalog.contains(class) || !store.rows.contains_key(&key) {
                return Err(unresolved(&key));
            }
        }
        self.state.proxy_for(key)
    }

    fn metadata(&self, class: &EntityClass) -> Option<Arc<EntityMetadata>> {
        self.state
            .store
            .state
            .read()
            .ok()
            .and_then(|store| store.catalog.get(class))
    }

    fn lazy_collection(
        &self,
        key: CollectionKey,
        kind: PersistentKind,
    ) -> Result<ManagedCollection> {
        self.state.check_open()?;
        Ok(ManagedCollection::lazy(
            key,
            kind,
            self.state.epoch(),
            self.state.loader(),
        ))
    }
}

/// Holds the session of the request in flight.
#[derive(Clone)]
pub struct RequestScope {
    store: MemoryStore,
    current: Arc<RwLock<Option<MemorySession>>>,
}

impl RequestScope {
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store,
            current: Arc::new(RwLock::new(None)),
        }
    }

    /// Opens a fresh session for a new request, closing the previous one.
    pub fn begin(&self) -> Result<MemorySession> {
        let session = self.store.open_session();
        let previous = self.current.write()?.replace(session.clone());
        if let Some(previous) = previous {
            previous.close();
        }
        Ok(session)
    }

    pub fn end(&self) -> Result<()> {
        if let Some(session) = self.current.write()?.take() {
            session.close();
        }
        Ok(())
    }
}

impl UnitOfWorkProvider for RequestScope {
    fn current(&self) -> Result<Arc<dyn UnitOfWork>> {
        match self.current.read()?.as_ref() {
            Some(session) => Ok(Arc::new(session.clone())),
            None => Err(ModelError::SessionClosed),
        }
    }
}
