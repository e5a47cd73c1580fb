//! Object graph walker.
//!
//! Visits every object reachable from a root and strips unit-of-work state
//! from it in place: unresolved references and lazy collections become
//! [`PropertyPointer`](crate::pointer::PropertyPointer)s (and the field is
//! reset to null), initialized managed collections become plain collections,
//! and initialized proxies are replaced by their targets.

mod access;
mod visit;

pub(crate) use access::{read_property, write_property};

use crate::config::ModelConfig;
use crate::collection::{Collection, CollectionFlavor};
use crate::core::{ModelError, ObjectId, ObjectRef, Result, Value};
use crate::pointer::PointerSink;
use crate::session::UnitOfWork;
use log::debug;
use std::collections::{HashSet, VecDeque};

pub struct ObjectWalker<'a> {
    uow: &'a dyn UnitOfWork,
    sink: &'a mut dyn PointerSink,
    config: &'a ModelConfig,
    seen: HashSet<ObjectId>,
}

impl<'a> ObjectWalker<'a> {
    pub fn new(
        uow: &'a dyn UnitOfWork,
        sink: &'a mut dyn PointerSink,
        config: &'a ModelConfig,
    ) -> Self {
        Self {
            uow,
            sink,
            config,
            seen: HashSet::new(),
        }
    }

    /// Walks the graph under `root` and returns the root with any outer proxy
    /// or managed collection replaced by its plain form.
    ///
    /// The root itself must already be resolved: an uninitialized reference or
    /// lazy collection at the root has no owner to record a pointer against.
    pub fn walk(&mut self, root: &Value) -> Result<Value> {
        let mut roots = Vec::new();
        let walked = match root {
            Value::Reference(proxy) => {
                let target = proxy.implementation().ok_or_else(|| {
                    ModelError::PreconditionViolation(format!(
                        "cannot walk unresolved root {}",
                        proxy.key()
                    ))
                })?;
                roots.push(target.clone());
                Value::Object(target)
            }
            Value::Object(object) => {
                roots.push(object.clone());
                root.clone()
            }
            Value::Collection(Collection::Managed(managed)) => {
                if !managed.is_initialized() {
                    return Err(ModelError::PreconditionViolation(format!(
                        "cannot walk unresolved root collection {}",
                        managed.key()
                    )));
                }
                let plain = CollectionFlavor::classify(managed)?.materialize(managed)?;
                let (plain, _) = self.resolve_collection(plain, &mut roots)?;
                Value::Collection(Collection::Plain(plain))
            }
            Value::Collection(Collection::Plain(plain)) => {
                let (plain, _) = self.resolve_collection(plain.clone(), &mut roots)?;
                Value::Collection(Collection::Plain(plain))
            }
            scalar => return Ok(scalar.clone()),
        };

        // Breadth-first, so an object is first reached at its shortest depth.
        let mut pending: VecDeque<(ObjectRef, usize)> =
            roots.into_iter().map(|object| (object, 0)).collect();

        while let Some((object, depth)) = pending.pop_front() {
            if !self.seen.insert(object.id()) {
                continue;
            }
            if let Some(max_depth) = self.config.max_depth {
                if depth > max_depth {
                    return Err(ModelError::PreconditionViolation(format!(
                        "object graph deeper than {} below the root",
                        max_depth
                    )));
                }
            }

            let children = self.visit(&object)?;
            for child in children {
                if !self.seen.contains(&child.id()) {
                    pending.push_back((child, depth + 1));
                }
            }
        }

        debug!("walked {} objects", self.seen.len());
        Ok(walked)
    }

    /// Number of distinct objects visited so far.
    pub fn visited(&self) -> usize {
        self.seen.len()
    }

    pub fn has_seen(&self, object: &ObjectRef) -> bool {
        self.seen.contains(&object.id())
    }
}
