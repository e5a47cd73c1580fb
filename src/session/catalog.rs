use super::EntityMetadata;
use crate::core::{EntityClass, ModelError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Per-class metadata table, built once at startup.
///
/// Immutable after construction; `with_entity` returns a new catalog
/// (copy-on-write), so clones are cheap and need no locks.
#[derive(Clone, Default)]
pub struct MetadataCatalog {
    entities: Arc<HashMap<EntityClass, Arc<EntityMetadata>>>,
}

impl MetadataCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(self, metadata: EntityMetadata) -> Result<Self> {
        let class = metadata.class().clone();
        if self.entities.contains_key(&class) {
            return Err(ModelError::InvalidConfig(format!(
                "entity '{}' is already registered",
                class
            )));
        }

        let mut entities = (*self.entities).clone();
        entities.insert(class, Arc::new(metadata));
        Ok(Self {
            entities: Arc::new(entities),
        })
    }

    pub fn get(&self, class: &EntityClass) -> Option<Arc<EntityMetadata>> {
        self.entities.get(class).cloned()
    }

    pub fn contains(&self, class: &EntityClass) -> bool {
        self.entities.contains_key(class)
    }

    pub fn list_entities(&self) -> Vec<&EntityClass> {
        let mut classes: Vec<_> = self.entities.keys().collect();
        classes.sort();
        classes
    }
}
