//! Serializable image of a detached model.
//!
//! Objects are flattened into an indexed node table so shared and cyclic
//! graphs survive serialization; every reference to an object is a node index.

use crate::collection::{Collection, CollectionElements, CollectionFlavor, PlainCollection};
use crate::config::ModelConfig;
use crate::core::{EntityClass, ModelError, Object, ObjectId, ObjectRef, Result, Value};
use crate::model::{EntityModel, ModelState};
use crate::pointer::{DetachedProperties, PropertyPointer};
use chrono::Utc;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

pub const MODEL_IMAGE_FORMAT_VERSION: u16 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueImage {
    Null,
    Boolean(bool),
    Integer(i64),
    /// IEEE 754 bits, so NaN and infinities survive formats like JSON.
    Float(u64),
    Text(String),
    Uuid(Uuid),
    Node(usize),
    Collection {
        flavor: CollectionFlavor,
        elements: ElementsImage,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElementsImage {
    Sequence(Vec<ValueImage>),
    Entries(Vec<(ValueImage, ValueImage)>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeImage {
    pub class: EntityClass,
    #[serde(default)]
    pub read_only: bool,
    pub fields: BTreeMap<String, ValueImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerImage {
    pub node: usize,
    pub pointers: Vec<PropertyPointer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelImage {
    pub format_version: u16,
    pub created_at_unix_ms: i64,
    pub object_class: Option<EntityClass>,
    #[serde(default)]
    pub config: ModelConfig,
    pub root: Option<ValueImage>,
    pub nodes: Vec<NodeImage>,
    pub pointers: Vec<PointerImage>,
}

impl ModelImage {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Default)]
struct Encoder {
    index: HashMap<ObjectId, usize>,
    objects: Vec<ObjectRef>,
}

impl Encoder {
    fn node(&mut self, object: &ObjectRef) -> usize {
        if let Some(index) = self.index.get(&object.id()) {
            return *index;
        }
        let index = self.objects.len();
        self.index.insert(object.id(), index);
        self.objects.push(object.clone());
        index
    }

    fn value(&mut self, value: &Value) -> Result<ValueImage> {
        Ok(match value {
            Value::Null => ValueImage::Null,
            Value::Boolean(b) => ValueImage::Boolean(*b),
            Value::Integer(i) => ValueImage::Integer(*i),
            Value::Float(f) => ValueImage::Float(f.to_bits()),
            Value::Text(s) => ValueImage::Text(s.clone()),
            Value::Uuid(u) => ValueImage::Uuid(*u),
            Value::Object(object) => ValueImage::Node(self.node(object)),
            Value::Collection(Collection::Plain(plain)) => ValueImage::Collection {
                flavor: plain.flavor(),
                elements: self.elements(plain.elements())?,
            },
            Value::Reference(_) | Value::Collection(Collection::Managed(_)) => {
                return Err(ModelError::PreconditionViolation(format!(
                    "{} value is bound to a unit of work and has no image",
                    value.type_name()
                )));
            }
        })
    }

    fn elements(&mut self, elements: &CollectionElements) -> Result<ElementsImage> {
        Ok(match elements {
            CollectionElements::Sequence(values) => ElementsImage::Sequence(
                values
                    .iter()
                    .map(|value| self.value(value))
                    .collect::<Result<Vec<_>>>()?,
            ),
            CollectionElements::Entries(entries) => ElementsImage::Entries(
                entries
                    .iter()
                    .map(|(key, value)| -> Result<(ValueImage, ValueImage)> {
                        Ok((self.value(key)?, self.value(value)?))
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
        })
    }

    fn nodes(&mut self) -> Result<Vec<NodeImage>> {
        let mut nodes = Vec::new();
        // Encoding a node may discover new ones, which land at the end.
        while nodes.len() < self.objects.len() {
            let object = self.objects[nodes.len()].clone();
            let (class, read_only, fields) = {
                let guard = object.read()?;
                let fields: Vec<(String, Value)> = guard
                    .fields()
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect();
                (guard.class().clone(), guard.is_read_only(), fields)
            };
            let mut images = BTreeMap::new();
            for (name, value) in fields {
                images.insert(name, self.value(&value)?);
            }
            nodes.push(NodeImage {
                class,
                read_only,
                fields: images,
            });
        }
        Ok(nodes)
    }
}

struct Decoder {
    objects: Vec<ObjectRef>,
}

impl Decoder {
    fn node(&self, index: usize) -> Result<ObjectRef> {
        self.objects.get(index).cloned().ok_or_else(|| {
            ModelError::PreconditionViolation(format!("model image has no node {}", index))
        })
    }

    fn value(&self, image: &ValueImage) -> Result<Value> {
        Ok(match image {
            ValueImage::Null => Value::Null,
            ValueImage::Boolean(b) => Value::Boolean(*b),
            ValueImage::Integer(i) => Value::Integer(*i),
            ValueImage::Float(bits) => Value::Float(f64::from_bits(*bits)),
            ValueImage::Text(s) => Value::Text(s.clone()),
            ValueImage::Uuid(u) => Value::Uuid(*u),
            ValueImage::Node(index) => Value::Object(self.node(*index)?),
            ValueImage::Collection { flavor, elements } => {
                let elements = match elements {
                    ElementsImage::Sequence(values) => CollectionElements::Sequence(
                        values
                            .iter()
                            .map(|value| self.value(value))
                            .collect::<Result<Vec<_>>>()?,
                    ),
                    ElementsImage::Entries(entries) => CollectionElements::Entries(
                        entries
                            .iter()
                            .map(|(key, value)| -> Result<(Value, Value)> {
                                Ok((self.value(key)?, self.value(value)?))
                            })
                            .collect::<Result<Vec<_>>>()?,
                    ),
                };
                Value::Collection(Collection::Plain(PlainCollection::from_elements(
                    *flavor, elements,
                )?))
            }
        })
    }
}

impl EntityModel {
    /// Flattens a detached (or empty) model into a serializable image.
    pub fn to_image(&self) -> Result<ModelImage> {
        if self.state() == ModelState::Live {
            return Err(ModelError::PreconditionViolation(
                "only a detached model has an image".to_string(),
            ));
        }

        let mut encoder = Encoder::default();
        let root = self
            .snapshot()
            .map(|snapshot| encoder.value(snapshot))
            .transpose()?;
        let nodes = encoder.nodes()?;

        let mut pointers = Vec::new();
        for (owner, owned) in self.detached_properties().iter() {
            // Left over from an earlier attach; nothing in the image refers to it.
            let Some(node) = encoder.index.get(&owner.id()).copied() else {
                debug!("skipping {} pointers of stale owner {:?}", owned.len(), owner);
                continue;
            };
            pointers.push(PointerImage {
                node,
                pointers: owned.to_vec(),
            });
        }

        Ok(ModelImage {
            format_version: MODEL_IMAGE_FORMAT_VERSION,
            created_at_unix_ms: Utc::now().timestamp_millis(),
            object_class: self.object_class().cloned(),
            config: self.config().clone(),
            root,
            nodes,
            pointers,
        })
    }

    /// Rebuilds a detached model. `config` replaces the one stored in the image.
    pub fn from_image(image: ModelImage, config: ModelConfig) -> Result<Self> {
        if image.format_version != MODEL_IMAGE_FORMAT_VERSION {
            return Err(ModelError::Serialization(format!(
                "Unsupported model image format version {}",
                image.format_version
            )));
        }
        config.validate()?;

        let decoder = Decoder {
            objects: image
                .nodes
                .iter()
                .map(|node| ObjectRef::new(Object::new(node.class.clone())))
                .collect(),
        };
        for (node, object) in image.nodes.iter().zip(&decoder.objects) {
            let mut fields = Vec::with_capacity(node.fields.len());
            for (name, value) in &node.fields {
                fields.push((name.clone(), decoder.value(value)?));
            }
            let mut guard = object.write()?;
            for (name, value) in fields {
                guard.set_field(name, value)?;
            }
            guard.set_read_only(node.read_only);
        }

        let root = image.root.as_ref().map(|root| decoder.value(root)).transpose()?;

        let mut properties = DetachedProperties::new();
        for entry in &image.pointers {
            let owner = decoder.node(entry.node)?;
            for pointer in &entry.pointers {
                properties.add(&owner, pointer.clone());
            }
        }

        Ok(EntityModel::from_parts(
            root,
            properties,
            image.object_class,
            config,
        ))
    }
}
