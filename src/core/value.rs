use crate::collection::{Collection, PlainCollection};
use crate::core::{Identifier, Object, ObjectRef};
use crate::proxy::EntityProxy;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// A property value inside an object graph.
///
/// Scalars are copied as-is and never walked. `Object`, `Reference` and
/// `Collection` are the association-shaped values the walker inspects.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
    Object(ObjectRef),
    Reference(EntityProxy),
    Collection(Collection),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Boolean(_) => "BOOLEAN",
            Self::Integer(_) => "INTEGER",
            Self::Float(_) => "FLOAT",
            Self::Text(_) => "TEXT",
            Self::Uuid(_) => "UUID",
            Self::Object(_) => "OBJECT",
            Self::Reference(_) => "REFERENCE",
            Self::Collection(_) => "COLLECTION",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Primitive values carry no references and are never traversed.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Self::Null
                | Self::Boolean(_)
                | Self::Integer(_)
                | Self::Float(_)
                | Self::Text(_)
                | Self::Uuid(_)
        )
    }

    /// False only for lazy references and lazy collections that have not been loaded.
    pub fn is_initialized(&self) -> bool {
        match self {
            Self::Reference(proxy) => proxy.is_initialized(),
            Self::Collection(Collection::Managed(managed)) => managed.is_initialized(),
            _ => true,
        }
    }

    /// True when the value still holds something bound to a unit of work.
    pub fn is_session_bound(&self) -> bool {
        matches!(
            self,
            Self::Reference(_) | Self::Collection(Collection::Managed(_))
        )
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&EntityProxy> {
        match self {
            Self::Reference(proxy) => Some(proxy),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            Self::Collection(collection) => Some(collection),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Boolean(_) => 1,
            Self::Integer(_) => 2,
            Self::Float(_) => 3,
            Self::Text(_) => 4,
            Self::Uuid(_) => 5,
            Self::Object(_) => 6,
            Self::Reference(_) => 7,
            Self::Collection(_) => 8,
        }
    }

    /// Total order used by the sorted collection flavors.
    ///
    /// Values of different kinds order by kind; objects order by identity and
    /// references by their entity key, so sorting never touches a unit of work.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Uuid(a), Self::Uuid(b)) => a.cmp(b),
            (Self::Object(a), Self::Object(b)) => a.id().cmp(&b.id()),
            (Self::Reference(a), Self::Reference(b)) => a.key().cmp(b.key()),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => {
                if a.is_nan() && b.is_nan() {
                    return true;
                }
                a == b
            }
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Uuid(a), Self::Uuid(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            (Self::Reference(a), Self::Reference(b)) => a.key() == b.key(),
            (Self::Collection(a), Self::Collection(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Self::Null => {}
            Self::Boolean(b) => b.hash(state),
            Self::Integer(i) => i.hash(state),
            Self::Float(f) => {
                if f.is_nan() {
                    f64::NAN.to_bits().hash(state)
                } else {
                    f.to_bits().hash(state)
                }
            }
            Self::Text(s) => s.hash(state),
            Self::Uuid(u) => u.hash(state),
            Self::Object(object) => object.hash(state),
            Self::Reference(proxy) => proxy.key().hash(state),
            // Collections hash by shape only; equal collections still collide.
            Self::Collection(collection) => collection.flavor_tag().hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(fl) => write!(f, "{}", fl),
            Self::Text(s) => write!(f, "{}", s),
            Self::Uuid(u) => write!(f, "{}", u),
            Self::Object(object) => write!(f, "{:?}", object),
            Self::Reference(proxy) => write!(f, "ref {}", proxy.key()),
            Self::Collection(collection) => write!(f, "{:?}", collection),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Self::Uuid(u)
    }
}

impl From<ObjectRef> for Value {
    fn from(object: ObjectRef) -> Self {
        Self::Object(object)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Self::Object(ObjectRef::new(object))
    }
}

impl From<EntityProxy> for Value {
    fn from(proxy: EntityProxy) -> Self {
        Self::Reference(proxy)
    }
}

impl From<PlainCollection> for Value {
    fn from(collection: PlainCollection) -> Self {
        Self::Collection(Collection::Plain(collection))
    }
}

impl From<Collection> for Value {
    fn from(collection: Collection) -> Self {
        Self::Collection(collection)
    }
}

impl From<&Identifier> for Value {
    fn from(id: &Identifier) -> Self {
        match id {
            Identifier::Integer(v) => Self::Integer(*v),
            Identifier::Text(v) => Self::Text(v.clone()),
            Identifier::Uuid(v) => Self::Uuid(*v),
        }
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}
