use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Name of a persistent (or plain) class, e.g. `"Customer"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityClass(String);

impl EntityClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityClass {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for EntityClass {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Primary key of a persistent entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Identifier {
    Integer(i64),
    Text(String),
    Uuid(Uuid),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{}", v),
            Self::Text(v) => write!(f, "{}", v),
            Self::Uuid(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for Identifier {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for Identifier {
    fn from(v: i32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<&str> for Identifier {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Identifier {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Uuid> for Identifier {
    fn from(v: Uuid) -> Self {
        Self::Uuid(v)
    }
}

/// Class plus identifier: everything needed to ask a unit of work for a reference.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    pub class: EntityClass,
    pub id: Identifier,
}

impl EntityKey {
    pub fn new(class: impl Into<EntityClass>, id: impl Into<Identifier>) -> Self {
        Self {
            class: class.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.class, self.id)
    }
}
