use crate::core::{EntityClass, Identifier, ModelError, ObjectRef, Result, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyKind {
    Scalar,
    Association,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    pub name: String,
    pub kind: PropertyKind,
}

/// Declared shape of a managed class: identifier property plus ordered properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMetadata {
    class: EntityClass,
    identifier: String,
    properties: Vec<PropertyDescriptor>,
}

impl EntityMetadata {
    pub fn new(class: impl Into<EntityClass>, identifier: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            identifier: identifier.into(),
            properties: Vec::new(),
        }
    }

    pub fn scalar(self, name: impl Into<String>) -> Self {
        self.property(name, PropertyKind::Scalar)
    }

    pub fn association(self, name: impl Into<String>) -> Self {
        self.property(name, PropertyKind::Association)
    }

    pub fn property(mut self, name: impl Into<String>, kind: PropertyKind) -> Self {
        let name = name.into();
        self.properties.retain(|existing| existing.name != name);
        self.properties.push(PropertyDescriptor { name, kind });
        self
    }

    pub fn class(&self) -> &EntityClass {
        &self.class
    }

    pub fn identifier_property(&self) -> &str {
        &self.identifier
    }

    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|p| p.name.as_str())
    }

    pub fn property_type(&self, name: &str) -> Option<PropertyKind> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.kind)
    }

    pub fn associations(&self) -> impl Iterator<Item = &str> {
        self.properties
            .iter()
            .filter(|p| p.kind == PropertyKind::Association)
            .map(|p| p.name.as_str())
    }

    /// Reads the identifier of `instance`; `None` when it has not been assigned yet.
    pub fn identifier_of(&self, instance: &ObjectRef) -> Result<Option<Identifier>> {
        let object = instance.read()?;
        match object.field(&self.identifier) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Integer(v)) => Ok(Some(Identifier::Integer(*v))),
            Some(Value::Text(v)) => Ok(Some(Identifier::Text(v.clone()))),
            Some(Value::Uuid(v)) => Ok(Some(Identifier::Uuid(*v))),
            Some(other) => Err(ModelError::PreconditionViolation(format!(
                "identifier '{}' of {} has non-identifier type {}",
                self.identifier,
                self.class,
                other.type_name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Object;

    #[test]
    fn test_property_order_is_declaration_order() {
        let meta = EntityMetadata::new("Customer", "id")
            .scalar("name")
            .association("orders")
            .association("address");
        let names: Vec<_> = meta.property_names().collect();
        assert_eq!(names, vec!["name", "orders", "address"]);
        assert_eq!(meta.property_type("orders"), Some(PropertyKind::Association));
        assert_eq!(meta.property_type("missing"), None);
    }

    #[test]
    fn test_identifier_of_unassigned_is_none() {
        let meta = EntityMetadata::new("Customer", "id");
        let fresh = ObjectRef::new(Object::new("Customer"));
        assert_eq!(meta.identifier_of(&fresh).unwrap(), None);

        let stored = ObjectRef::new(Object::new("Customer").with("id", 9i64));
        assert_eq!(meta.identifier_of(&stored).unwrap(), Some(Identifier::Integer(9)));
    }
}
