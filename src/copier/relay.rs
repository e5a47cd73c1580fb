use super::FieldMapper;
use crate::core::{ObjectRef, Result, Value};
use crate::pointer::DetachedProperties;

/// Moves walker pointers from source objects onto their copies.
///
/// A field that has a pointer on the source is never copied; the pointer is
/// re-recorded against the destination's identity instead. Everything else
/// falls through to the copier.
pub struct PointerRelay<'a> {
    source: &'a DetachedProperties,
    dest: &'a mut DetachedProperties,
    relayed: usize,
}

impl<'a> PointerRelay<'a> {
    pub fn new(source: &'a DetachedProperties, dest: &'a mut DetachedProperties) -> Self {
        Self {
            source,
            dest,
            relayed: 0,
        }
    }

    pub fn relayed(&self) -> usize {
        self.relayed
    }
}

impl FieldMapper for PointerRelay<'_> {
    fn map_field(
        &mut self,
        source: &ObjectRef,
        dest: &ObjectRef,
        field: &str,
        _value: &Value,
    ) -> Result<bool> {
        match self.source.pointer_for(source, field) {
            Some(pointer) => {
                self.dest.add(dest, pointer.clone());
                self.relayed += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::copier::{GraphCopier, ObjectCopier};
    use crate::core::{EntityClass, EntityKey, Identifier, Object};
    use crate::pointer::{PointerOwner, PropertyPointer};

    #[test]
    fn test_pointer_follows_the_copy() {
        let source = ObjectRef::new(
            Object::new("Customer")
                .with("id", 1i64)
                .with("name", "Ann")
                .with("address", Value::Null),
        );
        let mut walked = DetachedProperties::new();
        walked.add(
            &source,
            PropertyPointer::reference(
                PointerOwner::new(EntityClass::new("Customer"), Some(Identifier::Integer(1))),
                "address",
                EntityKey::new("Address", 5),
            ),
        );

        let mut relayed = DetachedProperties::new();
        let mut relay = PointerRelay::new(&walked, &mut relayed);
        let copy = GraphCopier::new()
            .copy(&Value::Object(source.clone()), &mut relay)
            .unwrap();
        assert_eq!(relay.relayed(), 1);

        let copy = copy.as_object().unwrap().clone();
        assert!(relayed.pointer_for(&copy, "address").is_some());
        assert!(relayed.pointer_for(&source, "address").is_none());
        assert_eq!(copy.get("address").unwrap(), Value::Null);
    }
}
