use crate::core::{ObjectRef, Value};
use log::error;

/// Getter that never fails: a reflection error is logged and reads as absent.
pub(crate) fn read_property(object: &ObjectRef, name: &str) -> Option<Value> {
    match object.get(name) {
        Ok(value) => Some(value),
        Err(err) => {
            error!("Error while invoking getter '{}' on {:?}: {}", name, object, err);
            None
        }
    }
}

/// Setter that never fails: a reflection error is logged and the write skipped.
pub(crate) fn write_property(object: &ObjectRef, name: &str, value: Value) -> bool {
    match object.set(name, value) {
        Ok(()) => true,
        Err(err) => {
            error!("Error while invoking setter '{}' on {:?}: {}", name, object, err);
            false
        }
    }
}
