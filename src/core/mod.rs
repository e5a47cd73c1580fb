pub mod error;
pub mod object;
pub mod types;
pub mod value;

pub use error::{ModelError, Result};
pub use object::{Object, ObjectId, ObjectRef};
pub use types::{EntityClass, EntityKey, Identifier};
pub use value::Value;
