//! Node types, their fields, and the objects that hold their values

mod distribution;
mod export;
mod field;
mod node_type;
mod object;
mod persist;
mod proxy;
#[cfg(test)]
pub(crate) mod testing;
mod value;

pub use self::distribution::Distribution;
pub use self::field::{FieldDef, FieldType, ScalarType};
pub use self::node_type::{ExistenceQuery, NodeType};
pub use self::object::{KgObject, ObjectDiff};
pub use self::persist::SaveOptions;
pub use self::proxy::KgProxy;
pub use self::value::{NodeRef, Value};
