//! Type System
//!
//! - `TypeSystem` - trait the handlers query for type existence and inheritance
//! - `TypeRegistry` - in-process implementation with the built-in types
//! - `resolve` - supplied-or-default type resolution for new instances

mod resolver;
mod type_system;

pub use resolver::{resolve, ResolvedType};
pub use type_system::{derive_type_guid, EndDef, TypeCategory, TypeDef, TypeRegistry, TypeSystem};
