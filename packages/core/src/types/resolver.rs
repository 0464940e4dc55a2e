//! Type Resolution
//!
//! Turns a caller-supplied (or defaulted) type name into the `(guid, name)`
//! pair stored on new instances.

use crate::services::error::{HandlerError, HandlerResult};

use super::TypeSystem;

/// Resolved type of a new instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedType {
    pub guid: String,
    pub name: String,
}

/// Resolve `supplied` against `default_type_name`
///
/// A missing (or blank) supplied name resolves to the default. A supplied name
/// must be known and must be the default itself or one of its subtypes;
/// anything else is `InvalidInput` naming `typeName`.
///
/// # Examples
///
/// ```rust
/// use metaspace_core::types::{resolve, TypeRegistry};
///
/// let registry = TypeRegistry::with_defaults();
/// let resolved = resolve(&registry, Some("Folder"), "Collection").unwrap();
/// assert_eq!(resolved.name, "Folder");
///
/// assert!(resolve(&registry, Some("Person"), "Collection").is_err());
/// ```
pub fn resolve(
    types: &dyn TypeSystem,
    supplied: Option<&str>,
    default_type_name: &str,
) -> HandlerResult<ResolvedType> {
    let name = match supplied.map(str::trim) {
        Some(name) if !name.is_empty() => name,
        _ => default_type_name,
    };

    let guid = types
        .resolve_type_guid(name)
        .ok_or_else(|| HandlerError::invalid_input("typeName", format!("unknown type '{}'", name)))?;

    if !types.is_subtype_of(name, default_type_name) {
        return Err(HandlerError::invalid_input(
            "typeName",
            format!("'{}' is not a subtype of '{}'", name, default_type_name),
        ));
    }

    Ok(ResolvedType {
        guid,
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeRegistry;

    #[test]
    fn test_absent_name_uses_default() {
        let registry = TypeRegistry::with_defaults();
        let resolved = resolve(&registry, None, "PersonRole").unwrap();
        assert_eq!(resolved.name, "PersonRole");
        assert_eq!(Some(resolved.guid), registry.resolve_type_guid("PersonRole"));

        let blank = resolve(&registry, Some("  "), "PersonRole").unwrap();
        assert_eq!(blank.name, "PersonRole");
    }

    #[test]
    fn test_unknown_type_is_invalid_input() {
        let registry = TypeRegistry::with_defaults();
        let err = resolve(&registry, Some("Spaceship"), "Collection").unwrap_err();
        assert_eq!(err.parameter(), Some("typeName"));
    }

    #[test]
    fn test_supertype_is_rejected() {
        let registry = TypeRegistry::with_defaults();
        let err = resolve(&registry, Some("Referenceable"), "Collection").unwrap_err();
        assert_eq!(err.parameter(), Some("typeName"));
    }
}
