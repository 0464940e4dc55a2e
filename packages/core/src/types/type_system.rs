//! Type System Boundary and Default Registry
//!
//! The handlers only ask the type system three questions: does this type
//! exist, is it a subtype of that one, and what is its GUID. `TypeRegistry`
//! answers them from an in-process map of type definitions.
//!
//! ## Architecture
//!
//! - **Single inheritance**: every definition names at most one supertype
//! - **Stable GUIDs**: default types get a name-based UUID (v5) so GUIDs are the
//!   same in every process
//! - **Relationship ends**: relationship definitions record the entity type and
//!   role expected at each end
//!
//! ## Example Usage
//!
//! ```rust
//! use metaspace_core::types::{TypeRegistry, TypeSystem};
//!
//! let registry = TypeRegistry::with_defaults();
//! assert!(registry.is_subtype_of("Folder", "Collection"));
//! assert!(registry.is_subtype_of("Collection", "Collection"));
//! assert!(!registry.is_subtype_of("Person", "Collection"));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::names::types;
use crate::models::ValidationError;

/// Kind of instance a type definition describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeCategory {
    Entity,
    Relationship,
    Classification,
}

/// Entity type and role expected at one end of a relationship type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndDef {
    pub type_name: String,
    pub role: String,
}

/// A registered type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDef {
    pub guid: String,
    pub name: String,
    pub category: TypeCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub super_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end1: Option<EndDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end2: Option<EndDef>,
}

impl TypeDef {
    /// Entity type with a name-derived GUID
    pub fn entity(name: &str, super_type: Option<&str>) -> Self {
        Self {
            guid: derive_type_guid(name),
            name: name.to_string(),
            category: TypeCategory::Entity,
            super_type: super_type.map(str::to_string),
            end1: None,
            end2: None,
        }
    }

    /// Relationship type with its end definitions
    pub fn relationship(name: &str, end1: (&str, &str), end2: (&str, &str)) -> Self {
        Self {
            guid: derive_type_guid(name),
            name: name.to_string(),
            category: TypeCategory::Relationship,
            super_type: None,
            end1: Some(EndDef {
                type_name: end1.0.to_string(),
                role: end1.1.to_string(),
            }),
            end2: Some(EndDef {
                type_name: end2.0.to_string(),
                role: end2.1.to_string(),
            }),
        }
    }

    pub fn classification(name: &str) -> Self {
        Self {
            guid: derive_type_guid(name),
            name: name.to_string(),
            category: TypeCategory::Classification,
            super_type: None,
            end1: None,
            end2: None,
        }
    }
}

/// Name-based GUID, identical across processes
pub fn derive_type_guid(name: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
}

/// Queries the handlers make against the type hierarchy
pub trait TypeSystem: Send + Sync {
    /// Look up a definition by name
    fn get_type(&self, name: &str) -> Option<&TypeDef>;

    /// Whether `name` equals `super_type` or inherits from it (transitively)
    fn is_subtype_of(&self, name: &str, super_type: &str) -> bool;

    /// GUID for a known type name
    fn resolve_type_guid(&self, name: &str) -> Option<String> {
        self.get_type(name).map(|def| def.guid.clone())
    }

    /// `name` plus every registered type that inherits from it
    fn subtypes_of(&self, name: &str) -> Vec<String>;
}

/// In-process type registry
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    defs: HashMap<String, TypeDef>,
}

impl TypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the types the built-in handlers use
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let entities: [(&str, Option<&str>); 15] = [
            (types::REFERENCEABLE, None),
            (types::ASSET, Some(types::REFERENCEABLE)),
            (types::COLLECTION, Some(types::REFERENCEABLE)),
            (types::FOLDER, Some(types::COLLECTION)),
            (types::DIGITAL_PRODUCT, Some(types::COLLECTION)),
            (types::ACTOR_PROFILE, Some(types::REFERENCEABLE)),
            (types::PERSON, Some(types::ACTOR_PROFILE)),
            (types::PERSON_ROLE, Some(types::REFERENCEABLE)),
            (types::GOVERNANCE_ROLE, Some(types::PERSON_ROLE)),
            (types::PROJECT_MANAGER, Some(types::PERSON_ROLE)),
            (types::COMMUNITY_MEMBER, Some(types::PERSON_ROLE)),
            (types::COMMENT, Some(types::REFERENCEABLE)),
            (types::VALID_VALUE_DEFINITION, Some(types::REFERENCEABLE)),
            (types::VALID_VALUE_SET, Some(types::VALID_VALUE_DEFINITION)),
            ("DataSet", Some(types::ASSET)),
        ];
        // Definitions are listed supertype-first, so registration cannot fail
        for (name, super_type) in entities {
            let _ = registry.register(TypeDef::entity(name, super_type));
        }

        let relationships = [
            TypeDef::relationship(
                types::COLLECTION_MEMBERSHIP,
                (types::COLLECTION, "memberOfCollections"),
                (types::REFERENCEABLE, "collectionMembers"),
            ),
            TypeDef::relationship(
                types::PERSON_ROLE_APPOINTMENT,
                (types::PERSON_ROLE, "performedBy"),
                (types::PERSON, "performsRoles"),
            ),
            TypeDef::relationship(
                types::ATTACHED_COMMENT,
                (types::REFERENCEABLE, "commentAnchor"),
                (types::COMMENT, "comments"),
            ),
            TypeDef::relationship(
                types::VALID_VALUE_MEMBER,
                (types::VALID_VALUE_SET, "validValueSet"),
                (types::VALID_VALUE_DEFINITION, "validValues"),
            ),
        ];
        for def in relationships {
            let _ = registry.register(def);
        }

        for name in [
            crate::models::names::classifications::MEMENTO,
            crate::models::names::classifications::KNOWN_DUPLICATE,
            crate::models::names::classifications::CONFIDENTIALITY,
            crate::models::names::classifications::CRITICALITY,
            crate::models::names::classifications::TEMPLATE,
        ] {
            let _ = registry.register(TypeDef::classification(name));
        }

        registry
    }

    /// Add a definition
    ///
    /// Fails when the name is taken, when the supertype is not registered yet,
    /// or when a relationship definition lacks an end.
    pub fn register(&mut self, def: TypeDef) -> Result<(), ValidationError> {
        if def.name.trim().is_empty() {
            return Err(ValidationError::InvalidTypeDefinition(
                "type name must not be blank".to_string(),
            ));
        }
        if self.defs.contains_key(&def.name) {
            return Err(ValidationError::InvalidTypeDefinition(format!(
                "type '{}' is already registered",
                def.name
            )));
        }
        if let Some(super_type) = &def.super_type {
            if !self.defs.contains_key(super_type) {
                return Err(ValidationError::UnknownType(super_type.clone()));
            }
        }
        if def.category == TypeCategory::Relationship && (def.end1.is_none() || def.end2.is_none()) {
            return Err(ValidationError::InvalidTypeDefinition(format!(
                "relationship type '{}' needs both ends",
                def.name
            )));
        }
        self.defs.insert(def.name.clone(), def);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

impl TypeSystem for TypeRegistry {
    fn get_type(&self, name: &str) -> Option<&TypeDef> {
        self.defs.get(name)
    }

    fn is_subtype_of(&self, name: &str, super_type: &str) -> bool {
        let mut current = self.defs.get(name);
        while let Some(def) = current {
            if def.name == super_type {
                return true;
            }
            current = def.super_type.as_deref().and_then(|s| self.defs.get(s));
        }
        false
    }

    fn subtypes_of(&self, name: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .defs
            .values()
            .filter(|def| def.category == TypeCategory::Entity && self.is_subtype_of(&def.name, name))
            .map(|def| def.name.clone())
            .collect();
        names.sort();
        names
    }
}
