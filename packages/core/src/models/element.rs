//! Metadata Element Data Structures
//!
//! This module defines `MetadataElement`, the universal stored entity, and the
//! `Classification` sub-bags attached to it.
//!
//! # Architecture
//!
//! - **Universal Element**: one struct represents every entity type
//! - **Property Bag**: all type-specific data lives in the ordered `properties` map
//! - **Anchors**: `anchor_guid` names the owning element; deleting the anchor
//!   deletes everything anchored to it
//! - **Zones**: `zone_membership` gates which callers can see the element
//!
//! # Examples
//!
//! ```rust
//! use metaspace_core::models::{MetadataElement, PropertyMap};
//! use serde_json::json;
//!
//! let mut properties = PropertyMap::new();
//! properties.insert("qualifiedName".to_string(), json!("Collection::hr"));
//!
//! let element = MetadataElement::new("type-guid", "Collection", properties);
//! assert_eq!(element.qualified_name(), Some("Collection::hr"));
//! assert!(element.validate().is_ok());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::names::properties;
use super::EffectivityWindow;

/// Ordered property bag (insertion order is preserved)
pub type PropertyMap = serde_json::Map<String, Value>;

/// Validation errors for stored items and their inputs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Field must not be blank: {0}")]
    BlankField(String),

    #[error("Effective-from {from} is after effective-to {to}")]
    InvalidWindow {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },

    #[error("Properties validation failed: {0}")]
    InvalidProperties(String),

    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Invalid type definition: {0}")]
    InvalidTypeDefinition(String),
}

impl ValidationError {
    /// Name of the caller-facing parameter this error is about
    pub fn parameter(&self) -> &str {
        match self {
            Self::MissingField(field) | Self::BlankField(field) => field,
            Self::InvalidWindow { .. } => "effectiveFrom",
            Self::InvalidProperties(_) => "properties",
            Self::UnknownType(_) => "typeName",
            Self::InvalidTypeDefinition(_) => "typeDef",
        }
    }
}

/// Named property sub-bag attached to an element with its own window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub name: String,

    #[serde(default)]
    pub properties: PropertyMap,

    #[serde(default)]
    pub window: EffectivityWindow,
}

impl Classification {
    pub fn new(name: impl Into<String>, properties: PropertyMap) -> Self {
        Self {
            name: name.into(),
            properties,
            window: EffectivityWindow::open(),
        }
    }

    pub fn with_window(mut self, window: EffectivityWindow) -> Self {
        self.window = window;
        self
    }
}

/// Universal stored entity
///
/// # Fields
///
/// - `guid`: unique across the whole graph
/// - `type_guid` / `type_name`: resolved type of the element
/// - `properties`: ordered bag of type-specific values
/// - `classifications`: independently managed sub-bags
/// - `window`: effectivity of the element itself
/// - `anchor_guid`: owning element whose deletion cascades to this one
/// - `zone_membership`: visibility zones (empty means unrestricted)
/// - `create_time` / `update_time`: assigned by the repository store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataElement {
    pub guid: String,

    pub type_guid: String,

    pub type_name: String,

    #[serde(default)]
    pub properties: PropertyMap,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classifications: Vec<Classification>,

    #[serde(default)]
    pub window: EffectivityWindow,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_guid: Option<String>,

    #[serde(default)]
    pub zone_membership: Vec<String>,

    /// Metadata collection (external source) that owns this element, if not local
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_source: Option<String>,

    pub created_by: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,

    pub create_time: DateTime<Utc>,

    pub update_time: DateTime<Utc>,

    /// Incremented by the store on every mutation
    pub version: i64,
}

impl MetadataElement {
    /// Create a new element with an auto-generated GUID
    pub fn new(
        type_guid: impl Into<String>,
        type_name: impl Into<String>,
        properties: PropertyMap,
    ) -> Self {
        let now = Utc::now();
        Self {
            guid: Uuid::new_v4().to_string(),
            type_guid: type_guid.into(),
            type_name: type_name.into(),
            properties,
            classifications: Vec::new(),
            window: EffectivityWindow::open(),
            anchor_guid: None,
            zone_membership: Vec::new(),
            external_source: None,
            created_by: String::new(),
            updated_by: None,
            create_time: now,
            update_time: now,
            version: 1,
        }
    }

    /// Validate structure before the element is handed to a store
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.guid.is_empty() {
            return Err(ValidationError::MissingField("guid".to_string()));
        }
        if self.type_name.is_empty() {
            return Err(ValidationError::MissingField("typeName".to_string()));
        }
        if let Some(anchor) = &self.anchor_guid {
            if anchor == &self.guid {
                return Err(ValidationError::InvalidProperties(
                    "element cannot anchor itself".to_string(),
                ));
            }
        }
        self.window.validate()?;
        for classification in &self.classifications {
            classification.window.validate()?;
        }
        Ok(())
    }

    pub fn qualified_name(&self) -> Option<&str> {
        self.string_property(properties::QUALIFIED_NAME)
    }

    pub fn string_property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).and_then(Value::as_str)
    }

    pub fn classification(&self, name: &str) -> Option<&Classification> {
        self.classifications.iter().find(|c| c.name == name)
    }

    pub fn has_classification(&self, name: &str) -> bool {
        self.classification(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn props(qualified_name: &str) -> PropertyMap {
        let mut map = PropertyMap::new();
        map.insert(properties::QUALIFIED_NAME.to_string(), json!(qualified_name));
        map
    }

    #[test]
    fn test_element_creation() {
        let element = MetadataElement::new("guid-1", "Collection", props("qn"));

        assert!(!element.guid.is_empty());
        assert_eq!(element.type_name, "Collection");
        assert_eq!(element.qualified_name(), Some("qn"));
        assert!(element.window.is_open());
        assert!(element.zone_membership.is_empty());
        assert_eq!(element.version, 1);
    }

    #[test]
    fn test_validation_rejects_self_anchor() {
        let mut element = MetadataElement::new("guid-1", "Comment", props("qn"));
        element.anchor_guid = Some(element.guid.clone());

        assert!(matches!(
            element.validate(),
            Err(ValidationError::InvalidProperties(_))
        ));
    }

    #[test]
    fn test_validation_checks_classification_windows() {
        let now = Utc::now();
        let mut element = MetadataElement::new("guid-1", "Asset", props("qn"));
        element.classifications.push(
            Classification::new("Confidentiality", PropertyMap::new()).with_window(
                EffectivityWindow::new(Some(now), Some(now - Duration::minutes(5))),
            ),
        );

        let err = element.validate().unwrap_err();
        assert_eq!(err.parameter(), "effectiveFrom");
    }

    #[test]
    fn test_property_order_is_preserved() {
        let mut map = PropertyMap::new();
        map.insert("zeta".to_string(), json!(1));
        map.insert("alpha".to_string(), json!(2));
        map.insert("mid".to_string(), json!(3));
        let element = MetadataElement::new("g", "Referenceable", map);

        let keys: Vec<&str> = element.properties.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_serialization_uses_camel_case() {
        let element = MetadataElement::new("g", "Referenceable", props("qn"));
        let json = serde_json::to_value(&element).unwrap();
        assert!(json.get("typeName").is_some());
        assert!(json.get("zoneMembership").is_some());
        assert!(json.get("anchorGuid").is_none());
    }
}
