//! Property Builders
//!
//! Builders assemble the property bag, effectivity window, optional
//! classification and zone list for a new or updated element. They never
//! touch the store.
//!
//! # Property Order
//!
//! 1. Semantic fields (`qualifiedName`, `displayName`, `description`, then the
//!    kind-specific fields in the order they were set)
//! 2. `additionalProperties` as a nested map
//! 3. Extended properties, only for keys not already present, so an explicit
//!    semantic field always wins
//!
//! # Examples
//!
//! ```rust
//! use metaspace_core::services::builders::{CollectionBuilder, PropertyBuilder};
//! use serde_json::json;
//!
//! let mut extended = serde_json::Map::new();
//! extended.insert("collectionType".to_string(), json!("ignored"));
//! extended.insert("retention".to_string(), json!("30d"));
//!
//! let builder = CollectionBuilder::new()
//!     .with_qualified_name("Collection::hr")
//!     .with_collection_type("policies")
//!     .with_extended_properties(extended)
//!     .into_element_builder();
//!
//! let properties = builder.build_properties();
//! assert_eq!(properties["collectionType"], json!("policies"));
//! assert_eq!(properties["retention"], json!("30d"));
//! ```

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::models::names::properties;
use crate::models::{
    Classification, CommentType, EffectivityWindow, MembershipStatus, PropertyMap,
};
use crate::services::bean_factory::StoredEnum;

use super::error::{HandlerError, HandlerResult};

/// Common base shared by every kind-specific builder
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementBuilder {
    qualified_name: Option<String>,
    display_name: Option<String>,
    description: Option<String>,
    semantic: PropertyMap,
    additional_properties: Option<PropertyMap>,
    extended_properties: PropertyMap,
    window: EffectivityWindow,
    classification: Option<Classification>,
    zones: Vec<String>,
}

impl ElementBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a kind-specific semantic property
    pub fn set_property(&mut self, name: &str, value: Value) {
        self.semantic.insert(name.to_string(), value);
    }

    /// Remove a kind-specific semantic property
    pub fn clear_property(&mut self, name: &str) {
        self.semantic.remove(name);
    }

    pub fn qualified_name(&self) -> Option<&str> {
        self.qualified_name.as_deref()
    }

    pub fn window(&self) -> &EffectivityWindow {
        &self.window
    }

    pub fn classification(&self) -> Option<&Classification> {
        self.classification.as_ref()
    }

    pub fn zones(&self) -> &[String] {
        &self.zones
    }

    /// Assemble the ordered property bag
    pub fn build_properties(&self) -> PropertyMap {
        let mut bag = PropertyMap::new();
        if let Some(qualified_name) = &self.qualified_name {
            bag.insert(properties::QUALIFIED_NAME.to_string(), json!(qualified_name));
        }
        if let Some(display_name) = &self.display_name {
            bag.insert(properties::DISPLAY_NAME.to_string(), json!(display_name));
        }
        if let Some(description) = &self.description {
            bag.insert(properties::DESCRIPTION.to_string(), json!(description));
        }
        for (name, value) in &self.semantic {
            bag.insert(name.clone(), value.clone());
        }
        if let Some(additional) = &self.additional_properties {
            bag.insert(
                properties::ADDITIONAL_PROPERTIES.to_string(),
                Value::Object(additional.clone()),
            );
        }
        for (name, value) in &self.extended_properties {
            if !bag.contains_key(name) {
                bag.insert(name.clone(), value.clone());
            }
        }
        bag
    }
}

/// Setters shared by all builders
///
/// Implementors only provide access to their `ElementBuilder` base; the common
/// semantic fields come for free.
pub trait PropertyBuilder: Sized {
    fn base_mut(&mut self) -> &mut ElementBuilder;

    fn into_element_builder(self) -> ElementBuilder;

    fn with_qualified_name(mut self, qualified_name: impl Into<String>) -> Self {
        self.base_mut().qualified_name = Some(qualified_name.into());
        self
    }

    fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.base_mut().display_name = Some(display_name.into());
        self
    }

    fn with_description(mut self, description: impl Into<String>) -> Self {
        self.base_mut().description = Some(description.into());
        self
    }

    fn with_additional_properties(mut self, additional: PropertyMap) -> Self {
        self.base_mut().additional_properties = Some(additional);
        self
    }

    fn with_extended_properties(mut self, extended: PropertyMap) -> Self {
        self.base_mut().extended_properties = extended;
        self
    }

    fn with_window(mut self, window: EffectivityWindow) -> Self {
        self.base_mut().window = window;
        self
    }

    fn with_effective_from(mut self, from: DateTime<Utc>) -> Self {
        self.base_mut().window.effective_from = Some(from);
        self
    }

    fn with_effective_to(mut self, to: DateTime<Utc>) -> Self {
        self.base_mut().window.effective_to = Some(to);
        self
    }

    /// Attach a single classification stored alongside the element
    fn with_classification(
        mut self,
        name: impl Into<String>,
        properties: PropertyMap,
        window: EffectivityWindow,
    ) -> Self {
        self.base_mut().classification = Some(Classification::new(name, properties).with_window(window));
        self
    }

    fn with_zones(mut self, zones: Vec<String>) -> Self {
        self.base_mut().zones = zones;
        self
    }
}

impl PropertyBuilder for ElementBuilder {
    fn base_mut(&mut self) -> &mut ElementBuilder {
        self
    }

    fn into_element_builder(self) -> ElementBuilder {
        self
    }
}

/// Builder for collections and their subtypes
#[derive(Debug, Clone, Default)]
pub struct CollectionBuilder {
    base: ElementBuilder,
}

impl CollectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection_type(mut self, collection_type: impl Into<String>) -> Self {
        self.base
            .set_property(properties::COLLECTION_TYPE, json!(collection_type.into()));
        self
    }
}

impl PropertyBuilder for CollectionBuilder {
    fn base_mut(&mut self) -> &mut ElementBuilder {
        &mut self.base
    }

    fn into_element_builder(self) -> ElementBuilder {
        self.base
    }
}

/// Builder for person roles and their subtypes
#[derive(Debug, Clone, Default)]
pub struct PersonRoleBuilder {
    base: ElementBuilder,
}

impl PersonRoleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.base.set_property(properties::SCOPE, json!(scope.into()));
        self
    }

    pub fn with_domain_identifier(mut self, domain_identifier: i64) -> Self {
        self.base
            .set_property(properties::DOMAIN_IDENTIFIER, json!(domain_identifier));
        self
    }

    /// Drop any domain identifier set earlier
    pub fn without_domain_identifier(mut self) -> Self {
        self.base.clear_property(properties::DOMAIN_IDENTIFIER);
        self
    }

    pub fn with_head_count(mut self, head_count: i64) -> Self {
        self.base.set_property(properties::HEAD_COUNT, json!(head_count));
        self
    }

    pub fn with_head_count_limit_set(mut self, limit_set: bool) -> Self {
        self.base
            .set_property(properties::HEAD_COUNT_LIMIT_SET, json!(limit_set));
        self
    }
}

impl PropertyBuilder for PersonRoleBuilder {
    fn base_mut(&mut self) -> &mut ElementBuilder {
        &mut self.base
    }

    fn into_element_builder(self) -> ElementBuilder {
        self.base
    }
}

/// Builder for comments
#[derive(Debug, Clone, Default)]
pub struct CommentBuilder {
    base: ElementBuilder,
}

impl CommentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.base.set_property(properties::COMMENT_TEXT, json!(text.into()));
        self
    }

    pub fn with_comment_type(mut self, comment_type: CommentType) -> Self {
        self.base
            .set_property(properties::COMMENT_TYPE, json!(comment_type.symbolic_name()));
        self
    }

    pub fn with_is_public(mut self, is_public: bool) -> Self {
        self.base.set_property(properties::IS_PUBLIC, json!(is_public));
        self
    }
}

impl PropertyBuilder for CommentBuilder {
    fn base_mut(&mut self) -> &mut ElementBuilder {
        &mut self.base
    }

    fn into_element_builder(self) -> ElementBuilder {
        self.base
    }
}

/// Builder for valid value definitions and sets
#[derive(Debug, Clone, Default)]
pub struct ValidValueBuilder {
    base: ElementBuilder,
}

impl ValidValueBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.base.set_property(properties::CATEGORY, json!(category.into()));
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.base.set_property(properties::SCOPE, json!(scope.into()));
        self
    }

    pub fn with_preferred_value(mut self, preferred_value: impl Into<String>) -> Self {
        self.base
            .set_property(properties::PREFERRED_VALUE, json!(preferred_value.into()));
        self
    }

    pub fn with_is_deprecated(mut self, is_deprecated: bool) -> Self {
        self.base
            .set_property(properties::IS_DEPRECATED, json!(is_deprecated));
        self
    }
}

impl PropertyBuilder for ValidValueBuilder {
    fn base_mut(&mut self) -> &mut ElementBuilder {
        &mut self.base
    }

    fn into_element_builder(self) -> ElementBuilder {
        self.base
    }
}

/// Properties of a `CollectionMembership` relationship
///
/// Every supplied field is written, blank or zero values included. Status is
/// supplied as an ordinal and checked when the builder is consumed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MembershipBuilder {
    membership_rationale: Option<String>,
    status: Option<i64>,
    user_defined_status: Option<String>,
    confidence: Option<i64>,
    expression: Option<String>,
    steward: Option<String>,
    steward_type_name: Option<String>,
    steward_property_name: Option<String>,
    source: Option<String>,
    window: EffectivityWindow,
}

impl MembershipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_membership_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.membership_rationale = Some(rationale.into());
        self
    }

    /// Status ordinal (see `MembershipStatus`)
    pub fn with_status(mut self, ordinal: i64) -> Self {
        self.status = Some(ordinal);
        self
    }

    pub fn with_user_defined_status(mut self, status: impl Into<String>) -> Self {
        self.user_defined_status = Some(status.into());
        self
    }

    pub fn with_confidence(mut self, confidence: i64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    pub fn with_steward(
        mut self,
        steward: impl Into<String>,
        type_name: impl Into<String>,
        property_name: impl Into<String>,
    ) -> Self {
        self.steward = Some(steward.into());
        self.steward_type_name = Some(type_name.into());
        self.steward_property_name = Some(property_name.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_window(mut self, window: EffectivityWindow) -> Self {
        self.window = window;
        self
    }

    pub fn window(&self) -> EffectivityWindow {
        self.window
    }

    /// Relationship property bag; an unknown status ordinal is `InvalidInput` on `status`
    pub fn build(&self) -> HandlerResult<PropertyMap> {
        let mut bag = PropertyMap::new();
        let strings = [
            (properties::MEMBERSHIP_RATIONALE, &self.membership_rationale),
            (properties::USER_DEFINED_STATUS, &self.user_defined_status),
            (properties::EXPRESSION, &self.expression),
            (properties::STEWARD, &self.steward),
            (properties::STEWARD_TYPE_NAME, &self.steward_type_name),
            (properties::STEWARD_PROPERTY_NAME, &self.steward_property_name),
            (properties::SOURCE, &self.source),
        ];
        for (name, value) in strings {
            if let Some(value) = value {
                bag.insert(name.to_string(), json!(value));
            }
        }
        if let Some(ordinal) = self.status {
            let status = MembershipStatus::from_ordinal_strict(ordinal)
                .map_err(|e| HandlerError::invalid_input("status", e.to_string()))?;
            bag.insert(
                properties::MEMBERSHIP_STATUS.to_string(),
                json!(status.symbolic_name()),
            );
        }
        if let Some(confidence) = self.confidence {
            bag.insert(properties::CONFIDENCE.to_string(), json!(confidence));
        }
        Ok(bag)
    }
}

/// Properties of a `PersonRoleAppointment` relationship
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentBuilder {
    is_public: Option<bool>,
    window: EffectivityWindow,
}

impl AppointmentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_is_public(mut self, is_public: bool) -> Self {
        self.is_public = Some(is_public);
        self
    }

    pub fn with_window(mut self, window: EffectivityWindow) -> Self {
        self.window = window;
        self
    }

    pub fn window(&self) -> EffectivityWindow {
        self.window
    }

    pub fn build(&self) -> PropertyMap {
        let mut bag = PropertyMap::new();
        if let Some(is_public) = self.is_public {
            bag.insert(properties::IS_PUBLIC.to_string(), json!(is_public));
        }
        bag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semantic_fields_come_first() {
        let mut additional = PropertyMap::new();
        additional.insert("owner".to_string(), json!("hr"));
        let mut extended = PropertyMap::new();
        extended.insert("z-extra".to_string(), json!(1));

        let bag = PersonRoleBuilder::new()
            .with_extended_properties(extended)
            .with_additional_properties(additional)
            .with_head_count(2)
            .with_description("d")
            .with_qualified_name("qn")
            .into_element_builder()
            .build_properties();

        let keys: Vec<&str> = bag.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["qualifiedName", "description", "headCount", "additionalProperties", "z-extra"]
        );
    }

    #[test]
    fn test_extended_never_overrides_semantic() {
        let mut extended = PropertyMap::new();
        extended.insert("qualifiedName".to_string(), json!("sneaky"));
        extended.insert("text".to_string(), json!("sneaky"));

        let bag = CommentBuilder::new()
            .with_qualified_name("real")
            .with_text("real text")
            .with_extended_properties(extended)
            .into_element_builder()
            .build_properties();

        assert_eq!(bag["qualifiedName"], json!("real"));
        assert_eq!(bag["text"], json!("real text"));
    }

    #[test]
    fn test_unset_fields_are_absent() {
        let bag = CollectionBuilder::new()
            .with_display_name("only name")
            .into_element_builder()
            .build_properties();
        assert_eq!(bag.len(), 1);
        assert!(!bag.contains_key("qualifiedName"));
    }

    #[test]
    fn test_without_domain_identifier() {
        let bag = PersonRoleBuilder::new()
            .with_domain_identifier(5)
            .without_domain_identifier()
            .into_element_builder()
            .build_properties();
        assert!(!bag.contains_key("domainIdentifier"));
    }

    #[test]
    fn test_membership_writes_blank_and_zero_values() {
        let bag = MembershipBuilder::new()
            .with_membership_rationale("")
            .with_confidence(0)
            .with_status(4)
            .build()
            .unwrap();
        assert_eq!(bag["membershipRationale"], json!(""));
        assert_eq!(bag["confidence"], json!(0));
        assert_eq!(bag["membershipStatus"], json!("Validated"));
    }

    #[test]
    fn test_membership_rejects_unknown_status() {
        let err = MembershipBuilder::new().with_status(42).build().unwrap_err();
        assert_eq!(err.parameter(), Some("status"));
    }

    #[test]
    fn test_classification_attachment() {
        let builder = ElementBuilder::new()
            .with_classification("Confidentiality", PropertyMap::new(), EffectivityWindow::open())
            .into_element_builder();
        assert_eq!(
            builder.classification().map(|c| c.name.as_str()),
            Some("Confidentiality")
        );
    }
}
