//! Typed Result Beans
//!
//! Strongly typed views over stored elements, returned by the handlers.
//! Each bean decodes its property bag in a single pass through
//! `PropertyExtractor`; properties it does not know about are kept in
//! `extended_properties`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::names::{properties, types};
use super::{
    Classification, CommentType, EffectivityWindow, MembershipStatus, MetadataElement,
    PropertyMap, Relationship,
};
use crate::services::bean_factory::{MetadataBean, PropertyExtractor, TypeMappingError};
use crate::services::error::HandlerResult;

/// Instance header shared by every bean
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementHeader {
    pub guid: String,
    pub type_guid: String,
    pub type_name: String,
    pub version: i64,
    pub created_by: String,
    pub updated_by: Option<String>,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
    pub window: EffectivityWindow,
    pub anchor_guid: Option<String>,
    pub zone_membership: Vec<String>,
    pub external_source: Option<String>,
    pub classifications: Vec<Classification>,
}

impl From<&MetadataElement> for ElementHeader {
    fn from(element: &MetadataElement) -> Self {
        Self {
            guid: element.guid.clone(),
            type_guid: element.type_guid.clone(),
            type_name: element.type_name.clone(),
            version: element.version,
            created_by: element.created_by.clone(),
            updated_by: element.updated_by.clone(),
            create_time: element.create_time,
            update_time: element.update_time,
            window: element.window,
            anchor_guid: element.anchor_guid.clone(),
            zone_membership: element.zone_membership.clone(),
            external_source: element.external_source.clone(),
            classifications: element.classifications.clone(),
        }
    }
}

fn take_additional(extractor: &mut PropertyExtractor) -> Result<PropertyMap, TypeMappingError> {
    Ok(extractor
        .take_map(properties::ADDITIONAL_PROPERTIES)?
        .unwrap_or_default())
}

/// Any referenceable element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceableElement {
    pub header: ElementHeader,
    pub qualified_name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub additional_properties: PropertyMap,
    pub extended_properties: PropertyMap,
}

impl MetadataBean for ReferenceableElement {
    const TYPE_NAME: &'static str = types::REFERENCEABLE;

    fn from_stored(element: &MetadataElement, _: Option<&Relationship>) -> HandlerResult<Self> {
        let mut extractor = PropertyExtractor::new(&element.properties);
        Ok(Self {
            header: element.into(),
            qualified_name: extractor.require_string(properties::QUALIFIED_NAME)?,
            display_name: extractor.take_string(properties::DISPLAY_NAME)?,
            description: extractor.take_string(properties::DESCRIPTION)?,
            additional_properties: take_additional(&mut extractor)?,
            extended_properties: extractor.into_extended(),
        })
    }
}

/// Collection (or one of its subtypes)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionElement {
    pub header: ElementHeader,
    pub qualified_name: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub collection_type: Option<String>,
    pub additional_properties: PropertyMap,
    pub extended_properties: PropertyMap,
}

impl MetadataBean for CollectionElement {
    const TYPE_NAME: &'static str = types::COLLECTION;

    fn from_stored(element: &MetadataElement, _: Option<&Relationship>) -> HandlerResult<Self> {
        let mut extractor = PropertyExtractor::new(&element.properties);
        Ok(Self {
            header: element.into(),
            qualified_name: extractor.require_string(properties::QUALIFIED_NAME)?,
            name: extractor.take_string(properties::DISPLAY_NAME)?,
            description: extractor.take_string(properties::DESCRIPTION)?,
            collection_type: extractor.take_string(properties::COLLECTION_TYPE)?,
            additional_properties: take_additional(&mut extractor)?,
            extended_properties: extractor.into_extended(),
        })
    }
}

/// Properties of a `CollectionMembership` relationship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipProperties {
    pub relationship_guid: String,
    pub membership_rationale: Option<String>,
    pub status: MembershipStatus,
    pub user_defined_status: Option<String>,
    pub confidence: i64,
    pub expression: Option<String>,
    pub steward: Option<String>,
    pub steward_type_name: Option<String>,
    pub steward_property_name: Option<String>,
    pub source: Option<String>,
    pub window: EffectivityWindow,
    pub create_time: DateTime<Utc>,
}

impl MembershipProperties {
    pub fn from_relationship(relationship: &Relationship) -> Result<Self, TypeMappingError> {
        let mut extractor = PropertyExtractor::new(&relationship.properties);
        Ok(Self {
            relationship_guid: relationship.guid.clone(),
            membership_rationale: extractor.take_string(properties::MEMBERSHIP_RATIONALE)?,
            status: extractor
                .take_enum::<MembershipStatus>(properties::MEMBERSHIP_STATUS)
                .value(),
            user_defined_status: extractor.take_string(properties::USER_DEFINED_STATUS)?,
            confidence: extractor.take_int(properties::CONFIDENCE)?.unwrap_or(0),
            expression: extractor.take_string(properties::EXPRESSION)?,
            steward: extractor.take_string(properties::STEWARD)?,
            steward_type_name: extractor.take_string(properties::STEWARD_TYPE_NAME)?,
            steward_property_name: extractor.take_string(properties::STEWARD_PROPERTY_NAME)?,
            source: extractor.take_string(properties::SOURCE)?,
            window: relationship.window,
            create_time: relationship.create_time,
        })
    }
}

/// Element found through a collection, with its membership details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionMember {
    pub element: ReferenceableElement,
    pub membership: Option<MembershipProperties>,
}

impl MetadataBean for CollectionMember {
    const TYPE_NAME: &'static str = types::REFERENCEABLE;

    fn from_stored(
        element: &MetadataElement,
        relationship: Option<&Relationship>,
    ) -> HandlerResult<Self> {
        Ok(Self {
            element: ReferenceableElement::from_stored(element, None)?,
            membership: relationship
                .map(MembershipProperties::from_relationship)
                .transpose()?,
        })
    }
}

/// Person role (or one of its subtypes)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRoleElement {
    pub header: ElementHeader,
    pub qualified_name: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub scope: Option<String>,
    pub domain_identifier: i64,
    pub head_count: i64,
    pub head_count_limit_set: bool,
    pub additional_properties: PropertyMap,
    pub extended_properties: PropertyMap,
}

impl MetadataBean for PersonRoleElement {
    const TYPE_NAME: &'static str = types::PERSON_ROLE;

    fn from_stored(element: &MetadataElement, _: Option<&Relationship>) -> HandlerResult<Self> {
        let mut extractor = PropertyExtractor::new(&element.properties);
        Ok(Self {
            header: element.into(),
            qualified_name: extractor.require_string(properties::QUALIFIED_NAME)?,
            name: extractor.take_string(properties::DISPLAY_NAME)?,
            description: extractor.take_string(properties::DESCRIPTION)?,
            scope: extractor.take_string(properties::SCOPE)?,
            domain_identifier: extractor.take_int(properties::DOMAIN_IDENTIFIER)?.unwrap_or(0),
            head_count: extractor.take_int(properties::HEAD_COUNT)?.unwrap_or(1),
            head_count_limit_set: extractor
                .take_bool(properties::HEAD_COUNT_LIMIT_SET)?
                .unwrap_or(false),
            additional_properties: take_additional(&mut extractor)?,
            extended_properties: extractor.into_extended(),
        })
    }
}

/// Person appointed to a role, with the appointment details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRoleAppointee {
    pub profile: ReferenceableElement,
    pub appointment_guid: Option<String>,
    pub is_public: bool,
    pub appointment_window: EffectivityWindow,
}

impl MetadataBean for PersonRoleAppointee {
    const TYPE_NAME: &'static str = types::PERSON;

    fn from_stored(
        element: &MetadataElement,
        relationship: Option<&Relationship>,
    ) -> HandlerResult<Self> {
        let is_public = match relationship {
            Some(rel) => PropertyExtractor::new(&rel.properties)
                .take_bool(properties::IS_PUBLIC)?
                .unwrap_or(true),
            None => true,
        };
        Ok(Self {
            profile: ReferenceableElement::from_stored(element, None)?,
            appointment_guid: relationship.map(|r| r.guid.clone()),
            is_public,
            appointment_window: relationship.map(|r| r.window).unwrap_or_default(),
        })
    }
}

/// Comment attached to an element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentElement {
    pub header: ElementHeader,
    pub qualified_name: String,
    pub text: Option<String>,
    pub comment_type: CommentType,
    pub is_public: bool,
    pub additional_properties: PropertyMap,
    pub extended_properties: PropertyMap,
}

impl MetadataBean for CommentElement {
    const TYPE_NAME: &'static str = types::COMMENT;

    fn from_stored(element: &MetadataElement, _: Option<&Relationship>) -> HandlerResult<Self> {
        let mut extractor = PropertyExtractor::new(&element.properties);
        Ok(Self {
            header: element.into(),
            qualified_name: extractor.require_string(properties::QUALIFIED_NAME)?,
            text: extractor.take_string(properties::COMMENT_TEXT)?,
            comment_type: extractor
                .take_enum::<CommentType>(properties::COMMENT_TYPE)
                .value(),
            is_public: extractor.take_bool(properties::IS_PUBLIC)?.unwrap_or(true),
            additional_properties: take_additional(&mut extractor)?,
            extended_properties: extractor.into_extended(),
        })
    }
}

/// Valid value definition or set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidValueElement {
    pub header: ElementHeader,
    pub qualified_name: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub scope: Option<String>,
    pub preferred_value: Option<String>,
    pub is_deprecated: bool,
    pub additional_properties: PropertyMap,
    pub extended_properties: PropertyMap,
}

impl MetadataBean for ValidValueElement {
    const TYPE_NAME: &'static str = types::VALID_VALUE_DEFINITION;

    fn from_stored(element: &MetadataElement, _: Option<&Relationship>) -> HandlerResult<Self> {
        let mut extractor = PropertyExtractor::new(&element.properties);
        Ok(Self {
            header: element.into(),
            qualified_name: extractor.require_string(properties::QUALIFIED_NAME)?,
            name: extractor.take_string(properties::DISPLAY_NAME)?,
            description: extractor.take_string(properties::DESCRIPTION)?,
            category: extractor.take_string(properties::CATEGORY)?,
            scope: extractor.take_string(properties::SCOPE)?,
            preferred_value: extractor.take_string(properties::PREFERRED_VALUE)?,
            is_deprecated: extractor.take_bool(properties::IS_DEPRECATED)?.unwrap_or(false),
            additional_properties: take_additional(&mut extractor)?,
            extended_properties: extractor.into_extended(),
        })
    }
}
