//! Well-known Type, Property and Classification Names
//!
//! Stored property bags are keyed by these names. Builders write them and the
//! bean factory reads them back, so both sides must agree on the spelling.

/// Entity and relationship type names known to the default type registry
pub mod types {
    pub const REFERENCEABLE: &str = "Referenceable";
    pub const ASSET: &str = "Asset";

    pub const COLLECTION: &str = "Collection";
    pub const FOLDER: &str = "Folder";
    pub const DIGITAL_PRODUCT: &str = "DigitalProduct";

    pub const ACTOR_PROFILE: &str = "ActorProfile";
    pub const PERSON: &str = "Person";
    pub const PERSON_ROLE: &str = "PersonRole";
    pub const GOVERNANCE_ROLE: &str = "GovernanceRole";
    pub const PROJECT_MANAGER: &str = "ProjectManager";
    pub const COMMUNITY_MEMBER: &str = "CommunityMember";

    pub const COMMENT: &str = "Comment";

    pub const VALID_VALUE_DEFINITION: &str = "ValidValueDefinition";
    pub const VALID_VALUE_SET: &str = "ValidValueSet";

    pub const COLLECTION_MEMBERSHIP: &str = "CollectionMembership";
    pub const PERSON_ROLE_APPOINTMENT: &str = "PersonRoleAppointment";
    pub const ATTACHED_COMMENT: &str = "AttachedComment";
    pub const VALID_VALUE_MEMBER: &str = "ValidValueMember";
}

/// Property names used inside element and relationship property bags
pub mod properties {
    pub const QUALIFIED_NAME: &str = "qualifiedName";
    pub const DISPLAY_NAME: &str = "displayName";
    pub const DESCRIPTION: &str = "description";
    pub const ADDITIONAL_PROPERTIES: &str = "additionalProperties";

    pub const COLLECTION_TYPE: &str = "collectionType";

    pub const SCOPE: &str = "scope";
    pub const DOMAIN_IDENTIFIER: &str = "domainIdentifier";
    pub const HEAD_COUNT: &str = "headCount";
    pub const HEAD_COUNT_LIMIT_SET: &str = "headCountLimitSet";

    pub const COMMENT_TEXT: &str = "text";
    pub const COMMENT_TYPE: &str = "commentType";
    pub const IS_PUBLIC: &str = "isPublic";

    pub const MEMBERSHIP_RATIONALE: &str = "membershipRationale";
    pub const MEMBERSHIP_STATUS: &str = "membershipStatus";
    pub const CONFIDENCE: &str = "confidence";
    pub const STEWARD: &str = "steward";
    pub const STEWARD_TYPE_NAME: &str = "stewardTypeName";
    pub const STEWARD_PROPERTY_NAME: &str = "stewardPropertyName";
    pub const SOURCE: &str = "source";
    pub const EXPRESSION: &str = "expression";
    pub const USER_DEFINED_STATUS: &str = "userDefinedStatus";

    pub const PREFERRED_VALUE: &str = "preferredValue";
    pub const IS_DEPRECATED: &str = "isDeprecated";
    pub const CATEGORY: &str = "category";
}

/// Classification names with behavior attached to them
pub mod classifications {
    /// Element is logically deleted but kept for lineage
    pub const MEMENTO: &str = "Memento";
    /// Element has been identified as a duplicate of another element
    pub const KNOWN_DUPLICATE: &str = "KnownDuplicate";
    pub const CONFIDENTIALITY: &str = "Confidentiality";
    pub const CRITICALITY: &str = "Criticality";
    pub const TEMPLATE: &str = "Template";
}
