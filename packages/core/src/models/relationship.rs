//! Relationship Data Structures
//!
//! A relationship is a typed, directed edge between two elements. End 1 and
//! end 2 are fixed by the relationship type definition (for example a
//! `CollectionMembership` always runs collection → member).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{EffectivityWindow, PropertyMap};

/// One end of a relationship
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipEnd {
    /// GUID of the element at this end
    pub guid: String,

    /// Type name of the element at this end
    pub type_name: String,

    /// Role the element plays in the relationship (e.g., "members")
    pub role: String,
}

impl RelationshipEnd {
    pub fn new(guid: impl Into<String>, type_name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            type_name: type_name.into(),
            role: role.into(),
        }
    }
}

/// Stored relationship instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub guid: String,

    pub type_guid: String,

    pub type_name: String,

    pub end1: RelationshipEnd,

    pub end2: RelationshipEnd,

    #[serde(default)]
    pub properties: PropertyMap,

    #[serde(default)]
    pub window: EffectivityWindow,

    pub created_by: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,

    /// Assigned by the store at creation; never changes afterwards.
    /// Used to break ties between duplicate relationships.
    pub create_time: DateTime<Utc>,

    pub update_time: DateTime<Utc>,

    pub version: i64,
}

impl Relationship {
    pub fn new(
        type_guid: impl Into<String>,
        type_name: impl Into<String>,
        end1: RelationshipEnd,
        end2: RelationshipEnd,
        properties: PropertyMap,
    ) -> Self {
        let now = Utc::now();
        Self {
            guid: Uuid::new_v4().to_string(),
            type_guid: type_guid.into(),
            type_name: type_name.into(),
            end1,
            end2,
            properties,
            window: EffectivityWindow::open(),
            created_by: String::new(),
            updated_by: None,
            create_time: now,
            update_time: now,
            version: 1,
        }
    }

    /// Whether `guid` sits at either end
    pub fn touches(&self, guid: &str) -> bool {
        self.end1.guid == guid || self.end2.guid == guid
    }

    /// The GUID at the opposite end from `guid`, if `guid` is an end at all
    pub fn other_end(&self, guid: &str) -> Option<&RelationshipEnd> {
        if self.end1.guid == guid {
            Some(&self.end2)
        } else if self.end2.guid == guid {
            Some(&self.end1)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Relationship {
        Relationship::new(
            "type-guid",
            "CollectionMembership",
            RelationshipEnd::new("c1", "Collection", "memberOf"),
            RelationshipEnd::new("e1", "Asset", "members"),
            PropertyMap::new(),
        )
    }

    #[test]
    fn test_ends() {
        let rel = sample();
        assert!(rel.touches("c1"));
        assert!(rel.touches("e1"));
        assert!(!rel.touches("x"));
        assert_eq!(rel.other_end("c1").map(|e| e.guid.as_str()), Some("e1"));
        assert_eq!(rel.other_end("e1").map(|e| e.guid.as_str()), Some("c1"));
        assert!(rel.other_end("x").is_none());
    }
}
