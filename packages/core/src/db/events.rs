//! Domain Events for Metadata Mutations
//!
//! Handlers emit a `MetadataEvent` after every successful mutation. Events go
//! out over a tokio broadcast channel so any number of listeners (audit
//! writers, change feeds) can observe the repository without coupling to the
//! handlers.
//!
//! # Event Flow
//!
//! 1. A handler completes a store write
//! 2. The matching event is sent on the broadcast channel
//! 3. Every subscriber receives its own clone
//!
//! Sending never blocks and never fails the operation; with no subscribers the
//! event is simply dropped.

use serde::{Deserialize, Serialize};

use crate::models::{MetadataElement, Relationship};

/// Domain events emitted by the handlers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum MetadataEvent {
    /// A new element was stored
    #[serde(rename = "element:created")]
    ElementCreated {
        user_id: String,
        element: MetadataElement,
    },

    /// Properties or window of an element changed
    #[serde(rename = "element:updated")]
    ElementUpdated {
        user_id: String,
        element: MetadataElement,
    },

    /// An element and everything anchored to it was removed
    #[serde(rename = "element:deleted")]
    ElementDeleted {
        user_id: String,
        guid: String,
        cascaded_guids: Vec<String>,
    },

    /// A classification was added, updated or removed
    #[serde(rename = "element:classified")]
    ClassificationChanged {
        user_id: String,
        guid: String,
        classification_name: String,
        removed: bool,
    },

    /// The zone membership list was overwritten
    #[serde(rename = "element:zones")]
    ZonesChanged {
        user_id: String,
        guid: String,
        zones: Vec<String>,
    },

    #[serde(rename = "relationship:created")]
    RelationshipCreated {
        user_id: String,
        relationship: Relationship,
    },

    #[serde(rename = "relationship:updated")]
    RelationshipUpdated {
        user_id: String,
        relationship: Relationship,
    },

    #[serde(rename = "relationship:deleted")]
    RelationshipDeleted { user_id: String, guid: String },
}

impl MetadataEvent {
    /// String form of the event type (matches the serialized `type` tag)
    pub fn event_type(&self) -> &str {
        match self {
            Self::ElementCreated { .. } => "element:created",
            Self::ElementUpdated { .. } => "element:updated",
            Self::ElementDeleted { .. } => "element:deleted",
            Self::ClassificationChanged { .. } => "element:classified",
            Self::ZonesChanged { .. } => "element:zones",
            Self::RelationshipCreated { .. } => "relationship:created",
            Self::RelationshipUpdated { .. } => "relationship:updated",
            Self::RelationshipDeleted { .. } => "relationship:deleted",
        }
    }

    /// User whose call produced the event
    pub fn user_id(&self) -> &str {
        match self {
            Self::ElementCreated { user_id, .. }
            | Self::ElementUpdated { user_id, .. }
            | Self::ElementDeleted { user_id, .. }
            | Self::ClassificationChanged { user_id, .. }
            | Self::ZonesChanged { user_id, .. }
            | Self::RelationshipCreated { user_id, .. }
            | Self::RelationshipUpdated { user_id, .. }
            | Self::RelationshipDeleted { user_id, .. } => user_id,
        }
    }
}
