//! MetadataStore Trait - Repository Abstraction Layer
//!
//! This module defines the `MetadataStore` trait that abstracts the graph
//! repository the handlers persist to. The handlers never see the storage
//! engine; they see this trait only.
//!
//! # Design Decisions
//!
//! 1. **Async**: every method is async so network-backed repositories fit the
//!    same seam as the embedded in-memory store
//! 2. **Ownership Semantics**: create methods take ownership of the instance and
//!    return the stored copy (with store-assigned timestamps)
//! 3. **Atomic single-instance writes**: each call applies fully or not at all;
//!    there are no multi-call transactions
//! 4. **Typed errors**: `StoreError` separates not-found/type-mismatch (caller
//!    problems) from unavailable/internal (store problems)
//!
//! # Examples
//!
//! ```rust
//! use metaspace_core::db::{InMemoryStore, MetadataStore};
//! use metaspace_core::models::{MetadataElement, PropertyMap};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let store: Arc<dyn MetadataStore> = Arc::new(InMemoryStore::new());
//! let element = MetadataElement::new("type-guid", "Referenceable", PropertyMap::new());
//! let stored = store.create_entity(element).await.unwrap();
//! assert!(store.get_entity(&stored.guid).await.unwrap().is_some());
//! # });
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::StoreResult;
use crate::models::{Classification, EffectivityWindow, MetadataElement, PropertyMap, Relationship};

/// How supplied properties are applied to an existing property bag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpdateMode {
    /// Only supplied keys overwrite; all other keys are kept
    Merge,
    /// Supplied bag replaces the stored bag wholesale
    Replace,
}

impl UpdateMode {
    pub fn from_merge_flag(is_merge_update: bool) -> Self {
        if is_merge_update {
            Self::Merge
        } else {
            Self::Replace
        }
    }
}

/// Property update for an existing entity
#[derive(Debug, Clone, PartialEq)]
pub struct EntityUpdate {
    pub properties: PropertyMap,
    pub mode: UpdateMode,
    /// New effectivity window; `None` keeps the stored one
    pub window: Option<EffectivityWindow>,
    /// Classification merged in as part of the same write
    pub classification: Option<Classification>,
    pub updated_by: String,
}

/// Property update for an existing relationship
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipUpdate {
    pub properties: PropertyMap,
    pub mode: UpdateMode,
    pub window: Option<EffectivityWindow>,
    pub updated_by: String,
}

/// Text matching applied by `find_entities`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchMode {
    /// Regular expression that must match the whole property value
    Pattern(String),
    /// Literal value compared for equality
    Exact(String),
}

/// Entity search request
///
/// All populated criteria are combined with AND. Within the text search the
/// listed properties are combined with OR.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityQuery {
    /// Accepted type names (callers expand subtypes); empty accepts any type
    pub type_names: Vec<String>,

    /// Text search; `None` matches every entity
    pub search: Option<SearchMode>,

    /// Properties the text search looks at; empty means every string property
    pub property_names: Vec<String>,

    /// Typed equality filters on top-level properties
    pub property_equals: Vec<(String, Value)>,

    /// Restrict to entities anchored to this GUID
    pub anchor_guid: Option<String>,

    /// Zero-based offset into the ordered result
    pub start_from: usize,

    /// Maximum results; 0 means unbounded
    pub page_size: usize,
}

impl EntityQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type_names(mut self, type_names: Vec<String>) -> Self {
        self.type_names = type_names;
        self
    }

    pub fn with_search(mut self, search: SearchMode) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_property_names(mut self, property_names: Vec<String>) -> Self {
        self.property_names = property_names;
        self
    }

    pub fn with_property_equals(mut self, name: impl Into<String>, value: Value) -> Self {
        self.property_equals.push((name.into(), value));
        self
    }

    pub fn with_anchor_guid(mut self, anchor_guid: impl Into<String>) -> Self {
        self.anchor_guid = Some(anchor_guid.into());
        self
    }

    pub fn with_paging(mut self, start_from: usize, page_size: usize) -> Self {
        self.start_from = start_from;
        self.page_size = page_size;
        self
    }
}

/// Relationship search request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationshipQuery {
    pub type_name: Option<String>,
    pub end1_guid: Option<String>,
    pub end2_guid: Option<String>,
    /// Matches relationships with this GUID at either end
    pub any_end_guid: Option<String>,
}

impl RelationshipQuery {
    pub fn between(
        type_name: impl Into<String>,
        end1_guid: impl Into<String>,
        end2_guid: impl Into<String>,
    ) -> Self {
        Self {
            type_name: Some(type_name.into()),
            end1_guid: Some(end1_guid.into()),
            end2_guid: Some(end2_guid.into()),
            any_end_guid: None,
        }
    }

    pub fn touching(guid: impl Into<String>) -> Self {
        Self {
            any_end_guid: Some(guid.into()),
            ..Default::default()
        }
    }

    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_end1(mut self, guid: impl Into<String>) -> Self {
        self.end1_guid = Some(guid.into());
        self
    }

    pub fn with_end2(mut self, guid: impl Into<String>) -> Self {
        self.end2_guid = Some(guid.into());
        self
    }
}

/// Result of a cascading delete
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteResult {
    /// Every entity removed, the requested one first
    pub deleted_entities: Vec<String>,
    /// Every relationship removed along with them
    pub deleted_relationships: Vec<String>,
}

/// Abstraction over the graph repository
///
/// # Ordering
///
/// `find_entities` and `find_relationships` return newest-created first.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; handlers share one store between
/// concurrent callers.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    //
    // ENTITIES
    //

    /// Store a new entity; the store assigns `create_time`/`update_time`
    async fn create_entity(&self, element: MetadataElement) -> StoreResult<MetadataElement>;

    /// Get an entity by GUID (`Ok(None)` when absent)
    async fn get_entity(&self, guid: &str) -> StoreResult<Option<MetadataElement>>;

    /// Apply a merge or replace property update
    ///
    /// The properties, window and classification in `update` land together or
    /// not at all.
    async fn update_entity(&self, guid: &str, update: EntityUpdate) -> StoreResult<MetadataElement>;

    /// Delete an entity and, transitively, everything anchored to it
    ///
    /// Relationships touching any deleted entity are deleted too. Fails with
    /// `EntityNotFound` when the GUID is unknown.
    async fn delete_entity(&self, guid: &str) -> StoreResult<DeleteResult>;

    /// Search entities
    async fn find_entities(&self, query: &EntityQuery) -> StoreResult<Vec<MetadataElement>>;

    /// Add a classification, or update an existing one of the same name
    async fn classify_entity(
        &self,
        guid: &str,
        classification: Classification,
        mode: UpdateMode,
    ) -> StoreResult<MetadataElement>;

    /// Remove a classification by name
    async fn declassify_entity(&self, guid: &str, name: &str) -> StoreResult<MetadataElement>;

    /// Overwrite the zone membership list
    async fn set_zone_membership(
        &self,
        guid: &str,
        zones: Vec<String>,
    ) -> StoreResult<MetadataElement>;

    //
    // RELATIONSHIPS
    //

    /// Store a new relationship; the store assigns a monotonic `create_time`
    async fn create_relationship(&self, relationship: Relationship) -> StoreResult<Relationship>;

    async fn get_relationship(&self, guid: &str) -> StoreResult<Option<Relationship>>;

    async fn update_relationship(
        &self,
        guid: &str,
        update: RelationshipUpdate,
    ) -> StoreResult<Relationship>;

    async fn delete_relationship(&self, guid: &str) -> StoreResult<()>;

    async fn find_relationships(&self, query: &RelationshipQuery) -> StoreResult<Vec<Relationship>>;
}
