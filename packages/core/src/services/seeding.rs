//! Reference Data Seeding
//!
//! Bulk loaders create reference elements (valid values, value sets) only when
//! they are not already present. A `SeedCache` remembers the GUID of each
//! qualified name seen during one run so repeated references skip the store.
//!
//! The cache is an explicit object owned by the caller of a seeding run; there
//! is no process-wide cache. Each key is written once. While one task resolves
//! a qualified name, other tasks asking for the same name through the same
//! cache wait for its answer instead of searching and creating themselves.
//! Seeders using different caches are not coordinated and may each create an
//! element for the same qualified name.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

use crate::models::names::{properties, types};
use crate::models::{EffectivityWindow, PropertyMap, ValidValueElement};

use super::builders::{ElementBuilder, PropertyBuilder, ValidValueBuilder};
use super::context::HandlerContext;
use super::element_handler::{CreateOptions, FindOptions, GenericHandler};
use super::error::{HandlerError, HandlerResult};
use super::relationship_handler::{EndSpec, RelationshipHandler};

/// Per-run map of qualified name to GUID
#[derive(Debug, Default)]
pub struct SeedCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<String>>>>,
}

impl SeedCache {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, qualified_name: &str) -> Arc<OnceCell<String>> {
        self.entries
            .lock()
            .await
            .entry(qualified_name.to_string())
            .or_default()
            .clone()
    }

    pub async fn get(&self, qualified_name: &str) -> Option<String> {
        self.entries
            .lock()
            .await
            .get(qualified_name)
            .and_then(|slot| slot.get().cloned())
    }

    /// GUID cached for `qualified_name`, recording `make()` if there is none yet
    pub async fn get_or_insert_with<F>(&self, qualified_name: &str, make: F) -> String
    where
        F: FnOnce() -> String,
    {
        self.slot(qualified_name)
            .await
            .get_or_init(|| async move { make() })
            .await
            .clone()
    }

    /// Like `get_or_insert_with`, but `make` may fail
    ///
    /// Only one `make` runs per key at a time; concurrent callers wait for it.
    /// A failure leaves the key empty so a later call can try again.
    pub async fn get_or_try_insert_with<F, Fut>(
        &self,
        qualified_name: &str,
        make: F,
    ) -> HandlerResult<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = HandlerResult<String>>,
    {
        self.slot(qualified_name)
            .await
            .get_or_try_init(make)
            .await
            .cloned()
    }

    /// Number of resolved keys
    pub async fn len(&self) -> usize {
        self.entries
            .lock()
            .await
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Create-if-absent helper for reference elements
#[derive(Clone)]
pub struct ReferenceSeeder {
    user_id: String,
    values: GenericHandler<ValidValueElement>,
    relationships: RelationshipHandler,
}

impl ReferenceSeeder {
    pub fn new(ctx: HandlerContext, user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            values: GenericHandler::new(ctx.clone()),
            relationships: RelationshipHandler::new(ctx),
        }
    }

    /// GUID of the valid value with the builder's qualified name, creating it if needed
    ///
    /// `type_name` may name a subtype such as `ValidValueSet`.
    pub async fn ensure_valid_value(
        &self,
        cache: &SeedCache,
        builder: ValidValueBuilder,
        type_name: Option<&str>,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<String> {
        let builder = builder.into_element_builder();
        let qualified_name = builder
            .qualified_name()
            .map(str::to_string)
            .ok_or_else(|| HandlerError::invalid_input(properties::QUALIFIED_NAME, "must be supplied"))?;

        if let Some(guid) = cache.get(&qualified_name).await {
            tracing::debug!("Seed cache hit for {}", qualified_name);
            return Ok(guid);
        }

        cache
            .get_or_try_insert_with(&qualified_name, || {
                self.find_or_create(builder, &qualified_name, type_name, effective_time)
            })
            .await
    }

    async fn find_or_create(
        &self,
        builder: ElementBuilder,
        qualified_name: &str,
        type_name: Option<&str>,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<String> {
        let existing = self
            .values
            .find_by_name(
                &self.user_id,
                qualified_name,
                &[properties::QUALIFIED_NAME],
                FindOptions::page(0, 1),
                effective_time,
            )
            .await?;
        if let Some(found) = existing.into_iter().next() {
            return Ok(found.header.guid);
        }

        let mut options = CreateOptions::default();
        if let Some(type_name) = type_name {
            options = options.with_type_name(type_name);
        }
        let created = self
            .values
            .create_element(&self.user_id, builder, options, effective_time)
            .await?;
        tracing::info!("Seeded {} as {}", qualified_name, created);
        Ok(created)
    }

    /// Link a valid value into a set unless it is already a member
    pub async fn ensure_set_member(
        &self,
        set_guid: &str,
        value_guid: &str,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<String> {
        let existing = self
            .relationships
            .get_unique_attachment(
                set_guid,
                types::VALID_VALUE_SET,
                types::VALID_VALUE_MEMBER,
                value_guid,
                types::VALID_VALUE_DEFINITION,
                effective_time,
            )
            .await?;
        if let Some(relationship) = existing {
            return Ok(relationship.guid);
        }

        self.relationships
            .link(
                &self.user_id,
                EndSpec::new(set_guid, "validValueSetGUID", types::VALID_VALUE_SET),
                EndSpec::new(value_guid, "validValueGUID", types::VALID_VALUE_DEFINITION),
                types::VALID_VALUE_MEMBER,
                PropertyMap::new(),
                EffectivityWindow::open(),
                effective_time,
            )
            .await
    }
}
