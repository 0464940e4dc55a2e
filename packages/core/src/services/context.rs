//! Handler Context
//!
//! `HandlerContext` bundles the collaborators every handler needs: the
//! repository store, the type system, the security verifier, the handler
//! configuration with its zone policy, and the domain event channel.
//!
//! Contexts are cheap to clone (every collaborator sits behind an `Arc`).
//! `with_supported_zones` produces a context scoped to a different caller
//! zone set that still shares the store and the event channel.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::config::HandlerConfig;
use crate::db::{InMemoryStore, MetadataEvent, MetadataStore};
use crate::models::MetadataElement;
use crate::security::{AllowAll, Operation, SecurityVerifier};
use crate::types::{TypeRegistry, TypeSystem};

use super::error::{HandlerError, HandlerResult};
use super::policy::{self, ReadFlags, ZonePolicy};

/// Broadcast channel capacity for metadata events
pub const EVENT_CHANNEL_CAPACITY: usize = 128;

/// Shared collaborators for all handlers
#[derive(Clone)]
pub struct HandlerContext {
    store: Arc<dyn MetadataStore>,
    types: Arc<dyn TypeSystem>,
    security: Arc<dyn SecurityVerifier>,
    config: Arc<HandlerConfig>,
    zones: ZonePolicy,
    event_tx: broadcast::Sender<MetadataEvent>,
}

impl HandlerContext {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        types: Arc<dyn TypeSystem>,
        security: Arc<dyn SecurityVerifier>,
        config: HandlerConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            types,
            security,
            zones: ZonePolicy::from_config(&config),
            config: Arc::new(config),
            event_tx,
        }
    }

    /// Context over a fresh `InMemoryStore` with the default type registry
    /// and an allow-all verifier
    pub fn in_memory(config: HandlerConfig) -> Self {
        Self::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(TypeRegistry::with_defaults()),
            Arc::new(AllowAll),
            config,
        )
    }

    /// Copy of this context for callers limited to `supported_zones`
    pub fn with_supported_zones(&self, supported_zones: Vec<String>) -> Self {
        let mut cloned = self.clone();
        cloned.zones = self.zones.with_supported_zones(supported_zones);
        cloned
    }

    /// Copy of this context using a different security verifier
    pub fn with_security(&self, security: Arc<dyn SecurityVerifier>) -> Self {
        let mut cloned = self.clone();
        cloned.security = security;
        cloned
    }

    pub fn store(&self) -> &Arc<dyn MetadataStore> {
        &self.store
    }

    pub fn types(&self) -> &dyn TypeSystem {
        self.types.as_ref()
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    pub fn zones(&self) -> &ZonePolicy {
        &self.zones
    }

    /// Receive every metadata event emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<MetadataEvent> {
        self.event_tx.subscribe()
    }

    /// Fire-and-forget; an event with no subscribers is dropped
    pub(crate) fn emit(&self, event: MetadataEvent) {
        tracing::trace!("Emitting {} for {}", event.event_type(), event.user_id());
        let _ = self.event_tx.send(event);
    }

    pub(crate) fn authorize(
        &self,
        user_id: &str,
        operation: Operation,
        element: Option<&MetadataElement>,
    ) -> HandlerResult<()> {
        if self.security.authorize(user_id, operation, element).is_allowed() {
            return Ok(());
        }
        let target = element
            .map(|e| format!("{} {}", e.type_name, e.guid))
            .unwrap_or_else(|| "instance".to_string());
        tracing::info!("Denied {} {} on {}", user_id, operation, target);
        Err(HandlerError::not_authorized(user_id, operation, target))
    }

    /// Whether the caller may see the element at all (silent filter)
    pub(crate) fn is_permitted(&self, user_id: &str, element: &MetadataElement) -> bool {
        self.security
            .authorize(user_id, Operation::Read, Some(element))
            .is_allowed()
    }

    /// Whether the element passes the effectivity, zone and lineage filters
    pub(crate) fn is_retrievable(
        &self,
        element: &MetadataElement,
        flags: ReadFlags,
        effective_time: Option<DateTime<Utc>>,
    ) -> bool {
        policy::is_element_effective(element, effective_time)
            && self.zones.is_visible(element)
            && flags.admits(element, effective_time)
    }

    /// Fetch an element that must exist, be of `expected_type`, and be visible
    ///
    /// Every failure is `InvalidInput` naming `parameter`: an element outside
    /// the caller's effectivity or zones does not exist as far as the caller is
    /// concerned. Authorization is left to the caller.
    pub(crate) async fn fetch_visible_entity(
        &self,
        guid: &str,
        parameter: &str,
        expected_type: &str,
        flags: ReadFlags,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<MetadataElement> {
        validate_guid(guid, parameter)?;

        let element = self
            .store
            .get_entity(guid)
            .await
            .map_err(|e| HandlerError::from_store(e, parameter))?
            .ok_or_else(|| HandlerError::invalid_input(parameter, format!("no element {}", guid)))?;

        if !self.types.is_subtype_of(&element.type_name, expected_type) {
            return Err(HandlerError::invalid_input(
                parameter,
                format!("{} is a {}, not a {}", guid, element.type_name, expected_type),
            ));
        }

        if !self.is_retrievable(&element, flags, effective_time) {
            tracing::debug!("Element {} filtered out for {}", guid, parameter);
            return Err(HandlerError::invalid_input(
                parameter,
                format!("no element {}", guid),
            ));
        }

        Ok(policy::strip_ineffective_classifications(element, effective_time))
    }

    /// Resolve a caller page size against the configured bounds
    ///
    /// 0 means the configured default; anything above the maximum is rejected.
    pub(crate) fn page_size(&self, requested: usize) -> HandlerResult<usize> {
        if requested == 0 {
            return Ok(self.config.default_page_size);
        }
        if requested > self.config.max_page_size {
            return Err(HandlerError::invalid_input(
                "pageSize",
                format!(
                    "{} exceeds the maximum page size of {}",
                    requested, self.config.max_page_size
                ),
            ));
        }
        Ok(requested)
    }
}

pub(crate) fn validate_user(user_id: &str) -> HandlerResult<()> {
    if user_id.trim().is_empty() {
        return Err(HandlerError::invalid_input("userId", "must not be blank"));
    }
    Ok(())
}

pub(crate) fn validate_guid(guid: &str, parameter: &str) -> HandlerResult<()> {
    if guid.trim().is_empty() {
        return Err(HandlerError::invalid_input(parameter, "must not be blank"));
    }
    Ok(())
}

pub(crate) fn validate_name(value: &str, parameter: &str) -> HandlerResult<()> {
    validate_guid(value, parameter)
}

/// Zero-based offset paging over an already filtered result
pub(crate) fn apply_paging<T>(items: Vec<T>, start_from: usize, page_size: usize) -> Vec<T> {
    items.into_iter().skip(start_from).take(page_size).collect()
}
