//! Generic Element Handler
//!
//! `GenericHandler<B>` implements create/update/delete/find/get for one entity
//! type, returning `B` beans. Specialized handlers (collections, person roles,
//! comments) are thin layers over it.
//!
//! # Policies
//!
//! Every operation:
//!
//! - validates the caller's user ID and any supplied window
//! - treats elements outside `effective_time` or outside the caller's zones as
//!   missing (`InvalidInput` on the GUID parameter)
//! - asks the security verifier before acting; `get_*` and mutations fail with
//!   `NotAuthorized`, `find_*` silently drops elements the caller may not read
//! - emits a `MetadataEvent` after a successful mutation
//!
//! # Examples
//!
//! ```rust
//! use metaspace_core::config::HandlerConfig;
//! use metaspace_core::models::CollectionElement;
//! use metaspace_core::services::builders::{CollectionBuilder, PropertyBuilder};
//! use metaspace_core::services::{CreateOptions, GenericHandler, HandlerContext};
//!
//! # tokio_test::block_on(async {
//! let ctx = HandlerContext::in_memory(HandlerConfig::default());
//! let handler: GenericHandler<CollectionElement> = GenericHandler::new(ctx);
//!
//! let guid = handler
//!     .create_element(
//!         "peterprofile",
//!         CollectionBuilder::new().with_qualified_name("Collection::reports"),
//!         CreateOptions::default(),
//!         None,
//!     )
//!     .await
//!     .unwrap();
//!
//! let bean = handler.get_by_guid("peterprofile", &guid, "collectionGUID", None).await.unwrap();
//! assert_eq!(bean.qualified_name, "Collection::reports");
//! # });
//! ```

use chrono::{DateTime, Utc};
use std::marker::PhantomData;

use crate::db::{DeleteResult, EntityQuery, EntityUpdate, MetadataEvent, SearchMode, UpdateMode};
use crate::models::names::{properties, types};
use crate::models::{Classification, EffectivityWindow, MetadataElement, PropertyMap};
use crate::security::Operation;
use crate::types::{self as type_system, TypeCategory};

use super::bean_factory::{build_bean, MetadataBean};
use super::builders::PropertyBuilder;
use super::context::{apply_paging, validate_guid, validate_name, validate_user, HandlerContext};
use super::error::{HandlerError, HandlerResult};
use super::policy::{validate_window, ReadFlags};

/// Optional placement details for a new element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateOptions {
    /// Metadata collection that owns the element, when not local
    pub external_source: Option<String>,
    /// Subtype to create instead of the handler's default type
    pub type_name: Option<String>,
    /// Element the new one is anchored to
    pub anchor_guid: Option<String>,
}

impl CreateOptions {
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_anchor(mut self, anchor_guid: impl Into<String>) -> Self {
        self.anchor_guid = Some(anchor_guid.into());
        self
    }

    pub fn with_external_source(mut self, external_source: impl Into<String>) -> Self {
        self.external_source = Some(external_source.into());
        self
    }
}

/// Search options shared by the `find_*` operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FindOptions {
    pub start_from: usize,
    /// 0 means the configured default page size
    pub page_size: usize,
    pub flags: ReadFlags,
}

impl FindOptions {
    pub fn page(start_from: usize, page_size: usize) -> Self {
        Self {
            start_from,
            page_size,
            flags: ReadFlags::default(),
        }
    }

    pub fn with_flags(mut self, for_lineage: bool, for_duplicate_processing: bool) -> Self {
        self.flags = ReadFlags::new(for_lineage, for_duplicate_processing);
        self
    }
}

/// Create/update/delete/find/get for one entity type
pub struct GenericHandler<B> {
    ctx: HandlerContext,
    type_name: String,
    _bean: PhantomData<fn() -> B>,
}

impl<B> Clone for GenericHandler<B> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            type_name: self.type_name.clone(),
            _bean: PhantomData,
        }
    }
}

impl<B: MetadataBean> GenericHandler<B> {
    /// Handler for the bean's own entity type
    pub fn new(ctx: HandlerContext) -> Self {
        Self::for_type(ctx, B::TYPE_NAME)
    }

    /// Handler for a specific entity type returning `B` beans
    pub fn for_type(ctx: HandlerContext, type_name: impl Into<String>) -> Self {
        Self {
            ctx,
            type_name: type_name.into(),
            _bean: PhantomData,
        }
    }

    pub fn context(&self) -> &HandlerContext {
        &self.ctx
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Store a new element and return its GUID
    pub async fn create_element<P: PropertyBuilder>(
        &self,
        user_id: &str,
        builder: P,
        options: CreateOptions,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<String> {
        validate_user(user_id)?;
        let builder = builder.into_element_builder();

        match builder.qualified_name() {
            None => {
                return Err(HandlerError::invalid_input(
                    properties::QUALIFIED_NAME,
                    "must be supplied",
                ))
            }
            Some(name) => validate_name(name, properties::QUALIFIED_NAME)?,
        }
        validate_window(builder.window())?;
        if let Some(classification) = builder.classification() {
            self.check_classification_name(&classification.name)?;
            validate_window(&classification.window)?;
        }

        let resolved =
            type_system::resolve(self.ctx.types(), options.type_name.as_deref(), &self.type_name)?;

        if let Some(anchor_guid) = &options.anchor_guid {
            self.ctx
                .fetch_visible_entity(
                    anchor_guid,
                    "anchorGUID",
                    types::REFERENCEABLE,
                    ReadFlags::default(),
                    effective_time,
                )
                .await?;
        }

        let mut element = MetadataElement::new(resolved.guid, resolved.name, builder.build_properties());
        element.window = *builder.window();
        element.zone_membership = self.ctx.zones().zones_for_new_element(builder.zones());
        element.anchor_guid = options.anchor_guid;
        element.external_source = options.external_source;
        element.created_by = user_id.to_string();
        if let Some(classification) = builder.classification() {
            element.classifications.push(classification.clone());
        }
        element.validate()?;

        self.ctx.authorize(user_id, Operation::Create, Some(&element))?;

        let stored = self
            .ctx
            .store()
            .create_entity(element)
            .await
            .map_err(|e| HandlerError::from_store(e, "anchorGUID"))?;

        tracing::info!(
            "{} created {} {} ({})",
            user_id,
            stored.type_name,
            stored.guid,
            stored.qualified_name().unwrap_or_default()
        );
        let guid = stored.guid.clone();
        self.ctx.emit(MetadataEvent::ElementCreated {
            user_id: user_id.to_string(),
            element: stored,
        });
        Ok(guid)
    }

    /// Update an element's properties
    ///
    /// A replace update must supply `qualifiedName`; a merge update keeps the
    /// stored one when the builder has none. On merge, each window bound the
    /// builder leaves unset keeps its stored value. Properties, window and any
    /// classification go to the store as one update.
    pub async fn update_element<P: PropertyBuilder>(
        &self,
        user_id: &str,
        guid: &str,
        guid_parameter: &str,
        builder: P,
        is_merge_update: bool,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<()> {
        validate_user(user_id)?;
        validate_guid(guid, guid_parameter)?;
        let builder = builder.into_element_builder();

        match (builder.qualified_name(), is_merge_update) {
            (Some(name), _) => validate_name(name, properties::QUALIFIED_NAME)?,
            (None, false) => {
                return Err(HandlerError::invalid_input(
                    properties::QUALIFIED_NAME,
                    "must be supplied on a replace update",
                ))
            }
            (None, true) => {}
        }
        validate_window(builder.window())?;
        if let Some(classification) = builder.classification() {
            self.check_classification_name(&classification.name)?;
            validate_window(&classification.window)?;
        }

        let existing = self
            .ctx
            .fetch_visible_entity(guid, guid_parameter, &self.type_name, ReadFlags::default(), effective_time)
            .await?;
        self.ctx.authorize(user_id, Operation::Update, Some(&existing))?;

        let window = if is_merge_update {
            let merged = existing.window.overlay(builder.window());
            validate_window(&merged)?;
            merged
        } else {
            *builder.window()
        };
        let update = EntityUpdate {
            properties: builder.build_properties(),
            mode: UpdateMode::from_merge_flag(is_merge_update),
            window: Some(window),
            classification: builder.classification().cloned(),
            updated_by: user_id.to_string(),
        };

        let updated = self
            .ctx
            .store()
            .update_entity(guid, update)
            .await
            .map_err(|e| HandlerError::from_store(e, guid_parameter))?;

        tracing::info!(
            "{} {} {} {}",
            user_id,
            if is_merge_update { "merged" } else { "replaced" },
            updated.type_name,
            guid
        );
        self.ctx.emit(MetadataEvent::ElementUpdated {
            user_id: user_id.to_string(),
            element: updated,
        });
        Ok(())
    }

    /// Delete an element and everything anchored to it
    pub async fn delete_element(
        &self,
        user_id: &str,
        guid: &str,
        guid_parameter: &str,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<DeleteResult> {
        validate_user(user_id)?;
        let existing = self
            .ctx
            .fetch_visible_entity(guid, guid_parameter, &self.type_name, ReadFlags::default(), effective_time)
            .await?;
        self.ctx.authorize(user_id, Operation::Delete, Some(&existing))?;

        let result = self
            .ctx
            .store()
            .delete_entity(guid)
            .await
            .map_err(|e| HandlerError::from_store(e, guid_parameter))?;

        tracing::info!(
            "{} deleted {} {} (cascade: {} elements, {} relationships)",
            user_id,
            existing.type_name,
            guid,
            result.deleted_entities.len().saturating_sub(1),
            result.deleted_relationships.len()
        );
        self.ctx.emit(MetadataEvent::ElementDeleted {
            user_id: user_id.to_string(),
            guid: guid.to_string(),
            cascaded_guids: result
                .deleted_entities
                .iter()
                .filter(|g| g.as_str() != guid)
                .cloned()
                .collect(),
        });
        Ok(result)
    }

    /// Regular-expression search over every string property
    ///
    /// The pattern must match a whole property value.
    pub async fn find_by_pattern(
        &self,
        user_id: &str,
        search_string: &str,
        options: FindOptions,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<Vec<B>> {
        validate_user(user_id)?;
        if search_string.is_empty() {
            return Err(HandlerError::invalid_input("searchString", "must not be empty"));
        }
        let query = EntityQuery::new()
            .with_type_names(self.ctx.types().subtypes_of(&self.type_name))
            .with_search(SearchMode::Pattern(search_string.to_string()));
        self.find_elements(user_id, query, "searchString", options, effective_time)
            .await
    }

    /// Exact-value search over `property_names`
    ///
    /// An empty list searches `qualifiedName` and `displayName`.
    pub async fn find_by_name(
        &self,
        user_id: &str,
        name: &str,
        property_names: &[&str],
        options: FindOptions,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<Vec<B>> {
        validate_user(user_id)?;
        validate_name(name, "name")?;
        let property_names: Vec<String> = if property_names.is_empty() {
            vec![
                properties::QUALIFIED_NAME.to_string(),
                properties::DISPLAY_NAME.to_string(),
            ]
        } else {
            property_names.iter().map(|p| p.to_string()).collect()
        };
        let query = EntityQuery::new()
            .with_type_names(self.ctx.types().subtypes_of(&self.type_name))
            .with_search(SearchMode::Exact(name.to_string()))
            .with_property_names(property_names);
        self.find_elements(user_id, query, "name", options, effective_time)
            .await
    }

    /// Every element of the handler's type (and subtypes)
    pub async fn find_all(
        &self,
        user_id: &str,
        options: FindOptions,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<Vec<B>> {
        validate_user(user_id)?;
        let query = EntityQuery::new().with_type_names(self.ctx.types().subtypes_of(&self.type_name));
        self.find_elements(user_id, query, "typeName", options, effective_time)
            .await
    }

    /// Run a store query, filter what the caller may see, then page
    ///
    /// Paging happens after filtering so a page never comes back short because
    /// of hidden elements.
    pub async fn find_elements(
        &self,
        user_id: &str,
        query: EntityQuery,
        search_parameter: &str,
        options: FindOptions,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<Vec<B>> {
        let page_size = self.ctx.page_size(options.page_size)?;
        let found = self
            .ctx
            .store()
            .find_entities(&query.with_paging(0, 0))
            .await
            .map_err(|e| HandlerError::from_store(e, search_parameter))?;

        let total = found.len();
        let visible: Vec<MetadataElement> = found
            .into_iter()
            .filter(|e| self.ctx.is_retrievable(e, options.flags, effective_time))
            .filter(|e| self.ctx.is_permitted(user_id, e))
            .collect();
        tracing::debug!(
            "{} search matched {} {} elements, {} visible",
            user_id,
            total,
            self.type_name,
            visible.len()
        );

        apply_paging(visible, options.start_from, page_size)
            .into_iter()
            .map(|e| {
                let e = super::policy::strip_ineffective_classifications(e, effective_time);
                build_bean::<B>(&e, None)
            })
            .collect()
    }

    /// Retrieve one element
    pub async fn get_by_guid(
        &self,
        user_id: &str,
        guid: &str,
        guid_parameter: &str,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<B> {
        self.get_by_guid_with_flags(user_id, guid, guid_parameter, ReadFlags::default(), effective_time)
            .await
    }

    /// Retrieve one element, optionally including lineage/duplicate elements
    pub async fn get_by_guid_with_flags(
        &self,
        user_id: &str,
        guid: &str,
        guid_parameter: &str,
        flags: ReadFlags,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<B> {
        validate_user(user_id)?;
        let element = self
            .ctx
            .fetch_visible_entity(guid, guid_parameter, &self.type_name, flags, effective_time)
            .await?;
        self.ctx.authorize(user_id, Operation::Read, Some(&element))?;
        build_bean(&element, None)
    }

    fn check_classification_name(&self, name: &str) -> HandlerResult<()> {
        validate_name(name, "classificationName")?;
        match self.ctx.types().get_type(name) {
            Some(def) if def.category == TypeCategory::Classification => Ok(()),
            _ => Err(HandlerError::invalid_input(
                "classificationName",
                format!("'{}' is not a known classification", name),
            )),
        }
    }

    /// Add a classification, or update it if already present
    #[allow(clippy::too_many_arguments)]
    pub async fn classify_element(
        &self,
        user_id: &str,
        guid: &str,
        guid_parameter: &str,
        classification_name: &str,
        properties: PropertyMap,
        window: EffectivityWindow,
        is_merge_update: bool,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<()> {
        validate_user(user_id)?;
        self.check_classification_name(classification_name)?;
        validate_window(&window)?;

        let existing = self
            .ctx
            .fetch_visible_entity(guid, guid_parameter, &self.type_name, ReadFlags::new(true, true), effective_time)
            .await?;
        self.ctx.authorize(user_id, Operation::Classify, Some(&existing))?;

        let classification = Classification::new(classification_name, properties).with_window(window);
        self.ctx
            .store()
            .classify_entity(guid, classification, UpdateMode::from_merge_flag(is_merge_update))
            .await
            .map_err(|e| HandlerError::from_store(e, guid_parameter))?;

        tracing::info!("{} classified {} as {}", user_id, guid, classification_name);
        self.ctx.emit(MetadataEvent::ClassificationChanged {
            user_id: user_id.to_string(),
            guid: guid.to_string(),
            classification_name: classification_name.to_string(),
            removed: false,
        });
        Ok(())
    }

    /// Remove a classification
    pub async fn declassify_element(
        &self,
        user_id: &str,
        guid: &str,
        guid_parameter: &str,
        classification_name: &str,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<()> {
        validate_user(user_id)?;
        validate_name(classification_name, "classificationName")?;

        let existing = self
            .ctx
            .fetch_visible_entity(guid, guid_parameter, &self.type_name, ReadFlags::new(true, true), effective_time)
            .await?;
        if !existing.has_classification(classification_name) {
            return Err(HandlerError::invalid_input(
                "classificationName",
                format!("{} is not classified as {}", guid, classification_name),
            ));
        }
        self.ctx.authorize(user_id, Operation::Declassify, Some(&existing))?;

        self.ctx
            .store()
            .declassify_entity(guid, classification_name)
            .await
            .map_err(|e| HandlerError::from_store(e, "classificationName"))?;

        tracing::info!("{} declassified {} from {}", user_id, guid, classification_name);
        self.ctx.emit(MetadataEvent::ClassificationChanged {
            user_id: user_id.to_string(),
            guid: guid.to_string(),
            classification_name: classification_name.to_string(),
            removed: true,
        });
        Ok(())
    }

    /// Overwrite the element's zone membership
    pub async fn set_zone_membership(
        &self,
        user_id: &str,
        guid: &str,
        guid_parameter: &str,
        zones: Vec<String>,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<()> {
        validate_user(user_id)?;
        if zones.iter().any(|z| z.trim().is_empty()) {
            return Err(HandlerError::invalid_input(
                "zoneMembership",
                "zone names must not be blank",
            ));
        }

        let existing = self
            .ctx
            .fetch_visible_entity(guid, guid_parameter, &self.type_name, ReadFlags::default(), effective_time)
            .await?;
        self.ctx.authorize(user_id, Operation::SetZones, Some(&existing))?;

        let updated = self
            .ctx
            .store()
            .set_zone_membership(guid, zones)
            .await
            .map_err(|e| HandlerError::from_store(e, guid_parameter))?;

        tracing::info!("{} set zones of {} to {:?}", user_id, guid, updated.zone_membership);
        self.ctx.emit(MetadataEvent::ZonesChanged {
            user_id: user_id.to_string(),
            guid: guid.to_string(),
            zones: updated.zone_membership,
        });
        Ok(())
    }

    /// Overwrite the zone membership with the configured publish zones
    pub async fn publish(
        &self,
        user_id: &str,
        guid: &str,
        guid_parameter: &str,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<()> {
        let zones = self.ctx.zones().publish_zones.clone();
        self.set_zone_membership(user_id, guid, guid_parameter, zones, effective_time)
            .await
    }

    /// Overwrite the zone membership with the configured withdraw zones
    pub async fn withdraw(
        &self,
        user_id: &str,
        guid: &str,
        guid_parameter: &str,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<()> {
        let zones = self.ctx.zones().withdraw_zones.clone();
        self.set_zone_membership(user_id, guid, guid_parameter, zones, effective_time)
            .await
    }
}
