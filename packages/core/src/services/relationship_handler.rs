//! Relationship Handler
//!
//! Link, unlink, update and look up relationships between two visible
//! elements.
//!
//! # Unique Attachments
//!
//! Nothing stops two relationships of the same type joining the same pair of
//! elements. Where a caller expects exactly one, `get_unique_attachment` picks
//! the instance with the latest store-assigned creation time (GUID order
//! breaks exact ties), so repeated lookups always agree.
//!
//! # Merge Updates
//!
//! A merge reads the current properties, overlays the supplied keys and writes
//! the result back as a full replacement. No lock is held between the read and
//! the write: two concurrent merges can both read the same prior state and
//! the later write wins.

use chrono::{DateTime, Utc};

use crate::db::{MetadataEvent, RelationshipQuery, RelationshipUpdate, UpdateMode};
use crate::models::{
    EffectivityWindow, MetadataElement, PropertyMap, Relationship, RelationshipEnd,
};
use crate::security::Operation;
use crate::types::{TypeCategory, TypeDef};

use super::context::{apply_paging, validate_user, HandlerContext};
use super::error::{HandlerError, HandlerResult};
use super::policy::{self, validate_window, ReadFlags};

/// One end of a relationship operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndSpec<'a> {
    pub guid: &'a str,
    /// Parameter name reported when this end is missing or invalid
    pub parameter: &'a str,
    /// Type the element at this end must be (or inherit from)
    pub type_name: &'a str,
}

impl<'a> EndSpec<'a> {
    pub fn new(guid: &'a str, parameter: &'a str, type_name: &'a str) -> Self {
        Self {
            guid,
            parameter,
            type_name,
        }
    }
}

/// Which end of a relationship the starting element sits at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachedEnd {
    /// Start at end 1, return the elements at end 2
    FromEnd1,
    /// Start at end 2, return the elements at end 1
    FromEnd2,
}

/// Relationship operations shared by the specialized handlers
#[derive(Clone)]
pub struct RelationshipHandler {
    ctx: HandlerContext,
}

impl RelationshipHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &HandlerContext {
        &self.ctx
    }

    fn relationship_type(&self, name: &str) -> HandlerResult<TypeDef> {
        match self.ctx.types().get_type(name) {
            Some(def) if def.category == TypeCategory::Relationship => Ok(def.clone()),
            _ => Err(HandlerError::invalid_input(
                "relationshipTypeName",
                format!("'{}' is not a known relationship type", name),
            )),
        }
    }

    async fn fetch_end(
        &self,
        end: &EndSpec<'_>,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<MetadataElement> {
        self.ctx
            .fetch_visible_entity(end.guid, end.parameter, end.type_name, ReadFlags::default(), effective_time)
            .await
    }

    /// Create a relationship between two visible elements
    ///
    /// Duplicate links are allowed; `get_unique_attachment` resolves them.
    #[allow(clippy::too_many_arguments)]
    pub async fn link(
        &self,
        user_id: &str,
        end1: EndSpec<'_>,
        end2: EndSpec<'_>,
        relationship_type: &str,
        properties: PropertyMap,
        window: EffectivityWindow,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<String> {
        validate_user(user_id)?;
        validate_window(&window)?;
        let def = self.relationship_type(relationship_type)?;

        let end1_element = self.fetch_end(&end1, effective_time).await?;
        let end2_element = self.fetch_end(&end2, effective_time).await?;

        let (Some(end1_def), Some(end2_def)) = (&def.end1, &def.end2) else {
            return Err(HandlerError::invalid_input(
                "relationshipTypeName",
                format!("'{}' has no end definitions", relationship_type),
            ));
        };
        let types = self.ctx.types();
        if !types.is_subtype_of(&end1_element.type_name, &end1_def.type_name) {
            return Err(HandlerError::invalid_input(
                end1.parameter,
                format!("{} cannot be end 1 of {}", end1_element.type_name, def.name),
            ));
        }
        if !types.is_subtype_of(&end2_element.type_name, &end2_def.type_name) {
            return Err(HandlerError::invalid_input(
                end2.parameter,
                format!("{} cannot be end 2 of {}", end2_element.type_name, def.name),
            ));
        }

        self.ctx.authorize(user_id, Operation::Link, Some(&end1_element))?;

        let mut relationship = Relationship::new(
            def.guid.clone(),
            def.name.clone(),
            RelationshipEnd::new(&end1_element.guid, &end1_element.type_name, &end1_def.role),
            RelationshipEnd::new(&end2_element.guid, &end2_element.type_name, &end2_def.role),
            properties,
        );
        relationship.window = window;
        relationship.created_by = user_id.to_string();

        let stored = self
            .ctx
            .store()
            .create_relationship(relationship)
            .await
            .map_err(|e| HandlerError::from_store(e, end2.parameter))?;

        tracing::info!(
            "{} linked {} -[{}]-> {}",
            user_id,
            stored.end1.guid,
            stored.type_name,
            stored.end2.guid
        );
        let guid = stored.guid.clone();
        self.ctx.emit(MetadataEvent::RelationshipCreated {
            user_id: user_id.to_string(),
            relationship: stored,
        });
        Ok(guid)
    }

    /// The single relationship of `relationship_type` between two elements
    ///
    /// Only relationships effective at `effective_time` whose end types match
    /// (subtypes included) are considered. Among several, the latest created
    /// wins.
    pub async fn get_unique_attachment(
        &self,
        end1_guid: &str,
        end1_type: &str,
        relationship_type: &str,
        end2_guid: &str,
        end2_type: &str,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<Option<Relationship>> {
        let candidates = self
            .ctx
            .store()
            .find_relationships(&RelationshipQuery::between(relationship_type, end1_guid, end2_guid))
            .await
            .map_err(|e| HandlerError::from_store(e, "relationshipTypeName"))?;

        let types = self.ctx.types();
        let matching: Vec<Relationship> = candidates
            .into_iter()
            .filter(|r| policy::is_relationship_effective(r, effective_time))
            .filter(|r| {
                types.is_subtype_of(&r.end1.type_name, end1_type)
                    && types.is_subtype_of(&r.end2.type_name, end2_type)
            })
            .collect();

        if matching.len() > 1 {
            tracing::warn!(
                "{} {} relationships between {} and {}; using the latest",
                matching.len(),
                relationship_type,
                end1_guid,
                end2_guid
            );
        }

        Ok(matching.into_iter().max_by(|a, b| {
            a.create_time
                .cmp(&b.create_time)
                .then_with(|| a.guid.cmp(&b.guid))
        }))
    }

    /// Remove the unique attachment between two visible elements
    pub async fn unlink(
        &self,
        user_id: &str,
        end1: EndSpec<'_>,
        end2: EndSpec<'_>,
        relationship_type: &str,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<()> {
        validate_user(user_id)?;
        self.relationship_type(relationship_type)?;
        let end1_element = self.fetch_end(&end1, effective_time).await?;
        self.fetch_end(&end2, effective_time).await?;

        let relationship = self
            .get_unique_attachment(
                end1.guid,
                end1.type_name,
                relationship_type,
                end2.guid,
                end2.type_name,
                effective_time,
            )
            .await?
            .ok_or_else(|| {
                HandlerError::invalid_input(
                    end2.parameter,
                    format!("{} is not linked to {} by {}", end2.guid, end1.guid, relationship_type),
                )
            })?;

        self.ctx.authorize(user_id, Operation::Unlink, Some(&end1_element))?;
        self.delete(user_id, &relationship, end2.parameter).await
    }

    /// Delete the relationship located by exact end GUIDs and type name
    ///
    /// Unlike `unlink`, the ends are not checked for visibility.
    pub async fn remove_attachment(
        &self,
        user_id: &str,
        end1_guid: &str,
        relationship_type: &str,
        end2_guid: &str,
        end2_parameter: &str,
    ) -> HandlerResult<()> {
        validate_user(user_id)?;
        let relationship = self
            .ctx
            .store()
            .find_relationships(&RelationshipQuery::between(relationship_type, end1_guid, end2_guid))
            .await
            .map_err(|e| HandlerError::from_store(e, end2_parameter))?
            .into_iter()
            .next()
            .ok_or_else(|| {
                HandlerError::invalid_input(
                    end2_parameter,
                    format!("{} is not linked to {} by {}", end2_guid, end1_guid, relationship_type),
                )
            })?;

        let end1_element = self
            .ctx
            .store()
            .get_entity(end1_guid)
            .await
            .map_err(|e| HandlerError::from_store(e, end2_parameter))?;
        self.ctx
            .authorize(user_id, Operation::Unlink, end1_element.as_ref())?;
        self.delete(user_id, &relationship, end2_parameter).await
    }

    async fn delete(
        &self,
        user_id: &str,
        relationship: &Relationship,
        parameter: &str,
    ) -> HandlerResult<()> {
        self.ctx
            .store()
            .delete_relationship(&relationship.guid)
            .await
            .map_err(|e| HandlerError::from_store(e, parameter))?;

        tracing::info!(
            "{} unlinked {} -[{}]-> {}",
            user_id,
            relationship.end1.guid,
            relationship.type_name,
            relationship.end2.guid
        );
        self.ctx.emit(MetadataEvent::RelationshipDeleted {
            user_id: user_id.to_string(),
            guid: relationship.guid.clone(),
        });
        Ok(())
    }

    /// Update the unique attachment between two elements
    ///
    /// On merge the current properties are read through
    /// `get_unique_attachment` and every supplied key is overlaid; the result
    /// is then written as a replacement. On merge each window bound left
    /// unset in `window` keeps its stored value; on replace an unset bound is
    /// open.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_relationship(
        &self,
        user_id: &str,
        end1: EndSpec<'_>,
        end2: EndSpec<'_>,
        relationship_type: &str,
        properties: PropertyMap,
        window: Option<EffectivityWindow>,
        is_merge_update: bool,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<()> {
        validate_user(user_id)?;
        if let Some(window) = &window {
            validate_window(window)?;
        }
        self.relationship_type(relationship_type)?;
        let end1_element = self.fetch_end(&end1, effective_time).await?;
        self.fetch_end(&end2, effective_time).await?;

        let existing = self
            .get_unique_attachment(
                end1.guid,
                end1.type_name,
                relationship_type,
                end2.guid,
                end2.type_name,
                effective_time,
            )
            .await?
            .ok_or_else(|| {
                HandlerError::invalid_input(
                    end2.parameter,
                    format!("{} is not linked to {} by {}", end2.guid, end1.guid, relationship_type),
                )
            })?;

        self.ctx.authorize(user_id, Operation::UpdateLink, Some(&end1_element))?;
        self.write_update(user_id, existing, properties, window, is_merge_update, end2.parameter)
            .await
    }

    /// Update a relationship identified by its own GUID
    #[allow(clippy::too_many_arguments)]
    pub async fn update_relationship_by_guid(
        &self,
        user_id: &str,
        relationship_guid: &str,
        guid_parameter: &str,
        relationship_type: &str,
        properties: PropertyMap,
        window: Option<EffectivityWindow>,
        is_merge_update: bool,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<()> {
        validate_user(user_id)?;
        if let Some(window) = &window {
            validate_window(window)?;
        }
        let existing = self
            .get_relationship_by_guid(relationship_guid, guid_parameter, relationship_type, effective_time)
            .await?;
        let end1_element = self
            .ctx
            .fetch_visible_entity(
                &existing.end1.guid,
                guid_parameter,
                &existing.end1.type_name,
                ReadFlags::default(),
                effective_time,
            )
            .await?;

        self.ctx.authorize(user_id, Operation::UpdateLink, Some(&end1_element))?;
        self.write_update(user_id, existing, properties, window, is_merge_update, guid_parameter)
            .await
    }

    async fn write_update(
        &self,
        user_id: &str,
        existing: Relationship,
        supplied: PropertyMap,
        window: Option<EffectivityWindow>,
        is_merge_update: bool,
        parameter: &str,
    ) -> HandlerResult<()> {
        let supplied_window = window.unwrap_or_default();
        let (properties, window) = if is_merge_update {
            let mut merged = existing.properties;
            for (key, value) in supplied {
                merged.insert(key, value);
            }
            let window = existing.window.overlay(&supplied_window);
            validate_window(&window)?;
            (merged, window)
        } else {
            (supplied, supplied_window)
        };

        let updated = self
            .ctx
            .store()
            .update_relationship(
                &existing.guid,
                RelationshipUpdate {
                    properties,
                    mode: UpdateMode::Replace,
                    window: Some(window),
                    updated_by: user_id.to_string(),
                },
            )
            .await
            .map_err(|e| HandlerError::from_store(e, parameter))?;

        tracing::info!(
            "{} {} relationship {}",
            user_id,
            if is_merge_update { "merged" } else { "replaced" },
            updated.guid
        );
        self.ctx.emit(MetadataEvent::RelationshipUpdated {
            user_id: user_id.to_string(),
            relationship: updated,
        });
        Ok(())
    }

    /// Retrieve a relationship of `expected_type` that is effective now
    pub async fn get_relationship_by_guid(
        &self,
        guid: &str,
        guid_parameter: &str,
        expected_type: &str,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<Relationship> {
        super::context::validate_guid(guid, guid_parameter)?;
        let relationship = self
            .ctx
            .store()
            .get_relationship(guid)
            .await
            .map_err(|e| HandlerError::from_store(e, guid_parameter))?
            .filter(|r| policy::is_relationship_effective(r, effective_time))
            .ok_or_else(|| {
                HandlerError::invalid_input(guid_parameter, format!("no relationship {}", guid))
            })?;

        if relationship.type_name != expected_type {
            return Err(HandlerError::invalid_input(
                guid_parameter,
                format!("{} is a {}, not a {}", guid, relationship.type_name, expected_type),
            ));
        }
        Ok(relationship)
    }

    /// Delete a relationship identified by its own GUID
    pub async fn delete_relationship_by_guid(
        &self,
        user_id: &str,
        guid: &str,
        guid_parameter: &str,
        expected_type: &str,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<()> {
        validate_user(user_id)?;
        let relationship = self
            .get_relationship_by_guid(guid, guid_parameter, expected_type, effective_time)
            .await?;
        let end1_element = self
            .ctx
            .store()
            .get_entity(&relationship.end1.guid)
            .await
            .map_err(|e| HandlerError::from_store(e, guid_parameter))?;
        self.ctx
            .authorize(user_id, Operation::Unlink, end1_element.as_ref())?;
        self.delete(user_id, &relationship, guid_parameter).await
    }

    /// Elements attached to `start` through `relationship_type`
    ///
    /// Returns each visible attached element with the relationship that led to
    /// it, newest relationship first, paged after filtering.
    #[allow(clippy::too_many_arguments)]
    pub async fn find_attached(
        &self,
        user_id: &str,
        start: EndSpec<'_>,
        relationship_type: &str,
        direction: AttachedEnd,
        attached_type: &str,
        flags: ReadFlags,
        start_from: usize,
        page_size: usize,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<Vec<(MetadataElement, Relationship)>> {
        validate_user(user_id)?;
        let page_size = self.ctx.page_size(page_size)?;
        let start_element = self.fetch_end(&start, effective_time).await?;
        self.ctx.authorize(user_id, Operation::Read, Some(&start_element))?;

        let query = RelationshipQuery::default().with_type_name(relationship_type);
        let query = match direction {
            AttachedEnd::FromEnd1 => query.with_end1(start.guid),
            AttachedEnd::FromEnd2 => query.with_end2(start.guid),
        };
        let relationships = self
            .ctx
            .store()
            .find_relationships(&query)
            .await
            .map_err(|e| HandlerError::from_store(e, start.parameter))?;

        let types = self.ctx.types();
        let store = self.ctx.store();
        let mut attached = Vec::new();
        for relationship in relationships {
            if !policy::is_relationship_effective(&relationship, effective_time) {
                continue;
            }
            let other = match direction {
                AttachedEnd::FromEnd1 => &relationship.end2,
                AttachedEnd::FromEnd2 => &relationship.end1,
            };
            let Some(element) = store
                .get_entity(&other.guid)
                .await
                .map_err(|e| HandlerError::from_store(e, start.parameter))?
            else {
                tracing::warn!("Relationship {} points at missing {}", relationship.guid, other.guid);
                continue;
            };
            if !types.is_subtype_of(&element.type_name, attached_type)
                || !self.ctx.is_retrievable(&element, flags, effective_time)
                || !self.ctx.is_permitted(user_id, &element)
            {
                continue;
            }
            let element = policy::strip_ineffective_classifications(element, effective_time);
            attached.push((element, relationship));
        }

        Ok(apply_paging(attached, start_from, page_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HandlerConfig;
    use crate::models::names::types;

    async fn element(ctx: &HandlerContext, type_name: &str, qn: &str) -> String {
        let mut props = PropertyMap::new();
        props.insert("qualifiedName".to_string(), serde_json::json!(qn));
        ctx.store()
            .create_entity(MetadataElement::new("t", type_name, props))
            .await
            .unwrap()
            .guid
    }

    #[tokio::test]
    async fn test_link_checks_end_types() {
        let ctx = HandlerContext::in_memory(HandlerConfig::default());
        let handler = RelationshipHandler::new(ctx.clone());
        let person = element(&ctx, types::PERSON, "p").await;
        let role = element(&ctx, types::PERSON_ROLE, "r").await;

        // Ends swapped: a person cannot be end 1 of an appointment
        let err = handler
            .link(
                "u",
                EndSpec::new(&person, "personGUID", types::REFERENCEABLE),
                EndSpec::new(&role, "personRoleGUID", types::REFERENCEABLE),
                types::PERSON_ROLE_APPOINTMENT,
                PropertyMap::new(),
                EffectivityWindow::open(),
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.parameter(), Some("personGUID"));
    }

    #[tokio::test]
    async fn test_unknown_relationship_type() {
        let ctx = HandlerContext::in_memory(HandlerConfig::default());
        let handler = RelationshipHandler::new(ctx.clone());
        let a = element(&ctx, types::COLLECTION, "a").await;
        let b = element(&ctx, types::ASSET, "b").await;
        let err = handler
            .link(
                "u",
                EndSpec::new(&a, "collectionGUID", types::COLLECTION),
                EndSpec::new(&b, "elementGUID", types::REFERENCEABLE),
                "Friendship",
                PropertyMap::new(),
                EffectivityWindow::open(),
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.parameter(), Some("relationshipTypeName"));
    }

    #[tokio::test]
    async fn test_unlink_without_attachment() {
        let ctx = HandlerContext::in_memory(HandlerConfig::default());
        let handler = RelationshipHandler::new(ctx.clone());
        let a = element(&ctx, types::COLLECTION, "a").await;
        let b = element(&ctx, types::ASSET, "b").await;
        let err = handler
            .unlink(
                "u",
                EndSpec::new(&a, "collectionGUID", types::COLLECTION),
                EndSpec::new(&b, "elementGUID", types::REFERENCEABLE),
                types::COLLECTION_MEMBERSHIP,
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.parameter(), Some("elementGUID"));
    }

    #[tokio::test]
    async fn test_replace_update_opens_window() {
        let ctx = HandlerContext::in_memory(HandlerConfig::default());
        let handler = RelationshipHandler::new(ctx.clone());
        let a = element(&ctx, types::COLLECTION, "a").await;
        let b = element(&ctx, types::ASSET, "b").await;
        let end1 = EndSpec::new(&a, "collectionGUID", types::COLLECTION);
        let end2 = EndSpec::new(&b, "elementGUID", types::REFERENCEABLE);

        let past = Utc::now() - chrono::Duration::days(1);
        let guid = handler
            .link("u", end1, end2, types::COLLECTION_MEMBERSHIP, PropertyMap::new(), EffectivityWindow::new(Some(past), None), None)
            .await
            .unwrap();

        handler
            .update_relationship("u", end1, end2, types::COLLECTION_MEMBERSHIP, PropertyMap::new(), None, true, None)
            .await
            .unwrap();
        let merged = ctx.store().get_relationship(&guid).await.unwrap().unwrap();
        assert_eq!(merged.window.effective_from, Some(past));

        handler
            .update_relationship("u", end1, end2, types::COLLECTION_MEMBERSHIP, PropertyMap::new(), None, false, None)
            .await
            .unwrap();
        let replaced = ctx.store().get_relationship(&guid).await.unwrap().unwrap();
        assert!(replaced.window.is_open());
        assert_eq!(replaced.version, 3);
    }
}
