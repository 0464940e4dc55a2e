//! Comment Handler
//!
//! Comments hang off the element they discuss through an `AttachedComment`
//! relationship (element at end 1, comment at end 2). Each comment is anchored
//! to the commented element's anchor, or to the element itself when it has
//! none, so deleting that anchor removes the whole discussion.

use chrono::{DateTime, Utc};

use crate::db::DeleteResult;
use crate::models::names::types;
use crate::models::{CommentElement, EffectivityWindow, PropertyMap};

use super::bean_factory::build_bean;
use super::builders::CommentBuilder;
use super::context::{validate_user, HandlerContext};
use super::element_handler::{CreateOptions, FindOptions, GenericHandler};
use super::error::HandlerResult;
use super::policy::ReadFlags;
use super::relationship_handler::{AttachedEnd, EndSpec, RelationshipHandler};

const ELEMENT_GUID: &str = "elementGUID";
const COMMENT_GUID: &str = "commentGUID";

/// Comment operations
#[derive(Clone)]
pub struct CommentHandler {
    comments: GenericHandler<CommentElement>,
    relationships: RelationshipHandler,
}

impl CommentHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self {
            comments: GenericHandler::new(ctx.clone()),
            relationships: RelationshipHandler::new(ctx),
        }
    }

    /// Generic operations (classification, zones) on comments
    pub fn elements(&self) -> &GenericHandler<CommentElement> {
        &self.comments
    }

    /// Create a comment and attach it to `element_guid`; returns the comment GUID
    pub async fn add_comment_to_element(
        &self,
        user_id: &str,
        element_guid: &str,
        builder: CommentBuilder,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<String> {
        validate_user(user_id)?;
        let target = self
            .comments
            .context()
            .fetch_visible_entity(
                element_guid,
                ELEMENT_GUID,
                types::REFERENCEABLE,
                ReadFlags::default(),
                effective_time,
            )
            .await?;
        let anchor_guid = target.anchor_guid.clone().unwrap_or(target.guid);

        let comment_guid = self
            .comments
            .create_element(
                user_id,
                builder,
                CreateOptions::default().with_anchor(anchor_guid),
                effective_time,
            )
            .await?;

        let linked = self
            .relationships
            .link(
                user_id,
                EndSpec::new(element_guid, ELEMENT_GUID, types::REFERENCEABLE),
                EndSpec::new(&comment_guid, COMMENT_GUID, types::COMMENT),
                types::ATTACHED_COMMENT,
                PropertyMap::new(),
                EffectivityWindow::open(),
                effective_time,
            )
            .await;

        if let Err(err) = linked {
            tracing::warn!("Attaching comment {} failed, removing it: {}", comment_guid, err);
            if let Err(cleanup) = self.comments.context().store().delete_entity(&comment_guid).await {
                tracing::warn!("Could not remove orphaned comment {}: {}", comment_guid, cleanup);
            }
            return Err(err);
        }
        Ok(comment_guid)
    }

    pub async fn update_comment(
        &self,
        user_id: &str,
        comment_guid: &str,
        builder: CommentBuilder,
        is_merge_update: bool,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<()> {
        self.comments
            .update_element(user_id, comment_guid, COMMENT_GUID, builder, is_merge_update, effective_time)
            .await
    }

    /// Delete a comment and its attachment
    pub async fn remove_comment(
        &self,
        user_id: &str,
        comment_guid: &str,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<DeleteResult> {
        self.comments
            .delete_element(user_id, comment_guid, COMMENT_GUID, effective_time)
            .await
    }

    pub async fn get_comment_by_guid(
        &self,
        user_id: &str,
        comment_guid: &str,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<CommentElement> {
        self.comments
            .get_by_guid(user_id, comment_guid, COMMENT_GUID, effective_time)
            .await
    }

    pub async fn find_comments(
        &self,
        user_id: &str,
        search_string: &str,
        options: FindOptions,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<Vec<CommentElement>> {
        self.comments
            .find_by_pattern(user_id, search_string, options, effective_time)
            .await
    }

    /// Comments attached to an element, newest first
    pub async fn get_comments(
        &self,
        user_id: &str,
        element_guid: &str,
        start_from: usize,
        page_size: usize,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<Vec<CommentElement>> {
        self.relationships
            .find_attached(
                user_id,
                EndSpec::new(element_guid, ELEMENT_GUID, types::REFERENCEABLE),
                types::ATTACHED_COMMENT,
                AttachedEnd::FromEnd1,
                types::COMMENT,
                ReadFlags::default(),
                start_from,
                page_size,
                effective_time,
            )
            .await?
            .iter()
            .map(|(comment, _)| build_bean(comment, None))
            .collect()
    }
}
