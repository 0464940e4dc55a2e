//! Collection Handler
//!
//! Collections group arbitrary referenceable elements through
//! `CollectionMembership` relationships (collection at end 1, member at
//! end 2). Membership relationships carry a rationale, a status, a confidence
//! level and stewardship details.

use chrono::{DateTime, Utc};

use crate::db::DeleteResult;
use crate::models::names::types;
use crate::models::{CollectionElement, CollectionMember};

use super::bean_factory::build_bean;
use super::builders::{CollectionBuilder, MembershipBuilder};
use super::context::HandlerContext;
use super::element_handler::{CreateOptions, FindOptions, GenericHandler};
use super::error::HandlerResult;
use super::policy::ReadFlags;
use super::relationship_handler::{AttachedEnd, EndSpec, RelationshipHandler};

const COLLECTION_GUID: &str = "collectionGUID";
const ELEMENT_GUID: &str = "elementGUID";

/// Collection and collection-membership operations
#[derive(Clone)]
pub struct CollectionHandler {
    collections: GenericHandler<CollectionElement>,
    relationships: RelationshipHandler,
}

impl CollectionHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self {
            collections: GenericHandler::new(ctx.clone()),
            relationships: RelationshipHandler::new(ctx),
        }
    }

    /// Generic operations (classification, zones) on collections
    pub fn elements(&self) -> &GenericHandler<CollectionElement> {
        &self.collections
    }

    fn collection_end<'a>(guid: &'a str) -> EndSpec<'a> {
        EndSpec::new(guid, COLLECTION_GUID, types::COLLECTION)
    }

    fn member_end<'a>(guid: &'a str) -> EndSpec<'a> {
        EndSpec::new(guid, ELEMENT_GUID, types::REFERENCEABLE)
    }

    pub async fn create_collection(
        &self,
        user_id: &str,
        builder: CollectionBuilder,
        options: CreateOptions,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<String> {
        self.collections
            .create_element(user_id, builder, options, effective_time)
            .await
    }

    pub async fn update_collection(
        &self,
        user_id: &str,
        collection_guid: &str,
        builder: CollectionBuilder,
        is_merge_update: bool,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<()> {
        self.collections
            .update_element(user_id, collection_guid, COLLECTION_GUID, builder, is_merge_update, effective_time)
            .await
    }

    /// Delete a collection; its membership relationships go with it
    pub async fn delete_collection(
        &self,
        user_id: &str,
        collection_guid: &str,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<DeleteResult> {
        self.collections
            .delete_element(user_id, collection_guid, COLLECTION_GUID, effective_time)
            .await
    }

    pub async fn find_collections(
        &self,
        user_id: &str,
        search_string: &str,
        options: FindOptions,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<Vec<CollectionElement>> {
        self.collections
            .find_by_pattern(user_id, search_string, options, effective_time)
            .await
    }

    pub async fn get_collections_by_name(
        &self,
        user_id: &str,
        name: &str,
        options: FindOptions,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<Vec<CollectionElement>> {
        self.collections
            .find_by_name(user_id, name, &[], options, effective_time)
            .await
    }

    pub async fn get_collection_by_guid(
        &self,
        user_id: &str,
        collection_guid: &str,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<CollectionElement> {
        self.collections
            .get_by_guid(user_id, collection_guid, COLLECTION_GUID, effective_time)
            .await
    }

    /// Link an element into a collection; returns the membership GUID
    pub async fn add_to_collection(
        &self,
        user_id: &str,
        collection_guid: &str,
        element_guid: &str,
        membership: MembershipBuilder,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<String> {
        let properties = membership.build()?;
        self.relationships
            .link(
                user_id,
                Self::collection_end(collection_guid),
                Self::member_end(element_guid),
                types::COLLECTION_MEMBERSHIP,
                properties,
                membership.window(),
                effective_time,
            )
            .await
    }

    /// Update the membership properties (merge or replace)
    pub async fn update_collection_membership(
        &self,
        user_id: &str,
        collection_guid: &str,
        element_guid: &str,
        membership: MembershipBuilder,
        is_merge_update: bool,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<()> {
        let properties = membership.build()?;
        self.relationships
            .update_relationship(
                user_id,
                Self::collection_end(collection_guid),
                Self::member_end(element_guid),
                types::COLLECTION_MEMBERSHIP,
                properties,
                Some(membership.window()),
                is_merge_update,
                effective_time,
            )
            .await
    }

    pub async fn remove_from_collection(
        &self,
        user_id: &str,
        collection_guid: &str,
        element_guid: &str,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<()> {
        self.relationships
            .unlink(
                user_id,
                Self::collection_end(collection_guid),
                Self::member_end(element_guid),
                types::COLLECTION_MEMBERSHIP,
                effective_time,
            )
            .await
    }

    /// Members of a collection with their membership details
    pub async fn get_collection_members(
        &self,
        user_id: &str,
        collection_guid: &str,
        start_from: usize,
        page_size: usize,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<Vec<CollectionMember>> {
        self.relationships
            .find_attached(
                user_id,
                Self::collection_end(collection_guid),
                types::COLLECTION_MEMBERSHIP,
                AttachedEnd::FromEnd1,
                types::REFERENCEABLE,
                ReadFlags::default(),
                start_from,
                page_size,
                effective_time,
            )
            .await?
            .iter()
            .map(|(element, relationship)| build_bean(element, Some(relationship)))
            .collect()
    }

    /// Collections an element belongs to
    pub async fn get_element_collections(
        &self,
        user_id: &str,
        element_guid: &str,
        start_from: usize,
        page_size: usize,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<Vec<CollectionElement>> {
        self.relationships
            .find_attached(
                user_id,
                Self::member_end(element_guid),
                types::COLLECTION_MEMBERSHIP,
                AttachedEnd::FromEnd2,
                types::COLLECTION,
                ReadFlags::default(),
                start_from,
                page_size,
                effective_time,
            )
            .await?
            .iter()
            .map(|(element, _)| build_bean(element, None))
            .collect()
    }

    pub async fn publish_collection(
        &self,
        user_id: &str,
        collection_guid: &str,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<()> {
        self.collections
            .publish(user_id, collection_guid, COLLECTION_GUID, effective_time)
            .await
    }

    pub async fn withdraw_collection(
        &self,
        user_id: &str,
        collection_guid: &str,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<()> {
        self.collections
            .withdraw(user_id, collection_guid, COLLECTION_GUID, effective_time)
            .await
    }
}
