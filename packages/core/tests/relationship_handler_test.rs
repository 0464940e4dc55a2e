//! Relationship Handler Tests
//!
//! Integration tests for relationship-backed operations: collection
//! membership, person role appointments and comment attachment.
//!
//! ## Test Coverage
//! - Link, update (merge/replace) and unlink of collection memberships
//! - Latest-wins resolution when duplicate links exist
//! - Domain identifier filtering and update rules for person roles
//! - Appointment relief with mismatched role GUIDs
//! - Concurrent merge updates on one relationship (last writer wins)

#[cfg(test)]
mod relationship_handler_tests {
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use metaspace_core::db::{
        DeleteResult, EntityQuery, EntityUpdate, InMemoryStore, MetadataStore, RelationshipQuery,
        RelationshipUpdate, StoreResult, UpdateMode,
    };
    use metaspace_core::models::names::{properties, types};
    use metaspace_core::services::builders::{
        AppointmentBuilder, CollectionBuilder, CommentBuilder, ElementBuilder, MembershipBuilder,
        PersonRoleBuilder, PropertyBuilder,
    };
    use metaspace_core::services::{
        CollectionHandler, CommentHandler, CreateOptions, EndSpec, FindOptions, GenericHandler,
        HandlerContext, PersonRoleHandler, RelationshipHandler,
    };
    use metaspace_core::types::TypeRegistry;
    use metaspace_core::{
        AllowAll, Classification, EffectivityWindow, HandlerConfig, MembershipStatus,
        MetadataElement, PropertyMap, ReferenceableElement, Relationship,
    };
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::Barrier;

    const USER: &str = "garygeeke";

    struct Fixture {
        ctx: HandlerContext,
        collections: CollectionHandler,
        roles: PersonRoleHandler,
        assets: GenericHandler<ReferenceableElement>,
        people: GenericHandler<ReferenceableElement>,
    }

    impl Fixture {
        fn new(ctx: HandlerContext) -> Self {
            Self {
                collections: CollectionHandler::new(ctx.clone()),
                roles: PersonRoleHandler::new(ctx.clone()),
                assets: GenericHandler::for_type(ctx.clone(), types::ASSET),
                people: GenericHandler::for_type(ctx.clone(), types::PERSON),
                ctx,
            }
        }

        fn in_memory() -> Self {
            metaspace_core::telemetry::init_test_tracing();
            Self::new(HandlerContext::in_memory(HandlerConfig::default()))
        }

        async fn collection(&self, qualified_name: &str) -> Result<String> {
            Ok(self
                .collections
                .create_collection(
                    USER,
                    CollectionBuilder::new().with_qualified_name(qualified_name),
                    CreateOptions::default(),
                    None,
                )
                .await?)
        }

        async fn asset(&self, qualified_name: &str) -> Result<String> {
            Ok(self
                .assets
                .create_element(
                    USER,
                    ElementBuilder::new().with_qualified_name(qualified_name),
                    CreateOptions::default(),
                    None,
                )
                .await?)
        }

        async fn person(&self, qualified_name: &str) -> Result<String> {
            Ok(self
                .people
                .create_element(
                    USER,
                    ElementBuilder::new().with_qualified_name(qualified_name),
                    CreateOptions::default(),
                    None,
                )
                .await?)
        }

        async fn role(&self, qualified_name: &str, domain_identifier: i64) -> Result<String> {
            Ok(self
                .roles
                .create_person_role(
                    USER,
                    PersonRoleBuilder::new()
                        .with_qualified_name(qualified_name)
                        .with_domain_identifier(domain_identifier),
                    CreateOptions::default(),
                    None,
                )
                .await?)
        }

        async fn membership(&self, collection: &str, element: &str) -> Result<Relationship> {
            let found = self
                .ctx
                .store()
                .find_relationships(&RelationshipQuery::between(
                    types::COLLECTION_MEMBERSHIP,
                    collection,
                    element,
                ))
                .await?;
            found
                .into_iter()
                .next()
                .ok_or_else(|| anyhow::anyhow!("no membership between {} and {}", collection, element))
        }
    }

    #[tokio::test]
    async fn test_collection_membership_lifecycle() -> Result<()> {
        let fx = Fixture::in_memory();
        let collection = fx.collection("Collection::reports").await?;
        let asset = fx.asset("Asset::weekly").await?;

        fx.collections
            .add_to_collection(
                USER,
                &collection,
                &asset,
                MembershipBuilder::new()
                    .with_membership_rationale("feeds the dashboard")
                    .with_status(4)
                    .with_confidence(80)
                    .with_steward("garygeeke", "UserIdentity", "userId"),
                None,
            )
            .await?;

        let members = fx
            .collections
            .get_collection_members(USER, &collection, 0, 0, None)
            .await?;
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].element.header.guid, asset);
        let membership = members[0].membership.as_ref().expect("membership details");
        assert_eq!(membership.status, MembershipStatus::Validated);
        assert_eq!(membership.confidence, 80);
        assert_eq!(membership.steward.as_deref(), Some("garygeeke"));

        let stored = fx.membership(&collection, &asset).await?;
        assert_eq!(stored.properties.get(properties::MEMBERSHIP_STATUS), Some(&json!("Validated")));

        let holding = fx
            .collections
            .get_element_collections(USER, &asset, 0, 0, None)
            .await?;
        assert_eq!(holding.len(), 1);
        assert_eq!(holding[0].header.guid, collection);

        fx.collections
            .remove_from_collection(USER, &collection, &asset, None)
            .await?;
        let members = fx
            .collections
            .get_collection_members(USER, &collection, 0, 0, None)
            .await?;
        assert!(members.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_status_ordinal_is_rejected() -> Result<()> {
        let fx = Fixture::in_memory();
        let collection = fx.collection("Collection::status").await?;
        let asset = fx.asset("Asset::status").await?;

        let err = fx
            .collections
            .add_to_collection(
                USER,
                &collection,
                &asset,
                MembershipBuilder::new().with_status(42),
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.parameter(), Some("status"));
        Ok(())
    }

    #[tokio::test]
    async fn test_membership_merge_and_replace() -> Result<()> {
        let fx = Fixture::in_memory();
        let collection = fx.collection("Collection::merge").await?;
        let asset = fx.asset("Asset::merge").await?;

        fx.collections
            .add_to_collection(
                USER,
                &collection,
                &asset,
                MembershipBuilder::new()
                    .with_membership_rationale("original")
                    .with_confidence(10),
                None,
            )
            .await?;

        fx.collections
            .update_collection_membership(
                USER,
                &collection,
                &asset,
                MembershipBuilder::new().with_confidence(50),
                true,
                None,
            )
            .await?;
        let merged = fx.membership(&collection, &asset).await?;
        assert_eq!(merged.properties.get(properties::MEMBERSHIP_RATIONALE), Some(&json!("original")));
        assert_eq!(merged.properties.get(properties::CONFIDENCE), Some(&json!(50)));

        fx.collections
            .update_collection_membership(
                USER,
                &collection,
                &asset,
                MembershipBuilder::new().with_confidence(70),
                false,
                None,
            )
            .await?;
        let replaced = fx.membership(&collection, &asset).await?;
        assert!(replaced.properties.get(properties::MEMBERSHIP_RATIONALE).is_none());
        assert_eq!(replaced.properties.get(properties::CONFIDENCE), Some(&json!(70)));
        Ok(())
    }

    #[tokio::test]
    async fn test_membership_merge_overlays_window_bounds() -> Result<()> {
        let fx = Fixture::in_memory();
        let collection = fx.collection("Collection::window").await?;
        let asset = fx.asset("Asset::window").await?;
        let now = Utc::now();
        let from = now - Duration::days(10);

        fx.collections
            .add_to_collection(
                USER,
                &collection,
                &asset,
                MembershipBuilder::new().with_window(EffectivityWindow::new(Some(from), None)),
                None,
            )
            .await?;

        let until = now + Duration::days(10);
        fx.collections
            .update_collection_membership(
                USER,
                &collection,
                &asset,
                MembershipBuilder::new().with_window(EffectivityWindow::new(None, Some(until))),
                true,
                None,
            )
            .await?;
        let merged = fx.membership(&collection, &asset).await?;
        assert_eq!(merged.window, EffectivityWindow::new(Some(from), Some(until)));

        let err = fx
            .collections
            .update_collection_membership(
                USER,
                &collection,
                &asset,
                MembershipBuilder::new()
                    .with_window(EffectivityWindow::new(None, Some(now - Duration::days(20)))),
                true,
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.parameter(), Some("effectiveFrom"));
        assert_eq!(fx.membership(&collection, &asset).await?.window, merged.window);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_without_link_names_element() -> Result<()> {
        let fx = Fixture::in_memory();
        let collection = fx.collection("Collection::unlinked").await?;
        let asset = fx.asset("Asset::unlinked").await?;

        let err = fx
            .collections
            .update_collection_membership(
                USER,
                &collection,
                &asset,
                MembershipBuilder::new().with_confidence(1),
                true,
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.parameter(), Some("elementGUID"));
        Ok(())
    }

    #[tokio::test]
    async fn test_latest_duplicate_link_wins() -> Result<()> {
        let fx = Fixture::in_memory();
        let relationships = RelationshipHandler::new(fx.ctx.clone());
        let collection = fx.collection("Collection::dupes").await?;
        let asset = fx.asset("Asset::dupes").await?;

        let link = |rationale: &'static str| {
            let relationships = relationships.clone();
            let collection = collection.clone();
            let asset = asset.clone();
            async move {
                let mut props = PropertyMap::new();
                props.insert(properties::MEMBERSHIP_RATIONALE.to_string(), json!(rationale));
                relationships
                    .link(
                        USER,
                        EndSpec::new(&collection, "collectionGUID", types::COLLECTION),
                        EndSpec::new(&asset, "elementGUID", types::REFERENCEABLE),
                        types::COLLECTION_MEMBERSHIP,
                        props,
                        EffectivityWindow::open(),
                        None,
                    )
                    .await
            }
        };
        let first = link("first").await?;
        let second = link("second").await?;
        assert_ne!(first, second);

        let chosen = relationships
            .get_unique_attachment(
                &collection,
                types::COLLECTION,
                types::COLLECTION_MEMBERSHIP,
                &asset,
                types::REFERENCEABLE,
                None,
            )
            .await?
            .expect("an attachment");
        assert_eq!(chosen.guid, second);
        assert_eq!(chosen.properties.get(properties::MEMBERSHIP_RATIONALE), Some(&json!("second")));
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_membership_is_ignored() -> Result<()> {
        let fx = Fixture::in_memory();
        let collection = fx.collection("Collection::expired").await?;
        let asset = fx.asset("Asset::expired").await?;
        let now = Utc::now();

        fx.collections
            .add_to_collection(
                USER,
                &collection,
                &asset,
                MembershipBuilder::new()
                    .with_window(EffectivityWindow::new(None, Some(now - Duration::hours(1)))),
                None,
            )
            .await?;

        let current = fx
            .collections
            .get_collection_members(USER, &collection, 0, 0, Some(now))
            .await?;
        assert!(current.is_empty());

        let historic = fx
            .collections
            .get_collection_members(USER, &collection, 0, 0, Some(now - Duration::days(1)))
            .await?;
        assert_eq!(historic.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_roles_for_domain_identifier() -> Result<()> {
        let fx = Fixture::in_memory();
        let any = fx.role("Role::any", 0).await?;
        let five_a = fx.role("Role::five-a", 5).await?;
        let five_b = fx.role("Role::five-b", 5).await?;
        let seven = fx.role("Role::seven", 7).await?;

        let all = fx
            .roles
            .get_person_roles_for_domain_id(USER, 0, FindOptions::default(), None)
            .await?;
        assert_eq!(all.len(), 4);

        let mut five: Vec<String> = fx
            .roles
            .get_person_roles_for_domain_id(USER, 5, FindOptions::default(), None)
            .await?
            .into_iter()
            .map(|r| r.header.guid)
            .collect();
        five.sort();
        let mut expected = vec![five_a, five_b];
        expected.sort();
        assert_eq!(five, expected);

        let none = fx
            .roles
            .get_person_roles_for_domain_id(USER, 9, FindOptions::default(), None)
            .await?;
        assert!(none.is_empty());
        assert!(all.iter().any(|r| r.header.guid == any));
        assert!(all.iter().any(|r| r.header.guid == seven));
        Ok(())
    }

    #[tokio::test]
    async fn test_domain_identifier_update_rules() -> Result<()> {
        let fx = Fixture::in_memory();
        let role = fx.role("Role::rules", 5).await?;

        // Merge never touches the stored identifier
        fx.roles
            .update_person_role(
                USER,
                &role,
                PersonRoleBuilder::new().with_head_count(3),
                9,
                true,
                None,
            )
            .await?;
        let merged = fx.roles.get_person_role_by_guid(USER, &role, None).await?;
        assert_eq!(merged.domain_identifier, 5);
        assert_eq!(merged.head_count, 3);

        // Replace with a non-zero identifier drops it from the bag
        fx.roles
            .update_person_role(
                USER,
                &role,
                PersonRoleBuilder::new().with_qualified_name("Role::rules"),
                9,
                false,
                None,
            )
            .await?;
        let replaced = fx.roles.get_person_role_by_guid(USER, &role, None).await?;
        assert_eq!(replaced.domain_identifier, 0);
        assert_eq!(replaced.head_count, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_appointments_and_relief() -> Result<()> {
        let fx = Fixture::in_memory();
        let steward = fx.role("Role::steward", 1).await?;
        let owner = fx.role("Role::owner", 1).await?;
        let person = fx.person("Person::peter").await?;

        let appointment = fx
            .roles
            .appoint_person_to_role(
                USER,
                &steward,
                &person,
                AppointmentBuilder::new().with_is_public(true),
                None,
            )
            .await?;

        let appointees = fx.roles.get_appointees(USER, &steward, 0, 0, None).await?;
        assert_eq!(appointees.len(), 1);
        assert_eq!(appointees[0].profile.header.guid, person);
        assert_eq!(appointees[0].appointment_guid.as_deref(), Some(appointment.as_str()));
        assert!(appointees[0].is_public);

        let held = fx.roles.get_roles_for_person(USER, &person, 0, 0, None).await?;
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].header.guid, steward);

        // Wrong role: rejected and nothing changes
        let err = fx
            .roles
            .relieve_person_from_role(USER, &owner, &appointment, None)
            .await
            .unwrap_err();
        assert_eq!(err.parameter(), Some("personRoleGUID"));
        assert!(fx.ctx.store().get_relationship(&appointment).await?.is_some());

        fx.roles
            .relieve_person_from_role(USER, &steward, &appointment, None)
            .await?;
        assert!(fx.ctx.store().get_relationship(&appointment).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_link_requires_visible_typed_ends() -> Result<()> {
        let fx = Fixture::in_memory();
        let asset = fx.asset("Asset::not-a-role").await?;
        let role = fx.role("Role::real", 0).await?;
        let person = fx.person("Person::paula").await?;

        let err = fx
            .roles
            .appoint_person_to_role(USER, &asset, &person, AppointmentBuilder::new(), None)
            .await
            .unwrap_err();
        assert_eq!(err.parameter(), Some("personRoleGUID"));

        let err = fx
            .roles
            .appoint_person_to_role(USER, &role, "no-such-person", AppointmentBuilder::new(), None)
            .await
            .unwrap_err();
        assert_eq!(err.parameter(), Some("personGUID"));

        // A person cannot stand in for a role either
        let err = fx
            .roles
            .appoint_person_to_role(USER, &person, &person, AppointmentBuilder::new(), None)
            .await
            .unwrap_err();
        assert_eq!(err.parameter(), Some("personRoleGUID"));
        Ok(())
    }

    #[tokio::test]
    async fn test_comments_are_listed_for_element() -> Result<()> {
        let fx = Fixture::in_memory();
        let comments = CommentHandler::new(fx.ctx.clone());
        let asset = fx.asset("Asset::discussed").await?;

        for i in 0..3 {
            comments
                .add_comment_to_element(
                    USER,
                    &asset,
                    CommentBuilder::new()
                        .with_qualified_name(format!("Comment::discussed::{}", i))
                        .with_text(format!("comment {}", i)),
                    None,
                )
                .await?;
        }

        let listed = comments.get_comments(USER, &asset, 0, 2, None).await?;
        assert_eq!(listed.len(), 2);
        let rest = comments.get_comments(USER, &asset, 2, 2, None).await?;
        assert_eq!(rest.len(), 1);
        assert!(listed.iter().all(|c| c.header.anchor_guid.as_deref() == Some(asset.as_str())));
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_attachment_by_exact_ends() -> Result<()> {
        let fx = Fixture::in_memory();
        let relationships = RelationshipHandler::new(fx.ctx.clone());
        let collection = fx.collection("Collection::detach").await?;
        let asset = fx.asset("Asset::detach").await?;
        fx.collections
            .add_to_collection(USER, &collection, &asset, MembershipBuilder::new(), None)
            .await?;

        relationships
            .remove_attachment(USER, &collection, types::COLLECTION_MEMBERSHIP, &asset, "elementGUID")
            .await?;
        assert!(fx.membership(&collection, &asset).await.is_err());

        let err = relationships
            .remove_attachment(USER, &collection, types::COLLECTION_MEMBERSHIP, &asset, "elementGUID")
            .await
            .unwrap_err();
        assert_eq!(err.parameter(), Some("elementGUID"));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_appointment_merge_keeps_window() -> Result<()> {
        let fx = Fixture::in_memory();
        let role = fx.role("Role::window", 0).await?;
        let person = fx.person("Person::wendy").await?;
        let now = Utc::now();
        let window = EffectivityWindow::new(Some(now - Duration::days(10)), None);

        let appointment = fx
            .roles
            .appoint_person_to_role(
                USER,
                &role,
                &person,
                AppointmentBuilder::new().with_window(window),
                None,
            )
            .await?;

        fx.roles
            .update_appointment(
                USER,
                &appointment,
                AppointmentBuilder::new().with_is_public(true),
                true,
                None,
            )
            .await?;
        let merged = fx
            .ctx
            .store()
            .get_relationship(&appointment)
            .await?
            .expect("appointment");
        assert_eq!(merged.window, window);
        assert_eq!(merged.properties.get(properties::IS_PUBLIC), Some(&json!(true)));

        fx.roles
            .update_appointment(USER, &appointment, AppointmentBuilder::new(), false, None)
            .await?;
        let replaced = fx
            .ctx
            .store()
            .get_relationship(&appointment)
            .await?
            .expect("appointment");
        assert!(replaced.window.is_open());
        assert!(replaced.properties.is_empty());
        Ok(())
    }

    /// Store wrapper that holds the first two relationship lookups at a barrier
    ///
    /// Both concurrent updates therefore read the same starting state before
    /// either writes.
    struct GatedStore {
        inner: InMemoryStore,
        barrier: Barrier,
        gated: AtomicUsize,
        armed: AtomicBool,
    }

    impl GatedStore {
        fn new() -> Self {
            Self {
                inner: InMemoryStore::new(),
                barrier: Barrier::new(2),
                gated: AtomicUsize::new(0),
                armed: AtomicBool::new(false),
            }
        }

        fn arm(&self) {
            self.armed.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl MetadataStore for GatedStore {
        async fn create_entity(&self, element: MetadataElement) -> StoreResult<MetadataElement> {
            self.inner.create_entity(element).await
        }

        async fn get_entity(&self, guid: &str) -> StoreResult<Option<MetadataElement>> {
            self.inner.get_entity(guid).await
        }

        async fn update_entity(&self, guid: &str, update: EntityUpdate) -> StoreResult<MetadataElement> {
            self.inner.update_entity(guid, update).await
        }

        async fn delete_entity(&self, guid: &str) -> StoreResult<DeleteResult> {
            self.inner.delete_entity(guid).await
        }

        async fn find_entities(&self, query: &EntityQuery) -> StoreResult<Vec<MetadataElement>> {
            self.inner.find_entities(query).await
        }

        async fn classify_entity(
            &self,
            guid: &str,
            classification: Classification,
            mode: UpdateMode,
        ) -> StoreResult<MetadataElement> {
            self.inner.classify_entity(guid, classification, mode).await
        }

        async fn declassify_entity(&self, guid: &str, name: &str) -> StoreResult<MetadataElement> {
            self.inner.declassify_entity(guid, name).await
        }

        async fn set_zone_membership(
            &self,
            guid: &str,
            zones: Vec<String>,
        ) -> StoreResult<MetadataElement> {
            self.inner.set_zone_membership(guid, zones).await
        }

        async fn create_relationship(&self, relationship: Relationship) -> StoreResult<Relationship> {
            self.inner.create_relationship(relationship).await
        }

        async fn get_relationship(&self, guid: &str) -> StoreResult<Option<Relationship>> {
            self.inner.get_relationship(guid).await
        }

        async fn update_relationship(
            &self,
            guid: &str,
            update: RelationshipUpdate,
        ) -> StoreResult<Relationship> {
            self.inner.update_relationship(guid, update).await
        }

        async fn delete_relationship(&self, guid: &str) -> StoreResult<()> {
            self.inner.delete_relationship(guid).await
        }

        async fn find_relationships(&self, query: &RelationshipQuery) -> StoreResult<Vec<Relationship>> {
            let found = self.inner.find_relationships(query).await?;
            if self.armed.load(Ordering::SeqCst) && self.gated.fetch_add(1, Ordering::SeqCst) < 2 {
                self.barrier.wait().await;
            }
            Ok(found)
        }
    }

    #[tokio::test]
    async fn test_concurrent_merges_lose_one_update() -> Result<()> {
        metaspace_core::telemetry::init_test_tracing();
        let store = Arc::new(GatedStore::new());
        let ctx = HandlerContext::new(
            store.clone(),
            Arc::new(TypeRegistry::with_defaults()),
            Arc::new(AllowAll),
            HandlerConfig::default(),
        );
        let fx = Fixture::new(ctx);
        let collection = fx.collection("Collection::race").await?;
        let asset = fx.asset("Asset::race").await?;
        fx.collections
            .add_to_collection(USER, &collection, &asset, MembershipBuilder::new(), None)
            .await?;

        store.arm();
        let (a, b) = tokio::join!(
            fx.collections.update_collection_membership(
                USER,
                &collection,
                &asset,
                MembershipBuilder::new().with_membership_rationale("from A"),
                true,
                None,
            ),
            fx.collections.update_collection_membership(
                USER,
                &collection,
                &asset,
                MembershipBuilder::new().with_confidence(99),
                true,
                None,
            ),
        );
        a?;
        b?;

        // Both read the empty bag, so the second write replaces the first
        let stored = fx.membership(&collection, &asset).await?;
        let has_rationale = stored.properties.contains_key(properties::MEMBERSHIP_RATIONALE);
        let has_confidence = stored.properties.contains_key(properties::CONFIDENCE);
        assert!(has_rationale ^ has_confidence);
        Ok(())
    }
}
