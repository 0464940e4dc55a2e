//! Metaspace Demo
//!
//! Runs the handlers against an in-memory store: creates a collection and an
//! asset, links them, comments on the asset and lists the members.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin metaspace-demo
//!
//! # With a handler configuration file
//! METASPACE_CONFIG=handler.json cargo run --bin metaspace-demo
//! ```

use anyhow::Context;
use metaspace_core::services::bean_factory::StoredEnum;
use metaspace_core::services::builders::{
    CollectionBuilder, CommentBuilder, ElementBuilder, MembershipBuilder, PropertyBuilder,
};
use metaspace_core::services::{
    CollectionHandler, CommentHandler, CreateOptions, GenericHandler, HandlerContext,
};
use metaspace_core::{telemetry, HandlerConfig, MembershipStatus, ReferenceableElement};

const DEMO_USER: &str = "demo-user";

fn load_config() -> anyhow::Result<HandlerConfig> {
    match std::env::var("METASPACE_CONFIG") {
        Ok(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path))?;
            HandlerConfig::from_json_str(&raw).map_err(|e| anyhow::anyhow!("Invalid config: {}", e))
        }
        Err(_) => Ok(HandlerConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    let config = load_config()?;
    tracing::info!("Starting {} demo", config.server_name);

    let ctx = HandlerContext::in_memory(config);
    let mut events = ctx.subscribe();

    let collections = CollectionHandler::new(ctx.clone());
    let assets = GenericHandler::<ReferenceableElement>::for_type(ctx.clone(), "Asset");
    let comments = CommentHandler::new(ctx.clone());

    let collection_guid = collections
        .create_collection(
            DEMO_USER,
            CollectionBuilder::new()
                .with_qualified_name("Collection::favourites")
                .with_display_name("Favourites")
                .with_collection_type("Bookmarks"),
            CreateOptions::default(),
            None,
        )
        .await?;

    let asset_guid = assets
        .create_element(
            DEMO_USER,
            ElementBuilder::new()
                .with_qualified_name("Asset::customer-table")
                .with_display_name("Customer table"),
            CreateOptions::default(),
            None,
        )
        .await?;

    collections
        .add_to_collection(
            DEMO_USER,
            &collection_guid,
            &asset_guid,
            MembershipBuilder::new()
                .with_membership_rationale("Used by the weekly report")
                .with_status(MembershipStatus::Validated.ordinal())
                .with_confidence(90),
            None,
        )
        .await?;

    comments
        .add_comment_to_element(
            DEMO_USER,
            &asset_guid,
            CommentBuilder::new()
                .with_qualified_name("Comment::customer-table::1")
                .with_text("Row counts look low this week"),
            None,
        )
        .await?;

    let members = collections
        .get_collection_members(DEMO_USER, &collection_guid, 0, 0, None)
        .await?;
    println!("Collection {} has {} member(s):", collection_guid, members.len());
    for member in &members {
        let status = member
            .membership
            .as_ref()
            .map(|m| m.status.to_string())
            .unwrap_or_default();
        println!("  {} [{}]", member.element.qualified_name, status);
    }

    let attached = comments
        .get_comments(DEMO_USER, &asset_guid, 0, 0, None)
        .await?;
    for comment in &attached {
        println!(
            "  comment on {}: {}",
            asset_guid,
            comment.text.as_deref().unwrap_or("")
        );
    }

    while let Ok(event) = events.try_recv() {
        tracing::debug!("event {} by {}", event.event_type(), event.user_id());
    }

    Ok(())
}
