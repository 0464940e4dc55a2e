//! Metaspace Core Metadata Handlers
//!
//! This crate provides the generic handler layer of a metadata repository:
//! typed create/read/update/delete over a graph of elements and relationships,
//! with effectivity windows, governance zones, anchors and classifications
//! applied consistently on every path.
//!
//! # Architecture
//!
//! - **Property bags**: every element stores its attributes as an ordered JSON map
//! - **Typed beans**: handlers return typed views built by the bean factory
//! - **Pluggable collaborators**: the store, the type system and the security
//!   verifier sit behind traits
//! - **Events**: every successful mutation is broadcast as a `MetadataEvent`
//!
//! # Modules
//!
//! - [`models`] - Elements, relationships, effectivity windows and beans
//! - [`db`] - Store trait, in-memory store and domain events
//! - [`types`] - Type registry and type resolution
//! - [`services`] - Generic and kind-specific handlers
//! - [`security`] - Authorization boundary
//! - [`config`] - Handler configuration
//! - [`telemetry`] - Tracing subscriber setup

pub mod config;
pub mod db;
pub mod models;
pub mod security;
pub mod services;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use config::HandlerConfig;
pub use models::*;
pub use security::{AccessDecision, AllowAll, FnVerifier, Operation, SecurityVerifier};
pub use services::*;
