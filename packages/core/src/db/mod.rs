//! Repository Layer
//!
//! This module holds everything the handlers know about persistence:
//!
//! - `MetadataStore` - async trait over the graph repository
//! - `InMemoryStore` - embedded implementation used by tests and the demo
//! - `StoreError` - typed store failures
//! - `MetadataEvent` - domain events broadcast after mutations
//!
//! The storage engine itself is an external collaborator. Anything that can
//! provide atomic single-instance reads/writes and a regex/exact property
//! search can sit behind `MetadataStore`.

mod error;
pub mod events;
mod memory_store;
mod metadata_store;

pub use error::{StoreError, StoreResult};
pub use events::MetadataEvent;
pub use memory_store::InMemoryStore;
pub use metadata_store::{
    DeleteResult, EntityQuery, EntityUpdate, MetadataStore, RelationshipQuery,
    RelationshipUpdate, SearchMode, UpdateMode,
};
