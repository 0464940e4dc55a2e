//! Handler Services
//!
//! Handlers turn caller requests into store operations while enforcing the
//! metadata rules:
//!
//! - `GenericHandler` - create/update/delete/find for any entity kind
//! - `RelationshipHandler` - link, unlink and update relationships between entities
//! - `CollectionHandler` - collections and their memberships
//! - `PersonRoleHandler` - person roles and appointments
//! - `CommentHandler` - comments attached to elements
//! - `ReferenceSeeder` - create-if-absent loading of reference values
//!
//! All handlers share a `HandlerContext` holding the store, the type system,
//! the security verifier and the zone policy.

pub mod bean_factory;
pub mod builders;
pub mod collection_handler;
pub mod comment_handler;
pub mod context;
pub mod element_handler;
pub mod error;
pub mod person_role_handler;
pub mod policy;
pub mod relationship_handler;
pub mod seeding;

pub use collection_handler::CollectionHandler;
pub use comment_handler::CommentHandler;
pub use context::HandlerContext;
pub use element_handler::{CreateOptions, FindOptions, GenericHandler};
pub use error::{HandlerError, HandlerResult};
pub use person_role_handler::PersonRoleHandler;
pub use policy::{ReadFlags, ZonePolicy};
pub use relationship_handler::{AttachedEnd, EndSpec, RelationshipHandler};
pub use seeding::{ReferenceSeeder, SeedCache};
