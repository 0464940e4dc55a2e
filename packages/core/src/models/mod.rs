//! Data Models
//!
//! This module contains the data structures shared by every layer:
//!
//! - `MetadataElement` - universal stored entity with an ordered property bag
//! - `Relationship` - typed directed edge between two elements
//! - `EffectivityWindow` - validity interval carried by elements,
//!   classifications and relationships
//! - Typed beans (`CollectionElement`, `PersonRoleElement`, ...) built from
//!   stored elements by the bean factory
//!
//! All type-specific data lives in the `properties` bag; the beans are typed
//! views over it.

mod beans;
mod effectivity;
mod element;
mod enums;
pub mod names;
mod relationship;

pub use beans::{
    CollectionElement, CollectionMember, CommentElement, ElementHeader, MembershipProperties,
    PersonRoleAppointee, PersonRoleElement, ReferenceableElement, ValidValueElement,
};
pub use effectivity::EffectivityWindow;
pub use element::{Classification, MetadataElement, PropertyMap, ValidationError};
pub use enums::{CommentType, MembershipStatus};
pub use relationship::{Relationship, RelationshipEnd};
