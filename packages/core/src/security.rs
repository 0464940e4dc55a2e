//! Security Verifier Boundary
//!
//! Handlers ask a `SecurityVerifier` for a yes/no decision before touching an
//! element. Policy content lives outside this crate; only the contract is here.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::MetadataElement;

/// Operation being authorized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Classify,
    Declassify,
    SetZones,
    Link,
    UpdateLink,
    Unlink,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Classify => "classify",
            Self::Declassify => "declassify",
            Self::SetZones => "set-zones",
            Self::Link => "link",
            Self::UpdateLink => "update-link",
            Self::Unlink => "unlink",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of an authorization check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny,
}

impl AccessDecision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Yes/no authorization contract consumed by every handler
///
/// `element` is the element being acted on; for creates it is the element
/// about to be stored, for links it is the end-1 element.
pub trait SecurityVerifier: Send + Sync {
    fn authorize(
        &self,
        user_id: &str,
        operation: Operation,
        element: Option<&MetadataElement>,
    ) -> AccessDecision;
}

/// Verifier that allows everything (default for embedded use and tests)
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl SecurityVerifier for AllowAll {
    fn authorize(&self, _: &str, _: Operation, _: Option<&MetadataElement>) -> AccessDecision {
        AccessDecision::Allow
    }
}

/// Adapts a closure into a verifier, which keeps test policies short
pub struct FnVerifier<F>(pub F);

impl<F> SecurityVerifier for FnVerifier<F>
where
    F: Fn(&str, Operation, Option<&MetadataElement>) -> AccessDecision + Send + Sync,
{
    fn authorize(
        &self,
        user_id: &str,
        operation: Operation,
        element: Option<&MetadataElement>,
    ) -> AccessDecision {
        (self.0)(user_id, operation, element)
    }
}
