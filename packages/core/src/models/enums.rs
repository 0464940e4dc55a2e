//! Stored Enumerations
//!
//! Enumerations written into property bags by their symbolic name. Readers
//! also accept the ordinal, which is what older writers stored.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::services::bean_factory::StoredEnum;

/// Lifecycle status of an element's membership in a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MembershipStatus {
    /// Status not known (default)
    Unknown,
    /// Found by an automated process, not yet reviewed
    Discovered,
    /// Suggested for membership
    Proposed,
    /// Copied in from another source
    Imported,
    /// Reviewed and confirmed
    Validated,
    /// Still present but should no longer be used
    Deprecated,
    /// No longer valid
    Obsolete,
    /// See `userDefinedStatus`
    Other,
}

impl StoredEnum for MembershipStatus {
    const TYPE_NAME: &'static str = "MembershipStatus";
    const VARIANTS: &'static [Self] = &[
        Self::Unknown,
        Self::Discovered,
        Self::Proposed,
        Self::Imported,
        Self::Validated,
        Self::Deprecated,
        Self::Obsolete,
        Self::Other,
    ];
    const DEFAULT: Self = Self::Unknown;

    fn ordinal(self) -> i64 {
        match self {
            Self::Unknown => 0,
            Self::Discovered => 1,
            Self::Proposed => 2,
            Self::Imported => 3,
            Self::Validated => 4,
            Self::Deprecated => 5,
            Self::Obsolete => 6,
            Self::Other => 99,
        }
    }

    fn symbolic_name(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Discovered => "Discovered",
            Self::Proposed => "Proposed",
            Self::Imported => "Imported",
            Self::Validated => "Validated",
            Self::Deprecated => "Deprecated",
            Self::Obsolete => "Obsolete",
            Self::Other => "Other",
        }
    }
}

impl Default for MembershipStatus {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbolic_name())
    }
}

/// Kind of feedback a comment carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommentType {
    StandardComment,
    Question,
    Answer,
    Suggestion,
    UsageExperience,
    RequirementsComment,
    Other,
}

impl StoredEnum for CommentType {
    const TYPE_NAME: &'static str = "CommentType";
    const VARIANTS: &'static [Self] = &[
        Self::StandardComment,
        Self::Question,
        Self::Answer,
        Self::Suggestion,
        Self::UsageExperience,
        Self::RequirementsComment,
        Self::Other,
    ];
    const DEFAULT: Self = Self::StandardComment;

    fn ordinal(self) -> i64 {
        match self {
            Self::StandardComment => 0,
            Self::Question => 1,
            Self::Answer => 2,
            Self::Suggestion => 3,
            Self::UsageExperience => 4,
            Self::RequirementsComment => 5,
            Self::Other => 99,
        }
    }

    fn symbolic_name(self) -> &'static str {
        match self {
            Self::StandardComment => "StandardComment",
            Self::Question => "Question",
            Self::Answer => "Answer",
            Self::Suggestion => "Suggestion",
            Self::UsageExperience => "UsageExperience",
            Self::RequirementsComment => "RequirementsComment",
            Self::Other => "Other",
        }
    }
}

impl Default for CommentType {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for CommentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbolic_name())
    }
}
