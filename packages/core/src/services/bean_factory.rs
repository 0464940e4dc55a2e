//! Bean Factory
//!
//! Converts loosely typed stored instances into strongly typed beans.
//!
//! # Architecture
//!
//! - **Explicit factories**: every bean type implements `MetadataBean` and
//!   supplies its own `from_stored` constructor; there is no reflection
//! - **Single pass**: `PropertyExtractor` removes each known property from a
//!   working copy of the bag; whatever is left becomes the bean's extended
//!   properties
//! - **Observable enum fallback**: stored enumerations resolve by symbolic name
//!   or ordinal; an unrecognized value yields `EnumMapping::Fallback`, which is
//!   logged and still carries the type's default variant
//!
//! # Examples
//!
//! ```rust
//! use metaspace_core::models::{MembershipStatus, PropertyMap};
//! use metaspace_core::services::bean_factory::{EnumMapping, PropertyExtractor};
//! use serde_json::json;
//!
//! let mut bag = PropertyMap::new();
//! bag.insert("qualifiedName".to_string(), json!("qn"));
//! bag.insert("membershipStatus".to_string(), json!(42));
//! bag.insert("colour".to_string(), json!("blue"));
//!
//! let mut extractor = PropertyExtractor::new(&bag);
//! assert_eq!(extractor.take_string("qualifiedName").unwrap(), Some("qn".to_string()));
//!
//! let status = extractor.take_enum::<MembershipStatus>("membershipStatus");
//! assert!(matches!(status, EnumMapping::Fallback { .. }));
//! assert_eq!(status.value(), MembershipStatus::Unknown);
//!
//! let extended = extractor.into_extended();
//! assert_eq!(extended.len(), 1);
//! assert!(extended.contains_key("colour"));
//! ```

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::models::{MetadataElement, PropertyMap, Relationship};

use super::error::{HandlerError, HandlerResult};

/// A stored value that does not fit the shape a bean expects
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TypeMappingError {
    #[error("Property '{property}' holds {actual}, expected {expected}")]
    WrongShape {
        property: String,
        expected: &'static str,
        actual: String,
    },

    #[error("Ordinal {ordinal} is out of range for {enum_name}")]
    OrdinalOutOfRange {
        enum_name: &'static str,
        ordinal: i64,
    },

    #[error("Required property '{0}' is missing")]
    MissingProperty(String),
}

impl From<TypeMappingError> for HandlerError {
    fn from(err: TypeMappingError) -> Self {
        HandlerError::construction_failure("stored instance", err.to_string())
    }
}

/// Enumeration stored in a property bag by symbolic name or ordinal
pub trait StoredEnum: Sized + Copy + PartialEq + 'static {
    /// Name used in log messages and errors
    const TYPE_NAME: &'static str;

    /// Every variant, in ordinal order
    const VARIANTS: &'static [Self];

    /// Variant used when the stored value is missing or unrecognized
    const DEFAULT: Self;

    fn ordinal(self) -> i64;

    fn symbolic_name(self) -> &'static str;

    fn from_ordinal(ordinal: i64) -> Option<Self> {
        Self::VARIANTS.iter().copied().find(|v| v.ordinal() == ordinal)
    }

    fn from_symbolic_name(name: &str) -> Option<Self> {
        Self::VARIANTS
            .iter()
            .copied()
            .find(|v| v.symbolic_name().eq_ignore_ascii_case(name))
    }

    /// Ordinal lookup that treats an unknown ordinal as an error
    fn from_ordinal_strict(ordinal: i64) -> Result<Self, TypeMappingError> {
        Self::from_ordinal(ordinal).ok_or(TypeMappingError::OrdinalOutOfRange {
            enum_name: Self::TYPE_NAME,
            ordinal,
        })
    }
}

/// Outcome of mapping a stored enumeration value
#[derive(Debug, Clone, PartialEq)]
pub enum EnumMapping<E> {
    /// Stored name or ordinal matched a variant
    Matched(E),
    /// Property was absent; default variant
    Missing(E),
    /// Stored value was not recognized; default variant
    Fallback { value: E, stored: Value },
}

impl<E: Copy> EnumMapping<E> {
    pub fn value(&self) -> E {
        match self {
            Self::Matched(v) | Self::Missing(v) => *v,
            Self::Fallback { value, .. } => *value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "a boolean".to_string(),
        Value::Number(_) => "a number".to_string(),
        Value::String(_) => "a string".to_string(),
        Value::Array(_) => "an array".to_string(),
        Value::Object(_) => "an object".to_string(),
    }
}

/// Remove-and-return view over a working copy of a property bag
#[derive(Debug, Clone)]
pub struct PropertyExtractor {
    remaining: PropertyMap,
}

impl PropertyExtractor {
    pub fn new(properties: &PropertyMap) -> Self {
        Self {
            remaining: properties.clone(),
        }
    }

    fn take_with<T>(
        &mut self,
        name: &str,
        expected: &'static str,
        convert: impl FnOnce(&Value) -> Option<T>,
    ) -> Result<Option<T>, TypeMappingError> {
        match self.remaining.remove(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => convert(&value)
                .map(Some)
                .ok_or_else(|| TypeMappingError::WrongShape {
                    property: name.to_string(),
                    expected,
                    actual: describe(&value),
                }),
        }
    }

    pub fn take_string(&mut self, name: &str) -> Result<Option<String>, TypeMappingError> {
        self.take_with(name, "a string", |v| v.as_str().map(str::to_string))
    }

    /// Required string; absence is a mapping error
    pub fn require_string(&mut self, name: &str) -> Result<String, TypeMappingError> {
        self.take_string(name)?
            .ok_or_else(|| TypeMappingError::MissingProperty(name.to_string()))
    }

    pub fn take_int(&mut self, name: &str) -> Result<Option<i64>, TypeMappingError> {
        self.take_with(name, "an integer", Value::as_i64)
    }

    pub fn take_bool(&mut self, name: &str) -> Result<Option<bool>, TypeMappingError> {
        self.take_with(name, "a boolean", Value::as_bool)
    }

    pub fn take_map(&mut self, name: &str) -> Result<Option<PropertyMap>, TypeMappingError> {
        self.take_with(name, "an object", |v| v.as_object().cloned())
    }

    /// Nested map whose values are all strings
    pub fn take_string_map(
        &mut self,
        name: &str,
    ) -> Result<Option<Vec<(String, String)>>, TypeMappingError> {
        self.take_with(name, "a map of strings", |v| {
            v.as_object()?
                .iter()
                .map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
    }

    /// RFC 3339 timestamp
    pub fn take_date(&mut self, name: &str) -> Result<Option<DateTime<Utc>>, TypeMappingError> {
        self.take_with(name, "an RFC 3339 timestamp", |v| {
            v.as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc))
        })
    }

    /// Map a stored enumeration, falling back to `E::DEFAULT` when unrecognized
    pub fn take_enum<E: StoredEnum>(&mut self, name: &str) -> EnumMapping<E> {
        let stored = match self.remaining.remove(name) {
            None | Some(Value::Null) => return EnumMapping::Missing(E::DEFAULT),
            Some(value) => value,
        };

        let matched = match &stored {
            Value::String(s) => E::from_symbolic_name(s),
            Value::Number(n) => n.as_i64().and_then(E::from_ordinal),
            _ => None,
        };

        match matched {
            Some(value) => EnumMapping::Matched(value),
            None => {
                tracing::warn!(
                    "Unrecognized {} value {} in '{}', using {}",
                    E::TYPE_NAME,
                    stored,
                    name,
                    E::DEFAULT.symbolic_name()
                );
                EnumMapping::Fallback {
                    value: E::DEFAULT,
                    stored,
                }
            }
        }
    }

    /// Residue of the bag: everything not yet taken
    pub fn into_extended(self) -> PropertyMap {
        self.remaining
    }
}

/// Strongly typed result constructed from a stored element
///
/// `relationship` is the relationship that led to the element, for beans that
/// carry relationship properties (such as collection members).
pub trait MetadataBean: Sized + Send + Sync + 'static {
    /// Default entity type handled by this bean
    const TYPE_NAME: &'static str;

    fn from_stored(
        element: &MetadataElement,
        relationship: Option<&Relationship>,
    ) -> HandlerResult<Self>;
}

fn bean_name<B>() -> &'static str {
    let full = std::any::type_name::<B>();
    full.rsplit("::").next().unwrap_or(full)
}

/// Build a bean, reporting any failure as `ConstructionFailure`
pub fn build_bean<B: MetadataBean>(
    element: &MetadataElement,
    relationship: Option<&Relationship>,
) -> HandlerResult<B> {
    B::from_stored(element, relationship).map_err(|err| {
        let reason = match err {
            HandlerError::ConstructionFailure { reason, .. } => reason,
            other => other.to_string(),
        };
        tracing::warn!(
            "Failed to construct {} from element {}: {}",
            bean_name::<B>(),
            element.guid,
            reason
        );
        HandlerError::construction_failure(bean_name::<B>(), reason)
    })
}
