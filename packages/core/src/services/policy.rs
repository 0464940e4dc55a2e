//! Visibility Policies
//!
//! Stateless filters applied by every handler read and write:
//!
//! - **Effectivity**: items outside the caller's `effective_time` are treated
//!   as if they did not exist
//! - **Zones**: elements are visible when their zones overlap the caller's
//!   supported zones (an empty list on either side means unrestricted)
//! - **Lineage/duplicates**: `Memento` and `KnownDuplicate` classifications hide
//!   an element unless the caller explicitly asks for them

use chrono::{DateTime, Utc};

use crate::config::HandlerConfig;
use crate::models::names::classifications;
use crate::models::{EffectivityWindow, MetadataElement, Relationship};

use super::error::HandlerResult;

/// Reject a window whose start lies after its end (`InvalidInput` on `effectiveFrom`)
pub fn validate_window(window: &EffectivityWindow) -> HandlerResult<()> {
    window.validate()?;
    Ok(())
}

pub fn is_element_effective(element: &MetadataElement, effective_time: Option<DateTime<Utc>>) -> bool {
    element.window.is_effective_at(effective_time)
}

pub fn is_relationship_effective(
    relationship: &Relationship,
    effective_time: Option<DateTime<Utc>>,
) -> bool {
    relationship.window.is_effective_at(effective_time)
}

/// Drop classifications that are not effective at `effective_time`
pub fn strip_ineffective_classifications(
    mut element: MetadataElement,
    effective_time: Option<DateTime<Utc>>,
) -> MetadataElement {
    element
        .classifications
        .retain(|c| c.window.is_effective_at(effective_time));
    element
}

/// Lineage and duplicate-processing switches carried by read operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadFlags {
    /// Return elements logically deleted but kept for lineage
    pub for_lineage: bool,
    /// Return elements marked as known duplicates
    pub for_duplicate_processing: bool,
}

impl ReadFlags {
    pub fn new(for_lineage: bool, for_duplicate_processing: bool) -> Self {
        Self {
            for_lineage,
            for_duplicate_processing,
        }
    }

    /// Whether the element survives the lineage/duplicate filters
    ///
    /// Only classifications effective at `effective_time` count.
    pub fn admits(&self, element: &MetadataElement, effective_time: Option<DateTime<Utc>>) -> bool {
        let carries = |name: &str| {
            element
                .classification(name)
                .is_some_and(|c| c.window.is_effective_at(effective_time))
        };
        if !self.for_lineage && carries(classifications::MEMENTO) {
            return false;
        }
        if !self.for_duplicate_processing && carries(classifications::KNOWN_DUPLICATE) {
            return false;
        }
        true
    }
}

/// Zone visibility rules for one caller scope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZonePolicy {
    pub supported_zones: Vec<String>,
    pub default_zones: Vec<String>,
    pub publish_zones: Vec<String>,
    pub withdraw_zones: Vec<String>,
}

impl ZonePolicy {
    pub fn from_config(config: &HandlerConfig) -> Self {
        Self {
            supported_zones: config.supported_zones.clone(),
            default_zones: config.default_zones.clone(),
            publish_zones: config.publish_zones.clone(),
            withdraw_zones: config.withdraw_zones.clone(),
        }
    }

    /// Copy of this policy scoped to a different set of supported zones
    pub fn with_supported_zones(&self, supported_zones: Vec<String>) -> Self {
        Self {
            supported_zones,
            ..self.clone()
        }
    }

    /// Whether a caller limited to `supported_zones` may see the element
    pub fn is_visible(&self, element: &MetadataElement) -> bool {
        zones_intersect(&element.zone_membership, &self.supported_zones)
    }

    /// Zone list stamped on a new element
    pub fn zones_for_new_element(&self, supplied: &[String]) -> Vec<String> {
        if supplied.is_empty() {
            self.default_zones.clone()
        } else {
            supplied.to_vec()
        }
    }
}

/// Visible iff the lists share a zone, or either list is empty
pub fn zones_intersect(element_zones: &[String], supported_zones: &[String]) -> bool {
    element_zones.is_empty()
        || supported_zones.is_empty()
        || element_zones.iter().any(|z| supported_zones.contains(z))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Classification, PropertyMap};
    use chrono::Duration;

    fn zoned(zones: &[&str]) -> MetadataElement {
        let mut element = MetadataElement::new("g", "Asset", PropertyMap::new());
        element.zone_membership = zones.iter().map(|z| z.to_string()).collect();
        element
    }

    fn policy(supported: &[&str]) -> ZonePolicy {
        ZonePolicy {
            supported_zones: supported.iter().map(|z| z.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_zone_visibility() {
        let restricted = zoned(&["restricted"]);
        assert!(!policy(&["public"]).is_visible(&restricted));
        assert!(policy(&["restricted"]).is_visible(&restricted));
        assert!(policy(&[]).is_visible(&restricted));
        assert!(policy(&["public"]).is_visible(&zoned(&[])));
    }

    #[test]
    fn test_default_zones_stamped_only_when_none_supplied() {
        let policy = ZonePolicy {
            default_zones: vec!["quarantine".to_string()],
            ..Default::default()
        };
        assert_eq!(policy.zones_for_new_element(&[]), vec!["quarantine"]);
        assert_eq!(
            policy.zones_for_new_element(&["sales".to_string()]),
            vec!["sales"]
        );
    }

    #[test]
    fn test_memento_hidden_unless_for_lineage() {
        let mut element = zoned(&[]);
        element
            .classifications
            .push(Classification::new(classifications::MEMENTO, PropertyMap::new()));

        assert!(!ReadFlags::default().admits(&element, None));
        assert!(ReadFlags::new(true, false).admits(&element, None));
    }

    #[test]
    fn test_known_duplicate_hidden_unless_for_duplicate_processing() {
        let mut element = zoned(&[]);
        element.classifications.push(Classification::new(
            classifications::KNOWN_DUPLICATE,
            PropertyMap::new(),
        ));

        assert!(!ReadFlags::default().admits(&element, None));
        assert!(ReadFlags::new(false, true).admits(&element, None));
    }

    #[test]
    fn test_expired_memento_does_not_hide() {
        let now = Utc::now();
        let mut element = zoned(&[]);
        element.classifications.push(
            Classification::new(classifications::MEMENTO, PropertyMap::new())
                .with_window(EffectivityWindow::new(None, Some(now - Duration::days(1)))),
        );

        assert!(ReadFlags::default().admits(&element, Some(now)));
        assert!(!ReadFlags::default().admits(&element, None));
    }

    #[test]
    fn test_strip_ineffective_classifications() {
        let now = Utc::now();
        let mut element = zoned(&[]);
        element.classifications.push(
            Classification::new(classifications::CONFIDENTIALITY, PropertyMap::new())
                .with_window(EffectivityWindow::new(Some(now + Duration::days(1)), None)),
        );
        element
            .classifications
            .push(Classification::new(classifications::CRITICALITY, PropertyMap::new()));

        let stripped = strip_ineffective_classifications(element, Some(now));
        assert_eq!(stripped.classifications.len(), 1);
        assert_eq!(stripped.classifications[0].name, classifications::CRITICALITY);
    }
}
