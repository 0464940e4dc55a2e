//! Effectivity Windows
//!
//! Every element, classification and relationship carries an
//! `[effective_from, effective_to]` window. Both ends are optional; a missing
//! end is open (minus or plus infinity). Both ends are inclusive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Validity interval for a stored item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectivityWindow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_from: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_to: Option<DateTime<Utc>>,
}

impl EffectivityWindow {
    pub fn new(effective_from: Option<DateTime<Utc>>, effective_to: Option<DateTime<Utc>>) -> Self {
        Self {
            effective_from,
            effective_to,
        }
    }

    /// A window open at both ends (always effective)
    pub fn open() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.effective_from.is_none() && self.effective_to.is_none()
    }

    /// Window after a merge update: each bound `supplied` sets wins, the
    /// other keeps its stored value
    ///
    /// The result may be inverted; callers validate it.
    pub fn overlay(&self, supplied: &EffectivityWindow) -> Self {
        Self {
            effective_from: supplied.effective_from.or(self.effective_from),
            effective_to: supplied.effective_to.or(self.effective_to),
        }
    }

    /// Reject windows whose start lies after their end
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chrono::{Duration, Utc};
    /// use metaspace_core::models::EffectivityWindow;
    ///
    /// let now = Utc::now();
    /// assert!(EffectivityWindow::new(Some(now), Some(now)).validate().is_ok());
    /// assert!(EffectivityWindow::new(Some(now), Some(now - Duration::days(1)))
    ///     .validate()
    ///     .is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let (Some(from), Some(to)) = (self.effective_from, self.effective_to) {
            if from > to {
                return Err(ValidationError::InvalidWindow { from, to });
            }
        }
        Ok(())
    }

    /// Whether `instant` lies inside the window
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        let after_start = self.effective_from.map_or(true, |from| from <= instant);
        let before_end = self.effective_to.map_or(true, |to| instant <= to);
        after_start && before_end
    }

    /// Whether the window is effective for a read made at `effective_time`
    ///
    /// `None` means the caller ignores effectivity altogether.
    pub fn is_effective_at(&self, effective_time: Option<DateTime<Utc>>) -> bool {
        match effective_time {
            None => true,
            Some(instant) => self.contains(instant),
        }
    }
}
