/// Configuration for the metadata handlers
use serde::{Deserialize, Serialize};

/// Upper bound accepted for `max_page_size`
const MAX_SUPPORTED_PAGE_SIZE: usize = 10_000;

/// Handler configuration
///
/// Zone lists are plain names. An empty `supported_zones` list means the
/// caller sees every zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HandlerConfig {
    /// Name reported in logs and events for this handler instance
    pub server_name: String,

    /// Zones callers of this instance may see
    pub supported_zones: Vec<String>,

    /// Zones stamped on new elements that do not name their own
    pub default_zones: Vec<String>,

    /// Zone list written by `publish`
    pub publish_zones: Vec<String>,

    /// Zone list written by `withdraw`
    pub withdraw_zones: Vec<String>,

    /// Page size used when a caller passes 0
    pub default_page_size: usize,

    /// Largest page a caller may request
    pub max_page_size: usize,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            server_name: "metaspace".to_string(),
            supported_zones: Vec::new(),
            default_zones: Vec::new(),
            publish_zones: Vec::new(),
            withdraw_zones: Vec::new(),
            default_page_size: 100,
            max_page_size: 1000,
        }
    }
}

impl HandlerConfig {
    /// Parse a JSON document; missing keys take their default values
    pub fn from_json_str(json: &str) -> Result<Self, String> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| format!("invalid handler config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.server_name.trim().is_empty() {
            return Err("server_name cannot be empty".to_string());
        }

        if self.default_page_size == 0 {
            return Err("default_page_size must be greater than 0".to_string());
        }

        if self.max_page_size < self.default_page_size {
            return Err("max_page_size cannot be smaller than default_page_size".to_string());
        }

        if self.max_page_size > MAX_SUPPORTED_PAGE_SIZE {
            return Err(format!(
                "max_page_size cannot exceed {}",
                MAX_SUPPORTED_PAGE_SIZE
            ));
        }

        let zone_lists = [
            ("supported_zones", &self.supported_zones),
            ("default_zones", &self.default_zones),
            ("publish_zones", &self.publish_zones),
            ("withdraw_zones", &self.withdraw_zones),
        ];
        for (field, zones) in zone_lists {
            if zones.iter().any(|z| z.trim().is_empty()) {
                return Err(format!("{} cannot contain blank zone names", field));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(HandlerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = HandlerConfig::from_json_str(
            r#"{"supportedZones": ["public"], "publishZones": ["public", "quarantine"]}"#,
        )
        .unwrap();
        assert_eq!(config.supported_zones, vec!["public"]);
        assert_eq!(config.publish_zones.len(), 2);
        assert_eq!(config.default_page_size, 100);
    }

    #[test]
    fn test_invalid_page_sizes() {
        let config = HandlerConfig {
            default_page_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = HandlerConfig {
            default_page_size: 50,
            max_page_size: 10,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blank_zone_rejected() {
        let err = HandlerConfig::from_json_str(r#"{"defaultZones": [""]}"#).unwrap_err();
        assert!(err.contains("default_zones"));
    }
}
