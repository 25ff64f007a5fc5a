//! Atlassian Guard connector configuration.

use std::collections::HashSet;

use idm_connector::config::{require_non_empty, ConnectorConfig, REDACTED};
use idm_connector::definition::UnknownAttributePolicy;
use idm_connector::error::{ConnectorError, ConnectorResult};
use serde::{Deserialize, Serialize};

/// Configuration for the Atlassian Guard connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfiguration {
    /// SCIM directory base URL
    /// (e.g., `https://api.atlassian.com/scim/directory/{directoryId}`).
    pub base_url: String,

    /// Directory API token.
    pub api_token: String,

    /// Groups never returned by member searches, compared case-insensitively.
    #[serde(default)]
    pub ignore_groups: Vec<String>,

    /// Refuse to create a group whose display name is already taken.
    #[serde(default)]
    pub unique_check_group_display_name: bool,

    /// Page size used when the caller does not request one.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Fail on attributes the schema does not know instead of ignoring them.
    #[serde(default)]
    pub strict_schema: bool,
}

fn default_page_size() -> u32 {
    20
}

impl GuardConfiguration {
    /// Create a configuration with defaults for the optional settings.
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: api_token.into(),
            ignore_groups: Vec::new(),
            unique_check_group_display_name: false,
            default_page_size: default_page_size(),
            strict_schema: false,
        }
    }

    /// Set the ignored groups.
    #[must_use]
    pub fn with_ignore_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Enable the group display name uniqueness check.
    #[must_use]
    pub fn with_unique_group_display_name(mut self) -> Self {
        self.unique_check_group_display_name = true;
        self
    }

    /// Reject unknown attributes.
    #[must_use]
    pub fn with_strict_schema(mut self) -> Self {
        self.strict_schema = true;
        self
    }

    /// Lowercased ignored group names.
    pub fn ignore_group_set(&self) -> HashSet<String> {
        self.ignore_groups
            .iter()
            .map(|g| g.trim().to_lowercase())
            .filter(|g| !g.is_empty())
            .collect()
    }

    /// How mapping treats attributes the schema does not know.
    pub fn unknown_attribute_policy(&self) -> UnknownAttributePolicy {
        UnknownAttributePolicy::from_strict(self.strict_schema)
    }
}

impl ConnectorConfig for GuardConfiguration {
    fn validate(&self) -> ConnectorResult<()> {
        require_non_empty("base_url", &self.base_url)?;
        require_non_empty("api_token", &self.api_token)?;

        let url =
            url::Url::parse(&self.base_url).map_err(|e| ConnectorError::InvalidConfiguration {
                message: format!("invalid base_url: {}", e),
            })?;
        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(ConnectorError::InvalidConfiguration {
                message: format!("unsupported base_url scheme: {}", url.scheme()),
            });
        }

        if self.default_page_size == 0 {
            return Err(ConnectorError::InvalidConfiguration {
                message: "default_page_size must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    fn get_credentials(&self) -> Vec<(&'static str, String)> {
        vec![("api_token", self.api_token.clone())]
    }

    fn redacted(&self) -> Self {
        Self {
            api_token: REDACTED.to_string(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE_URL: &str = "https://api.atlassian.com/scim/directory/test";

    #[test]
    fn test_defaults() {
        let config: GuardConfiguration = serde_json::from_value(serde_json::json!({
            "base_url": BASE_URL,
            "api_token": "secret"
        }))
        .unwrap();

        assert_eq!(config.default_page_size, 20);
        assert!(!config.unique_check_group_display_name);
        assert!(!config.strict_schema);
        assert!(config.ignore_groups.is_empty());
        assert_eq!(
            config.unknown_attribute_policy(),
            UnknownAttributePolicy::Ignore
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ignore_group_set_is_lowercased() {
        let config = GuardConfiguration::new(BASE_URL, "secret")
            .with_ignore_groups(["Service-Accounts", " site-admins ", ""]);
        let set = config.ignore_group_set();
        assert_eq!(set.len(), 2);
        assert!(set.contains("service-accounts"));
        assert!(set.contains("site-admins"));
    }

    #[test]
    fn test_invalid_configuration() {
        let missing_token = GuardConfiguration::new(BASE_URL, "");
        assert!(missing_token.validate().is_err());

        let bad_url = GuardConfiguration::new("not a url", "secret");
        let err = bad_url.validate().unwrap_err();
        assert!(err.to_string().contains("invalid base_url"));

        let bad_scheme = GuardConfiguration::new("ftp://example.com/scim", "secret");
        assert!(bad_scheme.validate().is_err());

        let mut zero_page = GuardConfiguration::new(BASE_URL, "secret");
        zero_page.default_page_size = 0;
        assert!(zero_page.validate().is_err());
    }

    #[test]
    fn test_redacted() {
        let config = GuardConfiguration::new(BASE_URL, "secret").with_strict_schema();
        assert_eq!(config.get_credentials(), vec![("api_token", "secret".to_string())]);

        let redacted = config.redacted();
        assert_eq!(redacted.api_token, REDACTED);
        assert_eq!(redacted.base_url, BASE_URL);
        assert_eq!(
            redacted.unknown_attribute_policy(),
            UnknownAttributePolicy::Reject
        );
    }
}
