//! Connector Framework configuration types
//!
//! Base trait for connector configuration.

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{ConnectorError, ConnectorResult};

/// Placeholder substituted for secrets by [`ConnectorConfig::redacted`].
pub const REDACTED: &str = "***REDACTED***";

/// Trait for connector-specific configuration.
///
/// Each connector implements this trait to define its configuration
/// schema and validation rules. A validated configuration is immutable and
/// handed to every operation explicitly.
pub trait ConnectorConfig: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Validate the configuration.
    ///
    /// Returns an error if the configuration is invalid.
    fn validate(&self) -> ConnectorResult<()>;

    /// Get credentials that need to be encrypted.
    ///
    /// Returns a list of (field_name, value) pairs for sensitive data.
    fn get_credentials(&self) -> Vec<(&'static str, String)>;

    /// Create a redacted version of this config (for logging/display).
    ///
    /// Sensitive fields should be replaced with placeholders.
    fn redacted(&self) -> Self;

    /// Deserialize and validate a JSON configuration.
    fn from_json(value: serde_json::Value) -> ConnectorResult<Self> {
        let config: Self =
            serde_json::from_value(value).map_err(|e| ConnectorError::InvalidConfiguration {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }
}

/// Fail with `InvalidConfiguration` when a mandatory field is blank.
pub fn require_non_empty(field: &str, value: &str) -> ConnectorResult<()> {
    if value.trim().is_empty() {
        return Err(ConnectorError::InvalidConfiguration {
            message: format!("{field} is required"),
        });
    }
    Ok(())
}
