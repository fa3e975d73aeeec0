//! Configuration types for the dispatch core

use crate::error::{ConduitError, Result};
use crate::tools::ToolPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration for dispatchers built by a factory
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Longest rendering of a result value carried in a COMPLETED event
    pub summary_max_chars: usize,

    /// Invocations at least this slow are logged at warn level
    #[serde(with = "humantime_serde")]
    pub slow_call_threshold: Duration,

    /// Buffer size for mpsc event channels
    pub event_buffer: usize,

    /// Default permission policy for request dispatchers
    pub policy: ToolPolicy,

    /// Admin dispatcher configuration
    pub admin: AdminConfig,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            summary_max_chars: 200,
            slow_call_threshold: Duration::from_secs(5),
            event_buffer: 100,
            policy: ToolPolicy::default(),
            admin: AdminConfig::default(),
        }
    }
}

/// Admin dispatcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Scope a principal needs to use an admin dispatcher at all
    pub base_scope: String,

    /// Extra scope required for tools in `tools`
    pub elevated_scope: String,

    /// Names of elevated admin tools
    pub tools: Vec<String>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            base_scope: "admin".to_string(),
            elevated_scope: "admin:elevated".to_string(),
            tools: Vec::new(),
        }
    }
}

impl DispatchConfig {
    /// Set the summary limit
    pub fn with_summary_max_chars(mut self, max: usize) -> Self {
        self.summary_max_chars = max;
        self
    }

    /// Set the slow-call warning threshold
    pub fn with_slow_call_threshold(mut self, threshold: Duration) -> Self {
        self.slow_call_threshold = threshold;
        self
    }

    /// Set the default permission policy
    pub fn with_policy(mut self, policy: ToolPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Add an elevated admin tool
    pub fn with_admin_tool(mut self, tool_name: impl Into<String>) -> Self {
        self.admin.tools.push(tool_name.into());
        self
    }

    /// Load configuration from file and environment variables.
    ///
    /// Loads in this order:
    /// 1. Default configuration
    /// 2. Configuration file (conduit.toml or path from CONDUIT_CONFIG_PATH)
    /// 3. Environment variable overrides (`CONDUIT_SUMMARY_MAX_CHARS`,
    ///    `CONDUIT_ADMIN__BASE_SCOPE`, ...)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file or an override is invalid.
    pub fn load() -> Result<Self> {
        use figment::{
            Figment,
            providers::{Env, Format, Serialized, Toml},
        };

        let mut figment = Figment::from(Serialized::defaults(DispatchConfig::default()))
            .merge(Toml::file("conduit.toml"));

        if let Ok(path) = std::env::var("CONDUIT_CONFIG_PATH") {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(
            Env::prefixed("CONDUIT_")
                .ignore(&["CONFIG_PATH"])
                .split("__"),
        );

        let config: DispatchConfig = figment.extract().map_err(|e| {
            ConduitError::Configuration(format!("Failed to load configuration: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific TOML file, without environment overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        use figment::{
            Figment,
            providers::{Format, Serialized, Toml},
        };

        let path = path.as_ref();
        if !path.exists() {
            return Err(ConduitError::Configuration(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let config: DispatchConfig = Figment::from(Serialized::defaults(DispatchConfig::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| {
                ConduitError::Configuration(format!(
                    "Failed to load configuration from {}: {}",
                    path.display(),
                    e
                ))
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.summary_max_chars == 0 {
            return Err(ConduitError::Configuration(
                "summary_max_chars must be greater than zero".to_string(),
            ));
        }
        if self.admin.base_scope.trim().is_empty() {
            return Err(ConduitError::Configuration(
                "admin.base_scope must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = DispatchConfig::default();
        assert_eq!(config.summary_max_chars, 200);
        assert_eq!(config.slow_call_threshold, Duration::from_secs(5));
        assert_eq!(config.admin.base_scope, "admin");
        assert!(config.policy.is_allowed("anything"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
summary_max_chars = 64
slow_call_threshold = "250ms"

[policy]
denied = ["shell"]

[admin]
tools = ["purge_cache"]
"#
        )
        .unwrap();

        let config = DispatchConfig::load_from(file.path()).unwrap();

        assert_eq!(config.summary_max_chars, 64);
        assert_eq!(config.slow_call_threshold, Duration::from_millis(250));
        assert!(!config.policy.is_allowed("shell"));
        assert!(config.policy.is_allowed("echo"));
        assert_eq!(config.admin.tools, vec!["purge_cache".to_string()]);
        // untouched fields keep their defaults
        assert_eq!(config.admin.base_scope, "admin");
        assert_eq!(config.event_buffer, 100);
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = DispatchConfig::load_from("/nonexistent/conduit.toml").unwrap_err();
        assert!(matches!(err, ConduitError::Configuration(_)));
    }

    #[test]
    fn test_zero_summary_rejected() {
        let config = DispatchConfig::default().with_summary_max_chars(0);
        assert!(config.validate().is_err());
    }
}
