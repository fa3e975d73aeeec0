//! Error types for Conduit operations

use crate::tools::RegistryError;

/// Result type for Conduit operations
pub type Result<T> = std::result::Result<T, ConduitError>;

/// Error types for the dispatch core
///
/// These cover construction and configuration. Failures of a single tool call
/// are reported through [`crate::tools::ToolError`] instead.
#[derive(Debug, thiserror::Error)]
pub enum ConduitError {
    /// Registry rejected a tool (duplicate name, empty name)
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_converts() {
        let err: ConduitError = RegistryError::DuplicateTool("echo".to_string()).into();
        assert!(matches!(err, ConduitError::Registry(_)));
        assert_eq!(err.to_string(), "Registry error: Tool 'echo' is already registered");
    }

    #[test]
    fn test_serialization_error_converts() {
        fn parse(raw: &str) -> Result<serde_json::Value> {
            Ok(serde_json::from_str(raw)?)
        }

        assert!(matches!(parse("{"), Err(ConduitError::Serialization(_))));
    }
}
