//! Tool result contracts and error model
//!
//! Three shapes leave the core:
//! - [`ToolResult`] from the raising entry point, with the SUCCESS/ERROR invariant
//!   enforced by its constructors
//! - [`ToolResponse`] from the converting entry point, a flat success flag plus
//!   optional result/error that orchestration code can branch on
//! - [`ToolInput`] / [`ToolOutput`], the minimal name-plus-parameters pair

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Ordered parameter mapping passed to a tool
pub type Parameters = Map<String, Value>;

/// Metadata attached to results and responses
pub type Metadata = Map<String, Value>;

/// Outcome status of a single invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Success,
    Error,
}

/// Result of one invocation through the raising entry point
///
/// `value` is present exactly when the status is `Success`; `error` exactly when
/// it is `Error`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    status: ToolStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,

    /// Provenance for the call (invocation id, args hash, start time)
    pub metadata: Metadata,

    /// Wall-clock time spent inside the tool
    #[serde(with = "duration_millis")]
    pub execution_time: Duration,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(value: Value, execution_time: Duration) -> Self {
        Self {
            status: ToolStatus::Success,
            value: Some(value),
            error: None,
            metadata: Metadata::new(),
            execution_time,
        }
    }

    /// Create a failed result
    pub fn failure(error: impl Into<String>, execution_time: Duration) -> Self {
        Self {
            status: ToolStatus::Error,
            value: None,
            error: Some(error.into()),
            metadata: Metadata::new(),
            execution_time,
        }
    }

    /// Replace the metadata
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn status(&self) -> ToolStatus {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }

    /// The value, if successful
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// The error message, if failed
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Response from the converting entry point and from [`crate::Dispatcher::dispatch`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponse {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Classification of the failure, absent on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ToolErrorKind>,

    #[serde(default)]
    pub metadata: Metadata,
}

impl ToolResponse {
    /// Build a failure response for an error resolved before invocation
    pub fn rejected(error: ToolError) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.message),
            error_kind: Some(error.kind),
            metadata: Metadata::new(),
        }
    }

    /// Convert a finished result, copying its metadata
    pub fn from_result(result: ToolResult, kind: Option<ToolErrorKind>) -> Self {
        let mut metadata = result.metadata;
        metadata.insert(
            "execution_time_ms".to_string(),
            Value::from(result.execution_time.as_millis() as u64),
        );
        let success = result.status == ToolStatus::Success;
        Self {
            success,
            result: result.value,
            error: result.error,
            error_kind: if success { None } else { kind },
            metadata,
        }
    }

    /// Collapse into the minimal output shape
    pub fn into_output(self) -> ToolOutput {
        ToolOutput {
            success: self.success,
            output: self.result,
            error: self.error,
        }
    }
}

/// Name plus parameters, the request half of the minimal entry point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInput {
    pub tool_name: String,

    #[serde(default)]
    pub parameters: Parameters,
}

impl ToolInput {
    /// Create an input, rejecting an empty tool name
    pub fn new(tool_name: impl Into<String>, parameters: Parameters) -> Result<Self, ToolError> {
        let input = Self {
            tool_name: tool_name.into(),
            parameters,
        };
        input.validate()?;
        Ok(input)
    }

    /// Check the non-empty name invariant
    pub fn validate(&self) -> Result<(), ToolError> {
        if self.tool_name.trim().is_empty() {
            return Err(ToolError::invalid_input("tool_name must not be empty"));
        }
        Ok(())
    }
}

/// Response half of the minimal entry point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Structured tool error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    pub kind: ToolErrorKind,

    /// Human-readable error message
    pub message: String,

    /// Additional context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl ToolError {
    /// Create a new tool error
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: None,
        }
    }

    /// Add context
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    /// A failure raised by the tool itself
    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Execution, message)
    }

    pub fn not_found(tool_name: &str) -> Self {
        Self::new(
            ToolErrorKind::NotFound,
            format!("tool '{}' not found", tool_name),
        )
    }

    pub fn permission_denied(tool_name: &str, reason: impl AsRef<str>) -> Self {
        Self::new(
            ToolErrorKind::PermissionDenied,
            format!(
                "permission denied for tool '{}': {}",
                tool_name,
                reason.as_ref()
            ),
        )
    }

    pub fn inactive(dispatcher_id: impl std::fmt::Display) -> Self {
        Self::new(
            ToolErrorKind::Inactive,
            format!("dispatcher {} is inactive", dispatcher_id),
        )
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidInput, message)
    }

    pub fn cancelled() -> Self {
        Self::new(ToolErrorKind::Cancelled, "invocation cancelled")
    }

    pub fn panicked(message: impl AsRef<str>) -> Self {
        Self::new(
            ToolErrorKind::Panicked,
            format!("tool panicked: {}", message.as_ref()),
        )
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ToolError {}

impl From<anyhow::Error> for ToolError {
    fn from(err: anyhow::Error) -> Self {
        ToolError::execution(err.to_string())
    }
}

/// Error kind taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    /// No tool registered under the requested name
    NotFound,

    /// The permission predicate rejected the call
    PermissionDenied,

    /// The tool returned an error
    Execution,

    /// The dispatcher's scope has exited
    Inactive,

    /// Malformed request (empty tool name)
    InvalidInput,

    /// The awaiting caller dropped the invocation
    Cancelled,

    /// The tool panicked while running
    Panicked,
}

impl ToolErrorKind {
    /// Whether this error is decided before the tool is ever invoked
    ///
    /// Local errors produce no lifecycle events.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ToolErrorKind::NotFound
                | ToolErrorKind::PermissionDenied
                | ToolErrorKind::Inactive
                | ToolErrorKind::InvalidInput
        )
    }
}

// Serde helpers for Duration serialization as milliseconds
mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }
}

#[cfg(test)]
mod result_tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_invariant() {
        let result = ToolResult::success(json!({"k": "v"}), Duration::from_millis(3));

        assert!(result.is_success());
        assert_eq!(result.status(), ToolStatus::Success);
        assert!(result.value().is_some());
        assert!(result.error().is_none());
    }

    #[test]
    fn test_failure_invariant() {
        let result = ToolResult::failure("bad thing", Duration::ZERO);

        assert!(!result.is_success());
        assert_eq!(result.status(), ToolStatus::Error);
        assert!(result.value().is_none());
        assert_eq!(result.error(), Some("bad thing"));
    }

    #[test]
    fn test_response_copies_metadata() {
        let mut metadata = Metadata::new();
        metadata.insert("invocation_id".to_string(), json!("abc"));
        let result =
            ToolResult::success(json!(1), Duration::from_millis(42)).with_metadata(metadata);

        let response = ToolResponse::from_result(result, None);

        assert!(response.success);
        assert_eq!(response.result, Some(json!(1)));
        assert_eq!(response.metadata["invocation_id"], json!("abc"));
        assert_eq!(response.metadata["execution_time_ms"], json!(42));
        assert!(response.error_kind.is_none());
    }

    #[test]
    fn test_rejected_response() {
        let response = ToolResponse::rejected(ToolError::not_found("search"));

        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("tool 'search' not found"));
        assert_eq!(response.error_kind, Some(ToolErrorKind::NotFound));
        assert!(response.metadata.is_empty());
    }

    #[test]
    fn test_tool_input_rejects_empty_name() {
        let err = ToolInput::new("  ", Parameters::new()).unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::InvalidInput);
        assert!(ToolInput::new("echo", Parameters::new()).is_ok());
    }

    #[test]
    fn test_parameters_keep_order() {
        let input: ToolInput = serde_json::from_str(
            r#"{"tool_name": "echo", "parameters": {"z": 1, "a": 2, "m": 3}}"#,
        )
        .unwrap();

        let keys: Vec<&str> = input.parameters.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_local_error_kinds() {
        assert!(ToolErrorKind::NotFound.is_local());
        assert!(ToolErrorKind::PermissionDenied.is_local());
        assert!(ToolErrorKind::Inactive.is_local());
        assert!(!ToolErrorKind::Execution.is_local());
        assert!(!ToolErrorKind::Cancelled.is_local());
    }

    #[test]
    fn test_anyhow_errors_become_execution_failures() {
        fn read_port(raw: &str) -> Result<u16, ToolError> {
            let port = raw
                .parse::<u16>()
                .map_err(anyhow::Error::from)
                .map_err(|e| e.context("invalid port"))?;
            Ok(port)
        }

        let err = read_port("http").unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::Execution);
        assert_eq!(err.message, "invalid port");
        assert_eq!(read_port("8080"), Ok(8080));
    }

    #[test]
    fn test_result_serialization_shape() {
        let result = ToolResult::failure("boom", Duration::from_millis(7));
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "boom");
        assert_eq!(json["execution_time"], 7);
        assert!(json.get("value").is_none());
    }
}
