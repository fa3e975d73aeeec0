//! Integration tests for the tools module

use super::*;
use crate::context::IdentityContext;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

/// A simple echo tool for testing
struct EchoTool {
    metadata: ToolMetadata,
}

impl EchoTool {
    fn new() -> Self {
        Self {
            metadata: ToolMetadata::new("echo", "Echoes input back").with_tag("debug"),
        }
    }
}

#[async_trait]
impl Tool for EchoTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn invoke(&self, parameters: Parameters) -> Result<Value, ToolError> {
        Ok(Value::Object(parameters))
    }
}

/// A tool that reads a path parameter
struct FileTool {
    metadata: ToolMetadata,
}

impl FileTool {
    fn new() -> Self {
        Self {
            metadata: ToolMetadata::new("file_read", "Reads a file").with_tag("filesystem"),
        }
    }
}

#[async_trait]
impl Tool for FileTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn invoke(&self, parameters: Parameters) -> Result<Value, ToolError> {
        let path = parameters
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::execution("path is required"))?;
        Ok(json!({ "path": path, "bytes": 0 }))
    }
}

fn registry() -> ToolRegistry {
    let echo: BoxedTool = Arc::new(EchoTool::new());
    let file: BoxedTool = Arc::new(FileTool::new());
    let word_count = BlockingTool::boxed(
        ToolMetadata::new("word_count", "Counts words"),
        |p: Parameters| {
            let text = p.get("text").and_then(Value::as_str).unwrap_or_default();
            Ok(json!(text.split_whitespace().count()))
        },
    );
    ToolRegistry::with_tools([echo, file, word_count]).unwrap()
}

#[tokio::test]
async fn test_registry_resolves_and_invokes() {
    let registry = registry();

    let tool = registry.get("word_count").unwrap();
    let mut parameters = Parameters::new();
    parameters.insert("text".to_string(), json!("one two three"));

    assert_eq!(tool.invoke(parameters).await.unwrap(), json!(3));
}

#[tokio::test]
async fn test_tool_error_propagates() {
    let registry = registry();

    let err = registry
        .get("file_read")
        .unwrap()
        .invoke(Parameters::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind, ToolErrorKind::Execution);
    assert_eq!(err.to_string(), "path is required");
}

#[test]
fn test_listing_keeps_registration_order() {
    let names: Vec<String> = registry().list().into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["echo", "file_read", "word_count"]);
}

#[test]
fn test_filter_by_tag() {
    let registry = registry();
    let filesystem = registry.filter_by_tag("filesystem");

    assert_eq!(filesystem.len(), 1);
    assert_eq!(filesystem[0].name(), "file_read");
}

#[test]
fn test_policy_over_registry() {
    let registry = registry();
    let identity = IdentityContext::new("user-1", "conv-1", "run-1");
    let policy = ToolPolicy::allow_all().deny("file_read");

    let permitted: Vec<&str> = registry
        .names()
        .into_iter()
        .filter(|name| policy.check(&identity, name).is_allowed())
        .collect();

    assert_eq!(permitted, vec!["echo", "word_count"]);
}

#[test]
fn test_closure_permission_sees_identity() {
    let only_alice = |identity: &IdentityContext, _tool: &str| identity.subject_id() == "alice";

    let alice = IdentityContext::new("alice", "c", "r");
    let bob = IdentityContext::new("bob", "c", "r");

    assert!(only_alice.check(&alice, "echo").is_allowed());
    match only_alice.check(&bob, "echo") {
        PermissionDecision::Deny(reason) => assert!(reason.contains("bob")),
        PermissionDecision::Allow => panic!("bob should be denied"),
    }
}

#[test]
fn test_tool_summary_from_tool() {
    let echo = EchoTool::new();
    let summary = ToolSummary::from(&echo as &dyn Tool);

    assert_eq!(summary.name, "echo");
    assert_eq!(summary.tags, vec!["debug".to_string()]);
    assert!(summary.version.is_none());
}

#[test]
fn test_tool_error_serialization() {
    let err = ToolError::permission_denied("shell", "not allowed")
        .with_context(json!({"subject_id": "user-1"}));
    let json = serde_json::to_value(&err).unwrap();

    assert_eq!(json["kind"], "permission_denied");
    assert_eq!(json["message"], "permission denied for tool 'shell': not allowed");
    assert_eq!(json["context"]["subject_id"], "user-1");

    let back: ToolError = serde_json::from_value(json).unwrap();
    assert_eq!(back, err);
}
