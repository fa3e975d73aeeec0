//! Tool Registry for registration and lookup
//!
//! The `ToolRegistry` provides:
//! - Tool registration with duplicate detection
//! - Lookup by name
//! - Listing in registration order
//!
//! Each dispatcher owns exactly one registry. Registries are never shared, so
//! every instance carries its own id for isolation checks.
//!
//! # Example
//!
//! ```rust,ignore
//! use conduit_core::tools::ToolRegistry;
//!
//! let mut registry = ToolRegistry::new();
//! registry.register(Arc::new(SearchTool::new()))?;
//! registry.register(Arc::new(BrowseTool::new()))?;
//!
//! let tool = registry.get("search").unwrap();
//! let names = registry.names(); // ["search", "browse"]
//! ```

use super::tool::Tool;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Tool with this name already exists
    #[error("Tool '{0}' is already registered")]
    DuplicateTool(String),

    /// Tool name is empty
    #[error("Tool name must not be empty")]
    EmptyName,
}

/// Summary of a tool for listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSummary {
    /// Tool name
    pub name: String,
    /// Tool description
    pub description: String,
    /// Tags for categorization
    pub tags: Vec<String>,
    /// Version if available
    pub version: Option<String>,
}

impl From<&dyn Tool> for ToolSummary {
    fn from(tool: &dyn Tool) -> Self {
        let metadata = tool.metadata();
        Self {
            name: metadata.name.clone(),
            description: metadata.description.clone(),
            tags: metadata.tags.clone(),
            version: metadata.version.clone(),
        }
    }
}

/// Insertion-ordered map from tool name to tool
pub struct ToolRegistry {
    id: Uuid,
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("id", &self.id)
            .field("tools", &self.order)
            .finish()
    }
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Create a registry populated with `tools`
    ///
    /// Fails on the first duplicate name.
    pub fn with_tools(
        tools: impl IntoIterator<Item = Arc<dyn Tool>>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.register_all(tools)?;
        Ok(registry)
    }

    /// Unique id of this registry instance
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Register a tool
    ///
    /// Returns an error if a tool with the same name is already registered.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.tools.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }
        self.order.push(name.clone());
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Register multiple tools at once
    pub fn register_all(
        &mut self,
        tools: impl IntoIterator<Item = Arc<dyn Tool>>,
    ) -> Result<(), RegistryError> {
        for tool in tools {
            self.register(tool)?;
        }
        Ok(())
    }

    /// Unregister a tool by name
    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn Tool>> {
        let removed = self.tools.remove(name)?;
        self.order.retain(|n| n != name);
        Some(removed)
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Check if a tool is registered
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Summaries of all tools in registration order
    pub fn list(&self) -> Vec<ToolSummary> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| ToolSummary::from(tool.as_ref()))
            .collect()
    }

    /// Tools carrying `tag`, in registration order
    pub fn filter_by_tag(&self, tag: &str) -> Vec<&Arc<dyn Tool>> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .filter(|tool| tool.metadata().tags.iter().any(|t| t == tag))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{Parameters, ToolError, ToolMetadata};
    use async_trait::async_trait;
    use serde_json::Value;

    struct NamedTool {
        metadata: ToolMetadata,
    }

    impl NamedTool {
        fn arc(name: &str, tag: &str) -> Arc<dyn Tool> {
            Arc::new(Self {
                metadata: ToolMetadata::new(name, format!("The {} tool", name)).with_tag(tag),
            })
        }
    }

    #[async_trait]
    impl Tool for NamedTool {
        fn metadata(&self) -> &ToolMetadata {
            &self.metadata
        }

        async fn invoke(&self, parameters: Parameters) -> Result<Value, ToolError> {
            Ok(Value::Object(parameters))
        }
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = ToolRegistry::new();

        assert!(registry.register(NamedTool::arc("search", "web")).is_ok());
        assert!(registry.contains("search"));
        assert!(registry.get("search").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = ToolRegistry::new();

        assert!(registry.register(NamedTool::arc("search", "web")).is_ok());
        assert_eq!(
            registry.register(NamedTool::arc("search", "web")),
            Err(RegistryError::DuplicateTool("search".to_string()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut registry = ToolRegistry::new();
        assert_eq!(
            registry.register(NamedTool::arc("", "none")),
            Err(RegistryError::EmptyName)
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_insertion_order() {
        let registry = ToolRegistry::with_tools([
            NamedTool::arc("zeta", "a"),
            NamedTool::arc("alpha", "b"),
            NamedTool::arc("mid", "a"),
        ])
        .unwrap();

        assert_eq!(registry.names(), vec!["zeta", "alpha", "mid"]);
        let listed: Vec<String> = registry.list().into_iter().map(|s| s.name).collect();
        assert_eq!(listed, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_unregister_keeps_order() {
        let mut registry = ToolRegistry::with_tools([
            NamedTool::arc("one", "x"),
            NamedTool::arc("two", "x"),
            NamedTool::arc("three", "x"),
        ])
        .unwrap();

        assert!(registry.unregister("two").is_some());
        assert!(registry.unregister("two").is_none());
        assert_eq!(registry.names(), vec!["one", "three"]);
    }

    #[test]
    fn test_filter_by_tag() {
        let registry = ToolRegistry::with_tools([
            NamedTool::arc("search", "web"),
            NamedTool::arc("calc", "math"),
            NamedTool::arc("browse", "web"),
        ])
        .unwrap();

        let names: Vec<&str> = registry
            .filter_by_tag("web")
            .into_iter()
            .map(|t| t.name())
            .collect();
        assert_eq!(names, vec!["search", "browse"]);
    }

    #[test]
    fn test_registries_have_distinct_ids() {
        assert_ne!(ToolRegistry::new().id(), ToolRegistry::new().id());
    }
}
