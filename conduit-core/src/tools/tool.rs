//! Tool trait and adapters
//!
//! A tool is a named unit of work with one asynchronous `invoke` operation.
//! Closures can be registered directly through [`FnTool`], and synchronous
//! implementations through [`BlockingTool`], which moves the call onto tokio's
//! blocking pool.

use super::result::{Parameters, ToolError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::future::Future;
use std::sync::Arc;

/// Tool metadata for listing and discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolMetadata {
    /// Tool name (unique within a registry)
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// Tags for categorization
    pub tags: Vec<String>,

    /// Tool version
    pub version: Option<String>,
}

impl ToolMetadata {
    /// Create new metadata with required fields
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            tags: Vec::new(),
            version: None,
        }
    }

    /// Add a tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Set version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// Core tool trait
///
/// Implementations report failure by returning `Err`. A panic inside `invoke`
/// is also caught by the engine and reported as a failed invocation.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get tool metadata
    fn metadata(&self) -> &ToolMetadata;

    /// Get tool name (convenience method)
    fn name(&self) -> &str {
        &self.metadata().name
    }

    /// Get tool description (convenience method)
    fn description(&self) -> &str {
        &self.metadata().description
    }

    /// Run the tool
    async fn invoke(&self, parameters: Parameters) -> Result<Value, ToolError>;
}

/// Type alias for shared tools
pub type BoxedTool = Arc<dyn Tool>;

/// Tool backed by an async closure
pub struct FnTool<F> {
    metadata: ToolMetadata,
    handler: F,
}

impl<F, Fut> FnTool<F>
where
    F: Fn(Parameters) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
{
    /// Create a new closure tool
    pub fn new(metadata: ToolMetadata, handler: F) -> Self {
        Self { metadata, handler }
    }

    /// Create and box in one step
    pub fn boxed(metadata: ToolMetadata, handler: F) -> BoxedTool {
        Arc::new(Self::new(metadata, handler))
    }
}

#[async_trait]
impl<F, Fut> Tool for FnTool<F>
where
    F: Fn(Parameters) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
{
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn invoke(&self, parameters: Parameters) -> Result<Value, ToolError> {
        (self.handler)(parameters).await
    }
}

/// Adapter for synchronous-only tool implementations
pub struct BlockingTool<F> {
    metadata: ToolMetadata,
    handler: Arc<F>,
}

impl<F> BlockingTool<F>
where
    F: Fn(Parameters) -> Result<Value, ToolError> + Send + Sync + 'static,
{
    /// Wrap a synchronous handler
    pub fn new(metadata: ToolMetadata, handler: F) -> Self {
        Self {
            metadata,
            handler: Arc::new(handler),
        }
    }

    /// Create and box in one step
    pub fn boxed(metadata: ToolMetadata, handler: F) -> BoxedTool {
        Arc::new(Self::new(metadata, handler))
    }
}

#[async_trait]
impl<F> Tool for BlockingTool<F>
where
    F: Fn(Parameters) -> Result<Value, ToolError> + Send + Sync + 'static,
{
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn invoke(&self, parameters: Parameters) -> Result<Value, ToolError> {
        let handler = Arc::clone(&self.handler);
        match tokio::task::spawn_blocking(move || handler(parameters)).await {
            Ok(result) => result,
            Err(join_error) if join_error.is_panic() => {
                Err(ToolError::panicked(panic_message(&*join_error.into_panic())))
            }
            Err(_) => Err(ToolError::cancelled()),
        }
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
