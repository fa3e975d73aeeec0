//! Tool abstractions shared by the engine and dispatcher
//!
//! This module provides:
//! - The [`Tool`] trait plus closure and blocking adapters
//! - An insertion-ordered [`ToolRegistry`]
//! - Permission predicates ([`ToolPolicy`], admin scopes)
//! - Result contracts ([`ToolResult`], [`ToolResponse`], [`ToolInput`]/[`ToolOutput`])
//!
//! # Example
//!
//! ```rust
//! use conduit_core::tools::{FnTool, Parameters, ToolError, ToolMetadata, ToolRegistry};
//! use serde_json::Value;
//!
//! let echo = FnTool::boxed(
//!     ToolMetadata::new("echo", "Echo parameters"),
//!     |p: Parameters| async move { Ok::<_, ToolError>(Value::Object(p)) },
//! );
//!
//! let registry = ToolRegistry::with_tools([echo]).unwrap();
//! assert!(registry.contains("echo"));
//! ```

mod policy;
mod registry;
mod result;
mod tool;

pub use policy::{
    AdminPermission, AdminPrincipal, AdminScope, PermissionCheck, PermissionDecision, ToolPolicy,
};
pub use registry::{RegistryError, ToolRegistry, ToolSummary};
pub use result::{
    Metadata, Parameters, ToolError, ToolErrorKind, ToolInput, ToolOutput, ToolResponse,
    ToolResult, ToolStatus,
};
pub use tool::{BlockingTool, BoxedTool, FnTool, Tool, ToolMetadata};

pub(crate) use tool::panic_message;

#[cfg(test)]
mod tests;
