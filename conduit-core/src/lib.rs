//! # Conduit - Request-Scoped Tool Dispatch
//!
//! Conduit resolves named tools, checks permissions, executes them, and reports
//! the lifecycle of every invocation to a notification channel:
//! - Request-scoped dispatchers, each owning its own tool registry
//! - A factory that is the only way to build a dispatcher
//! - Scoped acquisition that deactivates a dispatcher on every exit path
//! - Paired EXECUTING/COMPLETED events for every attempted invocation
//! - Admin dispatchers with base and elevated scopes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use conduit_core::prelude::*;
//! use serde_json::Value;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let factory = DispatcherFactory::new(DispatchConfig::load()?);
//!     let identity = IdentityContext::new("user-1", "conv-1", "run-1").shared();
//!     let echo = FnTool::boxed(ToolMetadata::new("echo", "Echo"), |p: Parameters| async move {
//!         Ok::<_, ToolError>(Value::Object(p))
//!     });
//!
//!     let dispatcher = factory.acquire(identity, Arc::new(TracingNotifier), [echo])?;
//!     let response = dispatcher.dispatch("echo", Parameters::new()).await;
//!     println!("{}", serde_json::to_string(&response)?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod context;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod factory;
pub mod notify;
pub mod tools;

pub use config::{AdminConfig, DispatchConfig};
pub use context::{IdentityContext, PersistenceHandle};
pub use dispatcher::{Dispatcher, DispatcherState};
pub use engine::ExecutionEngine;
pub use error::{ConduitError, Result};
pub use factory::{AdminToolset, DispatcherFactory, FactoryToken, ScopedDispatcher};

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{AdminConfig, DispatchConfig};
    pub use crate::context::{IdentityContext, PersistenceHandle};
    pub use crate::dispatcher::{Dispatcher, DispatcherState};
    pub use crate::engine::ExecutionEngine;
    pub use crate::error::{ConduitError, Result};
    pub use crate::factory::{AdminToolset, DispatcherFactory, ScopedDispatcher};
    pub use crate::notify::{
        ChannelNotifier, CompletionOutcome, EventKind, NotificationChannel, NotificationEvent,
        NotifyError, RecordingNotifier, SharedChannel, TracingNotifier, event_channel,
    };
    pub use crate::tools::{
        AdminPrincipal, BlockingTool, BoxedTool, FnTool, Parameters, PermissionCheck,
        PermissionDecision, Tool, ToolError, ToolErrorKind, ToolInput, ToolMetadata, ToolOutput,
        ToolPolicy, ToolResponse, ToolResult, ToolStatus, ToolSummary,
    };
}
