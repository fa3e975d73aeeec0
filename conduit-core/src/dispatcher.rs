//! Request-scoped dispatcher
//!
//! A [`Dispatcher`] binds one identity context to one registry and one
//! execution engine. It is created ACTIVE by [`DispatcherFactory`] and turns
//! INACTIVE when its scope exits; after that every dispatch is rejected.
//!
//! Dispatchers cannot be built outside the factory. The constructor requires a
//! [`FactoryToken`], which has a private field:
//!
//! ```compile_fail
//! use conduit_core::FactoryToken;
//!
//! let token = FactoryToken { _seal: () };
//! ```
//!
//! Outside code cannot call the factory's private token constructor either:
//!
//! ```compile_fail
//! use conduit_core::FactoryToken;
//!
//! let token = FactoryToken::new();
//! ```
//!
//! The dispatcher's own fields are private as well, so even a literal that
//! names every field with a well-typed value is rejected:
//!
//! ```compile_fail
//! use conduit_core::notify::TracingNotifier;
//! use conduit_core::tools::{PermissionCheck, ToolPolicy, ToolRegistry};
//! use conduit_core::{Dispatcher, ExecutionEngine, IdentityContext};
//! use std::sync::Arc;
//! use std::sync::atomic::AtomicU8;
//!
//! let registry = ToolRegistry::new();
//! let permission: Arc<dyn PermissionCheck> = Arc::new(ToolPolicy::allow_all());
//! let dispatcher = Dispatcher {
//!     id: uuid::Uuid::new_v4(),
//!     identity: Arc::new(IdentityContext::new("u", "c", "r")),
//!     registry_id: registry.id(),
//!     registry: tokio::sync::RwLock::new(registry),
//!     engine: ExecutionEngine::new(Arc::new(TracingNotifier)),
//!     permission,
//!     admin: None,
//!     state: AtomicU8::new(1),
//! };
//! ```
//!
//! [`DispatcherFactory`]: crate::DispatcherFactory

use crate::context::IdentityContext;
use crate::engine::ExecutionEngine;
use crate::factory::FactoryToken;
use crate::tools::{
    AdminScope, BoxedTool, Parameters, PermissionCheck, PermissionDecision, RegistryError,
    ToolError, ToolInput, ToolOutput, ToolRegistry, ToolResponse, ToolSummary,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Lifecycle state of a dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DispatcherState {
    /// Built but not yet handed out by the factory
    Constructed = 0,
    /// Accepting dispatches
    Active = 1,
    /// Scope exited; terminal
    Inactive = 2,
}

impl DispatcherState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => DispatcherState::Constructed,
            1 => DispatcherState::Active,
            _ => DispatcherState::Inactive,
        }
    }
}

impl std::fmt::Display for DispatcherState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatcherState::Constructed => write!(f, "constructed"),
            DispatcherState::Active => write!(f, "active"),
            DispatcherState::Inactive => write!(f, "inactive"),
        }
    }
}

/// Request-scoped tool dispatcher
pub struct Dispatcher {
    id: Uuid,
    identity: Arc<IdentityContext>,
    registry: RwLock<ToolRegistry>,
    registry_id: Uuid,
    engine: ExecutionEngine,
    permission: Arc<dyn PermissionCheck>,
    admin: Option<AdminScope>,
    state: AtomicU8,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("id", &self.id)
            .field("subject_id", &self.identity.subject_id())
            .field("run_id", &self.identity.run_id())
            .field("registry_id", &self.registry_id)
            .field("state", &self.state())
            .field("is_admin", &self.is_admin())
            .finish()
    }
}

impl Dispatcher {
    /// Build a dispatcher in the CONSTRUCTED state
    pub fn new(
        _token: FactoryToken,
        identity: Arc<IdentityContext>,
        registry: ToolRegistry,
        engine: ExecutionEngine,
        permission: Arc<dyn PermissionCheck>,
        admin: Option<AdminScope>,
    ) -> Self {
        let registry_id = registry.id();
        Self {
            id: Uuid::new_v4(),
            identity,
            registry: RwLock::new(registry),
            registry_id,
            engine,
            permission,
            admin,
            state: AtomicU8::new(DispatcherState::Constructed as u8),
        }
    }

    /// CONSTRUCTED -> ACTIVE; no effect in any other state
    pub(crate) fn activate(&self) -> bool {
        self.state
            .compare_exchange(
                DispatcherState::Constructed as u8,
                DispatcherState::Active as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Move to INACTIVE. Irreversible.
    ///
    /// Returns `true` if this call performed the transition.
    pub fn deactivate(&self) -> bool {
        let previous = DispatcherState::from_u8(
            self.state
                .swap(DispatcherState::Inactive as u8, Ordering::AcqRel),
        );
        let changed = previous != DispatcherState::Inactive;
        if changed {
            tracing::debug!(
                dispatcher_id = %self.id,
                run_id = %self.identity.run_id(),
                "Dispatcher deactivated"
            );
        }
        changed
    }

    pub fn state(&self) -> DispatcherState {
        DispatcherState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_active(&self) -> bool {
        self.state() == DispatcherState::Active
    }

    pub fn dispatcher_id(&self) -> Uuid {
        self.id
    }

    /// Id of the registry owned by this dispatcher
    pub fn registry_id(&self) -> Uuid {
        self.registry_id
    }

    pub fn identity(&self) -> &Arc<IdentityContext> {
        &self.identity
    }

    /// Whether this dispatcher was created for an admin principal
    pub fn is_admin(&self) -> bool {
        self.admin.is_some()
    }

    /// Elevated admin scope, if any
    pub fn admin_scope(&self) -> Option<&AdminScope> {
        self.admin.as_ref()
    }

    /// Add a tool to this dispatcher's registry
    pub async fn register(&self, tool: BoxedTool) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        self.registry.write().await.register(tool)?;
        tracing::debug!(dispatcher_id = %self.id, tool = %name, "Registered tool");
        Ok(())
    }

    /// Whether a tool with this name is registered
    pub async fn has(&self, tool_name: &str) -> bool {
        self.registry.read().await.contains(tool_name)
    }

    /// Registered tools in insertion order
    pub async fn list_available(&self) -> Vec<ToolSummary> {
        self.registry.read().await.list()
    }

    /// Resolve, authorize and run one tool
    ///
    /// Errors decided before invocation (inactive, empty name, not found,
    /// permission) come back as error responses and emit no events.
    pub async fn dispatch(&self, tool_name: &str, parameters: Parameters) -> ToolResponse {
        match self.resolve(tool_name).await {
            Ok(tool) => {
                self.engine
                    .execute_converting(tool.as_ref(), tool_name, parameters, &self.identity)
                    .await
            }
            Err(error) => {
                tracing::debug!(
                    dispatcher_id = %self.id,
                    tool = %tool_name,
                    kind = ?error.kind,
                    error = %error.message,
                    "Dispatch rejected"
                );
                ToolResponse::rejected(error)
            }
        }
    }

    /// Minimal entry point: name plus parameters in, flat output back
    pub async fn call(&self, input: ToolInput) -> ToolOutput {
        self.dispatch(&input.tool_name, input.parameters)
            .await
            .into_output()
    }

    async fn resolve(&self, tool_name: &str) -> Result<BoxedTool, ToolError> {
        if !self.is_active() {
            return Err(ToolError::inactive(self.id));
        }
        if tool_name.trim().is_empty() {
            return Err(ToolError::invalid_input("tool_name must not be empty"));
        }

        // clone the tool out so the lock is not held across the invocation
        let tool = self
            .registry
            .read()
            .await
            .get(tool_name)
            .cloned()
            .ok_or_else(|| ToolError::not_found(tool_name))?;

        if let PermissionDecision::Deny(reason) = self.permission.check(&self.identity, tool_name) {
            return Err(ToolError::permission_denied(tool_name, reason));
        }
        if let Some(admin) = &self.admin {
            if let PermissionDecision::Deny(reason) = admin.authorize(tool_name) {
                return Err(ToolError::permission_denied(tool_name, reason));
            }
        }

        Ok(tool)
    }
}
