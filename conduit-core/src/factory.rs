//! Dispatcher factory and scoped acquisition
//!
//! The factory is the only way to obtain a [`Dispatcher`]. Every call builds a
//! fresh registry and a fresh dispatcher, so two requests never share tool
//! state. Scoped acquisition ties the dispatcher's ACTIVE window to a lexical
//! scope:
//!
//! ```rust
//! use conduit_core::prelude::*;
//! use serde_json::{Value, json};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> conduit_core::Result<()> {
//! let factory = DispatcherFactory::new(DispatchConfig::default());
//! let identity = IdentityContext::new("user-1", "conv-1", "run-1").shared();
//! let channel = Arc::new(RecordingNotifier::new());
//! let echo = FnTool::boxed(ToolMetadata::new("echo", "Echo"), |p: Parameters| async move {
//!     Ok::<_, ToolError>(Value::Object(p))
//! });
//!
//! let response = factory
//!     .scoped(identity, channel, [echo], |dispatcher| async move {
//!         let params = json!({"a": 1}).as_object().cloned().unwrap_or_default();
//!         dispatcher.dispatch("echo", params).await
//!     })
//!     .await?;
//!
//! assert!(response.success);
//! # Ok(())
//! # }
//! ```

use crate::config::DispatchConfig;
use crate::context::{IdentityContext, PersistenceHandle};
use crate::dispatcher::Dispatcher;
use crate::engine::ExecutionEngine;
use crate::error::Result;
use crate::notify::SharedChannel;
use crate::tools::{
    AdminPermission, AdminPrincipal, AdminScope, BoxedTool, PermissionCheck, ToolRegistry,
};
use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;

/// Proof that a dispatcher is being built by the factory
///
/// Only this module can create one.
#[derive(Debug)]
pub struct FactoryToken {
    _seal: (),
}

impl FactoryToken {
    fn new() -> Self {
        Self { _seal: () }
    }
}

/// Source of tools for admin dispatchers
pub trait AdminToolset: Send + Sync {
    /// Tools to register on a new admin dispatcher
    fn tools(&self, persistence: &PersistenceHandle, principal: &AdminPrincipal) -> Vec<BoxedTool>;

    /// Names among [`AdminToolset::tools`] that need the elevated scope
    fn elevated_tools(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Builds request-scoped dispatchers
#[derive(Clone)]
pub struct DispatcherFactory {
    config: DispatchConfig,
    permission: Arc<dyn PermissionCheck>,
    admin_toolset: Option<Arc<dyn AdminToolset>>,
}

impl std::fmt::Debug for DispatcherFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherFactory")
            .field("config", &self.config)
            .field("has_admin_toolset", &self.admin_toolset.is_some())
            .finish()
    }
}

impl DispatcherFactory {
    /// Create a factory whose request dispatchers use `config.policy`
    pub fn new(config: DispatchConfig) -> Self {
        let permission: Arc<dyn PermissionCheck> = Arc::new(config.policy.clone());
        Self {
            config,
            permission,
            admin_toolset: None,
        }
    }

    /// Replace the permission predicate for request dispatchers
    pub fn with_permission(mut self, permission: impl PermissionCheck + 'static) -> Self {
        self.permission = Arc::new(permission);
        self
    }

    /// Set the tool source for admin dispatchers
    pub fn with_admin_toolset(mut self, toolset: impl AdminToolset + 'static) -> Self {
        self.admin_toolset = Some(Arc::new(toolset));
        self
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// New ACTIVE dispatcher with its own registry holding `tools`
    ///
    /// # Errors
    ///
    /// Returns an error if two tools share a name.
    pub fn create_for_request(
        &self,
        identity: Arc<IdentityContext>,
        channel: SharedChannel,
        tools: impl IntoIterator<Item = BoxedTool>,
    ) -> Result<Dispatcher> {
        let registry = ToolRegistry::with_tools(tools)?;
        Ok(self.build(identity, channel, registry, Arc::clone(&self.permission), None))
    }

    /// New ACTIVE dispatcher acting for an administrator
    ///
    /// The identity is rebound to `persistence`. Every tool requires the
    /// principal to hold `admin.base_scope`; elevated tools also require
    /// `admin.elevated_scope`.
    pub fn create_for_admin(
        &self,
        identity: &IdentityContext,
        persistence: PersistenceHandle,
        principal: AdminPrincipal,
        channel: SharedChannel,
    ) -> Result<Dispatcher> {
        let (tools, elevated) = match &self.admin_toolset {
            Some(toolset) => (
                toolset.tools(&persistence, &principal),
                toolset.elevated_tools(),
            ),
            None => (Vec::new(), Vec::new()),
        };
        let registry = ToolRegistry::with_tools(tools)?;

        let admin_tools = self
            .config
            .admin
            .tools
            .iter()
            .cloned()
            .chain(elevated);
        let scope = AdminScope::new(
            principal.clone(),
            admin_tools,
            self.config.admin.elevated_scope.clone(),
        );
        let permission: Arc<dyn PermissionCheck> = Arc::new(AdminPermission::new(
            principal,
            self.config.admin.base_scope.clone(),
        ));

        let identity = identity.rebind(persistence).shared();
        Ok(self.build(identity, channel, registry, permission, Some(scope)))
    }

    /// RAII acquisition: the dispatcher deactivates when the guard drops
    pub fn acquire(
        &self,
        identity: Arc<IdentityContext>,
        channel: SharedChannel,
        tools: impl IntoIterator<Item = BoxedTool>,
    ) -> Result<ScopedDispatcher> {
        let dispatcher = self.create_for_request(identity, channel, tools)?;
        Ok(ScopedDispatcher {
            inner: Arc::new(dispatcher),
        })
    }

    /// Run `f` with a fresh dispatcher that is INACTIVE once `f` finishes
    ///
    /// The dispatcher is deactivated on every exit path: normal return, a
    /// panic unwinding out of `f`, or the returned future being dropped.
    pub async fn scoped<F, Fut, T>(
        &self,
        identity: Arc<IdentityContext>,
        channel: SharedChannel,
        tools: impl IntoIterator<Item = BoxedTool>,
        f: F,
    ) -> Result<T>
    where
        F: FnOnce(Arc<Dispatcher>) -> Fut,
        Fut: Future<Output = T>,
    {
        let scope = self.acquire(identity, channel, tools)?;
        let output = f(scope.handle()).await;
        drop(scope);
        Ok(output)
    }

    fn build(
        &self,
        identity: Arc<IdentityContext>,
        channel: SharedChannel,
        registry: ToolRegistry,
        permission: Arc<dyn PermissionCheck>,
        admin: Option<AdminScope>,
    ) -> Dispatcher {
        let engine = ExecutionEngine::with_config(channel, &self.config);
        let dispatcher = Dispatcher::new(
            FactoryToken::new(),
            identity,
            registry,
            engine,
            permission,
            admin,
        );
        dispatcher.activate();

        tracing::info!(
            dispatcher_id = %dispatcher.dispatcher_id(),
            registry_id = %dispatcher.registry_id(),
            subject_id = %dispatcher.identity().subject_id(),
            run_id = %dispatcher.identity().run_id(),
            admin = dispatcher.is_admin(),
            "Created dispatcher"
        );
        dispatcher
    }
}

/// Dispatcher bound to a scope; deactivates on drop
///
/// Clones obtained through [`ScopedDispatcher::handle`] outlive the guard but
/// reject every dispatch once it is gone.
#[derive(Debug)]
pub struct ScopedDispatcher {
    inner: Arc<Dispatcher>,
}

impl ScopedDispatcher {
    /// A shared handle to the underlying dispatcher
    pub fn handle(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.inner)
    }
}

impl Deref for ScopedDispatcher {
    type Target = Dispatcher;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Drop for ScopedDispatcher {
    fn drop(&mut self) {
        self.inner.deactivate();
    }
}
