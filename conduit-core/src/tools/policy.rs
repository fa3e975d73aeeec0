//! Permission checks for tool dispatch
//!
//! Every dispatcher carries one [`PermissionCheck`], consulted after a tool is
//! resolved and before it is invoked. [`ToolPolicy`] is the configurable
//! allow/deny implementation; any `Fn(&IdentityContext, &str) -> bool` closure
//! works as well.

use crate::context::IdentityContext;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Outcome of a permission check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionDecision {
    Allow,
    Deny(String),
}

impl PermissionDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, PermissionDecision::Allow)
    }
}

/// Predicate over identity and tool name
pub trait PermissionCheck: Send + Sync {
    fn check(&self, identity: &IdentityContext, tool_name: &str) -> PermissionDecision;
}

impl<F> PermissionCheck for F
where
    F: Fn(&IdentityContext, &str) -> bool + Send + Sync,
{
    fn check(&self, identity: &IdentityContext, tool_name: &str) -> PermissionDecision {
        if self(identity, tool_name) {
            PermissionDecision::Allow
        } else {
            PermissionDecision::Deny(format!(
                "subject '{}' is not permitted to call this tool",
                identity.subject_id()
            ))
        }
    }
}

/// Tool-name policy with deny precedence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolPolicy {
    /// Explicitly allowed tool names
    #[serde(default)]
    allowed: BTreeSet<String>,

    /// Explicitly denied tool names (takes precedence over allowed)
    #[serde(default)]
    denied: BTreeSet<String>,

    /// If true, allow tools not explicitly mentioned
    #[serde(default = "default_allow")]
    default_allow: bool,
}

fn default_allow() -> bool {
    true
}

impl Default for ToolPolicy {
    fn default() -> Self {
        Self::allow_all()
    }
}

impl ToolPolicy {
    /// Allow every tool unless explicitly denied
    pub fn allow_all() -> Self {
        Self {
            allowed: BTreeSet::new(),
            denied: BTreeSet::new(),
            default_allow: true,
        }
    }

    /// Deny every tool unless explicitly allowed
    pub fn deny_all() -> Self {
        Self {
            allowed: BTreeSet::new(),
            denied: BTreeSet::new(),
            default_allow: false,
        }
    }

    /// Allow a specific tool
    pub fn allow(mut self, tool_name: impl Into<String>) -> Self {
        let name = tool_name.into();
        self.denied.remove(&name);
        self.allowed.insert(name);
        self
    }

    /// Deny a specific tool
    pub fn deny(mut self, tool_name: impl Into<String>) -> Self {
        let name = tool_name.into();
        self.allowed.remove(&name);
        self.denied.insert(name);
        self
    }

    /// Allow multiple tools
    pub fn allow_many<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names.into_iter().fold(self, |policy, name| policy.allow(name))
    }

    /// Deny multiple tools
    pub fn deny_many<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names.into_iter().fold(self, |policy, name| policy.deny(name))
    }

    /// Check if a tool is allowed by this policy
    pub fn is_allowed(&self, tool_name: &str) -> bool {
        if self.denied.contains(tool_name) {
            return false;
        }
        if self.allowed.contains(tool_name) {
            return true;
        }
        self.default_allow
    }
}

impl PermissionCheck for ToolPolicy {
    fn check(&self, _identity: &IdentityContext, tool_name: &str) -> PermissionDecision {
        if self.is_allowed(tool_name) {
            PermissionDecision::Allow
        } else {
            PermissionDecision::Deny("tool is not allowed by policy".to_string())
        }
    }
}

/// The administrator a privileged dispatcher acts for
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminPrincipal {
    pub principal_id: String,

    #[serde(default)]
    pub scopes: BTreeSet<String>,
}

impl AdminPrincipal {
    pub fn new(principal_id: impl Into<String>) -> Self {
        Self {
            principal_id: principal_id.into(),
            scopes: BTreeSet::new(),
        }
    }

    /// Grant a scope
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes.insert(scope.into());
        self
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }
}

/// Permission predicate used in place of the default one on admin dispatchers
///
/// Any tool requires the principal to hold `required_scope`.
#[derive(Debug, Clone)]
pub struct AdminPermission {
    principal: AdminPrincipal,
    required_scope: String,
}

impl AdminPermission {
    pub fn new(principal: AdminPrincipal, required_scope: impl Into<String>) -> Self {
        Self {
            principal,
            required_scope: required_scope.into(),
        }
    }
}

impl PermissionCheck for AdminPermission {
    fn check(&self, _identity: &IdentityContext, _tool_name: &str) -> PermissionDecision {
        if self.principal.has_scope(&self.required_scope) {
            PermissionDecision::Allow
        } else {
            PermissionDecision::Deny(format!(
                "principal '{}' lacks scope '{}'",
                self.principal.principal_id, self.required_scope
            ))
        }
    }
}

/// Elevated tool set of an admin dispatcher
///
/// Tools in `tools` need `elevated_scope` on top of whatever the dispatcher's
/// permission predicate already demands.
#[derive(Debug, Clone)]
pub struct AdminScope {
    principal: AdminPrincipal,
    tools: BTreeSet<String>,
    elevated_scope: String,
}

impl AdminScope {
    pub fn new(
        principal: AdminPrincipal,
        tools: impl IntoIterator<Item = String>,
        elevated_scope: impl Into<String>,
    ) -> Self {
        Self {
            principal,
            tools: tools.into_iter().collect(),
            elevated_scope: elevated_scope.into(),
        }
    }

    pub fn principal(&self) -> &AdminPrincipal {
        &self.principal
    }

    /// Whether `tool_name` is one of the elevated tools
    pub fn is_admin_tool(&self, tool_name: &str) -> bool {
        self.tools.contains(tool_name)
    }

    /// Names of the elevated tools
    pub fn tools(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(String::as_str)
    }

    /// Check the elevated scope for `tool_name`
    pub fn authorize(&self, tool_name: &str) -> PermissionDecision {
        if !self.is_admin_tool(tool_name) || self.principal.has_scope(&self.elevated_scope) {
            PermissionDecision::Allow
        } else {
            PermissionDecision::Deny(format!(
                "admin tool requires scope '{}'",
                self.elevated_scope
            ))
        }
    }
}

#[cfg(test)]
mod policy_tests {
    use super::*;

    fn identity() -> IdentityContext {
        IdentityContext::new("user-1", "conv-1", "run-1")
    }

    #[test]
    fn test_allow_all_default() {
        let policy = ToolPolicy::default();
        assert!(policy.is_allowed("anything"));
        assert!(policy.check(&identity(), "anything").is_allowed());
    }

    #[test]
    fn test_deny_all() {
        let policy = ToolPolicy::deny_all().allow("echo");

        assert!(policy.is_allowed("echo"));
        assert!(!policy.is_allowed("delete_user"));
        assert!(matches!(
            policy.check(&identity(), "delete_user"),
            PermissionDecision::Deny(_)
        ));
    }

    #[test]
    fn test_deny_takes_precedence() {
        let policy = ToolPolicy::allow_all().allow_many(["a", "b"]).deny("b");

        assert!(policy.is_allowed("a"));
        assert!(!policy.is_allowed("b"));
    }

    #[test]
    fn test_closure_predicate() {
        let only_alice = |identity: &IdentityContext, _tool: &str| identity.subject_id() == "alice";

        let alice = IdentityContext::new("alice", "c", "r");
        assert!(only_alice.check(&alice, "echo").is_allowed());
        assert!(!only_alice.check(&identity(), "echo").is_allowed());
    }

    #[test]
    fn test_policy_deserializes_with_defaults() {
        let policy: ToolPolicy = serde_json::from_str(r#"{"denied": ["shell"]}"#).unwrap();
        assert!(policy.is_allowed("echo"));
        assert!(!policy.is_allowed("shell"));
    }

    #[test]
    fn test_admin_permission() {
        let admin = AdminPrincipal::new("root").with_scope("admin");
        let guest = AdminPrincipal::new("guest");

        assert!(AdminPermission::new(admin, "admin").check(&identity(), "x").is_allowed());
        assert!(!AdminPermission::new(guest, "admin").check(&identity(), "x").is_allowed());
    }

    #[test]
    fn test_admin_scope_elevated_tools() {
        let principal = AdminPrincipal::new("ops").with_scope("admin");
        let scope = AdminScope::new(principal, ["purge_cache".to_string()], "admin:elevated");

        assert!(scope.is_admin_tool("purge_cache"));
        assert!(scope.authorize("list_users").is_allowed());
        assert!(!scope.authorize("purge_cache").is_allowed());

        let elevated = AdminPrincipal::new("ops")
            .with_scope("admin")
            .with_scope("admin:elevated");
        let scope = AdminScope::new(elevated, ["purge_cache".to_string()], "admin:elevated");
        assert!(scope.authorize("purge_cache").is_allowed());
    }
}
