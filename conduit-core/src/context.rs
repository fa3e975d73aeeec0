//! Per-request identity
//!
//! An [`IdentityContext`] is built once by the caller for each inbound request
//! and shared with the dispatcher behind an `Arc`. Nothing in this crate mutates
//! it, and the persistence handle it carries is passed through untouched.

use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

/// Opaque, non-owning reference to the caller's persistence layer
///
/// The handle holds a `Weak` pointer so a dispatcher never keeps a database
/// session alive past the request that created it. Only external collaborators
/// (such as an admin toolset) ever look inside it.
#[derive(Clone, Default)]
pub struct PersistenceHandle {
    inner: Option<Weak<dyn Any + Send + Sync>>,
}

impl PersistenceHandle {
    /// Create a handle pointing at `target` without taking ownership
    pub fn new<T: Any + Send + Sync>(target: &Arc<T>) -> Self {
        let erased: Arc<dyn Any + Send + Sync> = target.clone();
        Self {
            inner: Some(Arc::downgrade(&erased)),
        }
    }

    /// A handle that refers to nothing
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether a target was ever attached
    pub fn is_attached(&self) -> bool {
        self.inner.is_some()
    }

    /// Whether the target is still alive
    pub fn is_alive(&self) -> bool {
        self.inner
            .as_ref()
            .map(|weak| weak.strong_count() > 0)
            .unwrap_or(false)
    }

    /// Recover the concrete target, if it is still alive and of type `T`
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.inner
            .as_ref()
            .and_then(Weak::upgrade)
            .and_then(|strong| strong.downcast::<T>().ok())
    }
}

impl fmt::Debug for PersistenceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistenceHandle")
            .field("attached", &self.is_attached())
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Immutable identity bundle for one request
#[derive(Debug, Clone, Serialize)]
pub struct IdentityContext {
    subject_id: String,
    conversation_id: String,
    run_id: String,
    #[serde(skip)]
    persistence: PersistenceHandle,
}

impl IdentityContext {
    /// Create a context with no persistence handle attached
    pub fn new(
        subject_id: impl Into<String>,
        conversation_id: impl Into<String>,
        run_id: impl Into<String>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            conversation_id: conversation_id.into(),
            run_id: run_id.into(),
            persistence: PersistenceHandle::none(),
        }
    }

    /// Attach a persistence handle
    pub fn with_persistence(mut self, handle: PersistenceHandle) -> Self {
        self.persistence = handle;
        self
    }

    /// A new context with the same ids bound to a different persistence handle
    pub fn rebind(&self, handle: PersistenceHandle) -> Self {
        Self {
            subject_id: self.subject_id.clone(),
            conversation_id: self.conversation_id.clone(),
            run_id: self.run_id.clone(),
            persistence: handle,
        }
    }

    /// The user (or service principal) the request acts for
    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// The opaque persistence handle
    pub fn persistence(&self) -> &PersistenceHandle {
        &self.persistence
    }

    /// Wrap in an `Arc` for sharing with a dispatcher
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeStore {
        name: &'static str,
    }

    #[test]
    fn test_handle_does_not_own_target() {
        let store = Arc::new(FakeStore { name: "primary" });
        let handle = PersistenceHandle::new(&store);

        assert!(handle.is_attached());
        assert!(handle.is_alive());
        assert_eq!(handle.downcast::<FakeStore>().unwrap().name, "primary");

        drop(store);
        assert!(handle.is_attached());
        assert!(!handle.is_alive());
        assert!(handle.downcast::<FakeStore>().is_none());
    }

    #[test]
    fn test_downcast_wrong_type() {
        let store = Arc::new(FakeStore { name: "primary" });
        let handle = PersistenceHandle::new(&store);
        assert!(handle.downcast::<String>().is_none());
    }

    #[test]
    fn test_rebind_keeps_ids() {
        let store = Arc::new(FakeStore { name: "admin" });
        let ctx = IdentityContext::new("user-1", "conv-1", "run-1");
        let rebound = ctx.rebind(PersistenceHandle::new(&store));

        assert_eq!(rebound.subject_id(), "user-1");
        assert_eq!(rebound.conversation_id(), "conv-1");
        assert_eq!(rebound.run_id(), "run-1");
        assert!(!ctx.persistence().is_attached());
        assert!(rebound.persistence().is_alive());
    }

    #[test]
    fn test_serialization_skips_handle() {
        let ctx = IdentityContext::new("u", "c", "r");
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"subject_id": "u", "conversation_id": "c", "run_id": "r"})
        );
    }
}
