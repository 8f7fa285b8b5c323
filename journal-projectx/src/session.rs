//! Shared session token handle
//!
//! The gateway issues an opaque bearer token on login that every
//! authenticated call carries. The token is process-wide mutable state with
//! a single writer (the refresher): replacement is atomic and readers take a
//! snapshot, so a sync in flight with a stale token simply fails that one
//! window and succeeds on the next trigger.

use parking_lot::RwLock;
use std::sync::Arc;

/// Cloneable handle to the current session token
#[derive(Clone, Default)]
pub struct Session {
    token: Arc<RwLock<Option<String>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-blocking snapshot of the latest token, if any
    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    /// Atomically replace the current token
    pub fn replace(&self, token: String) {
        *self.token.write() = Some(token);
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_and_snapshot() {
        let session = Session::new();
        assert!(!session.is_authenticated());
        assert_eq!(session.token(), None);

        session.replace("tok-1".to_string());
        assert!(session.is_authenticated());
        assert_eq!(session.token().as_deref(), Some("tok-1"));

        // Clones share the same underlying token
        let other = session.clone();
        other.replace("tok-2".to_string());
        assert_eq!(session.token().as_deref(), Some("tok-2"));
    }
}
