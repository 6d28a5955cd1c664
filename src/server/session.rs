use std::collections::HashSet;
use uuid::Uuid;

/// In-memory set of issued login tokens. Tokens live until revoked or the
/// process exits.
#[derive(Debug, Default)]
pub struct SessionStore {
    tokens: HashSet<String>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.tokens.insert(token.clone());
        token
    }

    pub fn is_valid(&self, token: &str) -> bool {
        !token.is_empty() && self.tokens.contains(token)
    }

    pub fn revoke(&mut self, token: &str) -> bool {
        self.tokens.remove(token)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_are_unique_and_revocable() {
        let mut store = SessionStore::new();
        let a = store.issue();
        let b = store.issue();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(store.is_valid(&a));
        assert!(store.revoke(&a));
        assert!(!store.is_valid(&a));
        assert!(!store.revoke(&a));
        assert!(store.is_valid(&b));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn empty_and_unknown_tokens_are_rejected() {
        let store = SessionStore::new();
        assert!(!store.is_valid(""));
        assert!(!store.is_valid("guess"));
    }
}
