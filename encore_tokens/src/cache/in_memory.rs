//! An in-memory token cache

use std::collections::HashMap;

use super::{cache_key, CacheError, TokenCache};
use crate::{scope::Scopes, IdentityRef, Token};

/// An in-memory token cache
///
/// Holds tokens for the life of the process only.
#[derive(Default, Debug)]
pub struct InMemoryTokenCache {
    tokens: HashMap<String, Token>,
}

impl InMemoryTokenCache {
    /// Constructs a new, empty in-memory token cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached tokens
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl TokenCache for InMemoryTokenCache {
    fn get(&self, identity: &IdentityRef, scopes: &Scopes) -> Result<Token, CacheError> {
        let key = cache_key(identity, scopes);
        self.tokens
            .get(&key)
            .cloned()
            .ok_or(CacheError::NotFound { key })
    }

    fn contains(&self, identity: &IdentityRef, scopes: &Scopes) -> bool {
        self.tokens.contains_key(&cache_key(identity, scopes))
    }

    fn put(&mut self, token: &Token) -> Result<(), CacheError> {
        let key = cache_key(token.identity(), token.scopes());
        tracing::trace!(%key, "storing token in memory");
        self.tokens.insert(key, token.clone());
        Ok(())
    }
}
