use std::sync::Arc;

use anyhow::Result;

use super::KeyValueStore;

const TOKEN_KEY: &str = "v-token";

/// Holds the anonymous bearer token. There is no expiry tracking; an absent
/// token is the only signal that a new one has to be fetched.
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn get(&self) -> Result<Option<String>> {
        Ok(self
            .backend
            .get(TOKEN_KEY)?
            .filter(|token| !token.trim().is_empty()))
    }

    pub fn set(&self, token: &str) -> Result<()> {
        self.backend.set(TOKEN_KEY, token)
    }

    pub fn clear(&self) -> Result<()> {
        self.backend.remove(TOKEN_KEY)
    }
}
