//! Per-user key/value persistence.
//!
//! The host owns the real store; the service only needs get/set/delete on
//! opaque byte values, so both shipped backends sit behind [`KeyValueStore`].

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

const AUTH_STATE_PREFIX: &str = "gh-auth-state:";
const ACCESS_TOKEN_PREFIX: &str = "gh-access-token:";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed for key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns `None` when the key has never been written or was deleted.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    /// Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

pub fn auth_state_key(user_id: &str) -> String {
    format!("{AUTH_STATE_PREFIX}{user_id}")
}

pub fn access_token_key(user_id: &str) -> String {
    format!("{ACCESS_TOKEN_PREFIX}{user_id}")
}

/// Wraps a [`MemoryStore`] and fails reads or writes of keys under a prefix.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct FailingStore {
    inner: MemoryStore,
    fail_get: Option<&'static str>,
    fail_set: Option<&'static str>,
}

#[cfg(test)]
impl FailingStore {
    pub fn failing_get(prefix: &'static str) -> Self {
        Self {
            fail_get: Some(prefix),
            ..Self::default()
        }
    }

    pub fn failing_set(prefix: &'static str) -> Self {
        Self {
            fail_set: Some(prefix),
            ..Self::default()
        }
    }

    fn check(rule: Option<&'static str>, key: &str) -> Result<(), StoreError> {
        match rule {
            Some(prefix) if key.starts_with(prefix) => Err(StoreError::Io {
                key: key.to_string(),
                source: std::io::Error::other("disk unavailable"),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Self::check(self.fail_get, key)?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        Self::check(self.fail_set, key)?;
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.inner.delete(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_follow_persisted_layout() {
        assert_eq!(auth_state_key("u1"), "gh-auth-state:u1");
        assert_eq!(access_token_key("u1"), "gh-access-token:u1");
    }
}
