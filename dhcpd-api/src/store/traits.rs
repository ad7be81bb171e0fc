//! KeyValueStore trait definition.
//!
//! Handlers depend on this trait rather than on a concrete database so the
//! backing table can be swapped for an in-process map in tests and dev mode.

use async_trait::async_trait;

use super::error::Result;

/// Namespaced key/value CRUD over the override table.
///
/// Keys passed in are logical keys; implementations persist them under
/// [`super::NAMESPACE_PREFIX`]. Each call issues exactly one statement.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Insert or replace the value stored under `key`.
    async fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Point lookup. `Ok(None)` when nothing is stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Remove every row stored under `key`. Removing a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;
}
