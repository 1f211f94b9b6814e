//! Backing store traits the host implements.

use super::StoreError;
use async_trait::async_trait;

/// The browser's durable local storage.
///
/// Calls are synchronous, matching the browser API.
pub trait LocalStorage: Send + Sync {
    /// Reads an item.
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes an item.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes an item. Removing a missing item is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StoreError>;
}

/// An external async key-value store, as found on native mobile runtimes.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Reads a value.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes a value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes a value. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}
