//! Key-value blob storage the store persists into.

mod file;
mod memory;

use async_trait::async_trait;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// An opaque async key-value store.
///
/// Values are whole blobs; `set` replaces whatever was stored under `key`.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    /// Returns `Ok(None)` when nothing is stored under `key`.
    async fn get(&self, key: &str) -> eyre::Result<Option<Vec<u8>>>;

    async fn set(&self, key: &str, value: Vec<u8>) -> eyre::Result<()>;
}
