use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::Storage;

/// Process-local storage. Nothing survives a restart.
///
/// Reads and writes can be made to fail on demand, which is how degraded
/// storage is exercised without touching the filesystem.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, Vec<u8>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicU64,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::Relaxed);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// Number of successful `set` calls.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Stores `value` directly, bypassing failure injection.
    pub async fn insert(&self, key: impl Into<String>, value: Vec<u8>) {
        self.values.lock().await.insert(key.into(), value);
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> eyre::Result<Option<Vec<u8>>> {
        if self.fail_reads.load(Ordering::Relaxed) {
            eyre::bail!("read of {key:?} failed");
        }

        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> eyre::Result<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            eyre::bail!("write of {key:?} failed");
        }

        self.values.lock().await.insert(key.to_owned(), value);
        self.writes.fetch_add(1, Ordering::Relaxed);

        Ok(())
    }
}
