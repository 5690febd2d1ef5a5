//! Local byte cache for downloaded source files.
//!
//! The [`ByteCache`] trait is a plain key-value byte store. Two backends
//! are provided:
//!
//! - **[`MemoryCache`]**: `HashMap` behind a `RwLock`; lives as long as
//!   the process. Used in tests and when no cache directory is configured.
//! - **[`FileCache`]**: one file per key under a directory. File names
//!   are the SHA-256 hex digest of the key, so any key string is safe.
//!
//! Each write goes to its own temporary file in the cache directory and
//! is renamed into place, so readers never see a partial entry and
//! concurrent writers to one key cannot corrupt each other. Last write
//! wins.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::RwLock;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::config::CacheConfig;

#[async_trait]
pub trait ByteCache: Send + Sync {
    /// Returns the stored bytes, or `None` when the key was never written.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store bytes under `key`, replacing any previous value.
    async fn set(&self, key: &str, bytes: &[u8]) -> Result<()>;
}

/// In-process cache.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ByteCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow::anyhow!("memory cache lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow::anyhow!("memory cache lock poisoned"))?;
        entries.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

/// Directory-backed cache.
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }
}

#[async_trait]
impl ByteCache for FileCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    async fn set(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let dir = self.dir.clone();
        let path = self.path_for(key);
        let bytes = bytes.to_vec();

        tokio::task::spawn_blocking(move || -> Result<()> {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create cache dir {}", dir.display()))?;

            let mut tmp = tempfile::NamedTempFile::new_in(&dir)
                .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
            tmp.write_all(&bytes)
                .with_context(|| format!("Failed to write {}", tmp.path().display()))?;
            tmp.persist(&path).map_err(|e| e.error).with_context(|| {
                format!("Failed to move cache entry into {}", path.display())
            })?;
            Ok(())
        })
        .await
        .context("cache writer task failed")?
    }
}

/// Build the cache backend selected by `[cache]`.
pub fn create_cache(config: &CacheConfig) -> Box<dyn ByteCache> {
    match &config.dir {
        Some(dir) => Box::new(FileCache::new(dir.clone())),
        None => Box::new(MemoryCache::new()),
    }
}
