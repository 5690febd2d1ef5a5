//! Whole-book JSON file, downloaded once and kept in the byte cache.
//!
//! # Workflow
//!
//! 1. Look up the configured cache key.
//! 2. On a miss, download the file and store it. A failed store is only
//!    logged; the downloaded bytes are still used.
//! 3. Parse the book and index chapter `day - 1`.
//!
//! The book is either `{ "chapters": [[...], ...] }` (optionally with
//! other keys such as `abbrev`) or a bare `[[...], ...]`. A missing
//! chapter, a chapter that is not an array of strings, an empty chapter or
//! one with a blank verse is "not found". Verse text is kept as stored.
//! Cached bytes that no longer parse are ignored and the file is
//! downloaded again.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::cache::ByteCache;
use crate::config::RemoteFileConfig;
use crate::error::WisdomError;
use crate::models::{chapter_verses, SourceKind, Verse};
use crate::sources::ScriptureSource;

pub struct CachedFileSource {
    config: RemoteFileConfig,
    cache: Arc<dyn ByteCache>,
    client: reqwest::Client,
}

impl CachedFileSource {
    pub fn new(config: RemoteFileConfig, cache: Arc<dyn ByteCache>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            config,
            cache,
            client,
        })
    }

    async fn download(&self) -> Result<Vec<u8>> {
        info!("downloading book file {}", self.config.url);
        let response = self
            .client
            .get(&self.config.url)
            .send()
            .await
            .map_err(|e| WisdomError::source_unavailable(self.name(), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(
                WisdomError::source_unavailable(self.name(), format!("HTTP {}", status)).into(),
            );
        }

        let bytes = response.bytes().await?.to_vec();

        if let Err(e) = self.cache.set(&self.config.cache_key, &bytes).await {
            warn!(
                "could not cache book file under '{}': {:#}",
                self.config.cache_key, e
            );
        }

        Ok(bytes)
    }

    /// Cached book if it parses, otherwise a fresh download.
    async fn load_book(&self) -> Result<serde_json::Value> {
        let cached = match self.cache.get(&self.config.cache_key).await {
            Ok(c) => c,
            Err(e) => {
                warn!("cache read failed for '{}': {:#}", self.config.cache_key, e);
                None
            }
        };

        if let Some(bytes) = cached {
            match parse_book(&bytes) {
                Ok(book) => return Ok(book),
                Err(e) => warn!(
                    "cached book under '{}' is unreadable, downloading again: {:#}",
                    self.config.cache_key, e
                ),
            }
        }

        let bytes = self.download().await?;
        parse_book(&bytes).with_context(|| format!("Invalid book file from {}", self.config.url))
    }
}

#[async_trait]
impl ScriptureSource for CachedFileSource {
    fn name(&self) -> &str {
        "remote_file"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::CachedFile
    }

    fn describe(&self) -> String {
        format!("book file {} (cache key {})", self.config.url, self.config.cache_key)
    }

    async fn fetch_chapter(&self, day: u32) -> Result<Option<Vec<Verse>>> {
        let book = self.load_book().await?;
        Ok(chapter_from_book(&book, day))
    }
}

fn parse_book(bytes: &[u8]) -> Result<serde_json::Value> {
    // Some mirrors serve the file with a UTF-8 BOM.
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let book: serde_json::Value = serde_json::from_slice(bytes)?;
    if chapters_of(&book).is_none() {
        anyhow::bail!("book file has no chapters array");
    }
    Ok(book)
}

fn chapters_of(book: &serde_json::Value) -> Option<&Vec<serde_json::Value>> {
    book.get("chapters").unwrap_or(book).as_array()
}

/// Chapter `day` of a parsed book, zero-based on disk.
pub fn chapter_from_book(book: &serde_json::Value, day: u32) -> Option<Vec<Verse>> {
    let index = usize::try_from(day.checked_sub(1)?).ok()?;
    let lines = chapters_of(book)?.get(index)?.as_array()?;
    let texts: Option<Vec<&str>> = lines.iter().map(|l| l.as_str()).collect();
    chapter_verses(texts?)
}
