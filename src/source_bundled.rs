//! Bundled static dataset.
//!
//! A read-only map from chapter number to verse strings, loaded once at
//! startup. Lookups never perform I/O and cannot fail transiently.
//!
//! Two JSON layouts are accepted on disk:
//!
//! ```json
//! { "1": ["verse one", "verse two"], "2": ["..."] }
//! ```
//!
//! ```json
//! [["chapter 1 verse 1", "..."], ["chapter 2 verse 1", "..."]]
//! ```
//!
//! The array form is zero-indexed: element `0` is chapter 1.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

use crate::models::{chapter_verses, SourceKind, Verse};
use crate::sources::ScriptureSource;

pub struct BundledSource {
    chapters: HashMap<u32, Vec<String>>,
}

impl BundledSource {
    pub fn new(chapters: HashMap<u32, Vec<String>>) -> Self {
        Self { chapters }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read bundled dataset: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Invalid bundled dataset: {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(content)?;
        let mut chapters = HashMap::new();

        match value {
            serde_json::Value::Object(map) => {
                for (key, lines) in map {
                    let day: u32 = key
                        .trim()
                        .parse()
                        .with_context(|| format!("chapter key '{}' is not a number", key))?;
                    chapters.insert(day, string_array(&lines, day)?);
                }
            }
            serde_json::Value::Array(items) => {
                for (i, lines) in items.iter().enumerate() {
                    let day = i as u32 + 1;
                    chapters.insert(day, string_array(lines, day)?);
                }
            }
            _ => bail!("expected an object keyed by chapter or an array of chapters"),
        }

        Ok(Self { chapters })
    }

    pub fn chapter_count(&self) -> usize {
        self.chapters.len()
    }

    /// Verses of `day` exactly as stored, or `None` when the entry is
    /// absent, empty, or has a blank verse.
    pub fn lookup(&self, day: u32) -> Option<Vec<Verse>> {
        chapter_verses(self.chapters.get(&day)?)
    }
}

fn string_array(value: &serde_json::Value, day: u32) -> Result<Vec<String>> {
    let items = value
        .as_array()
        .with_context(|| format!("chapter {} is not an array", day))?;
    items
        .iter()
        .map(|v| {
            v.as_str()
                .map(str::to_string)
                .with_context(|| format!("chapter {} contains a non-string verse", day))
        })
        .collect()
}

#[async_trait]
impl ScriptureSource for BundledSource {
    fn name(&self) -> &str {
        "bundled"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Bundled
    }

    fn describe(&self) -> String {
        format!("bundled dataset ({} chapters)", self.chapter_count())
    }

    async fn fetch_chapter(&self, day: u32) -> Result<Option<Vec<Verse>>> {
        Ok(self.lookup(day))
    }
}
