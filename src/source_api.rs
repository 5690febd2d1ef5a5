//! Remote verse API source.
//!
//! Calls `GET {base_url}/verses/{translation}/{book}/{chapter}` once per
//! request. The response may be an object with a `verses` array or a bare
//! array. Each entry needs a numeric index (`number` or `verse`) and a
//! `text` string:
//!
//! ```json
//! { "verses": [ { "number": 1, "text": "..." }, { "number": 2, "text": "..." } ] }
//! ```
//!
//! Entries are ordered by their index and renumbered `1..=N`; their text
//! is kept as served. Any non-success status, network error, blank verse
//! or body of another shape is a source failure.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::RemoteApiConfig;
use crate::error::WisdomError;
use crate::models::{chapter_verses, SourceKind, Verse};
use crate::sources::ScriptureSource;

pub struct RemoteApiSource {
    config: RemoteApiConfig,
    client: reqwest::Client,
}

impl RemoteApiSource {
    pub fn new(config: RemoteApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }

    pub fn chapter_url(&self, day: u32) -> String {
        format!(
            "{}/verses/{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.translation,
            self.config.book,
            day
        )
    }
}

#[async_trait]
impl ScriptureSource for RemoteApiSource {
    fn name(&self) -> &str {
        "remote_api"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::RemoteApi
    }

    fn describe(&self) -> String {
        format!(
            "verse API {} ({}/{})",
            self.config.base_url, self.config.translation, self.config.book
        )
    }

    async fn fetch_chapter(&self, day: u32) -> Result<Option<Vec<Verse>>> {
        let url = self.chapter_url(day);
        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| WisdomError::source_unavailable(self.name(), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WisdomError::source_unavailable(
                self.name(),
                format!("HTTP {}: {}", status, body),
            )
            .into());
        }

        let json: serde_json::Value = response
            .json()
            .await
            .with_context(|| format!("Invalid JSON from {}", url))?;
        let verses = parse_verses_response(&json)?;
        Ok((!verses.is_empty()).then_some(verses))
    }
}

/// Extract verses from a verse-API response body.
pub fn parse_verses_response(json: &serde_json::Value) -> Result<Vec<Verse>> {
    let items = json
        .get("verses")
        .unwrap_or(json)
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("Invalid verse API response: missing verses array"))?;

    let mut numbered = Vec::with_capacity(items.len());
    for item in items {
        let index = item
            .get("number")
            .or_else(|| item.get("verse"))
            .and_then(|n| n.as_u64())
            .ok_or_else(|| anyhow::anyhow!("Invalid verse API response: verse without number"))?;
        let text = item
            .get("text")
            .and_then(|t| t.as_str())
            .ok_or_else(|| anyhow::anyhow!("Invalid verse API response: verse without text"))?;
        numbered.push((index, text));
    }

    if numbered.is_empty() {
        return Ok(Vec::new());
    }
    numbered.sort_by_key(|(index, _)| *index);
    chapter_verses(numbered.into_iter().map(|(_, text)| text))
        .ok_or_else(|| anyhow::anyhow!("Invalid verse API response: blank verse text"))
}
