//! Scripture source abstraction and the priority-ordered resolver.
//!
//! Every origin of chapter text implements [`ScriptureSource`]. The
//! [`SourceResolver`] holds them in priority order and returns the first
//! non-empty chapter; a source that reports "not found" or fails is
//! skipped and the next one is tried.
//!
//! ```text
//! ┌─────────┐   ┌────────────┐   ┌─────────────┐
//! │ Bundled │──▶│ Remote API │──▶│ Cached file │──▶ not found
//! └─────────┘   └────────────┘   └─────────────┘
//! ```
//!
//! Built-in sources live in [`source_bundled`](crate::source_bundled),
//! [`source_api`](crate::source_api) and [`source_file`](crate::source_file).
//! Custom sources can be appended with [`SourceResolver::register`].

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::{create_cache, ByteCache};
use crate::config::Config;
use crate::models::{Resolution, SourceKind, Verse};
use crate::source_api::RemoteApiSource;
use crate::source_bundled::BundledSource;
use crate::source_file::CachedFileSource;

/// An origin of chapter text.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use anyhow::Result;
/// use daily_wisdom::models::{chapter_verses, SourceKind, Verse};
/// use daily_wisdom::sources::ScriptureSource;
///
/// struct Fixed;
///
/// #[async_trait]
/// impl ScriptureSource for Fixed {
///     fn name(&self) -> &str { "fixed" }
///     fn kind(&self) -> SourceKind { SourceKind::Bundled }
///
///     async fn fetch_chapter(&self, day: u32) -> Result<Option<Vec<Verse>>> {
///         Ok(if day == 1 { chapter_verses(["In the beginning"]) } else { None })
///     }
/// }
/// ```
#[async_trait]
pub trait ScriptureSource: Send + Sync {
    /// Short identifier used in logs and `wisdom sources`.
    fn name(&self) -> &str;

    /// Which priority class this source belongs to.
    fn kind(&self) -> SourceKind;

    /// One-line description of where the text comes from.
    fn describe(&self) -> String {
        self.name().to_string()
    }

    /// Fetch the verses of chapter `day`.
    ///
    /// `Ok(None)` means the source has no such chapter. Errors mean the
    /// source could not be used this time. Both make the resolver move on.
    async fn fetch_chapter(&self, day: u32) -> Result<Option<Vec<Verse>>>;
}

/// Priority-ordered list of scripture sources.
pub struct SourceResolver {
    sources: Vec<Box<dyn ScriptureSource>>,
}

impl SourceResolver {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Build the resolver described by `[sources]`, in fixed priority order:
    /// bundled dataset, remote API, cached remote file.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache: Arc<dyn ByteCache> = Arc::from(create_cache(&config.cache));
        let mut resolver = Self::new();

        if let Some(path) = &config.sources.bundled.path {
            resolver.register(Box::new(BundledSource::from_file(path)?));
        }
        if config.sources.remote_api.enabled {
            resolver.register(Box::new(RemoteApiSource::new(
                config.sources.remote_api.clone(),
            )?));
        }
        if config.sources.remote_file.enabled {
            resolver.register(Box::new(CachedFileSource::new(
                config.sources.remote_file.clone(),
                cache,
            )?));
        }

        Ok(resolver)
    }

    /// Append a source. Sources registered earlier win.
    pub fn register(&mut self, source: Box<dyn ScriptureSource>) {
        self.sources.push(source);
    }

    pub fn sources(&self) -> &[Box<dyn ScriptureSource>] {
        &self.sources
    }

    /// Return the first non-empty chapter any source can provide.
    pub async fn resolve(&self, day: u32) -> Resolution {
        for source in &self.sources {
            match source.fetch_chapter(day).await {
                Ok(Some(verses)) if !verses.is_empty() => {
                    info!(
                        "chapter {} resolved from '{}' ({} verses)",
                        day,
                        source.name(),
                        verses.len()
                    );
                    return Resolution::found(source.kind(), verses);
                }
                Ok(_) => {
                    debug!("source '{}' has no chapter {}", source.name(), day);
                }
                Err(e) => {
                    warn!(
                        "source '{}' failed for chapter {}, falling through: {:#}",
                        source.name(),
                        day,
                        e
                    );
                }
            }
        }

        warn!("no scripture source could provide chapter {}", day);
        Resolution::not_found()
    }
}

impl Default for SourceResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration status of one source, as shown by `wisdom sources`.
#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    pub name: String,
    pub kind: SourceKind,
    pub status: String,
    pub detail: String,
}

/// Report every built-in source and whether it is configured.
pub fn get_sources(config: &Config) -> Vec<SourceStatus> {
    let sources = &config.sources;

    let bundled = match &sources.bundled.path {
        Some(p) if p.exists() => ("OK", p.display().to_string()),
        Some(p) => ("MISSING FILE", p.display().to_string()),
        None => ("NOT CONFIGURED", String::new()),
    };
    let api_status = if sources.remote_api.enabled {
        "ENABLED"
    } else {
        "DISABLED"
    };
    let file_status = if sources.remote_file.enabled {
        "ENABLED"
    } else {
        "DISABLED"
    };

    vec![
        SourceStatus {
            name: "bundled".to_string(),
            kind: SourceKind::Bundled,
            status: bundled.0.to_string(),
            detail: bundled.1,
        },
        SourceStatus {
            name: "remote_api".to_string(),
            kind: SourceKind::RemoteApi,
            status: api_status.to_string(),
            detail: format!(
                "{} ({}/{})",
                sources.remote_api.base_url, sources.remote_api.translation, sources.remote_api.book
            ),
        },
        SourceStatus {
            name: "remote_file".to_string(),
            kind: SourceKind::CachedFile,
            status: file_status.to_string(),
            detail: format!(
                "{} [cache key {}]",
                sources.remote_file.url, sources.remote_file.cache_key
            ),
        },
        SourceStatus {
            name: "generator".to_string(),
            kind: SourceKind::Generated,
            status: if config.generator.is_enabled() {
                "ENABLED".to_string()
            } else {
                "DISABLED".to_string()
            },
            detail: format!("{} ({})", config.generator.provider, config.generator.model),
        },
    ]
}

/// One line per registered source, in the order they are tried.
pub fn resolution_order(resolver: &SourceResolver) -> Vec<String> {
    resolver
        .sources()
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {}: {}", i + 1, s.name(), s.describe()))
        .collect()
}

pub fn list_sources(config: &Config) -> Result<()> {
    println!("{:<12} {:<12} {:<16} DETAIL", "SOURCE", "KIND", "STATUS");
    for s in get_sources(config) {
        println!("{:<12} {:<12} {:<16} {}", s.name, s.kind, s.status, s.detail);
    }

    println!();
    match SourceResolver::from_config(config) {
        Ok(resolver) if resolver.sources().is_empty() => {
            println!("No scripture source is enabled.");
        }
        Ok(resolver) => {
            println!("Resolution order:");
            for line in resolution_order(&resolver) {
                println!("  {}", line);
            }
        }
        Err(e) => println!("Sources cannot be built: {:#}", e),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::number_verses;

    struct Scripted {
        name: &'static str,
        kind: SourceKind,
        result: fn(u32) -> Result<Option<Vec<Verse>>>,
    }

    #[async_trait]
    impl ScriptureSource for Scripted {
        fn name(&self) -> &str {
            self.name
        }
        fn kind(&self) -> SourceKind {
            self.kind
        }
        async fn fetch_chapter(&self, day: u32) -> Result<Option<Vec<Verse>>> {
            (self.result)(day)
        }
    }

    fn failing(_: u32) -> Result<Option<Vec<Verse>>> {
        anyhow::bail!("connection refused")
    }
    fn missing(_: u32) -> Result<Option<Vec<Verse>>> {
        Ok(None)
    }
    fn empty(_: u32) -> Result<Option<Vec<Verse>>> {
        Ok(Some(vec![]))
    }
    fn found(_: u32) -> Result<Option<Vec<Verse>>> {
        Ok(Some(number_verses(["found"])))
    }

    #[tokio::test]
    async fn test_first_success_wins_in_registration_order() {
        let mut resolver = SourceResolver::new();
        resolver.register(Box::new(Scripted {
            name: "a",
            kind: SourceKind::Bundled,
            result: missing,
        }));
        resolver.register(Box::new(Scripted {
            name: "b",
            kind: SourceKind::RemoteApi,
            result: failing,
        }));
        resolver.register(Box::new(Scripted {
            name: "c",
            kind: SourceKind::CachedFile,
            result: empty,
        }));
        resolver.register(Box::new(Scripted {
            name: "d",
            kind: SourceKind::CachedFile,
            result: found,
        }));

        let r = resolver.resolve(5).await;
        assert_eq!(r.source, Some(SourceKind::CachedFile));
        assert!(r.is_trusted());
        assert_eq!(r.verses.unwrap()[0].text, "found");
    }

    #[tokio::test]
    async fn test_all_failing_is_not_found() {
        let mut resolver = SourceResolver::new();
        resolver.register(Box::new(Scripted {
            name: "b",
            kind: SourceKind::RemoteApi,
            result: failing,
        }));
        let r = resolver.resolve(1).await;
        assert_eq!(r, Resolution::not_found());
        assert!(!r.is_trusted());
    }

    #[tokio::test]
    async fn test_empty_resolver_is_not_found() {
        assert_eq!(SourceResolver::new().resolve(1).await, Resolution::not_found());
    }

    #[test]
    fn test_minimal_config_sources() {
        let statuses = get_sources(&Config::minimal());
        assert_eq!(statuses.len(), 4);
        assert_eq!(statuses[0].status, "NOT CONFIGURED");
        assert_eq!(statuses[1].status, "DISABLED");
        assert_eq!(statuses[2].status, "ENABLED");
    }

    #[test]
    fn test_from_config_skips_unconfigured_sources() {
        let resolver = SourceResolver::from_config(&Config::minimal()).unwrap();
        assert_eq!(resolver.sources().len(), 1);
        assert_eq!(resolver.sources()[0].kind(), SourceKind::CachedFile);
    }

    #[test]
    fn test_resolution_order_uses_source_descriptions() {
        let mut resolver = SourceResolver::from_config(&Config::minimal()).unwrap();
        resolver.register(Box::new(Scripted {
            name: "extra",
            kind: SourceKind::CachedFile,
            result: missing,
        }));

        let lines = resolution_order(&resolver);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("1. remote_file: book file "));
        assert!(lines[0].contains("cache key bible_nvi_pv_book_v1"));
        assert_eq!(lines[1], "2. extra: extra");
    }
}
