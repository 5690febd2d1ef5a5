//! The daily chapter pipeline.
//!
//! Runs the three stages strictly in sequence, since the request sent to
//! the model depends on what the resolver found:
//!
//! ```text
//! resolve(day) ──▶ generate(day, trusted verses?) ──▶ assemble
//! ```
//!
//! Expected failures (unreachable sources, model errors, bad output) are
//! absorbed by the stages. [`DailyPipeline::fetch`] only returns `None`
//! for a request that could not be served at all, such as a day outside
//! the book.

use anyhow::Result;
use chrono::Datelike;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::assembler::assemble;
use crate::config::Config;
use crate::error::WisdomError;
use crate::generator::ReflectionGenerator;
use crate::models::{ChapterContent, DailyReport};
use crate::sources::SourceResolver;

pub struct DailyPipeline {
    book: String,
    max_chapter: u32,
    resolver: SourceResolver,
    generator: ReflectionGenerator,
}

impl DailyPipeline {
    pub fn new(
        book: impl Into<String>,
        max_chapter: u32,
        resolver: SourceResolver,
        generator: ReflectionGenerator,
    ) -> Self {
        Self {
            book: book.into(),
            max_chapter,
            resolver,
            generator,
        }
    }

    /// Wire sources, cache and model from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            config.book.name.clone(),
            config.book.chapters,
            SourceResolver::from_config(config)?,
            ReflectionGenerator::from_config(config)?,
        ))
    }

    /// Build the record for `day`, reporting which source supplied the text.
    pub async fn fetch_report(&self, day: u32) -> Result<DailyReport> {
        if day == 0 || day > self.max_chapter {
            return Err(WisdomError::InvalidDay {
                day,
                max: self.max_chapter,
            }
            .into());
        }

        let resolution = self.resolver.resolve(day).await;

        let reflection = match self
            .generator
            .generate(day, resolution.trusted_verses())
            .await
        {
            Ok(r) => Some(r),
            Err(e) => {
                warn!("using default reflection for chapter {}: {:#}", day, e);
                None
            }
        };

        let report = assemble(day, &self.book, &resolution, reflection.as_ref());
        info!(
            "assembled {} ({} verses, source {})",
            report.content.scripture_reference,
            report.content.scripture_verses.len(),
            report.source.map(|s| s.as_str()).unwrap_or("placeholder")
        );
        Ok(report)
    }

    /// Build the record for `day`, or `None` if the request failed outright.
    ///
    /// A returned record is always complete and renderable, even when some
    /// of its fields are defaults.
    pub async fn fetch(&self, day: u32) -> Option<ChapterContent> {
        match self.fetch_report(day).await {
            Ok(report) => Some(report.content),
            Err(e) => {
                error!("request for chapter {} failed: {:#}", day, e);
                None
            }
        }
    }

    /// Today's chapter: the local day of the month, capped at the last chapter.
    pub fn today(&self) -> u32 {
        chrono::Local::now().day().min(self.max_chapter)
    }

    /// Like [`fetch_report`](Self::fetch_report), but fails once `deadline`
    /// has passed.
    pub async fn fetch_report_within(&self, day: u32, deadline: Duration) -> Result<DailyReport> {
        tokio::time::timeout(deadline, self.fetch_report(day))
            .await
            .map_err(|_| {
                anyhow::anyhow!("request for chapter {} timed out after {:?}", day, deadline)
            })?
    }

    /// Like [`fetch`](Self::fetch), but gives up after `deadline`.
    pub async fn fetch_within(&self, day: u32, deadline: Duration) -> Option<ChapterContent> {
        match self.fetch_report_within(day, deadline).await {
            Ok(report) => Some(report.content),
            Err(e) => {
                error!("request for chapter {} failed: {:#}", day, e);
                None
            }
        }
    }
}
