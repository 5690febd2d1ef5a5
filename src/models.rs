//! Core data models used throughout Daily Wisdom.
//!
//! These types represent the verses, generated reflections, and assembled
//! chapter records that flow through the acquisition pipeline.

use serde::Serialize;
use std::fmt;

/// One numbered line of scripture text within a chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verse {
    /// 1-based position within the chapter.
    pub verse: u32,
    pub text: String,
}

impl Verse {
    pub fn new(verse: u32, text: impl Into<String>) -> Self {
        Self {
            verse,
            text: text.into(),
        }
    }
}

/// Number a chapter from a trusted source as verses `1..=N`.
///
/// Text is kept exactly as stored. `None` when the chapter is empty or any
/// verse is blank: such a chapter is malformed and the next source should
/// be tried.
pub fn chapter_verses<I, S>(lines: I) -> Option<Vec<Verse>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let verses: Vec<Verse> = lines
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            let text = line.as_ref();
            (!text.trim().is_empty()).then(|| Verse::new(i as u32 + 1, text))
        })
        .collect::<Option<_>>()?;
    (!verses.is_empty()).then_some(verses)
}

/// Number model output as verses `1..=N`.
///
/// Lines are trimmed and blank ones dropped before numbering so the result
/// never has gaps.
pub fn number_verses<I, S>(lines: I) -> Vec<Verse>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .map(|l| l.as_ref().trim().to_string())
        .filter(|l| !l.is_empty())
        .enumerate()
        .map(|(i, text)| Verse::new(i as u32 + 1, text))
        .collect()
}

/// Where the scripture text of a record came from, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Bundled,
    RemoteApi,
    CachedFile,
    Generated,
}

impl SourceKind {
    /// Trusted sources are used verbatim and never regenerated by the model.
    pub fn is_trusted(self) -> bool {
        !matches!(self, SourceKind::Generated)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Bundled => "bundled",
            SourceKind::RemoteApi => "remote_api",
            SourceKind::CachedFile => "cached_file",
            SourceKind::Generated => "generated",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of scripture resolution for one chapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub verses: Option<Vec<Verse>>,
    pub source: Option<SourceKind>,
}

impl Resolution {
    pub fn found(source: SourceKind, verses: Vec<Verse>) -> Self {
        Self {
            verses: Some(verses),
            source: Some(source),
        }
    }

    pub fn not_found() -> Self {
        Self::default()
    }

    pub fn is_trusted(&self) -> bool {
        self.trusted_verses().is_some()
    }

    /// Verses usable verbatim, if a trusted source supplied any.
    pub fn trusted_verses(&self) -> Option<&[Verse]> {
        match (&self.verses, self.source) {
            (Some(v), Some(kind)) if kind.is_trusted() && !v.is_empty() => Some(v),
            _ => None,
        }
    }
}

/// Validated output of the generative model.
///
/// Each field is validated on its own; anything missing or malformed is
/// `None` and later replaced by a default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reflection {
    pub scripture_verses: Option<Vec<Verse>>,
    pub interpretation: Option<String>,
    pub practical_steps: Option<Vec<String>>,
    pub reflection_question: Option<String>,
    pub historical_curiosity: Option<String>,
}

impl Reflection {
    pub fn is_empty(&self) -> bool {
        self.scripture_verses.is_none()
            && self.interpretation.is_none()
            && self.practical_steps.is_none()
            && self.reflection_question.is_none()
            && self.historical_curiosity.is_none()
    }
}

/// The record handed to the UI layer. Always fully populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterContent {
    pub day: u32,
    pub scripture_reference: String,
    pub scripture_verses: Vec<Verse>,
    pub interpretation: String,
    pub practical_steps: Vec<String>,
    pub reflection_question: String,
    pub historical_curiosity: String,
}

/// A chapter record plus the source that supplied its text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyReport {
    pub content: ChapterContent,
    /// `None` when no source produced text and the placeholder was used.
    pub source: Option<SourceKind>,
}
