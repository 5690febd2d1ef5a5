//! Content assembly: resolver output + reflection → [`ChapterContent`].
//!
//! [`assemble`] is a pure function. Identical inputs give identical records,
//! and every field of the record is always populated:
//!
//! 1. Trusted verses from the resolver are used as-is, whatever the model
//!    returned.
//! 2. Without them, verses generated by the model are used; failing that,
//!    a single placeholder verse.
//! 3. Each reflection field falls back to its own default constant.
//! 4. The scripture reference is always `"<book> <day>"`.

use crate::models::{
    number_verses, ChapterContent, DailyReport, Reflection, Resolution, SourceKind, Verse,
};

pub const PLACEHOLDER_VERSE_TEXT: &str =
    "The text of this chapter is unavailable right now. Please try again later.";

pub const DEFAULT_INTERPRETATION: &str =
    "Wisdom begins with a humble heart. Read this chapter slowly and let each proverb speak to your day.";

pub const DEFAULT_PRACTICAL_STEPS: [&str; 3] = [
    "Read the chapter again, slowly.",
    "Pick one verse and carry it with you today.",
    "Share what you learned with someone close to you.",
];

pub const DEFAULT_REFLECTION_QUESTION: &str =
    "Which verse of this chapter speaks most to your life today?";

pub const DEFAULT_HISTORICAL_CURIOSITY: &str =
    "Most of the book of Proverbs is attributed to King Solomon, known for his wisdom.";

/// Build the record for `day` from its resolution and an optional reflection.
pub fn assemble(
    day: u32,
    book: &str,
    resolution: &Resolution,
    reflection: Option<&Reflection>,
) -> DailyReport {
    let (scripture_verses, source) = choose_verses(resolution, reflection);

    let content = ChapterContent {
        day,
        scripture_reference: format!("{} {}", book, day),
        scripture_verses,
        interpretation: reflection
            .and_then(|r| r.interpretation.clone())
            .unwrap_or_else(|| DEFAULT_INTERPRETATION.to_string()),
        practical_steps: reflection
            .and_then(|r| r.practical_steps.clone())
            .filter(|steps| !steps.is_empty())
            .unwrap_or_else(|| DEFAULT_PRACTICAL_STEPS.iter().map(|s| s.to_string()).collect()),
        reflection_question: reflection
            .and_then(|r| r.reflection_question.clone())
            .unwrap_or_else(|| DEFAULT_REFLECTION_QUESTION.to_string()),
        historical_curiosity: reflection
            .and_then(|r| r.historical_curiosity.clone())
            .unwrap_or_else(|| DEFAULT_HISTORICAL_CURIOSITY.to_string()),
    };

    DailyReport { content, source }
}

fn choose_verses(
    resolution: &Resolution,
    reflection: Option<&Reflection>,
) -> (Vec<Verse>, Option<SourceKind>) {
    if let Some(verses) = resolution.trusted_verses() {
        return (verses.to_vec(), resolution.source);
    }

    let generated = reflection
        .and_then(|r| r.scripture_verses.as_ref())
        .map(|verses| number_verses(verses.iter().map(|v| v.text.as_str())))
        .filter(|verses| !verses.is_empty());

    match generated {
        Some(verses) => (verses, Some(SourceKind::Generated)),
        None => (vec![Verse::new(1, PLACEHOLDER_VERSE_TEXT)], None),
    }
}
