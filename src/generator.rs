//! Reflection generation.
//!
//! Builds one of two schema-constrained requests for the [`TextModel`]
//! and validates whatever comes back.
//!
//! | Mode | When | Schema | Temperature |
//! |------|------|--------|-------------|
//! | [`GenerationMode::MetadataOnly`] | trusted verses known | 4 reflection fields | 0.7 |
//! | [`GenerationMode::FullGeneration`] | no trusted verses | verses + 4 fields | 0.2 |
//!
//! Full generation runs colder because the model is asked to reproduce
//! the chapter literally.
//!
//! # Validation
//!
//! Each field is checked on its own. A field that is missing, blank, or of
//! the wrong type becomes `None`; the rest are kept. The response as a
//! whole fails only when the call fails, the text is empty or not a JSON
//! object, or no requested field survives.

use anyhow::Result;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::{Config, GeneratorConfig};
use crate::error::WisdomError;
use crate::model::{create_model, TextModel};
use crate::models::{number_verses, Reflection, Verse};

/// Which request shape to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode<'a> {
    /// Reflect on these verses only.
    MetadataOnly(&'a [Verse]),
    /// Reproduce the chapter and reflect on it.
    FullGeneration,
}

impl<'a> GenerationMode<'a> {
    pub fn for_verses(known: Option<&'a [Verse]>) -> Self {
        match known {
            Some(v) if !v.is_empty() => GenerationMode::MetadataOnly(v),
            _ => GenerationMode::FullGeneration,
        }
    }

    pub fn wants_verses(&self) -> bool {
        matches!(self, GenerationMode::FullGeneration)
    }
}

/// A fully built model request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub schema: Value,
    pub temperature: f32,
}

/// Prompt and sampling settings, taken from `[book]` and `[generator]`.
#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub book: String,
    pub translation_label: String,
    pub language: String,
    pub metadata_temperature: f32,
    pub full_temperature: f32,
}

impl GeneratorSettings {
    pub fn from_config(book: &str, config: &GeneratorConfig) -> Self {
        Self {
            book: book.to_string(),
            translation_label: config.translation_label.clone(),
            language: config.language.clone(),
            metadata_temperature: config.metadata_temperature,
            full_temperature: config.full_temperature,
        }
    }
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self::from_config("Proverbs", &GeneratorConfig::default())
    }
}

pub struct ReflectionGenerator {
    model: Box<dyn TextModel>,
    settings: GeneratorSettings,
}

impl ReflectionGenerator {
    pub fn new(model: Box<dyn TextModel>, settings: GeneratorSettings) -> Self {
        Self { model, settings }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            create_model(&config.generator)?,
            GeneratorSettings::from_config(&config.book.name, &config.generator),
        ))
    }

    pub fn build_request(&self, day: u32, mode: GenerationMode<'_>) -> GenerationRequest {
        let s = &self.settings;
        match mode {
            GenerationMode::MetadataOnly(verses) => {
                let text = serde_json::to_string(verses).unwrap_or_default();
                GenerationRequest {
                    prompt: format!(
                        "Analyze the following biblical text of {book} {day} ({translation}):\n\
                         {text}\n\n\
                         Based EXCLUSIVELY on this text, write in {language}:\n\
                         1. A wise, modern interpretation (3 sentences).\n\
                         2. 3 practical steps to apply it today.\n\
                         3. One deep reflection question.\n\
                         4. One historical curiosity about this specific context.\n\
                         Use markdown bold (**text**) for emphasis.",
                        book = s.book,
                        translation = s.translation_label,
                        language = s.language,
                    ),
                    schema: metadata_schema(),
                    temperature: s.metadata_temperature,
                }
            }
            GenerationMode::FullGeneration => GenerationRequest {
                prompt: format!(
                    "ACT AS A BIBLE TRANSCRIBER.\n\
                     Transcribe {book} chapter {day} from the {translation} translation.\n\n\
                     RULES:\n\
                     1. Include EVERY verse. Omit no verse.\n\
                     2. The text must be exact.\n\
                     3. Also write, in {language}, an interpretation, 3 practical steps, \
                     a reflection question and a historical curiosity.",
                    book = s.book,
                    translation = s.translation_label,
                    language = s.language,
                ),
                schema: full_generation_schema(),
                temperature: s.full_temperature,
            },
        }
    }

    /// Ask the model for a reflection on chapter `day`.
    ///
    /// Pass the trusted verses when they are known; without them the model
    /// is also asked for the chapter text. No retries.
    pub async fn generate(&self, day: u32, known: Option<&[Verse]>) -> Result<Reflection> {
        let mode = GenerationMode::for_verses(known);
        let request = self.build_request(day, mode);
        info!(
            "requesting {} for chapter {} from {}",
            if mode.wants_verses() {
                "full generation"
            } else {
                "reflection"
            },
            day,
            self.model.model_name()
        );

        let text = self
            .model
            .generate(&request.prompt, &request.schema, request.temperature)
            .await
            .map_err(|e| WisdomError::generation(format!("{:#}", e)))?;

        let reflection = parse_reflection(&text, mode)?;
        debug!("reflection for chapter {}: {:?}", day, reflection);
        Ok(reflection)
    }
}

/// Schema for metadata-only requests.
pub fn metadata_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": reflection_properties(),
        "required": ["interpretation", "practicalSteps", "reflectionQuestion", "historicalCuriosity"]
    })
}

/// Schema for full-generation requests.
pub fn full_generation_schema() -> Value {
    let mut properties = reflection_properties();
    properties["scriptureVerses"] = json!({
        "type": "ARRAY",
        "description": "The complete chapter text, verse by verse.",
        "items": {
            "type": "OBJECT",
            "properties": {
                "verse": { "type": "INTEGER" },
                "text": { "type": "STRING" }
            },
            "required": ["verse", "text"]
        }
    });
    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": [
            "scriptureVerses",
            "interpretation",
            "practicalSteps",
            "reflectionQuestion",
            "historicalCuriosity"
        ]
    })
}

fn reflection_properties() -> Value {
    json!({
        "interpretation": {
            "type": "STRING",
            "description": "Concise wisdom-focused interpretation (3 sentences). Use markdown bold (**text**)."
        },
        "practicalSteps": {
            "type": "ARRAY",
            "items": { "type": "STRING" },
            "description": "3 short practical steps for daily life. Use markdown bold (**text**)."
        },
        "reflectionQuestion": {
            "type": "STRING",
            "description": "A single reflection question based on the chapter. Use **bold**."
        },
        "historicalCuriosity": {
            "type": "STRING",
            "description": "A specific historical or cultural fact about Solomon or the context of these verses."
        }
    })
}

/// Validate raw model text into a [`Reflection`].
pub fn parse_reflection(text: &str, mode: GenerationMode<'_>) -> Result<Reflection> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(WisdomError::generation("empty response").into());
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|e| WisdomError::generation(format!("malformed JSON: {}", e)))?;
    if !value.is_object() {
        return Err(WisdomError::generation("response is not a JSON object").into());
    }

    let reflection = Reflection {
        scripture_verses: if mode.wants_verses() {
            verses_field(&value)
        } else {
            None
        },
        interpretation: string_field(&value, "interpretation"),
        practical_steps: steps_field(&value),
        reflection_question: string_field(&value, "reflectionQuestion"),
        historical_curiosity: string_field(&value, "historicalCuriosity"),
    };

    if reflection.is_empty() {
        return Err(WisdomError::generation("no requested field in response").into());
    }
    Ok(reflection)
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    let s = value.get(key)?.as_str()?.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn steps_field(value: &Value) -> Option<Vec<String>> {
    let steps: Vec<String> = value
        .get("practicalSteps")?
        .as_array()?
        .iter()
        .filter_map(|s| s.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    (!steps.is_empty()).then_some(steps)
}

fn verses_field(value: &Value) -> Option<Vec<Verse>> {
    let mut items: Vec<(u64, &str)> = value
        .get("scriptureVerses")?
        .as_array()?
        .iter()
        .filter_map(|v| {
            let text = v.get("text")?.as_str()?;
            let n = v.get("verse").and_then(|n| n.as_u64()).unwrap_or(u64::MAX);
            Some((n, text))
        })
        .collect();
    items.sort_by_key(|(n, _)| *n);
    let verses = number_verses(items.into_iter().map(|(_, text)| text));
    (!verses.is_empty()).then_some(verses)
}
