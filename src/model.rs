//! Generative text model abstraction and implementations.
//!
//! Defines the [`TextModel`] trait and concrete implementations:
//! - **[`DisabledModel`]**: always fails; used when no provider is configured.
//! - **[`GeminiModel`]**: calls the Gemini `generateContent` endpoint with a
//!   JSON response schema.
//!
//! # Provider Selection
//!
//! Use [`create_model`] to instantiate the model selected by `[generator]`:
//!
//! ```rust
//! # use daily_wisdom::config::GeneratorConfig;
//! # use daily_wisdom::model::create_model;
//! let config = GeneratorConfig::default(); // provider = "disabled"
//! let model = create_model(&config).unwrap();
//! assert_eq!(model.model_name(), "disabled");
//! ```
//!
//! Every call is made exactly once. There is no retry or backoff.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::GeneratorConfig;

/// A text model that answers a prompt with JSON shaped by `schema`.
///
/// Implementations return the raw response text. Callers must still
/// parse and validate it; a provider's schema guarantee is not trusted.
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Returns the model identifier (e.g. `"gemini-2.5-flash"`).
    fn model_name(&self) -> &str;

    async fn generate(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
        temperature: f32,
    ) -> Result<String>;
}

// ============ Disabled Model ============

/// A model that refuses every request.
pub struct DisabledModel;

#[async_trait]
impl TextModel for DisabledModel {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _: &str, _: &serde_json::Value, _: f32) -> Result<String> {
        bail!("Generator provider is disabled")
    }
}

// ============ Gemini Model ============

/// Google Gemini via `POST {base_url}/v1beta/models/{model}:generateContent`.
///
/// The API key is passed in by the caller; this type never reads the
/// environment.
pub struct GeminiModel {
    model: String,
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiModel {
    pub fn new(
        model: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            bail!("Gemini API key must not be empty");
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            model: model.into(),
            api_key,
            base_url: base_url.into(),
            client,
        })
    }

    /// Build from `[generator]`. Requires `api_key` to have been resolved.
    pub fn from_config(config: &GeneratorConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            anyhow::anyhow!(
                "Gemini API key missing (set the {} environment variable)",
                config.api_key_env
            )
        })?;
        Self::new(
            config.model.clone(),
            api_key,
            config.base_url.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl TextModel for GeminiModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
        temperature: f32,
    ) -> Result<String> {
        let body = serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema,
                "temperature": temperature,
            },
        });

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Gemini request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Gemini API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_gemini_response(&json)
    }
}

/// Concatenate the text parts of the first candidate.
fn parse_gemini_response(json: &serde_json::Value) -> Result<String> {
    let parts = json
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| {
            let reason = json
                .pointer("/promptFeedback/blockReason")
                .and_then(|r| r.as_str())
                .unwrap_or("missing candidates");
            anyhow::anyhow!("Invalid Gemini response: {}", reason)
        })?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();

    if text.trim().is_empty() {
        bail!("Gemini returned an empty response");
    }
    Ok(text)
}

/// Create the [`TextModel`] selected by configuration.
///
/// | Config Value | Model |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledModel`] |
/// | `"gemini"` | [`GeminiModel`] |
pub fn create_model(config: &GeneratorConfig) -> Result<Box<dyn TextModel>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledModel)),
        "gemini" => Ok(Box::new(GeminiModel::from_config(config)?)),
        other => bail!("Unknown generator provider: {}", other),
    }
}
