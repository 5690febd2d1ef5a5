use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub book: BookConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookConfig {
    /// Label used in the scripture reference (`"<name> <day>"`).
    #[serde(default = "default_book_name")]
    pub name: String,
    /// Highest valid day.
    #[serde(default = "default_chapters")]
    pub chapters: u32,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            name: default_book_name(),
            chapters: default_chapters(),
        }
    }
}

fn default_book_name() -> String {
    "Proverbs".to_string()
}
fn default_chapters() -> u32 {
    31
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SourcesConfig {
    #[serde(default)]
    pub bundled: BundledSourceConfig,
    #[serde(default)]
    pub remote_api: RemoteApiConfig,
    #[serde(default)]
    pub remote_file: RemoteFileConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct BundledSourceConfig {
    /// JSON dataset; the bundled source is skipped when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RemoteApiConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    #[serde(default = "default_translation")]
    pub translation: String,
    #[serde(default = "default_book_abbrev")]
    pub book: String,
    #[serde(default = "default_source_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RemoteApiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_api_base_url(),
            translation: default_translation(),
            book: default_book_abbrev(),
            timeout_secs: default_source_timeout_secs(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://www.abibliadigital.com.br/api".to_string()
}
fn default_translation() -> String {
    "nvi".to_string()
}
fn default_book_abbrev() -> String {
    "pv".to_string()
}
fn default_source_timeout_secs() -> u64 {
    15
}

#[derive(Debug, Deserialize, Clone)]
pub struct RemoteFileConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_file_url")]
    pub url: String,
    /// Cache key; bump it when the upstream dataset version changes.
    #[serde(default = "default_cache_key")]
    pub cache_key: String,
    #[serde(default = "default_source_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RemoteFileConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: default_file_url(),
            cache_key: default_cache_key(),
            timeout_secs: default_source_timeout_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_file_url() -> String {
    "https://raw.githubusercontent.com/thiagobodruk/bible/master/json/pt_nvi/pv.json".to_string()
}
fn default_cache_key() -> String {
    "bible_nvi_pv_book_v1".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CacheConfig {
    /// Directory for the file cache. In-memory cache when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneratorConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Resolved key. Never read from the TOML file directly.
    #[serde(skip)]
    pub api_key: Option<String>,
    #[serde(default = "default_generator_base_url")]
    pub base_url: String,
    #[serde(default = "default_metadata_temperature")]
    pub metadata_temperature: f32,
    #[serde(default = "default_full_temperature")]
    pub full_temperature: f32,
    #[serde(default = "default_generator_timeout_secs")]
    pub timeout_secs: u64,
    /// Language the generated prose is written in.
    #[serde(default = "default_language")]
    pub language: String,
    /// Translation named in prompts, e.g. `"NVI"`.
    #[serde(default = "default_translation_label")]
    pub translation_label: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            api_key: None,
            base_url: default_generator_base_url(),
            metadata_temperature: default_metadata_temperature(),
            full_temperature: default_full_temperature(),
            timeout_secs: default_generator_timeout_secs(),
            language: default_language(),
            translation_label: default_translation_label(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}
fn default_generator_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}
fn default_metadata_temperature() -> f32 {
    0.7
}
fn default_full_temperature() -> f32 {
    0.2
}
fn default_generator_timeout_secs() -> u64 {
    60
}
fn default_language() -> String {
    "English".to_string()
}
fn default_translation_label() -> String {
    "NVI".to_string()
}

impl GeneratorConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7490".to_string()
}

impl Config {
    /// All-defaults config: no bundled data, remote file on, generator off.
    pub fn minimal() -> Self {
        Self {
            book: BookConfig::default(),
            sources: SourcesConfig::default(),
            cache: CacheConfig::default(),
            generator: GeneratorConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config = parse_config(&content)?;
    config.generator.api_key = std::env::var(&config.generator.api_key_env).ok();

    if config.generator.is_enabled() && config.generator.api_key.is_none() {
        anyhow::bail!(
            "{} environment variable not set (required by generator provider '{}')",
            config.generator.api_key_env,
            config.generator.provider
        );
    }

    Ok(config)
}

/// Parse and validate a TOML config. Does not touch the environment.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.book.chapters == 0 {
        anyhow::bail!("book.chapters must be >= 1");
    }
    if config.book.name.trim().is_empty() {
        anyhow::bail!("book.name must not be empty");
    }

    let remote_file = &config.sources.remote_file;
    if remote_file.enabled && remote_file.cache_key.trim().is_empty() {
        anyhow::bail!("sources.remote_file.cache_key must not be empty");
    }

    let generator = &config.generator;
    for (name, t) in [
        ("metadata_temperature", generator.metadata_temperature),
        ("full_temperature", generator.full_temperature),
    ] {
        if !(0.0..=2.0).contains(&t) {
            anyhow::bail!("generator.{} must be in [0.0, 2.0]", name);
        }
    }

    match generator.provider.as_str() {
        "disabled" => {}
        "gemini" => {
            if generator.model.trim().is_empty() {
                anyhow::bail!("generator.model must be specified when provider is 'gemini'");
            }
        }
        other => anyhow::bail!(
            "Unknown generator provider: '{}'. Must be disabled or gemini.",
            other
        ),
    }

    Ok(())
}
