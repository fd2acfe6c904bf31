//! TOML configuration for the `replykit` service.
//!
//! Every section and field is optional; missing values fall back to the
//! defaults below. `OPENAI_API_KEY` overrides `openai.api_key`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use replykit_rag::openai::{DEFAULT_CHAT_MODEL, DEFAULT_DIMENSIONS, DEFAULT_EMBEDDING_MODEL};
use replykit_rag::{DEFAULT_TEMPERATURE, DEFAULT_TOP_K, RagConfig, SelectionPolicy};
use replykit_telemetry::{DEFAULT_TRACE_CAPACITY, LogFormat};
use serde::Deserialize;

/// Config file read when `--config` is not given, if present.
pub const DEFAULT_CONFIG_PATH: &str = "replykit.toml";

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerSection,
    pub index: IndexSection,
    pub openai: OpenAISection,
    pub prompt: PromptSection,
    pub retrieval: RetrievalSection,
    pub telemetry: TelemetrySection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 5000 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexSection {
    pub path: PathBuf,
    pub collection: String,
    pub dimensions: usize,
}

impl Default for IndexSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("index"),
            collection: "tweet_amazon_collection".to_string(),
            dimensions: DEFAULT_DIMENSIONS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OpenAISection {
    pub api_key: String,
    pub base_url: Option<String>,
    pub embedding_model: String,
    pub chat_model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Default for OpenAISection {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: None,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PromptSection {
    pub brand: String,
    pub channel: String,
    /// How many retrieved exchanges go into the prompt.
    pub top_pairs: usize,
}

impl Default for PromptSection {
    fn default() -> Self {
        Self { brand: "Amazon".to_string(), channel: "Twitter".to_string(), top_pairs: 1 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrievalSection {
    pub top_k: usize,
    pub embed_timeout_secs: Option<u64>,
    pub generation_timeout_secs: Option<u64>,
}

impl Default for RetrievalSection {
    fn default() -> Self {
        Self { top_k: DEFAULT_TOP_K, embed_timeout_secs: None, generation_timeout_secs: None }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetrySection {
    pub format: LogFormat,
    pub trace_capacity: usize,
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self { format: LogFormat::Pretty, trace_capacity: DEFAULT_TRACE_CAPACITY }
    }
}

impl AppConfig {
    /// Load configuration from `path`, or from [`DEFAULT_CONFIG_PATH`] if it
    /// exists, then apply environment overrides.
    ///
    /// An explicitly given path must exist.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply overrides from the environment, looked up through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.is_empty()) {
            self.openai.api_key = key;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.openai.api_key.trim().is_empty() {
            bail!("an OpenAI API key is required (set {API_KEY_ENV} or openai.api_key)");
        }
        if !(0.0..=2.0).contains(&self.openai.temperature) {
            bail!("openai.temperature must be within [0, 2], got {}", self.openai.temperature);
        }
        if self.index.dimensions == 0 {
            bail!("index.dimensions must be greater than zero");
        }
        if self.retrieval.top_k == 0 {
            bail!("retrieval.top_k must be greater than zero");
        }
        if self.prompt.top_pairs == 0 {
            bail!("prompt.top_pairs must be greater than zero");
        }
        Ok(())
    }

    pub fn selection(&self) -> SelectionPolicy {
        match self.prompt.top_pairs {
            1 => SelectionPolicy::Closest,
            n => SelectionPolicy::Top(n),
        }
    }

    pub fn rag_config(&self) -> anyhow::Result<RagConfig> {
        let mut builder = RagConfig::builder()
            .top_k(self.retrieval.top_k)
            .selection(self.selection());
        if let Some(secs) = self.retrieval.embed_timeout_secs {
            builder = builder.embed_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.retrieval.generation_timeout_secs {
            builder = builder.generation_timeout(Duration::from_secs(secs));
        }
        builder.build().context("invalid retrieval settings")
    }
}
