//! Run configuration and provider selection

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_LOCAL_ENDPOINT: &str = "http://localhost:11434/v1/chat/completions";
const DEFAULT_LOCAL_MODEL: &str = "llama3";

/// Backend selection, one variant per provider family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum ProviderConfig {
    #[serde(rename = "openai")]
    OpenAi {
        api_key: String,
        model: String,
        #[serde(default)]
        base_url: Option<String>,
    },
    Anthropic {
        api_key: String,
        model: String,
        #[serde(default)]
        base_url: Option<String>,
    },
    Local { endpoint: String, model: String },
}

impl ProviderConfig {
    pub fn label(&self) -> &'static str {
        match self {
            ProviderConfig::OpenAi { .. } => "openai",
            ProviderConfig::Anthropic { .. } => "anthropic",
            ProviderConfig::Local { .. } => "local",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            ProviderConfig::OpenAi { model, .. }
            | ProviderConfig::Anthropic { model, .. }
            | ProviderConfig::Local { model, .. } => model,
        }
    }
}

/// Configuration for one engine instance
#[derive(Debug, Clone)]
pub struct ForgeConfig {
    /// Retries after the first generation attempt of an artifact
    pub max_attempts: usize,
    /// Worker-pool degree for per-artifact generation
    pub concurrency: usize,
    /// Length floor below which generated content counts as incomplete
    pub min_content_len: usize,
    pub temperature: f32,
    /// Temperature used for the stricter retry attempts
    pub strict_temperature: f32,
    pub provider_timeout: Duration,
    pub storage_dir: PathBuf,
    pub provider: ProviderConfig,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            concurrency: 3,
            min_content_len: 120,
            temperature: 0.7,
            strict_temperature: 0.2,
            provider_timeout: Duration::from_secs(120),
            storage_dir: default_storage_dir(),
            provider: ProviderConfig::Local {
                endpoint: DEFAULT_LOCAL_ENDPOINT.to_string(),
                model: DEFAULT_LOCAL_MODEL.to_string(),
            },
        }
    }
}

impl ForgeConfig {
    /// Load from the process environment, reading a `.env` file first if present
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let model = lookup("APPFORGE_MODEL");

        let provider = match lookup("APPFORGE_PROVIDER")
            .unwrap_or_else(|| "local".to_string())
            .to_lowercase()
            .as_str()
        {
            "openai" => ProviderConfig::OpenAi {
                api_key: require(&lookup, "OPENAI_API_KEY")?,
                model: model.unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
                base_url: lookup("OPENAI_BASE_URL"),
            },
            "anthropic" => ProviderConfig::Anthropic {
                api_key: require(&lookup, "ANTHROPIC_API_KEY")?,
                model: model.unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string()),
                base_url: lookup("ANTHROPIC_BASE_URL"),
            },
            "local" => ProviderConfig::Local {
                endpoint: lookup("APPFORGE_LOCAL_ENDPOINT")
                    .unwrap_or_else(|| DEFAULT_LOCAL_ENDPOINT.to_string()),
                model: model.unwrap_or_else(|| DEFAULT_LOCAL_MODEL.to_string()),
            },
            other => return Err(ConfigError::UnknownProvider(other.to_string())),
        };

        Ok(Self {
            max_attempts: parse_or(&lookup, "APPFORGE_MAX_ATTEMPTS", defaults.max_attempts)?,
            concurrency: parse_or(&lookup, "APPFORGE_CONCURRENCY", defaults.concurrency)?.max(1),
            storage_dir: lookup("APPFORGE_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_dir.clone()),
            provider,
            ..defaults
        })
    }
}

fn require<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingVar(key.to_string()))
}

fn parse_or<F>(lookup: &F, key: &str, default: usize) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            name: key.to_string(),
            value: raw,
        }),
    }
}

fn default_storage_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("appforge").join("projects"))
        .unwrap_or_else(|| PathBuf::from("./projects"))
}
