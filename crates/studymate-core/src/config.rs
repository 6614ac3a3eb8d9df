//! Configuration loader and path helpers.
//!
//! Uses Figment to merge compiled defaults + `config.toml` +
//! `config.<env>.toml` + `APP_*` env vars (`__` separates nested keys, e.g.
//! `APP_EMBEDDING__PROVIDER=hash`).

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Which embedding provider backs the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddingProvider {
    /// Deterministic feature hashing; no model files required.
    #[default]
    Hash,
    /// Local BGE-M3 weights run through candle.
    BgeM3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProvider,
    /// Dimension of the hashing provider. The model provider has a fixed dimension.
    pub dim: usize,
    pub model_dir: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { provider: EmbeddingProvider::Hash, dim: 1024, model_dir: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Window length in characters.
    pub chunk_size: usize,
    /// Characters shared by consecutive windows.
    pub overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self { chunk_size: 500, overlap: 100 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub max_context_chars: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 3, max_context_chars: 3000 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatsonxSettings {
    pub url: String,
    pub iam_url: String,
    pub api_key: Option<String>,
    pub project_id: Option<String>,
    pub model_id: String,
    pub max_new_tokens: u32,
    pub timeout_secs: u64,
    pub retry_attempts: u32,
}

impl Default for WatsonxSettings {
    fn default() -> Self {
        Self {
            url: "https://us-south.ml.cloud.ibm.com".to_string(),
            iam_url: "https://iam.cloud.ibm.com".to_string(),
            api_key: None,
            project_id: None,
            model_id: "mistralai/mixtral-8x7b-instruct-v01".to_string(),
            max_new_tokens: 512,
            timeout_secs: 60,
            retry_attempts: 3,
        }
    }
}

impl WatsonxSettings {
    /// True when both credentials needed to call the service are present.
    pub fn is_configured(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.api_key) && present(&self.project_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkingSettings,
    pub retrieval: RetrievalSettings,
    pub watsonx: WatsonxSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.embedding.dim == 0 {
            return Err(Error::InvalidConfig("embedding.dim must be at least 1".into()));
        }
        if self.chunking.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunking.chunk_size must be at least 1".into()));
        }
        if self.chunking.overlap >= self.chunking.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunking.overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.overlap, self.chunking.chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k must be at least 1".into()));
        }
        if self.retrieval.max_context_chars == 0 {
            return Err(Error::InvalidConfig("retrieval.max_context_chars must be at least 1".into()));
        }
        Ok(())
    }
}

/// Keys whose `APP_*` values are taken verbatim instead of parsed.
const CREDENTIAL_KEYS: [&str; 2] = ["watsonx.api_key", "watsonx.project_id"];

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__").ignore(&CREDENTIAL_KEYS));

        // Credentials are opaque strings: `APP_WATSONX__PROJECT_ID=0042` must not
        // be parsed as an integer.
        for key in CREDENTIAL_KEYS {
            let var = format!("APP_{}", key.replace('.', "__").to_ascii_uppercase());
            if let Ok(value) = env::var(&var) {
                figment = figment.merge(Serialized::default(key, value));
            }
        }

        Ok(Self { figment })
    }

    /// Build a config from an explicit provider stack, on top of the defaults.
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment: Figment::from(Serialized::defaults(Settings::default())).merge(figment) }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extract and validate the full typed settings tree.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
