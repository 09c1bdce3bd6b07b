use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_QDRANT_URL: &str = "http://127.0.0.1:6333";
const DEFAULT_COLLECTION_NAME: &str = "resume_collection";
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_EMBEDDING_MODEL: &str = "embeddinggemma";
const DEFAULT_GENERATION_MODEL: &str = "gemma:2b";
const DEFAULT_CHUNK_SIZE: usize = 500;
const DEFAULT_CHUNK_OVERLAP: usize = 200;
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_SERVER_PORT: u16 = 3002;
const DEFAULT_EXTERNAL_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// Values parsed individually but are inconsistent with each other.
    #[error("Inconsistent configuration: {0}")]
    Inconsistent(String),
}

/// Runtime configuration for the pdfchat service.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the Qdrant instance that stores chunk embeddings.
    pub qdrant_url: String,
    /// Collection used when a request does not name one.
    pub qdrant_collection_name: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Base URL of the Ollama runtime serving embeddings and generation.
    pub ollama_url: String,
    /// Model used to embed chunks and questions.
    pub embedding_model: String,
    /// Model used to answer questions.
    pub generation_model: String,
    /// Maximum chunk length, in characters.
    pub text_splitter_chunk_size: usize,
    /// Characters shared between neighbouring chunks.
    pub text_splitter_chunk_overlap: usize,
    /// Directory where uploads are staged while they are processed.
    pub upload_dir: PathBuf,
    /// Port the HTTP server listens on.
    pub server_port: u16,
    /// Deadline applied to every call to Ollama or Qdrant, in seconds.
    pub external_timeout_secs: u64,
    /// Largest request body accepted by `/upload`.
    pub max_upload_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            qdrant_url: load_env_or("QDRANT_URL", DEFAULT_QDRANT_URL),
            qdrant_collection_name: load_env_or("QDRANT_COLLECTION_NAME", DEFAULT_COLLECTION_NAME),
            qdrant_api_key: load_env_optional("QDRANT_API_KEY"),
            ollama_url: load_env_or("OLLAMA_URL", DEFAULT_OLLAMA_URL),
            embedding_model: load_env_or("EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
            generation_model: load_env_or("GENERATION_MODEL", DEFAULT_GENERATION_MODEL),
            text_splitter_chunk_size: load_parsed("TEXT_SPLITTER_CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?,
            text_splitter_chunk_overlap: load_parsed(
                "TEXT_SPLITTER_CHUNK_OVERLAP",
                DEFAULT_CHUNK_OVERLAP,
            )?,
            upload_dir: PathBuf::from(load_env_or("UPLOAD_DIR", DEFAULT_UPLOAD_DIR)),
            server_port: load_parsed("SERVER_PORT", DEFAULT_SERVER_PORT)?,
            external_timeout_secs: load_parsed(
                "EXTERNAL_TIMEOUT_SECS",
                DEFAULT_EXTERNAL_TIMEOUT_SECS,
            )?,
            max_upload_bytes: load_parsed("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.text_splitter_chunk_size == 0 {
            return Err(ConfigError::InvalidValue("TEXT_SPLITTER_CHUNK_SIZE".into()));
        }
        if self.text_splitter_chunk_overlap >= self.text_splitter_chunk_size {
            return Err(ConfigError::Inconsistent(format!(
                "TEXT_SPLITTER_CHUNK_OVERLAP ({}) must be smaller than TEXT_SPLITTER_CHUNK_SIZE ({})",
                self.text_splitter_chunk_overlap, self.text_splitter_chunk_size
            )));
        }
        if self.external_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("EXTERNAL_TIMEOUT_SECS".into()));
        }
        Ok(())
    }

    /// Deadline applied to each external call.
    pub fn external_timeout(&self) -> Duration {
        Duration::from_secs(self.external_timeout_secs)
    }
}

fn load_env_or(key: &str, default: &str) -> String {
    load_env_optional(key).unwrap_or_else(|| default.to_string())
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
        .map(|value| value.unwrap_or(default))
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        qdrant_url = %config.qdrant_url,
        collection = %config.qdrant_collection_name,
        ollama_url = %config.ollama_url,
        embedding_model = %config.embedding_model,
        generation_model = %config.generation_model,
        server_port = config.server_port,
        "Loaded configuration"
    );
    let _ = CONFIG.set(config);
}
