use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_HUGGINGFACE_URL: &str = "https://api-inference.huggingface.co";
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_SUMMARIZATION_MODEL: &str = "facebook/bart-large-cnn";
const DEFAULT_ANALYSIS_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_LOG_FILE: &str = "logs/docsum.log";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// An explicitly requested `.env` file could not be read.
    #[error("Failed to load env file {path}: {message}")]
    EnvFile {
        /// Path that was requested.
        path: String,
        /// Loader error message.
        message: String,
    },
}

/// Runtime configuration for the summarization server.
///
/// Built once at process start and shared read-only through an `Arc`; changing it requires a
/// restart.
#[derive(Debug, Clone)]
pub struct Config {
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Directory that holds transient uploads while a request is processed.
    pub upload_dir: PathBuf,
    /// Largest accepted request body in bytes.
    pub max_upload_bytes: usize,
    /// Origins allowed to call the API from a browser.
    pub allowed_origins: AllowedOrigins,
    /// Backend used for chunked summarization.
    pub summarization_provider: SummarizationProvider,
    /// Model identifier passed to the summarization backend.
    pub summarization_model: String,
    /// API key for the hosted Hugging Face inference endpoint.
    pub huggingface_api_key: Option<String>,
    /// Base URL of the Hugging Face inference API.
    pub huggingface_url: String,
    /// Base URL of the local Ollama runtime.
    pub ollama_url: String,
    /// Unit used to measure chunk sizes.
    pub chunk_unit: ChunkUnit,
    /// Maximum number of units per chunk.
    pub chunk_size: usize,
    /// Minimum trimmed character count a document must have to be summarized.
    pub min_content_chars: usize,
    /// Upper length bound requested from the summarizer for each chunk.
    pub summary_max_length: usize,
    /// Lower length bound requested from the summarizer for each chunk.
    pub summary_min_length: usize,
    /// Timeout applied to every individual backend call.
    pub backend_timeout: Duration,
    /// Number of retries after a retryable backend failure.
    pub backend_max_retries: usize,
    /// Upper bound for the exponential backoff delay between retries.
    pub backend_retry_max_delay: Duration,
    /// API key for the Gemini analysis backend.
    pub gemini_api_key: Option<String>,
    /// Base URL of the Gemini API.
    pub gemini_url: String,
    /// Model identifier used for structured analysis.
    pub analysis_model: String,
    /// Number of characters of document text sent for structured analysis.
    pub analysis_max_chars: usize,
    /// Reject documents the analysis model does not classify as legal before summarizing them.
    pub legal_validation: bool,
    /// Number of leading characters sent to the legal document check.
    pub legal_validation_chars: usize,
    /// File that receives a copy of the log output.
    pub log_file: PathBuf,
}

/// Supported backends for chunked summarization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SummarizationProvider {
    /// Hosted Hugging Face inference API.
    HuggingFace,
    /// Local Ollama runtime.
    Ollama,
}

/// Unit used when bounding chunk sizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkUnit {
    /// Unicode scalar values.
    Characters,
    /// Whitespace-delimited words.
    Words,
}

/// Browser origins permitted by the CORS layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllowedOrigins {
    /// Any origin (`*`).
    Any,
    /// Explicit list of origins such as `http://localhost:8080`.
    List(Vec<String>),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: None,
            upload_dir: env::temp_dir().join("docsum-uploads"),
            max_upload_bytes: 20 * 1024 * 1024,
            allowed_origins: AllowedOrigins::Any,
            summarization_provider: SummarizationProvider::HuggingFace,
            summarization_model: DEFAULT_SUMMARIZATION_MODEL.to_string(),
            huggingface_api_key: None,
            huggingface_url: DEFAULT_HUGGINGFACE_URL.to_string(),
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            chunk_unit: ChunkUnit::Characters,
            chunk_size: 1000,
            min_content_chars: 1,
            summary_max_length: 150,
            summary_min_length: 50,
            backend_timeout: Duration::from_secs(60),
            backend_max_retries: 0,
            backend_retry_max_delay: Duration::from_millis(2000),
            gemini_api_key: None,
            gemini_url: DEFAULT_GEMINI_URL.to_string(),
            analysis_model: DEFAULT_ANALYSIS_MODEL.to_string(),
            analysis_max_chars: 30_000,
            legal_validation: false,
            legal_validation_chars: 2000,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

impl Config {
    /// Parse environment variables without the cross-field and credential checks.
    ///
    /// Unset variables fall back to the values of [`Config::default`]. Offline tooling uses this
    /// to honour chunking settings on machines without backend keys.
    pub fn from_env_unvalidated() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            server_port: load_env_parsed("SERVER_PORT")?,
            upload_dir: load_env_optional("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            max_upload_bytes: load_env_parsed("MAX_UPLOAD_BYTES")?
                .unwrap_or(defaults.max_upload_bytes),
            allowed_origins: load_env_parsed("ALLOWED_ORIGINS")?
                .unwrap_or(defaults.allowed_origins),
            summarization_provider: load_env_parsed("SUMMARIZATION_PROVIDER")?
                .unwrap_or(defaults.summarization_provider),
            summarization_model: load_env_optional("SUMMARIZATION_MODEL")
                .unwrap_or(defaults.summarization_model),
            huggingface_api_key: load_env_optional("HUGGINGFACE_API_KEY"),
            huggingface_url: load_env_optional("HUGGINGFACE_URL")
                .unwrap_or(defaults.huggingface_url),
            ollama_url: load_env_optional("OLLAMA_URL").unwrap_or(defaults.ollama_url),
            chunk_unit: load_env_parsed("CHUNK_UNIT")?.unwrap_or(defaults.chunk_unit),
            chunk_size: load_env_parsed("CHUNK_SIZE")?.unwrap_or(defaults.chunk_size),
            min_content_chars: load_env_parsed("MIN_CONTENT_CHARS")?
                .unwrap_or(defaults.min_content_chars),
            summary_max_length: load_env_parsed("SUMMARY_MAX_LENGTH")?
                .unwrap_or(defaults.summary_max_length),
            summary_min_length: load_env_parsed("SUMMARY_MIN_LENGTH")?
                .unwrap_or(defaults.summary_min_length),
            backend_timeout: load_env_parsed("BACKEND_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.backend_timeout),
            backend_max_retries: load_env_parsed("BACKEND_MAX_RETRIES")?
                .unwrap_or(defaults.backend_max_retries),
            backend_retry_max_delay: load_env_parsed("BACKEND_RETRY_MAX_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.backend_retry_max_delay),
            gemini_api_key: load_env_optional("GEMINI_API_KEY"),
            gemini_url: load_env_optional("GEMINI_URL").unwrap_or(defaults.gemini_url),
            analysis_model: load_env_optional("ANALYSIS_MODEL")
                .unwrap_or(defaults.analysis_model),
            analysis_max_chars: load_env_parsed("ANALYSIS_MAX_CHARS")?
                .unwrap_or(defaults.analysis_max_chars),
            legal_validation: load_env_parsed("LEGAL_VALIDATION")?
                .unwrap_or(defaults.legal_validation),
            legal_validation_chars: load_env_parsed("LEGAL_VALIDATION_CHARS")?
                .unwrap_or(defaults.legal_validation_chars),
            log_file: load_env_optional("DOCSUM_LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_file),
        })
    }

    /// Check cross-field constraints that individual parsers cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidValue("CHUNK_SIZE".into()));
        }
        if self.summary_min_length > self.summary_max_length {
            return Err(ConfigError::InvalidValue("SUMMARY_MIN_LENGTH".into()));
        }
        if self.analysis_max_chars == 0 {
            return Err(ConfigError::InvalidValue("ANALYSIS_MAX_CHARS".into()));
        }
        if self.legal_validation_chars == 0 {
            return Err(ConfigError::InvalidValue("LEGAL_VALIDATION_CHARS".into()));
        }
        if self.legal_validation && self.gemini_api_key.is_none() {
            return Err(ConfigError::MissingVariable("GEMINI_API_KEY".into()));
        }
        if self.summarization_provider == SummarizationProvider::HuggingFace
            && self.huggingface_api_key.is_none()
        {
            return Err(ConfigError::MissingVariable("HUGGINGFACE_API_KEY".into()));
        }
        Ok(())
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_env_parsed<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

impl FromStr for SummarizationProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

impl FromStr for ChunkUnit {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "characters" | "chars" => Ok(Self::Characters),
            "words" => Ok(Self::Words),
            _ => Err(()),
        }
    }
}

impl FromStr for AllowedOrigins {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let origins: Vec<String> = s
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();
        if origins.is_empty() {
            return Err(());
        }
        if origins.iter().any(|origin| origin == "*") {
            return Ok(Self::Any);
        }
        Ok(Self::List(origins))
    }
}

/// Load and validate configuration from the environment.
///
/// Variables from `env_file` are loaded first when given; otherwise a `.env` file in the working
/// directory is used if present. Variables already set in the process environment win.
pub fn load_config(env_file: Option<&Path>) -> Result<Config, ConfigError> {
    let config = read_config(env_file)?;
    config.validate()?;
    Ok(config)
}

/// Like [`load_config`], but skips [`Config::validate`].
pub fn read_config(env_file: Option<&Path>) -> Result<Config, ConfigError> {
    match env_file {
        Some(path) => {
            dotenvy::from_path(path).map_err(|error| ConfigError::EnvFile {
                path: path.display().to_string(),
                message: error.to_string(),
            })?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }
    Config::from_env_unvalidated()
}
