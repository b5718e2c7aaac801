//! lexner Configuration Management
//!
//! Handles configuration from environment variables and TOML files
//! with defaults that match the corpus layout used by the batch scripts.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// External extraction service configuration
    pub llm: LlmConfig,

    /// Batch extraction configuration
    pub extraction: ExtractionConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // LLM
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.provider = provider.parse()?;
        }
        if let Ok(model) = std::env::var("LLM_MODEL") {
            config.llm.model = model;
        }
        if let Ok(secs) = std::env::var("LLM_TIMEOUT_SECS") {
            config.llm.timeout_secs = parse_var("LLM_TIMEOUT_SECS", secs)?;
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.llm.openai_api_key = Some(key);
        }
        if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
            config.llm.openai_base_url = Some(url);
        }
        if let Ok(key) =
            std::env::var("GEMINI_API_KEY").or_else(|_| std::env::var("LANGEXTRACT_API_KEY"))
        {
            config.llm.gemini_api_key = Some(key);
        }
        if let Ok(url) = std::env::var("OLLAMA_URL") {
            config.llm.ollama_url = url;
        }

        // Extraction
        if let Ok(dir) = std::env::var("LEXNER_INPUT_DIR") {
            config.extraction.input_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("LEXNER_OUTPUT_DIR") {
            config.extraction.output_dir = PathBuf::from(dir);
        }
        if let Ok(n) = std::env::var("LEXNER_CONCURRENCY") {
            config.extraction.concurrency = parse_var("LEXNER_CONCURRENCY", n)?;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            config.logging.json_format = format.eq_ignore_ascii_case("json");
        }

        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        let env_config = Self::from_env()?;
        let defaults = Self::default();

        // Only override if env values differ from defaults
        if env_config.llm.provider != defaults.llm.provider {
            self.llm.provider = env_config.llm.provider;
        }
        if env_config.llm.model != defaults.llm.model {
            self.llm.model = env_config.llm.model;
        }
        if env_config.llm.timeout_secs != defaults.llm.timeout_secs {
            self.llm.timeout_secs = env_config.llm.timeout_secs;
        }
        if env_config.llm.ollama_url != defaults.llm.ollama_url {
            self.llm.ollama_url = env_config.llm.ollama_url;
        }
        if env_config.extraction.input_dir != defaults.extraction.input_dir {
            self.extraction.input_dir = env_config.extraction.input_dir;
        }
        if env_config.extraction.output_dir != defaults.extraction.output_dir {
            self.extraction.output_dir = env_config.extraction.output_dir;
        }
        if env_config.extraction.concurrency != defaults.extraction.concurrency {
            self.extraction.concurrency = env_config.extraction.concurrency;
        }
        if env_config.logging.level != defaults.logging.level {
            self.logging.level = env_config.logging.level;
        }
        if env_config.logging.json_format {
            self.logging.json_format = true;
        }

        // Always use env for sensitive values
        if env_config.llm.openai_api_key.is_some() {
            self.llm.openai_api_key = env_config.llm.openai_api_key;
        }
        if env_config.llm.openai_base_url.is_some() {
            self.llm.openai_base_url = env_config.llm.openai_base_url;
        }
        if env_config.llm.gemini_api_key.is_some() {
            self.llm.gemini_api_key = env_config.llm.gemini_api_key;
        }

        Ok(self)
    }

    /// Reject values that would make a batch run meaningless
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extraction.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "extraction.concurrency".to_string(),
                value: "0".to_string(),
            });
        }
        if self.llm.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "llm.timeout_secs".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value,
        })
}

/// External extraction service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider to use (`none` disables the external extractor)
    pub provider: LlmProvider,

    /// OpenAI API key
    pub openai_api_key: Option<String>,

    /// OpenAI API base URL (for Azure or compatible APIs)
    pub openai_base_url: Option<String>,

    /// Gemini API key
    pub gemini_api_key: Option<String>,

    /// Gemini API base URL
    pub gemini_base_url: String,

    /// Ollama server URL
    pub ollama_url: String,

    /// Model name to use
    pub model: String,

    /// Maximum tokens for completion
    pub max_tokens: u32,

    /// Temperature for generation
    pub temperature: f32,

    /// Request timeout in seconds, applied to the whole extraction call
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Gemini,
            openai_api_key: None,
            openai_base_url: None,
            gemini_api_key: None,
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            model: "gemini-2.5-flash".to_string(),
            max_tokens: 8192,
            temperature: 0.0,
            timeout_secs: 120,
        }
    }
}

/// Supported extraction service providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Offline: every document goes through the local miner
    None,
    OpenAI,
    Ollama,
    Gemini,
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "offline" => Ok(Self::None),
            "openai" | "azure" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            "gemini" | "google" => Ok(Self::Gemini),
            _ => Err(ConfigError::InvalidValue {
                key: "LLM_PROVIDER".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Batch extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Directory holding the plain-text documents
    pub input_dir: PathBuf,

    /// Directory receiving the JSON and summary artifacts
    pub output_dir: PathBuf,

    /// Extension of input documents (without the dot)
    pub file_extension: String,

    /// Examples listed per type in the summary file
    pub summary_examples: usize,

    /// Cap for the judicial formula span when its closing marker is missing
    pub formula_max_chars: usize,

    /// Documents processed at a time
    pub concurrency: usize,

    /// Locate upstream candidates without offsets in the source text
    pub locate_offsets: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("textos"),
            output_dir: PathBuf::from("documentos procesados"),
            file_extension: "txt".to_string(),
            summary_examples: 50,
            formula_max_chars: 600,
            concurrency: 1,
            locate_offsets: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
