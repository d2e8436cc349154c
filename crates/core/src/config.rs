//! Configuration management for docchat.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Defaults
//! - Config file (.docchat/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric: the corpus index, prompt overrides
//! and config file all live under `<workspace>/.docchat/`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Providers the completion factory knows how to build.
pub const KNOWN_PROVIDERS: [&str; 2] = ["ollama", "openai"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .docchat/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Completion provider ("ollama", "openai")
    pub provider: String,

    /// Custom completion endpoint (provider default when unset)
    pub endpoint: Option<String>,

    /// Selected model identifier from the model catalog
    pub model: String,

    /// Catalog identifier -> backend model tag
    pub model_aliases: HashMap<String, String>,

    /// Explicit API key (DOCCHAT_API_KEY)
    pub api_key: Option<String>,

    /// Name of the env var holding the provider API key
    pub api_key_env: Option<String>,

    /// Conversation defaults
    pub chat: ChatConfig,

    /// Embedding model used for the corpus and for queries
    pub embedding: EmbeddingConfig,

    /// Corpus index settings
    pub corpus: CorpusConfig,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Conversation defaults applied to every new session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Chunks retrieved per question (K)
    pub num_chunks: usize,

    /// Conversation turns considered for history (W)
    pub slide_window: usize,

    /// Fold prior turns into retrieval and the answer prompt
    pub use_history: bool,

    /// Surface intermediate summaries on the debug channel
    pub debug: bool,

    /// Language the assistant answers in
    pub language: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            num_chunks: 3,
            slide_window: 7,
            use_history: true,
            debug: true,
            language: "Spanish".to_string(),
        }
    }
}

/// Embedding provider configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Provider name: "mock", "ollama"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Custom endpoint for remote providers
    pub endpoint: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
        }
    }
}

/// Corpus index configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// SQLite index file; relative paths resolve against the workspace
    pub index_path: Option<PathBuf>,

    /// Characters per chunk at ingestion
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks
    pub chunk_overlap: usize,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            index_path: None,
            chunk_size: 1512,
            chunk_overlap: 256,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmSection>,
    chat: Option<ChatSection>,
    embedding: Option<EmbeddingSection>,
    corpus: Option<CorpusSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LlmSection {
    provider: Option<String>,
    endpoint: Option<String>,
    api_key_env: Option<String>,
    model: Option<String>,
    #[serde(default)]
    model_aliases: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatSection {
    num_chunks: Option<usize>,
    slide_window: Option<usize>,
    use_history: Option<bool>,
    debug: Option<bool>,
    language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EmbeddingSection {
    provider: Option<String>,
    model: Option<String>,
    dimensions: Option<usize>,
    endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CorpusSection {
    index_path: Option<PathBuf>,
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(),
            endpoint: None,
            model: "mixtral-8x7b".to_string(),
            model_aliases: HashMap::new(),
            api_key: None,
            api_key_env: None,
            chat: ChatConfig::default(),
            embedding: EmbeddingConfig::default(),
            corpus: CorpusConfig::default(),
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML config file and environment variables.
    ///
    /// Environment variables:
    /// - `DOCCHAT_WORKSPACE`: Override workspace path
    /// - `DOCCHAT_CONFIG`: Path to config file
    /// - `DOCCHAT_PROVIDER`: Completion provider
    /// - `DOCCHAT_MODEL`: Model identifier
    /// - `DOCCHAT_API_KEY`: API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Like [`AppConfig::load`], with the workspace and config file chosen up front.
    ///
    /// Explicit paths win over `DOCCHAT_WORKSPACE` and `DOCCHAT_CONFIG`, so the
    /// YAML file read is the one the command line points at.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) =
            workspace.or_else(|| std::env::var("DOCCHAT_WORKSPACE").ok().map(PathBuf::from))
        {
            config.workspace = workspace;
        }

        if let Some(config_file) =
            config_file.or_else(|| std::env::var("DOCCHAT_CONFIG").ok().map(PathBuf::from))
        {
            config.config_file = Some(config_file);
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.docchat_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("DOCCHAT_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("DOCCHAT_MODEL") {
            config.model = model;
        }

        config.api_key = std::env::var("DOCCHAT_API_KEY").ok();
        config.log_level = std::env::var("RUST_LOG").ok().or(config.log_level);

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into a copy of this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        Ok(self.merged_with(config_file))
    }

    fn merged_with(&self, file: ConfigFile) -> Self {
        let mut result = self.clone();

        if let Some(llm) = file.llm {
            if let Some(provider) = llm.provider {
                result.provider = provider;
            }
            if llm.endpoint.is_some() {
                result.endpoint = llm.endpoint;
            }
            if llm.api_key_env.is_some() {
                result.api_key_env = llm.api_key_env;
            }
            if let Some(model) = llm.model {
                result.model = model;
            }
            result.model_aliases.extend(llm.model_aliases);
        }

        if let Some(chat) = file.chat {
            if let Some(num_chunks) = chat.num_chunks {
                result.chat.num_chunks = num_chunks;
            }
            if let Some(slide_window) = chat.slide_window {
                result.chat.slide_window = slide_window;
            }
            if let Some(use_history) = chat.use_history {
                result.chat.use_history = use_history;
            }
            if let Some(debug) = chat.debug {
                result.chat.debug = debug;
            }
            if let Some(language) = chat.language {
                result.chat.language = language;
            }
        }

        if let Some(embedding) = file.embedding {
            if let Some(provider) = embedding.provider {
                result.embedding.provider = provider;
            }
            if let Some(model) = embedding.model {
                result.embedding.model = model;
            }
            if let Some(dimensions) = embedding.dimensions {
                result.embedding.dimensions = dimensions;
            }
            if embedding.endpoint.is_some() {
                result.embedding.endpoint = embedding.endpoint;
            }
        }

        if let Some(corpus) = file.corpus {
            if corpus.index_path.is_some() {
                result.corpus.index_path = corpus.index_path;
            }
            if let Some(chunk_size) = corpus.chunk_size {
                result.corpus.chunk_size = chunk_size;
            }
            if let Some(chunk_overlap) = corpus.chunk_overlap {
                result.corpus.chunk_overlap = chunk_overlap;
            }
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        result
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .docchat directory.
    pub fn docchat_dir(&self) -> PathBuf {
        self.workspace.join(".docchat")
    }

    /// Ensure the .docchat directory exists.
    pub fn ensure_docchat_dir(&self) -> AppResult<()> {
        let dir = self.docchat_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .docchat directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Resolve the SQLite index location.
    pub fn index_path(&self) -> PathBuf {
        match self.corpus.index_path {
            Some(ref path) if path.is_absolute() => path.clone(),
            Some(ref path) => self.workspace.join(path),
            None => self.docchat_dir().join("corpus.sqlite"),
        }
    }

    /// Resolve the API key: `DOCCHAT_API_KEY` first, then the configured env var.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        self.api_key_env
            .as_ref()
            .and_then(|env_var| std::env::var(env_var).ok())
    }

    /// Validate the merged configuration.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if self.chat.num_chunks == 0 {
            return Err(AppError::Config(
                "chat.numChunks must be at least 1".to_string(),
            ));
        }

        if self.chat.slide_window == 0 {
            return Err(AppError::Config(
                "chat.slideWindow must be at least 1".to_string(),
            ));
        }

        if self.corpus.chunk_overlap >= self.corpus.chunk_size {
            return Err(AppError::Config(format!(
                "corpus.chunkOverlap ({}) must be smaller than corpus.chunkSize ({})",
                self.corpus.chunk_overlap, self.corpus.chunk_size
            )));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "embedding.dimensions must be positive".to_string(),
            ));
        }

        if self.provider == "openai" && self.resolve_api_key().is_none() {
            return Err(AppError::Config(
                "Provider 'openai' requires an API key (DOCCHAT_API_KEY or llm.apiKeyEnv)"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "mixtral-8x7b");
        assert_eq!(config.chat.num_chunks, 3);
        assert_eq!(config.chat.slide_window, 7);
        assert!(config.chat.use_history);
        assert!(config.chat.debug);
        assert!(!config.verbose);
    }

    #[test]
    fn test_index_path_defaults_under_docchat_dir() {
        let config = AppConfig::default();
        assert!(config.index_path().ends_with(".docchat/corpus.sqlite"));
    }

    #[test]
    fn test_relative_index_path_resolves_against_workspace() {
        let mut config = AppConfig::default();
        config.workspace = PathBuf::from("/srv/docs");
        config.corpus.index_path = Some(PathBuf::from("data/index.sqlite"));
        assert_eq!(
            config.index_path(),
            PathBuf::from("/srv/docs/data/index.sqlite")
        );
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            None,
            None,
            Some("openai".to_string()),
            Some("llama3-70b".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.provider, "openai");
        assert_eq!(overridden.model, "llama3-70b");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
llm:
  provider: ollama
  endpoint: http://gpu-box:11434
  model: mistral-7b
  modelAliases:
    mistral-7b: "mistral:7b"
chat:
  numChunks: 5
  slideWindow: 3
  useHistory: false
  language: English
embedding:
  provider: ollama
  model: nomic-embed-text
  dimensions: 768
corpus:
  chunkSize: 800
  chunkOverlap: 100
logging:
  level: warn
  color: false
"#,
        )
        .unwrap();

        let merged = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(merged.endpoint.as_deref(), Some("http://gpu-box:11434"));
        assert_eq!(merged.model, "mistral-7b");
        assert_eq!(
            merged.model_aliases.get("mistral-7b").map(String::as_str),
            Some("mistral:7b")
        );
        assert!(!merged.model_aliases.contains_key("gemma-7b"));
        assert_eq!(merged.chat.num_chunks, 5);
        assert_eq!(merged.chat.slide_window, 3);
        assert!(!merged.chat.use_history);
        assert!(merged.chat.debug);
        assert_eq!(merged.chat.language, "English");
        assert_eq!(merged.embedding.dimensions, 768);
        assert_eq!(merged.corpus.chunk_size, 800);
        assert_eq!(merged.log_level.as_deref(), Some("warn"));
        assert!(merged.no_color);
    }

    #[test]
    fn test_load_from_explicit_workspace() {
        let temp_dir = TempDir::new().unwrap();
        let docchat_dir = temp_dir.path().join(".docchat");
        std::fs::create_dir_all(&docchat_dir).unwrap();
        std::fs::write(
            docchat_dir.join("config.yaml"),
            "chat:\n  numChunks: 5\n  language: English\n",
        )
        .unwrap();

        let config = AppConfig::load_from(Some(temp_dir.path().to_path_buf()), None).unwrap();
        assert_eq!(config.workspace, temp_dir.path());
        assert_eq!(config.chat.num_chunks, 5);
        assert_eq!(config.chat.language, "English");
    }

    #[test]
    fn test_load_from_missing_workspace() {
        let result = AppConfig::load_from(Some(PathBuf::from("/nonexistent/docchat-ws")), None);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_merge_invalid_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "chat: [unclosed").unwrap();
        assert!(AppConfig::default().merge_yaml(&path).is_err());
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_ollama() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_chunks() {
        let mut config = AppConfig::default();
        config.chat.num_chunks = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_overlap_not_smaller_than_chunk() {
        let mut config = AppConfig::default();
        config.corpus.chunk_overlap = config.corpus.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_openai_with_explicit_key_validates() {
        let mut config = AppConfig::default();
        config.provider = "openai".to_string();
        config.api_key = Some("sk-test".to_string());
        assert!(config.validate().is_ok());
    }
}
