//! Configuration module for gdrelay.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! environment overrides using the deployment's variable names, validation,
//! defaults, and a builder pattern for programmatic use.
//!
//! The configuration is loaded once at process start and passed by reference
//! into each component's constructor.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Channel token used when none is configured. Must be overridden in production.
pub const DEFAULT_CHANNEL_TOKEN: &str = "secret-123";

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for gdrelay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub drive: DriveConfig,
    pub ingestion: IngestionConfig,
    pub webhook: WebhookConfig,
    pub server: ServerConfig,
    pub state: StateConfig,
    pub logging: LoggingConfig,
}

/// Google Drive API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Base URL of the Drive v3 REST API.
    pub api_base: String,
    /// Static bearer token. When unset, tokens come from the metadata server.
    pub access_token: Option<String>,
    /// Metadata server endpoint issuing service-account tokens.
    pub metadata_token_url: String,
    /// Change records requested per page.
    pub page_size: u32,
    /// Upper bound on change pages followed in one cycle.
    pub max_pages_per_cycle: u32,
    /// Google Cloud project the service runs in; informational only.
    pub project: Option<String>,
}

/// Knowledge-base ingestion (Dify dataset API) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Base URL of the Dify API, without the `/v1` suffix.
    pub api_base: String,
    /// Target dataset (knowledge base) ID.
    pub dataset_id: Option<String>,
    /// Dataset API key.
    pub api_key: Option<String>,
    /// Upper bound on each upload request, in seconds.
    pub timeout_secs: u64,
    /// Indexing technique sent on the enriched retry: `high_quality` or `economy`.
    pub indexing_technique: String,
}

/// Push-notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Externally reachable HTTPS base URL of this service.
    pub public_url: Option<String>,
    /// Shared secret echoed by Drive in `X-Goog-Channel-Token`.
    pub channel_token: String,
    /// Only relay files whose parents contain this folder ID.
    pub target_folder_id: Option<String>,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `0.0.0.0:8080`.
    pub bind: String,
}

/// Cursor store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Path to the SQLite database holding the relay document.
    pub database: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/gdrelay/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("gdrelay")
            .join("config.yaml")
    }

    /// Applies overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Applies overrides from `lookup`, which maps a variable name to its value.
    ///
    /// Values are trimmed; empty values clear optional settings.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string());
        let non_empty = |v: String| if v.is_empty() { None } else { Some(v) };

        if let Some(v) = get("DIFY_API").and_then(non_empty) {
            self.ingestion.api_base = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = get("DIFY_DATASET_ID") {
            self.ingestion.dataset_id = non_empty(v);
        }
        if let Some(v) = get("DIFY_API_KEY") {
            self.ingestion.api_key = non_empty(v);
        }
        if let Some(v) = get("WEBHOOK_URL") {
            self.webhook.public_url = non_empty(v);
        }
        // The channel token is not trimmed: it must match the header byte for byte
        if let Some(v) = lookup("CHANNEL_TOKEN") {
            self.webhook.channel_token = v;
        }
        if let Some(v) = get("TARGET_FOLDER_ID") {
            self.webhook.target_folder_id = non_empty(v);
        }
        if let Some(v) = get("DRIVE_API").and_then(non_empty) {
            self.drive.api_base = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = get("DRIVE_ACCESS_TOKEN") {
            self.drive.access_token = non_empty(v);
        }
        if let Some(v) = get("GOOGLE_CLOUD_PROJECT") {
            self.drive.project = non_empty(v);
        }
        if let Some(port) = get("PORT").and_then(non_empty) {
            self.server.bind = format!("0.0.0.0:{port}");
        }
        if let Some(v) = get("GDRELAY_DB").and_then(non_empty) {
            self.state.database = PathBuf::from(v);
        }
        if let Some(v) = get("LOG_FORMAT") {
            self.logging.json = v.eq_ignore_ascii_case("json");
        }
    }

    /// The configured folder restriction, if any.
    pub fn target_folder(&self) -> Option<&str> {
        self.webhook
            .target_folder_id
            .as_deref()
            .filter(|id| !id.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_base: "https://www.googleapis.com/drive/v3".to_string(),
            access_token: None,
            metadata_token_url: "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token".to_string(),
            page_size: 100,
            max_pages_per_cycle: 20,
            project: None,
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.dify.ai".to_string(),
            dataset_id: None,
            api_key: None,
            timeout_secs: 120,
            indexing_technique: "high_quality".to_string(),
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            public_url: None,
            channel_token: DEFAULT_CHANNEL_TOKEN.to_string(),
            target_folder_id: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            database: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("gdrelay")
                .join("state.db"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"drive.page_size"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `ingestion.indexing_technique`.
const VALID_INDEXING_TECHNIQUES: &[&str] = &["high_quality", "economy"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid. Missing credentials
    /// are not validation errors: they are reported when first used.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- drive ---
        if self.drive.page_size == 0 || self.drive.page_size > 1000 {
            errors.push(ValidationError {
                field: "drive.page_size".into(),
                message: "must be in range 1..=1000".into(),
            });
        }
        if self.drive.max_pages_per_cycle == 0 {
            errors.push(ValidationError {
                field: "drive.max_pages_per_cycle".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.drive.api_base.is_empty() {
            errors.push(ValidationError {
                field: "drive.api_base".into(),
                message: "must not be empty".into(),
            });
        }

        // --- ingestion ---
        if self.ingestion.timeout_secs == 0 {
            errors.push(ValidationError {
                field: "ingestion.timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        if !VALID_INDEXING_TECHNIQUES.contains(&self.ingestion.indexing_technique.as_str()) {
            errors.push(ValidationError {
                field: "ingestion.indexing_technique".into(),
                message: format!(
                    "invalid technique '{}'; valid options: {}",
                    self.ingestion.indexing_technique,
                    VALID_INDEXING_TECHNIQUES.join(", ")
                ),
            });
        }

        // --- webhook ---
        if self.webhook.channel_token.is_empty() {
            errors.push(ValidationError {
                field: "webhook.channel_token".into(),
                message: "must not be empty".into(),
            });
        }
        // --- server ---
        if self.server.bind.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError {
                field: "server.bind".into(),
                message: format!("not a socket address: '{}'", self.server.bind),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }

    /// Non-fatal findings worth logging at startup.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.webhook.channel_token == DEFAULT_CHANNEL_TOKEN {
            warnings.push("webhook.channel_token is the built-in default; set CHANNEL_TOKEN".into());
        }
        match &self.webhook.public_url {
            None => warnings.push("webhook.public_url is not set; /init will fail".into()),
            Some(url) if !url.starts_with("https://") => warnings.push(format!(
                "webhook.public_url '{url}' is not https://; /init will fail"
            )),
            Some(_) => {}
        }
        if self.ingestion.api_key.is_none() || self.ingestion.dataset_id.is_none() {
            warnings.push("ingestion credentials are incomplete; uploads will fail".into());
        }
        warnings
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use gdrelay_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .webhook_public_url("https://relay.example.run.app")
///     .webhook_channel_token("s3cr3t")
///     .ingestion_dataset_id("ds-1")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- drive ---

    pub fn drive_api_base(mut self, url: impl Into<String>) -> Self {
        self.config.drive.api_base = url.into();
        self
    }

    pub fn drive_access_token(mut self, token: impl Into<String>) -> Self {
        self.config.drive.access_token = Some(token.into());
        self
    }

    pub fn drive_metadata_token_url(mut self, url: impl Into<String>) -> Self {
        self.config.drive.metadata_token_url = url.into();
        self
    }

    pub fn drive_page_size(mut self, n: u32) -> Self {
        self.config.drive.page_size = n;
        self
    }

    pub fn drive_max_pages_per_cycle(mut self, n: u32) -> Self {
        self.config.drive.max_pages_per_cycle = n;
        self
    }

    pub fn drive_project(mut self, project: impl Into<String>) -> Self {
        self.config.drive.project = Some(project.into());
        self
    }

    // --- ingestion ---

    pub fn ingestion_api_base(mut self, url: impl Into<String>) -> Self {
        self.config.ingestion.api_base = url.into();
        self
    }

    pub fn ingestion_dataset_id(mut self, id: impl Into<String>) -> Self {
        self.config.ingestion.dataset_id = Some(id.into());
        self
    }

    pub fn ingestion_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.ingestion.api_key = Some(key.into());
        self
    }

    pub fn ingestion_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ingestion.timeout_secs = secs;
        self
    }

    // --- webhook ---

    pub fn webhook_public_url(mut self, url: impl Into<String>) -> Self {
        self.config.webhook.public_url = Some(url.into());
        self
    }

    pub fn webhook_channel_token(mut self, token: impl Into<String>) -> Self {
        self.config.webhook.channel_token = token.into();
        self
    }

    pub fn webhook_target_folder_id(mut self, id: impl Into<String>) -> Self {
        self.config.webhook.target_folder_id = Some(id.into());
        self
    }

    // --- server / state / logging ---

    pub fn server_bind(mut self, addr: impl Into<String>) -> Self {
        self.config.server.bind = addr.into();
        self
    }

    pub fn state_database(mut self, path: PathBuf) -> Self {
        self.config.state.database = path;
        self
    }

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_json(mut self, json: bool) -> Self {
        self.config.logging.json = json;
        self
    }

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
