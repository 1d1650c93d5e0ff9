use config::{Config as ConfigLoader, ConfigError, Environment, File};
use relay_openai::config::OPENAI_API_BASE;
use relay_openai::OpenAIConfig;
use relay_turn::PollPolicy;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub openai: OpenAISettings,
    #[serde(default)]
    pub poll: PollSettings,
    #[serde(default)]
    pub logging: LoggingConfig,

    // Secrets (from ENV only)
    #[serde(default)]
    pub openai_api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAISettings {
    pub base_url: String,
    pub organization: Option<String>,
    /// Model used by `create_assistant` when the caller names none
    pub default_model: String,
    pub request_timeout_secs: u64,
}

impl Default for OpenAISettings {
    fn default() -> Self {
        Self {
            base_url: OPENAI_API_BASE.to_string(),
            organization: None,
            default_model: "gpt-4o".to_string(),
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    pub interval_ms: u64,
    pub max_interval_ms: u64,
    pub backoff_factor: f64,
    pub max_attempts: u32,
    pub max_wait_secs: u64,
    pub transient_retries: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        let policy = PollPolicy::default();
        Self {
            interval_ms: policy.interval.as_millis() as u64,
            max_interval_ms: policy.max_interval.as_millis() as u64,
            backoff_factor: policy.backoff_factor,
            max_attempts: policy.max_attempts,
            max_wait_secs: policy.max_wait.as_secs(),
            transient_retries: policy.transient_retries,
        }
    }
}

impl From<&PollSettings> for PollPolicy {
    fn from(settings: &PollSettings) -> Self {
        PollPolicy::new()
            .with_interval(Duration::from_millis(settings.interval_ms))
            .with_max_interval(Duration::from_millis(settings.max_interval_ms))
            .with_backoff_factor(settings.backoff_factor)
            .with_max_attempts(settings.max_attempts)
            .with_max_wait(Duration::from_secs(settings.max_wait_secs))
            .with_transient_retries(settings.transient_retries)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. {RELAY_CONFIG_DIR}/default.toml
    /// 2. {RELAY_CONFIG_DIR}/{ENV}.toml
    /// 3. Environment variables such as `RELAY_POLL__MAX_ATTEMPTS`
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());
        let dir = std::env::var("RELAY_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        let builder = ConfigLoader::builder()
            // 1. Load default config
            .add_source(File::with_name(&format!("{}/default", dir)).required(false))
            // 2. Load environment-specific config
            .add_source(File::with_name(&format!("{}/{}", dir, env)).required(false))
            // 3. Environment variables override everything
            .add_source(
                Environment::with_prefix("RELAY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut cfg: Config = builder.build()?.try_deserialize()?;

        // Load secrets from ENV (not in TOML)
        cfg.openai_api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ConfigError::Message("OPENAI_API_KEY environment variable is required".to_string())
            })?;

        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));

        let config = builder.build()?;
        config.try_deserialize()
    }

    pub fn openai_config(&self) -> OpenAIConfig {
        let mut config = OpenAIConfig::new(self.openai_api_key.clone())
            .with_base_url(self.openai.base_url.clone())
            .with_request_timeout(Duration::from_secs(self.openai.request_timeout_secs));
        if let Some(org) = self.openai.organization.as_deref().filter(|o| !o.is_empty()) {
            config = config.with_organization(org);
        }
        config
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::from(&self.poll)
    }
}
