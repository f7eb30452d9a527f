use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub session: SessionConfig,
    pub chat: ChatConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Sliding inactivity window after which a session is gone.
    pub timeout_mins: u64,
    /// How often the background sweep evicts abandoned sessions.
    pub sweep_interval_mins: u64,
}

#[derive(Clone, Debug)]
pub struct ChatConfig {
    pub transport: TransportMode,
    /// Messages matching one of these (case-insensitive) reset the sender's
    /// session back to a fresh start.
    pub reset_keywords: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Noop,
    Webhook,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub session_timeout_mins: Option<u64>,
    pub sweep_interval_mins: Option<u64>,
    pub transport: Option<TransportMode>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig { timeout_mins: 30, sweep_interval_mins: 10 },
            chat: ChatConfig {
                transport: TransportMode::Noop,
                reset_keywords: vec!["cancel".to_string(), "menu".to_string()],
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for TransportMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "noop" => Ok(Self::Noop),
            "webhook" => Ok(Self::Webhook),
            other => Err(ConfigError::Validation(format!(
                "unsupported transport mode `{other}` (expected noop|webhook)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    /// Layered load: baked-in defaults, then the TOML file (when present),
    /// then `CARTBOT_*` environment variables, then programmatic overrides,
    /// then validation.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("cartbot.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Session timeout as a chrono duration, ready for the store.
    pub fn session_timeout(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.session.timeout_mins as i64)
    }

    /// Sweep cadence as a std duration, ready for the sweeper task.
    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.session.sweep_interval_mins * 60)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(session) = patch.session {
            if let Some(timeout_mins) = session.timeout_mins {
                self.session.timeout_mins = timeout_mins;
            }
            if let Some(sweep_interval_mins) = session.sweep_interval_mins {
                self.session.sweep_interval_mins = sweep_interval_mins;
            }
        }

        if let Some(chat) = patch.chat {
            if let Some(transport) = chat.transport {
                self.chat.transport = transport;
            }
            if let Some(reset_keywords) = chat.reset_keywords {
                self.chat.reset_keywords = reset_keywords;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CARTBOT_SESSION_TIMEOUT_MINS") {
            self.session.timeout_mins = parse_env("CARTBOT_SESSION_TIMEOUT_MINS", &value)?;
        }
        if let Some(value) = read_env("CARTBOT_SWEEP_INTERVAL_MINS") {
            self.session.sweep_interval_mins = parse_env("CARTBOT_SWEEP_INTERVAL_MINS", &value)?;
        }
        if let Some(value) = read_env("CARTBOT_TRANSPORT") {
            self.chat.transport =
                value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                    key: "CARTBOT_TRANSPORT".to_string(),
                    value,
                })?;
        }
        if let Some(value) = read_env("CARTBOT_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("CARTBOT_LOG_FORMAT") {
            self.logging.format = value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                key: "CARTBOT_LOG_FORMAT".to_string(),
                value,
            })?;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(timeout_mins) = overrides.session_timeout_mins {
            self.session.timeout_mins = timeout_mins;
        }
        if let Some(sweep_interval_mins) = overrides.sweep_interval_mins {
            self.session.sweep_interval_mins = sweep_interval_mins;
        }
        if let Some(transport) = overrides.transport {
            self.chat.transport = transport;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(format) = overrides.log_format {
            self.logging.format = format;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.session.timeout_mins == 0 {
            return Err(ConfigError::Validation(
                "session.timeout_mins must be at least 1".to_string(),
            ));
        }
        if self.session.sweep_interval_mins == 0 {
            return Err(ConfigError::Validation(
                "session.sweep_interval_mins must be at least 1".to_string(),
            ));
        }
        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::Validation(format!(
                "logging.level `{}` is not a valid tracing level",
                self.logging.level
            )));
        }
        if self.chat.reset_keywords.iter().any(|keyword| keyword.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "chat.reset_keywords must not contain blank entries".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    session: Option<SessionPatch>,
    chat: Option<ChatPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionPatch {
    timeout_mins: Option<u64>,
    sweep_interval_mins: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatPatch {
    transport: Option<TransportMode>,
    reset_keywords: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) if path.exists() => Some(path.to_path_buf()),
        Some(_) | None => {
            let default = PathBuf::from("cartbot.toml");
            default.exists().then_some(default)
        }
    }
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}
