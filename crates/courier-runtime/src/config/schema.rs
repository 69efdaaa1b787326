//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use courier_core::{ApiSettings, BotIdentity};

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourierConfig {
    /// Bot credentials and identity.
    #[serde(default)]
    pub bot: BotConfig,

    /// Outbound API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Update intake settings.
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CourierConfig {
    /// The settings the API handle is built with.
    pub fn api_settings(&self) -> ApiSettings {
        let identity = BotIdentity {
            user_id: self.bot.resolved_user_id(),
            username: None,
        };
        let identity = match &self.bot.username {
            Some(username) => identity.username(username.as_str()),
            None => identity,
        };

        ApiSettings::new(identity)
            .parse_mode(self.api.parse_mode.clone())
            .retry_attempts(self.api.retry_attempts)
    }
}

// =============================================================================
// Bot
// =============================================================================

/// Bot credentials.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BotConfig {
    /// Bot API token, `<bot id>:<secret>`.
    #[serde(default)]
    pub token: Option<String>,

    /// Bot user id. Taken from the token when absent.
    #[serde(default)]
    pub user_id: Option<i64>,

    /// Bot username, with or without the leading `@`.
    #[serde(default)]
    pub username: Option<String>,
}

impl BotConfig {
    /// The configured user id, or the numeric prefix of the token.
    pub fn resolved_user_id(&self) -> Option<i64> {
        self.user_id.or_else(|| {
            let token = self.token.as_deref()?;
            let (id, _) = token.split_once(':')?;
            id.parse().ok()
        })
    }
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .finish()
    }
}

// =============================================================================
// API
// =============================================================================

/// Outbound API settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API root URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Default `parse_mode` for text-carrying calls. `None` disables the default.
    #[serde(default = "default_parse_mode")]
    pub parse_mode: Option<String>,

    /// Attempt budget per call, the first attempt included.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            parse_mode: default_parse_mode(),
            retry_attempts: default_retry_attempts(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_base_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_parse_mode() -> Option<String> {
    Some(ApiSettings::DEFAULT_PARSE_MODE.to_string())
}

fn default_retry_attempts() -> u32 {
    ApiSettings::DEFAULT_RETRY_ATTEMPTS
}

fn default_timeout_secs() -> u64 {
    30
}

// =============================================================================
// Runtime
// =============================================================================

/// Update intake settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Maximum number of updates dispatched at once by `CourierRuntime::run`.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}

fn default_max_concurrency() -> usize {
    64
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Newline-delimited JSON. Needs the `json-log` feature; otherwise `Full` is used.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// When a log file is rolled over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// Logging settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base level.
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Log file, when `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub rotation: LogRotation,

    /// Per-target levels, e.g. `courier_core = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Include thread ids.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include file names and line numbers.
    #[serde(default)]
    pub file_location: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_falls_back_to_token_prefix() {
        let bot = BotConfig {
            token: Some("123456789:AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsaw".into()),
            ..Default::default()
        };
        assert_eq!(bot.resolved_user_id(), Some(123_456_789));

        let explicit = BotConfig {
            user_id: Some(7),
            ..bot
        };
        assert_eq!(explicit.resolved_user_id(), Some(7));
    }

    #[test]
    fn test_api_settings_projection() {
        let config = CourierConfig {
            bot: BotConfig {
                user_id: Some(42),
                username: Some("@courier_bot".into()),
                ..Default::default()
            },
            api: ApiConfig {
                parse_mode: None,
                retry_attempts: 5,
                ..Default::default()
            },
            ..Default::default()
        };

        let settings = config.api_settings();
        assert_eq!(settings.identity.user_id, Some(42));
        assert_eq!(settings.identity.username.as_deref(), Some("courier_bot"));
        assert_eq!(settings.parse_mode, None);
        assert_eq!(settings.retry_attempts, 5);
    }

    #[test]
    fn test_debug_redacts_token() {
        let bot = BotConfig {
            token: Some("1:secret".into()),
            ..Default::default()
        };
        assert!(!format!("{bot:?}").contains("secret"));
    }
}
