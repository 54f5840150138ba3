//! Server configuration.
//!
//! Two layers of configuration exist:
//!
//! - [`ServerConfig`], read from environment variables prefixed with
//!   `GHERKIN_AUTOCOMPLETE_LSP_` and overridable from the command line;
//! - [`IndexSettings`], supplied by the client (initialisation options or
//!   `workspace/didChangeConfiguration`) and describing where feature files
//!   and script sources live.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ServerError;

/// Log level enumeration matching tracing crate levels.
///
/// Defaults to `Info` when not specified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Most verbose logging, includes all trace spans.
    Trace,
    /// Debug-level information for development.
    Debug,
    /// Standard informational messages.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for failures.
    Error,
}

impl FromStr for LogLevel {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(ServerError::InvalidConfig(format!(
                "unknown log level '{s}', expected one of: trace, debug, info, warn, error"
            ))),
        }
    }
}

impl LogLevel {
    /// Convert to a tracing filter directive string.
    #[must_use]
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Default interval between readiness checks while waiting for a build.
const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Configuration for the language server process.
///
/// # Environment Variables
///
/// - `GHERKIN_AUTOCOMPLETE_LSP_LOG_LEVEL`: Sets the log level (trace, debug,
///   info, warn, error)
/// - `GHERKIN_AUTOCOMPLETE_LSP_POLL_INTERVAL_MS`: Interval between readiness
///   checks while waiting for an index build
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: LogLevel,
    /// Readiness polling interval in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Falls back to defaults for missing values.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::InvalidConfig` if an environment variable contains
    /// an invalid value.
    pub fn from_env() -> Result<Self, ServerError> {
        let log_level = match env::var("GHERKIN_AUTOCOMPLETE_LSP_LOG_LEVEL") {
            Ok(val) => val.parse()?,
            Err(_) => LogLevel::default(),
        };

        let poll_interval_ms = match env::var("GHERKIN_AUTOCOMPLETE_LSP_POLL_INTERVAL_MS") {
            Ok(val) => parse_poll_interval(&val)?,
            Err(_) => DEFAULT_POLL_INTERVAL_MS,
        };

        Ok(Self {
            log_level,
            poll_interval_ms,
        })
    }

    /// Apply optional overrides to an existing configuration.
    ///
    /// This is intended for CLI overrides that should take precedence over
    /// environment-based defaults.
    #[must_use]
    pub fn apply_overrides(
        mut self,
        log_level: Option<LogLevel>,
        poll_interval_ms: Option<u64>,
    ) -> Self {
        if let Some(level) = log_level {
            self.log_level = level;
        }

        if let Some(ms) = poll_interval_ms {
            self.poll_interval_ms = ms.max(1);
        }

        self
    }

    /// Create a new configuration with the specified log level.
    #[must_use]
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Readiness polling interval as a [`Duration`].
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn parse_poll_interval(value: &str) -> Result<u64, ServerError> {
    match value.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(ms),
        _ => Err(ServerError::InvalidConfig(format!(
            "invalid poll interval '{value}', expected a positive integer"
        ))),
    }
}

/// Configuration section name used by clients that nest settings.
pub const SETTINGS_SECTION: &str = "gherkin-autocomplete";

/// Features directory used when the client does not configure one.
pub const DEFAULT_FEATURES_PATH: &str = "./features";

/// Where to look for indexable files, relative to a workspace root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexSettings {
    /// Extra feature-library directories.
    pub feature_libraries: Vec<String>,
    /// Primary features directory; empty or missing means `./features`.
    pub features_path: Option<String>,
    /// Directories holding `*.bsl` step-definition sources.
    #[serde(rename = "srcBslPath")]
    pub src_bsl_paths: Vec<String>,
}

impl IndexSettings {
    /// Parse settings sent by a client.
    ///
    /// Accepts either the settings object itself or an object nesting it
    /// under [`SETTINGS_SECTION`].
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Settings` when the value has the wrong shape.
    ///
    /// # Examples
    ///
    /// ```
    /// use gherkin_autocomplete_server::config::IndexSettings;
    ///
    /// let value = serde_json::json!({
    ///     "gherkin-autocomplete": { "featuresPath": "spec", "srcBslPath": ["src"] }
    /// });
    /// let settings = IndexSettings::from_client_value(&value)?;
    /// assert_eq!(settings.features_path(), "spec");
    /// assert_eq!(settings.src_bsl_paths, vec!["src".to_string()]);
    /// # Ok::<(), gherkin_autocomplete_server::error::ServerError>(())
    /// ```
    pub fn from_client_value(value: &serde_json::Value) -> Result<Self, ServerError> {
        let section = value.get(SETTINGS_SECTION).unwrap_or(value);
        Ok(Self::deserialize(section)?)
    }

    /// The configured features directory, or [`DEFAULT_FEATURES_PATH`].
    #[must_use]
    pub fn features_path(&self) -> &str {
        self.features_path
            .as_deref()
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .unwrap_or(DEFAULT_FEATURES_PATH)
    }
}

#[cfg(test)]
#[expect(
    clippy::unwrap_used,
    reason = "tests require explicit panic messages for debugging failures"
)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn log_level_parses_valid_values() {
        assert_eq!("trace".parse::<LogLevel>().ok(), Some(LogLevel::Trace));
        assert_eq!("debug".parse::<LogLevel>().ok(), Some(LogLevel::Debug));
        assert_eq!("info".parse::<LogLevel>().ok(), Some(LogLevel::Info));
        assert_eq!("warn".parse::<LogLevel>().ok(), Some(LogLevel::Warn));
        assert_eq!("warning".parse::<LogLevel>().ok(), Some(LogLevel::Warn));
        assert_eq!("error".parse::<LogLevel>().ok(), Some(LogLevel::Error));
    }

    #[test]
    fn log_level_is_case_insensitive() {
        assert_eq!("TRACE".parse::<LogLevel>().ok(), Some(LogLevel::Trace));
        assert_eq!("Debug".parse::<LogLevel>().ok(), Some(LogLevel::Debug));
    }

    #[test]
    fn log_level_rejects_invalid_values() {
        let result = "invalid".parse::<LogLevel>();
        assert!(result.unwrap_err().to_string().contains("unknown log level"));
    }

    #[rstest]
    #[case("250", Some(250))]
    #[case(" 5 ", Some(5))]
    #[case("0", None)]
    #[case("-1", None)]
    #[case("soon", None)]
    fn poll_interval_parsing(#[case] raw: &str, #[case] expected: Option<u64>) {
        assert_eq!(parse_poll_interval(raw).ok(), expected);
    }

    #[test]
    fn server_config_default_values() {
        let config = ServerConfig::default();
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
    }

    #[test]
    fn server_config_apply_overrides_updates_selected_fields() {
        let config = ServerConfig::default().apply_overrides(Some(LogLevel::Error), Some(42));
        assert_eq!(config.log_level, LogLevel::Error);
        assert_eq!(config.poll_interval_ms, 42);

        let config = ServerConfig::default().apply_overrides(None, Some(0));
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.poll_interval_ms, 1);
    }

    #[test]
    fn index_settings_accept_flat_objects() {
        let value = serde_json::json!({
            "featureLibraries": ["lib/features"],
            "featuresPath": "tests/features",
            "srcBslPath": ["src/bsl", "vendor"],
        });
        let settings = IndexSettings::from_client_value(&value).unwrap();
        assert_eq!(settings.feature_libraries, vec!["lib/features".to_string()]);
        assert_eq!(settings.features_path(), "tests/features");
        assert_eq!(settings.src_bsl_paths.len(), 2);
    }

    #[rstest]
    #[case(serde_json::json!({}))]
    #[case(serde_json::json!({ "featuresPath": "  " }))]
    #[case(serde_json::json!({ "gherkin-autocomplete": { "featuresPath": null } }))]
    fn features_path_defaults(#[case] value: serde_json::Value) {
        let settings = IndexSettings::from_client_value(&value).unwrap();
        assert_eq!(settings.features_path(), DEFAULT_FEATURES_PATH);
    }

    #[test]
    fn index_settings_reject_wrong_shapes() {
        let value = serde_json::json!({ "featureLibraries": "not-a-list" });
        assert!(IndexSettings::from_client_value(&value).is_err());
    }
}
