// crates/dbmock-config/src/config.rs
// ============================================================================
// Module: dbmock Configuration
// Description: Configuration loading and validation for mock driver instances.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: dbmock-core, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! A missing or invalid file fails closed; defaults apply only to sections and
//! keys the file leaves out. [`MockConfig::to_options`] turns a validated
//! configuration into [`MockOptions`] for `dbmock_core::new` or a registry.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use dbmock_core::DefaultConverter;
use dbmock_core::EqualQueryMatcher;
use dbmock_core::EventSink;
use dbmock_core::FileEventSink;
use dbmock_core::MockOptions;
use dbmock_core::NoopEventSink;
use dbmock_core::PassthroughConverter;
use dbmock_core::RegexpQueryMatcher;
use dbmock_core::StderrEventSink;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "dbmock.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "DBMOCK_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum mock identifier length.
pub(crate) const MAX_MOCK_ID_LENGTH: usize = 256;
/// Maximum number of passthrough type labels.
pub(crate) const MAX_PASSTHROUGH_KINDS: usize = 64;
/// Maximum length of a passthrough type label.
pub(crate) const MAX_TYPE_LABEL_LENGTH: usize = 128;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Mock instance configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MockConfig {
    /// Expectation matching configuration.
    #[serde(default)]
    pub matching: MatchingConfig,
    /// Argument and row value conversion configuration.
    #[serde(default)]
    pub conversion: ConversionConfig,
    /// Event sink configuration.
    #[serde(default)]
    pub events: EventsConfig,
}

impl MockConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// The path is taken from `path`, then `DBMOCK_CONFIG`, then `dbmock.toml`
    /// in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let source = config_source(path);
        check_path_limits("config path", &source)?;
        let bytes = fs::read(&source)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", source.display())))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] when validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.matching.validate()?;
        self.conversion.validate()?;
        self.events.validate()?;
        Ok(())
    }

    /// Builds mock options from the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the configuration is invalid and
    /// [`ConfigError::Io`] when the event file cannot be opened.
    pub fn to_options(&self) -> Result<MockOptions, ConfigError> {
        self.validate()?;
        let mut options = MockOptions::default()
            .with_ordered(self.matching.ordered)
            .with_monitor_pings(self.matching.monitor_pings)
            .with_event_sink(self.events.build_sink()?);
        if let Some(id) = &self.matching.mock_id {
            options = options.with_id(id.trim());
        }
        options = match self.matching.query_matcher {
            QueryMatcherKind::Regexp => options.with_query_matcher(RegexpQueryMatcher::new()),
            QueryMatcherKind::Equal => options.with_query_matcher(EqualQueryMatcher),
        };
        options = if self.conversion.passthrough_kinds.is_empty() {
            options.with_converter(DefaultConverter)
        } else {
            options.with_converter(PassthroughConverter::new(
                self.conversion.passthrough_kinds.iter().map(|label| label.trim()),
            ))
        };
        Ok(options)
    }
}

/// Expectation matching configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MatchingConfig {
    /// Identifier of the mock; generated when absent.
    #[serde(default)]
    pub mock_id: Option<String>,
    /// Whether calls must follow declaration order.
    #[serde(default = "default_ordered")]
    pub ordered: bool,
    /// SQL matching strategy.
    #[serde(default)]
    pub query_matcher: QueryMatcherKind,
    /// Whether ping calls are matched against expectations.
    #[serde(default)]
    pub monitor_pings: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            mock_id: None,
            ordered: default_ordered(),
            query_matcher: QueryMatcherKind::default(),
            monitor_pings: false,
        }
    }
}

impl MatchingConfig {
    /// Validates matching configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let Some(id) = &self.mock_id else {
            return Ok(());
        };
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::Invalid("matching.mock_id must be non-empty".to_string()));
        }
        if trimmed.len() > MAX_MOCK_ID_LENGTH {
            return Err(ConfigError::Invalid("matching.mock_id exceeds max length".to_string()));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid(
                "matching.mock_id must not contain whitespace".to_string(),
            ));
        }
        Ok(())
    }
}

/// Supported SQL matching strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QueryMatcherKind {
    /// Declared SQL is a regular expression searched in the actual SQL.
    #[default]
    Regexp,
    /// Declared and actual SQL must be equal after whitespace normalization.
    Equal,
}

/// Value conversion configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConversionConfig {
    /// Kind labels or custom type names passed through without conversion.
    #[serde(default)]
    pub passthrough_kinds: Vec<String>,
}

impl ConversionConfig {
    /// Validates conversion configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.passthrough_kinds.len() > MAX_PASSTHROUGH_KINDS {
            return Err(ConfigError::Invalid(format!(
                "conversion.passthrough_kinds exceeds max entries ({MAX_PASSTHROUGH_KINDS})"
            )));
        }
        let mut seen = BTreeSet::new();
        for label in &self.passthrough_kinds {
            let trimmed = label.trim();
            if trimmed.is_empty() {
                return Err(ConfigError::Invalid(
                    "conversion.passthrough_kinds entries must be non-empty".to_string(),
                ));
            }
            if trimmed.len() > MAX_TYPE_LABEL_LENGTH {
                return Err(ConfigError::Invalid(format!(
                    "conversion.passthrough_kinds entry exceeds max length: {trimmed}"
                )));
            }
            if !seen.insert(trimmed) {
                return Err(ConfigError::Invalid(format!(
                    "conversion.passthrough_kinds contains duplicate entry: {trimmed}"
                )));
            }
        }
        Ok(())
    }
}

/// Event sink configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EventsConfig {
    /// Sink selection.
    #[serde(default)]
    pub sink: EventSinkKind,
    /// Output path for the file sink.
    #[serde(default)]
    pub path: Option<String>,
}

impl EventsConfig {
    /// Validates event configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (EventSinkKind::File, Some(path)) => {
                let trimmed = path.trim();
                if trimmed.is_empty() {
                    return Err(ConfigError::Invalid("events.path must be non-empty".to_string()));
                }
                check_path_limits("events.path", Path::new(trimmed))
            }
            (EventSinkKind::File, None) => Err(ConfigError::Invalid(
                "events.sink = \"file\" requires events.path".to_string(),
            )),
            (_, Some(_)) => Err(ConfigError::Invalid(
                "events.path is only valid with events.sink = \"file\"".to_string(),
            )),
            (_, None) => Ok(()),
        }
    }

    /// Builds the configured sink.
    fn build_sink(&self) -> Result<Arc<dyn EventSink>, ConfigError> {
        match (self.sink, &self.path) {
            (EventSinkKind::None, _) => Ok(Arc::new(NoopEventSink)),
            (EventSinkKind::Stderr, _) => Ok(Arc::new(StderrEventSink)),
            (EventSinkKind::File, Some(path)) => {
                let sink = FileEventSink::new(Path::new(path.trim()))
                    .map_err(|err| ConfigError::Io(err.to_string()))?;
                Ok(Arc::new(sink))
            }
            (EventSinkKind::File, None) => Err(ConfigError::Invalid(
                "events.sink = \"file\" requires events.path".to_string(),
            )),
        }
    }
}

/// Supported event sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventSinkKind {
    /// Discard events.
    #[default]
    None,
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to `events.path`.
    File,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration or opening the event file.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Picks the config file: the argument, then `DBMOCK_CONFIG`, then the default name.
fn config_source(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf)
        .or_else(|| env::var_os(CONFIG_ENV_VAR).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Enforces the total and per-component length limits on `path`.
fn check_path_limits(label: &str, path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{label} exceeds max length")));
    }
    if path.components().any(|part| part.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH) {
        return Err(ConfigError::Invalid(format!("{label} component too long")));
    }
    Ok(())
}

/// Default for ordered matching.
pub(crate) const fn default_ordered() -> bool {
    true
}

// ============================================================================
// SECTION: Tests
// ============================================================================
