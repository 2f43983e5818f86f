//! # Engine Configuration
//!
//! Runtime settings for persistent FSM instances.
//!
//! Values come from, in increasing priority: built-in defaults, an optional
//! configuration file, and `RFQ_FSM__*` environment variables.
//!
//! # Examples
//!
//! ```
//! use rfq_fsm::infrastructure::config::EngineConfig;
//! use std::time::Duration;
//!
//! let config = EngineConfig::default()
//!     .with_mailbox_capacity(64)
//!     .with_append_timeout_ms(250)
//!     .with_max_append_attempts(3);
//!
//! assert_eq!(config.mailbox_capacity(), 64);
//! assert_eq!(config.append_timeout(), Duration::from_millis(250));
//! ```

use ::config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default per-instance queue capacity.
const DEFAULT_MAILBOX_CAPACITY: usize = 256;

/// Default bound on a single journal append, in milliseconds.
const DEFAULT_APPEND_TIMEOUT_MS: u64 = 2_000;

/// Default number of append attempts before a transition is aborted.
const DEFAULT_MAX_APPEND_ATTEMPTS: u32 = 3;

/// Default pause between append attempts, in milliseconds.
const DEFAULT_APPEND_RETRY_BACKOFF_MS: u64 = 50;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "RFQ_FSM";

/// Settings shared by every FSM instance of a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Capacity of each instance's command queue.
    mailbox_capacity: usize,
    /// Upper bound on one append or snapshot write, in milliseconds.
    append_timeout_ms: u64,
    /// Attempts per append before giving up with a persistence failure.
    max_append_attempts: u32,
    /// Pause between append attempts, in milliseconds.
    append_retry_backoff_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            append_timeout_ms: DEFAULT_APPEND_TIMEOUT_MS,
            max_append_attempts: DEFAULT_MAX_APPEND_ATTEMPTS,
            append_retry_backoff_ms: DEFAULT_APPEND_RETRY_BACKOFF_MS,
        }
    }
}

impl EngineConfig {
    /// Loads configuration from an optional file plus `RFQ_FSM__*` variables.
    ///
    /// A missing file is not an error; unset keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a source cannot be parsed or a value is
    /// out of range.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let config: Self = settings.try_deserialize()?;
        config.validate()
    }

    /// Parses configuration from a string in the given format.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the content cannot be parsed or a value
    /// is out of range.
    pub fn parse(contents: &str, format: FileFormat) -> Result<Self, ConfigError> {
        let config: Self = Config::builder()
            .add_source(File::from_str(contents, format))
            .build()?
            .try_deserialize()?;
        config.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.mailbox_capacity == 0 {
            return Err(ConfigError::Message(
                "mailbox_capacity must be greater than zero".to_string(),
            ));
        }
        if self.max_append_attempts == 0 {
            return Err(ConfigError::Message(
                "max_append_attempts must be greater than zero".to_string(),
            ));
        }
        Ok(self)
    }

    /// Sets the command queue capacity (minimum 1).
    #[must_use]
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity.max(1);
        self
    }

    /// Sets the append timeout in milliseconds.
    #[must_use]
    pub fn with_append_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.append_timeout_ms = timeout_ms;
        self
    }

    /// Sets the number of append attempts (minimum 1).
    #[must_use]
    pub fn with_max_append_attempts(mut self, attempts: u32) -> Self {
        self.max_append_attempts = attempts.max(1);
        self
    }

    /// Sets the pause between append attempts in milliseconds.
    #[must_use]
    pub fn with_append_retry_backoff_ms(mut self, backoff_ms: u64) -> Self {
        self.append_retry_backoff_ms = backoff_ms;
        self
    }

    /// Returns the command queue capacity.
    #[inline]
    #[must_use]
    pub fn mailbox_capacity(&self) -> usize {
        self.mailbox_capacity.max(1)
    }

    /// Returns the bound on one append or snapshot write.
    #[inline]
    #[must_use]
    pub fn append_timeout(&self) -> Duration {
        Duration::from_millis(self.append_timeout_ms)
    }

    /// Returns the number of append attempts.
    #[inline]
    #[must_use]
    pub fn max_append_attempts(&self) -> u32 {
        self.max_append_attempts.max(1)
    }

    /// Returns the pause between append attempts.
    #[inline]
    #[must_use]
    pub fn append_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.append_retry_backoff_ms)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.mailbox_capacity(), DEFAULT_MAILBOX_CAPACITY);
        assert_eq!(config.max_append_attempts(), DEFAULT_MAX_APPEND_ATTEMPTS);
        assert_eq!(
            config.append_retry_backoff(),
            Duration::from_millis(DEFAULT_APPEND_RETRY_BACKOFF_MS)
        );
    }

    #[test]
    fn builders_clamp_to_one() {
        let config = EngineConfig::default()
            .with_mailbox_capacity(0)
            .with_max_append_attempts(0);
        assert_eq!(config.mailbox_capacity(), 1);
        assert_eq!(config.max_append_attempts(), 1);
    }

    #[test]
    fn parse_toml_overrides_some_keys() {
        let config = EngineConfig::parse(
            "mailbox_capacity = 8\nappend_timeout_ms = 100\n",
            FileFormat::Toml,
        )
        .unwrap();
        assert_eq!(config.mailbox_capacity(), 8);
        assert_eq!(config.append_timeout(), Duration::from_millis(100));
        assert_eq!(config.max_append_attempts(), DEFAULT_MAX_APPEND_ATTEMPTS);
    }

    #[test]
    fn parse_rejects_zero_capacity() {
        let err = EngineConfig::parse("mailbox_capacity = 0", FileFormat::Toml).unwrap_err();
        assert!(err.to_string().contains("mailbox_capacity"));
    }

    #[test]
    fn load_without_file_uses_defaults() {
        let config = EngineConfig::load(Some(Path::new("does-not-exist.toml"))).unwrap();
        assert_eq!(config.append_timeout(), Duration::from_millis(DEFAULT_APPEND_TIMEOUT_MS));
    }
}
