//! Transport configuration.
//!
//! Field names are snake_case, with camelCase aliases so the options object of
//! a pino transport can be deserialized unchanged from JSON.
//!
//! ```toml
//! smtp_from = { name = "My App", address = "noreply@myapp.com" }
//! smtp_host = "smtp.example.com"
//! smtp_port = 587
//! smtp_user = "user"
//! smtp_pass = "pass"
//! send_to = ["admin@myapp.com", "devops@myapp.com"]
//! flush_interval = 300000
//! flush_threshold = 20
//! ```

mod address;

use std::{collections::BTreeMap, path::Path, time::Duration};

pub use address::{Address, Recipients};
use lettre::message::Mailbox;
use serde::Deserialize;

use crate::{error::ConfigError, record::Levels};

/// Pending task count that triggers a flush when `flush_threshold` is unset.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 50;

const fn default_smtp_timeout() -> u64 {
    30
}

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    /// Upgrade with STARTTLS when the server offers it
    #[default]
    Opportunistic,
    /// Fail unless STARTTLS succeeds
    Required,
    /// Implicit TLS from the first byte (usually port 465)
    Wrapper,
    /// Never use TLS
    #[serde(alias = "none")]
    Plaintext,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    /// Sender identity of every notification
    #[serde(alias = "smtpFrom")]
    pub smtp_from: Address,

    #[serde(alias = "smtpHost")]
    pub smtp_host: String,

    #[serde(alias = "smtpPort")]
    pub smtp_port: u16,

    #[serde(alias = "smtpUser")]
    pub smtp_user: String,

    #[serde(alias = "smtpPass")]
    pub smtp_pass: String,

    /// Log every SMTP exchange at DEBUG
    #[serde(default)]
    pub debug: bool,

    /// Log every delivery outcome at INFO
    #[serde(default)]
    pub logger: bool,

    /// One or more recipients
    #[serde(alias = "sendTo")]
    pub send_to: Recipients,

    /// Periodic flush interval in milliseconds
    ///
    /// Absent or `0` disables periodic flushing.
    #[serde(alias = "flushInterval", default)]
    pub flush_interval: Option<u64>,

    /// Pending task count that triggers a flush
    ///
    /// Absent means [`DEFAULT_FLUSH_THRESHOLD`], `0` disables count-based flushing.
    #[serde(alias = "flushThreshold", default)]
    pub flush_threshold: Option<usize>,

    #[serde(alias = "smtpTls", default)]
    pub smtp_tls: TlsMode,

    /// Timeout handed to the SMTP client for each send
    #[serde(alias = "smtpTimeoutSecs", default = "default_smtp_timeout")]
    pub smtp_timeout_secs: u64,

    /// Custom level labels, merged over pino's defaults
    #[serde(alias = "customLevels", default)]
    pub levels: BTreeMap<String, u64>,

    /// Lowest level the NDJSON source lets through, by label or number
    #[serde(alias = "minLevel", default)]
    pub min_level: Option<String>,
}

impl TransportConfig {
    /// Minimal configuration with every optional knob at its default.
    pub fn new(
        smtp_from: impl Into<Address>,
        smtp_host: impl Into<String>,
        smtp_port: u16,
        smtp_user: impl Into<String>,
        smtp_pass: impl Into<String>,
        send_to: impl Into<Recipients>,
    ) -> Self {
        Self {
            smtp_from: smtp_from.into(),
            smtp_host: smtp_host.into(),
            smtp_port,
            smtp_user: smtp_user.into(),
            smtp_pass: smtp_pass.into(),
            debug: false,
            logger: false,
            send_to: send_to.into(),
            flush_interval: None,
            flush_threshold: None,
            smtp_tls: TlsMode::default(),
            smtp_timeout_secs: default_smtp_timeout(),
            levels: BTreeMap::new(),
            min_level: None,
        }
    }

    /// Parse a configuration from a TOML document.
    ///
    /// # Errors
    /// If the document is not valid TOML or misses required fields
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Parse a configuration from a JSON document, such as a pino options object.
    ///
    /// # Errors
    /// If the document is not valid JSON or misses required fields
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load a configuration file, choosing JSON for `.json` files and TOML otherwise.
    ///
    /// # Errors
    /// If the file cannot be read or parsed
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    /// Check every field the transport needs before anything is started.
    ///
    /// # Errors
    /// The first missing or invalid field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.smtp_host.trim().is_empty() {
            return Err(ConfigError::MissingField("smtp_host"));
        }

        if self.smtp_port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "smtp_port",
                reason: "must be between 1-65535".to_string(),
            });
        }

        if self.smtp_user.is_empty() {
            return Err(ConfigError::MissingField("smtp_user"));
        }

        if self.smtp_pass.is_empty() {
            return Err(ConfigError::MissingField("smtp_pass"));
        }

        self.sender()?;
        self.recipients()?;
        self.min_level_value()?;

        Ok(())
    }

    /// The `smtp_from` identity as a mailbox.
    ///
    /// # Errors
    /// If the sender is not a valid mailbox
    pub fn sender(&self) -> Result<Mailbox, ConfigError> {
        self.smtp_from.to_mailbox("smtp_from")
    }

    /// Every `send_to` address as a mailbox, in configured order.
    ///
    /// # Errors
    /// If there are no recipients, or one is not a valid mailbox
    pub fn recipients(&self) -> Result<Vec<Mailbox>, ConfigError> {
        let recipients = self
            .send_to
            .iter()
            .map(|address| address.to_mailbox("send_to"))
            .collect::<Result<Vec<_>, _>>()?;

        if recipients.is_empty() {
            return Err(ConfigError::MissingField("send_to"));
        }

        Ok(recipients)
    }

    /// `None` when periodic flushing is disabled.
    pub fn flush_interval(&self) -> Option<Duration> {
        self.flush_interval
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// `0` when count-based flushing is disabled.
    pub fn flush_threshold(&self) -> usize {
        self.flush_threshold.unwrap_or(DEFAULT_FLUSH_THRESHOLD)
    }

    pub const fn smtp_timeout(&self) -> Duration {
        Duration::from_secs(self.smtp_timeout_secs)
    }

    pub fn levels(&self) -> Levels {
        Levels::with_custom(
            self.levels
                .iter()
                .map(|(label, value)| (label.clone(), *value)),
        )
    }

    /// Resolve `min_level`, accepting a label or a plain number.
    ///
    /// # Errors
    /// If the label is not a known level
    pub fn min_level_value(&self) -> Result<Option<u64>, ConfigError> {
        let Some(min_level) = self.min_level.as_deref() else {
            return Ok(None);
        };

        min_level
            .parse::<u64>()
            .ok()
            .or_else(|| self.levels().value(min_level))
            .map(Some)
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "min_level",
                reason: format!("unknown level {min_level}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: &str = r#"
        smtp_from = "noreply@myapp.com"
        smtp_host = "smtp.example.com"
        smtp_port = 587
        smtp_user = "user"
        smtp_pass = "pass"
        send_to = "admin@myapp.com"
    "#;

    #[test]
    fn test_defaults_when_flush_options_unset() {
        let config = TransportConfig::from_toml_str(BASIC).expect("valid config");

        assert!(config.validate().is_ok());
        assert_eq!(config.flush_threshold(), DEFAULT_FLUSH_THRESHOLD);
        assert_eq!(config.flush_interval(), None);
        assert_eq!(config.smtp_tls, TlsMode::Opportunistic);
        assert!(!config.debug);
        assert!(!config.logger);
    }

    #[test]
    fn test_explicit_zero_disables_both_triggers() {
        let config = TransportConfig::from_toml_str(&format!(
            "{BASIC}\nflush_interval = 0\nflush_threshold = 0\n"
        ))
        .expect("valid config");

        assert_eq!(config.flush_threshold(), 0);
        assert_eq!(config.flush_interval(), None);
    }

    #[test]
    fn test_both_triggers_together() {
        let config = TransportConfig::from_toml_str(&format!(
            "{BASIC}\nflush_interval = 5000\nflush_threshold = 10\n"
        ))
        .expect("valid config");

        assert_eq!(config.flush_threshold(), 10);
        assert_eq!(config.flush_interval(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_pino_options_json() {
        let config = TransportConfig::from_json_str(
            r#"{
                "smtpFrom": { "name": "Test App", "address": "test@example.com" },
                "smtpHost": "smtp.test.com",
                "smtpPort": 465,
                "smtpUser": "testuser",
                "smtpPass": "testpass",
                "debug": true,
                "logger": true,
                "sendTo": ["recipient1@test.com", "recipient2@test.com"],
                "flushInterval": null,
                "flushThreshold": null,
                "smtpTls": "wrapper"
            }"#,
        )
        .expect("valid config");

        assert!(config.validate().is_ok());
        assert!(config.debug && config.logger);
        assert_eq!(config.flush_interval(), None);
        assert_eq!(config.flush_threshold(), DEFAULT_FLUSH_THRESHOLD);
        assert_eq!(config.smtp_tls, TlsMode::Wrapper);

        let sender = config.sender().unwrap();
        assert_eq!(sender.name.as_deref(), Some("Test App"));
        assert_eq!(sender.email.to_string(), "test@example.com");
        assert_eq!(config.recipients().unwrap().len(), 2);
    }

    #[test]
    fn test_missing_required_field_is_a_parse_error() {
        let err = TransportConfig::from_toml_str(r#"smtp_host = "smtp.example.com""#)
            .expect_err("incomplete config");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = TransportConfig::from_toml_str(BASIC).unwrap();
        config.smtp_host = "  ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingField("smtp_host"))
        ));

        let mut config = TransportConfig::from_toml_str(BASIC).unwrap();
        config.smtp_port = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "smtp_port",
                ..
            })
        ));

        let mut config = TransportConfig::from_toml_str(BASIC).unwrap();
        config.send_to = Recipients::Many(Vec::new());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingField("send_to"))
        ));

        let mut config = TransportConfig::from_toml_str(BASIC).unwrap();
        config.send_to = "not an address".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidAddress {
                field: "send_to",
                ..
            })
        ));
    }

    #[test]
    fn test_min_level_and_custom_levels() {
        let config = TransportConfig::from_toml_str(&format!(
            "{BASIC}\nmin_level = \"audit\"\n[levels]\naudit = 45\n"
        ))
        .unwrap();

        assert_eq!(config.levels().label(45), Some("audit"));
        assert_eq!(config.min_level_value().unwrap(), Some(45));

        let mut config = config;
        config.min_level = Some("50".to_string());
        assert_eq!(config.min_level_value().unwrap(), Some(50));

        config.min_level = Some("loud".to_string());
        assert!(config.validate().is_err());
    }
}
