//! Error types for the log mailing pipeline.
//!
//! Failures split along the same line the pipeline draws at runtime:
//! - configuration errors surface synchronously when a transport is built
//! - send errors live inside a settled [`MailTask`](crate::MailTask) and are
//!   only ever logged
//! - record errors describe a single unusable input line and are skipped

use std::io;

use thiserror::Error;

/// Errors raised while loading or validating a [`TransportConfig`](crate::TransportConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required configuration field is missing or empty.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// An address could not be parsed as a mailbox.
    #[error("Invalid address for {field}: {value}")]
    InvalidAddress { field: &'static str, value: String },

    /// A configuration value is out of range or otherwise unusable.
    #[error("Invalid configuration for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    /// The configuration document could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// The SMTP capability could not be set up from the configuration.
    #[error("SMTP setup failed: {0}")]
    Smtp(String),

    /// I/O error while reading a configuration file.
    #[error("I/O error reading configuration: {0}")]
    Io(#[from] io::Error),
}

impl From<toml::de::Error> for ConfigError {
    fn from(error: toml::de::Error) -> Self {
        Self::Parse(error.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(error: serde_json::Error) -> Self {
        Self::Parse(error.to_string())
    }
}

/// Failure of a single outbound email.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MailError {
    /// The message could not be assembled.
    #[error("Failed to build message: {0}")]
    Build(String),

    /// The relay answered with a 4xx code.
    #[error("Temporary SMTP failure: {0}")]
    Transient(String),

    /// The relay answered with a 5xx code.
    #[error("Permanent SMTP failure: {0}")]
    Permanent(String),

    /// Connection, TLS, or protocol failure talking to the relay.
    #[error("SMTP error: {0}")]
    Smtp(String),

    /// The send task ended without producing a result (panic or cancellation).
    #[error("Send task aborted: {0}")]
    Aborted(String),
}

impl MailError {
    /// Returns `true` if the relay rejected the message outright.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent(_) | Self::Build(_))
    }
}

impl From<lettre::transport::smtp::Error> for MailError {
    fn from(error: lettre::transport::smtp::Error) -> Self {
        if error.is_transient() {
            Self::Transient(error.to_string())
        } else if error.is_permanent() {
            Self::Permanent(error.to_string())
        } else {
            Self::Smtp(error.to_string())
        }
    }
}

impl From<tokio::task::JoinError> for MailError {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::Aborted(error.to_string())
    }
}

/// A line from the record source that cannot be used as a log record.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Malformed record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record is not a JSON object")]
    NotAnObject,

    #[error("Record has no numeric level")]
    MissingLevel,
}

/// Errors returned by [`EmailTransport`](crate::EmailTransport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport could not be constructed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Intake was attempted after shutdown began.
    #[error("Transport is closed")]
    Closed,

    /// Reading from the record source failed.
    #[error("Record source failed: {0}")]
    Source(#[from] io::Error),
}

impl TransportError {
    /// Returns `true` if the error comes from the shutdown sequence.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}
