//! Batching delivery of structured log records as email notifications.
//!
//! Each accepted record starts its send at once. An [`EmailTransport`] only
//! decides when those in-flight sends are awaited: when `flush_threshold`
//! are pending, on a `flush_interval` timer, and in a final forced drain on
//! [`close`](EmailTransport::close).
//!
//! ```no_run
//! # async fn demo() -> Result<(), logmail::TransportError> {
//! use logmail::{EmailTransport, NdjsonSource, TransportConfig};
//! use tokio::io::{BufReader, stdin};
//!
//! let mut config = TransportConfig::new(
//!     "noreply@myapp.com",
//!     "smtp.example.com",
//!     587,
//!     "user",
//!     "pass",
//!     "admin@myapp.com",
//! );
//! config.flush_interval = Some(60_000);
//!
//! let levels = config.levels();
//! let transport = EmailTransport::new(config)?;
//! transport.run(NdjsonSource::new(BufReader::new(stdin()), levels)).await?;
//! transport.close().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod flush;
pub mod format;
pub mod logging;
pub mod mailer;
pub mod record;
pub mod registry;
pub mod source;
pub mod transport;

pub use tracing;

pub use config::{Address, DEFAULT_FLUSH_THRESHOLD, Recipients, TlsMode, TransportConfig};
pub use dispatcher::{MailDispatcher, MailTask, Settlement};
pub use error::{ConfigError, MailError, RecordError, TransportError};
pub use flush::{FlushEngine, FlushOutcome, FlushReport, FlushStatsSnapshot};
pub use format::{Formatter, PrettyFormatter, UNKNOWN_LEVEL_LABEL};
pub use mailer::{Mailer, OutboundMail, SmtpMailer};
pub use record::{Levels, LogRecord, level};
pub use source::{NdjsonSource, RecordSource, StreamSource};
pub use transport::{EmailTransport, Phase, TransportBuilder};
