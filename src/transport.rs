//! The email transport: intake loop plus lifecycle around a [`FlushEngine`]

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use parking_lot::Mutex;
use tokio::{
    sync::OnceCell,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};

use crate::{
    config::TransportConfig,
    dispatcher::MailDispatcher,
    error::TransportError,
    flush::{FlushEngine, FlushOutcome, FlushStatsSnapshot},
    format::{Formatter, PrettyFormatter, UNKNOWN_LEVEL_LABEL},
    internal,
    mailer::{Mailer, SmtpMailer},
    record::{Levels, LogRecord},
    source::RecordSource,
};

/// Where a transport is in its one-way lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Accepting records, periodic timer possibly armed
    Open,
    /// Shutdown started, final forced drain in progress
    Closing,
    /// Final drain settled
    Closed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        })
    }
}

struct Lifecycle {
    phase: Phase,
    ticker: Option<JoinHandle<()>>,
}

/// Builder for an [`EmailTransport`] with a non-default mailer or formatter.
pub struct TransportBuilder {
    config: TransportConfig,
    mailer: Option<Arc<dyn Mailer>>,
    formatter: Option<Arc<dyn Formatter>>,
}

impl TransportBuilder {
    /// Send through `mailer` instead of the SMTP relay from the configuration.
    #[must_use]
    pub fn mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    /// Render subjects and bodies with `formatter` instead of [`PrettyFormatter`].
    #[must_use]
    pub fn formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Validate the configuration and assemble the transport.
    ///
    /// Nothing is started: the periodic timer is armed by [`EmailTransport::run`]
    /// or [`EmailTransport::start`]. Building the default SMTP mailer requires a
    /// tokio runtime.
    ///
    /// # Errors
    /// If the configuration is incomplete or invalid
    pub fn build(self) -> Result<EmailTransport, TransportError> {
        let config = self.config;
        config.validate()?;

        let mailer = match self.mailer {
            Some(mailer) => mailer,
            None => Arc::new(SmtpMailer::from_config(&config)?),
        };
        let formatter = self
            .formatter
            .unwrap_or_else(|| Arc::new(PrettyFormatter));

        let dispatcher =
            MailDispatcher::new(mailer, formatter, config.sender()?, config.recipients()?);

        internal!(
            level = DEBUG,
            threshold = config.flush_threshold(),
            interval = ?config.flush_interval(),
            "Email transport configured"
        );

        Ok(EmailTransport {
            dispatcher,
            engine: Arc::new(FlushEngine::new()),
            closing: Arc::new(AtomicBool::new(false)),
            lifecycle: Mutex::new(Lifecycle {
                phase: Phase::Open,
                ticker: None,
            }),
            closed: OnceCell::new(),
            threshold: config.flush_threshold(),
            interval: config.flush_interval(),
            levels: config.levels(),
        })
    }
}

/// Batches log records into email notifications.
///
/// Every record accepted starts its send immediately. The transport only
/// decides when those sends are awaited: once `flush_threshold` are pending,
/// every `flush_interval`, and a final forced drain on [`close`](Self::close).
pub struct EmailTransport {
    dispatcher: MailDispatcher,
    engine: Arc<FlushEngine>,
    closing: Arc<AtomicBool>,
    lifecycle: Mutex<Lifecycle>,
    closed: OnceCell<FlushOutcome>,
    threshold: usize,
    interval: Option<Duration>,
    levels: Levels,
}

impl EmailTransport {
    pub fn builder(config: TransportConfig) -> TransportBuilder {
        TransportBuilder {
            config,
            mailer: None,
            formatter: None,
        }
    }

    /// Transport sending through the configured SMTP relay.
    ///
    /// # Errors
    /// If the configuration is incomplete or invalid
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        Self::builder(config).build()
    }

    pub fn phase(&self) -> Phase {
        self.lifecycle.lock().phase
    }

    pub fn pending_len(&self) -> usize {
        self.engine.pending_len()
    }

    pub fn stats(&self) -> FlushStatsSnapshot {
        self.engine.stats()
    }

    /// Arm the periodic flush timer if an interval is configured.
    ///
    /// Has no effect when already armed or once shutdown has begun.
    pub fn start(&self) {
        let Some(period) = self.interval else {
            return;
        };

        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.phase != Phase::Open || lifecycle.ticker.is_some() {
            return;
        }

        let engine = Arc::clone(&self.engine);
        let closing = Arc::clone(&self.closing);

        internal!(level = DEBUG, "Arming periodic flush every {}ms", period.as_millis());

        lifecycle.ticker = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if closing.load(Ordering::Acquire) {
                    break;
                }

                let engine = Arc::clone(&engine);
                let flush = tokio::spawn(async move { engine.flush(false).await });
                if let Err(e) = flush.await {
                    internal!(level = ERROR, error = %e, "Periodic flush failed");
                }
            }
        }));
    }

    /// Perform one intake step for a record supplied directly by the host.
    ///
    /// The level label comes from the configured level table.
    ///
    /// # Errors
    /// [`TransportError::Closed`] once shutdown has begun
    pub async fn ingest(&self, record: LogRecord) -> Result<(), TransportError> {
        let label = self
            .levels
            .label(record.level())
            .unwrap_or(UNKNOWN_LEVEL_LABEL)
            .to_owned();

        self.accept(&record, &label).await
    }

    /// Consume `source` until it ends, dispatching one notification per record.
    ///
    /// Arms the periodic timer first. Waits on a threshold-triggered flush
    /// before pulling the next record. Does not close the transport.
    ///
    /// # Errors
    /// If the source fails to read, or the transport is closed mid-stream
    pub async fn run<S: RecordSource>(&self, mut source: S) -> Result<(), TransportError> {
        self.start();

        while let Some(record) = source.next_record().await {
            let record = record?;
            let label = source
                .level_label(record.level())
                .unwrap_or(UNKNOWN_LEVEL_LABEL)
                .to_owned();

            self.accept(&record, &label).await?;
        }

        internal!(level = DEBUG, "Record source ended");
        Ok(())
    }

    async fn accept(&self, record: &LogRecord, label: &str) -> Result<(), TransportError> {
        {
            // Shutdown flips the phase under this lock, so a record is either
            // appended before the final drain snapshots or refused.
            let lifecycle = self.lifecycle.lock();
            if lifecycle.phase != Phase::Open {
                return Err(TransportError::Closed);
            }

            self.engine.append(self.dispatcher.dispatch(record, label));
        }

        if self.threshold > 0 && self.engine.pending_len() >= self.threshold {
            self.engine.flush(false).await;
        }

        Ok(())
    }

    /// Regular flush, as the threshold and timer triggers perform it.
    pub async fn flush(&self) -> FlushOutcome {
        self.engine.flush(false).await
    }

    /// Stop the timer and drain everything still pending.
    ///
    /// Resolves once the final forced drain and any regular drain already in
    /// progress have settled. Later and concurrent calls wait for the same
    /// shutdown and return its outcome.
    pub async fn close(&self) -> FlushOutcome {
        *self.closed.get_or_init(|| self.shutdown()).await
    }

    async fn shutdown(&self) -> FlushOutcome {
        let ticker = {
            let mut lifecycle = self.lifecycle.lock();
            self.closing.store(true, Ordering::Release);
            lifecycle.phase = Phase::Closing;
            lifecycle.ticker.take()
        };

        if let Some(ticker) = ticker {
            ticker.abort();
        }

        internal!(
            level = INFO,
            pending = self.engine.pending_len(),
            "Closing email transport"
        );

        let outcome = self.engine.flush(true).await;
        self.engine.wait_idle().await;

        self.lifecycle.lock().phase = Phase::Closed;

        let stats = self.engine.stats();
        internal!(
            level = INFO,
            delivered = stats.delivered,
            rejected = stats.rejected,
            "Email transport closed"
        );

        outcome
    }
}

impl Drop for EmailTransport {
    fn drop(&mut self) {
        if let Some(ticker) = self.lifecycle.get_mut().ticker.take() {
            ticker.abort();
        }
    }
}
