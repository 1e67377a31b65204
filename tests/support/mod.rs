//! Shared fixtures for transport integration tests
#![allow(dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use logmail::{
    EmailTransport, LogRecord, MailError, Mailer, OutboundMail, TransportConfig, level,
};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

/// Body text that makes [`RecordingMailer`] reject the send.
pub const REJECT_MARKER: &str = "reject-me";

/// In-memory [`Mailer`] that records every delivered mail.
///
/// A gated mailer holds each send until [`release`](RecordingMailer::release)
/// hands out a permit, which keeps tasks pending for as long as a test needs.
#[derive(Default)]
pub struct RecordingMailer {
    attempts: AtomicUsize,
    sent: Mutex<Vec<OutboundMail>>,
    gate: Option<Semaphore>,
}

impl RecordingMailer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn gated() -> Arc<Self> {
        Arc::new(Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        })
    }

    pub fn release(&self, permits: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(permits);
        }
    }

    /// Sends started so far, including ones still held at the gate.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<OutboundMail> {
        self.sent.lock().clone()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.sent.lock().iter().map(|mail| mail.subject.clone()).collect()
    }

    pub async fn wait_for_attempts(&self, count: usize) {
        while self.attempts() < count {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: &OutboundMail) -> Result<(), MailError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| MailError::Aborted(e.to_string()))?
                .forget();
        }

        if mail.text.contains(REJECT_MARKER) {
            return Err(MailError::Permanent("550 mailbox unavailable".to_string()));
        }

        self.sent.lock().push(mail.clone());
        Ok(())
    }
}

pub fn config(threshold: Option<usize>, interval_ms: Option<u64>) -> TransportConfig {
    let mut config = TransportConfig::new(
        "App <app@example.com>",
        "smtp.example.com",
        587,
        "user",
        "pass",
        "ops@example.com",
    );
    config.flush_threshold = threshold;
    config.flush_interval = interval_ms;
    config
}

pub fn transport(config: TransportConfig, mailer: &Arc<RecordingMailer>) -> EmailTransport {
    EmailTransport::builder(config)
        .mailer(Arc::clone(mailer) as Arc<dyn Mailer>)
        .build()
        .expect("valid test configuration")
}

pub fn error_record(msg: &str) -> LogRecord {
    LogRecord::with_message(level::ERROR, msg)
}

pub fn error_records(count: usize) -> Vec<LogRecord> {
    (0..count).map(|i| error_record(&format!("failure {i}"))).collect()
}
