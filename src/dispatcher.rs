//! Turns log records into in-flight send tasks

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use lettre::message::Mailbox;
use tokio::task::JoinHandle;

use crate::{
    error::MailError,
    format::Formatter,
    mailer::{Mailer, OutboundMail},
    outgoing,
    record::LogRecord,
};

/// Terminal state of a [`MailTask`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    Delivered,
    Rejected(MailError),
}

impl Settlement {
    pub const fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// One outbound email whose send has already started.
///
/// The task is never retried; awaiting [`settle`](MailTask::settle) only
/// observes the outcome.
#[derive(Debug)]
pub struct MailTask {
    id: u64,
    handle: JoinHandle<Result<(), MailError>>,
}

impl MailTask {
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the send to finish. Never fails: rejections are part of the result.
    pub async fn settle(self) -> (u64, Settlement) {
        let settlement = match self.handle.await {
            Ok(Ok(())) => Settlement::Delivered,
            Ok(Err(e)) => Settlement::Rejected(e),
            Err(e) => Settlement::Rejected(e.into()),
        };

        (self.id, settlement)
    }
}

/// Builds the notification for a record and starts sending it.
pub struct MailDispatcher {
    mailer: Arc<dyn Mailer>,
    formatter: Arc<dyn Formatter>,
    from: Mailbox,
    to: Vec<Mailbox>,
    next_id: AtomicU64,
}

impl MailDispatcher {
    pub fn new(
        mailer: Arc<dyn Mailer>,
        formatter: Arc<dyn Formatter>,
        from: Mailbox,
        to: Vec<Mailbox>,
    ) -> Self {
        Self {
            mailer,
            formatter,
            from,
            to,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn compose(&self, record: &LogRecord, label: &str) -> OutboundMail {
        OutboundMail {
            from: self.from.clone(),
            to: self.to.clone(),
            subject: self.formatter.subject(record, label),
            text: self.formatter.body(record, label),
        }
    }

    /// Start sending the notification for `record` and return immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch(&self, record: &LogRecord, label: &str) -> MailTask {
        let mail = self.compose(record, label);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        outgoing!(task = id, subject = %mail.subject, "Dispatching notification");

        let mailer = Arc::clone(&self.mailer);
        let handle = tokio::spawn(async move { mailer.send(&mail).await });

        MailTask { id, handle }
    }
}
