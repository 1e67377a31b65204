//! The outbound mail capability

mod smtp;

use async_trait::async_trait;
use lettre::message::Mailbox;
pub use smtp::SmtpMailer;

use crate::error::MailError;

/// One notification email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMail {
    pub from: Mailbox,
    pub to: Vec<Mailbox>,
    pub subject: String,
    pub text: String,
}

/// Sends a single email.
///
/// Implementations own their retry, authentication, and timeout behaviour;
/// the pipeline only waits for the result.
#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    async fn send(&self, mail: &OutboundMail) -> Result<(), MailError>;
}
