use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
};

use super::{Mailer, OutboundMail};
use crate::{
    config::{TlsMode, TransportConfig},
    error::{ConfigError, MailError},
    internal, outgoing,
};

/// [`Mailer`] backed by an authenticated SMTP relay.
///
/// Connections are pooled by the underlying transport, so concurrent sends
/// from one batch share a handful of sessions instead of dialling per email.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    server: String,
    debug: bool,
    verbose: bool,
}

impl SmtpMailer {
    /// Build the relay client. No connection is made until the first send.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS parameters cannot be created for the host.
    pub fn from_config(config: &TransportConfig) -> Result<Self, ConfigError> {
        let host = config.smtp_host.trim();

        let parameters = || {
            TlsParameters::new(host.to_string()).map_err(|e| ConfigError::Smtp(e.to_string()))
        };

        let tls = match config.smtp_tls {
            TlsMode::Opportunistic => Tls::Opportunistic(parameters()?),
            TlsMode::Required => Tls::Required(parameters()?),
            TlsMode::Wrapper => Tls::Wrapper(parameters()?),
            TlsMode::Plaintext => Tls::None,
        };

        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(config.smtp_port)
            .tls(tls)
            .credentials(Credentials::new(
                config.smtp_user.clone(),
                config.smtp_pass.clone(),
            ))
            .timeout(Some(config.smtp_timeout()))
            .build();

        internal!(
            "SMTP relay configured for {host}:{} ({:?})",
            config.smtp_port,
            config.smtp_tls
        );

        Ok(Self {
            transport,
            server: format!("{host}:{}", config.smtp_port),
            debug: config.debug,
            verbose: config.logger,
        })
    }

    fn build_message(mail: &OutboundMail) -> Result<Message, MailError> {
        let mut builder = Message::builder()
            .from(mail.from.clone())
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_PLAIN);

        for to in &mail.to {
            builder = builder.to(to.clone());
        }

        builder
            .body(mail.text.clone())
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &OutboundMail) -> Result<(), MailError> {
        let message = Self::build_message(mail)?;

        if self.debug {
            outgoing!(
                level = DEBUG,
                server = %self.server,
                subject = %mail.subject,
                recipients = mail.to.len(),
                "Sending notification"
            );
        }

        match self.transport.send(message).await {
            Ok(response) => {
                if self.debug {
                    outgoing!(
                        level = DEBUG,
                        server = %self.server,
                        code = %response.code(),
                        "Relay accepted message: {}",
                        response.message().collect::<Vec<_>>().join(" ")
                    );
                }
                if self.verbose {
                    internal!(level = INFO, subject = %mail.subject, "Notification delivered");
                }
                Ok(())
            }
            Err(e) => {
                if self.verbose {
                    internal!(
                        level = WARN,
                        server = %self.server,
                        error = %e,
                        "Notification delivery failed"
                    );
                }
                Err(e.into())
            }
        }
    }
}
