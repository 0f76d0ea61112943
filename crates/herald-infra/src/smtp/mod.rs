//! SMTP `Mailer` over STARTTLS with login credentials.

use herald_core::channel::Mailer;
use herald_types::config::SmtpConfig;
use herald_types::error::SendError;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

/// Sends plain-text mail through a submission server.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn from_config(config: &SmtpConfig) -> Result<Self, SendError> {
        let password = config
            .password
            .as_ref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| SendError::Authentication("smtp.password is not set".to_string()))?;
        let from = parse_mailbox(&config.from)?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| SendError::Transport(e.to_string()))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                password.expose().to_string(),
            ))
            .build();

        Ok(Self { transport, from })
    }
}

impl Mailer for SmtpMailer {
    async fn send(&self, subject: &str, body: &str, recipients: &[String]) -> Result<(), SendError> {
        let message = build_message(&self.from, subject, body, recipients)?;
        debug!(recipients = recipients.len(), "sending email");

        self.transport.send(message).await.map_err(|e| {
            let auth_rejected = e
                .status()
                .is_some_and(|code| code.to_string() == "535");
            if auth_rejected {
                SendError::Authentication(e.to_string())
            } else {
                SendError::Transport(e.to_string())
            }
        })?;

        info!(recipients = recipients.len(), "email sent");
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, SendError> {
    address
        .trim()
        .parse()
        .map_err(|e: lettre::address::AddressError| SendError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

/// Build a plain-text message with every recipient in `To`.
pub fn build_message(
    from: &Mailbox,
    subject: &str,
    body: &str,
    recipients: &[String],
) -> Result<Message, SendError> {
    if recipients.is_empty() {
        return Err(SendError::Message("no recipients".to_string()));
    }

    let mut builder = Message::builder()
        .from(from.clone())
        .subject(subject)
        .header(ContentType::TEXT_PLAIN);
    for recipient in recipients {
        builder = builder.to(parse_mailbox(recipient)?);
    }

    builder
        .body(body.to_string())
        .map_err(|e| SendError::Message(e.to_string()))
}
