//! Email alerts over SMTP with STARTTLS.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, warn};

use schedwatch_core::EmailConfig;

use crate::channel::AlertChannel;
use crate::error::AlertError;

pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailChannel {
    /// Build the channel, or `Ok(None)` with a warning when credentials or
    /// the recipient are missing.
    pub fn from_config(config: &EmailConfig, timeout: Duration) -> Result<Option<Self>, AlertError> {
        let (Some(user), Some(pass), Some(to)) = (&config.smtp_user, &config.smtp_pass, &config.to)
        else {
            warn!("email configuration incomplete, skipping email alerts");
            return Ok(None);
        };

        crate::install_crypto_provider();

        let from = parse_mailbox(config.from.as_deref().unwrap_or(user))?;
        let to = parse_mailbox(to)?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| AlertError::Smtp(e.to_string()))?
            .port(config.smtp_port)
            .credentials(Credentials::new(user.clone(), pass.clone()))
            .timeout(Some(timeout))
            .build();

        info!(host = %config.smtp_host, port = config.smtp_port, %to, "email alerts enabled");
        Ok(Some(Self { transport, from, to }))
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, AlertError> {
    address.parse().map_err(|e: lettre::address::AddressError| AlertError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl AlertChannel for EmailChannel {
    fn name(&self) -> &str {
        "email"
    }

    async fn send(&self, subject: &str, body: &str) -> Result<(), AlertError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(format!("[ALERT] {subject}"))
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| AlertError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AlertError::Smtp(e.to_string()))?;
        Ok(())
    }
}
