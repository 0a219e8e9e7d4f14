use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::info;

use crate::config::SmtpConfig;

#[derive(Debug, Clone)]
pub struct OutboundMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: &OutboundMail) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    transport: SmtpTransport,
    from: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig, host: &str) -> anyhow::Result<Self> {
        let transport = match (config.username.clone(), config.password.clone()) {
            (Some(user), Some(pass)) => SmtpTransport::relay(host)?
                .credentials(Credentials::new(user, pass))
                .build(),
            // Unauthenticated relay, e.g. a local MTA.
            _ => SmtpTransport::builder_dangerous(host).build(),
        };
        Ok(Self {
            transport,
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, mail: &OutboundMail) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.from.parse()?)
            .to(mail.to.parse()?)
            .subject(mail.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body.clone())?;

        let transport = self.transport.clone();
        tokio::task::spawn_blocking(move || transport.send(&message)).await??;
        Ok(())
    }
}

/// Stands in when no SMTP host is configured: delivery becomes a log
/// line instead of a network call.
pub struct NullMailer;

#[async_trait]
impl MailTransport for NullMailer {
    async fn send(&self, mail: &OutboundMail) -> anyhow::Result<()> {
        info!(
            "mail delivery disabled, dropping message to {} ({})",
            mail.to, mail.subject
        );
        Ok(())
    }
}
