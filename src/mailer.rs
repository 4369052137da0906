use anyhow::Context;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

pub const EMAIL_SUBJECT: &str = "Your Grade Card - XYZ College";

pub fn email_body(name: &str) -> String {
    format!("Dear {name},\n\nPlease find attached your grade card.\n\nRegards,\nXYZ College")
}

/// One outbound message: plain-text body plus the grade card PDF as the sole
/// attachment.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachment_name: String,
    pub attachment: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error("invalid recipient address `{address}`: {reason}")]
    Address { address: String, reason: String },
    #[error("failed to build message: {0}")]
    Message(String),
    #[error("smtp failure: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), SendError>;
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub from: String,
}

impl SmtpConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = std::env::var("SMTP_HOST").context("SMTP_HOST must be set")?;
        let username =
            std::env::var("SMTP_USERNAME").context("SMTP_USERNAME must be set")?;
        let password =
            std::env::var("SMTP_PASSWORD").context("SMTP_PASSWORD must be set")?;
        let from = std::env::var("SMTP_FROM").unwrap_or_else(|_| username.clone());
        Ok(Self {
            host,
            username,
            password,
            from,
        })
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .with_context(|| format!("failed to configure smtp relay {}", config.host))?
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        let from = config
            .from
            .parse()
            .with_context(|| format!("invalid sender address `{}`", config.from))?;
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), SendError> {
        let to: Mailbox = email.to.parse().map_err(|err| SendError::Address {
            address: email.to.clone(),
            reason: format!("{err}"),
        })?;

        let pdf_type = ContentType::parse("application/pdf")
            .map_err(|err| SendError::Message(err.to_string()))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.clone())
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(email.body.clone()))
                    .singlepart(
                        Attachment::new(email.attachment_name.clone())
                            .body(email.attachment.clone(), pdf_type),
                    ),
            )
            .map_err(|err| SendError::Message(err.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|err| SendError::Transport(err.to_string()))?;
        Ok(())
    }
}
