//! Confirmation mail transports.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use super::domain::ConfirmationEmail;
use super::repository::{MailError, Mailer};
use crate::config::{MailConfig, SmtpConfig};

const SUBJECT: &str = "We received your scholarship application";

/// Render the plain-text confirmation body.
pub fn render_confirmation(message: &ConfirmationEmail, program: &str) -> String {
    format!(
        "Hi {name},\n\n\
         Thank you for applying to the {program}. Your application has been received and is \
         now pending review.\n\n\
         We will reach out to this address once a decision has been made.\n\n\
         The {program} Team",
        name = message.name,
    )
}

/// Sends confirmations through an SMTP relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    program: String,
}

impl SmtpMailer {
    pub fn new(smtp: &SmtpConfig, mail: &MailConfig) -> Result<Self, MailError> {
        let from_address: Address = mail
            .from_email
            .parse()
            .map_err(|err| MailError::Address(format!("{}: {err}", mail.from_email)))?;
        let from = Mailbox::new(Some(mail.from_name.clone()), from_address);

        let transport = match (&smtp.username, &smtp.password) {
            (Some(user), Some(password)) => {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
                    .map_err(|err| MailError::Transport(err.to_string()))?
                    .port(smtp.port)
                    .credentials(Credentials::new(user.clone(), password.clone()))
                    .build()
            }
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&smtp.host)
                .port(smtp.port)
                .build(),
        };

        Ok(Self {
            transport,
            from,
            program: mail.from_name.clone(),
        })
    }

    fn build(&self, message: &ConfirmationEmail) -> Result<Message, MailError> {
        let to_address: Address = message
            .to
            .parse()
            .map_err(|err| MailError::Address(format!("recipient: {err}")))?;

        Message::builder()
            .from(self.from.clone())
            .to(Mailbox::new(Some(message.name.clone()), to_address))
            .subject(SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(render_confirmation(message, &self.program))
            .map_err(|err| MailError::Message(err.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: ConfirmationEmail) -> Result<(), MailError> {
        let email = self.build(&message)?;
        self.transport
            .send(email)
            .await
            .map_err(|err| MailError::Transport(err.to_string()))?;
        Ok(())
    }
}

/// Records confirmations in the log instead of sending them. Used when no relay is configured.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: ConfirmationEmail) -> Result<(), MailError> {
        let domain = message.to.rsplit_once('@').map(|(_, domain)| domain);
        info!(recipient_domain = ?domain, "smtp not configured; confirmation email logged only");
        Ok(())
    }
}

/// Either transport, chosen from configuration at startup.
pub enum ConfiguredMailer {
    Smtp(SmtpMailer),
    Log(LogMailer),
}

impl ConfiguredMailer {
    pub fn from_config(mail: &MailConfig) -> Result<Self, MailError> {
        match &mail.smtp {
            Some(smtp) => Ok(Self::Smtp(SmtpMailer::new(smtp, mail)?)),
            None => Ok(Self::Log(LogMailer)),
        }
    }

    pub fn transport_name(&self) -> &'static str {
        match self {
            ConfiguredMailer::Smtp(_) => "smtp",
            ConfiguredMailer::Log(_) => "log",
        }
    }
}

#[async_trait]
impl Mailer for ConfiguredMailer {
    async fn send(&self, message: ConfirmationEmail) -> Result<(), MailError> {
        match self {
            ConfiguredMailer::Smtp(mailer) => mailer.send(message).await,
            ConfiguredMailer::Log(mailer) => mailer.send(message).await,
        }
    }
}
