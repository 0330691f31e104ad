use super::{NotificationChannel, OutboundMessage};
use crate::config::EmailConfig;
use crate::error::Result;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use log::info;
use std::time::Duration;

pub struct EmailChannel {
    from: Mailbox,
    to: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailChannel {
    pub fn new(config: &EmailConfig, timeout: Duration) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.address.clone(),
                config.password.clone(),
            ))
            .timeout(Some(timeout))
            .build();

        Ok(Self {
            from: config.address.parse()?,
            to: config.recipient.parse()?,
            transport,
        })
    }

    fn build(&self, message: &OutboundMessage) -> Result<Message> {
        Ok(Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(message.subject.as_str())
            .header(ContentType::TEXT_HTML)
            .body(message.body.clone())?)
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn name(&self) -> &str {
        "email"
    }

    async fn deliver(&self, message: &OutboundMessage) -> Result<()> {
        let email = self.build(message)?;
        self.transport.send(email).await?;
        info!("Email sent successfully: {}", message.subject);
        Ok(())
    }
}
