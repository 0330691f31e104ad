pub mod dispatcher;
pub mod email;
pub mod render;
pub mod telegram;

use crate::error::Result;
use async_trait::async_trait;

pub use dispatcher::{
    ChannelOutcome, DispatchReport, DispatchStatus, NotificationDispatcher, RetryPolicy,
};
pub use email::EmailChannel;
pub use telegram::TelegramChannel;

#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &str;

    async fn deliver(&self, message: &OutboundMessage) -> Result<()>;
}
