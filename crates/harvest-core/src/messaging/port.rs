use async_trait::async_trait;

use crate::{
    messaging::types::{ChatId, MessageRef, MessagingCapabilities},
    Result,
};

/// Messenger port used to reply to operators.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef>;
    async fn edit_html(&self, msg: MessageRef, html: &str) -> Result<()>;
}
