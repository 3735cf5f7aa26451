use async_trait::async_trait;
use common::config::TelegramSettings;
use common::error::DeliveryError;
use teloxide::prelude::*;
use tracing::debug;

use crate::traits::ChatTransport;

pub struct TelegramService {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramService {
    pub fn new(settings: &TelegramSettings) -> Self {
        Self {
            bot: Bot::new(settings.bot_token.clone()),
            chat_id: ChatId(settings.chat_id),
        }
    }
}

#[async_trait]
impl ChatTransport for TelegramService {
    // Plain text: model output is not escaped for Telegram markdown and a
    // stray `*` or `_` would get the whole message rejected.
    async fn send(&self, text: &str) -> Result<(), DeliveryError> {
        let message = self
            .bot
            .send_message(self.chat_id, text.to_string())
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        debug!("Telegram accepted message {:?}", message.id);
        Ok(())
    }
}
