use std::{path::PathBuf, sync::Arc};

use poise::serenity_prelude::{async_trait, ChannelId, Http};

use crate::{
    commands::player::reply,
    player::{Announcer, Response},
};

/// Posts session updates to the guild's log channel.
pub struct LogChannelAnnouncer {
    pub http: Arc<Http>,
    pub channel_id: ChannelId,
    pub default_art: PathBuf,
}

#[async_trait]
impl Announcer for LogChannelAnnouncer {
    async fn announce(&self, response: Response) {
        let message = reply::create_message(&response, &self.default_art).await;
        if let Err(e) = self
            .channel_id
            .send_message(self.http.clone(), message)
            .await
        {
            tracing::warn!("can't send message to log channel {}: {}", self.channel_id, e);
        }
    }
}
