use std::{collections::HashMap, sync::Arc, time::Duration};

use poise::serenity_prelude::GuildId;
use tokio::sync::Mutex;

use super::{error::PlayerError, session::Session};

/// The live session of every guild, at most one each.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<GuildId, Arc<Session>>>,
}

impl SessionRegistry {
    pub async fn get(&self, guild_id: GuildId) -> Option<Arc<Session>> {
        self.sessions.lock().await.get(&guild_id).cloned()
    }

    /// Register `session` for `guild_id`.
    ///
    /// The entry is dropped again once the session releases its voice
    /// connection, however that happens.
    pub async fn create(
        self: &Arc<Self>,
        guild_id: GuildId,
        session: Arc<Session>,
    ) -> Result<Arc<Session>, PlayerError> {
        {
            let mut sessions = self.sessions.lock().await;
            if sessions.contains_key(&guild_id) {
                return Err(PlayerError::SessionAlreadyRunning);
            }
            sessions.insert(guild_id, session.clone());
        }

        let registry = Arc::downgrade(self);
        let watched = session.clone();
        tokio::spawn(async move {
            watched.released().await;
            if let Some(registry) = registry.upgrade() {
                registry.remove_if_same(guild_id, &watched).await;
            }
        });

        Ok(session)
    }

    #[cfg(test)]
    pub async fn remove(&self, guild_id: GuildId) -> Option<Arc<Session>> {
        self.sessions.lock().await.remove(&guild_id)
    }

    /// Remove the entry only if it still is `session`; a restart may have
    /// put a new one in its place.
    async fn remove_if_same(&self, guild_id: GuildId, session: &Arc<Session>) {
        let mut sessions = self.sessions.lock().await;
        if sessions
            .get(&guild_id)
            .map(|current| Arc::ptr_eq(current, session))
            .unwrap_or(false)
        {
            sessions.remove(&guild_id);
            tracing::info!("guild {}: session removed", guild_id);
        }
    }

    /// Stop the guild's session and wait for it to let go of the voice
    /// connection, so a new one can take its place right away.
    pub async fn stop_and_wait(
        &self,
        guild_id: GuildId,
        timeout: Duration,
    ) -> Result<Arc<Session>, PlayerError> {
        let session = self.get(guild_id).await.ok_or(PlayerError::SessionNotFound)?;
        session.stop().await;

        if tokio::time::timeout(timeout, session.released()).await.is_err() {
            tracing::warn!("guild {}: session still holds its voice connection", guild_id);
        }
        self.remove_if_same(guild_id, &session).await;
        Ok(session)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Stop every session, used on shutdown.
    pub async fn stop_all(&self) {
        let sessions: Vec<_> = self.sessions.lock().await.values().cloned().collect();
        for session in sessions {
            session.stop().await;
        }
    }
}
