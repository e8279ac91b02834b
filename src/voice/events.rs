use std::sync::Weak;

use poise::serenity_prelude::async_trait;
use songbird::tracks::PlayMode;

use crate::player::{Session, TrackEnd, TrackEndSignal};

/// Registered on every track for [`songbird::TrackEvent::End`] and
/// [`songbird::TrackEvent::Error`]; wakes the session loop.
#[derive(Debug, Clone)]
pub struct TrackEndHandler {
    pub signal: TrackEndSignal,
}

#[async_trait]
impl songbird::EventHandler for TrackEndHandler {
    async fn act(&self, ctx: &songbird::EventContext<'_>) -> Option<songbird::Event> {
        let (track_state, _) = match ctx {
            songbird::EventContext::Track(track) => track.first()?,
            _ => return None,
        };

        let error = match &track_state.playing {
            PlayMode::Play | PlayMode::Pause => return None,
            PlayMode::Errored(e) => Some(format!("{:?}", e)),
            _ => None,
        };

        self.signal.fire(TrackEnd { error });
        None
    }
}

/// Global driver event of a session's call. Holds the session weakly so a
/// call outliving its session can't tear down a newer one.
#[derive(Debug)]
pub struct DisconnectHandler {
    pub session: Weak<Session>,
}

#[async_trait]
impl songbird::EventHandler for DisconnectHandler {
    async fn act(&self, ctx: &songbird::EventContext<'_>) -> Option<songbird::Event> {
        let songbird::EventContext::DriverDisconnect(data) = ctx else {
            return None;
        };
        let session = self.session.upgrade()?;

        let reason = data
            .reason
            .as_ref()
            .map(|reason| format!("{:?}", reason))
            .unwrap_or_else(|| "driver disconnected".to_string());
        session.connection_lost(&reason).await;

        None
    }
}
