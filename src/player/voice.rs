use std::path::PathBuf;

use poise::serenity_prelude::{async_trait, ChannelId, UserId};
use tokio::sync::mpsc;

use super::error::PlayerError;

/// A resolved, directly playable stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    File(PathBuf),
    Url(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Playing,
    Paused,
}

/// Sent once per track when the decoder is done with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackEnd {
    /// Set when playback stopped because of a decode/stream error.
    pub error: Option<String>,
}

/// Handed to the voice backend with every track; the backend fires it from
/// whatever context its decoder finishes on.
#[derive(Debug, Clone)]
pub struct TrackEndSignal(mpsc::UnboundedSender<TrackEnd>);

impl TrackEndSignal {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TrackEnd>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }

    pub fn fire(&self, end: TrackEnd) {
        // the receiver only goes away once the session loop has exited
        let _ = self.0.send(end);
    }
}

/// What a session needs from the voice connection it is bound to.
#[async_trait]
pub trait VoiceConnection: Send + Sync {
    fn channel_id(&self) -> ChannelId;

    /// Non-deafened humans currently in the bound channel, the bot excluded.
    fn listeners(&self) -> Vec<UserId>;

    fn is_server_muted(&self) -> bool;

    /// Start streaming `source`, replacing whatever was playing.
    async fn play(
        &self,
        source: AudioSource,
        volume: f32,
        on_end: TrackEndSignal,
    ) -> Result<(), PlayerError>;

    async fn stream_state(&self) -> StreamState;

    async fn pause(&self);

    async fn resume(&self);

    /// Halt the current stream. The end signal of that stream still fires.
    async fn stop(&self);

    async fn set_volume(&self, volume: f32);

    async fn disconnect(&self);
}
