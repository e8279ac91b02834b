use std::path::Path;

use poise::serenity_prelude::async_trait;

use super::{error::PlayerError, voice::AudioSource};

/// Where a remote clip is hosted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipProvider {
    SoundCloud,
    Clyp,
}

/// Turns track identities into playable streams.
///
/// Every call may be slow (network, child processes) and may fail with
/// [`PlayerError::TrackUnavailable`].
#[async_trait]
pub trait MediaResolver: Send + Sync {
    async fn resolve_local_file(&self, path: &Path) -> Result<AudioSource, PlayerError>;

    /// `url` is the video's page URL.
    async fn resolve_remote_video(&self, url: &str) -> Result<AudioSource, PlayerError>;

    async fn resolve_remote_clip(
        &self,
        provider: ClipProvider,
        id: &str,
    ) -> Result<AudioSource, PlayerError>;
}
