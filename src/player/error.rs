use thiserror::Error;

/// Everything the player can refuse or fail with.
///
/// Only [`PlayerError::VoiceConnectionLost`] tears a session down, the rest
/// are reported back to whoever asked.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlayerError {
    #[error("track unavailable: {0}")]
    TrackUnavailable(String),

    #[error("There is currently no player running on this server...")]
    SessionNotFound,

    #[error("There is already a player running on this server...")]
    SessionAlreadyRunning,

    #[error("{0}")]
    PermissionDenied(String),

    #[error("voice connection lost: {0}")]
    VoiceConnectionLost(String),

    #[error("Nothing is playing right now...")]
    NothingPlaying,

    #[error("You can only request up-to {0} songs in advance...")]
    TooManyRequests(usize),

    #[error("You are not in a voice channel...")]
    NotInVoiceChannel,

    #[error("{0}")]
    NoSelection(String),

    #[error("startup list: {0}")]
    Startup(String),
}

impl PlayerError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::TrackUnavailable(reason.into())
    }

    pub fn not_listening() -> Self {
        Self::PermissionDenied("You are currently not listening to the player...".into())
    }

    pub fn not_admin() -> Self {
        Self::PermissionDenied("You must be an administrator to use this command...".into())
    }
}
