//! Playback core: tracks, playlists, per-guild sessions and their registry.
//!
//! Nothing in here talks to Discord directly. The voice connection, media
//! lookups and the log channel are reached through [`VoiceConnection`],
//! [`MediaResolver`] and [`Announcer`].

pub mod display;
pub mod error;
pub mod playlist;
pub mod registry;
pub mod session;
pub mod source;
pub mod tags;
pub mod track;
pub mod vote;
pub mod voice;

pub use display::{Announcer, QueueLine, Response, SilentAnnouncer, Thumbnail};
pub use error::PlayerError;
pub use playlist::{AutoFill, Playlist, DEFAULT_PEEK_LENGTH};
pub use registry::SessionRegistry;
pub use session::{volume_or_default, Session, StartupEntry, DEFAULT_VOLUME};
pub use source::{ClipProvider, MediaResolver};
pub use track::{Requester, Track};
pub use vote::VoteOutcome;
pub use voice::{AudioSource, StreamState, TrackEnd, TrackEndSignal, VoiceConnection};
