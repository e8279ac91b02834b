//! Structured replies handed to the chat layer.
//!
//! The player never builds chat messages itself, it only describes them.
//! `commands::player::reply` turns a [`Response`] into an embed.

use std::sync::Arc;

use poise::serenity_prelude::async_trait;

use super::error::PlayerError;

pub const COLOUR_INFO: u32 = 0x004d40;
pub const COLOUR_ERROR: u32 = 0xe57a80;
pub const COLOUR_LOCAL: u32 = 0xe57a80;
pub const COLOUR_YOUTUBE: u32 = 0xf44336;
pub const COLOUR_SOUNDCLOUD: u32 = 0xff5500;
pub const COLOUR_CLYP: u32 = 0x009688;

#[derive(Debug, Clone, PartialEq)]
pub enum Thumbnail {
    Url(String),
    /// Raw image bytes (e.g. embedded MP3 cover art), sent as an attachment.
    Attachment { filename: String, data: Arc<[u8]> },
    /// The shared "art not found" image.
    DefaultArt,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Response {
    pub author: Option<String>,
    pub author_url: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub colour: u32,
    pub thumbnail: Option<Thumbnail>,
    pub fields: Vec<QueueLine>,
}

/// One line in the upcoming queue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueLine {
    pub name: String,
    pub value: String,
}

impl Response {
    pub fn new(title: impl Into<String>, colour: u32) -> Self {
        Self {
            title: title.into(),
            colour,
            ..Default::default()
        }
    }

    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(title, COLOUR_INFO).description(description)
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn author_url(mut self, url: impl Into<String>) -> Self {
        self.author_url = Some(url.into());
        self
    }

    pub fn thumbnail(mut self, thumbnail: Thumbnail) -> Self {
        self.thumbnail = Some(thumbnail);
        self
    }

    pub fn field(mut self, line: QueueLine) -> Self {
        self.fields.push(line);
        self
    }

    /// The reply sent when a command is refused.
    pub fn rejection(command: &str, error: &PlayerError) -> Self {
        let title = match error {
            PlayerError::TrackUnavailable(_) | PlayerError::NoSelection(_) => {
                "There was an error processing your request..."
            }
            _ => "Your request cannot be processed",
        };

        Self::new(title, COLOUR_ERROR)
            .author(format!("Error: {}", command))
            .description(error.to_string())
    }
}

/// Where a session posts what it is doing, usually its log channel.
#[async_trait]
pub trait Announcer: Send + Sync {
    async fn announce(&self, response: Response);
}

/// For sessions without a log channel.
pub struct SilentAnnouncer;

#[async_trait]
impl Announcer for SilentAnnouncer {
    async fn announce(&self, response: Response) {
        tracing::debug!("no log channel, dropping '{}'", response.title);
    }
}
