pub mod config;
pub mod startup;

use config::Config;
use startup::StartupFile;

use std::sync::Arc;

use crate::{media::MediaClient, player::SessionRegistry};

/// Shared state handed to every command and event.
#[derive(Clone)]
pub struct Data {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionRegistry>,
    pub media: Arc<MediaClient>,
    pub startup: Arc<StartupFile>,
}

impl Data {
    /// Create a new [`Data`] instance.
    pub fn new(config: Config, sessions: Arc<SessionRegistry>) -> Self {
        let media = MediaClient::new(
            reqwest::Client::new(),
            config.yt_dlp_path.clone(),
            config.playlist_directory.clone(),
        );
        let startup = StartupFile::new(config.startup_file.clone());

        Self {
            config: Arc::new(config),
            sessions,
            media: Arc::new(media),
            startup: Arc::new(startup),
        }
    }
}
