//! Finding tracks and turning them into streams.
//!
//! YouTube and SoundCloud go through yt-dlp, Clyp through its public API,
//! local files are looked up in the playlist directory.

pub mod clyp;
pub mod search;
pub mod ytdlp;

use std::path::{Path, PathBuf};

use poise::serenity_prelude::async_trait;
use tracing::debug;

use crate::player::{
    source::{ClipProvider, MediaResolver},
    track::{Requester, Track},
    voice::AudioSource,
    PlayerError,
};

pub use search::{SearchKind, SearchResults, SEARCH_RESULT_LIMIT};

/// Longest YouTube video offered in search results.
const MAX_VIDEO_SECONDS: f64 = 600.0;

/// Extra YouTube results asked for, to make up for the ones too long to keep.
const YOUTUBE_OVERFETCH: usize = 2;

/// The shared handle for every outbound lookup.
#[derive(Debug, Clone)]
pub struct MediaClient {
    http: reqwest::Client,
    yt_dlp_path: String,
    playlist_directory: PathBuf,
}

impl MediaClient {
    pub fn new(
        http: reqwest::Client,
        yt_dlp_path: impl Into<String>,
        playlist_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            http,
            yt_dlp_path: yt_dlp_path.into(),
            playlist_directory: playlist_directory.into(),
        }
    }

    /// The HTTP client, also used by songbird to stream remote sources.
    pub fn http(&self) -> reqwest::Client {
        self.http.clone()
    }

    pub async fn search(
        &self,
        kind: SearchKind,
        query: &str,
        requester: Requester,
    ) -> Result<SearchResults, PlayerError> {
        let query = query.trim();
        debug!("searching {:?} for '{}'", kind, query);

        let (query, tracks) = match kind {
            SearchKind::Mp3 => {
                let directory = self.playlist_directory.clone();
                let (owned_query, owned_requester) = (query.to_string(), requester.clone());
                let tracks = tokio::task::spawn_blocking(move || {
                    search::search_mp3_files(&directory, &owned_query, &owned_requester)
                })
                .await
                .map_err(|e| PlayerError::unavailable(format!("mp3 search failed: {}", e)))?;
                (query.to_string(), tracks)
            }
            SearchKind::YouTube => {
                let target = format!(
                    "ytsearch{}:{}",
                    SEARCH_RESULT_LIMIT + YOUTUBE_OVERFETCH,
                    query
                );
                let tracks = ytdlp::fetch_info(&self.yt_dlp_path, &target)
                    .await?
                    .into_iter()
                    .filter(|info| info.is_shorter_than(MAX_VIDEO_SECONDS))
                    .take(SEARCH_RESULT_LIMIT)
                    .map(|info| info.into_remote_video(requester.clone()))
                    .collect();
                (query.to_string(), tracks)
            }
            SearchKind::SoundCloud => {
                let target = format!("scsearch{}:{}", SEARCH_RESULT_LIMIT, query);
                let tracks = ytdlp::fetch_info(&self.yt_dlp_path, &target)
                    .await?
                    .into_iter()
                    .take(SEARCH_RESULT_LIMIT)
                    .map(|info| info.into_soundcloud_clip(requester.clone()))
                    .collect();
                (query.to_string(), tracks)
            }
            SearchKind::Clyp => {
                let id = clyp::parse_clyp_id(query).ok_or_else(|| {
                    PlayerError::unavailable("Unable to find clyp with given ID or URL")
                })?;
                let clip = clyp::fetch_clip(&self.http, id).await?;
                (id.to_string(), vec![clip.into_track(requester.clone())])
            }
        };

        Ok(SearchResults {
            kind,
            query,
            requester,
            tracks,
        })
    }
}

#[async_trait]
impl MediaResolver for MediaClient {
    async fn resolve_local_file(&self, path: &Path) -> Result<AudioSource, PlayerError> {
        match tokio::fs::metadata(path).await {
            Ok(metadata) if metadata.is_file() => Ok(AudioSource::File(path.to_path_buf())),
            Ok(_) => Err(PlayerError::unavailable(format!(
                "{} is not a file",
                path.display()
            ))),
            Err(e) => Err(PlayerError::unavailable(format!(
                "can't read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn resolve_remote_video(&self, url: &str) -> Result<AudioSource, PlayerError> {
        ytdlp::playable_url(&self.yt_dlp_path, url)
            .await
            .map(AudioSource::Url)
    }

    async fn resolve_remote_clip(
        &self,
        provider: ClipProvider,
        id: &str,
    ) -> Result<AudioSource, PlayerError> {
        match provider {
            ClipProvider::SoundCloud => ytdlp::playable_url(&self.yt_dlp_path, id)
                .await
                .map(AudioSource::Url),
            ClipProvider::Clyp => clyp::fetch_clip(&self.http, id)
                .await
                .map(|clip| AudioSource::Url(clip.mp3_url)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn client(directory: &Path) -> MediaClient {
        MediaClient::new(reqwest::Client::new(), "/nonexistent/yt-dlp", directory)
    }

    #[tokio::test]
    async fn local_file_must_exist() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("song.mp3");
        let media = client(dir.path());

        assert!(matches!(
            media.resolve_local_file(&path).await,
            Err(PlayerError::TrackUnavailable(_))
        ));

        std::fs::write(&path, b"x").unwrap();
        assert_eq!(
            media.resolve_local_file(&path).await,
            Ok(AudioSource::File(path.clone()))
        );
        assert!(media.resolve_local_file(dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn missing_yt_dlp_makes_tracks_unavailable() {
        let dir = tempdir().unwrap();
        let media = client(dir.path());

        assert!(matches!(
            media.resolve_remote_video("https://youtu.be/x").await,
            Err(PlayerError::TrackUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn malformed_clyp_query_is_rejected_without_a_request() {
        let dir = tempdir().unwrap();
        let media = client(dir.path());
        let requester = Requester::new(poise::serenity_prelude::UserId::new(1), "me");

        assert!(media
            .search(SearchKind::Clyp, "not a clyp", requester)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn mp3_search_of_empty_directory_finds_nothing() {
        let dir = tempdir().unwrap();
        let media = client(dir.path());
        let requester = Requester::new(poise::serenity_prelude::UserId::new(1), "me");

        let results = media.search(SearchKind::Mp3, "anything", requester).await.unwrap();
        assert!(results.is_empty());
        assert_eq!(results.query, "anything");
    }
}
