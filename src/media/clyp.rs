use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::player::{
    source::ClipProvider,
    track::{RemoteClip, Requester, Track},
    PlayerError,
};

const CLYP_API: &str = "https://api.clyp.it";

static CLYP_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:clyp\.it/|^)([A-Za-z\d]+)(?:$|#)").expect("clyp id regex is valid")
});

/// The clip id in a Clyp URL, or the query itself if it already is one.
pub fn parse_clyp_id(query: &str) -> Option<&str> {
    CLYP_ID
        .captures(query.trim())
        .and_then(|captures| captures.get(1))
        .map(|id| id.as_str())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClypClip {
    pub title: String,
    pub audio_file_id: String,
    pub artwork_picture_url: Option<String>,
    pub mp3_url: String,
}

impl ClypClip {
    pub fn into_track(self, requester: Requester) -> Track {
        Track::RemoteClip(RemoteClip {
            provider: ClipProvider::Clyp,
            url: format!("https://clyp.it/{}", self.audio_file_id),
            id: self.audio_file_id,
            title: self.title,
            creator: None,
            thumbnail: self.artwork_picture_url,
            requester: Some(requester),
        })
    }
}

pub async fn fetch_clip(http: &reqwest::Client, id: &str) -> Result<ClypClip, PlayerError> {
    let not_found = || PlayerError::unavailable("Unable to find clyp with given ID or URL");

    let response = http
        .get(format!("{}/{}", CLYP_API, id))
        .send()
        .await
        .map_err(|e| {
            tracing::warn!("clyp request for {} failed: {}", id, e);
            not_found()
        })?;
    if !response.status().is_success() {
        return Err(not_found());
    }

    response.json::<ClypClip>().await.map_err(|e| {
        tracing::warn!("can't parse clyp response for {}: {}", id, e);
        not_found()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use poise::serenity_prelude::UserId;

    #[test]
    fn finds_id_in_urls_and_bare_ids() {
        assert_eq!(parse_clyp_id("https://clyp.it/abc123"), Some("abc123"));
        assert_eq!(parse_clyp_id("clyp.it/abc123#comments"), Some("abc123"));
        assert_eq!(parse_clyp_id("abc123"), Some("abc123"));
        assert_eq!(parse_clyp_id("  abc123  "), Some("abc123"));
        assert_eq!(parse_clyp_id("two words"), None);
        assert_eq!(parse_clyp_id(""), None);
    }

    #[test]
    fn clip_becomes_a_track_without_creator() {
        let clip: ClypClip = serde_json::from_str(
            r#"{
                "Title": "demo",
                "AudioFileId": "abc123",
                "ArtworkPictureUrl": null,
                "Mp3Url": "https://audio.clyp.it/abc123.mp3",
                "Duration": 31.2
            }"#,
        )
        .unwrap();

        let Track::RemoteClip(track) = clip.into_track(Requester::new(UserId::new(1), "me")) else {
            panic!("expected a remote clip");
        };
        assert_eq!(track.provider, ClipProvider::Clyp);
        assert_eq!(track.id, "abc123");
        assert_eq!(track.url, "https://clyp.it/abc123");
        assert!(track.creator.is_none());
        assert!(track.thumbnail.is_none());
    }
}
