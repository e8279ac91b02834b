use std::{process::Stdio, sync::LazyLock};

use regex::Regex;
use tokio::process::Command;
use tracing::error;

use crate::player::{
    source::ClipProvider,
    track::{RemoteClip, RemoteVideo, Requester, Track, UNKNOWN_FIELD},
    PlayerError,
};

// use https://regexr.com/ to build the regex, using these test cases,
// space prefix included; remember to add them here if you find a new one
//
//  (official)
//  (official mv)
//  | official mv
//  (official audio)
//  [official audio]
//  (official video)
//  [official video]
//  (official music video)
//  [official music video]
//  | official music video
//  (official lyric video)
//  | official lyric video
//  [official lyric video]
//  | lyrics music video
//  | lyrics video
static TITLE_NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i) (\(|\[|\| )( ?(official|mv|audio|video|music|lyrics|lyric) ?)+(\)|\])?")
        .expect("title regex is valid")
});

/// Stores info about formats in a track.
#[derive(Debug, serde::Deserialize, Clone)]
pub struct Format {
    #[serde(default)]
    pub url: String,
    #[serde(rename = "acodec")]
    pub codec: Option<String>,
    #[serde(rename = "abr")]
    pub bitrate: Option<f32>,
}

/// One line of `yt-dlp --print-json`.
#[derive(Debug, serde::Deserialize, Clone)]
pub struct TrackInfo {
    pub id: String,
    pub webpage_url: String,
    formats: Option<Vec<Format>>,

    #[serde(rename = "duration")]
    pub duration_in_sec: Option<f64>,
    title: String,
    pub thumbnail: Option<String>,
    pub artist: Option<String>,
    pub uploader: Option<String>,
    pub channel: Option<String>,
}

impl TrackInfo {
    /// Get a cleaned up title.
    pub fn get_title(&self) -> String {
        TITLE_NOISE.replace_all(&self.title, "").trim().to_string()
    }

    pub fn creator(&self) -> Option<&str> {
        self.artist
            .as_deref()
            .or(self.uploader.as_deref())
            .or(self.channel.as_deref())
    }

    /// Get playable direct URL of the track from Vec<Format>.
    /// If the track is not available in any of the formats, return `None`.
    pub fn get_playable_url(&self) -> Option<String> {
        let formats = self.formats.as_ref()?;

        let mut best_url = None;
        let mut best_bitrate = 0.0;

        let mut mp3_url = None;
        let mut mp3_bitrate = 0.0;

        for format in formats.iter().filter(|format| !format.url.is_empty()) {
            if let (Some(codec), Some(bitrate)) = (format.codec.as_deref(), format.bitrate) {
                match codec {
                    // lossless codecs, return immediately
                    "alac" | "flac" | "pcm" => {
                        return Some(format.url.clone());
                    }
                    // lossy codecs, can't go wrong when
                    // choose one with the highest bitrate
                    "opus" | "aac" | "vorbis" => {
                        if bitrate > best_bitrate {
                            best_url = Some(format.url.clone());
                            best_bitrate = bitrate;
                        }
                    }
                    // final resort if can't find a better one
                    "mp3" => {
                        if bitrate > mp3_bitrate {
                            mp3_url = Some(format.url.clone());
                            mp3_bitrate = bitrate;
                        }
                    }
                    _ => (),
                }
            }
        }

        best_url.or(mp3_url)
    }

    /// Videos without a known duration count as short.
    pub fn is_shorter_than(&self, seconds: f64) -> bool {
        self.duration_in_sec.map(|d| d < seconds).unwrap_or(true)
    }

    pub fn into_remote_video(self, requester: Requester) -> Track {
        Track::RemoteVideo(RemoteVideo {
            title: self.get_title(),
            creator: self.creator().unwrap_or(UNKNOWN_FIELD).to_string(),
            duration_in_sec: self.duration_in_sec.unwrap_or_default() as u64,
            id: self.id,
            url: self.webpage_url,
            thumbnail: self.thumbnail,
            requester: Some(requester),
        })
    }

    /// SoundCloud tracks are resolved again from their page URL.
    pub fn into_soundcloud_clip(self, requester: Requester) -> Track {
        Track::RemoteClip(RemoteClip {
            provider: ClipProvider::SoundCloud,
            title: self.title.clone(),
            creator: self.creator().map(str::to_string),
            id: self.webpage_url.clone(),
            url: self.webpage_url,
            thumbnail: self.thumbnail,
            requester: Some(requester),
        })
    }
}

/// Run yt-dlp without downloading anything and parse every JSON line it
/// prints. Lines that don't parse are logged and skipped.
pub async fn fetch_info(yt_dlp_path: &str, target: &str) -> Result<Vec<TrackInfo>, PlayerError> {
    let output = Command::new(yt_dlp_path)
        .arg("-x")
        .arg("--skip-download")
        .arg("--print-json")
        .arg("--no-playlist")
        .arg("--no-warnings")
        .arg(target)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| PlayerError::unavailable(format!("can't run yt-dlp: {}", e)))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let infos: Vec<TrackInfo> = stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str(line) {
            Ok(info) => Some(info),
            Err(e) => {
                error!("can't parse yt-dlp output: {}", e);
                None
            }
        })
        .collect();

    if infos.is_empty() && !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = stderr
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .unwrap_or("yt-dlp exited with an error");
        return Err(PlayerError::unavailable(reason.to_string()));
    }

    Ok(infos)
}

/// Direct stream URL for a single video or track page.
pub async fn playable_url(yt_dlp_path: &str, page_url: &str) -> Result<String, PlayerError> {
    let info = fetch_info(yt_dlp_path, page_url)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| PlayerError::unavailable(format!("nothing found at {}", page_url)))?;

    info.get_playable_url().ok_or_else(|| {
        PlayerError::unavailable("no playable format, yt-dlp may need an update")
    })
}
