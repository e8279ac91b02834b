use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use poise::serenity_prelude::UserId;

use super::{
    display::{
        QueueLine, Response, Thumbnail, COLOUR_CLYP, COLOUR_LOCAL, COLOUR_SOUNDCLOUD,
        COLOUR_YOUTUBE,
    },
    error::PlayerError,
    source::{ClipProvider, MediaResolver},
    tags::FileTags,
    voice::AudioSource,
};

/// Placeholder for tag fields a file doesn't have.
pub const UNKNOWN_FIELD: &str = "???";

/// Who asked for a track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub id: UserId,
    pub name: String,
}

impl Requester {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocalFile {
    pub path: PathBuf,
    pub title: String,
    pub album: String,
    pub artist: String,
    pub date: String,
    pub cover: Option<Arc<[u8]>>,
    pub requester: Option<Requester>,
}

#[derive(Debug, Clone)]
pub struct RemoteVideo {
    pub id: String,
    pub url: String,
    pub title: String,
    pub creator: String,
    pub thumbnail: Option<String>,
    pub duration_in_sec: u64,
    pub requester: Option<Requester>,
}

#[derive(Debug, Clone)]
pub struct RemoteClip {
    pub provider: ClipProvider,
    /// Provider-side identifier used to resolve the stream again.
    pub id: String,
    pub url: String,
    pub title: String,
    pub creator: Option<String>,
    pub thumbnail: Option<String>,
    pub requester: Option<Requester>,
}

/// Something the player can play.
#[derive(Debug, Clone)]
pub enum Track {
    LocalFile(LocalFile),
    RemoteVideo(RemoteVideo),
    RemoteClip(RemoteClip),
}

impl LocalFile {
    /// Read the file's tags. Missing fields become [`UNKNOWN_FIELD`], a file
    /// that can't be parsed at all is unavailable.
    pub fn open(path: &Path, requester: Option<Requester>) -> Result<Self, PlayerError> {
        let tags = FileTags::read(path)?;

        let or_unknown = |field: Option<String>, name: &str| {
            field.unwrap_or_else(|| {
                tracing::warn!("failed to find {} for {}", name, path.display());
                UNKNOWN_FIELD.to_string()
            })
        };
        if tags.cover.is_none() {
            tracing::warn!("failed to find cover for {}", path.display());
        }

        Ok(Self {
            path: path.to_path_buf(),
            title: or_unknown(tags.title, "title"),
            album: or_unknown(tags.album, "album"),
            artist: or_unknown(tags.artist, "artist"),
            date: or_unknown(tags.date, "date"),
            cover: tags.cover,
            requester,
        })
    }

    fn cover_thumbnail(&self) -> Thumbnail {
        match &self.cover {
            Some(data) => Thumbnail::Attachment {
                filename: "cover.jpg".to_string(),
                data: data.clone(),
            },
            None => Thumbnail::DefaultArt,
        }
    }
}

impl RemoteVideo {
    /// yt-dlp's thumbnail, or YouTube's default one for the video id.
    fn thumbnail(&self) -> Thumbnail {
        match &self.thumbnail {
            Some(url) => Thumbnail::Url(url.clone()),
            None => Thumbnail::Url(format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", self.id)),
        }
    }
}

/// `m:ss`, or `h:mm:ss` for an hour and longer.
fn format_duration(seconds: u64) -> String {
    let (hours, minutes, seconds) = (seconds / 3600, seconds / 60 % 60, seconds % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

impl Track {
    pub fn local_file(path: &Path, requester: Option<Requester>) -> Result<Self, PlayerError> {
        LocalFile::open(path, requester).map(Self::LocalFile)
    }

    pub fn title(&self) -> &str {
        match self {
            Self::LocalFile(file) => &file.title,
            Self::RemoteVideo(video) => &video.title,
            Self::RemoteClip(clip) => &clip.title,
        }
    }

    /// Artist, channel or uploader, if known.
    pub fn creator(&self) -> Option<&str> {
        match self {
            Self::LocalFile(file) => Some(&file.artist),
            Self::RemoteVideo(video) => Some(&video.creator),
            Self::RemoteClip(clip) => clip.creator.as_deref(),
        }
    }

    pub fn requester(&self) -> Option<&Requester> {
        match self {
            Self::LocalFile(file) => file.requester.as_ref(),
            Self::RemoteVideo(video) => video.requester.as_ref(),
            Self::RemoteClip(clip) => clip.requester.as_ref(),
        }
    }

    pub fn is_requested_by(&self, user: UserId) -> bool {
        self.requester().map(|r| r.id == user).unwrap_or(false)
    }

    fn requester_name(&self) -> &str {
        self.requester()
            .map(|r| r.name.as_str())
            .unwrap_or("auto-fill")
    }

    /// Look up a stream for this track, possibly over the network.
    pub async fn resolve_audio_source(
        &self,
        media: &dyn MediaResolver,
    ) -> Result<AudioSource, PlayerError> {
        match self {
            Self::LocalFile(file) => media.resolve_local_file(&file.path).await,
            Self::RemoteVideo(video) => media.resolve_remote_video(&video.url).await,
            Self::RemoteClip(clip) => media.resolve_remote_clip(clip.provider, &clip.id).await,
        }
    }

    pub fn display_for_request_confirmation(&self) -> Response {
        let requested_by = self.requester_name();
        match self {
            Self::LocalFile(file) => Response::new("MP3 track request...", COLOUR_LOCAL)
                .description(format!(
                    "adding **{}** by **{}** to the queue...",
                    file.title, file.artist
                ))
                .author(format!("Local Track - requested by {}", requested_by))
                .thumbnail(file.cover_thumbnail()),
            Self::RemoteVideo(video) => Response::new("YouTube track request...", COLOUR_YOUTUBE)
                .description(format!(
                    "adding **{}** by **{}** to the queue...",
                    video.title, video.creator
                ))
                .author(format!("Youtube Video - requested by {}", requested_by))
                .author_url(&video.url)
                .thumbnail(video.thumbnail()),
            Self::RemoteClip(clip) => {
                let (provider, colour) = clip.provider.label_and_colour();
                let description = match &clip.creator {
                    Some(creator) => format!(
                        "adding **{}** by **{}** to the queue...",
                        clip.title, creator
                    ),
                    None => format!("adding **{}** to the queue...", clip.title),
                };
                let mut response = Response::new(format!("{} track request...", provider), colour)
                    .description(description)
                    .author(format!("{} - requested by {}", provider, requested_by))
                    .author_url(&clip.url);
                if let Some(thumbnail) = &clip.thumbnail {
                    response = response.thumbnail(Thumbnail::Url(thumbnail.clone()));
                }
                response
            }
        }
    }

    pub fn display_for_now_playing(&self) -> Response {
        let requested_by = self.requester_name();
        match self {
            Self::LocalFile(file) => Response::new(&file.title, COLOUR_LOCAL)
                .description(format!("{} - {} ({})", file.artist, file.album, file.date))
                .author(format!("Local Track - requested by {}", requested_by))
                .thumbnail(file.cover_thumbnail()),
            Self::RemoteVideo(video) => {
                Response::new(&video.title, COLOUR_YOUTUBE)
                    .description(format!(
                        "{} ({})",
                        video.creator,
                        format_duration(video.duration_in_sec)
                    ))
                    .author(format!("Youtube Video - requested by {}", requested_by))
                    .author_url(&video.url)
                    .thumbnail(video.thumbnail())
            }
            Self::RemoteClip(clip) => {
                let (provider, colour) = clip.provider.label_and_colour();
                let mut response = Response::new(&clip.title, colour)
                    .author(format!("{} Track - requested by {}", provider, requested_by))
                    .author_url(&clip.url);
                if let Some(creator) = &clip.creator {
                    response = response.description(creator);
                }
                if let Some(thumbnail) = &clip.thumbnail {
                    response = response.thumbnail(Thumbnail::Url(thumbnail.clone()));
                }
                response
            }
        }
    }

    pub fn display_for_queue_entry(&self) -> QueueLine {
        let requested_by = self.requester_name();
        let value = match self {
            Self::LocalFile(file) => format!("{} - requested by - {}", file.artist, requested_by),
            Self::RemoteVideo(video) => format!(
                "{} ({}) - requested by - {}",
                video.creator,
                format_duration(video.duration_in_sec),
                requested_by
            ),
            Self::RemoteClip(clip) => match &clip.creator {
                Some(creator) => format!("{} - requested by - {}", creator, requested_by),
                None => format!("requested by - {}", requested_by),
            },
        };

        QueueLine {
            name: self.title().to_string(),
            value,
        }
    }
}

impl ClipProvider {
    fn label_and_colour(self) -> (&'static str, u32) {
        match self {
            Self::SoundCloud => ("SoundCloud", COLOUR_SOUNDCLOUD),
            Self::Clyp => ("Clyp", COLOUR_CLYP),
        }
    }
}
