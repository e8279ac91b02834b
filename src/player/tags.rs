use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::Arc,
};

use symphonia::core::{
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::{MetadataOptions, MetadataRevision, StandardTagKey},
    probe::Hint,
};

use super::error::PlayerError;

/// Metadata pulled out of an audio file. Every field is optional, callers
/// decide what a missing one looks like.
#[derive(Debug, Clone, Default)]
pub struct FileTags {
    pub title: Option<String>,
    pub album: Option<String>,
    pub artist: Option<String>,
    pub date: Option<String>,
    pub cover: Option<Arc<[u8]>>,
}

impl FileTags {
    /// Probe `path` and collect its tags.
    ///
    /// Fails when the file can't be opened or isn't a decodable audio file.
    pub fn read(path: &Path) -> Result<Self, PlayerError> {
        let file = File::open(path).map_err(|e| {
            PlayerError::unavailable(format!("can't open {}: {}", path.display(), e))
        })?;
        let stream = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(extension);
        }

        let mut probed = symphonia::default::get_probe()
            .format(
                &hint,
                stream,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| {
                PlayerError::unavailable(format!("can't parse {}: {}", path.display(), e))
            })?;

        let mut tags = Self::default();

        // ID3v2 is read while probing, anything else lives in the container
        if let Some(metadata) = probed.metadata.get() {
            if let Some(revision) = metadata.current() {
                tags.merge(revision);
            }
        }
        if let Some(revision) = probed.format.metadata().current() {
            tags.merge(revision);
        }

        Ok(tags)
    }

    /// Fill whatever is still missing from `revision`.
    fn merge(&mut self, revision: &MetadataRevision) {
        for tag in revision.tags() {
            let slot = match tag.std_key {
                Some(StandardTagKey::TrackTitle) => &mut self.title,
                Some(StandardTagKey::Album) => &mut self.album,
                Some(StandardTagKey::Artist) => &mut self.artist,
                Some(StandardTagKey::Date) | Some(StandardTagKey::ReleaseDate) => &mut self.date,
                _ => continue,
            };
            if slot.is_none() {
                let value = tag.value.to_string();
                if !value.trim().is_empty() {
                    *slot = Some(value.trim().to_string());
                }
            }
        }

        if self.cover.is_none() {
            self.cover = revision
                .visuals()
                .first()
                .map(|visual| Arc::from(visual.data.clone()));
        }
    }
}

/// All `*.mp3` files directly inside `directory`, in no particular order.
///
/// An unreadable directory is treated as an empty one.
pub fn scan_mp3_files(directory: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("can't read {}: {}", directory.display(), e);
            return Vec::new();
        }
    };

    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.eq_ignore_ascii_case("mp3"))
                    .unwrap_or(false)
        })
        .collect()
}
