use std::{
    cmp::Ordering,
    path::{Path, PathBuf},
};

use strsim::normalized_levenshtein;

use crate::player::{
    display::{Response, COLOUR_CLYP, COLOUR_LOCAL, COLOUR_SOUNDCLOUD, COLOUR_YOUTUBE},
    tags::scan_mp3_files,
    track::{Requester, Track},
};

pub const SEARCH_RESULT_LIMIT: usize = 5;

/// Minimum similarity for a local file name to count as a match.
const MP3_MATCH_CUTOFF: f64 = 0.1;

/// Where `request` looks for tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum SearchKind {
    #[name = "mp3"]
    Mp3,
    #[name = "youtube"]
    YouTube,
    #[name = "soundcloud"]
    SoundCloud,
    #[name = "clyp"]
    Clyp,
}

/// Tracks found for one `request`, at most [`SEARCH_RESULT_LIMIT`].
#[derive(Debug, Clone)]
pub struct SearchResults {
    pub kind: SearchKind,
    pub query: String,
    pub requester: Requester,
    pub tracks: Vec<Track>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn display(&self) -> Response {
        let list: String = self
            .tracks
            .iter()
            .enumerate()
            .map(|(index, track)| match track.creator() {
                Some(creator) => format!("{} - {} by {}\n", index + 1, track.title(), creator),
                None => format!("{} - {}\n", index + 1, track.title()),
            })
            .collect();

        let (author, colour) = match self.kind {
            SearchKind::Mp3 => (
                format!("Local Tracks - Results for search {}", self.query),
                COLOUR_LOCAL,
            ),
            SearchKind::YouTube => (
                format!("YouTube - Results for search {}", self.query),
                COLOUR_YOUTUBE,
            ),
            SearchKind::SoundCloud => (
                format!("SoundCloud - Results for search {}", self.query),
                COLOUR_SOUNDCLOUD,
            ),
            SearchKind::Clyp => (format!("Clyp - Track ID: {}", self.query), COLOUR_CLYP),
        };

        Response::new(
            format!("Results for search - Requested by {}", self.requester.name),
            colour,
        )
        .author(author)
        .description(list)
    }
}

/// Lowercase letters and whitespace only, so "01 - Song_Name.mp3" and
/// "song name" compare well.
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_alphabetic() || c.is_whitespace())
        .collect()
}

/// Files in `directory` whose names resemble `query`, best match first.
pub fn rank_mp3_files(directory: &Path, query: &str, limit: usize) -> Vec<PathBuf> {
    let query = normalize(query);

    let mut scored: Vec<(f64, PathBuf)> = scan_mp3_files(directory)
        .into_iter()
        .filter_map(|path| {
            let stem = path.file_stem()?.to_string_lossy().to_string();
            let score = normalized_levenshtein(&query, &normalize(&stem));
            (score >= MP3_MATCH_CUTOFF).then_some((score, path))
        })
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    scored.into_iter().take(limit).map(|(_, path)| path).collect()
}

/// Parse the best matching files, dropping any that can't be read.
pub fn search_mp3_files(directory: &Path, query: &str, requester: &Requester) -> Vec<Track> {
    rank_mp3_files(directory, query, SEARCH_RESULT_LIMIT)
        .into_iter()
        .filter_map(|path| match Track::local_file(&path, Some(requester.clone())) {
            Ok(track) => Some(track),
            Err(e) => {
                tracing::warn!("skipping search result {}: {}", path.display(), e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::track::tests::{local, requester};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn ranks_closest_names_first() {
        let dir = tempdir().unwrap();
        for name in ["01 - Hey Jude.mp3", "Yellow Submarine.mp3", "Help!.MP3", "notes.txt"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let ranked = rank_mp3_files(dir.path(), "hey jude", 5);
        assert_eq!(
            ranked[0].file_name().unwrap().to_string_lossy(),
            "01 - Hey Jude.mp3"
        );
        assert!(ranked
            .iter()
            .all(|path| path.extension().unwrap() != "txt"));
    }

    #[test]
    fn respects_the_limit() {
        let dir = tempdir().unwrap();
        for i in 0..8 {
            fs::write(dir.path().join(format!("song {}.mp3", i)), b"x").unwrap();
        }

        assert_eq!(rank_mp3_files(dir.path(), "song", 5).len(), 5);
    }

    #[test]
    fn unparseable_matches_are_dropped() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("hey jude.mp3"), b"not audio").unwrap();

        assert!(search_mp3_files(dir.path(), "hey jude", &requester(1)).is_empty());
    }

    #[test]
    fn result_list_is_numbered() {
        let results = SearchResults {
            kind: SearchKind::Mp3,
            query: "song".to_string(),
            requester: requester(1),
            tracks: vec![local("one", None), local("two", None)],
        };

        let response = results.display();
        assert_eq!(response.title, "Results for search - Requested by user1");
        assert_eq!(
            response.description.as_deref(),
            Some("1 - one by artist\n2 - two by artist\n")
        );
        assert_eq!(
            response.author.as_deref(),
            Some("Local Tracks - Results for search song")
        );
    }
}
