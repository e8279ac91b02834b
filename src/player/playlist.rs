use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use poise::serenity_prelude::UserId;
use rand::seq::SliceRandom;

use super::{error::PlayerError, tags::scan_mp3_files, track::Track};

/// How many upcoming tracks `queue` shows by default.
pub const DEFAULT_PEEK_LENGTH: usize = 10;

type Loader = Box<dyn Fn(&Path) -> Result<Track, PlayerError> + Send + Sync>;

/// Shuffled feed of a local directory, used when nobody requested anything.
///
/// Parsed tracks are kept in a small look-ahead cache so the queue view can
/// show them. When the shuffled list runs out, the directory is scanned and
/// shuffled again.
///
/// Refilling reads files, so [`AutoFill::top_up`] belongs on a blocking
/// thread. The feed lock is only held to move paths and tracks around.
pub struct AutoFill {
    directory: PathBuf,
    cache_length: usize,
    loader: Loader,
    feed: Mutex<Feed>,
}

#[derive(Default)]
struct Feed {
    pending: VecDeque<PathBuf>,
    cache: VecDeque<Track>,
}

impl AutoFill {
    pub fn new(directory: impl Into<PathBuf>, cache_length: usize) -> Self {
        Self::with_loader(directory, cache_length, |path| Track::local_file(path, None))
    }

    pub fn with_loader<F>(directory: impl Into<PathBuf>, cache_length: usize, loader: F) -> Self
    where
        F: Fn(&Path) -> Result<Track, PlayerError> + Send + Sync + 'static,
    {
        let autofill = Self {
            directory: directory.into(),
            cache_length: cache_length.max(1),
            loader: Box::new(loader),
            feed: Mutex::default(),
        };
        autofill.top_up();
        autofill
    }

    fn feed(&self) -> MutexGuard<'_, Feed> {
        self.feed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pop(&self) -> Option<Track> {
        self.feed().cache.pop_front()
    }

    fn peek(&self) -> Vec<Track> {
        self.feed().cache.iter().cloned().collect()
    }

    /// Refill the cache, rescanning the directory at most once per call so
    /// an empty (or entirely unreadable) directory can't spin forever.
    pub fn top_up(&self) {
        let mut rescanned = false;
        loop {
            let path = {
                let mut feed = self.feed();
                if feed.cache.len() >= self.cache_length {
                    break;
                }
                feed.pending.pop_front()
            };
            let Some(path) = path else {
                if rescanned {
                    break;
                }
                let files = self.shuffled_files();
                self.feed().pending = files.into();
                rescanned = true;
                continue;
            };

            match (self.loader)(&path) {
                Ok(track) => self.feed().cache.push_back(track),
                Err(e) => tracing::warn!("skipping {}: {}", path.display(), e),
            }
        }
    }

    fn shuffled_files(&self) -> Vec<PathBuf> {
        let mut files = scan_mp3_files(&self.directory);
        files.shuffle(&mut rand::thread_rng());
        tracing::debug!(
            "auto-fill: reshuffled {} files from {}",
            files.len(),
            self.directory.display()
        );
        files
    }
}

/// Pending requests, optionally backed by an [`AutoFill`] feed.
#[derive(Default)]
pub struct Playlist {
    requests: VecDeque<Track>,
    autofill: Option<Arc<AutoFill>>,
}

impl Playlist {
    /// A playlist that runs dry once requests do.
    pub fn requests_only() -> Self {
        Self::default()
    }

    pub fn with_autofill(autofill: AutoFill) -> Self {
        Self {
            requests: VecDeque::new(),
            autofill: Some(Arc::new(autofill)),
        }
    }

    pub fn autofill(&self) -> Option<&Arc<AutoFill>> {
        self.autofill.as_ref()
    }

    pub fn enqueue(&mut self, track: Track, at_front: bool) {
        if at_front {
            self.requests.push_front(track);
        } else {
            self.requests.push_back(track);
        }
    }

    /// The next track to play, `None` when there is nothing left.
    ///
    /// Only takes from the auto-fill cache; the caller tops it up again
    /// with [`AutoFill::top_up`].
    pub fn next_track(&mut self) -> Option<Track> {
        if let Some(track) = self.requests.pop_front() {
            return Some(track);
        }
        self.autofill.as_ref().and_then(|autofill| autofill.pop())
    }

    /// Upcoming tracks: requests first, then the auto-fill look-ahead.
    pub fn peek_queue(&self, n: usize) -> Vec<Track> {
        let mut queue: Vec<Track> = self.requests.iter().take(n).cloned().collect();
        if let Some(autofill) = &self.autofill {
            let missing = n - queue.len();
            queue.extend(autofill.peek().into_iter().take(missing));
        }
        queue
    }

    pub fn requests_by(&self, user: UserId) -> usize {
        self.requests
            .iter()
            .filter(|track| track.is_requested_by(user))
            .count()
    }
}
