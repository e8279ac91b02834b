use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use poise::serenity_prelude::{ChannelId, GuildId, RoleId, UserId};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, error, info, warn};

use super::{
    display::{Announcer, Response},
    error::PlayerError,
    playlist::Playlist,
    source::MediaResolver,
    track::Track,
    vote::{VoteOutcome, VoteTally},
    voice::{StreamState, TrackEnd, TrackEndSignal, VoiceConnection},
};

pub const DEFAULT_VOLUME: f32 = 0.15;

/// `requested` if it is a valid volume (0 to 1), otherwise the default.
pub fn volume_or_default(requested: Option<f32>) -> f32 {
    requested
        .filter(|volume| (0.0..=1.0).contains(volume))
        .unwrap_or(DEFAULT_VOLUME)
}

/// A session as stored in the startup list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupEntry {
    pub voice_channel_id: ChannelId,
    #[serde(default)]
    pub log_channel_id: Option<ChannelId>,
    /// Command name to the roles allowed to use it.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub role_permissions: HashMap<String, HashSet<RoleId>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Playing,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceAction {
    Pause,
    Resume,
    Nothing,
}

/// Whether the stream should be paused or resumed given who is listening.
pub fn reconcile_voice_state(listeners: usize, server_muted: bool, stream: StreamState) -> VoiceAction {
    match stream {
        StreamState::Paused if listeners > 0 && !server_muted => VoiceAction::Resume,
        StreamState::Playing if listeners == 0 || server_muted => VoiceAction::Pause,
        _ => VoiceAction::Nothing,
    }
}

struct SessionState {
    phase: Phase,
    playlist: Playlist,
    current_track: Option<Track>,
    volume: f32,
    skip_votes: VoteTally,
    repeat_votes: VoteTally,
}

/// Playback for one guild's voice channel.
pub struct Session {
    guild_id: GuildId,
    log_channel_id: Option<ChannelId>,
    role_permissions: HashMap<String, HashSet<RoleId>>,

    voice: Arc<dyn VoiceConnection>,
    media: Arc<dyn MediaResolver>,
    announcer: Arc<dyn Announcer>,

    state: Mutex<SessionState>,

    track_end: TrackEndSignal,
    /// Taken by the playback loop for as long as it runs.
    track_end_rx: Mutex<mpsc::UnboundedReceiver<TrackEnd>>,

    voice_released: AtomicBool,
    released_tx: watch::Sender<bool>,
}

impl Session {
    pub fn new(
        guild_id: GuildId,
        voice: Arc<dyn VoiceConnection>,
        media: Arc<dyn MediaResolver>,
        announcer: Arc<dyn Announcer>,
        playlist: Playlist,
    ) -> Self {
        let (track_end, track_end_rx) = TrackEndSignal::channel();
        Self {
            guild_id,
            log_channel_id: None,
            role_permissions: HashMap::new(),
            voice,
            media,
            announcer,
            state: Mutex::new(SessionState {
                phase: Phase::Idle,
                playlist,
                current_track: None,
                volume: DEFAULT_VOLUME,
                skip_votes: VoteTally::default(),
                repeat_votes: VoteTally::default(),
            }),
            track_end,
            track_end_rx: Mutex::new(track_end_rx),
            voice_released: AtomicBool::new(false),
            released_tx: watch::channel(false).0,
        }
    }

    pub fn with_log_channel(mut self, log_channel_id: Option<ChannelId>) -> Self {
        self.log_channel_id = log_channel_id;
        self
    }

    pub fn with_role_permissions(mut self, permissions: HashMap<String, HashSet<RoleId>>) -> Self {
        self.role_permissions = permissions;
        self
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn to_startup_entry(&self) -> StartupEntry {
        StartupEntry {
            voice_channel_id: self.voice.channel_id(),
            log_channel_id: self.log_channel_id,
            role_permissions: self.role_permissions.clone(),
        }
    }

    /// Whether a member with `roles` may use `command` in this session.
    /// Commands without a role list are open to everyone.
    pub fn permits(&self, command: &str, roles: &[RoleId]) -> bool {
        match self.role_permissions.get(command) {
            Some(allowed) => roles.iter().any(|role| allowed.contains(role)),
            None => true,
        }
    }

    pub fn listeners(&self) -> Vec<UserId> {
        self.voice.listeners()
    }

    pub fn is_listener(&self, user: UserId) -> bool {
        self.listeners().contains(&user)
    }

    pub async fn phase(&self) -> Phase {
        self.state.lock().await.phase
    }

    #[cfg(test)]
    pub async fn is_playing(&self) -> bool {
        self.phase().await == Phase::Playing
    }

    pub async fn current_track(&self) -> Option<Track> {
        self.state.lock().await.current_track.clone()
    }

    pub async fn has_autofill(&self) -> bool {
        self.state.lock().await.playlist.autofill().is_some()
    }

    /// Upcoming tracks, for the queue view.
    pub async fn peek_queue(&self, n: usize) -> Vec<Track> {
        let state = self.state.lock().await;
        state.playlist.peek_queue(n)
    }

    pub async fn requests_by(&self, user: UserId) -> usize {
        self.state.lock().await.playlist.requests_by(user)
    }

    pub async fn enqueue(&self, track: Track, at_front: bool) {
        self.state.lock().await.playlist.enqueue(track, at_front);
    }

    /// Start the playback loop. Returns `false` if it was already running or
    /// the session has been stopped.
    pub async fn start(self: &Arc<Self>) -> bool {
        {
            let mut state = self.state.lock().await;
            if state.phase != Phase::Idle {
                return false;
            }
            state.phase = Phase::Playing;
        }

        info!("starting player in guild {}", self.guild_id);
        tokio::spawn(self.clone().run());
        true
    }

    /// Stop playback and release the voice connection. Safe to call any
    /// number of times.
    pub async fn stop(&self) {
        let previous = {
            let mut state = self.state.lock().await;
            std::mem::replace(&mut state.phase, Phase::Stopped)
        };

        match previous {
            Phase::Stopped => (),
            // the loop notices the phase change once the stream ends
            Phase::Playing => self.voice.stop().await,
            Phase::Idle => self.release().await,
        }
    }

    /// Stop the session if it never got going: still idle with nothing
    /// queued. Returns whether it was stopped.
    pub async fn stop_if_unused(&self) -> bool {
        {
            let mut state = self.state.lock().await;
            if state.phase != Phase::Idle || !state.playlist.peek_queue(1).is_empty() {
                return false;
            }
            state.phase = Phase::Stopped;
        }
        self.release().await;
        true
    }

    /// The voice connection went away underneath us.
    pub async fn connection_lost(&self, reason: &str) {
        let e = PlayerError::VoiceConnectionLost(reason.to_string());
        error!("guild {}: {}", self.guild_id, e);
        self.stop().await;
    }

    /// Resolves once the voice connection has been released.
    pub async fn released(&self) {
        let mut released = self.released_tx.subscribe();
        let _ = released.wait_for(|released| *released).await;
    }

    pub async fn change_volume(&self, volume: f32) {
        self.state.lock().await.volume = volume;
        self.voice.set_volume(volume).await;
    }

    /// Pause when nobody is listening or the bot is server-muted, resume
    /// otherwise.
    pub async fn check_voice_state(&self) {
        let listeners = self.voice.listeners().len();
        let server_muted = self.voice.is_server_muted();
        let stream = self.voice.stream_state().await;

        match reconcile_voice_state(listeners, server_muted, stream) {
            VoiceAction::Pause => {
                debug!("guild {}: pausing, {} listeners", self.guild_id, listeners);
                self.voice.pause().await;
            }
            VoiceAction::Resume => {
                debug!("guild {}: resuming, {} listeners", self.guild_id, listeners);
                self.voice.resume().await;
            }
            VoiceAction::Nothing => (),
        }
    }

    pub async fn register_skip_vote(&self, voter: UserId) -> Result<VoteOutcome, PlayerError> {
        let outcome = {
            let mut state = self.state.lock().await;
            let (listeners, is_requester) = self.vote_context(&state, voter)?;
            state
                .skip_votes
                .register(voter, &listeners, is_requester)
        };

        if outcome == VoteOutcome::Passed {
            self.voice.stop().await;
        }
        Ok(outcome)
    }

    pub async fn register_repeat_vote(&self, voter: UserId) -> Result<VoteOutcome, PlayerError> {
        let mut state = self.state.lock().await;
        let (listeners, is_requester) = self.vote_context(&state, voter)?;
        let outcome = state
            .repeat_votes
            .register(voter, &listeners, is_requester);

        if outcome == VoteOutcome::Passed {
            Self::requeue_current(&mut state)?;
        }
        Ok(outcome)
    }

    pub async fn force_skip(&self) -> Result<(), PlayerError> {
        if self.state.lock().await.current_track.is_none() {
            return Err(PlayerError::NothingPlaying);
        }
        self.voice.stop().await;
        Ok(())
    }

    pub async fn force_repeat(&self) -> Result<(), PlayerError> {
        let mut state = self.state.lock().await;
        Self::requeue_current(&mut state)
    }

    fn vote_context(
        &self,
        state: &SessionState,
        voter: UserId,
    ) -> Result<(Vec<UserId>, bool), PlayerError> {
        let listeners = self.voice.listeners();
        if !listeners.contains(&voter) {
            return Err(PlayerError::not_listening());
        }
        let track = state
            .current_track
            .as_ref()
            .ok_or(PlayerError::NothingPlaying)?;
        Ok((listeners, track.is_requested_by(voter)))
    }

    fn requeue_current(state: &mut SessionState) -> Result<(), PlayerError> {
        let track = state
            .current_track
            .clone()
            .ok_or(PlayerError::NothingPlaying)?;
        state.playlist.enqueue(track, true);
        Ok(())
    }

    async fn run(self: Arc<Self>) {
        let mut track_end = self.track_end_rx.lock().await;

        loop {
            // drop anything left over from a previous track
            while track_end.try_recv().is_ok() {}

            let (mut next, autofill) = {
                let mut state = self.state.lock().await;
                if state.phase != Phase::Playing {
                    break;
                }
                (state.playlist.next_track(), state.playlist.autofill().cloned())
            };
            if let Some(autofill) = autofill {
                // reads and probes files, keep it off the runtime and the lock
                if let Err(e) = tokio::task::spawn_blocking(move || autofill.top_up()).await {
                    error!("guild {}: auto-fill refill failed: {}", self.guild_id, e);
                }
                if next.is_none() {
                    next = self.state.lock().await.playlist.next_track();
                }
            }
            let Some(track) = next else {
                info!("guild {}: playlist exhausted", self.guild_id);
                break;
            };

            match self.play_track(track.clone()).await {
                Ok(true) => (),
                Ok(false) => break,
                Err(PlayerError::VoiceConnectionLost(reason)) => {
                    error!("guild {}: voice connection lost: {}", self.guild_id, reason);
                    break;
                }
                Err(e) => {
                    warn!("guild {}: skipping '{}': {}", self.guild_id, track.title(), e);
                    self.report_failure(&track, &e).await;
                    continue;
                }
            }

            self.check_voice_state().await;

            let end = track_end.recv().await.unwrap_or_default();
            if let Some(reason) = end.error {
                error!("error occurred playing '{}': {}", track.title(), reason);
                self.report_failure(&track, &PlayerError::unavailable(reason))
                    .await;
            }

            let mut state = self.state.lock().await;
            state.current_track = None;
            state.skip_votes.clear();
            state.repeat_votes.clear();
        }

        {
            let mut state = self.state.lock().await;
            state.phase = Phase::Stopped;
            state.current_track = None;
        }
        drop(track_end);
        self.release().await;
    }

    /// Resolve and start `track`. `Ok(false)` means the session was stopped
    /// while the track was being resolved.
    async fn play_track(&self, track: Track) -> Result<bool, PlayerError> {
        let source = track.resolve_audio_source(self.media.as_ref()).await?;

        let volume = {
            let mut state = self.state.lock().await;
            if state.phase != Phase::Playing {
                return Ok(false);
            }
            state.current_track = Some(track.clone());
            state.volume
        };

        self.voice
            .play(source, volume, self.track_end.clone())
            .await?;

        // stopped between the phase check and the stream starting
        if self.phase().await != Phase::Playing {
            self.voice.stop().await;
            return Ok(false);
        }

        info!("guild {}: now playing '{}'", self.guild_id, track.title());
        self.announcer.announce(track.display_for_now_playing()).await;
        Ok(true)
    }

    async fn report_failure(&self, track: &Track, error: &PlayerError) {
        let mut response = Response::rejection("player", error)
            .description(format!("Couldn't play **{}**: {}", track.title(), error));
        if let Some(requester) = track.requester() {
            response = response.author(format!("Error: player - requested by {}", requester.name));
        }
        self.announcer.announce(response).await;
    }

    async fn release(&self) {
        if self.voice_released.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("guild {}: releasing voice connection", self.guild_id);
        self.voice.disconnect().await;
        self.released_tx.send_replace(true);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::player::{
        display::Response,
        source::ClipProvider,
        track::tests::{local, requester},
        voice::AudioSource,
    };
    use poise::serenity_prelude::async_trait;
    use std::{
        path::Path,
        sync::Mutex as StdMutex,
        time::Duration,
    };

    /// In-memory voice connection. Streams only end when stopped or when a
    /// test calls [`FakeVoice::finish`].
    #[derive(Default)]
    pub struct FakeVoice {
        pub listeners: StdMutex<Vec<UserId>>,
        pub server_muted: AtomicBool,
        pub played: StdMutex<Vec<AudioSource>>,
        pub volumes: StdMutex<Vec<f32>>,
        pub state: StdMutex<Option<StreamState>>,
        pub on_end: StdMutex<Option<TrackEndSignal>>,
        pub disconnects: StdMutex<usize>,
    }

    impl FakeVoice {
        pub fn with_listeners(ids: &[u64]) -> Arc<Self> {
            let voice = Self::default();
            voice.set_listeners(ids);
            Arc::new(voice)
        }

        pub fn set_listeners(&self, ids: &[u64]) {
            *self.listeners.lock().unwrap() = ids.iter().map(|&id| UserId::new(id)).collect();
        }

        pub fn finish(&self, error: Option<&str>) {
            *self.state.lock().unwrap() = Some(StreamState::Idle);
            if let Some(signal) = self.on_end.lock().unwrap().take() {
                signal.fire(TrackEnd {
                    error: error.map(str::to_string),
                });
            }
        }

        pub fn played(&self) -> Vec<AudioSource> {
            self.played.lock().unwrap().clone()
        }

        pub fn stream(&self) -> StreamState {
            self.state.lock().unwrap().unwrap_or(StreamState::Idle)
        }

        pub fn disconnects(&self) -> usize {
            *self.disconnects.lock().unwrap()
        }
    }

    #[async_trait]
    impl VoiceConnection for FakeVoice {
        fn channel_id(&self) -> ChannelId {
            ChannelId::new(42)
        }

        fn listeners(&self) -> Vec<UserId> {
            self.listeners.lock().unwrap().clone()
        }

        fn is_server_muted(&self) -> bool {
            self.server_muted.load(Ordering::SeqCst)
        }

        async fn play(
            &self,
            source: AudioSource,
            volume: f32,
            on_end: TrackEndSignal,
        ) -> Result<(), PlayerError> {
            self.played.lock().unwrap().push(source);
            self.volumes.lock().unwrap().push(volume);
            *self.state.lock().unwrap() = Some(StreamState::Playing);
            *self.on_end.lock().unwrap() = Some(on_end);
            Ok(())
        }

        async fn stream_state(&self) -> StreamState {
            self.stream()
        }

        async fn pause(&self) {
            *self.state.lock().unwrap() = Some(StreamState::Paused);
        }

        async fn resume(&self) {
            *self.state.lock().unwrap() = Some(StreamState::Playing);
        }

        async fn stop(&self) {
            self.finish(None);
        }

        async fn set_volume(&self, volume: f32) {
            self.volumes.lock().unwrap().push(volume);
        }

        async fn disconnect(&self) {
            *self.disconnects.lock().unwrap() += 1;
        }
    }

    /// Local files resolve to themselves unless their name starts with
    /// "missing".
    pub struct FakeMedia;

    #[async_trait]
    impl MediaResolver for FakeMedia {
        async fn resolve_local_file(&self, path: &Path) -> Result<AudioSource, PlayerError> {
            if path.to_string_lossy().contains("missing") {
                return Err(PlayerError::unavailable("no such file"));
            }
            Ok(AudioSource::File(path.to_path_buf()))
        }

        async fn resolve_remote_video(&self, url: &str) -> Result<AudioSource, PlayerError> {
            Ok(AudioSource::Url(url.to_string()))
        }

        async fn resolve_remote_clip(
            &self,
            _provider: ClipProvider,
            id: &str,
        ) -> Result<AudioSource, PlayerError> {
            Ok(AudioSource::Url(id.to_string()))
        }
    }

    #[derive(Default)]
    pub struct RecordingAnnouncer(pub StdMutex<Vec<Response>>);

    #[async_trait]
    impl Announcer for RecordingAnnouncer {
        async fn announce(&self, response: Response) {
            self.0.lock().unwrap().push(response);
        }
    }

    pub fn session(voice: Arc<FakeVoice>) -> Arc<Session> {
        Arc::new(Session::new(
            GuildId::new(1),
            voice,
            Arc::new(FakeMedia),
            Arc::new(RecordingAnnouncer::default()),
            Playlist::requests_only(),
        ))
    }

    /// Poll until `check` holds, giving the playback task time to run.
    pub async fn eventually<F: Fn() -> bool>(check: F) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !check() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition never became true");
    }

    fn file(path: &str) -> AudioSource {
        AudioSource::File(format!("/music/{}.mp3", path).into())
    }

    #[test]
    fn volume_out_of_range_falls_back_to_default() {
        assert_eq!(volume_or_default(Some(1.5)), DEFAULT_VOLUME);
        assert_eq!(volume_or_default(Some(-0.1)), DEFAULT_VOLUME);
        assert_eq!(volume_or_default(None), DEFAULT_VOLUME);
        assert_eq!(volume_or_default(Some(0.5)), 0.5);
        assert_eq!(volume_or_default(Some(1.0)), 1.0);
    }

    #[test]
    fn voice_state_policy() {
        use StreamState::*;
        assert_eq!(reconcile_voice_state(1, false, Paused), VoiceAction::Resume);
        assert_eq!(reconcile_voice_state(0, false, Playing), VoiceAction::Pause);
        assert_eq!(reconcile_voice_state(0, true, Playing), VoiceAction::Pause);
        assert_eq!(reconcile_voice_state(3, true, Playing), VoiceAction::Pause);
        assert_eq!(reconcile_voice_state(3, false, Playing), VoiceAction::Nothing);
        assert_eq!(reconcile_voice_state(3, true, Paused), VoiceAction::Nothing);
        assert_eq!(reconcile_voice_state(0, false, Idle), VoiceAction::Nothing);
    }

    #[test]
    fn role_permissions_only_restrict_listed_commands() {
        let voice = FakeVoice::with_listeners(&[1]);
        let permissions = HashMap::from([(
            "skip".to_string(),
            HashSet::from([RoleId::new(10)]),
        )]);
        let session = Session::new(
            GuildId::new(1),
            voice,
            Arc::new(FakeMedia),
            Arc::new(RecordingAnnouncer::default()),
            Playlist::requests_only(),
        )
        .with_role_permissions(permissions);

        assert!(session.permits("skip", &[RoleId::new(10), RoleId::new(11)]));
        assert!(!session.permits("skip", &[RoleId::new(11)]));
        assert!(session.permits("repeat", &[]));
    }

    #[tokio::test]
    async fn plays_requests_in_order_then_releases() {
        let voice = FakeVoice::with_listeners(&[1]);
        let session = session(voice.clone());
        session.enqueue(local("a", None), false).await;
        session.enqueue(local("b", None), false).await;

        assert!(session.start().await);
        eventually(|| voice.played().len() == 1).await;
        assert_eq!(voice.played(), vec![file("a")]);

        voice.finish(None);
        eventually(|| voice.played().len() == 2).await;
        assert_eq!(voice.played()[1], file("b"));

        voice.finish(None);
        tokio::time::timeout(Duration::from_secs(2), session.released())
            .await
            .unwrap();
        assert_eq!(session.phase().await, Phase::Stopped);
        assert_eq!(voice.disconnects(), 1);
    }

    #[tokio::test]
    async fn start_twice_spawns_one_loop() {
        let voice = FakeVoice::with_listeners(&[1]);
        let session = session(voice.clone());
        session.enqueue(local("a", None), false).await;

        assert!(session.start().await);
        assert!(!session.start().await);
        eventually(|| voice.played().len() == 1).await;
    }

    #[tokio::test]
    async fn unavailable_track_is_skipped() {
        let voice = FakeVoice::with_listeners(&[1]);
        let announcer = Arc::new(RecordingAnnouncer::default());
        let session = Arc::new(Session::new(
            GuildId::new(1),
            voice.clone(),
            Arc::new(FakeMedia),
            announcer.clone(),
            Playlist::requests_only(),
        ));
        session.enqueue(local("missing", Some(requester(3))), false).await;
        session.enqueue(local("b", None), false).await;

        session.start().await;
        eventually(|| voice.played().len() == 1).await;

        assert_eq!(voice.played(), vec![file("b")]);
        let responses = announcer.0.lock().unwrap().clone();
        assert!(responses
            .iter()
            .any(|r| r.description.as_deref().unwrap_or("").contains("missing")));
    }

    #[tokio::test]
    async fn stream_error_advances_to_next_track() {
        let voice = FakeVoice::with_listeners(&[1]);
        let session = session(voice.clone());
        session.enqueue(local("a", None), false).await;
        session.enqueue(local("b", None), false).await;

        session.start().await;
        eventually(|| voice.played().len() == 1).await;
        voice.finish(Some("decoder blew up"));

        eventually(|| voice.played().len() == 2).await;
        assert!(session.is_playing().await);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let voice = FakeVoice::with_listeners(&[1]);
        let session = session(voice.clone());
        session.enqueue(local("a", None), false).await;
        session.start().await;
        eventually(|| voice.played().len() == 1).await;

        session.stop().await;
        session.stop().await;
        tokio::time::timeout(Duration::from_secs(2), session.released())
            .await
            .unwrap();
        session.stop().await;

        assert_eq!(voice.disconnects(), 1);
        assert_eq!(session.phase().await, Phase::Stopped);
        assert!(!session.start().await);
    }

    #[tokio::test]
    async fn stopping_an_idle_session_releases_immediately() {
        let voice = FakeVoice::with_listeners(&[1]);
        let session = session(voice.clone());

        session.stop().await;
        session.stop().await;

        assert_eq!(voice.disconnects(), 1);
        assert!(voice.played().is_empty());
    }

    #[tokio::test]
    async fn majority_skip_stops_the_stream() {
        let voice = FakeVoice::with_listeners(&[1, 2, 3]);
        let session = session(voice.clone());
        session.enqueue(local("a", Some(requester(9))), false).await;
        session.enqueue(local("b", None), false).await;
        session.start().await;
        eventually(|| voice.played().len() == 1).await;

        assert_eq!(
            session.register_skip_vote(UserId::new(1)).await,
            Ok(VoteOutcome::Pending {
                needed: 1,
                already_voted: false
            })
        );
        assert_eq!(
            session.register_skip_vote(UserId::new(2)).await,
            Ok(VoteOutcome::Passed)
        );

        eventually(|| voice.played().len() == 2).await;
    }

    #[tokio::test]
    async fn only_listeners_may_vote() {
        let voice = FakeVoice::with_listeners(&[1, 2]);
        let session = session(voice.clone());
        session.enqueue(local("a", None), false).await;
        session.start().await;
        eventually(|| voice.played().len() == 1).await;

        assert!(matches!(
            session.register_skip_vote(UserId::new(5)).await,
            Err(PlayerError::PermissionDenied(_))
        ));
    }

    #[tokio::test]
    async fn votes_reset_when_the_track_changes() {
        let voice = FakeVoice::with_listeners(&[1, 2, 3, 4]);
        let session = session(voice.clone());
        session.enqueue(local("a", None), false).await;
        session.enqueue(local("b", None), false).await;
        session.start().await;
        eventually(|| voice.played().len() == 1).await;

        session.register_skip_vote(UserId::new(1)).await.unwrap();
        voice.finish(None);
        eventually(|| voice.played().len() == 2).await;

        // wait for the loop to have cleared the tally
        eventually(|| {
            session
                .state
                .try_lock()
                .map(|state| state.skip_votes.len() == 0)
                .unwrap_or(false)
        })
        .await;
        assert_eq!(
            session.register_skip_vote(UserId::new(1)).await,
            Ok(VoteOutcome::Pending {
                needed: 2,
                already_voted: false
            })
        );
    }

    #[tokio::test]
    async fn repeat_puts_current_track_in_front() {
        let voice = FakeVoice::with_listeners(&[1]);
        let session = session(voice.clone());
        session.enqueue(local("a", None), false).await;
        session.enqueue(local("b", None), false).await;
        session.start().await;
        eventually(|| voice.played().len() == 1).await;

        assert_eq!(
            session.register_repeat_vote(UserId::new(1)).await,
            Ok(VoteOutcome::Passed)
        );
        let upcoming: Vec<String> = session
            .peek_queue(10)
            .await
            .iter()
            .map(|t| t.title().to_string())
            .collect();
        assert_eq!(upcoming, vec!["a", "b"]);

        // repeat doesn't cut the current track short
        assert_eq!(voice.played().len(), 1);
        voice.finish(None);
        eventually(|| voice.played().len() == 2).await;
        assert_eq!(voice.played()[1], file("a"));
    }

    #[tokio::test]
    async fn repeat_consensus_requeues_the_track_once() {
        let voice = FakeVoice::with_listeners(&[1, 2, 3]);
        let session = session(voice.clone());
        session.enqueue(local("a", Some(requester(9))), false).await;
        session.enqueue(local("b", None), false).await;
        session.start().await;
        eventually(|| voice.played().len() == 1).await;

        session.register_repeat_vote(UserId::new(1)).await.unwrap();
        assert_eq!(
            session.register_repeat_vote(UserId::new(2)).await,
            Ok(VoteOutcome::Passed)
        );
        assert_eq!(
            session.register_repeat_vote(UserId::new(3)).await,
            Ok(VoteOutcome::AlreadyPassed)
        );

        let upcoming: Vec<String> = session
            .peek_queue(10)
            .await
            .iter()
            .map(|t| t.title().to_string())
            .collect();
        assert_eq!(upcoming, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn lone_listener_repeating_again_queues_one_copy() {
        let voice = FakeVoice::with_listeners(&[1]);
        let session = session(voice.clone());
        session.enqueue(local("a", None), false).await;
        session.start().await;
        eventually(|| voice.played().len() == 1).await;

        for _ in 0..3 {
            session.register_repeat_vote(UserId::new(1)).await.unwrap();
        }

        assert_eq!(session.peek_queue(10).await.len(), 1);
    }

    #[tokio::test]
    async fn finished_track_is_no_longer_current() {
        let voice = FakeVoice::with_listeners(&[1]);
        let session = session(voice.clone());
        session.enqueue(local("a", None), false).await;
        session.start().await;
        eventually(|| voice.played().len() == 1).await;
        assert_eq!(session.current_track().await.unwrap().title(), "a");

        voice.finish(None);
        tokio::time::timeout(Duration::from_secs(2), session.released())
            .await
            .unwrap();

        assert!(session.current_track().await.is_none());
        assert_eq!(session.force_skip().await, Err(PlayerError::NothingPlaying));
        assert_eq!(
            session.register_skip_vote(UserId::new(1)).await,
            Err(PlayerError::NothingPlaying)
        );
    }

    #[tokio::test]
    async fn next_track_replaces_the_finished_one() {
        let voice = FakeVoice::with_listeners(&[1, 2, 3]);
        let session = session(voice.clone());
        session.enqueue(local("a", None), false).await;
        session.enqueue(local("b", None), false).await;
        session.start().await;
        eventually(|| voice.played().len() == 1).await;

        voice.finish(None);
        eventually(|| voice.played().len() == 2).await;

        assert_eq!(session.current_track().await.unwrap().title(), "b");
    }

    #[tokio::test]
    async fn unused_session_is_stopped() {
        let voice = FakeVoice::with_listeners(&[1]);
        let session = session(voice.clone());

        assert!(session.stop_if_unused().await);
        assert_eq!(session.phase().await, Phase::Stopped);
        assert_eq!(voice.disconnects(), 1);
    }

    #[tokio::test]
    async fn session_with_a_queued_request_is_kept() {
        let voice = FakeVoice::with_listeners(&[1]);
        let session = session(voice.clone());
        session.enqueue(local("a", Some(requester(2))), false).await;

        assert!(!session.stop_if_unused().await);
        assert_eq!(session.phase().await, Phase::Idle);
        assert_eq!(voice.disconnects(), 0);
    }

    #[tokio::test]
    async fn playing_session_is_kept() {
        let voice = FakeVoice::with_listeners(&[1]);
        let session = session(voice.clone());
        session.enqueue(local("a", Some(requester(2))), false).await;
        session.start().await;
        eventually(|| voice.played().len() == 1).await;

        assert!(!session.stop_if_unused().await);
        assert!(session.is_playing().await);
        assert_eq!(voice.disconnects(), 0);
    }

    #[tokio::test]
    async fn track_started_without_listeners_is_paused() {
        let voice = FakeVoice::with_listeners(&[]);
        let session = session(voice.clone());
        session.enqueue(local("a", None), false).await;
        session.start().await;

        eventually(|| voice.played().len() == 1).await;
        eventually(|| voice.stream() == StreamState::Paused).await;
        assert_eq!(voice.played(), vec![file("a")]);
    }

    #[tokio::test]
    async fn force_skip_without_track_is_rejected() {
        let voice = FakeVoice::with_listeners(&[1]);
        let session = session(voice);
        assert_eq!(session.force_skip().await, Err(PlayerError::NothingPlaying));
        assert_eq!(session.force_repeat().await, Err(PlayerError::NothingPlaying));
    }

    #[tokio::test]
    async fn pauses_when_everyone_leaves_and_resumes_on_return() {
        let voice = FakeVoice::with_listeners(&[1]);
        let session = session(voice.clone());
        session.enqueue(local("a", None), false).await;
        session.start().await;
        eventually(|| voice.played().len() == 1).await;
        eventually(|| voice.stream() == StreamState::Playing).await;

        voice.set_listeners(&[]);
        session.check_voice_state().await;
        assert_eq!(voice.stream(), StreamState::Paused);

        voice.set_listeners(&[1]);
        session.check_voice_state().await;
        assert_eq!(voice.stream(), StreamState::Playing);
        // same track, not restarted
        assert_eq!(voice.played().len(), 1);
    }

    #[tokio::test]
    async fn server_mute_pauses() {
        let voice = FakeVoice::with_listeners(&[1, 2]);
        let session = session(voice.clone());
        session.enqueue(local("a", None), false).await;
        session.start().await;
        eventually(|| voice.played().len() == 1).await;

        voice.server_muted.store(true, Ordering::SeqCst);
        session.check_voice_state().await;
        assert_eq!(voice.stream(), StreamState::Paused);
    }

    #[tokio::test]
    async fn volume_applies_to_live_stream_and_next_track() {
        let voice = FakeVoice::with_listeners(&[1]);
        let session = session(voice.clone());
        session.enqueue(local("a", None), false).await;
        session.enqueue(local("b", None), false).await;
        session.start().await;
        eventually(|| voice.played().len() == 1).await;

        session.change_volume(0.5).await;
        voice.finish(None);
        eventually(|| voice.played().len() == 2).await;

        assert_eq!(*voice.volumes.lock().unwrap(), vec![DEFAULT_VOLUME, 0.5, 0.5]);
    }

    #[test]
    fn startup_entry_round_trips_without_empty_permissions() {
        let entry = StartupEntry {
            voice_channel_id: ChannelId::new(10),
            log_channel_id: Some(ChannelId::new(20)),
            role_permissions: HashMap::new(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("role_permissions"));
        assert_eq!(serde_json::from_str::<StartupEntry>(&json).unwrap(), entry);

        let parsed: StartupEntry =
            serde_json::from_str(r#"{"voice_channel_id": 10, "log_channel_id": 20}"#).unwrap();
        assert_eq!(parsed, entry);
    }
}
