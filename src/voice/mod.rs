//! songbird side of the player: the [`VoiceConnection`] a session drives and
//! the code that joins a channel and registers a new session.

mod announcer;
mod events;

pub use announcer::LogChannelAnnouncer;
pub use events::{DisconnectHandler, TrackEndHandler};

use std::sync::Arc;

use poise::serenity_prelude::{self as serenity, async_trait, Cache, ChannelId, GuildId, UserId};
use songbird::{
    input::{File, HttpRequest, Input},
    tracks::{PlayMode, Track, TrackHandle},
    Call, CoreEvent, Event, Songbird, TrackEvent,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    data::Data,
    player::{
        Announcer, AudioSource, AutoFill, Playlist, PlayerError, Session, SilentAnnouncer,
        StartupEntry, StreamState, TrackEnd, TrackEndSignal, VoiceConnection,
    },
};

pub struct SongbirdVoice {
    manager: Arc<Songbird>,
    call: Arc<Mutex<Call>>,
    cache: Arc<Cache>,
    http: reqwest::Client,
    guild_id: GuildId,
    channel_id: ChannelId,
    current: Mutex<Option<TrackHandle>>,
}

impl SongbirdVoice {
    pub fn new(
        manager: Arc<Songbird>,
        call: Arc<Mutex<Call>>,
        cache: Arc<Cache>,
        http: reqwest::Client,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Self {
        Self {
            manager,
            call,
            cache,
            http,
            guild_id,
            channel_id,
            current: Mutex::new(None),
        }
    }

    async fn current(&self) -> Option<TrackHandle> {
        self.current.lock().await.clone()
    }
}

#[async_trait]
impl VoiceConnection for SongbirdVoice {
    fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    fn listeners(&self) -> Vec<UserId> {
        let bot_id = self.cache.current_user().id;
        let Some(guild) = self.cache.guild(self.guild_id) else {
            return Vec::new();
        };

        guild
            .voice_states
            .values()
            .filter(|state| state.channel_id == Some(self.channel_id))
            .filter(|state| state.user_id != bot_id && !state.deaf && !state.self_deaf)
            .filter(|state| {
                let is_bot = guild
                    .members
                    .get(&state.user_id)
                    .or(state.member.as_ref())
                    .map(|member| member.user.bot)
                    .unwrap_or(false);
                !is_bot
            })
            .map(|state| state.user_id)
            .collect()
    }

    fn is_server_muted(&self) -> bool {
        let bot_id = self.cache.current_user().id;
        self.cache
            .guild(self.guild_id)
            .and_then(|guild| guild.voice_states.get(&bot_id).map(|state| state.mute))
            .unwrap_or(false)
    }

    async fn play(
        &self,
        source: AudioSource,
        volume: f32,
        on_end: TrackEndSignal,
    ) -> Result<(), PlayerError> {
        let input: Input = match source {
            AudioSource::File(path) => File::new(path).into(),
            AudioSource::Url(url) => HttpRequest::new(self.http.clone(), url).into(),
        };

        let handle = {
            let mut call = self.call.lock().await;
            if call.current_connection().is_none() {
                return Err(PlayerError::VoiceConnectionLost(
                    "not connected to a voice channel".to_string(),
                ));
            }
            call.play_only(Track::new(input).volume(volume))
        };

        let handler = TrackEndHandler { signal: on_end.clone() };
        for event in [TrackEvent::End, TrackEvent::Error] {
            // the track already finished, nothing will fire for it
            if let Err(e) = handle.add_event(Event::Track(event), handler.clone()) {
                warn!("guild {}: can't watch track end: {}", self.guild_id, e);
                on_end.fire(TrackEnd::default());
            }
        }

        *self.current.lock().await = Some(handle);
        Ok(())
    }

    async fn stream_state(&self) -> StreamState {
        let Some(handle) = self.current().await else {
            return StreamState::Idle;
        };
        match handle.get_info().await {
            Ok(info) => match info.playing {
                PlayMode::Play => StreamState::Playing,
                PlayMode::Pause => StreamState::Paused,
                _ => StreamState::Idle,
            },
            Err(_) => StreamState::Idle,
        }
    }

    async fn pause(&self) {
        if let Some(handle) = self.current().await {
            if let Err(e) = handle.pause() {
                warn!("guild {}: can't pause: {}", self.guild_id, e);
            }
        }
    }

    async fn resume(&self) {
        if let Some(handle) = self.current().await {
            if let Err(e) = handle.play() {
                warn!("guild {}: can't resume: {}", self.guild_id, e);
            }
        }
    }

    async fn stop(&self) {
        if let Some(handle) = self.current().await {
            // fails when the track already ended, which is what we want anyway
            let _ = handle.stop();
        }
    }

    async fn set_volume(&self, volume: f32) {
        if let Some(handle) = self.current().await {
            if let Err(e) = handle.set_volume(volume) {
                warn!("guild {}: can't change volume: {}", self.guild_id, e);
            }
        }
    }

    async fn disconnect(&self) {
        *self.current.lock().await = None;
        if let Err(e) = self.manager.remove(self.guild_id).await {
            warn!("guild {}: can't leave voice channel: {}", self.guild_id, e);
        }
    }
}

/// The voice channel `user_id` is currently in, according to the cache.
pub fn voice_channel_of(cache: &Cache, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    cache
        .guild(guild_id)
        .and_then(|guild| guild.voice_states.get(&user_id).and_then(|state| state.channel_id))
}

/// Join `entry`'s voice channel and register a new, not yet started session
/// for `guild_id`.
///
/// With `autofill` the session plays shuffled tracks from the playlist
/// directory whenever no requests are pending.
pub async fn launch_session(
    ctx: &serenity::Context,
    data: &Data,
    guild_id: GuildId,
    entry: StartupEntry,
    autofill: bool,
) -> Result<Arc<Session>, PlayerError> {
    if data.sessions.get(guild_id).await.is_some() {
        return Err(PlayerError::SessionAlreadyRunning);
    }

    let manager = songbird::get(ctx).await.ok_or_else(|| {
        PlayerError::VoiceConnectionLost("songbird is not registered".to_string())
    })?;
    let call = manager
        .join(guild_id, entry.voice_channel_id)
        .await
        .map_err(|e| PlayerError::VoiceConnectionLost(format!("can't join voice channel: {}", e)))?;

    // deafen the bot
    {
        let mut call = call.lock().await;
        if !call.is_deaf() {
            if let Err(e) = call.deafen(true).await {
                warn!("can't deafen the bot: {}", e);
            }
        }
    }

    let playlist = if autofill {
        let directory = data.config.playlist_directory.clone();
        let cache_length = data.config.autofill_cache_length;
        tokio::task::spawn_blocking(move || AutoFill::new(directory, cache_length))
            .await
            .map(Playlist::with_autofill)
            .map_err(|e| PlayerError::Startup(format!("can't load auto-fill tracks: {}", e)))?
    } else {
        Playlist::requests_only()
    };

    let announcer: Arc<dyn Announcer> = match entry.log_channel_id {
        Some(channel_id) => Arc::new(LogChannelAnnouncer {
            http: ctx.http.clone(),
            channel_id,
            default_art: data.config.default_art_file.clone(),
        }),
        None => Arc::new(SilentAnnouncer),
    };

    let voice = SongbirdVoice::new(
        manager,
        call.clone(),
        ctx.cache.clone(),
        data.media.http(),
        guild_id,
        entry.voice_channel_id,
    );
    let session = Arc::new(
        Session::new(guild_id, Arc::new(voice), data.media.clone(), announcer, playlist)
            .with_log_channel(entry.log_channel_id)
            .with_role_permissions(entry.role_permissions),
    );

    call.lock().await.add_global_event(
        Event::Core(CoreEvent::DriverDisconnect),
        DisconnectHandler {
            session: Arc::downgrade(&session),
        },
    );

    let session = data.sessions.create(guild_id, session).await?;
    info!(
        "guild {}: session created in channel {}",
        guild_id, entry.voice_channel_id
    );
    Ok(session)
}
