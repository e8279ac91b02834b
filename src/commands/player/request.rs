use std::{collections::HashMap, sync::Arc, time::Duration};

use poise::serenity_prelude::{
    ButtonStyle, ComponentInteractionCollector, CreateActionRow, CreateButton,
    CreateInteractionResponse,
};
use tracing::{info, warn};

use super::{reply, require_permitted, requester};
use crate::{
    media::{SearchKind, SearchResults},
    player::{PlayerError, Session, StartupEntry, Track},
    voice::{launch_session, voice_channel_of},
    AppError, Context,
};

/// Pending requests a single user may have in the queue.
pub const MAX_REQUESTS_PER_USER: usize = 2;

const SELECTION_TIMEOUT: Duration = Duration::from_secs(60);

/// Adds a specified request to the queue.
///
/// Available search types include:
/// ```yaml
/// mp3:        Search through the local song playlist
/// youtube:    Search for videos on YouTube
/// soundcloud: Search for songs on SoundCloud
/// clyp:       Play track from Clyp given a URL or ID
/// ```
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn request(
    ctx: Context<'_>,
    #[description = "Where to search"] kind: SearchKind,
    #[description = "What to search for"]
    #[rest]
    query: String,
) -> Result<(), AppError> {
    let guild_id = ctx.guild_id().ok_or(PlayerError::SessionNotFound)?;
    if let Err(e) = ctx.defer().await {
        warn!("can't send defer msg: {}", e);
    }

    let (session, created) = match ctx.data().sessions.get(guild_id).await {
        Some(session) => (session, false),
        None => {
            let voice_channel_id = voice_channel_of(ctx.cache(), guild_id, ctx.author().id)
                .ok_or(PlayerError::NotInVoiceChannel)?;
            let entry = StartupEntry {
                voice_channel_id,
                log_channel_id: Some(ctx.channel_id()),
                role_permissions: HashMap::new(),
            };
            let session =
                launch_session(ctx.serenity_context(), ctx.data(), guild_id, entry, false).await?;
            (session, true)
        }
    };

    let result = add_request(ctx, &session, kind, &query).await;
    // don't keep an empty player around for a request that went nowhere,
    // unless someone else queued something on it meanwhile
    if result.is_err() && created && session.stop_if_unused().await {
        info!("guild {}: dropped unused player", guild_id);
    }
    result
}

async fn add_request(
    ctx: Context<'_>,
    session: &Arc<Session>,
    kind: SearchKind,
    query: &str,
) -> Result<(), AppError> {
    if session.requests_by(ctx.author().id).await >= MAX_REQUESTS_PER_USER {
        return Err(PlayerError::TooManyRequests(MAX_REQUESTS_PER_USER).into());
    }
    require_permitted(ctx, session).await?;

    let results = ctx
        .data()
        .media
        .search(kind, query, requester(ctx))
        .await?;
    if results.is_empty() {
        return Err(PlayerError::NoSelection(format!("No results found for {}...", query)).into());
    }

    let track = choose(ctx, &results).await?;
    let confirmation = track.display_for_request_confirmation();
    session.enqueue(track, false).await;
    session.start().await;

    reply::send(ctx, confirmation).await
}

/// Show `results` with one button per track and wait for the author to
/// pick one.
async fn choose(ctx: Context<'_>, results: &SearchResults) -> Result<Track, AppError> {
    let btn_id = format!("{}-pick-", ctx.id());
    let buttons = (0..results.tracks.len())
        .map(|index| {
            CreateButton::new(format!("{}{}", btn_id, index))
                .label((index + 1).to_string())
                .style(ButtonStyle::Primary)
        })
        .collect();

    let reply = reply::create_reply(ctx, &results.display())
        .await
        .components(vec![CreateActionRow::Buttons(buttons)]);
    let handle = ctx.send(reply).await?;
    let message_id = handle.message().await?.id;

    let interaction = ComponentInteractionCollector::new(ctx.serenity_context())
        .author_id(ctx.author().id)
        .message_id(message_id)
        .timeout(SELECTION_TIMEOUT)
        .filter({
            let btn_id = btn_id.clone();
            move |i| i.data.custom_id.starts_with(&btn_id)
        })
        .await;

    if let Some(interaction) = &interaction {
        if let Err(e) = interaction
            .create_response(ctx.serenity_context(), CreateInteractionResponse::Acknowledge)
            .await
        {
            warn!("can't acknowledge selection: {}", e);
        }
    }
    if let Err(e) = handle.delete(ctx).await {
        warn!("can't delete search results: {}", e);
    }

    let interaction = interaction
        .ok_or_else(|| PlayerError::NoSelection("You did not choose a track in time".into()))?;
    interaction
        .data
        .custom_id
        .strip_prefix(&btn_id)
        .and_then(|index| index.parse::<usize>().ok())
        .and_then(|index| results.tracks.get(index))
        .cloned()
        .ok_or_else(|| PlayerError::NoSelection("That track is no longer available".into()).into())
}
