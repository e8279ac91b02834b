use std::collections::HashMap;

use super::{checks::require_admin, reply};
use crate::{
    player::{PlayerError, Response, StartupEntry},
    voice::{launch_session, voice_channel_of},
    AppError, Context,
};

/// Starts the auto-fill player in your voice channel.
///
/// Updates are posted to the channel this command was used in.
#[poise::command(prefix_command, slash_command, guild_only, check = "require_admin")]
pub async fn start_player(ctx: Context<'_>) -> Result<(), AppError> {
    let guild_id = ctx.guild_id().ok_or(PlayerError::SessionNotFound)?;
    if ctx.data().sessions.get(guild_id).await.is_some() {
        return Err(PlayerError::SessionAlreadyRunning.into());
    }
    let voice_channel_id = voice_channel_of(ctx.cache(), guild_id, ctx.author().id)
        .ok_or(PlayerError::NotInVoiceChannel)?;

    if let Err(e) = ctx.defer().await {
        tracing::warn!("can't send defer msg: {}", e);
    }

    let entry = StartupEntry {
        voice_channel_id,
        log_channel_id: Some(ctx.channel_id()),
        role_permissions: HashMap::new(),
    };
    let session = launch_session(ctx.serenity_context(), ctx.data(), guild_id, entry, true).await?;
    session.start().await;

    let response = Response::info("Starting Player...", format!("playing in <#{}>...", voice_channel_id))
        .author(format!("Player Start - requested by: {}", ctx.author().name));
    reply::send(ctx, response).await
}
