use super::{checks::require_admin, reply, RELEASE_TIMEOUT};
use crate::{
    player::{PlayerError, Response},
    AppError, Context,
};

/// Stops the player in the current guild.
#[poise::command(prefix_command, slash_command, guild_only, check = "require_admin")]
pub async fn stop_player(ctx: Context<'_>) -> Result<(), AppError> {
    let guild_id = ctx.guild_id().ok_or(PlayerError::SessionNotFound)?;
    if let Err(e) = ctx.defer().await {
        tracing::warn!("can't send defer msg: {}", e);
    }

    ctx.data()
        .sessions
        .stop_and_wait(guild_id, RELEASE_TIMEOUT)
        .await?;

    let response = Response::info("Stopping Player...", "stopped.")
        .author(format!("Player Stop - requested by: {}", ctx.author().name));
    reply::send(ctx, response).await
}
