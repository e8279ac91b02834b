use super::{checks::require_admin, current_session, reply};
use crate::{player::Response, AppError, Context};

/// Saves the running player so it starts again with the bot.
#[poise::command(prefix_command, slash_command, guild_only, check = "require_admin")]
pub async fn add_player(ctx: Context<'_>) -> Result<(), AppError> {
    let session = current_session(ctx).await?;
    let entry = session.to_startup_entry();
    let voice_channel_id = entry.voice_channel_id;

    ctx.data().startup.save_entry(entry).await?;

    let response = Response::info(
        "Player added to startup list",
        format!("<#{}> will be joined whenever the bot starts...", voice_channel_id),
    )
    .author(format!("Player Add - requested by: {}", ctx.author().name));
    reply::send(ctx, response).await
}
