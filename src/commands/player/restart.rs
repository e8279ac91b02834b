use super::{checks::require_admin, current_session, reply, RELEASE_TIMEOUT};
use crate::{player::Response, voice::launch_session, AppError, Context};

/// Restarts the player in the current guild.
///
/// The new player joins the same channel with the same settings, its queue
/// starts out empty.
#[poise::command(prefix_command, slash_command, guild_only, check = "require_admin")]
pub async fn restart_player(ctx: Context<'_>) -> Result<(), AppError> {
    let old = current_session(ctx).await?;
    let guild_id = old.guild_id();
    let entry = old.to_startup_entry();
    let autofill = old.has_autofill().await;

    let response = Response::info("Restarting Player...", "restarting...")
        .author(format!("Player Restart - requested by: {}", ctx.author().name));
    reply::send(ctx, response).await?;

    ctx.data()
        .sessions
        .stop_and_wait(guild_id, RELEASE_TIMEOUT)
        .await?;

    let session = launch_session(ctx.serenity_context(), ctx.data(), guild_id, entry, autofill).await?;
    if autofill {
        session.start().await;
    }
    Ok(())
}
