use super::{checks::require_admin, current_session, reply, require_listener, VoteKind};
use crate::{player::Response, AppError, Context};

/// Repeats the currently playing track.
///
/// In order to repeat a track more than half of the current listeners must vote to repeat.
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn repeat(ctx: Context<'_>) -> Result<(), AppError> {
    let session = current_session(ctx).await?;
    require_listener(ctx, &session).await?;

    let outcome = session.register_repeat_vote(ctx.author().id).await?;
    reply::send(ctx, VoteKind::Repeat.response(outcome, &ctx.author().name)).await
}

/// Force Repeats the currently playing track.
#[poise::command(prefix_command, slash_command, guild_only, check = "require_admin")]
pub async fn force_repeat(ctx: Context<'_>) -> Result<(), AppError> {
    let session = current_session(ctx).await?;
    session.force_repeat().await?;

    let response = Response::info("Repeat track request", "Repeating track...")
        .author(format!("Repeat request - requested by: {}", ctx.author().name));
    reply::send(ctx, response).await
}
