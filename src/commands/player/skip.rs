use super::{checks::require_admin, current_session, reply, require_listener, VoteKind};
use crate::{player::Response, AppError, Context};

/// Skips the currently playing track.
///
/// In order to skip a track more than half of the current listeners must vote to skip.
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn skip(ctx: Context<'_>) -> Result<(), AppError> {
    let session = current_session(ctx).await?;
    require_listener(ctx, &session).await?;

    let outcome = session.register_skip_vote(ctx.author().id).await?;
    reply::send(ctx, VoteKind::Skip.response(outcome, &ctx.author().name)).await
}

/// Force Skips the currently playing track.
#[poise::command(prefix_command, slash_command, guild_only, check = "require_admin")]
pub async fn force_skip(ctx: Context<'_>) -> Result<(), AppError> {
    let session = current_session(ctx).await?;
    session.force_skip().await?;

    let response = Response::info("Skip track request", "Skipping track...")
        .author(format!("Skip request - requested by: {}", ctx.author().name));
    reply::send(ctx, response).await
}
