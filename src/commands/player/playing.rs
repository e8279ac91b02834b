use super::{current_session, reply};
use crate::{player::PlayerError, AppError, Context};

/// Displays the currently playing track.
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn playing(ctx: Context<'_>) -> Result<(), AppError> {
    let session = current_session(ctx).await?;
    let track = session
        .current_track()
        .await
        .ok_or(PlayerError::NothingPlaying)?;

    reply::send(ctx, track.display_for_now_playing()).await
}
