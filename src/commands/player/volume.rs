use super::{current_session, reply, require_listener};
use crate::{
    player::{volume_or_default, Response},
    AppError, Context,
};

/// Sets the player volume.
///
/// Play volume can be set between 0 and 1
/// The default volume is 0.15
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn volume(
    ctx: Context<'_>,
    #[description = "Between 0 and 1, leave empty for the default"] volume: Option<f32>,
) -> Result<(), AppError> {
    let session = current_session(ctx).await?;
    require_listener(ctx, &session).await?;

    let level = volume_or_default(volume);
    session.change_volume(level).await;

    let title = match volume {
        Some(requested) if requested == level => format!("Setting volume to {}...", level),
        _ => "Resetting volume to default...".to_string(),
    };
    let response = Response::info(title, "Changing volume...")
        .author(format!("Volume change - requested by: {}", ctx.author().name));
    reply::send(ctx, response).await
}
