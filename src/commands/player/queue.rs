use super::{current_session, reply};
use crate::{
    player::{display::COLOUR_INFO, Response, DEFAULT_PEEK_LENGTH},
    AppError, Context,
};

/// Retrieves the next 10 upcoming tracks.
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn queue(ctx: Context<'_>) -> Result<(), AppError> {
    let session = current_session(ctx).await?;
    let upcoming = session.peek_queue(DEFAULT_PEEK_LENGTH).await;

    let bot_name = ctx.cache().current_user().name.clone();
    let guild_name = ctx
        .guild()
        .map(|guild| guild.name.clone())
        .unwrap_or_else(|| "this server".to_string());

    let mut response = Response::new(
        format!("{} Playlist for {} - Upcoming songs:", bot_name, guild_name),
        COLOUR_INFO,
    );
    if upcoming.is_empty() {
        response = response.description("Nothing is queued up...");
    }
    for track in &upcoming {
        response = response.field(track.display_for_queue_entry());
    }

    reply::send(ctx, response).await
}
