use crate::{player::PlayerError, AppError, Context};

/// Server administrators and the bot owner only.
pub async fn require_admin(ctx: Context<'_>) -> Result<bool, AppError> {
    if ctx.author().id == ctx.data().config.bot_owner_uid {
        return Ok(true);
    }

    let is_admin = match ctx.author_member().await {
        Some(member) => member
            .permissions
            .or_else(|| ctx.guild().map(|guild| guild.member_permissions(&member)))
            .map(|permissions| permissions.administrator())
            .unwrap_or(false),
        None => false,
    };

    if is_admin {
        Ok(true)
    } else {
        Err(PlayerError::not_admin().into())
    }
}
