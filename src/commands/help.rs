use crate::{AppError, Context};

/// Shows this message, or help for one command.
#[poise::command(prefix_command, slash_command)]
pub async fn help(
    ctx: Context<'_>,
    #[description = "specific command to show help about"] command: Option<String>,
) -> Result<(), AppError> {
    let prefix = &ctx.data().config.command_prefix;
    let extra_text_at_bottom = format!(
        "\
Type {prefix}help <command> for extra help on a command.
Start listening with {prefix}request <mp3|youtube|soundcloud|clyp> <query>."
    );
    let config = poise::builtins::HelpConfiguration {
        extra_text_at_bottom: &extra_text_at_bottom,
        ephemeral: true,
        ..Default::default()
    };

    poise::builtins::help(ctx, command.as_deref(), config).await?;

    Ok(())
}
