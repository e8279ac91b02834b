mod commands;
mod data;
mod media;
mod player;
mod voice;

use std::{fmt::Display, sync::Arc};

use data::{config::Config, Data};

use dotenvy::dotenv;
use player::{PlayerError, Response, SessionRegistry};
use poise::{
    serenity_prelude::{self as serenity, Channel, ClientBuilder, FullEvent, GatewayIntents},
    FrameworkError, FrameworkOptions,
};
use songbird::SerenityInit;
use tracing::{debug, error, info, warn};

#[derive(Debug)]
pub struct AppError(anyhow::Error);
impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AppError {
    /// The player refusal behind this error, if that's what it is.
    pub fn player_error(&self) -> Option<&PlayerError> {
        self.0.downcast_ref()
    }
}

type Context<'a> = poise::Context<'a, Data, AppError>;

/// Tell the user why their command didn't go through.
async fn report_error(ctx: Context<'_>, error: &AppError) {
    let command = &ctx.command().name;
    let response = match error.player_error() {
        Some(e @ PlayerError::PermissionDenied(_)) => {
            debug!("{} refused for {}: {}", command, ctx.author().name, e);
            Response::rejection(command, e)
        }
        Some(e) => {
            info!("{} refused: {}", command, e);
            Response::rejection(command, e)
        }
        None => {
            error!("Command error: {}", error);
            Response::rejection(command, &PlayerError::unavailable(error.to_string()))
        }
    };
    let description = format!(
        "{}\nFor more information type `{}help {}`.",
        response.description.clone().unwrap_or_default(),
        ctx.data().config.command_prefix,
        command
    );

    if let Err(e) =
        commands::player::reply::send(ctx, response.description(description)).await
    {
        warn!("can't send error reply: {}", e);
    }
}

async fn event_handler(
    _ctx: &serenity::Context,
    event: &FullEvent,
    _framework: poise::FrameworkContext<'_, Data, AppError>,
    data: &Data,
) -> Result<(), AppError> {
    let guild_id = match event {
        FullEvent::VoiceStateUpdate { new, .. } => new.guild_id,
        FullEvent::GuildCreate { guild, .. } => Some(guild.id),
        FullEvent::Ready { data_about_bot } => {
            info!("{} is connected", data_about_bot.user.name);
            None
        }
        _ => None,
    };

    if let Some(session) = match guild_id {
        Some(guild_id) => data.sessions.get(guild_id).await,
        None => None,
    } {
        debug!("voice state changed in guild {}", session.guild_id());
        session.check_voice_state().await;
    }
    Ok(())
}

/// Join every channel on the startup list.
async fn launch_startup_sessions(ctx: serenity::Context, data: Data) {
    let entries = match data.startup.load().await {
        Ok(entries) => entries,
        Err(e) => {
            error!("can't read {}: {}", data.startup.path().display(), e);
            return;
        }
    };

    for entry in entries {
        let channel_id = entry.voice_channel_id;
        let guild_id = match channel_id.to_channel(&ctx).await {
            Ok(Channel::Guild(channel)) => channel.guild_id,
            Ok(_) => {
                warn!("startup channel {} is not a guild channel", channel_id);
                continue;
            }
            Err(e) => {
                warn!("can't resolve startup channel {}: {}", channel_id, e);
                continue;
            }
        };

        match voice::launch_session(&ctx, &data, guild_id, entry, true).await {
            Ok(session) => {
                session.start().await;
            }
            Err(e) => error!("can't start player in {}: {}", channel_id, e),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if dotenv().is_err() {
        info!(".env file not exists");
    }

    let level = if Config::debug_enabled() {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = Config::init();
    let discord_token = config.discord_token.clone();
    let prefix = config.command_prefix.clone();
    let sessions = Arc::new(SessionRegistry::default());
    let shared_sessions = sessions.clone();

    let framework = poise::Framework::builder()
        .options(FrameworkOptions {
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(prefix),
                case_insensitive_commands: true,
                ..Default::default()
            },
            commands: vec![
                commands::help::help(),
                commands::player::request(),
                commands::player::skip(),
                commands::player::force_skip(),
                commands::player::repeat(),
                commands::player::force_repeat(),
                commands::player::volume(),
                commands::player::playing(),
                commands::player::queue(),
                commands::player::start_player(),
                commands::player::stop_player(),
                commands::player::restart_player(),
                commands::player::add_player(),
            ],
            on_error: |error: FrameworkError<Data, AppError>| {
                Box::pin(async move {
                    match error {
                        // args parse error
                        FrameworkError::ArgumentParse { error, input, ctx, .. } => {
                            info!("ArgumentParse error: {} (input {:?})", error, input);
                            let response = Response::rejection(
                                &ctx.command().name,
                                &PlayerError::NoSelection(error.to_string()),
                            );
                            if let Err(e) = commands::player::reply::send(ctx, response).await {
                                warn!("can't send error reply: {}", e);
                            }
                        }

                        // error in commands and failed checks
                        FrameworkError::Command { error, ctx, .. }
                        | FrameworkError::CommandCheckFailed {
                            error: Some(error),
                            ctx,
                            ..
                        } => report_error(ctx, &error).await,

                        // other errors
                        other => {
                            error!("other error: {}", other);
                            if let Err(e) = poise::builtins::on_error(other).await {
                                error!("can't handle error: {}", e);
                            }
                        }
                    }
                })
            },
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                let data = Data::new(config, shared_sessions);
                tokio::spawn(launch_startup_sessions(ctx.clone(), data.clone()));
                Ok(data)
            })
        })
        .build();

    let mut client = ClientBuilder::new(
        discord_token,
        GatewayIntents::non_privileged()
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
            | GatewayIntents::GUILD_VOICE_STATES,
    )
    .register_songbird()
    .framework(framework)
    .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("can't listen for ctrl-c: {}", e);
            return;
        }
        info!("shutting down {} player(s)", sessions.len().await);
        sessions.stop_all().await;
        shard_manager.shutdown_all().await;
    });

    client.start().await?;

    Ok(())
}
