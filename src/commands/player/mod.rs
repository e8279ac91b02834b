mod add;
mod checks;
mod playing;
mod queue;
mod repeat;
pub mod reply;
mod request;
mod restart;
mod skip;
mod start;
mod stop;
mod volume;

pub use add::add_player;
pub use playing::playing;
pub use queue::queue;
pub use repeat::{force_repeat, repeat};
pub use request::request;
pub use restart::restart_player;
pub use skip::{force_skip, skip};
pub use start::start_player;
pub use stop::stop_player;
pub use volume::volume;

use std::{sync::Arc, time::Duration};

use poise::serenity_prelude::RoleId;

use crate::{
    player::{
        display::COLOUR_ERROR, PlayerError, Requester, Response, Session, VoteOutcome,
    },
    Context,
};

/// How long admin commands wait for a session to leave its channel.
const RELEASE_TIMEOUT: Duration = Duration::from_secs(10);

/// The session of the guild the command was invoked in.
async fn current_session(ctx: Context<'_>) -> Result<Arc<Session>, PlayerError> {
    let guild_id = ctx.guild_id().ok_or(PlayerError::SessionNotFound)?;
    ctx.data()
        .sessions
        .get(guild_id)
        .await
        .ok_or(PlayerError::SessionNotFound)
}

fn requester(ctx: Context<'_>) -> Requester {
    Requester::new(ctx.author().id, ctx.author().name.clone())
}

async fn author_roles(ctx: Context<'_>) -> Vec<RoleId> {
    ctx.author_member()
        .await
        .map(|member| member.roles.clone())
        .unwrap_or_default()
}

/// The author's roles must allow this command in `session`.
async fn require_permitted(ctx: Context<'_>, session: &Session) -> Result<(), PlayerError> {
    let command = &ctx.command().name;
    if session.permits(command, &author_roles(ctx).await) {
        Ok(())
    } else {
        Err(PlayerError::PermissionDenied(format!(
            "Your roles don't allow you to use {} on this server...",
            command
        )))
    }
}

/// The author must be listening to `session` and be allowed the command.
async fn require_listener(ctx: Context<'_>, session: &Session) -> Result<(), PlayerError> {
    if !session.is_listener(ctx.author().id) {
        return Err(PlayerError::not_listening());
    }
    require_permitted(ctx, session).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VoteKind {
    Skip,
    Repeat,
}

impl VoteKind {
    fn response(self, outcome: VoteOutcome, voter: &str) -> Response {
        let (title, verb, passed, spent) = match self {
            Self::Skip => (
                "Skip track request",
                "skip",
                "Skipping track...",
                "Already skipping this track...",
            ),
            Self::Repeat => (
                "Repeat track request",
                "repeat",
                "Repeating track...",
                "This track is already going to be repeated...",
            ),
        };

        let response = match outcome {
            VoteOutcome::Passed => Response::info(title, passed),
            VoteOutcome::AlreadyPassed => Response::info(title, spent),
            VoteOutcome::Pending {
                already_voted: true,
                needed,
            } => Response::new(title, COLOUR_ERROR).description(format!(
                "you have already requested to {}...\nyou currently need **{}** more votes to {} this track.",
                verb, needed, verb
            )),
            VoteOutcome::Pending { needed, .. } => Response::info(
                title,
                format!(
                    "you currently need **{}** more votes to {} this track.",
                    needed, verb
                ),
            ),
        };

        let label = match self {
            Self::Skip => "Skip",
            Self::Repeat => "Repeat",
        };
        response.author(format!("{} request - requested by: {}", label, voter))
    }
}
