use std::path::Path;

use poise::{
    serenity_prelude::{
        CreateAttachment, CreateEmbed, CreateEmbedAuthor, CreateMessage,
    },
    CreateReply,
};

use crate::{
    player::{Response, Thumbnail},
    AppError, Context,
};

/// A [`Response`] ready to be sent: the embed plus the file its thumbnail
/// points at, if it needs one.
pub struct Rendered {
    pub embed: CreateEmbed,
    pub attachment: Option<CreateAttachment>,
}

pub async fn render(response: &Response, default_art: &Path) -> Rendered {
    let mut embed = CreateEmbed::default()
        .title(&response.title)
        .colour(response.colour);

    if let Some(description) = &response.description {
        embed = embed.description(description);
    }
    if let Some(author) = &response.author {
        let mut author = CreateEmbedAuthor::new(author);
        if let Some(url) = &response.author_url {
            author = author.url(url);
        }
        embed = embed.author(author);
    }
    for line in &response.fields {
        embed = embed.field(&line.name, &line.value, false);
    }

    let attachment = match &response.thumbnail {
        None => None,
        Some(Thumbnail::Url(url)) => {
            embed = embed.thumbnail(url);
            None
        }
        Some(Thumbnail::Attachment { filename, data }) => {
            embed = embed.thumbnail(format!("attachment://{}", filename));
            Some(CreateAttachment::bytes(data.to_vec(), filename.clone()))
        }
        Some(Thumbnail::DefaultArt) => match CreateAttachment::path(default_art).await {
            Ok(attachment) => {
                embed = embed.thumbnail(format!("attachment://{}", attachment.filename));
                Some(attachment)
            }
            Err(e) => {
                tracing::warn!("can't attach {}: {}", default_art.display(), e);
                None
            }
        },
    };

    Rendered { embed, attachment }
}

pub async fn create_reply(ctx: Context<'_>, response: &Response) -> CreateReply {
    let rendered = render(response, &ctx.data().config.default_art_file).await;
    let mut reply = CreateReply::default().embed(rendered.embed);
    if let Some(attachment) = rendered.attachment {
        reply = reply.attachment(attachment);
    }
    reply
}

pub async fn create_message(response: &Response, default_art: &Path) -> CreateMessage {
    let rendered = render(response, default_art).await;
    let mut message = CreateMessage::default().embed(rendered.embed);
    if let Some(attachment) = rendered.attachment {
        message = message.add_file(attachment);
    }
    message
}

/// Reply to the invoking command with `response`.
pub async fn send(ctx: Context<'_>, response: Response) -> Result<(), AppError> {
    let reply = create_reply(ctx, &response).await;
    ctx.send(reply).await?;
    Ok(())
}
