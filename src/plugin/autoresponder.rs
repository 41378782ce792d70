use crate::{
    command::{ArgKind, ArgSpec, Args, CommandSpec, ModuleSpec, NO_PERMISSIONS},
    event::*,
    helper::*,
    log_internal,
    logging::*,
    plugin::*,
    template::{render, ChannelResolver, NoChannels, RenderContext},
    trigger::{ResponseKind, TriggerEntry},
};
use anyhow::{bail, Result};
use serenity::all::{CreateEmbed, CreateMessage, Mentionable, Message, Permissions};

const MANAGE_GUILD: Permissions = Permissions::MANAGE_GUILD;
const LIST_COLOR: u32 = 0xE67E22;

const TRIGGER: ArgSpec = ArgSpec {
    name: "trigger",
    kind: ArgKind::Word,
    required: true,
};
const KIND: ArgSpec = ArgSpec {
    name: "type",
    kind: ArgKind::Word,
    required: true,
};
const CONTENT: ArgSpec = ArgSpec {
    name: "content",
    kind: ArgKind::Text,
    required: true,
};

static MODULE: ModuleSpec = ModuleSpec {
    name: "Autoresponders",
    description: "Automatic replies to messages containing a trigger phrase.",
    commands: &[CommandSpec {
        name: "autoresponder",
        aliases: &[],
        help: "Manages autoresponders.",
        args: &[],
        permissions: MANAGE_GUILD,
        subcommands: &[
            CommandSpec {
                name: "create",
                aliases: &[],
                help: "Creates a new autoresponder.\n\
                       Type is `text`, `embed` or `image`. Content may end with \
                       `--match exact|contains`, `--title \"Title\"` and `--color #RRGGBB`.",
                args: &[TRIGGER, KIND, CONTENT],
                permissions: NO_PERMISSIONS,
                subcommands: &[],
            },
            CommandSpec {
                name: "edit",
                aliases: &[],
                help: "Replaces the content of an autoresponder.\nOptions given are updated, the rest are kept.",
                args: &[TRIGGER, CONTENT],
                permissions: NO_PERMISSIONS,
                subcommands: &[],
            },
            CommandSpec {
                name: "delete",
                aliases: &[],
                help: "Deletes an autoresponder.",
                args: &[TRIGGER],
                permissions: NO_PERMISSIONS,
                subcommands: &[],
            },
            CommandSpec {
                name: "list",
                aliases: &[],
                help: "Lists all autoresponders.",
                args: &[],
                permissions: NO_PERMISSIONS,
                subcommands: &[],
            },
        ],
    }],
};

/// Management commands for autoresponders
pub struct Autoresponders;

#[serenity::async_trait]
impl Plugin for Autoresponders {
    fn name(&self) -> &'static str {
        "autoresponders"
    }

    fn module(&self) -> Option<&'static ModuleSpec> {
        Some(&MODULE)
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some((msg, invocation)) = event.bot_cmd(ctx, &MODULE).await? else {
            return Ok(EventHandled::No);
        };
        let args = &invocation.args;

        match invocation.name().as_str() {
            "autoresponder create" => create(ctx, msg, args).await?,
            "autoresponder edit" => edit(ctx, msg, args).await?,
            "autoresponder delete" => delete(ctx, msg, args).await?,
            "autoresponder list" => list(ctx, msg).await?,
            other => bail!("Autoresponders has no handler for `{}`", other),
        }

        Ok(EventHandled::Yes)
    }
}

async fn create(ctx: &Context<'_>, msg: &Message, args: &Args) -> Result<()> {
    let entry = ctx
        .vstate
        .write()
        .await
        .autoresponders
        .create(
            args.word("trigger")?,
            args.word("type")?,
            args.text("content").unwrap_or_default(),
        )?
        .clone();
    log_internal!(
        "{} created autoresponder `{}` ({}, {})",
        msg.author.color(),
        entry.trigger,
        entry.kind,
        entry.match_mode
    );

    msg.channel_id
        .say(
            ctx.http,
            format!(
                "\u{2705} Autoresponder for trigger `{}` created successfully!",
                entry.trigger
            ),
        )
        .await?;
    Ok(())
}

async fn edit(ctx: &Context<'_>, msg: &Message, args: &Args) -> Result<()> {
    let trigger = ctx
        .vstate
        .write()
        .await
        .autoresponders
        .edit(args.word("trigger")?, args.text("content").unwrap_or_default())?
        .trigger
        .clone();
    log_internal!("{} edited autoresponder `{}`", msg.author.color(), trigger);

    msg.channel_id
        .say(
            ctx.http,
            format!(
                "\u{2705} Autoresponder for trigger `{}` updated successfully!",
                trigger
            ),
        )
        .await?;
    Ok(())
}

async fn delete(ctx: &Context<'_>, msg: &Message, args: &Args) -> Result<()> {
    let removed = ctx
        .vstate
        .write()
        .await
        .autoresponders
        .delete(args.word("trigger")?)?;
    log_internal!(
        "{} deleted autoresponder `{}`",
        msg.author.color(),
        removed.trigger
    );

    msg.channel_id
        .say(
            ctx.http,
            format!(
                "\u{2705} Autoresponder for trigger `{}` deleted successfully.",
                removed.trigger
            ),
        )
        .await?;
    Ok(())
}

async fn list(ctx: &Context<'_>, msg: &Message) -> Result<()> {
    let fields: Vec<_> = ctx
        .vstate
        .read()
        .await
        .autoresponders
        .list()
        .map(|entry| {
            (
                format!("Trigger: `{}`", entry.trigger),
                format!("Type: `{}`, Match: `{}`", entry.kind, entry.match_mode),
                false,
            )
        })
        .collect();

    if fields.is_empty() {
        msg.channel_id
            .say(ctx.http, "No autoresponders have been created yet.")
            .await?;
        return Ok(());
    }

    let embed = CreateEmbed::new()
        .title("Autoresponders")
        .description("Here are the autoresponders configured for this server:")
        .color(LIST_COLOR)
        .fields(fields);
    msg.channel_id
        .send_message(ctx.cache_http, CreateMessage::new().embed(embed))
        .await?;
    Ok(())
}

/// Send the response of an autoresponder or custom command to the channel `msg` came from, with
/// its placeholders filled in.
pub(super) async fn send_response(
    ctx: &Context<'_>,
    msg: &Message,
    entry: &TriggerEntry,
) -> Result<()> {
    let content = {
        let guild = match msg.guild_id {
            Some(guild_id) => Some(GuildSnapshot::from_cache(ctx, guild_id)?),
            None => None,
        };
        let channel_names = guild.as_ref().map(GuildSnapshot::channel_names);
        let channels: &dyn ChannelResolver = match &channel_names {
            Some(names) => names,
            None => &NoChannels,
        };
        let render_ctx = RenderContext {
            author_mention: msg.author.mention().to_string(),
            guild_name: guild.as_ref().map(|guild| guild.name.clone()),
            channels,
        };
        render(&entry.body, &render_ctx)
    };

    match entry.kind {
        ResponseKind::Text | ResponseKind::Image => {
            msg.channel_id.say(ctx.http, content).await?;
        }
        ResponseKind::Embed => {
            let mut embed = CreateEmbed::new()
                .description(content)
                .color(entry.embed_color());
            if let Some(title) = &entry.title {
                embed = embed.title(title);
            }
            msg.channel_id
                .send_message(ctx.cache_http, CreateMessage::new().embed(embed))
                .await?;
        }
    }

    Ok(())
}

/// Replies to unprefixed messages that match an autoresponder trigger.
pub struct AutoresponderListener;

#[serenity::async_trait]
impl Plugin for AutoresponderListener {
    fn name(&self) -> &'static str {
        "autoresponder_listener"
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Event::Message(msg) = event else {
            return Ok(EventHandled::No);
        };
        if event.prefixed(ctx).await.is_some() {
            return Ok(EventHandled::No);
        }

        let entry = ctx
            .vstate
            .read()
            .await
            .autoresponders
            .find_match(&msg.content)
            .cloned();
        let Some(entry) = entry else {
            return Ok(EventHandled::No);
        };

        log_internal!(
            "Autoresponder `{}` triggered by {}",
            entry.trigger,
            msg.author.color()
        );
        send_response(ctx, msg, &entry).await?;
        Ok(EventHandled::Yes)
    }
}
