use crate::{
    command::{ArgKind, ArgSpec, CommandSpec, ModuleSpec},
    error::BotError,
    event::*,
    helper::*,
    log_error, log_internal,
    logging::*,
    plugin::*,
    registry::lockdown::ChannelSnapshot,
};
use anyhow::{bail, Result};
use serenity::all::{
    ChannelId, GuildId, Message, PermissionOverwrite, PermissionOverwriteType, Permissions, RoleId,
};
use std::collections::HashSet;

const ADMINISTRATOR: Permissions = Permissions::ADMINISTRATOR;
const DEFAULT_REASON: &str = "No reason provided.";

const REASON: ArgSpec = ArgSpec {
    name: "reason",
    kind: ArgKind::Text,
    required: false,
};

static MODULE: ModuleSpec = ModuleSpec {
    name: "Emergency",
    description: "Server-wide lockdown for raids and other emergencies.",
    commands: &[
        CommandSpec {
            name: "serverlock",
            aliases: &[],
            help: "Stops everyone from sending messages in every text channel.",
            args: &[REASON],
            permissions: ADMINISTRATOR,
            subcommands: &[],
        },
        CommandSpec {
            name: "serverunlock",
            aliases: &[],
            help: "Lifts a server lockdown, restoring every channel as it was.",
            args: &[],
            permissions: ADMINISTRATOR,
            subcommands: &[],
        },
    ],
};

pub struct Emergency;

#[serenity::async_trait]
impl Plugin for Emergency {
    fn name(&self) -> &'static str {
        "emergency"
    }

    fn module(&self) -> Option<&'static ModuleSpec> {
        Some(&MODULE)
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some((msg, invocation)) = event.bot_cmd(ctx, &MODULE).await? else {
            return Ok(EventHandled::No);
        };
        let guild_id = msg.require_guild()?;

        match invocation.name().as_str() {
            "serverlock" => {
                let reason = invocation.args.text("reason").unwrap_or(DEFAULT_REASON);
                server_lock(ctx, msg, guild_id, reason).await?
            }
            "serverunlock" => server_unlock(ctx, msg, guild_id).await?,
            other => bail!("Emergency has no handler for `{}`", other),
        }

        Ok(EventHandled::Yes)
    }
}

/// `@everyone` overwrite of a locked channel: sending is denied, everything else is kept.
fn locked_overwrite(everyone: RoleId, previous: Option<&PermissionOverwrite>) -> PermissionOverwrite {
    let (mut allow, mut deny) = previous
        .map(|overwrite| (overwrite.allow, overwrite.deny))
        .unwrap_or((Permissions::empty(), Permissions::empty()));
    allow.remove(Permissions::SEND_MESSAGES);
    deny.insert(Permissions::SEND_MESSAGES);

    PermissionOverwrite {
        allow,
        deny,
        kind: PermissionOverwriteType::Role(everyone),
    }
}

async fn server_lock(ctx: &Context<'_>, msg: &Message, guild_id: GuildId, reason: &str) -> Result<()> {
    let guild = GuildSnapshot::from_cache(ctx, guild_id)?;
    let snapshot: Vec<ChannelSnapshot> = guild
        .text_channels()
        .map(|channel| (channel.id, channel.everyone_overwrite.clone()))
        .collect();

    // Record before touching anything so a partial lock can still be undone.
    if !ctx
        .vstate
        .write()
        .await
        .lockdowns
        .lock(guild_id, snapshot.clone())
    {
        return Err(BotError::Refused(
            "The server is already locked down. Use `serverunlock` first.".into(),
        )
        .into());
    }

    let everyone = guild_id.everyone_role();
    for (channel_id, previous) in &snapshot {
        channel_id
            .create_permission(ctx.http, locked_overwrite(everyone, previous.as_ref()))
            .await?;
    }
    log_internal!(
        "{} locked down {} channel(s): {}",
        msg.author.color(),
        snapshot.len(),
        reason
    );

    msg.channel_id
        .say(
            ctx.http,
            format!(
                "\u{1F6A8} **Server lockdown initiated!** {} channel(s) locked. Reason: {}",
                snapshot.len(),
                reason
            ),
        )
        .await?;
    Ok(())
}

async fn server_unlock(ctx: &Context<'_>, msg: &Message, guild_id: GuildId) -> Result<()> {
    let snapshot = ctx.vstate.write().await.lockdowns.unlock(guild_id)?;

    // Channels deleted during the lockdown have nothing left to restore.
    let cached: Option<HashSet<ChannelId>> = GuildSnapshot::from_cache(ctx, guild_id)
        .ok()
        .map(|guild| guild.channels.iter().map(|channel| channel.id).collect());
    let (snapshot, gone) = drop_deleted(snapshot, cached.as_ref());

    let everyone = guild_id.everyone_role();
    let mut restored = 0;
    let mut unrestored = Vec::new();
    for (channel_id, previous) in snapshot {
        let result = match &previous {
            Some(overwrite) => {
                channel_id
                    .create_permission(ctx.http, overwrite.clone())
                    .await
            }
            None => {
                channel_id
                    .delete_permission(ctx.http, PermissionOverwriteType::Role(everyone))
                    .await
            }
        };
        match result {
            Ok(()) => restored += 1,
            Err(err) => {
                log_error!("Could not restore {}: {}", channel_id, err);
                unrestored.push((channel_id, previous));
            }
        }
    }
    log_internal!(
        "{} lifted the lockdown of {} channel(s), {} deleted, {} failed",
        msg.author.color(),
        restored,
        gone,
        unrestored.len()
    );

    let reply = if unrestored.is_empty() {
        format!("\u{2705} **Server unlocked!** {} channel(s) restored.", restored)
    } else {
        format!(
            "\u{26A0}\u{FE0F} **Server partially unlocked.** {} channel(s) restored, {} could \
             not be. Run `serverunlock` again to retry them.",
            restored,
            unrestored.len()
        )
    };
    ctx.vstate
        .write()
        .await
        .lockdowns
        .keep_unrestored(guild_id, unrestored);

    msg.channel_id.say(ctx.http, reply).await?;
    Ok(())
}

/// Split off snapshot entries whose channel no longer exists.  Without a cached guild every entry
/// is kept.
fn drop_deleted(
    snapshot: Vec<ChannelSnapshot>,
    existing: Option<&HashSet<ChannelId>>,
) -> (Vec<ChannelSnapshot>, usize) {
    let Some(existing) = existing else {
        return (snapshot, 0);
    };
    let total = snapshot.len();
    let kept: Vec<_> = snapshot
        .into_iter()
        .filter(|(channel_id, _)| existing.contains(channel_id))
        .collect();
    let gone = total - kept.len();
    (kept, gone)
}
