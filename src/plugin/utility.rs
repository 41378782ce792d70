use crate::{
    command::{ArgKind, ArgSpec, Args, CommandSpec, ModuleSpec, NO_PERMISSIONS},
    error::BotError,
    event::*,
    helper::*,
    log_internal,
    logging::*,
    plugin::*,
    registry::{afk::DEFAULT_AFK_REASON, VoiceRoleAction, VoiceTransition},
    trigger::DEFAULT_EMBED_COLOR,
};
use anyhow::{bail, Result};
use chrono::Utc;
use serenity::all::{
    CreateEmbed, CreateEmbedFooter, CreateMessage, EditMessage, GuildId, Mentionable, Message,
    Permissions, RoleId, VoiceState,
};
use std::{collections::HashSet, time::Instant};

const ADMINISTRATOR: Permissions = Permissions::ADMINISTRATOR;
const MANAGE_ROLES: Permissions = Permissions::MANAGE_ROLES;

const AFK_REASON: ArgSpec = ArgSpec {
    name: "reason",
    kind: ArgKind::Text,
    required: false,
};
const ROLE: ArgSpec = ArgSpec {
    name: "role",
    kind: ArgKind::Role,
    required: true,
};

pub(super) static MODULE: ModuleSpec = ModuleSpec {
    name: "Utility",
    description: "Everyday helpers: latency, server info, AFK status and the voice role.",
    commands: &[
        CommandSpec {
            name: "ping",
            aliases: &[],
            help: "Checks the bot's latency.",
            args: &[],
            permissions: NO_PERMISSIONS,
            subcommands: &[],
        },
        CommandSpec {
            name: "serverinfo",
            aliases: &[],
            help: "Displays information about the server.",
            args: &[],
            permissions: NO_PERMISSIONS,
            subcommands: &[],
        },
        CommandSpec {
            name: "afk",
            aliases: &[],
            help: "Sets your AFK status.\nYour AFK status is removed when you next send a message.",
            args: &[AFK_REASON],
            permissions: NO_PERMISSIONS,
            subcommands: &[],
        },
        CommandSpec {
            name: "maintenance",
            aliases: &[],
            help: "Toggles bot maintenance mode.\nWhile it is on, only administrators can use commands.",
            args: &[],
            permissions: ADMINISTRATOR,
            subcommands: &[],
        },
        CommandSpec {
            name: "voicerole",
            aliases: &[],
            help: "Manages the role given to members while they are in a voice channel.",
            args: &[],
            permissions: MANAGE_ROLES,
            subcommands: &[
                CommandSpec {
                    name: "setup",
                    aliases: &[],
                    help: "Sets the role to give when a member joins voice.",
                    args: &[ROLE],
                    permissions: NO_PERMISSIONS,
                    subcommands: &[],
                },
                CommandSpec {
                    name: "enable",
                    aliases: &[],
                    help: "Enables the automatic voice role.",
                    args: &[],
                    permissions: NO_PERMISSIONS,
                    subcommands: &[],
                },
                CommandSpec {
                    name: "disable",
                    aliases: &[],
                    help: "Disables the automatic voice role.",
                    args: &[],
                    permissions: NO_PERMISSIONS,
                    subcommands: &[],
                },
            ],
        },
        CommandSpec {
            name: "reload",
            aliases: &[],
            help: "Reloads the configuration file (bot owners only).",
            args: &[],
            permissions: NO_PERMISSIONS,
            subcommands: &[],
        },
    ],
};

pub struct Utility;

#[serenity::async_trait]
impl Plugin for Utility {
    fn name(&self) -> &'static str {
        "utility"
    }

    fn module(&self) -> Option<&'static ModuleSpec> {
        Some(&MODULE)
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        if let Event::VoiceStateUpdate { old, new } = event {
            update_voice_role(ctx, old.as_ref(), new).await?;
            return Ok(EventHandled::No);
        }

        let Some((msg, invocation)) = event.bot_cmd(ctx, &MODULE).await? else {
            return Ok(EventHandled::No);
        };
        let args = &invocation.args;

        match invocation.name().as_str() {
            "ping" => ping(ctx, msg).await?,
            "serverinfo" => server_info(ctx, msg).await?,
            "afk" => afk(ctx, msg, args).await?,
            "maintenance" => maintenance(ctx, msg).await?,
            "voicerole setup" => voice_role_setup(ctx, msg, args).await?,
            "voicerole enable" => voice_role_enable(ctx, msg).await?,
            "voicerole disable" => voice_role_disable(ctx, msg).await?,
            "reload" => reload(ctx, msg).await?,
            other => bail!("Utility has no handler for `{}`", other),
        }

        Ok(EventHandled::Yes)
    }
}

async fn ping(ctx: &Context<'_>, msg: &Message) -> Result<()> {
    let started = Instant::now();
    let mut reply = msg.channel_id.say(ctx.http, "Pong!").await?;
    let latency = started.elapsed().as_millis();

    reply
        .edit(
            ctx.cache_http,
            EditMessage::new().content(format!("Pong! \u{1F3D3} {}ms", latency)),
        )
        .await?;
    Ok(())
}

async fn server_info(ctx: &Context<'_>, msg: &Message) -> Result<()> {
    let guild = GuildSnapshot::from_cache(ctx, msg.require_guild()?)?;

    let mut embed = CreateEmbed::new()
        .title(format!("Server Info for {}", guild.name))
        .color(DEFAULT_EMBED_COLOR)
        .field("Owner", guild.owner_id.mention().to_string(), true)
        .field("Members", guild.member_count.to_string(), true)
        .field("Channels", guild.channels.len().to_string(), true)
        .field("Roles", guild.roles.len().to_string(), true)
        .field("Boosts", guild.boosts.to_string(), true)
        .field(
            "Created On",
            format!("<t:{}:F>", guild.id.created_at().unix_timestamp()),
            false,
        )
        .footer(CreateEmbedFooter::new(format!("ID: {}", guild.id)));
    if let Some(icon_url) = &guild.icon_url {
        embed = embed.thumbnail(icon_url);
    }

    msg.channel_id
        .send_message(ctx.cache_http, CreateMessage::new().embed(embed))
        .await?;
    Ok(())
}

async fn afk(ctx: &Context<'_>, msg: &Message, args: &Args) -> Result<()> {
    let reason = args.text("reason").unwrap_or(DEFAULT_AFK_REASON);
    ctx.vstate
        .write()
        .await
        .afk
        .set(msg.author.id, reason, Utc::now())?;
    log_internal!("{} is AFK: {}", msg.author.color(), reason);

    let name = msg.author.nick_in_guild(ctx, msg.guild_id).await;
    msg.channel_id
        .say(ctx.http, format!("\u{2705} {} is now AFK: {}", name, reason))
        .await?;
    Ok(())
}

async fn maintenance(ctx: &Context<'_>, msg: &Message) -> Result<()> {
    let enabled = {
        let mut vstate = ctx.vstate.write().await;
        vstate.maintenance = !vstate.maintenance;
        vstate.maintenance
    };
    let status = if enabled { "enabled" } else { "disabled" };
    log_internal!("Maintenance mode {} by {}", status, msg.author.color());

    msg.channel_id
        .say(
            ctx.http,
            format!("\u{2699}\u{FE0F} Bot maintenance mode has been **{}**.", status),
        )
        .await?;
    Ok(())
}

async fn voice_role_setup(ctx: &Context<'_>, msg: &Message, args: &Args) -> Result<()> {
    let guild_id = msg.require_guild()?;
    let guild = GuildSnapshot::from_cache(ctx, guild_id)?;
    let role_id = guild.resolve_role(args.role("role")?)?;

    let bot_id = ctx.cache.current_user().id;
    let bot_roles = member_roles(ctx, guild_id, bot_id).await?;
    guild.check_bot_can_assign(role_id, &bot_roles)?;

    ctx.vstate.write().await.voice_roles.setup(guild_id, role_id);
    log_internal!("Voice role is now {}", role_id.color());

    let prefix = ctx.cfg.read().await.general.display_prefix().to_owned();
    msg.channel_id
        .say(
            ctx.http,
            format!(
                "\u{2705} Voice role set to `{}`. Use `{}voicerole enable` to activate it.",
                guild.role_name(role_id),
                prefix
            ),
        )
        .await?;
    Ok(())
}

async fn voice_role_enable(ctx: &Context<'_>, msg: &Message) -> Result<()> {
    let guild_id = msg.require_guild()?;
    let role_id = ctx.vstate.write().await.voice_roles.enable(guild_id)?;
    log_internal!("Voice role {} enabled", role_id.color());

    msg.channel_id
        .say(ctx.http, "\u{2705} Automatic voice role feature enabled.")
        .await?;
    Ok(())
}

async fn voice_role_disable(ctx: &Context<'_>, msg: &Message) -> Result<()> {
    let guild_id = msg.require_guild()?;
    ctx.vstate.write().await.voice_roles.disable(guild_id)?;
    log_internal!("Voice role disabled");

    msg.channel_id
        .say(ctx.http, "\u{2705} Automatic voice role feature disabled.")
        .await?;
    Ok(())
}

async fn reload(ctx: &Context<'_>, msg: &Message) -> Result<()> {
    if !msg.is_from_owner(ctx).await {
        return Err(
            BotError::Refused("Only bot owners can reload the configuration.".into()).into(),
        );
    }

    ctx.cfg.write().await.reload().await?;
    log_internal!("Configuration reloaded by {}", msg.author.color());
    msg.reply(ctx.cache_http, "Configuration reloaded successfully")
        .await?;
    Ok(())
}

/// Give members the voice role while they are connected, and take it away when they leave.
async fn update_voice_role(
    ctx: &Context<'_>,
    old: Option<&VoiceState>,
    new: &VoiceState,
) -> Result<()> {
    let Some(guild_id) = new.guild_id else {
        return Ok(());
    };
    let transition = VoiceTransition::between(old.and_then(|old| old.channel_id), new.channel_id);
    if transition == VoiceTransition::Other {
        return Ok(());
    }
    let Some(guild_roles) = cached_role_ids(ctx, guild_id) else {
        return Ok(());
    };

    let member_roles = match &new.member {
        Some(member) => member.roles.clone(),
        None => {
            let member = guild_id.member(ctx.cache_http, new.user_id).await?;
            if member.user.bot {
                return Ok(());
            }
            member.roles
        }
    };

    let action = ctx.vstate.write().await.voice_roles.plan(
        guild_id,
        transition,
        |role_id| guild_roles.contains(&role_id),
        |role_id| member_roles.contains(&role_id),
    );

    match action {
        VoiceRoleAction::Add(role_id) => {
            ctx.http
                .add_member_role(guild_id, new.user_id, role_id, Some("Joined a voice channel"))
                .await?;
            log_internal!(
                "Gave voice role {} to {}",
                role_id.color(),
                new.user_id.color(ctx.http).await
            );
        }
        VoiceRoleAction::Remove(role_id) => {
            ctx.http
                .remove_member_role(guild_id, new.user_id, role_id, Some("Left voice channels"))
                .await?;
            log_internal!(
                "Took voice role {} from {}",
                role_id.color(),
                new.user_id.color(ctx.http).await
            );
        }
        VoiceRoleAction::Disabled(role_id) => {
            log_internal!(
                "Voice role {} no longer exists, disabled the feature",
                role_id.color()
            );
        }
        VoiceRoleAction::Nothing => {}
    }

    Ok(())
}

fn cached_role_ids(ctx: &Context<'_>, guild_id: GuildId) -> Option<HashSet<RoleId>> {
    ctx.cache
        .guild(guild_id)
        .map(|guild| guild.roles.keys().copied().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::resolve;

    #[test]
    fn voicerole_setup_takes_a_role_name() {
        let (path, rest) = resolve(&MODULE, "voicerole setup In Voice").unwrap().unwrap();
        let args = Args::parse(&path, &rest).unwrap();
        assert_eq!(
            args.role("role"),
            Ok(&crate::command::RoleRef::Name("In Voice".to_owned()))
        );
    }

    #[test]
    fn afk_reason_is_optional() {
        let (path, rest) = resolve(&MODULE, "afk").unwrap().unwrap();
        let args = Args::parse(&path, &rest).unwrap();
        assert_eq!(args.text("reason"), None);
    }

    #[test]
    fn maintenance_needs_administrator() {
        let (path, _) = resolve(&MODULE, "maintenance").unwrap().unwrap();
        assert_eq!(
            crate::command::required_permissions(&path),
            Permissions::ADMINISTRATOR
        );
    }
}
