use crate::{
    command::{ArgKind, ArgSpec, Args, CommandSpec, ModuleSpec, NO_PERMISSIONS},
    duration::format_elapsed,
    error::BotError,
    event::*,
    helper::*,
    log_error, log_internal,
    logging::*,
    plugin::*,
    registry::MemberKey,
    schedule::ScheduledTask,
    volatile_state::SharedVolatileState,
};
use anyhow::{bail, Result};
use serenity::all::{
    ChannelId, CreateEmbed, CreateMessage, EditRole, GuildId, Http, Mentionable, Message,
    PermissionOverwrite, PermissionOverwriteType, Permissions, RoleId, UserId,
};
use std::sync::Arc;

const DEFAULT_REASON: &str = "No reason provided.";

const KICK_MEMBERS: Permissions = Permissions::KICK_MEMBERS;
const BAN_MEMBERS: Permissions = Permissions::BAN_MEMBERS;
const MANAGE_MESSAGES: Permissions = Permissions::MANAGE_MESSAGES;
const MANAGE_ROLES: Permissions = Permissions::MANAGE_ROLES;
const MANAGE_CHANNELS: Permissions = Permissions::MANAGE_CHANNELS;

const MEMBER: ArgSpec = ArgSpec {
    name: "member",
    kind: ArgKind::Member,
    required: true,
};
const REASON: ArgSpec = ArgSpec {
    name: "reason",
    kind: ArgKind::Text,
    required: false,
};
const OPTIONAL_DURATION: ArgSpec = ArgSpec {
    name: "duration",
    kind: ArgKind::Duration,
    required: false,
};
const DURATION: ArgSpec = ArgSpec {
    name: "duration",
    kind: ArgKind::Duration,
    required: true,
};
const TRIAL_ACTION: ArgSpec = ArgSpec {
    name: "action",
    kind: ArgKind::Choice(&["add", "remove"]),
    required: true,
};
const NOTE: ArgSpec = ArgSpec {
    name: "note",
    kind: ArgKind::Text,
    required: false,
};
const CHANNEL: ArgSpec = ArgSpec {
    name: "channel",
    kind: ArgKind::Channel,
    required: true,
};
const TOGGLE: ArgSpec = ArgSpec {
    name: "action",
    kind: ArgKind::Choice(&["enable", "disable"]),
    required: true,
};
const ROLE_ACTION: ArgSpec = ArgSpec {
    name: "action",
    kind: ArgKind::Choice(&["give", "remove"]),
    required: true,
};
const ROLE: ArgSpec = ArgSpec {
    name: "role",
    kind: ArgKind::Role,
    required: true,
};
const TRIGGER_WORD: ArgSpec = ArgSpec {
    name: "trigger_word",
    kind: ArgKind::Word,
    required: true,
};

static MODULE: ModuleSpec = ModuleSpec {
    name: "Moderation",
    description: "Keep the server in order: kicks, bans, mutes, trial roles and automatic roles.",
    commands: &[
        CommandSpec {
            name: "kick",
            aliases: &[],
            help: "Kicks a member from the server.",
            args: &[MEMBER, REASON],
            permissions: KICK_MEMBERS,
            subcommands: &[],
        },
        CommandSpec {
            name: "ban",
            aliases: &[],
            help: "Bans a member from the server.",
            args: &[MEMBER, REASON],
            permissions: BAN_MEMBERS,
            subcommands: &[],
        },
        CommandSpec {
            name: "warn",
            aliases: &[],
            help: "Issues a warning to a member.",
            args: &[MEMBER, REASON],
            permissions: MANAGE_MESSAGES,
            subcommands: &[],
        },
        CommandSpec {
            name: "mute",
            aliases: &[],
            help: "Mutes a member, optionally for a limited time.\nDurations look like `30s`, `10m`, `2h` or `1d`.",
            args: &[MEMBER, OPTIONAL_DURATION, REASON],
            permissions: MANAGE_ROLES,
            subcommands: &[],
        },
        CommandSpec {
            name: "unmute",
            aliases: &[],
            help: "Unmutes a member.",
            args: &[MEMBER, REASON],
            permissions: MANAGE_ROLES,
            subcommands: &[],
        },
        CommandSpec {
            name: "tempban",
            aliases: &[],
            help: "Bans a member and lifts the ban once the duration has passed.",
            args: &[MEMBER, DURATION, REASON],
            permissions: BAN_MEMBERS,
            subcommands: &[],
        },
        CommandSpec {
            name: "trial",
            aliases: &[],
            help: "Adds or removes the trial member role.\nA note given when adding is sent to the member.",
            args: &[TRIAL_ACTION, MEMBER, NOTE],
            permissions: MANAGE_ROLES,
            subcommands: &[],
        },
        CommandSpec {
            name: "manageperms",
            aliases: &[],
            help: "Allows or denies a member sending messages in a channel.",
            args: &[MEMBER, CHANNEL, TOGGLE],
            permissions: MANAGE_CHANNELS,
            subcommands: &[],
        },
        CommandSpec {
            name: "manageroles",
            aliases: &[],
            help: "Gives a role to a member or removes it.",
            args: &[ROLE_ACTION, MEMBER, ROLE],
            permissions: MANAGE_ROLES,
            subcommands: &[],
        },
        CommandSpec {
            name: "autorole",
            aliases: &[],
            help: "Manages automatic role assignments.",
            args: &[],
            permissions: MANAGE_ROLES,
            subcommands: &[CommandSpec {
                name: "reply",
                aliases: &[],
                help: "Roles granted to a message's author when someone replies to it with a trigger word.",
                args: &[],
                permissions: NO_PERMISSIONS,
                subcommands: &[
                    CommandSpec {
                        name: "create",
                        aliases: &[],
                        help: "Creates a new reply-triggered autorole.",
                        args: &[TRIGGER_WORD, ROLE],
                        permissions: NO_PERMISSIONS,
                        subcommands: &[],
                    },
                    CommandSpec {
                        name: "edit",
                        aliases: &[],
                        help: "Changes the role a trigger word grants.",
                        args: &[TRIGGER_WORD, ROLE],
                        permissions: NO_PERMISSIONS,
                        subcommands: &[],
                    },
                    CommandSpec {
                        name: "delete",
                        aliases: &[],
                        help: "Deletes a reply-triggered autorole.",
                        args: &[TRIGGER_WORD],
                        permissions: NO_PERMISSIONS,
                        subcommands: &[],
                    },
                    CommandSpec {
                        name: "list",
                        aliases: &[],
                        help: "Lists all reply-triggered autoroles.",
                        args: &[],
                        permissions: NO_PERMISSIONS,
                        subcommands: &[],
                    },
                    CommandSpec {
                        name: "test",
                        aliases: &[],
                        help: "Shows which role a trigger word grants.",
                        args: &[TRIGGER_WORD],
                        permissions: NO_PERMISSIONS,
                        subcommands: &[],
                    },
                ],
            }],
        },
    ],
};

pub struct Moderation;

#[serenity::async_trait]
impl Plugin for Moderation {
    fn name(&self) -> &'static str {
        "moderation"
    }

    fn module(&self) -> Option<&'static ModuleSpec> {
        Some(&MODULE)
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some((msg, invocation)) = event.bot_cmd(ctx, &MODULE).await? else {
            return Ok(EventHandled::No);
        };
        let guild_id = msg.require_guild()?;
        let args = &invocation.args;

        match invocation.name().as_str() {
            "kick" => kick(ctx, msg, guild_id, args).await?,
            "ban" => ban(ctx, msg, guild_id, args).await?,
            "warn" => warn(ctx, msg, guild_id, args).await?,
            "mute" => mute(ctx, msg, guild_id, args).await?,
            "unmute" => unmute(ctx, msg, guild_id, args).await?,
            "tempban" => tempban(ctx, msg, guild_id, args).await?,
            "trial" => trial(ctx, msg, guild_id, args).await?,
            "manageperms" => manage_perms(ctx, msg, guild_id, args).await?,
            "manageroles" => manage_roles(ctx, msg, guild_id, args).await?,
            "autorole reply create" => reply_create(ctx, msg, guild_id, args).await?,
            "autorole reply edit" => reply_edit(ctx, msg, guild_id, args).await?,
            "autorole reply delete" => reply_delete(ctx, msg, guild_id, args).await?,
            "autorole reply list" => reply_list(ctx, msg, guild_id).await?,
            "autorole reply test" => reply_test(ctx, msg, guild_id, args).await?,
            other => bail!("Moderation has no handler for `{}`", other),
        }

        Ok(EventHandled::Yes)
    }
}

/// The member a command acts on.
struct Target {
    guild: GuildSnapshot,
    user_id: UserId,
    roles: Vec<RoleId>,
    name: String,
}

impl Target {
    async fn lookup(ctx: &Context<'_>, guild_id: GuildId, args: &Args) -> Result<Self> {
        let user_id = args.member("member")?;
        let guild = GuildSnapshot::from_cache(ctx, guild_id)?;
        let roles = match guild_id.member(ctx.cache_http, user_id).await {
            Ok(member) => member.roles,
            Err(_) => return Err(BotError::NotFound(format!("Member {}", user_id.mention())).into()),
        };
        let name = user_id.nick_in_guild(ctx, Some(guild_id)).await;

        Ok(Self {
            guild,
            user_id,
            roles,
            name,
        })
    }

    /// Look up the target and refuse if the author may not `action` them.
    async fn checked(
        ctx: &Context<'_>,
        msg: &Message,
        guild_id: GuildId,
        args: &Args,
        action: &str,
    ) -> Result<Self> {
        let target = Self::lookup(ctx, guild_id, args).await?;
        let author_roles = member_roles(ctx, guild_id, msg.author.id).await?;
        let bot_id = ctx.cache.current_user().id;
        target.guild.check_target(
            action,
            (msg.author.id, &author_roles),
            (target.user_id, &target.roles),
            bot_id,
        )?;
        Ok(target)
    }

    fn key(&self) -> MemberKey {
        (self.guild.id, self.user_id)
    }
}

fn reason(args: &Args) -> &str {
    args.text("reason").unwrap_or(DEFAULT_REASON)
}

async fn bot_roles(ctx: &Context<'_>, guild_id: GuildId) -> Result<Vec<RoleId>> {
    let bot_id = ctx.cache.current_user().id;
    member_roles(ctx, guild_id, bot_id).await
}

async fn kick(ctx: &Context<'_>, msg: &Message, guild_id: GuildId, args: &Args) -> Result<()> {
    let target = Target::checked(ctx, msg, guild_id, args, "kick").await?;
    let reason = reason(args);

    guild_id
        .kick_with_reason(ctx.http, target.user_id, reason)
        .await?;
    log_internal!("{} kicked {}: {}", msg.author.color(), target.name, reason);

    msg.channel_id
        .say(
            ctx.http,
            format!("\u{2705} Kicked {} for: {}", target.name, reason),
        )
        .await?;
    Ok(())
}

async fn ban(ctx: &Context<'_>, msg: &Message, guild_id: GuildId, args: &Args) -> Result<()> {
    let target = Target::checked(ctx, msg, guild_id, args, "ban").await?;
    let reason = reason(args);

    guild_id
        .ban_with_reason(ctx.http, target.user_id, 0, reason)
        .await?;
    log_internal!("{} banned {}: {}", msg.author.color(), target.name, reason);

    msg.channel_id
        .say(
            ctx.http,
            format!("\u{2705} Banned {} for: {}", target.name, reason),
        )
        .await?;
    Ok(())
}

async fn warn(ctx: &Context<'_>, msg: &Message, guild_id: GuildId, args: &Args) -> Result<()> {
    let target = Target::checked(ctx, msg, guild_id, args, "warn").await?;
    let reason = reason(args);

    log_internal!("{} warned {}: {}", msg.author.color(), target.name, reason);
    msg.channel_id
        .say(
            ctx.http,
            format!("\u{26A0}\u{FE0F} Warned {} for: {}", target.name, reason),
        )
        .await?;
    Ok(())
}

/// Find the role called `name`, creating it if the guild has none.
///
/// A freshly created muted role is denied speech in every channel.
async fn ensure_role(
    ctx: &Context<'_>,
    msg: &Message,
    guild: &GuildSnapshot,
    name: &str,
    deny_speech: bool,
) -> Result<RoleId> {
    if let Some(role_id) = guild.role_by_name(name) {
        return Ok(role_id);
    }

    let role = guild
        .id
        .create_role(
            ctx.cache_http,
            EditRole::new()
                .name(name)
                .audit_log_reason("Role for moderation"),
        )
        .await?;
    log_internal!("Created role {}", role.color());

    if deny_speech {
        for channel in &guild.channels {
            channel
                .id
                .create_permission(
                    ctx.http,
                    PermissionOverwrite {
                        allow: Permissions::empty(),
                        deny: Permissions::SEND_MESSAGES | Permissions::SPEAK,
                        kind: PermissionOverwriteType::Role(role.id),
                    },
                )
                .await?;
        }
        msg.channel_id
            .say(
                ctx.http,
                format!("Created '{}' role and set channel permissions.", name),
            )
            .await?;
    } else {
        msg.channel_id
            .say(ctx.http, format!("Created '{}' role.", name))
            .await?;
    }

    Ok(role.id)
}

async fn mute(ctx: &Context<'_>, msg: &Message, guild_id: GuildId, args: &Args) -> Result<()> {
    let target = Target::checked(ctx, msg, guild_id, args, "mute").await?;
    let reason = reason(args);
    let duration = args.duration("duration");

    let role_name = ctx.cfg.read().await.moderation.muted_role_name.clone();
    let muted_role = ensure_role(ctx, msg, &target.guild, &role_name, true).await?;

    ctx.http
        .add_member_role(guild_id, target.user_id, muted_role, Some(reason))
        .await?;
    let key = target.key();
    let ticket = ctx.vstate.write().await.mutes.mute(key);
    log_internal!("{} muted {}: {}", msg.author.color(), target.name, reason);

    let mut response = format!("\u{2705} Muted {} for: {}", target.name, reason);
    if let Some(duration) = duration {
        response.push_str(&format!(" (for {})", format_elapsed(duration)));

        let expiry = ScheduledTask::spawn(
            duration,
            expire_mute(
                Arc::clone(ctx.vstate),
                Arc::clone(ctx.http),
                key,
                ticket,
                muted_role,
                msg.channel_id,
                target.name.clone(),
            ),
        );
        ctx.vstate
            .write()
            .await
            .mutes
            .attach_expiry(key, ticket, expiry);
    }

    msg.channel_id.say(ctx.http, response).await?;
    Ok(())
}

/// Lift a timed mute, unless it was lifted or replaced in the meantime.
async fn expire_mute(
    vstate: SharedVolatileState,
    http: Arc<Http>,
    key: MemberKey,
    ticket: u64,
    muted_role: RoleId,
    channel_id: ChannelId,
    name: String,
) {
    if !vstate.write().await.mutes.expire(key, ticket) {
        return;
    }

    let (guild_id, user_id) = key;
    if let Err(err) = http
        .remove_member_role(guild_id, user_id, muted_role, Some("Temporary mute expired."))
        .await
    {
        log_error!("Could not lift timed mute of {}: {}", name, err);
        return;
    }
    log_internal!("Timed mute of {} expired", name);

    let notice = format!("\u{2705} Unmuted {} (temporary mute expired).", name);
    if let Err(err) = channel_id.say(&http, notice).await {
        log_error!("Could not announce mute expiry: {}", err);
    }
}

async fn unmute(ctx: &Context<'_>, msg: &Message, guild_id: GuildId, args: &Args) -> Result<()> {
    let target = Target::checked(ctx, msg, guild_id, args, "unmute").await?;
    let reason = reason(args);

    let role_name = ctx.cfg.read().await.moderation.muted_role_name.clone();
    let muted_role = target
        .guild
        .role_by_name(&role_name)
        .filter(|role_id| target.roles.contains(role_id))
        .ok_or_else(|| BotError::NotFound(format!("Active mute for {}", target.name)))?;

    ctx.http
        .remove_member_role(guild_id, target.user_id, muted_role, Some(reason))
        .await?;
    ctx.vstate.write().await.mutes.unmute(target.key());
    log_internal!("{} unmuted {}: {}", msg.author.color(), target.name, reason);

    msg.channel_id
        .say(
            ctx.http,
            format!("\u{2705} Unmuted {} for: {}", target.name, reason),
        )
        .await?;
    Ok(())
}

async fn tempban(ctx: &Context<'_>, msg: &Message, guild_id: GuildId, args: &Args) -> Result<()> {
    let target = Target::checked(ctx, msg, guild_id, args, "tempban").await?;
    let reason = reason(args);
    let duration = args
        .duration("duration")
        .ok_or_else(|| BotError::InvalidDuration(String::new()))?;

    guild_id
        .ban_with_reason(ctx.http, target.user_id, 0, reason)
        .await?;
    log_internal!(
        "{} banned {} for {}: {}",
        msg.author.color(),
        target.name,
        format_elapsed(duration),
        reason
    );

    msg.channel_id
        .say(
            ctx.http,
            format!(
                "\u{2705} Temporarily banned {} for {} for: {}",
                target.name,
                format_elapsed(duration),
                reason
            ),
        )
        .await?;

    // Tempbans are not tracked; the unban always runs.
    let http = Arc::clone(ctx.http);
    let channel_id = msg.channel_id;
    let (user_id, name) = (target.user_id, target.name);
    ScheduledTask::spawn(duration, async move {
        if let Err(err) = guild_id.unban(&http, user_id).await {
            log_error!("Could not lift temporary ban of {}: {}", name, err);
            return;
        }
        log_internal!("Temporary ban of {} expired", name);

        let notice = format!("\u{2705} Unbanned {} (temporary ban expired).", name);
        if let Err(err) = channel_id.say(&http, notice).await {
            log_error!("Could not announce ban expiry: {}", err);
        }
    });

    Ok(())
}

async fn trial(ctx: &Context<'_>, msg: &Message, guild_id: GuildId, args: &Args) -> Result<()> {
    let target = Target::checked(ctx, msg, guild_id, args, "change the trial role of").await?;
    let note = args.text("note");
    let role_name = ctx.cfg.read().await.moderation.trial_role_name.clone();
    let trial_role = ensure_role(ctx, msg, &target.guild, &role_name, false).await?;
    let has_role = target.roles.contains(&trial_role);

    match args.word("action")? {
        "add" => {
            if has_role {
                return Err(BotError::Refused(format!(
                    "{} already has the '{}' role.",
                    target.name, role_name
                ))
                .into());
            }
            let audit_reason = format!(
                "Trial role added by {}. Note: {}",
                msg.author.name,
                note.unwrap_or("None")
            );
            ctx.http
                .add_member_role(guild_id, target.user_id, trial_role, Some(&audit_reason))
                .await?;
            msg.channel_id
                .say(
                    ctx.http,
                    format!(
                        "\u{2705} Added '{}' role to {}. Note: {}",
                        role_name,
                        target.name,
                        note.unwrap_or("None")
                    ),
                )
                .await?;

            if let Some(note) = note {
                let dm = CreateMessage::new().content(format!(
                    "You have been given the '{}' role in {}. Note from staff: {}",
                    role_name, target.guild.name, note
                ));
                if target.user_id.direct_message(ctx.cache_http, dm).await.is_err() {
                    msg.channel_id
                        .say(
                            ctx.http,
                            format!(
                                "\u{26A0}\u{FE0F} Could not DM {} about the trial role.",
                                target.name
                            ),
                        )
                        .await?;
                }
            }
        }
        _ => {
            if !has_role {
                return Err(BotError::Refused(format!(
                    "{} does not have the '{}' role.",
                    target.name, role_name
                ))
                .into());
            }
            let audit_reason = format!(
                "Trial role removed by {}. Note: {}",
                msg.author.name,
                note.unwrap_or("None")
            );
            ctx.http
                .remove_member_role(guild_id, target.user_id, trial_role, Some(&audit_reason))
                .await?;
            msg.channel_id
                .say(
                    ctx.http,
                    format!(
                        "\u{2705} Removed '{}' role from {}. Note: {}",
                        role_name,
                        target.name,
                        note.unwrap_or("None")
                    ),
                )
                .await?;
        }
    }

    log_internal!("{} changed trial role of {}", msg.author.color(), target.name);
    Ok(())
}

/// Allow and deny bits of a member overwrite after toggling their right to send messages.  Other
/// bits are left alone.
fn toggle_send_messages(
    existing: Option<&PermissionOverwrite>,
    enable: bool,
) -> (Permissions, Permissions) {
    let (mut allow, mut deny) = existing
        .map(|overwrite| (overwrite.allow, overwrite.deny))
        .unwrap_or((Permissions::empty(), Permissions::empty()));

    if enable {
        allow.insert(Permissions::SEND_MESSAGES);
        deny.remove(Permissions::SEND_MESSAGES);
    } else {
        deny.insert(Permissions::SEND_MESSAGES);
        allow.remove(Permissions::SEND_MESSAGES);
    }

    (allow, deny)
}

async fn manage_perms(
    ctx: &Context<'_>,
    msg: &Message,
    guild_id: GuildId,
    args: &Args,
) -> Result<()> {
    let target = Target::checked(ctx, msg, guild_id, args, "change channel permissions for").await?;
    let channel_id = args.channel("channel")?;
    let enable = args.word("action")? == "enable";

    let channel = channel_id
        .to_channel(ctx.cache_http)
        .await?
        .guild()
        .filter(|channel| channel.guild_id == guild_id)
        .ok_or_else(|| BotError::NotFound(format!("Channel {}", channel_id.mention())))?;
    let existing = channel.permission_overwrites.iter().find(|overwrite| {
        matches!(overwrite.kind, PermissionOverwriteType::Member(id) if id == target.user_id)
    });

    let (allow, deny) = toggle_send_messages(existing, enable);
    channel_id
        .create_permission(
            ctx.http,
            PermissionOverwrite {
                allow,
                deny,
                kind: PermissionOverwriteType::Member(target.user_id),
            },
        )
        .await?;
    log_internal!(
        "{} set send messages of {} in {} to {}",
        msg.author.color(),
        target.name,
        channel_id.color(ctx.http).await,
        enable
    );

    let verb = if enable { "Enabled" } else { "Disabled" };
    msg.channel_id
        .say(
            ctx.http,
            format!(
                "\u{2705} {} send messages for {} in {}.",
                verb,
                target.name,
                channel_id.mention()
            ),
        )
        .await?;
    Ok(())
}

async fn manage_roles(
    ctx: &Context<'_>,
    msg: &Message,
    guild_id: GuildId,
    args: &Args,
) -> Result<()> {
    let target = Target::checked(ctx, msg, guild_id, args, "manage the roles of").await?;
    let role_id = target.guild.resolve_role(args.role("role")?)?;
    let role_name = target.guild.role_name(role_id);

    let author_roles = member_roles(ctx, guild_id, msg.author.id).await?;
    let bot_roles = bot_roles(ctx, guild_id).await?;
    target
        .guild
        .check_manageable(role_id, (msg.author.id, &author_roles), &bot_roles)?;

    let has_role = target.roles.contains(&role_id);
    let audit_reason = format!("Role managed by {}", msg.author.name);
    let response = match args.word("action")? {
        "give" => {
            if has_role {
                return Err(BotError::Refused(format!(
                    "{} already has the role {}.",
                    target.name, role_name
                ))
                .into());
            }
            ctx.http
                .add_member_role(guild_id, target.user_id, role_id, Some(&audit_reason))
                .await?;
            format!("\u{2705} Gave role `{}` to {}.", role_name, target.name)
        }
        _ => {
            if !has_role {
                return Err(BotError::Refused(format!(
                    "{} does not have the role {}.",
                    target.name, role_name
                ))
                .into());
            }
            ctx.http
                .remove_member_role(guild_id, target.user_id, role_id, Some(&audit_reason))
                .await?;
            format!("\u{2705} Removed role `{}` from {}.", role_name, target.name)
        }
    };

    log_internal!("{} managed roles: {}", msg.author.color(), response);
    msg.channel_id.say(ctx.http, response).await?;
    Ok(())
}

async fn reply_create(
    ctx: &Context<'_>,
    msg: &Message,
    guild_id: GuildId,
    args: &Args,
) -> Result<()> {
    let word = args.word("trigger_word")?;
    let guild = GuildSnapshot::from_cache(ctx, guild_id)?;
    let role_id = guild.resolve_role(args.role("role")?)?;

    if ctx
        .vstate
        .read()
        .await
        .reply_autoroles
        .lookup(guild_id, word)
        .is_some()
    {
        return Err(BotError::DuplicateTrigger(word.to_lowercase()).into());
    }
    guild.check_bot_can_assign(role_id, &bot_roles(ctx, guild_id).await?)?;

    let word = ctx
        .vstate
        .write()
        .await
        .reply_autoroles
        .create(guild_id, word, role_id)?;
    log_internal!("Reply autorole `{}` grants {}", word, role_id.color());

    msg.channel_id
        .say(
            ctx.http,
            format!(
                "\u{2705} Reply autorole created: Replying with `{}` will give the `{}` role.",
                word,
                guild.role_name(role_id)
            ),
        )
        .await?;
    Ok(())
}

async fn reply_edit(
    ctx: &Context<'_>,
    msg: &Message,
    guild_id: GuildId,
    args: &Args,
) -> Result<()> {
    let word = args.word("trigger_word")?.to_lowercase();
    let guild = GuildSnapshot::from_cache(ctx, guild_id)?;
    let role_id = guild.resolve_role(args.role("role")?)?;

    if ctx
        .vstate
        .read()
        .await
        .reply_autoroles
        .lookup(guild_id, &word)
        .is_none()
    {
        return Err(BotError::NotFound(format!("Reply autorole for `{}`", word)).into());
    }
    guild.check_bot_can_assign(role_id, &bot_roles(ctx, guild_id).await?)?;

    let old_role = ctx
        .vstate
        .write()
        .await
        .reply_autoroles
        .edit(guild_id, &word, role_id)?;
    log_internal!("Reply autorole `{}` now grants {}", word, role_id.color());

    msg.channel_id
        .say(
            ctx.http,
            format!(
                "\u{2705} Reply autorole for `{}` updated from `{}` to `{}`.",
                word,
                guild.role_name(old_role),
                guild.role_name(role_id)
            ),
        )
        .await?;
    Ok(())
}

async fn reply_delete(
    ctx: &Context<'_>,
    msg: &Message,
    guild_id: GuildId,
    args: &Args,
) -> Result<()> {
    let word = args.word("trigger_word")?.to_lowercase();
    ctx.vstate
        .write()
        .await
        .reply_autoroles
        .delete(guild_id, &word)?;
    log_internal!("Reply autorole `{}` deleted", word);

    msg.channel_id
        .say(
            ctx.http,
            format!("\u{2705} Reply autorole for `{}` deleted.", word),
        )
        .await?;
    Ok(())
}

async fn reply_list(ctx: &Context<'_>, msg: &Message, guild_id: GuildId) -> Result<()> {
    let entries: Vec<(String, RoleId)> = ctx
        .vstate
        .read()
        .await
        .reply_autoroles
        .list(guild_id)
        .map(|(word, role_id)| (word.to_owned(), role_id))
        .collect();

    if entries.is_empty() {
        msg.channel_id
            .say(
                ctx.http,
                "No reply-triggered autoroles configured for this server.",
            )
            .await?;
        return Ok(());
    }

    let guild = GuildSnapshot::from_cache(ctx, guild_id)?;
    let fields = entries.iter().map(|(word, role_id)| {
        (
            format!("Trigger: `{}`", word),
            format!("Role: `{}`", guild.role_name(*role_id)),
            false,
        )
    });
    let embed = CreateEmbed::new()
        .title("Reply-Triggered Autoroles")
        .description("Here are the configured reply autoroles:")
        .color(crate::trigger::DEFAULT_EMBED_COLOR)
        .fields(fields);

    msg.channel_id
        .send_message(ctx.cache_http, CreateMessage::new().embed(embed))
        .await?;
    Ok(())
}

async fn reply_test(
    ctx: &Context<'_>,
    msg: &Message,
    guild_id: GuildId,
    args: &Args,
) -> Result<()> {
    let word = args.word("trigger_word")?.to_lowercase();
    let role_id = ctx
        .vstate
        .read()
        .await
        .reply_autoroles
        .lookup(guild_id, &word)
        .ok_or_else(|| BotError::NotFound(format!("Reply autorole for `{}`", word)))?;
    let guild = GuildSnapshot::from_cache(ctx, guild_id)?;

    msg.channel_id
        .say(
            ctx.http,
            format!(
                "\u{2705} Trigger `{}` is configured to give the `{}` role.",
                word,
                guild.role_name(role_id)
            ),
        )
        .await?;
    Ok(())
}
