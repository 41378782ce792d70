use crate::{event::*, helper::*, log_error, log_internal, logging::*, plugin::*};
use anyhow::Result;
use serenity::all::{GuildId, Mentionable, Message, RoleId, User};

/// Grants a role to the author of a message when a member replies to it with a configured word.
/// Never claims the message; failures are logged so later plugins still see it.
pub struct ReplyAutoroleListener;

#[serenity::async_trait]
impl Plugin for ReplyAutoroleListener {
    fn name(&self) -> &'static str {
        "reply_autorole"
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Event::Message(msg) = event else {
            return Ok(EventHandled::No);
        };
        let Some(guild_id) = msg.guild_id else {
            return Ok(EventHandled::No);
        };
        if msg.message_reference.is_none() || event.prefixed(ctx).await.is_some() {
            return Ok(EventHandled::No);
        }

        let Some(role_id) = ctx
            .vstate
            .read()
            .await
            .reply_autoroles
            .lookup(guild_id, msg.content.trim())
        else {
            return Ok(EventHandled::No);
        };

        if let Err(err) = grant(ctx, msg, guild_id, role_id).await {
            log_error!(
                "Reply autorole {} for {} failed: {:#}",
                role_id.color(),
                msg.author.color(),
                err
            );
        }
        Ok(EventHandled::No)
    }
}

async fn grant(ctx: &Context<'_>, msg: &Message, guild_id: GuildId, role_id: RoleId) -> Result<()> {
    let Some(target) = replied_author(ctx, msg).await else {
        return Ok(());
    };
    if target.bot {
        return Ok(());
    }

    let guild = GuildSnapshot::from_cache(ctx, guild_id)?;
    if !guild.roles.contains_key(&role_id) {
        return Ok(());
    }
    if member_roles(ctx, guild_id, target.id).await?.contains(&role_id) {
        return Ok(());
    }

    let bot_id = ctx.cache.current_user().id;
    let bot_roles = member_roles(ctx, guild_id, bot_id).await?;
    if let Err(refusal) = guild.check_bot_can_assign(role_id, &bot_roles) {
        msg.channel_id.say(ctx.http, refusal.user_message()).await?;
        return Ok(());
    }

    let role_name = guild.role_name(role_id);
    let audit_reason = format!("Reply autorole triggered by {}", msg.author.name);
    ctx.http
        .add_member_role(guild_id, target.id, role_id, Some(&audit_reason))
        .await?;
    log_internal!(
        "Gave {} to {} for a reply by {}",
        role_id.color(),
        target.color(),
        msg.author.color(),
    );

    msg.channel_id
        .say(
            ctx.http,
            format!(
                "\u{2705} {} has been given the `{}` role by {}'s reply!",
                target.mention(),
                role_name,
                msg.author.mention(),
            ),
        )
        .await?;

    Ok(())
}

/// Author of the message being replied to.  Discord usually embeds it; otherwise fetch it.  A
/// reply to a message that is gone simply grants nothing.
async fn replied_author(ctx: &Context<'_>, msg: &Message) -> Option<User> {
    if let Some(replied) = msg.referenced_message.as_deref() {
        return Some(replied.author.clone());
    }
    let message_id = msg.message_reference.as_ref()?.message_id?;
    match msg.channel_id.message(ctx.cache_http, message_id).await {
        Ok(replied) => Some(replied.author),
        Err(err) => {
            log_internal!("Replied-to message {} is unavailable: {}", message_id, err);
            None
        }
    }
}
