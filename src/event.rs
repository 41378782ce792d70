//! The Serenity crate we're using for the Discord API is designed around callbacks to handle
//! events.  However, this does not mesh well with our plugin framework here.  To resolve this,
//! the handler translates the callbacks into a distinct Event enum which is offered to each plugin
//! in turn.

use crate::{
    command::{check_permissions, required_permissions, resolve, strip_prefix, Args, Invocation, ModuleSpec},
    context::Context,
    error::{user_facing, BotError},
    log_error,
};
use anyhow::Result;
use serenity::all::{Message, Permissions, Ready, VoiceState};

/// A Discord event
pub enum Event {
    Ready(Ready),
    Message(Message),
    VoiceStateUpdate {
        old: Option<VoiceState>,
        new: VoiceState,
    },
}

pub enum EventHandled {
    Yes,
    No,
}

impl Event {
    /// Offer the event to each plugin in order until one handles it exclusively.
    ///
    /// This is the error boundary: a plugin error is logged, and if it carries a user-facing
    /// message that message is sent back to the channel the command came from.
    pub async fn handle(self, ctx: Context<'_>) {
        for plugin in crate::plugin::plugins() {
            let err = match plugin.handle(&ctx, &self).await {
                Ok(EventHandled::Yes) => return,
                Ok(EventHandled::No) => continue,
                Err(err) => err,
            };

            log_error!("Error in plugin {}: {:#}", plugin.name(), err);

            let (Event::Message(msg), Some(bot_err)) = (&self, user_facing(&err)) else {
                continue;
            };
            if let Err(send_err) = msg.channel_id.say(ctx.http, bot_err.user_message()).await {
                log_error!("Could not report error to channel: {}", send_err);
            }
            return;
        }
    }

    /// The message, with its command prefix removed, if this is a prefixed message.
    pub async fn prefixed<'e>(&'e self, ctx: &Context<'_>) -> Option<(&'e Message, &'e str)> {
        let Event::Message(msg) = self else {
            return None;
        };
        let prefixes = &ctx.cfg.read().await.general.command_prefixes;
        strip_prefix(&msg.content, prefixes).map(|line| (msg, line))
    }

    /// Check if a message invokes one of `module`'s commands, e.g. `XTRM mute @someone 10m`.
    ///
    /// Resolution, maintenance mode, permissions and argument parsing all happen here, in that
    /// order; any failure is returned as a `BotError` for the error boundary to report.
    pub async fn bot_cmd(
        &self,
        ctx: &Context<'_>,
        module: &'static ModuleSpec,
    ) -> Result<Option<(&Message, Invocation)>> {
        let Some((msg, line)) = self.prefixed(ctx).await else {
            return Ok(None);
        };
        let Some((path, rest)) = resolve(module, line)? else {
            return Ok(None);
        };

        // Outside a guild there are no permissions to speak of.
        let granted = msg
            .author_permissions(ctx.cache)
            .unwrap_or_else(Permissions::empty);

        if ctx.vstate.read().await.maintenance && !granted.administrator() {
            return Err(BotError::Maintenance.into());
        }
        check_permissions(required_permissions(&path), granted)?;

        let args = Args::parse(&path, &rest)?;
        Ok(Some((msg, Invocation { path, args })))
    }
}
