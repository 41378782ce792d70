use crate::{event::*, log_event, logging::*, plugin::*};
use anyhow::Result;

/// Prints debug information about event to stdout
pub struct Debug;

#[serenity::async_trait]
impl Plugin for Debug {
    fn name(&self) -> &'static str {
        "debug"
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        match event {
            Event::Ready(ready) => {
                log_event!(
                    "Connected to {} server(s) as {}",
                    ready.guilds.len(),
                    ctx.cache.current_user().color(),
                );
            }
            Event::Message(msg) => {
                log_event!(
                    "{}{}{}{}{}{} {}",
                    msg.guild_id.color(ctx.http).await,
                    Glue {}.color(),
                    msg.channel_id.color(ctx.http).await,
                    Glue {}.color(),
                    msg.author.color(),
                    Glue {}.color(),
                    msg.content_safe(ctx.cache),
                );
            }
            Event::VoiceStateUpdate { old, new } => {
                let old_channel_id = old.as_ref().and_then(|old| old.channel_id);
                match (old_channel_id, new.channel_id) {
                    (Some(old_id), Some(new_id)) if old_id == new_id => {
                        // State change within same channel, e.g. mute/unmute
                        // Not currently debug logging this
                    }
                    (Some(_), Some(_)) => log_event!(
                        "{} moved VC channel from \"{}\" to \"{}\"",
                        new.user_id.color(ctx.http).await,
                        old_channel_id.color(ctx.http).await,
                        new.channel_id.color(ctx.http).await,
                    ),
                    (Some(_), None) => log_event!(
                        "{} left VC channel \"{}\"",
                        new.user_id.color(ctx.http).await,
                        old_channel_id.color(ctx.http).await,
                    ),
                    (None, Some(_)) => log_event!(
                        "{} joined VC channel \"{}\"",
                        new.user_id.color(ctx.http).await,
                        new.channel_id.color(ctx.http).await,
                    ),
                    (None, None) => log_event!("Unknown voice state update"),
                }
            }
        }

        Ok(EventHandled::No)
    }
}
