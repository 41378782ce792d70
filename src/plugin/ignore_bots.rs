use crate::{event::*, plugin::*};
use anyhow::Result;

/// Nothing a bot says or does reaches the other plugins.
pub struct IgnoreBots;

#[serenity::async_trait]
impl Plugin for IgnoreBots {
    fn name(&self) -> &'static str {
        "ignore_bots"
    }

    async fn handle(&self, _ctx: &Context, event: &Event) -> Result<EventHandled> {
        let from_bot = match event {
            Event::Message(msg) => msg.author.bot || msg.webhook_id.is_some(),
            Event::VoiceStateUpdate { new, .. } => {
                new.member.as_ref().is_some_and(|member| member.user.bot)
            }
            Event::Ready(_) => false,
        };

        if from_bot {
            Ok(EventHandled::Yes)
        } else {
            Ok(EventHandled::No)
        }
    }
}
