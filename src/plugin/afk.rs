use crate::{
    command::resolve, event::*, helper::*, log_error, log_internal, logging::*, plugin::*,
    registry::AfkRegistry,
};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serenity::all::{Message, UserId};

/// Clears the author's AFK status on their next message and tells the channel when someone who is
/// AFK gets mentioned.  Sees every message, commands included, and never claims one: a failure
/// here is logged so the command or trigger behind it still runs.
pub struct AfkListener;

#[serenity::async_trait]
impl Plugin for AfkListener {
    fn name(&self) -> &'static str {
        "afk"
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Event::Message(msg) = event else {
            return Ok(EventHandled::No);
        };

        if let Err(err) = observe(ctx, event, msg).await {
            log_error!("AFK notice for {} failed: {:#}", msg.author.color(), err);
        }
        Ok(EventHandled::No)
    }
}

/// What one message changes for AFK bookkeeping.
#[derive(Debug, PartialEq)]
struct AfkNotices {
    /// The author was AFK and is now back.
    returned: bool,
    /// Mentioned members who are AFK, with their reason and time away.
    away: Vec<(UserId, String, String)>,
}

/// The author's own status is cleared first, so mentioning yourself never produces a notice.
fn on_message(
    afk: &mut AfkRegistry,
    author: UserId,
    sets_afk: bool,
    mentioned: &[UserId],
    now: DateTime<Utc>,
) -> AfkNotices {
    // Going AFK while already AFK must hit the "already AFK" refusal, not a welcome back.
    let returned = !sets_afk && afk.clear(author).is_some();

    let away = mentioned
        .iter()
        .filter(|user_id| **user_id != author)
        .filter_map(|user_id| {
            afk.get(*user_id)
                .map(|record| (*user_id, record.reason.clone(), record.elapsed(now)))
        })
        .collect();

    AfkNotices { returned, away }
}

fn is_afk_command(line: &str) -> bool {
    matches!(
        resolve(&super::utility::MODULE, line),
        Ok(Some((path, _))) if path.first().is_some_and(|cmd| cmd.name == "afk")
    )
}

async fn observe(ctx: &Context<'_>, event: &Event, msg: &Message) -> Result<()> {
    let sets_afk = match event.prefixed(ctx).await {
        Some((_, line)) => is_afk_command(line),
        None => false,
    };
    let mentioned: Vec<_> = msg.mentions.iter().map(|user| user.id).collect();

    let notices = on_message(
        &mut ctx.vstate.write().await.afk,
        msg.author.id,
        sets_afk,
        &mentioned,
        Utc::now(),
    );

    if notices.returned {
        let name = msg.author.nick_in_guild(ctx, msg.guild_id).await;
        log_internal!("{} is back from AFK", msg.author.color());
        msg.channel_id
            .say(
                ctx.http,
                format!(
                    "\u{1F44B} Welcome back, {}! Your AFK status has been removed.",
                    name
                ),
            )
            .await?;
    }

    for (user_id, reason, elapsed) in notices.away {
        let name = user_id.nick_in_guild(ctx, msg.guild_id).await;
        msg.channel_id
            .say(
                ctx.http,
                format!("\u{1F634} {} is AFK since {} ago: {}", name, elapsed, reason),
            )
            .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BotError;
    use chrono::TimeDelta;

    fn author() -> UserId {
        UserId::new(1)
    }

    #[test]
    fn afk_command_is_recognized() {
        assert!(is_afk_command("afk"));
        assert!(is_afk_command("afk gone fishing"));
        assert!(!is_afk_command("ping"));
        assert!(!is_afk_command("afkk"));
    }

    #[test]
    fn any_other_message_welcomes_back() {
        let mut afk = AfkRegistry::new();
        let now = Utc::now();
        afk.set(author(), "lunch", now).unwrap();

        let notices = on_message(&mut afk, author(), false, &[], now);
        assert!(notices.returned);
        assert!(notices.away.is_empty());
        assert!(afk.get(author()).is_none());
    }

    #[test]
    fn repeated_afk_reaches_already_afk() {
        let mut afk = AfkRegistry::new();
        let now = Utc::now();
        afk.set(author(), "lunch", now).unwrap();

        let notices = on_message(&mut afk, author(), true, &[], now);
        assert!(!notices.returned);
        assert_eq!(afk.set(author(), "again", now), Err(BotError::AlreadyAfk));
    }

    #[test]
    fn mentions_of_afk_members_are_reported() {
        let mut afk = AfkRegistry::new();
        let since = Utc::now();
        let sleeper = UserId::new(2);
        afk.set(sleeper, "sleep", since).unwrap();

        let notices = on_message(
            &mut afk,
            author(),
            false,
            &[sleeper, UserId::new(3)],
            since + TimeDelta::seconds(90),
        );
        assert_eq!(
            notices,
            AfkNotices {
                returned: false,
                away: vec![(sleeper, "sleep".to_owned(), "1m 30s".to_owned())],
            }
        );
        assert!(afk.get(sleeper).is_some());
    }

    #[test]
    fn author_is_cleared_before_mentions_are_checked() {
        let mut afk = AfkRegistry::new();
        let now = Utc::now();
        afk.set(author(), "lunch", now).unwrap();

        let notices = on_message(&mut afk, author(), false, &[author()], now);
        assert!(notices.returned);
        assert!(notices.away.is_empty());
    }
}
