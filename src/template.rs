//! Placeholder substitution for autoresponder and custom command bodies.
//!
//! Supported tokens:
//! - `{user}`: mention of the message author
//! - `{server}`: name of the guild, `Unknown Server` outside of one
//! - `{channel:<name>}`: mention of the channel with that exact name, or `#<name> (not found)`
//!
//! Substitution is a single left-to-right pass; substituted text is never scanned again.

use serenity::all::{ChannelId, Mentionable};
use std::{collections::HashMap, sync::LazyLock};

const UNKNOWN_SERVER: &str = "Unknown Server";

static TOKEN: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\{user\}|\{server\}|\{channel:([^}]+)\}").expect("valid template regex")
});

/// Resolves a channel name to its mention string.
pub trait ChannelResolver {
    fn channel_mention(&self, name: &str) -> Option<String>;
}

impl ChannelResolver for HashMap<String, ChannelId> {
    fn channel_mention(&self, name: &str) -> Option<String> {
        self.get(name).map(|id| id.mention().to_string())
    }
}

/// Resolver for contexts without a guild, e.g. DMs.
pub struct NoChannels;

impl ChannelResolver for NoChannels {
    fn channel_mention(&self, _name: &str) -> Option<String> {
        None
    }
}

pub struct RenderContext<'a> {
    pub author_mention: String,
    pub guild_name: Option<String>,
    pub channels: &'a dyn ChannelResolver,
}

pub fn render(body: &str, ctx: &RenderContext<'_>) -> String {
    TOKEN
        .replace_all(body, |caps: &regex::Captures| match caps.get(1) {
            Some(channel_name) => {
                let name = channel_name.as_str();
                ctx.channels
                    .channel_mention(name)
                    .unwrap_or_else(|| format!("#{} (not found)", name))
            }
            None if &caps[0] == "{user}" => ctx.author_mention.clone(),
            None => ctx
                .guild_name
                .clone()
                .unwrap_or_else(|| UNKNOWN_SERVER.to_owned()),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channels() -> HashMap<String, ChannelId> {
        HashMap::from([
            ("rules".to_owned(), ChannelId::new(111)),
            ("general".to_owned(), ChannelId::new(222)),
        ])
    }

    fn ctx<'a>(channels: &'a dyn ChannelResolver, guild: Option<&str>) -> RenderContext<'a> {
        RenderContext {
            author_mention: "<@42>".to_owned(),
            guild_name: guild.map(str::to_owned),
            channels,
        }
    }

    #[test]
    fn substitutes_user_and_server() {
        let channels = channels();
        let out = render("Hi {user}, welcome to {server}!", &ctx(&channels, Some("Ward")));
        assert_eq!(out, "Hi <@42>, welcome to Ward!");
    }

    #[test]
    fn server_falls_back_outside_guild() {
        let out = render("{server}", &ctx(&NoChannels, None));
        assert_eq!(out, "Unknown Server");
    }

    #[test]
    fn channels_resolve_or_degrade() {
        let channels = channels();
        let out = render(
            "See {channel:rules} and {channel:memes}, then {channel:rules} again",
            &ctx(&channels, None),
        );
        assert_eq!(
            out,
            "See <#111> and #memes (not found), then <#111> again"
        );
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let channels = channels();
        let sneaky = RenderContext {
            author_mention: "{server}".to_owned(),
            guild_name: Some("{user}".to_owned()),
            channels: &channels,
        };
        assert_eq!(render("{user}|{server}", &sneaky), "{server}|{user}");
    }

    #[test]
    fn second_pass_is_stable_without_new_tokens() {
        let channels = channels();
        let ctx = ctx(&channels, Some("Ward"));
        let once = render("{user} in {server}", &ctx);
        assert_eq!(render(&once, &ctx), once);
    }

    #[test]
    fn unknown_tokens_are_left_alone() {
        let out = render("{nope} {channel:} {user", &ctx(&NoChannels, None));
        assert_eq!(out, "{nope} {channel:} {user");
    }
}
