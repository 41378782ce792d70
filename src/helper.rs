//! Miscellaneous convenience methods

use crate::{command::RoleRef, context::Context, error::BotError};
use anyhow::{anyhow, Result};
use serenity::all::{
    ChannelId, ChannelType, GuildId, PermissionOverwrite, PermissionOverwriteType, RoleId, UserId,
};
use std::collections::HashMap;

#[serenity::async_trait]
pub trait UserIdHelper {
    async fn nick_in_guild(&self, ctx: &Context, guild_id: Option<GuildId>) -> String;
}

#[serenity::async_trait]
impl UserIdHelper for serenity::all::UserId {
    async fn nick_in_guild(&self, ctx: &Context, guild_id: Option<GuildId>) -> String {
        let user = match self.to_user(ctx.cache_http).await {
            Ok(user) => user,
            Err(_) => return format!("<unknown-user-{}>", *self),
        };

        user.nick_in_guild(ctx, guild_id).await
    }
}

#[serenity::async_trait]
pub trait UserHelper {
    async fn nick_in_guild(&self, ctx: &Context, guild_id: Option<GuildId>) -> String;
}

#[serenity::async_trait]
impl UserHelper for serenity::all::User {
    async fn nick_in_guild(&self, ctx: &Context, guild_id: Option<GuildId>) -> String {
        let nick_in_guild = match guild_id {
            Some(guild_id) => self.nick_in(ctx.cache_http, guild_id).await,
            None => None,
        };

        // May not be in a guild, e.g. DM.  Fall back to the display name.
        match nick_in_guild {
            Some(nick_in_guild) => nick_in_guild,
            None => self.display_name().to_owned(),
        }
    }
}

#[serenity::async_trait]
pub trait MessageHelper {
    async fn is_from_owner(&self, ctx: &Context) -> bool;
    /// Guild the message was sent in.  Commands that only make sense in a server refuse DMs.
    fn require_guild(&self) -> Result<GuildId, BotError>;
}

#[serenity::async_trait]
impl MessageHelper for serenity::all::Message {
    async fn is_from_owner(&self, ctx: &Context) -> bool {
        let owners = &ctx.cfg.read().await.general.bot_owners;
        let author_global_name = &self.author.name;

        owners.contains(author_global_name)
    }

    fn require_guild(&self) -> Result<GuildId, BotError> {
        self.guild_id
            .ok_or_else(|| BotError::Refused("This command can only be used in a server.".into()))
    }
}

/// Roles of a guild member, fetched from the cache when possible.
pub async fn member_roles(ctx: &Context<'_>, guild_id: GuildId, user_id: UserId) -> Result<Vec<RoleId>> {
    Ok(guild_id.member(ctx.cache_http, user_id).await?.roles)
}

pub struct RoleInfo {
    pub name: String,
    pub position: u16,
}

pub struct ChannelInfo {
    pub id: ChannelId,
    pub name: String,
    pub kind: ChannelType,
    /// Overwrite for `@everyone`, if the channel has one
    pub everyone_overwrite: Option<PermissionOverwrite>,
}

/// Owned copy of the guild data commands need.
///
/// The cache hands out a guard that must not be held across an `.await`, so the data is cloned
/// out up front.
pub struct GuildSnapshot {
    pub id: GuildId,
    pub name: String,
    pub owner_id: UserId,
    pub member_count: u64,
    pub boosts: u64,
    pub icon_url: Option<String>,
    pub roles: HashMap<RoleId, RoleInfo>,
    pub channels: Vec<ChannelInfo>,
}

impl GuildSnapshot {
    pub fn from_cache(ctx: &Context<'_>, guild_id: GuildId) -> Result<Self> {
        let guild = ctx
            .cache
            .guild(guild_id)
            .ok_or_else(|| anyhow!("Guild {} is not in the cache", guild_id))?;
        let everyone = guild_id.everyone_role();

        let roles = guild
            .roles
            .iter()
            .map(|(id, role)| {
                (
                    *id,
                    RoleInfo {
                        name: role.name.clone(),
                        position: role.position,
                    },
                )
            })
            .collect();

        let mut channels: Vec<_> = guild
            .channels
            .values()
            .map(|channel| ChannelInfo {
                id: channel.id,
                name: channel.name.clone(),
                kind: channel.kind,
                everyone_overwrite: channel
                    .permission_overwrites
                    .iter()
                    .find(|ow| matches!(ow.kind, PermissionOverwriteType::Role(id) if id == everyone))
                    .cloned(),
            })
            .collect();
        channels.sort_by_key(|channel| channel.id);

        Ok(Self {
            id: guild.id,
            name: guild.name.clone(),
            owner_id: guild.owner_id,
            member_count: guild.member_count,
            boosts: guild.premium_subscription_count.unwrap_or_default(),
            icon_url: guild.icon_url(),
            roles,
            channels,
        })
    }

    /// Channel names to ids, for `{channel:<name>}` placeholders.
    pub fn channel_names(&self) -> HashMap<String, ChannelId> {
        self.channels
            .iter()
            .map(|channel| (channel.name.clone(), channel.id))
            .collect()
    }

    pub fn text_channels(&self) -> impl Iterator<Item = &ChannelInfo> {
        self.channels
            .iter()
            .filter(|channel| channel.kind == ChannelType::Text)
    }

    /// Role named exactly `name`.  Case matters, so a stray `muted` role is not taken for `Muted`.
    pub fn role_by_name(&self, name: &str) -> Option<RoleId> {
        self.roles
            .iter()
            .filter(|(_, role)| role.name == name)
            .min_by_key(|(id, _)| **id)
            .map(|(id, _)| *id)
    }

    pub fn resolve_role(&self, role: &RoleRef) -> Result<RoleId, BotError> {
        match role {
            RoleRef::Id(id) if self.roles.contains_key(id) => Ok(*id),
            RoleRef::Id(id) => Err(BotError::NotFound(format!("Role `{}`", id))),
            RoleRef::Name(name) => self
                .role_by_name(name)
                .ok_or_else(|| BotError::NotFound(format!("Role `{}`", name))),
        }
    }

    pub fn role_name(&self, role_id: RoleId) -> String {
        self.roles
            .get(&role_id)
            .map(|role| role.name.clone())
            .unwrap_or_else(|| format!("Unknown Role (ID: {})", role_id))
    }

    pub fn role_position(&self, role_id: RoleId) -> u16 {
        self.roles.get(&role_id).map_or(0, |role| role.position)
    }

    /// Position of the highest role among `roles`; `@everyone` sits at 0.
    pub fn top_position(&self, roles: &[RoleId]) -> u16 {
        roles
            .iter()
            .map(|role_id| self.role_position(*role_id))
            .max()
            .unwrap_or(0)
    }

    /// Refuse moderation actions on oneself, on the bot, or on someone ranked at or above the
    /// author.  The guild owner outranks everyone.
    pub fn check_target(
        &self,
        action: &str,
        author: (UserId, &[RoleId]),
        target: (UserId, &[RoleId]),
        bot_id: UserId,
    ) -> Result<(), BotError> {
        if target.0 == author.0 {
            return Err(BotError::Refused(format!("You cannot {} yourself.", action)));
        }
        if target.0 == bot_id {
            return Err(BotError::Refused(format!("I cannot {} myself.", action)));
        }
        if author.0 != self.owner_id && self.top_position(author.1) <= self.top_position(target.1) {
            return Err(BotError::Refused(format!(
                "You cannot {} someone with an equal or higher role than yourself.",
                action
            )));
        }
        Ok(())
    }

    /// Refuse to hand out a role the bot cannot manage.
    pub fn check_bot_can_assign(&self, role_id: RoleId, bot_roles: &[RoleId]) -> Result<(), BotError> {
        if self.role_position(role_id) >= self.top_position(bot_roles) {
            return Err(BotError::Refused(format!(
                "I cannot assign the role `{}` because it is higher than or equal to my top role.",
                self.role_name(role_id)
            )));
        }
        Ok(())
    }

    /// Refuse to manage a role at or above the author's top role (unless they own the guild), or
    /// at or above the bot's.
    pub fn check_manageable(
        &self,
        role_id: RoleId,
        author: (UserId, &[RoleId]),
        bot_roles: &[RoleId],
    ) -> Result<(), BotError> {
        if author.0 != self.owner_id && self.role_position(role_id) >= self.top_position(author.1) {
            return Err(BotError::Refused(
                "You cannot manage roles that are equal to or higher than your top role.".into(),
            ));
        }
        self.check_bot_can_assign(role_id, bot_roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> UserId {
        UserId::new(1)
    }

    fn moderator() -> UserId {
        UserId::new(2)
    }

    fn member() -> UserId {
        UserId::new(3)
    }

    fn bot() -> UserId {
        UserId::new(4)
    }

    fn role(id: u64) -> RoleId {
        RoleId::new(id)
    }

    /// Roles 10 (`Admin`, pos 5), 11 (`Bot`, pos 4), 12 (`Mods`, pos 3), 13 (`Muted`, pos 1).
    fn snapshot() -> GuildSnapshot {
        let roles = [(10, "Admin", 5), (11, "Bot", 4), (12, "Mods", 3), (13, "Muted", 1)]
            .into_iter()
            .map(|(id, name, position)| {
                (
                    role(id),
                    RoleInfo {
                        name: name.to_owned(),
                        position,
                    },
                )
            })
            .collect();

        GuildSnapshot {
            id: GuildId::new(100),
            name: "Test Guild".into(),
            owner_id: owner(),
            member_count: 4,
            boosts: 0,
            icon_url: None,
            roles,
            channels: vec![
                ChannelInfo {
                    id: ChannelId::new(20),
                    name: "general".into(),
                    kind: ChannelType::Text,
                    everyone_overwrite: None,
                },
                ChannelInfo {
                    id: ChannelId::new(21),
                    name: "Lounge".into(),
                    kind: ChannelType::Voice,
                    everyone_overwrite: None,
                },
            ],
        }
    }

    #[test]
    fn resolves_roles_by_id_or_name() {
        let guild = snapshot();
        assert_eq!(guild.resolve_role(&RoleRef::Name("Mods".into())), Ok(role(12)));
        assert_eq!(guild.resolve_role(&RoleRef::Id(role(13))), Ok(role(13)));
        assert!(matches!(
            guild.resolve_role(&RoleRef::Id(role(99))),
            Err(BotError::NotFound(_))
        ));
        assert!(matches!(
            guild.resolve_role(&RoleRef::Name("Nope".into())),
            Err(BotError::NotFound(_))
        ));
        assert_eq!(guild.role_name(role(99)), "Unknown Role (ID: 99)");
    }

    #[test]
    fn role_names_match_case_sensitively() {
        let guild = snapshot();
        assert_eq!(guild.role_by_name("Muted"), Some(role(13)));
        assert_eq!(guild.role_by_name("muted"), None);
    }

    #[test]
    fn channel_views() {
        let guild = snapshot();
        assert_eq!(guild.channel_names().get("Lounge"), Some(&ChannelId::new(21)));
        let text: Vec<_> = guild.text_channels().map(|c| c.id).collect();
        assert_eq!(text, [ChannelId::new(20)]);
    }

    #[test]
    fn cannot_target_self_or_bot() {
        let guild = snapshot();
        let admin = [role(10)];
        assert_eq!(
            guild.check_target("kick", (moderator(), &admin), (moderator(), &admin), bot()),
            Err(BotError::Refused("You cannot kick yourself.".into()))
        );
        assert_eq!(
            guild.check_target("ban", (moderator(), &admin), (bot(), &[]), bot()),
            Err(BotError::Refused("I cannot ban myself.".into()))
        );
    }

    #[test]
    fn hierarchy_is_strict_except_for_owner() {
        let guild = snapshot();
        let mods = [role(12)];
        assert!(guild.check_target("mute", (moderator(), &mods), (member(), &[]), bot()).is_ok());
        assert!(matches!(
            guild.check_target("mute", (moderator(), &mods), (member(), &mods), bot()),
            Err(BotError::Refused(_))
        ));
        assert!(matches!(
            guild.check_target("mute", (member(), &[]), (moderator(), &mods), bot()),
            Err(BotError::Refused(_))
        ));
        // The owner needs no roles at all.
        assert!(guild.check_target("kick", (owner(), &[]), (moderator(), &[role(10)]), bot()).is_ok());
    }

    #[test]
    fn role_management_limits() {
        let guild = snapshot();
        let bot_roles = [role(11)];
        let mods = [role(12)];

        assert!(guild.check_manageable(role(13), (moderator(), &mods), &bot_roles).is_ok());
        // Equal to the author's top role.
        assert!(guild.check_manageable(role(12), (moderator(), &mods), &bot_roles).is_err());
        // The owner may, but the bot still cannot go above itself.
        assert!(guild.check_manageable(role(12), (owner(), &[]), &bot_roles).is_ok());
        assert!(guild.check_manageable(role(10), (owner(), &[]), &bot_roles).is_err());
        assert!(guild.check_bot_can_assign(role(11), &bot_roles).is_err());
    }
}
