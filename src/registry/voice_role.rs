use crate::error::BotError;
use serenity::all::{ChannelId, GuildId, RoleId};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VoiceRoleConfig {
    pub role_id: RoleId,
    pub enabled: bool,
}

/// How a member's voice presence changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoiceTransition {
    Joined,
    Left,
    /// Moved between channels, or a state change within one (mute, deafen...)
    Other,
}

/// What should happen to the member's voice role.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoiceRoleAction {
    Add(RoleId),
    Remove(RoleId),
    /// The configured role vanished; the feature has just been switched off.
    Disabled(RoleId),
    Nothing,
}

/// Per-guild voice role configuration.
#[derive(Default)]
pub struct VoiceRoleRegistry(HashMap<GuildId, VoiceRoleConfig>);

impl VoiceTransition {
    pub fn between(before: Option<ChannelId>, after: Option<ChannelId>) -> Self {
        match (before, after) {
            (None, Some(_)) => VoiceTransition::Joined,
            (Some(_), None) => VoiceTransition::Left,
            _ => VoiceTransition::Other,
        }
    }
}

impl VoiceRoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or replace) the guild's voice role.  The feature starts out disabled.
    pub fn setup(&mut self, guild_id: GuildId, role_id: RoleId) {
        self.0.insert(
            guild_id,
            VoiceRoleConfig {
                role_id,
                enabled: false,
            },
        );
    }

    pub fn enable(&mut self, guild_id: GuildId) -> Result<RoleId, BotError> {
        let config = self
            .0
            .get_mut(&guild_id)
            .ok_or_else(|| BotError::NotFound("Voice role setup".into()))?;
        config.enabled = true;
        Ok(config.role_id)
    }

    pub fn disable(&mut self, guild_id: GuildId) -> Result<(), BotError> {
        let config = self
            .0
            .get_mut(&guild_id)
            .ok_or_else(|| BotError::NotFound("Voice role configuration".into()))?;
        config.enabled = false;
        Ok(())
    }

    #[cfg(test)]
    pub fn get(&self, guild_id: GuildId) -> Option<VoiceRoleConfig> {
        self.0.get(&guild_id).copied()
    }

    /// Decide the role change for a voice transition.
    ///
    /// If the configured role no longer exists the feature disables itself but keeps the role id,
    /// so a role re-created under the same id would be picked up again after `enable`.
    pub fn plan(
        &mut self,
        guild_id: GuildId,
        transition: VoiceTransition,
        role_exists: impl Fn(RoleId) -> bool,
        member_has_role: impl Fn(RoleId) -> bool,
    ) -> VoiceRoleAction {
        let Some(config) = self.0.get_mut(&guild_id) else {
            return VoiceRoleAction::Nothing;
        };
        if !config.enabled {
            return VoiceRoleAction::Nothing;
        }

        let role_id = config.role_id;
        if !role_exists(role_id) {
            config.enabled = false;
            return VoiceRoleAction::Disabled(role_id);
        }

        match transition {
            VoiceTransition::Joined if !member_has_role(role_id) => VoiceRoleAction::Add(role_id),
            VoiceTransition::Left if member_has_role(role_id) => VoiceRoleAction::Remove(role_id),
            _ => VoiceRoleAction::Nothing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guild() -> GuildId {
        GuildId::new(10)
    }

    fn role() -> RoleId {
        RoleId::new(20)
    }

    fn a() -> Option<ChannelId> {
        Some(ChannelId::new(1))
    }

    fn b() -> Option<ChannelId> {
        Some(ChannelId::new(2))
    }

    fn enabled() -> VoiceRoleRegistry {
        let mut registry = VoiceRoleRegistry::new();
        registry.setup(guild(), role());
        registry.enable(guild()).unwrap();
        registry
    }

    fn plan(
        registry: &mut VoiceRoleRegistry,
        before: Option<ChannelId>,
        after: Option<ChannelId>,
        has_role: bool,
    ) -> VoiceRoleAction {
        registry.plan(
            guild(),
            VoiceTransition::between(before, after),
            |_| true,
            |_| has_role,
        )
    }

    #[test]
    fn joining_adds_role() {
        let mut registry = enabled();
        assert_eq!(plan(&mut registry, None, a(), false), VoiceRoleAction::Add(role()));
        assert_eq!(plan(&mut registry, None, a(), true), VoiceRoleAction::Nothing);
    }

    #[test]
    fn leaving_removes_role() {
        let mut registry = enabled();
        assert_eq!(plan(&mut registry, a(), None, true), VoiceRoleAction::Remove(role()));
        assert_eq!(plan(&mut registry, a(), None, false), VoiceRoleAction::Nothing);
    }

    #[test]
    fn moving_between_channels_does_nothing() {
        let mut registry = enabled();
        assert_eq!(plan(&mut registry, a(), b(), false), VoiceRoleAction::Nothing);
        assert_eq!(plan(&mut registry, a(), b(), true), VoiceRoleAction::Nothing);
        assert_eq!(plan(&mut registry, a(), a(), true), VoiceRoleAction::Nothing);
    }

    #[test]
    fn setup_alone_is_inactive() {
        let mut registry = VoiceRoleRegistry::new();
        registry.setup(guild(), role());
        assert_eq!(plan(&mut registry, None, a(), false), VoiceRoleAction::Nothing);
    }

    #[test]
    fn enable_without_setup_fails() {
        let mut registry = VoiceRoleRegistry::new();
        assert!(matches!(registry.enable(guild()), Err(BotError::NotFound(_))));
        assert!(matches!(registry.disable(guild()), Err(BotError::NotFound(_))));
    }

    #[test]
    fn setup_again_resets_to_disabled() {
        let mut registry = enabled();
        registry.setup(guild(), RoleId::new(21));
        let config = registry.get(guild()).unwrap();
        assert_eq!(config.role_id, RoleId::new(21));
        assert!(!config.enabled);
    }

    #[test]
    fn missing_role_self_disables_and_keeps_config() {
        let mut registry = enabled();
        let action = registry.plan(guild(), VoiceTransition::Joined, |_| false, |_| false);
        assert_eq!(action, VoiceRoleAction::Disabled(role()));

        let config = registry.get(guild()).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.role_id, role());

        // Stays quiet until re-enabled.
        assert_eq!(plan(&mut registry, None, a(), false), VoiceRoleAction::Nothing);
        registry.enable(guild()).unwrap();
        assert_eq!(plan(&mut registry, None, a(), false), VoiceRoleAction::Add(role()));
    }

    #[test]
    fn unknown_guild_does_nothing() {
        let mut registry = enabled();
        let action = registry.plan(GuildId::new(99), VoiceTransition::Joined, |_| true, |_| false);
        assert_eq!(action, VoiceRoleAction::Nothing);
    }
}
