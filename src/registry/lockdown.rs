use crate::error::BotError;
use serenity::all::{ChannelId, GuildId, PermissionOverwrite};
use std::collections::HashMap;

/// The `@everyone` overwrite a channel had before lockdown.  `None` means there was none.
pub type ChannelSnapshot = (ChannelId, Option<PermissionOverwrite>);

/// Channel permissions saved by `serverlock`, per guild.
#[derive(Default)]
pub struct LockdownRegistry(HashMap<GuildId, Vec<ChannelSnapshot>>);

impl LockdownRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_locked(&self, guild_id: GuildId) -> bool {
        self.0.contains_key(&guild_id)
    }

    /// Record the pre-lockdown state.  A guild that is already locked keeps its original
    /// snapshot, so locking twice cannot lose the state to restore.
    pub fn lock(&mut self, guild_id: GuildId, snapshot: Vec<ChannelSnapshot>) -> bool {
        if self.is_locked(guild_id) {
            return false;
        }
        self.0.insert(guild_id, snapshot);
        true
    }

    pub fn unlock(&mut self, guild_id: GuildId) -> Result<Vec<ChannelSnapshot>, BotError> {
        self.0
            .remove(&guild_id)
            .ok_or_else(|| BotError::NotFound("Active server lockdown".into()))
    }

    /// Put back channels an unlock could not restore, so `serverunlock` can retry them.  If the
    /// guild was locked again meanwhile, these entries win: the newer lockdown only saw the
    /// locked state.
    pub fn keep_unrestored(&mut self, guild_id: GuildId, unrestored: Vec<ChannelSnapshot>) {
        if unrestored.is_empty() {
            return;
        }
        let entries = self.0.entry(guild_id).or_default();
        for (channel_id, previous) in unrestored {
            match entries.iter_mut().find(|(id, _)| *id == channel_id) {
                Some(entry) => entry.1 = previous,
                None => entries.push((channel_id, previous)),
            }
        }
    }
}
