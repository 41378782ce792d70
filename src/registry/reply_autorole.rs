use crate::error::BotError;
use serenity::all::{GuildId, RoleId};
use std::collections::HashMap;

/// Per-guild `trigger word -> role` grants, in insertion order.
#[derive(Default)]
pub struct ReplyAutoroleRegistry(HashMap<GuildId, Vec<(String, RoleId)>>);

fn normalize(word: &str) -> String {
    word.trim().to_lowercase()
}

fn not_found(word: &str) -> BotError {
    BotError::NotFound(format!("Reply autorole for `{}`", word))
}

impl ReplyAutoroleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, guild_id: GuildId, word: &str, role_id: RoleId) -> Result<String, BotError> {
        let word = normalize(word);
        let entries = self.0.entry(guild_id).or_default();
        if entries.iter().any(|(existing, _)| *existing == word) {
            return Err(BotError::DuplicateTrigger(word));
        }
        entries.push((word.clone(), role_id));
        Ok(word)
    }

    /// Point an existing trigger at a new role, returning the previous one.
    pub fn edit(&mut self, guild_id: GuildId, word: &str, role_id: RoleId) -> Result<RoleId, BotError> {
        let word = normalize(word);
        let entry = self
            .0
            .get_mut(&guild_id)
            .and_then(|entries| entries.iter_mut().find(|(existing, _)| *existing == word))
            .ok_or_else(|| not_found(&word))?;
        Ok(std::mem::replace(&mut entry.1, role_id))
    }

    pub fn delete(&mut self, guild_id: GuildId, word: &str) -> Result<RoleId, BotError> {
        let word = normalize(word);
        let entries = self.0.get_mut(&guild_id).ok_or_else(|| not_found(&word))?;
        let idx = entries
            .iter()
            .position(|(existing, _)| *existing == word)
            .ok_or_else(|| not_found(&word))?;
        Ok(entries.remove(idx).1)
    }

    pub fn list(&self, guild_id: GuildId) -> impl Iterator<Item = (&str, RoleId)> + '_ {
        self.0
            .get(&guild_id)
            .into_iter()
            .flatten()
            .map(|(word, role_id)| (word.as_str(), *role_id))
    }

    /// Role granted by a reply whose whole content is `content` (case-insensitive).
    pub fn lookup(&self, guild_id: GuildId, content: &str) -> Option<RoleId> {
        let content = content.to_lowercase();
        self.0
            .get(&guild_id)?
            .iter()
            .find(|(word, _)| *word == content)
            .map(|(_, role_id)| *role_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guild() -> GuildId {
        GuildId::new(5)
    }

    #[test]
    fn create_then_lookup_exact_word() {
        let mut registry = ReplyAutoroleRegistry::new();
        registry.create(guild(), "Staff", RoleId::new(9)).unwrap();

        assert_eq!(registry.lookup(guild(), "STAFF"), Some(RoleId::new(9)));
        assert_eq!(registry.lookup(guild(), "staff please"), None);
        assert_eq!(registry.lookup(GuildId::new(6), "staff"), None);
    }

    #[test]
    fn duplicate_word_is_rejected() {
        let mut registry = ReplyAutoroleRegistry::new();
        registry.create(guild(), "staff", RoleId::new(9)).unwrap();
        assert_eq!(
            registry.create(guild(), " STAFF", RoleId::new(10)),
            Err(BotError::DuplicateTrigger("staff".into()))
        );
        assert_eq!(registry.lookup(guild(), "staff"), Some(RoleId::new(9)));
    }

    #[test]
    fn edit_returns_previous_role() {
        let mut registry = ReplyAutoroleRegistry::new();
        registry.create(guild(), "staff", RoleId::new(9)).unwrap();
        assert_eq!(registry.edit(guild(), "staff", RoleId::new(10)), Ok(RoleId::new(9)));
        assert_eq!(registry.lookup(guild(), "staff"), Some(RoleId::new(10)));
        assert!(matches!(
            registry.edit(guild(), "mods", RoleId::new(1)),
            Err(BotError::NotFound(_))
        ));
    }

    #[test]
    fn delete_and_list() {
        let mut registry = ReplyAutoroleRegistry::new();
        registry.create(guild(), "b", RoleId::new(2)).unwrap();
        registry.create(guild(), "a", RoleId::new(1)).unwrap();
        let words: Vec<_> = registry.list(guild()).map(|(w, _)| w.to_owned()).collect();
        assert_eq!(words, ["b", "a"]);

        assert_eq!(registry.delete(guild(), "B"), Ok(RoleId::new(2)));
        assert!(matches!(registry.delete(guild(), "b"), Err(BotError::NotFound(_))));
        assert_eq!(registry.list(guild()).count(), 1);
        assert_eq!(registry.list(GuildId::new(77)).count(), 0);
    }
}
