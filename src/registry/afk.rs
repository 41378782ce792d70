use crate::{duration::format_elapsed, error::BotError};
use chrono::{DateTime, Utc};
use serenity::all::UserId;
use std::collections::HashMap;

pub const DEFAULT_AFK_REASON: &str = "No reason provided.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AfkRecord {
    pub reason: String,
    pub since: DateTime<Utc>,
}

/// Members currently marked AFK.
#[derive(Default)]
pub struct AfkRegistry(HashMap<UserId, AfkRecord>);

impl AfkRecord {
    /// Time since the member went AFK, e.g. `1h 5m`.
    pub fn elapsed(&self, now: DateTime<Utc>) -> String {
        // Clock skew can make `since` lie in the future; treat that as no time elapsed.
        let elapsed = (now - self.since).to_std().unwrap_or_default();
        format_elapsed(elapsed)
    }
}

impl AfkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(
        &mut self,
        user_id: UserId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(), BotError> {
        use std::collections::hash_map::Entry::*;
        match self.0.entry(user_id) {
            Occupied(_) => Err(BotError::AlreadyAfk),
            Vacant(vacant) => {
                vacant.insert(AfkRecord {
                    reason: reason.to_owned(),
                    since: now,
                });
                Ok(())
            }
        }
    }

    /// Remove and return the member's AFK record, if any.
    pub fn clear(&mut self, user_id: UserId) -> Option<AfkRecord> {
        self.0.remove(&user_id)
    }

    pub fn get(&self, user_id: UserId) -> Option<&AfkRecord> {
        self.0.get(&user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn second_set_is_already_afk() {
        let mut afk = AfkRegistry::new();
        let now = Utc::now();
        let user = UserId::new(7);

        afk.set(user, "brb", now).unwrap();
        assert_eq!(afk.set(user, "again", now), Err(BotError::AlreadyAfk));
        assert_eq!(afk.get(user).unwrap().reason, "brb");
    }

    #[test]
    fn clear_removes_exactly_once() {
        let mut afk = AfkRegistry::new();
        let user = UserId::new(7);
        afk.set(user, "brb", Utc::now()).unwrap();

        assert!(afk.clear(user).is_some());
        assert!(afk.clear(user).is_none());
        assert!(afk.get(user).is_none());
    }

    #[test]
    fn records_are_per_member() {
        let mut afk = AfkRegistry::new();
        let now = Utc::now();
        afk.set(UserId::new(1), "lunch", now).unwrap();
        afk.set(UserId::new(2), "sleep", now).unwrap();
        afk.clear(UserId::new(1));
        assert_eq!(afk.get(UserId::new(2)).unwrap().reason, "sleep");
    }

    #[test]
    fn elapsed_is_formatted() {
        let since = Utc::now();
        let record = AfkRecord {
            reason: "brb".into(),
            since,
        };
        let later = since + TimeDelta::seconds(3725);
        assert_eq!(record.elapsed(later), "1h 2m 5s");
        assert_eq!(record.elapsed(since), "0s");
        assert_eq!(record.elapsed(since - TimeDelta::seconds(5)), "0s");
    }
}
