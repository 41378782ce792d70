use crate::schedule::ScheduledTask;
use serenity::all::{GuildId, UserId};
use std::collections::HashMap;

pub type MemberKey = (GuildId, UserId);

/// Active mutes.  Presence in the registry means muted.
#[derive(Default)]
pub struct MuteRegistry {
    entries: HashMap<MemberKey, MuteEntry>,
    next_ticket: u64,
}

struct MuteEntry {
    ticket: u64,
    expiry: Option<ScheduledTask>,
}

impl MuteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a mute and return its ticket.  Muting an already muted member replaces the old
    /// entry and cancels its pending expiry, so mutes never stack.
    pub fn mute(&mut self, key: MemberKey) -> u64 {
        self.next_ticket += 1;
        let ticket = self.next_ticket;

        let previous = self.entries.insert(
            key,
            MuteEntry {
                ticket,
                expiry: None,
            },
        );
        if let Some(expiry) = previous.and_then(|entry| entry.expiry) {
            expiry.cancel();
        }

        ticket
    }

    /// Attach the expiry timer of the mute identified by `ticket`.  If that mute is no longer
    /// current the timer is cancelled instead.
    pub fn attach_expiry(&mut self, key: MemberKey, ticket: u64, expiry: ScheduledTask) {
        match self.entries.get_mut(&key) {
            Some(entry) if entry.ticket == ticket => entry.expiry = Some(expiry),
            _ => expiry.cancel(),
        }
    }

    /// Manual unmute.  Returns whether the member was muted.
    pub fn unmute(&mut self, key: MemberKey) -> bool {
        match self.entries.remove(&key) {
            Some(entry) => {
                if let Some(expiry) = entry.expiry {
                    expiry.cancel();
                }
                true
            }
            None => false,
        }
    }

    /// Timer-driven unmute.  Only acts if the member is still muted under the same ticket; a
    /// manual unmute or a newer mute in the meantime turns this into a no-op.
    pub fn expire(&mut self, key: MemberKey, ticket: u64) -> bool {
        match self.entries.get(&key) {
            Some(entry) if entry.ticket == ticket => {
                self.entries.remove(&key);
                true
            }
            _ => false,
        }
    }

    #[cfg(test)]
    pub fn is_muted(&self, key: MemberKey) -> bool {
        self.entries.contains_key(&key)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
