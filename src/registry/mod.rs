//! In-memory registries.  Nothing here survives a restart.

pub mod afk;
pub mod lockdown;
pub mod mute;
pub mod reply_autorole;
pub mod voice_role;

pub use afk::AfkRegistry;
pub use lockdown::LockdownRegistry;
pub use mute::{MemberKey, MuteRegistry};
pub use reply_autorole::ReplyAutoroleRegistry;
pub use voice_role::{VoiceRoleAction, VoiceRoleRegistry, VoiceTransition};
