use crate::{
    registry::{AfkRegistry, LockdownRegistry, MuteRegistry, ReplyAutoroleRegistry, VoiceRoleRegistry},
    trigger::TriggerTable,
};
use std::sync::Arc;
use tokio::sync::RwLock;

/// State which is lost across sessions
pub struct VolatileState {
    pub autoresponders: TriggerTable,
    pub custom_commands: TriggerTable,
    pub mutes: MuteRegistry,
    pub afk: AfkRegistry,
    pub voice_roles: VoiceRoleRegistry,
    pub reply_autoroles: ReplyAutoroleRegistry,
    pub lockdowns: LockdownRegistry,
    /// While set, only administrators may run commands.
    pub maintenance: bool,
}

/// Shared handle.  Spawned expiry tasks hold their own clone.
pub type SharedVolatileState = Arc<RwLock<VolatileState>>;

impl VolatileState {
    pub fn new() -> Self {
        Self {
            autoresponders: TriggerTable::new(),
            custom_commands: TriggerTable::new(),
            mutes: MuteRegistry::new(),
            afk: AfkRegistry::new(),
            voice_roles: VoiceRoleRegistry::new(),
            reply_autoroles: ReplyAutoroleRegistry::new(),
            lockdowns: LockdownRegistry::new(),
            maintenance: false,
        }
    }

    pub fn shared(self) -> SharedVolatileState {
        Arc::new(RwLock::new(self))
    }
}
