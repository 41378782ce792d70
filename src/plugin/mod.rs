pub use crate::context::Context;
use crate::{
    command::ModuleSpec,
    event::{Event, EventHandled},
};
use anyhow::Result;

mod afk;
mod autoresponder;
mod custom_command;
mod debug;
mod emergency;
mod help;
mod ignore_bots;
mod moderation;
mod reply_autorole;
mod utility;

#[serenity::async_trait]
pub trait Plugin: Sync + Send {
    /// Plugin name.  Used for debug
    fn name(&self) -> &'static str;
    /// Commands this plugin answers to, if any.  Drives both dispatch and help.
    fn module(&self) -> Option<&'static ModuleSpec> {
        None
    }
    /// Potentially handle event.  Returns:
    /// - Ok(EventHandled::Yes) if the event has been handled and no other plugin should attempt to
    ///   handle it
    /// - Ok(EventHandled::No) if another plugin should attempt to handle the event
    /// - Err if an error occurred
    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled>;
}

/// Ordered list of available plugins
pub fn plugins() -> Vec<Box<dyn Plugin>> {
    vec![
        // Core bot operations
        Box::new(debug::Debug),
        Box::new(ignore_bots::IgnoreBots),
        // Listeners which see every message, commands included
        Box::new(afk::AfkListener),
        Box::new(reply_autorole::ReplyAutoroleListener),
        // Built-in commands
        Box::new(moderation::Moderation),
        Box::new(utility::Utility),
        Box::new(emergency::Emergency),
        Box::new(autoresponder::Autoresponders),
        Box::new(custom_command::CustomCommands),
        Box::new(help::Help),
        // User-defined commands, only once no built-in claimed the message
        Box::new(custom_command::CustomCommandListener),
        // Unprefixed messages.  Keep last.
        Box::new(autoresponder::AutoresponderListener),
    ]
}

/// Modules of every plugin that declares commands, in plugin order.
pub fn modules() -> Vec<&'static ModuleSpec> {
    plugins().iter().filter_map(|plugin| plugin.module()).collect()
}

/// Top-level names and aliases of all built-in commands.
pub fn builtin_command_names() -> Vec<&'static str> {
    modules()
        .into_iter()
        .flat_map(|module| module.commands)
        .flat_map(|cmd| std::iter::once(cmd.name).chain(cmd.aliases.iter().copied()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn builtin_names_are_unique() {
        let names = builtin_command_names();
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(names.len(), unique.len(), "{names:?}");
    }

    #[test]
    fn every_module_is_listed_once() {
        let names: Vec<_> = modules().iter().map(|module| module.name).collect();
        assert_eq!(
            names,
            [
                "Moderation",
                "Utility",
                "Emergency",
                "Autoresponders",
                "CustomCommands",
                "Help"
            ]
        );
    }

    #[test]
    fn builtins_include_help_alias() {
        let names = builtin_command_names();
        assert!(names.contains(&"advhelp"));
        assert!(names.contains(&"help"));
        assert!(names.contains(&"customcmd"));
    }
}
