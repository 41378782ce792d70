use crate::{
    command::{ArgKind, ArgSpec, Args, CommandSpec, ModuleSpec, Tokens, NO_PERMISSIONS},
    error::BotError,
    event::*,
    log_internal,
    logging::*,
    plugin::*,
    trigger::{TriggerEntry, TriggerTable},
};
use anyhow::{bail, Result};
use serenity::all::{CreateEmbed, CreateMessage, Message, Permissions};

const MANAGE_GUILD: Permissions = Permissions::MANAGE_GUILD;
const LIST_COLOR: u32 = 0x9B59B6;

const NAME: ArgSpec = ArgSpec {
    name: "name",
    kind: ArgKind::Word,
    required: true,
};
const KIND: ArgSpec = ArgSpec {
    name: "type",
    kind: ArgKind::Word,
    required: true,
};
const CONTENT: ArgSpec = ArgSpec {
    name: "content",
    kind: ArgKind::Text,
    required: true,
};

static MODULE: ModuleSpec = ModuleSpec {
    name: "CustomCommands",
    description: "Server-defined commands that answer with canned text, embeds or images.",
    commands: &[CommandSpec {
        name: "customcmd",
        aliases: &[],
        help: "Manages custom commands.",
        args: &[],
        permissions: MANAGE_GUILD,
        subcommands: &[
            CommandSpec {
                name: "create",
                aliases: &[],
                help: "Creates a new custom command.\n\
                       Type is `text`, `embed` or `image`. Embeds accept `--title \"Title\"` and \
                       `--color #RRGGBB` after the content.",
                args: &[NAME, KIND, CONTENT],
                permissions: NO_PERMISSIONS,
                subcommands: &[],
            },
            CommandSpec {
                name: "edit",
                aliases: &[],
                help: "Replaces the content of a custom command.",
                args: &[NAME, CONTENT],
                permissions: NO_PERMISSIONS,
                subcommands: &[],
            },
            CommandSpec {
                name: "delete",
                aliases: &[],
                help: "Deletes a custom command.",
                args: &[NAME],
                permissions: NO_PERMISSIONS,
                subcommands: &[],
            },
            CommandSpec {
                name: "list",
                aliases: &[],
                help: "Lists all custom commands.",
                args: &[],
                permissions: NO_PERMISSIONS,
                subcommands: &[],
            },
        ],
    }],
};

/// Management commands for custom commands
pub struct CustomCommands;

#[serenity::async_trait]
impl Plugin for CustomCommands {
    fn name(&self) -> &'static str {
        "custom_commands"
    }

    fn module(&self) -> Option<&'static ModuleSpec> {
        Some(&MODULE)
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some((msg, invocation)) = event.bot_cmd(ctx, &MODULE).await? else {
            return Ok(EventHandled::No);
        };
        let args = &invocation.args;

        match invocation.name().as_str() {
            "customcmd create" => create(ctx, msg, args).await?,
            "customcmd edit" => edit(ctx, msg, args).await?,
            "customcmd delete" => delete(ctx, msg, args).await?,
            "customcmd list" => list(ctx, msg).await?,
            other => bail!("CustomCommands has no handler for `{}`", other),
        }

        Ok(EventHandled::Yes)
    }
}

/// A custom command may not shadow a built-in command, or it could never be invoked.
fn check_name(name: &str) -> Result<(), BotError> {
    let name = name.trim().to_lowercase();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(BotError::Refused(
            "Custom command names must be a single word.".into(),
        ));
    }
    if builtin_command_names().contains(&name.as_str()) {
        return Err(BotError::ReservedName(name));
    }
    Ok(())
}

async fn create(ctx: &Context<'_>, msg: &Message, args: &Args) -> Result<()> {
    let name = args.word("name")?;
    check_name(name)?;

    let entry = ctx
        .vstate
        .write()
        .await
        .custom_commands
        .create(
            name,
            args.word("type")?,
            args.text("content").unwrap_or_default(),
        )?
        .clone();
    log_internal!(
        "{} created custom command `{}` ({})",
        msg.author.color(),
        entry.trigger,
        entry.kind
    );

    msg.channel_id
        .say(
            ctx.http,
            format!(
                "\u{2705} Custom command `{}` created successfully!",
                entry.trigger
            ),
        )
        .await?;
    Ok(())
}

async fn edit(ctx: &Context<'_>, msg: &Message, args: &Args) -> Result<()> {
    let name = ctx
        .vstate
        .write()
        .await
        .custom_commands
        .edit(args.word("name")?, args.text("content").unwrap_or_default())?
        .trigger
        .clone();
    log_internal!("{} edited custom command `{}`", msg.author.color(), name);

    msg.channel_id
        .say(
            ctx.http,
            format!("\u{2705} Custom command `{}` updated successfully!", name),
        )
        .await?;
    Ok(())
}

async fn delete(ctx: &Context<'_>, msg: &Message, args: &Args) -> Result<()> {
    let removed = ctx
        .vstate
        .write()
        .await
        .custom_commands
        .delete(args.word("name")?)?;
    log_internal!(
        "{} deleted custom command `{}`",
        msg.author.color(),
        removed.trigger
    );

    msg.channel_id
        .say(
            ctx.http,
            format!(
                "\u{2705} Custom command `{}` deleted successfully.",
                removed.trigger
            ),
        )
        .await?;
    Ok(())
}

async fn list(ctx: &Context<'_>, msg: &Message) -> Result<()> {
    let fields: Vec<_> = ctx
        .vstate
        .read()
        .await
        .custom_commands
        .list()
        .map(|entry| {
            (
                format!("`{}`", entry.trigger),
                format!("Type: `{}`", entry.kind),
                true,
            )
        })
        .collect();

    if fields.is_empty() {
        msg.channel_id
            .say(ctx.http, "No custom commands have been created yet.")
            .await?;
        return Ok(());
    }

    let embed = CreateEmbed::new()
        .title("Custom Commands")
        .description("Here are the custom commands configured for this server:")
        .color(LIST_COLOR)
        .fields(fields);
    msg.channel_id
        .send_message(ctx.cache_http, CreateMessage::new().embed(embed))
        .await?;
    Ok(())
}

/// Answers `<prefix><name>` for user-defined commands.  Runs after every built-in had its chance.
pub struct CustomCommandListener;

#[serenity::async_trait]
impl Plugin for CustomCommandListener {
    fn name(&self) -> &'static str {
        "custom_command_listener"
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some((msg, line)) = event.prefixed(ctx).await else {
            return Ok(EventHandled::No);
        };
        let entry = invoked(&ctx.vstate.read().await.custom_commands, line).cloned();
        let Some(entry) = entry else {
            return Ok(EventHandled::No);
        };

        log_internal!(
            "Custom command `{}` invoked by {}",
            entry.trigger,
            msg.author.color()
        );
        super::autoresponder::send_response(ctx, msg, &entry).await?;
        Ok(EventHandled::Yes)
    }
}

/// Custom command named by the first word after the prefix.  Match modes only apply to
/// autoresponders, so this is always an exact lookup.
fn invoked<'t>(table: &'t TriggerTable, line: &str) -> Option<&'t TriggerEntry> {
    table.get(Tokens::new(line).next()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TriggerTable {
        let mut table = TriggerTable::new();
        table
            .create("hello", "text", "Hi {user}! --match contains")
            .unwrap();
        table
    }

    #[test]
    fn first_word_selects_the_command() {
        let table = table();
        assert_eq!(invoked(&table, "hello world").unwrap().trigger, "hello");
        assert_eq!(invoked(&table, "HELLO").unwrap().trigger, "hello");
    }

    #[test]
    fn match_mode_is_ignored() {
        let table = table();
        assert!(invoked(&table, "say hello").is_none());
        assert!(invoked(&table, "hellothere").is_none());
        assert!(invoked(&table, "").is_none());
    }

    #[test]
    fn builtin_names_are_reserved() {
        assert_eq!(
            check_name("Kick"),
            Err(BotError::ReservedName("kick".to_owned()))
        );
        assert_eq!(
            check_name("help"),
            Err(BotError::ReservedName("help".to_owned()))
        );
    }

    #[test]
    fn fresh_names_are_accepted() {
        assert_eq!(check_name("welcome"), Ok(()));
    }

    #[test]
    fn names_must_be_one_word() {
        assert!(matches!(
            check_name("two words"),
            Err(BotError::Refused(_))
        ));
    }
}
