//! Help pages generated from the declared command graph.
//!
//! Pages are plain data; `plugin::help` turns them into embeds.

use crate::{
    command::{qualified_name, required_permissions, signature, CommandSpec, ModuleSpec, Tokens},
    error::BotError,
};

pub struct HelpPage {
    pub title: String,
    pub description: String,
    /// (name, value) pairs, in display order
    pub fields: Vec<(String, String)>,
}

/// What a help query refers to.
pub enum HelpTarget {
    Overview,
    Command(Vec<&'static CommandSpec>),
    Module(&'static ModuleSpec),
}

/// Canned usage examples, keyed by qualified command name.  `{prefix}` is substituted on display.
const EXAMPLES: &[(&str, &[&str])] = &[
    (
        "kick",
        &[
            "**Kick with a reason:** `{prefix}kick @User Spamming in general`",
            "**Kick without a reason:** `{prefix}kick @User`",
        ],
    ),
    (
        "ban",
        &["**Ban for rule breaking:** `{prefix}ban @User Rule breaking`"],
    ),
    (
        "warn",
        &["**Warn a member:** `{prefix}warn @User Please keep it civil`"],
    ),
    (
        "mute",
        &[
            "**Mute for 30 minutes:** `{prefix}mute @User 30m Excessive chat`",
            "**Mute for 1 hour:** `{prefix}mute @User 1h`",
            "**Mute indefinitely:** `{prefix}mute @User No reason`",
        ],
    ),
    (
        "unmute",
        &[
            "**Unmute a member:** `{prefix}unmute @User`",
            "**Unmute with a note:** `{prefix}unmute @User Mute expired`",
        ],
    ),
    (
        "tempban",
        &[
            "**Ban for 1 day:** `{prefix}tempban @User 1d Spam`",
            "**Ban for 3 hours:** `{prefix}tempban @User 3h`",
        ],
    ),
    (
        "trial",
        &[
            "**Start a trial:** `{prefix}trial add @NewMember Starting trial period`",
            "**End a trial:** `{prefix}trial remove @OldMember Trial ended`",
        ],
    ),
    (
        "manageperms",
        &[
            "**Stop a member talking in #general:** `{prefix}manageperms @User #general disable`",
            "**Let them talk again:** `{prefix}manageperms @User #general enable`",
        ],
    ),
    (
        "manageroles",
        &[
            "**Give a role:** `{prefix}manageroles give @User Member Role`",
            "**Remove a role:** `{prefix}manageroles remove @User @OldRole`",
        ],
    ),
    (
        "autorole reply create",
        &["**Create:** `{prefix}autorole reply create \"Staff\" @StaffRole`"],
    ),
    (
        "autorole reply edit",
        &["**Edit:** `{prefix}autorole reply edit \"Staff\" @NewStaffRole`"],
    ),
    (
        "autorole reply delete",
        &["**Delete:** `{prefix}autorole reply delete \"Staff\"`"],
    ),
    (
        "autorole reply list",
        &["**List:** `{prefix}autorole reply list`"],
    ),
    (
        "autorole reply test",
        &["**Test:** `{prefix}autorole reply test \"Staff\"`"],
    ),
    (
        "serverlock",
        &["**Lock the server during a raid:** `{prefix}serverlock Raid detected`"],
    ),
    ("serverunlock", &["**Unlock the server:** `{prefix}serverunlock`"]),
    (
        "afk",
        &[
            "**Go AFK with a reason:** `{prefix}afk Taking a quick break`",
            "**Go AFK without a reason:** `{prefix}afk`",
            "**Come back:** send any message.",
        ],
    ),
    (
        "maintenance",
        &["**Toggle maintenance mode:** `{prefix}maintenance`"],
    ),
    (
        "voicerole setup",
        &["**Set the voice role:** `{prefix}voicerole setup @InVoice`"],
    ),
    ("voicerole enable", &["**Enable:** `{prefix}voicerole enable`"]),
    ("voicerole disable", &["**Disable:** `{prefix}voicerole disable`"]),
    (
        "customcmd create",
        &[
            "**Text command:** `{prefix}customcmd create welcome text \"Welcome, {user}!\"`",
            "**Embed command:** `{prefix}customcmd create rules embed \"Check {channel:rules}!\" --title \"Server Rules\" --color #FF0000`",
        ],
    ),
    (
        "customcmd edit",
        &["**Edit:** `{prefix}customcmd edit welcome \"Welcome to {server}!\"`"],
    ),
    ("customcmd delete", &["**Delete:** `{prefix}customcmd delete welcome`"]),
    ("customcmd list", &["**List:** `{prefix}customcmd list`"]),
    (
        "autoresponder create",
        &[
            "**Text reply:** `{prefix}autoresponder create \"hello\" text \"Hi there!\"`",
            "**Embed reply:** `{prefix}autoresponder create \"rules?\" embed \"Check {channel:rules}!\" --title \"Rules\" --color #FF0000`",
            "**Exact match only:** `{prefix}autoresponder create gm text \"Good morning!\" --match exact`",
        ],
    ),
    (
        "autoresponder edit",
        &["**Edit:** `{prefix}autoresponder edit \"hello\" \"Hello, {user}! How can I help?\"`"],
    ),
    (
        "autoresponder delete",
        &["**Delete:** `{prefix}autoresponder delete \"rules?\"`"],
    ),
    ("autoresponder list", &["**List:** `{prefix}autoresponder list`"]),
    (
        "advhelp",
        &[
            "**All modules:** `{prefix}advhelp`",
            "**One module:** `{prefix}advhelp Moderation`",
            "**One command:** `{prefix}advhelp autorole reply create`",
        ],
    ),
];

pub fn examples(qualified: &str, prefix: &str) -> Vec<String> {
    EXAMPLES
        .iter()
        .find(|(name, _)| *name == qualified)
        .map(|(_, lines)| lines.iter().map(|line| line.replace("{prefix}", prefix)).collect())
        .unwrap_or_default()
}

fn answers_to(cmd: &CommandSpec, name: &str) -> bool {
    cmd.name == name || cmd.aliases.iter().any(|alias| *alias == name)
}

/// Resolve a full command path such as `autorole reply create`.  Every word must be used.
fn find_command(
    modules: &[&'static ModuleSpec],
    query: &str,
) -> Option<Vec<&'static CommandSpec>> {
    let query = query.to_lowercase();
    let mut tokens = Tokens::new(&query);
    let first = tokens.next()?;

    let mut cmd = modules
        .iter()
        .flat_map(|module| module.commands)
        .find(|cmd| answers_to(cmd, first))?;
    let mut path = vec![cmd];

    for name in tokens {
        cmd = cmd.subcommands.iter().find(|sub| answers_to(sub, name))?;
        path.push(cmd);
    }

    Some(path)
}

pub fn lookup(
    modules: &[&'static ModuleSpec],
    query: Option<&str>,
) -> Result<HelpTarget, BotError> {
    let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) else {
        return Ok(HelpTarget::Overview);
    };

    if let Some(path) = find_command(modules, query) {
        return Ok(HelpTarget::Command(path));
    }

    modules
        .iter()
        .find(|module| module.name.eq_ignore_ascii_case(query))
        .map(|module| HelpTarget::Module(*module))
        .ok_or_else(|| BotError::NotFound(format!("Command or module `{}`", query)))
}

pub fn overview(modules: &[&'static ModuleSpec], prefix: &str) -> HelpPage {
    let mut sorted: Vec<_> = modules.to_vec();
    sorted.sort_by_key(|module| module.name);

    HelpPage {
        title: "Wardbot // Help".to_owned(),
        description: format!(
            "Pick a module for its commands, or a command for its details: `{}advhelp <module or command>`",
            prefix
        ),
        fields: sorted
            .iter()
            .map(|module| (module.name.to_owned(), module.description.to_owned()))
            .collect(),
    }
}

pub fn command_page(path: &[&'static CommandSpec], prefix: &str) -> HelpPage {
    let qualified = qualified_name(path);
    let Some(cmd) = path.last() else {
        return HelpPage {
            title: "Command".to_owned(),
            description: String::new(),
            fields: Vec::new(),
        };
    };

    let mut fields = vec![(
        "Syntax".to_owned(),
        format!("`{}{}`", prefix, signature(path)),
    )];

    let examples = examples(&qualified, prefix);
    if !examples.is_empty() {
        fields.push(("Examples".to_owned(), examples.join("\n")));
    }

    if cmd.is_group() {
        let subcommands: Vec<_> = cmd
            .subcommands
            .iter()
            .map(|sub| format!("`{}` - {}", sub.name, sub.help))
            .collect();
        fields.push(("Subcommands".to_owned(), subcommands.join("\n")));
    }

    if !cmd.aliases.is_empty() {
        let aliases: Vec<_> = cmd.aliases.iter().map(|a| format!("`{}`", a)).collect();
        fields.push(("Aliases".to_owned(), aliases.join(", ")));
    }

    let permissions = required_permissions(path).get_permission_names();
    fields.push((
        "Required permissions".to_owned(),
        if permissions.is_empty() {
            "None".to_owned()
        } else {
            permissions.join(", ")
        },
    ));

    HelpPage {
        title: format!("Command: {}", qualified),
        description: cmd.help.to_owned(),
        fields,
    }
}

/// Every invocable command under `cmd`, groups expanded into their subcommands.
fn leaves(
    path: Vec<&'static CommandSpec>,
    cmd: &'static CommandSpec,
    out: &mut Vec<Vec<&'static CommandSpec>>,
) {
    let mut path = path;
    path.push(cmd);
    if cmd.is_group() {
        for sub in cmd.subcommands {
            leaves(path.clone(), sub, out);
        }
    } else {
        out.push(path);
    }
}

pub fn module_page(module: &'static ModuleSpec, prefix: &str) -> HelpPage {
    let mut paths = Vec::new();
    for cmd in module.commands {
        leaves(Vec::new(), cmd, &mut paths);
    }

    let fields = paths
        .iter()
        .map(|path| {
            let help = path.last().map(|cmd| cmd.help).unwrap_or_default();
            let first_line = help.lines().next().unwrap_or_default();
            (
                qualified_name(path).to_uppercase(),
                format!("{}\nSyntax: `{}{}`", first_line, prefix, signature(path)),
            )
        })
        .collect();

    HelpPage {
        title: format!("Module: {}", module.name),
        description: module.description.to_owned(),
        fields,
    }
}
