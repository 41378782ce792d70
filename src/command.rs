//! Prefixed text commands.
//!
//! Every command a plugin answers to is declared up front as a static [`CommandSpec`], grouped per
//! plugin into a [`ModuleSpec`].  The same declarations drive dispatch (name and alias lookup,
//! permission checks, argument parsing) and the help pages.

use crate::{duration::parse_duration, error::BotError};
use serenity::all::{ChannelId, Permissions, RoleId, UserId};
use std::{collections::HashMap, time::Duration};

/// No permission required.
pub const NO_PERMISSIONS: Permissions = Permissions::empty();

#[derive(Debug)]
pub struct ModuleSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub commands: &'static [CommandSpec],
}

#[derive(Debug)]
pub struct CommandSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub help: &'static str,
    pub args: &'static [ArgSpec],
    /// Required of the author.  Permissions declared on a group apply to all of its subcommands.
    pub permissions: Permissions,
    /// A command with subcommands is a group and cannot be invoked on its own.
    pub subcommands: &'static [CommandSpec],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgKind {
    /// `<@id>`, `<@!id>` or a raw id
    Member,
    /// `<#id>` or a raw id
    Channel,
    /// `<@&id>`, a raw id, or a role name (which takes the rest of the line)
    Role,
    /// A single word or a double-quoted string
    Word,
    /// One of a fixed set of words, case-insensitive
    Choice(&'static [&'static str]),
    /// e.g. `30m`
    Duration,
    /// Everything left on the line
    Text,
}

#[derive(Debug)]
pub struct ArgSpec {
    pub name: &'static str,
    pub kind: ArgKind,
    pub required: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoleRef {
    Id(RoleId),
    Name(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum ArgValue {
    Member(UserId),
    Channel(ChannelId),
    Role(RoleRef),
    Word(String),
    Duration(Duration),
    Text(String),
}

/// Parsed positional arguments of one invocation.
#[derive(Debug)]
pub struct Args {
    values: HashMap<&'static str, ArgValue>,
    usage: String,
}

/// A command resolved from a message, with its arguments parsed.
pub struct Invocation {
    pub path: Vec<&'static CommandSpec>,
    pub args: Args,
}

/// Splits a command line into words.  A double-quoted string is one word, without its quotes.
#[derive(Clone)]
pub struct Tokens<'a> {
    rest: &'a str,
}

impl<'a> Tokens<'a> {
    pub fn new(line: &'a str) -> Self {
        Self { rest: line }
    }

    /// Unconsumed remainder, verbatim apart from surrounding whitespace.
    pub fn rest(&self) -> &'a str {
        self.rest.trim()
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let s = self.rest.trim_start();
        if s.is_empty() {
            self.rest = s;
            return None;
        }

        if let Some(quoted) = s.strip_prefix('"') {
            if let Some(end) = quoted.find('"') {
                self.rest = &quoted[end + 1..];
                return Some(&quoted[..end]);
            }
        }

        let end = s.find(char::is_whitespace).unwrap_or(s.len());
        self.rest = &s[end..];
        Some(&s[..end])
    }
}

fn parse_id(s: &str) -> Option<u64> {
    s.parse::<u64>().ok().filter(|id| *id != 0)
}

fn strip_mention<'a>(token: &'a str, open: &str) -> Option<&'a str> {
    token.strip_prefix(open)?.strip_suffix('>')
}

pub fn parse_member(token: &str) -> Option<UserId> {
    let id = match strip_mention(token, "<@") {
        Some(inner) => inner.strip_prefix('!').unwrap_or(inner),
        None => token,
    };
    parse_id(id).map(UserId::new)
}

pub fn parse_channel(token: &str) -> Option<ChannelId> {
    parse_id(strip_mention(token, "<#").unwrap_or(token)).map(ChannelId::new)
}

pub fn parse_role_id(token: &str) -> Option<RoleId> {
    parse_id(strip_mention(token, "<@&").unwrap_or(token)).map(RoleId::new)
}

/// Remove the first matching prefix, ignoring case.
pub fn strip_prefix<'a>(content: &'a str, prefixes: &[String]) -> Option<&'a str> {
    prefixes.iter().find_map(|prefix| {
        let head = content.get(..prefix.len())?;
        head.eq_ignore_ascii_case(prefix)
            .then(|| content[prefix.len()..].trim_start())
    })
}

fn find<'s>(commands: &'s [CommandSpec], token: &str) -> Option<&'s CommandSpec> {
    let token = token.to_lowercase();
    commands
        .iter()
        .find(|cmd| cmd.name == token || cmd.aliases.contains(&token.as_str()))
}

/// Space-separated names along a command path, e.g. `autorole reply create`.
pub fn qualified_name(path: &[&CommandSpec]) -> String {
    path.iter().map(|cmd| cmd.name).collect::<Vec<_>>().join(" ")
}

/// Union of the permissions declared along a command path.
pub fn required_permissions(path: &[&CommandSpec]) -> Permissions {
    path.iter()
        .fold(Permissions::empty(), |acc, cmd| acc | cmd.permissions)
}

impl ArgSpec {
    fn placeholder(&self) -> String {
        let inner = match self.kind {
            ArgKind::Choice(choices) => choices.join("|"),
            _ => self.name.to_owned(),
        };
        if self.required {
            format!("<{}>", inner)
        } else {
            format!("[{}]", inner)
        }
    }

    fn expected(&self) -> &'static str {
        match self.kind {
            ArgKind::Member => "a member mention or ID",
            ArgKind::Channel => "a channel mention or ID",
            ArgKind::Role => "a role mention, ID, or name",
            ArgKind::Word => "a word or a \"quoted phrase\"",
            ArgKind::Choice(_) => "one of the listed options",
            ArgKind::Duration => "a duration such as `30m`",
            ArgKind::Text => "some text",
        }
    }
}

impl CommandSpec {
    pub fn is_group(&self) -> bool {
        !self.subcommands.is_empty()
    }

    /// Argument synopsis, e.g. `<member> [duration] [reason]`, or `<a|b>` for a group.
    pub fn arg_signature(&self) -> String {
        if self.is_group() {
            let names: Vec<_> = self.subcommands.iter().map(|sub| sub.name).collect();
            return format!("<{}>", names.join("|"));
        }
        self.args
            .iter()
            .map(ArgSpec::placeholder)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Full synopsis of the command at the end of `path`, e.g. `mute <member> [duration] [reason]`.
pub fn signature(path: &[&CommandSpec]) -> String {
    let name = qualified_name(path);
    match path.last().map(|cmd| cmd.arg_signature()) {
        Some(args) if !args.is_empty() => format!("{} {}", name, args),
        _ => name,
    }
}

/// Find the command named by `line` (prefix already stripped) within `module`.
///
/// `Ok(None)` means the line does not name one of this module's commands.
pub fn resolve(
    module: &'static ModuleSpec,
    line: &str,
) -> Result<Option<(Vec<&'static CommandSpec>, String)>, BotError> {
    let mut tokens = Tokens::new(line);
    let Some(mut cmd) = tokens.next().and_then(|name| find(module.commands, name)) else {
        return Ok(None);
    };
    let mut path = vec![cmd];

    while cmd.is_group() {
        let mut lookahead = tokens.clone();
        match lookahead.next().and_then(|name| find(cmd.subcommands, name)) {
            Some(sub) => {
                tokens = lookahead;
                cmd = sub;
                path.push(sub);
            }
            None => {
                let choices: Vec<_> = cmd
                    .subcommands
                    .iter()
                    .map(|sub| format!("`{}`", sub.name))
                    .collect();
                return Err(BotError::MissingSubcommand {
                    group: qualified_name(&path),
                    choices: choices.join(", "),
                });
            }
        }
    }

    Ok(Some((path, tokens.rest().to_owned())))
}

/// Administrators pass every check.
pub fn check_permissions(required: Permissions, granted: Permissions) -> Result<(), BotError> {
    if granted.administrator() || granted.contains(required) {
        return Ok(());
    }
    let missing = required.difference(granted);
    Err(BotError::PermissionDenied(
        missing.get_permission_names().join(", "),
    ))
}

impl Args {
    /// Parse `line` against the positional arguments of the command at the end of `path`.
    pub fn parse(path: &[&CommandSpec], line: &str) -> Result<Self, BotError> {
        let usage = signature(path);
        let specs = path.last().map(|cmd| cmd.args).unwrap_or_default();
        let mut tokens = Tokens::new(line);
        let mut values = HashMap::new();

        let bad = |spec: &ArgSpec| BotError::BadArgument {
            name: spec.name,
            expected: spec.expected(),
            usage: usage.clone(),
        };

        for spec in specs {
            let value = match spec.kind {
                ArgKind::Text => {
                    let text = tokens.rest();
                    tokens = Tokens::new("");
                    (!text.is_empty()).then(|| ArgValue::Text(text.to_owned()))
                }
                ArgKind::Role => {
                    let mut lookahead = tokens.clone();
                    match lookahead.next() {
                        Some(token) => match parse_role_id(token) {
                            Some(role_id) => {
                                tokens = lookahead;
                                Some(ArgValue::Role(RoleRef::Id(role_id)))
                            }
                            None => {
                                let name = tokens.rest();
                                let name = name
                                    .strip_prefix('"')
                                    .and_then(|n| n.strip_suffix('"'))
                                    .unwrap_or(name);
                                tokens = Tokens::new("");
                                Some(ArgValue::Role(RoleRef::Name(name.to_owned())))
                            }
                        },
                        None => None,
                    }
                }
                ArgKind::Duration => {
                    let mut lookahead = tokens.clone();
                    match lookahead.next() {
                        Some(token)
                            if spec.required
                                || token.starts_with(|c: char| c.is_ascii_digit()) =>
                        {
                            tokens = lookahead;
                            Some(ArgValue::Duration(parse_duration(token)?))
                        }
                        _ => None,
                    }
                }
                kind => {
                    let mut lookahead = tokens.clone();
                    let parsed = lookahead.next().map(|token| match kind {
                        ArgKind::Member => parse_member(token).map(ArgValue::Member),
                        ArgKind::Channel => parse_channel(token).map(ArgValue::Channel),
                        ArgKind::Choice(choices) => {
                            let token = token.to_lowercase();
                            choices
                                .contains(&token.as_str())
                                .then_some(ArgValue::Word(token))
                        }
                        _ => Some(ArgValue::Word(token.to_owned())),
                    });
                    match parsed {
                        Some(Some(value)) => {
                            tokens = lookahead;
                            Some(value)
                        }
                        Some(None) if spec.required => return Err(bad(spec)),
                        _ => None,
                    }
                }
            };

            match value {
                Some(value) => {
                    values.insert(spec.name, value);
                }
                None if spec.required => return Err(bad(spec)),
                None => {}
            }
        }

        Ok(Self { values, usage })
    }

    fn missing(&self, name: &'static str) -> BotError {
        BotError::BadArgument {
            name,
            expected: "a value",
            usage: self.usage.clone(),
        }
    }

    pub fn member(&self, name: &'static str) -> Result<UserId, BotError> {
        match self.values.get(name) {
            Some(ArgValue::Member(user_id)) => Ok(*user_id),
            _ => Err(self.missing(name)),
        }
    }

    pub fn channel(&self, name: &'static str) -> Result<ChannelId, BotError> {
        match self.values.get(name) {
            Some(ArgValue::Channel(channel_id)) => Ok(*channel_id),
            _ => Err(self.missing(name)),
        }
    }

    pub fn role(&self, name: &'static str) -> Result<&RoleRef, BotError> {
        match self.values.get(name) {
            Some(ArgValue::Role(role)) => Ok(role),
            _ => Err(self.missing(name)),
        }
    }

    pub fn word(&self, name: &'static str) -> Result<&str, BotError> {
        match self.values.get(name) {
            Some(ArgValue::Word(word)) => Ok(word),
            _ => Err(self.missing(name)),
        }
    }

    pub fn duration(&self, name: &'static str) -> Option<Duration> {
        match self.values.get(name) {
            Some(ArgValue::Duration(duration)) => Some(*duration),
            _ => None,
        }
    }

    pub fn text(&self, name: &'static str) -> Option<&str> {
        match self.values.get(name) {
            Some(ArgValue::Text(text)) => Some(text),
            _ => None,
        }
    }
}

impl Invocation {
    pub fn name(&self) -> String {
        qualified_name(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMBER: ArgSpec = ArgSpec {
        name: "member",
        kind: ArgKind::Member,
        required: true,
    };
    const DURATION: ArgSpec = ArgSpec {
        name: "duration",
        kind: ArgKind::Duration,
        required: false,
    };
    const REASON: ArgSpec = ArgSpec {
        name: "reason",
        kind: ArgKind::Text,
        required: false,
    };
    const MANAGE_ROLES: Permissions = Permissions::MANAGE_ROLES;
    const KICK: Permissions = Permissions::KICK_MEMBERS;

    static TEST_MODULE: ModuleSpec = ModuleSpec {
        name: "Test",
        description: "Commands for tests",
        commands: &[
            CommandSpec {
                name: "mute",
                aliases: &["silence"],
                help: "Mute a member",
                args: &[MEMBER, DURATION, REASON],
                permissions: MANAGE_ROLES,
                subcommands: &[],
            },
            CommandSpec {
                name: "autorole",
                aliases: &[],
                help: "Automatic roles",
                args: &[],
                permissions: MANAGE_ROLES,
                subcommands: &[CommandSpec {
                    name: "reply",
                    aliases: &[],
                    help: "Roles granted by replying",
                    args: &[],
                    permissions: NO_PERMISSIONS,
                    subcommands: &[
                        CommandSpec {
                            name: "create",
                            aliases: &["add"],
                            help: "Create a reply autorole",
                            args: &[
                                ArgSpec {
                                    name: "word",
                                    kind: ArgKind::Word,
                                    required: true,
                                },
                                ArgSpec {
                                    name: "role",
                                    kind: ArgKind::Role,
                                    required: true,
                                },
                            ],
                            permissions: KICK,
                            subcommands: &[],
                        },
                        CommandSpec {
                            name: "list",
                            aliases: &[],
                            help: "List reply autoroles",
                            args: &[],
                            permissions: NO_PERMISSIONS,
                            subcommands: &[],
                        },
                    ],
                }],
            },
            CommandSpec {
                name: "trial",
                aliases: &[],
                help: "Trial role",
                args: &[
                    ArgSpec {
                        name: "action",
                        kind: ArgKind::Choice(&["add", "remove"]),
                        required: true,
                    },
                    MEMBER,
                ],
                permissions: MANAGE_ROLES,
                subcommands: &[],
            },
        ],
    };

    fn resolve_ok(line: &str) -> (Vec<&'static CommandSpec>, String) {
        resolve(&TEST_MODULE, line).unwrap().unwrap()
    }

    fn parse(line: &str) -> Result<Args, BotError> {
        let (path, rest) = resolve_ok(line);
        Args::parse(&path, &rest)
    }

    #[test]
    fn tokens_respect_quotes() {
        let tokens: Vec<_> = Tokens::new(r#" "good morning"  text  hi there "#).collect();
        assert_eq!(tokens, ["good morning", "text", "hi", "there"]);

        let mut tokens = Tokens::new(r#""good morning" text Hi "{user}"!"#);
        tokens.next();
        tokens.next();
        assert_eq!(tokens.rest(), r#"Hi "{user}"!"#);
    }

    #[test]
    fn unterminated_quote_is_a_plain_word() {
        let tokens: Vec<_> = Tokens::new(r#""oops there"#).collect();
        assert_eq!(tokens, [r#""oops"#, "there"]);
    }

    #[test]
    fn mentions_and_raw_ids() {
        assert_eq!(parse_member("<@42>"), Some(UserId::new(42)));
        assert_eq!(parse_member("<@!42>"), Some(UserId::new(42)));
        assert_eq!(parse_member("42"), Some(UserId::new(42)));
        assert_eq!(parse_member("<@&42>"), None);
        assert_eq!(parse_member("0"), None);
        assert_eq!(parse_member("bob"), None);
        assert_eq!(parse_channel("<#7>"), Some(ChannelId::new(7)));
        assert_eq!(parse_role_id("<@&9>"), Some(RoleId::new(9)));
        assert_eq!(parse_role_id("Muted"), None);
    }

    #[test]
    fn prefix_is_case_insensitive() {
        let prefixes = vec!["XTRM ".to_owned(), "xtrm ".to_owned(), "!".to_owned()];
        assert_eq!(strip_prefix("xTrM mute <@1>", &prefixes), Some("mute <@1>"));
        assert_eq!(strip_prefix("!ping", &prefixes), Some("ping"));
        assert_eq!(strip_prefix("hello xtrm", &prefixes), None);
        assert_eq!(strip_prefix("x", &prefixes), None);
        // Multi-byte text shorter than or straddling a prefix must not panic.
        assert_eq!(strip_prefix("héllo world", &prefixes), None);
    }

    #[test]
    fn resolves_names_and_aliases() {
        let (path, rest) = resolve_ok("SILENCE <@1> 10m spamming");
        assert_eq!(qualified_name(&path), "mute");
        assert_eq!(rest, "<@1> 10m spamming");
        assert!(resolve(&TEST_MODULE, "kick <@1>").unwrap().is_none());
        assert!(resolve(&TEST_MODULE, "").unwrap().is_none());
    }

    #[test]
    fn descends_into_subcommands() {
        let (path, rest) = resolve_ok(r#"autorole reply add "staff" Moderators"#);
        assert_eq!(qualified_name(&path), "autorole reply create");
        assert_eq!(rest, r#""staff" Moderators"#);
    }

    #[test]
    fn bare_group_needs_subcommand() {
        let err = resolve(&TEST_MODULE, "autorole reply").unwrap_err();
        assert_eq!(
            err,
            BotError::MissingSubcommand {
                group: "autorole reply".into(),
                choices: "`create`, `list`".into(),
            }
        );
        assert!(matches!(
            resolve(&TEST_MODULE, "autorole frobnicate"),
            Err(BotError::MissingSubcommand { .. })
        ));
    }

    #[test]
    fn permissions_accumulate_along_path() {
        let (path, _) = resolve_ok("autorole reply create x y");
        assert_eq!(required_permissions(&path), MANAGE_ROLES | KICK);

        let (path, _) = resolve_ok("autorole reply list");
        assert_eq!(required_permissions(&path), MANAGE_ROLES);
    }

    #[test]
    fn permission_check() {
        assert!(check_permissions(MANAGE_ROLES, MANAGE_ROLES | KICK).is_ok());
        assert!(check_permissions(MANAGE_ROLES, Permissions::ADMINISTRATOR).is_ok());
        assert!(check_permissions(NO_PERMISSIONS, NO_PERMISSIONS).is_ok());
        assert_eq!(
            check_permissions(MANAGE_ROLES | KICK, KICK),
            Err(BotError::PermissionDenied("Manage Roles".into()))
        );
    }

    #[test]
    fn optional_duration_only_when_numeric() {
        let args = parse("mute <@1> 10m being loud").unwrap();
        assert_eq!(args.member("member"), Ok(UserId::new(1)));
        assert_eq!(args.duration("duration"), Some(Duration::from_secs(600)));
        assert_eq!(args.text("reason"), Some("being loud"));

        let args = parse("mute <@1> being loud").unwrap();
        assert_eq!(args.duration("duration"), None);
        assert_eq!(args.text("reason"), Some("being loud"));

        let args = parse("mute 1").unwrap();
        assert_eq!(args.duration("duration"), None);
        assert_eq!(args.text("reason"), None);
    }

    #[test]
    fn numeric_but_malformed_duration_fails() {
        assert_eq!(
            parse("mute <@1> 10x").unwrap_err(),
            BotError::InvalidDuration("10x".into())
        );
    }

    #[test]
    fn missing_or_invalid_member_is_bad_argument() {
        for line in ["mute", "mute bob"] {
            match parse(line).unwrap_err() {
                BotError::BadArgument { name, usage, .. } => {
                    assert_eq!(name, "member");
                    assert_eq!(usage, "mute <member> [duration] [reason]");
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn role_takes_mention_or_rest_of_line() {
        let args = parse(r#"autorole reply create "staff" <@&5>"#).unwrap();
        assert_eq!(args.word("word"), Ok("staff"));
        assert_eq!(args.role("role"), Ok(&RoleRef::Id(RoleId::new(5))));

        let args = parse("autorole reply create staff Senior Moderators").unwrap();
        assert_eq!(
            args.role("role"),
            Ok(&RoleRef::Name("Senior Moderators".into()))
        );
    }

    #[test]
    fn choice_is_validated() {
        let args = parse("trial ADD <@3>").unwrap();
        assert_eq!(args.word("action"), Ok("add"));
        assert_eq!(args.member("member"), Ok(UserId::new(3)));
        assert!(matches!(
            parse("trial promote <@3>"),
            Err(BotError::BadArgument { name: "action", .. })
        ));
    }

    #[test]
    fn signatures() {
        let (path, _) = resolve_ok("trial add 1");
        assert_eq!(signature(&path), "trial <add|remove> <member>");
        assert_eq!(TEST_MODULE.commands[1].arg_signature(), "<reply>");
        let (path, _) = resolve_ok("autorole reply list");
        assert_eq!(signature(&path), "autorole reply list");
    }
}
