//! Trigger tables shared by autoresponders and custom commands.

use crate::error::BotError;
use std::{fmt, sync::LazyLock};

/// Default embed color (blue).
pub const DEFAULT_EMBED_COLOR: u32 = 0x3498DB;

static MATCH_OPTION: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(?i)--match\s+(exact|contains)").expect("valid match option regex")
});
static TITLE_OPTION: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r#"--title\s+"([^"]+)""#).expect("valid title option regex")
});
static COLOR_OPTION: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"--color\s+#([0-9a-fA-F]{6})\b").expect("valid color option regex")
});

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseKind {
    Text,
    Embed,
    Image,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchMode {
    Exact,
    Contains,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u32);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TriggerEntry {
    pub trigger: String,
    pub kind: ResponseKind,
    pub body: String,
    pub match_mode: MatchMode,
    pub title: Option<String>,
    pub color: Option<Rgb>,
}

/// Display options parsed from the tail of a body.  `None` means "not given".
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TriggerOptions {
    pub match_mode: Option<MatchMode>,
    pub title: Option<String>,
    pub color: Option<Rgb>,
}

/// Insertion-ordered trigger table.
#[derive(Default)]
pub struct TriggerTable {
    entries: Vec<TriggerEntry>,
}

impl ResponseKind {
    pub fn parse(kind: &str) -> Result<Self, BotError> {
        match kind.to_lowercase().as_str() {
            "text" => Ok(ResponseKind::Text),
            "embed" => Ok(ResponseKind::Embed),
            "image" => Ok(ResponseKind::Image),
            _ => Err(BotError::InvalidKind(kind.to_owned())),
        }
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            ResponseKind::Text => "text",
            ResponseKind::Embed => "embed",
            ResponseKind::Image => "image",
        })
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            MatchMode::Exact => "exact",
            MatchMode::Contains => "contains",
        })
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{:06X}", self.0)
    }
}

/// Split `content --match exact --title "T" --color #FF0000` into its body and options.
///
/// Options start at the first ` --`.  Only the first occurrence of each option is used, and a
/// `--color` that is not six hex digits is ignored.
pub fn split_options(input: &str) -> (String, TriggerOptions) {
    let (body, options_str) = match input.find(" --") {
        Some(idx) => (&input[..idx], &input[idx..]),
        None if input.trim_start().starts_with("--") => ("", input),
        None => (input, ""),
    };

    let match_mode = MATCH_OPTION
        .captures(options_str)
        .map(|caps| match caps[1].to_lowercase().as_str() {
            "exact" => MatchMode::Exact,
            _ => MatchMode::Contains,
        });
    let title = TITLE_OPTION
        .captures(options_str)
        .map(|caps| caps[1].to_owned());
    let color = COLOR_OPTION
        .captures(options_str)
        .and_then(|caps| u32::from_str_radix(&caps[1], 16).ok())
        .map(Rgb);

    let options = TriggerOptions {
        match_mode,
        title,
        color,
    };
    (unquote(body.trim()).to_owned(), options)
}

fn unquote(s: &str) -> &str {
    match s.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(inner) if !inner.contains('"') => inner,
        _ => s,
    }
}

fn normalize(trigger: &str) -> String {
    trigger.trim().to_lowercase()
}

impl TriggerEntry {
    pub fn matches(&self, text_lower: &str) -> bool {
        match self.match_mode {
            MatchMode::Exact => text_lower == self.trigger,
            MatchMode::Contains => text_lower.contains(&self.trigger),
        }
    }

    pub fn embed_color(&self) -> u32 {
        self.color.map(|c| c.0).unwrap_or(DEFAULT_EMBED_COLOR)
    }
}

impl TriggerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &mut self,
        trigger: &str,
        kind: &str,
        content: &str,
    ) -> Result<&TriggerEntry, BotError> {
        let trigger = normalize(trigger);
        if self.get(&trigger).is_some() {
            return Err(BotError::DuplicateTrigger(trigger));
        }
        let kind = ResponseKind::parse(kind)?;

        let (body, options) = split_options(content);
        self.entries.push(TriggerEntry {
            trigger,
            kind,
            body,
            match_mode: options.match_mode.unwrap_or(MatchMode::Contains),
            title: options.title,
            color: options.color,
        });

        Ok(&self.entries[self.entries.len() - 1])
    }

    pub fn edit(&mut self, trigger: &str, content: &str) -> Result<&TriggerEntry, BotError> {
        let trigger = normalize(trigger);
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.trigger == trigger)
            .ok_or_else(|| BotError::NotFound(format!("Trigger `{}`", trigger)))?;

        let (body, options) = split_options(content);
        entry.body = body;
        if let Some(match_mode) = options.match_mode {
            entry.match_mode = match_mode;
        }
        if let Some(title) = options.title {
            entry.title = Some(title);
        }
        if let Some(color) = options.color {
            entry.color = Some(color);
        }

        Ok(entry)
    }

    pub fn delete(&mut self, trigger: &str) -> Result<TriggerEntry, BotError> {
        let trigger = normalize(trigger);
        let idx = self
            .entries
            .iter()
            .position(|entry| entry.trigger == trigger)
            .ok_or_else(|| BotError::NotFound(format!("Trigger `{}`", trigger)))?;
        Ok(self.entries.remove(idx))
    }

    /// Entries in insertion order.  Each call starts over from the current contents.
    pub fn list(&self) -> impl Iterator<Item = &TriggerEntry> + '_ {
        self.entries.iter()
    }

    /// Exact key lookup, ignoring match modes.
    pub fn get(&self, trigger: &str) -> Option<&TriggerEntry> {
        let trigger = normalize(trigger);
        self.entries.iter().find(|entry| entry.trigger == trigger)
    }

    /// First entry, in insertion order, whose match mode accepts `text`.
    pub fn find_match(&self, text: &str) -> Option<&TriggerEntry> {
        let text_lower = text.to_lowercase();
        self.entries.iter().find(|entry| entry.matches(&text_lower))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_trigger_matches_inside_text() {
        let mut table = TriggerTable::new();
        table
            .create("Hello", "text", "\"Hi {user}!\" --match contains")
            .unwrap();

        let hit = table.find_match("well HELLO there").unwrap();
        assert_eq!(hit.trigger, "hello");
        assert_eq!(hit.body, "Hi {user}!");
        assert_eq!(hit.match_mode, MatchMode::Contains);
    }

    #[test]
    fn exact_trigger_requires_full_text() {
        let mut table = TriggerTable::new();
        table.create("rules?", "text", "Read them --MATCH Exact").unwrap();

        assert!(table.find_match("Rules?").is_some());
        assert!(table.find_match("rules? please").is_none());
    }

    #[test]
    fn default_match_mode_is_contains() {
        let mut table = TriggerTable::new();
        let entry = table.create("gm", "text", "good morning").unwrap();
        assert_eq!(entry.match_mode, MatchMode::Contains);
        assert_eq!(entry.title, None);
        assert_eq!(entry.color, None);
    }

    #[test]
    fn deleted_trigger_no_longer_matches() {
        let mut table = TriggerTable::new();
        table.create("ping", "text", "pong").unwrap();
        assert!(table.find_match("ping").is_some());

        table.delete("PING").unwrap();
        assert!(table.find_match("ping").is_none());
        assert_eq!(
            table.delete("ping"),
            Err(BotError::NotFound("Trigger `ping`".into()))
        );
    }

    #[test]
    fn duplicate_create_leaves_original_untouched() {
        let mut table = TriggerTable::new();
        table.create("hello", "text", "first").unwrap();

        let err = table.create(" HELLO ", "embed", "second").unwrap_err();
        assert_eq!(err, BotError::DuplicateTrigger("hello".into()));
        let entry = table.get("hello").unwrap();
        assert_eq!(entry.body, "first");
        assert_eq!(entry.kind, ResponseKind::Text);
    }

    #[test]
    fn duplicate_is_reported_before_invalid_kind() {
        let mut table = TriggerTable::new();
        table.create("hello", "text", "first").unwrap();
        assert_eq!(
            table.create("hello", "gif", "x").unwrap_err(),
            BotError::DuplicateTrigger("hello".into())
        );
    }

    #[test]
    fn invalid_kind_is_rejected() {
        let mut table = TriggerTable::new();
        assert_eq!(
            table.create("hello", "gif", "x").unwrap_err(),
            BotError::InvalidKind("gif".into())
        );
        assert_eq!(table.list().count(), 0);
    }

    #[test]
    fn first_inserted_match_wins() {
        let mut table = TriggerTable::new();
        table.create("hello there", "text", "long").unwrap();
        table.create("hello", "text", "short").unwrap();

        assert_eq!(table.find_match("oh hello there").unwrap().body, "long");
        assert_eq!(table.find_match("hello!").unwrap().body, "short");
    }

    #[test]
    fn embed_options_are_parsed() {
        let mut table = TriggerTable::new();
        let entry = table
            .create(
                "rules?",
                "Embed",
                "Check out #rules! --title \"Rules Reminder\" --color #FFD700",
            )
            .unwrap();

        assert_eq!(entry.kind, ResponseKind::Embed);
        assert_eq!(entry.body, "Check out #rules!");
        assert_eq!(entry.title.as_deref(), Some("Rules Reminder"));
        assert_eq!(entry.color, Some(Rgb(0xFFD700)));
        assert_eq!(entry.embed_color(), 0xFFD700);
    }

    #[test]
    fn malformed_color_is_silently_ignored() {
        let (body, options) = split_options("hi --color #GGGGGG");
        assert_eq!(body, "hi");
        assert_eq!(options.color, None);

        let (_, options) = split_options("hi --color #ABC");
        assert_eq!(options.color, None);
    }

    #[test]
    fn only_first_option_occurrence_counts() {
        let (_, options) = split_options("x --title \"One\" --title \"Two\" --match exact --match contains");
        assert_eq!(options.title.as_deref(), Some("One"));
        assert_eq!(options.match_mode, Some(MatchMode::Exact));
    }

    #[test]
    fn edit_keeps_unspecified_fields() {
        let mut table = TriggerTable::new();
        table
            .create("faq", "embed", "old --title \"FAQ\" --color #FF0000 --match exact")
            .unwrap();

        let entry = table.edit("FAQ", "\"new body\" --color #00FF00").unwrap();
        assert_eq!(entry.body, "new body");
        assert_eq!(entry.title.as_deref(), Some("FAQ"));
        assert_eq!(entry.color, Some(Rgb(0x00FF00)));
        assert_eq!(entry.match_mode, MatchMode::Exact);
    }

    #[test]
    fn edit_missing_trigger_is_not_found() {
        let mut table = TriggerTable::new();
        assert!(matches!(
            table.edit("ghost", "boo"),
            Err(BotError::NotFound(_))
        ));
    }

    #[test]
    fn list_is_restartable_and_ordered() {
        let mut table = TriggerTable::new();
        for trigger in ["b", "a", "c"] {
            table.create(trigger, "text", "x").unwrap();
        }

        let first: Vec<_> = table.list().map(|e| e.trigger.as_str()).collect();
        let second: Vec<_> = table.list().map(|e| e.trigger.as_str()).collect();
        assert_eq!(first, ["b", "a", "c"]);
        assert_eq!(first, second);
    }

    #[test]
    fn inner_quotes_are_preserved() {
        let (body, _) = split_options("\"a\" and \"b\"");
        assert_eq!(body, "\"a\" and \"b\"");
    }

    #[test]
    fn rgb_displays_as_hex() {
        assert_eq!(Rgb(0xFFD700).to_string(), "#FFD700");
        assert_eq!(Rgb(0xFF).to_string(), "#0000FF");
    }
}
