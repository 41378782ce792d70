//! User-facing error taxonomy.
//!
//! Plugins return `anyhow::Result`, and the event loop reports any `BotError` (or `serenity::Error`,
//! classified into one) back to the channel the command came from.

use serenity::{http::HttpError, model::ModelError};
use thiserror::Error;

const HTTP_FORBIDDEN: u16 = 403;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BotError {
    #[error("A trigger named `{0}` already exists. Use `edit` to modify it.")]
    DuplicateTrigger(String),

    #[error("{0} not found.")]
    NotFound(String),

    #[error("Invalid response type `{0}`. Must be `text`, `embed`, or `image`.")]
    InvalidKind(String),

    #[error("Invalid duration `{0}`. Use a positive number followed by s, m, h, or d (e.g. `30m`).")]
    InvalidDuration(String),

    #[error("You are already AFK. Send a message to remove your AFK status.")]
    AlreadyAfk,

    #[error("You need the following permission(s) to use this command: {0}.")]
    PermissionDenied(String),

    #[error("I don't have permission to do that. Make sure my role is above the target's.")]
    ExternalApiForbidden,

    #[error("An error occurred while talking to Discord: {0}")]
    ExternalApiError(String),

    #[error("Missing or invalid `{name}`: expected {expected}. Usage: `{usage}`")]
    BadArgument {
        name: &'static str,
        expected: &'static str,
        usage: String,
    },

    #[error("Please specify a subcommand for `{group}`: {choices}.")]
    MissingSubcommand { group: String, choices: String },

    #[error("`{0}` is a built-in command and cannot be used as a custom command name.")]
    ReservedName(String),

    #[error("The bot is currently in maintenance mode. Only administrators can use commands.")]
    Maintenance,

    #[error("{0}")]
    Refused(String),
}

impl BotError {
    /// Map a host library failure onto the taxonomy.  Permission-shaped failures, whether reported
    /// by Discord (HTTP 403) or detected locally by serenity's cache checks, become
    /// `ExternalApiForbidden`; everything else is a generic `ExternalApiError`.
    pub fn classify(err: &serenity::Error) -> Self {
        match err {
            serenity::Error::Http(HttpError::UnsuccessfulRequest(response))
                if response.status_code.as_u16() == HTTP_FORBIDDEN =>
            {
                BotError::ExternalApiForbidden
            }
            serenity::Error::Model(ModelError::InvalidPermissions { .. })
            | serenity::Error::Model(ModelError::Hierarchy) => BotError::ExternalApiForbidden,
            other => BotError::ExternalApiError(other.to_string()),
        }
    }

    /// Text shown to the invoking channel.
    pub fn user_message(&self) -> String {
        format!("\u{274C} {}", self)
    }
}

impl From<serenity::Error> for BotError {
    fn from(err: serenity::Error) -> Self {
        BotError::classify(&err)
    }
}

/// Extract the user-facing part of an error that escaped a plugin, if it has one.
pub fn user_facing(err: &anyhow::Error) -> Option<BotError> {
    if let Some(bot_err) = err.downcast_ref::<BotError>() {
        return Some(bot_err.clone());
    }
    err.downcast_ref::<serenity::Error>().map(BotError::classify)
}
