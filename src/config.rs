use anyhow::{anyhow, Result};
use std::{io::ErrorKind, path::PathBuf};
use tokio::io::AsyncReadExt;

const CONFIG_PATH_REL_HOME: &str = ".config/wardbot/config.toml";
const TOKEN_ENV: &str = "DISCORD_BOT_TOKEN";
const PORT_ENV: &str = "PORT";

/// Bot configuration.  Every field has a default, so a missing file or section is fine.
#[derive(Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: General,
    pub moderation: Moderation,
    pub help: Help,
    pub liveness: Liveness,
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct General {
    /// Overridden by `DISCORD_BOT_TOKEN`
    pub discord_token: String,
    /// Matched case-insensitively.  Include the trailing space if one is expected.
    pub command_prefixes: Vec<String>,
    /// Global user names allowed to `reload`
    pub bot_owners: Vec<String>,
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Moderation {
    pub muted_role_name: String,
    pub trial_role_name: String,
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Help {
    pub embed_color: u32,
    pub thumbnail_url: Option<String>,
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Liveness {
    pub enabled: bool,
    pub bind_address: String,
}

impl Default for General {
    fn default() -> Self {
        Self {
            discord_token: String::new(),
            command_prefixes: vec!["XTRM ".to_owned(), "xtrm ".to_owned()],
            bot_owners: Vec::new(),
        }
    }
}

impl Default for Moderation {
    fn default() -> Self {
        Self {
            muted_role_name: "Muted".to_owned(),
            trial_role_name: "Trial Member".to_owned(),
        }
    }
}

impl Default for Help {
    fn default() -> Self {
        Self {
            embed_color: 0x00FFFF,
            thumbnail_url: None,
        }
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0:8080".to_owned(),
        }
    }
}

impl General {
    /// Prefix shown in help text and usage hints.
    pub fn display_prefix(&self) -> &str {
        self.command_prefixes
            .first()
            .map(String::as_str)
            .unwrap_or_default()
    }
}

impl Config {
    fn config_path() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|p| p.join(CONFIG_PATH_REL_HOME))
            .ok_or(anyhow!("Could not find home directory"))
    }

    fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(Into::into)
    }

    /// Apply environment overrides: the bot token, and the liveness port (as hosting platforms
    /// hand it out).
    fn apply_env(&mut self, token: Option<String>, port: Option<String>) {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.general.discord_token = token;
        }
        if let Some(port) = port.filter(|p| p.parse::<u16>().is_ok()) {
            let host = self
                .liveness
                .bind_address
                .rsplit_once(':')
                .map(|(host, _)| host)
                .unwrap_or("0.0.0.0");
            self.liveness.bind_address = format!("{}:{}", host, port);
        }
    }

    pub async fn load() -> Result<Self> {
        let path = Self::config_path()?;

        let mut config = match tokio::fs::File::open(&path).await {
            Ok(mut file) => {
                let mut contents = String::new();
                file.read_to_string(&mut contents).await.map_err(|e| {
                    anyhow!(
                        "Could not read configuration at `{}`: {}",
                        path.to_string_lossy(),
                        e
                    )
                })?;

                Self::parse(&contents).map_err(|e| {
                    anyhow!(
                        "Could not parse configuration at `{}`: {}",
                        path.to_string_lossy(),
                        e
                    )
                })?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Config::default(),
            Err(e) => {
                return Err(anyhow!(
                    "Could not open configuration at `{}`: {}",
                    path.to_string_lossy(),
                    e
                ))
            }
        };

        config.apply_env(std::env::var(TOKEN_ENV).ok(), std::env::var(PORT_ENV).ok());
        Ok(config)
    }

    pub async fn reload(&mut self) -> Result<()> {
        let new = Self::load().await?;
        *self = new;
        Ok(())
    }

    /// The token to connect with.  Missing is fatal at startup.
    pub fn discord_token(&self) -> Result<&str> {
        let token = self.general.discord_token.trim();
        if token.is_empty() {
            return Err(anyhow!(
                "No Discord token: set `{}` or `general.discord_token` in ~/{}",
                TOKEN_ENV,
                CONFIG_PATH_REL_HOME
            ));
        }
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let cfg = Config::parse("").unwrap();
        assert_eq!(cfg.general.command_prefixes, ["XTRM ", "xtrm "]);
        assert_eq!(cfg.general.display_prefix(), "XTRM ");
        assert_eq!(cfg.moderation.muted_role_name, "Muted");
        assert_eq!(cfg.moderation.trial_role_name, "Trial Member");
        assert!(cfg.liveness.enabled);
        assert!(cfg.discord_token().is_err());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = Config::parse(
            r#"
            [general]
            discord_token = "abc"
            bot_owners = ["alice"]

            [moderation]
            muted_role_name = "Silenced"

            [help]
            embed_color = 0xFF0000
            "#,
        )
        .unwrap();
        assert_eq!(cfg.discord_token().unwrap(), "abc");
        assert_eq!(cfg.general.bot_owners, ["alice"]);
        assert_eq!(cfg.general.command_prefixes.len(), 2);
        assert_eq!(cfg.moderation.muted_role_name, "Silenced");
        assert_eq!(cfg.moderation.trial_role_name, "Trial Member");
        assert_eq!(cfg.help.embed_color, 0xFF0000);
        assert_eq!(cfg.liveness.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(Config::parse("[general\ndiscord_token = 1").is_err());
    }

    #[test]
    fn environment_overrides() {
        let mut cfg = Config::default();
        cfg.general.discord_token = "from-file".into();

        cfg.apply_env(Some("  ".into()), Some("not-a-port".into()));
        assert_eq!(cfg.discord_token().unwrap(), "from-file");
        assert_eq!(cfg.liveness.bind_address, "0.0.0.0:8080");

        cfg.apply_env(Some("from-env".into()), Some("3000".into()));
        assert_eq!(cfg.discord_token().unwrap(), "from-env");
        assert_eq!(cfg.liveness.bind_address, "0.0.0.0:3000");
    }
}
