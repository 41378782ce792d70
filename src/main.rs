mod command;
mod config;
mod context;
mod duration;
mod error;
mod event;
mod handler;
mod helper;
mod introspect;
mod liveness;
mod logging;
mod plugin;
mod registry;
mod schedule;
mod template;
mod trigger;
mod volatile_state;

use serenity::{all::GatewayIntents, Client};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = crate::config::Config::load().await?;
    let token = cfg.discord_token()?.to_owned();

    if cfg.liveness.enabled {
        crate::liveness::spawn(&cfg.liveness.bind_address).await?;
    }

    let vstate = crate::volatile_state::VolatileState::new();
    let handler = handler::Handler::new(cfg, vstate);

    // Things we want discord to tell us about.
    let intents = GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::MESSAGE_CONTENT;

    Client::builder(&token, intents)
        .event_handler(handler)
        .await?
        .start()
        .await
        .map_err(Into::into)
}
