use crate::{
    command::{ArgKind, ArgSpec, CommandSpec, ModuleSpec, NO_PERMISSIONS},
    event::*,
    introspect::{self, HelpPage, HelpTarget},
    plugin::*,
};
use anyhow::Result;
use serenity::all::{CreateEmbed, CreateEmbedFooter, CreateMessage};

const QUERY: ArgSpec = ArgSpec {
    name: "query",
    kind: ArgKind::Text,
    required: false,
};

static MODULE: ModuleSpec = ModuleSpec {
    name: "Help",
    description: "Help pages for every module and command.",
    commands: &[CommandSpec {
        name: "advhelp",
        aliases: &["help"],
        help: "Shows all modules, the commands of one module, or the details of one command.",
        args: &[QUERY],
        permissions: NO_PERMISSIONS,
        subcommands: &[],
    }],
};

pub struct Help;

#[serenity::async_trait]
impl Plugin for Help {
    fn name(&self) -> &'static str {
        "help"
    }

    fn module(&self) -> Option<&'static ModuleSpec> {
        Some(&MODULE)
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some((msg, invocation)) = event.bot_cmd(ctx, &MODULE).await? else {
            return Ok(EventHandled::No);
        };

        let modules = modules();
        let target = introspect::lookup(&modules, invocation.args.text("query"))?;

        let embed = {
            let cfg = ctx.cfg.read().await;
            let prefix = cfg.general.display_prefix();
            let page = match target {
                HelpTarget::Overview => introspect::overview(&modules, prefix),
                HelpTarget::Command(path) => introspect::command_page(&path, prefix),
                HelpTarget::Module(module) => introspect::module_page(module, prefix),
            };
            let footer = format!("Requested by {}", msg.author.name);

            let embed = to_embed(page, cfg.help.embed_color).footer(CreateEmbedFooter::new(footer));
            match &cfg.help.thumbnail_url {
                Some(url) => embed.thumbnail(url),
                None => embed,
            }
        };

        msg.channel_id
            .send_message(ctx.cache_http, CreateMessage::new().embed(embed))
            .await?;
        Ok(EventHandled::Yes)
    }
}

fn to_embed(page: HelpPage, color: u32) -> CreateEmbed {
    let fields = page
        .fields
        .into_iter()
        .map(|(name, value)| (name, value, false));

    CreateEmbed::new()
        .title(page.title)
        .description(page.description)
        .color(color)
        .fields(fields)
}
