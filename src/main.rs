use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Discord bot for viewing and editing the stats table
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Register commands in this guild only instead of globally (faster for testing)
    #[arg(long)]
    guild_id: Option<u64>,

    /// Do not start the health endpoint
    #[arg(long)]
    no_web: bool,
}

mod commands;
mod config;
mod error;
mod logging;
mod managers;
mod models;
mod pagination;
mod state;
mod supabase;
mod table;
#[cfg(test)]
mod testing;
mod web;

use commands::{
    add_editor, add_row, bot_logs, delete_row, help, ping, remove_editor, show_table,
    update_table, view_editors,
};
use config::BotConfig;
use logging::SharedLogBuffer;
use managers::{
    create_shared_access_manager, create_shared_stats_manager, SharedAccessManager,
    SharedStatsManager,
};
use state::{create_shared_row_cache, create_shared_session_registry, SharedSessionRegistry};
use supabase::SupabaseClient;

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

const INITIAL_BACKOFF: Duration = Duration::from_secs(5);
const MAX_BACKOFF: Duration = Duration::from_secs(200);

/// Shared application state
#[derive(Clone)]
pub struct Data {
    pub config: Arc<BotConfig>,
    pub stats: SharedStatsManager,
    pub access: SharedAccessManager,
    pub sessions: SharedSessionRegistry,
    pub log_buffer: SharedLogBuffer,
}

fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(MAX_BACKOFF)
}

/// Errors that a restart cannot fix
fn is_fatal(err: &::serenity::Error) -> bool {
    use ::serenity::gateway::GatewayError;

    matches!(
        err,
        ::serenity::Error::Gateway(
            GatewayError::InvalidAuthentication
                | GatewayError::DisallowedGatewayIntents
                | GatewayError::InvalidGatewayIntents
        )
    )
}

fn build_framework(data: Data, guild_id: Option<u64>) -> poise::Framework<Data, Error> {
    poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                show_table(),
                update_table(),
                add_row(),
                delete_row(),
                add_editor(),
                remove_editor(),
                view_editors(),
                bot_logs(),
                ping(),
                help(),
            ],
            pre_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' invoked by {} (ID: {}) in {}",
                        ctx.command().qualified_name,
                        ctx.author().name,
                        ctx.author().id,
                        ctx.guild_id().map(|g| g.to_string()).unwrap_or_else(|| "DM".to_string())
                    );
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' completed for {}",
                        ctx.command().qualified_name,
                        ctx.author().name
                    );
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            error!("Error in command '{}': {}", ctx.command().qualified_name, error);
                            let _ = ctx.say("❌ Something went wrong. Please try again later.").await;
                        }
                        poise::FrameworkError::ArgumentParse { error, input, ctx, .. } => {
                            warn!("Argument parse error in '{}': {} (input: {:?})", ctx.command().qualified_name, error, input);
                            let _ = ctx.say(format!("❌ Invalid input: {}", error)).await;
                        }
                        poise::FrameworkError::MissingBotPermissions { missing_permissions, ctx, .. } => {
                            error!("Bot missing permissions for '{}': {:?}", ctx.command().qualified_name, missing_permissions);
                        }
                        other => {
                            error!("Other framework error: {}", other);
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Bot logged in as: {}", ready.user.name);

                match guild_id {
                    Some(gid) => {
                        let guild = serenity::GuildId::new(gid);
                        info!("Registering commands to guild: {}", guild);
                        if let Err(e) = poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            guild,
                        )
                        .await
                        {
                            error!("Failed to register commands for guild {}: {}", guild, e);
                        } else {
                            info!(
                                "Successfully registered {} commands for guild {}",
                                framework.options().commands.len(),
                                guild
                            );
                        }
                    }
                    None => {
                        info!("Registering commands globally...");
                        if let Err(e) =
                            poise::builtins::register_globally(ctx, &framework.options().commands)
                                .await
                        {
                            error!("Failed to register commands globally: {}", e);
                        } else {
                            info!(
                                "Successfully registered {} commands globally (may take up to 1 hour to propagate)",
                                framework.options().commands.len()
                            );
                        }
                    }
                }

                Ok(data)
            })
        })
        .build()
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    let config = match BotConfig::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Startup failed: {}", e);
            return Err(e.into());
        }
    };

    let log_buffer = logging::create_log_buffer(1000);

    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true),
        )
        .with(config.log_level)
        .with(logging::LogCaptureLayer::new(log_buffer.clone()))
        .init();

    info!(
        "Loaded config: stats table '{}', editors table '{}', {} admin(s), page size {}",
        config.supabase.stats_table,
        config.supabase.editors_table,
        config.admin_ids.len(),
        config.page_size
    );

    let store = Arc::new(SupabaseClient::new(&config.supabase)?);
    let data = Data {
        config: config.clone(),
        stats: create_shared_stats_manager(store.clone(), create_shared_row_cache(config.cache_ttl)),
        access: create_shared_access_manager(config.admin_ids.clone(), store),
        sessions: create_shared_session_registry(),
        log_buffer,
    };

    if args.no_web {
        info!("--no-web: health endpoint disabled");
    } else {
        let port = config.port;
        tokio::spawn(async move {
            if let Err(e) = web::start_health_server(port).await {
                error!("Health server error: {}", e);
            }
        });
    }

    if let Some(gid) = args.guild_id {
        info!("--guild-id: Registering commands to guild {} only", gid);
    } else {
        info!("Registering commands globally by default (takes up to 1 hour to propagate)");
    }

    let intents = serenity::GatewayIntents::non_privileged();
    let mut backoff = INITIAL_BACKOFF;

    loop {
        let framework = build_framework(data.clone(), args.guild_id);
        let mut client =
            serenity::ClientBuilder::new(config.discord_token.expose(), intents)
                .framework(framework)
                .await?;

        info!("Starting bot...");
        match client.start().await {
            Ok(()) => {
                warn!("Bot ended.");
                return Ok(());
            }
            Err(e) if is_fatal(&e) => {
                error!("Failed to start bot: {}", e);
                error!("Check DISCORD_TOKEN and the gateway intents enabled in the Discord Developer Portal");
                return Err(e.into());
            }
            Err(e) => {
                warn!("Bot stopped: {}. Restarting in {}s", e, backoff.as_secs());
                tokio::time::sleep(backoff).await;
                backoff = next_backoff(backoff);
            }
        }
    }
}
