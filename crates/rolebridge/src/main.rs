//! Guild role sync bridge
//!
//! Keeps guild member roles in step with application role assignments and
//! relays messages into configured guild channels.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use serenity::model::gateway::GatewayIntents;
use serenity::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rolebridge::api::{self, ApiState};
use rolebridge::config::Config;
use rolebridge::guild::SerenityGuild;
use rolebridge::handlers::{GuildEvents, Handler};
use rolebridge::health::{self, HealthState};
use rolebridge::reconcile::{Reconciler, ReconcilerConfig};
use rolebridge::relay::Relay;
use rolebridge::store::SqliteStore;

/// Guild role sync bridge CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/rolebridge.toml")]
    config: String,

    /// Discord bot token (overrides config file)
    #[arg(long, env = "DISCORD_BOT_TOKEN")]
    bot_token: Option<String>,

    /// Guild to keep in sync (overrides config file)
    #[arg(long, env = "DISCORD_GUILD_ID")]
    guild_id: Option<u64>,

    /// SQLite database path (overrides config file)
    #[arg(long, env = "DATABASE_PATH")]
    database: Option<String>,

    /// Operation endpoint port (overrides config file)
    #[arg(long, env = "HTTP_PORT")]
    http_port: Option<u16>,

    /// Health check server port (overrides config file)
    #[arg(long, env = "HEALTH_CHECK_PORT")]
    health_port: Option<u16>,
}

impl Args {
    fn apply(self, config: &mut Config) {
        if let Some(bot_token) = self.bot_token {
            config.discord.bot_token = bot_token;
        }
        if let Some(guild_id) = self.guild_id {
            config.discord.guild_id = guild_id;
        }
        if let Some(database) = self.database {
            config.database.path = database;
        }
        if let Some(port) = self.http_port {
            config.http.port = port;
        }
        if let Some(port) = self.health_port {
            config.health.port = port;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rolebridge=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting rolebridge");

    let args = Args::parse();

    let mut config = if std::path::Path::new(&args.config).exists() {
        info!("Loading config from file: {}", args.config);
        Config::from_file(&args.config)?
    } else {
        info!("Config file not found, loading from environment");
        Config::from_env()?
    };
    args.apply(&mut config);

    for w in config.warnings() {
        warn!("Config: {}", w);
    }
    info!(guild_id = config.discord.guild_id, "Syncing roles for guild");

    let store = Arc::new(SqliteStore::open(&config.database.path).await?);

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&config.discord.bot_token, intents)
        .event_handler(Handler)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Discord client: {}", e))?;

    let guild = Arc::new(SerenityGuild::new(client.http.clone()));
    let reconciler = Arc::new(Reconciler::new(
        store.clone(),
        guild.clone(),
        ReconcilerConfig {
            guild_id: config.discord.guild_id,
        },
    ));
    let relay = Relay::new(guild.clone(), config.discord.channels.clone());
    let health_state = HealthState::new(store.clone());

    let events = Arc::new(GuildEvents::new(
        &config.discord,
        reconciler.clone(),
        store.clone(),
        guild.clone(),
        guild,
        health_state.clone(),
    ));
    {
        let mut data = client.data.write().await;
        data.insert::<GuildEvents>(events);
    }

    let shutdown = CancellationToken::new();

    let api_addr = config.http.bind_addr();
    let api_state = ApiState { reconciler, relay };
    let api_shutdown = shutdown.clone();
    let api_task = tokio::spawn(async move {
        if let Err(e) = api::serve(&api_addr, api_state, api_shutdown).await {
            error!("Operation endpoint error: {}", e);
        }
    });

    let health_task = if config.health.enabled {
        let port = config.health.port;
        let health_shutdown = shutdown.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = health::start_health_server(health_state, port, health_shutdown).await
            {
                error!("Health server error: {}", e);
            }
        }))
    } else {
        None
    };

    // Graceful shutdown: stop the listeners and close all shards on SIGTERM or Ctrl+C.
    let shard_manager = client.shard_manager.clone();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown signal received, stopping...");
        signal_shutdown.cancel();
        shard_manager.shutdown_all().await;
    });

    info!("Starting Discord gateway connection...");

    let result = client.start().await;

    shutdown.cancel();
    let _ = api_task.await;
    if let Some(task) = health_task {
        let _ = task.await;
    }
    store.pool().close().await;

    result.map_err(|e| anyhow::anyhow!("Discord client error: {}", e))?;
    info!("rolebridge stopped");
    Ok(())
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
    }
}
