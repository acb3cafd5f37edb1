//! Configuration management for rolebridge

#[path = "config_tests.rs"]
mod config_tests;

use std::collections::HashMap;
use std::fs;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_HTTP_ADDR: &str = "0.0.0.0";
const DEFAULT_HTTP_PORT: u16 = 3000;
const DEFAULT_HEALTH_PORT: u16 = 3001;
const DEFAULT_DATABASE_PATH: &str = "rolebridge.db";

/// Environment variable lookup, swappable in tests.
pub trait ReadEnv {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads from the process environment.
pub struct SystemEnv;

impl ReadEnv for SystemEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Complete service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub discord: DiscordBotConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Guild-side configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordBotConfig {
    /// Bot token from the Discord developer portal
    #[serde(default = "default_bot_token")]
    pub bot_token: String,
    /// The single guild whose member roles are kept in sync
    pub guild_id: u64,
    /// Role granted to every member on join and on first message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_role_id: Option<u64>,
    /// Also reconcile a member's roles whenever they post a message
    #[serde(default)]
    pub sync_on_message: bool,
    /// Logical channel names (`mod_logs`, `announcements`, ...) to channel ids
    #[serde(default)]
    pub channels: HashMap<String, u64>,
}

impl DiscordBotConfig {
    pub fn channel(&self, name: &str) -> Option<u64> {
        self.channels.get(name).copied()
    }
}

/// Operation endpoint listener
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_addr")]
    pub addr: String,
    #[serde(default = "default_http_port")]
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            addr: default_http_addr(),
            port: default_http_port(),
        }
    }
}

impl HttpConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }
}

/// Liveness / readiness probe listener
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_health_port")]
    pub port: u16,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_health_port(),
        }
    }
}

/// Application user/role database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path, or `:memory:`
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_env_impl(&SystemEnv)
    }

    pub(crate) fn from_env_impl<E: ReadEnv>(env: &E) -> Result<Self> {
        let bot_token = env
            .var("DISCORD_BOT_TOKEN")
            .context("DISCORD_BOT_TOKEN not set")?;

        let guild_id = env
            .var("DISCORD_GUILD_ID")
            .context("DISCORD_GUILD_ID not set")?
            .trim()
            .parse::<u64>()
            .context("DISCORD_GUILD_ID is not a valid id")?;

        let default_role_id = env
            .var("DISCORD_DEFAULT_ROLE_ID")
            .and_then(|v| v.trim().parse::<u64>().ok());

        let sync_on_message = env
            .var("DISCORD_SYNC_ON_MESSAGE")
            .unwrap_or_else(|| "false".to_string())
            .to_lowercase()
            == "true";

        let channels = parse_channel_map(&env.var("DISCORD_CHANNELS").unwrap_or_default());

        let http = HttpConfig {
            addr: env.var("HTTP_ADDR").unwrap_or_else(default_http_addr),
            port: env
                .var("HTTP_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_HTTP_PORT),
        };

        let health = HealthConfig {
            enabled: env
                .var("HEALTH_ENABLED")
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(true),
            port: env
                .var("HEALTH_CHECK_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_HEALTH_PORT),
        };

        let database = DatabaseConfig {
            path: env
                .var("DATABASE_PATH")
                .unwrap_or_else(default_database_path),
        };

        Ok(Config {
            discord: DiscordBotConfig {
                bot_token,
                guild_id,
                default_role_id,
                sync_on_message,
                channels,
            },
            http,
            health,
            database,
        })
    }

    /// Problems that do not stop startup but are worth logging.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.discord.bot_token.is_empty() {
            warnings.push("discord.bot_token is empty".to_string());
        }
        if self.discord.default_role_id == Some(self.discord.guild_id) {
            warnings.push(
                "discord.default_role_id is the @everyone role and will be ignored".to_string(),
            );
        }
        if self.health.enabled && self.health.port == self.http.port {
            warnings.push(format!(
                "health.port and http.port are both {}; the health server will fail to bind",
                self.http.port
            ));
        }
        warnings
    }
}

fn default_bot_token() -> String {
    std::env::var("DISCORD_BOT_TOKEN").unwrap_or_default()
}

fn default_http_addr() -> String {
    DEFAULT_HTTP_ADDR.to_string()
}

fn default_http_port() -> u16 {
    DEFAULT_HTTP_PORT
}

fn default_health_port() -> u16 {
    DEFAULT_HEALTH_PORT
}

fn default_database_path() -> String {
    DEFAULT_DATABASE_PATH.to_string()
}

fn default_true() -> bool {
    true
}

/// Parse `name=id,name=id` pairs; malformed entries are skipped.
fn parse_channel_map(s: &str) -> HashMap<String, u64> {
    s.split(',')
        .map(|x| x.trim())
        .filter(|x| !x.is_empty())
        .filter_map(|pair| {
            let (name, id) = pair.split_once('=')?;
            let id = id.trim().parse::<u64>().ok()?;
            Some((name.trim().to_string(), id))
        })
        .collect()
}
