#[cfg(test)]
mod tests {
    use crate::config::{Config, ReadEnv, parse_channel_map};
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    struct InMemoryEnv(HashMap<&'static str, &'static str>);

    impl InMemoryEnv {
        fn new(pairs: &[(&'static str, &'static str)]) -> Self {
            Self(pairs.iter().cloned().collect())
        }
    }

    impl ReadEnv for InMemoryEnv {
        fn var(&self, key: &str) -> Option<String> {
            self.0.get(key).map(|v| v.to_string())
        }
    }

    fn write_toml(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    // ── from_file ─────────────────────────────────────────────────────────────

    #[test]
    fn test_from_file_minimal() {
        let toml = r#"
[discord]
bot_token = "BOT-TOKEN-123"
guild_id = 1000
"#;
        let f = write_toml(toml);
        let cfg = Config::from_file(f.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.discord.bot_token, "BOT-TOKEN-123");
        assert_eq!(cfg.discord.guild_id, 1000);
        assert_eq!(cfg.discord.default_role_id, None);
        assert!(!cfg.discord.sync_on_message);
        assert!(cfg.discord.channels.is_empty());
        assert_eq!(cfg.http.port, 3000);
        assert_eq!(cfg.http.addr, "0.0.0.0");
        assert!(cfg.health.enabled);
        assert_eq!(cfg.health.port, 3001);
        assert_eq!(cfg.database.path, "rolebridge.db");
    }

    #[test]
    fn test_from_file_full() {
        let toml = r#"
[discord]
bot_token = "SECRET"
guild_id = 1000
default_role_id = 2000
sync_on_message = true

[discord.channels]
mod_logs = 3000
announcements = 3001

[http]
addr = "127.0.0.1"
port = 8080

[health]
enabled = false
port = 9090

[database]
path = "/var/lib/rolebridge/app.db"
"#;
        let f = write_toml(toml);
        let cfg = Config::from_file(f.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.discord.default_role_id, Some(2000));
        assert!(cfg.discord.sync_on_message);
        assert_eq!(cfg.discord.channel("mod_logs"), Some(3000));
        assert_eq!(cfg.discord.channel("announcements"), Some(3001));
        assert_eq!(cfg.discord.channel("general"), None);
        assert_eq!(cfg.http.bind_addr(), "127.0.0.1:8080");
        assert!(!cfg.health.enabled);
        assert_eq!(cfg.health.port, 9090);
        assert_eq!(cfg.database.path, "/var/lib/rolebridge/app.db");
    }

    #[test]
    fn test_from_file_missing_returns_error() {
        let result = Config::from_file("/nonexistent/path/config.toml");
        assert!(result.is_err());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("Failed to read config file"));
    }

    #[test]
    fn test_from_file_invalid_toml_returns_error() {
        let f = write_toml("this is not valid toml !!!");
        let result = Config::from_file(f.path().to_str().unwrap());
        assert!(result.is_err());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("Failed to parse config file"));
    }

    #[test]
    fn test_from_file_missing_guild_id_returns_error() {
        let f = write_toml("[discord]\nbot_token = \"TOK\"\n");
        let result = Config::from_file(f.path().to_str().unwrap());
        assert!(result.is_err());
    }

    // ── from_env ──────────────────────────────────────────────────────────────

    #[test]
    fn test_from_env_missing_token_returns_error() {
        let env = InMemoryEnv::new(&[("DISCORD_GUILD_ID", "1000")]);
        let result = Config::from_env_impl(&env);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("DISCORD_BOT_TOKEN"));
    }

    #[test]
    fn test_from_env_missing_guild_returns_error() {
        let env = InMemoryEnv::new(&[("DISCORD_BOT_TOKEN", "tok")]);
        let result = Config::from_env_impl(&env);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("DISCORD_GUILD_ID"));
    }

    #[test]
    fn test_from_env_invalid_guild_returns_error() {
        let env = InMemoryEnv::new(&[
            ("DISCORD_BOT_TOKEN", "tok"),
            ("DISCORD_GUILD_ID", "not-a-snowflake"),
        ]);
        assert!(Config::from_env_impl(&env).is_err());
    }

    #[test]
    fn test_from_env_defaults() {
        let env = InMemoryEnv::new(&[
            ("DISCORD_BOT_TOKEN", "env-token-abc"),
            ("DISCORD_GUILD_ID", " 1000 "),
        ]);
        let cfg = Config::from_env_impl(&env).unwrap();
        assert_eq!(cfg.discord.bot_token, "env-token-abc");
        assert_eq!(cfg.discord.guild_id, 1000);
        assert_eq!(cfg.discord.default_role_id, None);
        assert!(!cfg.discord.sync_on_message);
        assert_eq!(cfg.http.port, 3000);
        assert!(cfg.health.enabled);
        assert_eq!(cfg.health.port, 3001);
        assert_eq!(cfg.database.path, "rolebridge.db");
    }

    #[test]
    fn test_from_env_reads_everything() {
        let env = InMemoryEnv::new(&[
            ("DISCORD_BOT_TOKEN", "tok"),
            ("DISCORD_GUILD_ID", "1000"),
            ("DISCORD_DEFAULT_ROLE_ID", "2000"),
            ("DISCORD_SYNC_ON_MESSAGE", "TRUE"),
            ("DISCORD_CHANNELS", "mod_logs=3000, announcements=3001"),
            ("HTTP_ADDR", "127.0.0.1"),
            ("HTTP_PORT", "8080"),
            ("HEALTH_ENABLED", "false"),
            ("HEALTH_CHECK_PORT", "9090"),
            ("DATABASE_PATH", ":memory:"),
        ]);
        let cfg = Config::from_env_impl(&env).unwrap();
        assert_eq!(cfg.discord.default_role_id, Some(2000));
        assert!(cfg.discord.sync_on_message);
        assert_eq!(cfg.discord.channel("mod_logs"), Some(3000));
        assert_eq!(cfg.discord.channel("announcements"), Some(3001));
        assert_eq!(cfg.http.bind_addr(), "127.0.0.1:8080");
        assert!(!cfg.health.enabled);
        assert_eq!(cfg.health.port, 9090);
        assert_eq!(cfg.database.path, ":memory:");
    }

    #[test]
    fn test_from_env_invalid_port_falls_back_to_default() {
        let env = InMemoryEnv::new(&[
            ("DISCORD_BOT_TOKEN", "tok"),
            ("DISCORD_GUILD_ID", "1000"),
            ("HTTP_PORT", "not-a-number"),
        ]);
        let cfg = Config::from_env_impl(&env).unwrap();
        assert_eq!(cfg.http.port, 3000);
    }

    #[test]
    fn test_parse_channel_map_skips_malformed_entries() {
        let map = parse_channel_map("mod_logs=1, broken, other=abc, ,general = 2");
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("mod_logs"), Some(&1));
        assert_eq!(map.get("general"), Some(&2));
    }

    // ── warnings ──────────────────────────────────────────────────────────────

    #[test]
    fn test_warnings_clean_config() {
        let env = InMemoryEnv::new(&[("DISCORD_BOT_TOKEN", "tok"), ("DISCORD_GUILD_ID", "1000")]);
        let cfg = Config::from_env_impl(&env).unwrap();
        assert!(cfg.warnings().is_empty());
    }

    #[test]
    fn test_warnings_flag_everyone_default_role_and_port_clash() {
        let env = InMemoryEnv::new(&[
            ("DISCORD_BOT_TOKEN", "tok"),
            ("DISCORD_GUILD_ID", "1000"),
            ("DISCORD_DEFAULT_ROLE_ID", "1000"),
            ("HTTP_PORT", "4000"),
            ("HEALTH_CHECK_PORT", "4000"),
        ]);
        let cfg = Config::from_env_impl(&env).unwrap();
        let warnings = cfg.warnings();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("@everyone"));
        assert!(warnings[1].contains("4000"));
    }
}
