use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::SessionSettings;
use crate::board::DEFAULT_CATEGORIES;

#[derive(Parser, Debug)]
#[command(name = "chalkboard", about = "A small community board")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Keep everything in memory; nothing is written to disk
    #[arg(long)]
    pub ephemeral: bool,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub board: BoardConfig,
    pub search: SearchConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Files,
    Memory,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// SQLite file for `sqlite`, directory for `files`
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub admin_username: String,
    pub admin_password: String,
    pub bcrypt_cost: u32,
    pub simulated_latency_ms: u64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct BoardConfig {
    pub posts_per_page: usize,
    /// Category given to posts submitted without one
    pub default_category: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub debounce_ms: u64,
    pub min_query_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        let session = SessionSettings::default();
        Self {
            admin_username: session.admin_username,
            admin_password: session.admin_password,
            bcrypt_cost: session.bcrypt_cost,
            simulated_latency_ms: 0,
        }
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            posts_per_page: 5,
            default_category: DEFAULT_CATEGORIES[0].to_string(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            min_query_len: 2,
        }
    }
}

impl AuthConfig {
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            admin_username: self.admin_username.clone(),
            admin_password: self.admin_password.clone(),
            bcrypt_cost: self.bcrypt_cost,
            latency: Duration::from_millis(self.simulated_latency_ms),
        }
    }
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if cli.ephemeral {
            config.storage.backend = StorageBackend::Memory;
        }

        // Resolve paths relative to data dir
        if config.storage.path.is_none() {
            config.storage.path = match config.storage.backend {
                StorageBackend::Sqlite => Some(data_dir.join("chalkboard.db")),
                StorageBackend::Files => Some(data_dir.join("snapshots")),
                StorageBackend::Memory => None,
            };
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".chalkboard")
        })
    }

    /// `None` only for the in-memory backend.
    pub fn storage_path(&self) -> Option<&PathBuf> {
        self.storage.path.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(data_dir: Option<PathBuf>) -> Cli {
        Cli {
            config: None,
            host: None,
            port: None,
            data_dir,
            ephemeral: false,
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.auth.admin_username, "admin");
        assert_eq!(config.auth.admin_password, "admin1234");
        assert_eq!(config.auth.simulated_latency_ms, 0);
        assert_eq!(config.board.posts_per_page, 5);
        assert_eq!(config.board.default_category, "Free Board");
        assert_eq!(config.search.debounce(), Duration::from_millis(300));
        assert_eq!(config.search.min_query_len, 2);
        assert!(config.storage.path.is_none());
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = cli(Some(PathBuf::from("/tmp/test-chalkboard")));
        assert_eq!(Config::data_dir(&cli), PathBuf::from("/tmp/test-chalkboard"));
    }

    #[test]
    fn data_dir_defaults_to_home_dot_chalkboard() {
        assert!(Config::data_dir(&cli(None)).ends_with(".chalkboard"));
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(&cli(Some(tmp.path().to_path_buf()))).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(
            config.storage_path(),
            Some(&tmp.path().join("chalkboard.db"))
        );
    }

    #[test]
    fn load_reads_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
port = 9000

[storage]
backend = "files"

[auth]
admin_username = "root"
admin_password = "toor1234"
simulated_latency_ms = 250

[board]
posts_per_page = 20

[search]
debounce_ms = 50
"#,
        )
        .unwrap();

        let mut cli = cli(Some(tmp.path().to_path_buf()));
        cli.config = Some(config_path);
        let config = Config::load(&cli).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.storage.backend, StorageBackend::Files);
        assert_eq!(config.storage_path(), Some(&tmp.path().join("snapshots")));
        assert_eq!(config.board.posts_per_page, 20);
        assert_eq!(config.search.debounce_ms, 50);

        let session = config.auth.session_settings();
        assert_eq!(session.admin_username, "root");
        assert_eq!(session.admin_password, "toor1234");
        assert_eq!(session.latency, Duration::from_millis(250));
    }

    #[test]
    fn cli_overrides_beat_toml_values() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "192.168.1.1"
port = 9000
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            host: Some("10.0.0.1".to_string()),
            port: Some(4000),
            data_dir: Some(tmp.path().to_path_buf()),
            ephemeral: true,
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "10.0.0.1");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert!(config.storage_path().is_none());
    }
}
