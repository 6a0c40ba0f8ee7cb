use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::services::tag_policy::DEFAULT_ADMIN_USER_ID;

/// A user to make sure exists at startup.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserSeed {
    pub id: i32,
    pub name: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,

    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// User id allowed to delete any unassigned tag.
    #[serde(default = "default_admin_user_id")]
    pub admin_user_id: i32,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default)]
    pub users: Vec<UserSeed>,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    database_url: Option<String>,
    listen_addr: Option<String>,
    admin_user_id: Option<i32>,
    log_dir: Option<String>,
    max_connections: Option<u32>,
    users: Option<Vec<UserSeed>>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_admin_user_id() -> i32 {
    DEFAULT_ADMIN_USER_ID
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_max_connections() -> u32 {
    10
}

impl ServerConfig {
    /// Builds a config for `database_url` with every other field defaulted.
    pub fn with_database_url(database_url: impl Into<String>) -> Self {
        ServerConfig {
            database_url: database_url.into(),
            listen_addr: default_listen_addr(),
            admin_user_id: default_admin_user_id(),
            log_dir: default_log_dir(),
            max_connections: default_max_connections(),
            users: Vec::new(),
        }
    }

    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        // 1. Load from file (optional)
        let file_config = match config_path {
            Some(path_str) => read_file_config(Path::new(path_str))?,
            None => PartialServerConfig::default(),
        };

        // 2. Load from environment variables
        let env_config: PartialServerConfig = envy::from_env::<PartialServerConfig>()
            .map_err(|e| format!("Failed to load config from environment: {e}"))?;

        // 3. Merge: environment overrides file
        merge(file_config, env_config)
    }
}

fn read_file_config(path: &Path) -> Result<PartialServerConfig, String> {
    if !path.exists() {
        return Ok(PartialServerConfig::default());
    }
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
    toml::from_str(&contents)
        .map_err(|e| format!("Failed to parse TOML from config file at {path:?}: {e}"))
}

fn merge(file_config: PartialServerConfig, env_config: PartialServerConfig) -> Result<ServerConfig, String> {
    Ok(ServerConfig {
        database_url: env_config
            .database_url
            .or(file_config.database_url)
            .ok_or("DATABASE_URL is required")?,
        listen_addr: env_config
            .listen_addr
            .or(file_config.listen_addr)
            .unwrap_or_else(default_listen_addr),
        admin_user_id: env_config
            .admin_user_id
            .or(file_config.admin_user_id)
            .unwrap_or_else(default_admin_user_id),
        log_dir: env_config
            .log_dir
            .or(file_config.log_dir)
            .unwrap_or_else(default_log_dir),
        max_connections: env_config
            .max_connections
            .or(file_config.max_connections)
            .unwrap_or_else(default_max_connections),
        users: env_config
            .users
            .or(file_config.users)
            .unwrap_or_default(),
    })
}
