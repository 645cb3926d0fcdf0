//! Configuration loading and database path resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Default HTTP port for the portal backend
pub const DEFAULT_PORT: u16 = 5810;

/// Server configuration resolved at startup
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub database_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            database_path: default_data_folder().join("portal.db"),
        }
    }
}

/// Subset of the TOML config file we understand
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    host: Option<IpAddr>,
    port: Option<u16>,
    database_path: Option<PathBuf>,
}

/// Resolve the database path by priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_database_path(cli_arg: Option<&str>, env_var_name: &str) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    if let Ok(path) = std::env::var(env_var_name) {
        return PathBuf::from(path);
    }

    if let Ok(config) = load_config_file() {
        if let Some(path) = config.database_path {
            return path;
        }
    }

    default_data_folder().join("portal.db")
}

/// Load server configuration, layering CLI arguments over the config file
pub fn load_server_config(
    cli_port: Option<u16>,
    cli_database: Option<&str>,
) -> Result<ServerConfig> {
    let file = load_config_file().unwrap_or_default();
    let defaults = ServerConfig::default();

    Ok(ServerConfig {
        host: file.host.unwrap_or(defaults.host),
        port: cli_port.or(file.port).unwrap_or(DEFAULT_PORT),
        database_path: resolve_database_path(cli_database, "CRP_DATABASE"),
    })
}

/// Locate and parse the platform config file
fn load_config_file() -> Result<ConfigFile> {
    let path = config_file_path()?;
    let content = std::fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
}

/// Default configuration file path for the platform
fn config_file_path() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("crp").join("config.toml"));

    if let Some(path) = user_config {
        if path.exists() {
            return Ok(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/crp/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config("No config file found".to_string()))
}

/// OS-dependent default data folder
fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("crp"))
        .unwrap_or_else(|| PathBuf::from("./crp_data"))
}
