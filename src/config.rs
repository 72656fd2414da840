use std::{
    net::{AddrParseError, SocketAddr},
    path::PathBuf,
};

use clap::Parser;
use recordbook_core::KeyMap;
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(name = "recordbook", about = "RecordBook - JSON record server for the bookkeeping app")]
pub struct CliArgs {
    /// Path to config file
    #[arg(short, long, default_value = "recordbook.toml")]
    pub config: String,

    /// Port to listen on (overrides config file)
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Log level (overrides config file)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Directory holding the collection files (overrides config file)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Directory served as the static application bundle (overrides config file)
    #[arg(long)]
    pub public_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_server")]
    pub server: ServerConfig,

    #[serde(default = "default_logging")]
    pub logging: LoggingConfig,

    #[serde(default = "default_storage")]
    pub storage: StorageConfig,

    /// Key field per collection; unlisted collections keep their default.
    #[serde(default)]
    pub keys: KeyMap,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,

    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Document served when a directory is requested.
    #[serde(default = "default_index")]
    pub index: String,
}

fn default_server() -> ServerConfig {
    ServerConfig {
        host: default_host(),
        port: default_port(),
    }
}

fn default_logging() -> LoggingConfig {
    LoggingConfig {
        level: default_log_level(),
        json: false,
    }
}

fn default_storage() -> StorageConfig {
    StorageConfig {
        public_dir: default_public_dir(),
        data_dir: default_data_dir(),
        index: default_index(),
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_public_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_data_dir() -> PathBuf {
    default_public_dir().join("data")
}

fn default_index() -> String {
    "buchhaltung.html".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: default_server(),
            logging: default_logging(),
            storage: default_storage(),
            keys: KeyMap::default(),
        }
    }
}

impl Config {
    pub fn load(cli: &CliArgs) -> Self {
        let mut config = match std::fs::read_to_string(&cli.config) {
            Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                eprintln!("Warning: Failed to parse config file: {}", e);
                Config::default()
            }),
            Err(_) => Config::default(),
        };

        // CLI overrides
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(ref level) = cli.log_level {
            config.logging.level = level.clone();
        }
        if let Some(ref dir) = cli.data_dir {
            config.storage.data_dir = dir.clone();
        }
        if let Some(ref dir) = cli.public_dir {
            config.storage.public_dir = dir.clone();
        }

        config
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}
