//! Process configuration: listen address, log level, and the static list of rooms to pre-create
//!. Room creation itself is out of scope; this file's `RoomSpec` list stands in for it.

use std::collections::HashMap;
use std::fs::read_to_string;
use std::net::SocketAddr;

use clap::Parser;
use serde::Deserialize;
use service::RoomConfig;

/// Default configuration used when no `--config` path is given, or when the given path cannot be
/// read. Matches the shape of the bundled example in `config.json5` at the repository root.
const DEFAULT_CONFIG: &str = r#"
{
    listen: "0.0.0.0:8088",
    log_level: "info",
    rooms: [
        {
            id: 1,
            application_name: "iguana online",
            version: "0.0.0 beta",
            password: "",
            capacity: 16,
            creator_token: "change-me",
            info: {},
        },
    ],
}
"#;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

impl LogLevel {
    pub fn as_level(&self) -> log::Level {
        match self {
            Self::Error => log::Level::Error,
            Self::Warn => log::Level::Warn,
            Self::Info => log::Level::Info,
            Self::Debug => log::Level::Debug,
            Self::Trace => log::Level::Trace,
        }
    }
}

/// One pre-created room, matching the room shape the out-of-scope creation RPC
/// would otherwise have produced.
#[derive(Debug, Deserialize)]
pub struct RoomSpec {
    pub id: u32,
    pub application_name: String,
    pub version: String,
    #[serde(default)]
    pub password: String,
    pub capacity: usize,
    pub creator_token: String,
    #[serde(default)]
    pub info: HashMap<String, String>,
}

impl From<&RoomSpec> for RoomConfig {
    fn from(spec: &RoomSpec) -> Self {
        Self {
            application_name: spec.application_name.clone(),
            version: spec.version.clone(),
            password: spec.password.clone(),
            capacity: spec.capacity,
            creator_token: spec.creator_token.clone(),
            info: spec.info.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub listen: SocketAddr,
    #[serde(default)]
    pub log_level: LogLevel,
    pub rooms: Vec<RoomSpec>,
}

#[derive(Parser)]
#[command(
    about = env!("CARGO_PKG_DESCRIPTION"),
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    /// Path to a JSON5 configuration file.
    #[arg(long)]
    config: Option<String>,
}

impl Config {
    /// Parses the CLI, reads the configured JSON5 file if one was given, and falls back to the
    /// bundled default otherwise.
    pub fn load() -> anyhow::Result<Self> {
        let cli = Cli::parse();
        let raw = match cli.config {
            Some(path) => read_to_string(&path)
                .map_err(|e| anyhow::anyhow!("failed to read config file {path}: {e}"))?,
            None => DEFAULT_CONFIG.to_string(),
        };

        serde_json5::from_str(&raw).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))
    }
}
