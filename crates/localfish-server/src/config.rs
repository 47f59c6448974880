use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;

use localfish_core::{DepthPolicy, DEFAULT_DEPTH, MAX_DEPTH, PV_LIMIT};
use localfish_stockfish::SessionConfig;

const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Parser)]
#[command(name = "localfish-server")]
#[command(author, version, about = "Local Stockfish analysis server", long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "LOCALFISH_CONFIG", default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(short, long)]
    pub bind: Option<SocketAddr>,

    /// Path to the Stockfish binary
    #[arg(long)]
    pub stockfish_path: Option<String>,

    #[arg(long)]
    pub threads: Option<u32>,

    /// Hash table size in MB
    #[arg(long)]
    pub hash: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub stockfish: StockfishConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StockfishConfig {
    #[serde(default = "default_stockfish_path")]
    pub binary_path: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default = "default_threads")]
    pub threads: u32,

    #[serde(default = "default_hash_mb")]
    pub hash_mb: u32,

    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_ms: u64,

    #[serde(default = "default_analysis_timeout")]
    pub analysis_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_depth")]
    pub default_depth: u8,

    #[serde(default = "default_max_depth")]
    pub max_depth: u8,

    #[serde(default = "default_pv_limit")]
    pub pv_limit: usize,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

fn default_bind_address() -> SocketAddr {
    if let Some(addr) = std::env::var("LOCALFISH_BIND_ADDRESS")
        .ok()
        .and_then(|s| s.parse().ok())
    {
        return addr;
    }
    let port = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    SocketAddr::from(([127, 0, 0, 1], port))
}

fn default_stockfish_path() -> String {
    std::env::var("STOCKFISH_PATH").unwrap_or_else(|_| "stockfish".to_string())
}

fn default_threads() -> u32 {
    4
}

fn default_hash_mb() -> u32 {
    256
}

fn default_handshake_timeout() -> u64 {
    10_000
}

fn default_analysis_timeout() -> u64 {
    60_000
}

fn default_depth() -> u8 {
    DEFAULT_DEPTH
}

fn default_max_depth() -> u8 {
    MAX_DEPTH
}

fn default_pv_limit() -> usize {
    PV_LIMIT
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

impl Default for StockfishConfig {
    fn default() -> Self {
        Self {
            binary_path: default_stockfish_path(),
            args: Vec::new(),
            threads: default_threads(),
            hash_mb: default_hash_mb(),
            handshake_timeout_ms: default_handshake_timeout(),
            analysis_timeout_ms: default_analysis_timeout(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_depth: default_depth(),
            max_depth: default_max_depth(),
            pv_limit: default_pv_limit(),
        }
    }
}

impl Config {
    /// Reads `path` if it exists, otherwise starts from defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::parse(&content)
        } else {
            Ok(Config::default())
        }
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.depth_policy()?;
        Ok(config)
    }

    pub fn from_cli(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = Self::load(&cli.config)?;
        config.apply(cli);
        Ok(config)
    }

    fn apply(&mut self, cli: &Cli) {
        if let Some(bind) = cli.bind {
            self.server.bind_address = bind;
        }
        if let Some(ref path) = cli.stockfish_path {
            self.stockfish.binary_path = path.clone();
        }
        if let Some(threads) = cli.threads {
            self.stockfish.threads = threads;
        }
        if let Some(hash) = cli.hash {
            self.stockfish.hash_mb = hash;
        }
    }

    pub fn depth_policy(&self) -> anyhow::Result<DepthPolicy> {
        Ok(DepthPolicy::new(
            self.analysis.default_depth,
            self.analysis.max_depth,
        )?)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            binary_path: self.stockfish.binary_path.clone(),
            args: self.stockfish.args.clone(),
            threads: self.stockfish.threads,
            hash_mb: self.stockfish.hash_mb,
            handshake_timeout: Duration::from_millis(self.stockfish.handshake_timeout_ms),
            analysis_timeout: Duration::from_millis(self.stockfish.analysis_timeout_ms),
        }
    }
}
