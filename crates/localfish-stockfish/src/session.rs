use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use localfish_core::{EngineSession, Error, Evaluation, RawAnalysis, Result};

use crate::engine::{BestMove, UciChannel, UciInfo};

const QUIT_GRACE: Duration = Duration::from_secs(2);
const STOP_DRAIN: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub binary_path: String,
    pub args: Vec<String>,
    pub threads: u32,
    pub hash_mb: u32,
    pub handshake_timeout: Duration,
    pub analysis_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            binary_path: "stockfish".to_string(),
            args: Vec::new(),
            threads: 4,
            hash_mb: 256,
            handshake_timeout: Duration::from_secs(10),
            analysis_timeout: Duration::from_secs(60),
        }
    }
}

/// The process-wide Stockfish session.
///
/// Every exchange with the engine happens under `channel`'s lock, so two
/// requests never interleave their `position`/`go` traffic. A caller dropped
/// mid-search leaves the channel marked as searching; the next caller stops
/// that search and drains it before sending its own position.
pub struct StockfishSession {
    channel: Mutex<UciChannel>,
    engine_name: String,
    analysis_timeout: Duration,
    stopped: AtomicBool,
}

impl StockfishSession {
    pub async fn start(config: SessionConfig) -> Result<Self> {
        info!(
            path = %config.binary_path,
            threads = config.threads,
            hash_mb = config.hash_mb,
            "starting engine"
        );

        let mut channel = UciChannel::spawn(&config.binary_path, &config.args)
            .map_err(|e| Error::EngineUnavailable(e.to_string()))?;

        let configure = Self::configure(&mut channel, &config);
        let engine_name = match timeout(config.handshake_timeout, configure).await {
            Ok(Ok(name)) => name,
            Ok(Err(e)) => {
                let _ = channel.quit(QUIT_GRACE).await;
                return Err(Error::EngineUnavailable(e.to_string()));
            }
            Err(_) => {
                let _ = channel.quit(QUIT_GRACE).await;
                return Err(Error::EngineUnavailable(format!(
                    "{} did not complete the UCI handshake within {:?}",
                    config.binary_path, config.handshake_timeout
                )));
            }
        };

        info!(engine = %engine_name, "engine ready");

        Ok(Self {
            channel: Mutex::new(channel),
            engine_name,
            analysis_timeout: config.analysis_timeout,
            stopped: AtomicBool::new(false),
        })
    }

    async fn configure(channel: &mut UciChannel, config: &SessionConfig) -> Result<String> {
        let name = channel.handshake().await?;
        channel.set_option("Threads", config.threads).await?;
        channel.set_option("Hash", config.hash_mb).await?;
        channel.ensure_ready().await?;
        Ok(name)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    async fn collect(channel: &mut UciChannel) -> Result<RawAnalysis> {
        let mut latest: Option<UciInfo> = None;
        let best = loop {
            let line = channel.read_line().await?;
            let line = line.trim();
            if let Some(info) = UciInfo::parse(line) {
                if info.is_primary() && info.has_score() {
                    latest = Some(info);
                }
                continue;
            }
            if let Some(bm) = BestMove::parse(line) {
                channel.search_finished();
                break bm;
            }
        };

        let info = latest.unwrap_or_default();
        debug!(
            depth = ?info.depth,
            seldepth = ?info.seldepth,
            nodes = ?info.nodes,
            nps = ?info.nps,
            time_ms = ?info.time,
            hashfull = ?info.hashfull,
            bestmove = ?best.mv,
            ponder = ?best.ponder,
            "search finished"
        );
        let evaluation = match (info.score_mate, info.score_cp) {
            (Some(mate), _) => Some(Evaluation::mate(mate)),
            (None, Some(cp)) => Some(Evaluation::centipawns(cp)),
            (None, None) => None,
        };

        Ok(RawAnalysis {
            pv: info.pv,
            evaluation,
            depth_reached: info.depth,
        })
    }
}

#[async_trait]
impl EngineSession for StockfishSession {
    async fn analyze(&self, fen: &str, depth: u8) -> Result<RawAnalysis> {
        if self.is_stopped() {
            return Err(Error::Engine("session stopped".into()));
        }

        let mut channel = self.channel.lock().await;
        channel.settle(STOP_DRAIN).await?;

        let search = async {
            channel.ensure_ready().await?;
            channel.set_position(fen).await?;
            channel.go_depth(depth).await?;
            Self::collect(&mut channel).await
        };

        match timeout(self.analysis_timeout, search).await {
            Ok(result) => result,
            Err(_) => {
                warn!(depth, "analysis timed out, stopping search");
                channel.settle(STOP_DRAIN).await?;
                Err(Error::AnalysisTimeout)
            }
        }
    }

    async fn stop(&self) -> Result<()> {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let mut channel = self.channel.lock().await;
        if !channel.is_running() {
            debug!("engine already exited");
            return Ok(());
        }
        channel.quit(QUIT_GRACE).await?;
        info!(engine = %self.engine_name, "engine closed");
        Ok(())
    }

    fn name(&self) -> &str {
        &self.engine_name
    }
}
