use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use localfish_core::{Error, Result};

/// Line-oriented UCI conversation with one engine process.
///
/// Owns the child; callers that share a channel must hold a lock across a
/// whole command/response exchange. `searching` stays set from `go` until the
/// matching `bestmove` has been read, so an exchange abandoned halfway can be
/// finished by the next holder of the lock.
pub struct UciChannel {
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    process: Child,
    searching: bool,
}

impl UciChannel {
    pub fn spawn(binary_path: &str, args: &[String]) -> Result<Self> {
        let mut process = Command::new(binary_path)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Engine(format!("failed to spawn {}: {}", binary_path, e)))?;
        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| Error::Engine("failed to get stdin".into()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| Error::Engine("failed to get stdout".into()))?;
        Ok(Self {
            stdin,
            stdout: BufReader::new(stdout),
            process,
            searching: false,
        })
    }

    /// Runs `uci` up to `uciok` and returns the engine's `id name`.
    pub async fn handshake(&mut self) -> Result<String> {
        self.send_command("uci").await?;
        let mut name = String::from("unknown");
        loop {
            let line = self.read_line().await?;
            let line = line.trim();
            if let Some(id) = line.strip_prefix("id name ") {
                name = id.trim().to_string();
            } else if line == "uciok" {
                break;
            }
        }
        debug!(engine = %name, "uci handshake complete");
        Ok(name)
    }

    pub async fn send_command(&mut self, cmd: &str) -> Result<()> {
        trace!("sending command: {}", cmd);
        self.stdin
            .write_all(format!("{}\n", cmd).as_bytes())
            .await
            .map_err(|e| Error::Engine(format!("write failed: {}", e)))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| Error::Engine(format!("flush failed: {}", e)))?;
        Ok(())
    }

    pub async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = self
            .stdout
            .read_line(&mut line)
            .await
            .map_err(|e| Error::Engine(format!("read failed: {}", e)))?;
        if read == 0 {
            return Err(Error::Engine("engine closed its output".into()));
        }
        trace!("received: {}", line.trim());
        Ok(line)
    }

    async fn wait_for(&mut self, expected: &str) -> Result<()> {
        loop {
            let line = self.read_line().await?;
            if line.trim().starts_with(expected) {
                return Ok(());
            }
        }
    }

    pub async fn set_option(&mut self, name: &str, value: impl std::fmt::Display) -> Result<()> {
        self.send_command(&format!("setoption name {} value {}", name, value))
            .await
    }

    pub async fn set_position(&mut self, fen: &str) -> Result<()> {
        self.send_command(&format!("position fen {}", fen)).await
    }

    pub async fn go_depth(&mut self, depth: u8) -> Result<()> {
        self.send_command(&format!("go depth {}", depth)).await?;
        self.searching = true;
        Ok(())
    }

    /// Marks the current search as answered once its `bestmove` was read.
    pub fn search_finished(&mut self) {
        self.searching = false;
    }

    pub async fn stop(&mut self) -> Result<()> {
        self.send_command("stop").await
    }

    /// Round-trips `isready`, discarding anything left over from an
    /// earlier exchange.
    pub async fn ensure_ready(&mut self) -> Result<()> {
        self.send_command("isready").await?;
        self.wait_for("readyok").await
    }

    /// Reads until the next `bestmove`, giving up after `limit`.
    pub async fn drain_to_bestmove(&mut self, limit: Duration) -> Result<()> {
        timeout(limit, async {
            loop {
                let line = self.read_line().await?;
                if BestMove::parse(line.trim()).is_some() {
                    self.searching = false;
                    return Ok::<(), Error>(());
                }
            }
        })
        .await
        .map_err(|_| Error::Engine("engine did not answer stop".into()))?
    }

    /// Stops a search nobody is waiting on any more and discards its output.
    pub async fn settle(&mut self, limit: Duration) -> Result<()> {
        if !self.searching {
            return Ok(());
        }
        debug!("stopping abandoned search");
        self.stop().await?;
        self.drain_to_bestmove(limit).await
    }

    /// Sends `quit`, then kills the process if it outlives `grace`.
    pub async fn quit(&mut self, grace: Duration) -> Result<()> {
        if let Err(e) = self.send_command("quit").await {
            debug!("quit not delivered: {}", e);
        }
        match timeout(grace, self.process.wait()).await {
            Ok(Ok(status)) => {
                debug!(%status, "engine exited");
                Ok(())
            }
            Ok(Err(e)) => Err(Error::Engine(format!("wait failed: {}", e))),
            Err(_) => {
                warn!("engine ignored quit, killing it");
                self.process
                    .kill()
                    .await
                    .map_err(|e| Error::Engine(format!("kill failed: {}", e)))
            }
        }
    }

    pub fn is_running(&mut self) -> bool {
        matches!(self.process.try_wait(), Ok(None))
    }
}

#[derive(Debug, Clone, Default)]
pub struct UciInfo {
    pub depth: Option<u8>,
    pub seldepth: Option<u8>,
    pub multipv: Option<u8>,
    pub score_cp: Option<i32>,
    pub score_mate: Option<i32>,
    pub nodes: Option<u64>,
    pub nps: Option<u64>,
    pub time: Option<u64>,
    pub pv: Vec<String>,
    pub hashfull: Option<u16>,
}

impl UciInfo {
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        if parts.next() != Some("info") {
            return None;
        }
        let mut info = Self::default();
        while let Some(token) = parts.next() {
            match token {
                "depth" => info.depth = parts.next().and_then(|s| s.parse().ok()),
                "seldepth" => info.seldepth = parts.next().and_then(|s| s.parse().ok()),
                "multipv" => info.multipv = parts.next().and_then(|s| s.parse().ok()),
                "score" => match parts.next() {
                    Some("cp") => info.score_cp = parts.next().and_then(|s| s.parse().ok()),
                    Some("mate") => info.score_mate = parts.next().and_then(|s| s.parse().ok()),
                    _ => {}
                },
                "nodes" => info.nodes = parts.next().and_then(|s| s.parse().ok()),
                "nps" => info.nps = parts.next().and_then(|s| s.parse().ok()),
                "time" => info.time = parts.next().and_then(|s| s.parse().ok()),
                "hashfull" => info.hashfull = parts.next().and_then(|s| s.parse().ok()),
                "pv" => {
                    info.pv.extend(parts.map(str::to_string));
                    break;
                }
                // free text runs to the end of the line
                "string" => break,
                _ => {}
            }
        }
        Some(info)
    }

    pub fn has_score(&self) -> bool {
        self.score_cp.is_some() || self.score_mate.is_some()
    }

    /// Only the first line of a multi-PV search describes the best move.
    pub fn is_primary(&self) -> bool {
        self.multipv.unwrap_or(1) == 1
    }
}

#[derive(Debug, Clone)]
pub struct BestMove {
    pub mv: Option<String>,
    pub ponder: Option<String>,
}

impl BestMove {
    pub fn parse(line: &str) -> Option<Self> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.first() != Some(&"bestmove") {
            return None;
        }
        // `(none)` and `0000` both mean the side to move has no legal move
        let mv = parts
            .get(1)
            .filter(|m| !matches!(**m, "(none)" | "0000"))
            .map(|s| s.to_string());
        let ponder = parts
            .iter()
            .position(|&s| s == "ponder")
            .and_then(|i| parts.get(i + 1))
            .map(|s| s.to_string());
        Some(Self { mv, ponder })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uci_info_search_stats() {
        let info = UciInfo::parse("info depth 20 seldepth 25 nodes 1000000 nps 500000 time 1500")
            .unwrap();
        assert_eq!(info.depth, Some(20));
        assert_eq!(info.seldepth, Some(25));
        assert_eq!(info.nodes, Some(1000000));
        assert_eq!(info.nps, Some(500000));
        assert_eq!(info.time, Some(1500));
        assert!(!info.has_score());
    }

    #[test]
    fn test_uci_info_parse_scores() {
        let cp = UciInfo::parse("info depth 10 score cp -150 nodes 50000").unwrap();
        assert_eq!(cp.score_cp, Some(-150));
        assert_eq!(cp.score_mate, None);

        let mate = UciInfo::parse("info depth 15 score mate -3 nodes 100000").unwrap();
        assert_eq!(mate.score_mate, Some(-3));
        assert_eq!(mate.score_cp, None);
        assert!(mate.has_score());
    }

    #[test]
    fn test_uci_info_bound_scores() {
        let info =
            UciInfo::parse("info depth 12 score cp 31 lowerbound nodes 900 pv d2d4").unwrap();
        assert_eq!(info.score_cp, Some(31));
        assert_eq!(info.nodes, Some(900));
        assert_eq!(info.pv, vec!["d2d4"]);
    }

    #[test]
    fn test_uci_info_parse_pv() {
        let info = UciInfo::parse("info depth 10 multipv 1 score cp 20 pv e2e4 e7e5 g1f3").unwrap();
        assert_eq!(info.pv, vec!["e2e4", "e7e5", "g1f3"]);
        assert!(info.is_primary());

        let second = UciInfo::parse("info depth 10 multipv 2 score cp 5 pv d2d4").unwrap();
        assert!(!second.is_primary());
    }

    #[test]
    fn test_uci_info_string_is_free_text() {
        let info =
            UciInfo::parse("info string NNUE evaluation using nn.nnue depth 3 pv a2a3").unwrap();
        assert_eq!(info.depth, None);
        assert!(info.pv.is_empty());
    }

    #[test]
    fn test_uci_info_not_info_line() {
        assert!(UciInfo::parse("bestmove e2e4").is_none());
        assert!(UciInfo::parse("readyok").is_none());
        assert!(UciInfo::parse("").is_none());
    }

    #[test]
    fn test_bestmove_parse() {
        let bm = BestMove::parse("bestmove e2e4 ponder e7e5").unwrap();
        assert_eq!(bm.mv.as_deref(), Some("e2e4"));
        assert_eq!(bm.ponder.as_deref(), Some("e7e5"));

        let bm = BestMove::parse("bestmove g1f3").unwrap();
        assert_eq!(bm.ponder, None);
    }

    #[test]
    fn test_bestmove_none() {
        assert!(BestMove::parse("bestmove (none)").unwrap().mv.is_none());
        assert!(BestMove::parse("bestmove 0000").unwrap().mv.is_none());
    }

    #[test]
    fn test_bestmove_not_bestmove_line() {
        assert!(BestMove::parse("info depth 10").is_none());
        assert!(BestMove::parse("uciok").is_none());
        assert!(BestMove::parse("bestmoves e2e4").is_none());
    }
}
