use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::net::TcpListener;

use localfish_api::{ApiRouter, ApiState};
use localfish_core::EngineSession;
use localfish_stockfish::{AnalysisService, SessionConfig, StockfishSession};

pub const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
pub const FOOLS_MATE: &str = "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3";
pub const BACK_RANK: &str = "6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1";
pub const STALEMATE: &str = "7k/5Q2/6K1/8/8/8/8/8 b - - 0 1";

/// A UCI engine in a dozen lines of shell: fixed answers for a few known
/// positions and a long opening line for everything else.
const SCRIPTED_ENGINE: &str = r#"
fen=""
while IFS= read -r line; do
  case "$line" in
    uci) echo "id name Scriptfish"; echo "uciok" ;;
    isready) echo "readyok" ;;
    "position fen "*) fen="${line#position fen }" ;;
    "go depth "*)
      d="${line#go depth }"
      case "$fen" in
        "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3")
          echo "info depth 0 score mate 0"
          echo "bestmove (none)" ;;
        "7k/5Q2/6K1/8/8/8/8/8 b - - 0 1")
          echo "info depth 0 score cp 0"
          echo "bestmove (none)" ;;
        "6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1")
          echo "info depth $d seldepth 2 multipv 1 score mate 1 nodes 40 pv a1a8"
          echo "bestmove a1a8" ;;
        *)
          echo "info string NNUE evaluation enabled"
          echo "info depth $d seldepth 20 multipv 1 score cp 31 nodes 5000 nps 100000 pv e2e4 e7e5 g1f3 b8c6 f1b5 a7a6 b5a4 g8f6 e1g1 f8e7 f1e1 b7b5"
          echo "bestmove e2e4 ponder e7e5" ;;
      esac ;;
    quit) exit 0 ;;
  esac
done
"#;

pub struct TestServer {
    pub addr: SocketAddr,
    pub session: Arc<StockfishSession>,
    _engine_dir: TempDir,
    _handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn new() -> Self {
        let engine_dir = tempfile::tempdir().expect("temp dir");
        let script = engine_dir.path().join("scriptfish.sh");
        std::fs::write(&script, SCRIPTED_ENGINE).expect("write engine script");

        let config = SessionConfig {
            binary_path: "sh".to_string(),
            args: vec![script.display().to_string()],
            threads: 1,
            hash_mb: 16,
            handshake_timeout: Duration::from_secs(5),
            analysis_timeout: Duration::from_secs(5),
        };
        let session = Arc::new(StockfishSession::start(config).await.expect("engine session"));
        let analysis = Arc::new(AnalysisService::new(session.clone()));
        let router = ApiRouter::new(Arc::new(ApiState::new(analysis))).build();

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");

        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve");
        });

        TestServer {
            addr,
            session,
            _engine_dir: engine_dir,
            _handle: handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        reqwest::Client::new()
            .get(self.url(path))
            .send()
            .await
            .expect("request")
    }

    pub async fn analyze_get(&self, fen: &str, depth: Option<&str>) -> reqwest::Response {
        let mut query = vec![("fen", fen)];
        if let Some(depth) = depth {
            query.push(("depth", depth));
        }
        reqwest::Client::new()
            .get(self.url("/analyze"))
            .query(&query)
            .send()
            .await
            .expect("request")
    }

    pub async fn post_json<T: serde::Serialize>(&self, path: &str, body: &T) -> reqwest::Response {
        reqwest::Client::new()
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("request")
    }

    pub async fn post_raw(&self, path: &str, body: &'static str) -> reqwest::Response {
        reqwest::Client::new()
            .post(self.url(path))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .expect("request")
    }

    pub async fn shutdown_engine(&self) {
        self.session.stop().await.expect("stop engine");
    }
}
