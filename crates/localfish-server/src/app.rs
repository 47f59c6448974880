use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use localfish_api::{ApiRouter, ApiState};
use localfish_stockfish::{AnalysisService, StockfishSession};

use crate::config::Config;

pub struct Application {
    config: Config,
    analysis: Arc<AnalysisService>,
}

impl Application {
    /// Starts the engine. A missing or broken binary is returned as
    /// `EngineUnavailable`; the caller decides whether to exit.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let policy = config.depth_policy()?;
        let session = Arc::new(StockfishSession::start(config.session_config()).await?);

        let analysis = Arc::new(
            AnalysisService::new(session)
                .with_depth_policy(policy)
                .with_pv_limit(config.analysis.pv_limit),
        );
        info!(
            engine = analysis.engine_name(),
            max_depth = policy.max_depth,
            "analysis service ready"
        );

        Ok(Self { config, analysis })
    }

    /// Serves until a shutdown signal, then closes the engine. The engine is
    /// closed on the error path too.
    pub async fn run(self) -> anyhow::Result<()> {
        let served = self.serve().await;

        if let Err(e) = self.analysis.shutdown().await {
            warn!("engine shutdown failed: {}", e);
        }
        info!("server shutdown complete");

        served
    }

    async fn serve(&self) -> anyhow::Result<()> {
        let state = Arc::new(ApiState::new(self.analysis.clone()));
        let router = ApiRouter::new(state).build();

        let addr = self.config.server.bind_address;
        let listener = TcpListener::bind(addr).await?;
        info!(address = %addr, "HTTP server listening");
        info!("endpoints: http://{}/health, http://{}/analyze?fen=...&depth=20", addr, addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("failed to listen for ctrl+c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
