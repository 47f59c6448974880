use std::sync::Arc;

use localfish_core::{
    AnalysisRequest, AnalysisResult, ChessPosition, DepthPolicy, EngineSession, Error, Move,
    RawAnalysis, Result, PV_LIMIT,
};
use tracing::{debug, error, instrument};

/// Shapes engine output into [`AnalysisResult`]s.
pub struct AnalysisService {
    session: Arc<dyn EngineSession>,
    policy: DepthPolicy,
    pv_limit: usize,
}

impl AnalysisService {
    pub fn new(session: Arc<dyn EngineSession>) -> Self {
        Self {
            session,
            policy: DepthPolicy::default(),
            pv_limit: PV_LIMIT,
        }
    }

    pub fn with_depth_policy(mut self, policy: DepthPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_pv_limit(mut self, plies: usize) -> Self {
        self.pv_limit = plies.max(1);
        self
    }

    pub fn policy(&self) -> &DepthPolicy {
        &self.policy
    }

    pub fn engine_name(&self) -> &str {
        self.session.name()
    }

    #[instrument(skip(self, request), fields(id = %request.id, depth = request.depth))]
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult> {
        let position = ChessPosition::parse(&request.fen)?;
        let depth = self.policy.clamp(i64::from(request.depth));

        let raw = self
            .session
            .analyze(&position.fen, depth)
            .await
            .map_err(|e| {
                error!(fen = %position.fen, "analysis error: {}", e);
                match e {
                    Error::AnalysisTimeout => Error::AnalysisTimeout,
                    _ => Error::AnalysisFailed,
                }
            })?;

        let depth_reached = raw.depth_reached;
        let result = self.normalize(raw, depth)?;
        debug!(
            bestmove = ?result.best_move.as_ref().map(Move::to_uci),
            depth_reached = ?depth_reached,
            "analysis complete"
        );
        Ok(result)
    }

    /// Turns the engine's final line into the response shape.
    ///
    /// The best move is the head of the principal variation, so a position
    /// with no legal moves yields no best move and an empty line.
    pub fn normalize(&self, raw: RawAnalysis, depth: u8) -> Result<AnalysisResult> {
        let evaluation = raw.evaluation.ok_or_else(|| {
            error!("engine reported no score");
            Error::AnalysisFailed
        })?;

        let principal_variation: Vec<Move> = raw
            .pv
            .iter()
            .map_while(|m| Move::from_uci(m))
            .take(self.pv_limit)
            .collect();

        Ok(AnalysisResult {
            best_move: principal_variation.first().cloned(),
            evaluation,
            principal_variation,
            depth,
        })
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.session.stop().await
    }
}
