use super::Move;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default search depth when the caller gives none, or gives garbage.
pub const DEFAULT_DEPTH: u8 = 20;
/// Deepest search the service will ask the engine for.
pub const MAX_DEPTH: u8 = 30;
/// Plies of the principal variation returned to callers.
pub const PV_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub id: Uuid,
    pub fen: String,
    pub depth: u8,
}

impl AnalysisRequest {
    pub fn new(fen: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            fen: fen.into(),
            depth: DEFAULT_DEPTH,
        }
    }

    pub fn with_depth(mut self, depth: u8) -> Self {
        self.depth = depth;
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Evaluation {
    pub score_type: ScoreType,
    pub value: i32,
}

impl Evaluation {
    pub fn centipawns(cp: i32) -> Self {
        Self {
            score_type: ScoreType::Centipawns,
            value: cp,
        }
    }

    pub fn mate(moves: i32) -> Self {
        Self {
            score_type: ScoreType::Mate,
            value: moves,
        }
    }

    pub fn pawns(&self) -> Option<f64> {
        match self.score_type {
            ScoreType::Centipawns => Some(f64::from(self.value) / 100.0),
            ScoreType::Mate => None,
        }
    }

    pub fn mate_in(&self) -> Option<i32> {
        match self.score_type {
            ScoreType::Mate => Some(self.value),
            ScoreType::Centipawns => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ScoreType {
    Centipawns,
    Mate,
}

/// The engine's final report for one search, before any shaping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawAnalysis {
    pub pv: Vec<String>,
    pub evaluation: Option<Evaluation>,
    pub depth_reached: Option<u8>,
}

/// Normalized analysis of one position.
///
/// Holds a single [`Evaluation`], so the wire form always carries exactly
/// one of `evaluation` (pawns) and `mate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "AnalysisResponse", try_from = "AnalysisResponse")]
pub struct AnalysisResult {
    pub best_move: Option<Move>,
    pub evaluation: Evaluation,
    pub principal_variation: Vec<Move>,
    pub depth: u8,
}

impl AnalysisResult {
    pub fn evaluation_pawns(&self) -> Option<f64> {
        self.evaluation.pawns()
    }

    pub fn mate_in(&self) -> Option<i32> {
        self.evaluation.mate_in()
    }

    pub fn continuation(&self) -> String {
        self.principal_variation
            .iter()
            .map(Move::to_uci)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// JSON shape of [`AnalysisResult`] as browser clients expect it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub bestmove: Option<String>,
    pub evaluation: Option<f64>,
    pub mate: Option<i32>,
    pub continuation: String,
    pub depth: u8,
}

impl From<AnalysisResult> for AnalysisResponse {
    fn from(result: AnalysisResult) -> Self {
        Self {
            bestmove: result.best_move.as_ref().map(Move::to_uci),
            evaluation: result.evaluation_pawns(),
            mate: result.mate_in(),
            continuation: result.continuation(),
            depth: result.depth,
        }
    }
}

impl TryFrom<AnalysisResponse> for AnalysisResult {
    type Error = String;

    fn try_from(wire: AnalysisResponse) -> Result<Self, Self::Error> {
        let evaluation = match (wire.evaluation, wire.mate) {
            (Some(pawns), None) => Evaluation::centipawns((pawns * 100.0).round() as i32),
            (None, Some(mate)) => Evaluation::mate(mate),
            _ => return Err("exactly one of evaluation and mate must be set".to_string()),
        };

        let principal_variation = wire
            .continuation
            .split_whitespace()
            .map(|m| Move::from_uci(m).ok_or_else(|| format!("invalid move: {}", m)))
            .collect::<Result<Vec<_>, _>>()?;

        let best_move = match wire.bestmove {
            Some(m) => Some(Move::from_uci(&m).ok_or_else(|| format!("invalid move: {}", m))?),
            None => None,
        };

        Ok(Self {
            best_move,
            evaluation,
            principal_variation,
            depth: wire.depth,
        })
    }
}
