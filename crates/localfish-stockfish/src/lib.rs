mod analysis;
mod engine;
mod session;

pub use analysis::AnalysisService;
pub use engine::{BestMove, UciChannel, UciInfo};
pub use session::{SessionConfig, StockfishSession};
