use async_trait::async_trait;

use crate::error::Result;
use crate::types::RawAnalysis;

/// A long-lived conversation with an external analysis engine.
///
/// Implementations serialize concurrent callers themselves; a single session
/// is shared by every request handler.
#[async_trait]
pub trait EngineSession: Send + Sync {
    /// Searches `fen` to `depth` plies and reports the engine's final line.
    async fn analyze(&self, fen: &str, depth: u8) -> Result<RawAnalysis>;

    /// Terminates the engine. Calling it more than once is a no-op.
    async fn stop(&self) -> Result<()>;

    /// Engine identity as reported during the handshake.
    fn name(&self) -> &str;
}
