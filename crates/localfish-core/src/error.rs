use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("no FEN provided")]
    MissingPosition,

    #[error("invalid FEN: {0}")]
    InvalidPosition(String),

    #[error("invalid depth: {0}")]
    InvalidDepth(String),

    #[error("no JSON body provided")]
    MissingBody,

    #[error("analysis failed")]
    AnalysisFailed,

    #[error("analysis timeout")]
    AnalysisTimeout,

    #[error("engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("engine error: {0}")]
    Engine(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True for errors caused by the shape of the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::MissingPosition | Error::InvalidPosition(_) | Error::MissingBody
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
