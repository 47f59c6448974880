use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use localfish_core::{AnalysisResult, AnalyzeParams, Error, QueryParams};

use crate::ApiState;

pub const ENGINE: &str = "stockfish";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub engine: String,
    pub version: String,
    pub max_depth: u8,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn reject(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

/// Maps an error onto the status and body clients see.
///
/// Engine failures get a fixed message; their detail only goes to the log.
pub fn error_response(err: &Error) -> ApiError {
    match err {
        Error::MissingPosition => reject(StatusCode::BAD_REQUEST, "No FEN provided"),
        Error::InvalidPosition(_) => reject(StatusCode::BAD_REQUEST, "Invalid FEN string"),
        Error::MissingBody => reject(StatusCode::BAD_REQUEST, "No JSON body provided"),
        Error::AnalysisFailed => reject(StatusCode::INTERNAL_SERVER_ERROR, "Analysis failed"),
        Error::AnalysisTimeout => {
            reject(StatusCode::INTERNAL_SERVER_ERROR, "Analysis timed out")
        }
        _ => reject(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
    }
}

async fn run_analysis(
    state: &ApiState,
    params: AnalyzeParams,
) -> Result<Json<AnalysisResult>, ApiError> {
    let request = state.validator.validate(params).map_err(|e| {
        debug!("rejected request: {}", e);
        error_response(&e)
    })?;

    match state.analysis.analyze(&request).await {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            if e.is_client_error() {
                debug!(id = %request.id, "rejected position: {}", e);
            } else {
                warn!(id = %request.id, "analysis failed: {}", e);
            }
            Err(error_response(&e))
        }
    }
}

/// Takes the query as raw pairs so repeated keys resolve to their first
/// value instead of an extractor rejection.
pub async fn analyze_query(
    State(state): State<Arc<ApiState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let params: QueryParams = pairs.into_iter().collect();
    run_analysis(&state, AnalyzeParams::Query(params)).await
}

pub async fn analyze_body(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> Result<Json<AnalysisResult>, ApiError> {
    let body: Value = serde_json::from_slice(&body)
        .map_err(|_| reject(StatusCode::BAD_REQUEST, "No JSON body provided"))?;
    run_analysis(&state, AnalyzeParams::Body(body)).await
}

pub async fn health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        engine: ENGINE.to_string(),
        version: VERSION.to_string(),
        max_depth: state.validator.policy().max_depth,
    })
}

pub async fn index() -> Json<Value> {
    Json(json!({
        "name": "Chess Engine API",
        "version": VERSION,
        "endpoints": {
            "/health": "GET - Health check",
            "/analyze": "GET/POST - Analyze position (params: fen, depth)",
        },
        "documentation": "https://github.com/localfish/localfish#readme",
    }))
}

pub async fn not_found() -> ApiError {
    reject(StatusCode::NOT_FOUND, "Endpoint not found")
}
