use std::any::Any;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

use localfish_core::RequestValidator;
use localfish_stockfish::AnalysisService;

use crate::rest::{ErrorResponse, RestRouter};

#[derive(Clone)]
pub struct ApiState {
    pub analysis: Arc<AnalysisService>,
    pub validator: RequestValidator,
}

impl ApiState {
    pub fn new(analysis: Arc<AnalysisService>) -> Self {
        let validator = RequestValidator::new(*analysis.policy());
        Self {
            analysis,
            validator,
        }
    }
}

pub struct ApiRouter {
    state: Arc<ApiState>,
}

impl ApiRouter {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }

    pub fn build(self) -> Router {
        // Browser extensions call from their own origins.
        let cors = CorsLayer::new()
            .allow_origin(AnyOrigin)
            .allow_methods(AnyOrigin)
            .allow_headers(AnyOrigin);

        RestRouter::new(self.state).build().layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors)
                .layer(CatchPanicLayer::custom(panic_response)),
        )
    }
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown panic".to_string());
    error!("request handler panicked: {}", detail);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "Internal server error".to_string(),
        }),
    )
        .into_response()
}
