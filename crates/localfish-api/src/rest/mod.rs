mod handlers;
use crate::ApiState;
use axum::routing::get;
use axum::Router;
pub use handlers::*;
use std::sync::Arc;
pub struct RestRouter {
    state: Arc<ApiState>,
}
impl RestRouter {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
    pub fn build(self) -> Router {
        Router::new()
            .route("/", get(handlers::index))
            .route("/health", get(handlers::health))
            .route(
                "/analyze",
                get(handlers::analyze_query).post(handlers::analyze_body),
            )
            .fallback(handlers::not_found)
            .with_state(self.state)
    }
}
