pub mod error;
pub mod handlers;
pub mod state;

pub use state::ApiState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::infra::http::RouterState;
use crate::infra::http::middleware::log_responses;

pub fn build_api_router(state: RouterState) -> Router<RouterState> {
    Router::new()
        .route("/api/v1/preview", post(handlers::preview))
        .route(
            "/api/v1/settings",
            get(handlers::get_settings).patch(handlers::patch_settings),
        )
        .route("/api/v1/settings/reset", post(handlers::reset_settings))
        .route("/api/v1/settings/schema", get(handlers::settings_schema))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
}
