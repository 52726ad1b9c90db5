pub mod api;
mod middleware;
mod public;

pub use api::{ApiState, build_api_router as build_api_v1_router};
pub use middleware::REQUEST_ID_HEADER;
pub use public::{HttpState, build_router};

use std::sync::Arc;

use axum::Router;
use axum::extract::FromRef;
use axum::middleware as axum_middleware;

use crate::application::preview::PreviewService;
use crate::application::settings::SettingsService;

#[derive(Clone)]
pub struct RouterState {
    pub http: HttpState,
    pub api: ApiState,
}

impl RouterState {
    pub fn new(settings: Arc<SettingsService>, preview: Arc<PreviewService>) -> Self {
        Self {
            http: HttpState {
                settings: Arc::clone(&settings),
            },
            api: ApiState { settings, preview },
        }
    }
}

impl FromRef<RouterState> for HttpState {
    fn from_ref(state: &RouterState) -> Self {
        state.http.clone()
    }
}

impl FromRef<RouterState> for ApiState {
    fn from_ref(state: &RouterState) -> Self {
        state.api.clone()
    }
}

/// Public stylesheet routes merged with the JSON API, ready to serve.
pub fn app_router(state: RouterState) -> Router {
    build_router(state.clone())
        .merge(build_api_v1_router(state.clone()))
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}
