use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE, ETAG, IF_NONE_MATCH},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use tracing::warn;

use crate::application::error::{ErrorReport, HttpError};
use crate::application::settings::{SettingsError, SettingsService};
use crate::domain::css::CssDocument;

use super::{RouterState, middleware::log_responses};

const SOURCE: &str = "infra::http::public";
const CSS_CONTENT_TYPE: &str = "text/css; charset=utf-8";

#[derive(Clone)]
pub struct HttpState {
    pub settings: Arc<SettingsService>,
}

pub fn build_router(state: RouterState) -> Router<RouterState> {
    Router::new()
        .route("/styles/admin.css", get(admin_stylesheet))
        .route("/health", get(health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
}

async fn admin_stylesheet(State(state): State<HttpState>, headers: HeaderMap) -> Response {
    let rendered = match state.settings.stylesheet().await {
        Ok(rendered) => rendered,
        Err(SettingsError::Generation(err)) => {
            warn!(
                source = SOURCE,
                error = %err,
                "Serving empty stylesheet; nothing rendered successfully yet"
            );
            return css_response(&CssDocument::empty(), None, "no-store");
        }
        Err(err) => return HttpError::from(err).into_response(),
    };

    let etag = format!("\"{}\"", rendered.fingerprint);
    if etag_matches(&headers, &etag) {
        let mut response = StatusCode::NOT_MODIFIED.into_response();
        if let Ok(value) = HeaderValue::from_str(&etag) {
            response.headers_mut().insert(ETAG, value);
        }
        return response;
    }

    css_response(&rendered.css, Some(&etag), "no-cache")
}

fn css_response(css: &CssDocument, etag: Option<&str>, cache_control: &'static str) -> Response {
    let mut response = css.as_str().to_string().into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(CSS_CONTENT_TYPE));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(cache_control));
    if let Some(etag) = etag
        && let Ok(value) = HeaderValue::from_str(etag)
    {
        headers.insert(ETAG, value);
    }
    response
}

fn etag_matches(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get_all(IF_NONE_MATCH)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .any(|candidate| {
            candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
        })
}

async fn health(State(state): State<HttpState>) -> Response {
    match state.settings.health_check().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn if_none_match_accepts_lists_and_weak_tags() {
        let etag = "\"abc\"";
        let mut headers = HeaderMap::new();
        assert!(!etag_matches(&headers, etag));

        headers.insert(IF_NONE_MATCH, HeaderValue::from_static("\"zzz\", W/\"abc\""));
        assert!(etag_matches(&headers, etag));

        headers.insert(IF_NONE_MATCH, HeaderValue::from_static("\"zzz\""));
        assert!(!etag_matches(&headers, etag));
    }
}
