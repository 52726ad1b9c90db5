use admin_styler_api_types::{
    DEFAULT_PREVIEW_SESSION, PREVIEW_SEQUENCE_HEADER, PREVIEW_STATUS_HEADER, PreviewRequest,
    PreviewResponse, PreviewStatus, SchemaEntry, SettingWarning, SettingsResponse,
};
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value};

use crate::application::preview::{self, PreviewOutcome};
use crate::application::settings::SavedSettings;
use crate::domain::error::ValidationError;
use crate::domain::schema::{SCHEMA, SettingKind, SettingSpec};

use super::error::ApiError;
use super::state::ApiState;

const CSS_CONTENT_TYPE: &str = "text/css; charset=utf-8";

/// -------- Preview --------

/// Always answers 200 for a well-formed request; the outcome is in the payload.
pub async fn preview(
    State(state): State<ApiState>,
    headers: HeaderMap,
    payload: Result<Json<PreviewRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;

    let session = request
        .session
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_PREVIEW_SESSION)
        .to_string();

    let outcome = state
        .preview
        .preview(preview::PreviewRequest {
            session,
            sequence: request.sequence,
            overrides: request.settings,
        })
        .await;

    if accepts_css(&headers) {
        Ok(css_preview_response(outcome))
    } else {
        Ok(Json(preview_to_api(outcome)).into_response())
    }
}

fn accepts_css(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| {
            accept
                .split(',')
                .any(|part| part.trim().starts_with("text/css"))
        })
}

fn preview_to_api(outcome: PreviewOutcome) -> PreviewResponse {
    match outcome {
        PreviewOutcome::Delivered {
            sequence,
            css,
            fingerprint,
            issues,
        } => PreviewResponse {
            status: PreviewStatus::Delivered,
            sequence,
            latest: None,
            css: Some(css.as_str().to_string()),
            fingerprint: Some(fingerprint.to_string()),
            reason: None,
            warnings: warnings(&issues),
        },
        PreviewOutcome::Superseded { sequence, latest } => PreviewResponse {
            status: PreviewStatus::Superseded,
            sequence,
            latest: Some(latest),
            css: None,
            fingerprint: None,
            reason: None,
            warnings: Vec::new(),
        },
        PreviewOutcome::Fallback {
            sequence,
            css,
            reason,
        } => PreviewResponse {
            status: PreviewStatus::Fallback,
            sequence,
            latest: None,
            css: Some(css.as_str().to_string()),
            fingerprint: None,
            reason: Some(reason),
            warnings: Vec::new(),
        },
    }
}

fn css_preview_response(outcome: PreviewOutcome) -> Response {
    let sequence = outcome.sequence();
    let (status, body) = match outcome {
        PreviewOutcome::Delivered { css, .. } => (PreviewStatus::Delivered, css.as_str().to_string()),
        PreviewOutcome::Superseded { .. } => (PreviewStatus::Superseded, String::new()),
        PreviewOutcome::Fallback { css, .. } => (PreviewStatus::Fallback, css.as_str().to_string()),
    };

    let mut response = body.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(CSS_CONTENT_TYPE));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(
        PREVIEW_STATUS_HEADER,
        HeaderValue::from_static(status.as_str()),
    );
    headers.insert(PREVIEW_SEQUENCE_HEADER, HeaderValue::from(sequence));
    response
}

fn warnings(issues: &[ValidationError]) -> Vec<SettingWarning> {
    issues
        .iter()
        .map(|issue| SettingWarning {
            key: issue.key().to_string(),
            message: issue.to_string(),
        })
        .collect()
}

/// -------- Settings --------

pub async fn get_settings(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.settings.snapshot().await?;
    Ok(Json(SettingsResponse {
        fingerprint: snapshot.fingerprint().to_string(),
        settings: snapshot.to_json_map(),
        ignored: Vec::new(),
    }))
}

pub async fn patch_settings(
    State(state): State<ApiState>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(patch) = payload?;
    if patch.is_empty() {
        return Err(ApiError::bad_request(
            "Settings patch is empty",
            Some("send at least one setting".to_string()),
        ));
    }

    let saved = state.settings.update(&patch).await?;
    Ok(Json(saved_to_api(saved)))
}

pub async fn reset_settings(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let saved = state.settings.reset().await?;
    Ok(Json(saved_to_api(saved)))
}

pub async fn settings_schema() -> impl IntoResponse {
    let entries: Vec<SchemaEntry> = SCHEMA.iter().map(schema_entry).collect();
    Json(entries)
}

fn saved_to_api(saved: SavedSettings) -> SettingsResponse {
    SettingsResponse {
        fingerprint: saved.fingerprint.to_string(),
        settings: saved.snapshot.to_json_map(),
        ignored: saved.ignored,
    }
}

fn schema_entry(spec: &SettingSpec) -> SchemaEntry {
    let mut entry = SchemaEntry {
        key: spec.name.to_string(),
        kind: String::new(),
        default: spec.default.to_value().to_json(),
        min: None,
        max: None,
        unit: None,
        choices: Vec::new(),
    };

    match spec.kind {
        SettingKind::Color => entry.kind = "color".to_string(),
        SettingKind::Length { min, max, unit } => {
            entry.kind = "length".to_string();
            entry.min = Some(min);
            entry.max = Some(max);
            entry.unit = Some(unit.to_string());
        }
        SettingKind::Toggle => entry.kind = "toggle".to_string(),
        SettingKind::Choice(choices) => {
            entry.kind = "choice".to_string();
            entry.choices = choices.iter().map(|choice| choice.to_string()).collect();
        }
        SettingKind::Text { max_len } => {
            entry.kind = "text".to_string();
            entry.max = i64::try_from(max_len).ok();
        }
    }

    entry
}
