use admin_styler_api_types::{ApiErrorBody, ApiErrorMessage};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::error::ErrorReport;
use crate::application::repos::RepoError;
use crate::application::settings::SettingsError;

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const INVALID_SETTING: &str = "invalid_setting";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const REPO: &str = "repo_error";
    pub const RENDER: &str = "render_error";
    pub const SETTINGS: &str = "settings_error";
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
        }
    }

    pub fn bad_request(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let hint = self.hint.clone();
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message(
            "infra::http::api",
            self.status,
            format!("{}: {}", self.code, hint.as_deref().unwrap_or(self.message)),
        )
        .attach(&mut response);
        response
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request("Malformed JSON body", Some(rejection.body_text()))
    }
}

impl From<SettingsError> for ApiError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::Validation(inner) => ApiError::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_SETTING,
                "Setting value rejected",
                Some(inner.to_string()),
            ),
            SettingsError::Repo(RepoError::Timeout) => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::DB_TIMEOUT,
                "Settings store timed out",
                None,
            ),
            SettingsError::Repo(inner) => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::REPO,
                "Settings store unavailable",
                Some(inner.to_string()),
            ),
            SettingsError::Generation(inner) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::RENDER,
                "Stylesheet generation failed",
                Some(inner.to_string()),
            ),
            other @ (SettingsError::Io { .. } | SettingsError::Archive { .. }) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::SETTINGS,
                "Settings operation failed",
                Some(other.to_string()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ValidationError;

    #[test]
    fn validation_maps_to_bad_request() {
        let err: ApiError = SettingsError::Validation(ValidationError::invalid(
            "menu_width",
            "must be at most 400px",
        ))
        .into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), codes::INVALID_SETTING);
    }

    #[test]
    fn repo_timeout_maps_to_service_unavailable() {
        let err: ApiError = SettingsError::Repo(RepoError::Timeout).into();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code(), codes::DB_TIMEOUT);
    }

    #[test]
    fn error_response_carries_report() {
        let response = ApiError::bad_request("Malformed JSON body", None).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("report attached");
        assert_eq!(report.source, "infra::http::api");
    }
}
