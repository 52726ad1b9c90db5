use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::application::settings::SettingsError;
use crate::infra::error::InfraError;

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Plain-text error for the public stylesheet and health routes.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            status,
            public_message,
            report: ErrorReport::from_message(source, status, detail),
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        Self {
            status,
            public_message,
            report: ErrorReport::from_error(source, status, error),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

impl From<SettingsError> for HttpError {
    fn from(error: SettingsError) -> Self {
        const SOURCE: &str = "infra::http::settings_error_to_http_error";
        match &error {
            SettingsError::Validation(_) => HttpError::from_error(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Request could not be processed",
                &error,
            ),
            SettingsError::Repo(_) => HttpError::from_error(
                SOURCE,
                StatusCode::SERVICE_UNAVAILABLE,
                "Service temporarily unavailable",
                &error,
            ),
            SettingsError::Generation(_) | SettingsError::Archive { .. } | SettingsError::Io { .. } => {
                HttpError::from_error(
                    SOURCE,
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                    &error,
                )
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use super::*;
    use crate::application::repos::RepoError;
    use crate::application::stylesheet::GenerationError;
    use crate::domain::error::ValidationError;

    #[test]
    fn report_collects_the_source_chain() {
        let error = AppError::from(SettingsError::from(ValidationError::invalid(
            "menu_width",
            "must be a number of px",
        )));
        let report = ErrorReport::from_error("test", StatusCode::BAD_REQUEST, &error);
        assert!(report.messages[0].contains("menu_width"));
    }

    #[test]
    fn bind_failure_reports_the_address_and_cause() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().expect("socket addr");
        let error = AppError::from(InfraError::Bind {
            addr,
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use"),
        });
        assert_eq!(
            error.to_string(),
            "failed to bind 127.0.0.1:8080: address in use"
        );

        let report = ErrorReport::from_error("test", StatusCode::INTERNAL_SERVER_ERROR, &error);
        assert_eq!(report.messages.last().map(String::as_str), Some("address in use"));
    }

    #[test]
    fn settings_errors_map_to_http_statuses() {
        let validation = HttpError::from(SettingsError::from(ValidationError::unknown("x")));
        assert_eq!(validation.status(), StatusCode::BAD_REQUEST);

        let repo = HttpError::from(SettingsError::from(RepoError::Timeout));
        assert_eq!(repo.status(), StatusCode::SERVICE_UNAVAILABLE);

        let generation = HttpError::from(SettingsError::from(GenerationError::Empty));
        assert_eq!(generation.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
