//! Wire types shared by the admin-styler HTTP API and its clients.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Session used when a preview request does not name one.
pub const DEFAULT_PREVIEW_SESSION: &str = "default";

/// Response header carrying the preview status when CSS is returned as `text/css`.
pub const PREVIEW_STATUS_HEADER: &str = "x-preview-status";

/// Response header carrying the preview sequence number when CSS is returned as `text/css`.
pub const PREVIEW_SEQUENCE_HEADER: &str = "x-preview-sequence";

/// Live preview request: a partial settings override merged onto stored settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PreviewRequest {
    #[serde(default)]
    pub session: Option<String>,
    /// Client-side sequence number; only the highest seen per session is honoured.
    #[serde(default)]
    pub sequence: Option<u64>,
    #[serde(default)]
    pub settings: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewStatus {
    Delivered,
    Superseded,
    Fallback,
}

impl PreviewStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PreviewStatus::Delivered => "delivered",
            PreviewStatus::Superseded => "superseded",
            PreviewStatus::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PreviewResponse {
    pub status: PreviewStatus,
    pub sequence: u64,
    /// Newest sequence registered for the session; set when superseded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<u64>,
    /// Absent when the request was superseded; the caller should keep waiting for the newer one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    /// Why an earlier stylesheet was returned; set on fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<SettingWarning>,
}

/// A setting that could not be applied as given.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SettingWarning {
    pub key: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SettingsResponse {
    pub fingerprint: String,
    pub settings: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignored: Vec<String>,
}

/// Description of one entry in the settings schema.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchemaEntry {
    pub key: String,
    pub kind: String,
    pub default: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_request_accepts_bare_settings() {
        let request: PreviewRequest =
            serde_json::from_str(r##"{"settings":{"menu_background":"#ff0000"}}"##)
                .expect("request should parse");
        assert!(request.session.is_none());
        assert!(request.sequence.is_none());
        assert_eq!(request.settings.len(), 1);
    }

    #[test]
    fn superseded_response_omits_css() {
        let response = PreviewResponse {
            status: PreviewStatus::Superseded,
            sequence: 3,
            latest: Some(4),
            css: None,
            fingerprint: None,
            reason: None,
            warnings: Vec::new(),
        };
        let json = serde_json::to_value(&response).expect("serialize");
        assert_eq!(json["status"], "superseded");
        assert_eq!(json["latest"], 4);
        assert!(json.get("css").is_none());
        assert!(json.get("warnings").is_none());
    }
}
