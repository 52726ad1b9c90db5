use thiserror::Error;

/// A setting value that could not be accepted as given.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown setting `{key}`")]
    UnknownKey { key: String },
    #[error("setting `{key}` {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ValidationError {
    pub fn unknown(key: impl Into<String>) -> Self {
        Self::UnknownKey { key: key.into() }
    }

    pub fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }

    /// Wire name of the offending setting.
    pub fn key(&self) -> &str {
        match self {
            ValidationError::UnknownKey { key } => key.as_str(),
            ValidationError::Invalid { key, .. } => key,
        }
    }

    pub fn is_unknown_key(&self) -> bool {
        matches!(self, ValidationError::UnknownKey { .. })
    }
}
