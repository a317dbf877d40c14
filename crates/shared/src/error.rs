use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    Internal,
}

/// Error body returned by the bills API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }
}

/// Status classification of a failed remote call, set by the store that
/// observed the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    NotFound,
    ServerError,
    Unknown,
}

impl FetchErrorKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            404 => Self::NotFound,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    pub fn status_code(self) -> Option<u16> {
        match self {
            Self::NotFound => Some(404),
            Self::ServerError => Some(500),
            Self::Unknown => None,
        }
    }
}

impl From<ErrorCode> for FetchErrorKind {
    fn from(value: ErrorCode) -> Self {
        match value {
            ErrorCode::NotFound => Self::NotFound,
            ErrorCode::Internal => Self::ServerError,
            ErrorCode::Unauthorized | ErrorCode::Forbidden | ErrorCode::Validation => {
                Self::Unknown
            }
        }
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code() {
            Some(code) => write!(f, "Erreur {code}"),
            None => f.write_str("Erreur"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct RemoteFetchError {
    pub kind: FetchErrorKind,
    pub message: String,
}

impl RemoteFetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::NotFound, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::ServerError, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Unknown, message)
    }

    /// Text shown to the user in place of the view that failed to load.
    pub fn user_message(&self) -> String {
        match self.kind {
            FetchErrorKind::NotFound => {
                format!("{} : la page demandée est introuvable", self.kind)
            }
            FetchErrorKind::ServerError => {
                format!("{} : les serveurs sont injoignables", self.kind)
            }
            FetchErrorKind::Unknown => {
                format!("{} : une erreur est survenue ({})", self.kind, self.message)
            }
        }
    }
}

impl From<ApiError> for RemoteFetchError {
    fn from(value: ApiError) -> Self {
        let kind = value
            .code
            .map(FetchErrorKind::from)
            .unwrap_or(FetchErrorKind::Unknown);
        Self::new(kind, value.message)
    }
}
