use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::warn;

use crate::db::SqlxErrorExt;

/// Whether error responses may carry internal detail. Enabled outside
/// of production by [`install`], disabled by default.
static VERBOSE_ERRORS: OnceCell<bool> = OnceCell::new();

pub fn install(verbose: bool) {
    let _ = VERBOSE_ERRORS.set(verbose);
}

fn verbose_errors() -> bool {
    VERBOSE_ERRORS.get().copied().unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub enum ApiErrorCategory {
    /// Bad input shape or format.
    InvalidRequest,
    /// A uniqueness expectation was violated.
    Conflict,
    NotFound,
    AccessDenied,
    Unknown,
}

impl ApiErrorCategory {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::Conflict => "conflict",
            Self::NotFound => "not_found",
            Self::AccessDenied => "access_denied",
            Self::Unknown => "unknown",
        }
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest | Self::Conflict => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::AccessDenied => StatusCode::UNAUTHORIZED,
            Self::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn default_message(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "Invalid request",
            Self::Conflict => "Resource conflict",
            Self::NotFound => "Not found",
            Self::AccessDenied => "Access denied",
            Self::Unknown => "Internal server error",
        }
    }
}

#[derive(Debug)]
#[must_use]
pub struct ApiError {
    pub category: ApiErrorCategory,
    pub message: Option<String>,
    /// Internal cause, only serialized when verbose errors are installed.
    pub detail: Option<String>,
}

impl ApiError {
    pub fn new(category: ApiErrorCategory) -> Self {
        Self {
            category,
            message: None,
            detail: None,
        }
    }

    pub fn unknown() -> Self {
        Self::new(ApiErrorCategory::Unknown)
    }

    pub fn message(self, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..self
        }
    }

    pub fn detail(self, detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
            ..self
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = self
            .message
            .as_deref()
            .unwrap_or_else(|| self.category.default_message());
        write!(f, "{message} ({})", self.category.code())
    }
}

impl std::error::Error for ApiError {}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'a str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self
            .message
            .as_deref()
            .unwrap_or_else(|| self.category.default_message());

        let detail = if verbose_errors() {
            self.detail.as_deref()
        } else {
            None
        };

        let body = ErrorBody {
            error: message,
            code: self.category.code(),
            detail,
        };

        (self.category.status_code(), Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(error: sqlx::Error) -> Self {
        if error.is_unique_violation() {
            return Self::new(ApiErrorCategory::Conflict).detail(error.to_string());
        }
        warn!(%error, "database operation failed");
        Self::unknown().detail(error.to_string())
    }
}

impl From<crate::db::Error> for ApiError {
    fn from(error: crate::db::Error) -> Self {
        if error.is_unique_violation() {
            return Self::new(ApiErrorCategory::Conflict).detail(error.to_string());
        }
        warn!(%error, "database operation failed");
        Self::unknown().detail(error.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(error: std::io::Error) -> Self {
        warn!(%error, "filesystem operation failed");
        Self::unknown().detail(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_status_codes() {
        assert_eq!(
            ApiErrorCategory::InvalidRequest.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiErrorCategory::Conflict.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiErrorCategory::NotFound.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiErrorCategory::AccessDenied.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiErrorCategory::Unknown.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn displays_message_and_code() {
        let error = ApiError::new(ApiErrorCategory::Conflict).message("Custom ID already taken");
        assert_eq!(error.to_string(), "Custom ID already taken (conflict)");

        assert_eq!(ApiError::unknown().to_string(), "Internal server error (unknown)");
    }

    #[test]
    fn body_always_has_error_field() {
        let body = ErrorBody {
            error: "Custom ID already taken",
            code: ApiErrorCategory::Conflict.code(),
            detail: None,
        };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["error"], "Custom ID already taken");
        assert_eq!(value["code"], "conflict");
        assert!(value.get("detail").is_none());
    }
}
