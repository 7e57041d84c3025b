//! Mapping of crate errors onto HTTP responses.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::error::Error;

/// API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Bad request (400).
    BadRequest,
    /// Forbidden (403).
    Forbidden,
    /// Not found (404).
    NotFound,
    /// Internal server error (500).
    InternalError,
    /// Service unavailable (503).
    ServiceUnavailable,
}

impl ErrorCode {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Plain-text error response rendered as `<status> - <message>`.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// The fixed denial every endpoint answers with.
    pub fn forbidden() -> Self {
        Self::new(ErrorCode::Forbidden, "Forbidden")
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn unavailable() -> Self {
        Self::new(ErrorCode::ServiceUnavailable, "Service Unavailable")
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn body(&self) -> String {
        format!("{} - {}", self.code.status_code().as_u16(), self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.code.status_code(),
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.body(),
        )
            .into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::AuthDenied => ApiError::forbidden(),
            Error::ServiceUnavailable(_) => ApiError::unavailable(),
            Error::NotFound(msg) => ApiError::not_found(msg),
            err @ Error::IndexOutOfRange { .. } => ApiError::not_found(err.to_string()),
            Error::Invalid(msg) => ApiError::bad_request(msg),
            err => {
                tracing::error!("Internal error: {}", err);
                ApiError::internal("Internal Server Error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_body_is_fixed() {
        let err = ApiError::forbidden();
        assert_eq!(err.code().status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.body(), "403 - Forbidden");
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(ApiError::from(Error::AuthDenied).code(), ErrorCode::Forbidden);
        assert_eq!(
            ApiError::from(Error::ServiceUnavailable("down".to_string())).body(),
            "503 - Service Unavailable"
        );
        assert_eq!(
            ApiError::from(Error::NotFound("Feed 'x' not found".to_string())).code(),
            ErrorCode::NotFound
        );
        assert_eq!(
            ApiError::from(Error::IndexOutOfRange { name: "x".to_string(), index: 9, len: 2 }).code(),
            ErrorCode::NotFound
        );
        assert_eq!(ApiError::from(Error::Invalid("id".to_string())).code(), ErrorCode::BadRequest);
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let err = ApiError::from(Error::CorruptCache {
            name: "x".to_string(),
            reason: "EOF while parsing".to_string(),
        });
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert!(!err.body().contains("EOF"));
    }
}
