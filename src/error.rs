use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Feed parsing error: {0}")]
    FeedParse(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Corrupt cache file for feed '{name}': {reason}")]
    CorruptCache { name: String, reason: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Article index {index} out of range for feed '{name}' ({len} articles)")]
    IndexOutOfRange { name: String, index: usize, len: usize },

    #[error("Access denied")]
    AuthDenied,

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Invalid: {0}")]
    Invalid(String),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Config(format!("Invalid registry file: {}", err))
    }
}

impl Error {
    /// Failures that a later attempt may not hit again.
    pub fn is_temporary(&self) -> bool {
        matches!(
            self,
            Error::HttpError(_) | Error::Timeout(_) | Error::Io(_) | Error::ServiceUnavailable(_)
        )
    }

    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidUrl(_) | Error::Config(_) | Error::Invalid(_)
        )
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Error::FeedParse(_) => "FEED_PARSE",
            Error::HttpError(_) => "HTTP_ERROR",
            Error::InvalidUrl(_) => "INVALID_URL",
            Error::Timeout(_) => "TIMEOUT",
            Error::Io(_) => "IO_ERROR",
            Error::Serialization(_) => "SERIALIZATION",
            Error::Config(_) => "CONFIG",
            Error::Storage(_) => "STORAGE",
            Error::CorruptCache { .. } => "CORRUPT_CACHE",
            Error::NotFound(_) => "NOT_FOUND",
            Error::IndexOutOfRange { .. } => "INDEX_OUT_OF_RANGE",
            Error::AuthDenied => "AUTH_DENIED",
            Error::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Error::Invalid(_) => "INVALID",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temporary_errors() {
        assert!(Error::Timeout("slow".to_string()).is_temporary());
        assert!(Error::HttpError("503".to_string()).is_temporary());
        assert!(!Error::FeedParse("bad xml".to_string()).is_temporary());
        assert!(!Error::AuthDenied.is_temporary());
    }

    #[test]
    fn test_index_error_message() {
        let err = Error::IndexOutOfRange { name: "reddit".to_string(), index: 7, len: 3 };
        assert_eq!(err.error_code(), "INDEX_OUT_OF_RANGE");
        assert!(err.to_string().contains("7"));
        assert!(err.to_string().contains("reddit"));
    }

    #[test]
    fn test_toml_error_becomes_config_error() {
        let err: Error = toml::from_str::<toml::Value>("= broken").unwrap_err().into();
        assert!(err.is_user_error());
        assert_eq!(err.error_code(), "CONFIG");
    }
}
