use thiserror::Error;

/// Top-level error type for the widget engine.
///
/// Each variant corresponds to a failure class with its own surfacing rule:
/// user-correctable failures become System messages in the history, contract
/// violations stay internal, and transport failures map to retryable copy.
/// Subsystem crates convert their own errors into `WidgetError` so the `?`
/// operator works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WidgetError {
    /// User input rejected before any network traffic (empty or over-length).
    #[error("validation error: {0}")]
    Validation(String),

    /// A send was attempted while another request is still in flight.
    #[error("a request is already in flight")]
    Concurrency,

    /// The responder did not answer within the configured bound.
    #[error("request timed out")]
    Timeout,

    /// The responder rejected the request with HTTP 429.
    #[error("rate limit exceeded")]
    RateLimited,

    /// Any other network or server failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The host runtime does not provide the requested capability.
    #[error("capability unavailable: {0}")]
    CapabilityUnavailable(String),

    /// Voice subsystem failure (invalid listen transition, synthesis start).
    #[error("voice error: {0}")]
    Voice(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for WidgetError {
    fn from(err: toml::de::Error) -> Self {
        WidgetError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for WidgetError {
    fn from(err: toml::ser::Error) -> Self {
        WidgetError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for WidgetError {
    fn from(err: serde_json::Error) -> Self {
        WidgetError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for widget operations.
pub type Result<T> = std::result::Result<T, WidgetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WidgetError::Validation("message cannot be empty".to_string());
        assert_eq!(err.to_string(), "validation error: message cannot be empty");
    }

    #[test]
    fn test_error_display_all_variants() {
        let cases: Vec<(WidgetError, &str)> = vec![
            (
                WidgetError::Validation("too long".to_string()),
                "validation error: too long",
            ),
            (
                WidgetError::Concurrency,
                "a request is already in flight",
            ),
            (WidgetError::Timeout, "request timed out"),
            (WidgetError::RateLimited, "rate limit exceeded"),
            (
                WidgetError::Transport("connection refused".to_string()),
                "transport error: connection refused",
            ),
            (
                WidgetError::CapabilityUnavailable("speech input".to_string()),
                "capability unavailable: speech input",
            ),
            (
                WidgetError::Voice("already listening".to_string()),
                "voice error: already listening",
            ),
            (
                WidgetError::Config("missing field".to_string()),
                "configuration error: missing field",
            ),
            (
                WidgetError::Serialization("invalid json".to_string()),
                "serialization error: invalid json",
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: WidgetError = io_err.into();
        assert!(matches!(err, WidgetError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let bad_toml = "invalid = [[[";
        let parsed: std::result::Result<toml::Value, _> = toml::from_str(bad_toml);
        assert!(parsed.is_err());
        let err: WidgetError = parsed.unwrap_err().into();
        assert!(matches!(err, WidgetError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let bad_json = "{ invalid json }";
        let parsed: std::result::Result<serde_json::Value, _> = serde_json::from_str(bad_json);
        assert!(parsed.is_err());
        let err: WidgetError = parsed.unwrap_err().into();
        assert!(matches!(err, WidgetError::Serialization(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let _value = io_result?;
            Ok("success".to_string())
        }

        assert_eq!(inner().unwrap(), "success");
    }

    #[test]
    fn test_error_debug_impl() {
        let err = WidgetError::Concurrency;
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("Concurrency"));
    }
}
