use serde::Deserialize;
use thiserror::Error;

/// Failures talking to the Messages API.
#[derive(Debug, Error)]
pub enum Error {
    /// No usable API key
    #[error("no Anthropic API key available")]
    NoApiKey,

    /// The request never produced a response
    #[error("request failed: {0}")]
    Network(String),

    /// The API answered with a non-success status
    #[error("Anthropic API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body did not have the documented shape
    #[error("unexpected response body: {0}")]
    Parse(String),

    /// The HTTP client could not be built
    #[error("client configuration: {0}")]
    Config(String),
}

// {"type": "error", "error": {"type": "overloaded_error", "message": "Overloaded"}}
#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

impl Error {
    /// Build an `Api` error from a failed response, preferring the structured
    /// error message over the raw body.
    pub(crate) fn from_body(status: u16, body: &str) -> Self {
        let message = match serde_json::from_str::<ErrorBody>(body) {
            Ok(ErrorBody { error }) => format!("{}: {}", error.kind, error.message),
            Err(_) if body.trim().is_empty() => "empty response body".to_string(),
            Err(_) => body.to_string(),
        };
        Error::Api { status, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_error_body() {
        let body = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        let err = Error::from_body(529, body);
        assert!(matches!(
            err,
            Error::Api { status: 529, ref message } if message == "overloaded_error: Overloaded"
        ));
    }

    #[test]
    fn test_unstructured_error_body() {
        let err = Error::from_body(502, "<html>Bad gateway</html>");
        assert!(matches!(err, Error::Api { ref message, .. } if message.contains("Bad gateway")));

        let err = Error::from_body(500, "  ");
        assert_eq!(err.to_string(), "Anthropic API returned 500: empty response body");
    }
}
