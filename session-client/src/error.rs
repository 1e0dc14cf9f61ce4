use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    /// The request was rejected again after a successful refresh.
    #[error("Unauthorized")]
    Unauthorized,

    /// The refresh failed and local credentials were cleared.
    #[error("Session expired, please log in again")]
    SessionExpired,

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Token storage error: {0}")]
    Storage(String),
}

/// Maximum length for raw bodies carried in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl SessionError {
    /// Builds an `Api` error, preferring the server's `{"error": ...}` message.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => parsed.error,
            Err(_) if body.len() <= MAX_ERROR_BODY_LENGTH => body.to_string(),
            Err(_) => {
                let cut = (0..=MAX_ERROR_BODY_LENGTH)
                    .rev()
                    .find(|i| body.is_char_boundary(*i))
                    .unwrap_or(0);
                format!("{}... (truncated, {} total bytes)", &body[..cut], body.len())
            }
        };

        SessionError::Api {
            status: status.as_u16(),
            message,
        }
    }

    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        match response.text().await {
            Ok(body) => Self::from_status(status, &body),
            Err(e) => SessionError::Network(e),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            SessionError::Unauthorized | SessionError::SessionExpired => Some(401),
            SessionError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uses_server_error_message() {
        let err = SessionError::from_status(
            StatusCode::CONFLICT,
            r#"{"error":"Username already exists"}"#,
        );
        match err {
            SessionError::Api { status, message } => {
                assert_eq!(status, 409);
                assert_eq!(message, "Username already exists");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let body = "x".repeat(2_000);
        let err = SessionError::from_status(StatusCode::BAD_GATEWAY, &body);
        let SessionError::Api { message, .. } = err else {
            panic!("expected Api error");
        };
        assert!(message.contains("truncated, 2000 total bytes"));
    }
}
