use std::error::Error;
use std::fmt;

/// Error taxonomy for the client.
///
/// Every failure surfaced to the user falls into one of these kinds:
/// - `Network`: transport/connection-level failure (DNS, refused, timeout)
/// - `Server`: the server answered with `success: false`; carries the
///   server's `error` string verbatim
/// - `Validation`: client-side rejection before any network call (bad file
///   extension, oversized upload, malformed JSON text)
/// - `AuthExpired`: HTTP 401; carries the login redirect target instead of
///   an inline message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    Network(String),
    Server(String),
    Validation(String),
    AuthExpired { next: String },
}

impl ClientError {
    /// Builds the `AuthExpired` variant for a 401 seen while the user was on
    /// `current_path`. The redirect target carries the path as a `next`
    /// parameter so the login page can send the user back.
    pub fn auth_expired(current_path: &str) -> Self {
        ClientError::AuthExpired {
            next: format!("/login?next={}", urlencoding::encode(current_path)),
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Network(msg) => write!(f, "Network error: {}", msg),
            ClientError::Server(msg) => write!(f, "Error: {}", msg),
            ClientError::Validation(msg) => write!(f, "{}", msg),
            ClientError::AuthExpired { next } => {
                write!(f, "Session expired, log in again at {}", next)
            }
        }
    }
}

impl Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Network(err.to_string())
    }
}
