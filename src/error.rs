//! Typed error taxonomy for the REST generator.

/// Errors surfaced to callers of the generator.
///
/// Retryable conditions (rate limiting, retryable 5xx, per-attempt timeouts)
/// are handled inside the retry loop and never appear here.
#[derive(Debug)]
pub enum RestError {
    /// Invalid endpoint configuration, detected at construction.
    Configuration(String),
    /// A template references `$KEY` but no API key was resolved.
    MissingCredential(String),
    /// The response body could not be parsed, or a requested field was absent.
    MalformedResponse(String),
    /// HTTP 4xx from the endpoint; signals a configuration or auth problem.
    ClientError { status: u16 },
    /// HTTP 3xx from the endpoint; redirection is not supported.
    UnsupportedRedirect { status: u16 },
    /// HTTP 5xx from the endpoint with 5xx retries disabled.
    ServerError { status: u16 },
    /// Connection-level failure that is not a per-attempt timeout.
    Network(String),
}

impl std::fmt::Display for RestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RestError::Configuration(msg) => {
                write!(f, "Invalid endpoint configuration: {}", msg)
            }
            RestError::MissingCredential(msg) => {
                write!(f, "Missing credential: {}", msg)
            }
            RestError::MalformedResponse(msg) => {
                write!(f, "Malformed response: {}", msg)
            }
            RestError::ClientError { status } => {
                write!(
                    f,
                    "REST endpoint client error: HTTP {}. Check the endpoint configuration and credentials.",
                    status
                )
            }
            RestError::UnsupportedRedirect { status } => {
                write!(
                    f,
                    "REST endpoint redirection not supported: HTTP {}. Point the URI at the final endpoint.",
                    status
                )
            }
            RestError::ServerError { status } => {
                write!(f, "REST endpoint server error: HTTP {}", status)
            }
            RestError::Network(msg) => {
                write!(f, "Network error: {}", msg)
            }
        }
    }
}

impl std::error::Error for RestError {}
