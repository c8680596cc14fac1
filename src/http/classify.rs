//! Status code classification into retry/fatal outcomes.

use std::collections::HashSet;

/// What an HTTP status code means for the current attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// 2xx; hand the body to the extractor.
    Success,
    /// A configured rate-limit code; retryable with backoff.
    RateLimited(u16),
    /// 5xx with 5xx retries enabled; retryable with backoff.
    ServerErrorRetryable(u16),
    /// 5xx with 5xx retries disabled; fatal.
    ServerErrorFatal(u16),
    /// 4xx (or an out-of-bucket status); fatal, signals a configuration or
    /// auth problem.
    ClientError(u16),
    /// 3xx; fatal, the endpoint configuration is assumed non-redirecting.
    UnsupportedRedirect(u16),
}

impl Outcome {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Outcome::RateLimited(_) | Outcome::ServerErrorRetryable(_)
        )
    }
}

/// Maps a status code to an [`Outcome`].
///
/// Rate-limit-code membership wins over the generic buckets, so an endpoint
/// that signals rate limiting via a 5xx code still gets retryable treatment.
/// Statuses outside every bucket (1xx and out-of-range values) classify as
/// client errors.
pub fn classify(status: u16, ratelimit_codes: &HashSet<u16>, retry_on_5xx: bool) -> Outcome {
    if ratelimit_codes.contains(&status) {
        return Outcome::RateLimited(status);
    }
    match status {
        200..=299 => Outcome::Success,
        300..=399 => Outcome::UnsupportedRedirect(status),
        400..=499 => Outcome::ClientError(status),
        500..=599 => {
            if retry_on_5xx {
                Outcome::ServerErrorRetryable(status)
            } else {
                Outcome::ServerErrorFatal(status)
            }
        }
        other => Outcome::ClientError(other),
    }
}
