//! The REST generator: templating, dispatch, classification, extraction,
//! wrapped in the retry controller.

use log::debug;

use crate::config::{EndpointConfig, RestSettings};
use crate::error::RestError;
use crate::extract::{PathEvaluator, SerdeJsonPathEvaluator, extract_outputs};
use crate::http::{Outcome, ReqwestTransport, Transport, TransportError, classify};
use crate::request::build_request;
use crate::retry::{AttemptResult, RetryController};
use crate::template::{Escaper, JsonEscaper};

/// Generic adapter turning an HTTP(S) endpoint into a text-completion
/// interface.
///
/// Construction resolves and validates the configuration eagerly; a broken
/// JSONPath, missing URI, or unresolved credential fails here, before any
/// traffic. Instances hold no per-call state, so one generator can serve
/// concurrent `generate` calls.
pub struct RestGenerator {
    config: EndpointConfig,
    transport: Box<dyn Transport>,
    escaper: Box<dyn Escaper>,
    evaluator: Box<dyn PathEvaluator>,
}

impl RestGenerator {
    /// Creates a generator with the default transport, escaper, and JSONPath
    /// evaluator.
    ///
    /// `api_key` is the already-resolved secret; reading `key_env_var` from
    /// the environment is the caller's job.
    pub fn new(settings: RestSettings, api_key: Option<String>) -> Result<Self, RestError> {
        Self::with_parts(
            settings,
            api_key,
            Box::new(ReqwestTransport::default()),
            Box::new(JsonEscaper),
            Box::new(SerdeJsonPathEvaluator),
        )
    }

    /// Creates a generator from injected capabilities.
    pub fn with_parts(
        settings: RestSettings,
        api_key: Option<String>,
        transport: Box<dyn Transport>,
        escaper: Box<dyn Escaper>,
        evaluator: Box<dyn PathEvaluator>,
    ) -> Result<Self, RestError> {
        let config = EndpointConfig::resolve(settings, api_key, evaluator.as_ref())?;
        Ok(Self {
            config,
            transport,
            escaper,
            evaluator,
        })
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    /// Family-qualified service name, e.g. `REST https://example.ai/llm`.
    pub fn fullname(&self) -> String {
        self.config.fullname()
    }

    /// One prompt, one generation.
    ///
    /// Retryable outcomes (configured rate-limit codes, retryable 5xx,
    /// per-attempt timeouts) back off and retry internally; everything else
    /// returns. `None` elements mark the no-extraction sentinel.
    #[tracing::instrument(skip(self, prompt), fields(endpoint = %self.config.name))]
    pub async fn generate(&self, prompt: &str) -> Result<Vec<Option<String>>, RestError> {
        RetryController::new()
            .run(|| self.attempt(prompt))
            .await
    }

    async fn attempt(&self, prompt: &str) -> AttemptResult<Vec<Option<String>>> {
        let request = match build_request(&self.config, prompt, self.escaper.as_ref()) {
            Ok(request) => request,
            Err(e) => return AttemptResult::Complete(Err(e)),
        };

        let response = match self
            .transport
            .send(&request, self.config.request_timeout)
            .await
        {
            Ok(response) => response,
            // transient network timeouts should not permanently fail a prompt
            Err(TransportError::Timeout(msg)) => {
                return AttemptResult::Retry(format!("timeout: {}", msg));
            }
            Err(TransportError::Network(msg)) => {
                return AttemptResult::Complete(Err(RestError::Network(msg)));
            }
        };

        match classify(
            response.status,
            &self.config.ratelimit_codes,
            self.config.retry_on_5xx,
        ) {
            Outcome::Success => {
                debug!("{}: HTTP {}", self.fullname(), response.status);
                AttemptResult::Complete(extract_outputs(
                    self.config.response_json,
                    self.config.response_field.as_ref(),
                    &response.text(),
                    self.evaluator.as_ref(),
                ))
            }
            Outcome::RateLimited(status) => {
                AttemptResult::Retry(format!("rate limited: HTTP {}", status))
            }
            Outcome::ServerErrorRetryable(status) => {
                AttemptResult::Retry(format!("server error: HTTP {}", status))
            }
            Outcome::ServerErrorFatal(status) => {
                AttemptResult::Complete(Err(RestError::ServerError { status }))
            }
            Outcome::ClientError(status) => {
                AttemptResult::Complete(Err(RestError::ClientError { status }))
            }
            Outcome::UnsupportedRedirect(status) => {
                AttemptResult::Complete(Err(RestError::UnsupportedRedirect { status }))
            }
        }
    }
}
