//! Endpoint configuration: raw settings surface and validated form.
//!
//! `RestSettings` mirrors the configuration file shape one-to-one and is
//! deserialized by an external loader (or the CLI). `EndpointConfig` is the
//! immutable, fully validated form the rest of the pipeline consumes; every
//! check happens here, in one pass, before any traffic is sent.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use log::warn;
use serde::Deserialize;

use crate::error::RestError;
use crate::extract::PathEvaluator;
use crate::template::KEY_PLACEHOLDER;

/// Default environment variable consulted for the API key.
pub const DEFAULT_KEY_ENV_VAR: &str = "REST_API_KEY";

/// HTTP verbs the generator can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Head,
}

impl Method {
    /// Parses a verb name case-insensitively.
    ///
    /// Unsupported verbs fall back to POST with a logged warning rather than
    /// a hard failure; a misconfigured verb should not abort the adapter.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "get" => Method::Get,
            "post" => Method::Post,
            "put" => Method::Put,
            "patch" => Method::Patch,
            "delete" => Method::Delete,
            "options" => Method::Options,
            "head" => Method::Head,
            other => {
                warn!("HTTP method {:?} not supported, defaulting to POST", other);
                Method::Post
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Head => "HEAD",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw configuration surface, matching the option names accepted in the
/// endpoint definition file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RestSettings {
    pub uri: Option<String>,
    /// Short name for the service; defaults to the URI.
    pub name: Option<String>,
    #[serde(default = "default_method")]
    pub method: String,
    /// Header name to template string. Values may carry `$INPUT` and `$KEY`.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default = "default_req_template")]
    pub req_template: String,
    /// Structured template, serialized to JSON text before substitution.
    /// Takes precedence over `req_template` when present.
    #[serde(default)]
    pub req_template_json_object: Option<serde_json::Value>,
    #[serde(default)]
    pub response_json: bool,
    pub response_json_field: Option<String>,
    /// Per-attempt timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: f64,
    /// Status codes indicating rate limiting, retried with backoff.
    #[serde(default = "default_ratelimit_codes")]
    pub ratelimit_codes: Vec<u16>,
    /// Whether 5xx responses are retried.
    #[serde(default = "default_retry_on_5xx")]
    pub retry_on_5xx: bool,
    /// Name of the environment variable supplying the API key. Resolution is
    /// the caller's job; the core only records the name for diagnostics.
    #[serde(default = "default_key_env_var")]
    pub key_env_var: String,
}

fn default_method() -> String {
    "post".to_string()
}

fn default_req_template() -> String {
    "$INPUT".to_string()
}

fn default_request_timeout() -> f64 {
    20.0
}

fn default_ratelimit_codes() -> Vec<u16> {
    vec![429]
}

fn default_retry_on_5xx() -> bool {
    true
}

fn default_key_env_var() -> String {
    DEFAULT_KEY_ENV_VAR.to_string()
}

impl Default for RestSettings {
    fn default() -> Self {
        Self {
            uri: None,
            name: None,
            method: default_method(),
            headers: BTreeMap::new(),
            req_template: default_req_template(),
            req_template_json_object: None,
            response_json: false,
            response_json_field: None,
            request_timeout: default_request_timeout(),
            ratelimit_codes: default_ratelimit_codes(),
            retry_on_5xx: default_retry_on_5xx(),
            key_env_var: default_key_env_var(),
        }
    }
}

/// How the output is located in a JSON response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseField {
    /// Direct top-level key lookup.
    Key(String),
    /// JSONPath expression (field started with `$`), validated at construction.
    Path(String),
}

/// Validated, immutable endpoint configuration.
///
/// Resolved once per adapter instance; nothing here mutates after
/// construction, so it is safe to share across concurrent calls.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub name: String,
    pub uri: String,
    pub method: Method,
    pub headers: BTreeMap<String, String>,
    pub req_template: String,
    pub response_json: bool,
    pub response_field: Option<ResponseField>,
    pub request_timeout: Duration,
    pub ratelimit_codes: HashSet<u16>,
    pub retry_on_5xx: bool,
    pub api_key: Option<String>,
    pub key_env_var: String,
}

impl EndpointConfig {
    /// Validates raw settings into an [`EndpointConfig`].
    ///
    /// `api_key` is the already-resolved secret (or `None`); reading the
    /// environment is the caller's responsibility. The evaluator is used to
    /// syntax-check a JSONPath response field up front, so a broken path
    /// fails here instead of on the first call.
    pub fn resolve(
        settings: RestSettings,
        api_key: Option<String>,
        evaluator: &dyn PathEvaluator,
    ) -> Result<Self, RestError> {
        let uri = match settings.uri {
            Some(uri) if !uri.is_empty() => uri,
            _ => {
                return Err(RestError::Configuration(
                    "no REST endpoint URI defined".to_string(),
                ));
            }
        };

        let req_template = match settings.req_template_json_object {
            Some(object) => serde_json::to_string(&object).map_err(|e| {
                RestError::Configuration(format!("req_template_json_object is not serializable: {}", e))
            })?,
            None => settings.req_template,
        };

        let response_field = if settings.response_json {
            let field = match settings.response_json_field {
                Some(field) if !field.is_empty() => field,
                Some(_) => {
                    return Err(RestError::Configuration(
                        "response_json is true but response_json_field is an empty string. \
                         If the root object is the target object, use a JSONPath."
                            .to_string(),
                    ));
                }
                None => {
                    return Err(RestError::Configuration(
                        "response_json is true but response_json_field isn't set".to_string(),
                    ));
                }
            };
            if field.starts_with('$') {
                evaluator.validate(&field).map_err(|e| {
                    RestError::Configuration(format!(
                        "couldn't parse response_json_field {:?}: {}",
                        field, e
                    ))
                })?;
                Some(ResponseField::Path(field))
            } else {
                Some(ResponseField::Key(field))
            }
        } else {
            None
        };

        if !(settings.request_timeout.is_finite() && settings.request_timeout > 0.0) {
            return Err(RestError::Configuration(format!(
                "request_timeout must be positive, got {}",
                settings.request_timeout
            )));
        }

        let requires_key = req_template.contains(KEY_PLACEHOLDER)
            || settings.headers.values().any(|v| v.contains(KEY_PLACEHOLDER));
        if requires_key && api_key.is_none() {
            return Err(RestError::MissingCredential(format!(
                "template requires an API key but {} isn't set",
                settings.key_env_var
            )));
        }

        Ok(Self {
            name: settings.name.unwrap_or_else(|| uri.clone()),
            uri,
            method: Method::parse_lenient(&settings.method),
            headers: settings.headers,
            req_template,
            response_json: settings.response_json,
            response_field,
            request_timeout: Duration::from_secs_f64(settings.request_timeout),
            ratelimit_codes: settings.ratelimit_codes.into_iter().collect(),
            retry_on_5xx: settings.retry_on_5xx,
            api_key,
            key_env_var: settings.key_env_var,
        })
    }

    /// Family-qualified display name used in diagnostics.
    pub fn fullname(&self) -> String {
        format!("REST {}", self.name)
    }
}
