//! Request assembly from configuration and a prompt.

use std::collections::BTreeMap;

use crate::config::{EndpointConfig, Method};
use crate::error::RestError;
use crate::template::{Escaper, populate};

/// Where the templated payload travels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Appended to the URI as a pre-encoded query string (GET).
    Query(String),
    /// Sent as the request body (every other verb).
    Body(String),
}

/// A fully templated request, ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    pub method: Method,
    pub uri: String,
    pub headers: BTreeMap<String, String>,
    pub payload: Payload,
}

impl PreparedRequest {
    /// The URI the transport should hit, with query payloads folded in.
    pub fn target_uri(&self) -> String {
        match &self.payload {
            Payload::Query(query) if !query.is_empty() => format!("{}?{}", self.uri, query),
            _ => self.uri.clone(),
        }
    }

    pub fn body(&self) -> Option<&str> {
        match &self.payload {
            Payload::Body(body) => Some(body),
            Payload::Query(_) => None,
        }
    }
}

/// Builds a [`PreparedRequest`] for one prompt.
///
/// Every header value is templated independently; the header context uses raw
/// key substitution so bearer tokens survive unescaped, while the request
/// template gets the full JSON-safe treatment. GET requests conventionally
/// carry no body, so their payload rides as query parameters.
pub fn build_request(
    config: &EndpointConfig,
    prompt: &str,
    escaper: &dyn Escaper,
) -> Result<PreparedRequest, RestError> {
    let key = config.api_key.as_deref();

    let payload_text = populate(&config.req_template, prompt, key, true, escaper)?;

    let mut headers = BTreeMap::new();
    for (name, value_template) in &config.headers {
        let value = populate(value_template, prompt, key, false, escaper)?;
        headers.insert(name.clone(), value);
    }

    let payload = if config.method == Method::Get {
        Payload::Query(payload_text)
    } else {
        Payload::Body(payload_text)
    };

    Ok(PreparedRequest {
        method: config.method,
        uri: config.uri.clone(),
        headers,
        payload,
    })
}
