//! Output extraction from endpoint response bodies.
//!
//! Invoked only after the classifier reports success. Non-JSON endpoints
//! return the raw body verbatim; JSON endpoints are queried either by a
//! direct top-level key or by a JSONPath expression.

use log::{error, warn};
use serde_json::Value;

use crate::config::ResponseField;
use crate::error::RestError;

/// JSONPath evaluation capability.
///
/// Any conformant evaluator suffices; the default wraps the
/// `serde_json_path` crate. Tests can substitute a fake.
pub trait PathEvaluator: Send + Sync {
    /// Checks `expr` for syntactic validity without evaluating it.
    fn validate(&self, expr: &str) -> Result<(), String>;

    /// Evaluates `expr` against `doc`, returning matched values in
    /// query-yielded order.
    fn evaluate(&self, expr: &str, doc: &Value) -> Vec<Value>;
}

/// [`PathEvaluator`] backed by the `serde_json_path` crate.
pub struct SerdeJsonPathEvaluator;

impl PathEvaluator for SerdeJsonPathEvaluator {
    fn validate(&self, expr: &str) -> Result<(), String> {
        serde_json_path::JsonPath::parse(expr)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    fn evaluate(&self, expr: &str, doc: &Value) -> Vec<Value> {
        match serde_json_path::JsonPath::parse(expr) {
            Ok(path) => path.query(doc).all().into_iter().cloned().collect(),
            // Expressions are validated at construction; an unparsable
            // expression here means the evaluator was bypassed.
            Err(e) => {
                error!("JSONPath {} failed to parse at evaluation time: {}", expr, e);
                Vec::new()
            }
        }
    }
}

/// Extracts the ordered output strings from a successful response body.
///
/// Returns `vec![None]` when a JSONPath query legitimately matches nothing,
/// so callers can tell "endpoint said nothing useful" apart from a transport
/// or parse failure.
pub fn extract_outputs(
    response_json: bool,
    field: Option<&ResponseField>,
    body: &str,
    evaluator: &dyn PathEvaluator,
) -> Result<Vec<Option<String>>, RestError> {
    if !response_json {
        return Ok(vec![Some(body.to_string())]);
    }

    let document: Value = serde_json::from_str(body)
        .map_err(|e| RestError::MalformedResponse(format!("response is not valid JSON: {}", e)))?;

    // Config validation guarantees a field is present when response_json is set.
    let field = field.ok_or_else(|| {
        RestError::MalformedResponse("JSON mode enabled but no response field resolved".to_string())
    })?;

    match field {
        ResponseField::Key(key) => match document.get(key) {
            Some(value) => Ok(vec![coerce_value(value)]),
            None => Err(RestError::MalformedResponse(format!(
                "response JSON has no top-level field {:?}",
                key
            ))),
        },
        ResponseField::Path(expr) => {
            let matches = evaluator.evaluate(expr, &document);
            match matches.len() {
                0 => {
                    error!(
                        "JSONPath {} yielded nothing. Response content: {}",
                        expr, body
                    );
                    Ok(vec![None])
                }
                1 => match &matches[0] {
                    // a single list match supplies the outputs directly,
                    // one element per entry, no recursive flattening
                    Value::Array(items) => Ok(items.iter().map(coerce_value).collect()),
                    value => Ok(vec![coerce_value(value)]),
                },
                _ => Ok(matches.iter().map(coerce_value).collect()),
            }
        }
    }
}

/// Coerces a matched JSON value to an output element.
///
/// Strings pass through, `null` becomes the no-output sentinel, other scalars
/// render as their JSON text, and compound values serialize to compact JSON
/// with a warning since they usually indicate an under-selective path.
fn coerce_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(_) | Value::Bool(_) => Some(value.to_string()),
        Value::Array(_) | Value::Object(_) => {
            warn!(
                "JSONPath match is a compound value, returning its JSON serialization: {}",
                value
            );
            Some(value.to_string())
        }
    }
}
