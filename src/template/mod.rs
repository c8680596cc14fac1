//! Placeholder substitution for request templates.
//!
//! Templates are plain strings carrying the `$INPUT` and `$KEY` placeholder
//! tokens. Structured templates are serialized to JSON text before they reach
//! this module; substitution always happens at the string level.

use crate::error::RestError;

/// Placeholder replaced by the (escaped) prompt text.
pub const INPUT_PLACEHOLDER: &str = "$INPUT";

/// Placeholder replaced by the resolved API key.
pub const KEY_PLACEHOLDER: &str = "$KEY";

/// Escaping policy applied to values before they are spliced into a template.
///
/// The default is JSON string-body escaping; alternative serializations can be
/// swapped in without touching the substitution call sites.
pub trait Escaper: Send + Sync {
    /// Escapes `raw` so it is safe inside the template's quoting context.
    fn escape(&self, raw: &str) -> String;
}

/// Escapes a value as a JSON string body.
///
/// The surrounding quote characters are stripped because the template is
/// expected to supply its own quoting context (e.g. `{"text": "$INPUT"}`).
pub struct JsonEscaper;

impl Escaper for JsonEscaper {
    fn escape(&self, raw: &str) -> String {
        let quoted = serde_json::Value::String(raw.to_string()).to_string();
        // trim first & last "
        quoted[1..quoted.len() - 1].to_string()
    }
}

/// Replaces template placeholders with values.
///
/// `$INPUT` becomes the escaped prompt text. `$KEY` becomes the resolved API
/// key; escaped only when `json_escape_key` is set, since bearer-style header
/// values must not carry JSON quoting artifacts. Fails with
/// [`RestError::MissingCredential`] when the template mentions `$KEY` but no
/// key was resolved.
pub fn populate(
    template: &str,
    input: &str,
    key: Option<&str>,
    json_escape_key: bool,
    escaper: &dyn Escaper,
) -> Result<String, RestError> {
    let mut output = template.to_string();
    if template.contains(KEY_PLACEHOLDER) {
        let key = key.ok_or_else(|| {
            RestError::MissingCredential(
                "template requires an API key but none was resolved".to_string(),
            )
        })?;
        let replacement = if json_escape_key {
            escaper.escape(key)
        } else {
            key.to_string()
        };
        output = output.replace(KEY_PLACEHOLDER, &replacement);
    }
    Ok(output.replace(INPUT_PLACEHOLDER, &escaper.escape(input)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_populate_replaces_input() {
        let out = populate(r#"{"text": "$INPUT"}"#, "hello", None, false, &JsonEscaper).unwrap();
        assert_eq!(out, r#"{"text": "hello"}"#);
        assert!(!out.contains(INPUT_PLACEHOLDER));
    }

    #[test]
    fn test_populate_escapes_input_for_json_context() {
        let out = populate(
            r#"{"text": "$INPUT"}"#,
            "say \"hi\"\nplease",
            None,
            false,
            &JsonEscaper,
        )
        .unwrap();
        assert_eq!(out, r#"{"text": "say \"hi\"\nplease"}"#);

        // round-trip: the target parser yields back the original text
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["text"], "say \"hi\"\nplease");
    }

    #[test]
    fn test_populate_replaces_every_occurrence() {
        let out = populate("$INPUT and $INPUT", "x", None, false, &JsonEscaper).unwrap();
        assert_eq!(out, "x and x");
    }

    #[test]
    fn test_populate_key_raw_by_default() {
        let out = populate("Bearer $KEY", "prompt", Some("s3cret"), false, &JsonEscaper).unwrap();
        assert_eq!(out, "Bearer s3cret");
    }

    #[test]
    fn test_populate_key_json_escaped_when_requested() {
        let out = populate(
            r#"{"auth": "$KEY"}"#,
            "prompt",
            Some("a\"b"),
            true,
            &JsonEscaper,
        )
        .unwrap();
        assert_eq!(out, r#"{"auth": "a\"b"}"#);
    }

    #[test]
    fn test_populate_missing_key_fails() {
        let result = populate("Bearer $KEY", "prompt", None, false, &JsonEscaper);
        assert!(matches!(result, Err(RestError::MissingCredential(_))));
    }

    #[test]
    fn test_populate_without_key_placeholder_ignores_missing_key() {
        let out = populate("$INPUT", "hello", None, false, &JsonEscaper).unwrap();
        assert_eq!(out, "hello");
    }

    #[test]
    fn test_json_escaper_handles_control_characters() {
        let escaped = JsonEscaper.escape("tab\there\r\n");
        assert_eq!(escaped, "tab\\there\\r\\n");
        assert!(!escaped.starts_with('"'));
        assert!(!escaped.ends_with('"'));
    }

    /// Alternative escaper used to verify the policy is pluggable.
    struct UpperEscaper;

    impl Escaper for UpperEscaper {
        fn escape(&self, raw: &str) -> String {
            raw.to_uppercase()
        }
    }

    #[test]
    fn test_escaper_is_swappable() {
        let out = populate("$INPUT", "hello", None, false, &UpperEscaper).unwrap();
        assert_eq!(out, "HELLO");
    }
}
