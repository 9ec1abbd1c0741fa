//! Prompt sanitization and per-image prompt persistence
//!
//! OCR output and transcribed label text reach the prompt builder as raw
//! bytes and can carry invalid UTF-8 (bad scans, mixed encodings). Everything
//! sent to a tokenizer or an API must be clean UTF-8, so sanitization drops
//! the offending byte sequences rather than replacing them.

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::SupportError;

/// Decode bytes as UTF-8, dropping invalid byte sequences.
///
/// Idempotent on valid UTF-8: `sanitize_prompt(s.as_bytes()) == s`.
pub fn sanitize_prompt(input: &[u8]) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    loop {
        match std::str::from_utf8(rest) {
            Ok(tail) => {
                out.push_str(tail);
                break;
            }
            Err(err) => {
                let valid = err.valid_up_to();
                if let Ok(prefix) = std::str::from_utf8(&rest[..valid]) {
                    out.push_str(prefix);
                }
                // error_len() is None when the input ends mid-sequence
                let skip = match err.error_len() {
                    Some(n) => n,
                    None => rest.len() - valid,
                };
                rest = &rest[valid + skip..];
            }
        }
    }
    out
}

/// Recursively sanitize a JSON value: every string (object keys included) is
/// re-validated through [`sanitize_prompt`]. Strings built in-process are
/// already valid UTF-8 and pass through unchanged; the traversal matters for
/// prompt maps whose leaves were assembled from raw OCR bytes upstream.
pub fn sanitize_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (sanitize_prompt(k.as_bytes()), sanitize_value(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(sanitize_value).collect()),
        Value::String(s) => Value::String(sanitize_prompt(s.as_bytes())),
        other => other.clone(),
    }
}

/// Write the prompt used for a single image to its own text file, so each
/// transcription can be audited against the exact prompt that produced it.
pub fn save_prompt(path: &Path, prompt: &str) -> Result<(), SupportError> {
    fs::write(path, prompt)?;
    Ok(())
}
