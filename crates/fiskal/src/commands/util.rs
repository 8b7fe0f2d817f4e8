//! Shared helpers for command handlers.

use std::path::Path;

use serde_json::Value;

use crate::error::CliError;

/// Read and parse a JSON file for `--from-file` flags.
pub fn read_json_file(path: &Path) -> Result<Value, CliError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| CliError::Validation {
        field: "from-file".into(),
        reason: format!("invalid JSON: {e}"),
    })
}

/// Parse an inline JSON argument.
pub fn parse_json_arg(field: &str, raw: &str) -> Result<Value, CliError> {
    serde_json::from_str(raw).map_err(|e| CliError::Validation {
        field: field.into(),
        reason: format!("invalid JSON: {e}"),
    })
}

/// Request body from `--data`/`--from-file`, or an empty object.
pub fn body_from(
    field: &str,
    inline: Option<&str>,
    file: Option<&Path>,
) -> Result<Value, CliError> {
    match (inline, file) {
        (Some(raw), _) => parse_json_arg(field, raw),
        (None, Some(path)) => read_json_file(path),
        (None, None) => Ok(Value::Object(serde_json::Map::new())),
    }
}

/// Split a `Name: value` header argument.
pub fn parse_header(raw: &str) -> Result<(&str, &str), CliError> {
    let (name, value) = raw.split_once(':').ok_or_else(|| CliError::Validation {
        field: "header".into(),
        reason: format!("expected 'Name: value', got '{raw}'"),
    })?;
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::Validation {
            field: "header".into(),
            reason: "header name cannot be empty".into(),
        });
    }
    Ok((name, value.trim()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn headers_split_on_first_colon() {
        assert_eq!(parse_header("X-Till: 3").unwrap(), ("X-Till", "3"));
        assert_eq!(parse_header("X-Url:http://a:1").unwrap(), ("X-Url", "http://a:1"));
        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(": v").is_err());
    }

    #[test]
    fn body_sources() {
        assert_eq!(body_from("data", None, None).unwrap(), json!({}));
        assert_eq!(
            body_from("data", Some(r#"{"state":"INITIALIZED"}"#), None).unwrap(),
            json!({ "state": "INITIALIZED" })
        );
        assert!(matches!(
            body_from("data", Some("{oops"), None),
            Err(CliError::Validation { .. })
        ));

        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"{"metadata":{"till":"3"}}"#).unwrap();
        assert_eq!(
            body_from("data", None, Some(file.path())).unwrap(),
            json!({ "metadata": { "till": "3" } })
        );
    }
}
