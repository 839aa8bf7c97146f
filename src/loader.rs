//! Document loading: JSON/YAML parsing and OpenAPI version detection.

use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::Error;
use crate::types::{Document, Format, OpenApiVersion};

/// Read, parse, and version-check a document.
///
/// With `lenient`, a missing or unknown `openapi` version is accepted and
/// recorded as `None`; otherwise it is an error.
///
/// # Errors
///
/// Returns `Error::DocumentNotFound` if the file doesn't exist,
/// `Error::UnsupportedFormat` for unknown extensions,
/// `Error::ParseFailed` for malformed text,
/// or `Error::UnsupportedVersion` when strict and the version is not 3.0.x/3.1.x.
pub fn load(path: &Path, lenient: bool) -> Result<Document, Error> {
    let format = Format::from_path(path)?;
    let content = match std::fs::read_to_string(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::DocumentNotFound { path: path.to_path_buf() });
        },
        Err(e) => return Err(Error::Io(e)),
        Ok(c) => c,
    };

    let root = parse(&content, format, path)?;
    let version = match detect_version(&root, path) {
        Ok(v) => Some(v),
        Err(Error::UnsupportedVersion { .. }) if lenient => None,
        Err(e) => return Err(e),
    };

    debug!(path = %path.display(), ?format, ?version, "loaded document");
    return Ok(Document { path: path.to_path_buf(), root, version });
}

/// Parse document text into a tree. `origin` only labels errors.
///
/// # Errors
///
/// Returns `Error::ParseFailed` if the text is not valid in the given format.
pub fn parse(content: &str, format: Format, origin: &Path) -> Result<Value, Error> {
    let parsed: Result<Value, String> = match format {
        Format::Json => serde_json::from_str(content).map_err(|e| return e.to_string()),
        Format::Yaml => serde_yaml::from_str(content)
            .and_then(apply_merge_keys)
            .map_err(|e| return e.to_string())
            .and_then(yaml_to_tree),
    };

    return parsed.map_err(|reason| {
        return Error::ParseFailed { file: origin.to_path_buf(), reason };
    });
}

/// Splice `<<: *anchor` merge keys into their mappings. Explicit keys win over merged ones.
fn apply_merge_keys(mut value: serde_yaml::Value) -> Result<serde_yaml::Value, serde_yaml::Error> {
    value.apply_merge()?;
    return Ok(value);
}

/// Convert a YAML tree. Scalar mapping keys become strings, so unquoted
/// response codes such as `200:` survive as `"200"`. Tags are dropped.
fn yaml_to_tree(value: serde_yaml::Value) -> Result<Value, String> {
    return match value {
        serde_yaml::Value::Null => Ok(Value::Null),
        serde_yaml::Value::Bool(b) => Ok(Value::Bool(b)),
        serde_yaml::Value::Number(n) => yaml_number(&n),
        serde_yaml::Value::String(s) => Ok(Value::String(s)),
        serde_yaml::Value::Sequence(items) => items
            .into_iter()
            .map(yaml_to_tree)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        serde_yaml::Value::Mapping(mapping) => {
            let mut map = Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                map.insert(yaml_key(key)?, yaml_to_tree(value)?);
            }
            Ok(Value::Object(map))
        },
        serde_yaml::Value::Tagged(tagged) => yaml_to_tree(tagged.value),
    };
}

/// Convert a YAML number, refusing NaN and infinities.
fn yaml_number(n: &serde_yaml::Number) -> Result<Value, String> {
    if let Some(i) = n.as_i64() {
        return Ok(Value::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Ok(Value::from(u));
    }
    return n
        .as_f64()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| return format!("number `{n}` has no JSON representation"));
}

/// Stringify a scalar mapping key.
fn yaml_key(key: serde_yaml::Value) -> Result<String, String> {
    return match key {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Null => Ok("null".to_string()),
        serde_yaml::Value::Sequence(_)
        | serde_yaml::Value::Mapping(_)
        | serde_yaml::Value::Tagged(_) => Err("mapping keys must be scalars".to_string()),
    };
}

/// Read the `openapi` field and map it to a supported version line.
///
/// # Errors
///
/// Returns `Error::UnsupportedVersion` if the field is absent, not a string,
/// or not a 3.0.x/3.1.x version.
pub fn detect_version(root: &Value, origin: &Path) -> Result<OpenApiVersion, Error> {
    let declared = root.get("openapi").and_then(Value::as_str);

    return match declared {
        Some(v) if v.starts_with("3.0.") => Ok(OpenApiVersion::V3_0),
        Some(v) if v.starts_with("3.1.") => Ok(OpenApiVersion::V3_1),
        _ => Err(Error::UnsupportedVersion {
            file: origin.to_path_buf(),
            found: root.get("openapi").map(|v| {
                return v.as_str().map_or_else(|| return v.to_string(), str::to_string);
            }),
        }),
    };
}
