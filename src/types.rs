/// Core domain types for pointers, reference markers, and loaded documents.
use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::Error;

/// Key marking an object as a reference to another location.
pub const REF_KEY: &str = "$ref";

/// Prefix every local pointer starts with.
pub const LOCAL_PREFIX: &str = "#/";

/// Pointer to the document root.
pub const ROOT_POINTER: &str = "#/";

/// Output of pointer decoding. Segments are already unescaped and never re-split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPointer {
    /// Whether the pointer started with `#/`.
    pub prefix_valid: bool,
    /// Decoded path segments, outermost first. Empty for the root pointer.
    pub segments: Vec<String>,
}

/// A document node classified once, so recursion matches on the variant
/// instead of probing for the marker key.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind<'a> {
    /// Ordered sequence of nodes.
    Array(&'a [Value]),
    /// Plain object without a reference marker.
    Object(&'a Map<String, Value>),
    /// Object carrying a string `$ref`.
    Reference {
        /// Sibling keys of `$ref`, in document order.
        overrides: Vec<(&'a str, &'a Value)>,
        /// The referenced pointer.
        pointer: &'a str,
    },
    /// String, number, boolean, or null.
    Scalar(&'a Value),
}

impl<'a> NodeKind<'a> {
    /// Classify a node. A `$ref` whose value is not a non-empty string is ordinary content.
    pub fn classify(node: &'a Value) -> Self {
        return match node {
            Value::Array(items) => NodeKind::Array(items),
            Value::Object(map) => match map.get(REF_KEY) {
                Some(Value::String(pointer)) if !pointer.is_empty() => NodeKind::Reference {
                    overrides: map
                        .iter()
                        .filter(|(key, _)| return key.as_str() != REF_KEY)
                        .map(|(key, value)| return (key.as_str(), value))
                        .collect(),
                    pointer,
                },
                _ => NodeKind::Object(map),
            },
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
                NodeKind::Scalar(node)
            },
        };
    }
}

/// A `$ref` occurrence found in a document.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ReferenceSite {
    /// Pointer to the object carrying the `$ref`.
    pub location: String,
    /// The referenced pointer, verbatim.
    pub target: String,
}

/// Source text formats the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// JSON text.
    Json,
    /// YAML text (a superset of JSON).
    Yaml,
}

impl Format {
    /// Map a file extension to its format.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnsupportedFormat` for unknown extensions.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let ext = path.extension().and_then(|e| return e.to_str()).unwrap_or("");

        return match ext.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => Err(Error::UnsupportedFormat { ext: ext.to_string() }),
        };
    }
}

/// OpenAPI major.minor lines the loader accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenApiVersion {
    /// Any `3.0.x` document.
    V3_0,
    /// Any `3.1.x` document.
    V3_1,
}

impl fmt::Display for OpenApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return match self {
            Self::V3_0 => f.write_str("3.0"),
            Self::V3_1 => f.write_str("3.1"),
        };
    }
}

/// A parsed document ready for resolution.
#[derive(Debug, Clone)]
pub struct Document {
    /// Where the document was read from.
    pub path: PathBuf,
    /// The parsed tree.
    pub root: Value,
    /// Declared OpenAPI version. `None` only for documents loaded leniently.
    pub version: Option<OpenApiVersion>,
}
