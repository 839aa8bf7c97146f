//! JSON Pointer decoding, escaping, and traversal over a document tree.

use serde_json::Value;

use crate::error::Error;
use crate::types::{DecodedPointer, LOCAL_PREFIX, ROOT_POINTER};

/// Split a pointer into decoded segments.
///
/// `~1` is replaced before `~0`, so `~01` decodes to the literal `~1`.
/// A pointer without the `#/` prefix comes back with `prefix_valid == false`
/// and no segments.
pub fn decode(pointer: &str) -> DecodedPointer {
    let Some(rest) = pointer.strip_prefix(LOCAL_PREFIX) else {
        return DecodedPointer { prefix_valid: false, segments: Vec::new() };
    };

    if rest.is_empty() {
        return DecodedPointer { prefix_valid: true, segments: Vec::new() };
    }

    let segments = rest.split('/').map(unescape_segment).collect();
    return DecodedPointer { prefix_valid: true, segments };
}

/// Decode a single raw segment.
pub fn unescape_segment(raw: &str) -> String {
    return raw.replace("~1", "/").replace("~0", "~");
}

/// Encode a key so it survives as one pointer segment.
pub fn escape_segment(key: &str) -> String {
    return key.replace('~', "~0").replace('/', "~1");
}

/// Build the pointer of `key` inside the location `parent`.
pub fn child(parent: &str, key: &str) -> String {
    let segment = escape_segment(key);
    if parent == ROOT_POINTER {
        return format!("{ROOT_POINTER}{segment}");
    }
    return format!("{parent}/{segment}");
}

/// Walk `root` by already-decoded segments.
///
/// # Errors
///
/// Returns `Error::PointerResolutionFailure` naming `pointer` when a segment is
/// absent, when an array segment is not a canonical in-range index, or when a
/// scalar is indexed into.
pub fn walk<'a>(root: &'a Value, pointer: &str, segments: &[String]) -> Result<&'a Value, Error> {
    let mut current = root;
    let mut location = ROOT_POINTER.to_string();

    for segment in segments {
        let Some(next) = step(current, segment) else {
            return Err(Error::PointerResolutionFailure {
                parent: location,
                pointer: pointer.to_string(),
                segment: segment.clone(),
                suggestions: available_keys(current),
            });
        };
        location = child(&location, segment);
        current = next;
    }

    return Ok(current);
}

/// Index one level into a node.
fn step<'a>(node: &'a Value, segment: &str) -> Option<&'a Value> {
    return match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => array_index(segment).and_then(|i| return items.get(i)),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => None,
    };
}

/// Parse an array segment. Leading zeros and `-` are not indices.
fn array_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|b| return b.is_ascii_digit()) {
        return None;
    }
    if segment.len() > 1 && segment.starts_with('0') {
        return None;
    }
    return segment.parse().ok();
}

/// Keys that could have been used at this node, for "did you mean" hints.
fn available_keys(node: &Value) -> Vec<String> {
    return match node {
        Value::Object(map) => map.keys().cloned().collect(),
        Value::Array(items) if !items.is_empty() => {
            vec![format!("0..{}", items.len().saturating_sub(1))]
        },
        _ => Vec::new(),
    };
}
