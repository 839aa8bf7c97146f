use std::fmt::Write as _;
use std::path::Path;

use crate::error::Error;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened, and how to fix it where
/// there is something the user can change.
pub fn render_error(e: &Error) -> String {
    match e {
        Error::CircularReference { chain } => render_circular_reference(chain),
        Error::DepthExceeded { depth, max_depth, pointer } => {
            render_depth_exceeded(pointer, *depth, *max_depth)
        },
        Error::PointerResolutionFailure { parent, pointer, segment, suggestions } => {
            render_pointer_resolution_failure(pointer, parent, segment, suggestions)
        },
        Error::UnsupportedReferenceKind { pointer } => render_unsupported_reference(pointer),
        Error::UnsupportedVersion { file, found } => render_unsupported_version(file, found.as_deref()),
        Error::UnsupportedFormat { ext } => render_unsupported_format(ext),
        _ => render_generic(e),
    }
}

fn render_generic(e: &Error) -> String {
    match e {
        Error::DocumentNotFound { path } => format!("\
# Error: Document Not Found

`{}` does not exist.
", path.display()),

        Error::ParseFailed { file, reason } => format!("\
# Error: Parse Failed

Could not parse `{}`: {reason}
", file.display()),

        Error::Io(e) => format!("\
# Error: I/O

{e}
"),
        Error::TomlDe(e) => format!("\
# Error: Invalid Config

{e}

## Fix

Check `.derefspec.toml`. Known keys: `max_depth`, `lenient`, `include`, `exclude`.
"),
        Error::OutputFailed { reason } => format!("\
# Error: Output Failed

{reason}
"),
        Error::WatchFailed { reason } => format!("\
# Error: Watch Failed

{reason}
"),
        // Already handled in render_error, but need exhaustive match.
        _ => format!("\
# Error

{e}
"),
    }
}

fn render_circular_reference(chain: &[String]) -> String {
    let chain_str = chain.join(" -> ");

    format!(
        "\
# Error: Circular Reference

Reference chain loops back on itself: {chain_str}

## Fix

Break the loop in one of the referenced definitions, or look up a pointer
that does not reach the cycle.
"
    )
}

fn render_depth_exceeded(pointer: &str, depth: usize, max_depth: usize) -> String {
    format!(
        "\
# Error: Reference Chain Too Deep

Resolving `{pointer}` needed {depth} nested references (max {max_depth}).

## Fix

Shorten the chain, or raise the bound:

    derefspec --max-depth {} ...
",
        depth.saturating_add(1)
    )
}

fn render_pointer_resolution_failure(
    pointer: &str,
    parent: &str,
    segment: &str,
    suggestions: &[String],
) -> String {
    let mut out = format!("\
# Error: Unresolvable Pointer

`{pointer}` does not exist: `{parent}` has no `{segment}`.
");

    let best = find_closest_suggestion(segment, suggestions);

    if let Some(suggestion) = &best {
        let _ = write!(out, "\n## Did you mean `{suggestion}`?\n\n");
        let _ = writeln!(out, "    {}", crate::pointer::child(parent, suggestion));
    } else if !suggestions.is_empty() {
        out.push_str("\n## Available keys\n\n");
        for s in suggestions {
            let _ = writeln!(out, "- `{s}`");
        }
    }

    out
}

/// Find the closest matching key, ignoring case and `-`/`_` separators.
pub(crate) fn find_closest_suggestion(segment: &str, suggestions: &[String]) -> Option<String> {
    let normalized = normalize_key(segment);
    suggestions.iter()
        .find(|s| normalize_key(s) == normalized)
        .cloned()
}

/// Lowercase and drop separators for fuzzy comparison.
fn normalize_key(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(*c, '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

fn render_unsupported_reference(pointer: &str) -> String {
    format!(
        "\
# Error: Unsupported Reference

`{pointer}` does not point into this document.

Only local pointers of the form `#/path/to/node` are supported.
"
    )
}

fn render_unsupported_version(file: &Path, found: Option<&str>) -> String {
    let declared = found.map_or_else(
        || "no `openapi` version".to_string(),
        |v| format!("`openapi: {v}`"),
    );

    format!(
        "\
# Error: Unsupported OpenAPI Version

`{}` declares {declared}.

## Fix

Only OpenAPI 3.0.x and 3.1.x are recognized. For plain JSON Schema or other
documents, pass `--lenient` or set `lenient = true` in `.derefspec.toml`.
",
        file.display()
    )
}

fn render_unsupported_format(ext: &str) -> String {
    format!(
        "\
# Error: Unsupported Format

No loader for `.{ext}` files.

## Supported extensions

- `.json`: JSON
- `.yaml`, `.yml`: YAML
"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_lists_chain_in_order() {
        let e = Error::CircularReference {
            chain: vec!["#/A".to_string(), "#/B".to_string(), "#/A".to_string()],
        };
        assert!(render_error(&e).contains("#/A -> #/B -> #/A"));
    }

    #[test]
    fn suggests_case_insensitive_match() {
        let keys = vec!["Pet".to_string(), "pet_owner".to_string()];
        assert_eq!(find_closest_suggestion("PetOwner", &keys), Some("pet_owner".to_string()));
        assert_eq!(find_closest_suggestion("pet", &keys), Some("Pet".to_string()));
        assert_eq!(find_closest_suggestion("Tag", &keys), None);
    }

    #[test]
    fn missing_pointer_shows_suggested_pointer() {
        let e = Error::PointerResolutionFailure {
            parent: "#/components/schemas".to_string(),
            pointer: "#/components/schemas/pet".to_string(),
            segment: "pet".to_string(),
            suggestions: vec!["Pet".to_string(), "Tag".to_string()],
        };
        let md = render_error(&e);
        assert!(md.contains("Did you mean `Pet`?"));
        assert!(md.contains("#/components/schemas/Pet"));
    }

    #[test]
    fn missing_pointer_lists_keys_without_match() {
        let e = Error::PointerResolutionFailure {
            parent: "#/components/schemas".to_string(),
            pointer: "#/components/schemas/DoesNotExist".to_string(),
            segment: "DoesNotExist".to_string(),
            suggestions: vec!["Pet".to_string(), "Tag".to_string()],
        };
        let md = render_error(&e);
        assert!(md.contains("`#/components/schemas/DoesNotExist` does not exist"));
        assert!(md.contains("- `Tag`"));
    }
}
