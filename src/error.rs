/// Crate-level error types for reference resolution and document loading.
use std::path::PathBuf;

/// All errors in derefspec carry enough context to produce a useful diagnostic
/// without a debugger. Each variant names the pointer, file, or reason for failure.
#[allow(clippy::error_impl_error, reason = "crate-wide error type re-exported from the library")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A pointer was reached again while its own resolution was still in progress.
    #[error("circular reference detected: {}", chain.join(" -> "))]
    CircularReference {
        /// Pointers in resolution order, ending with the pointer that closed the cycle.
        chain: Vec<String>,
    },

    /// The resolution stack grew past the configured maximum.
    #[error("maximum reference resolution depth exceeded ({depth} > {max_depth}) at `{pointer}`")]
    DepthExceeded {
        /// Stack length at the time of the check.
        depth: usize,
        /// Configured maximum stack length.
        max_depth: usize,
        /// Pointer whose resolution was refused.
        pointer: String,
    },

    /// A document file does not exist on disk.
    #[error("document not found: {}", path.display())]
    DocumentNotFound {
        /// Path to the missing document.
        path: PathBuf,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// A resolved value could not be serialized for output.
    #[error("output failed: {reason}")]
    OutputFailed {
        /// Description of the serialization failure.
        reason: String,
    },

    /// Document text could not be parsed as JSON or YAML.
    #[error("parse failed: {}: {reason}", file.display())]
    ParseFailed {
        /// File that failed to parse.
        file: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// A pointer segment does not exist in the document.
    #[error("unable to resolve pointer `{pointer}`: no `{segment}` at `{parent}`")]
    PointerResolutionFailure {
        /// Pointer to the deepest location that did exist.
        parent: String,
        /// The full pointer being resolved.
        pointer: String,
        /// The decoded segment that was missing.
        segment: String,
        /// Keys available at the parent location.
        suggestions: Vec<String>,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// No loader registered for this file extension.
    #[error("unsupported document format: .{ext}")]
    UnsupportedFormat {
        /// File extension without the leading dot.
        ext: String,
    },

    /// The pointer does not target the local document.
    #[error("only internal references are supported: `{pointer}`")]
    UnsupportedReferenceKind {
        /// The rejected pointer.
        pointer: String,
    },

    /// The document does not declare a supported OpenAPI version.
    #[error("unsupported OpenAPI version in {}: {}", file.display(), found.as_deref().unwrap_or("<missing>"))]
    UnsupportedVersion {
        /// Document that declared the version.
        file: PathBuf,
        /// The declared `openapi` value, if any.
        found: Option<String>,
    },

    /// The filesystem watcher could not be set up.
    #[error("watch failed: {reason}")]
    WatchFailed {
        /// Description of the watcher failure.
        reason: String,
    },
}

impl Error {
    /// Whether the error describes a reference graph that loops or nests too deeply,
    /// as opposed to a reference that points nowhere.
    pub const fn is_cyclic(&self) -> bool {
        return matches!(self, Self::CircularReference { .. } | Self::DepthExceeded { .. });
    }
}
