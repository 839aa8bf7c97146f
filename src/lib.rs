//! Local JSON Pointer `$ref` resolution for OpenAPI and JSON Schema documents.
//!
//! [`Resolver`] owns one parsed document and expands pointers into fully
//! dereferenced values, rejecting cycles and overly deep reference chains.
//! [`loader`] turns JSON or YAML files into documents, and [`definition`]
//! offers read-only OpenAPI accessors for callers that walk operations.

pub mod config;
pub mod definition;
pub mod diagnostics;
pub mod error;
pub mod loader;
pub mod pointer;
pub mod resolver;
pub mod scanner;
pub mod types;

pub use error::Error;
pub use resolver::{DEFAULT_MAX_DEPTH, Resolver};
pub use types::{Document, NodeKind, ReferenceSite};
