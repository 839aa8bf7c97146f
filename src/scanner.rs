use std::path::{Path, PathBuf};

use serde_json::Value;
use walkdir::WalkDir;

use crate::config::Config;
use crate::pointer;
use crate::types::{Format, NodeKind, ROOT_POINTER, ReferenceSite};

/// Find every loadable document under `root`.
/// A file path is returned as-is. A directory is walked recursively, keeping
/// `.json`/`.yaml`/`.yml` files that pass the config's include/exclude filters.
/// Results are sorted for deterministic output.
pub fn find_documents(root: &Path, config: &Config) -> Vec<PathBuf> {
    if root.is_file() {
        return vec![root.to_path_buf()];
    }

    let mut documents: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| return e.file_type().is_file() && Format::from_path(e.path()).is_ok())
        .filter(|e| {
            let relative = e.path().strip_prefix(root).unwrap_or(e.path());
            return config.should_scan(&relative.to_string_lossy());
        })
        .map(walkdir::DirEntry::into_path)
        .collect();

    documents.sort();
    return documents;
}

/// Collect every `$ref` in document order, with the pointer of the object carrying it.
pub fn collect_reference_sites(root: &Value) -> Vec<ReferenceSite> {
    let mut sites = Vec::new();
    collect_from_node(root, ROOT_POINTER, &mut sites);
    return sites;
}

/// Recurse into one node. Override siblings of a reference are scanned too.
fn collect_from_node(node: &Value, location: &str, sites: &mut Vec<ReferenceSite>) {
    match NodeKind::classify(node) {
        NodeKind::Scalar(_) => {},
        NodeKind::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                collect_from_node(item, &pointer::child(location, &index.to_string()), sites);
            }
        },
        NodeKind::Object(map) => {
            for (key, value) in map {
                collect_from_node(value, &pointer::child(location, key), sites);
            }
        },
        NodeKind::Reference { overrides, pointer: target } => {
            sites.push(ReferenceSite {
                location: location.to_string(),
                target: target.to_string(),
            });
            for (key, value) in overrides {
                collect_from_node(value, &pointer::child(location, key), sites);
            }
        },
    }
}
