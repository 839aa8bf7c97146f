//! CLI commands for derefspec: resolve, deref, refs, endpoints, operation, check.

use std::path::Path;
use std::process::ExitCode;

use derefspec::config::Config;
use derefspec::definition::Definition;
use derefspec::error::Error;
use derefspec::types::{Document, ReferenceSite};
use derefspec::{Resolver, loader, scanner};
use serde_json::Value;
use tracing::{debug, info};

/// Settings shared by every command, after merging config and flags.
#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Accept documents without a supported OpenAPI version.
    pub lenient: bool,
    /// Depth bound for each resolver.
    pub max_depth: usize,
}

/// Result of checking a single reference site.
enum CheckResult {
    /// The target is missing or not a local pointer.
    Broken(String),
    /// The target loops back on itself or nests past the depth bound.
    Circular(String),
    /// The target resolves.
    Fresh,
}

/// Totals across every checked document.
#[derive(Debug, Default)]
struct CheckSummary {
    /// Sites whose target does not exist.
    broken: u32,
    /// Sites caught in a cycle or too deep.
    circular: u32,
    /// Documents checked.
    documents: u32,
    /// Sites that resolved.
    fresh: u32,
    /// Documents that could not be loaded.
    invalid: u32,
}

/// Load a document and hand its tree to a new resolver.
///
/// # Errors
///
/// Returns loader errors.
fn open(file: &Path, options: Options) -> Result<Resolver, Error> {
    let document = loader::load(file, options.lenient)?;
    return Ok(Resolver::with_max_depth(document.root, options.max_depth));
}

/// Print a value as pretty JSON or YAML on stdout.
///
/// # Errors
///
/// Returns `Error::OutputFailed` if serialization fails.
fn print_value(value: &Value, yaml: bool) -> Result<(), Error> {
    let text = if yaml {
        serde_yaml::to_string(value).map_err(|e| return Error::OutputFailed { reason: e.to_string() })?
    } else {
        serde_json::to_string_pretty(value)
            .map_err(|e| return Error::OutputFailed { reason: e.to_string() })?
    };

    println!("{}", text.trim_end());
    return Ok(());
}

/// Resolve one pointer and print the expanded value.
///
/// # Errors
///
/// Returns loader or resolution errors.
pub fn resolve(file: &Path, pointer: &str, yaml: bool, options: Options) -> Result<(), Error> {
    let resolver = open(file, options)?;
    let value = resolver.resolve(pointer)?;
    info!(pointer, walks = resolver.traversal_count(), "resolved");
    return print_value(&value, yaml);
}

/// Print the fully dereferenced document.
///
/// # Errors
///
/// Returns loader or resolution errors.
pub fn deref(file: &Path, yaml: bool, options: Options) -> Result<(), Error> {
    let resolver = open(file, options)?;
    let value = resolver.resolve_document()?;
    info!(cached = resolver.cached_len(), "dereferenced document");
    return print_value(&value, yaml);
}

/// List every reference site.
///
/// # Errors
///
/// Returns loader errors, or `Error::OutputFailed` for JSON output.
pub fn refs(file: &Path, json: bool, options: Options) -> Result<(), Error> {
    let document = loader::load(file, options.lenient)?;
    let sites = scanner::collect_reference_sites(&document.root);

    if json {
        let text = serde_json::to_string_pretty(&sites)
            .map_err(|e| return Error::OutputFailed { reason: e.to_string() })?;
        println!("{text}");
        return Ok(());
    }

    for site in &sites {
        println!("{} -> {}", site.location, site.target);
    }
    eprintln!("{} references", sites.len());
    return Ok(());
}

/// List operations as `METHOD path  summary`, with the detected version and servers on stderr.
///
/// # Errors
///
/// Returns loader errors.
pub fn endpoints(file: &Path, options: Options) -> Result<(), Error> {
    let document = loader::load(file, options.lenient)?;
    let definition = Definition::new(&document.root);

    match document.version {
        Some(version) => eprintln!("openapi: {version}"),
        None => eprintln!("openapi: unknown"),
    }

    for endpoint in definition.endpoints() {
        match endpoint.summary() {
            Some(summary) => println!("{:<7} {}  {summary}", endpoint.method, endpoint.path),
            None => println!("{:<7} {}", endpoint.method, endpoint.path),
        }
    }

    for server in definition.servers() {
        eprintln!("server: {}", server.url);
    }
    return Ok(());
}

/// Print one operation with references expanded and path-level parameters merged in.
///
/// # Errors
///
/// Returns loader or resolution errors, or `Error::PointerResolutionFailure`
/// if the path has no such operation.
pub fn operation(file: &Path, path: &str, method: &str, options: Options) -> Result<(), Error> {
    let resolver = open(file, options)?;
    let definition = Definition::new(resolver.root());

    let Some(raw) = definition.operation(path, method) else {
        let paths = derefspec::pointer::child("#/", "paths");
        let item = derefspec::pointer::child(&paths, path);
        return Err(Error::PointerResolutionFailure {
            parent: item.clone(),
            pointer: derefspec::pointer::child(&item, &method.to_ascii_lowercase()),
            segment: method.to_ascii_lowercase(),
            suggestions: definition
                .endpoints()
                .iter()
                .filter(|e| return e.path == path)
                .map(|e| return e.method.to_ascii_lowercase())
                .collect(),
        });
    };

    let mut expanded = resolver.expand(raw)?;
    let parameters = definition
        .parameters(path, method)
        .into_iter()
        .map(|p| return resolver.expand(p))
        .collect::<Result<Vec<_>, _>>()?;

    if let Value::Object(map) = &mut expanded {
        map.insert("parameters".to_string(), Value::Array(parameters));
    }
    return print_value(&expanded, false);
}

/// Resolve every reference site of one document or every document under a directory.
///
/// Directory scans skip files that are not OpenAPI documents (unless lenient);
/// a file named directly is always reported.
///
/// # Errors
///
/// Returns `Error::DocumentNotFound` if `target` does not exist.
pub fn check(target: &Path, config: &Config, options: Options) -> Result<ExitCode, Error> {
    if !target.exists() {
        return Err(Error::DocumentNotFound { path: target.to_path_buf() });
    }

    let scanning_directory = target.is_dir();
    let mut summary = CheckSummary::default();

    for path in scanner::find_documents(target, config) {
        let document = match loader::load(&path, options.lenient) {
            Ok(d) => d,
            Err(Error::UnsupportedVersion { .. }) if scanning_directory => {
                debug!(path = %path.display(), "skipping non-OpenAPI document");
                continue;
            },
            Err(e) => {
                summary.invalid = summary.invalid.saturating_add(1);
                println!("INVALID  {} ({e})", path.display());
                continue;
            },
        };
        check_document(document, options.max_depth, &mut summary);
    }

    return Ok(report(&summary));
}

/// Check all sites of one document with a fresh resolver.
fn check_document(document: Document, max_depth: usize, summary: &mut CheckSummary) {
    let Document { path, root, .. } = document;
    let resolver = Resolver::with_max_depth(root, max_depth);
    let sites = scanner::collect_reference_sites(resolver.root());
    summary.documents = summary.documents.saturating_add(1);

    for site in &sites {
        match check_site(&resolver, site) {
            CheckResult::Broken(reason) => {
                summary.broken = summary.broken.saturating_add(1);
                println!("BROKEN   {}{} -> {} ({reason})", path.display(), site.location, site.target);
            },
            CheckResult::Circular(reason) => {
                summary.circular = summary.circular.saturating_add(1);
                println!("CIRCULAR {}{} -> {} ({reason})", path.display(), site.location, site.target);
            },
            CheckResult::Fresh => summary.fresh = summary.fresh.saturating_add(1),
        }
    }

    info!(
        path = %path.display(),
        sites = sites.len(),
        walks = resolver.traversal_count(),
        max_depth = resolver.max_depth(),
        "checked document"
    );
}

/// Classify one site by resolving its target.
fn check_site(resolver: &Resolver, site: &ReferenceSite) -> CheckResult {
    return match resolver.resolve(&site.target) {
        Ok(_) => CheckResult::Fresh,
        Err(e) if e.is_cyclic() => CheckResult::Circular(e.to_string()),
        Err(e) => CheckResult::Broken(e.to_string()),
    };
}

/// Print the summary line and pick the exit code.
fn report(summary: &CheckSummary) -> ExitCode {
    let problems = summary.broken.saturating_add(summary.invalid);

    // Exit code priority: broken or invalid (2) > circular (1) > clean (0).
    if problems > 0 {
        println!();
        println!(
            "{} broken, {} invalid, {} circular",
            summary.broken, summary.invalid, summary.circular
        );
        return ExitCode::from(2);
    } else if summary.circular > 0 {
        println!();
        println!("{} circular", summary.circular);
        return ExitCode::from(1);
    } else {
        println!(
            "All {} references resolve in {} documents",
            summary.fresh, summary.documents
        );
        return ExitCode::SUCCESS;
    }
}
