use std::path::Path;

use crate::error::Error;
use crate::resolver::DEFAULT_MAX_DEPTH;

/// Name of the project configuration file.
pub const CONFIG_FILE: &str = ".derefspec.toml";

/// Project configuration loaded from `.derefspec.toml`.
/// Include/exclude patterns are path prefixes applied to document files
/// found while scanning a directory.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path prefixes to skip.
    exclude: Vec<String>,
    /// Path prefixes to scan. Empty means everything.
    include: Vec<String>,
    /// Accept documents that do not declare a supported OpenAPI version.
    pub lenient: bool,
    /// Resolution depth bound for every resolver created by the CLI.
    pub max_depth: usize,
}

/// Raw TOML structure for `.derefspec.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct DerefspecTomlConfig {
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    lenient: bool,
    #[serde(default = "default_max_depth")]
    max_depth: usize,
}

/// Serde default for `max_depth`.
const fn default_max_depth() -> usize {
    return DEFAULT_MAX_DEPTH;
}

impl Default for Config {
    fn default() -> Self {
        return Self {
            exclude: Vec::new(),
            include: Vec::new(),
            lenient: false,
            max_depth: DEFAULT_MAX_DEPTH,
        };
    }
}

impl Config {
    /// Load config from `.derefspec.toml` in the given root directory.
    /// Returns the defaults if the file doesn't exist.
    /// Returns an error if the file exists but is malformed; never silently
    /// falls back to defaults when the user wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
        };

        let raw: DerefspecTomlConfig = toml::from_str(&content)?;
        return Ok(Self {
            exclude: raw.exclude,
            include: raw.include,
            lenient: raw.lenient,
            max_depth: raw.max_depth,
        });
    }

    /// Check whether a document path should be scanned.
    ///
    /// A path is included if no include patterns are set (scan everything),
    /// or if the path starts with at least one include pattern.
    /// An included path is then excluded if it starts with any exclude pattern.
    pub fn should_scan(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| return relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }
}
