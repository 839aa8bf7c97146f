//! File watcher: runs `check` on startup, then re-runs on document changes.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use derefspec::config::Config;
use derefspec::diagnostics;
use derefspec::error::Error;
use notify::{RecursiveMode, Watcher as _};

use crate::commands::{self, Options};

/// Debounce delay between filesystem events and re-check.
const DEBOUNCE_MS: u64 = 100;

/// Pick what to watch: a directory recursively, or a file's parent directory.
fn watch_root(target: &Path) -> (PathBuf, RecursiveMode) {
    if target.is_dir() {
        return (target.to_path_buf(), RecursiveMode::Recursive);
    }
    let parent = target
        .parent()
        .filter(|p| return !p.as_os_str().is_empty())
        .unwrap_or_else(|| return Path::new("."));
    return (parent.to_path_buf(), RecursiveMode::NonRecursive);
}

/// Create a filesystem watcher that sends events on the given channel.
///
/// # Errors
///
/// Returns `Error::WatchFailed` if the watcher cannot be created.
fn create_watcher(
    tx: crossbeam_channel::Sender<()>,
) -> Result<notify::RecommendedWatcher, Error> {
    return notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        if let Ok(event) = res
            && matches!(
                event.kind,
                notify::EventKind::Create(_)
                    | notify::EventKind::Modify(_)
                    | notify::EventKind::Remove(_)
            )
        {
            let _ = tx.send(());
        }
    })
    .map_err(|e| {
        return Error::WatchFailed {
            reason: format!("watcher setup failed: {e}"),
        };
    });
}

/// Entry point for the watch command.
///
/// Runs an initial check, then watches the target and re-checks on changes.
/// Each re-check reloads the documents, so resolvers never see stale content.
///
/// # Errors
///
/// Returns `Error::WatchFailed` if the watcher cannot be created or attached.
pub fn run(target: &Path, config: &Config, options: Options) -> Result<ExitCode, Error> {
    eprintln!("watch: initial check");
    let mut last_code = run_check(target, config, options);

    let (dir, mode) = watch_root(target);
    let (tx, rx) = crossbeam_channel::unbounded();
    let mut watcher = create_watcher(tx)?;
    watcher.watch(&dir, mode).map_err(|e| {
        return Error::WatchFailed {
            reason: format!("cannot watch {}: {e}", dir.display()),
        };
    })?;

    eprintln!("watch: monitoring {}, press Ctrl+C to stop", dir.display());

    while rx.recv().is_ok() {
        let debounce = Duration::from_millis(DEBOUNCE_MS);
        while rx.recv_timeout(debounce).is_ok() {}
        eprintln!("watch: change detected, re-checking...");
        last_code = run_check(target, config, options);
    }

    return Ok(last_code);
}

/// Run check once and print result. Returns the exit code from check.
fn run_check(target: &Path, config: &Config, options: Options) -> ExitCode {
    return match commands::check(target, config, options) {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(3_u8)
        },
    };
}
