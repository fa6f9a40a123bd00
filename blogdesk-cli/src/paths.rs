//! Where blogdesk keeps its files.
//!
//! Defaults follow the platform conventions of `directories` (XDG on Linux).
//! `--db` and `--settings` override the data files; logs always go to the
//! cache directory.

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use directories::ProjectDirs;

/// Archived logs kept next to `latest.log`.
const KEPT_LOGS: usize = 10;
const LATEST_LOG: &str = "latest.log";

/// Resolved file locations for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Paths {
    pub database: PathBuf,
    pub settings: PathBuf,
}

impl Paths {
    /// Applies command-line overrides on top of the platform data directory.
    ///
    /// Returns `None` only when an override is missing and no home directory
    /// can be determined.
    pub fn resolve(database: Option<PathBuf>, settings: Option<PathBuf>) -> Option<Self> {
        let data = || project_dirs().map(|dirs| dirs.data_dir().to_path_buf());
        Some(Self {
            database: match database {
                Some(path) => path,
                None => data()?.join("blogdesk.db"),
            },
            settings: match settings {
                Some(path) => path,
                None => data()?.join("settings.db"),
            },
        })
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "blogdesk", "blogdesk")
}

/// Log directory, e.g. `~/.cache/blogdesk`.
pub fn log_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.cache_dir().to_path_buf())
}

/// Creates the parent directory of `path` if it is missing.
pub fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Archives the previous `latest.log` and prunes old archives.
///
/// Returns the path the new log should be written to.
pub fn rotate_logs(dir: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let latest = dir.join(LATEST_LOG);

    if latest.exists() {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S%.3f");
        fs::rename(&latest, dir.join(format!("blogdesk_{}.log", stamp)))?;
    }

    let mut archived: Vec<_> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            name.starts_with("blogdesk_") && name.ends_with(".log")
        })
        .map(|entry| entry.path())
        .collect();

    // Names embed the timestamp, newest last.
    archived.sort();
    let excess = archived.len().saturating_sub(KEPT_LOGS);
    for old in &archived[..excess] {
        if let Err(e) = fs::remove_file(old) {
            eprintln!("Failed to remove old log {}: {}", old.display(), e);
        }
    }

    Ok(latest)
}
