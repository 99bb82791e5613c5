//! Executable discovery and size accounting.

use crate::report::ExecutableCandidate;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Executables larger than this are flagged as probable main applications.
pub const PROBABLE_APP_MIN_SIZE: u64 = 1_000_000;

/// Subtrees of `drive_c` holding Windows or shared components, lowercase.
const SKIP_DIRS: &[&str] = &[
    "windows",
    "programdata",
    "program files/common files",
    "program files (x86)/common files",
    "program files/windows nt",
    "program files (x86)/windows nt",
];

/// Installer, updater and crash-handler executables.
static SKIP_EXE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)(unins\d*\.exe$|uninst.*\.exe$|setup\.exe$|install.*\.exe$|",
        r"update.*\.exe$|crash.*\.exe$|report.*\.exe$|helper.*\.exe$|launcher\.exe$)"
    ))
    .unwrap()
});

/// Whether a file name belongs to an installer or helper tool.
pub fn is_auxiliary_executable(file_name: &str) -> bool {
    SKIP_EXE_PATTERN.is_match(file_name)
}

/// Whether `rel` (relative to `drive_c`) is inside a skipped system subtree.
pub fn is_system_dir(rel: &Path) -> bool {
    let normalized = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_lowercase())
        .collect::<Vec<_>>()
        .join("/");
    SKIP_DIRS.iter().any(|skip| {
        normalized == *skip
            || (normalized.starts_with(skip) && normalized[skip.len()..].starts_with('/'))
    })
}

/// Find candidate executables under `drive_c`, largest first.
///
/// Paths in the result are relative to `prefix_root`.
pub fn find_executables(prefix_root: &Path, drive_c: &Path) -> Vec<ExecutableCandidate> {
    let mut executables = Vec::new();

    let walker = WalkDir::new(drive_c)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !(e.file_type().is_dir() && skipped(drive_c, e)));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        if !file_name.to_lowercase().ends_with(".exe") || is_auxiliary_executable(&file_name) {
            continue;
        }

        let size = match entry.metadata() {
            Ok(meta) => meta.len(),
            Err(e) => {
                warn!("Cannot stat {:?}: {}", entry.path(), e);
                0
            }
        };

        let rel = entry
            .path()
            .strip_prefix(prefix_root)
            .unwrap_or(entry.path());
        let name = Path::new(file_name.as_ref())
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        executables.push(ExecutableCandidate {
            path: rel.to_string_lossy().replace('\\', "/"),
            name,
            size,
            probable_app: size > PROBABLE_APP_MIN_SIZE,
        });
    }

    // Stable: equal sizes keep walk order.
    executables.sort_by(|a, b| b.size.cmp(&a.size));
    debug!("Found {} candidate executable(s)", executables.len());
    executables
}

fn skipped(drive_c: &Path, entry: &DirEntry) -> bool {
    entry
        .path()
        .strip_prefix(drive_c)
        .map(is_system_dir)
        .unwrap_or(false)
}

/// Total size of the regular files under `path`. Symlinks are not followed
/// and unreadable entries count as zero.
pub fn dir_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.metadata().map(|m| m.len()).unwrap_or(0))
        .sum()
}
