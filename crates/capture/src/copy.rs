//! Staged copies of prefixes and runtime trees.

use crate::exclusion::ExclusionSet;
use crate::symlink::{classify, SymlinkAction};
use std::fs;
use std::os::unix::fs::symlink;
use std::path::Path;
use tracing::{debug, trace};
use uncork_common::Result;
use walkdir::WalkDir;

/// Counters from a staged copy.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CopyStats {
    pub files: usize,
    pub directories: usize,
    pub bytes: u64,
    pub excluded: usize,
    pub links_kept: usize,
    pub links_rewritten: usize,
    pub links_dropped: usize,
}

/// Copy `src` into `dest`, skipping excluded paths and reclassifying
/// symlinks. Each path is checked on its own; only directories covered by
/// a `dir/**` pattern are skipped wholesale.
///
/// `progress` receives the fraction of regular files copied so far.
pub fn copy_prefix(
    src: &Path,
    dest: &Path,
    exclusions: &ExclusionSet,
    mut progress: impl FnMut(f32),
) -> Result<CopyStats> {
    let mut stats = CopyStats::default();
    let total = count_files(src, exclusions).max(1);

    fs::create_dir_all(dest)?;

    let walker = WalkDir::new(src)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_pruned(e, src, exclusions));

    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        if exclusions.is_excluded(rel) {
            continue;
        }
        let target = dest.join(rel);
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            let link_target = fs::read_link(entry.path())?;
            let action = classify(rel, &link_target);
            trace!("{:?} -> {:?}: {:?}", rel, link_target, action);
            match action {
                SymlinkAction::Drop => stats.links_dropped += 1,
                SymlinkAction::KeepAsIs => {
                    make_link(&link_target, &target)?;
                    stats.links_kept += 1;
                }
                SymlinkAction::Rewrite(new_target) => {
                    make_link(&new_target, &target)?;
                    stats.links_rewritten += 1;
                }
            }
        } else if file_type.is_dir() {
            fs::create_dir_all(&target)?;
            stats.directories += 1;
        } else if file_type.is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            stats.bytes += fs::copy(entry.path(), &target)?;
            stats.files += 1;
            progress(stats.files as f32 / total as f32);
        } else {
            debug!("Skipping special file {:?}", rel);
        }
    }

    // Entries pruned by the walker never reach the loop.
    stats.excluded = count_excluded(src, exclusions);

    debug!(
        "Copied {} file(s), {} bytes, {} excluded",
        stats.files, stats.bytes, stats.excluded
    );
    Ok(stats)
}

/// Copy a directory tree verbatim, recreating symlinks instead of
/// following them.
pub fn copy_tree(src: &Path, dest: &Path) -> Result<CopyStats> {
    let mut stats = CopyStats::default();
    fs::create_dir_all(dest)?;

    for entry in WalkDir::new(src).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dest.join(rel);
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            make_link(&fs::read_link(entry.path())?, &target)?;
            stats.links_kept += 1;
        } else if file_type.is_dir() {
            fs::create_dir_all(&target)?;
            stats.directories += 1;
        } else if file_type.is_file() {
            stats.bytes += fs::copy(entry.path(), &target)?;
            stats.files += 1;
        }
    }
    Ok(stats)
}

fn make_link(link_target: &Path, at: &Path) -> Result<()> {
    if let Some(parent) = at.parent() {
        fs::create_dir_all(parent)?;
    }
    symlink(link_target, at)?;
    Ok(())
}

fn is_pruned(entry: &walkdir::DirEntry, src: &Path, exclusions: &ExclusionSet) -> bool {
    entry.file_type().is_dir()
        && entry
            .path()
            .strip_prefix(src)
            .map(|rel| exclusions.prunes_dir(rel))
            .unwrap_or(false)
}

fn count_files(src: &Path, exclusions: &ExclusionSet) -> usize {
    WalkDir::new(src)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| !is_pruned(e, src, exclusions))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .strip_prefix(src)
                .map(|rel| !exclusions.is_excluded(rel))
                .unwrap_or(true)
        })
        .count()
}

fn count_excluded(src: &Path, exclusions: &ExclusionSet) -> usize {
    WalkDir::new(src)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .strip_prefix(src)
                .map(|rel| exclusions.is_excluded(rel))
                .unwrap_or(false)
        })
        .count()
}
