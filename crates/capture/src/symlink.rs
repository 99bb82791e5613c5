//! Portability decisions for symlinks found in a prefix.

use std::path::{Component, Path, PathBuf};

/// Directory holding Wine's drive-letter links.
pub const DOSDEVICES_DIR: &str = "dosdevices";

/// What to do with a symlink when staging a prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymlinkAction {
    /// Recreate the link pointing at a new target.
    Rewrite(PathBuf),
    /// Leave the link out of the staged tree.
    Drop,
    /// Recreate the link with its original target.
    KeepAsIs,
}

impl SymlinkAction {
    /// Target to recreate, if any.
    pub fn target<'a>(&'a self, original: &'a Path) -> Option<&'a Path> {
        match self {
            SymlinkAction::Rewrite(target) => Some(target.as_path()),
            SymlinkAction::KeepAsIs => Some(original),
            SymlinkAction::Drop => None,
        }
    }
}

/// Classify a link by its prefix-relative path and its target.
///
/// Absolute targets are never kept: `c:` is rebased onto `drive_c`, `z:` is
/// left for the installer to recreate.
pub fn classify(link_rel: &Path, target: &Path) -> SymlinkAction {
    let in_dosdevices = link_rel
        .parent()
        .map(|p| {
            p.components()
                .any(|c| matches!(c, Component::Normal(n) if n == DOSDEVICES_DIR))
        })
        .unwrap_or(false);

    if in_dosdevices {
        let name = link_rel
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match name.as_str() {
            "c:" => return SymlinkAction::Rewrite(PathBuf::from("../drive_c")),
            "z:" => return SymlinkAction::Drop,
            _ => {}
        }
    }

    if target.is_absolute() {
        SymlinkAction::Drop
    } else {
        SymlinkAction::KeepAsIs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_drive_c_rewritten() {
        assert_eq!(
            classify(Path::new("dosdevices/c:"), Path::new("/home/alice/.wine/drive_c")),
            SymlinkAction::Rewrite(PathBuf::from("../drive_c"))
        );
        assert_eq!(
            classify(Path::new("dosdevices/c:"), Path::new("../drive_c")),
            SymlinkAction::Rewrite(PathBuf::from("../drive_c"))
        );
    }

    #[test]
    fn test_drive_z_dropped() {
        assert_eq!(
            classify(Path::new("dosdevices/z:"), Path::new("/")),
            SymlinkAction::Drop
        );
        assert_eq!(
            classify(Path::new("dosdevices/z:"), Path::new("relative")),
            SymlinkAction::Drop
        );
    }

    #[test]
    fn test_other_drives() {
        assert_eq!(
            classify(Path::new("dosdevices/d:"), Path::new("/media/cdrom")),
            SymlinkAction::Drop
        );
        assert_eq!(
            classify(Path::new("dosdevices/e:"), Path::new("../drive_e")),
            SymlinkAction::KeepAsIs
        );
        assert_eq!(
            classify(Path::new("dosdevices/com1"), Path::new("/dev/ttyS0")),
            SymlinkAction::Drop
        );
    }

    #[test]
    fn test_links_outside_dosdevices() {
        assert_eq!(
            classify(
                Path::new("drive_c/users/alice/Desktop"),
                Path::new("/home/alice/Desktop")
            ),
            SymlinkAction::Drop
        );
        assert_eq!(
            classify(Path::new("drive_c/Games/current"), Path::new("v1.2")),
            SymlinkAction::KeepAsIs
        );
        // Only the dosdevices directory gets drive-letter treatment.
        assert_eq!(
            classify(Path::new("drive_c/c:"), Path::new("../x")),
            SymlinkAction::KeepAsIs
        );
    }

    #[test]
    fn test_no_absolute_target_kept() {
        let cases = [
            ("dosdevices/c:", "/x"),
            ("dosdevices/z:", "/"),
            ("dosdevices/y:", "/home"),
            ("drive_c/a", "/b"),
        ];
        for (link, target) in cases {
            let target = Path::new(target);
            let action = classify(Path::new(link), target);
            if let Some(kept) = action.target(target) {
                assert!(kept.is_relative(), "{} kept absolute target", link);
            }
        }
    }
}
