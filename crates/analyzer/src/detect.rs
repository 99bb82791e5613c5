//! Detection of prefix properties: architecture, user, runtime version,
//! graphics translation layers and portability issues.

use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};
use uncork_common::Arch;
use uncork_registry::{read_text, RegistryDocument};

/// DLLs whose presence at a realistic size indicates DXVK.
pub const DXVK_DLLS: &[&str] = &["d3d9.dll", "d3d10core.dll", "d3d11.dll", "dxgi.dll"];

/// DLL whose presence at a realistic size indicates VKD3D-Proton.
pub const VKD3D_DLL: &str = "d3d12.dll";

/// Wine's own builtin stubs stay below this size.
pub const TRANSLATION_DLL_MIN_SIZE: u64 = 100_000;

/// Per-user shell folders that Wine links into the host home directory.
pub const SHELL_FOLDERS: &[&str] = &[
    "Desktop",
    "Documents",
    "Downloads",
    "Music",
    "Pictures",
    "Videos",
];

static WINE_VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""ProductName"="Wine (\d+\.\d+[^"]*)""#).unwrap());

/// `win64` if the prefix has a WoW64 system directory.
pub fn detect_arch(prefix: &Path) -> Arch {
    if prefix.join("drive_c/windows/syswow64").exists() {
        Arch::Win64
    } else {
        Arch::Win32
    }
}

/// The first user directory (by name) that is not a shared profile.
pub fn detect_user(prefix: &Path) -> Option<String> {
    let users_dir = prefix.join("drive_c/users");
    let entries = match fs::read_dir(&users_dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot list {:?}: {}", users_dir, e);
            return None;
        }
    };

    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();

    names.into_iter().find(|name| {
        let lower = name.to_lowercase();
        lower != "public" && lower != "default"
    })
}

/// Wine version recorded in `system.reg`, e.g. `9.0` or `8.21 (Staging)`.
pub fn detect_wine_version(prefix: &Path) -> Option<String> {
    let system_reg = prefix.join("system.reg");
    let decoded = match read_text(&system_reg) {
        Ok(decoded) => decoded,
        Err(e) => {
            debug!("{}", e);
            return None;
        }
    };
    WINE_VERSION_PATTERN
        .captures(&decoded.text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Graphics layer detection result: installed flag and version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerInfo {
    pub installed: bool,
    pub version: Option<String>,
}

pub fn detect_dxvk(prefix: &Path) -> LayerInfo {
    let system32 = prefix.join("drive_c/windows/system32");
    LayerInfo {
        installed: DXVK_DLLS.iter().any(|dll| is_translation_dll(&system32.join(dll))),
        version: None,
    }
}

pub fn detect_vkd3d(prefix: &Path) -> LayerInfo {
    let system32 = prefix.join("drive_c/windows/system32");
    LayerInfo {
        installed: is_translation_dll(&system32.join(VKD3D_DLL)),
        version: None,
    }
}

fn is_translation_dll(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| m.is_file() && m.len() > TRANSLATION_DLL_MIN_SIZE)
        .unwrap_or(false)
}

/// DLL overrides from `user.reg`; empty if the file is missing.
pub fn read_dll_overrides(prefix: &Path) -> BTreeMap<String, String> {
    let user_reg = prefix.join("user.reg");
    if !user_reg.exists() {
        return BTreeMap::new();
    }
    match RegistryDocument::from_path(&user_reg) {
        Ok(doc) => doc.dll_overrides(),
        Err(e) => {
            warn!("Cannot read DLL overrides: {}", e);
            BTreeMap::new()
        }
    }
}

/// Portability warnings: shell folders linking outside the prefix and a
/// `Z:` drive exposing the whole host filesystem.
pub fn check_issues(prefix: &Path, user: Option<&str>) -> Vec<String> {
    let mut warnings = Vec::new();

    if let Some(user) = user {
        let user_dir = prefix.join("drive_c/users").join(user);
        for folder in SHELL_FOLDERS {
            if let Ok(target) = fs::read_link(user_dir.join(folder)) {
                if target.is_absolute() {
                    warnings.push(format!(
                        "Shell folder '{}' links to absolute path: {}",
                        folder,
                        target.display()
                    ));
                }
            }
        }
    }

    let z_drive = prefix.join("dosdevices/z:");
    let is_link = fs::symlink_metadata(&z_drive)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false);
    if is_link && fs::canonicalize(&z_drive).is_ok_and(|target| target == Path::new("/")) {
        warnings.push("Z: drive exposes full filesystem - consider sandboxing".to_string());
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::os::unix::fs::symlink;

    #[test]
    fn test_detect_arch() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("drive_c/windows/system32")).unwrap();
        assert_eq!(detect_arch(dir.path()), Arch::Win32);
        fs::create_dir_all(dir.path().join("drive_c/windows/syswow64")).unwrap();
        assert_eq!(detect_arch(dir.path()), Arch::Win64);
    }

    #[test]
    fn test_detect_user_skips_shared_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let users = dir.path().join("drive_c/users");
        for name in ["Public", "bob", "alice", "default"] {
            fs::create_dir_all(users.join(name)).unwrap();
        }
        fs::write(users.join("aaa.txt"), "").unwrap();
        assert_eq!(detect_user(dir.path()), Some("alice".to_string()));
    }

    #[test]
    fn test_detect_user_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(detect_user(dir.path()), None);
        fs::create_dir_all(dir.path().join("drive_c/users/Public")).unwrap();
        assert_eq!(detect_user(dir.path()), None);
    }

    #[test]
    fn test_detect_wine_version() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("system.reg"),
            "[Software\\\\Microsoft\\\\Windows NT\\\\CurrentVersion]\n\"ProductName\"=\"Wine 8.21 (Staging)\"\n",
        )
        .unwrap();
        assert_eq!(
            detect_wine_version(dir.path()),
            Some("8.21 (Staging)".to_string())
        );
    }

    #[test]
    fn test_detect_wine_version_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(detect_wine_version(dir.path()), None);
        fs::write(
            dir.path().join("system.reg"),
            "\"ProductName\"=\"Microsoft Windows 10\"\n",
        )
        .unwrap();
        assert_eq!(detect_wine_version(dir.path()), None);
    }

    #[test]
    fn test_detect_graphics_layers() {
        let dir = tempfile::tempdir().unwrap();
        let system32 = dir.path().join("drive_c/windows/system32");
        fs::create_dir_all(&system32).unwrap();
        fs::write(system32.join("d3d11.dll"), vec![0u8; 2048]).unwrap();
        fs::write(system32.join("d3d12.dll"), vec![0u8; 2048]).unwrap();
        assert!(!detect_dxvk(dir.path()).installed);
        assert!(!detect_vkd3d(dir.path()).installed);

        fs::write(system32.join("dxgi.dll"), vec![0u8; 150_000]).unwrap();
        fs::write(system32.join("d3d12.dll"), vec![0u8; 150_000]).unwrap();
        let dxvk = detect_dxvk(dir.path());
        assert!(dxvk.installed);
        assert_eq!(dxvk.version, None);
        assert!(detect_vkd3d(dir.path()).installed);
    }

    #[test]
    fn test_check_issues() {
        let dir = tempfile::tempdir().unwrap();
        let user_dir = dir.path().join("drive_c/users/alice");
        fs::create_dir_all(&user_dir).unwrap();
        symlink("/home/alice/Desktop", user_dir.join("Desktop")).unwrap();
        symlink("../Public/Music", user_dir.join("Music")).unwrap();
        fs::create_dir_all(dir.path().join("dosdevices")).unwrap();
        symlink("/", dir.path().join("dosdevices/z:")).unwrap();

        let warnings = check_issues(dir.path(), Some("alice"));
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("'Desktop'"));
        assert!(warnings[1].contains("Z: drive"));
    }

    #[test]
    fn test_z_drive_warning_follows_resolution() {
        for (target, expected) in [("//", true), ("/.", true), ("/usr/..", true), ("/tmp", false)] {
            let dir = tempfile::tempdir().unwrap();
            fs::create_dir_all(dir.path().join("dosdevices")).unwrap();
            symlink(target, dir.path().join("dosdevices/z:")).unwrap();
            let warnings = check_issues(dir.path(), None);
            assert_eq!(
                warnings.iter().any(|w| w.contains("Z: drive")),
                expected,
                "z: -> {}",
                target
            );
        }
    }

    #[test]
    fn test_read_dll_overrides() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_dll_overrides(dir.path()).is_empty());
        fs::write(
            dir.path().join("user.reg"),
            "WINE REGISTRY Version 2\n\n[Software\\\\Wine\\\\DllOverrides] 1700000000\n\"*dxgi\"=\"native\"\n",
        )
        .unwrap();
        let overrides = read_dll_overrides(dir.path());
        assert_eq!(overrides.get("dxgi").map(String::as_str), Some("native"));
    }
}
