//! Analysis report types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use uncork_common::Arch;

/// An executable found under `drive_c`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutableCandidate {
    /// Path relative to the prefix root, `/`-separated.
    pub path: String,
    /// File name without the `.exe` extension.
    pub name: String,
    /// Size in bytes (0 if it could not be read).
    pub size: u64,
    /// Large enough to likely be the main application.
    pub probable_app: bool,
}

/// Everything the analyzer learned about a prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefixReport {
    pub prefix_path: PathBuf,
    pub exists: bool,
    pub is_valid_prefix: bool,

    pub arch: Arch,
    pub has_system_reg: bool,
    pub has_user_reg: bool,

    pub total_size: u64,
    pub drive_c_size: u64,

    pub wine_version: Option<String>,

    pub has_dxvk: bool,
    pub dxvk_version: Option<String>,
    pub has_vkd3d: bool,
    pub vkd3d_version: Option<String>,

    pub detected_user: Option<String>,

    pub executables: Vec<ExecutableCandidate>,
    #[serde(default)]
    pub dll_overrides: BTreeMap<String, String>,

    pub warnings: Vec<String>,
}

impl PrefixReport {
    /// An empty report for `prefix_path`; every flag false, every list empty.
    pub fn empty(prefix_path: impl Into<PathBuf>) -> Self {
        Self {
            prefix_path: prefix_path.into(),
            exists: false,
            is_valid_prefix: false,
            arch: Arch::default(),
            has_system_reg: false,
            has_user_reg: false,
            total_size: 0,
            drive_c_size: 0,
            wine_version: None,
            has_dxvk: false,
            dxvk_version: None,
            has_vkd3d: false,
            vkd3d_version: None,
            detected_user: None,
            executables: Vec::new(),
            dll_overrides: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    /// Candidates flagged as probable main applications.
    pub fn probable_apps(&self) -> impl Iterator<Item = &ExecutableCandidate> {
        self.executables.iter().filter(|e| e.probable_app)
    }

    pub fn to_json(&self) -> uncork_common::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report_serializes() {
        let report = PrefixReport::empty("/tmp/missing");
        let json = report.to_json().unwrap();
        assert!(json.contains("\"is_valid_prefix\": false"));
        assert!(json.contains("\"arch\": \"win64\""));

        let back: PrefixReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.prefix_path, PathBuf::from("/tmp/missing"));
        assert!(back.executables.is_empty());
    }

    #[test]
    fn test_probable_apps() {
        let mut report = PrefixReport::empty("/p");
        report.executables = vec![
            ExecutableCandidate {
                path: "drive_c/Games/game.exe".to_string(),
                name: "game".to_string(),
                size: 2_000_000,
                probable_app: true,
            },
            ExecutableCandidate {
                path: "drive_c/Games/tool.exe".to_string(),
                name: "tool".to_string(),
                size: 10_000,
                probable_app: false,
            },
        ];
        let names: Vec<_> = report.probable_apps().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["game"]);
    }
}
