//! Capture configuration: the YAML capture file and command-line specs.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use uncork_manifest::{AppMetadata, InstallConfig, RuntimeConfig};

/// A capture described in YAML.
///
/// ```yaml
/// app:
///   name: mygame
///   display_name: My Game
/// executables:
///   - name: Game
///     path: drive_c/Games/game.exe
///     args: --fullscreen
/// runtime:
///   mode: system
///   min_version: "9.0"
/// exclude: ["*.bak"]
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureFile {
    pub app: Option<AppSection>,
    pub executables: Vec<ExecutableSpec>,
    pub runtime: Option<RuntimeConfig>,
    pub install: Option<InstallSection>,
    /// Patterns added to the default exclusions.
    pub exclude: Vec<String>,
    /// Patterns removed from the exclusions.
    pub include: Vec<String>,
    pub warmup: Option<bool>,
}

impl CaptureFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read capture file {:?}", path))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse capture file {:?}", path))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppSection {
    pub name: String,
    pub display_name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub maintainer: Option<String>,
    pub homepage: Option<String>,
    pub license: Option<String>,
}

impl AppSection {
    pub fn into_metadata(self) -> AppMetadata {
        let display_name = self.display_name.unwrap_or_else(|| self.name.clone());
        let mut app = AppMetadata::new(self.name, display_name);
        if let Some(version) = self.version {
            app.version = version;
        }
        if let Some(description) = self.description {
            app.description = description;
        }
        if let Some(license) = self.license {
            app.license = license;
        }
        app.maintainer = self.maintainer;
        app.homepage = self.homepage;
        app
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstallSection {
    pub system_path: Option<String>,
    pub user_data_path: Option<String>,
    pub use_overlay: Option<bool>,
}

impl InstallSection {
    pub fn apply(self, install: &mut InstallConfig) {
        if let Some(system_path) = self.system_path {
            install.system_path = system_path;
        }
        if let Some(user_data_path) = self.user_data_path {
            install.user_data_path = user_data_path;
        }
        if let Some(use_overlay) = self.use_overlay {
            install.use_overlay = use_overlay;
        }
    }
}

/// One executable, from the capture file or `--exe`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutableSpec {
    pub id: Option<String>,
    pub name: String,
    pub path: String,
    pub command: Option<String>,
    pub args: Option<String>,
    /// Custom icon file on disk.
    pub icon: Option<PathBuf>,
    /// Prefix-relative file to extract the icon from.
    pub icon_source: Option<String>,
    pub description: Option<String>,
    pub wm_class: Option<String>,
    pub desktop_entry: Option<bool>,
    pub categories: Vec<String>,
}

/// Parse `Name:path[:command]`.
pub fn parse_exe_spec(spec: &str) -> Result<ExecutableSpec> {
    let mut parts = spec.splitn(3, ':');
    let name = parts.next().unwrap_or_default().trim();
    let path = parts.next().map(str::trim).unwrap_or_default();
    if name.is_empty() || path.is_empty() {
        bail!(
            "Invalid executable format: {} (expected 'Display Name:path/to/file.exe[:command]')",
            spec
        );
    }
    let command = parts
        .next()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);

    Ok(ExecutableSpec {
        name: name.to_string(),
        path: path.to_string(),
        command,
        ..ExecutableSpec::default()
    })
}

/// Parse a `command:value` pair for the per-executable flags.
pub fn parse_keyed(spec: &str, flag: &str) -> Result<(String, String)> {
    match spec.split_once(':') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => bail!("Invalid {} format: {} (expected 'command:value')", flag, spec),
    }
}

/// Make a path given on the command line relative to the prefix root.
pub fn relative_to_prefix(path: &str, prefix: &Path) -> String {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        if let Ok(rel) = candidate.strip_prefix(prefix) {
            return rel.to_string_lossy().to_string();
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_exe_spec() {
        let spec = parse_exe_spec("My Game:drive_c/Games/game.exe").unwrap();
        assert_eq!(spec.name, "My Game");
        assert_eq!(spec.path, "drive_c/Games/game.exe");
        assert_eq!(spec.command, None);

        let spec = parse_exe_spec("Settings : drive_c/settings.exe : mygame-settings").unwrap();
        assert_eq!(spec.command.as_deref(), Some("mygame-settings"));

        assert!(parse_exe_spec("nopath").is_err());
        assert!(parse_exe_spec(":drive_c/x.exe").is_err());
    }

    #[test]
    fn test_parse_keyed() {
        assert_eq!(
            parse_keyed("mygame:--fullscreen --vsync", "--exe-args").unwrap(),
            ("mygame".to_string(), "--fullscreen --vsync".to_string())
        );
        assert_eq!(
            parse_keyed("mygame:Launch: now", "--exe-desc").unwrap().1,
            "Launch: now"
        );
        assert!(parse_keyed("no-separator", "--icon").is_err());
    }

    #[test]
    fn test_relative_to_prefix() {
        let prefix = Path::new("/home/alice/.wine");
        assert_eq!(
            relative_to_prefix("/home/alice/.wine/drive_c/app.exe", prefix),
            "drive_c/app.exe"
        );
        assert_eq!(relative_to_prefix("drive_c/app.exe", prefix), "drive_c/app.exe");
    }

    #[test]
    fn test_capture_file() {
        let yaml = r#"
app:
  name: mygame
  display_name: My Game
  version: 2.1.0
executables:
  - name: Game
    path: drive_c/Games/game.exe
    args: --fullscreen
  - name: Settings
    path: drive_c/Games/settings.exe
    command: mygame-settings
runtime:
  mode: bundled
  path: /opt/wine-9.0
install:
  use_overlay: true
exclude: ["*.bak"]
include: ["*.log"]
warmup: false
"#;
        let file: CaptureFile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(file.executables.len(), 2);
        assert_eq!(file.executables[0].args.as_deref(), Some("--fullscreen"));
        assert_eq!(
            file.runtime,
            Some(RuntimeConfig::Bundled {
                path: "/opt/wine-9.0".to_string()
            })
        );
        assert_eq!(file.warmup, Some(false));

        let app = file.app.unwrap().into_metadata();
        assert_eq!(app.display_name, "My Game");
        assert_eq!(app.version, "2.1.0");
        assert_eq!(app.license, "Proprietary");

        let mut install = InstallConfig::default();
        file.install.unwrap().apply(&mut install);
        assert!(install.use_overlay);
        assert_eq!(install.system_path, "/opt/{name}");
    }

    #[test]
    fn test_capture_file_rejects_unknown_keys() {
        assert!(serde_yaml::from_str::<CaptureFile>("executable: []\n").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CaptureFile::load(&dir.path().join("capture.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read capture file"));
    }
}
