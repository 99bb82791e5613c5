//! Manifest types for the intermediate package directory.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use uncork_common::{Arch, Error, Result, USER_TOKEN};

/// Schema version written into every manifest.
pub const SCHEMA_VERSION: &str = "1";

/// File name of the manifest inside a staged directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// The manifest.json file - the contract between capture and packaging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Schema version for forward compatibility.
    pub schema_version: String,
    /// Application metadata.
    pub app: AppMetadata,
    /// Wine runtime configuration.
    pub runtime: RuntimeConfig,
    /// Facts about the prefix the package was captured from.
    pub prefix: PrefixFingerprint,
    /// Entry points, in declaration order.
    pub executables: Vec<ExecutableEntry>,
    /// Installation path templates.
    pub install: InstallConfig,
    /// Exclusion patterns that were applied during capture.
    pub excluded_patterns: Vec<String>,
}

impl Manifest {
    /// Resolved system installation path.
    pub fn system_path(&self) -> String {
        self.install.resolve_system_path(&self.app.name)
    }

    /// User data path template (environment variables left in place).
    pub fn user_data_path(&self) -> String {
        self.install.resolve_user_data_path(&self.app.name)
    }

    /// Command name a packager should expose for the executable at `index`.
    ///
    /// An explicit command wins; the first executable is named after the
    /// application and the others get `<app>-<id>`.
    pub fn command_name(&self, index: usize) -> Option<String> {
        let exe = self.executables.get(index)?;
        Some(match (&exe.command, index) {
            (Some(command), _) => command.clone(),
            (None, 0) => self.app.name.clone(),
            (None, _) => format!("{}-{}", self.app.name, exe.id),
        })
    }

    /// Write the manifest as pretty JSON.
    ///
    /// `path` may be a staged directory (the manifest lands in
    /// `manifest.json` inside it) or a file path.
    pub fn save(&self, path: &Path) -> Result<PathBuf> {
        let manifest_path = manifest_path(path);
        if let Some(parent) = manifest_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&manifest_path, json)?;
        debug!("Manifest written to {:?}", manifest_path);
        Ok(manifest_path)
    }

    /// Load and validate a manifest from a staged directory or file.
    pub fn load(path: &Path) -> Result<Self> {
        let manifest_path = manifest_path(path);
        if !manifest_path.exists() {
            return Err(Error::not_found("Manifest", manifest_path));
        }
        let content = fs::read_to_string(&manifest_path)?;
        let value: serde_json::Value = serde_json::from_str(&content)?;

        let report = crate::validation::validate_manifest(&value)?;
        if !report.valid {
            let messages: Vec<String> = report.errors.iter().map(|e| e.to_string()).collect();
            return Err(Error::InvalidManifest(messages.join("; ")));
        }

        let manifest: Manifest = serde_json::from_value(value)?;
        let report = crate::validation::check_invariants(&manifest);
        if !report.valid {
            let messages: Vec<String> = report.errors.iter().map(|e| e.to_string()).collect();
            return Err(Error::InvalidManifest(messages.join("; ")));
        }
        Ok(manifest)
    }
}

fn manifest_path(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(MANIFEST_FILE)
    } else {
        path.to_path_buf()
    }
}

/// Application metadata for the package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppMetadata {
    /// Package name (lowercase, no spaces).
    pub name: String,
    /// Human-readable application name.
    pub display_name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_description")]
    pub description: String,
    #[serde(default)]
    pub maintainer: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default = "default_license")]
    pub license: String,
}

impl AppMetadata {
    /// Metadata with the default version, description and license.
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            version: default_version(),
            description: default_description(),
            maintainer: None,
            homepage: None,
            license: default_license(),
        }
    }

    /// Metadata derived from a display name alone.
    pub fn from_display_name(display_name: &str) -> Self {
        Self::new(crate::slugify(display_name), display_name)
    }
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_description() -> String {
    "A Windows application packaged for Linux".to_string()
}

fn default_license() -> String {
    "Proprietary".to_string()
}

/// Wine runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum RuntimeConfig {
    /// Depend on a system-installed Wine.
    System {
        #[serde(default)]
        min_version: Option<String>,
    },
    /// Ship a Wine build inside the package.
    ///
    /// Before export `path` is the source location on the build machine;
    /// after export it is relative to the staged directory.
    Bundled { path: String },
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig::System { min_version: None }
    }
}

impl RuntimeConfig {
    /// Mode name as written in the manifest.
    pub fn mode(&self) -> &'static str {
        match self {
            RuntimeConfig::System { .. } => "system",
            RuntimeConfig::Bundled { .. } => "bundled",
        }
    }

    pub fn is_bundled(&self) -> bool {
        matches!(self, RuntimeConfig::Bundled { .. })
    }
}

/// Metadata about the original captured prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixFingerprint {
    /// Username found in the original prefix, if any.
    pub original_user: Option<String>,
    /// Absolute path of the prefix on the capture machine.
    pub original_path: String,
    /// Placeholder used in tokenized paths.
    #[serde(default = "default_normalized_user")]
    pub normalized_user: String,
    /// Wine version that created the prefix.
    #[serde(default)]
    pub original_wine_version: Option<String>,
    #[serde(default)]
    pub has_dxvk: bool,
    #[serde(default)]
    pub has_vkd3d: bool,
    #[serde(default)]
    pub arch: Arch,
}

fn default_normalized_user() -> String {
    USER_TOKEN.to_string()
}

/// An executable entry point in the package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutableEntry {
    /// Unique identifier, used in file names.
    pub id: String,
    /// Human-readable name for menus and launchers.
    pub name: String,
    /// Path relative to the prefix, e.g. `drive_c/Program Files/App/app.exe`.
    pub path: String,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: String,
    #[serde(default)]
    pub working_dir: Option<String>,
    /// Icon path inside the staged directory.
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// StartupWMClass override.
    #[serde(default)]
    pub wm_class: Option<String>,
    #[serde(default = "default_true")]
    pub create_desktop_entry: bool,
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
}

impl ExecutableEntry {
    /// Entry with default options for an executable at `path`.
    pub fn new(id: impl Into<String>, name: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        let working_dir = Path::new(&path)
            .parent()
            .map(|p| p.to_string_lossy().to_string());
        Self {
            id: id.into(),
            name: name.into(),
            path,
            command: None,
            args: String::new(),
            working_dir,
            icon: None,
            description: None,
            wm_class: None,
            create_desktop_entry: true,
            categories: default_categories(),
        }
    }

    /// Window class a desktop entry should use: the override, else the
    /// executable's file name.
    pub fn startup_wm_class(&self) -> String {
        if let Some(ref wm_class) = self.wm_class {
            return wm_class.clone();
        }
        Path::new(&self.path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.id.clone())
    }
}

fn default_true() -> bool {
    true
}

fn default_categories() -> Vec<String> {
    vec!["Application".to_string()]
}

/// Installation path configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallConfig {
    /// Where the package installs; `{name}` is replaced by the app name.
    pub system_path: String,
    /// Where per-user data lives; `{name}` is replaced by the app name.
    pub user_data_path: String,
    /// Use fuse-overlayfs instead of copying the prefix per user.
    #[serde(default)]
    pub use_overlay: bool,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            system_path: "/opt/{name}".to_string(),
            user_data_path: "${XDG_DATA_HOME}/{name}".to_string(),
            use_overlay: false,
        }
    }
}

impl InstallConfig {
    pub fn resolve_system_path(&self, app_name: &str) -> String {
        self.system_path.replace("{name}", app_name)
    }

    pub fn resolve_user_data_path(&self, app_name: &str) -> String {
        self.user_data_path.replace("{name}", app_name)
    }
}
