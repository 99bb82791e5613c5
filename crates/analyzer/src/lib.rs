//! Read-only analysis of Wine prefixes.
//!
//! The analyzer never fails: missing or unreadable parts of a prefix show up
//! as empty fields and warnings in the [`PrefixReport`].

pub mod detect;
pub mod discovery;
pub mod report;

pub use report::{ExecutableCandidate, PrefixReport};

use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Analyzer bound to one prefix path.
pub struct PrefixAnalyzer {
    prefix_path: PathBuf,
}

impl PrefixAnalyzer {
    /// The path is canonicalized when possible; a missing path is kept as is
    /// so the report can say so.
    pub fn new(prefix_path: impl AsRef<Path>) -> Self {
        let path = prefix_path.as_ref();
        let prefix_path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Self { prefix_path }
    }

    pub fn prefix_path(&self) -> &Path {
        &self.prefix_path
    }

    /// Scan the prefix. Never mutates it.
    pub fn analyze(&self) -> PrefixReport {
        let prefix = self.prefix_path.as_path();
        let mut report = PrefixReport::empty(prefix);

        if !prefix.exists() {
            report
                .warnings
                .push(format!("Prefix path does not exist: {}", prefix.display()));
            return report;
        }
        report.exists = true;

        let drive_c = prefix.join("drive_c");
        report.has_system_reg = prefix.join("system.reg").is_file();
        report.has_user_reg = prefix.join("user.reg").is_file();
        report.is_valid_prefix = drive_c.is_dir() && report.has_system_reg;

        if !report.is_valid_prefix {
            report.warnings.push(
                "Missing drive_c or system.reg - may not be a valid Wine prefix".to_string(),
            );
            return report;
        }

        info!("Analyzing prefix {:?}", prefix);

        report.arch = detect::detect_arch(prefix);
        report.detected_user = detect::detect_user(prefix);

        report.total_size = discovery::dir_size(prefix);
        report.drive_c_size = discovery::dir_size(&drive_c);

        report.wine_version = detect::detect_wine_version(prefix);

        let dxvk = detect::detect_dxvk(prefix);
        report.has_dxvk = dxvk.installed;
        report.dxvk_version = dxvk.version;

        let vkd3d = detect::detect_vkd3d(prefix);
        report.has_vkd3d = vkd3d.installed;
        report.vkd3d_version = vkd3d.version;

        report.executables = discovery::find_executables(prefix, &drive_c);
        report.dll_overrides = detect::read_dll_overrides(prefix);

        report
            .warnings
            .extend(detect::check_issues(prefix, report.detected_user.as_deref()));

        debug!(
            "arch={} user={:?} wine={:?} executables={}",
            report.arch,
            report.detected_user,
            report.wine_version,
            report.executables.len()
        );

        report
    }
}

/// Analyze the prefix at `prefix_path`.
pub fn analyze(prefix_path: impl AsRef<Path>) -> PrefixReport {
    PrefixAnalyzer::new(prefix_path).analyze()
}
