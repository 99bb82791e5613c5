//! Icon extraction from Windows executables.

use crate::process::ToolCommand;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use uncork_common::{Error, Result};

/// Windows resource type of icon groups.
const RT_GROUP_ICON: &str = "14";

/// Produces a PNG icon for an executable.
pub trait IconExtractor {
    /// Write the main icon of `source` to `dest` as PNG.
    fn extract(&self, source: &Path, dest: &Path) -> Result<()>;

    /// Name used in log messages.
    fn name(&self) -> &str;
}

/// Extractor for environments without any icon tooling.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIconExtractor;

impl IconExtractor for NoIconExtractor {
    fn extract(&self, source: &Path, _dest: &Path) -> Result<()> {
        Err(Error::Tool {
            tool: self.name().to_string(),
            reason: format!("no icon extractor available for {}", source.display()),
        })
    }

    fn name(&self) -> &str {
        "none"
    }
}

/// Extracts icons with `wrestool` and `icotool` from icoutils.
#[derive(Debug, Clone)]
pub struct IcoutilsExtractor {
    pub wrestool: String,
    pub icotool: String,
    pub timeout: Duration,
}

impl Default for IcoutilsExtractor {
    fn default() -> Self {
        Self {
            wrestool: "wrestool".to_string(),
            icotool: "icotool".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl IconExtractor for IcoutilsExtractor {
    fn extract(&self, source: &Path, dest: &Path) -> Result<()> {
        let work_dir = scratch_dir(dest);
        fs::create_dir_all(&work_dir)?;
        let result = self.extract_in(source, dest, &work_dir);
        if let Err(e) = fs::remove_dir_all(&work_dir) {
            debug!("Cannot remove {:?}: {}", work_dir, e);
        }
        result
    }

    fn name(&self) -> &str {
        "icoutils"
    }
}

impl IcoutilsExtractor {
    fn extract_in(&self, source: &Path, dest: &Path, work_dir: &Path) -> Result<()> {
        ToolCommand::new(&self.wrestool, self.timeout)
            .arg("-x")
            .arg("-t")
            .arg(RT_GROUP_ICON)
            .arg("-o")
            .arg(work_dir.to_string_lossy())
            .arg(source.to_string_lossy())
            .run(None)
            .into_result(&self.wrestool)?;

        let ico = first_ico(work_dir)?.ok_or_else(|| Error::Tool {
            tool: self.wrestool.clone(),
            reason: format!("no icon resource in {}", source.display()),
        })?;

        ToolCommand::new(&self.icotool, self.timeout)
            .arg("-x")
            .arg("-i")
            .arg("1")
            .arg("-o")
            .arg(dest.to_string_lossy())
            .arg(ico.to_string_lossy())
            .run(None)
            .into_result(&self.icotool)?;

        if !dest.is_file() {
            return Err(Error::Tool {
                tool: self.icotool.clone(),
                reason: format!("no PNG written to {}", dest.display()),
            });
        }
        Ok(())
    }
}

fn scratch_dir(dest: &Path) -> PathBuf {
    let stem = dest
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    dest.with_file_name(format!(".{}-ico", stem))
}

fn first_ico(dir: &Path) -> Result<Option<PathBuf>> {
    let mut icons: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .map(|ext| ext.eq_ignore_ascii_case("ico"))
                .unwrap_or(false)
        })
        .collect();
    icons.sort();
    Ok(icons.into_iter().next())
}
