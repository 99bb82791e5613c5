//! Human-readable output for the CLI.

use uncork_analyzer::PrefixReport;
use uncork_manifest::{Manifest, RuntimeConfig};

const MAX_LISTED_EXECUTABLES: usize = 15;

/// Format a byte count as `12.3 MB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

pub fn print_report(report: &PrefixReport) {
    println!("=== Prefix Analysis: {} ===\n", report.prefix_path.display());

    println!("  Valid prefix:   {}", yes_no(report.is_valid_prefix));
    println!("  Architecture:   {}", report.arch);
    println!(
        "  Wine version:   {}",
        report.wine_version.as_deref().unwrap_or("unknown")
    );
    println!(
        "  Detected user:  {}",
        report.detected_user.as_deref().unwrap_or("none")
    );
    println!("  Total size:     {}", format_size(report.total_size));
    println!("  drive_c size:   {}", format_size(report.drive_c_size));

    let dxvk = match (report.has_dxvk, &report.dxvk_version) {
        (true, Some(version)) => format!("yes ({})", version),
        (has, _) => yes_no(has).to_string(),
    };
    let vkd3d = match (report.has_vkd3d, &report.vkd3d_version) {
        (true, Some(version)) => format!("yes ({})", version),
        (has, _) => yes_no(has).to_string(),
    };
    println!("  DXVK:           {}", dxvk);
    println!("  VKD3D:          {}", vkd3d);

    if !report.dll_overrides.is_empty() {
        println!("\nDLL overrides:");
        for (dll, mode) in &report.dll_overrides {
            println!("  {:<24} {}", dll, mode);
        }
    }

    if report.executables.is_empty() {
        println!("\nNo executables found.");
    } else {
        println!("\nExecutables ({}):", report.executables.len());
        println!("{:-<80}", "");
        for exe in report.executables.iter().take(MAX_LISTED_EXECUTABLES) {
            let marker = if exe.probable_app { "*" } else { " " };
            println!(
                "{} {:>10}  {}",
                marker,
                format_size(exe.size),
                exe.path
            );
        }
        if report.executables.len() > MAX_LISTED_EXECUTABLES {
            println!(
                "  ... and {} more",
                report.executables.len() - MAX_LISTED_EXECUTABLES
            );
        }
        println!("{:-<80}", "");
        println!("  * probable application");
    }

    if !report.warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &report.warnings {
            println!("  - {}", warning);
        }
    }
}

pub fn print_manifest(manifest: &Manifest) {
    let app = &manifest.app;
    println!("=== {} {} ===\n", app.display_name, app.version);
    println!("  Package:      {}", app.name);
    println!("  Description:  {}", app.description);
    println!("  License:      {}", app.license);
    if let Some(ref maintainer) = app.maintainer {
        println!("  Maintainer:   {}", maintainer);
    }
    if let Some(ref homepage) = app.homepage {
        println!("  Homepage:     {}", homepage);
    }

    let runtime = match &manifest.runtime {
        RuntimeConfig::System { min_version: Some(v) } => format!("system (wine >= {})", v),
        RuntimeConfig::System { min_version: None } => "system".to_string(),
        RuntimeConfig::Bundled { path } => format!("bundled ({})", path),
    };
    println!("  Runtime:      {}", runtime);
    println!("  Architecture: {}", manifest.prefix.arch);

    println!("\nExecutables:");
    for (index, exe) in manifest.executables.iter().enumerate() {
        let command = manifest.command_name(index).unwrap_or_default();
        println!("  {} -> {}", command, exe.path);
        println!("      name: {}", exe.name);
        if !exe.args.is_empty() {
            println!("      args: {}", exe.args);
        }
        if let Some(ref icon) = exe.icon {
            println!("      icon: {}", icon);
        }
    }

    println!("\nInstall:");
    println!("  System path:  {}", manifest.system_path());
    println!("  User data:    {}", manifest.user_data_path());
    println!("  Overlay:      {}", yes_no(manifest.install.use_overlay));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0.0 B");
        assert_eq!(format_size(512), "512.0 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
        assert_eq!(format_size(2048 * 1024 * 1024 * 1024 * 1024), "2048.0 TB");
    }
}
