//! Pre-export runtime warm-up.
//!
//! Running `wineboot -u` before the copy brings the prefix up to date with
//! the runtime, so the first launch after install does not rewrite it.

use crate::process::{ToolCommand, ToolOutcome};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Display variables removed so `wineboot` cannot open windows.
const DISPLAY_VARS: &[&str] = &["DISPLAY", "WAYLAND_DISPLAY", "XDG_RUNTIME_DIR", "WAYLAND_SOCKET"];

/// Programs and timeouts used by the warm-up.
#[derive(Debug, Clone)]
pub struct WarmupConfig {
    pub wineserver: String,
    pub wineboot: String,
    pub kill_timeout: Duration,
    pub boot_timeout: Duration,
    pub wait_timeout: Duration,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            wineserver: "wineserver".to_string(),
            wineboot: "wineboot".to_string(),
            kill_timeout: Duration::from_secs(5),
            boot_timeout: Duration::from_secs(60),
            wait_timeout: Duration::from_secs(30),
        }
    }
}

/// Outcome of each warm-up step, in order.
#[derive(Debug, Clone, Default)]
pub struct WarmupReport {
    pub steps: Vec<(String, ToolOutcome)>,
}

impl WarmupReport {
    /// Whether `wineboot -u` itself succeeded.
    pub fn updated(&self) -> bool {
        self.steps
            .iter()
            .any(|(step, outcome)| step.starts_with("wineboot") && outcome.is_success())
    }
}

/// Runs the warm-up against one prefix.
pub struct Warmup {
    prefix: PathBuf,
    bin_dir: Option<PathBuf>,
    config: WarmupConfig,
}

impl Warmup {
    /// `runtime` is a bundled Wine tree; its `bin/` is searched before `PATH`.
    pub fn new(prefix: &Path, runtime: Option<&Path>, config: WarmupConfig) -> Self {
        Self {
            prefix: prefix.to_path_buf(),
            bin_dir: runtime.map(|r| r.join("bin")),
            config,
        }
    }

    /// Kill any running wineserver, update the prefix, then wait for the
    /// server to exit. Never fails; problems are logged.
    pub fn run(&self) -> WarmupReport {
        let mut report = WarmupReport::default();
        let cfg = &self.config;

        let kill = self
            .command(&cfg.wineserver, cfg.kill_timeout)
            .arg("-k");
        self.step(&mut report, "wineserver -k", &kill);

        let boot = self.command(&cfg.wineboot, cfg.boot_timeout).arg("-u");
        self.step(&mut report, "wineboot -u", &boot);

        let wait = self
            .command(&cfg.wineserver, cfg.wait_timeout)
            .arg("-w");
        self.step(&mut report, "wineserver -w", &wait);

        if !report.updated() {
            warn!("Prefix was not updated; it may be rewritten on first launch");
        }
        report
    }

    fn command(&self, program: &str, timeout: Duration) -> ToolCommand {
        let mut command = ToolCommand::new(program, timeout)
            .env("WINEPREFIX", self.prefix.to_string_lossy())
            .env("WINEDEBUG", "-all");
        for var in DISPLAY_VARS {
            command = command.env_remove(*var);
        }
        command.env("DISPLAY", "").env("WAYLAND_DISPLAY", "")
    }

    fn step(&self, report: &mut WarmupReport, name: &str, command: &ToolCommand) {
        let outcome = command.run(self.bin_dir.as_deref());
        match outcome {
            ToolOutcome::Completed => info!("{}: completed", name),
            ToolOutcome::Missing => warn!("{}: {} not found", name, command.program),
            ref other => warn!("{}: {}", name, other),
        }
        report.steps.push((name.to_string(), outcome));
    }
}
