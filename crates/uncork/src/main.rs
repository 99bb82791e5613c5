//! Uncork - Turn Wine prefixes into portable, packageable captures.

mod commands;
mod config;
mod output;

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "uncork")]
#[command(
    author,
    version,
    about = "Capture a Wine prefix into a portable intermediate package"
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a Wine prefix and show its contents
    Analyze {
        /// Path to the Wine prefix
        prefix: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Capture and normalize a Wine prefix
    Capture(CaptureArgs),

    /// Show information about a captured package
    Info {
        /// Directory produced by `uncork capture`
        dir: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum WineMode {
    System,
    Bundled,
}

#[derive(Args, Debug, Default)]
pub struct CaptureArgs {
    /// Path to the Wine prefix
    pub prefix: PathBuf,

    /// Output directory for the intermediate package
    #[arg(short, long)]
    pub output: PathBuf,

    /// Executable: 'Name:path[:command]' (repeatable)
    #[arg(short, long = "exe")]
    pub exe: Vec<String>,

    /// Custom icon: 'command:path/to/icon.png' (repeatable)
    #[arg(short, long)]
    pub icon: Vec<String>,

    /// Per-executable description: 'command:description' (repeatable)
    #[arg(long)]
    pub exe_desc: Vec<String>,

    /// Per-executable arguments: 'command:args' (repeatable)
    #[arg(long, allow_hyphen_values = true)]
    pub exe_args: Vec<String>,

    /// Override StartupWMClass: 'command:wmclass' (repeatable)
    #[arg(long)]
    pub exe_wmclass: Vec<String>,

    /// Application/package name (default: derived from the first executable)
    #[arg(long)]
    pub app_name: Option<String>,

    /// Package version
    #[arg(long = "version")]
    pub pkg_version: Option<String>,

    /// Wine runtime mode
    #[arg(long, value_enum)]
    pub wine_mode: Option<WineMode>,

    /// Path to a Wine installation (bundled mode)
    #[arg(long)]
    pub wine_path: Option<PathBuf>,

    /// Minimum Wine version (system mode)
    #[arg(long)]
    pub min_wine_version: Option<String>,

    /// Use fuse-overlayfs instead of copying the prefix per user
    #[arg(long)]
    pub overlay: bool,

    /// Skip running wineboot -u before capture
    #[arg(long)]
    pub no_wineboot_update: bool,

    /// Additional exclusion pattern (repeatable)
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Remove an exclusion pattern, including a default one (repeatable)
    #[arg(long)]
    pub include: Vec<String>,

    /// YAML capture file; command-line flags override it
    #[arg(long)]
    pub config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    match cli.command {
        Commands::Analyze { prefix, format } => commands::analyze(&prefix, format),
        Commands::Capture(args) => commands::capture(&args),
        Commands::Info { dir } => commands::info(&dir),
    }
}
