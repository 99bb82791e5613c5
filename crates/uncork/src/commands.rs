//! Subcommand implementations.

use crate::config::{self, CaptureFile, ExecutableSpec};
use crate::output;
use crate::{CaptureArgs, OutputFormat, WineMode};
use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uncork_capture::ids::IdAllocator;
use uncork_capture::{ExecutableInput, ExportStage, PrefixCapture};
use uncork_manifest::{slugify, AppMetadata, InstallConfig, Manifest, RuntimeConfig};

const DEFAULT_MIN_WINE_VERSION: &str = "9.0";

pub fn analyze(prefix: &Path, format: OutputFormat) -> Result<()> {
    if !prefix.exists() {
        bail!("Prefix not found: {:?}", prefix);
    }

    info!("Analyzing prefix {:?}", prefix);
    let report = uncork_analyzer::analyze(prefix);

    match format {
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Text => output::print_report(&report),
    }
    Ok(())
}

pub fn info(dir: &Path) -> Result<()> {
    let manifest =
        Manifest::load(dir).with_context(|| format!("Failed to load package {:?}", dir))?;
    output::print_manifest(&manifest);
    Ok(())
}

pub fn capture(args: &CaptureArgs) -> Result<()> {
    let mut file = match args.config {
        Some(ref path) => CaptureFile::load(path)?,
        None => CaptureFile::default(),
    };

    let mut specs = std::mem::take(&mut file.executables);
    for spec in &args.exe {
        specs.push(config::parse_exe_spec(spec)?);
    }
    let Some(first) = specs.first() else {
        bail!(
            "At least one executable required. Use --exe 'Name:path[:command]', e.g.\n  \
             uncork capture ~/.wine -o ./output --exe 'My Game:drive_c/Games/game.exe'"
        );
    };

    let app = resolve_app(file.app.take(), args, &first.name);
    let runtime = resolve_runtime(file.runtime.take(), args)?;
    let overrides = Overrides::from_args(args)?;

    let mut capture = PrefixCapture::new(&args.prefix)
        .with_context(|| format!("Failed to open prefix {:?}", args.prefix))?;

    let prefixes = [capture.prefix_path().to_path_buf(), args.prefix.clone()];
    for input in plan_executables(specs, &app.name, &overrides, &prefixes)? {
        capture.add_executable(input)?;
    }

    capture.set_app_metadata(app);
    capture.set_runtime_mode(runtime)?;

    let mut install = InstallConfig::default();
    if let Some(section) = file.install.take() {
        section.apply(&mut install);
    }
    if args.overlay {
        install.use_overlay = true;
    }
    capture.set_install_config(install);

    for pattern in file.exclude.iter().chain(&args.exclude) {
        capture
            .add_exclusion(pattern)
            .with_context(|| format!("Invalid exclusion pattern {:?}", pattern))?;
    }
    for pattern in file.include.iter().chain(&args.include) {
        if !capture.remove_exclusion(pattern) {
            warn!("Pattern {} is not in the exclusion list", pattern);
        }
    }

    capture.set_warmup(file.warmup.unwrap_or(true) && !args.no_wineboot_update);

    let mut current: Option<ExportStage> = None;
    let manifest = capture
        .export_with_progress(&args.output, |stage, percent| {
            if current != Some(stage) {
                info!("[{:>3.0}%] {}", percent, stage);
                current = Some(stage);
            } else {
                debug!("[{:>3.0}%] {}", percent, stage);
            }
        })
        .with_context(|| format!("Failed to capture prefix into {:?}", args.output))?;

    println!();
    println!("Prefix captured to: {}", args.output.display());
    println!("Commands:");
    for (index, exe) in manifest.executables.iter().enumerate() {
        println!(
            "  {} -> {}",
            manifest.command_name(index).unwrap_or_default(),
            exe.path
        );
    }
    println!();
    println!("Inspect the package with:");
    println!("  uncork info {}", args.output.display());
    Ok(())
}

/// Application metadata: the capture file first, then the command line.
///
/// Without either, the name is derived from the first executable.
fn resolve_app(section: Option<config::AppSection>, args: &CaptureArgs, first: &str) -> AppMetadata {
    let mut app = match section {
        Some(section) => section.into_metadata(),
        None => AppMetadata::from_display_name(first),
    };
    if let Some(ref name) = args.app_name {
        let slug = slugify(name);
        app.name = if slug.is_empty() { name.clone() } else { slug };
        app.display_name = name.clone();
    }
    if let Some(ref version) = args.pkg_version {
        app.version = version.clone();
    }
    if app.name.is_empty() {
        app.name = "app".to_string();
    }
    app
}

fn resolve_runtime(from_file: Option<RuntimeConfig>, args: &CaptureArgs) -> Result<RuntimeConfig> {
    let min_version = || {
        args.min_wine_version
            .clone()
            .unwrap_or_else(|| DEFAULT_MIN_WINE_VERSION.to_string())
    };

    Ok(match (args.wine_mode, from_file) {
        (Some(WineMode::Bundled), _) => {
            let Some(ref path) = args.wine_path else {
                bail!("--wine-path required for bundled mode");
            };
            RuntimeConfig::Bundled {
                path: path.to_string_lossy().to_string(),
            }
        }
        (Some(WineMode::System), _) | (None, None) => RuntimeConfig::System {
            min_version: Some(min_version()),
        },
        (None, Some(RuntimeConfig::System { min_version: from_file })) => RuntimeConfig::System {
            min_version: args.min_wine_version.clone().or(from_file),
        },
        (None, Some(bundled)) => bundled,
    })
}

/// Per-executable values given as `command:value` on the command line.
#[derive(Debug, Default)]
struct Overrides {
    icons: HashMap<String, PathBuf>,
    descriptions: HashMap<String, String>,
    args: HashMap<String, String>,
    wm_classes: HashMap<String, String>,
}

impl Overrides {
    fn from_args(args: &CaptureArgs) -> Result<Self> {
        let mut overrides = Self::default();
        for spec in &args.icon {
            let (command, path) = config::parse_keyed(spec, "icon")?;
            overrides.icons.insert(command, PathBuf::from(path));
        }
        for spec in &args.exe_desc {
            let (command, value) = config::parse_keyed(spec, "exe-desc")?;
            overrides.descriptions.insert(command, value);
        }
        for spec in &args.exe_args {
            let (command, value) = config::parse_keyed(spec, "exe-args")?;
            overrides.args.insert(command, value);
        }
        for spec in &args.exe_wmclass {
            let (command, value) = config::parse_keyed(spec, "exe-wmclass")?;
            overrides.wm_classes.insert(command, value);
        }
        Ok(overrides)
    }
}

/// Turn specs into capture inputs with final ids.
///
/// Ids are assigned here so the keyed overrides can be looked up by the
/// command name each executable will end up with.
fn plan_executables(
    specs: Vec<ExecutableSpec>,
    app_name: &str,
    overrides: &Overrides,
    prefixes: &[PathBuf],
) -> Result<Vec<ExecutableInput>> {
    let mut ids = IdAllocator::new();
    let mut inputs = Vec::with_capacity(specs.len());

    for (index, spec) in specs.into_iter().enumerate() {
        let id = match spec.id {
            Some(id) => {
                if !ids.reserve(&id) {
                    bail!("Duplicate executable id: {}", id);
                }
                id
            }
            None => ids.allocate(&spec.name),
        };

        let command = match (&spec.command, index) {
            (Some(command), _) => command.clone(),
            (None, 0) => app_name.to_string(),
            (None, _) => format!("{}-{}", app_name, id),
        };

        let path = prefixes
            .iter()
            .map(|prefix| config::relative_to_prefix(&spec.path, prefix))
            .find(|rel| !Path::new(rel).is_absolute())
            .unwrap_or(spec.path);

        let mut input = ExecutableInput::new(spec.name, path).with_id(id);
        if let Some(explicit) = spec.command {
            input = input.with_command(explicit);
        }
        if let Some(args) = overrides.args.get(&command).cloned().or(spec.args) {
            input = input.with_args(args);
        }
        if let Some(icon) = overrides.icons.get(&command).cloned().or(spec.icon) {
            input = input.with_custom_icon(icon);
        }
        if let Some(source) = spec.icon_source {
            input = input.with_icon_source(source);
        }
        if let Some(description) = overrides.descriptions.get(&command).cloned().or(spec.description) {
            input = input.with_description(description);
        }
        if let Some(wm_class) = overrides.wm_classes.get(&command).cloned().or(spec.wm_class) {
            input = input.with_wm_class(wm_class);
        }
        if let Some(desktop_entry) = spec.desktop_entry {
            input.create_desktop_entry = desktop_entry;
        }
        input.categories = spec.categories;

        debug!("Planned executable {} as command {}", input.name, command);
        inputs.push(input);
    }

    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args() -> CaptureArgs {
        CaptureArgs {
            prefix: PathBuf::from("/home/alice/.wine"),
            output: PathBuf::from("/tmp/out"),
            ..CaptureArgs::default()
        }
    }

    fn spec(name: &str, path: &str, command: Option<&str>) -> ExecutableSpec {
        ExecutableSpec {
            name: name.to_string(),
            path: path.to_string(),
            command: command.map(str::to_string),
            ..ExecutableSpec::default()
        }
    }

    #[test]
    fn test_overrides_follow_command_names() {
        let mut cli = args();
        cli.exe_args = vec![
            "mygame:--fullscreen".to_string(),
            "mygame-settings:--safe".to_string(),
        ];
        cli.exe_desc = vec!["mygame-tool:Level editor".to_string()];
        cli.exe_wmclass = vec!["mygame:game.exe".to_string()];
        let overrides = Overrides::from_args(&cli).unwrap();

        let specs = vec![
            spec("Game", "drive_c/game.exe", None),
            spec("Settings", "drive_c/settings.exe", Some("mygame-settings")),
            spec("Tool", "drive_c/tool.exe", None),
        ];
        let prefixes = [cli.prefix.clone()];
        let inputs = plan_executables(specs, "mygame", &overrides, &prefixes).unwrap();

        assert_eq!(inputs[0].id.as_deref(), Some("game"));
        assert_eq!(inputs[0].args, "--fullscreen");
        assert_eq!(inputs[0].wm_class.as_deref(), Some("game.exe"));
        assert_eq!(inputs[1].args, "--safe");
        assert_eq!(inputs[1].command.as_deref(), Some("mygame-settings"));
        assert_eq!(inputs[2].description.as_deref(), Some("Level editor"));
        assert_eq!(inputs[2].args, "");
    }

    #[test]
    fn test_duplicate_names_get_suffixes() {
        let specs = vec![
            spec("Game", "drive_c/a.exe", None),
            spec("Game", "drive_c/b.exe", None),
        ];
        let prefixes = [PathBuf::from("/p")];
        let inputs =
            plan_executables(specs, "game", &Overrides::default(), &prefixes).unwrap();
        assert_eq!(inputs[0].id.as_deref(), Some("game"));
        assert_eq!(inputs[1].id.as_deref(), Some("game-1"));
    }

    #[test]
    fn test_duplicate_explicit_id_rejected() {
        let mut first = spec("Game", "drive_c/a.exe", None);
        first.id = Some("main".to_string());
        let mut second = spec("Other", "drive_c/b.exe", None);
        second.id = Some("main".to_string());
        let prefixes = [PathBuf::from("/p")];
        assert!(plan_executables(vec![first, second], "game", &Overrides::default(), &prefixes)
            .is_err());
    }

    #[test]
    fn test_absolute_paths_made_relative() {
        let specs = vec![spec("Game", "/home/alice/.wine/drive_c/game.exe", None)];
        let prefixes = [PathBuf::from("/home/alice/.wine")];
        let inputs =
            plan_executables(specs, "game", &Overrides::default(), &prefixes).unwrap();
        assert_eq!(inputs[0].path, "drive_c/game.exe");
    }

    #[test]
    fn test_resolve_app() {
        let app = resolve_app(None, &args(), "My Game");
        assert_eq!(app.name, "my-game");
        assert_eq!(app.display_name, "My Game");

        let mut cli = args();
        cli.app_name = Some("Cool Game".to_string());
        cli.pkg_version = Some("2.0".to_string());
        let app = resolve_app(None, &cli, "Launcher");
        assert_eq!(app.name, "cool-game");
        assert_eq!(app.display_name, "Cool Game");
        assert_eq!(app.version, "2.0");

        assert_eq!(resolve_app(None, &args(), "!!!").name, "app");
    }

    #[test]
    fn test_resolve_runtime() {
        assert_eq!(
            resolve_runtime(None, &args()).unwrap(),
            RuntimeConfig::System {
                min_version: Some("9.0".to_string())
            }
        );

        let mut cli = args();
        cli.wine_mode = Some(WineMode::Bundled);
        assert!(resolve_runtime(None, &cli).is_err());

        cli.wine_path = Some(PathBuf::from("/opt/wine"));
        assert_eq!(
            resolve_runtime(None, &cli).unwrap(),
            RuntimeConfig::Bundled {
                path: "/opt/wine".to_string()
            }
        );

        let from_file = RuntimeConfig::System {
            min_version: Some("8.0".to_string()),
        };
        assert_eq!(resolve_runtime(Some(from_file.clone()), &args()).unwrap(), from_file);
    }
}
