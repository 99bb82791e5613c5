//! Prefix capture: configuration, normalization and export.

use crate::copy::{copy_prefix, copy_tree};
use crate::exclusion::ExclusionSet;
use crate::icons::{IconExtractor, IcoutilsExtractor};
use crate::ids::IdAllocator;
use crate::warmup::{Warmup, WarmupConfig, WarmupReport};
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use uncork_analyzer::{PrefixAnalyzer, PrefixReport};
use uncork_common::{Error, Result, USER_TOKEN};
use uncork_manifest::{
    slugify, AppMetadata, ExecutableEntry, InstallConfig, Manifest, PrefixFingerprint, RuntimeConfig,
    SCHEMA_VERSION,
};
use uncork_registry::{TokenizeStats, Tokenizer, REGISTRY_FILES};

/// Directory of the staged prefix inside an export.
pub const PREFIX_TEMPLATE_DIR: &str = "prefix-template";
/// Directory of extracted icons inside an export.
pub const ICONS_DIR: &str = "icons";
/// Directory of a bundled runtime inside an export.
pub const RUNTIME_DIR: &str = "wine";

/// Lifecycle of a [`PrefixCapture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Created,
    Configuring,
    Normalized,
    Exported,
}

/// Export stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Warmup,
    CopyPrefix,
    TokenizeRegistry,
    NormalizeUserDir,
    Icons,
    BundleRuntime,
    WriteManifest,
}

impl fmt::Display for ExportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExportStage::Warmup => "Updating prefix",
            ExportStage::CopyPrefix => "Copying prefix",
            ExportStage::TokenizeRegistry => "Tokenizing registry",
            ExportStage::NormalizeUserDir => "Normalizing user directory",
            ExportStage::Icons => "Extracting icons",
            ExportStage::BundleRuntime => "Bundling Wine",
            ExportStage::WriteManifest => "Writing manifest",
        };
        write!(f, "{}", label)
    }
}

/// An executable to declare, with optional hints used during export.
#[derive(Debug, Clone)]
pub struct ExecutableInput {
    /// Explicit identifier; derived from `name` when absent.
    pub id: Option<String>,
    pub name: String,
    /// Path relative to the prefix root.
    pub path: String,
    pub command: Option<String>,
    pub args: String,
    pub working_dir: Option<String>,
    /// Prefix-relative file to extract the icon from; defaults to `path`.
    pub icon_source: Option<String>,
    /// Icon file on disk, copied instead of extracting.
    pub custom_icon: Option<PathBuf>,
    pub description: Option<String>,
    pub wm_class: Option<String>,
    pub create_desktop_entry: bool,
    /// Empty means the default categories.
    pub categories: Vec<String>,
}

impl ExecutableInput {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            path: path.into(),
            command: None,
            args: String::new(),
            working_dir: None,
            icon_source: None,
            custom_icon: None,
            description: None,
            wm_class: None,
            create_desktop_entry: true,
            categories: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_args(mut self, args: impl Into<String>) -> Self {
        self.args = args.into();
        self
    }

    pub fn with_custom_icon(mut self, icon: impl Into<PathBuf>) -> Self {
        self.custom_icon = Some(icon.into());
        self
    }

    pub fn with_icon_source(mut self, source: impl Into<String>) -> Self {
        self.icon_source = Some(source.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_wm_class(mut self, wm_class: impl Into<String>) -> Self {
        self.wm_class = Some(wm_class.into());
        self
    }
}

/// A declared executable and the export-time hints that never reach the
/// manifest.
#[derive(Debug, Clone)]
struct PendingExecutable {
    entry: ExecutableEntry,
    icon_source: String,
    custom_icon: Option<PathBuf>,
}

/// Captures one Wine prefix into a staged directory.
///
/// ```ignore
/// let mut capture = PrefixCapture::new("/home/alice/.wine-game")?;
/// capture.add_executable(ExecutableInput::new("Game", "drive_c/Games/game.exe"))?;
/// let manifest = capture.export("/tmp/game-staged")?;
/// ```
pub struct PrefixCapture {
    prefix_path: PathBuf,
    report: Option<PrefixReport>,
    executables: Vec<PendingExecutable>,
    ids: IdAllocator,
    runtime: RuntimeConfig,
    app: Option<AppMetadata>,
    install: InstallConfig,
    exclusions: ExclusionSet,
    warmup: bool,
    warmup_config: WarmupConfig,
    icon_extractor: Box<dyn IconExtractor>,
    state: CaptureState,
    export_path: Option<PathBuf>,
}

impl PrefixCapture {
    /// Start a capture of the prefix at `prefix_path`.
    pub fn new(prefix_path: impl AsRef<Path>) -> Result<Self> {
        let path = prefix_path.as_ref();
        if !path.exists() {
            return Err(Error::not_found("Prefix", path));
        }
        let prefix_path = path.canonicalize()?;

        Ok(Self {
            prefix_path,
            report: None,
            executables: Vec::new(),
            ids: IdAllocator::new(),
            runtime: RuntimeConfig::default(),
            app: None,
            install: InstallConfig::default(),
            exclusions: ExclusionSet::with_defaults(),
            warmup: true,
            warmup_config: WarmupConfig::default(),
            icon_extractor: Box::new(IcoutilsExtractor::default()),
            state: CaptureState::Created,
            export_path: None,
        })
    }

    pub fn prefix_path(&self) -> &Path {
        &self.prefix_path
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn export_path(&self) -> Option<&Path> {
        self.export_path.as_deref()
    }

    /// Analyze the prefix once and cache the report.
    pub fn analyze(&mut self) -> &PrefixReport {
        let prefix_path = &self.prefix_path;
        self.report
            .get_or_insert_with(|| PrefixAnalyzer::new(prefix_path).analyze())
    }

    /// Discard the cached report and analyze again.
    pub fn reanalyze(&mut self) -> &PrefixReport {
        self.report = None;
        self.analyze()
    }

    /// Declare an executable. Returns the identifier it was given.
    pub fn add_executable(&mut self, input: ExecutableInput) -> Result<String> {
        let full_path = self.resolve_in_prefix(&input.path)?;
        if !full_path.exists() {
            return Err(Error::not_found("Executable", full_path));
        }
        if !full_path.canonicalize()?.starts_with(&self.prefix_path) {
            return Err(Error::Config(format!(
                "executable {} resolves outside the prefix",
                input.path
            )));
        }
        if let Some(ref source) = input.icon_source {
            self.resolve_in_prefix(source)?;
        }
        if let Some(ref icon) = input.custom_icon {
            if !icon.exists() {
                return Err(Error::not_found("Custom icon", icon.clone()));
            }
        }

        let id = match input.id {
            Some(id) => {
                if id.is_empty() || slugify(&id) != id {
                    return Err(Error::Config(format!(
                        "executable id {:?} may only contain lowercase letters, digits and single hyphens",
                        id
                    )));
                }
                if !self.ids.reserve(&id) {
                    return Err(Error::DuplicateExecutable(id));
                }
                id
            }
            None => self.ids.allocate(&input.name),
        };

        let mut entry = ExecutableEntry::new(id.clone(), input.name, input.path.clone());
        entry.command = input.command;
        entry.args = input.args;
        if input.working_dir.is_some() {
            entry.working_dir = input.working_dir;
        }
        entry.description = input.description;
        entry.wm_class = input.wm_class;
        entry.create_desktop_entry = input.create_desktop_entry;
        if !input.categories.is_empty() {
            entry.categories = input.categories;
        }

        debug!("Added executable {} ({})", id, entry.path);
        self.executables.push(PendingExecutable {
            entry,
            icon_source: input.icon_source.unwrap_or(input.path),
            custom_icon: input.custom_icon,
        });
        self.touch();
        Ok(id)
    }

    /// Join a prefix-relative path, rejecting anything that could leave the prefix.
    fn resolve_in_prefix(&self, rel: &str) -> Result<PathBuf> {
        let path = Path::new(rel);
        let contained = !rel.is_empty()
            && path
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !contained {
            return Err(Error::Config(format!(
                "path {} must be relative to the prefix root",
                rel
            )));
        }
        Ok(self.prefix_path.join(path))
    }

    /// Declared executables, in order.
    pub fn executables(&self) -> impl Iterator<Item = &ExecutableEntry> {
        self.executables.iter().map(|e| &e.entry)
    }

    pub fn set_runtime_mode(&mut self, runtime: RuntimeConfig) -> Result<()> {
        if let RuntimeConfig::Bundled { ref path } = runtime {
            if path.trim().is_empty() {
                return Err(Error::Config(
                    "bundled mode requires a Wine path".to_string(),
                ));
            }
        }
        self.runtime = runtime;
        self.touch();
        Ok(())
    }

    pub fn runtime(&self) -> &RuntimeConfig {
        &self.runtime
    }

    pub fn set_app_metadata(&mut self, app: AppMetadata) {
        self.app = Some(app);
        self.touch();
    }

    pub fn app_metadata(&self) -> Option<&AppMetadata> {
        self.app.as_ref()
    }

    pub fn set_install_config(&mut self, install: InstallConfig) {
        self.install = install;
        self.touch();
    }

    /// Add an exclusion pattern; invalid globs are rejected.
    pub fn add_exclusion(&mut self, pattern: &str) -> Result<()> {
        if self.exclusions.add(pattern)? {
            self.touch();
        }
        Ok(())
    }

    /// Remove an exclusion pattern, including a default one.
    pub fn remove_exclusion(&mut self, pattern: &str) -> bool {
        let removed = self.exclusions.remove(pattern);
        if removed {
            self.touch();
        }
        removed
    }

    pub fn exclusions(&self) -> &ExclusionSet {
        &self.exclusions
    }

    /// Enable or disable the pre-export `wineboot -u` warm-up.
    pub fn set_warmup(&mut self, enabled: bool) {
        self.warmup = enabled;
        self.touch();
    }

    pub fn set_warmup_config(&mut self, config: WarmupConfig) {
        self.warmup_config = config;
    }

    pub fn set_icon_extractor(&mut self, extractor: Box<dyn IconExtractor>) {
        self.icon_extractor = extractor;
    }

    fn touch(&mut self) {
        if matches!(self.state, CaptureState::Created | CaptureState::Normalized) {
            self.state = CaptureState::Configuring;
        }
    }

    /// Validate the configuration and fill in defaults.
    pub fn normalize(&mut self) -> Result<()> {
        let report = self.analyze();
        if !report.is_valid_prefix {
            return Err(Error::InvalidPrefixStructure(format!(
                "{} is not a Wine prefix: {}",
                report.prefix_path.display(),
                report.warnings.join("; ")
            )));
        }

        if self.executables.is_empty() {
            return Err(Error::InvalidPrefixStructure(
                "no executables configured".to_string(),
            ));
        }

        for exe in &self.executables {
            let full_path = self.prefix_path.join(&exe.entry.path);
            if !full_path.exists() {
                return Err(Error::not_found("Executable", full_path));
            }
        }

        if self.app.is_none() {
            let first = &self.executables[0].entry;
            let app = AppMetadata::from_display_name(&first.name);
            info!("Using default app metadata: {} ({})", app.name, app.display_name);
            self.app = Some(app);
        }

        if self.state != CaptureState::Exported {
            self.state = CaptureState::Normalized;
        }
        Ok(())
    }

    /// Export without progress reporting.
    pub fn export(&mut self, dest: impl AsRef<Path>) -> Result<Manifest> {
        self.export_with_progress(dest, |_, _| {})
    }

    /// Stage the prefix into `dest` and write its manifest.
    ///
    /// `progress` receives each stage and the overall completion in percent.
    /// A capture can be exported once.
    pub fn export_with_progress<F>(
        &mut self,
        dest: impl AsRef<Path>,
        mut progress: F,
    ) -> Result<Manifest>
    where
        F: FnMut(ExportStage, f32),
    {
        if self.state == CaptureState::Exported {
            let previous = self.export_path.clone().unwrap_or_default();
            return Err(Error::AlreadyExported(previous));
        }
        if self.state != CaptureState::Normalized {
            self.normalize()?;
        }

        let dest = dest.as_ref();

        if self.warmup {
            progress(ExportStage::Warmup, 0.0);
            let report = self.run_warmup();
            debug!("Warm-up finished: {} step(s)", report.steps.len());
        }

        let report = self.analyze().clone();
        let template = dest.join(PREFIX_TEMPLATE_DIR);
        let icons_dir = dest.join(ICONS_DIR);
        fs::create_dir_all(&icons_dir)?;

        info!("Copying prefix to {:?}", template);
        progress(ExportStage::CopyPrefix, 0.0);
        let stats = copy_prefix(&self.prefix_path, &template, &self.exclusions, |fraction| {
            progress(ExportStage::CopyPrefix, 70.0 * fraction)
        })?;
        info!(
            "Copied {} file(s) ({} bytes), {} excluded",
            stats.files, stats.bytes, stats.excluded
        );
        progress(ExportStage::CopyPrefix, 70.0);

        let user = report.detected_user.as_deref();
        let token_stats = tokenize_registry(&template, user)?;
        progress(ExportStage::TokenizeRegistry, 80.0);
        if token_stats.replacements > 0 {
            info!(
                "Tokenized {} user path(s) in registry",
                token_stats.replacements
            );
        }

        normalize_user_dir(&template, user)?;
        progress(ExportStage::NormalizeUserDir, 85.0);

        let executables = self.stage_icons(&icons_dir)?;
        progress(ExportStage::Icons, 90.0);

        let runtime = self.bundle_runtime(dest)?;
        progress(ExportStage::BundleRuntime, 95.0);

        let manifest = Manifest {
            schema_version: SCHEMA_VERSION.to_string(),
            app: self.app.clone().unwrap_or_else(|| {
                AppMetadata::from_display_name(&executables[0].name)
            }),
            runtime,
            prefix: PrefixFingerprint {
                original_user: report.detected_user.clone(),
                original_path: self.prefix_path.to_string_lossy().to_string(),
                normalized_user: USER_TOKEN.to_string(),
                original_wine_version: report.wine_version.clone(),
                has_dxvk: report.has_dxvk,
                has_vkd3d: report.has_vkd3d,
                arch: report.arch,
            },
            executables,
            install: self.install.clone(),
            excluded_patterns: self.exclusions.patterns().to_vec(),
        };
        let manifest_path = manifest.save(dest)?;
        progress(ExportStage::WriteManifest, 100.0);

        info!("Export complete: {:?}", manifest_path);
        self.state = CaptureState::Exported;
        self.export_path = Some(dest.to_path_buf());
        Ok(manifest)
    }

    fn run_warmup(&self) -> WarmupReport {
        let bundled = match self.runtime {
            RuntimeConfig::Bundled { ref path } => Some(PathBuf::from(path)),
            RuntimeConfig::System { .. } => None,
        };
        Warmup::new(
            &self.prefix_path,
            bundled.as_deref(),
            self.warmup_config.clone(),
        )
        .run()
    }

    /// Copy or extract an icon per executable. Failures clear the icon.
    fn stage_icons(&self, icons_dir: &Path) -> Result<Vec<ExecutableEntry>> {
        let mut entries = Vec::with_capacity(self.executables.len());

        for exe in &self.executables {
            let mut entry = exe.entry.clone();
            let file_name = format!("{}.png", entry.id);
            let icon_path = icons_dir.join(&file_name);
            let icon_ref = format!("{}/{}", ICONS_DIR, file_name);

            entry.icon = if let Some(ref custom) = exe.custom_icon {
                match fs::copy(custom, &icon_path) {
                    Ok(_) => Some(icon_ref),
                    Err(e) => {
                        warn!("Cannot copy icon {:?} for {}: {}", custom, entry.id, e);
                        None
                    }
                }
            } else {
                let source = self.prefix_path.join(&exe.icon_source);
                if !source.exists() {
                    debug!("Icon source {:?} does not exist", source);
                    None
                } else {
                    match self.icon_extractor.extract(&source, &icon_path) {
                        Ok(()) => Some(icon_ref),
                        Err(e) => {
                            warn!(
                                "Icon extraction ({}) failed for {}: {}",
                                self.icon_extractor.name(),
                                entry.id,
                                e
                            );
                            None
                        }
                    }
                }
            };
            entries.push(entry);
        }

        Ok(entries)
    }

    /// Copy a bundled runtime and return the runtime config for the manifest.
    fn bundle_runtime(&self, dest: &Path) -> Result<RuntimeConfig> {
        let RuntimeConfig::Bundled { ref path } = self.runtime else {
            return Ok(self.runtime.clone());
        };

        let src = PathBuf::from(path);
        if !src.exists() {
            return Err(Error::BundledRuntimeMissing(src));
        }
        let name = src
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| Error::BundledRuntimeMissing(src.clone()))?;

        let target = dest.join(RUNTIME_DIR).join(&name);
        info!("Bundling Wine from {:?}", src);
        let stats = copy_tree(&src, &target)?;
        debug!("Bundled {} file(s)", stats.files);

        Ok(RuntimeConfig::Bundled {
            path: format!("{}/{}", RUNTIME_DIR, name),
        })
    }
}

/// Tokenize the registry files of a staged prefix. Skipped without a user.
pub fn tokenize_registry(template: &Path, user: Option<&str>) -> Result<TokenizeStats> {
    let mut stats = TokenizeStats::default();
    let Some(user) = user else {
        debug!("No user detected; registry left as is");
        return Ok(stats);
    };

    let tokenizer = Tokenizer::new();
    for file in REGISTRY_FILES {
        let path = template.join(file);
        if path.exists() {
            stats.merge(&tokenizer.tokenize_file(&path, user)?);
        }
    }
    Ok(stats)
}

/// Rename `drive_c/users/<user>` to the placeholder, unless it already
/// exists.
pub fn normalize_user_dir(template: &Path, user: Option<&str>) -> Result<bool> {
    let Some(user) = user else {
        return Ok(false);
    };
    let users_dir = template.join("drive_c/users");
    let from = users_dir.join(user);
    let to = users_dir.join(USER_TOKEN);

    if from.exists() && !to.exists() {
        fs::rename(&from, &to)?;
        debug!("Renamed {:?} to {:?}", from, to);
        return Ok(true);
    }
    Ok(false)
}
