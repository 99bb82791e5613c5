//! Capture of Wine prefixes into a portable staged directory.
//!
//! [`PrefixCapture`] drives the pipeline: analysis, configuration,
//! normalization and export. The remaining modules are the individual
//! stages and can be used on their own.

pub mod copy;
pub mod exclusion;
pub mod icons;
pub mod ids;
pub mod orchestrator;
pub mod process;
pub mod symlink;
pub mod warmup;

pub use exclusion::{ExclusionSet, DEFAULT_EXCLUSIONS};
pub use icons::{IconExtractor, IcoutilsExtractor, NoIconExtractor};
pub use orchestrator::{
    CaptureState, ExecutableInput, ExportStage, PrefixCapture, ICONS_DIR, PREFIX_TEMPLATE_DIR,
    RUNTIME_DIR,
};
pub use symlink::{classify, SymlinkAction};
pub use warmup::{Warmup, WarmupConfig, WarmupReport};
