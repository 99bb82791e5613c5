//! Manifest definitions for uncork intermediate packages.
//!
//! The manifest is the only contract between prefix capture and the
//! format-specific package builders.

pub mod manifest;
pub mod schema;
pub mod validation;

pub use manifest::{
    AppMetadata, ExecutableEntry, InstallConfig, Manifest, PrefixFingerprint, RuntimeConfig,
    MANIFEST_FILE, SCHEMA_VERSION,
};
pub use validation::{check_invariants, validate_manifest, ValidationError, ValidationResult};

/// Turn a display name into a package/identifier slug.
///
/// Lowercases, collapses every run of non-alphanumeric characters into a
/// single hyphen and trims hyphens from both ends.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("My Cool App!!"), "my-cool-app");
        assert_eq!(slugify("  Launcher  "), "launcher");
        assert_eq!(slugify("Foo -- Bar_2"), "foo-bar-2");
        assert_eq!(slugify("!!!"), "");
    }
}
