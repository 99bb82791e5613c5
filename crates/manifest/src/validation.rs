//! Manifest validation utilities.

use crate::schema;
use crate::Manifest;
use jsonschema::JSONSchema;
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

/// Validation error type.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Schema validation failed: {0}")]
    SchemaError(String),

    #[error("Manifest declares no executables")]
    NoExecutables,

    #[error("Duplicate executable id: {0}")]
    DuplicateId(String),

    #[error("Install template {field} does not contain {{name}}: {value}")]
    TemplateWithoutName { field: &'static str, value: String },

    #[error("Bundled runtime path must be relative to the staged directory: {0}")]
    AbsoluteRuntimePath(String),
}

/// Result of manifest validation.
#[derive(Debug)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.valid = false;
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate a manifest document against the JSON schema.
pub fn validate_manifest(manifest: &Value) -> uncork_common::Result<ValidationResult> {
    let mut result = ValidationResult::new();

    let schema_value = schema::manifest_schema();
    let compiled = JSONSchema::compile(&schema_value)
        .map_err(|e| uncork_common::Error::InvalidManifest(e.to_string()))?;

    let validation = compiled.validate(manifest);
    if let Err(errors) = validation {
        for error in errors {
            result.add_error(ValidationError::SchemaError(format!(
                "{} at {}",
                error, error.instance_path
            )));
        }
    }

    Ok(result)
}

/// Check the semantic invariants the schema cannot express.
pub fn check_invariants(manifest: &Manifest) -> ValidationResult {
    let mut result = ValidationResult::new();

    if manifest.executables.is_empty() {
        result.add_error(ValidationError::NoExecutables);
    }

    let mut seen = HashSet::new();
    for exe in &manifest.executables {
        if !seen.insert(exe.id.as_str()) {
            result.add_error(ValidationError::DuplicateId(exe.id.clone()));
        }
        if exe.icon.is_none() {
            result.add_warning(format!("Executable '{}' has no icon", exe.id));
        }
    }

    for (field, value) in [
        ("system_path", &manifest.install.system_path),
        ("user_data_path", &manifest.install.user_data_path),
    ] {
        if !value.contains("{name}") {
            result.add_error(ValidationError::TemplateWithoutName {
                field,
                value: value.clone(),
            });
        }
    }

    if let crate::RuntimeConfig::Bundled { ref path } = manifest.runtime {
        if path.starts_with('/') {
            result.add_error(ValidationError::AbsoluteRuntimePath(path.clone()));
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AppMetadata, ExecutableEntry, InstallConfig, PrefixFingerprint, RuntimeConfig};
    use uncork_common::Arch;

    fn minimal() -> Manifest {
        Manifest {
            schema_version: "1".to_string(),
            app: AppMetadata::new("app", "App"),
            runtime: RuntimeConfig::default(),
            prefix: PrefixFingerprint {
                original_user: None,
                original_path: "/tmp/prefix".to_string(),
                normalized_user: uncork_common::USER_TOKEN.to_string(),
                original_wine_version: None,
                has_dxvk: false,
                has_vkd3d: false,
                arch: Arch::Win32,
            },
            executables: vec![ExecutableEntry::new("app", "App", "drive_c/app.exe")],
            install: InstallConfig::default(),
            excluded_patterns: vec![],
        }
    }

    #[test]
    fn test_validate_manifest_minimal() {
        let manifest = serde_json::to_value(minimal()).unwrap();
        let result = validate_manifest(&manifest).unwrap();
        assert!(result.valid, "Errors: {:?}", result.errors);
    }

    #[test]
    fn test_validate_manifest_missing_field() {
        let manifest = serde_json::json!({
            "schema_version": "1"
            // Missing required fields
        });

        let result = validate_manifest(&manifest).unwrap();
        assert!(!result.valid);
    }

    #[test]
    fn test_bundled_runtime_requires_path() {
        let mut manifest = serde_json::to_value(minimal()).unwrap();
        manifest["runtime"] = serde_json::json!({ "mode": "bundled" });
        let result = validate_manifest(&manifest).unwrap();
        assert!(!result.valid);
    }

    #[test]
    fn test_empty_executables_rejected() {
        let mut manifest = minimal();
        manifest.executables.clear();
        let result = check_invariants(&manifest);
        assert!(!result.valid);
        assert!(matches!(result.errors[0], ValidationError::NoExecutables));

        let value = serde_json::to_value(&manifest).unwrap();
        assert!(!validate_manifest(&value).unwrap().valid);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut manifest = minimal();
        manifest
            .executables
            .push(ExecutableEntry::new("app", "Other", "drive_c/other.exe"));
        let result = check_invariants(&manifest);
        assert!(!result.valid);
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e, ValidationError::DuplicateId(id) if id == "app")));
    }

    #[test]
    fn test_template_without_name() {
        let mut manifest = minimal();
        manifest.install.system_path = "/opt/fixed".to_string();
        let result = check_invariants(&manifest);
        assert!(!result.valid);
    }

    #[test]
    fn test_missing_icon_is_warning_only() {
        let result = check_invariants(&minimal());
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
    }
}
