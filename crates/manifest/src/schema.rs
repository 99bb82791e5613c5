//! JSON schema definition for manifest validation.

/// JSON Schema for manifest.json.
pub const MANIFEST_SCHEMA: &str = r#"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "$id": "https://uncork.dev/schemas/manifest.json",
  "title": "Uncork Intermediate Manifest",
  "type": "object",
  "required": ["schema_version", "app", "runtime", "prefix", "executables", "install", "excluded_patterns"],
  "properties": {
    "schema_version": {
      "type": "string",
      "pattern": "^\\d+$"
    },
    "app": {
      "type": "object",
      "required": ["name", "display_name"],
      "properties": {
        "name": { "type": "string", "pattern": "^[^\\s/]+$" },
        "display_name": { "type": "string", "minLength": 1 },
        "version": { "type": "string" },
        "description": { "type": "string" },
        "maintainer": { "type": ["string", "null"] },
        "homepage": { "type": ["string", "null"] },
        "license": { "type": "string" }
      }
    },
    "runtime": {
      "type": "object",
      "required": ["mode"],
      "properties": {
        "mode": { "type": "string", "enum": ["system", "bundled"] },
        "min_version": { "type": ["string", "null"] },
        "path": { "type": "string" }
      },
      "if": { "properties": { "mode": { "const": "bundled" } } },
      "then": { "required": ["path"] }
    },
    "prefix": {
      "type": "object",
      "required": ["original_path"],
      "properties": {
        "original_user": { "type": ["string", "null"] },
        "original_path": { "type": "string" },
        "normalized_user": { "type": "string" },
        "original_wine_version": { "type": ["string", "null"] },
        "has_dxvk": { "type": "boolean" },
        "has_vkd3d": { "type": "boolean" },
        "arch": { "type": "string", "enum": ["win32", "win64"] }
      }
    },
    "executables": {
      "type": "array",
      "minItems": 1,
      "items": {
        "type": "object",
        "required": ["id", "name", "path"],
        "properties": {
          "id": { "type": "string", "minLength": 1 },
          "name": { "type": "string" },
          "path": { "type": "string" },
          "command": { "type": ["string", "null"] },
          "args": { "type": "string" },
          "working_dir": { "type": ["string", "null"] },
          "icon": { "type": ["string", "null"] },
          "description": { "type": ["string", "null"] },
          "wm_class": { "type": ["string", "null"] },
          "create_desktop_entry": { "type": "boolean" },
          "categories": { "type": "array", "items": { "type": "string" } }
        }
      }
    },
    "install": {
      "type": "object",
      "required": ["system_path", "user_data_path"],
      "properties": {
        "system_path": { "type": "string" },
        "user_data_path": { "type": "string" },
        "use_overlay": { "type": "boolean" }
      }
    },
    "excluded_patterns": {
      "type": "array",
      "items": { "type": "string" }
    }
  }
}"#;

/// Get the manifest schema as a parsed JSON value.
pub fn manifest_schema() -> serde_json::Value {
    serde_json::from_str(MANIFEST_SCHEMA).expect("Invalid manifest schema")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_parses() {
        let schema = manifest_schema();
        assert_eq!(schema["title"], "Uncork Intermediate Manifest");
    }
}
