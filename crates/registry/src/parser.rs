//! Minimal reader for Wine's text registry format.
//!
//! Only what the analyzer needs: section lookup and string values.

use crate::encoding::read_text;
use std::collections::BTreeMap;
use std::path::Path;
use uncork_common::Result;

/// Key holding per-DLL load order overrides in `user.reg`.
pub const DLL_OVERRIDES_KEY: &str = r"Software\\Wine\\DllOverrides";

/// A parsed registry file.
#[derive(Debug, Clone, Default)]
pub struct RegistryDocument {
    sections: Vec<Section>,
}

#[derive(Debug, Clone)]
struct Section {
    key: String,
    values: Vec<(String, String)>,
}

impl RegistryDocument {
    pub fn from_path(path: &Path) -> Result<Self> {
        let decoded = read_text(path)?;
        Ok(Self::parse(&decoded.text))
    }

    /// Parse registry text. Unrecognized lines are ignored.
    pub fn parse(content: &str) -> Self {
        let mut sections: Vec<Section> = Vec::new();

        for line in content.lines() {
            let line = line.trim_end();
            if let Some(rest) = line.strip_prefix('[') {
                if let Some(end) = rest.find(']') {
                    sections.push(Section {
                        key: rest[..end].to_string(),
                        values: Vec::new(),
                    });
                }
                continue;
            }

            let Some(section) = sections.last_mut() else {
                continue;
            };
            if let Some((name, value)) = parse_value_line(line) {
                section.values.push((name, value));
            }
        }

        Self { sections }
    }

    /// Look up a string value. Section and value names compare
    /// case-insensitively, as Windows does.
    pub fn get_value(&self, key: &str, name: &str) -> Option<&str> {
        self.section(key).and_then(|s| {
            s.values
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        })
    }

    /// All string values of a section.
    pub fn values(&self, key: &str) -> impl Iterator<Item = (&str, &str)> {
        self.section(key)
            .into_iter()
            .flat_map(|s| s.values.iter().map(|(n, v)| (n.as_str(), v.as_str())))
    }

    /// DLL overrides, keyed by DLL name. A leading `*` (Wine's "any path"
    /// marker) is dropped from the name.
    pub fn dll_overrides(&self) -> BTreeMap<String, String> {
        self.values(DLL_OVERRIDES_KEY)
            .map(|(name, value)| {
                (
                    name.trim_start_matches('*').to_string(),
                    value.to_string(),
                )
            })
            .collect()
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    fn section(&self, key: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.key.eq_ignore_ascii_case(key))
    }
}

/// Parse `"name"="value"`. Non-string values (`dword:`, `hex:`) and
/// default values (`@=`) are skipped.
fn parse_value_line(line: &str) -> Option<(String, String)> {
    let rest = line.strip_prefix('"')?;
    let name_end = find_closing_quote(rest)?;
    let name = unescape(&rest[..name_end]);
    let value = rest[name_end + 1..].strip_prefix("=\"")?;
    let value_end = find_closing_quote(value)?;
    Some((name, unescape(&value[..value_end])))
}

fn find_closing_quote(s: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => return Some(i),
            _ => escaped = false,
        }
    }
    None
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SYSTEM_REG: &str = r#"WINE REGISTRY Version 2
;; All keys relative to \\Machine

#arch=win64

[Software\\Microsoft\\Windows NT\\CurrentVersion] 1700000000
#time=1da0000000000000
"CurrentVersion"="6.1"
"ProductName"="Wine 9.0"
"RegisteredOwner"="alice"
"InstallDate"=dword:00000000
"#;

    const USER_REG: &str = r#"WINE REGISTRY Version 2

[Software\\Wine\\DllOverrides] 1700000000
"*d3d11"="native"
"d3d9"="native,builtin"
"winemenubuilder.exe"=""
"#;

    #[test]
    fn test_get_value() {
        let doc = RegistryDocument::parse(SYSTEM_REG);
        assert_eq!(doc.section_count(), 1);
        assert_eq!(
            doc.get_value(r"Software\\Microsoft\\Windows NT\\CurrentVersion", "ProductName"),
            Some("Wine 9.0")
        );
        assert_eq!(
            doc.get_value(r"software\\microsoft\\windows nt\\currentversion", "productname"),
            Some("Wine 9.0")
        );
        assert_eq!(
            doc.get_value(r"Software\\Microsoft\\Windows NT\\CurrentVersion", "InstallDate"),
            None
        );
    }

    #[test]
    fn test_dll_overrides() {
        let doc = RegistryDocument::parse(USER_REG);
        let overrides = doc.dll_overrides();
        assert_eq!(overrides.len(), 3);
        assert_eq!(overrides["d3d11"], "native");
        assert_eq!(overrides["d3d9"], "native,builtin");
        assert_eq!(overrides["winemenubuilder.exe"], "");
    }

    #[test]
    fn test_escaped_value() {
        let doc = RegistryDocument::parse(
            "[Shell Folders]\n\"Desktop\"=\"C:\\\\users\\\\alice\\\\Desktop\"\n",
        );
        assert_eq!(
            doc.get_value("Shell Folders", "Desktop"),
            Some(r"C:\users\alice\Desktop")
        );
    }

    #[test]
    fn test_empty_document() {
        let doc = RegistryDocument::parse("");
        assert!(doc.dll_overrides().is_empty());
        assert_eq!(doc.get_value("x", "y"), None);
    }
}
