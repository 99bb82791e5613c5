//! Username tokenization for registry files.

use crate::encoding::read_text;
use crate::patterns::{all_path_rules, ends_segment};
use regex::Regex;
use std::fs;
use std::path::Path;
use tracing::{debug, trace};
use uncork_common::{Result, HOME_TOKEN, USER_TOKEN};

/// Result of tokenization.
#[derive(Debug)]
pub struct TokenizeResult {
    /// The tokenized content.
    pub content: String,
    /// Statistics about what was replaced.
    pub stats: TokenizeStats,
}

/// Statistics about replacements performed.
#[derive(Debug, Default, Clone)]
pub struct TokenizeStats {
    /// Number of username occurrences replaced.
    pub replacements: usize,
    /// Names of rules that matched at least once.
    pub matched_rules: Vec<String>,
    /// Number of files decoded with the Latin-1 fallback.
    pub fallback_decodes: usize,
}

impl TokenizeStats {
    /// Merge with another stats.
    pub fn merge(&mut self, other: &TokenizeStats) {
        self.replacements += other.replacements;
        self.fallback_decodes += other.fallback_decodes;
        for rule in &other.matched_rules {
            if !self.matched_rules.contains(rule) {
                self.matched_rules.push(rule.clone());
            }
        }
    }
}

/// Replaces a username with placeholder tokens and back.
pub struct Tokenizer {
    user_token: String,
    home_token: String,
}

impl Tokenizer {
    /// Create a tokenizer using the standard placeholders.
    pub fn new() -> Self {
        Self::with_tokens(USER_TOKEN, HOME_TOKEN)
    }

    /// Create a tokenizer with custom placeholders.
    pub fn with_tokens(user_token: impl Into<String>, home_token: impl Into<String>) -> Self {
        Self {
            user_token: user_token.into(),
            home_token: home_token.into(),
        }
    }

    pub fn user_token(&self) -> &str {
        &self.user_token
    }

    /// Replace `original_user` after every known path prefix.
    ///
    /// Rules run in a fixed order; each sees the output of the previous one.
    pub fn tokenize(&self, content: &str, original_user: &str) -> Result<TokenizeResult> {
        let mut stats = TokenizeStats::default();
        if original_user.is_empty() {
            return Ok(TokenizeResult {
                content: content.to_string(),
                stats,
            });
        }

        let mut result = content.to_string();
        for rule in all_path_rules() {
            let pattern = rule.compile(original_user)?;
            let (rewritten, count) = self.apply_rule(&result, &pattern);
            if count > 0 {
                stats.replacements += count;
                stats.matched_rules.push(rule.name.to_string());
                trace!("Rule {} replaced {} occurrence(s)", rule.name, count);
            }
            result = rewritten;
        }

        Ok(TokenizeResult {
            content: result,
            stats,
        })
    }

    /// Replace the placeholders with real values (install time).
    pub fn detokenize(&self, content: &str, actual_user: &str, actual_home: &str) -> String {
        content
            .replace(&self.user_token, actual_user)
            .replace(&self.home_token, actual_home)
    }

    /// Tokenize a registry file in place. The file is always written back
    /// as UTF-8.
    pub fn tokenize_file(&self, path: &Path, original_user: &str) -> Result<TokenizeStats> {
        let decoded = read_text(path)?;
        let fallback = decoded.used_fallback();

        let mut result = self.tokenize(&decoded.text, original_user)?;
        if fallback {
            result.stats.fallback_decodes = 1;
        }

        if result.stats.replacements > 0 || fallback {
            fs::write(path, result.content.as_bytes())?;
        }
        debug!(
            "Tokenized {:?}: {} replacement(s)",
            path, result.stats.replacements
        );
        Ok(result.stats)
    }

    /// Apply one compiled rule, replacing only matches that end a segment.
    fn apply_rule(&self, content: &str, pattern: &Regex) -> (String, usize) {
        let mut result = String::with_capacity(content.len());
        let mut last = 0;
        let mut count = 0;

        for caps in pattern.captures_iter(content) {
            let (Some(prefix), Some(user)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            if !ends_segment(content[user.end()..].chars().next()) {
                continue;
            }
            result.push_str(&content[last..prefix.end()]);
            result.push_str(&self.user_token);
            last = user.end();
            count += 1;
        }

        result.push_str(&content[last..]);
        (result, count)
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"WINE REGISTRY Version 2
[Software\\Microsoft\\Windows\\CurrentVersion\\Explorer\\Shell Folders] 1700000000
"Desktop"="C:\\users\\alice\\Desktop"
"Personal"="C:\\users\\alice\\Documents"
"Cache"="C:\users\alice\AppData"
"HomeLink"="Z:\\home\\alice\\games"
"Plain"="Z:\home\alice"
"Unix"="/home/alice/.local/share"
"Other"="C:\\users\\alice2\\Desktop"
"#;

    #[test]
    fn test_tokenize_all_forms() {
        let tokenizer = Tokenizer::new();
        let result = tokenizer.tokenize(SAMPLE, "alice").unwrap();

        assert!(result
            .content
            .contains(r#""Desktop"="C:\\users\\__WINE_USER__\\Desktop""#));
        assert!(result
            .content
            .contains(r#""Cache"="C:\users\__WINE_USER__\AppData""#));
        assert!(result
            .content
            .contains(r#""HomeLink"="Z:\\home\\__WINE_USER__\\games""#));
        assert!(result.content.contains(r#""Plain"="Z:\home\__WINE_USER__""#));
        assert!(result
            .content
            .contains(r#""Unix"="/home/__WINE_USER__/.local/share""#));
        assert_eq!(result.stats.replacements, 6);
        assert_eq!(result.stats.matched_rules.len(), 5);
    }

    #[test]
    fn test_longer_name_is_not_replaced() {
        let tokenizer = Tokenizer::new();
        let result = tokenizer.tokenize(SAMPLE, "alice").unwrap();
        assert!(result.content.contains(r"C:\\users\\alice2\\Desktop"));
    }

    #[test]
    fn test_case_insensitive_match() {
        let tokenizer = Tokenizer::new();
        let result = tokenizer
            .tokenize(r#""Desktop"="c:\\Users\\ALICE\\Desktop""#, "alice")
            .unwrap();
        assert_eq!(
            result.content,
            r#""Desktop"="c:\\Users\\__WINE_USER__\\Desktop""#
        );
    }

    #[test]
    fn test_roundtrip() {
        let tokenizer = Tokenizer::new();
        let tokenized = tokenizer.tokenize(SAMPLE, "alice").unwrap();
        assert!(!tokenized.content.contains(r"users\\alice\\"));
        let restored = tokenizer.detokenize(&tokenized.content, "alice", "/home/alice");
        assert_eq!(restored, SAMPLE);
    }

    #[test]
    fn test_roundtrip_without_occurrences() {
        let tokenizer = Tokenizer::new();
        let text = "WINE REGISTRY Version 2\n#arch=win64\n";
        let tokenized = tokenizer.tokenize(text, "bob").unwrap();
        assert_eq!(tokenized.stats.replacements, 0);
        assert_eq!(tokenizer.detokenize(&tokenized.content, "bob", "/home/bob"), text);
    }

    #[test]
    fn test_detokenize_home_token() {
        let tokenizer = Tokenizer::new();
        let restored = tokenizer.detokenize(
            "__USER_HOME__/Games and C:\\users\\__WINE_USER__",
            "carol",
            "/home/carol",
        );
        assert_eq!(restored, "/home/carol/Games and C:\\users\\carol");
    }

    #[test]
    fn test_empty_user_is_noop() {
        let tokenizer = Tokenizer::new();
        let result = tokenizer.tokenize(SAMPLE, "").unwrap();
        assert_eq!(result.content, SAMPLE);
    }

    #[test]
    fn test_tokenize_file_latin1_rewritten_as_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user.reg");
        let mut bytes = br#""Desktop"="C:\\users\\alice\\Desktop" "#.to_vec();
        bytes.extend_from_slice(&[0x47, 0x72, 0xf6, 0xdf, 0x65]);
        std::fs::write(&path, &bytes).unwrap();

        let stats = Tokenizer::new().tokenize_file(&path, "alice").unwrap();
        assert_eq!(stats.replacements, 1);
        assert_eq!(stats.fallback_decodes, 1);

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            r#""Desktop"="C:\\users\\__WINE_USER__\\Desktop" Größe"#
        );
    }

    #[test]
    fn test_tokenize_file_mixed_encoding_keeps_utf8_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user.reg");
        let mut bytes = r#""Desktop"="C:\\users\\alice\\Größe" "#.as_bytes().to_vec();
        bytes.push(0xff);
        std::fs::write(&path, &bytes).unwrap();

        let stats = Tokenizer::new().tokenize_file(&path, "alice").unwrap();
        assert_eq!(stats.replacements, 1);
        assert_eq!(stats.fallback_decodes, 1);

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            r#""Desktop"="C:\\users\\__WINE_USER__\\Größe" ÿ"#
        );
    }

    #[test]
    fn test_stats_merge() {
        let mut total = TokenizeStats::default();
        let a = TokenizeStats {
            replacements: 2,
            matched_rules: vec!["users_escaped".to_string()],
            fallback_decodes: 0,
        };
        let b = TokenizeStats {
            replacements: 1,
            matched_rules: vec!["users_escaped".to_string(), "unix_home".to_string()],
            fallback_decodes: 1,
        };
        total.merge(&a);
        total.merge(&b);
        assert_eq!(total.replacements, 3);
        assert_eq!(total.matched_rules, vec!["users_escaped", "unix_home"]);
        assert_eq!(total.fallback_decodes, 1);
    }
}
