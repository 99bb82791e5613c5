//! Wine registry handling for uncork.
//!
//! Wine stores its registry as three text files at the prefix root. This
//! crate reads them and replaces the capturing user's name with a portable
//! placeholder so the files can be restored for any user at install time.

pub mod encoding;
pub mod parser;
pub mod patterns;
pub mod tokenizer;

pub use encoding::{read_text, DecodedText, TextEncoding};
pub use parser::RegistryDocument;
pub use tokenizer::{TokenizeResult, TokenizeStats, Tokenizer};

/// Registry files found at the root of a Wine prefix.
pub const REGISTRY_FILES: [&str; 3] = ["system.reg", "user.reg", "userdef.reg"];

/// Whether a file name (relative to the prefix root) is a registry file.
pub fn is_registry_file(name: &str) -> bool {
    REGISTRY_FILES.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_registry_file() {
        assert!(is_registry_file("user.reg"));
        assert!(!is_registry_file("drive_c/user.reg"));
        assert!(!is_registry_file("foo.reg"));
    }
}
