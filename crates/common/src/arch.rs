//! Prefix architecture definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Windows architecture emulated by a Wine prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    Win32,
    #[default]
    Win64,
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arch::Win32 => write!(f, "win32"),
            Arch::Win64 => write!(f, "win64"),
        }
    }
}

impl FromStr for Arch {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "win32" => Ok(Arch::Win32),
            "win64" => Ok(Arch::Win64),
            _ => Err(crate::Error::Config(format!("unknown architecture: {}", s))),
        }
    }
}

impl Arch {
    /// Check if the prefix is 64-bit (has a WoW64 layer).
    pub fn is_64bit(&self) -> bool {
        matches!(self, Arch::Win64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arch() {
        assert_eq!(Arch::from_str("win32").unwrap(), Arch::Win32);
        assert_eq!(Arch::from_str("WIN64").unwrap(), Arch::Win64);
        assert!(Arch::from_str("arm64").is_err());
    }

    #[test]
    fn test_arch_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Arch::Win32).unwrap(), "\"win32\"");
        let parsed: Arch = serde_json::from_str("\"win64\"").unwrap();
        assert!(parsed.is_64bit());
    }
}
