//! Path prefixes that precede a username in Wine registry data.

use regex::Regex;
use uncork_common::{Error, Result};

/// A path form whose trailing segment is a username.
#[derive(Debug, Clone, Copy)]
pub struct PathRule {
    /// Stable rule name, reported in tokenization statistics.
    pub name: &'static str,
    /// Regex source matching the text that precedes the username.
    pub prefix: &'static str,
}

/// `C:\\users\\<user>` as registry values store it (escaped backslashes).
pub const USERS_ESCAPED: PathRule = PathRule {
    name: "users_escaped",
    prefix: r"C:\\\\users\\\\",
};

/// `C:\users\<user>` with single backslashes.
pub const USERS_PLAIN: PathRule = PathRule {
    name: "users_plain",
    prefix: r"C:\\users\\",
};

/// `Z:\\home\\<user>` (escaped backslashes).
pub const HOME_ESCAPED: PathRule = PathRule {
    name: "home_escaped",
    prefix: r"Z:\\\\home\\\\",
};

/// `Z:\home\<user>` with single backslashes.
pub const HOME_PLAIN: PathRule = PathRule {
    name: "home_plain",
    prefix: r"Z:\\home\\",
};

/// `/home/<user>` as a Unix path.
pub const UNIX_HOME: PathRule = PathRule {
    name: "unix_home",
    prefix: r"/home/",
};

/// All rules, in the order they are applied.
pub fn all_path_rules() -> [PathRule; 5] {
    [USERS_ESCAPED, USERS_PLAIN, HOME_ESCAPED, HOME_PLAIN, UNIX_HOME]
}

impl PathRule {
    /// Compile this rule for one username.
    ///
    /// Group 1 is the prefix (kept verbatim), group 2 the username.
    pub fn compile(&self, user: &str) -> Result<Regex> {
        let source = format!("(?i)({})({})", self.prefix, regex::escape(user));
        Regex::new(&source).map_err(|e| Error::Config(format!("rule {}: {}", self.name, e)))
    }
}

/// Whether `next` (the character after a username match) ends the path
/// segment, so that `alice` does not match inside `alice2` or `alice.old`.
pub fn ends_segment(next: Option<char>) -> bool {
    match next {
        None => true,
        Some(c) => !(c.is_alphanumeric() || c == '_' || c == '-' || c == '.'),
    }
}
