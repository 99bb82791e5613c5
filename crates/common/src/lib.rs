//! Common utilities and types shared across uncork crates.

pub mod arch;
pub mod error;

pub use arch::Arch;
pub use error::{Error, Result};

/// Placeholder substituted for the capturing user's name.
pub const USER_TOKEN: &str = "__WINE_USER__";

/// Placeholder substituted for the installing user's home directory.
pub const HOME_TOKEN: &str = "__USER_HOME__";
