//! Executable identifier allocation.

use std::collections::HashSet;
use uncork_manifest::slugify;

/// Identifier used when a display name has no usable characters.
pub const FALLBACK_ID: &str = "app";

/// Hands out unique executable identifiers.
#[derive(Debug, Default, Clone)]
pub struct IdAllocator {
    used: HashSet<String>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim an explicit identifier. Returns false if it is taken.
    pub fn reserve(&mut self, id: &str) -> bool {
        self.used.insert(id.to_string())
    }

    /// Derive an identifier from a display name, appending `-1`, `-2`, ...
    /// on collision.
    pub fn allocate(&mut self, display_name: &str) -> String {
        let mut base = slugify(display_name);
        if base.is_empty() {
            base = FALLBACK_ID.to_string();
        }

        if self.used.insert(base.clone()) {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}-{}", base, n);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.used.contains(id)
    }
}
