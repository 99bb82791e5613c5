//! Text decoding for registry files.
//!
//! Registry files are normally UTF-8. Files written by older tools may hold
//! single-byte text. Valid UTF-8 runs are kept as they are and only the
//! invalid bytes are widened as Latin-1, so decoding cannot fail.

use std::fs;
use std::path::Path;
use tracing::debug;
use uncork_common::{Error, Result};

/// Encoding a file was decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    /// UTF-8 with invalid bytes widened as Latin-1.
    Latin1,
}

/// Decoded file content.
#[derive(Debug, Clone)]
pub struct DecodedText {
    pub text: String,
    pub encoding: TextEncoding,
}

impl DecodedText {
    pub fn used_fallback(&self) -> bool {
        self.encoding == TextEncoding::Latin1
    }
}

/// Decode bytes as UTF-8, falling back to Latin-1 for invalid bytes only.
pub fn decode(bytes: Vec<u8>) -> DecodedText {
    let bytes = match String::from_utf8(bytes) {
        Ok(text) => {
            return DecodedText {
                text,
                encoding: TextEncoding::Utf8,
            }
        }
        Err(e) => e.into_bytes(),
    };

    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
        text.extend(chunk.invalid().iter().map(|&b| char::from(b)));
    }
    DecodedText {
        text,
        encoding: TextEncoding::Latin1,
    }
}

/// Read and decode a text file.
pub fn read_text(path: &Path) -> Result<DecodedText> {
    let bytes = fs::read(path).map_err(|e| Error::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let decoded = decode(bytes);
    if decoded.used_fallback() {
        debug!("{:?} is not valid UTF-8, decoded as Latin-1", path);
    }
    Ok(decoded)
}
