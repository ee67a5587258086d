//! Engine resource limits, loaded from an optional TOML file.
//!
//! Mirrors a raw-parsed-vs-effective split: [`ConfigFile`] is exactly what
//! deserializes from disk (every field optional), [`EngineLimits`] is what
//! the engine actually enforces, with defaults filled in and values
//! clamped to sane floors.

use std::path::Path;

use serde::Deserialize;
use tracing::warn;

/// On-disk representation; every field optional so a partial config file
/// only overrides what it names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    pub scratch_buffer_cap_bytes: Option<usize>,
    pub get_bits_row_cap_bytes: Option<usize>,
    pub compressed_bitmap_limit_bytes: Option<usize>,
}

/// Effective limits the engine enforces. Exceeding any of these surfaces
/// as `RasterError::Limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineLimits {
    pub scratch_buffer_cap_bytes: usize,
    pub get_bits_row_cap_bytes: usize,
    pub compressed_bitmap_limit_bytes: usize,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            scratch_buffer_cap_bytes: 32 * 1024,
            get_bits_row_cap_bytes: 1000,
            compressed_bitmap_limit_bytes: 16 * 1024 * 1024,
        }
    }
}

impl EngineLimits {
    /// Applies a parsed `ConfigFile` over the defaults, clamping any
    /// caller-supplied value of 0 back up to a workable floor.
    pub fn from_file(file: &ConfigFile) -> Self {
        let defaults = Self::default();
        Self {
            scratch_buffer_cap_bytes: file
                .scratch_buffer_cap_bytes
                .map(|v| v.max(1024))
                .unwrap_or(defaults.scratch_buffer_cap_bytes),
            get_bits_row_cap_bytes: file
                .get_bits_row_cap_bytes
                .map(|v| v.max(64))
                .unwrap_or(defaults.get_bits_row_cap_bytes),
            compressed_bitmap_limit_bytes: file
                .compressed_bitmap_limit_bytes
                .map(|v| v.max(4096))
                .unwrap_or(defaults.compressed_bitmap_limit_bytes),
        }
    }
}

/// Reads an optional TOML config file, falling back to engine defaults
/// if the path doesn't exist or fails to parse.
pub fn load_from(path: &Path) -> EngineLimits {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => return EngineLimits::default(),
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => EngineLimits::from_file(&file),
        Err(err) => {
            warn!(path = %path.display(), %err, "config file parse error, using defaults");
            EngineLimits::default()
        }
    }
}
