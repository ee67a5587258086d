//! Error kinds shared by every raster-engine crate.

use thiserror::Error;

/// Abstract error kinds a drawing primitive or device-management call can
/// return. Every crate in the workspace propagates this type (or a type
/// alias of it) rather than defining its own — see `RasterResult`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RasterError {
    /// A parameter was out of its declared domain: negative width/height
    /// (only when exactly one is negative), an unsupported sample depth, an
    /// unknown rop code, a malformed planar configuration, or
    /// `get_bits_rectangle` options with no supported mode.
    #[error("range error: {0}")]
    Range(String),

    /// A computed allocation or compressed bitmap exceeded the configured
    /// cap.
    #[error("limit error: {0}")]
    Limit(String),

    /// An allocation failed in an init path or a transient scratch buffer.
    #[error("memory error: {0}")]
    Memory(String),

    /// `copy_mono` was asked for both colors as "no color".
    #[error("undefined result: {0}")]
    Undefined(String),

    /// An internal invariant was violated.
    #[error("fatal error: {0}")]
    Fatal(String),
}

pub type RasterResult<T> = Result<T, RasterError>;
