//! An oversampled monobit alpha buffer: accumulates a shape at a higher
//! resolution than the output device and compresses it into per-pixel
//! alpha coverage samples, forwarded to a downstream device through
//! [`AlphaTarget`].

mod buffer;
mod target;

pub use buffer::{AlphaBufferDevice, AlphaBufferState, AlphaColor};
pub use target::{AlphaTarget, SpecOp};
