//! Boolean raster-operation (rop) combination of Destination, Source, and
//! Texture bitmaps over a chunky device.

pub mod byteop;
pub mod engine;
pub mod planar;
pub mod sanitize;
pub mod usage;

pub use byteop::{apply_rop_bit, apply_rop_byte};
pub use engine::{strip_copy_rop, SourceOperand, TextureOperand};
pub use planar::strip_copy_rop_planar;
pub use sanitize::sanitize_lop;
pub use usage::{eval_bit, rop_usage, RopUsage};
