//! Type-3 image splitter: renders an image alongside its opacity mask by
//! painting the mask into its own monobit device first, then rendering
//! the opaque image through a mask-clipped view of the real destination.
//! Includes the row-level demultiplexers for the three ways a source can
//! interleave mask and image samples.

mod matrix;
mod render;
mod scanlines;
mod splitter;

pub use matrix::ImageMatrix;
pub use render::{render_type3_image, ImageRenderer, MaskRenderer};
pub use scanlines::{Plane, ScanLineDemux};
pub use splitter::{split_chunky_row, validate_dimensions, InterleaveMode};
