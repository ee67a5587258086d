//! Shared data model, bit/byte primitives, and the chunky/planar raster
//! devices underlying the raster graphics engine workspace.

pub mod buffer;
pub mod chunky;
pub mod color;
pub mod compress;
pub mod config;
pub mod depth;
pub mod device;
pub mod error;
pub mod plane;
pub mod planar;
pub mod rect;
pub mod sample;
pub mod tile;

pub use chunky::ChunkyDevice;
pub use color::{Cmyk, ColorIndex, DeviceColor, DevnColor, Palette, Rgb};
pub use config::{load_from, ConfigFile, EngineLimits};
pub use depth::{Align, Depth};
pub use device::{GetBitsOptions, GetBitsParams, RasterDevice};
pub use error::{RasterError, RasterResult};
pub use plane::{validate_planes, PlaneDescriptor};
pub use planar::PlanarDevice;
pub use rect::Rect;
pub use tile::StripBitmap;
