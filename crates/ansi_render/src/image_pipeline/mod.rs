mod geometry;
mod sampler;

pub use geometry::{CellWindow, GridGeometry};
pub use sampler::{SourceImage, SourceImageError};
