//! Compute module - Painting genome, rendering and scoring.

mod fitness;
mod painting;
mod point;
mod render;
mod target;
mod voronoi;

pub mod evolution;

pub use fitness::*;
pub use painting::*;
pub use point::*;
pub use render::*;
pub use target::*;
pub use voronoi::*;
