//! Voronoi Painter - Evolve Voronoi diagrams that approximate an image.
//!
//! A painting is a list of colored seed points. Rendering partitions the
//! canvas into Voronoi cells and fills every bounded cell with its seed's
//! color. A staged genetic algorithm (mutation, crossover, genome duplication
//! and shrinking) minimizes the pixel difference to a target image.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Configuration types for mutation and the evolution schedule
//! - `compute`: Seed points, Voronoi partition, rendering, fitness and the
//!   evolutionary driver
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rand::SeedableRng;
//! use voronoi_painter::{
//!     compute::{Painting, TargetImage},
//!     schema::PointMutationConfig,
//! };
//!
//! let target = Arc::new(TargetImage::open("target.png")?);
//! let mut rng = rand::rngs::StdRng::seed_from_u64(1);
//!
//! let painting = Painting::new(&mut rng, 250, target, [128, 128, 128]);
//! let child = painting.mutated(&mut rng, 0.05, 0.5, &PointMutationConfig::default());
//!
//! println!("Parent: {:.0}, child: {:.0}", painting.score(), child.score());
//! child.render(3).save("child.png")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::{Painting, SeedPoint, TargetImage};
pub use schema::{EvolutionConfig, PointMutationConfig};
