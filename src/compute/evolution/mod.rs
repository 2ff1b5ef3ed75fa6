//! Evolutionary driver for Voronoi paintings.
//!
//! A run evolves a population of [`Painting`](crate::compute::Painting)s
//! toward a target image through a schedule of stages (see
//! [`StageConfig`](crate::schema::StageConfig)).
//!
//! - **Random source** (`rng`): one seeded stream, per-worker generators
//! - **Engine** (`search`): survive, breed, mutate, evaluate
//! - **Checkpoints** (`checkpoint`): JSON population snapshots and PNG renders
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use voronoi_painter::compute::TargetImage;
//! use voronoi_painter::compute::evolution::{EvolutionEngine, OutputWriter};
//! use voronoi_painter::schema::EvolutionConfig;
//!
//! let target = Arc::new(TargetImage::open("target.png")?);
//! let config = EvolutionConfig::default();
//! let output = OutputWriter::new(&config.output)?;
//!
//! let mut engine = EvolutionEngine::new(config, target)?.with_output(output);
//! let result = engine.run_with_callback(|progress| {
//!     println!("Generation {}: best fitness = {:.0}",
//!         progress.generation, progress.best_fitness);
//! })?;
//! println!("Best fitness: {:.0}", result.stats.best_fitness);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod checkpoint;
mod rng;
mod search;

pub use checkpoint::{OutputWriter, PopulationCheckpoint, TargetInfo};
pub use rng::PaintingRng;
pub use search::{Candidate, EvolutionEngine, EvolutionError};
