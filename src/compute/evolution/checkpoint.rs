//! Population checkpoints and per-generation renders.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::compute::painting::{Painting, PaintingGenome};
use crate::schema::OutputConfig;

use super::search::{EvolutionEngine, EvolutionError};

/// Target the checkpointed population was evolving toward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetInfo {
    /// Image file, when the target was loaded from disk.
    #[serde(default)]
    pub path: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
}

/// Everything needed to continue a run: schedule position and every genome.
///
/// The target pixels are not duplicated into the file; it records where they
/// came from and checks the canvas size on resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationCheckpoint {
    /// Generations completed.
    pub generation: usize,
    /// Stage being run.
    pub stage_index: usize,
    /// Generations completed within that stage.
    pub stage_generation: usize,
    /// Target description.
    pub target: TargetInfo,
    /// Population genomes, best first.
    pub individuals: Vec<PaintingGenome>,
}

impl PopulationCheckpoint {
    /// Save as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), EvolutionError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, EvolutionError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Writes the best render and population checkpoints at fixed intervals.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    dir: PathBuf,
    render_scale: u32,
    image_interval: usize,
    checkpoint_interval: usize,
}

impl OutputWriter {
    /// Create the writer, creating the output directory if needed.
    pub fn new(config: &OutputConfig) -> std::io::Result<Self> {
        fs::create_dir_all(&config.dir)?;
        Ok(Self {
            dir: config.dir.clone(),
            render_scale: config.render_scale.max(1),
            image_interval: config.image_interval,
            checkpoint_interval: config.checkpoint_interval,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the render written after `generation`.
    pub fn image_path(&self, generation: usize) -> PathBuf {
        self.dir.join(format!("drawing_{generation:05}.png"))
    }

    /// Path of the checkpoint written after `generation`.
    pub fn checkpoint_path(&self, generation: usize) -> PathBuf {
        self.dir.join(format!("checkpoint_{generation:05}.json"))
    }

    /// Render `painting` at the configured scale and save it as PNG.
    pub fn save_render(&self, painting: &Painting, generation: usize) -> Result<PathBuf, EvolutionError> {
        let path = self.image_path(generation);
        painting.render(self.render_scale).save(&path)?;
        Ok(path)
    }

    /// Write whatever is due after the engine's latest generation.
    pub fn on_generation(&self, engine: &EvolutionEngine) -> Result<(), EvolutionError> {
        let generation = engine.generation();

        if is_due(generation, self.image_interval)
            && let Some(best) = engine.best()
        {
            let path = self.save_render(&best.painting, generation)?;
            log::debug!("Wrote {}", path.display());
        }

        if is_due(generation, self.checkpoint_interval) {
            let path = self.checkpoint_path(generation);
            engine.snapshot().save(&path)?;
            log::info!("Checkpoint written to {}", path.display());
        }

        Ok(())
    }
}

fn is_due(generation: usize, interval: usize) -> bool {
    interval > 0 && generation % interval == 0
}
