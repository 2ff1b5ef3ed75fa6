//! Evolution configuration types for the painting search.
//!
//! A run is a schedule of stages. Each stage repeats the same generation recipe
//! (survive, breed, mutate, evaluate) for a fixed number of generations, which is
//! how coarse-to-fine annealing and genome growth/shrink phases are expressed.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{ConfigError, PointMutationConfig, Rgb};

/// Top-level configuration for an evolutionary painting run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Points per painting in the initial population.
    #[serde(default = "default_num_points")]
    pub num_points: usize,
    /// Number of paintings in the population.
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    /// Background color of the initial population.
    #[serde(default = "default_initial_background")]
    pub background: Rgb,
    /// Shrink never takes a genome below this many points.
    #[serde(default = "default_min_points")]
    pub min_points: usize,
    /// Stage schedule, executed in order.
    #[serde(default = "default_schedule")]
    pub stages: Vec<StageConfig>,
    /// Seed point mutation knobs.
    #[serde(default)]
    pub point_mutation: PointMutationConfig,
    /// Fitness metric.
    #[serde(default)]
    pub fitness: FitnessMetric,
    /// Output images and checkpoints.
    #[serde(default)]
    pub output: OutputConfig,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            num_points: default_num_points(),
            population_size: default_population_size(),
            background: default_initial_background(),
            min_points: default_min_points(),
            stages: default_schedule(),
            point_mutation: PointMutationConfig::default(),
            fitness: FitnessMetric::default(),
            output: OutputConfig::default(),
            random_seed: None,
        }
    }
}

fn default_num_points() -> usize {
    250
}
fn default_population_size() -> usize {
    250
}
fn default_initial_background() -> Rgb {
    [128, 128, 128]
}
fn default_min_points() -> usize {
    4
}

/// One phase of the schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageConfig {
    /// Human readable label used in logs.
    #[serde(default)]
    pub name: String,
    /// Number of generations to run this stage for.
    pub generations: usize,
    /// How many individuals survive into the next generation.
    #[serde(default)]
    pub survive: Survival,
    /// How parents are picked for breeding.
    #[serde(default)]
    pub parent_picker: ParentPicker,
    /// How two parents are combined into one offspring.
    #[serde(default)]
    pub combiner: Combiner,
    /// Mutation applied to every individual after breeding.
    pub mutation: MutationStep,
    /// Skip mutation for the best survivor.
    #[serde(default)]
    pub elitist: bool,
}

impl StageConfig {
    /// Crossover stage with point mutation.
    pub fn mate(name: &str, generations: usize, rate: f64, sigma: f64) -> Self {
        Self {
            name: name.to_string(),
            generations,
            survive: Survival::default(),
            parent_picker: ParentPicker::BestAndRandom,
            combiner: Combiner::Mate,
            mutation: MutationStep::Points { rate, sigma },
            elitist: false,
        }
    }

    /// Genome duplication stage: merges the best painting with random ones.
    pub fn merge(name: &str, generations: usize, rate: f64, sigma: f64) -> Self {
        Self {
            combiner: Combiner::Merge,
            ..Self::mate(name, generations, rate, sigma)
        }
    }

    /// Shrink stage: clones the single best painting and drops one point from each copy.
    pub fn shrink(name: &str, generations: usize) -> Self {
        Self {
            name: name.to_string(),
            generations,
            survive: Survival::Count(1),
            parent_picker: ParentPicker::Best,
            combiner: Combiner::Clone,
            mutation: MutationStep::Shrink,
            elitist: false,
        }
    }
}

/// Default schedule, tuned for 250 points and 250 individuals.
pub fn default_schedule() -> Vec<StageConfig> {
    vec![
        StageConfig::mate("coarse", 999, 0.05, 0.5),
        StageConfig::merge("duplicate", 1, 0.05, 0.5),
        StageConfig::mate("coarse", 899, 0.05, 0.5),
        StageConfig::shrink("shrink", 100),
        StageConfig::merge("duplicate", 1, 0.05, 0.5),
        StageConfig::mate("medium", 900, 0.03, 0.4),
        StageConfig::shrink("shrink", 100),
        StageConfig::mate("medium", 900, 0.03, 0.4),
        StageConfig::shrink("shrink", 100),
        StageConfig::mate("fine", 1000, 0.005, 0.4),
    ]
}

/// Survivor selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value")]
pub enum Survival {
    /// Keep the best `fraction` of the population (at least one).
    Fraction(f64),
    /// Keep the best `n` individuals.
    Count(usize),
}

impl Default for Survival {
    fn default() -> Self {
        Self::Fraction(0.025)
    }
}

impl Survival {
    /// Number of survivors out of `population` individuals.
    pub fn survivors(&self, population: usize) -> usize {
        let n = match *self {
            Self::Fraction(f) => (f * population as f64) as usize,
            Self::Count(n) => n,
        };
        n.clamp(1, population.max(1))
    }
}

/// Parent selection for breeding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ParentPicker {
    /// Best survivor paired with a random survivor.
    #[default]
    BestAndRandom,
    /// Best survivor twice.
    Best,
    /// Two random survivors.
    Random,
}

/// How parents produce one offspring.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Combiner {
    /// Uniform crossover, first child kept.
    #[default]
    Mate,
    /// Concatenate both genomes.
    Merge,
    /// Copy of the first parent.
    Clone,
}

/// Mutation applied after breeding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum MutationStep {
    /// Mutate `floor(rate * len)` distinct points with strength `sigma`.
    Points { rate: f64, sigma: f64 },
    /// Remove one random point.
    Shrink,
}

/// Pixel difference metric used as fitness (lower is better).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum FitnessMetric {
    /// Sum of absolute channel differences.
    #[default]
    AbsoluteDifference,
    /// Absolute difference normalized to 0-100.
    DifferencePercent,
}

/// Where and how often run artifacts are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output directory for renders and checkpoints.
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    /// Render scale for the per-generation image.
    #[serde(default = "default_render_scale")]
    pub render_scale: u32,
    /// Write the best render every N generations (0 = never).
    #[serde(default = "default_image_interval")]
    pub image_interval: usize,
    /// Write a population checkpoint every N generations (0 = never).
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            render_scale: default_render_scale(),
            image_interval: default_image_interval(),
            checkpoint_interval: default_checkpoint_interval(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}
fn default_render_scale() -> u32 {
    3
}
fn default_image_interval() -> usize {
    1
}
fn default_checkpoint_interval() -> usize {
    50
}

// ============================================================================
// Progress and Result Types
// ============================================================================

/// Progress update emitted after every generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionProgress {
    /// Generations completed over the whole run.
    pub generation: usize,
    /// Index of the running stage.
    pub stage_index: usize,
    /// Name of the running stage.
    pub stage_name: String,
    /// Generation within the running stage.
    pub stage_generation: usize,
    /// Total generations in the schedule.
    pub total_generations: usize,
    /// Best fitness of the current population.
    pub best_fitness: f64,
    /// Average fitness of the current population.
    pub avg_fitness: f64,
    /// Genome length of the best painting.
    pub num_points: usize,
    /// Id of the best candidate.
    pub best_id: u64,
}

/// Per-generation history for plotting.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvolutionHistory {
    /// Best fitness per generation.
    pub best_fitness: Vec<f64>,
    /// Average fitness per generation.
    pub avg_fitness: Vec<f64>,
    /// Genome length of the best painting per generation.
    pub num_points: Vec<usize>,
    /// Mean pairwise genome distance per generation.
    pub diversity: Vec<f64>,
}

/// Statistics from an evolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionStats {
    /// Generations run (including resumed ones).
    pub generations: usize,
    /// Fitness evaluations performed by this process.
    pub total_evaluations: u64,
    /// Best fitness achieved.
    pub best_fitness: f64,
    /// Average fitness of final population.
    pub final_avg_fitness: f64,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
    /// Reason for stopping.
    pub stop_reason: StopReason,
}

/// Final result of an evolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionResult {
    /// Statistics from the run.
    pub stats: EvolutionStats,
    /// Full history for analysis.
    pub history: EvolutionHistory,
}

/// Reason evolution stopped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Every stage of the schedule ran to completion.
    Completed,
    /// User cancelled.
    Cancelled,
}

// ============================================================================
// Validation
// ============================================================================

/// Evolution configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionConfigError {
    #[error("Population size must be at least 2")]
    PopulationTooSmall,
    #[error("Paintings need at least 3 points to form a bounded cell, got {0}")]
    TooFewPoints(usize),
    #[error("min_points ({min}) exceeds the initial genome length ({num_points})")]
    MinPointsTooLarge { min: usize, num_points: usize },
    #[error("Stage schedule is empty")]
    EmptySchedule,
    #[error("Stage {stage}: {reason}")]
    InvalidStage { stage: usize, reason: String },
    #[error("Render scale must be at least 1")]
    InvalidRenderScale,
    #[error("Mutation config validation failed: {0}")]
    MutationConfigError(#[from] ConfigError),
}

impl EvolutionConfig {
    /// Total generations across all stages.
    pub fn total_generations(&self) -> usize {
        self.stages.iter().map(|s| s.generations).sum()
    }

    /// Validate evolution configuration.
    pub fn validate(&self) -> Result<(), EvolutionConfigError> {
        self.point_mutation.validate()?;

        if self.population_size < 2 {
            return Err(EvolutionConfigError::PopulationTooSmall);
        }
        if self.num_points < 3 {
            return Err(EvolutionConfigError::TooFewPoints(self.num_points));
        }
        if self.min_points > self.num_points {
            return Err(EvolutionConfigError::MinPointsTooLarge {
                min: self.min_points,
                num_points: self.num_points,
            });
        }
        if self.stages.is_empty() {
            return Err(EvolutionConfigError::EmptySchedule);
        }
        if self.output.render_scale == 0 {
            return Err(EvolutionConfigError::InvalidRenderScale);
        }

        for (i, stage) in self.stages.iter().enumerate() {
            let invalid = |reason: String| EvolutionConfigError::InvalidStage { stage: i, reason };
            if let Survival::Fraction(f) = stage.survive
                && !(f > 0.0 && f <= 1.0)
            {
                return Err(invalid(format!("survive fraction {f} must be in (0, 1]")));
            }
            if let Survival::Count(0) = stage.survive {
                return Err(invalid("survive count must be positive".to_string()));
            }
            if let MutationStep::Points { rate, sigma } = stage.mutation {
                if !(0.0..=1.0).contains(&rate) {
                    return Err(invalid(format!("mutation rate {rate} must be in [0, 1]")));
                }
                if !sigma.is_finite() || sigma < 0.0 {
                    return Err(invalid(format!("sigma {sigma} must be non-negative")));
                }
            }
        }

        Ok(())
    }
}
