//! Staged generational search over a population of paintings.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::compute::fitness::{FitnessError, FitnessEvaluator};
use crate::compute::painting::{Painting, PaintingError, genome_distance};
use crate::compute::target::TargetImage;
use crate::schema::{
    Combiner, EvolutionConfig, EvolutionConfigError, EvolutionHistory, EvolutionProgress,
    EvolutionResult, EvolutionStats, MutationStep, ParentPicker, StageConfig, StopReason,
};

use super::checkpoint::{OutputWriter, PopulationCheckpoint, TargetInfo};
use super::rng::PaintingRng;

/// Errors raised while running or restoring a search.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] EvolutionConfigError),
    #[error(transparent)]
    Painting(#[from] PaintingError),
    #[error(transparent)]
    Fitness(#[from] FitnessError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Checkpoint format error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Checkpoint was taken on a {checkpoint:?} target, current target is {target:?}")]
    TargetMismatch {
        checkpoint: (u32, u32),
        target: (u32, u32),
    },
    #[error("Checkpoint holds no individuals")]
    EmptyCheckpoint,
    #[error("Checkpoint stage {stage_index} is past the end of a {stages}-stage schedule")]
    StageOutOfRange { stage_index: usize, stages: usize },
}

/// A candidate individual in the population.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Unique identifier.
    pub id: u64,
    /// The painting.
    pub painting: Painting,
    /// Fitness score, `None` until evaluated or after a mutation.
    pub fitness: Option<f64>,
    /// Generation created.
    pub generation: usize,
    /// Parent IDs.
    pub parents: Vec<u64>,
}

impl Candidate {
    fn sort_key(&self) -> f64 {
        self.fitness.unwrap_or(f64::INFINITY)
    }
}

/// Evolution engine that runs the stage schedule.
pub struct EvolutionEngine {
    config: EvolutionConfig,
    target: Arc<TargetImage>,
    rng: PaintingRng,
    evaluator: FitnessEvaluator,
    population: Vec<Candidate>,
    history: EvolutionHistory,
    generation: usize,
    stage_index: usize,
    stage_generation: usize,
    best_fitness: f64,
    evaluations: u64,
    next_id: Arc<AtomicU64>,
    cancelled: Arc<AtomicBool>,
    output: Option<OutputWriter>,
}

impl EvolutionEngine {
    /// Create a new evolution engine.
    pub fn new(config: EvolutionConfig, target: Arc<TargetImage>) -> Result<Self, EvolutionError> {
        config.validate()?;

        let seed = config.random_seed.unwrap_or_else(rand::random);
        log::info!("Random seed {seed}");
        let evaluator = FitnessEvaluator::new(config.fitness, Arc::clone(&target));

        Ok(Self {
            config,
            target,
            rng: PaintingRng::new(seed),
            evaluator,
            population: Vec::new(),
            history: EvolutionHistory::default(),
            generation: 0,
            stage_index: 0,
            stage_generation: 0,
            best_fitness: f64::INFINITY,
            evaluations: 0,
            next_id: Arc::new(AtomicU64::new(0)),
            cancelled: Arc::new(AtomicBool::new(false)),
            output: None,
        })
    }

    /// Restore a run from a checkpoint.
    ///
    /// Fitness is not stored in checkpoints; every restored individual is
    /// re-evaluated on the first generation.
    pub fn resume(
        config: EvolutionConfig,
        target: Arc<TargetImage>,
        checkpoint: PopulationCheckpoint,
    ) -> Result<Self, EvolutionError> {
        let mut engine = Self::new(config, target)?;
        engine.restore(checkpoint)?;
        Ok(engine)
    }

    /// Write renders and checkpoints while running.
    pub fn with_output(mut self, output: OutputWriter) -> Self {
        self.output = Some(output);
        self
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// Population, best first once evaluated.
    pub fn population(&self) -> &[Candidate] {
        &self.population
    }

    /// Best evaluated candidate of the current population.
    pub fn best(&self) -> Option<&Candidate> {
        self.population.first().filter(|c| c.fitness.is_some())
    }

    /// Generations completed.
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn history(&self) -> &EvolutionHistory {
        &self.history
    }

    /// Initialize the population with random paintings.
    pub fn initialize(&mut self) {
        self.population.clear();
        self.generation = 0;
        self.stage_index = 0;
        self.stage_generation = 0;

        for _ in 0..self.config.population_size {
            let painting = Painting::new(
                self.rng.rng_mut(),
                self.config.num_points,
                Arc::clone(&self.target),
                self.config.background,
            );
            self.population.push(self.candidate(painting, Vec::new()));
        }
    }

    fn restore(&mut self, checkpoint: PopulationCheckpoint) -> Result<(), EvolutionError> {
        let dims = (checkpoint.target.width, checkpoint.target.height);
        if dims != self.target.dimensions() {
            return Err(EvolutionError::TargetMismatch {
                checkpoint: dims,
                target: self.target.dimensions(),
            });
        }
        if checkpoint.individuals.is_empty() {
            return Err(EvolutionError::EmptyCheckpoint);
        }
        if checkpoint.stage_index > self.config.stages.len() {
            return Err(EvolutionError::StageOutOfRange {
                stage_index: checkpoint.stage_index,
                stages: self.config.stages.len(),
            });
        }
        if let (Some(saved), Some(current)) = (&checkpoint.target.path, self.target.source())
            && saved.as_path() != current
        {
            log::warn!(
                "Checkpoint was taken against {}, resuming against {}",
                saved.display(),
                current.display()
            );
        }

        self.generation = checkpoint.generation;
        self.stage_index = checkpoint.stage_index;
        self.stage_generation = checkpoint.stage_generation;
        self.population = checkpoint
            .individuals
            .into_iter()
            .map(|genome| -> Result<Candidate, EvolutionError> {
                let painting = Painting::from_genome(genome, Arc::clone(&self.target))?;
                Ok(self.candidate(painting, Vec::new()))
            })
            .collect::<Result<_, _>>()?;

        log::info!(
            "Resumed {} individuals at generation {} (stage {})",
            self.population.len(),
            self.generation,
            self.stage_index
        );
        Ok(())
    }

    /// Plain-data snapshot of the current population.
    pub fn snapshot(&self) -> PopulationCheckpoint {
        PopulationCheckpoint {
            generation: self.generation,
            stage_index: self.stage_index,
            stage_generation: self.stage_generation,
            target: TargetInfo {
                path: self.target.source().map(|p| p.to_path_buf()),
                width: self.target.width(),
                height: self.target.height(),
            },
            individuals: self
                .population
                .iter()
                .map(|c| c.painting.genome().clone())
                .collect(),
        }
    }

    fn candidate(&self, painting: Painting, parents: Vec<u64>) -> Candidate {
        Candidate {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            painting,
            fitness: None,
            generation: self.generation,
            parents,
        }
    }

    /// Score every candidate with unknown fitness, then sort best first.
    fn evaluate_population(&mut self) -> Result<(), FitnessError> {
        let evaluator = &self.evaluator;
        let pending = self.population.iter().filter(|c| c.fitness.is_none()).count();

        self.population
            .par_iter_mut()
            .filter(|candidate| candidate.fitness.is_none())
            .try_for_each(|candidate| {
                candidate.fitness = Some(evaluator.evaluate(&candidate.painting)?);
                Ok::<(), FitnessError>(())
            })?;

        self.evaluations += pending as u64;
        self.population
            .sort_by(|a, b| a.sort_key().total_cmp(&b.sort_key()));
        Ok(())
    }

    /// Run a single generation of `stage`.
    fn step_generation(&mut self, stage: &StageConfig) -> Result<(), EvolutionError> {
        let keep = stage.survive.survivors(self.population.len());
        self.population.truncate(keep);

        self.breed(stage);
        self.mutate(stage);
        self.evaluate_population()?;

        self.generation += 1;
        self.stage_generation += 1;
        self.record_history();
        Ok(())
    }

    /// Refill the population from the survivors.
    fn breed(&mut self, stage: &StageConfig) {
        let survivors = self.population.len();
        let size = self.config.population_size;
        let mut offspring = Vec::with_capacity(size.saturating_sub(survivors));

        while survivors + offspring.len() < size {
            let (i, j) = pick_parents(&mut self.rng, stage.parent_picker, survivors);
            let a = &self.population[i];
            let b = &self.population[j];

            let painting = match stage.combiner {
                Combiner::Mate => Painting::mate(&a.painting, &b.painting, self.rng.rng_mut()).0,
                Combiner::Merge => Painting::merge(&a.painting, &b.painting),
                Combiner::Clone => a.painting.clone(),
            };
            let parents = vec![a.id, b.id];
            offspring.push(self.candidate(painting, parents));
        }

        self.population.extend(offspring);
    }

    /// Mutate every individual (the best one is spared in elitist stages).
    fn mutate(&mut self, stage: &StageConfig) {
        let rngs: Vec<StdRng> = (0..self.population.len())
            .map(|_| self.rng.worker())
            .collect();
        let skip = usize::from(stage.elitist);
        let mutation = stage.mutation;
        let point_config = &self.config.point_mutation;
        let min_points = self.config.min_points;
        let floored = AtomicUsize::new(0);

        self.population
            .par_iter_mut()
            .zip(rngs)
            .skip(skip)
            .for_each(|(candidate, mut rng)| {
                let changed = match mutation {
                    MutationStep::Points { rate, sigma } => {
                        candidate
                            .painting
                            .mutate_points(&mut rng, rate, sigma, point_config)
                            > 0
                    }
                    MutationStep::Shrink if candidate.painting.num_points() > min_points => {
                        candidate.painting.shrink_points(&mut rng).is_ok()
                    }
                    MutationStep::Shrink => {
                        floored.fetch_add(1, Ordering::Relaxed);
                        false
                    }
                };
                if changed {
                    candidate.fitness = None;
                }
            });

        let floored = floored.into_inner();
        if floored > 0 {
            log::warn!("Shrink skipped for {floored} paintings already at {min_points} points");
        }
    }

    fn record_history(&mut self) {
        let Some(best) = self.population.first() else {
            return;
        };
        let best_fitness = best.sort_key();
        let num_points = best.painting.num_points();
        let diversity = self.compute_diversity();
        let avg_fitness = self.avg_fitness();

        self.best_fitness = self.best_fitness.min(best_fitness);
        self.history.best_fitness.push(best_fitness);
        self.history.avg_fitness.push(avg_fitness);
        self.history.num_points.push(num_points);
        self.history.diversity.push(diversity);
    }

    /// Mean genome distance from the best painting to every other one.
    fn compute_diversity(&self) -> f64 {
        let Some((best, rest)) = self.population.split_first() else {
            return 0.0;
        };
        if rest.is_empty() {
            return 0.0;
        }
        let best = best.painting.genome();
        rest.iter()
            .map(|c| genome_distance(best, c.painting.genome()))
            .sum::<f64>()
            / rest.len() as f64
    }

    fn avg_fitness(&self) -> f64 {
        let scores: Vec<f64> = self.population.iter().filter_map(|c| c.fitness).collect();
        if scores.is_empty() {
            return f64::INFINITY;
        }
        scores.iter().sum::<f64>() / scores.len() as f64
    }

    /// Get current progress.
    pub fn progress(&self) -> EvolutionProgress {
        let best = self.population.first();
        EvolutionProgress {
            generation: self.generation,
            stage_index: self.stage_index,
            stage_name: self
                .config
                .stages
                .get(self.stage_index)
                .map(|s| s.name.clone())
                .unwrap_or_default(),
            stage_generation: self.stage_generation,
            total_generations: self.config.total_generations(),
            best_fitness: best.map_or(f64::INFINITY, Candidate::sort_key),
            avg_fitness: self.avg_fitness(),
            num_points: best.map_or(0, |c| c.painting.num_points()),
            best_id: best.map_or(0, |c| c.id),
        }
    }

    /// Next stage to run, advancing past finished ones.
    fn current_stage(&mut self) -> Option<StageConfig> {
        loop {
            let stage = self.config.stages.get(self.stage_index)?;
            if self.stage_generation < stage.generations {
                if self.stage_generation == 0 {
                    log::info!(
                        "Stage {} '{}': {} generations",
                        self.stage_index,
                        stage.name,
                        stage.generations
                    );
                }
                return Some(stage.clone());
            }
            self.stage_index += 1;
            self.stage_generation = 0;
        }
    }

    /// Run the schedule with a progress callback.
    pub fn run_with_callback<F>(&mut self, callback: F) -> Result<EvolutionResult, EvolutionError>
    where
        F: Fn(&EvolutionProgress),
    {
        let start_time = std::time::Instant::now();
        let start_generation = self.generation;

        if self.population.is_empty() {
            self.initialize();
        }
        self.evaluate_population()?;
        if let Some(best) = self.population.first() {
            self.best_fitness = self.best_fitness.min(best.sort_key());
        }
        callback(&self.progress());

        let stop_reason = loop {
            if self.cancelled.load(Ordering::Relaxed) {
                break StopReason::Cancelled;
            }
            let Some(stage) = self.current_stage() else {
                break StopReason::Completed;
            };

            self.step_generation(&stage)?;

            let progress = self.progress();
            log::debug!(
                "Generation {} [{}]: best {:.0}, avg {:.0}, {} points",
                progress.generation,
                progress.stage_name,
                progress.best_fitness,
                progress.avg_fitness,
                progress.num_points
            );
            callback(&progress);

            if let Some(output) = &self.output {
                output.on_generation(self)?;
            }
        };

        let elapsed = start_time.elapsed().as_secs_f64();
        log::info!(
            "Stopped after {} generations ({:?}), best fitness {:.0}",
            self.generation - start_generation,
            stop_reason,
            self.best_fitness
        );

        Ok(EvolutionResult {
            stats: EvolutionStats {
                generations: self.generation,
                total_evaluations: self.evaluations,
                best_fitness: self.best_fitness,
                final_avg_fitness: self.avg_fitness(),
                elapsed_seconds: elapsed,
                stop_reason,
            },
            history: self.history.clone(),
        })
    }

    /// Run the schedule (blocking).
    pub fn run(&mut self) -> Result<EvolutionResult, EvolutionError> {
        self.run_with_callback(|_| {})
    }
}

/// Pick two survivor indices. Index 0 is the best survivor.
fn pick_parents(rng: &mut PaintingRng, picker: ParentPicker, survivors: usize) -> (usize, usize) {
    match picker {
        ParentPicker::BestAndRandom => (0, rng.index(survivors)),
        ParentPicker::Best => (0, 0),
        ParentPicker::Random => (rng.index(survivors), rng.index(survivors)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{OutputConfig, Survival};
    use image::{Rgba, RgbaImage};

    fn gradient_target() -> Arc<TargetImage> {
        let img = RgbaImage::from_fn(24, 24, |x, y| {
            Rgba([(x * 10) as u8, (y * 10) as u8, 128, 255])
        });
        Arc::new(TargetImage::new(img))
    }

    fn small_config(stages: Vec<StageConfig>) -> EvolutionConfig {
        EvolutionConfig {
            num_points: 12,
            population_size: 8,
            min_points: 4,
            stages,
            output: OutputConfig {
                image_interval: 0,
                checkpoint_interval: 0,
                ..Default::default()
            },
            random_seed: Some(42),
            ..Default::default()
        }
    }

    fn elitist(mut stage: StageConfig) -> StageConfig {
        stage.elitist = true;
        stage
    }

    #[test]
    fn test_evolution_engine_creation() {
        let mut engine =
            EvolutionEngine::new(small_config(vec![StageConfig::mate("a", 2, 0.5, 1.0)]), gradient_target())
                .unwrap();
        engine.initialize();

        assert_eq!(engine.population.len(), 8);
        assert!(engine.population.iter().all(|c| c.painting.num_points() == 12));
        assert!(engine.best().is_none());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EvolutionConfig {
            population_size: 1,
            ..small_config(vec![StageConfig::mate("a", 2, 0.5, 1.0)])
        };
        assert!(matches!(
            EvolutionEngine::new(config, gradient_target()),
            Err(EvolutionError::Config(EvolutionConfigError::PopulationTooSmall))
        ));
    }

    #[test]
    fn test_evolution_run() {
        let stages = vec![
            StageConfig::mate("mate", 3, 0.5, 1.0),
            StageConfig::merge("merge", 1, 0.1, 1.0),
            StageConfig::shrink("shrink", 2),
        ];
        let mut engine = EvolutionEngine::new(small_config(stages), gradient_target()).unwrap();
        let result = engine.run().unwrap();

        assert_eq!(result.stats.generations, 6);
        assert_eq!(result.stats.stop_reason, StopReason::Completed);
        assert_eq!(result.history.best_fitness.len(), 6);
        assert!(result.stats.best_fitness.is_finite());
        assert!(result.stats.total_evaluations >= 8);
        assert_eq!(engine.population.len(), 8);
    }

    #[test]
    fn test_elitist_best_never_regresses() {
        let stages = vec![elitist(StageConfig::mate("mate", 8, 0.5, 1.0))];
        let mut engine = EvolutionEngine::new(small_config(stages), gradient_target()).unwrap();
        let result = engine.run().unwrap();

        for pair in result.history.best_fitness.windows(2) {
            assert!(pair[1] <= pair[0]);
        }
    }

    #[test]
    fn test_merge_doubles_offspring() {
        let stages = vec![StageConfig::merge("merge", 1, 0.0, 0.0)];
        let mut engine = EvolutionEngine::new(small_config(stages), gradient_target()).unwrap();
        engine.run().unwrap();

        // Survive fraction 0.025 of 8 keeps one unmerged survivor
        let lengths: Vec<usize> = engine.population.iter().map(|c| c.painting.num_points()).collect();
        assert_eq!(lengths.iter().filter(|&&n| n == 24).count(), 7);
        assert_eq!(lengths.iter().filter(|&&n| n == 12).count(), 1);
    }

    #[test]
    fn test_shrink_respects_floor() {
        let config = EvolutionConfig {
            num_points: 6,
            ..small_config(vec![StageConfig::shrink("shrink", 5)])
        };
        let mut engine = EvolutionEngine::new(config, gradient_target()).unwrap();
        let result = engine.run().unwrap();

        assert!(engine.population.iter().all(|c| c.painting.num_points() == 4));
        assert_eq!(result.history.num_points, vec![5, 4, 4, 4, 4]);
    }

    #[test]
    fn test_cancellation() {
        let mut engine =
            EvolutionEngine::new(small_config(vec![StageConfig::mate("a", 100, 0.5, 1.0)]), gradient_target())
                .unwrap();
        let cancel = engine.cancel_handle();

        // Cancel immediately
        cancel.store(true, Ordering::Relaxed);

        let result = engine.run().unwrap();
        assert_eq!(result.stats.stop_reason, StopReason::Cancelled);
        assert_eq!(result.stats.generations, 0);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let stages = vec![
            StageConfig::mate("mate", 3, 0.5, 1.0),
            StageConfig::shrink("shrink", 1),
        ];
        let mut a = EvolutionEngine::new(small_config(stages.clone()), gradient_target()).unwrap();
        let mut b = EvolutionEngine::new(small_config(stages), gradient_target()).unwrap();
        let ra = a.run().unwrap();
        let rb = b.run().unwrap();

        assert_eq!(ra.history.best_fitness, rb.history.best_fitness);
        assert_eq!(
            a.best().unwrap().painting.genome(),
            b.best().unwrap().painting.genome()
        );
    }

    #[test]
    fn test_resume_continues_schedule() {
        let stages = vec![StageConfig::mate("mate", 4, 0.5, 1.0)];
        let mut engine = EvolutionEngine::new(small_config(stages.clone()), gradient_target()).unwrap();
        engine.initialize();
        engine.evaluate_population().unwrap();
        let stage = engine.current_stage().unwrap();
        engine.step_generation(&stage).unwrap();
        engine.step_generation(&stage).unwrap();

        let checkpoint = engine.snapshot();
        assert_eq!(checkpoint.generation, 2);
        assert_eq!(checkpoint.stage_generation, 2);

        let mut resumed =
            EvolutionEngine::resume(small_config(stages), gradient_target(), checkpoint).unwrap();
        assert_eq!(resumed.generation(), 2);
        let result = resumed.run().unwrap();
        assert_eq!(result.stats.generations, 4);
        assert_eq!(result.history.best_fitness.len(), 2);
    }

    #[test]
    fn test_resume_rejects_other_target() {
        let mut engine =
            EvolutionEngine::new(small_config(vec![StageConfig::mate("a", 1, 0.5, 1.0)]), gradient_target())
                .unwrap();
        engine.initialize();
        let checkpoint = engine.snapshot();

        let other = Arc::new(TargetImage::new(RgbaImage::new(10, 10)));
        let err = EvolutionEngine::resume(
            small_config(vec![StageConfig::mate("a", 1, 0.5, 1.0)]),
            other,
            checkpoint,
        )
        .err()
        .unwrap();
        assert!(matches!(err, EvolutionError::TargetMismatch { .. }));
    }

    #[test]
    fn test_pick_parents() {
        let mut rng = PaintingRng::new(1);
        assert_eq!(pick_parents(&mut rng, ParentPicker::Best, 5), (0, 0));
        let (a, b) = pick_parents(&mut rng, ParentPicker::BestAndRandom, 5);
        assert_eq!(a, 0);
        assert!(b < 5);
        let (a, b) = pick_parents(&mut rng, ParentPicker::Random, 1);
        assert_eq!((a, b), (0, 0));
    }

    #[test]
    fn test_survival_count_keeps_population_size() {
        let mut stage = StageConfig::mate("mate", 2, 0.2, 1.0);
        stage.survive = Survival::Count(3);
        let mut engine = EvolutionEngine::new(small_config(vec![stage]), gradient_target()).unwrap();
        engine.run().unwrap();
        assert_eq!(engine.population.len(), 8);
        assert!(engine.population.iter().all(|c| c.fitness.is_some()));
    }
}
