//! Painting genome and its genetic operators.
//!
//! A painting is an ordered list of colored seed points over a solid
//! background. Its canvas size is pinned to the shared target image for its
//! whole lifetime.
//!
//! Every operator comes in two forms: in-place (`mutate_points`,
//! `shrink_points`) and value-returning (`mutated`, `shrunk`, `mate`,
//! `merge`). Offspring always own their point lists; nothing is aliased
//! between parent and child.

use std::sync::Arc;

use image::RgbaImage;
use rand::Rng;
use rand::seq::index;
use serde::{Deserialize, Serialize};

use super::fitness::{FitnessError, pixel_difference};
use super::point::SeedPoint;
use super::render::render_points;
use super::target::TargetImage;
use crate::schema::{PointMutationConfig, Rgb, default_background};

/// Painting errors.
#[derive(Debug, thiserror::Error)]
pub enum PaintingError {
    #[error("Cannot shrink an empty genome")]
    EmptyGenome,
    #[error("Genome canvas {genome:?} does not match target {target:?}")]
    DimensionMismatch { genome: (u32, u32), target: (u32, u32) },
    #[error(transparent)]
    Fitness(#[from] FitnessError),
}

/// Plain-data part of a painting, used for checkpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaintingGenome {
    /// Seed points in compositing order.
    pub points: Vec<SeedPoint>,
    /// Background color (opaque).
    #[serde(default = "default_background")]
    pub background: Rgb,
    /// Canvas width, equal to the target's.
    pub width: u32,
    /// Canvas height, equal to the target's.
    pub height: u32,
}

/// A genome bound to the target image it is evolving toward.
#[derive(Debug, Clone)]
pub struct Painting {
    genome: PaintingGenome,
    target: Arc<TargetImage>,
}

impl Painting {
    /// Random painting with `num_points` points spread over the target's canvas.
    pub fn new<R: Rng + ?Sized>(
        rng: &mut R,
        num_points: usize,
        target: Arc<TargetImage>,
        background: Rgb,
    ) -> Self {
        let (width, height) = target.dimensions();
        let points = (0..num_points)
            .map(|_| SeedPoint::random(rng, width, height))
            .collect();
        Self {
            genome: PaintingGenome {
                points,
                background,
                width,
                height,
            },
            target,
        }
    }

    /// Painting without points, to be filled by crossover or merge.
    pub fn empty(target: Arc<TargetImage>, background: Rgb) -> Self {
        let (width, height) = target.dimensions();
        Self {
            genome: PaintingGenome {
                points: Vec::new(),
                background,
                width,
                height,
            },
            target,
        }
    }

    /// Rebind a stored genome to a target, checking the canvas size.
    pub fn from_genome(
        genome: PaintingGenome,
        target: Arc<TargetImage>,
    ) -> Result<Self, PaintingError> {
        if (genome.width, genome.height) != target.dimensions() {
            return Err(PaintingError::DimensionMismatch {
                genome: (genome.width, genome.height),
                target: target.dimensions(),
            });
        }
        Ok(Self { genome, target })
    }

    pub fn genome(&self) -> &PaintingGenome {
        &self.genome
    }

    pub fn into_genome(self) -> PaintingGenome {
        self.genome
    }

    pub fn points(&self) -> &[SeedPoint] {
        &self.genome.points
    }

    /// Genome length.
    #[inline]
    pub fn num_points(&self) -> usize {
        self.genome.points.len()
    }

    #[inline]
    pub fn background_color(&self) -> Rgb {
        self.genome.background
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.genome.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.genome.height
    }

    pub fn target(&self) -> &Arc<TargetImage> {
        &self.target
    }

    /// Mutate `floor(rate * len)` distinct, randomly chosen points in place.
    ///
    /// Returns the number of points mutated.
    pub fn mutate_points<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        rate: f64,
        sigma: f64,
        config: &PointMutationConfig,
    ) -> usize {
        let len = self.num_points();
        let count = ((rate * len as f64) as usize).min(len);
        for i in index::sample(rng, len, count).into_iter() {
            self.genome.points[i].mutate(rng, sigma, config);
        }
        count
    }

    /// Copy of this painting with `mutate_points` applied.
    pub fn mutated<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        rate: f64,
        sigma: f64,
        config: &PointMutationConfig,
    ) -> Self {
        let mut child = self.clone();
        child.mutate_points(rng, rate, sigma, config);
        child
    }

    /// Remove one uniformly chosen point and return it.
    pub fn shrink_points<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<SeedPoint, PaintingError> {
        if self.genome.points.is_empty() {
            return Err(PaintingError::EmptyGenome);
        }
        let i = rng.gen_range(0..self.genome.points.len());
        Ok(self.genome.points.remove(i))
    }

    /// Copy of this painting with one point removed.
    pub fn shrunk<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Self, PaintingError> {
        let mut child = self.clone();
        child.shrink_points(rng)?;
        Ok(child)
    }

    /// Whether `mate` can perform a real crossover.
    pub fn can_mate(a: &Painting, b: &Painting) -> bool {
        a.num_points() == b.num_points() && a.width() == b.width() && a.height() == b.height()
    }

    /// Uniform crossover producing two children.
    ///
    /// For every index the two children receive the parents' points at that
    /// index, in random order. Parents of different length or canvas size
    /// cannot be crossed: both children are then copies of the longer parent
    /// (the second one on ties).
    pub fn mate<R: Rng + ?Sized>(a: &Painting, b: &Painting, rng: &mut R) -> (Painting, Painting) {
        if !Self::can_mate(a, b) {
            log::warn!(
                "Crossover of incompatible parents ({} points {}x{} vs {} points {}x{}), cloning the longer one",
                a.num_points(),
                a.width(),
                a.height(),
                b.num_points(),
                b.width(),
                b.height()
            );
            let longer = if a.num_points() > b.num_points() { a } else { b };
            return (longer.clone(), longer.clone());
        }

        let background = average_background(a.background_color(), b.background_color());
        let mut child_a = Painting::empty(Arc::clone(&a.target), background);
        let mut child_b = Painting::empty(Arc::clone(&a.target), background);
        child_a.genome.points.reserve(a.num_points());
        child_b.genome.points.reserve(b.num_points());

        for (&pa, &pb) in a.points().iter().zip(b.points()) {
            let (first, second) = if rng.gen_bool(0.5) { (pa, pb) } else { (pb, pa) };
            child_a.genome.points.push(first);
            child_b.genome.points.push(second);
        }

        (child_a, child_b)
    }

    /// Genome duplication: all of `a`'s points followed by all of `b`'s.
    pub fn merge(a: &Painting, b: &Painting) -> Painting {
        let background = average_background(a.background_color(), b.background_color());
        let mut merged = Painting::empty(Arc::clone(&a.target), background);
        merged.genome.points = a.points().iter().chain(b.points()).copied().collect();
        merged
    }

    /// Render the painting, upscaled by `scale`.
    pub fn render(&self, scale: u32) -> RgbaImage {
        render_points(
            &self.genome.points,
            self.genome.background,
            self.genome.width,
            self.genome.height,
            scale,
        )
    }

    /// Pixel difference between the native-resolution render and the shared target.
    pub fn score(&self) -> f64 {
        // Canvas size is pinned to the target at construction
        pixel_difference(&self.render(1), self.target.pixels()).unwrap_or(f64::INFINITY)
    }

    /// Pixel difference against an arbitrary target.
    pub fn score_against(&self, target: &TargetImage) -> Result<f64, PaintingError> {
        if self.target.dimensions() != target.dimensions() {
            return Err(PaintingError::DimensionMismatch {
                genome: (self.width(), self.height()),
                target: target.dimensions(),
            });
        }
        Ok(pixel_difference(&self.render(1), target.pixels())?)
    }
}

/// Component-wise integer average, rounded toward zero.
fn average_background(a: Rgb, b: Rgb) -> Rgb {
    [0, 1, 2].map(|i| ((a[i] as u16 + b[i] as u16) / 2) as u8)
}

/// Genetic distance between two genomes.
///
/// Points are compared index by index over the common prefix (L1 over x, y
/// and the three color channels); every unmatched point costs 255. The total
/// is divided by the longer genome's length.
pub fn genome_distance(a: &PaintingGenome, b: &PaintingGenome) -> f64 {
    let longest = a.points.len().max(b.points.len());
    if longest == 0 {
        return 0.0;
    }

    let matched: f64 = a
        .points
        .iter()
        .zip(&b.points)
        .map(|(p, q)| {
            let dx = (p.position.0 as f64 - q.position.0 as f64).abs();
            let dy = (p.position.1 as f64 - q.position.1 as f64).abs();
            let dc: f64 = (0..3)
                .map(|c| p.color[c].abs_diff(q.color[c]) as f64)
                .sum();
            dx + dy + dc
        })
        .sum();
    let unmatched = a.points.len().abs_diff(b.points.len()) as f64 * 255.0;

    (matched + unmatched) / longest as f64
}
