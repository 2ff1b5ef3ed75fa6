//! Fitness scoring: pixel difference between a rendered painting and the target.
//!
//! Lower is better; 0 means pixel-identical.

use std::sync::Arc;

use image::RgbaImage;

use super::painting::Painting;
use super::target::TargetImage;
use crate::schema::FitnessMetric;

/// Fitness errors.
#[derive(Debug, thiserror::Error)]
pub enum FitnessError {
    #[error("Image sizes differ: {left:?} vs {right:?}")]
    SizeMismatch { left: (u32, u32), right: (u32, u32) },
}

fn check_sizes(a: &RgbaImage, b: &RgbaImage) -> Result<(), FitnessError> {
    if a.dimensions() != b.dimensions() {
        return Err(FitnessError::SizeMismatch {
            left: a.dimensions(),
            right: b.dimensions(),
        });
    }
    Ok(())
}

/// Sum of absolute differences over every pixel and all four RGBA channels.
pub fn pixel_difference(a: &RgbaImage, b: &RgbaImage) -> Result<f64, FitnessError> {
    check_sizes(a, b)?;
    let sum: u64 = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(&x, &y)| x.abs_diff(y) as u64)
        .sum();
    Ok(sum as f64)
}

/// [`pixel_difference`] normalized to `[0, 100]`.
pub fn difference_percent(a: &RgbaImage, b: &RgbaImage) -> Result<f64, FitnessError> {
    let diff = pixel_difference(a, b)?;
    let samples = a.as_raw().len();
    if samples == 0 {
        return Ok(0.0);
    }
    Ok(diff / (255.0 * samples as f64) * 100.0)
}

/// Compare two rasters with the given metric.
pub fn measure(metric: FitnessMetric, a: &RgbaImage, b: &RgbaImage) -> Result<f64, FitnessError> {
    match metric {
        FitnessMetric::AbsoluteDifference => pixel_difference(a, b),
        FitnessMetric::DifferencePercent => difference_percent(a, b),
    }
}

/// Scores paintings against a shared target.
#[derive(Debug, Clone)]
pub struct FitnessEvaluator {
    metric: FitnessMetric,
    target: Arc<TargetImage>,
}

impl FitnessEvaluator {
    /// Create a new fitness evaluator.
    pub fn new(metric: FitnessMetric, target: Arc<TargetImage>) -> Self {
        Self { metric, target }
    }

    /// Render at native resolution and compare with the target.
    pub fn evaluate(&self, painting: &Painting) -> Result<f64, FitnessError> {
        let rendered = painting.render(1);
        measure(self.metric, &rendered, self.target.pixels())
    }

    pub fn metric(&self) -> FitnessMetric {
        self.metric
    }

    pub fn target(&self) -> &Arc<TargetImage> {
        &self.target
    }
}
