//! Colored seed points, the genes of a painting.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::schema::{OPAQUE, PointMutationConfig, Rgba};

/// A single Voronoi site with its fill color.
///
/// Coordinates live on the integer pixel lattice and are not bounded by the
/// canvas: shift mutations may carry a point off-canvas permanently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeedPoint {
    /// Position (x, y) in canvas pixels.
    pub position: (i32, i32),
    /// Fill color, alpha is fixed at creation.
    pub color: Rgba,
}

/// Which of the two mutations a call to [`SeedPoint::mutate`] applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointMutation {
    Shift,
    Color,
}

impl SeedPoint {
    /// Create a point from explicit parts.
    pub fn new(position: (i32, i32), color: Rgba) -> Self {
        Self { position, color }
    }

    /// Random opaque point anywhere on a `width` x `height` canvas (edges inclusive).
    pub fn random<R: Rng + ?Sized>(rng: &mut R, width: u32, height: u32) -> Self {
        let x = rng.gen_range(0..=width as i64) as i32;
        let y = rng.gen_range(0..=height as i64) as i32;
        Self {
            position: (x, y),
            color: [rng.r#gen(), rng.r#gen(), rng.r#gen(), OPAQUE],
        }
    }

    /// Apply exactly one shift or color mutation in place.
    pub fn mutate<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        sigma: f64,
        config: &PointMutationConfig,
    ) -> PointMutation {
        let roll = rng.gen_range(0..config.total_weight().max(1));
        if roll < config.shift_weight {
            let dx = scaled_delta(rng, config.shift_range, sigma);
            let dy = scaled_delta(rng, config.shift_range, sigma);
            self.position = (
                self.position.0.saturating_add(dx),
                self.position.1.saturating_add(dy),
            );
            PointMutation::Shift
        } else {
            for channel in &mut self.color[..3] {
                let delta = scaled_delta(rng, config.color_range, sigma);
                *channel = (*channel as i32).saturating_add(delta).clamp(0, 255) as u8;
            }
            PointMutation::Color
        }
    }
}

/// Uniform integer in `[-range, range]` scaled by sigma, truncated toward zero.
fn scaled_delta<R: Rng + ?Sized>(rng: &mut R, range: i32, sigma: f64) -> i32 {
    let range = range.max(0);
    (rng.gen_range(-range..=range) as f64 * sigma) as i32
}
