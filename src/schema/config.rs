//! Configuration types for seed point mutation and painting colors.

use serde::{Deserialize, Serialize};

/// RGB color without alpha (background colors).
pub type Rgb = [u8; 3];

/// RGBA color (seed point colors).
pub type Rgba = [u8; 4];

/// Background used when a stored genome does not carry one.
pub const DEFAULT_BACKGROUND: Rgb = [0, 0, 0];

/// Alpha assigned to every seed point at creation.
pub const OPAQUE: u8 = 255;

/// Default background helper for serde.
pub fn default_background() -> Rgb {
    DEFAULT_BACKGROUND
}

/// Knobs for a single seed point mutation.
///
/// A mutation is either a *shift* (both coordinates move) or a *color* change
/// (all three color channels move). Deltas are drawn uniformly from
/// `[-range, range]` and then scaled by the caller's `sigma`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PointMutationConfig {
    /// Relative weight of the shift mutation.
    #[serde(default = "default_shift_weight")]
    pub shift_weight: u32,
    /// Relative weight of the color mutation.
    #[serde(default = "default_color_weight")]
    pub color_weight: u32,
    /// Maximum coordinate delta before sigma scaling.
    #[serde(default = "default_shift_range")]
    pub shift_range: i32,
    /// Maximum channel delta before sigma scaling.
    #[serde(default = "default_color_range")]
    pub color_range: i32,
}

impl Default for PointMutationConfig {
    fn default() -> Self {
        Self {
            shift_weight: default_shift_weight(),
            color_weight: default_color_weight(),
            shift_range: default_shift_range(),
            color_range: default_color_range(),
        }
    }
}

fn default_shift_weight() -> u32 {
    50
}
fn default_color_weight() -> u32 {
    50
}
fn default_shift_range() -> i32 {
    10
}
fn default_color_range() -> i32 {
    25
}

impl PointMutationConfig {
    /// Sum of both mutation weights.
    #[inline]
    pub fn total_weight(&self) -> u32 {
        self.shift_weight.saturating_add(self.color_weight)
    }

    /// Validate mutation parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_weight() == 0 {
            return Err(ConfigError::ZeroMutationWeights);
        }
        if self.shift_range < 0 {
            return Err(ConfigError::NegativeRange {
                name: "shift_range",
                value: self.shift_range,
            });
        }
        if self.color_range < 0 {
            return Err(ConfigError::NegativeRange {
                name: "color_range",
                value: self.color_range,
            });
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Shift and color mutation weights cannot both be zero")]
    ZeroMutationWeights,
    #[error("Mutation range {name} must be non-negative, got {value}")]
    NegativeRange { name: &'static str, value: i32 },
}
