//! Schema module - Configuration and report types for painting evolution.

mod config;
mod evolution;

pub use config::*;
pub use evolution::*;
