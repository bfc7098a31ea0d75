//! Core domain models for the runner
//!
//! This module defines the pipeline, step and configuration data
//! structures together with the results a run produces.

pub mod config;
pub mod pipeline;
pub mod state;
pub mod step;

pub use config::{Config, ConfigError};
pub use pipeline::*;
pub use state::*;
pub use step::*;
