//! Configuration module for birdclassr

mod settings;

pub use settings::{ConfigBuilder, PipelineConfig, DEFAULT_MAX_DURATION_SECS};
