//! High-level detection module

pub mod config;
pub mod detector;

pub use config::{ConfigError, DetectionConfig};
pub use detector::{CycleReport, FrameDetector, export_json};
