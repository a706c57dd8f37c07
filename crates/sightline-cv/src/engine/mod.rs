//! Inference engine adapters
//!
//! Network execution itself lives outside this workspace. These adapters feed
//! the pipeline with recorded tensors or seeded synthetic ones.

pub mod replay;
pub mod synthetic;

pub use replay::ReplayEngine;
pub use synthetic::SyntheticEngine;

use crate::Result;
use crate::detection::config::ModelConfig;
use crate::source::Frame;
use crate::traits::InferenceEngine;
use serde::{Deserialize, Serialize};
use sightline_core::RawTensor;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineConfig {
    /// Tensors recorded as a JSON array, replayed in order and looped.
    Replay { path: PathBuf },
    /// Random candidates from a seeded generator.
    Synthetic {
        seed: u64,
        boxes: usize,
        /// Probability that a row carries a confident class score.
        hit_rate: f64,
        /// Class used for confident rows; random when absent.
        focus_class: Option<usize>,
    },
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig::Synthetic {
            seed: 7,
            boxes: 64,
            hit_rate: 0.05,
            focus_class: None,
        }
    }
}

/// Engine selected from an [`EngineConfig`]
#[derive(Debug)]
pub enum Engine {
    Replay(ReplayEngine),
    Synthetic(SyntheticEngine),
}

impl Engine {
    pub fn from_config(config: &EngineConfig, model: &ModelConfig) -> Result<Self> {
        let engine = match config {
            EngineConfig::Replay { path } => Engine::Replay(ReplayEngine::load(path)?),
            EngineConfig::Synthetic {
                seed,
                boxes,
                hit_rate,
                focus_class,
            } => Engine::Synthetic(SyntheticEngine::new(
                *seed,
                *boxes,
                *hit_rate,
                *focus_class,
                model,
            )?),
        };
        Ok(engine)
    }
}

impl InferenceEngine for Engine {
    fn name(&self) -> &str {
        match self {
            Engine::Replay(engine) => engine.name(),
            Engine::Synthetic(engine) => engine.name(),
        }
    }

    fn infer(&mut self, frame: &Frame) -> Result<RawTensor> {
        match self {
            Engine::Replay(engine) => engine.infer(frame),
            Engine::Synthetic(engine) => engine.infer(frame),
        }
    }
}
