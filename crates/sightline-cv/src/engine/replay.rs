use crate::Result;
use crate::source::Frame;
use crate::traits::InferenceEngine;
use anyhow::{Context, bail};
use log::info;
use sightline_core::RawTensor;
use std::fs;
use std::path::Path;

/// Replays recorded tensors, one per cycle, looping at the end.
#[derive(Debug, Clone)]
pub struct ReplayEngine {
    tensors: Vec<RawTensor>,
    cursor: usize,
}

impl ReplayEngine {
    pub fn from_tensors(tensors: Vec<RawTensor>) -> Result<Self> {
        if tensors.is_empty() {
            bail!("Replay engine needs at least one tensor");
        }
        Ok(Self { tensors, cursor: 0 })
    }

    /// Load a JSON array of tensors.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read tensor recording: {:?}", path))?;
        let tensors: Vec<RawTensor> = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse tensor recording: {:?}", path))?;

        info!("Loaded {} recorded tensors from {:?}", tensors.len(), path);
        Self::from_tensors(tensors)
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }
}

impl InferenceEngine for ReplayEngine {
    fn name(&self) -> &str {
        "replay"
    }

    fn infer(&mut self, _frame: &Frame) -> Result<RawTensor> {
        let tensor = self.tensors[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.tensors.len();
        Ok(tensor)
    }
}
