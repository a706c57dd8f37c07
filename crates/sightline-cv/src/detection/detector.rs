//! Per-frame detection cycle

use super::config::DetectionConfig;
use crate::Result;
use crate::engine::Engine;
use crate::overlay::{self, OverlayItem};
use crate::source::{Frame, FrameProvider};
use crate::traits::{FrameSource, InferenceEngine, ReactionSink};
use anyhow::Context;
use log::{debug, warn};
use serde::{Serialize, Serializer};
use sightline_core::{
    ClassCatalog, ConfidenceThreshold, DecodeError, DetectionSet, DetectionStats,
    FrameDetectionState, RawTensor, TriggerOutcome, decode,
};
use std::path::Path;
use std::time::Instant;

/// What one cycle produced
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub frame_index: u64,
    /// Threshold snapshot used for the whole cycle.
    pub threshold: f32,
    pub detections: DetectionSet,
    pub stats: DetectionStats,
    /// Set when the tensor could not be decoded; the cycle then has no detections.
    #[serde(serialize_with = "serialize_decode_error")]
    pub decode_error: Option<DecodeError>,
    pub outcome: TriggerOutcome,
    pub overlay: Vec<OverlayItem>,
    pub processing_time_us: u64,
}

fn serialize_decode_error<S: Serializer>(
    error: &Option<DecodeError>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match error {
        Some(error) => serializer.serialize_some(&error.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Owns the mutable state of a running pipeline: threshold, trigger state
/// and the frame source and engine it pulls from.
pub struct FrameDetector<S = FrameProvider, E = Engine> {
    config: DetectionConfig,
    catalog: ClassCatalog,
    threshold: ConfidenceThreshold,
    state: FrameDetectionState,
    source: S,
    engine: E,
    cycles: u64,
}

impl FrameDetector {
    /// Build the source and engine named by the configuration.
    pub fn from_config(config: DetectionConfig) -> Result<Self> {
        let source = FrameProvider::from_config(
            &config.source,
            config.model.input_width,
            config.model.input_height,
        )
        .context("Failed to create frame source")?;
        let engine =
            Engine::from_config(&config.engine, &config.model).context("Failed to create engine")?;

        Self::new(config, source, engine)
    }
}

impl<S: FrameSource, E: InferenceEngine> FrameDetector<S, E> {
    pub fn new(config: DetectionConfig, source: S, engine: E) -> Result<Self> {
        let catalog = config.build_catalog()?;
        config.validate(&catalog)?;
        let rules = config.trigger_rules(&catalog)?;
        let threshold = ConfidenceThreshold::new(config.confidence_threshold)?;

        debug!(
            "Detector ready: {} classes, {}x{} input, {} trigger rules, engine '{}'",
            catalog.len(),
            config.model.input_width,
            config.model.input_height,
            rules.len(),
            engine.name()
        );

        Ok(Self {
            config,
            catalog,
            threshold,
            state: FrameDetectionState::new(rules),
            source,
            engine,
            cycles: 0,
        })
    }

    /// Acquire a frame, run inference and process the tensor.
    ///
    /// Source and engine failures are returned; decode failures are not, they
    /// show up as [`CycleReport::decode_error`].
    pub fn run_cycle(&mut self, sink: &mut dyn ReactionSink) -> Result<(Frame, CycleReport)> {
        let frame = self
            .source
            .next_frame()
            .context("Frame acquisition failed")?;
        let tensor = self
            .engine
            .infer(&frame)
            .with_context(|| format!("Inference failed on frame {}", frame.index))?;

        let report = self.process_tensor(frame.index, &tensor, sink);
        Ok((frame, report))
    }

    /// Decode a tensor, update trigger state and notify `sink`.
    pub fn process_tensor(
        &mut self,
        frame_index: u64,
        tensor: &RawTensor,
        sink: &mut dyn ReactionSink,
    ) -> CycleReport {
        let start_time = Instant::now();
        let threshold = self.threshold.get();
        let params = self.config.decode_params(threshold);

        let (detections, decode_error) = match decode(tensor, &params) {
            Ok(detections) => (detections, None),
            Err(error) => {
                warn!("Cycle {}: {}", self.cycles, error);
                (DetectionSet::new(), Some(error))
            }
        };

        let outcome = self.state.update(&detections);
        for update in &outcome.visibility {
            sink.set_visible(update);
        }
        for request in &outcome.spawns {
            sink.spawn(request);
        }

        let overlay = overlay::build_overlay(
            &detections,
            &self.catalog,
            threshold,
            self.config.visualization.max_outline_width,
        );

        let report = CycleReport {
            cycle: self.cycles,
            frame_index,
            threshold,
            stats: detections.stats(),
            detections,
            decode_error,
            outcome,
            overlay,
            processing_time_us: start_time.elapsed().as_micros() as u64,
        };
        self.cycles += 1;
        report
    }

    /// Draw the report's overlay onto its frame when box drawing is enabled.
    pub fn render(&self, frame: &mut Frame, report: &CycleReport) {
        if self.config.visualization.draw_boxes {
            overlay::draw_overlay(
                &mut frame.image,
                &report.overlay,
                self.config.visualization.max_outline_width,
            );
        }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ClassCatalog {
        &self.catalog
    }

    /// Handle for retuning the threshold between cycles.
    pub fn threshold(&self) -> &ConfidenceThreshold {
        &self.threshold
    }

    pub fn state(&self) -> &FrameDetectionState {
        &self.state
    }

    /// Return all spawn triggers to `Idle`.
    pub fn reset_triggers(&mut self) {
        self.state.reset();
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}

/// Write cycle reports as pretty JSON
pub fn export_json(reports: &[CycleReport], output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(reports).context("Failed to serialize cycle reports")?;

    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write JSON to: {:?}", output_path))?;

    Ok(())
}
