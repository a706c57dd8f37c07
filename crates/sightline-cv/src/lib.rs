//! Sightline pipeline library
//!
//! Runs the per-frame cycle around the pure decoder in `sightline-core`:
//! frame acquisition, inference, decoding, trigger updates and overlay output.

pub mod detection;
pub mod engine;
pub mod overlay;
pub mod reactions;
pub mod source;
pub mod utils;

// Re-export commonly used types
pub use detection::{CycleReport, DetectionConfig, FrameDetector};
pub use engine::{Engine, ReplayEngine, SyntheticEngine};
pub use overlay::OverlayItem;
pub use reactions::{LogSink, RecordingSink};
pub use source::{Frame, FrameProvider};

// Error handling
pub type Result<T> = anyhow::Result<T>;

/// Seams between the pipeline and its collaborators
pub mod traits {
    use super::*;
    use sightline_core::{RawTensor, SpawnRequest, VisibilityUpdate};

    /// Supplies one frame per cycle at the model's input resolution.
    pub trait FrameSource {
        fn next_frame(&mut self) -> Result<Frame>;
    }

    /// Runs the network on a frame.
    ///
    /// The call blocks until the whole tensor is written; the decoder never
    /// sees a partially filled buffer.
    pub trait InferenceEngine {
        fn name(&self) -> &str;
        fn infer(&mut self, frame: &Frame) -> Result<RawTensor>;
    }

    /// Receives the reactions of each cycle (UI toggles, entity creation).
    pub trait ReactionSink {
        fn set_visible(&mut self, update: &VisibilityUpdate);
        fn spawn(&mut self, request: &SpawnRequest);
    }
}
