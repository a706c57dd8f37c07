//! Sightline core
//!
//! Decoding of YOLO-style detection tensors, class name resolution and the
//! per-frame trigger state machine. Nothing in this crate performs I/O on
//! frames or talks to an inference runtime.

pub mod catalog;
pub mod decoder;
pub mod detection;
pub mod tensor;
pub mod threshold;
pub mod trigger;

pub use catalog::{ClassCatalog, FALLBACK_LABEL};
pub use decoder::{DecodeError, DecodeParams, decode};
pub use detection::{Detection, DetectionSet, DetectionStats, Rect};
pub use tensor::{RawTensor, TensorShape};
pub use threshold::{ConfidenceThreshold, ThresholdError};
pub use trigger::{
    FrameDetectionState, Reaction, SpawnRequest, SpawnSpec, SpawnState, TriggerOutcome,
    TriggerRule, VisibilityUpdate,
};
