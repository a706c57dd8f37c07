//! Tensor to detection decoding
//!
//! Every row of the tensor is one candidate box laid out as
//! `[cx, cy, w, h, score_0, .., score_{n-1}]` in input-resolution pixels.
//! Decoding is a pure function of its inputs: no state survives a call.

use crate::detection::{Detection, DetectionSet, Rect};
use crate::tensor::{GEOMETRY_FEATURES, RawTensor};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-call decoding parameters.
///
/// The threshold is captured by value, so one call applies a single threshold
/// to every row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecodeParams {
    pub num_classes: usize,
    pub confidence_threshold: f32,
    pub input_width: u32,
    pub input_height: u32,
}

impl DecodeParams {
    pub fn features_per_box(&self) -> usize {
        self.num_classes + GEOMETRY_FEATURES
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error(
        "tensor shape mismatch: {len} values declared as {boxes}x{features}, \
         expected rows of {expected_features} features ({num_classes} classes + 4)"
    )]
    ShapeMismatch {
        len: usize,
        boxes: usize,
        features: usize,
        expected_features: usize,
        num_classes: usize,
    },
}

/// A row slice fell outside the buffer. Only reachable if shape validation
/// and row iteration disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("row {row} ({features} features) is out of bounds for a buffer of {len} values")]
pub struct RowBoundsViolation {
    pub row: usize,
    pub features: usize,
    pub len: usize,
}

/// Decode a raw tensor into the detections that clear the threshold.
///
/// Fails with [`DecodeError::ShapeMismatch`] before touching any value when the
/// buffer cannot be read as `boxes x (num_classes + 4)`.
pub fn decode(tensor: &RawTensor, params: &DecodeParams) -> Result<DetectionSet, DecodeError> {
    validate_shape(tensor, params)?;

    let boxes = tensor.shape.boxes;
    let features = tensor.shape.features;
    debug!(
        "Decoding tensor {}x{} ({} values), threshold {}",
        boxes,
        features,
        tensor.len(),
        params.confidence_threshold
    );

    let mut detections = DetectionSet::with_capacity(boxes.min(64));
    for row in 0..boxes {
        match row_slice(&tensor.data, row, features) {
            Ok(values) => {
                if let Some(detection) = decode_row(values, params) {
                    detections.push(detection);
                }
            }
            Err(violation) => {
                warn!("Skipping row: {}", violation);
                detections.record_skipped_row();
            }
        }
    }

    debug!("Decoded {} detections from {} rows", detections.len(), boxes);
    Ok(detections)
}

fn validate_shape(tensor: &RawTensor, params: &DecodeParams) -> Result<(), DecodeError> {
    let len = tensor.len();
    let boxes = tensor.shape.boxes;
    let features = tensor.shape.features;
    let expected_features = params.features_per_box();

    let consistent = features == expected_features
        && len % features == 0
        && tensor.shape.element_count() == Some(len);

    if consistent {
        Ok(())
    } else {
        Err(DecodeError::ShapeMismatch {
            len,
            boxes,
            features,
            expected_features,
            num_classes: params.num_classes,
        })
    }
}

/// Borrow row `row` of a row-major buffer.
pub fn row_slice(data: &[f32], row: usize, features: usize) -> Result<&[f32], RowBoundsViolation> {
    let violation = RowBoundsViolation {
        row,
        features,
        len: data.len(),
    };
    let start = row.checked_mul(features).ok_or(violation)?;
    let end = start.checked_add(features).ok_or(violation)?;
    data.get(start..end).ok_or(violation)
}

/// Decode one row, `None` when it does not clear the threshold.
fn decode_row(row: &[f32], params: &DecodeParams) -> Option<Detection> {
    let scores = row.get(GEOMETRY_FEATURES..GEOMETRY_FEATURES + params.num_classes)?;
    let (class_index, score) = best_class(scores)?;

    // Equal-to-threshold rows are dropped too.
    if score <= params.confidence_threshold {
        return None;
    }

    let rect = decode_rect(
        [row[0], row[1], row[2], row[3]],
        params.input_width as f32,
        params.input_height as f32,
    );
    Some(Detection::new(rect, score, class_index))
}

/// Highest score and its index. Ties keep the earliest index and NaN scores
/// never win; `None` when no score is a number.
pub fn best_class(scores: &[f32]) -> Option<(usize, f32)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, score)| !score.is_nan())
        .reduce(|best, current| if current.1 > best.1 { current } else { best })
}

/// Convert centre/size geometry to a rectangle clamped to the input frame.
pub fn decode_rect(cxcywh: [f32; 4], input_width: f32, input_height: f32) -> Rect {
    let [cx, cy, w, h] = cxcywh;
    let (x_min, x_max) = clamp_span(cx, w, input_width);
    let (y_min, y_max) = clamp_span(cy, h, input_height);
    Rect::from_corners(x_min, y_min, x_max, y_max)
}

fn clamp_span(center: f32, size: f32, limit: f32) -> (f32, f32) {
    let min = (center - size / 2.0).max(0.0).min(limit);
    let max = (center + size / 2.0).min(limit).max(min);
    (min, max)
}
