//! Raw network output as handed over by an inference engine.

use serde::{Deserialize, Serialize};

/// Geometry values at the start of every row: centre x, centre y, width, height.
pub const GEOMETRY_FEATURES: usize = 4;

/// Row-major shape of a detection tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorShape {
    pub boxes: usize,
    pub features: usize,
}

impl TensorShape {
    pub fn new(boxes: usize, features: usize) -> Self {
        Self { boxes, features }
    }

    /// Shape of a tensor carrying `boxes` candidates scored over `num_classes` classes.
    pub fn for_classes(boxes: usize, num_classes: usize) -> Self {
        Self::new(boxes, num_classes + GEOMETRY_FEATURES)
    }

    /// Number of values the shape describes, `None` on overflow.
    pub fn element_count(&self) -> Option<usize> {
        self.boxes.checked_mul(self.features)
    }
}

/// Flat, shape-annotated float buffer.
///
/// Construction never validates; [`crate::decoder::decode`] is the single place
/// where the shape is checked against the buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTensor {
    pub shape: TensorShape,
    pub data: Vec<f32>,
}

impl RawTensor {
    pub fn new(shape: TensorShape, data: Vec<f32>) -> Self {
        Self { shape, data }
    }

    /// Build a tensor from a flat buffer, deriving the box count from `features`.
    ///
    /// Trailing values that do not fill a whole row are kept in `data`, so a
    /// ragged buffer still fails shape validation at decode time.
    pub fn from_flat(data: Vec<f32>, features: usize) -> Self {
        let boxes = if features == 0 { 0 } else { data.len() / features };
        Self::new(TensorShape::new(boxes, features), data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
