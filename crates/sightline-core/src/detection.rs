//! Decoded detections and per-frame detection sets
//!
//! A [`DetectionSet`] is rebuilt from scratch every cycle and never patched
//! in place, so consumers can never observe a previous frame's results.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Axis-aligned rectangle in input-resolution pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Create from the two corners
    pub fn from_corners(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        Self::new(x_min, y_min, x_max - x_min, y_max - y_min)
    }

    pub fn x_max(&self) -> f32 {
        self.x + self.width
    }

    pub fn y_max(&self) -> f32 {
        self.y + self.height
    }

    /// Calculate area of the rectangle
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Calculate center point
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// True when the rectangle lies inside `[0, width] x [0, height]`.
    pub fn is_within(&self, width: f32, height: f32) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.width >= 0.0
            && self.height >= 0.0
            && self.x_max() <= width
            && self.y_max() <= height
    }
}

/// One candidate box that cleared the confidence threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub rect: Rect,
    /// Confidence of the winning class.
    pub score: f32,
    pub class_index: usize,
}

impl Detection {
    pub fn new(rect: Rect, score: f32, class_index: usize) -> Self {
        Self {
            rect,
            score,
            class_index,
        }
    }
}

/// Detections of a single frame, in tensor row order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionSet {
    detections: Vec<Detection>,
    /// Rows dropped by the per-row bounds check while decoding.
    skipped_rows: usize,
}

impl DetectionSet {
    /// Create new empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from vector of detections
    pub fn from_vec(detections: Vec<Detection>) -> Self {
        Self {
            detections,
            skipped_rows: 0,
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self::from_vec(Vec::with_capacity(capacity))
    }

    /// Add a detection to the set
    pub fn push(&mut self, detection: Detection) {
        self.detections.push(detection);
    }

    pub(crate) fn record_skipped_row(&mut self) {
        self.skipped_rows += 1;
    }

    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    pub fn as_slice(&self) -> &[Detection] {
        &self.detections
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
        self.detections.iter()
    }

    /// True when any detection carries `class_index`.
    pub fn contains_class(&self, class_index: usize) -> bool {
        self.detections
            .iter()
            .any(|detection| detection.class_index == class_index)
    }

    /// Keep only detections of one class
    pub fn filter_by_class(mut self, class_index: usize) -> Self {
        self.detections
            .retain(|detection| detection.class_index == class_index);
        self
    }

    /// Number of detections per class index
    pub fn count_by_class(&self) -> BTreeMap<usize, usize> {
        let mut counts = BTreeMap::new();
        for detection in &self.detections {
            *counts.entry(detection.class_index).or_insert(0) += 1;
        }
        counts
    }

    /// Get statistics
    pub fn stats(&self) -> DetectionStats {
        let mut total_score = 0.0;
        let mut max_score: f32 = 0.0;
        let mut min_score = f32::INFINITY;

        for detection in &self.detections {
            total_score += detection.score;
            max_score = max_score.max(detection.score);
            min_score = min_score.min(detection.score);
        }

        let avg_score = if self.detections.is_empty() {
            0.0
        } else {
            total_score / self.detections.len() as f32
        };

        DetectionStats {
            total_detections: self.detections.len(),
            class_counts: self.count_by_class(),
            avg_score,
            max_score,
            min_score: if min_score == f32::INFINITY { 0.0 } else { min_score },
        }
    }
}

impl IntoIterator for DetectionSet {
    type Item = Detection;
    type IntoIter = std::vec::IntoIter<Detection>;

    fn into_iter(self) -> Self::IntoIter {
        self.detections.into_iter()
    }
}

impl<'a> IntoIterator for &'a DetectionSet {
    type Item = &'a Detection;
    type IntoIter = std::slice::Iter<'a, Detection>;

    fn into_iter(self) -> Self::IntoIter {
        self.detections.iter()
    }
}

impl FromIterator<Detection> for DetectionSet {
    fn from_iter<T: IntoIterator<Item = Detection>>(iter: T) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

/// Statistics about a detection set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionStats {
    pub total_detections: usize,
    pub class_counts: BTreeMap<usize, usize>,
    pub avg_score: f32,
    pub max_score: f32,
    pub min_score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(class_index: usize, score: f32) -> Detection {
        Detection::new(Rect::new(0.0, 0.0, 10.0, 10.0), score, class_index)
    }

    #[test]
    fn test_rect_corners() {
        let rect = Rect::from_corners(5.0, 10.0, 25.0, 50.0);
        assert_eq!(rect.width, 20.0);
        assert_eq!(rect.height, 40.0);
        assert_eq!(rect.x_max(), 25.0);
        assert_eq!(rect.center(), (15.0, 30.0));
        assert!(rect.is_within(640.0, 640.0));
        assert!(!rect.is_within(20.0, 640.0));
    }

    #[test]
    fn test_class_queries() {
        let set: DetectionSet = vec![detection(0, 0.9), detection(2, 0.4), detection(0, 0.6)]
            .into_iter()
            .collect();

        assert!(set.contains_class(2));
        assert!(!set.contains_class(1));
        assert_eq!(set.count_by_class().get(&0), Some(&2));
        assert_eq!(set.clone().filter_by_class(0).len(), 2);
    }

    #[test]
    fn test_stats() {
        let set = DetectionSet::from_vec(vec![detection(1, 0.5), detection(1, 0.9)]);
        let stats = set.stats();
        assert_eq!(stats.total_detections, 2);
        assert!((stats.avg_score - 0.7).abs() < 1e-6);
        assert_eq!(stats.max_score, 0.9);
        assert_eq!(stats.min_score, 0.5);

        let empty = DetectionSet::new().stats();
        assert_eq!(empty.min_score, 0.0);
        assert_eq!(empty.avg_score, 0.0);
    }
}
