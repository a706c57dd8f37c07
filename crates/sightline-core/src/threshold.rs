//! Runtime-adjustable confidence threshold

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ThresholdError {
    #[error("confidence threshold {0} is outside [0, 1]")]
    OutOfRange(f32),
}

/// Check that `value` is a usable confidence threshold.
pub fn validate(value: f32) -> Result<f32, ThresholdError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ThresholdError::OutOfRange(value))
    }
}

/// Shared handle to a confidence threshold.
///
/// Clones observe the same value, so a UI or control thread can retune a
/// running pipeline between cycles. Readers take one snapshot per decode.
#[derive(Debug, Clone)]
pub struct ConfidenceThreshold(Arc<AtomicU32>);

impl ConfidenceThreshold {
    pub fn new(value: f32) -> Result<Self, ThresholdError> {
        let value = validate(value)?;
        Ok(Self(Arc::new(AtomicU32::new(value.to_bits()))))
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Acquire))
    }

    /// Replace the threshold. Out-of-range values leave the current one in place.
    pub fn set(&self, value: f32) -> Result<(), ThresholdError> {
        let value = validate(value)?;
        self.0.store(value.to_bits(), Ordering::Release);
        Ok(())
    }
}
