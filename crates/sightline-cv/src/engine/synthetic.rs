use crate::Result;
use crate::detection::config::ModelConfig;
use crate::source::Frame;
use crate::traits::InferenceEngine;
use anyhow::bail;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sightline_core::tensor::GEOMETRY_FEATURES;
use sightline_core::{RawTensor, TensorShape};

/// Background score ceiling for rows without a hit
const NOISE_CEILING: f32 = 0.05;

/// Seeded generator of plausible detection tensors.
#[derive(Debug, Clone)]
pub struct SyntheticEngine {
    rng: StdRng,
    boxes: usize,
    hit_rate: f64,
    focus_class: Option<usize>,
    num_classes: usize,
    input_width: f32,
    input_height: f32,
}

impl SyntheticEngine {
    pub fn new(
        seed: u64,
        boxes: usize,
        hit_rate: f64,
        focus_class: Option<usize>,
        model: &ModelConfig,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&hit_rate) {
            bail!("hit_rate {} is outside [0, 1]", hit_rate);
        }
        if model.num_classes == 0 || model.input_width == 0 || model.input_height == 0 {
            bail!("Synthetic engine needs at least one class and a non-empty input");
        }
        if let Some(class) = focus_class.filter(|&class| class >= model.num_classes) {
            bail!(
                "focus_class {} is outside the model's {} classes",
                class,
                model.num_classes
            );
        }

        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            boxes,
            hit_rate,
            focus_class,
            num_classes: model.num_classes,
            input_width: model.input_width as f32,
            input_height: model.input_height as f32,
        })
    }

    fn fill_row(&mut self, row: &mut [f32]) {
        let max_w = (self.input_width / 2.0).max(2.0);
        let max_h = (self.input_height / 2.0).max(2.0);
        row[0] = self.rng.gen_range(0.0..self.input_width);
        row[1] = self.rng.gen_range(0.0..self.input_height);
        row[2] = self.rng.gen_range(1.0..max_w);
        row[3] = self.rng.gen_range(1.0..max_h);

        for score in &mut row[GEOMETRY_FEATURES..] {
            *score = self.rng.gen_range(0.0..NOISE_CEILING);
        }

        if self.rng.gen_bool(self.hit_rate) {
            let class = match self.focus_class {
                Some(class) => class,
                None => self.rng.gen_range(0..self.num_classes),
            };
            row[GEOMETRY_FEATURES + class] = self.rng.gen_range(0.5..1.0);
        }
    }
}

impl InferenceEngine for SyntheticEngine {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn infer(&mut self, _frame: &Frame) -> Result<RawTensor> {
        let shape = TensorShape::for_classes(self.boxes, self.num_classes);
        let mut data = vec![0.0; self.boxes * shape.features];
        for row in data.chunks_exact_mut(shape.features) {
            self.fill_row(row);
        }
        Ok(RawTensor::new(shape, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use sightline_core::{DecodeParams, decode};

    fn model() -> ModelConfig {
        ModelConfig {
            num_classes: 5,
            input_width: 320,
            input_height: 320,
        }
    }

    fn frame() -> Frame {
        Frame {
            index: 0,
            image: RgbImage::new(1, 1),
        }
    }

    #[test]
    fn test_same_seed_same_tensor() -> Result<()> {
        let mut a = SyntheticEngine::new(42, 16, 0.5, None, &model())?;
        let mut b = SyntheticEngine::new(42, 16, 0.5, None, &model())?;
        assert_eq!(a.infer(&frame())?, b.infer(&frame())?);
        Ok(())
    }

    #[test]
    fn test_tensor_decodes_cleanly() -> Result<()> {
        let mut engine = SyntheticEngine::new(3, 32, 1.0, Some(2), &model())?;
        let tensor = engine.infer(&frame())?;
        assert_eq!(tensor.shape, TensorShape::new(32, 9));

        let params = DecodeParams {
            num_classes: 5,
            confidence_threshold: 0.3,
            input_width: 320,
            input_height: 320,
        };
        let detections = decode(&tensor, &params)?;
        assert_eq!(detections.len(), 32);
        assert!(detections.iter().all(|d| d.class_index == 2));
        assert!(detections.iter().all(|d| d.rect.is_within(320.0, 320.0)));
        Ok(())
    }

    #[test]
    fn test_rejects_bad_settings() {
        assert!(SyntheticEngine::new(1, 4, 1.5, None, &model()).is_err());
        assert!(SyntheticEngine::new(1, 4, 0.5, Some(5), &model()).is_err());
    }
}
