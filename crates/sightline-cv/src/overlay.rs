//! Overlay output for renderers
//!
//! Each cycle yields a list of [`OverlayItem`]s that any render loop can pull
//! and draw. [`draw_overlay`] renders the outlines onto an RGB frame.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect as PixelRect;
use serde::Serialize;
use sightline_core::{ClassCatalog, DetectionSet, Rect};

/// Outline colours, picked by `class_index % PALETTE.len()`
pub const PALETTE: [(u8, u8, u8); 6] = [
    (255, 0, 0),
    (0, 255, 0),
    (0, 0, 255),
    (0, 255, 255),
    (255, 0, 255),
    (255, 255, 0),
];

/// Widest outline drawn when no other cap is configured. Also stands in for
/// the width when `score / threshold` is not finite.
pub const DEFAULT_MAX_OUTLINE_WIDTH: u32 = 16;

/// One box to draw
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayItem {
    pub rect: Rect,
    pub label: String,
    pub score: f32,
    pub class_index: usize,
    pub color: (u8, u8, u8),
    pub outline_width: u32,
}

impl OverlayItem {
    /// Where the label text is anchored: the top-left corner of the box.
    pub fn label_anchor(&self) -> (f32, f32) {
        (self.rect.x, self.rect.y)
    }
}

pub fn class_color(class_index: usize) -> (u8, u8, u8) {
    PALETTE[class_index % PALETTE.len()]
}

/// Outline width `round(score / threshold)`, at least 1.
///
/// `fallback` is used when the ratio is not finite, as with a zero threshold.
pub fn outline_width(score: f32, threshold: f32, fallback: u32) -> u32 {
    let ratio = (score / threshold).round();
    if !ratio.is_finite() {
        return fallback.max(1);
    }
    ratio.max(1.0) as u32
}

/// Overlay items for one cycle, in detection order.
pub fn build_overlay(
    detections: &DetectionSet,
    catalog: &ClassCatalog,
    threshold: f32,
    fallback_width: u32,
) -> Vec<OverlayItem> {
    detections
        .iter()
        .map(|detection| OverlayItem {
            rect: detection.rect,
            label: catalog.resolve(detection.class_index).to_string(),
            score: detection.score,
            class_index: detection.class_index,
            color: class_color(detection.class_index),
            outline_width: outline_width(detection.score, threshold, fallback_width),
        })
        .collect()
}

/// Draw every item's outline onto `image`, growing inwards with the width.
/// Drawn widths are capped at `max_width`; the items keep their own width.
pub fn draw_overlay(image: &mut RgbImage, items: &[OverlayItem], max_width: u32) {
    for item in items {
        let (r, g, b) = item.color;
        let color = Rgb([r, g, b]);

        let x = item.rect.x.round() as i32;
        let y = item.rect.y.round() as i32;
        let width = item.rect.width.round() as i32;
        let height = item.rect.height.round() as i32;

        let drawn = item.outline_width.min(max_width.max(1));
        for inset in 0..drawn as i32 {
            let w = width - 2 * inset;
            let h = height - 2 * inset;
            if w < 1 || h < 1 {
                break;
            }
            let rect = PixelRect::at(x + inset, y + inset).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(image, rect, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sightline_core::Detection;

    #[test]
    fn test_outline_width_scales_with_score() {
        assert_eq!(outline_width(0.9, 0.3, 16), 3);
        assert_eq!(outline_width(0.5, 0.3, 16), 2);
        assert_eq!(outline_width(0.31, 0.3, 16), 1);
        assert_eq!(outline_width(0.9, 0.05, 16), 18);
        assert_eq!(outline_width(0.9, 0.01, 16), 90);
        assert_eq!(outline_width(0.9, 0.0, 16), 16);
        assert_eq!(outline_width(0.9, 0.0, 0), 1);
    }

    #[test]
    fn test_build_overlay_labels_and_colors() {
        let catalog = ClassCatalog::new(["hat", "vest"]);
        let detections = DetectionSet::from_vec(vec![
            Detection::new(Rect::new(1.0, 2.0, 10.0, 10.0), 0.8, 1),
            Detection::new(Rect::new(5.0, 5.0, 4.0, 4.0), 0.4, 7),
        ]);

        let items = build_overlay(&detections, &catalog, 0.2, 16);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].label, "vest");
        assert_eq!(items[0].color, (0, 255, 0));
        assert_eq!(items[0].outline_width, 4);
        assert_eq!(items[0].label_anchor(), (1.0, 2.0));
        assert_eq!(items[1].label, "Unknown");
        assert_eq!(items[1].color, PALETTE[1]);
    }

    #[test]
    fn test_draw_overlay_outline_only() {
        let mut image = RgbImage::new(20, 20);
        let item = OverlayItem {
            rect: Rect::new(2.0, 2.0, 10.0, 10.0),
            label: "hat".to_string(),
            score: 0.9,
            class_index: 0,
            color: (255, 0, 0),
            outline_width: 2,
        };
        draw_overlay(&mut image, &[item], 16);

        assert_eq!(image.get_pixel(2, 2), &Rgb([255, 0, 0]));
        assert_eq!(image.get_pixel(3, 3), &Rgb([255, 0, 0]));
        assert_eq!(image.get_pixel(7, 7), &Rgb([0, 0, 0]));
        assert_eq!(image.get_pixel(15, 15), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_draw_overlay_caps_drawn_width() {
        let mut image = RgbImage::new(40, 40);
        let item = OverlayItem {
            rect: Rect::new(0.0, 0.0, 40.0, 40.0),
            label: "hat".to_string(),
            score: 0.9,
            class_index: 0,
            color: (255, 0, 0),
            outline_width: 18,
        };
        draw_overlay(&mut image, &[item.clone()], 3);

        assert_eq!(item.outline_width, 18);
        assert_eq!(image.get_pixel(2, 2), &Rgb([255, 0, 0]));
        assert_eq!(image.get_pixel(3, 3), &Rgb([0, 0, 0]));
    }
}
