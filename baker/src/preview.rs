use std::path::Path;

use anyhow::{Context, Result};
use image::{GrayImage, Luma};
use journey_engine::synthesis::HeightField;
use tracing::info;

/// 灰度预览：每个顶点一个像素，按高度场的最小/最大高度归一化
pub fn render_height_preview(field: &HeightField) -> GrayImage {
    let columns = field.columns() as u32;
    let (lo, hi) = field.height_range();
    let span = hi - lo;

    GrayImage::from_fn(columns, columns, |x, y| {
        let h = field.height(y as usize, x as usize);
        let v = if span > f32::EPSILON { (h - lo) / span } else { 0.5 };
        Luma([(v.clamp(0.0, 1.0) * 255.0).round() as u8])
    })
}

pub fn save_height_preview(field: &HeightField, path: &Path) -> Result<()> {
    let img = render_height_preview(field);
    img.save(path)
        .with_context(|| format!("writing preview image {}", path.display()))?;
    info!("Wrote {}x{} preview to {:?}", img.width(), img.height(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(heights: &[f32], segments: u32) -> HeightField {
        let columns = segments as usize + 1;
        let mut positions = Vec::with_capacity(columns * columns * 3);
        for (i, h) in heights.iter().enumerate() {
            positions.extend_from_slice(&[(i % columns) as f32, *h, (i / columns) as f32]);
        }
        HeightField { segments, size: segments as f64, colors: vec![0.5; positions.len()], positions }
    }

    #[test]
    fn preview_spans_full_gray_range() {
        let img = render_height_preview(&field(&[-4.0, 0.0, 2.0, 6.0], 1));
        assert_eq!(img.dimensions(), (2, 2));
        assert_eq!(img.get_pixel(0, 0).0[0], 0);
        assert_eq!(img.get_pixel(1, 1).0[0], 255);
        assert_eq!(img.get_pixel(1, 0).0[0], 102);
    }

    #[test]
    fn flat_field_renders_mid_gray() {
        let img = render_height_preview(&field(&[3.0; 4], 1));
        assert!(img.pixels().all(|p| p.0[0] == 128));
    }
}
