use image::{Rgba, RgbaImage, imageops};

use crate::{
    assets::cache::AssetCache,
    foundation::core::Canvas,
    foundation::error::{FlipreelError, FlipreelResult},
    timeline::frame_table::Placement,
};

/// Composite `placements` back to front onto an opaque black canvas.
///
/// Each image is cropped, then scaled, then pasted with its top-left corner at `(x, y)`.
/// Broken placements and assets that fail to load are skipped.
pub fn render_tick(
    canvas: Canvas,
    placements: &[Placement],
    cache: &mut AssetCache,
) -> FlipreelResult<RgbaImage> {
    if canvas.width == 0 || canvas.height == 0 {
        return Err(FlipreelError::validation("canvas width/height must be > 0"));
    }

    let mut out = RgbaImage::from_pixel(canvas.width, canvas.height, Rgba([0, 0, 0, 255]));
    for p in placements {
        if p.broken {
            tracing::debug!(placement = %p, "skipping broken placement");
            continue;
        }
        let img = match cache.get(&p.asset_path, p.invert) {
            Ok(img) => img,
            Err(e) => {
                tracing::warn!(placement = %p, "{e}");
                continue;
            }
        };
        match transform_layer(&img, p) {
            Ok(Some(layer)) => {
                imageops::overlay(&mut out, &layer, i64::from(p.x), i64::from(p.y))
            }
            Ok(None) => imageops::overlay(&mut out, &*img, i64::from(p.x), i64::from(p.y)),
            Err(e) => tracing::warn!(placement = %p, "{e}"),
        }
    }
    Ok(out)
}

/// Largest scaled layer, in pixels, the compositor will allocate.
const MAX_LAYER_PIXELS: u64 = 1 << 26;

// Cropped and scaled copy of `img`, or `None` when the placement uses it as-is.
fn transform_layer(img: &RgbaImage, p: &Placement) -> FlipreelResult<Option<RgbaImage>> {
    let unscaled = (p.scale - 1.0).abs() < f64::EPSILON;
    if p.crop.is_none() && unscaled {
        return Ok(None);
    }

    let cropped = match p.crop {
        Some(c) => imageops::crop_imm(img, c.x, c.y, c.width, c.height).to_image(),
        None => img.clone(),
    };
    if unscaled || cropped.width() == 0 || cropped.height() == 0 {
        return Ok(Some(cropped));
    }

    let w = scaled_dim(cropped.width(), p.scale);
    let h = scaled_dim(cropped.height(), p.scale);
    if u64::from(w) * u64::from(h) > MAX_LAYER_PIXELS {
        return Err(FlipreelError::validation(format!(
            "scaled layer {w}x{h} exceeds {MAX_LAYER_PIXELS} pixels"
        )));
    }
    Ok(Some(imageops::resize(
        &cropped,
        w,
        h,
        imageops::FilterType::Triangle,
    )))
}

fn scaled_dim(px: u32, scale: f64) -> u32 {
    ((f64::from(px) * scale).round() as u32).max(1)
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
