//! Source image decoding and the procedural fallback used when the real
//! image cannot be loaded.

use std::sync::Arc;

use anyhow::Context as _;

use crate::foundation::core::Rgba8Premul;
use crate::foundation::error::ShatterResult;

const FALLBACK_TOP: Rgba8Premul = Rgba8Premul {
    r: 52,
    g: 56,
    b: 84,
    a: 255,
};
const FALLBACK_BOTTOM: Rgba8Premul = Rgba8Premul {
    r: 24,
    g: 26,
    b: 36,
    a: 255,
};
const FALLBACK_MARK: Rgba8Premul = Rgba8Premul {
    r: 196,
    g: 72,
    b: 72,
    a: 255,
};

/// Decoded source raster in premultiplied RGBA8 form.
#[derive(Clone, Debug)]
pub struct SourceImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
    /// Set when this is the generated fallback rather than a decoded
    /// resource.
    pub fallback: bool,
}

/// Decode encoded image bytes (PNG, JPEG, ...) into premultiplied RGBA8.
pub fn decode_source(bytes: &[u8]) -> ShatterResult<SourceImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode source image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(SourceImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
        fallback: false,
    })
}

/// Generate the load-failure stand-in: a vertical gradient with a
/// contrasting cross mark in the center. The geometry/physics pipeline is
/// agnostic to image provenance, so the effect proceeds identically.
pub fn fallback_image(width: u32, height: u32) -> SourceImage {
    let width = width.max(1);
    let height = height.max(1);
    let mut bytes = vec![0u8; (width as usize) * (height as usize) * 4];

    let h1 = (height.max(2) - 1) as f64;
    for y in 0..height {
        let t = f64::from(y) / h1;
        let c = lerp_rgba(FALLBACK_TOP, FALLBACK_BOTTOM, t);
        for x in 0..width {
            let idx = ((y as usize) * (width as usize) + (x as usize)) * 4;
            bytes[idx..idx + 4].copy_from_slice(&c.to_array());
        }
    }

    // Diagonal cross centered in the image, one-eighth of the short side
    // wide, standing in for an error label without pulling in a text stack.
    let cx = f64::from(width) / 2.0;
    let cy = f64::from(height) / 2.0;
    let half_extent = f64::from(width.min(height)) / 4.0;
    let half_width = (f64::from(width.min(height)) / 16.0).max(1.0);
    for y in 0..height {
        for x in 0..width {
            let dx = f64::from(x) - cx;
            let dy = f64::from(y) - cy;
            if dx.abs() > half_extent || dy.abs() > half_extent {
                continue;
            }
            let on_diag = (dx - dy).abs() < half_width || (dx + dy).abs() < half_width;
            if on_diag {
                let idx = ((y as usize) * (width as usize) + (x as usize)) * 4;
                bytes[idx..idx + 4].copy_from_slice(&FALLBACK_MARK.to_array());
            }
        }
    }

    SourceImage {
        width,
        height,
        rgba8_premul: Arc::new(bytes),
        fallback: true,
    }
}

fn lerp_rgba(a: Rgba8Premul, b: Rgba8Premul, t: f64) -> Rgba8Premul {
    fn lerp_u8(a: u8, b: u8, t: f64) -> u8 {
        let a = f64::from(a);
        let b = f64::from(b);
        (a + (b - a) * t).round().clamp(0.0, 255.0) as u8
    }

    Rgba8Premul {
        r: lerp_u8(a.r, b.r, t),
        g: lerp_u8(a.g, b.g, t),
        b: lerp_u8(a.b, b.b, t),
        a: lerp_u8(a.a, b.a, t),
    }
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        if px[3] == 255 {
            continue;
        }
        let c = Rgba8Premul::from_straight_rgba(px[0], px[1], px[2], px[3]);
        px.copy_from_slice(&c.to_array());
    }
}
