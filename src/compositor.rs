//! CPU compositor: draws every shard as a filled polygon carrying an image
//! paint, into a premultiplied RGBA8 frame.
//!
//! Clipping-to-polygon and "draw a sub-rectangle of the image" collapse
//! into a single `fill_path` per shard: the polygon is the clip, and the
//! paint transform positions the source image so the shard's
//! `image_region` lands exactly under its polygon footprint. Shards are
//! drawn in creation order, which keeps overlap during scatter stable
//! frame to frame. Transform and paint state are re-set per shard so
//! nothing leaks from one shard to the next.

use std::sync::Arc;

use crate::foundation::core::{Affine, BezPath, Point, SurfaceSize};
use crate::foundation::error::{ShatterError, ShatterResult};
use crate::shard::Shard;
use crate::source::SourceImage;

/// One rendered frame in row-major premultiplied RGBA8.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes, `width * height * 4` long.
    pub data: Vec<u8>,
}

impl FrameRGBA {
    /// Convert to straight-alpha RGBA8, e.g. for PNG export.
    pub fn to_straight_alpha(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        for px in out.chunks_exact_mut(4) {
            let a = px[3] as u16;
            if a == 0 || a == 255 {
                continue;
            }
            px[0] = ((px[0] as u16 * 255 + a / 2) / a).min(255) as u8;
            px[1] = ((px[1] as u16 * 255 + a / 2) / a).min(255) as u8;
            px[2] = ((px[2] as u16 * 255 + a / 2) / a).min(255) as u8;
        }
        out
    }
}

/// Renders shard sets against a fixed source image.
pub struct Compositor {
    size: SurfaceSize,
    clear_rgba: Option<[u8; 4]>,

    ctx: Option<vello_cpu::RenderContext>,
    pixmap: Option<vello_cpu::Pixmap>,
    paint: Option<vello_cpu::Image>,
}

impl Compositor {
    /// Create a compositor for the given surface size. The frame is
    /// cleared to transparent unless a clear color is configured.
    pub fn new(size: SurfaceSize) -> Self {
        Self {
            size,
            clear_rgba: None,
            ctx: None,
            pixmap: None,
            paint: None,
        }
    }

    /// Configure a background color drawn behind the shards.
    pub fn with_clear_rgba(mut self, clear: Option<[u8; 4]>) -> Self {
        self.clear_rgba = clear;
        self
    }

    /// (Re)bind the source image all shards sample from.
    pub fn set_source(&mut self, source: &SourceImage) -> ShatterResult<()> {
        self.paint = Some(image_paint(source)?);
        Ok(())
    }

    /// Change the surface size, dropping cached raster state.
    pub fn resize(&mut self, size: SurfaceSize) {
        if size != self.size {
            self.size = size;
            self.ctx = None;
            self.pixmap = None;
        }
    }

    /// Draw all shards in creation order and return the finished frame.
    #[tracing::instrument(skip(self, shards), fields(shards = shards.len()))]
    pub fn render(&mut self, shards: &[Shard]) -> ShatterResult<FrameRGBA> {
        let paint = self
            .paint
            .clone()
            .ok_or_else(|| ShatterError::render("compositor has no source image bound"))?;

        let width_u16: u16 = self
            .size
            .width
            .try_into()
            .map_err(|_| ShatterError::render("surface width exceeds u16"))?;
        let height_u16: u16 = self
            .size
            .height
            .try_into()
            .map_err(|_| ShatterError::render("surface height exceeds u16"))?;

        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == width_u16 && ctx.height() == height_u16 => ctx,
            _ => vello_cpu::RenderContext::new(width_u16, height_u16),
        };
        ctx.reset();

        let mut pixmap = match self.pixmap.take() {
            Some(pm) if pm.width() == width_u16 && pm.height() == height_u16 => pm,
            _ => vello_cpu::Pixmap::new(width_u16, height_u16),
        };

        ctx.set_blend_mode(vello_cpu::peniko::BlendMode::default());
        // The background must go through the context; render_to_pixmap
        // overwrites the pixmap, so pre-filled pixels would be lost.
        if let Some([r, g, b, a]) = self.clear_rgba {
            ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                0.0,
                0.0,
                f64::from(self.size.width),
                f64::from(self.size.height),
            ));
        }
        for shard in shards {
            let world = Affine::translate(shard.position.to_vec2()) * Affine::rotate(shard.rotation);
            ctx.set_transform(affine_to_cpu(world));
            ctx.set_paint_transform(affine_to_cpu(shard_paint_transform(shard)));
            ctx.set_paint(paint.clone());
            ctx.fill_path(&bezpath_to_cpu(&shard_path(shard)));
        }
        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);

        let out = FrameRGBA {
            width: self.size.width,
            height: self.size.height,
            data: pixmap.data_as_u8_slice().to_vec(),
        };
        self.ctx = Some(ctx);
        self.pixmap = Some(pixmap);
        Ok(out)
    }
}

/// Cell polygon in shard-local coordinates (origin at the centroid).
pub fn shard_path(shard: &Shard) -> BezPath {
    let c = shard.cell.centroid;
    let mut path = BezPath::new();
    let mut verts = shard.cell.vertices.iter();
    if let Some(first) = verts.next() {
        path.move_to(Point::new(first.x - c.x, first.y - c.y));
        for v in verts {
            path.line_to(Point::new(v.x - c.x, v.y - c.y));
        }
        path.close_path();
    }
    path
}

/// Paint transform mapping source-image pixel space into shard-local
/// space, so the shard's `image_region` sits under its polygon footprint.
fn shard_paint_transform(shard: &Shard) -> Affine {
    let bbox = shard.cell.bounds();
    let c = shard.cell.centroid;
    let region = shard.image_region;
    let sx = bbox.width() / region.width.max(1e-12);
    let sy = bbox.height() / region.height.max(1e-12);
    let tx = (bbox.x0 - c.x) - region.offset_x * sx;
    let ty = (bbox.y0 - c.y) - region.offset_y * sy;
    Affine::new([sx, 0.0, 0.0, sy, tx, ty])
}

fn image_paint(source: &SourceImage) -> ShatterResult<vello_cpu::Image> {
    let pixmap = pixmap_from_premul_bytes(&source.rgba8_premul, source.width, source.height)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> ShatterResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| ShatterError::render("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| ShatterError::render("pixmap height exceeds u16"))?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(ShatterError::render("pixmap byte len mismatch"));
    }
    // Pixmap stores PremulRgba8; our bytes are already premultiplied.
    let mut pixels = Vec::<vello_cpu::peniko::color::PremulRgba8>::with_capacity(
        (width as usize) * (height as usize),
    );
    for px in bytes.chunks_exact(4) {
        pixels.push(vello_cpu::peniko::color::PremulRgba8::from_u8_array([
            px[0], px[1], px[2], px[3],
        ]));
    }
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels, w, h, true,
    ))
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::LineTo(p) => out.line_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::QuadTo(p1, p2) => out.quad_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
            ),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
                vello_cpu::kurbo::Point::new(p3.x, p3.y),
            ),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Rect;
    use crate::partition::Cell;
    use crate::shard::CoverFit;
    use crate::source::fallback_image;
    use kurbo::Shape as _;
    use rand::SeedableRng;

    fn test_shard() -> Shard {
        let cell = Cell {
            seed: Point::new(32.0, 32.0),
            vertices: vec![
                Point::new(8.0, 8.0),
                Point::new(56.0, 8.0),
                Point::new(56.0, 56.0),
                Point::new(8.0, 56.0),
            ],
            centroid: Point::new(32.0, 32.0),
        };
        let fit = CoverFit::compute(64, 64, SurfaceSize::new(64, 64).unwrap());
        let mut rng = rand_pcg::Pcg64::seed_from_u64(1);
        Shard::new(cell, fit, &mut rng)
    }

    #[test]
    fn shard_path_is_centroid_relative_and_closed() {
        let shard = test_shard();
        let path = shard_path(&shard);
        let bbox = path.bounding_box();
        assert_eq!(bbox, Rect::new(-24.0, -24.0, 24.0, 24.0));
    }

    #[test]
    fn paint_transform_maps_region_origin_to_polygon_corner() {
        let shard = test_shard();
        let tf = shard_paint_transform(&shard);
        let region = shard.image_region;
        // The image-region origin must land on the polygon bbox corner in
        // local (centroid-relative) coordinates.
        let mapped = tf * Point::new(region.offset_x, region.offset_y);
        assert!((mapped.x - (-24.0)).abs() < 1e-9);
        assert!((mapped.y - (-24.0)).abs() < 1e-9);
    }

    #[test]
    fn render_without_source_is_an_error() {
        let mut comp = Compositor::new(SurfaceSize::new(64, 64).unwrap());
        assert!(comp.render(&[]).is_err());
    }

    #[test]
    fn render_fills_shard_interior_with_image_pixels() {
        let size = SurfaceSize::new(64, 64).unwrap();
        let mut comp = Compositor::new(size);
        comp.set_source(&fallback_image(64, 64)).unwrap();

        let frame = comp.render(&[test_shard()]).unwrap();
        assert_eq!(frame.data.len(), 64 * 64 * 4);

        // Center of the shard is opaque; the far corner (outside every
        // polygon) stays transparent.
        let center = (32usize * 64 + 32) * 4;
        assert_eq!(frame.data[center + 3], 255);
        let corner = (63usize * 64 + 63) * 4;
        assert_eq!(frame.data[corner + 3], 0);
    }

    #[test]
    fn clear_color_fills_uncovered_pixels() {
        let size = SurfaceSize::new(64, 64).unwrap();
        let mut comp = Compositor::new(size).with_clear_rgba(Some([18, 20, 28, 255]));
        comp.set_source(&fallback_image(64, 64)).unwrap();

        // No shards: the whole frame is the background.
        let frame = comp.render(&[]).unwrap();
        assert_eq!(&frame.data[0..4], &[18, 20, 28, 255]);

        // With a shard, the uncovered corner keeps the background while
        // the shard interior draws image pixels over it.
        let frame = comp.render(&[test_shard()]).unwrap();
        assert_eq!(&frame.data[0..4], &[18, 20, 28, 255]);
        let center = (32usize * 64 + 32) * 4;
        assert_eq!(frame.data[center + 3], 255);
        assert_ne!(&frame.data[center..center + 4], &[18, 20, 28, 255]);
    }

    #[test]
    fn straight_alpha_conversion_is_identity_for_opaque() {
        let frame = FrameRGBA {
            width: 1,
            height: 1,
            data: vec![10, 20, 30, 255],
        };
        assert_eq!(frame.to_straight_alpha(), vec![10, 20, 30, 255]);
    }
}
