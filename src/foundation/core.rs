use crate::foundation::error::{ShatterError, ShatterResult};

pub use kurbo::{Affine, BezPath, Point, Rect, Vec2};

/// Logical drawing-surface dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SurfaceSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl SurfaceSize {
    /// Create a validated size with both dimensions > 0.
    pub fn new(width: u32, height: u32) -> ShatterResult<Self> {
        if width == 0 || height == 0 {
            return Err(ShatterError::config("surface width/height must be > 0"));
        }
        Ok(Self { width, height })
    }

    /// Shorter of the two dimensions, as f64.
    pub fn min_side(self) -> f64 {
        f64::from(self.width.min(self.height))
    }

    /// The full surface as a kurbo rect anchored at the origin.
    pub fn bounds(self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }
}

/// Premultiplied RGBA8 (r,g,b already multiplied by a).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8Premul {
    /// Red channel premultiplied by alpha.
    pub r: u8,
    /// Green channel premultiplied by alpha.
    pub g: u8,
    /// Blue channel premultiplied by alpha.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8Premul {
    /// Convert straight-alpha RGBA8 into premultiplied RGBA8.
    pub fn from_straight_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        fn premul(c: u8, a: u8) -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            (((c * a) + 127) / 255) as u8
        }

        Self {
            r: premul(r, a),
            g: premul(g, a),
            b: premul(b, a),
            a,
        }
    }

    /// Channel bytes in memory order.
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_size_rejects_zero() {
        assert!(SurfaceSize::new(0, 100).is_err());
        assert!(SurfaceSize::new(100, 0).is_err());
        assert!(SurfaceSize::new(1, 1).is_ok());
    }

    #[test]
    fn min_side_picks_shorter_dimension() {
        let s = SurfaceSize::new(800, 600).unwrap();
        assert_eq!(s.min_side(), 600.0);
    }

    #[test]
    fn premul_of_opaque_is_identity() {
        let c = Rgba8Premul::from_straight_rgba(10, 20, 30, 255);
        assert_eq!(c.to_array(), [10, 20, 30, 255]);
    }

    #[test]
    fn premul_of_transparent_is_zero() {
        let c = Rgba8Premul::from_straight_rgba(200, 200, 200, 0);
        assert_eq!(c.to_array(), [0, 0, 0, 0]);
    }
}
