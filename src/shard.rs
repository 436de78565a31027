//! Live animated fragments and the image-to-surface cover fit that binds
//! each fragment to a sub-rectangle of the source image.

use std::f64::consts::{FRAC_PI_4, TAU};

use crate::foundation::core::{Point, Rect, SurfaceSize, Vec2};
use crate::partition::Cell;
use rand::Rng;

/// Maximum scatter displacement as a fraction of the surface's shorter
/// side.
pub const SCATTER_RADIUS_FRACTION: f64 = 0.08;

/// Fraction of the scatter displacement applied as an initial velocity
/// kick, so a scatter starts with momentum instead of easing out of rest.
const SCATTER_KICK: f64 = 0.3;

/// Lower bound for the per-shard speed multiplier. Keeps every shard
/// moving while still desynchronizing otherwise-identical motion.
const EASE_FACTOR_MIN: f64 = 0.35;

/// "Cover" fit of a source image onto the render surface: scaled
/// (preserving aspect ratio) so it fully covers the surface, centered, with
/// overflow cropped.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CoverFit {
    /// Uniform image-to-surface scale factor.
    pub scale: f64,
    /// Horizontal crop offset in surface units (half the overflow).
    pub offset_x: f64,
    /// Vertical crop offset in surface units.
    pub offset_y: f64,
}

impl CoverFit {
    /// Compute the cover fit of an `image_w` x `image_h` image onto
    /// `surface`. All shards of one effect share this fit.
    pub fn compute(image_w: u32, image_h: u32, surface: SurfaceSize) -> Self {
        let iw = f64::from(image_w.max(1));
        let ih = f64::from(image_h.max(1));
        let sw = f64::from(surface.width);
        let sh = f64::from(surface.height);
        let scale = (sw / iw).max(sh / ih);
        Self {
            scale,
            offset_x: (iw * scale - sw) / 2.0,
            offset_y: (ih * scale - sh) / 2.0,
        }
    }

    /// Map a surface-space rectangle into source-image pixel space.
    pub fn image_region(&self, surface_rect: Rect) -> ImageRegion {
        let inv = 1.0 / self.scale;
        ImageRegion {
            offset_x: (surface_rect.x0 + self.offset_x) * inv,
            offset_y: (surface_rect.y0 + self.offset_y) * inv,
            width: surface_rect.width() * inv,
            height: surface_rect.height() * inv,
        }
    }
}

/// The rectangle of the source image one shard samples, in source-image
/// pixel space.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ImageRegion {
    /// Left edge in image pixels.
    pub offset_x: f64,
    /// Top edge in image pixels.
    pub offset_y: f64,
    /// Width in image pixels.
    pub width: f64,
    /// Height in image pixels.
    pub height: f64,
}

/// A position + rotation pair the spring integrator pulls toward.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    /// Target position in surface coordinates.
    pub position: Point,
    /// Target rotation in radians.
    pub rotation: f64,
}

/// One live polygonal fragment of the source image.
///
/// Position and rotation describe the pose of the shard's local frame,
/// whose origin sits at `cell.centroid`. Velocities are expressed per
/// 60 Hz reference frame (see [`crate::physics`]).
#[derive(Clone, Debug)]
pub struct Shard {
    /// Immutable geometry this shard was built from.
    pub cell: Cell,
    /// Source-image rectangle this shard samples, fixed at creation.
    pub image_region: ImageRegion,
    /// Current animated position of the centroid.
    pub position: Point,
    /// Current rotation about the centroid, radians.
    pub rotation: f64,
    /// Translational velocity, surface units per reference frame.
    pub velocity: Vec2,
    /// Angular velocity, radians per reference frame.
    pub angular_velocity: f64,
    /// Precomputed random destination used while the effect is Scattered.
    pub scatter_target: Pose,
    /// Per-shard speed multiplier in (0, 1], fixed at creation.
    pub ease_factor: f64,
}

impl Shard {
    /// Build a shard at rest in its assembled pose.
    pub fn new<R: Rng>(cell: Cell, fit: CoverFit, rng: &mut R) -> Self {
        let image_region = fit.image_region(cell.bounds());
        let centroid = cell.centroid;
        Self {
            cell,
            image_region,
            position: centroid,
            rotation: 0.0,
            velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            scatter_target: Pose {
                position: centroid,
                rotation: 0.0,
            },
            ease_factor: rng.gen_range(EASE_FACTOR_MIN..=1.0),
        }
    }

    /// The pose the shard springs toward while the effect is Assembled.
    pub fn assembled_pose(&self) -> Pose {
        Pose {
            position: self.cell.centroid,
            rotation: 0.0,
        }
    }

    /// Draw a fresh random scatter destination and seed the velocities
    /// with a small impulse proportional to the displacement.
    pub fn scatter<R: Rng>(&mut self, surface: SurfaceSize, rng: &mut R) {
        let angle = rng.gen_range(0.0..TAU);
        let distance = rng.gen_range(0.0..SCATTER_RADIUS_FRACTION * surface.min_side());
        let displacement = Vec2::new(angle.cos(), angle.sin()) * distance;
        let rotation = rng.gen_range(-FRAC_PI_4..=FRAC_PI_4);

        self.scatter_target = Pose {
            position: self.cell.centroid + displacement,
            rotation,
        };
        self.velocity = displacement * SCATTER_KICK;
        self.angular_velocity = rotation * SCATTER_KICK;
    }
}
