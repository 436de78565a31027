//! Shatter is a fragment-based image transition effect.
//!
//! A source image is split into convex polygonal shards by a sampled
//! Voronoi partition, and the shards animate between two stable states
//! under a critically-underdamped spring model:
//!
//! - **Assembled**: every shard at its home pose, reconstructing the
//!   image seamlessly
//! - **Scattered**: shards flung outward with random offsets and tilts
//!
//! The host drives the effect: construct a [`ShatterEffect`], call
//! [`ShatterEffect::tick`] once per display refresh, draw the
//! [`FrameRGBA`] returned by [`ShatterEffect::render`], and forward
//! clicks to [`ShatterEffect::pointer_click`].
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod schedule;

/// Shard drawing backend.
pub mod compositor;
/// Effect orchestration and state machine.
pub mod controller;
/// Sampled-Voronoi surface partitioner.
pub mod partition;
/// Spring-damper shard integration.
pub mod physics;
/// Shard model and scatter-target generation.
pub mod shard;
/// Source image decoding and the generated fallback.
pub mod source;

pub use crate::compositor::{Compositor, FrameRGBA};
pub use crate::controller::{EffectConfig, ShatterEffect, ToggleCallback};
pub use crate::foundation::core::{Affine, BezPath, Point, Rect, Rgba8Premul, SurfaceSize, Vec2};
pub use crate::foundation::error::{ShatterError, ShatterResult};
pub use crate::partition::Cell;
pub use crate::shard::{CoverFit, ImageRegion, Pose, Shard};
pub use crate::source::SourceImage;
