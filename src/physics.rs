//! Per-shard spring-damper dynamics.
//!
//! Not a physically exact spring: stiffness accumulates into velocity once
//! per tick and damping is a plain multiplicative decay. The constants
//! below define the effect's feel and are exact, not tunable
//! approximations. Assembly snaps back faster and damps harder than
//! scattering so "pull together" reads crisper than "fall apart".

use crate::shard::{Pose, Shard};

/// Spring stiffness while the effect is Assembled.
pub const ASSEMBLE_STIFFNESS: f64 = 0.12;
/// Spring stiffness while the effect is Scattered.
pub const SCATTER_STIFFNESS: f64 = 0.08;
/// Velocity damping while Assembled.
pub const ASSEMBLE_DAMPING: f64 = 0.88;
/// Velocity damping while Scattered.
pub const SCATTER_DAMPING: f64 = 0.85;
/// Rotation converges at this fraction of translational stiffness, to
/// avoid dizzying spin.
pub const ROTATION_STIFFNESS_RATIO: f64 = 0.4;

/// Tick rate the spring constants are tuned against. Velocities are
/// stored per reference frame; a tick of `dt` seconds advances
/// `dt * REFERENCE_FPS` reference frames, so `dt = 1/60` applies exactly
/// one spring step and other tick rates scale displacement accordingly.
pub const REFERENCE_FPS: f64 = 60.0;

/// Advance one shard by `dt` seconds toward its current target.
///
/// The target is the assembled pose when `assembled` is set, the shard's
/// precomputed scatter destination otherwise. The per-shard `ease_factor`
/// scales stiffness so identical springs stay visually desynchronized.
pub fn step(shard: &mut Shard, assembled: bool, dt: f64) {
    let target: Pose = if assembled {
        shard.assembled_pose()
    } else {
        shard.scatter_target
    };
    let (stiffness, damping) = if assembled {
        (ASSEMBLE_STIFFNESS, ASSEMBLE_DAMPING)
    } else {
        (SCATTER_STIFFNESS, SCATTER_DAMPING)
    };
    let k = stiffness * shard.ease_factor;

    shard.velocity = shard.velocity + (target.position - shard.position) * k;
    shard.angular_velocity +=
        (target.rotation - shard.rotation) * k * ROTATION_STIFFNESS_RATIO;

    shard.velocity = shard.velocity * damping;
    shard.angular_velocity *= damping;

    let frames = dt * REFERENCE_FPS;
    shard.position = shard.position + shard.velocity * frames;
    shard.rotation += shard.angular_velocity * frames;
}
