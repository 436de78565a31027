//! Shared primitives: geometry re-exports, the surface/pixel model, and
//! the crate error type.

/// Geometry and pixel primitives.
pub mod core;
/// Crate-wide error type and result alias.
pub mod error;
