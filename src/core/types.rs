//! Core type aliases and re-exports

pub use glam::{
    Vec2, Vec3, Vec4,
    Mat3, Mat4,
};

/// Linear RGB color, one float per channel in `[0, 1]`
pub type Color = Vec3;

/// Standard Result type for the culler
pub type Result<T> = std::result::Result<T, crate::core::error::Error>;
