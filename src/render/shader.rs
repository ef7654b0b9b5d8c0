//! Fragment shaders for the preview image
//!
//! A shader receives the screen-space triangle, its view-space copy and the
//! screen-space barycentric weights of the pixel, and returns a color.

use crate::core::types::{Color, Vec3};
use crate::geometry::Triangle;

/// Pluggable per-pixel color function
pub type Shader = Box<dyn Fn(&Triangle, &Triangle, Vec3) -> Color + Send + Sync>;

/// Built-in shader selection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShaderKind {
    #[default]
    Normal,
    Depth,
    VertexColor,
}

impl ShaderKind {
    pub fn shader(self) -> Shader {
        match self {
            ShaderKind::Normal => Box::new(normal),
            ShaderKind::Depth => Box::new(depth),
            ShaderKind::VertexColor => Box::new(vertex_color),
        }
    }
}

/// Interpolated normal mapped from `[-1, 1]` to `[0, 1]`; triangles without
/// normals use their facing direction.
pub fn normal(_screen: &Triangle, view: &Triangle, weights: Vec3) -> Color {
    let z = view.depth_at(weights);
    let n = view.normal_at(weights, z).try_normalize()
        .or_else(|| view.facing().try_normalize())
        .unwrap_or(Vec3::Z);
    (n + Vec3::ONE) * 0.5
}

/// Grey level falling off with distance from the eye
pub fn depth(_screen: &Triangle, view: &Triangle, weights: Vec3) -> Color {
    let z = view.depth_at(weights);
    Color::splat(1.0 / (1.0 - z))
}

/// Perspective-correct vertex colors
pub fn vertex_color(_screen: &Triangle, view: &Triangle, weights: Vec3) -> Color {
    let z = view.depth_at(weights);
    view.color_at(weights, z)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view_tri() -> Triangle {
        Triangle::new(
            Vec3::new(0.0, 0.0, -1.0),
            Vec3::new(1.0, 0.0, -1.0),
            Vec3::new(0.0, 1.0, -1.0),
        )
    }

    #[test]
    fn test_normal_falls_back_to_facing() {
        let t = view_tri();
        let c = normal(&t, &t, Vec3::splat(1.0 / 3.0));
        assert!((c - Vec3::new(0.5, 0.5, 1.0)).length() < 1e-5);
    }

    #[test]
    fn test_depth_shader_range() {
        let t = view_tri();
        let c = depth(&t, &t, Vec3::X);
        assert!((c.x - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_vertex_color() {
        let t = view_tri().with_colors([Color::X, Color::Y, Color::Z]);
        let c = ShaderKind::VertexColor.shader()(&t, &t, Vec3::Y);
        assert!((c - Color::Y).length() < 1e-5);
    }
}
