//! Pinhole camera producing the view and projection matrices
//!
//! The camera looks down its own -Z axis with +Y up. Depths in camera space are
//! therefore negative in front of the eye: `near` and `far` are both negative,
//! with `near` closer to zero. The projection maps the frustum into the
//! canonical `[-1, 1]^3` cube with the near plane at `z = +1` and the far plane
//! at `z = -1`, so a larger `z` always means closer to the eye.

use crate::core::error::Error;
use crate::core::types::{Mat3, Mat4, Result, Vec3};

/// Gaze and up closer to parallel than this are rejected
const PARALLEL_EPSILON: f32 = 1e-6;

/// Camera with position, orthonormal basis and projection parameters
///
/// Matrices are cached and only recomputed when a parameter changes.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    position: Vec3,
    gaze: Vec3,
    up: Vec3,
    /// Vertical field of view in degrees
    fovy: f32,
    /// Width / height
    aspect: f32,
    near: f32,
    far: f32,
    view: Mat4,
    projection: Mat4,
}

impl Camera {
    /// Create a camera.
    ///
    /// `gaze` need not be normalized. `up` is only a hint: the stored up vector
    /// is re-derived from `gaze` so that the basis is orthonormal.
    pub fn new(
        position: Vec3,
        fovy: f32,
        aspect: f32,
        near: f32,
        far: f32,
        gaze: Vec3,
        up: Vec3,
    ) -> Result<Self> {
        validate_projection(fovy, aspect, near, far)?;
        let (gaze, up) = orthonormalize(gaze, up)?;
        let mut camera = Self {
            position,
            gaze,
            up,
            fovy,
            aspect,
            near,
            far,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        };
        camera.update_view();
        camera.update_projection();
        Ok(camera)
    }

    /// Create a camera at `position` looking at `target`
    pub fn look_at(
        position: Vec3,
        target: Vec3,
        up: Vec3,
        fovy: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Result<Self> {
        Self::new(position, fovy, aspect, near, far, target - position, up)
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Unit gaze direction (camera -Z in world space)
    pub fn gaze(&self) -> Vec3 {
        self.gaze
    }

    /// Unit up direction, orthogonal to the gaze
    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Unit right direction, `gaze x up`
    pub fn right(&self) -> Vec3 {
        self.gaze.cross(self.up)
    }

    pub fn fovy(&self) -> f32 {
        self.fovy
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    /// World to camera space
    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    /// Camera space to the canonical view volume (before the w divide)
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    /// Combined `projection * view`
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// Move the eye, keeping orientation
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.update_view();
    }

    /// Re-orient the camera
    pub fn set_orientation(&mut self, gaze: Vec3, up: Vec3) -> Result<()> {
        let (gaze, up) = orthonormalize(gaze, up)?;
        self.gaze = gaze;
        self.up = up;
        self.update_view();
        Ok(())
    }

    /// Update aspect ratio (call when the viewport changes)
    pub fn set_aspect(&mut self, width: f32, height: f32) -> Result<()> {
        let aspect = width / height;
        validate_projection(self.fovy, aspect, self.near, self.far)?;
        self.aspect = aspect;
        self.update_projection();
        Ok(())
    }

    /// Change near/far planes
    pub fn set_clip_planes(&mut self, near: f32, far: f32) -> Result<()> {
        validate_projection(self.fovy, self.aspect, near, far)?;
        self.near = near;
        self.far = far;
        self.update_projection();
        Ok(())
    }

    /// Translate the eye to the origin, then rotate {right, up, -gaze} onto
    /// the {X, Y, Z} axes.
    fn update_view(&mut self) {
        let rotation = Mat3::from_cols(self.right(), self.up, -self.gaze).transpose();
        self.view = Mat4::from_mat3(rotation) * Mat4::from_translation(-self.position);
    }

    /// Perspective-to-orthographic squeeze, then centre the depth range, then
    /// scale the box to the canonical cube.
    fn update_projection(&mut self) {
        let n = self.near;
        let f = self.far;
        let top = (self.fovy.to_radians() * 0.5).tan() * n.abs();
        let right = top * self.aspect;

        // Rows: [n 0 0 0] [0 n 0 0] [0 0 n+f -nf] [0 0 1 0]
        let persp_ortho = Mat4::from_cols_array_2d(&[
            [n, 0.0, 0.0, 0.0],
            [0.0, n, 0.0, 0.0],
            [0.0, 0.0, n + f, 1.0],
            [0.0, 0.0, -n * f, 0.0],
        ]);
        let ortho_translate = Mat4::from_translation(Vec3::new(0.0, 0.0, -(n + f) * 0.5));
        let ortho_scale = Mat4::from_scale(Vec3::new(1.0 / right, 1.0 / top, 2.0 / (n - f)));

        self.projection = ortho_scale * ortho_translate * persp_ortho;
    }
}

fn validate_projection(fovy: f32, aspect: f32, near: f32, far: f32) -> Result<()> {
    if !(fovy > 0.0 && fovy < 180.0) {
        return Err(Error::Camera(format!("field of view must be in (0, 180) degrees, got {}", fovy)));
    }
    if !(aspect > 0.0 && aspect.is_finite()) {
        return Err(Error::Camera(format!("aspect ratio must be positive, got {}", aspect)));
    }
    if !(near < 0.0 && far < near) {
        return Err(Error::Camera(format!(
            "clip planes must satisfy far < near < 0, got near={} far={}",
            near, far
        )));
    }
    Ok(())
}

/// Returns (unit gaze, unit up orthogonal to gaze)
fn orthonormalize(gaze: Vec3, up: Vec3) -> Result<(Vec3, Vec3)> {
    let gaze = gaze.try_normalize()
        .ok_or_else(|| Error::Camera(format!("gaze must be a non-zero vector, got {:?}", gaze)))?;
    let right = gaze.cross(up);
    if right.length_squared() < PARALLEL_EPSILON {
        return Err(Error::Camera(format!("up {:?} is parallel to gaze {:?}", up, gaze)));
    }
    let up = right.cross(gaze).normalize();
    Ok((gaze, up))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Vec4;

    fn camera_at_origin() -> Camera {
        Camera::new(Vec3::ZERO, 90.0, 1.0, -1.0, -10.0, -Vec3::Z, Vec3::Y).unwrap()
    }

    fn project(camera: &Camera, p: Vec3) -> Vec3 {
        camera.view_projection().project_point3(p)
    }

    #[test]
    fn test_up_is_reorthogonalized() {
        let camera = Camera::new(
            Vec3::ZERO, 45.0, 1.0, -0.1, -50.0,
            Vec3::new(0.0, -1.0, -1.0), Vec3::Y,
        ).unwrap();
        assert!(camera.gaze().dot(camera.up()).abs() < 1e-6);
        assert!((camera.up().length() - 1.0).abs() < 1e-6);
        assert!((camera.gaze().length() - 1.0).abs() < 1e-6);
        assert!(camera.up().y > 0.0);
    }

    #[test]
    fn test_view_matrix_translation() {
        let camera = Camera::new(
            Vec3::new(10.0, 0.0, 0.0), 60.0, 1.0, -0.1, -100.0, -Vec3::Z, Vec3::Y,
        ).unwrap();
        let origin_in_camera = camera.view_matrix().transform_point3(Vec3::ZERO);
        assert!((origin_in_camera.x - (-10.0)).abs() < 1e-5);
    }

    #[test]
    fn test_view_matrix_aligns_gaze_with_minus_z() {
        let camera = Camera::look_at(
            Vec3::new(3.0, 4.0, 5.0), Vec3::ZERO, Vec3::Y, 45.0, 1.0, -0.1, -50.0,
        ).unwrap();
        let dir = camera.view_matrix() * Vec4::from((camera.gaze(), 0.0));
        assert!((dir.z + 1.0).abs() < 1e-5);
        let up = camera.view_matrix() * Vec4::from((camera.up(), 0.0));
        assert!((up.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_near_far_map_to_canonical_depth() {
        let camera = camera_at_origin();
        let near = project(&camera, Vec3::new(0.0, 0.0, -1.0));
        let far = project(&camera, Vec3::new(0.0, 0.0, -10.0));
        assert!((near.z - 1.0).abs() < 1e-5, "near plane maps to +1, got {}", near.z);
        assert!((far.z + 1.0).abs() < 1e-5, "far plane maps to -1, got {}", far.z);
    }

    #[test]
    fn test_frustum_edges_map_to_unit_square() {
        // fovy 90 => half-height at depth d equals d
        let camera = camera_at_origin();
        let p = project(&camera, Vec3::new(5.0, -5.0, -5.0));
        assert!((p.x - 1.0).abs() < 1e-5);
        assert!((p.y + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_aspect_widens_x() {
        let camera = Camera::new(Vec3::ZERO, 90.0, 2.0, -1.0, -10.0, -Vec3::Z, Vec3::Y).unwrap();
        let p = camera.view_projection().project_point3(Vec3::new(10.0, 0.0, -5.0));
        assert!((p.x - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        assert!(Camera::new(Vec3::ZERO, 0.0, 1.0, -0.1, -10.0, -Vec3::Z, Vec3::Y).is_err());
        assert!(Camera::new(Vec3::ZERO, 180.0, 1.0, -0.1, -10.0, -Vec3::Z, Vec3::Y).is_err());
        assert!(Camera::new(Vec3::ZERO, 45.0, 1.0, 0.1, 10.0, -Vec3::Z, Vec3::Y).is_err());
        assert!(Camera::new(Vec3::ZERO, 45.0, 1.0, -10.0, -0.1, -Vec3::Z, Vec3::Y).is_err());
        assert!(Camera::new(Vec3::ZERO, 45.0, 1.0, -0.1, -10.0, Vec3::ZERO, Vec3::Y).is_err());
        assert!(Camera::new(Vec3::ZERO, 45.0, 1.0, -0.1, -10.0, Vec3::Y, Vec3::Y).is_err());
    }

    #[test]
    fn test_setters_recompute_matrices() {
        let mut camera = camera_at_origin();
        let before = camera.view_matrix();
        camera.set_position(Vec3::new(0.0, 0.0, 5.0));
        assert_ne!(before, camera.view_matrix());

        let proj = camera.projection_matrix();
        camera.set_clip_planes(-0.5, -20.0).unwrap();
        assert_ne!(proj, camera.projection_matrix());
        assert!(camera.set_clip_planes(0.5, -20.0).is_err());
    }
}
