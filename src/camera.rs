use glam::{Mat3, Mat4, Vec3};

pub const DEFAULT_YAW: f32 = -90.0;
pub const DEFAULT_PITCH: f32 = 0.0;
pub const DEFAULT_FOV: f32 = 45.0;
pub const DEFAULT_SPEED: f32 = 5.0;
pub const DEFAULT_SENSITIVITY: f32 = 0.075;
pub const DEFAULT_NEAR: f32 = 0.1;
pub const DEFAULT_FAR: f32 = 100.0;

/// Pitch limit in degrees. At ±90° the forward vector becomes parallel to
/// the up reference and the right vector degenerates to NaN.
pub const PITCH_LIMIT: f32 = 89.0;
pub const MIN_FOV: f32 = 1.0;
pub const MAX_FOV: f32 = 45.0;

/// First-person camera parametrized by yaw and pitch in degrees.
///
/// `forward`, `right` and `up` are recomputed from the angles after every
/// orientation change and always form an orthonormal basis while the
/// pitch stays inside [`PITCH_LIMIT`].
#[derive(Debug, Clone, PartialEq)]
pub struct FlyCamera {
    position: Vec3,
    up_reference: Vec3,
    forward: Vec3,
    right: Vec3,
    up: Vec3,
    yaw: f32,
    pitch: f32,
    vertical_fov: f32,
    aspect_ratio: f32,
    near: f32,
    far: f32,
    movement_speed: f32,
    mouse_sensitivity: f32,
}

impl FlyCamera {
    /// Creates a camera looking down -Z (yaw -90°) from `position`.
    ///
    /// `height` must be non-zero; see [`FlyCamera::resize`].
    pub fn new(position: Vec3, up_reference: Vec3, width: u32, height: u32) -> Self {
        let mut camera = Self {
            position,
            up_reference,
            forward: Vec3::NEG_Z,
            right: Vec3::X,
            up: Vec3::Y,
            yaw: DEFAULT_YAW,
            pitch: DEFAULT_PITCH,
            vertical_fov: DEFAULT_FOV,
            aspect_ratio: 1.0,
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
            movement_speed: DEFAULT_SPEED,
            mouse_sensitivity: DEFAULT_SENSITIVITY,
        };
        camera.resize(width, height);
        camera.update_basis();
        camera
    }

    /// Recomputes the aspect ratio for a new viewport.
    ///
    /// Callers must not pass a zero `height`; the division is not guarded.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect_ratio = width as f32 / height as f32;
    }

    /// Right-handed look-at transform toward `position + forward`.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward, self.up_reference)
    }

    /// Right-handed perspective projection with a [0, 1] depth range.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.vertical_fov.to_radians(),
            self.aspect_ratio,
            self.near,
            self.far,
        )
    }

    /// Moves along a unit direction expressed in the camera's local frame.
    ///
    /// Local +Z is "forward" input, +X is "left" and +Y is "down", matching
    /// the negated view-space axes. The rotation block of the view matrix
    /// is orthonormal, so its transpose is its inverse.
    pub fn move_by(&mut self, local_direction: Vec3, delta_time: f32) {
        let to_world = Mat3::from_mat4(self.view_matrix()).transpose();
        let velocity = self.movement_speed * delta_time;
        self.position += to_world * -local_direction * velocity;
    }

    /// Applies raw cursor offsets (pixels) to yaw and pitch.
    pub fn look(&mut self, x_offset: f32, y_offset: f32, constrain_pitch: bool) {
        self.yaw += x_offset * self.mouse_sensitivity;
        self.pitch += y_offset * self.mouse_sensitivity;
        if constrain_pitch {
            self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }
        self.update_basis();
    }

    /// Narrows (positive offset) or widens the vertical field of view.
    pub fn zoom_by(&mut self, y_offset: f32) {
        self.vertical_fov = (self.vertical_fov - y_offset).clamp(MIN_FOV, MAX_FOV);
    }

    fn update_basis(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        let forward = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos());
        self.forward = forward.normalize();
        self.right = self.forward.cross(self.up_reference).normalize();
        self.up = self.right.cross(self.forward).normalize();
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn vertical_fov(&self) -> f32 {
        self.vertical_fov
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn near_plane(&self) -> f32 {
        self.near
    }

    pub fn far_plane(&self) -> f32 {
        self.far
    }

    pub fn movement_speed(&self) -> f32 {
        self.movement_speed
    }

    pub fn set_movement_speed(&mut self, speed: f32) {
        self.movement_speed = speed;
    }

    pub fn mouse_sensitivity(&self) -> f32 {
        self.mouse_sensitivity
    }

    pub fn set_mouse_sensitivity(&mut self, sensitivity: f32) {
        self.mouse_sensitivity = sensitivity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn camera() -> FlyCamera {
        FlyCamera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::Y, 800, 600)
    }

    fn assert_orthonormal(camera: &FlyCamera) {
        let (f, r, u) = (camera.forward(), camera.right(), camera.up());
        for v in [f, r, u] {
            assert!((v.length() - 1.0).abs() < EPS, "not unit: {v:?}");
        }
        assert!(f.dot(r).abs() < EPS);
        assert!(f.dot(u).abs() < EPS);
        assert!(r.dot(u).abs() < EPS);
    }

    #[test]
    fn initial_state_matches_defaults() {
        let camera = camera();
        assert!((camera.aspect_ratio() - 800.0 / 600.0).abs() < EPS);
        assert_eq!(camera.yaw(), -90.0);
        assert_eq!(camera.pitch(), 0.0);
        assert_eq!(camera.vertical_fov(), 45.0);

        let yaw = (-90.0f32).to_radians();
        let expected = Vec3::new(yaw.cos(), 0.0, yaw.sin()).normalize();
        assert_eq!(camera.forward(), expected);
        assert!((camera.forward() - Vec3::NEG_Z).length() < EPS);
        assert!((camera.right() - Vec3::X).length() < EPS);
        assert!((camera.up() - Vec3::Y).length() < EPS);
    }

    #[test]
    fn pitch_stays_clamped() {
        let mut camera = camera();
        for _ in 0..100 {
            camera.look(0.0, 5_000.0, true);
            assert!(camera.pitch() <= PITCH_LIMIT);
        }
        assert_eq!(camera.pitch(), PITCH_LIMIT);
        for _ in 0..100 {
            camera.look(13.0, -7_777.0, true);
            assert!(camera.pitch() >= -PITCH_LIMIT);
        }
        assert_eq!(camera.pitch(), -PITCH_LIMIT);
        assert_orthonormal(&camera);
    }

    #[test]
    fn unconstrained_look_leaves_pitch_free() {
        let mut camera = camera();
        camera.look(0.0, 2_000.0, false);
        assert!(camera.pitch() > PITCH_LIMIT);
    }

    #[test]
    fn basis_stays_orthonormal_under_look() {
        let mut camera = camera();
        let offsets = [(10.0, 3.0), (-250.0, 40.0), (1234.0, -900.0), (0.5, 0.25), (-3.0, 5000.0)];
        for (x, y) in offsets {
            camera.look(x, y, true);
            assert_orthonormal(&camera);
        }
    }

    #[test]
    fn zoom_is_clamped() {
        let mut camera = camera();
        camera.zoom_by(10.0);
        assert_eq!(camera.vertical_fov(), 35.0);
        camera.zoom_by(1_000.0);
        assert_eq!(camera.vertical_fov(), MIN_FOV);
        camera.zoom_by(-1_000.0);
        assert_eq!(camera.vertical_fov(), MAX_FOV);
    }

    #[test]
    fn resize_is_idempotent() {
        let mut camera = camera();
        camera.resize(1920, 1080);
        let once = camera.aspect_ratio();
        camera.resize(1920, 1080);
        assert_eq!(camera.aspect_ratio(), once);
        assert!((once - 16.0 / 9.0).abs() < EPS);
    }

    #[test]
    fn matrices_are_pure() {
        let mut camera = camera();
        camera.look(37.0, -12.0, true);
        assert_eq!(camera.view_matrix(), camera.view_matrix());
        assert_eq!(camera.projection_matrix(), camera.projection_matrix());
    }

    #[test]
    fn view_matrix_maps_eye_to_origin() {
        let camera = camera();
        let eye = camera.view_matrix().transform_point3(camera.position());
        assert!(eye.length() < EPS);
        let ahead = camera
            .view_matrix()
            .transform_point3(camera.position() + camera.forward());
        assert!((ahead - Vec3::NEG_Z).length() < EPS);
    }

    #[test]
    fn forward_input_moves_along_forward() {
        let mut camera = camera();
        camera.look(400.0, 150.0, true);
        let start = camera.position();
        camera.move_by(Vec3::Z, 0.5);
        let moved = camera.position() - start;
        let expected = camera.forward() * DEFAULT_SPEED * 0.5;
        assert!((moved - expected).length() < 1e-4);
    }

    #[test]
    fn strafe_input_moves_along_negated_right() {
        let mut camera = camera();
        let start = camera.position();
        camera.move_by(Vec3::X, 1.0);
        let moved = camera.position() - start;
        assert!((moved + camera.right() * DEFAULT_SPEED).length() < 1e-4);
    }

    #[test]
    fn transpose_matches_inverse_of_rotation() {
        let mut camera = camera();
        camera.look(-321.0, 77.0, true);
        let rotation = Mat3::from_mat4(camera.view_matrix());
        let transposed = rotation.transpose();
        let inverted = rotation.inverse();
        for (a, b) in transposed
            .to_cols_array()
            .iter()
            .zip(inverted.to_cols_array().iter())
        {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn zero_direction_does_not_move() {
        let mut camera = camera();
        let start = camera.position();
        camera.move_by(Vec3::ZERO, 0.016);
        assert_eq!(camera.position(), start);
    }
}
