//! Camera state with lazily cached view and projection matrices.
//!
//! Mutators only record what changed; the matrices are rebuilt the next time
//! they are requested. [`first_person`] drives a [`Camera`] from keyboard and
//! mouse input.

pub mod first_person;

use cgmath::{EuclideanSpace, Matrix4, Point3, Quaternion, Rad, Rotation3, SquareMatrix, Vector3, Zero};

pub use first_person::{FirstPersonCamera, MovementKeys};

/**
 * A perspective camera described by position, pitch and yaw.
 *
 * Pitch and yaw accumulate without clamping; roll is always zero. The view
 * matrix is only valid while `view_dirty` is false and the projection matrix
 * while `projection_dirty` is false. The view-projection product tracks its
 * own flag so the order in which the getters are called never yields a stale
 * product.
 */
#[derive(Clone, Debug)]
pub struct Camera {
    position: Vector3<f32>,
    pitch: f32,
    yaw: f32,
    field_of_view: f32,
    aspect_ratio: f32,
    near_plane_distance: f32,
    far_plane_distance: f32,

    view: Matrix4<f32>,
    projection: Matrix4<f32>,
    view_projection: Matrix4<f32>,
    view_dirty: bool,
    projection_dirty: bool,
    view_projection_dirty: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera {
    pub const DEFAULT_FIELD_OF_VIEW: f32 = std::f32::consts::FRAC_PI_4;
    pub const DEFAULT_ASPECT_RATIO: f32 = 1.0;
    pub const DEFAULT_NEAR_PLANE_DISTANCE: f32 = 0.01;
    pub const DEFAULT_FAR_PLANE_DISTANCE: f32 = 10000.0;

    pub fn new() -> Self {
        Self {
            position: Vector3::zero(),
            pitch: 0.0,
            yaw: 0.0,
            field_of_view: Self::DEFAULT_FIELD_OF_VIEW,
            aspect_ratio: Self::DEFAULT_ASPECT_RATIO,
            near_plane_distance: Self::DEFAULT_NEAR_PLANE_DISTANCE,
            far_plane_distance: Self::DEFAULT_FAR_PLANE_DISTANCE,
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
            view_projection: Matrix4::identity(),
            view_dirty: true,
            projection_dirty: true,
            view_projection_dirty: true,
        }
    }

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn field_of_view(&self) -> f32 {
        self.field_of_view
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn near_plane_distance(&self) -> f32 {
        self.near_plane_distance
    }

    pub fn far_plane_distance(&self) -> f32 {
        self.far_plane_distance
    }

    pub fn set_position(&mut self, position: Vector3<f32>) {
        self.position = position;
        self.view_dirty = true;
    }

    pub fn set_orientation(&mut self, pitch: f32, yaw: f32) {
        self.pitch = pitch;
        self.yaw = yaw;
        self.view_dirty = true;
    }

    pub fn offset_orientation(&mut self, pitch: f32, yaw: f32) {
        self.set_orientation(self.pitch + pitch, self.yaw + yaw);
    }

    /// Vertical field of view in radians.
    pub fn set_field_of_view(&mut self, field_of_view: f32) {
        self.field_of_view = field_of_view;
        self.projection_dirty = true;
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
        self.projection_dirty = true;
    }

    pub fn set_near_plane_distance(&mut self, distance: f32) {
        self.near_plane_distance = distance;
        self.projection_dirty = true;
    }

    pub fn set_far_plane_distance(&mut self, distance: f32) {
        self.far_plane_distance = distance;
        self.projection_dirty = true;
    }

    /// Yaw about Y applied after pitch about X.
    pub fn rotation(&self) -> Quaternion<f32> {
        Quaternion::from_angle_y(Rad(self.yaw)) * Quaternion::from_angle_x(Rad(self.pitch))
    }

    pub fn forward(&self) -> Vector3<f32> {
        self.rotation() * Vector3::unit_z()
    }

    pub fn right(&self) -> Vector3<f32> {
        self.rotation() * Vector3::unit_x()
    }

    pub fn up(&self) -> Vector3<f32> {
        self.rotation() * Vector3::unit_y()
    }

    pub fn view_matrix(&mut self) -> Matrix4<f32> {
        if self.view_dirty {
            self.update_view_matrix();
        }
        self.view
    }

    pub fn projection_matrix(&mut self) -> Matrix4<f32> {
        if self.projection_dirty {
            self.update_projection_matrix();
        }
        self.projection
    }

    pub fn view_projection_matrix(&mut self) -> Matrix4<f32> {
        let view = self.view_matrix();
        let projection = self.projection_matrix();
        if self.view_projection_dirty {
            self.view_projection = projection * view;
            self.view_projection_dirty = false;
        }
        self.view_projection
    }

    /// Back to the origin looking down +Z. The view matrix is rebuilt
    /// immediately.
    pub fn reset(&mut self) {
        self.position = Vector3::zero();
        self.pitch = 0.0;
        self.yaw = 0.0;
        self.update_view_matrix();
    }

    pub fn initialize(&mut self) {
        self.update_projection_matrix();
        self.reset();
    }

    /// Refreshes whatever matrices are stale. A plain camera does not move on
    /// its own, so `elapsed` is unused here.
    pub fn update(&mut self, _elapsed: f32) {
        self.view_projection_matrix();
    }

    fn update_view_matrix(&mut self) {
        let eye = Point3::from_vec(self.position);
        self.view = Matrix4::look_at_rh(eye, eye + self.forward(), self.up());
        self.view_dirty = false;
        self.view_projection_dirty = true;
    }

    fn update_projection_matrix(&mut self) {
        self.projection = cgmath::perspective(
            Rad(self.field_of_view),
            self.aspect_ratio,
            self.near_plane_distance,
            self.far_plane_distance,
        );
        self.projection_dirty = false;
        self.view_projection_dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{InnerSpace, Matrix4};

    use super::*;

    fn assert_matrix_eq(a: Matrix4<f32>, b: Matrix4<f32>) {
        let a: [[f32; 4]; 4] = a.into();
        let b: [[f32; 4]; 4] = b.into();
        for (col_a, col_b) in a.iter().zip(b.iter()) {
            for (x, y) in col_a.iter().zip(col_b.iter()) {
                assert!((x - y).abs() < 1e-4, "{:?} != {:?}", a, b);
            }
        }
    }

    fn assert_vector_eq(a: Vector3<f32>, b: Vector3<f32>) {
        assert!((a - b).magnitude() < 1e-5, "{:?} != {:?}", a, b);
    }

    #[test]
    fn basis_at_rest_is_canonical() {
        let camera = Camera::new();
        assert_vector_eq(camera.forward(), Vector3::unit_z());
        assert_vector_eq(camera.right(), Vector3::unit_x());
        assert_vector_eq(camera.up(), Vector3::unit_y());
    }

    #[test]
    fn yaw_turns_forward_towards_x() {
        let mut camera = Camera::new();
        camera.set_orientation(0.0, std::f32::consts::FRAC_PI_2);
        assert_vector_eq(camera.forward(), Vector3::unit_x());
        assert_vector_eq(camera.up(), Vector3::unit_y());
    }

    #[test]
    fn pitch_is_applied_before_yaw() {
        let mut camera = Camera::new();
        camera.set_orientation(0.3, 1.1);
        let expected = Quaternion::from_angle_y(Rad(1.1f32))
            * (Quaternion::from_angle_x(Rad(0.3f32)) * Vector3::unit_z());
        assert_vector_eq(camera.forward(), expected);
    }

    #[test]
    fn view_reflects_latest_pose() {
        let mut camera = Camera::new();
        camera.initialize();
        camera.set_position(Vector3::new(1.0, 2.0, 3.0));
        camera.set_orientation(0.2, -0.4);

        let eye = Point3::new(1.0, 2.0, 3.0);
        let expected = Matrix4::look_at_rh(eye, eye + camera.forward(), camera.up());
        assert_matrix_eq(camera.view_matrix(), expected);
    }

    #[test]
    fn projection_ignores_pose_changes() {
        let mut camera = Camera::new();
        camera.initialize();
        let before = camera.projection_matrix();
        camera.set_position(Vector3::new(5.0, 0.0, -2.0));
        camera.offset_orientation(0.5, 0.5);
        assert_matrix_eq(camera.projection_matrix(), before);
    }

    #[test]
    fn projection_setters_are_applied() {
        let mut camera = Camera::new();
        camera.initialize();
        camera.set_field_of_view(1.0);
        camera.set_aspect_ratio(16.0 / 9.0);
        camera.set_near_plane_distance(0.5);
        camera.set_far_plane_distance(50.0);
        let expected = cgmath::perspective(Rad(1.0), 16.0 / 9.0, 0.5, 50.0);
        assert_matrix_eq(camera.projection_matrix(), expected);
    }

    #[test]
    fn view_projection_is_never_stale() {
        let mut camera = Camera::new();
        camera.initialize();
        camera.view_projection_matrix();

        // Refresh the sub-matrices first, then ask for the product.
        camera.set_position(Vector3::new(0.0, 1.0, 0.0));
        camera.set_aspect_ratio(2.0);
        let view = camera.view_matrix();
        let projection = camera.projection_matrix();
        assert_matrix_eq(camera.view_projection_matrix(), projection * view);

        // Ask for the product straight away.
        camera.offset_orientation(0.1, 0.2);
        camera.set_field_of_view(0.7);
        let product = camera.view_projection_matrix();
        assert_matrix_eq(product, camera.projection_matrix() * camera.view_matrix());
    }

    #[test]
    fn offset_orientation_matches_set_orientation() {
        let mut offset = Camera::new();
        offset.set_orientation(0.25, -1.0);
        offset.offset_orientation(0.1, 0.3);

        let mut set = Camera::new();
        set.set_orientation(0.25 + 0.1, -1.0 + 0.3);

        assert!((offset.pitch() - set.pitch()).abs() < 1e-6);
        assert!((offset.yaw() - set.yaw()).abs() < 1e-6);
        assert_matrix_eq(offset.view_matrix(), set.view_matrix());
    }

    #[test]
    fn orientation_is_not_clamped() {
        let mut camera = Camera::new();
        camera.offset_orientation(4.0, 10.0);
        camera.offset_orientation(4.0, 10.0);
        assert_eq!(camera.pitch(), 8.0);
        assert_eq!(camera.yaw(), 20.0);
    }

    #[test]
    fn reset_returns_to_origin() {
        let mut camera = Camera::new();
        camera.initialize();
        camera.set_position(Vector3::new(3.0, 3.0, 3.0));
        camera.set_orientation(1.0, 1.0);
        camera.reset();
        assert_eq!(camera.position(), Vector3::zero());
        assert_eq!((camera.pitch(), camera.yaw()), (0.0, 0.0));
        let origin = Point3::new(0.0, 0.0, 0.0);
        assert_matrix_eq(
            camera.view_matrix(),
            Matrix4::look_at_rh(origin, origin + Vector3::unit_z(), Vector3::unit_y()),
        );
    }

    #[test]
    fn update_does_not_move_the_camera() {
        let mut camera = Camera::new();
        camera.initialize();
        camera.set_position(Vector3::new(1.0, 0.0, 0.0));
        camera.update(0.0);
        camera.update(16.0);
        assert_eq!(camera.position(), Vector3::new(1.0, 0.0, 0.0));
        assert_eq!((camera.pitch(), camera.yaw()), (0.0, 0.0));
    }
}
