use cgmath::{Vector2, Zero};
use winit::keyboard::KeyCode;

use crate::{camera::Camera, input::InputSource};

/// Keys that move the camera along its forward and right axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MovementKeys {
    pub forward: KeyCode,
    pub back: KeyCode,
    pub left: KeyCode,
    pub right: KeyCode,
}

impl Default for MovementKeys {
    fn default() -> Self {
        Self {
            forward: KeyCode::KeyW,
            back: KeyCode::KeyS,
            left: KeyCode::KeyA,
            right: KeyCode::KeyD,
        }
    }
}

/**
 * A [`Camera`] steered by mouse-look and movement keys.
 *
 * Rates are applied per millisecond of elapsed time. Cursor movement is
 * measured against the position sampled on the previous update. The first
 * known position after [`FirstPersonCamera::initialize`], or after the cursor
 * was lost, only sets that baseline and does not rotate.
 */
#[derive(Clone, Debug)]
pub struct FirstPersonCamera {
    camera: Camera,
    rotation_rate: f32,
    movement_rate: f32,
    mouse_sensitivity: f32,
    keys: MovementKeys,
    last_cursor_position: Option<Vector2<f32>>,
}

impl Default for FirstPersonCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl FirstPersonCamera {
    pub const DEFAULT_ROTATION_RATE: f32 = 0.01 * std::f32::consts::PI / 180.0;
    pub const DEFAULT_MOVEMENT_RATE: f32 = 1.0;
    pub const DEFAULT_MOUSE_SENSITIVITY: f32 = 2.0;

    pub fn new() -> Self {
        Self::with_camera(Camera::new())
    }

    pub fn with_camera(camera: Camera) -> Self {
        Self {
            camera,
            rotation_rate: Self::DEFAULT_ROTATION_RATE,
            movement_rate: Self::DEFAULT_MOVEMENT_RATE,
            mouse_sensitivity: Self::DEFAULT_MOUSE_SENSITIVITY,
            keys: MovementKeys::default(),
            last_cursor_position: None,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn rotation_rate(&self) -> f32 {
        self.rotation_rate
    }

    /// Radians per pixel of cursor movement per millisecond, before the mouse
    /// sensitivity is applied.
    pub fn set_rotation_rate(&mut self, rate: f32) {
        self.rotation_rate = rate;
    }

    pub fn movement_rate(&self) -> f32 {
        self.movement_rate
    }

    /// World units per millisecond.
    pub fn set_movement_rate(&mut self, rate: f32) {
        self.movement_rate = rate;
    }

    pub fn mouse_sensitivity(&self) -> f32 {
        self.mouse_sensitivity
    }

    pub fn set_mouse_sensitivity(&mut self, sensitivity: f32) {
        self.mouse_sensitivity = sensitivity;
    }

    pub fn movement_keys(&self) -> MovementKeys {
        self.keys
    }

    pub fn set_movement_keys(&mut self, keys: MovementKeys) {
        self.keys = keys;
    }

    pub fn initialize(&mut self, input: &impl InputSource) {
        self.camera.initialize();
        self.last_cursor_position = input.cursor_position();
    }

    /// Applies one frame of input. `elapsed` is in milliseconds.
    pub fn update(&mut self, input: &impl InputSource, elapsed: f32) {
        let intent = self.movement_intent(input);

        let cursor = input.cursor_position();
        let delta = match (cursor, self.last_cursor_position) {
            (Some(cursor), Some(last)) => cursor - last,
            _ => Vector2::zero(),
        };
        self.last_cursor_position = cursor;

        if !delta.is_zero() {
            let scale = self.mouse_sensitivity * self.rotation_rate * elapsed;
            self.camera.offset_orientation(delta.y * scale, -delta.x * scale);
        }

        if !intent.is_zero() {
            let movement = intent * self.movement_rate * elapsed;
            let position = self.camera.position()
                + self.camera.right() * movement.x
                + self.camera.forward() * movement.y;
            self.camera.set_position(position);
        }

        self.camera.update(elapsed);
    }

    /// +Y forward, +X left. Later keys win on the same axis.
    fn movement_intent(&self, input: &impl InputSource) -> Vector2<f32> {
        let mut intent = Vector2::zero();
        if input.is_key_down(self.keys.forward) {
            intent.y = 1.0;
        }
        if input.is_key_down(self.keys.back) {
            intent.y = -1.0;
        }
        if input.is_key_down(self.keys.left) {
            intent.x = 1.0;
        }
        if input.is_key_down(self.keys.right) {
            intent.x = -1.0;
        }
        intent
    }
}
