mod common;

use scene_ngin::{
    KeyCode,
    camera::FirstPersonCamera,
    cgmath::{InnerSpace, Vector3},
};

use crate::common::test_utils::ScriptedInput;

fn assert_close(a: Vector3<f32>, b: Vector3<f32>) {
    assert!((a - b).magnitude() < 1e-4, "{:?} != {:?}", a, b);
}

#[test]
fn walking_forward_for_several_frames() {
    let mut input = ScriptedInput::new();
    let mut camera = FirstPersonCamera::new();
    camera.initialize(&input);

    input.press(KeyCode::KeyW);
    for _ in 0..10 {
        camera.update(&input, 16.0);
    }

    assert_close(camera.camera().position(), Vector3::new(0.0, 0.0, 160.0));
}

#[test]
fn strafing_left_moves_along_positive_x() {
    let mut input = ScriptedInput::new();
    let mut camera = FirstPersonCamera::new();
    camera.initialize(&input);
    camera.set_movement_rate(0.5);

    input.press(KeyCode::KeyA);
    camera.update(&input, 4.0);
    input.release(KeyCode::KeyA).press(KeyCode::KeyD);
    camera.update(&input, 2.0);

    assert_close(camera.camera().position(), Vector3::new(1.0, 0.0, 0.0));
}

#[test]
fn looking_around_is_not_gated_on_a_mouse_button() {
    let mut input = ScriptedInput::new();
    let mut camera = FirstPersonCamera::new();
    camera.initialize(&input);

    input.move_cursor_by(-300.0, 0.0);
    camera.update(&input, 16.0);

    let expected_yaw = 300.0 * 2.0 * 0.01f32.to_radians() * 16.0;
    assert!((camera.camera().yaw() - expected_yaw).abs() < 1e-5);
    assert_eq!(camera.camera().pitch(), 0.0);
}

#[test]
fn cursor_leaving_and_reentering_does_not_snap_the_view() {
    let mut input = ScriptedInput::new();
    let mut camera = FirstPersonCamera::new();
    camera.initialize(&input);

    input.move_cursor_by(10.0, 0.0);
    camera.update(&input, 1.0);
    let yaw = camera.camera().yaw();
    assert!(yaw < 0.0);

    input.leave_window();
    camera.update(&input, 16.0);
    input.move_cursor_to(800.0, 600.0);
    camera.update(&input, 16.0);

    assert_eq!(camera.camera().yaw(), yaw);
    assert_eq!(camera.camera().pitch(), 0.0);
}

#[test]
fn camera_matrices_stay_consistent_while_moving() {
    let mut input = ScriptedInput::new();
    let mut camera = FirstPersonCamera::new();
    camera.camera_mut().set_aspect_ratio(16.0 / 9.0);
    camera.initialize(&input);

    input.press(KeyCode::KeyW).move_cursor_by(12.0, -7.0);
    camera.update(&input, 8.0);

    let inner = camera.camera_mut();
    let product = inner.view_projection_matrix();
    let expected = inner.projection_matrix() * inner.view_matrix();
    let (product, expected): ([[f32; 4]; 4], [[f32; 4]; 4]) = (product.into(), expected.into());
    for (a, b) in product.iter().flatten().zip(expected.iter().flatten()) {
        assert!((a - b).abs() < 1e-5);
    }
}
