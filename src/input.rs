use bevy::input::mouse::MouseMotion;
use bevy::prelude::*;

use crate::components::{configure_sandbox_sets, SandboxSet};

/// Reads keyboard and mouse into `TankCommand`. Not needed by apps which
/// drive the tank some other way.
pub struct TankInputPlugin;

impl Plugin for TankInputPlugin {
    fn build(&self, app: &mut App) {
        configure_sandbox_sets(app);
        app.init_resource::<TankCommand>().add_systems(
            Update,
            read_tank_controls_system.in_set(SandboxSet::Input),
        );
    }
}

/// Player intent for the current frame.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct TankCommand {
    /// Forward/backward axis in `[-1, 1]`.
    pub throttle: f32,
    /// Right/left axis in `[-1, 1]`, positive turns right.
    pub turn: f32,
    /// Accumulated mouse motion: `x` is yaw to the right, `y` is pitch up.
    pub look: Vec2,
    pub fire: bool,
}

/// Value of an axis made from two buttons.
pub fn axis_value<T>(input: &ButtonInput<T>, positive: T, negative: T) -> f32
where
    T: Copy + Eq + std::hash::Hash + Send + Sync + 'static,
{
    let mut value = 0.;
    if input.pressed(positive) {
        value += 1.;
    }
    if input.pressed(negative) {
        value -= 1.;
    }
    value
}

/// Screen-space mouse delta into look delta, moving mouse up raises the aim.
#[inline]
pub fn look_from_mouse(delta: Vec2) -> Vec2 {
    Vec2::new(delta.x, -delta.y)
}

fn read_tank_controls_system(
    keys: Res<ButtonInput<KeyCode>>,
    mouse_buttons: Res<ButtonInput<MouseButton>>,
    mut mouse_motion: EventReader<MouseMotion>,
    mut command: ResMut<TankCommand>,
) {
    let look = mouse_motion
        .read()
        .fold(Vec2::ZERO, |acc, motion| acc + look_from_mouse(motion.delta));
    *command = TankCommand {
        throttle: axis_value(&keys, KeyCode::KeyW, KeyCode::KeyS),
        turn: axis_value(&keys, KeyCode::KeyD, KeyCode::KeyA),
        look,
        fire: mouse_buttons.pressed(MouseButton::Left) || keys.pressed(KeyCode::Space),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_value() {
        let mut keys = ButtonInput::<KeyCode>::default();
        assert_eq!(axis_value(&keys, KeyCode::KeyW, KeyCode::KeyS), 0.);

        keys.press(KeyCode::KeyW);
        assert_eq!(axis_value(&keys, KeyCode::KeyW, KeyCode::KeyS), 1.);

        keys.press(KeyCode::KeyS);
        assert_eq!(axis_value(&keys, KeyCode::KeyW, KeyCode::KeyS), 0.);

        keys.release(KeyCode::KeyW);
        assert_eq!(axis_value(&keys, KeyCode::KeyW, KeyCode::KeyS), -1.);
    }

    #[test]
    fn test_mouse_up_raises_aim() {
        assert_eq!(look_from_mouse(Vec2::new(3., -2.)), Vec2::new(3., 2.));
    }
}
