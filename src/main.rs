use bevy::prelude::*;
use bevy::window::{CursorGrabMode, PresentMode};

use tank_sandbox::SandboxGamePlugin;

fn main() {
    let mut window = Window {
        title: "Tank Sandbox".to_string(),
        resolution: (1280., 720.).into(),
        present_mode: PresentMode::AutoNoVsync,
        ..default()
    };
    window.cursor.grab_mode = CursorGrabMode::Locked;
    window.cursor.visible = false;

    App::new()
        .insert_resource(Msaa::Sample4)
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(window),
            ..default()
        }))
        .add_plugins(SandboxGamePlugin::default())
        .run();
}
