use bevy::prelude::*;

pub const CROSSHAIR_SIZE: f32 = 20.;
pub const CROSSHAIR_GAP: f32 = 6.;
pub const CROSSHAIR_THICKNESS: f32 = 2.;
pub const CROSSHAIR_DOT: f32 = 4.;

pub struct HudPlugin;

impl Plugin for HudPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_crosshair);
    }
}

#[derive(Clone, Copy, Component)]
pub struct Crosshair;

#[inline]
pub fn crosshair_color() -> Color {
    Color::rgba(0.2, 1.0, 0.2, 0.9)
}

/// Rectangle relative to the centre of the screen, `y` points down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrosshairRect {
    pub center: Vec2,
    pub size: Vec2,
}

/// Four arms around the screen centre plus a dot in the middle.
pub fn crosshair_rects() -> [CrosshairRect; 5] {
    let arm_offset = CROSSHAIR_GAP + CROSSHAIR_SIZE / 2.;
    let vertical = Vec2::new(CROSSHAIR_THICKNESS, CROSSHAIR_SIZE);
    let horizontal = Vec2::new(CROSSHAIR_SIZE, CROSSHAIR_THICKNESS);
    [
        CrosshairRect {
            center: Vec2::new(0., -arm_offset),
            size: vertical,
        },
        CrosshairRect {
            center: Vec2::new(0., arm_offset),
            size: vertical,
        },
        CrosshairRect {
            center: Vec2::new(-arm_offset, 0.),
            size: horizontal,
        },
        CrosshairRect {
            center: Vec2::new(arm_offset, 0.),
            size: horizontal,
        },
        CrosshairRect {
            center: Vec2::ZERO,
            size: Vec2::splat(CROSSHAIR_DOT),
        },
    ]
}

fn setup_crosshair(mut commands: Commands) {
    commands
        .spawn((
            NodeBundle {
                style: Style {
                    width: Val::Percent(100.),
                    height: Val::Percent(100.),
                    position_type: PositionType::Absolute,
                    ..default()
                },
                ..default()
            },
            Name::new("Hud"),
        ))
        .with_children(|parent| {
            for rect in crosshair_rects() {
                parent.spawn((crosshair_node(rect), Crosshair));
            }
        });
}

fn crosshair_node(rect: CrosshairRect) -> NodeBundle {
    let top_left = rect.center - rect.size / 2.;
    NodeBundle {
        style: Style {
            position_type: PositionType::Absolute,
            left: Val::Percent(50.),
            top: Val::Percent(50.),
            width: Val::Px(rect.size.x),
            height: Val::Px(rect.size.y),
            margin: UiRect {
                left: Val::Px(top_left.x),
                top: Val::Px(top_left.y),
                ..default()
            },
            ..default()
        },
        background_color: crosshair_color().into(),
        ..default()
    }
}
