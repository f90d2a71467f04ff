use bevy::prelude::*;

use crate::config::SandboxConfig;
use crate::deferred::DeferredPlugin;
use crate::destructible::{spawn_destructible, Destructible, DestructibleConfig, DestructiblesPlugin};
use crate::effects::EffectsPlugin;
use crate::hud::HudPlugin;
use crate::input::TankInputPlugin;
use crate::materials::{solid_material, MaterialsPlugin, MeshShape, SandboxAssets, BASIC_SHAPE_SIZE};
use crate::physics::{PhysicsPlugin, GROUND_HEIGHT};
use crate::projectile::ProjectilesPlugin;
use crate::tank::{spawn_tank, TankCamera, TankPlugin, TANK_HALF_HEIGHT};
use crate::tread::TreadsPlugin;

/// Side of the square ground in world units.
const GROUND_SIZE: f32 = 10_000.;
const GROUND_THICKNESS: f32 = 10.;

#[derive(Default)]
pub struct SandboxGamePlugin {
    pub config: SandboxConfig,
}

impl Plugin for SandboxGamePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.config.clone().validated_or_default())
            .insert_resource(AmbientLight {
                color: Color::WHITE,
                brightness: 200.,
            })
            .add_plugins((
                MaterialsPlugin,
                PhysicsPlugin,
                DeferredPlugin,
                EffectsPlugin,
                TreadsPlugin,
                DestructiblesPlugin,
                ProjectilesPlugin,
                TankPlugin,
                TankInputPlugin,
                HudPlugin,
            ))
            .add_systems(Startup, (setup_light, setup_scene));
    }
}

fn setup_light(mut commands: Commands) {
    commands.spawn(DirectionalLightBundle {
        directional_light: DirectionalLight {
            shadows_enabled: true,
            ..default()
        },
        transform: Transform::from_xyz(0., 1000., 0.).looking_at(Vec3::new(400., 0., 300.), Vec3::Y),
        ..default()
    });
}

fn setup_scene(
    mut commands: Commands,
    config: Res<SandboxConfig>,
    assets: Option<Res<SandboxAssets>>,
    mut materials: Option<ResMut<Assets<StandardMaterial>>>,
) {
    if let (Some(assets), Some(materials)) = (assets.as_deref(), materials.as_deref_mut()) {
        commands.spawn((
            PbrBundle {
                mesh: assets.mesh(MeshShape::Cube),
                material: solid_material(materials, Vec3::new(0.3, 0.32, 0.25)),
                transform: Transform::from_xyz(0., GROUND_HEIGHT - GROUND_THICKNESS / 2., 0.)
                    .with_scale(Vec3::new(
                        GROUND_SIZE / BASIC_SHAPE_SIZE,
                        GROUND_THICKNESS / BASIC_SHAPE_SIZE,
                        GROUND_SIZE / BASIC_SHAPE_SIZE,
                    )),
                ..default()
            },
            Name::new("Ground"),
        ));
    }

    let tank = spawn_tank(
        &mut commands,
        assets.as_deref(),
        materials.as_deref_mut(),
        &config,
        Transform::from_xyz(0., GROUND_HEIGHT + TANK_HALF_HEIGHT, 0.),
    );
    commands.spawn((Camera3dBundle::default(), TankCamera { target: tank }));

    let props = prop_layout();
    info!("Spawn sandbox with {} props", props.len());
    for (config, position) in props {
        let transform = Transform::from_translation(position).with_scale(config.body_scale);
        spawn_destructible(
            &mut commands,
            assets.as_deref(),
            materials.as_deref_mut(),
            Destructible::new(config),
            transform,
            None,
        );
    }
}

/// Rows of crates in front of the tank with barrels between them.
pub fn prop_layout() -> Vec<(DestructibleConfig, Vec3)> {
    let mut props = Vec::new();
    for row in 0..3 {
        for column in 0..5 {
            let x = 1500. + 300. * row as f32;
            let z = -800. + 400. * column as f32;
            let config = if (row + column) % 3 == 1 {
                DestructibleConfig::explosive_barrel()
            } else {
                DestructibleConfig::wooden_crate()
            };
            let y = GROUND_HEIGHT + BASIC_SHAPE_SIZE / 2. * config.body_scale.y;
            props.push((config, Vec3::new(x, y, z)));
        }
    }
    // A stack of crates
    let crate_config = DestructibleConfig::wooden_crate();
    for level in 0..3 {
        let y = GROUND_HEIGHT + BASIC_SHAPE_SIZE * (level as f32 + 0.5);
        props.push((crate_config.clone(), Vec3::new(800., y, 600.)));
    }
    props
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prop_layout() {
        let props = prop_layout();
        assert_eq!(props.len(), 18);
        let barrels = props
            .iter()
            .filter(|(config, _)| config.shape == MeshShape::Cylinder)
            .count();
        assert_eq!(barrels, 5);

        for (config, position) in props.iter() {
            let half_height = BASIC_SHAPE_SIZE / 2. * config.body_scale.y;
            assert!(position.y - half_height >= GROUND_HEIGHT - 1e-3);
            assert!(config.validate().is_ok());
        }
    }
}
