use bevy::prelude::*;

use crate::components::{configure_sandbox_sets, SandboxSet};
use crate::deferred::{DeferredAction, DeferredQueue};
use crate::materials::{MeshShape, SandboxAssets};

/// Seconds an effect takes to grow to its full size.
const GROWTH_TIME: f32 = 0.25;
/// Seconds a deactivated effect takes to fade out.
const FADE_TIME: f32 = 0.5;
/// Smallest scale of a growing effect, zero scale breaks normals of meshes.
const MIN_SCALE: f32 = 0.01;

pub struct EffectsPlugin;

impl Plugin for EffectsPlugin {
    fn build(&self, app: &mut App) {
        configure_sandbox_sets(app);
        app.add_systems(Update, animate_effects_system.in_set(SandboxSet::Simulation))
            .add_systems(PostUpdate, update_effect_alpha_system);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    Fire,
    Explosion,
}

impl EffectKind {
    fn color(self) -> Color {
        match self {
            EffectKind::Fire => Color::rgba(1., 0.45, 0.1, 1.),
            EffectKind::Explosion => Color::rgba(242. / 255., 68. / 255., 15. / 255., 1.),
        }
    }
}

/// One-shot visual effect: grows up to its scale, burns until deactivated
/// and then fades out.
#[derive(Debug, Clone, Copy, Component)]
pub struct Effect {
    pub kind: EffectKind,
    pub scale: f32,
    pub opacity: f32,
    elapsed: f32,
    fading: f32,
}

impl Effect {
    pub fn new(kind: EffectKind, scale: f32) -> Self {
        Self {
            kind,
            scale,
            opacity: 1.,
            elapsed: 0.,
            fading: 0.,
        }
    }

    #[inline]
    pub fn current_scale(&self) -> f32 {
        (self.scale * (self.elapsed / GROWTH_TIME).min(1.)).max(MIN_SCALE)
    }

    /// Advances the effect and returns `false` when it has faded out completely.
    pub fn advance(&mut self, dt: f32, deactivated: bool) -> bool {
        self.elapsed += dt;
        if deactivated {
            self.fading += dt;
            self.opacity = (1. - self.fading / FADE_TIME).max(0.);
        }
        self.opacity > 0.
    }
}

/// Marks an effect that must stop and fade out.
#[derive(Debug, Clone, Copy, Component)]
pub struct EffectDeactivated;

pub struct EffectParams {
    pub kind: EffectKind,
    pub position: Vec3,
    pub scale: f32,
    /// Seconds before the effect is deactivated.
    pub duration: f32,
}

/// Spawns an effect which plays right away and deactivates itself after
/// its duration. Visuals are attached only if meshes and materials exist.
pub fn spawn_effect(
    commands: &mut Commands,
    assets: Option<&SandboxAssets>,
    materials: Option<&mut Assets<StandardMaterial>>,
    queue: &mut DeferredQueue,
    params: EffectParams,
) -> Entity {
    debug!("Spawn {:?} effect", params.kind);
    let effect = Effect::new(params.kind, params.scale);
    let transform =
        Transform::from_translation(params.position).with_scale(Vec3::splat(MIN_SCALE));

    let mut entity_commands = match (assets, materials) {
        (Some(assets), Some(materials)) => {
            let material = materials.add(StandardMaterial {
                base_color: params.kind.color(),
                alpha_mode: AlphaMode::Blend,
                unlit: true,
                ..default()
            });
            commands.spawn((
                PbrBundle {
                    mesh: assets.mesh(MeshShape::Sphere),
                    material,
                    transform,
                    ..default()
                },
                effect,
            ))
        }
        _ => {
            debug!("Effect has no visuals");
            commands.spawn((SpatialBundle::from_transform(transform), effect))
        }
    };
    let entity = entity_commands.id();
    entity_commands.insert(Name::new(format!("{:?}Effect", params.kind)));
    queue.schedule(params.duration, entity, DeferredAction::DeactivateEffect);
    entity
}

fn animate_effects_system(
    mut commands: Commands,
    time: Res<Time>,
    mut effects: Query<(Entity, &mut Effect, &mut Transform, Has<EffectDeactivated>)>,
) {
    let dt = time.delta_seconds();
    for (entity, mut effect, mut transform, deactivated) in effects.iter_mut() {
        if effect.advance(dt, deactivated) {
            transform.scale = Vec3::splat(effect.current_scale());
        } else {
            commands.entity(entity).despawn_recursive();
            debug!("Effect removed");
        }
    }
}

fn update_effect_alpha_system(
    materials: Option<ResMut<Assets<StandardMaterial>>>,
    query: Query<(&Effect, &Handle<StandardMaterial>), Changed<Effect>>,
) {
    let Some(mut materials) = materials else {
        return;
    };
    for (effect, handle) in query.iter() {
        if let Some(material) = materials.get_mut(handle) {
            material.base_color.set_a(effect.opacity);
        }
    }
}
