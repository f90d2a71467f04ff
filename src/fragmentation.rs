//! Recursive breaking of destroyed objects into debris.
//!
//! Every piece of debris is a destructible object itself, one generation
//! deeper than its parent, so it may break again until the break depth
//! limit of its config is reached.
use std::f32::consts::TAU;
use std::ops::RangeInclusive;

use bevy::prelude::*;
use rand::Rng;

use crate::components::{Collider, SandboxRng};
use crate::damage::{radial_damage_events, DamageEvent, DestroyedEvent};
use crate::deferred::{DeferredAction, DeferredQueue};
use crate::destructible::{spawn_destructible, Destructible, DestructibleConfig};
use crate::effects::{spawn_effect, EffectParams};
use crate::materials::{MeshShape, SandboxAssets, BASIC_SHAPE_SIZE};
use crate::physics::PhysicsBody;
use crate::world_query::ColliderSnapshot;
use crate::UP;

/// Health of debris relative to the max health of its parent.
pub const DEBRIS_HEALTH_FRACTION: f32 = 0.3;
/// Radius of the sphere around the parent origin where debris appear.
pub const DEBRIS_SCATTER_RADIUS: f32 = 30.;
pub const DEBRIS_SCALE_VARIATION: RangeInclusive<f32> = 0.7..=1.3;
pub const DEBRIS_COLOR_VARIATION: RangeInclusive<f32> = 0.8..=1.2;
/// Added to the vertical component of scatter direction.
pub const UPWARD_BIAS: f32 = 0.5;
/// Share of the debris force pushing debris away from the impact.
pub const IMPACT_FRACTION: f32 = 0.5;
/// Angular impulse of debris in degrees per second.
pub const DEBRIS_TORQUE: f32 = 100.;
/// Seconds before debris is removed from the scene.
pub const DEBRIS_LIFETIME: f32 = 5.;

/// Everything needed to spawn one piece of debris.
#[derive(Debug, Clone)]
pub struct DebrisSpawn {
    pub destructible: Destructible,
    pub transform: Transform,
    pub impulse: Vec3,
    /// Degrees per second.
    pub angular_impulse: Vec3,
}

/// Uniformly distributed point on the unit sphere.
pub fn random_unit_vector<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    let y: f32 = rng.gen_range(-1.0..=1.0);
    let angle: f32 = rng.gen_range(0.0..TAU);
    let r = (1. - y * y).max(0.).sqrt();
    Vec3::new(r * angle.cos(), y, r * angle.sin())
}

/// Random direction which never points down.
pub fn upward_scatter_direction<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    let mut direction = random_unit_vector(rng);
    direction.y = direction.y.abs() + UPWARD_BIAS;
    direction.try_normalize().unwrap_or(UP)
}

/// Outward and upward push which still leans away from the impact.
pub fn debris_impulse<R: Rng + ?Sized>(rng: &mut R, force: f32, impact_direction: Vec3) -> Vec3 {
    upward_scatter_direction(rng) * force + impact_direction * force * IMPACT_FRACTION
}

/// Size of debris relative to its parent: `debris_scale` for the first
/// generation, halved for every next one.
#[inline]
pub fn generation_scale(debris_scale: f32, parent_depth: u32) -> f32 {
    debris_scale * 0.5_f32.powi(parent_depth as i32)
}

pub fn debris_config(parent: &DestructibleConfig, color_variation: f32) -> DestructibleConfig {
    DestructibleConfig {
        name: "Debris",
        max_health: parent.max_health * DEBRIS_HEALTH_FRACTION,
        debris_color: parent.debris_color * color_variation,
        shape: MeshShape::Cube,
        ..parent.clone()
    }
}

/// Returns debris which must replace a destroyed object or nothing if the
/// object has reached its break depth limit.
pub fn plan_debris<R: Rng + ?Sized>(
    parent: &Destructible,
    parent_transform: &Transform,
    impact_direction: Vec3,
    rng: &mut R,
) -> Vec<DebrisSpawn> {
    if !parent.can_fragment() {
        return Vec::new();
    }
    let config = parent.config();
    let origin = parent_transform.translation;
    let scatter_radius = DEBRIS_SCATTER_RADIUS * parent_transform.scale.abs().max_element();
    let base_scale =
        parent_transform.scale * generation_scale(config.debris_scale, parent.break_depth());

    (0..config.debris_count)
        .map(|_| {
            let position = origin + random_unit_vector(rng) * scatter_radius;
            let rotation = Quat::from_euler(
                EulerRot::XYZ,
                rng.gen_range(0.0..TAU),
                rng.gen_range(0.0..TAU),
                rng.gen_range(0.0..TAU),
            );
            let scale = base_scale * rng.gen_range(DEBRIS_SCALE_VARIATION);
            let child_config = debris_config(config, rng.gen_range(DEBRIS_COLOR_VARIATION));
            DebrisSpawn {
                destructible: Destructible::with_break_depth(
                    child_config,
                    parent.break_depth() + 1,
                ),
                transform: Transform {
                    translation: position,
                    rotation,
                    scale,
                },
                impulse: debris_impulse(rng, config.debris_force, impact_direction),
                angular_impulse: random_unit_vector(rng) * DEBRIS_TORQUE,
            }
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn destruction_system(
    mut commands: Commands,
    mut destroyed_events: EventReader<DestroyedEvent>,
    mut damage_events: EventWriter<DamageEvent>,
    mut rng: ResMut<SandboxRng>,
    mut queue: ResMut<DeferredQueue>,
    assets: Option<Res<SandboxAssets>>,
    mut materials: Option<ResMut<Assets<StandardMaterial>>>,
    colliders: Query<(Entity, &Transform, &Collider), With<Destructible>>,
) {
    let mut snapshot: Option<ColliderSnapshot> = None;

    for event in destroyed_events.read() {
        let destructible = &event.destructible;
        let depth = destructible.break_depth();
        let effect = destructible.config().effect;
        let position = event.transform.translation;
        debug!(
            "Destroy {} of generation {}",
            destructible.config().name,
            depth
        );

        if let (Some(kind), Some(scale)) = (effect.kind(), effect.scale_at_depth(depth)) {
            spawn_effect(
                &mut commands,
                assets.as_deref(),
                materials.as_deref_mut(),
                &mut queue,
                EffectParams {
                    kind,
                    position,
                    scale,
                    duration: effect.duration(),
                },
            );
        }

        if let Some((radius, damage)) = effect.radial_damage(depth) {
            let snapshot =
                snapshot.get_or_insert_with(|| ColliderSnapshot::collect(&colliders, None));
            let events = radial_damage_events(
                &*snapshot,
                position,
                radius,
                damage,
                &[event.entity],
                Some(event.entity),
            );
            debug!("Explosion damages {} objects", events.len());
            for damage_event in events {
                damage_events.send(damage_event);
            }
        }

        let debris = plan_debris(
            destructible,
            &event.transform,
            event.impact_direction,
            &mut rng.0,
        );
        if !debris.is_empty() {
            debug!("Spawn {} pieces of debris", debris.len());
        }
        for piece in debris {
            let half_height = BASIC_SHAPE_SIZE / 2. * piece.transform.scale.y;
            let mut body = PhysicsBody::new(half_height);
            body.apply_impulse(piece.impulse, piece.angular_impulse);
            let entity = spawn_destructible(
                &mut commands,
                assets.as_deref(),
                materials.as_deref_mut(),
                piece.destructible,
                piece.transform,
                Some(body),
            );
            queue.schedule(DEBRIS_LIFETIME, entity, DeferredAction::Despawn);
        }

        if let Some(entity_commands) = commands.get_entity(event.entity) {
            entity_commands.despawn_recursive();
        }
    }
}
