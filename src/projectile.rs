//! Tank shells: ballistic flight, hit detection by tracing the travelled
//! segment and an explosion which damages everything around.
use bevy::prelude::*;

use crate::components::{configure_sandbox_sets, Collider, SandboxSet};
use crate::config::ProjectileTuning;
use crate::damage::{radial_damage_events, DamageEvent};
use crate::deferred::{DeferredPlugin, DeferredQueue};
use crate::effects::{spawn_effect, EffectKind, EffectParams, EffectsPlugin};
use crate::materials::{solid_material, MeshShape, SandboxAssets};
use crate::physics::{integrate_bodies_system, PhysicsBody, PhysicsPlugin, GROUND_HEIGHT};
use crate::world_query::{ColliderSnapshot, TraceHit, WorldQuery};

const SHELL_SCALE: f32 = 0.1;

pub struct ProjectilesPlugin;

impl Plugin for ProjectilesPlugin {
    fn build(&self, app: &mut App) {
        configure_sandbox_sets(app);
        if !app.is_plugin_added::<PhysicsPlugin>() {
            app.add_plugins(PhysicsPlugin);
        }
        if !app.is_plugin_added::<DeferredPlugin>() {
            app.add_plugins(DeferredPlugin);
        }
        if !app.is_plugin_added::<EffectsPlugin>() {
            app.add_plugins(EffectsPlugin);
        }
        app.add_event::<DamageEvent>().add_systems(
            Update,
            projectile_flight_system
                .after(integrate_bodies_system)
                .in_set(SandboxSet::Simulation),
        );
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Flight {
    Flying,
    Expired,
    Hit(TraceHit),
}

#[derive(Debug, Clone, Component)]
pub struct Projectile {
    /// Entity which fired the projectile, never hit by it.
    pub owner: Option<Entity>,
    pub tuning: ProjectileTuning,
    previous_position: Vec3,
    age: f32,
}

impl Projectile {
    pub fn new(owner: Option<Entity>, tuning: ProjectileTuning, position: Vec3) -> Self {
        Self {
            owner,
            tuning,
            previous_position: position,
            age: 0.,
        }
    }

    /// Checks the path travelled since the previous call.
    pub fn advance<Q: WorldQuery + ?Sized>(
        &mut self,
        world_query: &Q,
        ignore: &[Entity],
        position: Vec3,
        dt: f32,
    ) -> Flight {
        self.age += dt;
        if self.age >= self.tuning.lifetime {
            return Flight::Expired;
        }
        let from = std::mem::replace(&mut self.previous_position, position);
        if from == position {
            return Flight::Flying;
        }
        match world_query.line_trace(from, position, ignore) {
            Some(hit) => Flight::Hit(hit),
            None => Flight::Flying,
        }
    }

    /// Entities the projectile never hits or damages.
    pub fn ignored(&self, projectile: Entity) -> Vec<Entity> {
        let mut ignore = vec![projectile];
        ignore.extend(self.owner);
        ignore
    }

    /// Damage events of an explosion at `point`, one per entity in radius
    /// except the owner.
    pub fn explosion_damage<Q: WorldQuery + ?Sized>(
        &self,
        world_query: &Q,
        projectile: Entity,
        point: Vec3,
    ) -> Vec<DamageEvent> {
        radial_damage_events(
            world_query,
            point,
            self.tuning.explosion_radius,
            self.tuning.explosion_damage,
            &self.ignored(projectile),
            Some(projectile),
        )
        .into_iter()
        .map(|event| event.instigated_by(self.owner))
        .collect()
    }
}

/// Spawns a projectile flying from `location` along `direction`.
pub fn spawn_projectile(
    commands: &mut Commands,
    assets: Option<&SandboxAssets>,
    materials: Option<&mut Assets<StandardMaterial>>,
    tuning: &ProjectileTuning,
    owner: Option<Entity>,
    location: Vec3,
    direction: Vec3,
) -> Entity {
    let velocity = direction.normalize_or_zero() * tuning.speed;
    let transform = Transform::from_translation(location).with_scale(Vec3::splat(SHELL_SCALE));
    let mut entity_commands = match (assets, materials) {
        (Some(assets), Some(materials)) => commands.spawn(PbrBundle {
            mesh: assets.mesh(MeshShape::Sphere),
            material: solid_material(materials, Vec3::new(1., 0.8, 0.3)),
            transform,
            ..default()
        }),
        _ => commands.spawn(SpatialBundle::from_transform(transform)),
    };
    entity_commands.insert((
        Projectile::new(owner, tuning.clone(), location),
        PhysicsBody::ballistic(velocity, tuning.gravity_scale),
        Name::new("Projectile"),
    ));
    entity_commands.id()
}

#[allow(clippy::too_many_arguments)]
fn projectile_flight_system(
    mut commands: Commands,
    time: Res<Time>,
    mut queue: ResMut<DeferredQueue>,
    mut damage_events: EventWriter<DamageEvent>,
    assets: Option<Res<SandboxAssets>>,
    mut materials: Option<ResMut<Assets<StandardMaterial>>>,
    mut projectiles: Query<(Entity, &mut Projectile, &Transform)>,
    colliders: Query<(Entity, &Transform, &Collider)>,
) {
    if projectiles.is_empty() {
        return;
    }
    let dt = time.delta_seconds();
    let snapshot = ColliderSnapshot::collect(&colliders, Some(GROUND_HEIGHT));

    for (entity, mut projectile, transform) in projectiles.iter_mut() {
        let ignore = projectile.ignored(entity);
        match projectile.advance(&snapshot, &ignore, transform.translation, dt) {
            Flight::Flying => {}
            Flight::Expired => {
                debug!("Projectile {:?} expired", entity);
                commands.entity(entity).despawn_recursive();
            }
            Flight::Hit(hit) => {
                debug!("Projectile {:?} hit {:?} at {}", entity, hit.entity, hit.point);
                let events = projectile.explosion_damage(&snapshot, entity, hit.point);
                damage_events.send_batch(events);
                spawn_effect(
                    &mut commands,
                    assets.as_deref(),
                    materials.as_deref_mut(),
                    &mut queue,
                    EffectParams {
                        kind: EffectKind::Explosion,
                        position: hit.point,
                        scale: projectile.tuning.explosion_effect_scale,
                        duration: projectile.tuning.explosion_effect_duration,
                    },
                );
                commands.entity(entity).despawn_recursive();
            }
        }
    }
}
