use bevy::prelude::*;

use crate::components::{configure_sandbox_sets, Collider, SandboxSet};
use crate::config::{SandboxConfig, TankTuning};
use crate::input::TankCommand;
use crate::materials::SandboxAssets;
use crate::physics::{integrate_bodies_system, PhysicsBody, GROUND_HEIGHT};
use crate::projectile::{spawn_projectile, ProjectilesPlugin};
use crate::tank_body::{
    barrel_pitch_from_aim, build_tank_body, clamp_barrel_pitch, muzzle_direction,
    muzzle_location, pitch_rotation, spawn_tank_body, turret_local_yaw, unwind_degrees,
    yaw_rotation, BarrelPivot, BodyVisuals, TankBodyConfig, TurretPivot,
};
use crate::tread::{animate_treads_system, TreadAnimator, TreadDrive, TreadsPlugin};
use crate::world_query::{ColliderSnapshot, WorldQuery};
use crate::UP;

/// Distance from the origin of a tank to the bottom of its treads.
pub const TANK_HALF_HEIGHT: f32 = 20.;
const TANK_COLLIDER_RADIUS: f32 = 150.;
/// Inputs below this magnitude are treated as idle.
const INPUT_DEAD_ZONE: f32 = 0.01;
/// Distance kept between the camera and whatever blocks the arm.
const CAMERA_PROBE_SIZE: f32 = 12.;
const CAMERA_MIN_ARM_LENGTH: f32 = 1.;

pub struct TankPlugin;

impl Plugin for TankPlugin {
    fn build(&self, app: &mut App) {
        configure_sandbox_sets(app);
        if !app.is_plugin_added::<TreadsPlugin>() {
            app.add_plugins(TreadsPlugin);
        }
        if !app.is_plugin_added::<ProjectilesPlugin>() {
            app.add_plugins(ProjectilesPlugin);
        }
        app.init_resource::<SandboxConfig>()
            .add_systems(Update, apply_tank_command_system.in_set(SandboxSet::Input))
            .add_systems(
                Update,
                (
                    drive_tanks_system
                        .before(integrate_bodies_system)
                        .before(animate_treads_system),
                    aim_turrets_system,
                    fire_system.after(integrate_bodies_system),
                )
                    .in_set(SandboxSet::Simulation),
            )
            .add_systems(Update, follow_camera_system.in_set(SandboxSet::Cleanup));
    }
}

#[derive(Debug, Clone, Default, Component)]
pub struct TankPawn {
    /// Forward/backward input in `[-1, 1]`.
    pub throttle: f32,
    /// Right/left input in `[-1, 1]`.
    pub turn: f32,
    /// World yaw of the aim in degrees, independent of the hull.
    pub aim_yaw: f32,
    /// World pitch of the aim in degrees.
    pub aim_pitch: f32,
    pub fire_held: bool,
    fire_cooldown: f32,
}

impl TankPawn {
    pub fn apply_look(&mut self, look: Vec2, tuning: &TankTuning) {
        self.aim_yaw = unwind_degrees(self.aim_yaw + look.x * tuning.look_sensitivity);
        self.aim_pitch = (self.aim_pitch + look.y * tuning.look_sensitivity)
            .clamp(tuning.min_aim_pitch, tuning.max_aim_pitch);
    }

    #[inline]
    pub fn fire_cooldown(&self) -> f32 {
        self.fire_cooldown
    }

    /// Counts down the cooldown and returns `true` if a shot must be fired now.
    pub fn update_fire(&mut self, dt: f32, fire_interval: f32) -> bool {
        self.fire_cooldown = (self.fire_cooldown - dt).max(0.);
        if self.fire_held && self.fire_cooldown <= 0. {
            self.fire_cooldown = fire_interval;
            true
        } else {
            false
        }
    }

    pub fn aim_rotation(&self) -> Quat {
        yaw_rotation(self.aim_yaw) * pitch_rotation(self.aim_pitch)
    }
}

/// Follows the tank whose entity is stored inside.
#[derive(Debug, Clone, Copy, Component)]
pub struct TankCamera {
    pub target: Entity,
}

/// Yaw of a hull in degrees, positive to the right.
pub fn body_yaw(rotation: Quat) -> f32 {
    let forward = rotation * Vec3::X;
    forward.z.atan2(forward.x).to_degrees()
}

/// Force applied to the hull: drive along `forward` while throttle is
/// active and top speed is not reached, otherwise horizontal braking.
pub fn movement_force(tuning: &TankTuning, throttle: f32, forward: Vec3, velocity: Vec3) -> Vec3 {
    if throttle.abs() > INPUT_DEAD_ZONE {
        if velocity.length() < tuning.max_speed {
            forward * throttle * tuning.drive_force
        } else {
            Vec3::ZERO
        }
    } else {
        let horizontal = Vec3::new(velocity.x, 0., velocity.z);
        -horizontal * tuning.brake_factor
    }
}

pub fn tread_drive(tuning: &TankTuning, throttle: f32, turn: f32) -> TreadDrive {
    TreadDrive {
        forward_speed: throttle * tuning.tread_forward_scale,
        turn_rate: turn * tuning.tread_turn_scale,
    }
}

/// Camera on a spring arm behind the aim direction. The arm is shortened
/// when something between the pivot and the camera blocks the view.
pub fn camera_transform<Q: WorldQuery + ?Sized>(
    world_query: &Q,
    ignore: &[Entity],
    tank_position: Vec3,
    aim_rotation: Quat,
    tuning: &TankTuning,
) -> Transform {
    let pivot = tank_position + UP * tuning.camera_height;
    let backward = -(aim_rotation * Vec3::X);
    let desired = pivot + backward * tuning.camera_arm_length;
    let arm_length = match world_query.line_trace(pivot, desired, ignore) {
        Some(hit) => (tuning.camera_arm_length * hit.fraction - CAMERA_PROBE_SIZE)
            .max(CAMERA_MIN_ARM_LENGTH),
        None => tuning.camera_arm_length,
    };
    Transform::from_translation(pivot + backward * arm_length).looking_at(pivot, UP)
}

/// Spawns a controllable tank with its visual body.
pub fn spawn_tank(
    commands: &mut Commands,
    assets: Option<&SandboxAssets>,
    materials: Option<&mut Assets<StandardMaterial>>,
    config: &SandboxConfig,
    transform: Transform,
) -> Entity {
    let mut body = PhysicsBody::new(TANK_HALF_HEIGHT)
        .damping(config.tank.linear_damping, 0.5);
    body.ground_friction = 0.;
    body.restitution = 0.;

    let tank = commands
        .spawn((
            SpatialBundle::from_transform(transform),
            TankPawn {
                aim_yaw: body_yaw(transform.rotation),
                ..default()
            },
            TreadAnimator::new(config.tread.clone()),
            TreadDrive::default(),
            body,
            Collider {
                radius: TANK_COLLIDER_RADIUS,
            },
            Name::new("Tank"),
        ))
        .id();

    let body_config = TankBodyConfig {
        tread: config.tread.clone(),
        ..default()
    };
    let root = build_tank_body(&body_config);
    match (assets, materials) {
        (Some(assets), Some(materials)) => {
            let mut visuals = BodyVisuals::new(assets, materials);
            spawn_tank_body(commands, tank, Transform::default(), &root, Some(&mut visuals));
        }
        _ => {
            debug!("Tank body has no visuals");
            spawn_tank_body(commands, tank, Transform::default(), &root, None);
        }
    }
    tank
}

fn apply_tank_command_system(
    command: Option<Res<TankCommand>>,
    config: Res<SandboxConfig>,
    mut pawns: Query<&mut TankPawn>,
) {
    let Some(command) = command else {
        return;
    };
    for mut pawn in pawns.iter_mut() {
        pawn.throttle = command.throttle.clamp(-1., 1.);
        pawn.turn = command.turn.clamp(-1., 1.);
        pawn.fire_held = command.fire;
        pawn.apply_look(command.look, &config.tank);
    }
}

fn drive_tanks_system(
    time: Res<Time>,
    config: Res<SandboxConfig>,
    mut tanks: Query<(&TankPawn, &mut Transform, &mut PhysicsBody, &mut TreadDrive)>,
) {
    let dt = time.delta_seconds();
    let tuning = &config.tank;
    for (pawn, mut transform, mut body, mut drive) in tanks.iter_mut() {
        let forward = transform.rotation * Vec3::X;
        let force = movement_force(tuning, pawn.throttle, forward, body.linear_velocity);
        body.apply_force(force, tuning.mass, dt);

        if pawn.turn.abs() > INPUT_DEAD_ZONE {
            let delta_yaw = pawn.turn * tuning.turn_rate * dt;
            transform.rotation = (yaw_rotation(delta_yaw) * transform.rotation).normalize();
        }
        *drive = tread_drive(tuning, pawn.throttle, pawn.turn);
    }
}

fn aim_turrets_system(
    tanks: Query<(&TankPawn, &Transform), (Without<TurretPivot>, Without<BarrelPivot>)>,
    mut turrets: Query<(&TurretPivot, &mut Transform), Without<BarrelPivot>>,
    mut barrels: Query<(&BarrelPivot, &mut Transform), Without<TurretPivot>>,
) {
    for (turret, mut transform) in turrets.iter_mut() {
        if let Ok((pawn, tank_transform)) = tanks.get(turret.owner) {
            let local_yaw = turret_local_yaw(pawn.aim_yaw, body_yaw(tank_transform.rotation));
            transform.rotation = yaw_rotation(local_yaw);
        }
    }
    for (barrel, mut transform) in barrels.iter_mut() {
        if let Ok((pawn, _)) = tanks.get(barrel.owner) {
            let pitch = clamp_barrel_pitch(barrel_pitch_from_aim(pawn.aim_pitch));
            transform.rotation = pitch_rotation(pitch);
        }
    }
}

fn fire_system(
    mut commands: Commands,
    time: Res<Time>,
    config: Res<SandboxConfig>,
    assets: Option<Res<SandboxAssets>>,
    mut materials: Option<ResMut<Assets<StandardMaterial>>>,
    mut pawns: Query<&mut TankPawn>,
    barrels: Query<(&BarrelPivot, &GlobalTransform)>,
) {
    let dt = time.delta_seconds();
    for (barrel, barrel_transform) in barrels.iter() {
        let Ok(mut pawn) = pawns.get_mut(barrel.owner) else {
            continue;
        };
        if !pawn.update_fire(dt, config.tank.fire_interval) {
            continue;
        }
        let location = muzzle_location(barrel_transform);
        debug!("Tank {:?} fires from {}", barrel.owner, location);
        spawn_projectile(
            &mut commands,
            assets.as_deref(),
            materials.as_deref_mut(),
            &config.projectile,
            Some(barrel.owner),
            location,
            muzzle_direction(barrel_transform),
        );
    }
}

fn follow_camera_system(
    config: Res<SandboxConfig>,
    tanks: Query<(&TankPawn, &Transform), Without<TankCamera>>,
    colliders: Query<(Entity, &Transform, &Collider), Without<TankCamera>>,
    mut cameras: Query<(&TankCamera, &mut Transform)>,
) {
    if cameras.is_empty() {
        return;
    }
    let snapshot = ColliderSnapshot::collect(&colliders, Some(GROUND_HEIGHT));
    for (camera, mut transform) in cameras.iter_mut() {
        if let Ok((pawn, tank_transform)) = tanks.get(camera.target) {
            *transform = camera_transform(
                &snapshot,
                &[camera.target],
                tank_transform.translation,
                pawn.aim_rotation(),
                &config.tank,
            );
        }
    }
}
