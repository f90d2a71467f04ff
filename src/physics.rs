//! Minimal kinematic stand-in for a rigid-body solver: gravity, damping,
//! impulses and a flat ground.
use bevy::prelude::*;

use crate::components::{configure_sandbox_sets, SandboxSet};
use crate::G;

pub const GROUND_HEIGHT: f32 = 0.;
/// Fraction of horizontal speed lost per second while touching the ground.
pub const GROUND_FRICTION: f32 = 3.0;
/// Vertical speed below which a bouncing body comes to rest.
const REST_SPEED: f32 = 20.0;

pub struct PhysicsPlugin;

impl Plugin for PhysicsPlugin {
    fn build(&self, app: &mut App) {
        configure_sandbox_sets(app);
        app.add_systems(Update, integrate_bodies_system.in_set(SandboxSet::Simulation));
    }
}

#[derive(Debug, Clone, Copy, Component)]
pub struct PhysicsBody {
    pub linear_velocity: Vec3,
    /// Radians per second around each axis.
    pub angular_velocity: Vec3,
    pub gravity_scale: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    /// Distance from the origin of the body to its lowest point.
    pub half_height: f32,
    pub restitution: f32,
    /// Fraction of horizontal speed lost per second while touching the ground.
    pub ground_friction: f32,
    pub collide_with_ground: bool,
    pub grounded: bool,
}

impl Default for PhysicsBody {
    fn default() -> Self {
        Self {
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            gravity_scale: 1.,
            linear_damping: 0.01,
            angular_damping: 0.5,
            half_height: 0.,
            restitution: 0.3,
            ground_friction: GROUND_FRICTION,
            collide_with_ground: true,
            grounded: false,
        }
    }
}

impl PhysicsBody {
    pub fn new(half_height: f32) -> Self {
        Self {
            half_height,
            ..Default::default()
        }
    }

    /// Body which flies freely and is never stopped by the ground.
    pub fn ballistic(velocity: Vec3, gravity_scale: f32) -> Self {
        Self {
            linear_velocity: velocity,
            gravity_scale,
            linear_damping: 0.,
            angular_damping: 0.,
            collide_with_ground: false,
            ..Default::default()
        }
    }

    pub fn damping(self, linear: f32, angular: f32) -> Self {
        Self {
            linear_damping: linear,
            angular_damping: angular,
            ..self
        }
    }

    /// Changes velocity immediately, independently of mass.
    pub fn apply_impulse(&mut self, linear: Vec3, angular_degrees: Vec3) {
        self.linear_velocity += linear;
        self.angular_velocity += angular_degrees * std::f32::consts::PI / 180.;
    }

    pub fn apply_force(&mut self, force: Vec3, mass: f32, dt: f32) {
        if mass > 0. {
            self.linear_velocity += force / mass * dt;
        }
    }

    pub fn step(&mut self, transform: &mut Transform, dt: f32) {
        if dt <= 0. {
            return;
        }
        self.linear_velocity.y -= G * self.gravity_scale * dt;
        self.linear_velocity /= 1. + self.linear_damping * dt;
        self.angular_velocity /= 1. + self.angular_damping * dt;

        transform.translation += self.linear_velocity * dt;
        if self.angular_velocity != Vec3::ZERO {
            let spin = Quat::from_scaled_axis(self.angular_velocity * dt);
            transform.rotation = (spin * transform.rotation).normalize();
        }

        if self.collide_with_ground {
            self.resolve_ground_contact(transform, dt);
        }
    }

    fn resolve_ground_contact(&mut self, transform: &mut Transform, dt: f32) {
        let lowest = GROUND_HEIGHT + self.half_height;
        if transform.translation.y > lowest {
            self.grounded = false;
            return;
        }
        transform.translation.y = lowest;
        if self.linear_velocity.y < 0. {
            self.linear_velocity.y = -self.linear_velocity.y * self.restitution;
        }
        if self.linear_velocity.y < REST_SPEED {
            self.linear_velocity.y = 0.;
        }
        let friction = (1. - self.ground_friction * dt).max(0.);
        self.linear_velocity.x *= friction;
        self.linear_velocity.z *= friction;
        self.grounded = true;
    }
}

pub fn integrate_bodies_system(
    time: Res<Time>,
    mut bodies: Query<(&mut PhysicsBody, &mut Transform)>,
) {
    let dt = time.delta_seconds();
    for (mut body, mut transform) in bodies.iter_mut() {
        body.step(&mut transform, dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_impulse_changes_velocity() {
        let mut body = PhysicsBody::new(10.);
        body.apply_impulse(Vec3::new(100., 0., 0.), Vec3::new(0., 180., 0.));

        assert_eq!(body.linear_velocity, Vec3::new(100., 0., 0.));
        assert!((body.angular_velocity.y - std::f32::consts::PI).abs() < 1e-5);
    }

    #[test]
    fn test_body_falls_and_rests_on_ground() {
        let mut body = PhysicsBody::new(10.);
        let mut transform = Transform::from_xyz(0., 500., 0.);
        for _ in 0..600 {
            body.step(&mut transform, 1. / 60.);
        }

        assert!(body.grounded);
        assert!((transform.translation.y - 10.).abs() < 1e-3);
        assert_eq!(body.linear_velocity.y, 0.);
    }

    #[test]
    fn test_ballistic_body_ignores_ground() {
        let mut body = PhysicsBody::ballistic(Vec3::new(1000., 0., 0.), 0.);
        let mut transform = Transform::from_xyz(0., -5., 0.);
        body.step(&mut transform, 0.5);

        assert!(!body.grounded);
        assert_eq!(transform.translation, Vec3::new(500., -5., 0.));
    }

    #[test]
    fn test_zero_delta_is_ignored() {
        let mut body = PhysicsBody::new(0.);
        let mut transform = Transform::from_xyz(0., 100., 0.);
        body.step(&mut transform, 0.);

        assert_eq!(transform.translation, Vec3::new(0., 100., 0.));
        assert_eq!(body.linear_velocity, Vec3::ZERO);
    }
}
