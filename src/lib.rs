use bevy::math::Vec3;

pub use game_plugin::SandboxGamePlugin;

pub mod components;
pub mod config;
pub mod damage;
pub mod deferred;
pub mod destructible;
pub mod effects;
pub mod fragmentation;
mod game_plugin;
pub mod geometry;
pub mod hud;
pub mod input;
pub mod materials;
pub mod physics;
pub mod projectile;
pub mod tank;
pub mod tank_body;
pub mod tread;
pub mod world_query;

/// Gravity acceleration in world units (centimeters) per second squared.
pub const G: f32 = 980.0;
pub const UP: Vec3 = Vec3::Y;
