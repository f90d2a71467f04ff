//! Destructible props: one entity type parameterized by a config, with
//! crates and barrels as named presets.
use bevy::prelude::*;

use crate::components::{configure_sandbox_sets, Collider, SandboxRng, SandboxSet};
use crate::config::{ensure_positive, ConfigError};
use crate::damage::{apply_damage_system, DamageEvent, DestroyedEvent};
use crate::deferred::DeferredPlugin;
use crate::effects::{EffectKind, EffectsPlugin};
use crate::fragmentation::destruction_system;
use crate::materials::{solid_material, MeshShape, SandboxAssets, BASIC_SHAPE_SIZE};
use crate::physics::PhysicsBody;

pub const DEFAULT_MAX_BREAK_DEPTH: u32 = 3;
/// Effects of the first generation of debris are played at this fraction of full scale.
const DEBRIS_EFFECT_SCALE: f32 = 0.5;

pub struct DestructiblesPlugin;

impl Plugin for DestructiblesPlugin {
    fn build(&self, app: &mut App) {
        configure_sandbox_sets(app);
        if !app.is_plugin_added::<DeferredPlugin>() {
            app.add_plugins(DeferredPlugin);
        }
        if !app.is_plugin_added::<EffectsPlugin>() {
            app.add_plugins(EffectsPlugin);
        }
        app.init_resource::<SandboxRng>()
            .add_event::<DamageEvent>()
            .add_event::<DestroyedEvent>()
            .add_systems(Update, apply_damage_system.in_set(SandboxSet::Damage))
            .add_systems(Update, destruction_system.in_set(SandboxSet::Destruction));
    }
}

/// What happens around an object at the moment it is destroyed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DestroyEffect {
    None,
    Fire {
        scale: f32,
        duration: f32,
    },
    /// Fire plus damage to everything around, which makes chain reactions.
    Explosion {
        scale: f32,
        duration: f32,
        radius: f32,
        damage: f32,
    },
}

impl DestroyEffect {
    pub fn kind(&self) -> Option<EffectKind> {
        match self {
            DestroyEffect::None => None,
            DestroyEffect::Fire { .. } => Some(EffectKind::Fire),
            DestroyEffect::Explosion { .. } => Some(EffectKind::Explosion),
        }
    }

    pub fn duration(&self) -> f32 {
        match *self {
            DestroyEffect::None => 0.,
            DestroyEffect::Fire { duration, .. } | DestroyEffect::Explosion { duration, .. } => {
                duration
            }
        }
    }

    /// Scale of the visual effect for an object of given break depth, `None`
    /// if the effect must not be played at all.
    pub fn scale_at_depth(&self, break_depth: u32) -> Option<f32> {
        let scale = match *self {
            DestroyEffect::None => return None,
            DestroyEffect::Fire { scale, .. } | DestroyEffect::Explosion { scale, .. } => scale,
        };
        match break_depth {
            0 => Some(scale),
            1 => Some(scale * DEBRIS_EFFECT_SCALE),
            _ => None,
        }
    }

    /// Radius and amount of radial damage. Only original objects explode.
    pub fn radial_damage(&self, break_depth: u32) -> Option<(f32, f32)> {
        match *self {
            DestroyEffect::Explosion { radius, damage, .. } if break_depth == 0 => {
                Some((radius, damage))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DestructibleConfig {
    pub name: &'static str,
    pub max_health: f32,
    pub debris_count: u32,
    /// Size of debris relative to the destroyed object.
    pub debris_scale: f32,
    pub debris_force: f32,
    /// Linear RGB.
    pub debris_color: Vec3,
    pub max_break_depth: u32,
    pub shape: MeshShape,
    pub body_scale: Vec3,
    pub effect: DestroyEffect,
}

impl Default for DestructibleConfig {
    fn default() -> Self {
        Self {
            name: "DestructibleTarget",
            max_health: 100.,
            debris_count: 6,
            debris_scale: 0.3,
            debris_force: 800.,
            debris_color: Vec3::new(0.4, 0.3, 0.2),
            max_break_depth: DEFAULT_MAX_BREAK_DEPTH,
            shape: MeshShape::Cube,
            body_scale: Vec3::ONE,
            effect: DestroyEffect::Fire {
                scale: 1.,
                duration: 1.,
            },
        }
    }
}

impl DestructibleConfig {
    /// Weak cube that breaks into pieces.
    pub fn wooden_crate() -> Self {
        Self {
            name: "WoodenCrate",
            max_health: 30.,
            debris_count: 5,
            debris_scale: 0.35,
            debris_force: 600.,
            debris_color: Vec3::new(0.55, 0.35, 0.15),
            ..Default::default()
        }
    }

    /// Cylinder that explodes and damages everything around.
    pub fn explosive_barrel() -> Self {
        Self {
            name: "ExplosiveBarrel",
            max_health: 50.,
            debris_count: 8,
            debris_scale: 0.25,
            debris_force: 1200.,
            debris_color: Vec3::new(0.6, 0.15, 0.1),
            shape: MeshShape::Cylinder,
            body_scale: Vec3::new(0.8, 1.2, 0.8),
            effect: DestroyEffect::Explosion {
                scale: 2.,
                duration: 2.,
                radius: 500.,
                damage: 80.,
            },
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("max_health", self.max_health)?;
        ensure_positive("debris_scale", self.debris_scale)?;
        if self.debris_force < 0. {
            return Err(ConfigError::NotPositive {
                name: "debris_force",
                value: self.debris_force,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageOutcome {
    /// Amount of damage actually applied.
    pub applied: f32,
    /// `true` only for the hit which destroyed the object.
    pub destroyed: bool,
}

#[derive(Debug, Clone, Component)]
pub struct Destructible {
    config: DestructibleConfig,
    current_health: f32,
    break_depth: u32,
    destroyed: bool,
}

impl Destructible {
    pub fn new(config: DestructibleConfig) -> Self {
        Self::with_break_depth(config, 0)
    }

    pub fn with_break_depth(config: DestructibleConfig, break_depth: u32) -> Self {
        Self {
            current_health: config.max_health,
            config,
            break_depth,
            destroyed: false,
        }
    }

    #[inline]
    pub fn config(&self) -> &DestructibleConfig {
        &self.config
    }

    #[inline]
    pub fn current_health(&self) -> f32 {
        self.current_health
    }

    #[inline]
    pub fn max_health(&self) -> f32 {
        self.config.max_health
    }

    #[inline]
    pub fn break_depth(&self) -> u32 {
        self.break_depth
    }

    /// Returns the object itself if its config is valid, otherwise logs the
    /// problem and returns an object of the same generation with default config.
    pub fn validated_or_default(self) -> Self {
        match self.config.validate() {
            Ok(()) => self,
            Err(err) => {
                error!(
                    "Invalid config of {}: {}; default values will be used",
                    self.config.name, err
                );
                Self::with_break_depth(DestructibleConfig::default(), self.break_depth)
            }
        }
    }

    /// Returns `true` if destruction of this object spawns debris.
    #[inline]
    pub fn can_fragment(&self) -> bool {
        self.break_depth < self.config.max_break_depth
    }

    pub fn take_damage(&mut self, amount: f32) -> DamageOutcome {
        if self.destroyed {
            return DamageOutcome {
                applied: 0.,
                destroyed: false,
            };
        }
        let applied = if amount > 0. { amount } else { 0. };
        self.current_health -= applied;
        self.destroyed = self.current_health <= 0.;
        DamageOutcome {
            applied,
            destroyed: self.destroyed,
        }
    }
}

/// Spawns a destructible entity. Mesh and material are attached only
/// if visual assets are available.
pub fn spawn_destructible(
    commands: &mut Commands,
    assets: Option<&SandboxAssets>,
    materials: Option<&mut Assets<StandardMaterial>>,
    destructible: Destructible,
    transform: Transform,
    body: Option<PhysicsBody>,
) -> Entity {
    let destructible = destructible.validated_or_default();
    let config = destructible.config();
    let name = Name::new(format!("{}_{}", config.name, destructible.break_depth()));
    let collider = Collider {
        radius: BASIC_SHAPE_SIZE / 2.,
    };

    let mut entity_commands = match (assets, materials) {
        (Some(assets), Some(materials)) => commands.spawn(PbrBundle {
            mesh: assets.mesh(config.shape),
            material: solid_material(materials, config.debris_color),
            transform,
            ..default()
        }),
        _ => commands.spawn(SpatialBundle::from_transform(transform)),
    };
    entity_commands.insert((destructible, collider, name));
    if let Some(body) = body {
        entity_commands.insert(body);
    }
    entity_commands.id()
}
