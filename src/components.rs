use bevy::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;

/// Ordering of gameplay systems inside the `Update` schedule.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SandboxSet {
    Input,
    Simulation,
    Damage,
    Destruction,
    Cleanup,
}

pub(crate) fn configure_sandbox_sets(app: &mut App) {
    app.configure_sets(
        Update,
        (
            SandboxSet::Input,
            SandboxSet::Simulation,
            SandboxSet::Damage,
            SandboxSet::Destruction,
            SandboxSet::Cleanup,
        )
            .chain(),
    );
}

/// The only source of randomness of gameplay code.
#[derive(Resource)]
pub struct SandboxRng(pub SmallRng);

impl SandboxRng {
    pub fn seeded(seed: u64) -> Self {
        Self(SmallRng::seed_from_u64(seed))
    }
}

impl Default for SandboxRng {
    fn default() -> Self {
        Self(SmallRng::from_entropy())
    }
}

/// Bounding sphere used by world queries.
#[derive(Debug, Clone, Copy, Component)]
pub struct Collider {
    /// Radius in local units, scaled by the largest axis of the entity's scale.
    pub radius: f32,
}

impl Collider {
    #[inline]
    pub fn world_radius(&self, transform: &Transform) -> f32 {
        self.radius * transform.scale.abs().max_element()
    }
}

/// App without renderer and window with time advancing by `step` on every update.
#[cfg(test)]
pub(crate) fn headless_app(step: std::time::Duration) -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .insert_resource(bevy::time::TimeUpdateStrategy::ManualDuration(step))
        .insert_resource(SandboxRng::seeded(42));
    app
}
