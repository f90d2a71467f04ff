use bevy::prelude::*;
use itertools::Itertools;

use crate::destructible::Destructible;
use crate::world_query::WorldQuery;

/// Request to deliver damage to an entity.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct DamageEvent {
    pub target: Entity,
    pub amount: f32,
    /// Who is responsible for the damage, e.g. the tank which fired.
    pub instigator: Option<Entity>,
    /// What delivered the damage, e.g. a projectile or an exploding barrel.
    pub causer: Option<Entity>,
    /// World position of the causer at the moment of the hit.
    pub source_position: Option<Vec3>,
}

impl DamageEvent {
    pub fn new(target: Entity, amount: f32) -> Self {
        Self {
            target,
            amount,
            instigator: None,
            causer: None,
            source_position: None,
        }
    }

    pub fn caused_by(self, causer: Entity, source_position: Vec3) -> Self {
        Self {
            causer: Some(causer),
            source_position: Some(source_position),
            ..self
        }
    }

    pub fn instigated_by(self, instigator: Option<Entity>) -> Self {
        Self { instigator, ..self }
    }
}

/// Sent exactly once for every destroyed entity.
#[derive(Event, Debug, Clone)]
pub struct DestroyedEvent {
    pub entity: Entity,
    /// State of the object at the moment of destruction.
    pub destructible: Destructible,
    pub transform: Transform,
    pub impact_direction: Vec3,
}

/// Unit vector from the damage source toward the damaged entity or zero
/// vector if there is no identifiable source.
pub fn impact_direction(target_position: Vec3, source_position: Option<Vec3>) -> Vec3 {
    source_position
        .map(|source| (target_position - source).normalize_or_zero())
        .unwrap_or(Vec3::ZERO)
}

/// Builds full-damage events for every entity inside the sphere, each
/// entity is damaged once.
pub fn radial_damage_events<Q: WorldQuery + ?Sized>(
    world_query: &Q,
    center: Vec3,
    radius: f32,
    damage: f32,
    ignore: &[Entity],
    causer: Option<Entity>,
) -> Vec<DamageEvent> {
    world_query
        .overlap_sphere(center, radius, ignore)
        .into_iter()
        .unique()
        .map(|target| DamageEvent {
            target,
            amount: damage,
            instigator: None,
            causer,
            source_position: Some(center),
        })
        .collect()
}

pub(crate) fn apply_damage_system(
    mut damage_events: EventReader<DamageEvent>,
    mut destroyed_events: EventWriter<DestroyedEvent>,
    mut targets: Query<(&mut Destructible, &Transform)>,
) {
    for event in damage_events.read() {
        let Ok((mut destructible, transform)) = targets.get_mut(event.target) else {
            continue;
        };
        let outcome = destructible.take_damage(event.amount);
        if outcome.applied > 0. {
            debug!(
                "{:?} took {} damage, health is {}",
                event.target,
                outcome.applied,
                destructible.current_health()
            );
        }
        if outcome.destroyed {
            destroyed_events.send(DestroyedEvent {
                entity: event.target,
                destructible: destructible.clone(),
                transform: *transform,
                impact_direction: impact_direction(transform.translation, event.source_position),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Sphere;
    use crate::world_query::ColliderSnapshot;

    #[test]
    fn test_impact_direction() {
        let direction = impact_direction(Vec3::new(10., 0., 0.), Some(Vec3::new(0., 0., 0.)));
        assert_eq!(direction, Vec3::X);

        assert_eq!(impact_direction(Vec3::new(10., 0., 0.), None), Vec3::ZERO);
        // Source inside of the target
        assert_eq!(
            impact_direction(Vec3::new(10., 0., 0.), Some(Vec3::new(10., 0., 0.))),
            Vec3::ZERO
        );
    }

    #[test]
    fn test_radial_damage_events() {
        let barrel = Entity::from_raw(1);
        let near_crate = Entity::from_raw(2);
        let far_crate = Entity::from_raw(3);
        let mut snapshot = ColliderSnapshot::new(None);
        snapshot.push(barrel, Sphere::new((0., 50., 0.), 50.));
        snapshot.push(near_crate, Sphere::new((300., 50., 0.), 50.));
        // Second collider of the same entity
        snapshot.push(near_crate, Sphere::new((320., 50., 0.), 50.));
        snapshot.push(far_crate, Sphere::new((900., 50., 0.), 50.));

        let events = radial_damage_events(
            &snapshot,
            Vec3::new(0., 50., 0.),
            500.,
            80.,
            &[barrel],
            Some(barrel),
        );
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].target, near_crate);
        assert_eq!(events[0].amount, 80.);
        assert_eq!(events[0].causer, Some(barrel));
        assert_eq!(events[0].source_position, Some(Vec3::new(0., 50., 0.)));
    }
}
