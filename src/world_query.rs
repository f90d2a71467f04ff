//! Spatial queries gameplay code calls through instead of reaching into
//! a global physics scene.
use bevy::prelude::*;

use crate::components::Collider;
use crate::geometry::Sphere;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceHit {
    /// `None` if the trace hit the ground.
    pub entity: Option<Entity>,
    pub point: Vec3,
    /// Fraction of the traced segment before the hit.
    pub fraction: f32,
}

pub trait WorldQuery {
    /// Returns entities whose bounds intersect given sphere.
    fn overlap_sphere(&self, center: Vec3, radius: f32, ignore: &[Entity]) -> Vec<Entity>;

    /// Returns the first hit along the segment `from -> to`.
    fn line_trace(&self, from: Vec3, to: Vec3, ignore: &[Entity]) -> Option<TraceHit>;
}

/// Bounding spheres of colliders captured at some moment plus an optional
/// infinite ground plane.
#[derive(Debug, Clone, Default)]
pub struct ColliderSnapshot {
    bodies: Vec<(Entity, Sphere)>,
    ground_height: Option<f32>,
}

impl ColliderSnapshot {
    pub fn new(ground_height: Option<f32>) -> Self {
        Self {
            bodies: Vec::new(),
            ground_height,
        }
    }

    pub fn collect<'a, I>(colliders: I, ground_height: Option<f32>) -> Self
    where
        I: IntoIterator<Item = (Entity, &'a Transform, &'a Collider)>,
    {
        let mut snapshot = Self::new(ground_height);
        for (entity, transform, collider) in colliders {
            snapshot.push(
                entity,
                Sphere::new(transform.translation, collider.world_radius(transform)),
            );
        }
        snapshot
    }

    pub fn push(&mut self, entity: Entity, bounds: Sphere) {
        self.bodies.push((entity, bounds));
    }

    fn ground_hit(&self, from: Vec3, to: Vec3) -> Option<f32> {
        let ground = self.ground_height?;
        if from.y >= ground && to.y < ground {
            Some((from.y - ground) / (from.y - to.y))
        } else {
            None
        }
    }
}

impl WorldQuery for ColliderSnapshot {
    fn overlap_sphere(&self, center: Vec3, radius: f32, ignore: &[Entity]) -> Vec<Entity> {
        let area = Sphere::new(center, radius.max(0.));
        self.bodies
            .iter()
            .filter(|(entity, bounds)| !ignore.contains(entity) && area.intersects(bounds))
            .map(|&(entity, _)| entity)
            .collect()
    }

    fn line_trace(&self, from: Vec3, to: Vec3, ignore: &[Entity]) -> Option<TraceHit> {
        let body_hit = self
            .bodies
            .iter()
            .filter(|(entity, _)| !ignore.contains(entity))
            .filter_map(|&(entity, bounds)| {
                bounds
                    .segment_intersection(from, to)
                    .map(|fraction| (Some(entity), fraction))
            });
        let ground_hit = self.ground_hit(from, to).map(|fraction| (None, fraction));

        body_hit
            .chain(ground_hit)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(entity, fraction)| TraceHit {
                entity,
                point: from.lerp(to, fraction),
                fraction,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> (ColliderSnapshot, Entity, Entity) {
        let near = Entity::from_raw(1);
        let far = Entity::from_raw(2);
        let mut snapshot = ColliderSnapshot::new(Some(0.));
        snapshot.push(near, Sphere::new((100., 50., 0.), 20.));
        snapshot.push(far, Sphere::new((300., 50., 0.), 20.));
        (snapshot, near, far)
    }

    #[test]
    fn test_overlap_sphere() {
        let (snapshot, near, far) = snapshot();

        assert_eq!(
            snapshot.overlap_sphere(Vec3::new(0., 50., 0.), 90., &[]),
            vec![near]
        );
        assert_eq!(
            snapshot.overlap_sphere(Vec3::new(200., 50., 0.), 90., &[]),
            vec![near, far]
        );
        assert_eq!(
            snapshot.overlap_sphere(Vec3::new(200., 50., 0.), 90., &[near]),
            vec![far]
        );
    }

    #[test]
    fn test_line_trace_returns_nearest_hit() {
        let (snapshot, near, far) = snapshot();

        let hit = snapshot
            .line_trace(Vec3::new(0., 50., 0.), Vec3::new(400., 50., 0.), &[])
            .unwrap();
        assert_eq!(hit.entity, Some(near));
        assert!(hit.point.distance(Vec3::new(80., 50., 0.)) < 1e-3);

        let hit = snapshot
            .line_trace(Vec3::new(0., 50., 0.), Vec3::new(400., 50., 0.), &[near])
            .unwrap();
        assert_eq!(hit.entity, Some(far));
    }

    #[test]
    fn test_line_trace_hits_ground() {
        let (snapshot, _, _) = snapshot();

        let hit = snapshot
            .line_trace(Vec3::new(0., 10., 0.), Vec3::new(0., -10., 0.), &[])
            .unwrap();
        assert_eq!(hit.entity, None);
        assert!((hit.fraction - 0.5).abs() < 1e-5);

        assert_eq!(
            snapshot.line_trace(Vec3::new(0., 10., 0.), Vec3::new(0., 5., 0.), &[]),
            None
        );
    }
}
