use bevy::prelude::*;

#[derive(Debug, Clone, Copy)]
pub struct Sphere {
    pub center: Vec3,
    radius: f32,
    radius2: f32,
}

impl Sphere {
    pub fn new<P: Into<Vec3>>(center: P, radius: f32) -> Self {
        assert!(radius >= 0.0, "'radius' of sphere is negative number");
        Sphere {
            center: center.into(),
            radius,
            radius2: radius * radius,
        }
    }

    pub fn intersects(&self, other: &Sphere) -> bool {
        let max_distance = self.radius + other.radius;
        self.center.distance_squared(other.center) <= max_distance * max_distance
    }

    /// Returns fraction of the segment `from -> to` at which the segment
    /// enters the sphere first time.
    pub fn segment_intersection(&self, from: Vec3, to: Vec3) -> Option<f32> {
        let f = from - self.center;
        let c = f.length_squared() - self.radius2;
        if c <= 0. {
            // Segment starts inside of sphere
            return Some(0.);
        }
        let d = to - from;
        let a = d.length_squared();
        if a == 0. {
            return None;
        }
        let b = 2. * f.dot(d);
        let discriminant = b * b - 4. * a * c;
        if discriminant < 0. {
            return None;
        }
        let t = (-b - discriminant.sqrt()) / (2. * a);
        if (0.0..=1.0).contains(&t) {
            Some(t)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersects() {
        let sphere = Sphere::new((0., 0., 0.), 5.);

        assert!(sphere.intersects(&Sphere::new((9., 0., 0.), 4.)));
        assert!(!sphere.intersects(&Sphere::new((9., 0., 0.), 3.)));
    }

    #[test]
    fn test_segment_intersection() {
        let sphere = Sphere::new((10., 0., 0.), 2.);

        let t = sphere
            .segment_intersection(Vec3::ZERO, Vec3::new(20., 0., 0.))
            .unwrap();
        assert!((t - 0.4).abs() < 1e-5, "t={}", t);

        // Segment ends before sphere
        assert_eq!(
            sphere.segment_intersection(Vec3::ZERO, Vec3::new(7., 0., 0.)),
            None
        );
        // Segment passes aside
        assert_eq!(
            sphere.segment_intersection(Vec3::new(0., 3., 0.), Vec3::new(20., 3., 0.)),
            None
        );
        // Segment starts inside
        assert_eq!(
            sphere.segment_intersection(Vec3::new(10., 1., 0.), Vec3::new(20., 1., 0.)),
            Some(0.)
        );
    }
}
