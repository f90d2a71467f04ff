//! Conveyor-belt animation of tank treads.
//!
//! Every side of a tank has a loop of discrete segments riding around a
//! rounded rectangle in the longitudinal/vertical plane of the tank. The
//! only state of a loop is its phase offset and smoothed speed, positions
//! of segments are derived from them.
use bevy::prelude::*;

use crate::components::{configure_sandbox_sets, SandboxSet};
use crate::config::{ensure_positive, ConfigError};

/// Rate (per second) of exponential smoothing of tread speed.
pub const TREAD_SMOOTHING_RATE: f32 = 8.0;
/// Loop phase advanced per unit of speed on every step.
pub const TREAD_PHASE_SCALE: f32 = 0.0002;
pub const TREAD_SEGMENTS: usize = 16;

pub struct TreadsPlugin;

impl Plugin for TreadsPlugin {
    fn build(&self, app: &mut App) {
        configure_sandbox_sets(app);
        app.add_systems(
            Update,
            (animate_treads_system, place_tread_segments_system)
                .chain()
                .in_set(SandboxSet::Simulation),
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreadSide {
    Left,
    Right,
}

impl TreadSide {
    pub const BOTH: [TreadSide; 2] = [TreadSide::Left, TreadSide::Right];

    #[inline]
    pub fn lateral_sign(self) -> f32 {
        match self {
            TreadSide::Left => -1.,
            TreadSide::Right => 1.,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TreadSide::Left => "L",
            TreadSide::Right => "R",
        }
    }
}

/// Shape of the tread loop in local coordinates of the tank body:
/// `x` is longitudinal, `y` is vertical, `z` is lateral.
#[derive(Debug, Clone, PartialEq)]
pub struct TreadGeometry {
    pub length: f32,
    pub lateral_offset: f32,
    pub top: f32,
    pub bottom: f32,
    pub segment_count: usize,
}

impl Default for TreadGeometry {
    fn default() -> Self {
        Self {
            length: 280.,
            lateral_offset: 90.,
            top: 15.,
            bottom: -15.,
            segment_count: TREAD_SEGMENTS,
        }
    }
}

impl TreadGeometry {
    pub fn new(
        length: f32,
        lateral_offset: f32,
        top: f32,
        bottom: f32,
        segment_count: usize,
    ) -> Result<Self, ConfigError> {
        let geometry = Self {
            length,
            lateral_offset,
            top,
            bottom,
            segment_count,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("length", self.length)?;
        if !(self.top > self.bottom) {
            return Err(ConfigError::InvertedTread {
                top: self.top,
                bottom: self.bottom,
            });
        }
        if self.segment_count == 0 {
            return Err(ConfigError::NoTreadSegments);
        }
        Ok(())
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }

    #[inline]
    pub fn half_height(&self) -> f32 {
        self.height() / 2.
    }

    #[inline]
    pub fn half_length(&self) -> f32 {
        self.length / 2.
    }

    #[inline]
    pub fn perimeter(&self) -> f32 {
        2. * self.length + 2. * self.height()
    }

    /// Returns position of a point of the loop at given phase.
    ///
    /// The loop starts at the back end of the top straight and goes forward
    /// along the top, down the front, backward along the bottom and up the back.
    pub fn point_at(&self, phase: f32, side: TreadSide) -> Vec3 {
        let dist = wrap_unit(phase) * self.perimeter();
        let half_len = self.half_length();
        let height = self.height();
        let z = self.lateral_offset * side.lateral_sign();

        let (x, y) = if dist < self.length {
            (-half_len + dist, self.top)
        } else if dist < self.length + height {
            let alpha = (dist - self.length) / height;
            (half_len, lerp(self.top, self.bottom, alpha))
        } else if dist < 2. * self.length + height {
            let d = dist - self.length - height;
            (half_len - d, self.bottom)
        } else {
            let alpha = ((dist - 2. * self.length - height) / height).min(1.);
            (-half_len, lerp(self.bottom, self.top, alpha))
        };
        Vec3::new(x, y, z)
    }
}

#[inline]
fn lerp(from: f32, to: f32, alpha: f32) -> f32 {
    from + (to - from) * alpha
}

/// Wraps value into `[0, 1)`.
#[inline]
pub fn wrap_unit(value: f32) -> f32 {
    let wrapped = value.rem_euclid(1.);
    // rem_euclid() of a tiny negative number may round up to 1.0
    if wrapped >= 1. {
        0.
    } else {
        wrapped
    }
}

/// Frame-rate independent exponential approach of `current` to `target`.
#[inline]
pub fn smooth_toward(current: f32, target: f32, rate: f32, dt: f32) -> f32 {
    current + (target - current) * (1. - (-rate * dt).exp())
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TreadLoop {
    pub offset: f32,
    pub smoothed_speed: f32,
}

impl TreadLoop {
    pub fn advance(&mut self, target_speed: f32, dt: f32) {
        self.smoothed_speed =
            smooth_toward(self.smoothed_speed, target_speed, TREAD_SMOOTHING_RATE, dt);
        self.offset = wrap_unit(self.offset + self.smoothed_speed * TREAD_PHASE_SCALE);
    }

    pub fn segment_phase(&self, index: usize, segment_count: usize) -> f32 {
        wrap_unit(self.offset + index as f32 / segment_count as f32)
    }
}

/// Speeds that drive treads of an entity, written by whatever moves the entity.
#[derive(Debug, Clone, Copy, Default, Component)]
pub struct TreadDrive {
    pub forward_speed: f32,
    pub turn_rate: f32,
}

#[derive(Debug, Clone, Component)]
pub struct TreadAnimator {
    geometry: TreadGeometry,
    left: TreadLoop,
    right: TreadLoop,
}

impl TreadAnimator {
    pub fn new(geometry: TreadGeometry) -> Self {
        Self {
            geometry,
            left: TreadLoop::default(),
            right: TreadLoop::default(),
        }
    }

    pub fn tread_loop(&self, side: TreadSide) -> &TreadLoop {
        match side {
            TreadSide::Left => &self.left,
            TreadSide::Right => &self.right,
        }
    }

    /// Advances both loops and returns new positions of left and right segments.
    pub fn update(&mut self, forward_speed: f32, turn_rate: f32, dt: f32) -> (Vec<Vec3>, Vec<Vec3>) {
        self.advance(forward_speed, turn_rate, dt);
        (self.positions(TreadSide::Left), self.positions(TreadSide::Right))
    }

    pub fn advance(&mut self, forward_speed: f32, turn_rate: f32, dt: f32) {
        self.left.advance(forward_speed + turn_rate, dt);
        self.right.advance(forward_speed - turn_rate, dt);
    }

    pub fn segment_position(&self, side: TreadSide, index: usize) -> Vec3 {
        let phase = self
            .tread_loop(side)
            .segment_phase(index, self.geometry.segment_count);
        self.geometry.point_at(phase, side)
    }

    pub fn positions(&self, side: TreadSide) -> Vec<Vec3> {
        (0..self.geometry.segment_count)
            .map(|i| self.segment_position(side, i))
            .collect()
    }
}

/// One visual plate of a tread. Its owner carries the `TreadAnimator`.
#[derive(Debug, Clone, Copy, Component)]
pub struct TreadSegment {
    pub owner: Entity,
    pub side: TreadSide,
    pub index: usize,
}

pub(crate) fn animate_treads_system(
    time: Res<Time>,
    mut animators: Query<(&TreadDrive, &mut TreadAnimator)>,
) {
    let dt = time.delta_seconds();
    for (drive, mut animator) in animators.iter_mut() {
        animator.advance(drive.forward_speed, drive.turn_rate, dt);
    }
}

fn place_tread_segments_system(
    animators: Query<&TreadAnimator>,
    mut segments: Query<(&TreadSegment, &mut Transform)>,
) {
    for (segment, mut transform) in segments.iter_mut() {
        if let Ok(animator) = animators.get(segment.owner) {
            transform.translation = animator.segment_position(segment.side, segment.index);
            // Plates stay level on every part of the loop
            transform.rotation = Quat::IDENTITY;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    fn distance_to_loop(geometry: &TreadGeometry, point: Vec3) -> f32 {
        let half_len = geometry.half_length();
        let dx = point.x.abs() - half_len;
        let on_vertical = if point.y >= geometry.bottom - EPS && point.y <= geometry.top + EPS {
            dx.abs()
        } else {
            f32::MAX
        };
        let on_horizontal = if point.x.abs() <= half_len + EPS {
            (point.y - geometry.top)
                .abs()
                .min((point.y - geometry.bottom).abs())
        } else {
            f32::MAX
        };
        on_vertical.min(on_horizontal)
    }

    #[test]
    fn test_segments_lie_on_loop() {
        for segment_count in 1..=20 {
            let geometry = TreadGeometry {
                segment_count,
                ..Default::default()
            };
            let mut animator = TreadAnimator::new(geometry.clone());
            for step in 0..100 {
                animator.left.offset = step as f32 / 100.;
                animator.right.offset = 1. - step as f32 / 100. - f32::EPSILON;
                for side in TreadSide::BOTH {
                    for point in animator.positions(side) {
                        let distance = distance_to_loop(&geometry, point);
                        assert!(distance < EPS, "point={:?}, distance={}", point, distance);
                        assert_eq!(point.z, geometry.lateral_offset * side.lateral_sign());
                    }
                }
            }
        }
    }

    #[test]
    fn test_junction_points() {
        let geometry = TreadGeometry::default();
        let perimeter = geometry.perimeter();
        let half_len = geometry.half_length();
        let cases = [
            (0., Vec3::new(-half_len, geometry.top, 90.)),
            (geometry.length, Vec3::new(half_len, geometry.top, 90.)),
            (
                geometry.length + geometry.height(),
                Vec3::new(half_len, geometry.bottom, 90.),
            ),
            (
                2. * geometry.length + geometry.height(),
                Vec3::new(-half_len, geometry.bottom, 90.),
            ),
            (perimeter, Vec3::new(-half_len, geometry.top, 90.)),
        ];
        for (dist, expected) in cases {
            let point = geometry.point_at(dist / perimeter, TreadSide::Right);
            assert!(
                point.distance(expected) < EPS,
                "dist={}, point={:?}, expected={:?}",
                dist,
                point,
                expected
            );
        }
    }

    #[test]
    fn test_curve_middles() {
        let geometry = TreadGeometry::default();
        let perimeter = geometry.perimeter();
        let front = geometry.point_at(
            (geometry.length + geometry.half_height()) / perimeter,
            TreadSide::Left,
        );
        assert!(front.distance(Vec3::new(140., 0., -90.)) < EPS, "{:?}", front);
        let back = geometry.point_at(
            (2. * geometry.length + 1.5 * geometry.height()) / perimeter,
            TreadSide::Left,
        );
        assert!(back.distance(Vec3::new(-140., 0., -90.)) < EPS, "{:?}", back);
    }

    #[test]
    fn test_positions_are_pure_function_of_state() {
        let mut animator = TreadAnimator::new(TreadGeometry::default());
        animator.update(300., 50., 1. / 60.);
        let first = animator.clone().positions(TreadSide::Left);
        let second = animator.positions(TreadSide::Left);
        assert_eq!(first, second);

        let mut a = TreadAnimator::new(TreadGeometry::default());
        let mut b = TreadAnimator::new(TreadGeometry::default());
        for _ in 0..10 {
            assert_eq!(a.update(1000., -500., 0.016), b.update(1000., -500., 0.016));
        }
    }

    #[test]
    fn test_smoothing_converges_monotonically() {
        let target: f32 = 1000.;
        let dt = 1. / 60.;
        let mut speed = 0.;
        let mut steps = 0;
        while (target - speed).abs() > 0.01 * target {
            let next = smooth_toward(speed, target, TREAD_SMOOTHING_RATE, dt);
            assert!(next > speed && next <= target);
            speed = next;
            steps += 1;
            assert!(steps <= 40, "smoothing is too slow");
        }
    }

    #[test]
    fn test_turning_drives_sides_in_opposite_directions() {
        let mut animator = TreadAnimator::new(TreadGeometry::default());
        for _ in 0..30 {
            animator.advance(0., 500., 1. / 60.);
        }
        assert!(animator.tread_loop(TreadSide::Left).smoothed_speed > 0.);
        assert!(animator.tread_loop(TreadSide::Right).smoothed_speed < 0.);
        // Negative speed wraps offset back into [0, 1)
        let offset = animator.tread_loop(TreadSide::Right).offset;
        assert!((0. ..1.).contains(&offset), "offset={}", offset);
    }

    #[test]
    fn test_wrap_unit() {
        assert_eq!(wrap_unit(0.25), 0.25);
        assert_eq!(wrap_unit(1.25), 0.25);
        assert_eq!(wrap_unit(-0.25), 0.75);
        assert_eq!(wrap_unit(1.), 0.);
        assert!(wrap_unit(-1e-12) < 1.);
    }

    #[test]
    fn test_invalid_geometry() {
        assert_eq!(
            TreadGeometry::new(280., 90., 15., 15., 16),
            Err(ConfigError::InvertedTread {
                top: 15.,
                bottom: 15.
            })
        );
        assert_eq!(
            TreadGeometry::new(280., 90., 15., -15., 0),
            Err(ConfigError::NoTreadSegments)
        );
        assert!(TreadGeometry::new(0., 90., 15., -15., 16).is_err());
        assert!(TreadGeometry::new(280., 90., 15., -15., 16).is_ok());
    }
}
