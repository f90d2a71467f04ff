//! Visual assembly of a tank: hull, treads, turret and barrel.
//!
//! The assembly is described by a tree of plain transform nodes, which is
//! turned into entities separately, so the layout does not depend on the
//! renderer and may be checked without one.
use std::f32::consts::FRAC_PI_2;

use angular_units::{Angle, Deg};
use bevy::prelude::*;

use crate::materials::{MeshShape, SandboxAssets};
use crate::tread::{TreadAnimator, TreadGeometry, TreadSegment, TreadSide};

pub const MIN_BARREL_PITCH: f32 = -10.;
pub const MAX_BARREL_PITCH: f32 = 25.;
/// Distance from the barrel pivot to the end of the barrel.
pub const MUZZLE_OFFSET: f32 = 90.;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyPart {
    Root,
    Hull,
    Tread(TreadSide, usize),
    TurretPivot,
    Turret,
    BarrelPivot,
    Barrel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeShape {
    /// Node without visuals, only carries transform for its children.
    Pivot,
    Mesh(MeshShape),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BodyNode {
    pub part: BodyPart,
    pub shape: NodeShape,
    /// Linear RGB.
    pub color: Option<Vec3>,
    pub transform: Transform,
    pub children: Vec<BodyNode>,
}

impl BodyNode {
    fn pivot(part: BodyPart, transform: Transform, children: Vec<BodyNode>) -> Self {
        Self {
            part,
            shape: NodeShape::Pivot,
            color: None,
            transform,
            children,
        }
    }

    fn mesh(part: BodyPart, shape: MeshShape, color: Vec3, transform: Transform) -> Self {
        Self {
            part,
            shape: NodeShape::Mesh(shape),
            color: Some(color),
            transform,
            children: Vec::new(),
        }
    }

    /// Number of nodes in the tree including this one.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(|c| c.count()).sum::<usize>()
    }

    pub fn find(&self, part: BodyPart) -> Option<&BodyNode> {
        if self.part == part {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(part))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TankBodyConfig {
    pub hull_color: Vec3,
    pub tread_color: Vec3,
    pub barrel_color: Vec3,
    pub tread: TreadGeometry,
}

impl Default for TankBodyConfig {
    fn default() -> Self {
        Self {
            hull_color: Vec3::new(0.28, 0.35, 0.22),
            tread_color: Vec3::new(0.12, 0.12, 0.12),
            barrel_color: Vec3::new(0.15, 0.15, 0.12),
            tread: TreadGeometry::default(),
        }
    }
}

pub fn build_tank_body(config: &TankBodyConfig) -> BodyNode {
    let hull = BodyNode::mesh(
        BodyPart::Hull,
        MeshShape::Cube,
        config.hull_color,
        Transform::from_xyz(0., 20., 0.).with_scale(Vec3::new(2.4, 0.5, 1.4)),
    );

    let barrel = BodyNode::mesh(
        BodyPart::Barrel,
        MeshShape::Cylinder,
        config.barrel_color,
        // Cylinder mesh is vertical, lay it along the barrel pivot X axis
        Transform::from_xyz(45., 0., 0.)
            .with_rotation(Quat::from_rotation_z(-FRAC_PI_2))
            .with_scale(Vec3::new(0.12, 0.9, 0.12)),
    );
    let barrel_pivot = BodyNode::pivot(
        BodyPart::BarrelPivot,
        Transform::from_xyz(50., 20., 0.),
        vec![barrel],
    );
    let turret = BodyNode::mesh(
        BodyPart::Turret,
        MeshShape::Cube,
        config.hull_color,
        Transform::from_xyz(0., 20., 0.).with_scale(Vec3::new(1.0, 0.4, 0.85)),
    );
    let turret_pivot = BodyNode::pivot(
        BodyPart::TurretPivot,
        Transform::from_xyz(-10., 45., 0.),
        vec![turret, barrel_pivot],
    );

    let animator = TreadAnimator::new(config.tread.clone());
    let mut children = vec![hull];
    for side in TreadSide::BOTH {
        for index in 0..config.tread.segment_count {
            children.push(BodyNode::mesh(
                BodyPart::Tread(side, index),
                MeshShape::Cube,
                config.tread_color,
                Transform::from_translation(animator.segment_position(side, index))
                    .with_scale(Vec3::new(0.22, 0.1, 0.28)),
            ));
        }
    }
    children.push(turret_pivot);

    BodyNode::pivot(BodyPart::Root, Transform::default(), children)
}

#[derive(Debug, Clone, Copy, Component)]
pub struct TurretPivot {
    pub owner: Entity,
}

#[derive(Debug, Clone, Copy, Component)]
pub struct BarrelPivot {
    pub owner: Entity,
}

/// Meshes and materials for body nodes, one material per color.
pub struct BodyVisuals<'a> {
    assets: &'a SandboxAssets,
    materials: &'a mut Assets<StandardMaterial>,
    cache: Vec<(Vec3, Handle<StandardMaterial>)>,
}

impl<'a> BodyVisuals<'a> {
    pub fn new(assets: &'a SandboxAssets, materials: &'a mut Assets<StandardMaterial>) -> Self {
        Self {
            assets,
            materials,
            cache: Vec::new(),
        }
    }

    fn material(&mut self, color: Vec3) -> Handle<StandardMaterial> {
        if let Some((_, handle)) = self.cache.iter().find(|(c, _)| *c == color) {
            return handle.clone();
        }
        let handle = crate::materials::solid_material(self.materials, color);
        self.cache.push((color, handle.clone()));
        handle
    }

    fn pbr_bundle(&mut self, node: &BodyNode) -> Option<PbrBundle> {
        let NodeShape::Mesh(shape) = node.shape else {
            return None;
        };
        let material = self.material(node.color?);
        Some(PbrBundle {
            mesh: self.assets.mesh(shape),
            material,
            transform: node.transform,
            ..default()
        })
    }
}

/// Spawns the body tree as children of `owner`. The owner is expected to
/// carry the `TreadAnimator` which drives tread segments.
pub fn spawn_tank_body(
    commands: &mut Commands,
    owner: Entity,
    body_transform: Transform,
    root: &BodyNode,
    visuals: Option<&mut BodyVisuals>,
) {
    let mut root = root.clone();
    root.transform = body_transform;
    commands.entity(owner).with_children(|builder| {
        spawn_body_node(builder, &root, visuals, owner);
    });
}

pub fn spawn_body_node(
    builder: &mut ChildBuilder,
    node: &BodyNode,
    mut visuals: Option<&mut BodyVisuals>,
    owner: Entity,
) {
    let bundle = visuals.as_deref_mut().and_then(|v| v.pbr_bundle(node));
    let mut entity_commands = match bundle {
        Some(bundle) => builder.spawn(bundle),
        None => builder.spawn(SpatialBundle::from_transform(node.transform)),
    };
    entity_commands.insert(Name::new(node_name(node.part)));
    match node.part {
        BodyPart::Tread(side, index) => {
            entity_commands.insert(TreadSegment { owner, side, index });
        }
        BodyPart::TurretPivot => {
            entity_commands.insert(TurretPivot { owner });
        }
        BodyPart::BarrelPivot => {
            entity_commands.insert(BarrelPivot { owner });
        }
        BodyPart::Root | BodyPart::Hull | BodyPart::Turret | BodyPart::Barrel => {}
    }

    if !node.children.is_empty() {
        entity_commands.with_children(|builder| {
            for child in node.children.iter() {
                spawn_body_node(builder, child, visuals.as_deref_mut(), owner);
            }
        });
    }
}

fn node_name(part: BodyPart) -> String {
    match part {
        BodyPart::Tread(side, index) => format!("Tread_{}_{}", side.name(), index),
        part => format!("{:?}", part),
    }
}

/// Converts angle in degrees into range `(-180, 180]`.
pub fn unwind_degrees(degrees: f32) -> f32 {
    let normalized = Deg(degrees).normalize().0;
    if normalized > 180. {
        normalized - 360.
    } else {
        normalized
    }
}

/// Positive yaw turns to the right.
#[inline]
pub fn yaw_rotation(degrees: f32) -> Quat {
    Quat::from_rotation_y(-degrees.to_radians())
}

/// Positive pitch raises the nose.
#[inline]
pub fn pitch_rotation(degrees: f32) -> Quat {
    Quat::from_rotation_z(degrees.to_radians())
}

/// Yaw of the turret relative to the body which makes it look at `world_yaw`.
pub fn turret_local_yaw(world_yaw: f32, body_yaw: f32) -> f32 {
    unwind_degrees(world_yaw - body_yaw)
}

pub fn clamp_barrel_pitch(pitch: f32) -> f32 {
    pitch.clamp(MIN_BARREL_PITCH, MAX_BARREL_PITCH)
}

/// Linear mapping of `value` from one range to another, clamped to the
/// output range.
pub fn map_range_clamped(value: f32, from: (f32, f32), to: (f32, f32)) -> f32 {
    let span = from.1 - from.0;
    if span == 0. {
        return to.0;
    }
    let alpha = ((value - from.0) / span).clamp(0., 1.);
    to.0 + (to.1 - to.0) * alpha
}

/// Looking down lifts the barrel less than looking at the horizon.
pub fn barrel_pitch_from_aim(aim_pitch: f32) -> f32 {
    map_range_clamped(aim_pitch, (-50., 0.), (20., -5.))
}

pub fn muzzle_location(barrel_pivot: &GlobalTransform) -> Vec3 {
    barrel_pivot.transform_point(Vec3::X * MUZZLE_OFFSET)
}

pub fn muzzle_direction(barrel_pivot: &GlobalTransform) -> Vec3 {
    let (_, rotation, _) = barrel_pivot.to_scale_rotation_translation();
    rotation * Vec3::X
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_tree_layout() {
        let config = TankBodyConfig::default();
        let root = build_tank_body(&config);
        // root + hull + 2 * 16 treads + turret pivot, turret, barrel pivot, barrel
        assert_eq!(root.count(), 38);
        assert_eq!(root.shape, NodeShape::Pivot);

        let hull = root.find(BodyPart::Hull).unwrap();
        assert_eq!(hull.color, Some(config.hull_color));
        assert_eq!(hull.shape, NodeShape::Mesh(MeshShape::Cube));

        let turret_pivot = root.find(BodyPart::TurretPivot).unwrap();
        assert_eq!(turret_pivot.children.len(), 2);
        let barrel_pivot = turret_pivot.find(BodyPart::BarrelPivot).unwrap();
        assert_eq!(barrel_pivot.transform.translation, Vec3::new(50., 20., 0.));
        assert!(root.find(BodyPart::Tread(TreadSide::Right, 15)).is_some());
        assert!(root.find(BodyPart::Tread(TreadSide::Right, 16)).is_none());
    }

    #[test]
    fn test_treads_start_on_loop() {
        let root = build_tank_body(&TankBodyConfig::default());
        for (side, z) in [(TreadSide::Left, -90.), (TreadSide::Right, 90.)] {
            let first = root.find(BodyPart::Tread(side, 0)).unwrap();
            assert_eq!(first.transform.translation, Vec3::new(-140., 15., z));
            assert_eq!(first.transform.rotation, Quat::IDENTITY);
        }
    }

    #[test]
    fn test_barrel_ends_at_muzzle() {
        let root = build_tank_body(&TankBodyConfig::default());
        let barrel = root.find(BodyPart::Barrel).unwrap();
        // Top cap of the unit cylinder mesh
        let tip = barrel.transform.transform_point(Vec3::new(0., 50., 0.));
        assert!(tip.distance(Vec3::X * MUZZLE_OFFSET) < 1e-3, "tip={:?}", tip);

        let pivot = GlobalTransform::from(
            Transform::from_xyz(0., 100., 0.).with_rotation(yaw_rotation(90.)),
        );
        assert!(muzzle_location(&pivot).distance(Vec3::new(0., 100., 90.)) < 1e-3);
        assert!(muzzle_direction(&pivot).distance(Vec3::Z) < 1e-5);
    }

    #[test]
    fn test_unwind_degrees() {
        assert_eq!(unwind_degrees(0.), 0.);
        assert_eq!(unwind_degrees(190.), -170.);
        assert_eq!(unwind_degrees(-190.), 170.);
        assert_eq!(unwind_degrees(540.), 180.);
        assert_eq!(unwind_degrees(-90.), -90.);
    }

    #[test]
    fn test_turret_and_barrel_angles() {
        assert_eq!(turret_local_yaw(30., 10.), 20.);
        assert_eq!(turret_local_yaw(170., -170.), -20.);

        assert_eq!(clamp_barrel_pitch(40.), MAX_BARREL_PITCH);
        assert_eq!(clamp_barrel_pitch(-40.), MIN_BARREL_PITCH);
        assert_eq!(barrel_pitch_from_aim(-50.), 20.);
        assert_eq!(barrel_pitch_from_aim(0.), -5.);
        assert_eq!(barrel_pitch_from_aim(-25.), 7.5);
        assert_eq!(barrel_pitch_from_aim(-80.), 20.);
    }

    #[test]
    fn test_rotation_conventions() {
        // Right turn moves forward axis to the right side (+Z)
        assert!((yaw_rotation(90.) * Vec3::X).distance(Vec3::Z) < 1e-5);
        assert!((pitch_rotation(90.) * Vec3::X).distance(Vec3::Y) < 1e-5);
    }
}
