use bevy::prelude::*;

/// Side of the basic cube and cylinder meshes, so that scale `1.0` of an
/// entity gives a shape one meter wide.
pub const BASIC_SHAPE_SIZE: f32 = 100.;

pub struct MaterialsPlugin;

impl Plugin for MaterialsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(PreStartup, setup_sandbox_assets);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshShape {
    Cube,
    Cylinder,
    Sphere,
}

/// Shared meshes of basic shapes. Absent when the app runs without renderer,
/// in that case every visual step is skipped.
#[derive(Resource, Debug, Clone)]
pub struct SandboxAssets {
    cube: Handle<Mesh>,
    cylinder: Handle<Mesh>,
    sphere: Handle<Mesh>,
}

impl SandboxAssets {
    pub fn mesh(&self, shape: MeshShape) -> Handle<Mesh> {
        match shape {
            MeshShape::Cube => self.cube.clone(),
            MeshShape::Cylinder => self.cylinder.clone(),
            MeshShape::Sphere => self.sphere.clone(),
        }
    }
}

fn setup_sandbox_assets(mut commands: Commands, meshes: Option<ResMut<Assets<Mesh>>>) {
    let Some(mut meshes) = meshes else {
        debug!("Mesh storage is not available, visuals are disabled");
        return;
    };
    let half = BASIC_SHAPE_SIZE / 2.;
    commands.insert_resource(SandboxAssets {
        cube: meshes.add(Mesh::from(Cuboid::new(
            BASIC_SHAPE_SIZE,
            BASIC_SHAPE_SIZE,
            BASIC_SHAPE_SIZE,
        ))),
        cylinder: meshes.add(Mesh::from(Cylinder::new(half, BASIC_SHAPE_SIZE))),
        sphere: meshes.add(Sphere::new(half).mesh().uv(32, 18)),
    });
}

/// Colors of the sandbox are defined as linear RGB triples.
#[inline]
pub fn linear_color(rgb: Vec3) -> Color {
    Color::rgb_linear(rgb.x, rgb.y, rgb.z)
}

pub fn solid_material(
    materials: &mut Assets<StandardMaterial>,
    rgb: Vec3,
) -> Handle<StandardMaterial> {
    materials.add(StandardMaterial {
        base_color: linear_color(rgb),
        perceptual_roughness: 0.8,
        ..default()
    })
}
