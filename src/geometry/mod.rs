pub use sphere::Sphere;

pub mod sphere;
