pub mod mesh_factory;
pub mod trianglemesh;

pub use trianglemesh::{compute_normals, triangles_from_indices};
