//! Aisle Asset - Fixture mesh pipeline
//!
//! Loads fixture meshes from glTF/GLB assets, normalizes them so they rest on
//! the floor at the origin, and caches one copy per fixture type.

mod cache;
mod import;
mod registry;
mod types;

pub use cache::{LoadOutcome, MemoryMeshSource, MeshCache, MeshLookup, MeshSource, UrlMeshSource};
pub use import::{import_mesh, import_mesh_slice};
pub use registry::MeshRegistry;
pub use types::{MeshBounds, MeshData, NormalizedMesh};
