//! Aisle Scene - retained scene graph kept in step with venue data
//!
//! The scene owns every node and every GPU-side resource. Domain entities
//! never hold node references: the reconciler and track renderer keep
//! id -> node side tables and are the only code that creates or disposes
//! nodes.

pub mod graph;
pub mod primitives;
mod reconcile;
pub mod resources;
mod scene;
mod tracks;

pub use graph::{Layer, NodeKind, NodeTag, SceneGraph, SceneNode};
pub use reconcile::{SceneReconciler, Selection};
pub use resources::{
    GeometryData, GeometryHandle, GpuResources, Material, MaterialHandle, ResourceKind,
    ResourceStats, TextureData, TextureHandle, Topology,
};
pub use scene::{Drawable, Scene, SyncReport};
pub use tracks::{TrackRenderer, TrackSettings};
