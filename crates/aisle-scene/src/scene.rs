//! Scene container and per-pass sync accounting

use crate::graph::{NodeKind, SceneGraph};
use crate::resources::{GeometryData, GeometryHandle, GpuResources, Material, MaterialHandle, Topology};
use aisle_core::{NodeId, Result};
use std::ops::AddAssign;

/// Scene graph plus the resources its nodes reference
#[derive(Default)]
pub struct Scene {
    pub graph: SceneGraph,
    pub resources: GpuResources,
}

/// A node that owns one geometry and one material
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drawable {
    pub node: NodeId,
    pub geometry: GeometryHandle,
    pub material: MaterialHandle,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload `geometry` and `material` and attach them as a mesh or line
    /// node (by topology) under `parent`
    pub fn add_drawable(
        &mut self,
        parent: NodeId,
        name: &str,
        geometry: GeometryData,
        material: Material,
    ) -> Result<Drawable> {
        let topology = geometry.topology;
        let geometry = self.resources.create_geometry(geometry);
        let material = self.resources.create_material(material);
        let kind = match topology {
            Topology::Triangles => NodeKind::Mesh { geometry, material },
            Topology::LineStrip => NodeKind::Line { geometry, material },
        };
        match self.graph.add(parent, name, kind) {
            Ok(node) => Ok(Drawable {
                node,
                geometry,
                material,
            }),
            Err(err) => {
                // Never attached, so release directly
                self.resources.release_geometry(geometry)?;
                self.resources.release_material(material)?;
                Err(err)
            }
        }
    }

    /// Remove a node subtree and release its resources
    pub fn remove(&mut self, node: NodeId) -> usize {
        self.graph.remove_subtree(node, &mut self.resources)
    }
}

/// What one reconciliation pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Entities that gained a node group
    pub created: usize,
    /// Entities whose node group was torn down
    pub removed: usize,
    /// Entities that had at least one geometry buffer rebuilt
    pub rebuilt: usize,
    /// Entities whose transforms, materials or visibility changed in place
    pub updated: usize,
}

impl SyncReport {
    /// True when the pass did not touch the scene
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

impl AddAssign for SyncReport {
    fn add_assign(&mut self, other: Self) {
        self.created += other.created;
        self.removed += other.removed;
        self.rebuilt += other.rebuilt;
        self.updated += other.updated;
    }
}
