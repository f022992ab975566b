//! Scene graph arena
//!
//! Nodes live in an arena keyed by `NodeId`. Entity ownership is recorded by
//! tagging a group node; any descendant resolves its owner by walking up to
//! the nearest tagged ancestor, so composite meshes need no per-child ids.

use crate::resources::{GeometryHandle, GpuResources, MaterialHandle, TextureHandle};
use aisle_core::{mat4_mul, AisleError, EntityId, NodeId, Result, Transform};
use std::collections::BTreeMap;
use tracing::warn;

/// Interaction layer a tagged node belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Layer {
    Object,
    Sensor,
    RegionVertex,
    RegionBody,
    Track,
    /// Previews and helpers, never hit-tested
    Overlay,
}

/// Ownership tag on a node group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTag {
    pub layer: Layer,
    pub entity: EntityId,
    /// Vertex index for region handles
    pub vertex: Option<usize>,
}

impl NodeTag {
    pub fn new(layer: Layer, entity: EntityId) -> Self {
        Self {
            layer,
            entity,
            vertex: None,
        }
    }

    pub fn vertex(entity: EntityId, index: usize) -> Self {
        Self {
            layer: Layer::RegionVertex,
            entity,
            vertex: Some(index),
        }
    }
}

/// What a node draws
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    Group,
    Mesh {
        geometry: GeometryHandle,
        material: MaterialHandle,
    },
    Line {
        geometry: GeometryHandle,
        material: MaterialHandle,
    },
    Label {
        texture: TextureHandle,
    },
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub tag: Option<NodeTag>,
    pub transform: Transform,
    pub visible: bool,
    pub kind: NodeKind,
}

/// Arena of scene nodes under a single root
pub struct SceneGraph {
    nodes: BTreeMap<NodeId, SceneNode>,
    root: NodeId,
    next_id: u64,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        let root = NodeId::from_raw(0);
        let mut nodes = BTreeMap::new();
        nodes.insert(
            root,
            SceneNode {
                name: "root".into(),
                parent: None,
                children: Vec::new(),
                tag: None,
                transform: Transform::IDENTITY,
                visible: true,
                kind: NodeKind::Group,
            },
        );
        Self {
            nodes,
            root,
            next_id: 1,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Attach a new node under `parent`
    pub fn add(&mut self, parent: NodeId, name: impl Into<String>, kind: NodeKind) -> Result<NodeId> {
        let id = NodeId::from_raw(self.next_id);
        self.nodes
            .get_mut(&parent)
            .ok_or(AisleError::NodeNotFound(parent.raw()))?
            .children
            .push(id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            SceneNode {
                name: name.into(),
                parent: Some(parent),
                children: Vec::new(),
                tag: None,
                transform: Transform::IDENTITY,
                visible: true,
                kind,
            },
        );
        Ok(id)
    }

    /// Attach a tagged group under `parent`
    pub fn add_group(&mut self, parent: NodeId, name: impl Into<String>, tag: Option<NodeTag>) -> Result<NodeId> {
        let id = self.add(parent, name, NodeKind::Group)?;
        if let Some(node) = self.nodes.get_mut(&id) {
            node.tag = tag;
        }
        Ok(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Replace a node's local transform. Returns whether it changed.
    pub fn set_transform(&mut self, id: NodeId, transform: Transform) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) if node.transform != transform => {
                node.transform = transform;
                true
            }
            _ => false,
        }
    }

    /// Returns whether the visibility flag changed
    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) if node.visible != visible => {
                node.visible = visible;
                true
            }
            _ => false,
        }
    }

    pub fn set_tag(&mut self, id: NodeId, tag: NodeTag) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.tag = Some(tag);
        }
    }

    /// Swap what a node draws, returning the previous kind so the caller can
    /// release its resources
    pub fn replace_kind(&mut self, id: NodeId, kind: NodeKind) -> Option<NodeKind> {
        let node = self.nodes.get_mut(&id)?;
        Some(std::mem::replace(&mut node.kind, kind))
    }

    /// Nearest tag on `id` or any of its ancestors
    pub fn owner_of(&self, id: NodeId) -> Option<&NodeTag> {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.nodes.get(&node_id)?;
            if let Some(tag) = &node.tag {
                return Some(tag);
            }
            current = node.parent;
        }
        None
    }

    /// Visible only if the node and every ancestor are visible
    pub fn is_visible(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            match self.nodes.get(&node_id) {
                Some(node) if node.visible => current = node.parent,
                _ => return false,
            }
        }
        true
    }

    /// Local-to-world matrix (column-major)
    pub fn world_matrix(&self, id: NodeId) -> [[f32; 4]; 4] {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let Some(node) = self.nodes.get(&node_id) else {
                break;
            };
            chain.push(node.transform.to_matrix());
            current = node.parent;
        }
        chain
            .iter()
            .rev()
            .fold(Transform::IDENTITY.to_matrix(), |acc, m| mat4_mul(&acc, m))
    }

    /// Nodes in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Detach `id` and everything below it, releasing every resource the
    /// removed nodes referenced. Returns the number of nodes removed.
    pub fn remove_subtree(&mut self, id: NodeId, resources: &mut GpuResources) -> usize {
        if id == self.root {
            return 0;
        }
        let Some(parent) = self.nodes.get(&id).and_then(|n| n.parent) else {
            return 0;
        };
        if let Some(parent) = self.nodes.get_mut(&parent) {
            parent.children.retain(|c| *c != id);
        }

        let mut removed = 0;
        let mut stack = vec![id];
        while let Some(node_id) = stack.pop() {
            let Some(node) = self.nodes.remove(&node_id) else {
                continue;
            };
            stack.extend(node.children.iter().copied());
            let released = match node.kind {
                NodeKind::Group => Ok(()),
                NodeKind::Mesh { geometry, material } | NodeKind::Line { geometry, material } => {
                    let geometry = resources.release_geometry(geometry);
                    let material = resources.release_material(material);
                    geometry.and(material)
                }
                NodeKind::Label { texture } => resources.release_texture(texture),
            };
            if let Err(err) = released {
                warn!(node = %node_id, name = %node.name, error = %err, "resource release failed");
            }
            removed += 1;
        }
        removed
    }
}
