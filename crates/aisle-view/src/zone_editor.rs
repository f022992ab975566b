//! Zone Polygon Editor
//!
//! Drawing mode collects clicked floor points into a draft polygon. Editing
//! an existing region works on plain vertex lists: every helper returns a
//! new list and leaves the source untouched, since the region store owns
//! the committed shape.

use aisle_core::geometry::{edge_midpoint, validate_region};
use aisle_core::{AisleError, FloorPoint, Region, Result};

/// Minimum vertices a committed region keeps
pub const MIN_REGION_VERTICES: usize = 3;

/// In-progress polygon while drawing a new zone
#[derive(Debug, Clone, Default)]
pub struct ZoneEditor {
    drawing: bool,
    points: Vec<FloorPoint>,
}

impl ZoneEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter drawing mode with an empty draft
    pub fn begin(&mut self) {
        self.drawing = true;
        self.points.clear();
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    pub fn points(&self) -> &[FloorPoint] {
        &self.points
    }

    /// Append a vertex. Ignored outside drawing mode.
    pub fn add_point(&mut self, p: FloorPoint) -> bool {
        if !self.drawing {
            return false;
        }
        self.points.push(p);
        true
    }

    /// Drop the most recent vertex
    pub fn undo(&mut self) -> Option<FloorPoint> {
        if !self.drawing {
            return None;
        }
        self.points.pop()
    }

    /// Leave drawing mode and discard the draft
    pub fn cancel(&mut self) {
        self.drawing = false;
        self.points.clear();
    }

    pub fn can_finish(&self) -> bool {
        self.drawing && self.points.len() >= MIN_REGION_VERTICES
    }

    /// Validate the draft and hand back its vertices, leaving drawing mode.
    /// On error the draft is kept so the user can keep editing it.
    pub fn finish(&mut self) -> Result<Vec<FloorPoint>> {
        if !self.drawing {
            return Err(AisleError::InvalidRegion("not drawing".into()));
        }
        validate_region(&self.points)?;
        self.drawing = false;
        Ok(std::mem::take(&mut self.points))
    }
}

/// First free "Zone N" name, counting from the number of existing regions
pub fn next_zone_name(existing: &[Region]) -> String {
    let mut n = existing.len() + 1;
    loop {
        let name = format!("Zone {}", n);
        if !existing.iter().any(|r| r.name == name) {
            return name;
        }
        n += 1;
    }
}

/// Vertex list with `index` moved to `to`
pub fn move_vertex(vertices: &[FloorPoint], index: usize, to: FloorPoint) -> Option<Vec<FloorPoint>> {
    if index >= vertices.len() {
        return None;
    }
    let mut moved = vertices.to_vec();
    moved[index] = to;
    Some(moved)
}

/// Every vertex shifted by `delta`
pub fn translate(vertices: &[FloorPoint], delta: FloorPoint) -> Vec<FloorPoint> {
    vertices.iter().map(|v| *v + delta).collect()
}

/// Split edge `edge -> edge + 1` at its midpoint. The new vertex lands at
/// index `edge + 1`.
pub fn insert_vertex_at_edge(vertices: &[FloorPoint], edge: usize) -> Result<Vec<FloorPoint>> {
    let midpoint = edge_midpoint(vertices, edge).ok_or_else(|| {
        AisleError::InvalidRegion(format!("edge {} out of range for {} vertices", edge, vertices.len()))
    })?;
    let mut inserted = vertices.to_vec();
    inserted.insert(edge + 1, midpoint);
    Ok(inserted)
}

/// Remove vertex `index`, refusing to go below three vertices
pub fn remove_vertex(vertices: &[FloorPoint], index: usize) -> Result<Vec<FloorPoint>> {
    if index >= vertices.len() {
        return Err(AisleError::InvalidRegion(format!(
            "vertex {} out of range for {} vertices",
            index,
            vertices.len()
        )));
    }
    if vertices.len() <= MIN_REGION_VERTICES {
        return Err(AisleError::InvalidRegion(format!(
            "a region keeps at least {} vertices",
            MIN_REGION_VERTICES
        )));
    }
    let mut removed = vertices.to_vec();
    removed.remove(index);
    Ok(removed)
}
