//! Geometry builders (box, polygon fill, lines, rings)

use crate::resources::{GeometryData, Topology};
use aisle_asset::NormalizedMesh;
use aisle_core::geometry::Triangulation;
use aisle_core::{FloorPoint, Vec3};
use bytemuck::{Pod, Zeroable};

/// A vertex with position and normal
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    pub fn new(position: [f32; 3], normal: [f32; 3]) -> Self {
        Self { position, normal }
    }
}

const UP: [f32; 3] = [0.0, 1.0, 0.0];

/// Unit cube resting on `y = 0`, centered in x/z. Scaled per node to the
/// object's full size.
pub fn unit_box() -> GeometryData {
    let positions = [
        [-0.5, 0.0, -0.5], // 0: back-bottom-left
        [0.5, 0.0, -0.5],  // 1: back-bottom-right
        [0.5, 1.0, -0.5],  // 2: back-top-right
        [-0.5, 1.0, -0.5], // 3: back-top-left
        [-0.5, 0.0, 0.5],  // 4: front-bottom-left
        [0.5, 0.0, 0.5],   // 5: front-bottom-right
        [0.5, 1.0, 0.5],   // 6: front-top-right
        [-0.5, 1.0, 0.5],  // 7: front-top-left
    ];

    // (corners, normal) per face, CCW seen from outside
    let faces: [([usize; 4], [f32; 3]); 6] = [
        ([0, 3, 2, 1], [0.0, 0.0, -1.0]),
        ([4, 5, 6, 7], [0.0, 0.0, 1.0]),
        ([0, 4, 7, 3], [-1.0, 0.0, 0.0]),
        ([5, 1, 2, 6], [1.0, 0.0, 0.0]),
        ([0, 1, 5, 4], [0.0, -1.0, 0.0]),
        ([3, 7, 6, 2], UP),
    ];

    let vertices = faces
        .iter()
        .flat_map(|(corners, normal)| corners.map(|c| Vertex::new(positions[c], *normal)))
        .collect();

    let indices = (0..6u32)
        .flat_map(|face| {
            let base = face * 4;
            [base, base + 1, base + 2, base, base + 2, base + 3]
        })
        .collect();

    GeometryData {
        vertices,
        indices,
        topology: Topology::Triangles,
    }
}

/// Upload-ready copy of a cached mesh
pub fn mesh_geometry(mesh: &NormalizedMesh) -> GeometryData {
    let vertices = mesh
        .mesh
        .positions
        .iter()
        .enumerate()
        .map(|(i, p)| Vertex::new(*p, mesh.mesh.normals.get(i).copied().unwrap_or(UP)))
        .collect();
    GeometryData {
        vertices,
        indices: mesh.mesh.indices.clone(),
        topology: Topology::Triangles,
    }
}

/// Flat polygon fill at height `y`
pub fn polygon_fill(poly: &[FloorPoint], triangulation: &Triangulation, y: f32) -> GeometryData {
    GeometryData {
        vertices: poly
            .iter()
            .map(|p| Vertex::new([p.x, y, p.z], UP))
            .collect(),
        indices: triangulation.triangles.iter().flatten().copied().collect(),
        topology: Topology::Triangles,
    }
}

/// Open polyline through `points`
pub fn polyline(points: &[Vec3]) -> GeometryData {
    GeometryData {
        vertices: points
            .iter()
            .map(|p| Vertex::new(p.to_array(), UP))
            .collect(),
        indices: (0..points.len() as u32).collect(),
        topology: Topology::LineStrip,
    }
}

/// Polyline on the floor plane at height `y`
pub fn floor_polyline(points: &[FloorPoint], y: f32) -> GeometryData {
    let lifted: Vec<Vec3> = points.iter().map(|p| p.at_height(y)).collect();
    polyline(&lifted)
}

/// Closed circle of `segments` edges (`segments + 1` points) in the local
/// x/z plane
pub fn ring(radius: f32, segments: u32) -> GeometryData {
    let segments = segments.max(3);
    let points: Vec<Vec3> = (0..=segments)
        .map(|i| {
            let angle = i as f32 / segments as f32 * std::f32::consts::TAU;
            Vec3::new(radius * angle.cos(), 0.0, radius * angle.sin())
        })
        .collect();
    polyline(&points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aisle_core::geometry::triangulate;

    #[test]
    fn test_unit_box_counts_and_extent() {
        let mesh = unit_box();
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        let min_y = mesh.positions().map(|p| p[1]).fold(f32::MAX, f32::min);
        let max_y = mesh.positions().map(|p| p[1]).fold(f32::MIN, f32::max);
        assert_eq!((min_y, max_y), (0.0, 1.0));
    }

    #[test]
    fn test_polygon_fill_uses_triangulation() {
        let square = [
            FloorPoint::new(0.0, 0.0),
            FloorPoint::new(2.0, 0.0),
            FloorPoint::new(2.0, 2.0),
            FloorPoint::new(0.0, 2.0),
        ];
        let tri = triangulate(&square).unwrap();
        let fill = polygon_fill(&square, &tri, 0.01);
        assert_eq!(fill.vertices.len(), 4);
        assert_eq!(fill.triangles().len(), 2);
        assert!(fill.positions().all(|p| p[1] == 0.01));
    }

    #[test]
    fn test_ring_is_closed() {
        let r = ring(3.0, 32);
        assert_eq!(r.vertices.len(), 33);
        let first = r.vertices[0].position;
        let last = r.vertices[32].position;
        assert!((first[0] - last[0]).abs() < 1e-4);
        assert!((first[2] - last[2]).abs() < 1e-4);
        assert!(r.triangles().is_empty());
    }
}
