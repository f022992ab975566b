//! Mesh data types

/// Axis-aligned bounding box computed from vertex positions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshBounds {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl MeshBounds {
    /// Compute bounds from a set of vertex positions
    pub fn from_positions(positions: &[[f32; 3]]) -> Option<Self> {
        let first = *positions.first()?;
        let (min, max) = positions.iter().skip(1).fold((first, first), |(mut min, mut max), p| {
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
            (min, max)
        });
        Some(Self { min, max })
    }

    /// Size along each axis
    pub fn size(&self) -> [f32; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    pub fn center(&self) -> [f32; 3] {
        [
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        ]
    }
}

impl std::fmt::Display for MeshBounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.size();
        write!(f, "{:.2} x {:.2} x {:.2}", s[0], s[1], s[2])
    }
}

/// Triangle mesh merged from every primitive of an asset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn bounds(&self) -> Option<MeshBounds> {
        MeshBounds::from_positions(&self.positions)
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Append another mesh, offsetting its indices
    pub fn append(&mut self, other: MeshData) {
        let base = self.positions.len() as u32;
        self.positions.extend(other.positions);
        self.normals.extend(other.normals);
        self.indices.extend(other.indices.into_iter().map(|i| i + base));
    }

    /// Recenter on the origin in x/z and rest the base on `y = 0`, recording
    /// the original bounding size. Returns None for an empty mesh.
    pub fn normalized(mut self) -> Option<NormalizedMesh> {
        let bounds = self.bounds()?;
        let center = bounds.center();
        let offset = [center[0], bounds.min[1], center[2]];
        for p in &mut self.positions {
            p[0] -= offset[0];
            p[1] -= offset[1];
            p[2] -= offset[2];
        }
        Some(NormalizedMesh {
            mesh: self,
            original_size: bounds.size(),
        })
    }
}

/// A mesh ready for placement: centered, floor-resting, with its source size
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMesh {
    pub mesh: MeshData,
    pub original_size: [f32; 3],
}

impl NormalizedMesh {
    /// Per-axis scale that stretches this mesh to `target` size. Flat axes
    /// (zero source extent) keep unit scale.
    pub fn fit_scale(&self, target: [f32; 3]) -> [f32; 3] {
        let mut out = [1.0; 3];
        for i in 0..3 {
            if self.original_size[i] > 1e-6 {
                out[i] = target[i] / self.original_size[i];
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offset_quad() -> MeshData {
        MeshData {
            positions: vec![
                [10.0, 2.0, 4.0],
                [12.0, 2.0, 4.0],
                [12.0, 5.0, 8.0],
                [10.0, 5.0, 8.0],
            ],
            normals: vec![[0.0, 1.0, 0.0]; 4],
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }

    #[test]
    fn test_normalize_recenters_and_rests_on_floor() {
        let normalized = offset_quad().normalized().unwrap();
        let bounds = normalized.mesh.bounds().unwrap();
        assert_eq!(bounds.min, [-1.0, 0.0, -2.0]);
        assert_eq!(bounds.max, [1.0, 3.0, 2.0]);
        assert_eq!(normalized.original_size, [2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_normalize_empty_mesh() {
        assert!(MeshData::default().normalized().is_none());
    }

    #[test]
    fn test_fit_scale() {
        let normalized = offset_quad().normalized().unwrap();
        assert_eq!(normalized.fit_scale([4.0, 3.0, 2.0]), [2.0, 1.0, 0.5]);
    }

    #[test]
    fn test_append_offsets_indices() {
        let mut a = offset_quad();
        a.append(offset_quad());
        assert_eq!(a.vertex_count(), 8);
        assert_eq!(a.triangle_count(), 4);
        assert_eq!(&a.indices[6..9], &[4, 5, 6]);
    }
}
