//! GPU-resident resource pool
//!
//! Geometry, material and texture data are owned here and referenced from
//! scene nodes by handle. Every handle is released at most once; releasing a
//! stale handle is reported as an error instead of silently succeeding.

use crate::primitives::Vertex;
use aisle_core::{AisleError, Color, Result};
use std::collections::HashMap;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(u64);

/// Which kind of resource a handle refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Geometry,
    Material,
    Texture,
}

/// Primitive assembly for a geometry buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Triangles,
    /// Consecutive vertices joined by segments
    LineStrip,
}

/// Vertex and index buffers for one drawable
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub topology: Topology,
}

impl GeometryData {
    /// Bytes this geometry occupies once uploaded
    pub fn byte_len(&self) -> usize {
        bytemuck::cast_slice::<Vertex, u8>(&self.vertices).len()
            + bytemuck::cast_slice::<u32, u8>(&self.indices).len()
    }

    pub fn positions(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.vertices.iter().map(|v| v.position)
    }

    /// Triangle corner positions, empty for line geometry
    pub fn triangles(&self) -> Vec<[[f32; 3]; 3]> {
        if self.topology != Topology::Triangles {
            return Vec::new();
        }
        self.indices
            .chunks_exact(3)
            .filter_map(|tri| {
                let a = self.vertices.get(tri[0] as usize)?;
                let b = self.vertices.get(tri[1] as usize)?;
                let c = self.vertices.get(tri[2] as usize)?;
                Some([a.position, b.position, c.position])
            })
            .collect()
    }
}

/// Surface parameters for a drawable
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub color: Color,
    pub opacity: f32,
    /// Selection highlight strength; 0 when not highlighted
    pub emissive: f32,
    pub dashed: bool,
}

impl Material {
    pub fn solid(color: Color) -> Self {
        Self {
            color,
            opacity: 1.0,
            emissive: 0.0,
            dashed: false,
        }
    }

    pub fn translucent(color: Color, opacity: f32) -> Self {
        Self {
            opacity,
            ..Self::solid(color)
        }
    }

    pub fn dashed(color: Color) -> Self {
        Self {
            dashed: true,
            ..Self::solid(color)
        }
    }
}

/// A text label rasterized into an RGBA texture
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub text: String,
    pub width: u32,
    pub height: u32,
}

impl TextureData {
    const GLYPH_WIDTH: u32 = 8;
    const LINE_HEIGHT: u32 = 16;

    pub fn label(text: impl Into<String>) -> Self {
        let text = text.into();
        let width = (text.chars().count().max(1) as u32) * Self::GLYPH_WIDTH;
        Self {
            text,
            width,
            height: Self::LINE_HEIGHT,
        }
    }

    pub fn byte_len(&self) -> usize {
        (self.width * self.height * 4) as usize
    }
}

/// Counters for leak checks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceStats {
    pub live_geometries: usize,
    pub live_materials: usize,
    pub live_textures: usize,
    pub total_releases: usize,
    pub uploaded_bytes: usize,
}

impl ResourceStats {
    pub fn live_total(&self) -> usize {
        self.live_geometries + self.live_materials + self.live_textures
    }
}

struct Pool<T> {
    items: HashMap<u64, T>,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self {
            items: HashMap::new(),
        }
    }
}

impl<T> Pool<T> {
    /// Ids are handed out monotonically, so a missing id at or below
    /// `last_id` has already been released.
    fn release(&mut self, kind: ResourceKind, raw: u64, last_id: u64) -> Result<T> {
        match self.items.remove(&raw) {
            Some(item) => Ok(item),
            None => {
                let reason = if raw != 0 && raw <= last_id {
                    "released twice"
                } else {
                    "never allocated"
                };
                error!(?kind, handle = raw, reason, "invalid resource release");
                Err(AisleError::ResourceError(format!(
                    "{:?} handle {} {}",
                    kind, raw, reason
                )))
            }
        }
    }
}

/// Owner of every uploaded buffer, material and texture
#[derive(Default)]
pub struct GpuResources {
    geometries: Pool<GeometryData>,
    materials: Pool<Material>,
    textures: Pool<TextureData>,
    next_id: u64,
    total_releases: usize,
    uploaded_bytes: usize,
}

impl GpuResources {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn create_geometry(&mut self, data: GeometryData) -> GeometryHandle {
        let id = self.allocate();
        self.uploaded_bytes += data.byte_len();
        self.geometries.items.insert(id, data);
        GeometryHandle(id)
    }

    /// Replace the buffers behind a live handle (counts as a new upload)
    pub fn update_geometry(&mut self, handle: GeometryHandle, data: GeometryData) -> Result<()> {
        let slot = self.geometries.items.get_mut(&handle.0).ok_or_else(|| {
            AisleError::ResourceError(format!("geometry handle {} is not live", handle.0))
        })?;
        self.uploaded_bytes += data.byte_len();
        *slot = data;
        Ok(())
    }

    pub fn geometry(&self, handle: GeometryHandle) -> Option<&GeometryData> {
        self.geometries.items.get(&handle.0)
    }

    pub fn release_geometry(&mut self, handle: GeometryHandle) -> Result<()> {
        self.geometries
            .release(ResourceKind::Geometry, handle.0, self.next_id)?;
        self.total_releases += 1;
        Ok(())
    }

    pub fn create_material(&mut self, material: Material) -> MaterialHandle {
        let id = self.allocate();
        self.materials.items.insert(id, material);
        MaterialHandle(id)
    }

    pub fn material(&self, handle: MaterialHandle) -> Option<&Material> {
        self.materials.items.get(&handle.0)
    }

    /// Overwrite a material if it differs. Returns whether anything changed.
    pub fn set_material(&mut self, handle: MaterialHandle, material: Material) -> bool {
        match self.materials.items.get_mut(&handle.0) {
            Some(slot) if *slot != material => {
                *slot = material;
                true
            }
            _ => false,
        }
    }

    pub fn release_material(&mut self, handle: MaterialHandle) -> Result<()> {
        self.materials
            .release(ResourceKind::Material, handle.0, self.next_id)?;
        self.total_releases += 1;
        Ok(())
    }

    pub fn create_texture(&mut self, data: TextureData) -> TextureHandle {
        let id = self.allocate();
        self.uploaded_bytes += data.byte_len();
        self.textures.items.insert(id, data);
        TextureHandle(id)
    }

    pub fn texture(&self, handle: TextureHandle) -> Option<&TextureData> {
        self.textures.items.get(&handle.0)
    }

    pub fn release_texture(&mut self, handle: TextureHandle) -> Result<()> {
        self.textures
            .release(ResourceKind::Texture, handle.0, self.next_id)?;
        self.total_releases += 1;
        Ok(())
    }

    pub fn is_geometry_live(&self, handle: GeometryHandle) -> bool {
        self.geometries.items.contains_key(&handle.0)
    }

    pub fn is_material_live(&self, handle: MaterialHandle) -> bool {
        self.materials.items.contains_key(&handle.0)
    }

    pub fn is_texture_live(&self, handle: TextureHandle) -> bool {
        self.textures.items.contains_key(&handle.0)
    }

    pub fn stats(&self) -> ResourceStats {
        ResourceStats {
            live_geometries: self.geometries.items.len(),
            live_materials: self.materials.items.len(),
            live_textures: self.textures.items.len(),
            total_releases: self.total_releases,
            uploaded_bytes: self.uploaded_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::unit_box;

    #[test]
    fn test_create_and_release_geometry() {
        let mut resources = GpuResources::new();
        let handle = resources.create_geometry(unit_box());
        assert!(resources.is_geometry_live(handle));
        assert!(resources.stats().uploaded_bytes > 0);

        resources.release_geometry(handle).unwrap();
        assert!(!resources.is_geometry_live(handle));
        assert_eq!(resources.stats().total_releases, 1);
        assert_eq!(resources.stats().live_total(), 0);
    }

    #[test]
    fn test_double_release_is_error() {
        let mut resources = GpuResources::new();
        let handle = resources.create_material(Material::solid(Color::WHITE));
        resources.release_material(handle).unwrap();
        let err = resources.release_material(handle).unwrap_err();
        assert!(matches!(err, AisleError::ResourceError(_)));
        assert_eq!(resources.stats().total_releases, 1);
    }

    #[test]
    fn test_unknown_handle_is_never_allocated() {
        let mut resources = GpuResources::new();
        let err = resources.release_texture(TextureHandle(42)).unwrap_err();
        match err {
            AisleError::ResourceError(msg) => assert!(msg.contains("never allocated"), "{}", msg),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_release_churn_retains_nothing() {
        let mut resources = GpuResources::new();
        let mut last = None;
        for _ in 0..10_000 {
            let handle = resources.create_material(Material::solid(Color::WHITE));
            resources.release_material(handle).unwrap();
            last = Some(handle);
        }
        assert!(resources.materials.items.is_empty());
        assert_eq!(resources.stats().total_releases, 10_000);
        assert_eq!(resources.stats().live_total(), 0);

        let err = resources.release_material(last.unwrap()).unwrap_err();
        match err {
            AisleError::ResourceError(msg) => assert!(msg.contains("released twice"), "{}", msg),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_set_material_reports_change() {
        let mut resources = GpuResources::new();
        let handle = resources.create_material(Material::solid(Color::WHITE));
        assert!(!resources.set_material(handle, Material::solid(Color::WHITE)));
        assert!(resources.set_material(handle, Material::translucent(Color::WHITE, 0.5)));
        assert_eq!(resources.material(handle).unwrap().opacity, 0.5);
    }

    #[test]
    fn test_uploaded_bytes_counts_vertices_and_indices() {
        let mut resources = GpuResources::new();
        let data = unit_box();
        let expected = data.vertices.len() * std::mem::size_of::<Vertex>() + data.indices.len() * 4;
        resources.create_geometry(data);
        assert_eq!(resources.stats().uploaded_bytes, expected);
    }

    #[test]
    fn test_label_texture_size() {
        let mut resources = GpuResources::new();
        let handle = resources.create_texture(TextureData::label("Entrance"));
        let texture = resources.texture(handle).unwrap();
        assert_eq!(texture.width, 64);
        assert_eq!(texture.byte_len(), 64 * 16 * 4);
    }
}
