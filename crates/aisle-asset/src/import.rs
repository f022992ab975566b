//! glTF/GLB mesh importer

use crate::types::MeshData;
use aisle_core::{AisleError, Result};
use std::path::Path;

/// Import every triangle primitive of a glTF or GLB file as one merged mesh
pub fn import_mesh<P: AsRef<Path>>(path: P) -> Result<MeshData> {
    let path = path.as_ref();
    let (document, buffers, _images) = gltf::import(path).map_err(|e| {
        AisleError::ImportError(format!("Failed to import {}: {}", path.display(), e))
    })?;
    collect_meshes(&document, &buffers)
}

/// Import from an in-memory GLB (or self-contained glTF) payload
pub fn import_mesh_slice(bytes: &[u8]) -> Result<MeshData> {
    let (document, buffers, _images) = gltf::import_slice(bytes)
        .map_err(|e| AisleError::ImportError(format!("Failed to import glTF payload: {}", e)))?;
    collect_meshes(&document, &buffers)
}

fn collect_meshes(document: &gltf::Document, buffers: &[gltf::buffer::Data]) -> Result<MeshData> {
    let mut merged = MeshData::default();

    for mesh in document.meshes() {
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                continue;
            }
            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| &d.0[..]));

            let positions: Vec<[f32; 3]> = match reader.read_positions() {
                Some(iter) => iter.collect(),
                None => continue,
            };

            let normals: Vec<[f32; 3]> = reader
                .read_normals()
                .map(|iter| iter.collect())
                .unwrap_or_else(|| vec![[0.0, 1.0, 0.0]; positions.len()]);

            // Non-indexed primitives draw vertices in order
            let indices: Vec<u32> = reader
                .read_indices()
                .map(|iter| iter.into_u32().collect())
                .unwrap_or_else(|| (0..positions.len() as u32).collect());

            merged.append(MeshData {
                positions,
                normals,
                indices,
            });
        }
    }

    if merged.positions.is_empty() {
        return Err(AisleError::ImportError(
            "asset contains no triangle geometry".into(),
        ));
    }

    Ok(merged)
}
