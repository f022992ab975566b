//! Per-fixture-type mesh cache
//!
//! `load` resolves synchronously. `request` + `poll` split the same work so a
//! view can keep drawing fallback boxes while loads are outstanding; a load
//! that resolves after `invalidate` belongs to a discarded generation and is
//! dropped.

use crate::import::{import_mesh, import_mesh_slice};
use crate::types::{MeshData, NormalizedMesh};
use aisle_core::{AisleError, Result};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};

/// Where mesh bytes come from
pub trait MeshSource {
    fn fetch(&self, url: &str) -> Result<MeshData>;
}

/// Loads `http(s)://` URLs over the network and everything else from disk
#[derive(Debug, Default)]
pub struct UrlMeshSource;

impl MeshSource for UrlMeshSource {
    fn fetch(&self, url: &str) -> Result<MeshData> {
        if url.starts_with("http://") || url.starts_with("https://") {
            let mut response = ureq::get(url)
                .call()
                .map_err(|e| AisleError::AssetError(format!("GET {} failed: {}", url, e)))?;
            let bytes = response
                .body_mut()
                .read_to_vec()
                .map_err(|e| AisleError::AssetError(format!("reading {} failed: {}", url, e)))?;
            import_mesh_slice(&bytes)
        } else {
            import_mesh(url.strip_prefix("file://").unwrap_or(url))
        }
    }
}

/// In-memory source keyed by URL, for fixtures and tests
#[derive(Debug, Default)]
pub struct MemoryMeshSource {
    meshes: HashMap<String, MeshData>,
}

impl MemoryMeshSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, mesh: MeshData) {
        self.meshes.insert(url.into(), mesh);
    }
}

impl MeshSource for MemoryMeshSource {
    fn fetch(&self, url: &str) -> Result<MeshData> {
        self.meshes
            .get(url)
            .cloned()
            .ok_or_else(|| AisleError::AssetError(format!("no asset at {}", url)))
    }
}

/// Result of a non-blocking cache lookup
#[derive(Debug, Clone, PartialEq)]
pub enum MeshLookup {
    Ready(NormalizedMesh),
    Pending,
    /// The last load failed; draw the fallback primitive
    Failed,
}

/// A load resolved by `poll`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    pub key: String,
    pub loaded: bool,
}

enum CacheEntry {
    Ready(NormalizedMesh),
    Failed,
}

struct PendingLoad {
    key: String,
    url: String,
    generation: u64,
}

/// Process-lifetime cache of normalized meshes, keyed by fixture type
pub struct MeshCache {
    entries: HashMap<String, CacheEntry>,
    pending: VecDeque<PendingLoad>,
    generation: u64,
}

impl Default for MeshCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshCache {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            pending: VecDeque::new(),
            generation: 0,
        }
    }

    /// Fetch-or-clone. Returns None when the asset cannot be fetched or
    /// parsed; the caller falls back to a unit box.
    pub fn load(&mut self, key: &str, url: &str, source: &dyn MeshSource) -> Option<NormalizedMesh> {
        match self.entries.get(key) {
            Some(CacheEntry::Ready(mesh)) => return Some(mesh.clone()),
            Some(CacheEntry::Failed) => return None,
            None => {}
        }
        self.pending.retain(|p| p.key != key);
        self.resolve(key, url, source)
    }

    /// Non-blocking lookup; queues a load on first request
    pub fn request(&mut self, key: &str, url: &str) -> MeshLookup {
        match self.entries.get(key) {
            Some(CacheEntry::Ready(mesh)) => MeshLookup::Ready(mesh.clone()),
            Some(CacheEntry::Failed) => MeshLookup::Failed,
            None => {
                if !self.pending.iter().any(|p| p.key == key) {
                    debug!(key, url, "queueing mesh load");
                    self.pending.push_back(PendingLoad {
                        key: key.to_string(),
                        url: url.to_string(),
                        generation: self.generation,
                    });
                }
                MeshLookup::Pending
            }
        }
    }

    /// Resolve up to `budget` queued loads
    pub fn poll(&mut self, source: &dyn MeshSource, budget: usize) -> Vec<LoadOutcome> {
        let mut outcomes = Vec::new();
        while outcomes.len() < budget {
            let Some(load) = self.pending.pop_front() else {
                break;
            };
            if load.generation != self.generation {
                debug!(key = %load.key, "dropping load from an invalidated generation");
                continue;
            }
            let loaded = self.resolve(&load.key, &load.url, source).is_some();
            outcomes.push(LoadOutcome {
                key: load.key,
                loaded,
            });
        }
        outcomes
    }

    fn resolve(&mut self, key: &str, url: &str, source: &dyn MeshSource) -> Option<NormalizedMesh> {
        let result = source.fetch(url).and_then(|mesh| {
            mesh.normalized()
                .ok_or_else(|| AisleError::AssetError("asset has no vertices".into()))
        });
        match result {
            Ok(mesh) => {
                debug!(key, url, vertices = mesh.mesh.vertex_count(), "mesh cached");
                self.entries
                    .insert(key.to_string(), CacheEntry::Ready(mesh.clone()));
                Some(mesh)
            }
            Err(err) => {
                warn!(key, url, error = %err, "mesh load failed, using fallback box");
                self.entries.insert(key.to_string(), CacheEntry::Failed);
                None
            }
        }
    }

    /// Drop every entry after an "assets changed" signal. Loads still queued
    /// from before this call are discarded when they come up.
    pub fn invalidate(&mut self) {
        self.entries.clear();
        self.generation += 1;
    }

    /// Release everything, including queued loads
    pub fn clear(&mut self) {
        self.invalidate();
        self.pending.clear();
    }

    pub fn has_pending(&self) -> bool {
        self.pending
            .iter()
            .any(|p| p.generation == self.generation)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
