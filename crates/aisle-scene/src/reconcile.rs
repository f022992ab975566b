//! Scene Reconciler
//!
//! Diffs each entity collection against its id -> node side table:
//! - ids without a node get a freshly built group
//! - nodes whose id disappeared are torn down and their resources released
//! - everything else is updated in place; only shape changes (region
//!   outlines, coverage radius, mesh swaps) rebuild a geometry buffer
//!
//! Every setter is compare-then-set, so a second pass over unchanged input
//! reports nothing.

use crate::graph::{Layer, NodeKind, NodeTag};
use crate::primitives::{floor_polyline, mesh_geometry, polygon_fill, ring, unit_box};
use crate::resources::{GeometryData, Material, TextureData};
use crate::scene::{Drawable, Scene, SyncReport};
use aisle_asset::{LoadOutcome, MeshCache, MeshLookup, MeshRegistry, MeshSource};
use aisle_core::geometry::{centroid, outline_loop, triangulate};
use aisle_core::{
    AisleError, Color, EntityId, FloorPoint, NodeId, PlacedObject, Region, Result,
    SensorPlacement, Transform, Vec3,
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

const REGION_FILL_HEIGHT: f32 = 0.01;
const REGION_OUTLINE_HEIGHT: f32 = 0.02;
const REGION_LABEL_HEIGHT: f32 = 0.05;
const DRAFT_HEIGHT: f32 = 0.03;
const HANDLE_SIZE: Vec3 = Vec3 {
    x: 0.25,
    y: 0.1,
    z: 0.25,
};
const SENSOR_BODY_SIZE: Vec3 = Vec3 {
    x: 0.3,
    y: 0.15,
    z: 0.3,
};
const COVERAGE_SEGMENTS: u32 = 48;
const COVERAGE_OPACITY: f32 = 0.5;
const DEFAULT_SELECTION_EMISSIVE: f32 = 0.4;

/// Currently selected entity per collection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub object: Option<EntityId>,
    pub sensor: Option<EntityId>,
    pub region: Option<EntityId>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.object.is_none() && self.sensor.is_none() && self.region.is_none()
    }
}

/// Which geometry an object body currently shows
#[derive(Debug, Clone, Copy, PartialEq)]
enum BodyMesh {
    Fallback,
    /// Fallback box on screen while the asset loads
    Pending,
    /// Cached asset with its original bounding size
    Loaded([f32; 3]),
}

struct ObjectEntry {
    group: NodeId,
    body: Drawable,
    mesh_key: String,
    mesh: BodyMesh,
}

struct SensorEntry {
    group: NodeId,
    body: Drawable,
    coverage: Drawable,
    range: f32,
}

struct RegionEntry {
    group: NodeId,
    fill: Drawable,
    outline: Drawable,
    handles_group: NodeId,
    handles: Vec<Drawable>,
    label: NodeId,
    vertices: Vec<FloorPoint>,
    name: String,
}

/// Owner of every entity node and of the fixture mesh cache
pub struct SceneReconciler {
    objects: HashMap<EntityId, ObjectEntry>,
    sensors: HashMap<EntityId, SensorEntry>,
    regions: HashMap<EntityId, RegionEntry>,
    draft: Option<Drawable>,
    meshes: MeshCache,
    registry: MeshRegistry,
    selection_emissive: f32,
}

impl Default for SceneReconciler {
    fn default() -> Self {
        Self::new(MeshRegistry::new())
    }
}

impl SceneReconciler {
    pub fn new(registry: MeshRegistry) -> Self {
        Self {
            objects: HashMap::new(),
            sensors: HashMap::new(),
            regions: HashMap::new(),
            draft: None,
            meshes: MeshCache::new(),
            registry,
            selection_emissive: DEFAULT_SELECTION_EMISSIVE,
        }
    }

    pub fn set_selection_emissive(&mut self, intensity: f32) {
        self.selection_emissive = intensity;
    }

    pub fn registry(&self) -> &MeshRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut MeshRegistry {
        &mut self.registry
    }

    pub fn mesh_cache(&self) -> &MeshCache {
        &self.meshes
    }

    fn highlight(&self, selected: bool) -> f32 {
        if selected {
            self.selection_emissive
        } else {
            0.0
        }
    }

    // ---- objects ----

    pub fn sync_objects(
        &mut self,
        scene: &mut Scene,
        objects: &[PlacedObject],
        selected: Option<&EntityId>,
    ) -> SyncReport {
        let mut report = SyncReport::default();

        let current: HashSet<&EntityId> = objects.iter().map(|o| &o.id).collect();
        let stale: Vec<EntityId> = self
            .objects
            .keys()
            .filter(|id| !current.contains(id))
            .cloned()
            .collect();
        for id in stale {
            if let Some(entry) = self.objects.remove(&id) {
                scene.remove(entry.group);
                debug!(entity = %id, "object node removed");
                report.removed += 1;
            }
        }

        for object in objects {
            let material = Material {
                emissive: self.highlight(selected == Some(&object.id)),
                ..Material::solid(object.display_color())
            };
            match self.objects.get_mut(&object.id) {
                Some(entry) => {
                    let (rebuilt, updated) = update_object(
                        scene,
                        entry,
                        object,
                        material,
                        &mut self.meshes,
                        &self.registry,
                    );
                    report.rebuilt += rebuilt as usize;
                    report.updated += updated as usize;
                }
                None => match create_object(scene, object, material, &mut self.meshes, &self.registry) {
                    Ok(entry) => {
                        debug!(entity = %object.id, kind = object.kind.as_str(), mesh = ?entry.mesh, "object node created");
                        self.objects.insert(object.id.clone(), entry);
                        report.created += 1;
                    }
                    Err(err) => warn!(entity = %object.id, error = %err, "failed to build object node"),
                },
            }
        }
        report
    }

    /// Move an object's node without touching its source data
    pub fn preview_object(&mut self, scene: &mut Scene, id: &EntityId, position: Vec3) -> bool {
        let Some(entry) = self.objects.get(id) else {
            return false;
        };
        let Some(node) = scene.graph.get(entry.group) else {
            return false;
        };
        let transform = node.transform.with_position(position);
        scene.graph.set_transform(entry.group, transform)
    }

    // ---- sensors ----

    pub fn sync_sensors(
        &mut self,
        scene: &mut Scene,
        sensors: &[SensorPlacement],
        selected: Option<&EntityId>,
    ) -> SyncReport {
        let mut report = SyncReport::default();

        let current: HashSet<&EntityId> = sensors.iter().map(|s| &s.id).collect();
        let stale: Vec<EntityId> = self
            .sensors
            .keys()
            .filter(|id| !current.contains(id))
            .cloned()
            .collect();
        for id in stale {
            if let Some(entry) = self.sensors.remove(&id) {
                scene.remove(entry.group);
                debug!(entity = %id, "sensor node removed");
                report.removed += 1;
            }
        }

        for sensor in sensors {
            let emissive = self.highlight(selected == Some(&sensor.id));
            match self.sensors.get_mut(&sensor.id) {
                Some(entry) => {
                    let mut updated = false;
                    let mut rebuilt = false;
                    updated |= scene.graph.set_transform(entry.group, sensor_transform(sensor));
                    updated |= scene.graph.set_transform(entry.body.node, sensor_body_transform(sensor));
                    updated |= scene
                        .graph
                        .set_transform(entry.coverage.node, coverage_transform(sensor));
                    updated |= scene
                        .resources
                        .set_material(entry.body.material, sensor_body_material(sensor, emissive));
                    updated |= scene
                        .resources
                        .set_material(entry.coverage.material, coverage_material(sensor));
                    if entry.range != sensor.range {
                        match scene
                            .resources
                            .update_geometry(entry.coverage.geometry, ring(sensor.range, COVERAGE_SEGMENTS))
                        {
                            Ok(()) => {
                                entry.range = sensor.range;
                                rebuilt = true;
                            }
                            Err(err) => warn!(entity = %sensor.id, error = %err, "coverage rebuild failed"),
                        }
                    }
                    report.rebuilt += rebuilt as usize;
                    report.updated += (updated && !rebuilt) as usize;
                }
                None => match create_sensor(scene, sensor, emissive) {
                    Ok(entry) => {
                        debug!(entity = %sensor.id, device = %sensor.device_id, "sensor node created");
                        self.sensors.insert(sensor.id.clone(), entry);
                        report.created += 1;
                    }
                    Err(err) => warn!(entity = %sensor.id, error = %err, "failed to build sensor node"),
                },
            }
        }
        report
    }

    /// Move a sensor's node on the floor plane, keeping its mount height
    pub fn preview_sensor(&mut self, scene: &mut Scene, id: &EntityId, at: FloorPoint) -> bool {
        let Some(entry) = self.sensors.get(id) else {
            return false;
        };
        let Some(node) = scene.graph.get(entry.group) else {
            return false;
        };
        let y = node.transform.position.y;
        let transform = node.transform.with_position(at.at_height(y));
        scene.graph.set_transform(entry.group, transform)
    }

    // ---- regions ----

    pub fn sync_regions(
        &mut self,
        scene: &mut Scene,
        regions: &[Region],
        selected: Option<&EntityId>,
    ) -> SyncReport {
        let mut report = SyncReport::default();

        // Degenerate regions are skipped, and lose their node if they had one
        let current: HashSet<&EntityId> = regions
            .iter()
            .filter(|r| r.is_renderable())
            .map(|r| &r.id)
            .collect();
        let stale: Vec<EntityId> = self
            .regions
            .keys()
            .filter(|id| !current.contains(id))
            .cloned()
            .collect();
        for id in stale {
            if let Some(entry) = self.regions.remove(&id) {
                scene.remove(entry.group);
                debug!(entity = %id, "region node removed");
                report.removed += 1;
            }
        }

        for region in regions.iter().filter(|r| r.is_renderable()) {
            let is_selected = selected == Some(&region.id);
            let emissive = self.highlight(is_selected);
            match self.regions.get_mut(&region.id) {
                Some(entry) => {
                    let mut rebuilt = apply_region_shape(scene, entry, &region.id, &region.vertices);
                    if entry.name != region.name {
                        rebuilt |= relabel_region(scene, entry, &region.name);
                    }
                    let mut updated = false;
                    updated |= scene
                        .resources
                        .set_material(entry.fill.material, region_fill_material(region, emissive));
                    updated |= scene
                        .resources
                        .set_material(entry.outline.material, Material::solid(region.color));
                    updated |= scene.graph.set_visible(entry.handles_group, is_selected);
                    report.rebuilt += rebuilt as usize;
                    report.updated += (updated && !rebuilt) as usize;
                }
                None => match create_region(scene, region, emissive, is_selected) {
                    Ok(entry) => {
                        debug!(entity = %region.id, vertices = region.vertices.len(), "region node created");
                        self.regions.insert(region.id.clone(), entry);
                        report.created += 1;
                    }
                    Err(err) => warn!(entity = %region.id, error = %err, "failed to build region node"),
                },
            }
        }
        report
    }

    /// Reshape a region's fill, outline, handles and label in place
    pub fn preview_region(&mut self, scene: &mut Scene, id: &EntityId, vertices: &[FloorPoint]) -> bool {
        if vertices.len() < 3 {
            return false;
        }
        match self.regions.get_mut(id) {
            Some(entry) => apply_region_shape(scene, entry, id, vertices),
            None => false,
        }
    }

    // ---- draft polygon ----

    /// Show the in-progress polygon as a dashed path, closed once it has
    /// three vertices. An empty list removes it.
    pub fn set_draft(&mut self, scene: &mut Scene, points: &[FloorPoint]) {
        if points.is_empty() {
            self.clear_draft(scene);
            return;
        }
        let path = if points.len() >= 3 {
            outline_loop(points)
        } else {
            points.to_vec()
        };
        let data = floor_polyline(&path, DRAFT_HEIGHT);
        match self.draft {
            Some(draft) => {
                if let Err(err) = scene.resources.update_geometry(draft.geometry, data) {
                    warn!(error = %err, "draft rebuild failed");
                }
            }
            None => {
                let root = scene.graph.root();
                match scene.add_drawable(root, "draft", data, Material::dashed(Color::WHITE)) {
                    Ok(draft) => {
                        scene
                            .graph
                            .set_tag(draft.node, NodeTag::new(Layer::Overlay, EntityId::new("draft")));
                        self.draft = Some(draft);
                    }
                    Err(err) => warn!(error = %err, "failed to build draft node"),
                }
            }
        }
    }

    pub fn clear_draft(&mut self, scene: &mut Scene) {
        if let Some(draft) = self.draft.take() {
            scene.remove(draft.node);
        }
    }

    pub fn draft_node(&self) -> Option<NodeId> {
        self.draft.map(|d| d.node)
    }

    // ---- assets ----

    /// Resolve queued mesh loads. Objects waiting on them switch over on the
    /// next `sync_objects`.
    pub fn poll_assets(&mut self, source: &dyn MeshSource, budget: usize) -> Vec<LoadOutcome> {
        self.meshes.poll(source, budget)
    }

    pub fn has_pending_assets(&self) -> bool {
        self.meshes.has_pending()
    }

    /// Drop the mesh cache and every object node built from it. Returns the
    /// number of object nodes torn down; the next sync rebuilds them.
    pub fn invalidate_assets(&mut self, scene: &mut Scene) -> usize {
        self.meshes.invalidate();
        let count = self.objects.len();
        for (id, entry) in self.objects.drain() {
            scene.remove(entry.group);
            debug!(entity = %id, "object node dropped for asset reload");
        }
        count
    }

    /// Release every node this reconciler owns, plus the mesh cache
    pub fn teardown(&mut self, scene: &mut Scene) {
        for (_, entry) in self.objects.drain() {
            scene.remove(entry.group);
        }
        for (_, entry) in self.sensors.drain() {
            scene.remove(entry.group);
        }
        for (_, entry) in self.regions.drain() {
            scene.remove(entry.group);
        }
        self.clear_draft(scene);
        self.meshes.clear();
        debug!("scene reconciler torn down");
    }

    // ---- lookups ----

    pub fn object_node(&self, id: &EntityId) -> Option<NodeId> {
        self.objects.get(id).map(|e| e.group)
    }

    pub fn sensor_node(&self, id: &EntityId) -> Option<NodeId> {
        self.sensors.get(id).map(|e| e.group)
    }

    pub fn region_node(&self, id: &EntityId) -> Option<NodeId> {
        self.regions.get(id).map(|e| e.group)
    }

    pub fn region_handles(&self, id: &EntityId) -> Vec<NodeId> {
        self.regions
            .get(id)
            .map(|e| e.handles.iter().map(|h| h.node).collect())
            .unwrap_or_default()
    }

    pub fn region_label(&self, id: &EntityId) -> Option<NodeId> {
        self.regions.get(id).map(|e| e.label)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Objects still drawn with the fallback box while their asset loads
    pub fn pending_object_count(&self) -> usize {
        self.objects
            .values()
            .filter(|e| e.mesh == BodyMesh::Pending)
            .count()
    }
}

fn resolve_mesh(meshes: &mut MeshCache, registry: &MeshRegistry, key: &str) -> (GeometryData, BodyMesh) {
    let Some(url) = registry.url_for(key) else {
        return (unit_box(), BodyMesh::Fallback);
    };
    match meshes.request(key, url) {
        MeshLookup::Ready(mesh) => (mesh_geometry(&mesh), BodyMesh::Loaded(mesh.original_size)),
        MeshLookup::Pending => (unit_box(), BodyMesh::Pending),
        MeshLookup::Failed => (unit_box(), BodyMesh::Fallback),
    }
}

fn object_transform(object: &PlacedObject) -> Transform {
    Transform::from_position(object.position).with_rotation(object.rotation)
}

/// Stretch the body to the object's full size
fn body_transform(object: &PlacedObject, mesh: BodyMesh) -> Transform {
    let size = object.size();
    let scale = match mesh {
        BodyMesh::Loaded(original) => {
            let fit = |target: f32, source: f32| if source > 1e-6 { target / source } else { 1.0 };
            Vec3::new(
                fit(size.x, original[0]),
                fit(size.y, original[1]),
                fit(size.z, original[2]),
            )
        }
        BodyMesh::Fallback | BodyMesh::Pending => size,
    };
    Transform::IDENTITY.with_scale(scale)
}

fn create_object(
    scene: &mut Scene,
    object: &PlacedObject,
    material: Material,
    meshes: &mut MeshCache,
    registry: &MeshRegistry,
) -> Result<ObjectEntry> {
    let root = scene.graph.root();
    let group = scene.graph.add_group(
        root,
        format!("object:{}", object.id),
        Some(NodeTag::new(Layer::Object, object.id.clone())),
    )?;
    scene.graph.set_transform(group, object_transform(object));

    let mesh_key = object.mesh_key().to_string();
    let (geometry, mesh) = resolve_mesh(meshes, registry, &mesh_key);
    let body = match scene.add_drawable(group, "body", geometry, material) {
        Ok(body) => body,
        Err(err) => {
            scene.remove(group);
            return Err(err);
        }
    };
    scene.graph.set_transform(body.node, body_transform(object, mesh));

    Ok(ObjectEntry {
        group,
        body,
        mesh_key,
        mesh,
    })
}

/// Returns `(rebuilt, updated)`
fn update_object(
    scene: &mut Scene,
    entry: &mut ObjectEntry,
    object: &PlacedObject,
    material: Material,
    meshes: &mut MeshCache,
    registry: &MeshRegistry,
) -> (bool, bool) {
    let mut rebuilt = false;
    let key_changed = entry.mesh_key != object.mesh_key();
    if key_changed || entry.mesh == BodyMesh::Pending {
        let (geometry, mesh) = resolve_mesh(meshes, registry, object.mesh_key());
        // A pending load that resolves to a failure keeps the box already shown
        let swap = key_changed || matches!(mesh, BodyMesh::Loaded(_));
        if swap {
            match scene.resources.update_geometry(entry.body.geometry, geometry) {
                Ok(()) => rebuilt = true,
                Err(err) => warn!(entity = %object.id, error = %err, "body rebuild failed"),
            }
        }
        if swap || mesh == BodyMesh::Fallback {
            entry.mesh = mesh;
        }
        entry.mesh_key = object.mesh_key().to_string();
    }

    let mut updated = false;
    updated |= scene.graph.set_transform(entry.group, object_transform(object));
    updated |= scene
        .graph
        .set_transform(entry.body.node, body_transform(object, entry.mesh));
    updated |= scene.resources.set_material(entry.body.material, material);
    (rebuilt, updated && !rebuilt)
}

fn sensor_transform(sensor: &SensorPlacement) -> Transform {
    Transform::from_position(Vec3::new(
        sensor.position.x,
        sensor.mount_height,
        sensor.position.z,
    ))
}

/// Body hangs just below the mount point
fn sensor_body_transform(sensor: &SensorPlacement) -> Transform {
    Transform::from_position(Vec3::new(0.0, -SENSOR_BODY_SIZE.y, 0.0))
        .with_rotation(sensor.rotation)
        .with_scale(SENSOR_BODY_SIZE)
}

/// Coverage ring sits on the floor below the sensor
fn coverage_transform(sensor: &SensorPlacement) -> Transform {
    Transform::from_position(Vec3::new(0.0, REGION_OUTLINE_HEIGHT - sensor.mount_height, 0.0))
}

fn sensor_body_material(sensor: &SensorPlacement, emissive: f32) -> Material {
    Material {
        emissive,
        ..Material::solid(sensor.status.color())
    }
}

fn coverage_material(sensor: &SensorPlacement) -> Material {
    Material::translucent(sensor.status.color(), COVERAGE_OPACITY)
}

fn create_sensor(scene: &mut Scene, sensor: &SensorPlacement, emissive: f32) -> Result<SensorEntry> {
    let root = scene.graph.root();
    let group = scene.graph.add_group(
        root,
        format!("sensor:{}", sensor.id),
        Some(NodeTag::new(Layer::Sensor, sensor.id.clone())),
    )?;
    scene.graph.set_transform(group, sensor_transform(sensor));

    let parts = scene
        .add_drawable(group, "body", unit_box(), sensor_body_material(sensor, emissive))
        .and_then(|body| {
            let coverage = scene.add_drawable(
                group,
                "coverage",
                ring(sensor.range, COVERAGE_SEGMENTS),
                coverage_material(sensor),
            )?;
            Ok((body, coverage))
        });
    let (body, coverage) = match parts {
        Ok(parts) => parts,
        Err(err) => {
            scene.remove(group);
            return Err(err);
        }
    };
    scene.graph.set_transform(body.node, sensor_body_transform(sensor));
    scene.graph.set_transform(coverage.node, coverage_transform(sensor));

    Ok(SensorEntry {
        group,
        body,
        coverage,
        range: sensor.range,
    })
}

fn region_fill_material(region: &Region, emissive: f32) -> Material {
    Material {
        emissive,
        ..Material::translucent(region.color, region.opacity)
    }
}

fn handle_transform(at: FloorPoint) -> Transform {
    Transform::from_position(at.at_height(0.0)).with_scale(HANDLE_SIZE)
}

fn label_transform(vertices: &[FloorPoint]) -> Transform {
    let anchor = centroid(vertices).unwrap_or(FloorPoint::ORIGIN);
    Transform::from_position(anchor.at_height(REGION_LABEL_HEIGHT))
}

fn add_handle(scene: &mut Scene, parent: NodeId, region: &EntityId, index: usize, at: FloorPoint) -> Result<Drawable> {
    let handle = scene.add_drawable(parent, &format!("vertex:{}", index), unit_box(), Material::solid(Color::WHITE))?;
    scene.graph.set_tag(handle.node, NodeTag::vertex(region.clone(), index));
    scene.graph.set_transform(handle.node, handle_transform(at));
    Ok(handle)
}

fn create_region(scene: &mut Scene, region: &Region, emissive: f32, selected: bool) -> Result<RegionEntry> {
    let root = scene.graph.root();
    let group = scene.graph.add_group(
        root,
        format!("region:{}", region.id),
        Some(NodeTag::new(Layer::RegionBody, region.id.clone())),
    )?;
    match populate_region(scene, group, region, emissive, selected) {
        Ok(entry) => Ok(entry),
        Err(err) => {
            scene.remove(group);
            Err(err)
        }
    }
}

fn populate_region(
    scene: &mut Scene,
    group: NodeId,
    region: &Region,
    emissive: f32,
    selected: bool,
) -> Result<RegionEntry> {
    let vertices = &region.vertices;
    let triangulation = triangulate(vertices)
        .ok_or_else(|| AisleError::InvalidRegion(format!("{} cannot be triangulated", region.id)))?;

    let fill = scene.add_drawable(
        group,
        "fill",
        polygon_fill(vertices, &triangulation, REGION_FILL_HEIGHT),
        region_fill_material(region, emissive),
    )?;
    let outline = scene.add_drawable(
        group,
        "outline",
        floor_polyline(&outline_loop(vertices), REGION_OUTLINE_HEIGHT),
        Material::solid(region.color),
    )?;

    let handles_group = scene.graph.add_group(group, "handles", None)?;
    scene.graph.set_visible(handles_group, selected);
    let mut handles = Vec::with_capacity(vertices.len());
    for (i, p) in vertices.iter().enumerate() {
        handles.push(add_handle(scene, handles_group, &region.id, i, *p)?);
    }

    let texture = scene.resources.create_texture(TextureData::label(&region.name));
    let label = match scene.graph.add(group, "label", NodeKind::Label { texture }) {
        Ok(label) => label,
        Err(err) => {
            scene.resources.release_texture(texture)?;
            return Err(err);
        }
    };
    scene.graph.set_transform(label, label_transform(vertices));

    Ok(RegionEntry {
        group,
        fill,
        outline,
        handles_group,
        handles,
        label,
        vertices: vertices.clone(),
        name: region.name.clone(),
    })
}

/// Rebuild fill and outline, move handles and label. Returns whether any
/// geometry changed.
fn apply_region_shape(scene: &mut Scene, entry: &mut RegionEntry, id: &EntityId, vertices: &[FloorPoint]) -> bool {
    if entry.vertices == vertices {
        return false;
    }
    let Some(triangulation) = triangulate(vertices) else {
        return false;
    };

    let fill = polygon_fill(vertices, &triangulation, REGION_FILL_HEIGHT);
    let outline = floor_polyline(&outline_loop(vertices), REGION_OUTLINE_HEIGHT);
    let rebuilt = scene
        .resources
        .update_geometry(entry.fill.geometry, fill)
        .and_then(|_| scene.resources.update_geometry(entry.outline.geometry, outline));
    if let Err(err) = rebuilt {
        warn!(entity = %id, error = %err, "region rebuild failed");
        return false;
    }

    while entry.handles.len() > vertices.len() {
        if let Some(handle) = entry.handles.pop() {
            scene.remove(handle.node);
        }
    }
    for (i, p) in vertices.iter().enumerate() {
        match entry.handles.get(i) {
            Some(handle) => {
                scene.graph.set_transform(handle.node, handle_transform(*p));
            }
            None => match add_handle(scene, entry.handles_group, id, i, *p) {
                Ok(handle) => entry.handles.push(handle),
                Err(err) => warn!(entity = %id, vertex = i, error = %err, "failed to add vertex handle"),
            },
        }
    }

    scene.graph.set_transform(entry.label, label_transform(vertices));
    entry.vertices = vertices.to_vec();
    true
}

/// Swap the label texture for a renamed region
fn relabel_region(scene: &mut Scene, entry: &mut RegionEntry, name: &str) -> bool {
    let texture = scene.resources.create_texture(TextureData::label(name));
    match scene.graph.replace_kind(entry.label, NodeKind::Label { texture }) {
        Some(NodeKind::Label { texture: old }) => {
            if let Err(err) = scene.resources.release_texture(old) {
                warn!(error = %err, "stale label texture release failed");
            }
            entry.name = name.to_string();
            true
        }
        _ => {
            if let Err(err) = scene.resources.release_texture(texture) {
                warn!(error = %err, "label texture release failed");
            }
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aisle_asset::{MemoryMeshSource, MeshData};
    use aisle_core::{ObjectKind, SensorStatus};

    fn shelf(id: &str, x: f32, z: f32) -> PlacedObject {
        PlacedObject {
            id: id.into(),
            kind: ObjectKind::Shelf,
            position: Vec3::new(x, 0.0, z),
            rotation: Vec3::ZERO,
            scale: Vec3::new(1.0, 0.9, 0.25),
            color: None,
            custom_mesh: None,
        }
    }

    fn sensor(id: &str, range: f32) -> SensorPlacement {
        SensorPlacement {
            id: id.into(),
            device_id: format!("dev-{}", id),
            position: Vec3::new(5.0, 0.0, 5.0),
            rotation: Vec3::ZERO,
            mount_height: 3.0,
            range,
            status: SensorStatus::Online,
        }
    }

    fn square_region(id: &str) -> Region {
        Region {
            id: id.into(),
            name: "Produce".into(),
            vertices: vec![
                FloorPoint::new(0.0, 0.0),
                FloorPoint::new(4.0, 0.0),
                FloorPoint::new(4.0, 4.0),
                FloorPoint::new(0.0, 4.0),
            ],
            color: Color::from_hex(0x3b82f6),
            opacity: 0.35,
        }
    }

    #[test]
    fn test_second_pass_is_noop() {
        let mut scene = Scene::new();
        let mut reconciler = SceneReconciler::default();
        let objects = vec![shelf("a", 2.0, 2.0), shelf("b", 6.0, 2.0)];
        let sensors = vec![sensor("s1", 4.0)];
        let regions = vec![square_region("r1")];

        let first = reconciler.sync_objects(&mut scene, &objects, None);
        assert_eq!(first.created, 2);
        reconciler.sync_sensors(&mut scene, &sensors, None);
        reconciler.sync_regions(&mut scene, &regions, None);

        assert!(reconciler.sync_objects(&mut scene, &objects, None).is_noop());
        assert!(reconciler.sync_sensors(&mut scene, &sensors, None).is_noop());
        assert!(reconciler.sync_regions(&mut scene, &regions, None).is_noop());
    }

    #[test]
    fn test_removed_entity_releases_resources_once() {
        let mut scene = Scene::new();
        let mut reconciler = SceneReconciler::default();
        reconciler.sync_objects(&mut scene, &[shelf("a", 2.0, 2.0), shelf("b", 6.0, 2.0)], None);
        let before = scene.resources.stats();

        let report = reconciler.sync_objects(&mut scene, &[shelf("b", 6.0, 2.0)], None);
        assert_eq!(report.removed, 1);
        let after = scene.resources.stats();
        // One geometry and one material per object body
        assert_eq!(after.total_releases - before.total_releases, 2);
        assert_eq!(after.live_total(), before.live_total() - 2);
        assert!(reconciler.object_node(&"a".into()).is_none());

        let again = reconciler.sync_objects(&mut scene, &[shelf("b", 6.0, 2.0)], None);
        assert!(again.is_noop());
        assert_eq!(scene.resources.stats().total_releases, after.total_releases);
    }

    #[test]
    fn test_move_updates_in_place() {
        let mut scene = Scene::new();
        let mut reconciler = SceneReconciler::default();
        reconciler.sync_objects(&mut scene, &[shelf("a", 2.0, 2.0)], None);
        let node = reconciler.object_node(&"a".into()).unwrap();
        let uploads = scene.resources.stats().uploaded_bytes;

        let report = reconciler.sync_objects(&mut scene, &[shelf("a", 3.0, 2.0)], None);
        assert_eq!(report, SyncReport { updated: 1, ..Default::default() });
        assert_eq!(reconciler.object_node(&"a".into()), Some(node));
        assert_eq!(scene.graph.get(node).unwrap().transform.position.x, 3.0);
        assert_eq!(scene.resources.stats().uploaded_bytes, uploads);
    }

    #[test]
    fn test_selection_sets_emissive() {
        let mut scene = Scene::new();
        let mut reconciler = SceneReconciler::default();
        let objects = [shelf("a", 2.0, 2.0)];
        reconciler.sync_objects(&mut scene, &objects, None);
        let id: EntityId = "a".into();

        let report = reconciler.sync_objects(&mut scene, &objects, Some(&id));
        assert_eq!(report.updated, 1);
        assert_eq!(report.created + report.removed + report.rebuilt, 0);

        let body = scene.graph.get(reconciler.object_node(&id).unwrap()).unwrap().children[0];
        let NodeKind::Mesh { material, .. } = scene.graph.get(body).unwrap().kind else {
            panic!("object body should be a mesh");
        };
        assert_eq!(scene.resources.material(material).unwrap().emissive, DEFAULT_SELECTION_EMISSIVE);
    }

    #[test]
    fn test_coverage_rebuilds_on_range_change() {
        let mut scene = Scene::new();
        let mut reconciler = SceneReconciler::default();
        reconciler.sync_sensors(&mut scene, &[sensor("s1", 4.0)], None);
        let report = reconciler.sync_sensors(&mut scene, &[sensor("s1", 6.0)], None);
        assert_eq!(report.rebuilt, 1);
        assert_eq!(report.created, 0);
    }

    #[test]
    fn test_degenerate_region_skipped_and_removed() {
        let mut scene = Scene::new();
        let mut reconciler = SceneReconciler::default();
        let mut region = square_region("r1");
        reconciler.sync_regions(&mut scene, &[region.clone()], None);
        assert_eq!(reconciler.region_count(), 1);

        region.vertices.truncate(2);
        let report = reconciler.sync_regions(&mut scene, &[region], None);
        assert_eq!(report.removed, 1);
        assert_eq!(reconciler.region_count(), 0);
        assert_eq!(scene.resources.stats().live_total(), 0);
    }

    #[test]
    fn test_region_handles_follow_selection_and_shape() {
        let mut scene = Scene::new();
        let mut reconciler = SceneReconciler::default();
        let mut region = square_region("r1");
        let id = region.id.clone();
        reconciler.sync_regions(&mut scene, &[region.clone()], None);
        let handles = reconciler.region_handles(&id);
        assert_eq!(handles.len(), 4);
        assert!(!scene.graph.is_visible(handles[0]));

        reconciler.sync_regions(&mut scene, &[region.clone()], Some(&id));
        assert!(scene.graph.is_visible(handles[0]));

        region.vertices.push(FloorPoint::new(-1.0, 2.0));
        let report = reconciler.sync_regions(&mut scene, &[region.clone()], Some(&id));
        assert_eq!(report.rebuilt, 1);
        let handles = reconciler.region_handles(&id);
        assert_eq!(handles.len(), 5);
        let owner = scene.graph.owner_of(handles[4]).unwrap();
        assert_eq!(owner.vertex, Some(4));

        let label = reconciler.region_label(&id).unwrap();
        let anchor = scene.graph.get(label).unwrap().transform.position;
        assert!((anchor.x - 1.4).abs() < 1e-5);
    }

    #[test]
    fn test_rename_swaps_label_texture() {
        let mut scene = Scene::new();
        let mut reconciler = SceneReconciler::default();
        let mut region = square_region("r1");
        reconciler.sync_regions(&mut scene, &[region.clone()], None);
        let textures = scene.resources.stats().live_textures;

        region.name = "Bakery corner".into();
        let report = reconciler.sync_regions(&mut scene, &[region], None);
        assert_eq!(report.rebuilt, 1);
        assert_eq!(scene.resources.stats().live_textures, textures);
        let label = reconciler.region_label(&"r1".into()).unwrap();
        let NodeKind::Label { texture } = scene.graph.get(label).unwrap().kind else {
            panic!("label node should carry a texture");
        };
        assert_eq!(scene.resources.texture(texture).unwrap().text, "Bakery corner");
    }

    #[test]
    fn test_pending_asset_upgrades_once() {
        let mut scene = Scene::new();
        let mut registry = MeshRegistry::new();
        registry.register("shelf", "mem://gondola");
        let mut reconciler = SceneReconciler::new(registry);
        let objects = [shelf("a", 2.0, 2.0)];

        reconciler.sync_objects(&mut scene, &objects, None);
        assert_eq!(reconciler.pending_object_count(), 1);
        assert!(reconciler.sync_objects(&mut scene, &objects, None).is_noop());

        let mut source = MemoryMeshSource::new();
        source.insert(
            "mem://gondola",
            MeshData {
                positions: vec![[0.0, 0.0, 0.0], [4.0, 0.0, 0.0], [4.0, 2.0, 1.0]],
                normals: vec![[0.0, 1.0, 0.0]; 3],
                indices: vec![0, 1, 2],
            },
        );
        let outcomes = reconciler.poll_assets(&source, 4);
        assert_eq!(outcomes.len(), 1);

        let report = reconciler.sync_objects(&mut scene, &objects, None);
        assert_eq!(report.rebuilt, 1);
        assert_eq!(reconciler.pending_object_count(), 0);
        assert!(reconciler.sync_objects(&mut scene, &objects, None).is_noop());

        // Body stretched from the 4 x 2 x 1 source to the 2 x 1.8 x 0.5 shelf
        let body = scene.graph.get(reconciler.object_node(&"a".into()).unwrap()).unwrap().children[0];
        let scale = scene.graph.get(body).unwrap().transform.scale;
        assert!((scale.x - 0.5).abs() < 1e-5);
        assert!((scale.y - 0.9).abs() < 1e-5);
    }

    #[test]
    fn test_invalidate_assets_rebuilds_objects() {
        let mut scene = Scene::new();
        let mut reconciler = SceneReconciler::default();
        let objects = [shelf("a", 2.0, 2.0)];
        reconciler.sync_objects(&mut scene, &objects, None);

        assert_eq!(reconciler.invalidate_assets(&mut scene), 1);
        assert_eq!(scene.resources.stats().live_total(), 0);
        let report = reconciler.sync_objects(&mut scene, &objects, None);
        assert_eq!(report.created, 1);
    }

    #[test]
    fn test_teardown_releases_everything() {
        let mut scene = Scene::new();
        let mut reconciler = SceneReconciler::default();
        reconciler.sync_objects(&mut scene, &[shelf("a", 2.0, 2.0)], None);
        reconciler.sync_sensors(&mut scene, &[sensor("s1", 4.0)], None);
        reconciler.sync_regions(&mut scene, &[square_region("r1")], None);
        reconciler.set_draft(&mut scene, &[FloorPoint::new(1.0, 1.0), FloorPoint::new(2.0, 1.0)]);
        assert!(scene.resources.stats().live_total() > 0);

        reconciler.teardown(&mut scene);
        assert_eq!(scene.resources.stats().live_total(), 0);
        assert_eq!(scene.graph.len(), 1);
    }

    #[test]
    fn test_preview_region_reshapes_without_sync() {
        let mut scene = Scene::new();
        let mut reconciler = SceneReconciler::default();
        let region = square_region("r1");
        reconciler.sync_regions(&mut scene, &[region.clone()], None);

        let mut moved = region.vertices.clone();
        moved[2].x += 1.0;
        assert!(reconciler.preview_region(&mut scene, &region.id, &moved));
        let handle = reconciler.region_handles(&region.id)[2];
        assert_eq!(scene.graph.get(handle).unwrap().transform.position.x, 5.0);

        // Source data unchanged, so the next pass restores the shape
        let report = reconciler.sync_regions(&mut scene, &[region], None);
        assert_eq!(report.rebuilt, 1);
        assert_eq!(scene.graph.get(handle).unwrap().transform.position.x, 4.0);
    }
}
