//! The venue view: one scene, its camera and every interaction on it
//!
//! Collaborators push their collections in with the `set_*` methods and
//! read mutation intents back out with `drain_intents`. All work happens on
//! the caller's thread: each event is handled to completion, and the host
//! calls `tick` once per frame.

use crate::camera::{ndc_to_pixel, pixel_to_ndc, Camera};
use crate::clock::FrameClock;
use crate::config::ViewSettings;
use crate::hit_test::{hit_test_detailed, Hit, RayHit};
use crate::input::{InputEvent, Key, Modifiers, PointerButton};
use crate::intents::{Intent, IntentBus};
use crate::manipulation::{ActiveDrag, ManipulationState, Manipulator, Motion, Release};
use crate::picking::Ray;
use crate::snapping::{settle_object, settle_point, settle_translation, SnapOptions};
use crate::zone_editor::{
    insert_vertex_at_edge, move_vertex, next_zone_name, remove_vertex, translate, ZoneEditor,
};
use aisle_asset::{MeshRegistry, MeshSource, UrlMeshSource};
use aisle_core::geometry::validate_region;
use aisle_core::{
    AisleError, DisplayScreen, EngagementZone, EntityId, FloorPoint, ObjectKind, PlacedObject, Rect, Region,
    Result, SensorPlacement, Track, VenueBounds, Vec3,
};
use aisle_scene::{Scene, SceneReconciler, Selection, SyncReport, TrackRenderer};
use std::f32::consts::TAU;
use tracing::{debug, info, warn};

const DEFAULT_VIEWPORT: [f32; 2] = [1280.0, 720.0];
/// Radians of orbit per pixel of pointer travel
const ORBIT_SPEED: f32 = 0.005;
/// Pan distance per pixel, as a fraction of camera distance
const PAN_SPEED: f32 = 0.0015;

/// Half extents for freshly placed fixtures
pub fn default_half_extents(kind: ObjectKind) -> Vec3 {
    match kind {
        ObjectKind::Shelf => Vec3::new(1.0, 0.9, 0.3),
        ObjectKind::Wall => Vec3::new(2.0, 1.25, 0.1),
        ObjectKind::Checkout => Vec3::new(0.8, 0.5, 0.4),
        ObjectKind::Entrance => Vec3::new(1.0, 1.1, 0.1),
        ObjectKind::Pillar => Vec3::new(0.25, 1.5, 0.25),
        ObjectKind::Custom => Vec3::new(0.5, 0.5, 0.5),
    }
}

pub struct VenueView {
    scene: Scene,
    reconciler: SceneReconciler,
    tracks: TrackRenderer,
    camera: Camera,
    viewport: [f32; 2],
    manipulator: Manipulator,
    zones: ZoneEditor,
    bus: IntentBus,
    clock: FrameClock,
    settings: ViewSettings,
    source: Box<dyn MeshSource>,

    bounds: VenueBounds,
    objects: Vec<PlacedObject>,
    sensors: Vec<SensorPlacement>,
    regions: Vec<Region>,
    screens: Vec<DisplayScreen>,
    engagement_zones: Vec<EngagementZone>,
    live_tracks: Vec<Track>,
    now: f64,

    selection: Selection,
    hovered_region: Option<EntityId>,
    torn_down: bool,
}

impl VenueView {
    /// View with an empty mesh registry that fetches assets by URL
    pub fn new(settings: ViewSettings) -> Self {
        Self::with_assets(settings, MeshRegistry::new(), Box::new(UrlMeshSource))
    }

    pub fn with_assets(settings: ViewSettings, registry: MeshRegistry, source: Box<dyn MeshSource>) -> Self {
        let mut reconciler = SceneReconciler::new(registry);
        reconciler.set_selection_emissive(settings.render.selection_emissive);
        let bounds = VenueBounds::default();
        let mut camera = Camera::new();
        camera.aspect = DEFAULT_VIEWPORT[0] / DEFAULT_VIEWPORT[1];
        camera.frame_venue(&bounds);

        Self {
            scene: Scene::new(),
            reconciler,
            tracks: TrackRenderer::new(settings.tracks.clone()),
            camera,
            viewport: DEFAULT_VIEWPORT,
            manipulator: Manipulator::new(settings.interaction.drag_threshold_px),
            zones: ZoneEditor::new(),
            bus: IntentBus::new(),
            clock: FrameClock::new(settings.render.hidden_tick_interval_secs),
            settings,
            source,
            bounds,
            objects: Vec::new(),
            sensors: Vec::new(),
            regions: Vec::new(),
            screens: Vec::new(),
            engagement_zones: Vec::new(),
            live_tracks: Vec::new(),
            now: 0.0,
            selection: Selection::default(),
            hovered_region: None,
            torn_down: false,
        }
    }

    // ---- collaborator input ----

    pub fn set_bounds(&mut self, bounds: VenueBounds) {
        let bounds = bounds.sanitized();
        if bounds != self.bounds {
            debug!(width = bounds.width, depth = bounds.depth, "venue bounds set");
        }
        self.bounds = bounds;
        self.camera.frame_venue(&bounds);
    }

    pub fn set_objects(&mut self, objects: Vec<PlacedObject>) -> SyncReport {
        if self.torn_down {
            return SyncReport::default();
        }
        self.objects = objects;
        self.prune_selection();
        self.sync_objects()
    }

    pub fn set_sensors(&mut self, sensors: Vec<SensorPlacement>) -> SyncReport {
        if self.torn_down {
            return SyncReport::default();
        }
        self.sensors = sensors;
        self.prune_selection();
        self.sync_sensors()
    }

    pub fn set_regions(&mut self, regions: Vec<Region>) -> SyncReport {
        if self.torn_down {
            return SyncReport::default();
        }
        self.regions = regions;
        self.prune_selection();
        if let Some(hovered) = &self.hovered_region {
            if !self.regions.iter().any(|r| &r.id == hovered) {
                self.set_hovered(None);
            }
        }
        self.sync_regions()
    }

    /// Screens define the engagement zones tracks are tested against
    pub fn set_screens(&mut self, screens: Vec<DisplayScreen>) -> SyncReport {
        if self.torn_down {
            return SyncReport::default();
        }
        self.engagement_zones = screens.iter().flat_map(|s| s.engagement_zones()).collect();
        self.screens = screens;
        self.sync_tracks()
    }

    /// Replace the live track map as of feed time `now` (seconds)
    pub fn update_tracks(&mut self, tracks: Vec<Track>, now: f64) -> SyncReport {
        if self.torn_down {
            return SyncReport::default();
        }
        self.live_tracks = tracks;
        self.now = now;
        self.sync_tracks()
    }

    /// Swap settings and re-apply everything they drive
    pub fn apply_settings(&mut self, settings: ViewSettings) -> SyncReport {
        self.manipulator.threshold_px = settings.interaction.drag_threshold_px;
        self.clock.hidden_interval = settings.render.hidden_tick_interval_secs;
        self.reconciler.set_selection_emissive(settings.render.selection_emissive);
        self.tracks.set_settings(settings.tracks.clone());
        self.settings = settings;
        if self.torn_down {
            return SyncReport::default();
        }
        let mut report = self.sync_all();
        report += self.sync_tracks();
        report
    }

    /// The custom-mesh assets changed: drop the cache and rebuild object nodes
    pub fn assets_changed(&mut self) -> SyncReport {
        if self.torn_down {
            return SyncReport::default();
        }
        let dropped = self.reconciler.invalidate_assets(&mut self.scene);
        info!(objects = dropped, "mesh assets changed, rebuilding object nodes");
        self.sync_objects()
    }

    pub fn registry_mut(&mut self) -> &mut MeshRegistry {
        self.reconciler.registry_mut()
    }

    // ---- frame loop ----

    /// Advance the frame clock. Returns whether the host should render.
    pub fn tick(&mut self, dt: f64, visible: bool) -> bool {
        if !self.clock.tick(dt, visible) {
            return false;
        }
        if self.reconciler.has_pending_assets() {
            let budget = self.settings.render.asset_loads_per_tick;
            let outcomes = self.reconciler.poll_assets(self.source.as_ref(), budget);
            if !outcomes.is_empty() {
                debug!(resolved = outcomes.len(), "mesh loads resolved");
                self.sync_objects();
            }
        }
        true
    }

    /// Stop the frame loop and release every scene resource
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.clock.stop();
        self.manipulator.cancel();
        self.zones.cancel();
        self.reconciler.teardown(&mut self.scene);
        self.tracks.teardown(&mut self.scene);
        self.torn_down = true;
        info!(live = self.scene.resources.stats().live_total(), "venue view torn down");
    }

    // ---- viewport and camera ----

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.viewport = [width, height];
            self.camera.aspect = width / height;
        }
    }

    pub fn viewport(&self) -> [f32; 2] {
        self.viewport
    }

    /// Pixel position of a world point, None when behind the camera
    pub fn world_to_pixel(&self, point: Vec3) -> Option<[f32; 2]> {
        self.camera
            .world_to_ndc(point)
            .map(|ndc| ndc_to_pixel(ndc, self.viewport))
    }

    /// Floor point under a pixel
    pub fn pixel_to_floor(&self, pixel: [f32; 2]) -> Option<FloorPoint> {
        self.pointer_ray(pixel)?.floor_point()
    }

    /// What the pointer at `pixel` is over
    pub fn pick(&self, pixel: [f32; 2]) -> Option<Hit> {
        let ray = self.pointer_ray(pixel)?;
        hit_test_detailed(&self.scene, &ray).map(|h| h.hit)
    }

    fn pointer_ray(&self, pixel: [f32; 2]) -> Option<Ray> {
        self.camera.ray_from_ndc(pixel_to_ndc(pixel, self.viewport))
    }

    // ---- pointer input ----

    pub fn handle(&mut self, event: &InputEvent) {
        match *event {
            InputEvent::PointerDown {
                x,
                y,
                button,
                modifiers,
            } => self.pointer_down(x, y, button, modifiers),
            InputEvent::PointerMove { x, y } => self.pointer_move(x, y),
            InputEvent::PointerUp { x, y, .. } => self.pointer_up(x, y),
            InputEvent::DoubleClick { x, y } => self.double_click(x, y),
            InputEvent::Key { key } => self.key_down(key),
            InputEvent::BeginDrawing => self.begin_drawing(),
            InputEvent::Place { kind, x, y } => self.place_object(kind, x, y),
            InputEvent::Tick { dt, visible } => {
                self.tick(dt, visible);
            }
        }
    }

    pub fn pointer_down(&mut self, x: f32, y: f32, button: PointerButton, modifiers: Modifiers) {
        if self.torn_down {
            return;
        }
        let pixel = [x, y];
        if self.zones.is_drawing() {
            // Clicks add vertices on release; drags still move the camera
            self.manipulator.press(pixel, button, None, None);
            return;
        }
        let Some(ray) = self.pointer_ray(pixel) else {
            self.manipulator.press(pixel, button, None, None);
            return;
        };
        let hit = hit_test_detailed(&self.scene, &ray);
        let armed = match &hit {
            Some(hit)
                if button == PointerButton::Primary
                    && self.settings.interaction.drag_modifier.is_held(&modifiers) =>
            {
                self.arm_drag(hit, &ray)
            }
            _ => None,
        };
        // Right-click rotates only without modifiers; otherwise it just navigates
        let target = match hit {
            Some(_) if button == PointerButton::Secondary && modifiers.any() => None,
            hit => hit.map(|h| h.hit),
        };
        self.manipulator.press(pixel, button, target, armed);
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        if self.torn_down {
            return;
        }
        let pixel = [x, y];
        match self.manipulator.motion(pixel) {
            Motion::Hover => self.update_hover(pixel),
            Motion::Pending => {}
            Motion::Drag => self.drag_to(pixel),
            Motion::Navigate { delta, button } => self.navigate(delta, button),
        }
    }

    pub fn pointer_up(&mut self, x: f32, y: f32) {
        if self.torn_down {
            return;
        }
        if self.manipulator.is_dragging() {
            self.drag_to([x, y]);
        }
        match self.manipulator.release() {
            Release::None => {}
            Release::Click {
                button: PointerButton::Primary,
                hit,
            } => {
                if self.zones.is_drawing() {
                    self.add_draft_point([x, y]);
                } else {
                    self.click_select(hit);
                }
            }
            Release::Click {
                button: PointerButton::Secondary,
                hit: Some(hit),
            } if !self.zones.is_drawing() => self.rotate(&hit),
            Release::Click { .. } => {}
            Release::Commit(drag) => self.commit_drag(drag),
        }
    }

    pub fn double_click(&mut self, x: f32, y: f32) {
        if self.torn_down || self.zones.is_drawing() {
            return;
        }
        if let Some(Hit::RegionBody(id)) = self.pick([x, y]) {
            self.emit(Intent::OpenRegionDetail { id });
        }
    }

    pub fn key_down(&mut self, key: Key) {
        if self.torn_down {
            return;
        }
        match key {
            Key::Escape => {
                if self.zones.is_drawing() {
                    self.cancel_drawing();
                } else if self.manipulator.cancel().is_some() {
                    // Drop the preview and show the stored state again
                    self.sync_all();
                } else {
                    self.set_selection(Selection::default());
                }
            }
            Key::Enter => {
                if self.zones.is_drawing() {
                    self.finish_drawing(None);
                }
            }
            Key::Backspace if self.zones.is_drawing() => {
                self.zones.undo();
                self.refresh_draft();
            }
            Key::Delete | Key::Backspace => {
                if !self.zones.is_drawing() {
                    self.delete_selection();
                }
            }
        }
    }

    // ---- zone drawing ----

    pub fn begin_drawing(&mut self) {
        if self.torn_down {
            return;
        }
        self.manipulator.cancel();
        self.zones.begin();
        self.refresh_draft();
        debug!("zone drawing started");
    }

    pub fn is_drawing(&self) -> bool {
        self.zones.is_drawing()
    }

    pub fn draft_points(&self) -> &[FloorPoint] {
        self.zones.points()
    }

    pub fn cancel_drawing(&mut self) {
        self.zones.cancel();
        self.reconciler.clear_draft(&mut self.scene);
    }

    /// Commit the draft as a new region named `name` (or the next free
    /// "Zone N"). Returns false and keeps drawing if the draft is rejected.
    pub fn finish_drawing(&mut self, name: Option<String>) -> bool {
        match self.zones.finish() {
            Ok(vertices) => {
                let name = name.unwrap_or_else(|| next_zone_name(&self.regions));
                self.reconciler.clear_draft(&mut self.scene);
                self.emit(Intent::RegionCreate { name, vertices });
                true
            }
            Err(err) => {
                warn!(error = %err, vertices = self.zones.points().len(), "zone draft rejected");
                false
            }
        }
    }

    fn add_draft_point(&mut self, pixel: [f32; 2]) {
        let Some(floor) = self.pixel_to_floor(pixel) else {
            return;
        };
        let point = settle_point(floor, &self.bounds, self.grid());
        if self.zones.add_point(point) {
            self.refresh_draft();
        }
    }

    fn refresh_draft(&mut self) {
        let points = self.zones.points().to_vec();
        self.reconciler.set_draft(&mut self.scene, &points);
    }

    // ---- region vertex editing ----

    /// Split edge `edge -> edge + 1` of a region at its midpoint
    pub fn insert_region_vertex(&mut self, region: &EntityId, edge: usize) -> Result<()> {
        let current = self.region_vertices(region)?;
        let vertices = insert_vertex_at_edge(&current, edge)?;
        self.commit_region_shape(region, vertices)
    }

    /// Remove vertex `index` of a region; refused below three vertices
    pub fn remove_region_vertex(&mut self, region: &EntityId, index: usize) -> Result<()> {
        let current = self.region_vertices(region)?;
        let vertices = remove_vertex(&current, index)?;
        self.commit_region_shape(region, vertices)
    }

    fn region_vertices(&self, id: &EntityId) -> Result<Vec<FloorPoint>> {
        self.regions
            .iter()
            .find(|r| &r.id == id)
            .map(|r| r.vertices.clone())
            .ok_or_else(|| AisleError::EntityNotFound(id.to_string()))
    }

    /// Emit a region update if the shape is valid, otherwise restore the
    /// stored shape
    fn commit_region_shape(&mut self, id: &EntityId, vertices: Vec<FloorPoint>) -> Result<()> {
        let Some(region) = self.regions.iter().find(|r| &r.id == id) else {
            return Err(AisleError::EntityNotFound(id.to_string()));
        };
        let name = region.name.clone();
        if let Err(err) = validate_region(&vertices) {
            warn!(entity = %id, error = %err, "region edit rejected");
            self.sync_regions();
            return Err(err);
        }
        self.reconciler.preview_region(&mut self.scene, id, &vertices);
        self.emit(Intent::RegionUpdate {
            id: id.clone(),
            vertices,
            name,
        });
        Ok(())
    }

    // ---- placement ----

    /// Ask the object store for a new fixture under the pointer
    pub fn place_object(&mut self, kind: ObjectKind, x: f32, y: f32) {
        if self.torn_down {
            return;
        }
        let Some(floor) = self.pixel_to_floor([x, y]) else {
            return;
        };
        let at = settle_point(floor, &self.bounds, self.grid());
        self.emit(Intent::ObjectCreate {
            kind,
            position: at.at_height(0.0),
            rotation: Vec3::ZERO,
            scale: default_half_extents(kind),
        });
    }

    // ---- output ----

    pub fn drain_intents(&mut self) -> Vec<Intent> {
        self.bus.drain()
    }

    pub fn pending_intents(&self) -> &[Intent] {
        self.bus.pending()
    }

    // ---- accessors ----

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn reconciler(&self) -> &SceneReconciler {
        &self.reconciler
    }

    pub fn track_renderer(&self) -> &TrackRenderer {
        &self.tracks
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn settings(&self) -> &ViewSettings {
        &self.settings
    }

    pub fn bounds(&self) -> &VenueBounds {
        &self.bounds
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn hovered_region(&self) -> Option<&EntityId> {
        self.hovered_region.as_ref()
    }

    pub fn interaction_state(&self) -> &ManipulationState {
        self.manipulator.state()
    }

    pub fn camera_enabled(&self) -> bool {
        self.manipulator.camera_enabled()
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn engagement_zones(&self) -> &[EngagementZone] {
        &self.engagement_zones
    }

    pub fn screens(&self) -> &[DisplayScreen] {
        &self.screens
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    // ---- internals ----

    fn emit(&mut self, intent: Intent) {
        debug!(intent = ?intent, "intent emitted");
        self.bus.push(intent);
    }

    fn grid(&self) -> Option<f32> {
        self.settings
            .interaction
            .grid_snap_enabled
            .then_some(self.bounds.grid_size)
    }

    fn sync_objects(&mut self) -> SyncReport {
        self.reconciler
            .sync_objects(&mut self.scene, &self.objects, self.selection.object.as_ref())
    }

    fn sync_sensors(&mut self) -> SyncReport {
        self.reconciler
            .sync_sensors(&mut self.scene, &self.sensors, self.selection.sensor.as_ref())
    }

    fn sync_regions(&mut self) -> SyncReport {
        self.reconciler
            .sync_regions(&mut self.scene, &self.regions, self.selection.region.as_ref())
    }

    fn sync_tracks(&mut self) -> SyncReport {
        self.tracks
            .sync(&mut self.scene, &self.live_tracks, &self.engagement_zones, self.now)
    }

    fn sync_all(&mut self) -> SyncReport {
        let mut report = self.sync_objects();
        report += self.sync_sensors();
        report += self.sync_regions();
        report
    }

    fn set_selection(&mut self, selection: Selection) {
        if selection == self.selection {
            return;
        }
        self.selection = selection;
        self.emit(Intent::SelectionChanged {
            object: self.selection.object.clone(),
            sensor: self.selection.sensor.clone(),
            region: self.selection.region.clone(),
        });
        self.sync_all();
    }

    /// Drop selected ids whose entity left its collection
    fn prune_selection(&mut self) {
        let mut selection = self.selection.clone();
        if let Some(id) = &selection.object {
            if !self.objects.iter().any(|o| &o.id == id) {
                selection.object = None;
            }
        }
        if let Some(id) = &selection.sensor {
            if !self.sensors.iter().any(|s| &s.id == id) {
                selection.sensor = None;
            }
        }
        if let Some(id) = &selection.region {
            if !self.regions.iter().any(|r| &r.id == id) {
                selection.region = None;
            }
        }
        if selection != self.selection {
            self.selection = selection;
            self.emit(Intent::SelectionChanged {
                object: self.selection.object.clone(),
                sensor: self.selection.sensor.clone(),
                region: self.selection.region.clone(),
            });
        }
    }

    fn set_hovered(&mut self, id: Option<EntityId>) {
        if id != self.hovered_region {
            self.hovered_region = id.clone();
            self.emit(Intent::HoveredRegion { id });
        }
    }

    fn update_hover(&mut self, pixel: [f32; 2]) {
        let hovered = match self.pick(pixel) {
            Some(Hit::RegionBody(id)) => Some(id),
            Some(Hit::RegionVertex { region, .. }) => Some(region),
            _ => None,
        };
        self.set_hovered(hovered);
    }

    /// Exclusive toggle: clicking the selected entity clears the selection
    fn click_select(&mut self, hit: Option<Hit>) {
        let current = &self.selection;
        let next = match hit {
            None => Selection::default(),
            Some(Hit::Object(id)) if current.object.as_ref() == Some(&id) => Selection::default(),
            Some(Hit::Object(id)) => Selection {
                object: Some(id),
                ..Selection::default()
            },
            Some(Hit::Sensor(id)) if current.sensor.as_ref() == Some(&id) => Selection::default(),
            Some(Hit::Sensor(id)) => Selection {
                sensor: Some(id),
                ..Selection::default()
            },
            Some(Hit::RegionBody(id)) if current.region.as_ref() == Some(&id) => Selection::default(),
            Some(Hit::RegionBody(id)) | Some(Hit::RegionVertex { region: id, .. }) => Selection {
                region: Some(id),
                ..Selection::default()
            },
        };
        self.set_selection(next);
    }

    fn rotate(&mut self, hit: &Hit) {
        let step = self.settings.interaction.rotation_step_degrees.to_radians();
        match hit {
            Hit::Object(id) => {
                let Some(object) = self.objects.iter().find(|o| &o.id == id) else {
                    return;
                };
                let mut rotation = object.rotation;
                rotation.y = (rotation.y + step).rem_euclid(TAU);
                let intent = Intent::ObjectUpdate {
                    id: id.clone(),
                    position: object.position,
                    rotation,
                    scale: object.scale,
                };
                self.emit(intent);
            }
            Hit::Sensor(id) => {
                let Some(sensor) = self.sensors.iter().find(|s| &s.id == id) else {
                    return;
                };
                let mut rotation = sensor.rotation;
                rotation.y = (rotation.y + step).rem_euclid(TAU);
                let intent = Intent::SensorUpdate {
                    id: id.clone(),
                    position: sensor.position,
                    rotation,
                };
                self.emit(intent);
            }
            Hit::RegionVertex { .. } | Hit::RegionBody(_) => {}
        }
    }

    /// Remove whichever entity holds selection: object, then sensor, then region
    fn delete_selection(&mut self) {
        let intent = if let Some(id) = self.selection.object.clone() {
            Intent::ObjectRemove { id }
        } else if let Some(id) = self.selection.sensor.clone() {
            Intent::SensorRemove { id }
        } else if let Some(id) = self.selection.region.clone() {
            Intent::RegionRemove { id }
        } else {
            return;
        };
        self.emit(intent);
        self.set_selection(Selection::default());
    }

    fn arm_drag(&self, hit: &RayHit, ray: &Ray) -> Option<ActiveDrag> {
        let point = ray.at(hit.distance);
        let pointer = FloorPoint::new(point[0], point[2]);
        let drag = match &hit.hit {
            Hit::Object(id) => {
                let object = self.objects.iter().find(|o| &o.id == id)?;
                ActiveDrag::new(hit.hit.clone(), object.position.floor(), pointer)
            }
            Hit::Sensor(id) => {
                let sensor = self.sensors.iter().find(|s| &s.id == id)?;
                ActiveDrag::new(hit.hit.clone(), sensor.position.floor(), pointer)
            }
            Hit::RegionVertex { region, index } => {
                let region = self.regions.iter().find(|r| &r.id == region)?;
                let vertex = *region.vertices.get(*index)?;
                ActiveDrag::new(hit.hit.clone(), vertex, pointer).with_vertices(region.vertices.clone())
            }
            Hit::RegionBody(id) => {
                let region = self.regions.iter().find(|r| &r.id == id)?;
                let centroid = region.centroid()?;
                ActiveDrag::new(hit.hit.clone(), centroid, pointer).with_vertices(region.vertices.clone())
            }
        };
        Some(drag.on_plane(point[1]))
    }

    fn drag_to(&mut self, pixel: [f32; 2]) {
        let Some(ray) = self.pointer_ray(pixel) else {
            return;
        };
        let bounds = self.bounds;
        let Some(drag) = self.manipulator.drag_mut() else {
            return;
        };
        let Some(pointer) = ray.plane_point(drag.plane_height) else {
            return;
        };
        let target = drag.target_for(pointer);
        drag.current = match drag.target {
            Hit::RegionBody(_) => target,
            _ => bounds.clamp(target),
        };
        let drag = drag.clone();
        self.preview_drag(&drag);
    }

    /// Move the dragged node without touching stored data
    fn preview_drag(&mut self, drag: &ActiveDrag) {
        match &drag.target {
            Hit::Object(id) => {
                let y = self
                    .objects
                    .iter()
                    .find(|o| &o.id == id)
                    .map_or(0.0, |o| o.position.y);
                self.reconciler
                    .preview_object(&mut self.scene, id, drag.current.at_height(y));
            }
            Hit::Sensor(id) => {
                self.reconciler.preview_sensor(&mut self.scene, id, drag.current);
            }
            Hit::RegionVertex { region, index } => {
                if let Some(vertices) = move_vertex(&drag.origin_vertices, *index, drag.current) {
                    self.reconciler.preview_region(&mut self.scene, region, &vertices);
                }
            }
            Hit::RegionBody(id) => {
                let delta = settle_translation(&drag.origin_vertices, drag.current - drag.origin, &self.bounds, None);
                let vertices = translate(&drag.origin_vertices, delta);
                self.reconciler.preview_region(&mut self.scene, id, &vertices);
            }
        }
    }

    fn commit_drag(&mut self, drag: ActiveDrag) {
        let grid = self.grid();
        match &drag.target {
            Hit::Object(id) => {
                let Some(object) = self.objects.iter().find(|o| &o.id == id) else {
                    warn!(entity = %id, "dragged object vanished before commit");
                    return;
                };
                let neighbors: Vec<Rect> = self
                    .objects
                    .iter()
                    .filter(|o| o.kind == object.kind && o.id != object.id)
                    .map(|o| o.footprint())
                    .collect();
                let options = SnapOptions {
                    grid,
                    align_threshold: self.settings.interaction.snap_threshold,
                    collision: self.settings.interaction.collision_enabled,
                };
                let at = settle_object(object.footprint(), drag.current, &neighbors, &self.bounds, &options);
                let position = at.at_height(object.position.y);
                let intent = Intent::ObjectUpdate {
                    id: id.clone(),
                    position,
                    rotation: object.rotation,
                    scale: object.scale,
                };
                self.reconciler.preview_object(&mut self.scene, id, position);
                self.emit(intent);
            }
            Hit::Sensor(id) => {
                let Some(sensor) = self.sensors.iter().find(|s| &s.id == id) else {
                    warn!(entity = %id, "dragged sensor vanished before commit");
                    return;
                };
                let at = settle_point(drag.current, &self.bounds, grid);
                let intent = Intent::SensorUpdate {
                    id: id.clone(),
                    position: at.at_height(sensor.position.y),
                    rotation: sensor.rotation,
                };
                self.reconciler.preview_sensor(&mut self.scene, id, at);
                self.emit(intent);
            }
            Hit::RegionVertex { region, index } => {
                let at = settle_point(drag.current, &self.bounds, grid);
                match move_vertex(&drag.origin_vertices, *index, at) {
                    Some(vertices) => {
                        if let Err(err) = self.commit_region_shape(region, vertices) {
                            debug!(entity = %region, error = %err, "vertex drag not committed");
                        }
                    }
                    None => {
                        self.sync_regions();
                    }
                }
            }
            Hit::RegionBody(id) => {
                let delta = settle_translation(&drag.origin_vertices, drag.current - drag.origin, &self.bounds, grid);
                let vertices = translate(&drag.origin_vertices, delta);
                if let Err(err) = self.commit_region_shape(id, vertices) {
                    debug!(entity = %id, error = %err, "region drag not committed");
                }
            }
        }
    }

    fn navigate(&mut self, delta: [f32; 2], button: PointerButton) {
        if !self.manipulator.camera_enabled() {
            return;
        }
        match button {
            PointerButton::Primary => {
                self.camera.orbit_horizontal(-delta[0] * ORBIT_SPEED);
                self.camera.orbit_vertical(delta[1] * ORBIT_SPEED);
            }
            PointerButton::Secondary | PointerButton::Middle => {
                let scale = self.camera.distance * PAN_SPEED;
                self.camera.pan(-delta[0] * scale, delta[1] * scale);
            }
        }
    }
}
