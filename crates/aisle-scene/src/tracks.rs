//! Live track rendering
//!
//! Tracks come and go with the tracking feed. Each present track gets a body
//! box sized from its bounding box and a trail polyline through its recent
//! positions; a track standing in any screen engagement zone is highlighted
//! and its entry time starts a label timer that outlives the visit.

use crate::graph::{Layer, NodeKind, NodeTag};
use crate::primitives::{polyline, unit_box};
use crate::resources::{Material, TextureData};
use crate::scene::{Drawable, Scene, SyncReport};
use aisle_core::geometry::point_in_polygon;
use aisle_core::{Color, EngagementZone, EntityId, NodeId, Result, Track, Transform, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

const LABEL_CLEARANCE: f32 = 0.3;

/// Trail and engagement presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackSettings {
    /// Seconds of history drawn behind each track
    pub trail_window_secs: f64,
    pub max_trail_points: usize,
    /// How long the engagement label stays up after entry
    pub label_window_secs: f64,
    pub highlight_color: Color,
    pub highlight_opacity: f32,
}

impl Default for TrackSettings {
    fn default() -> Self {
        Self {
            trail_window_secs: 10.0,
            max_trail_points: 300,
            label_window_secs: 60.0,
            highlight_color: Color::from_hex(0xf59e0b),
            highlight_opacity: 0.9,
        }
    }
}

struct TrackEntry {
    group: NodeId,
    body: Drawable,
    label: NodeId,
    trail: Option<Drawable>,
    trail_points: Vec<Vec3>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Dwell {
    inside: bool,
    entered_at: Option<f64>,
}

/// Owner of every track node and of per-track engagement timers
#[derive(Default)]
pub struct TrackRenderer {
    entries: HashMap<EntityId, TrackEntry>,
    dwell: HashMap<EntityId, Dwell>,
    settings: TrackSettings,
}

impl TrackRenderer {
    pub fn new(settings: TrackSettings) -> Self {
        Self {
            entries: HashMap::new(),
            dwell: HashMap::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &TrackSettings {
        &self.settings
    }

    /// Takes effect on the next `sync`
    pub fn set_settings(&mut self, settings: TrackSettings) {
        self.settings = settings;
    }

    /// Bring track nodes in line with the current track map at feed time `now`
    pub fn sync(&mut self, scene: &mut Scene, tracks: &[Track], zones: &[EngagementZone], now: f64) -> SyncReport {
        let mut report = SyncReport::default();

        let current: HashSet<&EntityId> = tracks.iter().map(|t| &t.key).collect();
        let stale: Vec<EntityId> = self
            .entries
            .keys()
            .filter(|key| !current.contains(key))
            .cloned()
            .collect();
        for key in stale {
            if let Some(entry) = self.entries.remove(&key) {
                remove_entry(scene, entry);
                debug!(track = %key, "track retired");
                report.removed += 1;
            }
        }
        self.dwell.retain(|key, _| current.contains(key));

        for track in tracks {
            let floor = track.position.floor();
            let inside = zones.iter().any(|z| point_in_polygon(&floor, &z.polygon));
            let dwell = self.dwell.entry(track.key.clone()).or_default();
            if inside && !dwell.inside {
                dwell.entered_at = Some(now);
                debug!(track = %track.key, at = now, "track entered engagement zone");
            }
            dwell.inside = inside;
            let label_visible = dwell
                .entered_at
                .is_some_and(|t| now - t <= self.settings.label_window_secs);

            let material = if inside {
                Material::translucent(self.settings.highlight_color, self.settings.highlight_opacity)
            } else {
                Material::solid(track.display_color())
            };
            let trail = track.recent_trail(self.settings.trail_window_secs, now, self.settings.max_trail_points);

            if !self.entries.contains_key(&track.key) {
                match create_entry(scene, track, material) {
                    Ok(entry) => {
                        self.entries.insert(track.key.clone(), entry);
                        report.created += 1;
                    }
                    Err(err) => {
                        warn!(track = %track.key, error = %err, "failed to build track node");
                        continue;
                    }
                }
            }
            let Some(entry) = self.entries.get_mut(&track.key) else {
                continue;
            };

            let mut updated = false;
            updated |= scene
                .graph
                .set_transform(entry.group, Transform::from_position(track.position));
            updated |= scene.graph.set_transform(entry.body.node, body_transform(track));
            updated |= scene
                .graph
                .set_transform(entry.label, label_transform(track));
            updated |= scene.resources.set_material(entry.body.material, material);
            updated |= scene.graph.set_visible(entry.label, label_visible);
            let rebuilt = sync_trail(scene, entry, &track.key, trail, track.display_color());

            report.rebuilt += rebuilt as usize;
            report.updated += (updated && !rebuilt) as usize;
        }
        report
    }

    pub fn is_engaged(&self, key: &EntityId) -> bool {
        self.dwell.get(key).is_some_and(|d| d.inside)
    }

    /// Feed time at which the track last entered an engagement zone
    pub fn entered_at(&self, key: &EntityId) -> Option<f64> {
        self.dwell.get(key).and_then(|d| d.entered_at)
    }

    pub fn label_visible(&self, scene: &Scene, key: &EntityId) -> bool {
        self.entries
            .get(key)
            .is_some_and(|e| scene.graph.is_visible(e.label))
    }

    /// Positions currently drawn as the track's trail, oldest first
    pub fn trail_points(&self, key: &EntityId) -> Option<&[Vec3]> {
        self.entries
            .get(key)
            .filter(|e| e.trail.is_some())
            .map(|e| e.trail_points.as_slice())
    }

    pub fn track_node(&self, key: &EntityId) -> Option<NodeId> {
        self.entries.get(key).map(|e| e.group)
    }

    pub fn track_count(&self) -> usize {
        self.entries.len()
    }

    pub fn teardown(&mut self, scene: &mut Scene) {
        for (_, entry) in self.entries.drain() {
            remove_entry(scene, entry);
        }
        self.dwell.clear();
    }
}

fn body_transform(track: &Track) -> Transform {
    Transform::IDENTITY.with_scale(Vec3::new(
        track.bbox.width,
        track.bbox.height,
        track.bbox.depth,
    ))
}

fn label_transform(track: &Track) -> Transform {
    Transform::from_position(Vec3::new(0.0, track.bbox.height + LABEL_CLEARANCE, 0.0))
}

fn create_entry(scene: &mut Scene, track: &Track, material: Material) -> Result<TrackEntry> {
    let root = scene.graph.root();
    let group = scene.graph.add_group(
        root,
        format!("track:{}", track.key),
        Some(NodeTag::new(Layer::Track, track.key.clone())),
    )?;

    let built = scene.add_drawable(group, "body", unit_box(), material).and_then(|body| {
        let texture = scene.resources.create_texture(TextureData::label(track.key.as_str()));
        match scene.graph.add(group, "label", NodeKind::Label { texture }) {
            Ok(label) => Ok((body, label)),
            Err(err) => {
                scene.resources.release_texture(texture)?;
                Err(err)
            }
        }
    });
    let (body, label) = match built {
        Ok(parts) => parts,
        Err(err) => {
            scene.remove(group);
            return Err(err);
        }
    };
    scene.graph.set_visible(label, false);
    debug!(track = %track.key, class = ?track.class, "track node created");

    Ok(TrackEntry {
        group,
        body,
        label,
        trail: None,
        trail_points: Vec::new(),
    })
}

/// Create, rebuild or drop the trail line. Returns whether geometry changed.
fn sync_trail(scene: &mut Scene, entry: &mut TrackEntry, key: &EntityId, points: Vec<Vec3>, color: Color) -> bool {
    if points.len() < 2 {
        entry.trail_points.clear();
        return match entry.trail.take() {
            Some(trail) => {
                scene.remove(trail.node);
                true
            }
            None => false,
        };
    }
    if entry.trail.is_some() && entry.trail_points == points {
        return false;
    }

    let data = polyline(&points);
    match entry.trail {
        Some(trail) => {
            if let Err(err) = scene.resources.update_geometry(trail.geometry, data) {
                warn!(track = %key, error = %err, "trail rebuild failed");
                return false;
            }
        }
        None => {
            // Trails are in world space, so they hang off the root
            let root = scene.graph.root();
            match scene.add_drawable(root, &format!("trail:{}", key), data, Material::translucent(color, 0.6)) {
                Ok(trail) => {
                    scene.graph.set_tag(trail.node, NodeTag::new(Layer::Track, key.clone()));
                    entry.trail = Some(trail);
                }
                Err(err) => {
                    warn!(track = %key, error = %err, "failed to build trail");
                    return false;
                }
            }
        }
    }
    entry.trail_points = points;
    true
}

fn remove_entry(scene: &mut Scene, entry: TrackEntry) {
    if let Some(trail) = entry.trail {
        scene.remove(trail.node);
    }
    scene.remove(entry.group);
}

#[cfg(test)]
mod tests {
    use super::*;
    use aisle_core::{BoundingBox, DisplayScreen, FloorPoint, TrackClass, TrailBuffer};

    fn track_with_trail(key: &str, x: f32, samples: usize) -> Track {
        let mut trail = TrailBuffer::default();
        for i in 0..samples {
            trail.push(Vec3::new(i as f32 * 0.1, 0.0, 1.0), i as f64);
        }
        Track {
            key: key.into(),
            position: Vec3::new(x, 0.0, 1.0),
            bbox: BoundingBox::default(),
            trail,
            color: None,
            class: TrackClass::Person,
        }
    }

    fn screen_zone() -> Vec<EngagementZone> {
        DisplayScreen {
            id: "screen-1".into(),
            name: "Promo".into(),
            position: FloorPoint::new(5.0, 0.0),
            yaw: 0.0,
            width: 2.0,
            engagement_depth: 3.0,
            double_sided: false,
        }
        .engagement_zones()
    }

    #[test]
    fn test_short_trail_renders_body_only() {
        let mut scene = Scene::new();
        let mut renderer = TrackRenderer::default();
        let track = track_with_trail("t1", 1.0, 1);
        let report = renderer.sync(&mut scene, &[track], &[], 0.0);
        assert_eq!(report.created, 1);
        assert!(renderer.trail_points(&"t1".into()).is_none());
        assert!(renderer.track_node(&"t1".into()).is_some());
    }

    #[test]
    fn test_trail_window_keeps_most_recent_points() {
        let mut scene = Scene::new();
        let mut renderer = TrackRenderer::default();
        let track = track_with_trail("t1", 1.0, 20);
        renderer.sync(&mut scene, &[track.clone()], &[], 19.0);
        assert_eq!(renderer.trail_points(&"t1".into()).unwrap().len(), 11);

        renderer.set_settings(TrackSettings {
            trail_window_secs: 4.0,
            ..TrackSettings::default()
        });
        let report = renderer.sync(&mut scene, &[track], &[], 19.0);
        assert_eq!(report.rebuilt, 1);
        let points = renderer.trail_points(&"t1".into()).unwrap();
        assert_eq!(points.len(), 5);
        assert!((points[0].x - 1.5).abs() < 1e-5);
        assert!((points[4].x - 1.9).abs() < 1e-5);
    }

    #[test]
    fn test_unchanged_tracks_are_noop() {
        let mut scene = Scene::new();
        let mut renderer = TrackRenderer::default();
        let tracks = [track_with_trail("t1", 1.0, 5), track_with_trail("t2", 3.0, 5)];
        renderer.sync(&mut scene, &tracks, &[], 5.0);
        assert!(renderer.sync(&mut scene, &tracks, &[], 5.0).is_noop());
    }

    #[test]
    fn test_retired_track_releases_everything() {
        let mut scene = Scene::new();
        let mut renderer = TrackRenderer::default();
        let zones = screen_zone();
        renderer.sync(&mut scene, &[track_with_trail("t1", 5.0, 5)], &zones, 4.0);
        assert!(renderer.entered_at(&"t1".into()).is_some());

        let report = renderer.sync(&mut scene, &[], &zones, 5.0);
        assert_eq!(report.removed, 1);
        assert_eq!(scene.resources.stats().live_total(), 0);
        assert_eq!(scene.graph.len(), 1);
        assert!(renderer.entered_at(&"t1".into()).is_none());
    }

    #[test]
    fn test_engagement_highlights_body() {
        let mut scene = Scene::new();
        let mut renderer = TrackRenderer::default();
        let zones = screen_zone();
        renderer.sync(&mut scene, &[track_with_trail("t1", 5.0, 1)], &zones, 0.0);
        assert!(renderer.is_engaged(&"t1".into()));

        let group = renderer.track_node(&"t1".into()).unwrap();
        let body = scene.graph.get(group).unwrap().children[0];
        let NodeKind::Mesh { material, .. } = scene.graph.get(body).unwrap().kind else {
            panic!("track body should be a mesh");
        };
        let material = scene.resources.material(material).unwrap();
        assert_eq!(material.color, TrackSettings::default().highlight_color);
        assert_eq!(material.opacity, 0.9);
    }

    #[test]
    fn test_label_window_outlives_visit() {
        let mut scene = Scene::new();
        let mut renderer = TrackRenderer::default();
        let zones = screen_zone();
        let key: EntityId = "t1".into();

        renderer.sync(&mut scene, &[track_with_trail("t1", 5.0, 1)], &zones, 0.0);
        assert!(renderer.label_visible(&scene, &key));

        // Walk out of the zone
        renderer.sync(&mut scene, &[track_with_trail("t1", 15.0, 1)], &zones, 30.0);
        assert!(!renderer.is_engaged(&key));
        assert!(renderer.label_visible(&scene, &key));

        renderer.sync(&mut scene, &[track_with_trail("t1", 15.0, 1)], &zones, 59.0);
        assert!(renderer.label_visible(&scene, &key));
        renderer.sync(&mut scene, &[track_with_trail("t1", 15.0, 1)], &zones, 61.0);
        assert!(!renderer.label_visible(&scene, &key));
    }
}
