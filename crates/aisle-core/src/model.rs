//! Venue data model consumed from collaborators
//!
//! None of these types reference scene nodes; the scene side keeps its own
//! id -> node tables.

use crate::geometry;
use crate::id::EntityId;
use crate::types::{Color, FloorPoint, Rect, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Fixture category of a placed object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Shelf,
    Wall,
    Checkout,
    Entrance,
    Pillar,
    Custom,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Shelf => "shelf",
            ObjectKind::Wall => "wall",
            ObjectKind::Checkout => "checkout",
            ObjectKind::Entrance => "entrance",
            ObjectKind::Pillar => "pillar",
            ObjectKind::Custom => "custom",
        }
    }

    pub fn default_color(&self) -> Color {
        match self {
            ObjectKind::Shelf => Color::from_hex(0x8b6f47),
            ObjectKind::Wall => Color::from_hex(0x9ca3af),
            ObjectKind::Checkout => Color::from_hex(0x3b82f6),
            ObjectKind::Entrance => Color::from_hex(0x22c55e),
            ObjectKind::Pillar => Color::from_hex(0x6b7280),
            ObjectKind::Custom => Color::from_hex(0xa855f7),
        }
    }
}

/// A fixture placed in the venue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedObject {
    pub id: EntityId,
    pub kind: ObjectKind,
    pub position: Vec3,
    /// Euler radians
    #[serde(default)]
    pub rotation: Vec3,
    /// Box half extents
    pub scale: Vec3,
    #[serde(default)]
    pub color: Option<Color>,
    /// Key into the custom-mesh registry
    #[serde(default)]
    pub custom_mesh: Option<String>,
}

impl PlacedObject {
    /// Cache key for the mesh used to draw this object
    pub fn mesh_key(&self) -> &str {
        self.custom_mesh.as_deref().unwrap_or(self.kind.as_str())
    }

    pub fn display_color(&self) -> Color {
        self.color.unwrap_or_else(|| self.kind.default_color())
    }

    /// Full box size (twice the half extents)
    pub fn size(&self) -> Vec3 {
        self.scale * 2.0
    }

    /// Floor footprint at the current position
    pub fn footprint(&self) -> Rect {
        self.footprint_at(self.position.floor())
    }

    /// Floor footprint if the object were centered at `center`. Yaw is folded
    /// into an axis-aligned rectangle around the rotated box.
    pub fn footprint_at(&self, center: FloorPoint) -> Rect {
        let (s, c) = self.rotation.y.sin_cos();
        let half_x = c.abs() * self.scale.x + s.abs() * self.scale.z;
        let half_z = s.abs() * self.scale.x + c.abs() * self.scale.z;
        Rect::new(center, half_x, half_z)
    }
}

/// Connection state reported by the device registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorStatus {
    Online,
    Connecting,
    #[default]
    Offline,
}

impl SensorStatus {
    pub fn color(&self) -> Color {
        match self {
            SensorStatus::Online => Color::from_hex(0x22c55e),
            SensorStatus::Connecting => Color::from_hex(0xf59e0b),
            SensorStatus::Offline => Color::from_hex(0xef4444),
        }
    }
}

/// Ceiling-mounted tracking sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorPlacement {
    pub id: EntityId,
    /// Back-reference into the device registry
    pub device_id: String,
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Vec3,
    pub mount_height: f32,
    /// Coverage radius on the floor
    pub range: f32,
    #[serde(default)]
    pub status: SensorStatus,
}

/// User-drawn zone of interest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: EntityId,
    pub name: String,
    pub vertices: Vec<FloorPoint>,
    pub color: Color,
    #[serde(default = "default_region_opacity")]
    pub opacity: f32,
}

fn default_region_opacity() -> f32 {
    0.35
}

impl Region {
    pub fn is_renderable(&self) -> bool {
        self.vertices.len() >= 3
    }

    pub fn centroid(&self) -> Option<FloorPoint> {
        geometry::centroid(&self.vertices)
    }

    pub fn contains(&self, point: &FloorPoint) -> bool {
        geometry::point_in_polygon(point, &self.vertices)
    }
}

/// Detected object class of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackClass {
    Person,
    Cart,
    #[default]
    Unknown,
}

impl TrackClass {
    pub fn default_color(&self) -> Color {
        match self {
            TrackClass::Person => Color::from_hex(0x38bdf8),
            TrackClass::Cart => Color::from_hex(0xfacc15),
            TrackClass::Unknown => Color::from_hex(0x94a3b8),
        }
    }
}

/// Size of a track's body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub width: f32,
    pub height: f32,
    pub depth: f32,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self {
            width: 0.5,
            height: 1.7,
            depth: 0.5,
        }
    }
}

/// A timestamped trail sample (seconds on the feed clock)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailPoint {
    pub position: Vec3,
    pub time: f64,
}

/// Bounded, oldest-first position history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailBuffer {
    points: VecDeque<TrailPoint>,
    #[serde(default = "default_trail_capacity")]
    capacity: usize,
}

fn default_trail_capacity() -> usize {
    300
}

impl Default for TrailBuffer {
    fn default() -> Self {
        Self::with_capacity(default_trail_capacity())
    }
}

impl TrailBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    /// Append a sample, evicting the oldest when full
    pub fn push(&mut self, position: Vec3, time: f64) {
        while self.points.len() >= self.capacity.max(1) {
            self.points.pop_front();
        }
        self.points.push_back(TrailPoint { position, time });
    }

    /// Samples inside `[now - window, now]`, at most `max_points`, oldest first
    pub fn recent(&self, window: f64, now: f64, max_points: usize) -> Vec<Vec3> {
        let cutoff = now - window;
        let in_window: Vec<Vec3> = self
            .points
            .iter()
            .filter(|p| p.time >= cutoff && p.time <= now)
            .map(|p| p.position)
            .collect();
        let skip = in_window.len().saturating_sub(max_points);
        in_window[skip..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrailPoint> {
        self.points.iter()
    }
}

/// Live track from the tracking feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub key: EntityId,
    pub position: Vec3,
    #[serde(default)]
    pub bbox: BoundingBox,
    #[serde(default)]
    pub trail: TrailBuffer,
    #[serde(default)]
    pub color: Option<Color>,
    #[serde(default)]
    pub class: TrackClass,
}

impl Track {
    pub fn display_color(&self) -> Color {
        self.color.unwrap_or_else(|| self.class.default_color())
    }

    /// Renderable trail: samples within `window` seconds of `now`, oldest first
    pub fn recent_trail(&self, window: f64, now: f64, max_points: usize) -> Vec<Vec3> {
        self.trail.recent(window, now, max_points)
    }
}

/// Which side of a display an engagement zone covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenSide {
    Front,
    Back,
}

/// A digital display whose viewers are highlighted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayScreen {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    pub position: FloorPoint,
    /// Facing direction in radians around +Y; 0 faces +Z
    #[serde(default)]
    pub yaw: f32,
    pub width: f32,
    pub engagement_depth: f32,
    #[serde(default)]
    pub double_sided: bool,
}

/// Floor polygon in which passers-by count as engaged with a screen
#[derive(Debug, Clone, PartialEq)]
pub struct EngagementZone {
    pub screen_id: EntityId,
    pub side: ScreenSide,
    pub polygon: Vec<FloorPoint>,
}

impl DisplayScreen {
    /// Front zone, plus the mirrored back zone for double-sided screens
    pub fn engagement_zones(&self) -> Vec<EngagementZone> {
        let mut zones = vec![EngagementZone {
            screen_id: self.id.clone(),
            side: ScreenSide::Front,
            polygon: self.zone_polygon(1.0),
        }];
        if self.double_sided {
            zones.push(EngagementZone {
                screen_id: self.id.clone(),
                side: ScreenSide::Back,
                polygon: self.zone_polygon(-1.0),
            });
        }
        zones
    }

    fn zone_polygon(&self, facing: f32) -> Vec<FloorPoint> {
        let (s, c) = self.yaw.sin_cos();
        let forward = FloorPoint::new(s, c) * (facing * self.engagement_depth);
        let half = FloorPoint::new(c, -s) * (self.width * 0.5);
        let p = self.position;
        vec![p - half, p + half, p + half + forward, p - half + forward]
    }
}

/// Venue extents and grid, owned by the venue collaborator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VenueBounds {
    pub width: f32,
    pub depth: f32,
    #[serde(default = "default_grid_size")]
    pub grid_size: f32,
}

fn default_grid_size() -> f32 {
    0.5
}

impl Default for VenueBounds {
    fn default() -> Self {
        Self {
            width: 20.0,
            depth: 15.0,
            grid_size: default_grid_size(),
        }
    }
}

impl VenueBounds {
    /// Bounds with negative or non-finite extents collapsed to zero. A grid
    /// size that is not a positive finite number disables grid snapping.
    pub fn sanitized(self) -> Self {
        let extent = |v: f32| if v.is_finite() { v.max(0.0) } else { 0.0 };
        Self {
            width: extent(self.width),
            depth: extent(self.depth),
            grid_size: if self.grid_size.is_finite() && self.grid_size > 0.0 {
                self.grid_size
            } else {
                0.0
            },
        }
    }

    /// Clamp a floor point into `[0, width] x [0, depth]`. Never panics, even
    /// on degenerate bounds.
    pub fn clamp(&self, p: FloorPoint) -> FloorPoint {
        let Self { width, depth, .. } = self.sanitized();
        FloorPoint::new(p.x.max(0.0).min(width), p.z.max(0.0).min(depth))
    }

    pub fn contains(&self, p: &FloorPoint) -> bool {
        (0.0..=self.width).contains(&p.x) && (0.0..=self.depth).contains(&p.z)
    }
}

/// Everything the collaborators hand to one view, e.g. from a TOML fixture
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VenueSnapshot {
    #[serde(default)]
    pub bounds: VenueBounds,
    #[serde(default)]
    pub objects: Vec<PlacedObject>,
    #[serde(default)]
    pub sensors: Vec<SensorPlacement>,
    #[serde(default)]
    pub regions: Vec<Region>,
    #[serde(default)]
    pub screens: Vec<DisplayScreen>,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl VenueSnapshot {
    pub fn from_toml_str(s: &str) -> crate::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_footprint_rotation_swaps_extents() {
        let obj = PlacedObject {
            id: "s1".into(),
            kind: ObjectKind::Shelf,
            position: Vec3::new(5.0, 0.0, 5.0),
            rotation: Vec3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0),
            scale: Vec3::new(2.0, 1.0, 0.5),
            color: None,
            custom_mesh: None,
        };
        let rect = obj.footprint();
        assert!((rect.half_x - 0.5).abs() < 1e-5);
        assert!((rect.half_z - 2.0).abs() < 1e-5);
        assert_eq!(obj.mesh_key(), "shelf");
    }

    #[test]
    fn test_trail_buffer_capacity_and_window() {
        let mut trail = TrailBuffer::with_capacity(4);
        for i in 0..6 {
            trail.push(Vec3::new(i as f32, 0.0, 0.0), i as f64);
        }
        assert_eq!(trail.len(), 4);
        assert_eq!(trail.iter().next().unwrap().time, 2.0);

        let recent = trail.recent(1.0, 5.0, 10);
        assert_eq!(recent, vec![Vec3::new(4.0, 0.0, 0.0), Vec3::new(5.0, 0.0, 0.0)]);

        let capped = trail.recent(10.0, 5.0, 3);
        assert_eq!(capped.first(), Some(&Vec3::new(3.0, 0.0, 0.0)));
    }

    #[test]
    fn test_trail_buffer_zero_capacity_from_toml_stays_bounded() {
        #[derive(Deserialize)]
        struct Wrapper {
            trail: TrailBuffer,
        }
        let wrapper: Wrapper = toml::from_str("[trail]\npoints = []\ncapacity = 0\n").unwrap();
        let mut trail = wrapper.trail;
        for i in 0..10 {
            trail.push(Vec3::new(i as f32, 0.0, 0.0), i as f64);
        }
        assert_eq!(trail.len(), 1);
        assert_eq!(trail.iter().next().unwrap().time, 9.0);
    }

    #[test]
    fn test_degenerate_bounds_clamp_without_panic() {
        let negative = VenueBounds {
            width: -1.0,
            depth: 4.0,
            grid_size: 0.5,
        };
        assert_eq!(negative.clamp(FloorPoint::new(3.0, 9.0)), FloorPoint::new(0.0, 4.0));

        let nan = VenueBounds {
            width: f32::NAN,
            depth: f32::INFINITY,
            grid_size: f32::NAN,
        };
        assert_eq!(nan.clamp(FloorPoint::new(2.0, 2.0)), FloorPoint::new(0.0, 0.0));
        let clean = nan.sanitized();
        assert_eq!((clean.width, clean.depth, clean.grid_size), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_double_sided_screen_zones() {
        let screen = DisplayScreen {
            id: "tv".into(),
            name: "Promo".into(),
            position: FloorPoint::new(5.0, 5.0),
            yaw: 0.0,
            width: 2.0,
            engagement_depth: 3.0,
            double_sided: true,
        };
        let zones = screen.engagement_zones();
        assert_eq!(zones.len(), 2);
        let front = &zones[0].polygon;
        let back = &zones[1].polygon;
        assert!(geometry::point_in_polygon(&FloorPoint::new(5.0, 7.0), front));
        assert!(!geometry::point_in_polygon(&FloorPoint::new(5.0, 3.0), front));
        assert!(geometry::point_in_polygon(&FloorPoint::new(5.0, 3.0), back));
    }

    #[test]
    fn test_bounds_clamp() {
        let bounds = VenueBounds {
            width: 10.0,
            depth: 8.0,
            grid_size: 0.5,
        };
        assert_eq!(bounds.clamp(FloorPoint::new(-1.0, 9.0)), FloorPoint::new(0.0, 8.0));
        assert!(bounds.contains(&FloorPoint::new(10.0, 0.0)));
    }

    #[test]
    fn test_snapshot_from_toml() {
        let snapshot = VenueSnapshot::from_toml_str(
            r##"
[bounds]
width = 30.0
depth = 20.0

[[objects]]
id = "shelf-1"
kind = "shelf"
position = { x = 4.0, y = 0.0, z = 3.0 }
scale = { x = 1.0, y = 1.0, z = 0.4 }

[[regions]]
id = "entry"
name = "Entry"
color = "#22c55e"
vertices = [{ x = 0.0, z = 0.0 }, { x = 3.0, z = 0.0 }, { x = 3.0, z = 2.0 }]
"##,
        )
        .unwrap();
        assert_eq!(snapshot.bounds.grid_size, 0.5);
        assert_eq!(snapshot.objects[0].kind, ObjectKind::Shelf);
        assert!(snapshot.regions[0].is_renderable());
        assert!((snapshot.regions[0].opacity - 0.35).abs() < 1e-6);
    }
}
