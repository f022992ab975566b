//! Aisle Core - Foundational types for the Aisle venue editor
//!
//! This crate provides the types every other Aisle crate depends on:
//! - `EntityId`, `NodeId` - domain and scene identifiers
//! - `Vec3`, `FloorPoint`, `Transform`, `Color`, `Rect` - spatial types
//! - The venue data model (objects, sensors, regions, tracks, screens)
//! - Polygon helpers for region editing and zone membership
//! - Error types and Result alias

mod error;
pub mod geometry;
mod id;
mod model;
mod types;

pub use error::{AisleError, Result};
pub use id::{EntityId, NodeId};
pub use model::{
    BoundingBox, DisplayScreen, EngagementZone, ObjectKind, PlacedObject, Region, ScreenSide,
    SensorPlacement, SensorStatus, Track, TrackClass, TrailBuffer, TrailPoint, VenueBounds,
    VenueSnapshot,
};
pub use types::{mat4_mul, Color, FloorPoint, Rect, Transform, Vec3};
