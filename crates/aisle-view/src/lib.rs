//! Aisle View - Interaction layer over the venue scene
//!
//! Turns pointer and keyboard input into selection, drags, zone drawing and
//! camera motion. The view never mutates venue data itself: every change is
//! emitted as an [`Intent`] for the owning store to apply, after which the
//! store pushes the new collection back through the `set_*` methods.

pub mod camera;
pub mod clock;
pub mod config;
pub mod input;
pub mod intents;
pub mod manipulation;
pub mod picking;
pub mod snapping;
mod view;
pub mod zone_editor;

pub use camera::{ndc_to_pixel, pixel_to_ndc, Camera};
pub use clock::FrameClock;
pub use config::{InteractionSettings, RenderSettings, ViewSettings};
pub use hit_test::{hit_test, hit_test_detailed, Hit, RayHit};
pub use input::{DragModifier, InputEvent, Key, Modifiers, PointerButton};
pub use intents::{Intent, IntentBus};
pub use manipulation::{ActiveDrag, ManipulationState, Manipulator};
pub use picking::{Aabb, Ray};
pub use snapping::SnapOptions;
pub use view::{default_half_extents, VenueView};
pub use zone_editor::ZoneEditor;
