//! CLI command implementations

pub mod inspect;
pub mod replay;
pub mod triangulate;

use aisle_asset::{MeshRegistry, UrlMeshSource};
use aisle_core::VenueSnapshot;
use aisle_view::{VenueView, ViewSettings};
use anyhow::{Context, Result};

/// Build a view and push every collection of the snapshot through it
pub(crate) fn load_view(snapshot: &str, settings: Option<&str>, meshes: Option<&str>) -> Result<VenueView> {
    let snapshot = VenueSnapshot::load_from_file(snapshot)
        .with_context(|| format!("Failed to load venue snapshot: {}", snapshot))?;
    let settings = match settings {
        Some(path) => ViewSettings::load_from_file(path)
            .with_context(|| format!("Failed to load view settings: {}", path))?,
        None => ViewSettings::default(),
    };
    let registry = match meshes {
        Some(path) => MeshRegistry::load_from_file(path)
            .with_context(|| format!("Failed to load mesh registry: {}", path))?,
        None => MeshRegistry::new(),
    };

    let mut view = VenueView::with_assets(settings, registry, Box::new(UrlMeshSource));
    view.set_bounds(snapshot.bounds);
    view.set_objects(snapshot.objects);
    view.set_sensors(snapshot.sensors);
    view.set_regions(snapshot.regions);
    view.set_screens(snapshot.screens);
    view.update_tracks(snapshot.tracks, 0.0);
    Ok(view)
}
