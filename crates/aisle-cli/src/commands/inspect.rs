//! Snapshot inspection command

use super::load_view;
use aisle_view::VenueView;
use anyhow::Result;

/// Upper bound on ticks spent resolving custom meshes
const MAX_ASSET_TICKS: usize = 64;

pub struct InspectArgs {
    pub snapshot: String,
    pub meshes: Option<String>,
    pub settings: Option<String>,
    pub format: String,
}

pub fn run(args: InspectArgs) -> Result<()> {
    let mut view = load_view(&args.snapshot, args.settings.as_deref(), args.meshes.as_deref())?;

    let mut ticks = 0;
    while view.reconciler().has_pending_assets() && ticks < MAX_ASSET_TICKS {
        view.tick(1.0 / 60.0, true);
        ticks += 1;
    }

    match args.format.as_str() {
        "json" => print_json(&view)?,
        "text" => print_text(&args.snapshot, &view),
        other => anyhow::bail!("Unknown format '{}'; valid values: text, json", other),
    }
    Ok(())
}

fn print_text(path: &str, view: &VenueView) {
    let reconciler = view.reconciler();
    let stats = view.scene().resources.stats();
    let bounds = view.bounds();

    println!("Venue: {}", path);
    println!("  Bounds:    {} x {} m (grid {} m)", bounds.width, bounds.depth, bounds.grid_size);
    println!("  Objects:   {} ({} awaiting meshes)", reconciler.object_count(), reconciler.pending_object_count());
    println!("  Sensors:   {}", reconciler.sensor_count());
    println!("  Regions:   {}", reconciler.region_count());
    println!("  Screens:   {} ({} engagement zones)", view.screens().len(), view.engagement_zones().len());
    println!("  Tracks:    {}", view.track_renderer().track_count());
    println!("  Nodes:     {}", view.scene().graph.len());
    println!();
    println!("Resources:");
    println!("  Geometries: {}", stats.live_geometries);
    println!("  Materials:  {}", stats.live_materials);
    println!("  Textures:   {}", stats.live_textures);
    println!("  Uploaded:   {} bytes", stats.uploaded_bytes);
}

fn print_json(view: &VenueView) -> Result<()> {
    let reconciler = view.reconciler();
    let stats = view.scene().resources.stats();
    let report = serde_json::json!({
        "bounds": view.bounds(),
        "objects": reconciler.object_count(),
        "pending_objects": reconciler.pending_object_count(),
        "sensors": reconciler.sensor_count(),
        "regions": reconciler.region_count(),
        "screens": view.screens().len(),
        "engagement_zones": view.engagement_zones().len(),
        "tracks": view.track_renderer().track_count(),
        "nodes": view.scene().graph.len(),
        "resources": {
            "geometries": stats.live_geometries,
            "materials": stats.live_materials,
            "textures": stats.live_textures,
            "uploaded_bytes": stats.uploaded_bytes,
        },
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
