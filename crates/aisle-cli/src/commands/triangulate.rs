//! Region triangulation command

use aisle_core::geometry::{signed_area, triangulate, validate_region, TriangulationMethod};
use aisle_core::FloorPoint;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

#[derive(Debug, Deserialize)]
struct PolygonFile {
    vertices: Vec<FloorPoint>,
}

pub fn run(path: &str) -> Result<()> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read polygon file: {}", path))?;
    let polygon: PolygonFile =
        toml::from_str(&content).with_context(|| format!("Failed to parse polygon file: {}", path))?;
    let vertices = &polygon.vertices;

    println!("Polygon: {} ({} vertices)", path, vertices.len());
    let area = signed_area(vertices);
    let winding = if area >= 0.0 { "counter-clockwise" } else { "clockwise" };
    println!("  Area:    {:.3} m^2 ({})", area.abs(), winding);

    match validate_region(vertices) {
        Ok(()) => println!("  Valid:   yes"),
        Err(err) => println!("  Valid:   no ({})", err),
    }

    let Some(triangulation) = triangulate(vertices) else {
        println!("  Too few vertices to triangulate.");
        return Ok(());
    };
    let method = match triangulation.method {
        TriangulationMethod::Fan => "fan",
        TriangulationMethod::EarClip => "ear clipping",
    };
    println!("  Method:  {}", method);
    println!("  Triangles: {}", triangulation.triangles.len());
    for [a, b, c] in &triangulation.triangles {
        println!("    [{}, {}, {}]", a, b, c);
    }
    Ok(())
}
