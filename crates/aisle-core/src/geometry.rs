//! Polygon helpers for floor-plan regions
//!
//! Polygons are ordered vertex lists on the floor plane. Insertion order
//! defines winding; either winding is accepted.

use crate::error::{AisleError, Result};
use crate::types::FloorPoint;

const EPS: f32 = 1e-6;

/// How a polygon was triangulated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriangulationMethod {
    /// Fan from vertex 0
    Fan,
    /// Ear clipping, used when the fan would fold over itself
    EarClip,
}

/// Triangle indices into the source vertex list
#[derive(Debug, Clone, PartialEq)]
pub struct Triangulation {
    pub triangles: Vec<[u32; 3]>,
    pub method: TriangulationMethod,
}

/// Signed area via the shoelace formula. Positive for counter-clockwise
/// winding when viewed with +x right and +z up.
pub fn signed_area(poly: &[FloorPoint]) -> f32 {
    if poly.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..poly.len() {
        let a = poly[i];
        let b = poly[(i + 1) % poly.len()];
        sum += a.x * b.z - b.x * a.z;
    }
    sum * 0.5
}

/// Average of the vertices (label anchor)
pub fn centroid(poly: &[FloorPoint]) -> Option<FloorPoint> {
    if poly.is_empty() {
        return None;
    }
    let n = poly.len() as f32;
    let (sx, sz) = poly
        .iter()
        .fold((0.0, 0.0), |(sx, sz), p| (sx + p.x, sz + p.z));
    Some(FloorPoint::new(sx / n, sz / n))
}

/// Closed outline: every vertex followed by vertex 0 again (`n + 1` points)
pub fn outline_loop(poly: &[FloorPoint]) -> Vec<FloorPoint> {
    let mut out = Vec::with_capacity(poly.len() + 1);
    out.extend_from_slice(poly);
    if let Some(first) = poly.first() {
        out.push(*first);
    }
    out
}

/// Fan triangulation from vertex 0: `(0, i, i + 1)` for `i in 1..n-1`
pub fn fan_triangles(vertex_count: usize) -> Vec<[u32; 3]> {
    if vertex_count < 3 {
        return Vec::new();
    }
    (1..vertex_count as u32 - 1).map(|i| [0, i, i + 1]).collect()
}

/// True when the fan from vertex 0 covers the polygon without folding:
/// every fan triangle keeps the polygon's winding and contains no other vertex.
pub fn fan_is_valid(poly: &[FloorPoint]) -> bool {
    if poly.len() < 3 {
        return false;
    }
    let winding = signed_area(poly).signum();
    if winding == 0.0 {
        return false;
    }
    for [a, b, c] in fan_triangles(poly.len()) {
        let (pa, pb, pc) = (poly[a as usize], poly[b as usize], poly[c as usize]);
        if pa.cross(&pb, &pc) * winding < -EPS {
            return false;
        }
        for (i, p) in poly.iter().enumerate() {
            if i as u32 == a || i as u32 == b || i as u32 == c {
                continue;
            }
            if point_in_triangle(p, &pa, &pb, &pc) {
                return false;
            }
        }
    }
    true
}

/// Ear-clipping triangulation for simple polygons. Returns None when no ear
/// can be found (degenerate or self-intersecting input).
pub fn ear_clip(poly: &[FloorPoint]) -> Option<Vec<[u32; 3]>> {
    let n = poly.len();
    if n < 3 {
        return None;
    }
    let winding = signed_area(poly).signum();
    if winding == 0.0 {
        return None;
    }

    let mut remaining: Vec<u32> = (0..n as u32).collect();
    let mut triangles = Vec::with_capacity(n - 2);

    while remaining.len() > 3 {
        let m = remaining.len();
        let mut clipped = false;
        for i in 0..m {
            let prev = remaining[(i + m - 1) % m];
            let cur = remaining[i];
            let next = remaining[(i + 1) % m];
            let (pa, pb, pc) = (poly[prev as usize], poly[cur as usize], poly[next as usize]);

            // Reflex or collinear corner cannot be an ear
            if pa.cross(&pb, &pc) * winding <= EPS {
                continue;
            }
            let blocked = remaining.iter().any(|&j| {
                j != prev && j != cur && j != next
                    && point_in_triangle(&poly[j as usize], &pa, &pb, &pc)
            });
            if blocked {
                continue;
            }

            triangles.push([prev, cur, next]);
            remaining.remove(i);
            clipped = true;
            break;
        }
        if !clipped {
            return None;
        }
    }
    triangles.push([remaining[0], remaining[1], remaining[2]]);
    Some(triangles)
}

/// Triangulate a region: fan from vertex 0 when valid, otherwise ear clipping.
/// Returns None for fewer than 3 vertices.
pub fn triangulate(poly: &[FloorPoint]) -> Option<Triangulation> {
    if poly.len() < 3 {
        return None;
    }
    if fan_is_valid(poly) {
        return Some(Triangulation {
            triangles: fan_triangles(poly.len()),
            method: TriangulationMethod::Fan,
        });
    }
    match ear_clip(poly) {
        Some(triangles) => Some(Triangulation {
            triangles,
            method: TriangulationMethod::EarClip,
        }),
        // Self-intersecting shapes still preview as a fan
        None => Some(Triangulation {
            triangles: fan_triangles(poly.len()),
            method: TriangulationMethod::Fan,
        }),
    }
}

/// Even-odd ray casting point-in-polygon test
pub fn point_in_polygon(point: &FloorPoint, poly: &[FloorPoint]) -> bool {
    if poly.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = poly.len() - 1;
    for i in 0..poly.len() {
        let (pi, pj) = (poly[i], poly[j]);
        if (pi.z > point.z) != (pj.z > point.z) {
            let x_cross = (pj.x - pi.x) * (point.z - pi.z) / (pj.z - pi.z) + pi.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

fn point_in_triangle(p: &FloorPoint, a: &FloorPoint, b: &FloorPoint, c: &FloorPoint) -> bool {
    let d1 = a.cross(b, p);
    let d2 = b.cross(c, p);
    let d3 = c.cross(a, p);
    let has_neg = d1 < -EPS || d2 < -EPS || d3 < -EPS;
    let has_pos = d1 > EPS || d2 > EPS || d3 > EPS;
    // Points on an edge count as outside so shared vertices do not block ears
    let on_edge = d1.abs() <= EPS || d2.abs() <= EPS || d3.abs() <= EPS;
    !(has_neg && has_pos) && !on_edge
}

/// Proper or touching intersection between segments `p1-p2` and `q1-q2`
pub fn segments_intersect(p1: &FloorPoint, p2: &FloorPoint, q1: &FloorPoint, q2: &FloorPoint) -> bool {
    let d1 = q1.cross(q2, p1);
    let d2 = q1.cross(q2, p2);
    let d3 = p1.cross(p2, q1);
    let d4 = p1.cross(p2, q2);

    if ((d1 > EPS && d2 < -EPS) || (d1 < -EPS && d2 > EPS))
        && ((d3 > EPS && d4 < -EPS) || (d3 < -EPS && d4 > EPS))
    {
        return true;
    }

    let on_segment = |a: &FloorPoint, b: &FloorPoint, p: &FloorPoint| {
        p.x >= a.x.min(b.x) - EPS
            && p.x <= a.x.max(b.x) + EPS
            && p.z >= a.z.min(b.z) - EPS
            && p.z <= a.z.max(b.z) + EPS
    };

    (d1.abs() <= EPS && on_segment(q1, q2, p1))
        || (d2.abs() <= EPS && on_segment(q1, q2, p2))
        || (d3.abs() <= EPS && on_segment(p1, p2, q1))
        || (d4.abs() <= EPS && on_segment(p1, p2, q2))
}

/// True when no two non-adjacent edges intersect
pub fn is_simple(poly: &[FloorPoint]) -> bool {
    let n = poly.len();
    if n < 3 {
        return false;
    }
    for i in 0..n {
        let (a1, a2) = (poly[i], poly[(i + 1) % n]);
        for j in (i + 1)..n {
            // Adjacent edges share a vertex
            if j == i + 1 || (i == 0 && j == n - 1) {
                continue;
            }
            let (b1, b2) = (poly[j], poly[(j + 1) % n]);
            if segments_intersect(&a1, &a2, &b1, &b2) {
                return false;
            }
        }
    }
    true
}

/// Validate a vertex list before it is committed as a region shape
pub fn validate_region(poly: &[FloorPoint]) -> Result<()> {
    if poly.len() < 3 {
        return Err(AisleError::InvalidRegion(format!(
            "a region needs at least 3 vertices, got {}",
            poly.len()
        )));
    }
    if signed_area(poly).abs() <= EPS {
        return Err(AisleError::InvalidRegion("region has zero area".into()));
    }
    if !is_simple(poly) {
        return Err(AisleError::InvalidRegion("region outline intersects itself".into()));
    }
    Ok(())
}

/// Midpoint of edge `index -> index + 1` (wrapping)
pub fn edge_midpoint(poly: &[FloorPoint], index: usize) -> Option<FloorPoint> {
    if poly.len() < 2 || index >= poly.len() {
        return None;
    }
    let a = poly[index];
    let b = poly[(index + 1) % poly.len()];
    Some(FloorPoint::new((a.x + b.x) * 0.5, (a.z + b.z) * 0.5))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<FloorPoint> {
        vec![
            FloorPoint::new(0.0, 0.0),
            FloorPoint::new(4.0, 0.0),
            FloorPoint::new(4.0, 4.0),
            FloorPoint::new(0.0, 4.0),
        ]
    }

    /// A square with a V notch cut from the top edge; the fan from the
    /// bottom-right corner folds across the notch
    fn notched() -> Vec<FloorPoint> {
        vec![
            FloorPoint::new(4.0, 0.0),
            FloorPoint::new(0.0, 0.0),
            FloorPoint::new(0.0, 4.0),
            FloorPoint::new(1.0, 4.0),
            FloorPoint::new(2.0, 1.0),
            FloorPoint::new(3.0, 4.0),
            FloorPoint::new(4.0, 4.0),
        ]
    }

    #[test]
    fn test_fan_counts() {
        for n in 3..12 {
            assert_eq!(fan_triangles(n).len(), n - 2);
        }
        assert!(fan_triangles(2).is_empty());
    }

    #[test]
    fn test_outline_is_closed() {
        let poly = square();
        let outline = outline_loop(&poly);
        assert_eq!(outline.len(), poly.len() + 1);
        assert_eq!(outline.first(), outline.last());
    }

    #[test]
    fn test_convex_uses_fan() {
        let tri = triangulate(&square()).unwrap();
        assert_eq!(tri.method, TriangulationMethod::Fan);
        assert_eq!(tri.triangles, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn test_notched_polygon_falls_back_to_ear_clip() {
        let poly = notched();
        assert!(!fan_is_valid(&poly));
        let tri = triangulate(&poly).unwrap();
        assert_eq!(tri.method, TriangulationMethod::EarClip);
        assert_eq!(tri.triangles.len(), poly.len() - 2);

        // Triangles cover exactly the polygon area
        let area: f32 = tri
            .triangles
            .iter()
            .map(|[a, b, c]| {
                let (pa, pb, pc) = (poly[*a as usize], poly[*b as usize], poly[*c as usize]);
                pa.cross(&pb, &pc).abs() * 0.5
            })
            .sum();
        assert!((area - signed_area(&poly).abs()).abs() < 1e-4);
    }

    #[test]
    fn test_centroid() {
        let c = centroid(&square()).unwrap();
        assert_eq!(c, FloorPoint::new(2.0, 2.0));
        assert!(centroid(&[]).is_none());
    }

    #[test]
    fn test_point_in_polygon() {
        let poly = square();
        assert!(point_in_polygon(&FloorPoint::new(1.0, 1.0), &poly));
        assert!(!point_in_polygon(&FloorPoint::new(5.0, 1.0), &poly));
        assert!(!point_in_polygon(&FloorPoint::new(2.5, 3.0), &notched()));
        assert!(point_in_polygon(&FloorPoint::new(0.5, 3.0), &notched()));
    }

    #[test]
    fn test_validate_rejects_bow_tie() {
        let bow_tie = vec![
            FloorPoint::new(0.0, 0.0),
            FloorPoint::new(4.0, 4.0),
            FloorPoint::new(4.0, 0.0),
            FloorPoint::new(0.0, 4.0),
        ];
        assert!(!is_simple(&bow_tie));
        assert!(matches!(
            validate_region(&bow_tie),
            Err(AisleError::InvalidRegion(_))
        ));
        assert!(validate_region(&square()).is_ok());
        assert!(validate_region(&square()[..2]).is_err());
    }

    #[test]
    fn test_edge_midpoint_wraps() {
        let poly = square();
        assert_eq!(edge_midpoint(&poly, 0), Some(FloorPoint::new(2.0, 0.0)));
        assert_eq!(edge_midpoint(&poly, 3), Some(FloorPoint::new(0.0, 2.0)));
        assert_eq!(edge_midpoint(&poly, 4), None);
    }
}
