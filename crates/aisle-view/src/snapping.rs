//! Drop-time placement adjustment
//!
//! A committed object position runs through grid snap, magnetic alignment
//! to same-kind neighbors, collision push-out and finally clamping to the
//! venue. Sensors and region vertices only get grid snap and clamping.

use aisle_core::{FloorPoint, Rect, VenueBounds};

/// Iteration cap for chained push-outs
const MAX_COLLISION_PASSES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapOptions {
    /// Grid spacing, or None to skip grid snap
    pub grid: Option<f32>,
    /// Alignment distance in meters; zero disables alignment
    pub align_threshold: f32,
    pub collision: bool,
}

/// Round each coordinate to the nearest multiple of `grid`
pub fn snap_to_grid(p: FloorPoint, grid: f32) -> FloorPoint {
    if grid <= 0.0 {
        return p;
    }
    FloorPoint::new((p.x / grid).round() * grid, (p.z / grid).round() * grid)
}

/// Gap between two rectangles along each axis, negative when they overlap on it
fn gaps(a: &Rect, b: &Rect) -> (f32, f32) {
    let gx = (a.min_x() - b.max_x()).max(b.min_x() - a.max_x());
    let gz = (a.min_z() - b.max_z()).max(b.min_z() - a.max_z());
    (gx, gz)
}

/// Candidate shifts that line up `(my_min, my_center, my_max)` with a
/// neighbor's edges or center
fn axis_candidates(mine: (f32, f32, f32), theirs: (f32, f32, f32)) -> [f32; 5] {
    let (min, center, max) = mine;
    let (n_min, n_center, n_max) = theirs;
    [
        n_max - min,
        n_min - max,
        n_min - min,
        n_max - max,
        n_center - center,
    ]
}

/// Center of `rect` after pulling it onto the closest neighbor edge or center
/// line within `threshold`, independently per axis. Only neighbors whose
/// rectangles come within `threshold` on both axes take part.
pub fn align_to_neighbors(rect: Rect, neighbors: &[Rect], threshold: f32) -> FloorPoint {
    if threshold <= 0.0 {
        return rect.center;
    }
    let mut best_x: Option<f32> = None;
    let mut best_z: Option<f32> = None;

    let closer = |best: Option<f32>, delta: f32| {
        delta.abs() <= threshold && best.map_or(true, |b| delta.abs() < b.abs())
    };

    for neighbor in neighbors {
        let (gx, gz) = gaps(&rect, neighbor);
        if gx > threshold || gz > threshold {
            continue;
        }
        let xs = axis_candidates(
            (rect.min_x(), rect.center.x, rect.max_x()),
            (neighbor.min_x(), neighbor.center.x, neighbor.max_x()),
        );
        for delta in xs {
            if closer(best_x, delta) {
                best_x = Some(delta);
            }
        }
        let zs = axis_candidates(
            (rect.min_z(), rect.center.z, rect.max_z()),
            (neighbor.min_z(), neighbor.center.z, neighbor.max_z()),
        );
        for delta in zs {
            if closer(best_z, delta) {
                best_z = Some(delta);
            }
        }
    }

    FloorPoint::new(
        rect.center.x + best_x.unwrap_or(0.0),
        rect.center.z + best_z.unwrap_or(0.0),
    )
}

/// Push `rect` out of every overlapping neighbor along the axis of least
/// overlap, away from the neighbor's center. The other axis is untouched.
pub fn resolve_collision(rect: Rect, neighbors: &[Rect]) -> FloorPoint {
    let mut rect = rect;
    for _ in 0..MAX_COLLISION_PASSES {
        let mut moved = false;
        for neighbor in neighbors {
            let Some((ox, oz)) = rect.overlap(neighbor) else {
                continue;
            };
            let mut center = rect.center;
            if ox <= oz {
                let away = if center.x >= neighbor.center.x { 1.0 } else { -1.0 };
                center.x += away * ox;
            } else {
                let away = if center.z >= neighbor.center.z { 1.0 } else { -1.0 };
                center.z += away * oz;
            }
            rect = rect.with_center(center);
            moved = true;
        }
        if !moved {
            break;
        }
    }
    rect.center
}

/// Full drop pipeline for an object footprint. `neighbors` are the
/// footprints of the other objects of the same kind.
pub fn settle_object(
    footprint: Rect,
    target: FloorPoint,
    neighbors: &[Rect],
    bounds: &VenueBounds,
    options: &SnapOptions,
) -> FloorPoint {
    let mut center = target;
    if let Some(grid) = options.grid {
        center = snap_to_grid(center, grid);
    }
    center = align_to_neighbors(footprint.with_center(center), neighbors, options.align_threshold);
    if options.collision {
        center = resolve_collision(footprint.with_center(center), neighbors);
    }
    bounds.clamp(center)
}

/// Drop pipeline for a single point (sensor position, region vertex)
pub fn settle_point(target: FloorPoint, bounds: &VenueBounds, grid: Option<f32>) -> FloorPoint {
    let snapped = match grid {
        Some(grid) => snap_to_grid(target, grid),
        None => target,
    };
    bounds.clamp(snapped)
}

/// Translation for a whole polygon: grid-snapped, then limited so every
/// vertex stays inside the venue
pub fn settle_translation(
    vertices: &[FloorPoint],
    delta: FloorPoint,
    bounds: &VenueBounds,
    grid: Option<f32>,
) -> FloorPoint {
    let delta = match grid {
        Some(grid) => snap_to_grid(delta, grid),
        None => delta,
    };
    if vertices.is_empty() {
        return delta;
    }
    let (mut min_x, mut max_x) = (f32::INFINITY, f32::NEG_INFINITY);
    let (mut min_z, mut max_z) = (f32::INFINITY, f32::NEG_INFINITY);
    for v in vertices {
        min_x = min_x.min(v.x);
        max_x = max_x.max(v.x);
        min_z = min_z.min(v.z);
        max_z = max_z.max(v.z);
    }
    let clamp_axis = |d: f32, lo: f32, hi: f32| if lo > hi { d } else { d.clamp(lo, hi) };
    FloorPoint::new(
        clamp_axis(delta.x, -min_x, bounds.width - max_x),
        clamp_axis(delta.z, -min_z, bounds.depth - max_z),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f32, z: f32, hx: f32, hz: f32) -> Rect {
        Rect::new(FloorPoint::new(x, z), hx, hz)
    }

    #[test]
    fn test_snap_to_grid() {
        let p = snap_to_grid(FloorPoint::new(1.26, 3.74), 0.5);
        assert_eq!(p, FloorPoint::new(1.5, 3.5));
        assert_eq!(snap_to_grid(FloorPoint::new(1.26, 0.1), 0.0), FloorPoint::new(1.26, 0.1));
    }

    #[test]
    fn test_align_edges_flush() {
        let neighbor = rect(5.0, 5.0, 0.5, 0.5);
        // Dragged box sits 0.2 right of the neighbor's right edge
        let moving = rect(6.45, 5.0, 0.75, 0.5);
        let c = align_to_neighbors(moving, &[neighbor], 0.3);
        let gap = (c.x - 0.75) - neighbor.max_x();
        assert!(gap.abs() < 1e-5, "gap {}", gap);
        assert!((c.z - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_align_both_axes() {
        let neighbor = rect(5.0, 5.0, 0.5, 0.5);
        let moving = rect(5.2, 6.05, 0.5, 0.5);
        let c = align_to_neighbors(moving, &[neighbor], 0.3);
        assert!((c.x - 5.0).abs() < 1e-5);
        assert!((c.z - 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_far_neighbor_ignored() {
        let neighbor = rect(1.0, 1.0, 0.5, 0.5);
        let moving = rect(8.1, 1.1, 0.5, 0.5);
        assert_eq!(align_to_neighbors(moving, &[neighbor], 0.3), moving.center);
    }

    #[test]
    fn test_collision_pushes_along_smaller_overlap() {
        let neighbor = rect(5.0, 5.0, 1.0, 1.0);
        // Overlap (0.5, 1.6): push on x only
        let moving = rect(6.5, 5.4, 1.0, 1.0);
        let c = resolve_collision(moving, &[neighbor]);
        assert!((c.x - 7.0).abs() < 1e-5);
        assert_eq!(c.z, 5.4);
        assert!(moving.with_center(c).overlap(&neighbor).is_none());
    }

    #[test]
    fn test_collision_pushes_negative_direction() {
        let neighbor = rect(5.0, 5.0, 1.0, 1.0);
        let moving = rect(4.8, 3.5, 1.0, 1.0);
        let c = resolve_collision(moving, &[neighbor]);
        assert_eq!(c.x, 4.8);
        assert!((c.z - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_settle_object_clamps() {
        let bounds = VenueBounds::default();
        let footprint = rect(0.0, 0.0, 0.5, 0.5);
        let options = SnapOptions {
            grid: Some(0.5),
            align_threshold: 0.3,
            collision: true,
        };
        let c = settle_object(footprint, FloorPoint::new(25.0, -3.0), &[], &bounds, &options);
        assert_eq!(c, FloorPoint::new(20.0, 0.0));
    }

    #[test]
    fn test_settle_translation_keeps_polygon_inside() {
        let bounds = VenueBounds::default();
        let square = vec![
            FloorPoint::new(1.0, 1.0),
            FloorPoint::new(3.0, 1.0),
            FloorPoint::new(3.0, 3.0),
            FloorPoint::new(1.0, 3.0),
        ];
        let d = settle_translation(&square, FloorPoint::new(-4.0, 0.7), &bounds, Some(0.5));
        assert_eq!(d, FloorPoint::new(-1.0, 0.5));
    }
}
