//! Ray primitives for pointer picking
//!
//! Rays come from the camera's inverse view-projection. Candidates are
//! culled with a world-space AABB (slab test) before the exact
//! per-triangle test.

use aisle_core::FloorPoint;

/// A ray in 3D space with a unit direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: [f32; 3],
    pub direction: [f32; 3],
}

impl Ray {
    /// Ray from `near` towards `far`. None when the points coincide.
    pub fn between(near: [f32; 3], far: [f32; 3]) -> Option<Self> {
        let d = sub(far, near);
        let len = dot(d, d).sqrt();
        if len < 1e-8 {
            return None;
        }
        Some(Self {
            origin: near,
            direction: [d[0] / len, d[1] / len, d[2] / len],
        })
    }

    pub fn at(&self, t: f32) -> [f32; 3] {
        [
            self.origin[0] + self.direction[0] * t,
            self.origin[1] + self.direction[1] * t,
            self.origin[2] + self.direction[2] * t,
        ]
    }

    /// Intersection with the horizontal plane `y = height`, in front of the origin
    pub fn plane_point(&self, height: f32) -> Option<FloorPoint> {
        if self.direction[1].abs() < 1e-8 {
            return None;
        }
        let t = (height - self.origin[1]) / self.direction[1];
        if t < 0.0 {
            return None;
        }
        let p = self.at(t);
        Some(FloorPoint::new(p[0], p[2]))
    }

    pub fn floor_point(&self) -> Option<FloorPoint> {
        self.plane_point(0.0)
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Aabb {
    pub fn from_points(points: impl IntoIterator<Item = [f32; 3]>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut aabb = Self {
            min: first,
            max: first,
        };
        for p in iter {
            for i in 0..3 {
                aabb.min[i] = aabb.min[i].min(p[i]);
                aabb.max[i] = aabb.max[i].max(p[i]);
            }
        }
        Some(aabb)
    }

    /// Bounds of this box after a column-major affine transform
    pub fn transformed(&self, mat: &[[f32; 4]; 4]) -> Self {
        let mut min = [mat[3][0], mat[3][1], mat[3][2]];
        let mut max = min;
        for i in 0..3 {
            for j in 0..3 {
                let a = mat[i][j] * self.min[i];
                let b = mat[i][j] * self.max[i];
                min[j] += a.min(b);
                max[j] += a.max(b);
            }
        }
        Self { min, max }
    }
}

/// Slab test. Distance to the nearest non-negative hit.
pub fn ray_aabb(ray: &Ray, aabb: &Aabb) -> Option<f32> {
    let mut tmin = f32::NEG_INFINITY;
    let mut tmax = f32::INFINITY;

    for i in 0..3 {
        if ray.direction[i].abs() < 1e-8 {
            if ray.origin[i] < aabb.min[i] || ray.origin[i] > aabb.max[i] {
                return None;
            }
        } else {
            let inv_d = 1.0 / ray.direction[i];
            let mut t1 = (aabb.min[i] - ray.origin[i]) * inv_d;
            let mut t2 = (aabb.max[i] - ray.origin[i]) * inv_d;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            tmin = tmin.max(t1);
            tmax = tmax.min(t2);
            if tmin > tmax {
                return None;
            }
        }
    }

    if tmax < 0.0 {
        None
    } else if tmin >= 0.0 {
        Some(tmin)
    } else {
        // Origin inside the box
        Some(tmax)
    }
}

/// Möller-Trumbore, double-sided
pub fn ray_triangle(ray: &Ray, tri: &[[f32; 3]; 3]) -> Option<f32> {
    let e1 = sub(tri[1], tri[0]);
    let e2 = sub(tri[2], tri[0]);
    let p = cross(ray.direction, e2);
    let det = dot(e1, p);
    if det.abs() < 1e-9 {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = sub(ray.origin, tri[0]);
    let u = dot(s, p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = cross(s, e1);
    let v = dot(ray.direction, q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = dot(e2, q) * inv_det;
    (t >= 0.0).then_some(t)
}

/// Column-major affine point transform
pub fn transform_point(m: &[[f32; 4]; 4], p: [f32; 3]) -> [f32; 3] {
    [
        m[0][0] * p[0] + m[1][0] * p[1] + m[2][0] * p[2] + m[3][0],
        m[0][1] * p[0] + m[1][1] * p[1] + m[2][1] * p[2] + m[3][1],
        m[0][2] * p[0] + m[1][2] * p[1] + m[2][2] * p[2] + m[3][2],
    ]
}

fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn down_ray(x: f32, z: f32) -> Ray {
        Ray::between([x, 10.0, z], [x, 0.0, z]).unwrap()
    }

    #[test]
    fn test_ray_hits_box_from_above() {
        let aabb = Aabb {
            min: [-1.0, 0.0, -1.0],
            max: [1.0, 2.0, 1.0],
        };
        let t = ray_aabb(&down_ray(0.5, 0.5), &aabb).unwrap();
        assert!((t - 8.0).abs() < 1e-5);
        assert!(ray_aabb(&down_ray(3.0, 0.0), &aabb).is_none());
    }

    #[test]
    fn test_origin_inside_box() {
        let aabb = Aabb {
            min: [-1.0, -1.0, -1.0],
            max: [1.0, 1.0, 1.0],
        };
        let ray = Ray::between([0.0, 0.0, 0.0], [0.0, 1.0, 0.0]).unwrap();
        assert_eq!(ray_aabb(&ray, &aabb), Some(1.0));
    }

    #[test]
    fn test_aabb_transformed_by_translation_and_scale() {
        let unit = Aabb {
            min: [-0.5, 0.0, -0.5],
            max: [0.5, 1.0, 0.5],
        };
        let m = [
            [2.0, 0.0, 0.0, 0.0],
            [0.0, 3.0, 0.0, 0.0],
            [0.0, 0.0, 4.0, 0.0],
            [10.0, 0.0, 5.0, 1.0],
        ];
        let t = unit.transformed(&m);
        assert_eq!(t.min, [9.0, 0.0, 3.0]);
        assert_eq!(t.max, [11.0, 3.0, 7.0]);
    }

    #[test]
    fn test_ray_triangle_inside_and_outside() {
        let tri = [[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 0.0, 2.0]];
        let t = ray_triangle(&down_ray(0.5, 0.5), &tri).unwrap();
        assert!((t - 10.0).abs() < 1e-5);
        assert!(ray_triangle(&down_ray(1.5, 1.5), &tri).is_none());
    }

    #[test]
    fn test_floor_point() {
        let ray = Ray::between([0.0, 4.0, 0.0], [2.0, 2.0, 1.0]).unwrap();
        let p = ray.floor_point().unwrap();
        assert!((p.x - 4.0).abs() < 1e-5);
        assert!((p.z - 2.0).abs() < 1e-5);

        let up = Ray::between([0.0, 1.0, 0.0], [0.0, 2.0, 0.0]).unwrap();
        assert!(up.floor_point().is_none());
    }

    #[test]
    fn test_degenerate_ray() {
        assert!(Ray::between([1.0, 1.0, 1.0], [1.0, 1.0, 1.0]).is_none());
    }
}
