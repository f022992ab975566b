//! Orbit camera over the venue floor

use crate::picking::Ray;
use aisle_core::{mat4_mul, VenueBounds, Vec3};

/// Perspective camera orbiting a target point
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Width / height
    pub aspect: f32,
    pub distance: f32,
    /// Horizontal angle in radians
    pub yaw: f32,
    /// Vertical angle in radians
    pub pitch: f32,
}

impl Default for Camera {
    fn default() -> Self {
        let mut camera = Self {
            position: Vec3::ZERO,
            target: Vec3::ZERO,
            up: Vec3::UP,
            fov: 50.0,
            near: 0.1,
            far: 500.0,
            aspect: 16.0 / 9.0,
            distance: 25.0,
            yaw: 0.0,
            pitch: 1.0,
        };
        camera.update_orbit();
        camera
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Center on the venue and back off far enough to see all of it
    pub fn frame_venue(&mut self, bounds: &VenueBounds) {
        self.target = Vec3::new(bounds.width * 0.5, 0.0, bounds.depth * 0.5);
        self.distance = (bounds.width.max(bounds.depth) * 1.2).clamp(5.0, 200.0);
        self.update_orbit();
    }

    /// Recompute position from target, distance, yaw and pitch
    pub fn update_orbit(&mut self) {
        let x = self.distance * self.pitch.cos() * self.yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.cos();
        self.position = self.target + Vec3::new(x, y, z);
    }

    pub fn orbit_horizontal(&mut self, delta: f32) {
        self.yaw += delta;
        self.update_orbit();
    }

    pub fn orbit_vertical(&mut self, delta: f32) {
        // Stay above the floor and short of straight down
        self.pitch = (self.pitch + delta).clamp(0.1, 1.55);
        self.update_orbit();
    }

    pub fn zoom(&mut self, delta: f32) {
        self.distance = (self.distance - delta).clamp(2.0, 200.0);
        self.update_orbit();
    }

    /// Move the target in the camera's screen plane
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let forward = (self.target - self.position).normalized();
        let right = forward.cross(&self.up).normalized();
        let up = right.cross(&forward);
        self.target = self.target + right * dx + up * dy;
        self.update_orbit();
    }

    /// View matrix (column-major)
    pub fn view_matrix(&self) -> [[f32; 4]; 4] {
        let f = (self.target - self.position).normalized();
        let s = f.cross(&self.up).normalized();
        let u = s.cross(&f);

        [
            [s.x, u.x, -f.x, 0.0],
            [s.y, u.y, -f.y, 0.0],
            [s.z, u.z, -f.z, 0.0],
            [
                -s.dot(&self.position),
                -u.dot(&self.position),
                f.dot(&self.position),
                1.0,
            ],
        ]
    }

    /// Perspective projection (column-major, clip z in [-1, 1])
    pub fn projection_matrix(&self) -> [[f32; 4]; 4] {
        let f = 1.0 / (self.fov.to_radians() / 2.0).tan();
        let depth = self.far - self.near;
        [
            [f / self.aspect, 0.0, 0.0, 0.0],
            [0.0, f, 0.0, 0.0],
            [0.0, 0.0, -(self.far + self.near) / depth, -1.0],
            [0.0, 0.0, -(2.0 * self.far * self.near) / depth, 0.0],
        ]
    }

    pub fn view_projection_matrix(&self) -> [[f32; 4]; 4] {
        mat4_mul(&self.projection_matrix(), &self.view_matrix())
    }

    pub fn inverse_view_projection_matrix(&self) -> Option<[[f32; 4]; 4]> {
        mat4_inverse(&self.view_projection_matrix())
    }

    /// Ray from the eye through a point in normalized device coordinates
    pub fn ray_from_ndc(&self, ndc: [f32; 2]) -> Option<Ray> {
        let inv_vp = self.inverse_view_projection_matrix()?;
        let near = unproject(&inv_vp, [ndc[0], ndc[1], -1.0])?;
        let far = unproject(&inv_vp, [ndc[0], ndc[1], 1.0])?;
        Ray::between(near, far)
    }

    /// Project a world point to NDC. None when behind the camera.
    pub fn world_to_ndc(&self, point: Vec3) -> Option<[f32; 2]> {
        let vp = self.view_projection_matrix();
        let p = point.to_array();
        let clip = |row: usize| vp[0][row] * p[0] + vp[1][row] * p[1] + vp[2][row] * p[2] + vp[3][row];
        let w = clip(3);
        if w <= 1e-3 {
            return None;
        }
        Some([clip(0) / w, clip(1) / w])
    }
}

/// Pixel position to NDC for a `width x height` viewport (y down in pixels)
pub fn pixel_to_ndc(pixel: [f32; 2], viewport: [f32; 2]) -> [f32; 2] {
    [
        (pixel[0] / viewport[0]) * 2.0 - 1.0,
        1.0 - (pixel[1] / viewport[1]) * 2.0,
    ]
}

pub fn ndc_to_pixel(ndc: [f32; 2], viewport: [f32; 2]) -> [f32; 2] {
    [
        (ndc[0] + 1.0) * 0.5 * viewport[0],
        (1.0 - ndc[1]) * 0.5 * viewport[1],
    ]
}

/// Column-major point transform with perspective divide
fn unproject(m: &[[f32; 4]; 4], p: [f32; 3]) -> Option<[f32; 3]> {
    let x = m[0][0] * p[0] + m[1][0] * p[1] + m[2][0] * p[2] + m[3][0];
    let y = m[0][1] * p[0] + m[1][1] * p[1] + m[2][1] * p[2] + m[3][1];
    let z = m[0][2] * p[0] + m[1][2] * p[1] + m[2][2] * p[2] + m[3][2];
    let w = m[0][3] * p[0] + m[1][3] * p[1] + m[2][3] * p[2] + m[3][3];
    if w.abs() < 1e-10 {
        return None;
    }
    Some([x / w, y / w, z / w])
}

/// General 4x4 inverse by cofactor expansion. None when singular.
fn mat4_inverse(m: &[[f32; 4]; 4]) -> Option<[[f32; 4]; 4]> {
    let a: Vec<f32> = m.iter().flatten().copied().collect();
    let mut inv = [0.0f32; 16];

    inv[0] = a[5] * a[10] * a[15] - a[5] * a[11] * a[14] - a[9] * a[6] * a[15]
        + a[9] * a[7] * a[14] + a[13] * a[6] * a[11] - a[13] * a[7] * a[10];
    inv[4] = -a[4] * a[10] * a[15] + a[4] * a[11] * a[14] + a[8] * a[6] * a[15]
        - a[8] * a[7] * a[14] - a[12] * a[6] * a[11] + a[12] * a[7] * a[10];
    inv[8] = a[4] * a[9] * a[15] - a[4] * a[11] * a[13] - a[8] * a[5] * a[15]
        + a[8] * a[7] * a[13] + a[12] * a[5] * a[11] - a[12] * a[7] * a[9];
    inv[12] = -a[4] * a[9] * a[14] + a[4] * a[10] * a[13] + a[8] * a[5] * a[14]
        - a[8] * a[6] * a[13] - a[12] * a[5] * a[10] + a[12] * a[6] * a[9];
    inv[1] = -a[1] * a[10] * a[15] + a[1] * a[11] * a[14] + a[9] * a[2] * a[15]
        - a[9] * a[3] * a[14] - a[13] * a[2] * a[11] + a[13] * a[3] * a[10];
    inv[5] = a[0] * a[10] * a[15] - a[0] * a[11] * a[14] - a[8] * a[2] * a[15]
        + a[8] * a[3] * a[14] + a[12] * a[2] * a[11] - a[12] * a[3] * a[10];
    inv[9] = -a[0] * a[9] * a[15] + a[0] * a[11] * a[13] + a[8] * a[1] * a[15]
        - a[8] * a[3] * a[13] - a[12] * a[1] * a[11] + a[12] * a[3] * a[9];
    inv[13] = a[0] * a[9] * a[14] - a[0] * a[10] * a[13] - a[8] * a[1] * a[14]
        + a[8] * a[2] * a[13] + a[12] * a[1] * a[10] - a[12] * a[2] * a[9];
    inv[2] = a[1] * a[6] * a[15] - a[1] * a[7] * a[14] - a[5] * a[2] * a[15]
        + a[5] * a[3] * a[14] + a[13] * a[2] * a[7] - a[13] * a[3] * a[6];
    inv[6] = -a[0] * a[6] * a[15] + a[0] * a[7] * a[14] + a[4] * a[2] * a[15]
        - a[4] * a[3] * a[14] - a[12] * a[2] * a[7] + a[12] * a[3] * a[6];
    inv[10] = a[0] * a[5] * a[15] - a[0] * a[7] * a[13] - a[4] * a[1] * a[15]
        + a[4] * a[3] * a[13] + a[12] * a[1] * a[7] - a[12] * a[3] * a[5];
    inv[14] = -a[0] * a[5] * a[14] + a[0] * a[6] * a[13] + a[4] * a[1] * a[14]
        - a[4] * a[2] * a[13] - a[12] * a[1] * a[6] + a[12] * a[2] * a[5];
    inv[3] = -a[1] * a[6] * a[11] + a[1] * a[7] * a[10] + a[5] * a[2] * a[11]
        - a[5] * a[3] * a[10] - a[9] * a[2] * a[7] + a[9] * a[3] * a[6];
    inv[7] = a[0] * a[6] * a[11] - a[0] * a[7] * a[10] - a[4] * a[2] * a[11]
        + a[4] * a[3] * a[10] + a[8] * a[2] * a[7] - a[8] * a[3] * a[6];
    inv[11] = -a[0] * a[5] * a[11] + a[0] * a[7] * a[9] + a[4] * a[1] * a[11]
        - a[4] * a[3] * a[9] - a[8] * a[1] * a[7] + a[8] * a[3] * a[5];
    inv[15] = a[0] * a[5] * a[10] - a[0] * a[6] * a[9] - a[4] * a[1] * a[10]
        + a[4] * a[2] * a[9] + a[8] * a[1] * a[6] - a[8] * a[2] * a[5];

    let det = a[0] * inv[0] + a[1] * inv[4] + a[2] * inv[8] + a[3] * inv[12];
    if det.abs() < 1e-12 {
        return None;
    }
    let inv_det = 1.0 / det;

    let mut out = [[0.0; 4]; 4];
    for (i, value) in inv.iter().enumerate() {
        out[i / 4][i % 4] = value * inv_det;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverse_round_trips_view_projection() {
        let camera = Camera::new();
        let vp = camera.view_projection_matrix();
        let inv = mat4_inverse(&vp).unwrap();
        let identity = mat4_mul(&vp, &inv);
        for (i, col) in identity.iter().enumerate() {
            for (j, v) in col.iter().enumerate() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((v - expected).abs() < 1e-3, "m[{}][{}] = {}", i, j, v);
            }
        }
    }

    #[test]
    fn test_center_ray_hits_target() {
        let mut camera = Camera::new();
        camera.frame_venue(&VenueBounds::default());
        let ray = camera.ray_from_ndc([0.0, 0.0]).unwrap();
        let hit = ray.floor_point().unwrap();
        assert!((hit.x - 10.0).abs() < 1e-2);
        assert!((hit.z - 7.5).abs() < 1e-2);
    }

    #[test]
    fn test_project_then_unproject() {
        let mut camera = Camera::new();
        camera.frame_venue(&VenueBounds::default());
        let ndc = camera.world_to_ndc(Vec3::new(3.0, 0.0, 4.0)).unwrap();
        let hit = camera.ray_from_ndc(ndc).unwrap().floor_point().unwrap();
        assert!((hit.x - 3.0).abs() < 1e-2);
        assert!((hit.z - 4.0).abs() < 1e-2);
    }

    #[test]
    fn test_pixel_ndc_conversion() {
        let viewport = [800.0, 600.0];
        assert_eq!(pixel_to_ndc([400.0, 300.0], viewport), [0.0, 0.0]);
        assert_eq!(pixel_to_ndc([0.0, 0.0], viewport), [-1.0, 1.0]);
        assert_eq!(ndc_to_pixel([1.0, -1.0], viewport), [800.0, 600.0]);
    }

    #[test]
    fn test_pitch_clamped() {
        let mut camera = Camera::new();
        camera.orbit_vertical(10.0);
        assert!(camera.pitch <= 1.55);
        camera.orbit_vertical(-10.0);
        assert!(camera.pitch >= 0.1);
    }
}
