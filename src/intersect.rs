use super::*;

//
// Ray vs. triangle
//

pub struct TriangleHit {
    pub t: f32,
    pub barycentrics: Vec3,
}

pub struct RayTriangleIntersector {
    // Axis permutation that moves the dominant direction axis onto z.
    axes: [usize; 3],
    shear: Vec3,
}

// 2D signed edge function. A result of exactly zero means the projected ray
// passes through the edge itself, so the value is recomputed in double
// precision before the sign decides inclusion; shared mesh edges then make
// the same call for both triangles.
fn edge(p: Vec2, q: Vec2) -> f32 {
    let e = p.x * q.y - p.y * q.x;
    if e == 0.0 {
        (f64::from(p.x) * f64::from(q.y) - f64::from(p.y) * f64::from(q.x)) as f32
    } else {
        e
    }
}

impl RayTriangleIntersector {
    // Watertight test after Woop, Benthin and Wald (JCGT 2013): vertices are
    // taken into a coordinate system where the ray runs along +z, reducing
    // the intersection to three 2D edge tests against the origin.

    pub fn new(ray: &Ray) -> Self {
        let dir = ray.dir.into_inner();
        let major = dir.abs().argmax().0;
        let mut axes = [(major + 1) % 3, (major + 2) % 3, major];
        // A negative dominant component mirrors the frame; swapping the two
        // minor axes keeps triangle winding stable.
        if dir[major] < 0.0 {
            axes.swap(0, 1);
        }
        let shear = vector![
            dir[axes[0]] / dir[axes[2]],
            dir[axes[1]] / dir[axes[2]],
            1.0 / dir[axes[2]]
        ];
        Self { axes, shear }
    }

    // Hits must fall strictly inside (RAY_EPSILON, t_max). Both triangle
    // windings are accepted; sidedness is the shading stage's concern.
    pub fn hit(&self, ray: &Ray, positions: &[Point3; 3], t_max: f32) -> Option<TriangleHit> {
        // Vertices relative to the ray origin, sheared so the ray becomes
        // the z axis. x and y feed the edge tests, z keeps the hit distance.
        let sheared = positions.map(|position| {
            let v = position - ray.origin;
            let (x, y, z) = (v[self.axes[0]], v[self.axes[1]], v[self.axes[2]]);
            vector![x - self.shear.x * z, y - self.shear.y * z, self.shear.z * z]
        });

        // Scaled barycentric coordinates of the origin.
        let u = edge(sheared[2].xy(), sheared[1].xy());
        let v = edge(sheared[0].xy(), sheared[2].xy());
        let w = edge(sheared[1].xy(), sheared[0].xy());

        // Inside iff all three edge signs agree.
        if (u < 0.0 || v < 0.0 || w < 0.0) && (u > 0.0 || v > 0.0 || w > 0.0) {
            return None;
        }

        let det = u + v + w;
        if det == 0.0 {
            return None;
        }

        let t = (u * sheared[0].z + v * sheared[1].z + w * sheared[2].z) / det;
        if t <= RAY_EPSILON || t >= t_max {
            return None;
        }

        Some(TriangleHit {
            t,
            barycentrics: vector![u, v, w] / det,
        })
    }
}

//
// Ray vs. bounds
//

pub struct RayAabbIntersector {
    ray_dir_inv: Vec3,
    pub ray_dir_neg: Vec3b,
}

impl RayAabbIntersector {
    // Slab test based on PBRT, robustified with the gamma error bound.

    pub fn new(ray: &Ray) -> Self {
        let ray_dir_inv = vector![1.0 / ray.dir[0], 1.0 / ray.dir[1], 1.0 / ray.dir[2]];
        let ray_dir_neg = vector![
            ray_dir_inv.x < 0.0,
            ray_dir_inv.y < 0.0,
            ray_dir_inv.z < 0.0
        ];
        Self {
            ray_dir_inv,
            ray_dir_neg,
        }
    }

    #[inline]
    fn gamma(n: f32) -> f32 {
        const MACHINE_EPSILON: f32 = f32::EPSILON * 0.5;
        (n * MACHINE_EPSILON) / (1.0 - n * MACHINE_EPSILON)
    }

    // True when the slab interval overlaps the ray interval [0, t_max].
    pub fn hit(&self, ray: &Ray, aabb: &Aabb, t_max: f32) -> bool {
        let mut mn_t: f32;
        let mut mx_t: f32;
        if self.ray_dir_neg[0] {
            mn_t = aabb.max().x;
            mx_t = aabb.min().x;
        } else {
            mn_t = aabb.min().x;
            mx_t = aabb.max().x;
        }
        mn_t = (mn_t - ray.origin.x) * self.ray_dir_inv.x;
        mx_t = (mx_t - ray.origin.x) * self.ray_dir_inv.x * (1.0 + 2.0 * Self::gamma(3.0));

        for axis in 1..3 {
            let (slab_mn, slab_mx) = if self.ray_dir_neg[axis] {
                (aabb.max()[axis], aabb.min()[axis])
            } else {
                (aabb.min()[axis], aabb.max()[axis])
            };
            let slab_mn = (slab_mn - ray.origin[axis]) * self.ray_dir_inv[axis];
            let slab_mx =
                (slab_mx - ray.origin[axis]) * self.ray_dir_inv[axis] * (1.0 + 2.0 * Self::gamma(3.0));
            if mn_t > slab_mx || slab_mn > mx_t {
                return false;
            }
            if slab_mn > mn_t {
                mn_t = slab_mn;
            }
            if slab_mx < mx_t {
                mx_t = slab_mx;
            }
        }

        (mn_t < t_max) && (mx_t > 0.0)
    }
}

//
// Tests
//
