use super::*;

#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Point3,
    pub dir: Normal,
    pub t_max: f32,
}

impl Ray {
    #[inline]
    pub fn new(origin: Point3, dir: Normal) -> Self {
        Self {
            origin,
            dir,
            t_max: f32::INFINITY,
        }
    }

    #[inline]
    pub fn with_t_max(origin: Point3, dir: Normal, t_max: f32) -> Self {
        Self { origin, dir, t_max }
    }

    // Spawns a ray leaving a surface, nudged off the surface point.
    #[inline]
    pub fn spawn(p: Point3, dir: Normal) -> Self {
        Self::new(p + dir.into_inner() * RAY_EPSILON, dir)
    }

    #[inline]
    pub fn at(&self, t: f32) -> Point3 {
        self.origin + self.dir.into_inner() * t
    }
}
