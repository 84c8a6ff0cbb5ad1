use super::*;

#[repr(C)]
#[derive(Pod, Zeroable, Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    mn: Point3,
    mx: Point3,
}

impl Aabb {
    #[inline]
    pub fn new() -> Self {
        Self {
            mn: Vec3::repeat(f32::MAX).into(),
            mx: Vec3::repeat(-f32::MAX).into(),
        }
    }

    #[inline]
    pub fn from_min_max(mn: &Point3, mx: &Point3) -> Self {
        Self { mn: *mn, mx: *mx }
    }

    pub fn from_points<'a, Iter>(points: Iter) -> Self
    where
        Iter: IntoIterator<Item = &'a Point3>,
    {
        let mut aabb = Self::new();
        for point in points {
            aabb.extend(point);
        }
        aabb
    }

    #[inline]
    pub fn min(&self) -> Point3 {
        self.mn
    }

    #[inline]
    pub fn max(&self) -> Point3 {
        self.mx
    }

    #[inline]
    pub fn center(&self) -> Point3 {
        na::center(&self.mn, &self.mx)
    }

    #[inline]
    pub fn extents(&self) -> Vec3 {
        self.mx - self.mn
    }

    pub fn extend(&mut self, point: &Point3) {
        self.mn = self.mn.inf(point);
        self.mx = self.mx.sup(point);
    }

    pub fn union(&self, other: &Aabb) -> Self {
        Self {
            mn: self.mn.inf(&other.mn),
            mx: self.mx.sup(&other.mx),
        }
    }

    pub fn contains(&self, other: &Aabb) -> bool {
        self.mn.coords <= other.mn.coords && self.mx.coords >= other.mx.coords
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_ulps_eq;

    #[test]
    fn test_extend_and_union() {
        let mut a = Aabb::new();
        a.extend(&point![0.0, 0.0, 0.0]);
        a.extend(&point![1.0, 2.0, 3.0]);
        assert_ulps_eq!(a.extents().y, 2.0, max_ulps = 1);

        let b = Aabb::from_min_max(&point![-1.0, 0.0, 0.0], &point![0.5, 1.0, 1.0]);
        let u = a.union(&b);
        assert_ulps_eq!(u.min().x, -1.0, max_ulps = 1);
        assert_ulps_eq!(u.max().z, 3.0, max_ulps = 1);
        assert!(u.contains(&a));
        assert!(u.contains(&b));
        assert!(!a.contains(&b));
    }

    #[test]
    fn test_center() {
        let a = Aabb::from_min_max(&point![0.0, 0.0, 0.0], &point![2.0, 4.0, 6.0]);
        assert_ulps_eq!(a.center().coords, vector![1.0, 2.0, 3.0], max_ulps = 1);
    }
}
