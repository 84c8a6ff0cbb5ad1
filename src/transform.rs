use std::ops;

use super::*;

// A 4x4 homogeneous transform paired with its inverse. The inverse is computed
// once at construction so scene loading pays for the matrix inversion, not the
// render loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    m: Mat4,
    m_inv: Mat4,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            m: Mat4::identity(),
            m_inv: Mat4::identity(),
        }
    }

    pub fn from_matrix(m: Mat4) -> Result<Self> {
        let m_inv = m
            .try_inverse()
            .context("config error: Transform matrix is singular")?;
        Ok(Self { m, m_inv })
    }

    pub fn translation(v: &Vec3) -> Self {
        Self {
            m: Mat4::new_translation(v),
            m_inv: Mat4::new_translation(&-v),
        }
    }

    pub fn rotation(axis: &Normal, angle: f32) -> Self {
        Self {
            m: Mat4::from_axis_angle(axis, angle),
            m_inv: Mat4::from_axis_angle(axis, -angle),
        }
    }

    pub fn inverse(&self) -> Self {
        Self {
            m: self.m_inv,
            m_inv: self.m,
        }
    }

    #[inline]
    pub fn matrix(&self) -> &Mat4 {
        &self.m
    }

    #[inline]
    pub fn transform_point(&self, p: &Point3) -> Point3 {
        self.m.transform_point(p)
    }

    #[inline]
    pub fn transform_vector(&self, v: &Vec3) -> Vec3 {
        self.m.transform_vector(v)
    }

    // Normals transform by the inverse transpose to stay perpendicular under
    // non-uniform scaling.
    #[inline]
    pub fn transform_normal(&self, n: &Normal) -> Normal {
        normal!(self.m_inv.transpose().transform_vector(n))
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl ops::Mul for Transform {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Self {
            m: self.m * rhs.m,
            m_inv: rhs.m_inv * self.m_inv,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_ulps_eq;

    #[test]
    fn test_inverse_round_trip() {
        let t = Transform::translation(&vector![1.0, 2.0, 3.0])
            * Transform::rotation(&Normal::new_normalize(vector![0.0, 1.0, 0.0]), 0.7);
        let p = point![0.5, -1.0, 2.0];
        let q = t.inverse().transform_point(&t.transform_point(&p));
        assert_ulps_eq!(p.coords, q.coords, epsilon = 1e-5);
    }

    #[test]
    fn test_from_matrix_rejects_singular() {
        assert!(Transform::from_matrix(Mat4::zeros()).is_err());
    }

    #[test]
    fn test_normal_transform_stays_perpendicular() {
        let t = Transform::from_matrix(Mat4::new_nonuniform_scaling(&vector![2.0, 1.0, 1.0]))
            .unwrap();
        let tangent = vector![1.0, 1.0, 0.0];
        let n = normal!(-1.0, 1.0, 0.0);
        let tangent = t.transform_vector(&tangent);
        let n = t.transform_normal(&n);
        assert_ulps_eq!(n.dot(&tangent), 0.0, epsilon = 1e-6);
    }
}
