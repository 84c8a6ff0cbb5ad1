use super::*;

//
// Linear algebra aliases
//

pub type Point2 = na::Point2<f32>;
pub type Point3 = na::Point3<f32>;
pub type Vec2 = na::Vector2<f32>;
pub type Vec3 = na::Vector3<f32>;
pub type Vec3b = na::Vector3<bool>;
pub type Mat3 = na::Matrix3<f32>;
pub type Mat4 = na::Matrix4<f32>;
pub type Normal = na::Unit<na::Vector3<f32>>;

macro_rules! normal {
    ($x:expr, $y:expr, $z:expr) => {
        Normal::new_normalize(vector![$x, $y, $z])
    };
    ($v:expr) => {
        Normal::new_normalize($v)
    };
}
pub(crate) use normal;

//
// Interpolation
//

pub fn lerp_scalar<T: num::Float>(a: T, b: T, t: T) -> T {
    a * (T::one() - t) + b * t
}

//
// Geometric
//

// Flips `n` onto the hemisphere around `v`.
pub fn face_forward(n: Normal, v: &Vec3) -> Normal {
    if n.dot(v) < 0.0 {
        Normal::new_unchecked(-n.into_inner())
    } else {
        n
    }
}

//
// Tests
//

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_ulps_eq;

    #[test]
    fn test_lerp_scalar() {
        assert_ulps_eq!(lerp_scalar(0.0, 1.0, 0.0), 0.0, max_ulps = 1);
        assert_ulps_eq!(lerp_scalar(0.0, 1.0, 0.5), 0.5, max_ulps = 1);
        assert_ulps_eq!(lerp_scalar(0.0, 1.0, 1.0), 1.0, max_ulps = 1);
    }

    #[test]
    fn test_face_forward() {
        let n = normal!(0.0, 1.0, 0.0);
        let up = vector![0.1, 0.9, 0.0];
        let down = vector![0.1, -0.9, 0.0];
        assert_ulps_eq!(face_forward(n, &up).y, 1.0, max_ulps = 1);
        assert_ulps_eq!(face_forward(n, &down).y, -1.0, max_ulps = 1);
    }
}
