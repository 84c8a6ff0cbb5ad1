use std::{fmt, ops};

use super::*;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ColorRgb([f32; 3]);

impl ColorRgb {
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0);

    #[inline]
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self([r, g, b])
    }

    #[inline]
    pub const fn red(&self) -> f32 {
        self.0[0]
    }

    #[inline]
    pub const fn green(&self) -> f32 {
        self.0[1]
    }

    #[inline]
    pub const fn blue(&self) -> f32 {
        self.0[2]
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.0[0].is_finite() && self.0[1].is_finite() && self.0[2].is_finite()
    }

    #[inline]
    pub fn is_black(&self) -> bool {
        self.0 == [0.0, 0.0, 0.0]
    }

    #[inline]
    pub fn max_component(&self) -> f32 {
        self.0[0].max(self.0[1]).max(self.0[2])
    }

    // Non-finite and negative components collapse to zero, so a single bad
    // sample cannot poison a pixel accumulator.
    pub fn sanitized(self) -> Self {
        let clean = |x: f32| if x.is_finite() && x > 0.0 { x } else { 0.0 };
        Self([clean(self.0[0]), clean(self.0[1]), clean(self.0[2])])
    }

    pub fn tonemap(self) -> Self {
        // Reinhard: "Photographic Tone Reproduction for Digital Images".
        let reinhard = |x: f32| x / (1.0 + x);
        Self([
            reinhard(self.0[0]),
            reinhard(self.0[1]),
            reinhard(self.0[2]),
        ])
    }

    pub fn to_srgb_bytes(self) -> [u8; 3] {
        let quantize = |x: f32| {
            let x = x.clamp(0.0, 1.0).powf(1.0 / 2.2);
            (x * 255.0 + 0.5) as u8
        };
        [
            quantize(self.0[0]),
            quantize(self.0[1]),
            quantize(self.0[2]),
        ]
    }
}

impl ops::Add for ColorRgb {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self([
            self.0[0] + rhs.0[0],
            self.0[1] + rhs.0[1],
            self.0[2] + rhs.0[2],
        ])
    }
}

impl ops::AddAssign for ColorRgb {
    fn add_assign(&mut self, rhs: Self) {
        self.0[0] += rhs.0[0];
        self.0[1] += rhs.0[1];
        self.0[2] += rhs.0[2];
    }
}

impl ops::Mul for ColorRgb {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Self([
            self.0[0] * rhs.0[0],
            self.0[1] * rhs.0[1],
            self.0[2] * rhs.0[2],
        ])
    }
}

impl ops::MulAssign for ColorRgb {
    fn mul_assign(&mut self, rhs: Self) {
        self.0[0] *= rhs.0[0];
        self.0[1] *= rhs.0[1];
        self.0[2] *= rhs.0[2];
    }
}

impl ops::Mul<f32> for ColorRgb {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self::Output {
        Self([self.0[0] * rhs, self.0[1] * rhs, self.0[2] * rhs])
    }
}

impl ops::Mul<ColorRgb> for f32 {
    type Output = ColorRgb;

    fn mul(self, rhs: ColorRgb) -> Self::Output {
        rhs * self
    }
}

impl ops::Div<f32> for ColorRgb {
    type Output = Self;

    fn div(self, rhs: f32) -> Self::Output {
        Self([self.0[0] / rhs, self.0[1] / rhs, self.0[2] / rhs])
    }
}

impl fmt::Display for ColorRgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.red(), self.green(), self.blue())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_ulps_eq;

    #[test]
    fn test_sanitized() {
        let c = ColorRgb::new(f32::NAN, -1.0, 0.5).sanitized();
        assert_eq!(c.red(), 0.0);
        assert_eq!(c.green(), 0.0);
        assert_ulps_eq!(c.blue(), 0.5, max_ulps = 1);

        let c = ColorRgb::new(f32::INFINITY, 2.0, 0.0).sanitized();
        assert_eq!(c.red(), 0.0);
        assert_ulps_eq!(c.green(), 2.0, max_ulps = 1);
    }

    #[test]
    fn test_tonemap_is_bounded() {
        for x in [0.0, 0.5, 1.0, 17.0, 1.0e6] {
            let c = ColorRgb::new(x, x, x).tonemap();
            assert!(c.red() >= 0.0 && c.red() < 1.0);
        }
    }

    #[test]
    fn test_max_component() {
        assert_ulps_eq!(
            ColorRgb::new(0.1, 0.7, 0.3).max_component(),
            0.7,
            max_ulps = 1
        );
    }
}
