use super::*;

// Probability densities below this are treated as failed samples.
const PDF_EPSILON: f32 = 1e-4;

//
// Local directions
//

// A direction expressed in the shading frame, geometric normal = (0,1,0).
#[derive(Clone, Copy, Debug)]
pub struct LocalVector(pub Vec3);

impl LocalVector {
    #[inline]
    pub fn local_from_world(local_from_world: &Mat3, world: &Vec3) -> Self {
        Self((local_from_world * world).normalize())
    }

    #[inline]
    pub fn world_from_local(&self, world_from_local: &Mat3) -> Normal {
        normal!(world_from_local * self.0)
    }

    #[inline]
    pub fn cos_theta(&self) -> f32 {
        self.0.y
    }

    #[inline]
    pub fn same_hemisphere(&self, other: &Self) -> bool {
        self.0.y * other.0.y > 0.0
    }
}

//
// Materials
//

#[derive(Clone, Copy, Debug)]
pub struct BsdfSample {
    pub wi: LocalVector,
    pub r: ColorRgb,
    pub pdf: f32,
}

// The closed set of material models. Dispatch is a branch on the tag; new
// models become new variants.
#[derive(Clone, Copy, Debug)]
pub enum Material {
    Matte { reflectance: ColorRgb },
}

impl Material {
    pub fn eval(&self, wo: &LocalVector, wi: &LocalVector) -> ColorRgb {
        match self {
            Self::Matte { reflectance } => {
                if wo.same_hemisphere(wi) && wi.cos_theta() > 0.0 {
                    *reflectance * INV_PI
                } else {
                    ColorRgb::BLACK
                }
            }
        }
    }

    pub fn pdf(&self, wo: &LocalVector, wi: &LocalVector) -> f32 {
        match self {
            Self::Matte { .. } => {
                if wo.same_hemisphere(wi) {
                    hemisphere_cosine_pdf(wi.cos_theta().max(0.0))
                } else {
                    0.0
                }
            }
        }
    }

    pub fn sample(&self, wo: &LocalVector, u: (f32, f32)) -> Option<BsdfSample> {
        match self {
            Self::Matte { .. } => {
                let wi = LocalVector(hemisphere_cosine(u.0, u.1));
                let pdf = self.pdf(wo, &wi);
                if pdf > PDF_EPSILON {
                    Some(BsdfSample {
                        r: self.eval(wo, &wi),
                        wi,
                        pdf,
                    })
                } else {
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_ulps_eq;

    #[test]
    fn test_matte_eval_is_reflectance_over_pi() {
        let material = Material::Matte {
            reflectance: ColorRgb::new(0.5, 0.25, 1.0),
        };
        let wo = LocalVector(vector![0.0, 1.0, 0.0]);
        let wi = LocalVector(hemisphere_cosine(0.3, 0.6));
        let f = material.eval(&wo, &wi);
        assert_ulps_eq!(f.red(), 0.5 * INV_PI, max_ulps = 2);
        assert_ulps_eq!(f.green(), 0.25 * INV_PI, max_ulps = 2);
    }

    #[test]
    fn test_matte_rejects_transmission() {
        let material = Material::Matte {
            reflectance: ColorRgb::WHITE,
        };
        let wo = LocalVector(vector![0.0, 1.0, 0.0]);
        let below = LocalVector(vector![0.0, -1.0, 0.0]);
        assert!(material.eval(&wo, &below).is_black());
        assert_ulps_eq!(material.pdf(&wo, &below), 0.0, max_ulps = 1);
    }

    // Cosine sampling cancels the cosine-weighted Lambertian exactly, so the
    // one-bounce throughput factor equals the reflectance.
    #[test]
    fn test_matte_one_bounce_throughput_equals_reflectance() {
        let reflectance = ColorRgb::new(0.7, 0.3, 0.9);
        let material = Material::Matte { reflectance };
        let wo = LocalVector(vector![0.3, 0.8, 0.1].normalize());
        let mut sampler = UniformSampler::new_with_seed(21);
        for _ in 0..128 {
            let Some(s) = material.sample(&wo, (sampler.sample(), sampler.sample())) else {
                continue;
            };
            let throughput = s.r * s.wi.cos_theta().abs() / s.pdf;
            assert_ulps_eq!(throughput.red(), reflectance.red(), epsilon = 1e-4);
            assert_ulps_eq!(throughput.green(), reflectance.green(), epsilon = 1e-4);
            assert_ulps_eq!(throughput.blue(), reflectance.blue(), epsilon = 1e-4);
        }
    }
}
