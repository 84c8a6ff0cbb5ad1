use super::*;

//
// Uniform sampler
//

#[derive(Clone)]
pub struct UniformSampler {
    state: rand_pcg::Pcg64Mcg,
    distribution: rand::distributions::Uniform<f32>,
}

impl UniformSampler {
    pub fn new_with_seed(seed: u64) -> Self {
        Self {
            state: rand_pcg::Pcg64Mcg::seed_from_u64(seed),
            distribution: rand::distributions::Uniform::new(0.0, 1.0),
        }
    }

    // Independent stream per (pixel, sample) pair; draws within a stream
    // advance monotonically and are never reused.
    pub fn for_pixel_sample(pixel_index: u32, sample_index: u32) -> Self {
        let seed = (u64::from(pixel_index) << 32) | u64::from(sample_index);
        Self::new_with_seed(seed)
    }

    pub fn sample(&mut self) -> f32 {
        self.distribution.sample(&mut self.state)
    }
}

//
// Orthonormal basis
//

// Local shading space is right-handed with the normal along +y, so that
// cos(theta) of a local direction is just its y component.
#[derive(Clone, Copy)]
pub struct OrthonormalBasis {
    world_from_local: Mat3,
    local_from_world: Mat3,
}

impl OrthonormalBasis {
    // The tangent crosses the normal with the coordinate axis it is least
    // aligned with, which keeps both cross products well conditioned.
    pub fn new(n: &Normal) -> Self {
        let helper = if n.x.abs() <= n.y.abs() && n.x.abs() <= n.z.abs() {
            vector![1.0, 0.0, 0.0]
        } else if n.y.abs() <= n.z.abs() {
            vector![0.0, 1.0, 0.0]
        } else {
            vector![0.0, 0.0, 1.0]
        };
        let tangent = n.cross(&helper).normalize();
        let bitangent = tangent.cross(n);

        let world_from_local = Mat3::from_columns(&[tangent, n.into_inner(), bitangent]);
        let local_from_world = world_from_local.transpose();
        Self {
            world_from_local,
            local_from_world,
        }
    }

    pub fn world_from_local(&self) -> &Mat3 {
        &self.world_from_local
    }

    pub fn local_from_world(&self) -> &Mat3 {
        &self.local_from_world
    }
}

//
// Warps
//

// Cosine-weighted hemisphere around local +y: a uniform polar disk sample
// lifted onto the hemisphere (Malley's method).
pub fn hemisphere_cosine(s: f32, t: f32) -> Vec3 {
    let r = s.sqrt();
    let phi = TAU * t;
    let y = f32::sqrt(f32::max(0.0, 1.0 - s));
    vector![r * phi.cos(), y, r * phi.sin()]
}

pub fn hemisphere_cosine_pdf(cos_theta: f32) -> f32 {
    cos_theta * INV_PI
}

//
// Multiple importance sampling
//

// Power heuristic with beta = 2 for one sample taken from each strategy.
pub fn power_heuristic(f_pdf: f32, g_pdf: f32) -> f32 {
    let f2 = f_pdf * f_pdf;
    let g2 = g_pdf * g_pdf;
    f2 / (f2 + g2)
}

//
// Tests
//
