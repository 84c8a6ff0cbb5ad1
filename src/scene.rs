use super::*;

#[derive(Clone, Copy, Debug)]
pub struct Primitive {
    pub shape: u32,
    pub material: u32,
    // Index into the light table, -1 when the primitive does not emit.
    pub light: i32,
}

#[derive(Clone, Copy, Debug)]
pub struct Light {
    pub shape: u32,
    pub radiance: ColorRgb,
    // Always false for area lights; kept so delta sources slot in without
    // touching the estimator.
    pub delta: bool,
}

// One surface interaction. Normals are the raw geometric data; the shading
// stage decides about sidedness.
#[derive(Clone, Copy, Debug)]
pub struct Interaction {
    pub p: Point3,
    pub t: f32,
    pub geometric_normal: Normal,
    pub shading_normal: Normal,
    pub wo: Normal,
    pub primitive: u32,
}

// Immutable, flattened view of everything the kernels read: parallel arrays
// addressed by plain integer ids, the BVH over them, and the camera. Shared
// freely across threads during rendering.
pub struct Scene {
    pub triangles: Vec<Triangle>,
    pub primitives: Vec<Primitive>,
    pub materials: Vec<Material>,
    pub lights: Vec<Light>,
    pub camera: Camera,
    bvh: bvh::Bvh,
}

impl Scene {
    pub fn new(
        triangles: Vec<Triangle>,
        primitives: Vec<Primitive>,
        materials: Vec<Material>,
        lights: Vec<Light>,
        camera: Camera,
    ) -> Result<Self> {
        ensure!(
            !primitives.is_empty(),
            "geometry error: scene contains no primitives"
        );
        for (id, primitive) in primitives.iter().enumerate() {
            ensure!(
                (primitive.shape as usize) < triangles.len(),
                "geometry error: primitive {id} references missing shape {}",
                primitive.shape
            );
            ensure!(
                (primitive.material as usize) < materials.len(),
                "geometry error: primitive {id} references missing material {}",
                primitive.material
            );
            ensure!(
                triangles[primitive.shape as usize].area > 0.0,
                "geometry error: primitive {id} has a degenerate triangle"
            );
            if primitive.light >= 0 {
                let light = lights
                    .get(primitive.light as usize)
                    .with_context(|| format!("geometry error: primitive {id} references missing light"))?;
                ensure!(
                    light.shape == primitive.shape,
                    "geometry error: light {} does not cover primitive {id}",
                    primitive.light
                );
            }
        }
        for (id, light) in lights.iter().enumerate() {
            ensure!(
                (light.shape as usize) < triangles.len(),
                "geometry error: light {id} references missing shape {}",
                light.shape
            );
        }

        let bvh = bvh::Bvh::build(&primitives, &triangles)?;
        info!(
            "scene: {} triangles, {} materials, {} lights, {} bvh nodes",
            triangles.len(),
            materials.len(),
            lights.len(),
            bvh.node_count()
        );
        Ok(Self {
            triangles,
            primitives,
            materials,
            lights,
            camera,
            bvh,
        })
    }

    // Occlusion query against [0, ray.t_max).
    pub fn intersect(&self, ray: &Ray) -> bool {
        self.bvh.any_hit(&self.primitives, &self.triangles, ray)
    }

    // Closest-hit query with the full surface interaction.
    pub fn intersect_p(&self, ray: &Ray) -> Option<Interaction> {
        let mut ray = *ray;
        let hit = self
            .bvh
            .closest_hit(&self.primitives, &self.triangles, &mut ray)?;
        let primitive = &self.primitives[hit.primitive as usize];
        let triangle = &self.triangles[primitive.shape as usize];
        Some(Interaction {
            p: triangle.point_at(&hit.barycentrics),
            t: hit.t,
            geometric_normal: triangle.geometric_normal(),
            shading_normal: triangle.interpolated_normal(&hit.barycentrics),
            wo: Normal::new_unchecked(-ray.dir.into_inner()),
            primitive: hit.primitive,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn quad(transform: &Transform) -> [Triangle; 2] {
        // Unit quad in the xz plane with +y normals, corners at +-1.
        let corners = [
            point![-1.0, 0.0, -1.0],
            point![1.0, 0.0, -1.0],
            point![1.0, 0.0, 1.0],
            point![-1.0, 0.0, 1.0],
        ]
        .map(|p| transform.transform_point(&p));
        let n = transform.transform_normal(&normal!(0.0, 1.0, 0.0));
        let uv = [point![0.0, 0.0]; 3];
        [
            Triangle::new([corners[0], corners[1], corners[2]], [n; 3], uv),
            Triangle::new([corners[0], corners[2], corners[3]], [n; 3], uv),
        ]
    }

    fn two_quad_scene() -> Scene {
        // Lower diffuse quad at y=0, upper emissive quad at y=2.
        let lower = quad(&Transform::identity());
        let upper = quad(&Transform::translation(&vector![0.0, 2.0, 0.0]));
        let triangles = vec![lower[0], lower[1], upper[0], upper[1]];
        let primitives = vec![
            Primitive { shape: 0, material: 0, light: -1 },
            Primitive { shape: 1, material: 0, light: -1 },
            Primitive { shape: 2, material: 1, light: 0 },
            Primitive { shape: 3, material: 1, light: 1 },
        ];
        let materials = vec![
            Material::Matte { reflectance: ColorRgb::new(0.725, 0.71, 0.68) },
            Material::Matte { reflectance: ColorRgb::BLACK },
        ];
        let lights = vec![
            Light { shape: 2, radiance: ColorRgb::WHITE, delta: false },
            Light { shape: 3, radiance: ColorRgb::WHITE, delta: false },
        ];
        let camera = Camera::new(Transform::identity(), 45.0, (4, 4));
        Scene::new(triangles, primitives, materials, lights, camera).unwrap()
    }

    #[test]
    fn test_intersect_p_reports_nearest() {
        let scene = two_quad_scene();
        let ray = Ray::new(point![0.2, 5.0, 0.2], normal!(0.0, -1.0, 0.0));
        let interaction = scene.intersect_p(&ray).expect("must hit the upper quad");
        let primitive = &scene.primitives[interaction.primitive as usize];
        assert!(primitive.light >= 0, "nearest surface is the emitter");
        assert!((interaction.t - 3.0).abs() < 1e-4);
        assert!(interaction.wo.y > 0.0);
        assert!(interaction.geometric_normal.y.abs() > 0.99);
        assert!(interaction.shading_normal.y.abs() > 0.99);
    }

    #[test]
    fn test_intersect_respects_t_max() {
        let scene = two_quad_scene();
        let down = Ray::new(point![0.0, 5.0, 0.0], normal!(0.0, -1.0, 0.0));
        assert!(scene.intersect(&down));
        let short = Ray::with_t_max(point![0.0, 5.0, 0.0], normal!(0.0, -1.0, 0.0), 1.0);
        assert!(!scene.intersect(&short));
    }

    #[test]
    fn test_invariant_validation() {
        let lower = quad(&Transform::identity());
        let triangles = vec![lower[0], lower[1]];
        let materials = vec![Material::Matte { reflectance: ColorRgb::WHITE }];
        let camera = Camera::new(Transform::identity(), 45.0, (4, 4));

        // Light table mismatch: primitive claims a light over another shape.
        let primitives = vec![
            Primitive { shape: 0, material: 0, light: 0 },
            Primitive { shape: 1, material: 0, light: -1 },
        ];
        let lights = vec![Light { shape: 1, radiance: ColorRgb::WHITE, delta: false }];
        assert!(Scene::new(triangles, primitives, materials, lights, camera).is_err());
    }
}
