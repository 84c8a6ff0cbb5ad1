use super::*;

#[derive(Clone, Copy, Debug)]
pub struct Triangle {
    pub positions: [Point3; 3],
    pub normals: [Normal; 3],
    pub tex_coords: [Point2; 3],
    pub area: f32,
}

pub struct TriangleSample {
    pub p: Point3,
    pub normal: Normal,
    // With respect to surface area.
    pub pdf: f32,
}

impl Triangle {
    pub fn new(positions: [Point3; 3], normals: [Normal; 3], tex_coords: [Point2; 3]) -> Self {
        let e01 = positions[1] - positions[0];
        let e02 = positions[2] - positions[0];
        let area = 0.5 * e01.cross(&e02).norm();
        Self {
            positions,
            normals,
            tex_coords,
            area,
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(&self.positions)
    }

    pub fn centroid(&self) -> Point3 {
        Point3::from(
            (self.positions[0].coords + self.positions[1].coords + self.positions[2].coords) / 3.0,
        )
    }

    pub fn geometric_normal(&self) -> Normal {
        let e01 = self.positions[1] - self.positions[0];
        let e02 = self.positions[2] - self.positions[0];
        normal!(e01.cross(&e02))
    }

    pub fn point_at(&self, barycentrics: &Vec3) -> Point3 {
        Point3::from(
            self.positions[0].coords * barycentrics.x
                + self.positions[1].coords * barycentrics.y
                + self.positions[2].coords * barycentrics.z,
        )
    }

    pub fn interpolated_normal(&self, barycentrics: &Vec3) -> Normal {
        Normal::new_normalize(
            self.normals[0].into_inner() * barycentrics.x
                + self.normals[1].into_inner() * barycentrics.y
                + self.normals[2].into_inner() * barycentrics.z,
        )
    }

    pub fn interpolated_tex_coord(&self, barycentrics: &Vec3) -> Point2 {
        Point2::from(
            self.tex_coords[0].coords * barycentrics.x
                + self.tex_coords[1].coords * barycentrics.y
                + self.tex_coords[2].coords * barycentrics.z,
        )
    }

    // Uniform area sampling: warps the unit square onto barycentrics.
    pub fn sample(&self, s: f32, t: f32) -> TriangleSample {
        let su = s.sqrt();
        let barycentrics = vector![1.0 - su, su * (1.0 - t), su * t];
        TriangleSample {
            p: self.point_at(&barycentrics),
            normal: self.interpolated_normal(&barycentrics),
            pdf: 1.0 / self.area,
        }
    }
}
