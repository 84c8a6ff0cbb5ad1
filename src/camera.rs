use super::*;

// Distance of the film plane from the pin-hole, in camera space.
const Z_NEAR: f32 = 1e-2;

// Pin-hole perspective camera. Camera space looks down +z with +y up; raster
// row zero is the top of the image. The UI mutations compose camera-space
// motions onto the world-to-camera transform between frames; the renderer
// treats the camera as immutable during a frame.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    world_to_camera: Transform,
    // Vertical field of view in degrees.
    fov_y: f32,
    resolution: (u32, u32),
    // Film plane half extents at Z_NEAR, derived from fov and aspect.
    screen_half: Vec2,
}

impl Camera {
    pub fn new(world_to_camera: Transform, fov_y: f32, resolution: (u32, u32)) -> Self {
        let mut camera = Self {
            world_to_camera,
            fov_y,
            resolution,
            screen_half: vector![0.0, 0.0],
        };
        camera.update_screen();
        camera
    }

    fn update_screen(&mut self) {
        let aspect = self.resolution.0 as f32 / self.resolution.1 as f32;
        let half_h = Z_NEAR * (0.5 * self.fov_y.to_radians()).tan();
        self.screen_half = vector![half_h * aspect, half_h];
    }

    #[inline]
    pub fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    #[inline]
    pub fn pixel_count(&self) -> u32 {
        self.resolution.0 * self.resolution.1
    }

    // Maps a continuous raster coordinate through the film plane into a
    // world-space ray from the pin-hole.
    pub fn generate_ray(&self, raster: (f32, f32)) -> Ray {
        let x = (raster.0 / self.resolution.0 as f32 * 2.0 - 1.0) * self.screen_half.x;
        let y = (1.0 - raster.1 / self.resolution.1 as f32 * 2.0) * self.screen_half.y;
        let camera_to_world = self.world_to_camera.inverse();
        let origin = camera_to_world.transform_point(&Point3::origin());
        let dir = camera_to_world.transform_vector(&vector![x, y, Z_NEAR]);
        Ray::new(origin, normal!(dir))
    }

    pub fn zoom(&mut self, d: f32) {
        self.world_to_camera =
            Transform::translation(&vector![0.0, 0.0, -d]) * self.world_to_camera;
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.world_to_camera =
            Transform::translation(&vector![-dx, -dy, 0.0]) * self.world_to_camera;
    }

    pub fn rotate(&mut self, yaw: f32, pitch: f32) {
        let yaw = Transform::rotation(&Normal::new_unchecked(vector![0.0, 1.0, 0.0]), yaw);
        let pitch = Transform::rotation(&Normal::new_unchecked(vector![1.0, 0.0, 0.0]), pitch);
        self.world_to_camera = pitch * yaw * self.world_to_camera;
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.resolution = (width, height);
        self.update_screen();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_ulps_eq;

    #[test]
    fn test_center_ray_looks_forward() {
        let camera = Camera::new(Transform::identity(), 60.0, (128, 64));
        let ray = camera.generate_ray((64.0, 32.0));
        assert_ulps_eq!(ray.origin.coords, vector![0.0, 0.0, 0.0], max_ulps = 1);
        assert_ulps_eq!(ray.dir.into_inner(), vector![0.0, 0.0, 1.0], epsilon = 1e-6);
    }

    #[test]
    fn test_vertical_fov() {
        let fov: f32 = 90.0;
        let camera = Camera::new(Transform::identity(), fov, (64, 64));
        // Top edge of the image, horizontally centered.
        let ray = camera.generate_ray((32.0, 0.0));
        let angle = ray.dir.y.atan2(ray.dir.z);
        assert_ulps_eq!(angle, (0.5 * fov).to_radians(), epsilon = 1e-5);
    }

    #[test]
    fn test_zoom_moves_along_view_axis() {
        let mut camera = Camera::new(Transform::identity(), 45.0, (32, 32));
        camera.zoom(2.0);
        let ray = camera.generate_ray((16.0, 16.0));
        assert_ulps_eq!(ray.origin.coords, vector![0.0, 0.0, 2.0], epsilon = 1e-6);
        assert_ulps_eq!(ray.dir.into_inner(), vector![0.0, 0.0, 1.0], epsilon = 1e-6);
    }

    #[test]
    fn test_rotate_preserves_position() {
        let mut camera = Camera::new(Transform::identity(), 45.0, (32, 32));
        camera.translate(1.0, 0.5);
        let before = camera.generate_ray((16.0, 16.0)).origin;
        camera.rotate(0.3, -0.2);
        let after = camera.generate_ray((16.0, 16.0)).origin;
        assert_ulps_eq!(before.coords, after.coords, epsilon = 1e-5);
    }

    #[test]
    fn test_resize_updates_aspect() {
        let mut camera = Camera::new(Transform::identity(), 90.0, (64, 64));
        let square = camera.generate_ray((64.0, 32.0));
        camera.resize(128, 64);
        let wide = camera.generate_ray((128.0, 32.0));
        // Wider aspect pushes the right edge further out.
        assert!(wide.dir.x > square.dir.x);
        assert_eq!(camera.resolution(), (128, 64));
    }
}
