use super::*;

// Per-pixel accumulator: an RGB running sum and a sample count. The f32 lanes
// are stored as bit patterns in `AtomicU32`, so kernels share the film by
// reference and accumulate with lock-free additions.
#[derive(Default)]
struct Pixel {
    sum: [AtomicU32; 3],
    samples: AtomicU32,
}

fn atomic_add_f32(slot: &AtomicU32, value: f32) {
    let mut current = slot.load(Ordering::Relaxed);
    loop {
        let next = (f32::from_bits(current) + value).to_bits();
        match slot.compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => break,
            Err(observed) => current = observed,
        }
    }
}

pub struct Film {
    resolution: (u32, u32),
    pixels: Vec<Pixel>,
}

impl Film {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        ensure!(
            width > 0 && height > 0,
            "resource error: film must have a non-zero resolution, got {width}x{height}"
        );
        let pixels = (0..width as usize * height as usize)
            .map(|_| Pixel::default())
            .collect();
        Ok(Self {
            resolution: (width, height),
            pixels,
        })
    }

    #[inline]
    pub fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    #[inline]
    pub fn pixel_count(&self) -> u32 {
        self.resolution.0 * self.resolution.1
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        *self = Self::new(width, height)?;
        Ok(())
    }

    pub fn clear(&mut self) {
        for pixel in &mut self.pixels {
            for lane in &mut pixel.sum {
                *lane.get_mut() = 0;
            }
            *pixel.samples.get_mut() = 0;
        }
    }

    // Accumulates one radiance contribution. Non-finite and negative
    // components are dropped so one bad sample cannot poison the pixel.
    pub fn add_radiance(&self, pixel: u32, radiance: ColorRgb) {
        let radiance = radiance.sanitized();
        if radiance.is_black() {
            return;
        }
        let slot = &self.pixels[pixel as usize];
        atomic_add_f32(&slot.sum[0], radiance.red());
        atomic_add_f32(&slot.sum[1], radiance.green());
        atomic_add_f32(&slot.sum[2], radiance.blue());
    }

    // Bumps every pixel's sample count; called once per finished sample pass.
    pub fn finish_sample(&self) {
        self.pixels.par_iter().for_each(|pixel| {
            pixel.samples.fetch_add(1, Ordering::Relaxed);
        });
    }

    pub fn sample_count(&self, pixel: u32) -> u32 {
        self.pixels[pixel as usize].samples.load(Ordering::Relaxed)
    }

    // Current estimate: running sum divided by the sample count.
    pub fn radiance(&self, pixel: u32) -> ColorRgb {
        let slot = &self.pixels[pixel as usize];
        let samples = slot.samples.load(Ordering::Relaxed);
        if samples == 0 {
            return ColorRgb::BLACK;
        }
        let lane = |i: usize| f32::from_bits(slot.sum[i].load(Ordering::Relaxed));
        ColorRgb::new(lane(0), lane(1), lane(2)) / samples as f32
    }

    pub fn mean_radiance(&self) -> ColorRgb {
        let mut mean = ColorRgb::BLACK;
        for pixel in 0..self.pixel_count() {
            mean += self.radiance(pixel);
        }
        mean / self.pixel_count() as f32
    }

    // Tone-mapped, gamma-encoded 8-bit output.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for pixel in 0..self.pixel_count() {
            let [r, g, b] = self.radiance(pixel).tonemap().to_srgb_bytes();
            bytes.extend_from_slice(&[r, g, b, 0xff]);
        }
        bytes
    }

    pub fn write_png(&self, path: &Path) -> Result<()> {
        let bytes = self.to_rgba8();
        imagelib::save_buffer(
            path,
            &bytes,
            self.resolution.0,
            self.resolution.1,
            imagelib::ColorType::Rgba8,
        )
        .with_context(|| format!("writing image to {}", path.display()))?;
        info!("wrote {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_ulps_eq;

    #[test]
    fn test_zero_resolution_fails() {
        assert!(Film::new(0, 32).is_err());
        assert!(Film::new(32, 0).is_err());
    }

    #[test]
    fn test_accumulation_and_average() {
        let film = Film::new(2, 1).unwrap();
        film.add_radiance(0, ColorRgb::new(1.0, 2.0, 3.0));
        film.finish_sample();
        film.add_radiance(0, ColorRgb::new(3.0, 2.0, 1.0));
        film.finish_sample();

        let average = film.radiance(0);
        assert_ulps_eq!(average.red(), 2.0, max_ulps = 1);
        assert_ulps_eq!(average.green(), 2.0, max_ulps = 1);
        assert_ulps_eq!(average.blue(), 2.0, max_ulps = 1);
        assert_eq!(film.sample_count(1), 2);
        assert!(film.radiance(1).is_black());
    }

    #[test]
    fn test_bad_samples_are_dropped() {
        let film = Film::new(1, 1).unwrap();
        film.add_radiance(0, ColorRgb::new(f32::NAN, f32::INFINITY, -5.0));
        film.finish_sample();
        assert!(film.radiance(0).is_black());
    }

    #[test]
    fn test_clear_resets_counts() {
        let mut film = Film::new(2, 2).unwrap();
        film.add_radiance(3, ColorRgb::WHITE);
        film.finish_sample();
        film.clear();
        assert_eq!(film.sample_count(3), 0);
        assert!(film.radiance(3).is_black());
    }

    #[test]
    fn test_concurrent_adds_commute() {
        let film = Film::new(1, 1).unwrap();
        (0..1024_u32).into_par_iter().for_each(|_| {
            film.add_radiance(0, ColorRgb::new(1.0, 0.5, 0.25));
        });
        film.finish_sample();
        let total = film.radiance(0);
        assert_ulps_eq!(total.red(), 1024.0, epsilon = 1e-2);
        assert_ulps_eq!(total.green(), 512.0, epsilon = 1e-2);
    }

    #[test]
    fn test_to_rgba8_shape() {
        let film = Film::new(3, 2).unwrap();
        film.finish_sample();
        let bytes = film.to_rgba8();
        assert_eq!(bytes.len(), 3 * 2 * 4);
        assert!(bytes.chunks(4).all(|px| px[3] == 0xff));
    }
}
