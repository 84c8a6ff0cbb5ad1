use super::*;

// The public engine surface: owns the scene, the film and the wavefront
// queues, and advances the image one sample per pixel at a time. Camera
// mutations mark the accumulator dirty; the reset happens lazily at the next
// render call, so a burst of UI events costs one reset.
pub struct PathTracer {
    scene: Scene,
    film: Film,
    params: RenderParams,
    ctx: PtContext,
    sample_index: u32,
    sum_bounces: u64,
    reset_pending: bool,
}

impl PathTracer {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading scene description {}", path.display()))?;
        Self::from_description(&text)
            .with_context(|| format!("loading scene {}", path.display()))
    }

    pub fn from_description(text: &str) -> Result<Self> {
        let api::ParsedScene { scene, params } = api::parse_description(text)?;
        let (width, height) = scene.camera.resolution();
        let film = Film::new(width, height)?;
        let ctx = PtContext::new(film.pixel_count() as usize);
        Ok(Self {
            scene,
            film,
            params,
            ctx,
            sample_index: 0,
            sum_bounces: 0,
            reset_pending: false,
        })
    }

    #[inline]
    pub fn resolution(&self) -> (u32, u32) {
        self.film.resolution()
    }

    #[inline]
    pub fn samples_per_pixel(&self) -> u32 {
        self.params.samples_per_pixel
    }

    pub fn pixel_radiance(&self, x: u32, y: u32) -> ColorRgb {
        self.film.radiance(y * self.film.resolution().0 + x)
    }

    pub fn pixel_sample_count(&self, x: u32, y: u32) -> u32 {
        self.film.sample_count(y * self.film.resolution().0 + x)
    }

    pub fn mean_radiance(&self) -> ColorRgb {
        self.film.mean_radiance()
    }

    // Advances the accumulator by one sample per pixel. When a buffer is
    // given it receives the current tone-mapped rgba image.
    pub fn render_one_sample(&mut self, output: Option<&mut Vec<u8>>) -> Result<()> {
        if mem::take(&mut self.reset_pending) {
            self.reset();
        }
        self.ctx.sample = self.sample_index;
        let timer = Instant::now();
        let traced = integrator::render_pass(&mut self.ctx, &self.scene, &self.film, &self.params);
        self.sample_index += 1;
        self.sum_bounces += traced;
        debug!(
            "sample {}: {} path rays in {:.3?}, mean path length {:.2}",
            self.sample_index,
            traced,
            timer.elapsed(),
            traced as f64 / f64::from(self.film.pixel_count())
        );
        if let Some(buffer) = output {
            *buffer = self.film.to_rgba8();
        }
        Ok(())
    }

    // Renders a fixed sample count and writes the result as "{n}spp.png".
    pub fn render(&mut self, samples: u32) -> Result<()> {
        use indicatif::{ProgressBar, ProgressStyle};

        let timer = Instant::now();
        let progress = ProgressBar::new(u64::from(samples)).with_style(
            ProgressStyle::with_template("{wide_bar} elapsed={elapsed_precise} eta={eta_precise}")?,
        );
        for _ in 0..samples {
            self.render_one_sample(None)?;
            progress.inc(1);
        }
        progress.finish_and_clear();

        let elapsed = timer.elapsed().as_secs_f64();
        info!(
            "rendered {} samples in {:.3} s, {:.3e} rays/s, mean path length {:.2}",
            samples,
            elapsed,
            self.sum_bounces as f64 / elapsed,
            self.sum_bounces as f64
                / (f64::from(self.film.pixel_count()) * f64::from(self.sample_index.max(1)))
        );
        self.output(format!("{}spp.png", self.sample_index))
    }

    pub fn output(&self, path: impl AsRef<Path>) -> Result<()> {
        self.film.write_png(path.as_ref())
    }

    pub fn zoom(&mut self, delta: f32) {
        self.scene.camera.zoom(delta);
        self.reset_pending = true;
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.scene.camera.translate(dx, dy);
        self.reset_pending = true;
    }

    pub fn rotate(&mut self, yaw: f32, pitch: f32) {
        self.scene.camera.rotate(yaw, pitch);
        self.reset_pending = true;
    }

    // Resizing reallocates the film and the queues for the new pixel count.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.scene.camera.resize(width, height);
        self.film.resize(width, height)?;
        self.ctx = PtContext::new(self.film.pixel_count() as usize);
        self.reset_pending = true;
        Ok(())
    }

    fn reset(&mut self) {
        self.sample_index = 0;
        self.sum_bounces = 0;
        self.film.clear();
    }
}
