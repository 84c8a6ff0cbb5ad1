use super::*;

// One live path. The sampler is the path's private random stream; the MIS
// fields remember the bsdf pdf and the light picked by the previous bounce's
// light sampling, so the next closest hit can weight emission it lands on.
#[derive(Clone)]
pub struct PathState {
    pub pixel: u32,
    pub sampler: UniformSampler,
    pub throughput: ColorRgb,
    pub prev_bsdf_pdf: f32,
    pub prev_light: i32,
}

// Entry of the input/scatter queues: a path waiting for its closest hit.
#[derive(Clone)]
pub struct PathRay {
    pub state: PathState,
    pub ray: Ray,
    pub hit: Option<Interaction>,
}

// Entry of the shadow queue: a direct-lighting visibility ray carrying the
// radiance it contributes when unoccluded.
#[derive(Clone, Debug)]
pub struct ShadowRay {
    pub pixel: u32,
    pub ray: Ray,
    pub contribution: ColorRgb,
    pub occluded: bool,
}

// Fixed-capacity queue refilled once per bounce. Capacity equals the pixel
// count, since at most one path per pixel is alive at a time.
pub struct RayQueue<T> {
    items: Vec<T>,
    capacity: usize,
}

impl<T> RayQueue<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn push(&mut self, item: T) {
        assert!(self.items.len() < self.capacity, "ray queue overflow");
        self.items.push(item);
    }

    // Replaces the queue contents wholesale with a kernel's collected output.
    pub fn fill(&mut self, items: Vec<T>) {
        assert!(items.len() <= self.capacity, "ray queue overflow");
        self.items = items;
    }

    #[inline]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    #[inline]
    pub fn items_mut(&mut self) -> &mut [T] {
        &mut self.items
    }
}

// Per-bounce pipeline state: the bounce and sample indices plus the three
// queues the kernels read and write.
pub struct PtContext {
    pub bounce: u32,
    pub sample: u32,
    pub input: RayQueue<PathRay>,
    pub scatter: RayQueue<PathRay>,
    pub shadow: RayQueue<ShadowRay>,
}

impl PtContext {
    pub fn new(pixel_count: usize) -> Self {
        Self {
            bounce: 0,
            sample: 0,
            input: RayQueue::with_capacity(pixel_count),
            scatter: RayQueue::with_capacity(pixel_count),
            shadow: RayQueue::with_capacity(pixel_count),
        }
    }

    // Surviving paths become the next bounce's input.
    pub fn swap_input_scatter(&mut self) {
        mem::swap(&mut self.input, &mut self.scatter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_capacity_is_enforced() {
        let mut queue = RayQueue::with_capacity(2);
        queue.push(1);
        queue.push(2);
        assert_eq!(queue.len(), 2);
        assert!(std::panic::catch_unwind(move || queue.push(3)).is_err());
    }

    #[test]
    fn test_swap_moves_scatter_to_input() {
        let mut ctx = PtContext::new(4);
        ctx.scatter.push(PathRay {
            state: PathState {
                pixel: 3,
                sampler: UniformSampler::new_with_seed(0),
                throughput: ColorRgb::WHITE,
                prev_bsdf_pdf: 0.0,
                prev_light: -1,
            },
            ray: Ray::new(point![0.0, 0.0, 0.0], normal!(0.0, 0.0, 1.0)),
            hit: None,
        });
        ctx.swap_input_scatter();
        assert_eq!(ctx.input.len(), 1);
        assert!(ctx.scatter.is_empty());
        assert_eq!(ctx.input.items()[0].state.pixel, 3);
    }
}
