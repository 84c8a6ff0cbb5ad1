use super::*;

#[derive(Clone, Copy, Debug)]
pub struct RenderParams {
    pub samples_per_pixel: u32,
    pub max_depth: u32,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            samples_per_pixel: 64,
            max_depth: 5,
        }
    }
}

// One full sample per pixel: primary rays feed the input queue, then each
// bounce runs trace -> shade -> shadow trace -> accumulate and the surviving
// paths swap back in as the next input. Every kernel is a data-parallel map
// over one queue; the driver stays single-threaded and the end of each
// dispatch is the barrier between kernels. Returns the number of path rays
// traced.
pub fn render_pass(
    ctx: &mut PtContext,
    scene: &Scene,
    film: &Film,
    params: &RenderParams,
) -> u64 {
    generate_primary_rays(ctx, scene);
    let mut traced = 0_u64;
    for bounce in 0..params.max_depth {
        ctx.bounce = bounce;
        if ctx.input.is_empty() {
            break;
        }
        traced += ctx.input.len() as u64;

        trace_closest(&mut ctx.input, scene);
        ctx.scatter.clear();
        ctx.shadow.clear();
        shade_hit(ctx, scene, film);
        trace_shadow(&mut ctx.shadow, scene);
        accumulate(&ctx.shadow, film);

        ctx.swap_input_scatter();
    }
    film.finish_sample();
    traced
}

// Seeds one path per pixel and jitters the primary ray inside the pixel.
pub fn generate_primary_rays(ctx: &mut PtContext, scene: &Scene) {
    let camera = &scene.camera;
    let (width, _) = camera.resolution();
    let sample = ctx.sample;
    let items = (0..camera.pixel_count())
        .into_par_iter()
        .map(|pixel| {
            let mut sampler = UniformSampler::for_pixel_sample(pixel, sample);
            let x = (pixel % width) as f32 + sampler.sample();
            let y = (pixel / width) as f32 + sampler.sample();
            let ray = camera.generate_ray((x, y));
            PathRay {
                state: PathState {
                    pixel,
                    sampler,
                    throughput: ColorRgb::WHITE,
                    prev_bsdf_pdf: 0.0,
                    prev_light: -1,
                },
                ray,
                hit: None,
            }
        })
        .collect();
    ctx.input.fill(items);
}

// Closest-hit pass over the input queue.
pub fn trace_closest(queue: &mut RayQueue<PathRay>, scene: &Scene) {
    queue.items_mut().par_iter_mut().for_each(|item| {
        item.hit = scene.intersect_p(&item.ray);
    });
}

// Occlusion pass over the shadow queue.
pub fn trace_shadow(queue: &mut RayQueue<ShadowRay>, scene: &Scene) {
    queue.items_mut().par_iter_mut().for_each(|item| {
        item.occluded = scene.intersect(&item.ray);
    });
}

// Folds the unoccluded direct-lighting contributions into the film.
pub fn accumulate(queue: &RayQueue<ShadowRay>, film: &Film) {
    queue.items().par_iter().for_each(|item| {
        if !item.occluded {
            film.add_radiance(item.pixel, item.contribution);
        }
    });
}

struct ShadeOutput {
    scatter: Option<PathRay>,
    shadow: Option<ShadowRay>,
}

// Shading pass: emission, next-event estimation, bsdf sampling and Russian
// roulette for every path with a valid hit. Emits at most one shadow ray and
// one continuation per path; the driver compacts the collected outputs into
// the shadow and scatter queues, which is the synchronisation point between
// this dispatch and the downstream kernels.
pub fn shade_hit(ctx: &mut PtContext, scene: &Scene, film: &Film) {
    let bounce = ctx.bounce;
    let outputs = ctx
        .input
        .items()
        .par_iter()
        .map(|item| shade_one(item, bounce, scene, film))
        .collect::<Vec<_>>();
    for output in outputs {
        if let Some(shadow) = output.shadow {
            ctx.shadow.push(shadow);
        }
        if let Some(scatter) = output.scatter {
            ctx.scatter.push(scatter);
        }
    }
}

fn shade_one(item: &PathRay, bounce: u32, scene: &Scene, film: &Film) -> ShadeOutput {
    let mut output = ShadeOutput {
        scatter: None,
        shadow: None,
    };
    let Some(hit) = &item.hit else {
        return output;
    };
    let mut state = item.state.clone();
    let primitive = &scene.primitives[hit.primitive as usize];
    let material = &scene.materials[primitive.material as usize];

    if primitive.light >= 0 {
        let light = &scene.lights[primitive.light as usize];
        // Emission is one-sided; the path must arrive from the exterior.
        if hit.shading_normal.dot(&hit.wo) > 0.0 {
            if bounce == 0 {
                // Camera-visible emission. Later bounces are covered by the
                // light sampling below, except for the bsdf-side term.
                film.add_radiance(state.pixel, state.throughput * light.radiance);
            } else if primitive.light == state.prev_light {
                // The previous bounce's bsdf sample landed on the light it
                // had picked for light sampling: weight the emission against
                // the light sampling pdf of the same path.
                let light_triangle = &scene.triangles[light.shape as usize];
                let cos_light = hit.shading_normal.dot(&hit.wo);
                let p_light = hit.t * hit.t / (cos_light * light_triangle.area);
                let weight = power_heuristic(state.prev_bsdf_pdf, p_light);
                let choose_pdf = 1.0 / scene.lights.len() as f32;
                film.add_radiance(
                    state.pixel,
                    state.throughput * light.radiance * weight / choose_pdf,
                );
            }
        }
    }
    state.prev_light = -1;

    // Shading frame over the face-forwarded shading normal.
    let n = face_forward(hit.shading_normal, &hit.wo);
    let onb = OrthonormalBasis::new(&n);
    let wo_local = LocalVector::local_from_world(onb.local_from_world(), &hit.wo);

    // Next-event estimation: sample one light uniformly, convert its area
    // pdf to solid angle and weigh both strategies with the power heuristic.
    if !scene.lights.is_empty() {
        let choose_pdf = 1.0 / scene.lights.len() as f32;
        let pick = (state.sampler.sample() * scene.lights.len() as f32) as usize;
        let light_index = pick.min(scene.lights.len() - 1);
        let light = &scene.lights[light_index];
        let light_triangle = &scene.triangles[light.shape as usize];
        let light_sample = light_triangle.sample(state.sampler.sample(), state.sampler.sample());

        let to_light = light_sample.p - hit.p;
        let dist2 = to_light.norm_squared();
        if dist2 > 0.0 {
            let d = Normal::new_normalize(to_light);
            let cos_light = -d.dot(&light_sample.normal);
            if cos_light > 0.0 {
                let p_light = light_sample.pdf * dist2 / cos_light;
                let wi = LocalVector::local_from_world(onb.local_from_world(), &d);
                let f = material.eval(&wo_local, &wi);
                if !f.is_black() && p_light > 0.0 {
                    let p_bsdf = material.pdf(&wo_local, &wi);
                    let weight = if light.delta {
                        1.0
                    } else {
                        power_heuristic(p_light, p_bsdf)
                    };
                    let contribution = state.throughput * light.radiance * f
                        * wi.cos_theta().abs()
                        * weight
                        / (p_light * choose_pdf);

                    // Visibility ray between mutually offset endpoints.
                    let origin = hit.p + d.into_inner() * RAY_EPSILON;
                    let target =
                        light_sample.p + (origin - light_sample.p).normalize() * RAY_EPSILON;
                    let span = target - origin;
                    let span_len = span.norm();
                    if span_len > RAY_EPSILON {
                        output.shadow = Some(ShadowRay {
                            pixel: state.pixel,
                            ray: Ray::with_t_max(
                                origin,
                                Normal::new_normalize(span),
                                span_len - RAY_EPSILON,
                            ),
                            contribution,
                            occluded: false,
                        });
                    }
                }
            }
        }
        if !light.delta {
            state.prev_light = light_index as i32;
        }
    }

    // Bsdf sampling and the continuation ray.
    if let Some(bsdf_sample) = material.sample(
        &wo_local,
        (state.sampler.sample(), state.sampler.sample()),
    ) {
        let wi_world = bsdf_sample.wi.world_from_local(onb.world_from_local());
        state.throughput *=
            bsdf_sample.r * bsdf_sample.wi.cos_theta().abs() / bsdf_sample.pdf;
        state.prev_bsdf_pdf = bsdf_sample.pdf;

        let mut alive = state.throughput.is_finite() && !state.throughput.is_black();

        // Russian roulette on dim paths past the first few bounces; the
        // survivors are scaled to keep the estimator unbiased.
        if alive && bounce > 3 && state.throughput.max_component() < 1.0 {
            let q = f32::max(0.05, 1.0 - state.throughput.max_component());
            if state.sampler.sample() < q {
                alive = false;
            } else {
                state.throughput = state.throughput / (1.0 - q);
            }
        }

        if alive {
            output.scatter = Some(PathRay {
                ray: Ray::spawn(hit.p, wi_world),
                state,
                hit: None,
            });
        }
    }

    output
}
