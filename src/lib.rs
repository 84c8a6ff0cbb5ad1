#![deny(future_incompatible)]
#![deny(nonstandard_style)]
#![deny(clippy::pedantic)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::collapsible_if,
    clippy::many_single_char_names,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::too_many_arguments,
    clippy::too_many_lines,
    clippy::unreadable_literal,
    clippy::wildcard_imports
)]

use std::{
    collections::HashMap,
    mem,
    path::Path,
    sync::atomic::{AtomicU32, Ordering},
    time::Instant,
};

use anyhow::{bail, ensure, Context, Result};
use bytemuck::{Pod, Zeroable};
use log::{debug, info};
use nalgebra as na;
use nalgebra::{point, vector};
use rand::prelude::*;
use rayon::prelude::*;

mod aabb;
mod api;
mod bsdf;
mod bvh;
mod camera;
mod color;
mod film;
mod integrator;
mod intersect;
mod math;
mod paramset;
mod pathtracer;
mod queue;
mod ray;
mod sampling;
mod scene;
mod transform;
mod triangle;

use aabb::*;
use bsdf::*;
use camera::*;
use color::*;
use film::*;
use intersect::*;
use math::*;
use paramset::*;
use queue::*;
use ray::*;
use sampling::*;
use scene::*;
use transform::*;
use triangle::*;

pub use color::ColorRgb;
pub use integrator::RenderParams;
pub use pathtracer::PathTracer;

const TAU: f32 = std::f32::consts::TAU;
const INV_PI: f32 = std::f32::consts::FRAC_1_PI;

// Secondary ray origins are offset by this much and hits closer than this are
// rejected, so that a path never re-intersects the surface it just left.
const RAY_EPSILON: f32 = 1e-3;
