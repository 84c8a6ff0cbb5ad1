use super::*;

// Morton-ordered linear BVH. Nodes live in one flat array: leaves first (one
// per primitive, in Morton order), then internal nodes. All links are integer
// indices with -1 as the null sentinel, so the whole tree is relocatable and
// trivially shareable across threads.

const TRAVERSAL_STACK_DEPTH: usize = 64;

#[repr(C)]
#[derive(Pod, Zeroable, Clone, Copy, Debug)]
pub struct Node {
    pub bounds_mn: Point3,
    pub bounds_mx: Point3,
    pub child_a: i32,
    pub child_b: i32,
    pub parent: i32,
    // Primitive id for leaves, -1 for internal nodes.
    pub primitive: i32,
}

impl Node {
    fn bounds(&self) -> Aabb {
        Aabb::from_min_max(&self.bounds_mn, &self.bounds_mx)
    }

    fn is_leaf(&self) -> bool {
        self.primitive >= 0
    }
}

pub struct Hit {
    pub t: f32,
    pub barycentrics: Vec3,
    pub primitive: u32,
}

pub struct Bvh {
    nodes: Vec<Node>,
    root: u32,
}

impl Bvh {
    pub fn build(primitives: &[Primitive], triangles: &[Triangle]) -> Result<Self> {
        let timer = Instant::now();
        let leaf_count = primitives.len();
        ensure!(
            leaf_count > 0,
            "geometry error: cannot build a BVH over an empty scene"
        );
        ensure!(
            triangles.par_iter().all(|triangle| triangle.area > 0.0),
            "geometry error: degenerate triangle in BVH input"
        );

        let triangle_of = |primitive: &Primitive| &triangles[primitive.shape as usize];

        // Bounds over primitive centroids, used to quantize Morton codes.
        let centroid_bounds = primitives
            .par_iter()
            .map(|primitive| Aabb::from_points([&triangle_of(primitive).centroid()]))
            .reduce(Aabb::new, |a, b| a.union(&b));

        // 30-bit Morton codes; ties are broken by primitive index, which also
        // makes the parallel sort deterministic.
        let mut order = primitives
            .par_iter()
            .enumerate()
            .map(|(index, primitive)| {
                let code = morton_code(&triangle_of(primitive).centroid(), &centroid_bounds);
                (code, index as u32)
            })
            .collect::<Vec<_>>();
        order.par_sort();

        // Node layout: leaf i of the sorted order is node i, internal node i
        // (one per adjacent code pair, 1-based like the pair index) is node
        // leaf_count + i - 1.
        let inner_node = |i: usize| (leaf_count + i - 1) as i32;
        let leaf_node = |i: usize| i as i32;

        let mut nodes = Vec::with_capacity(2 * leaf_count - 1);
        for &(_, primitive) in &order {
            let bounds = triangle_of(&primitives[primitive as usize]).bounds();
            nodes.push(Node {
                bounds_mn: bounds.min(),
                bounds_mx: bounds.max(),
                child_a: -1,
                child_b: -1,
                parent: -1,
                primitive: primitive as i32,
            });
        }

        if leaf_count == 1 {
            let root = 0;
            debug!("built bvh: 1 node in {:.3?}", timer.elapsed());
            return Ok(Self { nodes, root });
        }

        // The level of internal node i is the highest bit at which the codes
        // of pair (i-1, i) differ; higher level = longer shared prefix =
        // deeper in the tree.
        let levels = {
            let mut levels = vec![0_u32; leaf_count];
            levels[1..]
                .par_iter_mut()
                .enumerate()
                .for_each(|(pair, level)| {
                    let i = pair + 1;
                    let diff = order[i - 1].0 ^ order[i].0;
                    *level = if diff == 0 {
                        30
                    } else {
                        diff.leading_zeros() - 2
                    };
                });
            levels
        };

        // Ordered-tree linking: each internal node adopts, on each side, the
        // nearest subtree root, which is the node with the smallest level
        // strictly greater than its own. Equal levels bind to the immediate
        // left neighbour. Every link is independent, so this runs in
        // parallel.
        let children = (1..leaf_count)
            .into_par_iter()
            .map(|i| {
                let child_a = {
                    let mut j = i - 1;
                    let mut best: Option<usize> = None;
                    if j > 0 && levels[j] == levels[i] {
                        best = Some(j);
                    } else {
                        while j > 0 && levels[j] > levels[i] {
                            best = match best {
                                Some(k) if levels[k] <= levels[j] => Some(k),
                                _ => Some(j),
                            };
                            j -= 1;
                        }
                    }
                    best.map_or(leaf_node(i - 1), inner_node)
                };

                let child_b = {
                    let mut j = i + 1;
                    let mut best: Option<usize> = None;
                    while j < leaf_count && levels[j] > levels[i] {
                        best = match best {
                            Some(k) if levels[k] < levels[j] => Some(k),
                            _ => Some(j),
                        };
                        j += 1;
                    }
                    best.map_or(leaf_node(i), inner_node)
                };

                (child_a, child_b)
            })
            .collect::<Vec<_>>();

        for &(child_a, child_b) in &children {
            nodes.push(Node {
                bounds_mn: Vec3::repeat(f32::MAX).into(),
                bounds_mx: Vec3::repeat(-f32::MAX).into(),
                child_a,
                child_b,
                parent: -1,
                primitive: -1,
            });
        }
        for (pair, &(child_a, child_b)) in children.iter().enumerate() {
            let id = inner_node(pair + 1);
            nodes[child_a as usize].parent = id;
            nodes[child_b as usize].parent = id;
        }

        // Fill bounding boxes bottom-up. Walking from each leaf, the first
        // arrival at an internal node stops (its sibling subtree is not done
        // yet); the second arrival merges both children and continues.
        let mut visits = vec![0_u8; leaf_count - 1];
        for leaf in 0..leaf_count {
            let mut id = nodes[leaf].parent;
            while id >= 0 {
                let slot = id as usize - leaf_count;
                visits[slot] += 1;
                if visits[slot] == 1 {
                    break;
                }
                let node = nodes[id as usize];
                let bounds = nodes[node.child_a as usize]
                    .bounds()
                    .union(&nodes[node.child_b as usize].bounds());
                nodes[id as usize].bounds_mn = bounds.min();
                nodes[id as usize].bounds_mx = bounds.max();
                id = node.parent;
            }
        }

        // The root is the ancestor of any leaf with a null parent.
        let mut root = 0_u32;
        while nodes[root as usize].parent >= 0 {
            root = nodes[root as usize].parent as u32;
        }

        debug!(
            "built bvh: {} nodes over {} primitives in {:.3?}",
            nodes.len(),
            leaf_count,
            timer.elapsed()
        );
        Ok(Self { nodes, root })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // Closest-hit query: shrinks `ray.t_max` on every accepted hit and keeps
    // the nearest primitive.
    pub fn closest_hit(
        &self,
        primitives: &[Primitive],
        triangles: &[Triangle],
        ray: &mut Ray,
    ) -> Option<Hit> {
        let ray_triangle = RayTriangleIntersector::new(ray);
        let ray_aabb = RayAabbIntersector::new(ray);

        let mut todo = [0_u32; TRAVERSAL_STACK_DEPTH];
        let mut todo_len = 0_usize;
        let mut node_index = self.root;
        let mut best: Option<Hit> = None;

        loop {
            let node = &self.nodes[node_index as usize];
            let mut descend = false;
            if ray_aabb.hit(ray, &node.bounds(), ray.t_max) {
                if node.is_leaf() {
                    let primitive = &primitives[node.primitive as usize];
                    let triangle = &triangles[primitive.shape as usize];
                    if let Some(hit) = ray_triangle.hit(ray, &triangle.positions, ray.t_max) {
                        ray.t_max = hit.t;
                        best = Some(Hit {
                            t: hit.t,
                            barycentrics: hit.barycentrics,
                            primitive: node.primitive as u32,
                        });
                    }
                } else {
                    debug_assert!(todo_len < TRAVERSAL_STACK_DEPTH);
                    todo[todo_len] = node.child_b as u32;
                    todo_len += 1;
                    node_index = node.child_a as u32;
                    descend = true;
                }
            }
            if !descend {
                if todo_len == 0 {
                    break;
                }
                todo_len -= 1;
                node_index = todo[todo_len];
            }
        }

        best
    }

    // Occlusion query: short-circuits on the first intersecting primitive.
    pub fn any_hit(&self, primitives: &[Primitive], triangles: &[Triangle], ray: &Ray) -> bool {
        let ray_triangle = RayTriangleIntersector::new(ray);
        let ray_aabb = RayAabbIntersector::new(ray);

        let mut todo = [0_u32; TRAVERSAL_STACK_DEPTH];
        let mut todo_len = 0_usize;
        let mut node_index = self.root;

        loop {
            let node = &self.nodes[node_index as usize];
            let mut descend = false;
            if ray_aabb.hit(ray, &node.bounds(), ray.t_max) {
                if node.is_leaf() {
                    let primitive = &primitives[node.primitive as usize];
                    let triangle = &triangles[primitive.shape as usize];
                    if ray_triangle
                        .hit(ray, &triangle.positions, ray.t_max)
                        .is_some()
                    {
                        return true;
                    }
                } else {
                    debug_assert!(todo_len < TRAVERSAL_STACK_DEPTH);
                    todo[todo_len] = node.child_b as u32;
                    todo_len += 1;
                    node_index = node.child_a as u32;
                    descend = true;
                }
            }
            if !descend {
                if todo_len == 0 {
                    return false;
                }
                todo_len -= 1;
                node_index = todo[todo_len];
            }
        }
    }

    #[cfg(test)]
    fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[cfg(test)]
    fn root(&self) -> u32 {
        self.root
    }
}

fn expand_bits(v: u32) -> u32 {
    let mut v = v;
    v = v.wrapping_mul(0x0001_0001) & 0xFF00_00FF;
    v = v.wrapping_mul(0x0000_0101) & 0x0F00_F00F;
    v = v.wrapping_mul(0x0000_0011) & 0xC30C_30C3;
    v = v.wrapping_mul(0x0000_0005) & 0x4924_9249;
    v
}

fn morton_code(p: &Point3, bounds: &Aabb) -> u32 {
    let extents = bounds.extents();
    let quantize = |value: f32, extent: f32| {
        let normalized = if extent != 0.0 { value / extent } else { 0.0 };
        (normalized * 1023.0) as u32
    };
    let x = quantize(p.x - bounds.min().x, extents.x);
    let y = quantize(p.y - bounds.min().y, extents.y);
    let z = quantize(p.z - bounds.min().z, extents.z);
    (expand_bits(x) << 2) + (expand_bits(y) << 1) + expand_bits(z)
}
