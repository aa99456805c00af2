//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! Nodes are stored flat in one array with the root at index 0. Leaves
//! reference a run of the `indices` array, which in turn points into the
//! primitive slice the hierarchy was built over. Spatial-split builds may
//! reference a primitive from more than one leaf.
//!
//! Builders live in [`sah`] (binned SAH, optionally with spatial splits)
//! and [`lbvh`] (Morton order). Use [`crate::accel::build`] to pick one.

pub(crate) mod lbvh;
pub(crate) mod sah;

use frost_core::Primitive;
use frost_math::{Aabb, Interval, Ray, Vec3};

use crate::accel::BuildStrategy;

/// Maximum primitives per leaf node before splitting.
pub(crate) const LEAF_MAX_SIZE: usize = 4;

/// Builders stop splitting at this depth, which bounds the traversal stack.
pub(crate) const MAX_DEPTH: usize = 64;

const STACK_SIZE: usize = MAX_DEPTH + 2;

/// BVH node - either a branch with two children or a leaf with primitives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BvhNode {
    /// Internal node; children are indices into the node array.
    Branch { left: u32, right: u32, bbox: Aabb },
    /// Leaf node covering `indices[first..first + count]`.
    Leaf { first: u32, count: u32, bbox: Aabb },
}

impl BvhNode {
    pub fn bbox(&self) -> &Aabb {
        match self {
            BvhNode::Branch { bbox, .. } | BvhNode::Leaf { bbox, .. } => bbox,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, BvhNode::Leaf { .. })
    }

    /// Slot filled in later by the builders.
    pub(crate) const PLACEHOLDER: BvhNode = BvhNode::Leaf {
        first: 0,
        count: 0,
        bbox: Aabb::EMPTY,
    };
}

/// Closest intersection found by a traversal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub t: f32,
    pub u: f32,
    pub v: f32,
    /// Index into the primitive slice the BVH was built over.
    pub prim_index: u32,
}

/// Primitive reference handed around during construction.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PrimRef {
    pub index: u32,
    pub bounds: Aabb,
    pub centroid: Vec3,
}

impl PrimRef {
    pub fn new(index: u32, bounds: Aabb) -> Self {
        Self {
            index,
            bounds,
            centroid: bounds.centroid(),
        }
    }
}

/// Union of the bounds of `refs`.
pub(crate) fn refs_bounds(refs: &[PrimRef]) -> Aabb {
    refs.iter()
        .fold(Aabb::EMPTY, |acc, r| Aabb::surrounding(&acc, &r.bounds))
}

/// Union of the centroids of `refs`.
pub(crate) fn centroid_bounds(refs: &[PrimRef]) -> Aabb {
    refs.iter().fold(Aabb::EMPTY, |mut acc, r| {
        acc.include_point(r.centroid);
        acc
    })
}

/// Flat node array plus leaf index list produced by a builder.
#[derive(Debug, Default)]
pub(crate) struct BuildOutput {
    pub nodes: Vec<BvhNode>,
    pub indices: Vec<u32>,
}

impl BuildOutput {
    /// Reserve a node slot and return its index.
    pub fn push_placeholder(&mut self) -> usize {
        self.nodes.push(BvhNode::PLACEHOLDER);
        self.nodes.len() - 1
    }

    pub fn make_leaf(&mut self, node: usize, refs: &[PrimRef], bbox: Aabb) {
        let first = self.indices.len() as u32;
        self.indices.extend(refs.iter().map(|r| r.index));
        self.nodes[node] = BvhNode::Leaf {
            first,
            count: refs.len() as u32,
            bbox,
        };
    }
}

/// A BVH over a borrowed primitive slice.
#[derive(Debug, Clone)]
pub struct Bvh<'p> {
    primitives: &'p [Primitive],
    nodes: Vec<BvhNode>,
    indices: Vec<u32>,
    strategy: BuildStrategy,
}

impl<'p> Bvh<'p> {
    pub(crate) fn from_output(
        primitives: &'p [Primitive],
        output: BuildOutput,
        strategy: BuildStrategy,
    ) -> Self {
        Self {
            primitives,
            nodes: output.nodes,
            indices: output.indices,
            strategy,
        }
    }

    pub fn primitives(&self) -> &'p [Primitive] {
        self.primitives
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Primitive references in leaf order.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn strategy(&self) -> BuildStrategy {
        self.strategy
    }

    /// Bounds of the whole hierarchy.
    pub fn bbox(&self) -> Aabb {
        self.nodes.first().map(|n| *n.bbox()).unwrap_or(Aabb::EMPTY)
    }

    /// Number of levels from the root to the deepest leaf.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(0u32, 1usize)];
        while let Some((index, depth)) = stack.pop() {
            match self.nodes[index as usize] {
                BvhNode::Branch { left, right, .. } => {
                    stack.push((left, depth + 1));
                    stack.push((right, depth + 1));
                }
                BvhNode::Leaf { .. } => deepest = deepest.max(depth),
            }
        }
        deepest
    }

    /// Closest primitive hit by `ray` strictly inside `ray_t`.
    pub fn closest_hit(&self, ray: &Ray, ray_t: Interval) -> Option<Hit> {
        if self.nodes.is_empty() {
            return None;
        }

        let mut closest = ray_t.max;
        let mut best = None;

        let mut stack = [0u32; STACK_SIZE];
        let mut sp = 1;

        while sp > 0 {
            sp -= 1;
            let node = &self.nodes[stack[sp] as usize];
            if !node.bbox().hit(ray, Interval::new(ray_t.min, closest)) {
                continue;
            }

            match *node {
                BvhNode::Leaf { first, count, .. } => {
                    let refs = &self.indices[first as usize..(first + count) as usize];
                    for &prim_index in refs {
                        let prim = &self.primitives[prim_index as usize];
                        if let Some(hit) = prim.intersect(ray, Interval::new(ray_t.min, closest)) {
                            closest = hit.t;
                            best = Some(Hit {
                                t: hit.t,
                                u: hit.u,
                                v: hit.v,
                                prim_index,
                            });
                        }
                    }
                }
                BvhNode::Branch { left, right, .. } => {
                    stack[sp] = right;
                    stack[sp + 1] = left;
                    sp += 2;
                }
            }
        }

        best
    }

    /// True if anything blocks `ray` strictly inside `ray_t`.
    pub fn any_hit(&self, ray: &Ray, ray_t: Interval) -> bool {
        if self.nodes.is_empty() {
            return false;
        }

        let mut stack = [0u32; STACK_SIZE];
        let mut sp = 1;

        while sp > 0 {
            sp -= 1;
            let node = &self.nodes[stack[sp] as usize];
            if !node.bbox().hit(ray, ray_t) {
                continue;
            }

            match *node {
                BvhNode::Leaf { first, count, .. } => {
                    let refs = &self.indices[first as usize..(first + count) as usize];
                    if refs
                        .iter()
                        .any(|&i| self.primitives[i as usize].intersect(ray, ray_t).is_some())
                    {
                        return true;
                    }
                }
                BvhNode::Branch { left, right, .. } => {
                    stack[sp] = right;
                    stack[sp + 1] = left;
                    sp += 2;
                }
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accel::build;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const STRATEGIES: [BuildStrategy; 3] =
        [BuildStrategy::Binned, BuildStrategy::Split, BuildStrategy::Lbvh];

    fn random_vec(rng: &mut StdRng, scale: f32) -> Vec3 {
        Vec3::new(
            rng.gen_range(-scale..scale),
            rng.gen_range(-scale..scale),
            rng.gen_range(-scale..scale),
        )
    }

    /// A mix of small spheres and long thin triangles, which is what makes
    /// spatial splits kick in.
    fn random_scene(seed: u64, count: usize) -> Vec<Primitive> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|i| {
                if i % 3 == 0 {
                    Primitive::sphere(random_vec(&mut rng, 8.0), rng.gen_range(0.1..0.8), 0)
                } else {
                    let a = random_vec(&mut rng, 8.0);
                    let b = a + random_vec(&mut rng, 6.0);
                    let c = a + random_vec(&mut rng, 1.0);
                    Primitive::triangle(a, b, c, 0)
                }
            })
            .collect()
    }

    fn brute_force(prims: &[Primitive], ray: &Ray, ray_t: Interval) -> Option<(f32, u32)> {
        let mut closest = ray_t.max;
        let mut best = None;
        for (i, prim) in prims.iter().enumerate() {
            if let Some(hit) = prim.intersect(ray, Interval::new(ray_t.min, closest)) {
                closest = hit.t;
                best = Some((hit.t, i as u32));
            }
        }
        best
    }

    #[test]
    fn test_every_strategy_matches_brute_force() {
        let prims = random_scene(7, 300);
        let mut rng = StdRng::seed_from_u64(99);
        let ray_t = Interval::new(0.001, f32::INFINITY);

        let rays: Vec<Ray> = (0..500)
            .map(|_| {
                let origin = random_vec(&mut rng, 12.0);
                let target = random_vec(&mut rng, 6.0);
                Ray::new(origin, target - origin)
            })
            .collect();

        for strategy in STRATEGIES {
            let bvh = build(strategy, &prims).unwrap();
            let mut hits = 0;
            for ray in &rays {
                let expected = brute_force(&prims, ray, ray_t);
                let got = bvh.closest_hit(ray, ray_t);
                match (expected, got) {
                    (None, None) => {}
                    (Some((t, _)), Some(hit)) => {
                        hits += 1;
                        assert!((hit.t - t).abs() < 1e-4, "{strategy}: t {} vs {}", hit.t, t);
                    }
                    (e, g) => panic!("{strategy}: brute force {e:?}, bvh {g:?}"),
                }
                assert_eq!(bvh.any_hit(ray, ray_t), expected.is_some());
            }
            assert!(hits > 0, "{strategy}: test rays never hit anything");
        }
    }

    #[test]
    fn test_every_primitive_is_referenced() {
        let prims = random_scene(3, 120);
        for strategy in STRATEGIES {
            let bvh = build(strategy, &prims).unwrap();
            let mut seen = vec![false; prims.len()];
            for &i in bvh.indices() {
                seen[i as usize] = true;
            }
            assert!(seen.iter().all(|&s| s), "{strategy} dropped a primitive");

            // Root bounds enclose everything
            let root = bvh.bbox();
            for prim in &prims {
                let b = prim.bounds();
                assert!(root.contains_point(b.min()) && root.contains_point(b.max()));
            }
            assert!(bvh.depth() <= MAX_DEPTH + 1);
        }
    }

    #[test]
    fn test_leaves_respect_max_size() {
        let prims = random_scene(11, 200);
        for strategy in [BuildStrategy::Binned, BuildStrategy::Lbvh] {
            let bvh = build(strategy, &prims).unwrap();
            for node in bvh.nodes() {
                if let BvhNode::Leaf { count, .. } = node {
                    assert!(*count as usize <= LEAF_MAX_SIZE, "{strategy}: leaf of {count}");
                    assert!(*count > 0);
                }
            }
        }
    }

    #[test]
    fn test_single_primitive_is_a_leaf() {
        let prims = vec![Primitive::sphere(Vec3::new(0.0, 0.0, -1.0), 0.5, 0)];
        for strategy in STRATEGIES {
            let bvh = build(strategy, &prims).unwrap();
            assert_eq!(bvh.nodes().len(), 1);
            assert!(bvh.nodes()[0].is_leaf());

            let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
            let hit = bvh.closest_hit(&ray, Interval::new(0.001, f32::INFINITY)).unwrap();
            assert_eq!(hit.prim_index, 0);
            assert!((hit.t - 0.5).abs() < 1e-5);
        }
    }

    #[test]
    fn test_closest_of_a_row_of_spheres() {
        let prims: Vec<Primitive> = (0..10)
            .map(|i| Primitive::sphere(Vec3::new(0.0, 0.0, -(i as f32) * 2.0 - 2.0), 0.5, 0))
            .collect();

        for strategy in STRATEGIES {
            let bvh = build(strategy, &prims).unwrap();
            let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));

            let hit = bvh.closest_hit(&ray, Interval::new(0.001, f32::INFINITY)).unwrap();
            assert_eq!(hit.prim_index, 0);
            assert!((hit.t - 1.5).abs() < 1e-4);

            // Shadow ray stopping short of the first sphere sees nothing
            assert!(!bvh.any_hit(&ray, Interval::new(0.001, 1.0)));
        }
    }

    #[test]
    fn test_identical_centroids_still_build() {
        let prims: Vec<Primitive> = (0..40)
            .map(|i| Primitive::sphere(Vec3::ZERO, 0.5 + i as f32 * 0.01, 0))
            .collect();

        for strategy in STRATEGIES {
            let bvh = build(strategy, &prims).unwrap();
            let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
            let hit = bvh.closest_hit(&ray, Interval::new(0.001, f32::INFINITY)).unwrap();
            // Largest sphere is hit first
            assert_eq!(hit.prim_index, 39);
        }
    }
}
