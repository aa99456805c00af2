//! Binned surface-area-heuristic builder.
//!
//! Object splits bin primitive centroids into [`BIN_COUNT`] buckets per axis
//! and sweep the bucket boundaries for the cheapest partition. With spatial
//! splits enabled, nodes whose best object split leaves the two children
//! overlapping also try cutting primitives at bin planes, so one primitive
//! may end up referenced by both sides.

use frost_core::Primitive;
use frost_math::{Aabb, Interval};

use super::{
    centroid_bounds, refs_bounds, BuildOutput, BvhNode, PrimRef, LEAF_MAX_SIZE, MAX_DEPTH,
};

const BIN_COUNT: usize = 16;
const TRAVERSAL_COST: f32 = 1.0;
const INTERSECTION_COST: f32 = 1.0;

/// Spatial splits are only tried when the object split's child overlap is
/// larger than this fraction of the root surface area.
const SPATIAL_OVERLAP_RATIO: f32 = 1e-5;

/// Padding applied to clipped reference bounds so neighbouring halves meet.
const CLIP_PADDING: f32 = 1e-4;

#[derive(Debug, Clone, Copy)]
struct Bin {
    bounds: Aabb,
    count: usize,
}

impl Default for Bin {
    fn default() -> Self {
        Self {
            bounds: Aabb::EMPTY,
            count: 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum SplitKind {
    /// Refs whose centroid falls in a bin below `bin` go left.
    Object { bin: usize },
    /// Refs are cut at the plane `position`.
    Spatial { position: f32 },
}

#[derive(Debug, Clone, Copy)]
struct Split {
    axis: usize,
    kind: SplitKind,
    cost: f32,
    left_bounds: Aabb,
    right_bounds: Aabb,
}

/// Cost of a split relative to a node with surface area `parent_area`.
fn split_cost(
    parent_area: f32,
    left: &Aabb,
    left_count: usize,
    right: &Aabb,
    right_count: usize,
) -> f32 {
    let weighted =
        left.surface_area() * left_count as f32 + right.surface_area() * right_count as f32;
    TRAVERSAL_COST + INTERSECTION_COST * weighted / parent_area.max(f32::MIN_POSITIVE)
}

pub(crate) struct SahBuilder<'a> {
    primitives: &'a [Primitive],
    spatial_splits: bool,
    root_area: f32,
    /// Extra references spatial splits may still create.
    duplicate_budget: usize,
    out: BuildOutput,
}

impl<'a> SahBuilder<'a> {
    pub fn new(primitives: &'a [Primitive], spatial_splits: bool) -> Self {
        Self {
            primitives,
            spatial_splits,
            root_area: 0.0,
            duplicate_budget: primitives.len(),
            out: BuildOutput::default(),
        }
    }

    pub fn build(mut self) -> BuildOutput {
        let refs: Vec<PrimRef> = self
            .primitives
            .iter()
            .enumerate()
            .map(|(i, p)| PrimRef::new(i as u32, p.bounds()))
            .collect();

        let bounds = refs_bounds(&refs);
        self.root_area = bounds.surface_area();
        self.out.nodes.reserve(2 * refs.len());
        self.out.indices.reserve(refs.len());

        let root = self.out.push_placeholder();
        self.build_node(root, refs, bounds, 0);

        if self.spatial_splits {
            log::debug!(
                "Spatial splits used {} of {} extra references",
                self.primitives.len() - self.duplicate_budget,
                self.primitives.len()
            );
        }
        self.out
    }

    fn build_node(&mut self, node: usize, refs: Vec<PrimRef>, bounds: Aabb, depth: usize) {
        let n = refs.len();
        if n <= 1 || depth >= MAX_DEPTH {
            self.out.make_leaf(node, &refs, bounds);
            return;
        }

        let mut best = self.find_object_split(&refs, &bounds);

        if self.spatial_splits && self.duplicate_budget > 0 {
            let overlap = best
                .map(|s| Aabb::intersection(&s.left_bounds, &s.right_bounds).surface_area())
                .unwrap_or(f32::INFINITY);
            if overlap > SPATIAL_OVERLAP_RATIO * self.root_area {
                if let Some(spatial) = self.find_spatial_split(&refs, &bounds) {
                    if best.map_or(true, |b| spatial.cost < b.cost) {
                        best = Some(spatial);
                    }
                }
            }
        }

        let leaf_cost = INTERSECTION_COST * n as f32;
        if n <= LEAF_MAX_SIZE && best.map_or(true, |b| b.cost >= leaf_cost) {
            self.out.make_leaf(node, &refs, bounds);
            return;
        }

        let (left, right) = match best.map(|split| self.partition(&refs, &split)) {
            Some((left, right)) if makes_progress(&left, &right, n) => (left, right),
            _ => median_split(refs, &bounds),
        };

        let left_bounds = refs_bounds(&left);
        let right_bounds = refs_bounds(&right);

        let left_node = self.out.push_placeholder();
        let right_node = self.out.push_placeholder();
        self.out.nodes[node] = BvhNode::Branch {
            left: left_node as u32,
            right: right_node as u32,
            bbox: bounds,
        };

        self.build_node(left_node, left, left_bounds, depth + 1);
        self.build_node(right_node, right, right_bounds, depth + 1);
    }

    /// Best binned centroid split over all three axes.
    fn find_object_split(&self, refs: &[PrimRef], bounds: &Aabb) -> Option<Split> {
        let centroids = centroid_bounds(refs);
        let parent_area = bounds.surface_area();
        let mut best: Option<Split> = None;

        for axis in 0..3 {
            let slab = centroids.axis_interval(axis);
            let extent = slab.size();
            if extent <= 0.0 {
                continue;
            }

            let mut bins = [Bin::default(); BIN_COUNT];
            for r in refs {
                let b = object_bin(r, axis, &slab);
                bins[b].count += 1;
                bins[b].bounds = Aabb::surrounding(&bins[b].bounds, &r.bounds);
            }

            let sweep = Sweep::new(&bins);
            for plane in 1..BIN_COUNT {
                let (lc, rc) = (sweep.left_count[plane], sweep.right_count[plane]);
                if lc == 0 || rc == 0 {
                    continue;
                }
                let (lb, rb) = (sweep.left_bounds[plane], sweep.right_bounds[plane]);
                let cost = split_cost(parent_area, &lb, lc, &rb, rc);
                if best.map_or(true, |b| cost < b.cost) {
                    best = Some(Split {
                        axis,
                        kind: SplitKind::Object { bin: plane },
                        cost,
                        left_bounds: lb,
                        right_bounds: rb,
                    });
                }
            }
        }

        best
    }

    /// Best split cutting references at bin planes of the node bounds.
    fn find_spatial_split(&self, refs: &[PrimRef], bounds: &Aabb) -> Option<Split> {
        let parent_area = bounds.surface_area();
        let mut best: Option<Split> = None;

        for axis in 0..3 {
            let slab = bounds.axis_interval(axis);
            let width = slab.size() / BIN_COUNT as f32;
            if width <= 0.0 {
                continue;
            }

            let mut bins = [Bin::default(); BIN_COUNT];
            let mut entries = [0usize; BIN_COUNT];
            let mut exits = [0usize; BIN_COUNT];

            for r in refs {
                let span = r.bounds.axis_interval(axis);
                let first = spatial_bin(span.min, &slab, width);
                let last = spatial_bin(span.max, &slab, width).max(first);

                for b in first..=last {
                    let bin_slab = bin_interval(b, &slab, width);
                    let clipped = self.clip(r, axis, bin_slab);
                    bins[b].bounds = Aabb::surrounding(&bins[b].bounds, &clipped);
                }
                entries[first] += 1;
                exits[last] += 1;
            }

            // Left side counts references entering at or before each plane,
            // right side counts references leaving at or after it.
            let mut left_bounds = [Aabb::EMPTY; BIN_COUNT];
            let mut left_count = [0usize; BIN_COUNT];
            let (mut acc_bounds, mut acc_count) = (Aabb::EMPTY, 0);
            for plane in 1..BIN_COUNT {
                acc_bounds = Aabb::surrounding(&acc_bounds, &bins[plane - 1].bounds);
                acc_count += entries[plane - 1];
                left_bounds[plane] = acc_bounds;
                left_count[plane] = acc_count;
            }

            let (mut acc_bounds, mut acc_count) = (Aabb::EMPTY, 0);
            for plane in (1..BIN_COUNT).rev() {
                acc_bounds = Aabb::surrounding(&acc_bounds, &bins[plane].bounds);
                acc_count += exits[plane];
                let (lc, rc) = (left_count[plane], acc_count);
                if lc == 0 || rc == 0 {
                    continue;
                }
                let lb = left_bounds[plane];
                let cost = split_cost(parent_area, &lb, lc, &acc_bounds, rc);
                if best.map_or(true, |b| cost < b.cost) {
                    best = Some(Split {
                        axis,
                        kind: SplitKind::Spatial {
                            position: slab.min + width * plane as f32,
                        },
                        cost,
                        left_bounds: lb,
                        right_bounds: acc_bounds,
                    });
                }
            }
        }

        best
    }

    fn partition(&mut self, refs: &[PrimRef], split: &Split) -> (Vec<PrimRef>, Vec<PrimRef>) {
        let axis = split.axis;
        let mut left = Vec::with_capacity(refs.len());
        let mut right = Vec::with_capacity(refs.len());

        match split.kind {
            SplitKind::Object { bin } => {
                let slab = centroid_bounds(refs).axis_interval(axis);
                for r in refs {
                    if object_bin(r, axis, &slab) < bin {
                        left.push(*r);
                    } else {
                        right.push(*r);
                    }
                }
            }
            SplitKind::Spatial { position } => {
                let mut straddling = 0;
                for r in refs {
                    let span = r.bounds.axis_interval(axis);
                    if span.max <= position {
                        left.push(*r);
                    } else if span.min >= position {
                        right.push(*r);
                    } else if straddling < self.duplicate_budget {
                        straddling += 1;
                        let below = self.clip(r, axis, Interval::new(f32::NEG_INFINITY, position));
                        let above = self.clip(r, axis, Interval::new(position, f32::INFINITY));
                        if !below.is_empty() {
                            left.push(PrimRef::new(r.index, below));
                        }
                        if !above.is_empty() {
                            right.push(PrimRef::new(r.index, above));
                        }
                    } else if r.centroid[axis] < position {
                        left.push(*r);
                    } else {
                        right.push(*r);
                    }
                }
                self.duplicate_budget -= straddling.min(self.duplicate_budget);
            }
        }

        (left, right)
    }

    /// Bounds of the part of `r` inside `slab`, padded and kept within the
    /// reference's current bounds.
    fn clip(&self, r: &PrimRef, axis: usize, slab: Interval) -> Aabb {
        let clipped = self.primitives[r.index as usize].clip_bounds(axis, slab, &r.bounds);
        if clipped.is_empty() {
            return clipped;
        }
        let padded = Aabb::new(
            clipped.x.expand(CLIP_PADDING),
            clipped.y.expand(CLIP_PADDING),
            clipped.z.expand(CLIP_PADDING),
        );
        Aabb::intersection(&padded, &r.bounds)
    }
}

/// Prefix and suffix sums over bins, indexed by split plane.
struct Sweep {
    left_bounds: [Aabb; BIN_COUNT],
    left_count: [usize; BIN_COUNT],
    right_bounds: [Aabb; BIN_COUNT],
    right_count: [usize; BIN_COUNT],
}

impl Sweep {
    fn new(bins: &[Bin; BIN_COUNT]) -> Self {
        let mut sweep = Sweep {
            left_bounds: [Aabb::EMPTY; BIN_COUNT],
            left_count: [0; BIN_COUNT],
            right_bounds: [Aabb::EMPTY; BIN_COUNT],
            right_count: [0; BIN_COUNT],
        };

        let (mut bounds, mut count) = (Aabb::EMPTY, 0);
        for plane in 1..BIN_COUNT {
            bounds = Aabb::surrounding(&bounds, &bins[plane - 1].bounds);
            count += bins[plane - 1].count;
            sweep.left_bounds[plane] = bounds;
            sweep.left_count[plane] = count;
        }

        let (mut bounds, mut count) = (Aabb::EMPTY, 0);
        for plane in (1..BIN_COUNT).rev() {
            bounds = Aabb::surrounding(&bounds, &bins[plane].bounds);
            count += bins[plane].count;
            sweep.right_bounds[plane] = bounds;
            sweep.right_count[plane] = count;
        }

        sweep
    }
}

fn object_bin(r: &PrimRef, axis: usize, centroids: &Interval) -> usize {
    let scale = BIN_COUNT as f32 / centroids.size();
    let b = ((r.centroid[axis] - centroids.min) * scale) as usize;
    b.min(BIN_COUNT - 1)
}

fn spatial_bin(x: f32, slab: &Interval, width: f32) -> usize {
    let b = ((x - slab.min) / width).max(0.0) as usize;
    b.min(BIN_COUNT - 1)
}

fn bin_interval(b: usize, slab: &Interval, width: f32) -> Interval {
    let min = slab.min + width * b as f32;
    let max = if b == BIN_COUNT - 1 {
        slab.max
    } else {
        slab.min + width * (b + 1) as f32
    };
    Interval::new(min, max)
}

fn makes_progress(left: &[PrimRef], right: &[PrimRef], n: usize) -> bool {
    !left.is_empty() && !right.is_empty() && (left.len() < n || right.len() < n)
}

/// Fallback when no binned split separates the refs: sort by centroid on
/// the longest axis and cut in half.
fn median_split(mut refs: Vec<PrimRef>, bounds: &Aabb) -> (Vec<PrimRef>, Vec<PrimRef>) {
    let axis = bounds.longest_axis();
    refs.sort_unstable_by(|a, b| a.centroid[axis].total_cmp(&b.centroid[axis]));
    let right = refs.split_off(refs.len() / 2);
    (refs, right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use frost_math::Vec3;

    #[test]
    fn test_separated_clusters_split_between_them() {
        let mut prims = Vec::new();
        for i in 0..4 {
            prims.push(Primitive::sphere(Vec3::new(-10.0, i as f32, 0.0), 0.2, 0));
            prims.push(Primitive::sphere(Vec3::new(10.0, i as f32, 0.0), 0.2, 0));
        }

        let out = SahBuilder::new(&prims, false).build();
        let (left, right) = match out.nodes[0] {
            BvhNode::Branch { left, right, .. } => (left, right),
            other => panic!("expected a branch at the root, got {other:?}"),
        };

        let lx = out.nodes[left as usize].bbox().centroid().x;
        let rx = out.nodes[right as usize].bbox().centroid().x;
        assert!((lx + 10.0).abs() < 0.5, "left child centered at {lx}");
        assert!((rx - 10.0).abs() < 0.5, "right child centered at {rx}");
    }

    #[test]
    fn test_spatial_split_reference_count_is_bounded() {
        // Long triangles crossing the whole scene overlap any object split.
        let mut prims = Vec::new();
        for i in 0..32 {
            let y = i as f32 * 0.5;
            prims.push(Primitive::triangle(
                Vec3::new(-20.0, y, 0.0),
                Vec3::new(20.0, y, 0.0),
                Vec3::new(-20.0, y + 0.2, 1.0),
                0,
            ));
        }

        let plain = SahBuilder::new(&prims, false).build();
        let split = SahBuilder::new(&prims, true).build();

        assert_eq!(plain.indices.len(), prims.len());
        assert!(split.indices.len() >= prims.len());
        assert!(split.indices.len() <= 2 * prims.len());
    }

    #[test]
    fn test_duplication_is_capped() {
        // A fan of triangles all crossing the origin.
        let prims: Vec<Primitive> = (0..64)
            .map(|i| {
                let angle = i as f32 * std::f32::consts::PI / 64.0;
                let dir = Vec3::new(angle.cos(), angle.sin(), 0.0) * 10.0;
                Primitive::triangle(-dir, dir, -dir + Vec3::Z * 0.1, 0)
            })
            .collect();

        let out = SahBuilder::new(&prims, true).build();
        assert!(out.indices.len() <= 2 * prims.len());
    }
}
