//! Linear BVH builder.
//!
//! Primitive centroids are quantized to a 1024³ grid and sorted by their
//! 30-bit Morton code. Each node splits its range where the highest
//! differing code bit changes, so the hierarchy follows the Z-order curve.

use frost_core::Primitive;
use frost_math::Vec3;

use super::{
    centroid_bounds, refs_bounds, BuildOutput, BvhNode, PrimRef, LEAF_MAX_SIZE, MAX_DEPTH,
};

/// Grid cells per axis (10 bits).
const GRID_SIZE: f32 = 1024.0;

/// Spread the low 10 bits of `v` so there are two zero bits between each.
fn expand_bits(v: u32) -> u32 {
    let mut v = v & 0x3ff;
    v = (v | (v << 16)) & 0x0300_00ff;
    v = (v | (v << 8)) & 0x0300_f00f;
    v = (v | (v << 4)) & 0x030c_30c3;
    v = (v | (v << 2)) & 0x0924_9249;
    v
}

/// 30-bit Morton code of a point in the unit cube.
pub(crate) fn morton3(x: f32, y: f32, z: f32) -> u32 {
    let quantize = |c: f32| (c * GRID_SIZE).clamp(0.0, GRID_SIZE - 1.0) as u32;
    (expand_bits(quantize(x)) << 2) | (expand_bits(quantize(y)) << 1) | expand_bits(quantize(z))
}

pub(crate) fn build(primitives: &[Primitive]) -> BuildOutput {
    let refs: Vec<PrimRef> = primitives
        .iter()
        .enumerate()
        .map(|(i, p)| PrimRef::new(i as u32, p.bounds()))
        .collect();

    let grid = centroid_bounds(&refs);
    let origin = grid.min();
    let extent = grid.extent();
    let inv = |e: f32| if e > 0.0 { 1.0 / e } else { 0.0 };
    let scale = Vec3::new(inv(extent.x), inv(extent.y), inv(extent.z));

    let mut sorted: Vec<(u32, PrimRef)> = refs
        .into_iter()
        .map(|r| {
            let c = (r.centroid - origin) * scale;
            (morton3(c.x, c.y, c.z), r)
        })
        .collect();
    sorted.sort_unstable_by_key(|(code, r)| (*code, r.index));

    let codes: Vec<u32> = sorted.iter().map(|(code, _)| *code).collect();
    let refs: Vec<PrimRef> = sorted.into_iter().map(|(_, r)| r).collect();

    let mut out = BuildOutput::default();
    out.nodes.reserve(2 * refs.len());
    out.indices.reserve(refs.len());

    let root = out.push_placeholder();
    emit(&mut out, &codes, &refs, root, 0);
    out
}

/// Build the subtree for `refs` (with matching `codes`) into slot `node`.
fn emit(out: &mut BuildOutput, codes: &[u32], refs: &[PrimRef], node: usize, depth: usize) {
    let bounds = refs_bounds(refs);
    if refs.len() <= LEAF_MAX_SIZE || depth >= MAX_DEPTH {
        out.make_leaf(node, refs, bounds);
        return;
    }

    let mid = find_split(codes) + 1;

    let left = out.push_placeholder();
    let right = out.push_placeholder();
    out.nodes[node] = BvhNode::Branch {
        left: left as u32,
        right: right as u32,
        bbox: bounds,
    };

    emit(out, &codes[..mid], &refs[..mid], left, depth + 1);
    emit(out, &codes[mid..], &refs[mid..], right, depth + 1);
}

/// Index of the last element of the left half of a sorted code range.
///
/// Splits where the highest bit that differs between the first and last
/// code flips. Ranges of identical codes are cut in the middle.
fn find_split(codes: &[u32]) -> usize {
    let last = codes.len() - 1;
    let first_code = codes[0];
    let last_code = codes[last];

    if first_code == last_code {
        return last / 2;
    }

    let common_prefix = (first_code ^ last_code).leading_zeros();

    // Binary search for the highest index sharing more than the common prefix
    let mut split = 0;
    let mut step = last;
    loop {
        step = (step + 1) >> 1;
        let candidate = split + step;
        if candidate < last && (first_code ^ codes[candidate]).leading_zeros() > common_prefix {
            split = candidate;
        }
        if step <= 1 {
            break;
        }
    }
    split
}
