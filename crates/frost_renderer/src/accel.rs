//! Acceleration structure selection.
//!
//! Picks a BVH builder from a [`BuildStrategy`] and validates the input
//! before building.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use frost_core::Primitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bvh::{lbvh, sah::SahBuilder, Bvh};

/// BVH construction algorithm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStrategy {
    /// Binned SAH over primitive centroids
    #[default]
    Binned,
    /// Binned SAH plus spatial splits
    Split,
    /// Morton-ordered linear build
    Lbvh,
}

impl BuildStrategy {
    pub const ALL: [BuildStrategy; 3] = [Self::Binned, Self::Split, Self::Lbvh];

    pub fn name(self) -> &'static str {
        match self {
            Self::Binned => "binned",
            Self::Split => "split",
            Self::Lbvh => "lbvh",
        }
    }
}

impl fmt::Display for BuildStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown BVH strategy '{0}' (expected binned, split or lbvh)")]
pub struct ParseStrategyError(String);

impl FromStr for BuildStrategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseStrategyError(s.to_string()))
    }
}

/// Errors that can occur while building a BVH.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("cannot build a BVH over zero primitives")]
    Empty,

    #[error("primitive {index} has non-finite bounds")]
    InvalidPrimitive { index: usize },
}

/// Build a BVH over `primitives` with the chosen strategy.
pub fn build(strategy: BuildStrategy, primitives: &[Primitive]) -> Result<Bvh<'_>, BuildError> {
    if primitives.is_empty() {
        return Err(BuildError::Empty);
    }
    let invalid = |p: &Primitive| !p.is_finite() || !p.bounds().is_valid();
    if let Some(index) = primitives.iter().position(invalid) {
        return Err(BuildError::InvalidPrimitive { index });
    }

    let start = Instant::now();
    let output = match strategy {
        BuildStrategy::Binned => SahBuilder::new(primitives, false).build(),
        BuildStrategy::Split => SahBuilder::new(primitives, true).build(),
        BuildStrategy::Lbvh => lbvh::build(primitives),
    };
    let bvh = Bvh::from_output(primitives, output, strategy);

    log::info!(
        "Built {} BVH over {} primitives in {:.2?} ({} nodes, {} references, depth {})",
        bvh.strategy(),
        primitives.len(),
        start.elapsed(),
        bvh.nodes().len(),
        bvh.indices().len(),
        bvh.depth()
    );

    Ok(bvh)
}
