//! Density-based clustering (DBSCAN) over cosine distance.
//!
//! Given a set of embedding vectors, [`cluster`] assigns each one an integer
//! label: `0, 1, 2, …` for clusters in the order they are discovered while
//! scanning the input, or [`NOISE`] for points reachable from no core point.
//!
//! # Algorithm
//!
//! ```text
//! distance(a, b) = 1 − (a · b) / (‖a‖ × ‖b‖)        ∈ [0, 2]
//! N(i)           = { j : distance(i, j) ≤ eps }      (contains i)
//! core(i)        = |N(i)| ≥ min_samples
//! ```
//!
//! Points are scanned in input order. Each unlabeled core point seeds a new
//! cluster, which is grown with a depth-first stack: a popped point takes
//! the current label if it has none, and if it is a core point its
//! unlabeled neighbors are pushed. Border points therefore join the first
//! cluster that reaches them.
//!
//! With the default `min_samples = 1` every point is core, so nothing is
//! ever noise. A zero vector has no direction; it sits at maximal distance
//! from every other point and ends up in its own singleton cluster.

use serde::Deserialize;

use crate::error::{BoardError, Result};

/// Label for points that belong to no dense group.
pub const NOISE: i32 = -1;

/// Distance assigned when cosine similarity is undefined.
const MAX_DISTANCE: f32 = 2.0;

/// DBSCAN parameters.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ClusterParams {
    /// Neighborhood radius in cosine distance.
    #[serde(default = "default_eps")]
    pub eps: f32,
    /// Minimum neighborhood size (including the point itself) to seed a cluster.
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
}

fn default_eps() -> f32 {
    0.60
}
fn default_min_samples() -> usize {
    1
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            eps: default_eps(),
            min_samples: default_min_samples(),
        }
    }
}

impl ClusterParams {
    /// Build validated parameters.
    pub fn new(eps: f32, min_samples: usize) -> Result<Self> {
        let params = Self { eps, min_samples };
        params.validate()?;
        Ok(params)
    }

    /// Fails with [`BoardError::InvalidParameters`] if `eps` is negative or
    /// not finite, or `min_samples` is zero.
    pub fn validate(&self) -> Result<()> {
        if !self.eps.is_finite() || self.eps < 0.0 {
            return Err(BoardError::InvalidParameters(format!(
                "eps must be a finite value >= 0, got {}",
                self.eps
            )));
        }
        if self.min_samples < 1 {
            return Err(BoardError::InvalidParameters(
                "min_samples must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Cluster `vectors`, returning one label per input in input order.
///
/// # Errors
///
/// [`BoardError::InvalidParameters`] if `params` fails validation. This is
/// checked before anything else, also for empty input.
///
/// # Example
///
/// ```rust
/// use idea_board_core::cluster::{cluster, ClusterParams};
///
/// let vectors = vec![
///     vec![1.0, 0.0],
///     vec![0.0, 1.0],
///     vec![0.9, 0.1],
/// ];
/// let labels = cluster(&vectors, &ClusterParams::default()).unwrap();
/// assert_eq!(labels, vec![0, 1, 0]);
/// ```
pub fn cluster(vectors: &[Vec<f32>], params: &ClusterParams) -> Result<Vec<i32>> {
    params.validate()?;

    let normalized: Vec<Option<Vec<f32>>> = vectors.iter().map(|v| normalize(v)).collect();
    let neighborhoods = neighborhoods(&normalized, params.eps);
    let is_core: Vec<bool> = neighborhoods
        .iter()
        .map(|n| n.len() >= params.min_samples)
        .collect();

    let mut labels = vec![NOISE; vectors.len()];
    let mut next_label = 0;
    let mut stack = Vec::new();

    for seed in 0..vectors.len() {
        if labels[seed] != NOISE || !is_core[seed] {
            continue;
        }

        stack.push(seed);
        while let Some(point) = stack.pop() {
            if labels[point] != NOISE {
                continue;
            }
            labels[point] = next_label;
            if is_core[point] {
                stack.extend(
                    neighborhoods[point]
                        .iter()
                        .copied()
                        .filter(|&n| labels[n] == NOISE),
                );
            }
        }

        next_label += 1;
    }

    Ok(labels)
}

/// Cosine distance between two vectors, in `[0, 2]`.
///
/// Returns 2.0 (maximal) when either vector has zero length or magnitude,
/// the lengths differ, or the result is not a number.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    match (normalize(a), normalize(b)) {
        (Some(a), Some(b)) => unit_distance(&a, &b),
        _ => MAX_DISTANCE,
    }
}

fn normalize(v: &[f32]) -> Option<Vec<f32>> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if !norm.is_finite() || norm < f32::EPSILON {
        return None;
    }
    Some(v.iter().map(|x| x / norm).collect())
}

fn unit_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return MAX_DISTANCE;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let distance = 1.0 - dot;
    if distance.is_nan() {
        MAX_DISTANCE
    } else {
        distance.clamp(0.0, MAX_DISTANCE)
    }
}

/// Pairwise radius query. `result[i]` lists every `j` (ascending, `i`
/// included) within `eps` of `i`.
fn neighborhoods(normalized: &[Option<Vec<f32>>], eps: f32) -> Vec<Vec<usize>> {
    let n = normalized.len();
    let mut result: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();

    for i in 0..n {
        let Some(a) = &normalized[i] else { continue };
        for j in (i + 1)..n {
            let Some(b) = &normalized[j] else { continue };
            if unit_distance(a, b) <= eps {
                result[i].push(j);
                result[j].push(i);
            }
        }
    }

    for neighbors in &mut result {
        neighbors.sort_unstable();
    }
    result
}
