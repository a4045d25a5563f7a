//! Model-in-scene recognition from pairwise segment matches.
//!
//! Recognition uses the graph-based geometric-consistency approach:
//! 1. Build a consistency graph whose vertices are the predicted matches and
//!    whose edges connect pairs of matches that are geometrically consistent.
//! 2. Search the graph for a maximum clique: the largest set of mutually
//!    consistent matches.
//! 3. Estimate the rigid model-to-scene transform from the clique's centroid
//!    pairs.
//!
//! Graph construction is pluggable: [`incremental::IncrementalGraphBuilder`]
//! caches candidate consistencies across calls, while
//! [`exhaustive::ExhaustiveGraphBuilder`] recomputes every pair each call.

pub mod exhaustive;
pub mod incremental;
pub mod transform;

use tracing::debug;

use crate::graph::{clique, ConsistencyGraph};
use crate::matches::{PairwiseMatch, PairwiseMatches};
use crate::{Matrix4, Point3};

use self::transform::estimate_rigid_transform;

// ── Parameters ──────────────────────────────────────────────────────────────

/// Parameters of the geometric-consistency grouping.
#[derive(Debug, Clone)]
pub struct ConsistencyParams {
    /// Strict consistency threshold: two matches are pairwise consistent
    /// when their model-side and scene-side centroid distances differ by at
    /// most this much (same unit as the centroids).
    pub resolution: f32,
    /// Minimum number of mutually consistent matches required to report a
    /// recognition. Must be greater or equal 2.
    pub min_cluster_size: usize,
}

impl Default for ConsistencyParams {
    fn default() -> Self {
        Self {
            resolution: 0.2,
            min_cluster_size: 4,
        }
    }
}

/// Upper bound on the model-side centroid distance of a consistent pair.
///
/// Two centroids inside a model of bounding radius `r` are at most `2r`
/// apart; the caching slack keeps the bound from rejecting any pair the
/// loose caching threshold would admit.
pub(crate) fn max_target_distance(params: &ConsistencyParams, max_model_radius: f32) -> f32 {
    2.0 * max_model_radius + 2.0 * params.resolution
}

// ── Consistency predicate ───────────────────────────────────────────────────

/// Consistency distance between two matches: the absolute difference between
/// their centroid distances in the model and in the scene.
///
/// Returns `None` when the matches share a model or scene segment, or when
/// the model-side distance exceeds `max_target_distance` (the bounding-radius
/// early reject): such pairs can never be mutually consistent.
pub(crate) fn consistency_distance(
    first: &PairwiseMatch,
    second: &PairwiseMatch,
    max_target_distance: f32,
) -> Option<f32> {
    if first.ids.model == second.ids.model || first.ids.scene == second.ids.scene {
        return None;
    }
    let model_distance = nalgebra::distance(&first.centroids.model, &second.centroids.model);
    if model_distance > max_target_distance {
        return None;
    }
    let scene_distance = nalgebra::distance(&first.centroids.scene, &second.centroids.scene);
    Some((model_distance - scene_distance).abs())
}

// ── Graph builder capability ────────────────────────────────────────────────

/// Capability of producing a consistency graph from the current matches.
///
/// Vertex `i` of the returned graph always corresponds to `matches[i]`.
/// Implementations may keep state between calls; the incremental builder
/// mutates its cache in place on every build.
pub trait ConsistencyGraphBuilder {
    fn build(&mut self, matches: &[PairwiseMatch]) -> ConsistencyGraph;
}

// ── The recognizer ──────────────────────────────────────────────────────────

/// The transform estimation uses at most this many centroid pairs; the
/// least-squares solve is only exercised with small inputs.
const MAX_TRANSFORM_MATCHES: usize = 8;

/// Recognizes a model in a scene from a vector of predicted matches, keeping
/// the candidate clusters and transforms of the latest recognition call.
///
/// Generic over the consistency-graph builder; see
/// [`IncrementalRecognizer`] and [`ExhaustiveRecognizer`] for the two
/// provided configurations. A recognizer owns its builder state exclusively
/// and is not reentrant: `recognize` mutates the builder cache in place.
#[derive(Debug)]
pub struct Recognizer<B> {
    params: ConsistencyParams,
    builder: B,
    candidate_clusters: Vec<PairwiseMatches>,
    candidate_transforms: Vec<Matrix4>,
}

/// Recognizer reusing cached candidate consistencies across calls.
pub type IncrementalRecognizer = Recognizer<incremental::IncrementalGraphBuilder>;

/// Recognizer recomputing all pairwise consistencies on every call.
pub type ExhaustiveRecognizer = Recognizer<exhaustive::ExhaustiveGraphBuilder>;

impl IncrementalRecognizer {
    /// Create a recognizer with an empty consistency cache.
    ///
    /// `max_model_radius` is the radius of the bounding sphere of the model;
    /// it caps the early reject used during graph construction.
    pub fn new(params: ConsistencyParams, max_model_radius: f32) -> Self {
        let builder = incremental::IncrementalGraphBuilder::new(&params, max_model_radius);
        Self::with_builder(params, builder)
    }
}

impl ExhaustiveRecognizer {
    /// Create a stateless recognizer recomputing consistencies each call.
    pub fn new(params: ConsistencyParams, max_model_radius: f32) -> Self {
        let builder = exhaustive::ExhaustiveGraphBuilder::new(&params, max_model_radius);
        Self::with_builder(params, builder)
    }
}

impl<B: ConsistencyGraphBuilder> Recognizer<B> {
    fn with_builder(params: ConsistencyParams, builder: B) -> Self {
        assert!(
            params.min_cluster_size >= 2,
            "min_cluster_size must be at least 2"
        );
        Self {
            params,
            builder,
            candidate_clusters: Vec::new(),
            candidate_transforms: Vec::new(),
        }
    }

    /// Run one recognition step on the current predicted matches.
    ///
    /// Clears the previous candidates; on success appends one cluster of
    /// mutually consistent matches and the rigid transform estimated from
    /// it. An empty match vector, a consistency graph without a large enough
    /// clique, or an unsolvable transform all leave the corresponding output
    /// empty; none of these are errors.
    pub fn recognize(&mut self, predicted_matches: &[PairwiseMatch]) {
        self.candidate_transforms.clear();
        self.candidate_clusters.clear();
        if predicted_matches.is_empty() {
            return;
        }

        // Build a graph encoding consistencies between the predicted matches.
        let consistency_graph = self.builder.build(predicted_matches);
        debug!(
            "Consistency graph: {} matches, {} consistencies",
            predicted_matches.len(),
            consistency_graph.num_edges()
        );

        let maximum_clique =
            clique::find_maximum_clique(&consistency_graph, self.params.min_cluster_size);
        if maximum_clique.is_empty() {
            return;
        }
        debug!(
            "Found a cluster of {} mutually consistent matches",
            maximum_clique.len()
        );

        // Store the maximum clique of matches found.
        let cluster: PairwiseMatches = maximum_clique
            .iter()
            .map(|&match_index| predicted_matches[match_index as usize].clone())
            .collect();

        // Estimate the rigid transform between model and scene.
        let (model_points, scene_points) = transform_input_points(&cluster);
        let transform = estimate_rigid_transform(&model_points, &scene_points);

        self.candidate_clusters.push(cluster);
        if let Some(transform) = transform {
            self.candidate_transforms.push(transform);
        }
    }

    /// Candidate clusters of matches between model and scene found by the
    /// last call, best first. Empty when the model was not recognized.
    pub fn candidate_clusters(&self) -> &[PairwiseMatches] {
        &self.candidate_clusters
    }

    /// Candidate model-to-scene transforms, index-aligned with
    /// [`candidate_clusters`](Self::candidate_clusters).
    pub fn candidate_transforms(&self) -> &[Matrix4] {
        &self.candidate_transforms
    }

    pub fn params(&self) -> &ConsistencyParams {
        &self.params
    }

    /// The graph builder, exposed for cache inspection.
    pub fn builder(&self) -> &B {
        &self.builder
    }
}

/// Collect the centroid pairs of a cluster for transform estimation, capped
/// at [`MAX_TRANSFORM_MATCHES`] correspondences in cluster order.
fn transform_input_points(cluster: &[PairwiseMatch]) -> (Vec<Point3>, Vec<Point3>) {
    let n_matches = cluster.len().min(MAX_TRANSFORM_MATCHES);
    let mut model_points = Vec::with_capacity(n_matches);
    let mut scene_points = Vec::with_capacity(n_matches);
    for m in &cluster[..n_matches] {
        model_points.push(m.centroids.model);
        scene_points.push(m.centroids.scene);
    }
    (model_points, scene_points)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consistent_matches(count: usize) -> PairwiseMatches {
        // Centroids on a line with unit spacing, identical in model and
        // scene, so every pair is consistent.
        (0..count)
            .map(|i| {
                let p = Point3::new(i as f32, 0.0, 0.0);
                PairwiseMatch::new(1 + i as i64, 101 + i as i64, p, p, 1.0)
            })
            .collect()
    }

    #[test]
    fn test_transform_input_is_capped_at_eight() {
        let cluster = consistent_matches(12);
        let (model_points, scene_points) = transform_input_points(&cluster);
        assert_eq!(model_points.len(), 8);
        assert_eq!(scene_points.len(), 8);
        assert_eq!(model_points[0], cluster[0].centroids.model);
        assert_eq!(model_points[7], cluster[7].centroids.model);
    }

    #[test]
    fn test_transform_input_keeps_small_clusters() {
        let cluster = consistent_matches(3);
        let (model_points, scene_points) = transform_input_points(&cluster);
        assert_eq!(model_points.len(), 3);
        assert_eq!(scene_points.len(), 3);
    }

    #[test]
    fn test_consistency_distance_rejects_shared_segments() {
        let a = PairwiseMatch::new(
            1,
            10,
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
            1.0,
        );
        let same_model = PairwiseMatch::new(
            1,
            11,
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            1.0,
        );
        let same_scene = PairwiseMatch::new(
            2,
            10,
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            1.0,
        );
        let distinct = PairwiseMatch::new(
            2,
            11,
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.5, 0.0, 0.0),
            1.0,
        );
        assert!(consistency_distance(&a, &same_model, 100.0).is_none());
        assert!(consistency_distance(&a, &same_scene, 100.0).is_none());
        let d = consistency_distance(&a, &distinct, 100.0).expect("pair should be comparable");
        assert!((d - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_consistency_distance_early_reject() {
        let a = PairwiseMatch::new(
            1,
            10,
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
            1.0,
        );
        let far = PairwiseMatch::new(
            2,
            11,
            Point3::new(50.0, 0.0, 0.0),
            Point3::new(50.0, 0.0, 0.0),
            1.0,
        );
        assert!(consistency_distance(&a, &far, 10.0).is_none());
        assert!(consistency_distance(&a, &far, 100.0).is_some());
    }

    #[test]
    #[should_panic(expected = "min_cluster_size")]
    fn test_min_cluster_size_below_two_is_rejected() {
        let params = ConsistencyParams {
            resolution: 0.1,
            min_cluster_size: 1,
        };
        ExhaustiveRecognizer::new(params, 10.0);
    }
}
