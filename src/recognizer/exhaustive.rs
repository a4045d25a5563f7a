//! Exhaustive consistency-graph construction.
//!
//! Recomputes every pairwise consistency on each call. Costs O(n²)
//! consistency tests per recognition but needs no state, making it the
//! reference behavior the incremental builder must reproduce, and the right
//! choice when centroids are not stable between calls.

use crate::graph::ConsistencyGraph;
use crate::matches::PairwiseMatch;

use super::{consistency_distance, ConsistencyGraphBuilder, ConsistencyParams};

/// Stateless consistency-graph builder testing all match pairs each call.
#[derive(Debug)]
pub struct ExhaustiveGraphBuilder {
    max_consistency_distance: f32,
    max_target_distance: f32,
}

impl ExhaustiveGraphBuilder {
    pub fn new(params: &ConsistencyParams, max_model_radius: f32) -> Self {
        Self {
            max_consistency_distance: params.resolution,
            max_target_distance: super::max_target_distance(params, max_model_radius),
        }
    }
}

impl ConsistencyGraphBuilder for ExhaustiveGraphBuilder {
    fn build(&mut self, predicted_matches: &[PairwiseMatch]) -> ConsistencyGraph {
        let n_matches = predicted_matches.len();
        let mut consistency_graph = ConsistencyGraph::new(n_matches);

        for first_index in 0..n_matches {
            for second_index in (first_index + 1)..n_matches {
                let distance = consistency_distance(
                    &predicted_matches[first_index],
                    &predicted_matches[second_index],
                    self.max_target_distance,
                );
                if let Some(distance) = distance {
                    if distance <= self.max_consistency_distance {
                        consistency_graph.add_edge(first_index as u32, second_index as u32);
                    }
                }
            }
        }

        consistency_graph
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::UndirectedGraph;
    use crate::matches::PairwiseMatches;
    use crate::Point3;

    use super::*;

    fn params() -> ConsistencyParams {
        ConsistencyParams {
            resolution: 0.1,
            min_cluster_size: 3,
        }
    }

    #[test]
    fn test_graph_is_symmetric_without_self_loops() {
        // Three consistent matches and one with a displaced scene centroid.
        let positions = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mut matches: PairwiseMatches = positions
            .iter()
            .enumerate()
            .map(|(i, &p)| PairwiseMatch::new(1 + i as i64, 101 + i as i64, p, p, 1.0))
            .collect();
        matches.push(PairwiseMatch::new(
            4,
            104,
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(4.0, 4.0, 4.0),
            1.0,
        ));

        let graph = ExhaustiveGraphBuilder::new(&params(), 10.0).build(&matches);
        assert_eq!(graph.num_edges(), 3);
        for u in 0..graph.num_vertices() as u32 {
            for &v in graph.neighbors(u) {
                assert_ne!(u, v, "self-loop on {}", u);
                assert!(graph.has_edge(v, u), "asymmetric edge ({}, {})", u, v);
            }
        }
        assert_eq!(graph.neighbors(3), &[] as &[u32]);
    }

    #[test]
    fn test_shared_segment_ids_never_connect() {
        // Same geometry on both sides, but the second match reuses the model
        // segment of the first and the third reuses its scene segment.
        let p0 = Point3::new(0.0, 0.0, 0.0);
        let p1 = Point3::new(1.0, 0.0, 0.0);
        let matches = vec![
            PairwiseMatch::new(1, 101, p0, p0, 1.0),
            PairwiseMatch::new(1, 102, p1, p1, 1.0),
            PairwiseMatch::new(2, 101, p1, p1, 1.0),
        ];

        let graph = ExhaustiveGraphBuilder::new(&params(), 10.0).build(&matches);
        assert!(!graph.has_edge(0, 1), "shared model segment must not connect");
        assert!(!graph.has_edge(0, 2), "shared scene segment must not connect");
        assert!(graph.has_edge(1, 2));
    }

    #[test]
    fn test_early_reject_cuts_distant_model_pairs() {
        // Both pairs have zero consistency distance, but the second lies far
        // outside the model's bounding diameter.
        let p0 = Point3::new(0.0, 0.0, 0.0);
        let far = Point3::new(30.0, 0.0, 0.0);
        let matches = vec![
            PairwiseMatch::new(1, 101, p0, p0, 1.0),
            PairwiseMatch::new(2, 102, far, far, 1.0),
        ];

        let graph = ExhaustiveGraphBuilder::new(&params(), 5.0).build(&matches);
        assert_eq!(graph.num_edges(), 0);
        let graph = ExhaustiveGraphBuilder::new(&params(), 50.0).build(&matches);
        assert_eq!(graph.num_edges(), 1);
    }
}
