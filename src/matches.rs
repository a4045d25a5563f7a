//! Match data model: hypothesized correspondences between segments of the
//! model and segments of the scene, carrying the segment identifiers and
//! both segment centroids.

use nalgebra::DMatrix;

use crate::Point3;

/// Segment identifier. Valid identifiers are positive.
pub type Id = i64;

/// Ordered pair of segment identifiers: the model segment first, the scene
/// segment second.
///
/// Equality and hashing are over the ordered pair, so `(a, b)` and `(b, a)`
/// are distinct keys. The derived hash mixes both halves, which is all the
/// cache index requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdPair {
    pub model: Id,
    pub scene: Id,
}

impl IdPair {
    pub fn new(model: Id, scene: Id) -> Self {
        Self { model, scene }
    }
}

/// Pair of centroids for one match: the segment centroid in the model frame
/// and the corresponding segment centroid in the scene frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointPair {
    pub model: Point3,
    pub scene: Point3,
}

impl PointPair {
    pub fn new(model: Point3, scene: Point3) -> Self {
        Self { model, scene }
    }
}

/// A hypothesized correspondence between one model segment and one scene
/// segment.
///
/// The identifier pair uniquely identifies the correspondence within a single
/// recognition call; the centroids may be refined by upstream segmentation
/// between calls.
#[derive(Debug, Clone, PartialEq)]
pub struct PairwiseMatch {
    pub ids: IdPair,
    /// Confidence of the match as reported by the upstream matcher.
    pub confidence: f32,
    pub centroids: PointPair,
    /// Descriptor payload of the model segment. Opaque to recognition,
    /// carried along for downstream consumers.
    pub features_model: Option<DMatrix<f64>>,
    /// Descriptor payload of the scene segment. Opaque to recognition.
    pub features_scene: Option<DMatrix<f64>>,
}

impl PairwiseMatch {
    pub fn new(
        model_id: Id,
        scene_id: Id,
        model_centroid: Point3,
        scene_centroid: Point3,
        confidence: f32,
    ) -> Self {
        Self {
            ids: IdPair::new(model_id, scene_id),
            confidence,
            centroids: PointPair::new(model_centroid, scene_centroid),
            features_model: None,
            features_scene: None,
        }
    }
}

/// Vector of matches, as produced by the upstream matcher and consumed by
/// recognition. Index order is preserved by the consistency graph.
pub type PairwiseMatches = Vec<PairwiseMatch>;

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_id_pair_is_ordered() {
        assert_ne!(IdPair::new(1, 2), IdPair::new(2, 1));
        assert_eq!(IdPair::new(3, 7), IdPair::new(3, 7));

        let mut map = HashMap::new();
        map.insert(IdPair::new(1, 2), "forward");
        map.insert(IdPair::new(2, 1), "reversed");
        assert_eq!(map.len(), 2);
        assert_eq!(map[&IdPair::new(1, 2)], "forward");
    }

    #[test]
    fn test_match_carries_centroids() {
        let m = PairwiseMatch::new(
            4,
            9,
            Point3::new(1.0, 2.0, 3.0),
            Point3::new(4.0, 5.0, 6.0),
            0.8,
        );
        assert_eq!(m.ids, IdPair::new(4, 9));
        assert_eq!(m.centroids.model, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(m.centroids.scene, Point3::new(4.0, 5.0, 6.0));
        assert!(m.features_model.is_none());
    }
}
