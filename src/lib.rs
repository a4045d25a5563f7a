//! Geomatch: geometric-consistency recognition of a rigid 3D model in a scene
//!
//! The input is a bag of noisy candidate correspondences between model
//! segments and scene segments, each carrying an identifier pair and the two
//! segment centroids. Recognition filters the bag down to a mutually
//! consistent subset by searching a consistency graph for a maximum clique,
//! then estimates the rigid model-to-scene transform from the surviving
//! centroid pairs.

pub mod graph;
pub mod matches;
pub mod recognizer;

pub use graph::clique::find_maximum_clique;
pub use graph::{ConsistencyGraph, UndirectedGraph};
pub use matches::{Id, IdPair, PairwiseMatch, PairwiseMatches, PointPair};
pub use recognizer::{
    exhaustive::ExhaustiveGraphBuilder, incremental::IncrementalGraphBuilder,
    transform::estimate_rigid_transform, ConsistencyGraphBuilder, ConsistencyParams,
    ExhaustiveRecognizer, IncrementalRecognizer, Recognizer,
};

// Commonly used types
// Note: 32-bit floats carry the pairwise geometry; the rigid-transform
// estimation switches to 64-bit for its SVD step, where single precision
// has shown to be insufficiently accurate.
pub type Point3 = nalgebra::Point3<f32>;
pub type Vector3 = nalgebra::Vector3<f32>;
pub type Matrix4 = nalgebra::Matrix4<f32>;
