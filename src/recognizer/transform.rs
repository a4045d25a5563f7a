//! Rigid-transform estimation between paired centroid sets.
//!
//! Implements the least-squares estimation of rigid motion between two point
//! patterns ("Least-squares estimation of transformation parameters between
//! two point patterns", Shinji Umeyama, DOI: 10.1109/34.88573), without the
//! scaling term. The cross-covariance SVD is computed in f64 and the result
//! converted back to f32: single precision has proven too coarse for this
//! step.

use nalgebra::{Matrix3, Vector3};

use crate::{Matrix4, Point3};

/// Estimate the rigid transform mapping the `model` points onto the `scene`
/// points.
///
/// Returns the 4×4 homogeneous transform `T` minimizing the squared residual
/// of `scene_i ≈ T · model_i` over a rotation and a translation. Returns
/// `None` when the SVD of the cross-covariance does not yield both factors.
///
/// Both slices must have the same length; the solver is only exercised with
/// small point counts (at most eight pairs per recognition).
pub fn estimate_rigid_transform(model: &[Point3], scene: &[Point3]) -> Option<Matrix4> {
    assert_eq!(
        model.len(),
        scene.len(),
        "model and scene point counts differ"
    );
    if model.is_empty() {
        return None;
    }

    // Demean both point sets.
    let n = model.len() as f64;
    let mut model_mean = Vector3::<f64>::zeros();
    let mut scene_mean = Vector3::<f64>::zeros();
    for (m, s) in model.iter().zip(scene.iter()) {
        model_mean += m.coords.cast::<f64>();
        scene_mean += s.coords.cast::<f64>();
    }
    model_mean /= n;
    scene_mean /= n;

    // Cross-covariance H = Σ (scene_i − μ_scene)(model_i − μ_model)ᵀ.
    let mut h = Matrix3::<f64>::zeros();
    for (m, s) in model.iter().zip(scene.iter()) {
        let dm = m.coords.cast::<f64>() - model_mean;
        let ds = s.coords.cast::<f64>() - scene_mean;
        h += ds * dm.transpose();
    }

    let svd = h.svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;
    let mut rotation = u * v_t;
    if rotation.determinant() < 0.0 {
        // Reflection: flip the weakest singular direction to get a proper
        // rotation.
        let mut u_fixed = u;
        u_fixed.column_mut(2).neg_mut();
        rotation = u_fixed * v_t;
    }

    let translation = scene_mean - rotation * model_mean;

    let mut transform = Matrix4::identity();
    transform
        .fixed_view_mut::<3, 3>(0, 0)
        .copy_from(&rotation.cast::<f32>());
    transform
        .fixed_view_mut::<3, 1>(0, 3)
        .copy_from(&translation.cast::<f32>());
    Some(transform)
}
