//! Gauss–Lanczos quadrature from the tridiagonal coefficients.
//!
//! Given the (α, β) produced by the Lanczos recurrence, the eigenvalues θ of
//! the order-k symmetric tridiagonal T are the Ritz values of the operator,
//! and the squared first components of T's normalized eigenvectors are the
//! weights of the k-point Gauss quadrature rule for the spectral measure
//! induced by the starting vector (Golub–Welsch). The rule satisfies
//! Σᵢ τᵢ·p(θᵢ) = q̂ᵀ p(A) q̂ exactly for polynomials p of degree ≤ 2k − 1.
//!
//! For the orders this crate targets (k up to a few hundred) a full dense
//! eigendecomposition of T is cheap, so the weights are read directly off
//! the first row of the eigenvector matrix rather than solved for per node.

use crate::error::{SlqError, SlqErrorKind};
use faer::prelude::*;
use faer::traits::RealField;
use faer::{Mat, Side};
use num_traits::Float;
use std::cmp::Ordering;

/// Computes the k-point Gauss quadrature rule of the symmetric tridiagonal
/// with diagonal `alpha[0..k)` and sub-diagonal `beta[1..k)`.
///
/// `beta[0]` is ignored (the recurrence keeps a zero sentinel there).
/// `nodes[0..k)` receives the Ritz values in non-decreasing order and
/// `weights[0..k)` the matching squared first eigenvector components, which
/// sum to one to machine precision.
///
/// # Errors
///
/// * [`SlqErrorKind::InvalidArgument`] when `k == 0` or any buffer is
///   shorter than `k`.
/// * [`SlqErrorKind::NonFiniteInput`] when the used ranges of `alpha` or
///   `beta` contain NaN or infinity.
/// * [`SlqErrorKind::Eigensolver`] when faer's eigendecomposition fails
///   (not observed on finite input).
pub fn lanczos_quadrature<F>(
    alpha: &[F],
    beta: &[F],
    k: usize,
    nodes: &mut [F],
    weights: &mut [F],
) -> Result<(), SlqError>
where
    F: RealField + Float,
{
    if k == 0 {
        return Err(
            SlqErrorKind::InvalidArgument("quadrature order must be at least 1".to_string())
                .into(),
        );
    }
    if alpha.len() < k || beta.len() < k {
        return Err(SlqErrorKind::InvalidArgument(format!(
            "coefficient buffers have lengths {}/{} but the order is {k}",
            alpha.len(),
            beta.len()
        ))
        .into());
    }
    if nodes.len() < k || weights.len() < k {
        return Err(SlqErrorKind::InvalidArgument(format!(
            "output buffers have lengths {}/{} but the order is {k}",
            nodes.len(),
            weights.len()
        ))
        .into());
    }
    if alpha[..k].iter().any(|a| !a.is_finite()) {
        return Err(SlqErrorKind::NonFiniteInput("tridiagonal diagonal".to_string()).into());
    }
    if beta[1..k].iter().any(|b| !b.is_finite()) {
        return Err(SlqErrorKind::NonFiniteInput("tridiagonal sub-diagonal".to_string()).into());
    }

    // Assemble the dense symmetric tridiagonal. The sub-diagonal is offset
    // by one: beta[j + 1] is the norm computed at step j.
    let mut t = Mat::<F>::zeros(k, k);
    for (i, &a) in alpha[..k].iter().enumerate() {
        t.as_mut()[(i, i)] = a;
    }
    for (i, &b) in beta[1..k].iter().enumerate() {
        t.as_mut()[(i, i + 1)] = b;
        t.as_mut()[(i + 1, i)] = b;
    }

    let evd = t
        .as_ref()
        .self_adjoint_eigen(Side::Upper)
        .map_err(|e| SlqError::from(SlqErrorKind::Eigensolver(e)))?;
    let theta = evd.S();
    let y = evd.U();

    // Emit in non-decreasing node order with the weights carried along.
    let mut order: Vec<usize> = (0..k).collect();
    order.sort_by(|&i, &j| theta[i].partial_cmp(&theta[j]).unwrap_or(Ordering::Equal));
    for (out, &src) in order.iter().enumerate() {
        nodes[out] = theta[src];
        let tau = y[(0, src)];
        weights[out] = tau * tau;
    }

    Ok(())
}
