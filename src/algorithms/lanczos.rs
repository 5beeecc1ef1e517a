//! Symmetric Lanczos recurrence over a rotating basis window.
//!
//! This module implements Paige's A1/A27 variant of the Lanczos method with
//! configurable partial re-orthogonalization. The recurrence expands the
//! Krylov subspace K_k(A, q) one matrix-vector product at a time, writing the
//! diagonal (α) and sub-diagonal (β) of the tridiagonalization T = QᵀAQ into
//! caller-owned buffers.
//!
//! Memory usage is the distinguishing feature: instead of materializing all
//! `k` basis vectors, only the most recent `ncv` of them are retained in a
//! rotating n×ncv column window. The three-term recurrence needs just the
//! current and previous vectors, and partial re-orthogonalization only
//! reaches the recent window, so the degree `k` can grow without the basis
//! storage growing with it. Memory is O(n·ncv), independent of `k`.
//!
//! ## When to use this module directly
//!
//! - You need the Lanczos coefficients (α, β) or the resident basis window
//!   for a single starting vector
//! - You want to drive the quadrature in [`crate::algorithms::quadrature`]
//!   with your own probe management
//!
//! For Monte-Carlo estimation over many probes, prefer
//! [`crate::sampling::slq`], which owns buffer reuse and parallel dispatch.

use crate::error::{SlqError, SlqErrorKind};
use crate::operator::LinearOperator;
use crate::utils::{axpy, dot, from_usize, norm_l2};
use num_traits::Float;

/// Summary of a completed (possibly early-terminated) Lanczos run.
#[derive(Clone, Copy, Debug)]
pub struct LanczosInfo<F> {
    /// Number of steps actually executed; `alpha[0..steps_taken)` and
    /// `beta[1..=steps_taken]` are defined. Less than the requested degree
    /// exactly when an invariant subspace was detected.
    pub steps_taken: usize,
    /// Euclidean norm of the starting vector before normalization.
    pub start_norm: F,
    /// The residual norm `beta[steps_taken]` as computed, even when it fell
    /// below the early-stop threshold.
    pub final_residual: F,
}

/// Indices of the previous, current, and next columns of the rotating
/// window. Rotating left is a constant-time relabeling.
#[derive(Clone, Copy, Debug)]
struct WindowPos {
    prev: usize,
    cur: usize,
    next: usize,
}

impl WindowPos {
    fn initial(ncv: usize) -> Self {
        Self { prev: ncv - 1, cur: 0, next: 1 }
    }

    fn rotate(&mut self, step: usize, ncv: usize) {
        self.prev = self.cur;
        self.cur = self.next;
        self.next = (step + 2) % ncv;
    }
}

/// Runs up to `degree` steps of the symmetric Lanczos recurrence on
/// `operator`, expanding the Krylov subspace seeded by `q`.
///
/// On return, `alpha[0..steps)` holds the diagonal of T and
/// `beta[1..=steps]` the sub-diagonal norms, where `steps` is
/// [`LanczosInfo::steps_taken`]; `beta[0]` is the conventional zero sentinel
/// and must be zero on entry. Entries past `steps` are left untouched.
/// `basis` is a column-major n×`ncv` window holding the `ncv` most recent
/// orthonormal Lanczos vectors; `q` is overwritten with the final
/// (un-normalized) residual.
///
/// When `orth > 0`, each residual is additionally projected once, in
/// modified Gram–Schmidt order, against the `orth` most recently written
/// columns of the window other than the current one (clipped to what is
/// resident). `orth = ncv − 1` re-orthogonalizes against every resident
/// column; no correction is ever applied against columns already evicted
/// from the window. The pass is performed once per step; callers wanting a
/// doubled pass should raise `orth` instead.
///
/// The iteration stops early when the residual norm falls below
/// `√n · rtol`, which signals that the Krylov subspace is (numerically)
/// invariant. Early termination is reported through the returned
/// [`LanczosInfo`], not as an error.
///
/// # Errors
///
/// * [`SlqErrorKind::InvalidArgument`] on violated preconditions:
///   non-square operator, `q.len() != n`, `ncv < 2`, `ncv > degree`,
///   `orth > ncv − 1`, negative `rtol`, or undersized output buffers
///   (`alpha` needs `degree` entries, `beta` needs `degree + 1`, `basis`
///   needs `n · ncv`).
/// * [`SlqErrorKind::ZeroStartVector`] when `q` has zero norm.
/// * [`SlqErrorKind::NonFiniteInput`] when the starting vector or any
///   computed coefficient is NaN or infinite.
/// * [`SlqErrorKind::OperatorFailure`] when the operator's `matvec` fails.
///
/// On error the output buffers may hold partial results and must be treated
/// as garbage.
#[allow(clippy::too_many_arguments)]
pub fn lanczos_recurrence<F, O>(
    operator: &O,
    q: &mut [F],
    degree: usize,
    rtol: F,
    orth: usize,
    alpha: &mut [F],
    beta: &mut [F],
    basis: &mut [F],
    ncv: usize,
) -> Result<LanczosInfo<F>, SlqError>
where
    F: Float,
    O: LinearOperator<F> + ?Sized,
{
    let (nrows, ncols) = operator.shape();
    if nrows != ncols {
        return Err(SlqErrorKind::InvalidArgument(format!(
            "operator must be square: got {nrows}x{ncols}"
        ))
        .into());
    }
    let n = nrows;
    if n == 0 {
        return Err(SlqErrorKind::InvalidArgument("operator has order zero".to_string()).into());
    }
    if q.len() != n {
        return Err(SlqErrorKind::InvalidArgument(format!(
            "starting vector has length {} but the operator has order {n}",
            q.len()
        ))
        .into());
    }
    if ncv < 2 || ncv > degree {
        return Err(SlqErrorKind::InvalidArgument(format!(
            "ncv must satisfy 2 <= ncv <= degree: got ncv={ncv}, degree={degree}"
        ))
        .into());
    }
    if orth > ncv - 1 {
        return Err(SlqErrorKind::InvalidArgument(format!(
            "orth must be at most ncv - 1: got orth={orth}, ncv={ncv}"
        ))
        .into());
    }
    if !(rtol >= F::zero()) {
        return Err(
            SlqErrorKind::InvalidArgument("rtol must be non-negative".to_string()).into(),
        );
    }
    if alpha.len() < degree {
        return Err(SlqErrorKind::InvalidArgument(format!(
            "alpha buffer has length {} but degree is {degree}",
            alpha.len()
        ))
        .into());
    }
    if beta.len() < degree + 1 {
        return Err(SlqErrorKind::InvalidArgument(format!(
            "beta buffer has length {} but degree + 1 is {}",
            beta.len(),
            degree + 1
        ))
        .into());
    }
    if basis.len() < n * ncv {
        return Err(SlqErrorKind::InvalidArgument(format!(
            "basis buffer has length {} but n * ncv is {}",
            basis.len(),
            n * ncv
        ))
        .into());
    }

    let start_norm = norm_l2(q);
    if !start_norm.is_finite() {
        return Err(SlqErrorKind::NonFiniteInput("starting vector".to_string()).into());
    }
    if start_norm == F::zero() {
        return Err(SlqErrorKind::ZeroStartVector.into());
    }

    // Load the normalized starting vector into column 0 of the window.
    let inv_norm = start_norm.recip();
    for (dst, &src) in basis[..n].iter_mut().zip(q.iter()) {
        *dst = src * inv_norm;
    }

    let residual_tol = from_usize::<F>(n).sqrt() * rtol;
    let mut pos = WindowPos::initial(ncv);
    let mut steps_taken = 0;
    let mut final_residual = F::zero();

    for j in 0..degree {
        let WindowPos { prev, cur, next } = pos;

        // v = A q_c, computed into the residual buffer.
        {
            let q_cur = &basis[cur * n..(cur + 1) * n];
            operator
                .matvec(q_cur, q)
                .map_err(|e| SlqErrorKind::OperatorFailure(e.to_string()))?;
        }

        // v -= beta[j] q_p. At j = 0 the previous column does not exist and
        // beta[0] = 0, so the subtraction is skipped outright.
        if j > 0 {
            let q_prev = &basis[prev * n..(prev + 1) * n];
            axpy(-beta[j], q_prev, q);
        }

        let q_cur = &basis[cur * n..(cur + 1) * n];
        alpha[j] = dot(q_cur, q); // Rayleigh quotient
        axpy(-alpha[j], q_cur, q);

        // One modified Gram-Schmidt pass against the `orth` most recently
        // written resident columns other than the current one, newest first.
        let reach = orth.min(j).min(ncv - 1);
        for t in 1..=reach {
            let col = (cur + ncv - t) % ncv;
            let u = &basis[col * n..(col + 1) * n];
            let proj = dot(u, q);
            axpy(-proj, u, q);
        }

        beta[j + 1] = norm_l2(q);
        if !alpha[j].is_finite() || !beta[j + 1].is_finite() {
            return Err(SlqErrorKind::NonFiniteInput(format!(
                "lanczos coefficients at step {j}"
            ))
            .into());
        }

        steps_taken = j + 1;
        final_residual = beta[j + 1];

        // Early-stop when K_j(A, q) is a near-invariant subspace. Breaking
        // before the write below keeps the next column's slot holding a
        // still-valid earlier vector.
        if beta[j + 1] < residual_tol || j + 1 == degree {
            break;
        }

        let scale = beta[j + 1].recip();
        for (dst, &src) in basis[next * n..(next + 1) * n].iter_mut().zip(q.iter()) {
            *dst = src * scale;
        }

        pos.rotate(j, ncv);
    }

    Ok(LanczosInfo {
        steps_taken,
        start_norm,
        final_residual,
    })
}
