//! This module defines the core abstraction for linear operators.
//!
//! The Lanczos process never inspects individual matrix entries; its only
//! fundamental operation is the matrix-vector product. The algorithms in this
//! crate are therefore written against the [`LinearOperator`] trait, a
//! "matrix-free" contract exposing just the operator's shape and its action
//! on a vector:
//!
//! 1.  **Generality**: the same recurrence runs on dense matrices, sparse
//!     matrices, or operators that never materialize a matrix at all (graph
//!     Laplacians, kernel matrices, compositions).
//! 2.  **Testability**: the algorithms are validated on small dense and
//!     diagonal operators with analytically known spectra, then deployed on
//!     large implicit operators without changing the core logic.
//!
//! The trait works on plain scalar slices rather than matrix views so that
//! callers with externally owned buffers (including the sampling driver's
//! per-worker workspaces) can invoke it without copies.

use faer::linalg::matmul::matmul;
use faer::traits::RealField;
use faer::{Accum, Mat, MatMut, MatRef, Par};
use num_traits::Float;

/// A symmetric linear operator available through its matrix-vector product.
///
/// Implementations must be cheap to call repeatedly: the Lanczos recurrence
/// performs one `matvec` per step, and the sampling driver calls it from
/// several worker threads concurrently (hence the `Sync` bounds at the call
/// sites, not here).
///
/// The quadrature kernels assume, but cannot verify, that the operator is
/// numerically symmetric; no guarantee is made about their output otherwise.
pub trait LinearOperator<F> {
    /// Returns `(nrows, ncols)` of the operator.
    fn shape(&self) -> (usize, usize);

    /// Computes `y ← A · x` for `x` of length `ncols` and `y` of length
    /// `nrows`.
    ///
    /// Failures (dimension mismatches, backend errors, I/O behind an
    /// implicit operator) are reported through the returned error and
    /// surface from the kernels as
    /// [`OperatorFailure`](crate::error::SlqErrorKind::OperatorFailure).
    fn matvec(&self, x: &[F], y: &mut [F]) -> anyhow::Result<()>;
}

/// Implementation of [`LinearOperator`] for `faer`'s immutable dense matrix
/// view. This is the primary concrete implementation that the generic
/// algorithms are tested against.
impl<F: RealField + Float> LinearOperator<F> for MatRef<'_, F> {
    #[inline]
    fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    fn matvec(&self, x: &[F], y: &mut [F]) -> anyhow::Result<()> {
        anyhow::ensure!(
            x.len() == self.ncols(),
            "matvec input has length {} but the operator has {} columns",
            x.len(),
            self.ncols(),
        );
        anyhow::ensure!(
            y.len() == self.nrows(),
            "matvec output has length {} but the operator has {} rows",
            y.len(),
            self.nrows(),
        );

        let x_mat = MatRef::from_column_major_slice(x, x.len(), 1);
        let y_mat = MatMut::from_column_major_slice_mut(y, y.len(), 1);

        // Defer to faer's matrix multiplication kernel.
        matmul(y_mat, Accum::Replace, *self, x_mat, F::one(), Par::Seq);
        Ok(())
    }
}

/// Implementation for `faer`'s owned dense matrix, delegating to the
/// [`MatRef`] implementation.
impl<F: RealField + Float> LinearOperator<F> for Mat<F> {
    #[inline]
    fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    #[inline]
    fn matvec(&self, x: &[F], y: &mut [F]) -> anyhow::Result<()> {
        self.as_ref().matvec(x, y)
    }
}

/// A diagonal operator `A = diag(d)`.
///
/// The workhorse of the test suite: its spectrum is its diagonal, so ground
/// truths for trace and quadrature identities are available analytically.
#[derive(Clone, Debug)]
pub struct DiagonalOperator<F> {
    diag: Vec<F>,
}

impl<F: Float> DiagonalOperator<F> {
    pub fn new(diag: Vec<F>) -> Self {
        Self { diag }
    }

    /// The diagonal entries, i.e. the eigenvalues.
    pub fn diag(&self) -> &[F] {
        &self.diag
    }
}

impl<F: Float> LinearOperator<F> for DiagonalOperator<F> {
    #[inline]
    fn shape(&self) -> (usize, usize) {
        (self.diag.len(), self.diag.len())
    }

    fn matvec(&self, x: &[F], y: &mut [F]) -> anyhow::Result<()> {
        anyhow::ensure!(
            x.len() == self.diag.len() && y.len() == self.diag.len(),
            "matvec buffers have lengths {}/{} but the operator has order {}",
            x.len(),
            y.len(),
            self.diag.len(),
        );
        for ((yi, &xi), &di) in y.iter_mut().zip(x).zip(&self.diag) {
            *yi = di * xi;
        }
        Ok(())
    }
}

// Unit tests to verify the trait implementations against direct products.
#[cfg(test)]
mod tests {
    use super::*;
    use faer::mat;

    #[test]
    fn test_dense_matvec_matches_direct_product() -> anyhow::Result<()> {
        let matrix: Mat<f64> = mat![[2.0, -1.0, 0.0], [-1.0, 2.0, -1.0], [0.0, -1.0, 2.0]];
        let x = [1.0, 2.0, 3.0];
        let mut y = [0.0; 3];

        matrix.matvec(&x, &mut y)?;

        let expected = [2.0 * 1.0 - 2.0, -1.0 + 4.0 - 3.0, -2.0 + 6.0];
        assert_eq!(y, expected);
        assert_eq!(matrix.shape(), (3, 3));
        Ok(())
    }

    #[test]
    fn test_dense_matvec_rejects_dimension_mismatch() {
        let matrix: Mat<f64> = mat![[1.0, 0.0], [0.0, 1.0]];
        let x = [1.0, 2.0, 3.0]; // wrong length
        let mut y = [0.0; 2];
        assert!(matrix.matvec(&x, &mut y).is_err());
    }

    #[test]
    fn test_diagonal_operator_scales_entries() -> anyhow::Result<()> {
        let op = DiagonalOperator::new(vec![1.0, 2.0, 3.0]);
        let x = [4.0, 5.0, 6.0];
        let mut y = [0.0; 3];
        op.matvec(&x, &mut y)?;
        assert_eq!(y, [4.0, 10.0, 18.0]);
        assert_eq!(op.shape(), (3, 3));
        assert_eq!(op.diag(), &[1.0, 2.0, 3.0]);
        Ok(())
    }

    #[test]
    fn test_operator_is_object_safe() -> anyhow::Result<()> {
        let matrix: Mat<f64> = mat![[1.0, 2.0], [2.0, 1.0]];
        let operator: &dyn LinearOperator<f64> = &matrix;
        let mut y = [0.0; 2];
        operator.matvec(&[1.0, 1.0], &mut y)?;
        assert_eq!(y, [3.0, 3.0]);
        Ok(())
    }
}
