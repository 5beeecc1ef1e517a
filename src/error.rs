//! This module defines the custom error types for the library.
//!
//! All failure conditions of the stochastic Lanczos quadrature kernels are
//! centralized in a single enum, [`SlqErrorKind`], wrapped by the opaque
//! [`SlqError`] type that the public functions return.
//!
//! Using the [`thiserror`] crate allows us to create idiomatic error types
//! with minimal boilerplate. Note that [`faer::linalg::evd::EvdError`] does
//! not implement the standard [`std::error::Error`] trait, so we wrap it
//! manually to provide a compatible error type.

use thiserror::Error;

/// Represents all possible errors that can occur in the quadrature kernels.
#[derive(Error, Debug)]
#[error(transparent)]
pub struct SlqError(#[from] SlqErrorKind);

/// The distinct kinds of errors.
///
/// Numerical failures are deterministic given the inputs, so no kind here is
/// ever worth retrying. Early termination of the Lanczos iteration on an
/// invariant subspace is *not* an error; it is reported through
/// [`crate::algorithms::LanczosInfo::steps_taken`].
#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum SlqErrorKind {
    /// A precondition on dimensions, buffer lengths, or parameter relations
    /// was violated.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The starting vector has zero norm, so there is no Krylov subspace to
    /// expand.
    #[error("starting vector has zero norm; the Krylov subspace is empty")]
    ZeroStartVector,

    /// A NaN or infinity was encountered in the named input or intermediate.
    #[error("non-finite value encountered in {0}")]
    NonFiniteInput(String),

    /// The caller's matrix-vector product signalled failure.
    #[error("operator matvec failed: {0}")]
    OperatorFailure(String),

    /// The caller's per-sample reducer signalled failure.
    #[error("reducer failed on sample {sample}: {message}")]
    ReducerFailure { sample: usize, message: String },

    /// Wraps an error originating from [`faer`]'s eigendecomposition module.
    #[error("eigendecomposition of the tridiagonal matrix failed: {0:?}")]
    Eigensolver(faer::linalg::evd::EvdError),

    /// The worker pool backing the sampling driver could not be constructed.
    #[error("worker pool construction failed: {0}")]
    ThreadPool(String),
}

impl SlqError {
    /// The kind of failure, for callers that need to distinguish them.
    pub fn kind(&self) -> &SlqErrorKind {
        &self.0
    }
}

// Manually implement PartialEq for the public error type.
// We compare the inner `SlqErrorKind`.
impl PartialEq for SlqError {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
