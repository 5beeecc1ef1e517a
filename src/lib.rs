//! # Stochastic Lanczos Quadrature
//!
//! Numerical kernels for estimating spectral quantities of large symmetric
//! linear operators, above all traces of matrix functions tr(f(A)), when the
//! operator is only available through its matrix-vector product.
//!
//! The crate provides three layers, composed bottom-up:
//!
//! - [`lanczos_recurrence`]: the symmetric Lanczos three-term recurrence
//!   with a rotating, bounded-memory basis window and tunable partial
//!   re-orthogonalization.
//! - [`lanczos_quadrature`]: the Gauss quadrature rule (Ritz values and
//!   squared first eigenvector components) of the resulting tridiagonal.
//! - [`slq`]: the parallel Monte-Carlo driver sampling isotropic probes and
//!   streaming per-probe quadrature rules to a user-supplied reducer.

pub mod algorithms;
pub mod error;
pub mod operator;
pub mod random;
pub mod sampling;
mod utils;

// Re-export key types to the top level of the crate for easier access.
pub use algorithms::{LanczosInfo, lanczos_quadrature, lanczos_recurrence};
pub use error::{SlqError, SlqErrorKind};
pub use operator::{DiagonalOperator, LinearOperator};
pub use random::{ChaChaProbes, Distribution, ProbeGenerator};
pub use sampling::{QuadratureReducer, SlqParams, slq};
