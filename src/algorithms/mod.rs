//! Numerical kernels: the Lanczos recurrence and Gauss–Lanczos quadrature.
//!
//! These are the two sequential building blocks that the sampling driver in
//! [`crate::sampling`] composes per probe vector. Both operate on
//! caller-owned buffers and never allocate proportionally to the problem
//! size.

pub mod lanczos;
pub mod quadrature;

pub use lanczos::{LanczosInfo, lanczos_recurrence};
pub use quadrature::lanczos_quadrature;
