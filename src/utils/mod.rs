//! Shared scalar and slice kernels.
//!
//! The Lanczos recurrence works on caller-owned contiguous buffers, so the
//! handful of BLAS-1 style operations it needs are implemented here directly
//! on slices. All index-to-float casts go through [`from_usize`] /
//! [`from_f64`]; a failed conversion (not reachable for IEEE scalar types)
//! maps to NaN, which the kernels' finiteness checks reject.

use num_traits::Float;

/// dot(x, y) over equal-length slices.
#[inline]
pub(crate) fn dot<F: Float>(x: &[F], y: &[F]) -> F {
    debug_assert_eq!(x.len(), y.len());
    x.iter()
        .zip(y)
        .fold(F::zero(), |acc, (&xi, &yi)| acc + xi * yi)
}

/// Euclidean norm of a slice.
#[inline]
pub(crate) fn norm_l2<F: Float>(x: &[F]) -> F {
    dot(x, x).sqrt()
}

/// y ← y + a·x.
#[inline]
pub(crate) fn axpy<F: Float>(a: F, x: &[F], y: &mut [F]) {
    debug_assert_eq!(x.len(), y.len());
    for (yi, &xi) in y.iter_mut().zip(x) {
        *yi = *yi + a * xi;
    }
}

#[inline]
pub(crate) fn from_usize<F: Float>(value: usize) -> F {
    F::from(value).unwrap_or_else(F::nan)
}

#[inline]
pub(crate) fn from_f64<F: Float>(value: f64) -> F {
    F::from(value).unwrap_or_else(F::nan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_and_norm() {
        let x = [3.0f64, 4.0];
        assert_eq!(dot(&x, &x), 25.0);
        assert_eq!(norm_l2(&x), 5.0);
    }

    #[test]
    fn test_axpy_accumulates() {
        let x = [1.0f64, -2.0, 0.5];
        let mut y = [10.0f64, 10.0, 10.0];
        axpy(2.0, &x, &mut y);
        assert_eq!(y, [12.0, 6.0, 11.0]);
    }

    #[test]
    fn test_casts_are_exact_for_small_integers() {
        assert_eq!(from_usize::<f32>(100), 100.0f32);
        assert_eq!(from_f64::<f64>(0.25), 0.25);
    }
}
