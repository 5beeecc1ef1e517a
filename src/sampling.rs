//! Stochastic Lanczos quadrature over an ensemble of random probes.
//!
//! This module provides the Monte-Carlo driver that composes the two
//! kernels in [`crate::algorithms`]: for each of `num_samples` isotropic
//! probe vectors it runs the Lanczos recurrence, extracts the Gauss
//! quadrature rule of the resulting tridiagonal, and hands the
//! `(sample, probe, basis, nodes, weights)` tuple to a caller-supplied
//! reducer.
//!
//! Probes are independent, so the ensemble is embarrassingly parallel: the
//! driver owns a dedicated worker pool, gives every worker one reusable set
//! of buffers, and distributes samples dynamically in √-sized chunks. All
//! numerical subtleties (orthogonality, re-orthogonalization policy) live in
//! the strictly sequential kernels and never interact with the concurrency
//! here.
//!
//! The reducer is the extension point: accumulating
//! `n · Σᵢ weights[i]·f(nodes[i])` over samples yields Hutchinson-style
//! estimates of tr(f(A)), but per-sample diagnostics, quadrature dumps, and
//! streaming confidence estimators fit the same seam.

use crate::algorithms::{lanczos_quadrature, lanczos_recurrence};
use crate::error::{SlqError, SlqErrorKind};
use crate::operator::LinearOperator;
use crate::random::{Distribution, ProbeGenerator};
use faer::traits::RealField;
use num_traits::Float;
use rayon::prelude::*;

/// Parameters of a stochastic quadrature run.
#[derive(Clone, Copy, Debug)]
pub struct SlqParams<F> {
    /// Number of random probe vectors to sample.
    pub num_samples: usize,
    /// Isotropic distribution the probes are drawn from.
    pub dist: Distribution,
    /// Degree of the Krylov expansion per probe.
    pub degree: usize,
    /// Residual tolerance for early-stopping the recurrence.
    pub rtol: F,
    /// Number of additional basis vectors to re-orthogonalize against.
    pub orth: usize,
    /// Number of Lanczos vectors kept resident per worker.
    pub ncv: usize,
    /// Number of worker threads.
    pub num_threads: usize,
    /// Seed for the probe generator.
    pub seed: u64,
}

impl<F: Float> SlqParams<F> {
    /// Checks the parameter relations the driver and kernels require.
    pub fn validate(&self) -> Result<(), SlqError> {
        if self.num_samples == 0 {
            return Err(SlqErrorKind::InvalidArgument(
                "num_samples must be at least 1".to_string(),
            )
            .into());
        }
        if self.num_threads == 0 {
            return Err(SlqErrorKind::InvalidArgument(
                "num_threads must be at least 1".to_string(),
            )
            .into());
        }
        if self.degree < 2 {
            return Err(
                SlqErrorKind::InvalidArgument("degree must be at least 2".to_string()).into(),
            );
        }
        if self.ncv < 2 || self.ncv > self.degree {
            return Err(SlqErrorKind::InvalidArgument(format!(
                "ncv must satisfy 2 <= ncv <= degree: got ncv={}, degree={}",
                self.ncv, self.degree
            ))
            .into());
        }
        if self.orth > self.ncv - 1 {
            return Err(SlqErrorKind::InvalidArgument(format!(
                "orth must be at most ncv - 1: got orth={}, ncv={}",
                self.orth, self.ncv
            ))
            .into());
        }
        if !(self.rtol >= F::zero()) {
            return Err(
                SlqErrorKind::InvalidArgument("rtol must be non-negative".to_string()).into(),
            );
        }
        Ok(())
    }
}

/// Consumes one completed quadrature sample.
///
/// Called concurrently from worker threads with disjoint `sample` indices
/// and no ordering guarantee; any aggregation state needs its own
/// synchronization. The borrowed buffers are reused for the worker's next
/// sample and must not be retained past the call: `probe` is the working
/// vector after the recurrence (the final residual), `basis` the n×ncv
/// column-major window, and `nodes`/`weights` the degree-length quadrature
/// rule.
pub trait QuadratureReducer<F>: Sync {
    fn consume(
        &self,
        sample: usize,
        probe: &[F],
        basis: &[F],
        nodes: &[F],
        weights: &[F],
    ) -> anyhow::Result<()>;
}

/// Closures with the matching signature are reducers, so ad-hoc aggregation
/// does not need a named type.
impl<F, C> QuadratureReducer<F> for C
where
    C: Fn(usize, &[F], &[F], &[F], &[F]) -> anyhow::Result<()> + Sync,
{
    fn consume(
        &self,
        sample: usize,
        probe: &[F],
        basis: &[F],
        nodes: &[F],
        weights: &[F],
    ) -> anyhow::Result<()> {
        self(sample, probe, basis, nodes, weights)
    }
}

/// One worker's scratch buffers, allocated once and reused across samples.
struct Workspace<F> {
    probe: Vec<F>,
    basis: Vec<F>,
    alpha: Vec<F>,
    beta: Vec<F>,
    nodes: Vec<F>,
    weights: Vec<F>,
}

impl<F: Float> Workspace<F> {
    fn new(n: usize, degree: usize, ncv: usize) -> Self {
        Self {
            probe: vec![F::zero(); n],
            basis: vec![F::zero(); n * ncv],
            alpha: vec![F::zero(); degree],
            beta: vec![F::zero(); degree + 1],
            nodes: vec![F::zero(); degree],
            weights: vec![F::zero(); degree],
        }
    }
}

/// Runs stochastic Lanczos quadrature: `params.num_samples` independent
/// probes, each tridiagonalized to `params.degree` and turned into a Gauss
/// quadrature rule, delivered to `reducer` from a pool of
/// `params.num_threads` workers.
///
/// The generator is initialized with `(num_threads, seed)` before any
/// dispatch, and each worker draws from the stream matching its index.
/// With `num_threads = 1` and a deterministic generator the run is exactly
/// reproducible. The quadrature is always taken at the full `degree`, also
/// when a probe's recurrence terminated early on an invariant subspace;
/// the zero-padded coefficients then contribute near-zero-weight nodes
/// at the origin.
///
/// The first error observed aborts the run: workers finish their current
/// sample and no new samples are dispatched. The reducer may already have
/// consumed an arbitrary subset of samples at that point.
pub fn slq<F, O, G, R>(
    operator: &O,
    reducer: &R,
    generator: &G,
    params: &SlqParams<F>,
) -> Result<(), SlqError>
where
    F: RealField + Float + Send + Sync,
    O: LinearOperator<F> + Sync,
    G: ProbeGenerator<F>,
    R: QuadratureReducer<F>,
{
    params.validate()?;
    let (nrows, ncols) = operator.shape();
    if nrows != ncols || nrows == 0 {
        return Err(SlqErrorKind::InvalidArgument(format!(
            "operator must be square and non-empty: got {nrows}x{ncols}"
        ))
        .into());
    }
    let n = nrows;

    generator.initialize(params.num_threads, params.seed);

    // Square-root of the per-worker share, the usual compromise between
    // scheduling overhead and load balance for dynamic chunks.
    let chunk_size =
        usize::max(((params.num_samples / params.num_threads) as f64).sqrt() as usize, 1);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(params.num_threads)
        .build()
        .map_err(|e| SlqError::from(SlqErrorKind::ThreadPool(e.to_string())))?;

    log::debug!(
        "slq: {} samples over {} workers, chunk size {}, degree {}, ncv {}, orth {}",
        params.num_samples,
        params.num_threads,
        chunk_size,
        params.degree,
        params.ncv,
        params.orth,
    );

    pool.install(|| {
        (0..params.num_samples)
            .into_par_iter()
            .with_min_len(chunk_size)
            .try_for_each_init(
                || Workspace::new(n, params.degree, params.ncv),
                |ws, sample| -> Result<(), SlqError> {
                    let tid = rayon::current_thread_index().unwrap_or(0);
                    generator.fill(&mut ws.probe, tid, params.dist);

                    ws.alpha.fill(F::zero());
                    ws.beta.fill(F::zero());
                    let info = lanczos_recurrence(
                        operator,
                        &mut ws.probe,
                        params.degree,
                        params.rtol,
                        params.orth,
                        &mut ws.alpha,
                        &mut ws.beta,
                        &mut ws.basis,
                        params.ncv,
                    )?;
                    if info.steps_taken < params.degree {
                        log::trace!(
                            "slq: sample {sample} hit an invariant subspace after {} steps",
                            info.steps_taken,
                        );
                    }

                    lanczos_quadrature(
                        &ws.alpha,
                        &ws.beta,
                        params.degree,
                        &mut ws.nodes,
                        &mut ws.weights,
                    )?;

                    reducer
                        .consume(sample, &ws.probe, &ws.basis, &ws.nodes, &ws.weights)
                        .map_err(|e| {
                            SlqError::from(SlqErrorKind::ReducerFailure {
                                sample,
                                message: e.to_string(),
                            })
                        })
                },
            )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::DiagonalOperator;
    use crate::random::ChaChaProbes;
    use std::sync::Mutex;

    fn base_params() -> SlqParams<f64> {
        SlqParams {
            num_samples: 4,
            dist: Distribution::Rademacher,
            degree: 4,
            rtol: 0.0,
            orth: 3,
            ncv: 4,
            num_threads: 1,
            seed: 99,
        }
    }

    #[test]
    fn test_validate_rejects_bad_relations() {
        let mut p = base_params();
        p.num_samples = 0;
        assert!(p.validate().is_err());

        let mut p = base_params();
        p.ncv = 5; // exceeds degree
        assert!(p.validate().is_err());

        let mut p = base_params();
        p.orth = 4; // exceeds ncv - 1
        assert!(p.validate().is_err());

        let mut p = base_params();
        p.num_threads = 0;
        assert!(p.validate().is_err());

        let mut p = base_params();
        p.rtol = -1.0;
        assert!(p.validate().is_err());

        assert!(base_params().validate().is_ok());
    }

    /// Records `(sample, nodes, weights)` tuples under a lock.
    struct Recorder {
        samples: Mutex<Vec<(usize, Vec<f64>, Vec<f64>)>>,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                samples: Mutex::new(Vec::new()),
            }
        }

        fn sorted(self) -> Vec<(usize, Vec<f64>, Vec<f64>)> {
            let mut out = self.samples.into_inner().unwrap();
            out.sort_by_key(|(i, ..)| *i);
            out
        }
    }

    impl QuadratureReducer<f64> for Recorder {
        fn consume(
            &self,
            sample: usize,
            _probe: &[f64],
            _basis: &[f64],
            nodes: &[f64],
            weights: &[f64],
        ) -> anyhow::Result<()> {
            self.samples
                .lock()
                .unwrap()
                .push((sample, nodes.to_vec(), weights.to_vec()));
            Ok(())
        }
    }

    #[test]
    fn test_single_threaded_runs_are_reproducible() {
        let op = DiagonalOperator::new((1..=12).map(|i| i as f64).collect());
        let params = SlqParams {
            num_samples: 6,
            degree: 6,
            ncv: 6,
            orth: 5,
            ..base_params()
        };

        let run = || {
            let recorder = Recorder::new();
            let generator = ChaChaProbes::new();
            slq(&op, &recorder, &generator, &params).unwrap();
            recorder.sorted()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_every_sample_is_delivered_exactly_once() {
        let op = DiagonalOperator::new((1..=8).map(|i| i as f64).collect());
        let params = SlqParams {
            num_samples: 17,
            num_threads: 3,
            ..base_params()
        };
        let recorder = Recorder::new();
        let generator = ChaChaProbes::new();
        slq(&op, &recorder, &generator, &params).unwrap();
        let seen: Vec<usize> = recorder.sorted().into_iter().map(|(i, ..)| i).collect();
        assert_eq!(seen, (0..17).collect::<Vec<_>>());
    }

    #[test]
    fn test_reducer_failure_aborts_the_run() {
        let op = DiagonalOperator::new((1..=8).map(|i| i as f64).collect());
        let failing = |_i: usize,
                       _probe: &[f64],
                       _basis: &[f64],
                       _nodes: &[f64],
                       _weights: &[f64]|
         -> anyhow::Result<()> { anyhow::bail!("sink is full") };
        let generator = ChaChaProbes::new();
        let err = slq(&op, &failing, &generator, &base_params()).unwrap_err();
        match err.kind() {
            SlqErrorKind::ReducerFailure { message, .. } => {
                assert!(message.contains("sink is full"))
            }
            other => panic!("unexpected error kind: {other:?}"),
        }
    }

    #[test]
    fn test_operator_shape_is_validated() {
        struct Rect;
        impl LinearOperator<f64> for Rect {
            fn shape(&self) -> (usize, usize) {
                (3, 4)
            }
            fn matvec(&self, _x: &[f64], _y: &mut [f64]) -> anyhow::Result<()> {
                Ok(())
            }
        }
        let generator = ChaChaProbes::new();
        let recorder = Recorder::new();
        let err = slq(&Rect, &recorder, &generator, &base_params()).unwrap_err();
        assert!(matches!(err.kind(), SlqErrorKind::InvalidArgument(_)));
    }
}
