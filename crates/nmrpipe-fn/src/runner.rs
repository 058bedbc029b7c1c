//! Transform lifecycle and chunked compute dispatch.
//!
//! Every function runs `initialize` (header only), then `compute` on a copy
//! of the array, then `update_header`. Compute splits the leading axis into
//! contiguous chunks that are processed on a rayon pool and joined back in
//! chunk order.

use nmrpipe_core::{DataFrame, NmrArray, PipeError, Result, Stage};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};

/// Worker configuration for compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parallelism {
    pub enabled: bool,
    /// Number of leading-axis chunks and pool threads.
    pub workers: usize,
    /// Per-vector parallelism inside a chunk when greater than 1.
    pub threads: usize,
}

impl Default for Parallelism {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            enabled: true,
            workers,
            threads: workers.min(4),
        }
    }
}

impl Parallelism {
    pub fn serial() -> Self {
        Self {
            enabled: false,
            workers: 1,
            threads: 1,
        }
    }

    pub fn vector_parallel(&self) -> bool {
        self.enabled && self.threads > 1
    }
}

/// A processing function with a three-stage lifecycle.
pub trait Transform: Send + Sync {
    fn name(&self) -> &'static str;

    /// Data-independent header changes. May read the array shape only.
    fn initialize(&mut self, frame: &mut DataFrame) -> Result<()>;

    /// Kernel applied to the whole array or to one leading-axis chunk.
    fn process(&self, array: NmrArray, vector_parallel: bool) -> Result<NmrArray>;

    /// Whether `process` may run on leading-axis chunks of `array`.
    fn chunkable(&self, array: &NmrArray) -> bool {
        array.ndim() > 1
    }

    /// Header changes that depend on the processed array.
    fn update_header(&self, frame: &mut DataFrame) -> Result<()>;

    /// Processes `array` without consuming it; chunking copies the data
    /// into per-worker chunks, otherwise a single copy goes to `process`.
    fn compute(&self, array: &NmrArray, parallelism: &Parallelism) -> Result<NmrArray> {
        let vector_parallel = parallelism.vector_parallel();
        if self.chunkable(&array) {
            dispatch(array, parallelism, |chunk| self.process(chunk, vector_parallel))
        } else {
            self.process(array.clone(), vector_parallel)
        }
    }
}

/// Run `kernel` over leading-axis chunks of `array` and join the results.
///
/// Serial when parallelism is disabled or the array is 1-D. Otherwise the
/// leading axis is cut into `workers` chunks of `ceil(len / workers)` rows
/// and chunk `i` of the output is chunk `i`'s result, whatever order the
/// workers finish in.
pub fn dispatch<K>(array: &NmrArray, parallelism: &Parallelism, kernel: K) -> Result<NmrArray>
where
    K: Fn(NmrArray) -> Result<NmrArray> + Sync,
{
    if !parallelism.enabled || array.ndim() < 2 {
        return kernel(array.clone());
    }
    let chunks = array.split_leading(parallelism.workers);
    if chunks.len() == 1 {
        return chunks.into_iter().map(&kernel).next().unwrap_or_else(|| {
            Err(PipeError::Shape("chunking produced no chunks".into()))
        });
    }
    log::debug!(
        "dispatching {} chunks on {} workers",
        chunks.len(),
        parallelism.workers
    );

    let outputs: Vec<NmrArray> = match ThreadPoolBuilder::new()
        .num_threads(parallelism.workers)
        .build()
    {
        Ok(pool) => pool.install(|| {
            chunks
                .into_par_iter()
                .map(&kernel)
                .collect::<Result<Vec<_>>>()
        })?,
        Err(err) => {
            log::warn!("thread pool unavailable ({err}), processing chunks serially");
            chunks.into_iter().map(&kernel).collect::<Result<Vec<_>>>()?
        }
    };
    NmrArray::concat_leading(outputs)
}

/// Apply `f` to every trailing-axis vector of `data` in place.
pub fn for_each_vector<T, F>(data: &mut [T], len: usize, parallel: bool, f: F)
where
    T: Send,
    F: Fn(&mut [T]) + Send + Sync,
{
    if len == 0 {
        return;
    }
    if parallel {
        data.par_chunks_mut(len).for_each(&f);
    } else {
        data.chunks_mut(len).for_each(f);
    }
}

/// Map every input vector of length `in_len` to an output vector of
/// length `out_len`.
pub fn map_vectors<T, U, F>(input: &[T], in_len: usize, out_len: usize, parallel: bool, f: F) -> Vec<U>
where
    T: Sync,
    U: Send + Clone + Default,
    F: Fn(&[T], &mut [U]) + Send + Sync,
{
    if in_len == 0 || out_len == 0 {
        return Vec::new();
    }
    let count = input.len() / in_len;
    let mut out = vec![U::default(); count * out_len];
    if parallel {
        out.par_chunks_mut(out_len)
            .zip(input.par_chunks(in_len))
            .for_each(|(dst, src)| f(src, dst));
    } else {
        out.chunks_mut(out_len)
            .zip(input.chunks(in_len))
            .for_each(|(dst, src)| f(src, dst));
    }
    out
}

/// Runs transforms through their lifecycle.
#[derive(Debug, Clone, Default)]
pub struct TransformRunner {
    parallelism: Parallelism,
}

impl TransformRunner {
    pub fn new(parallelism: Parallelism) -> Self {
        Self { parallelism }
    }

    pub fn parallelism(&self) -> &Parallelism {
        &self.parallelism
    }

    /// Run one transform on `frame`.
    ///
    /// A failing stage is reported as `PipeError::Transform` carrying the
    /// state reached before it. Header edits made by a failed `initialize`
    /// stay in place; a failed compute leaves the array untouched.
    pub fn run<T: Transform + ?Sized>(&self, transform: &mut T, frame: &mut DataFrame) -> Result<()> {
        let name = transform.name();
        let wrap = |stage: Stage| {
            move |source: PipeError| PipeError::Transform {
                name,
                stage,
                source: Box::new(source),
            }
        };

        log::info!("{name}: input shape {:?}", frame.array.shape());
        frame.header.set_current_dim(1).map_err(wrap(Stage::Created))?;
        transform.initialize(frame).map_err(wrap(Stage::Created))?;
        log::debug!("{name}: initialized");

        let output = transform
            .compute(&frame.array, &self.parallelism)
            .map_err(wrap(Stage::Initialized))?;
        frame.array = output;
        log::debug!("{name}: computed, shape {:?}", frame.array.shape());

        transform.update_header(frame).map_err(wrap(Stage::Computed))?;
        log::debug!("{name}: header finalized");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nmrpipe_core::Samples;

    fn ramp(shape: Vec<usize>) -> NmrArray {
        let n: usize = shape.iter().product();
        NmrArray::real(shape, (0..n).map(|i| i as f32).collect()).unwrap()
    }

    fn with_workers(workers: usize) -> Parallelism {
        Parallelism {
            enabled: true,
            workers,
            threads: 1,
        }
    }

    fn double(array: NmrArray) -> Result<NmrArray> {
        let (shape, samples) = array.into_parts();
        match samples {
            Samples::Real(v) => NmrArray::real(shape, v.into_iter().map(|x| 2.0 * x).collect()),
            _ => Err(PipeError::TypeMismatch("real only".into())),
        }
    }

    #[test]
    fn test_identity_kernel_is_chunk_invariant() {
        let a = ramp(vec![7, 3, 4]);
        for workers in [1, 2, 5, 7] {
            let out = dispatch(&a, &with_workers(workers), Ok).unwrap();
            assert_eq!(out, a, "workers = {workers}");
        }
    }

    #[test]
    fn test_kernel_results_independent_of_workers() {
        let a = ramp(vec![9, 5]);
        let serial = dispatch(&a, &Parallelism::serial(), double).unwrap();
        for workers in [1, 2, 5, 9] {
            let out = dispatch(&a, &with_workers(workers), double).unwrap();
            assert_eq!(out, serial);
        }
    }

    #[test]
    fn test_zero_workers_is_one_chunk() {
        let a = ramp(vec![4, 2]);
        let out = dispatch(&a, &with_workers(0), Ok).unwrap();
        assert_eq!(out, a);
    }

    #[test]
    fn test_chunk_error_propagates() {
        let a = ramp(vec![4, 2]);
        let err = dispatch(&a, &with_workers(2), |_| -> Result<NmrArray> {
            Err(PipeError::Shape("boom".into()))
        })
        .unwrap_err();
        assert!(matches!(err, PipeError::Shape(_)));
    }

    struct FailsOnChunks;

    impl Transform for FailsOnChunks {
        fn name(&self) -> &'static str {
            "FAIL"
        }

        fn initialize(&mut self, _frame: &mut DataFrame) -> Result<()> {
            Ok(())
        }

        fn process(&self, _array: NmrArray, _vector_parallel: bool) -> Result<NmrArray> {
            Err(PipeError::Shape("no output".into()))
        }

        fn update_header(&self, _frame: &mut DataFrame) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_compute_leaves_array() {
        let a = ramp(vec![6, 4]);
        let mut frame = DataFrame::from_array(a.clone());
        let err = TransformRunner::new(with_workers(3))
            .run(&mut FailsOnChunks, &mut frame)
            .unwrap_err();
        assert!(matches!(
            err,
            PipeError::Transform {
                stage: Stage::Initialized,
                ..
            }
        ));
        assert_eq!(frame.array, a);
    }

    #[test]
    fn test_map_vectors_resizes() {
        let input: Vec<f32> = (0..6).map(|i| i as f32).collect();
        for parallel in [false, true] {
            let out = map_vectors(&input, 3, 2, parallel, |src: &[f32], dst: &mut [f32]| {
                dst.copy_from_slice(&src[1..])
            });
            assert_eq!(out, vec![1.0, 2.0, 4.0, 5.0]);
        }
    }
}
