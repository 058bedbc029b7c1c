//! DI: delete imaginaries.
//!
//! The direct axis keeps its real parts. Complex indirect axes are stored as
//! interleaved real and imaginary rows, so they keep their even rows.

use crate::runner::{map_vectors, Transform};
use nmrpipe_core::{DataFrame, NmrArray, QuadFlag, Result, Samples};

#[derive(Debug, Clone, Default)]
pub struct Di {
    /// Array dimensions whose odd (imaginary) rows are dropped.
    decimate: Vec<usize>,
}

impl Di {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command(&self) -> String {
        String::from("nmrPipe -fn DI")
    }
}

/// Keep the even indices along dimension `d`.
fn keep_even(data: Vec<f32>, shape: &mut [usize], d: usize) -> Vec<f32> {
    let outer: usize = shape[..d].iter().product();
    let len = shape[d];
    let inner: usize = shape[d + 1..].iter().product();
    let kept = len.div_ceil(2);
    let mut out = Vec::with_capacity(outer * kept * inner);
    for o in 0..outer {
        for i in (0..len).step_by(2) {
            let start = (o * len + i) * inner;
            out.extend_from_slice(&data[start..start + inner]);
        }
    }
    shape[d] = kept;
    out
}

impl Transform for Di {
    fn name(&self) -> &'static str {
        "DI"
    }

    fn initialize(&mut self, frame: &mut DataFrame) -> Result<()> {
        let shape = frame.array.shape().to_vec();
        let ndim = shape.len();
        self.decimate.clear();
        for axis in 2..=ndim {
            let d = ndim - axis;
            if frame.header.is_complex(axis)? && shape[d] % 2 == 0 {
                self.decimate.push(d);
                frame.header.set_quad(axis, QuadFlag::Real)?;
            }
        }
        frame.header.set_quad(1, QuadFlag::Real)
    }

    fn process(&self, array: NmrArray, vector_parallel: bool) -> Result<NmrArray> {
        let n = array.vector_len();
        let (mut shape, samples) = array.into_parts();
        let mut data = match samples {
            Samples::Real(v) => v,
            Samples::Complex(v) => map_vectors(&v, n, n, vector_parallel, |s, d| {
                for (out, z) in d.iter_mut().zip(s) {
                    *out = z.re;
                }
            }),
            Samples::Real64(v) => v.into_iter().map(|x| x as f32).collect(),
            Samples::Complex64(v) => v.into_iter().map(|z| z.re as f32).collect(),
        };
        for &d in &self.decimate {
            data = keep_even(data, &mut shape, d);
        }
        NmrArray::real(shape, data)
    }

    fn chunkable(&self, array: &NmrArray) -> bool {
        array.ndim() > 1 && !self.decimate.contains(&0)
    }

    fn update_header(&self, frame: &mut DataFrame) -> Result<()> {
        frame.sync_shape()
    }
}
