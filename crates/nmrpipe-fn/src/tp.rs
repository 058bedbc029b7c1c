//! TP / ZTP: exchange the direct axis with an indirect axis.
//!
//! Hypercomplex mode treats the indirect axis as interleaved real and
//! imaginary rows: input rows `2j` and `2j + 1` at column `k` become output
//! rows `2k` (their real parts) and `2k + 1` (their imaginary parts) at
//! column `j`. Applying the same transpose twice gives back the input.

use crate::runner::Transform;
use nmrpipe_core::{DataFrame, NmrArray, PipeError, QuadFlag, Result, Samples};
use num_complex::Complex32;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TpParams {
    /// Force hypercomplex transposition.
    pub hyper: bool,
    /// Force a plain transpose.
    pub nohyper: bool,
    /// Pick the mode from the data (the default when neither is forced).
    pub auto: bool,
    /// Leave the dimension order untouched.
    pub no_ord: bool,
    /// Exchange the per-axis size, sweep width, quad flag and label too.
    pub exch: bool,
}

/// Indirect axis exchanged with the direct axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TpAxis {
    Y,
    Z,
}

impl TpAxis {
    fn logical(self) -> usize {
        match self {
            Self::Y => 2,
            Self::Z => 3,
        }
    }
}

impl TpParams {
    pub fn command(&self, axis: TpAxis) -> String {
        let mut cmd = match axis {
            TpAxis::Y => String::from("nmrPipe -fn TP"),
            TpAxis::Z => String::from("nmrPipe -fn ZTP"),
        };
        for (on, flag) in [
            (self.hyper, " -hyper"),
            (self.nohyper, " -nohyper"),
            (self.auto, " -auto"),
            (self.no_ord, " -noord"),
            (self.exch, " -exch"),
        ] {
            if on {
                cmd.push_str(flag);
            }
        }
        cmd
    }
}

#[derive(Debug, Clone)]
pub struct Tp {
    params: TpParams,
    axis: TpAxis,
    hyper: bool,
}

impl Tp {
    pub fn new(params: TpParams, axis: TpAxis) -> Self {
        Self {
            params,
            axis,
            hyper: false,
        }
    }

    pub fn params(&self) -> &TpParams {
        &self.params
    }

    pub fn axis(&self) -> TpAxis {
        self.axis
    }

    /// Array dimension holding the exchanged indirect axis.
    fn array_dim(&self, ndim: usize) -> Result<usize> {
        ndim.checked_sub(self.axis.logical()).ok_or_else(|| {
            PipeError::Shape(format!(
                "{} needs at least {} dimensions, data has {}",
                self.name(),
                self.axis.logical(),
                ndim
            ))
        })
    }
}

/// Sizes `(outer, indirect, middle, direct)` around dimension `d`.
fn split_dims(shape: &[usize], d: usize) -> (usize, usize, usize, usize) {
    let last = shape.len() - 1;
    let outer = shape[..d].iter().product();
    let middle = shape[d + 1..last].iter().product();
    (outer, shape[d], middle, shape[last])
}

fn plain_transpose<T: Copy + Default>(data: &[T], dims: (usize, usize, usize, usize)) -> Vec<T> {
    let (outer, la, mid, n) = dims;
    let mut out = vec![T::default(); data.len()];
    for o in 0..outer {
        for i in 0..la {
            for m in 0..mid {
                let src = ((o * la + i) * mid + m) * n;
                for k in 0..n {
                    out[((o * n + k) * mid + m) * la + i] = data[src + k];
                }
            }
        }
    }
    out
}

fn hyper_transpose(data: &[Complex32], dims: (usize, usize, usize, usize)) -> Vec<Complex32> {
    let (outer, la, mid, n) = dims;
    let half = la / 2;
    let mut out = vec![Complex32::default(); outer * 2 * n * mid * half];
    for o in 0..outer {
        for j in 0..half {
            for m in 0..mid {
                let re_row = ((o * la + 2 * j) * mid + m) * n;
                let im_row = ((o * la + 2 * j + 1) * mid + m) * n;
                for k in 0..n {
                    let a = data[re_row + k];
                    let b = data[im_row + k];
                    out[((o * 2 * n + 2 * k) * mid + m) * half + j] = Complex32::new(a.re, b.re);
                    out[((o * 2 * n + 2 * k + 1) * mid + m) * half + j] = Complex32::new(a.im, b.im);
                }
            }
        }
    }
    out
}

/// Exchange dimension `d` with the trailing dimension.
pub fn transpose(array: NmrArray, d: usize, hyper: bool) -> Result<NmrArray> {
    let last = array.ndim() - 1;
    if d >= last {
        return Err(PipeError::Shape(format!(
            "cannot exchange dimension {d} of a {}-D array with the direct axis",
            array.ndim()
        )));
    }
    let dims = split_dims(array.shape(), d);
    let (mut shape, samples) = array.into_parts();

    if hyper {
        let (_, la, _, n) = dims;
        let Samples::Complex(data) = samples else {
            return Err(PipeError::TypeMismatch(
                "hypercomplex transpose needs complex float32 samples".into(),
            ));
        };
        if la % 2 != 0 {
            return Err(PipeError::Shape(format!(
                "interleaved axis length {la} is odd"
            )));
        }
        shape[d] = 2 * n;
        shape[last] = la / 2;
        return NmrArray::complex(shape, hyper_transpose(&data, dims));
    }

    shape.swap(d, last);
    let samples = match samples {
        Samples::Real(v) => Samples::Real(plain_transpose(&v, dims)),
        Samples::Complex(v) => Samples::Complex(plain_transpose(&v, dims)),
        Samples::Real64(v) => Samples::Real64(plain_transpose(&v, dims)),
        Samples::Complex64(v) => Samples::Complex64(plain_transpose(&v, dims)),
    };
    NmrArray::new(shape, samples)
}

impl Transform for Tp {
    fn name(&self) -> &'static str {
        match self.axis {
            TpAxis::Y => "TP",
            TpAxis::Z => "ZTP",
        }
    }

    fn initialize(&mut self, frame: &mut DataFrame) -> Result<()> {
        let logical = self.axis.logical();
        let d = self.array_dim(frame.array.ndim())?;
        let indirect_len = frame.array.shape()[d];
        let eligible = frame.array.is_complex()
            && frame.header.is_complex(logical)?
            && indirect_len % 2 == 0;

        self.hyper = if self.params.nohyper {
            false
        } else if self.params.hyper {
            if !eligible {
                return Err(PipeError::Shape(format!(
                    "hypercomplex transpose needs complex data with an even complex axis {logical}"
                )));
            }
            true
        } else {
            eligible
        };
        log::debug!("{}: hypercomplex = {}", self.name(), self.hyper);

        if !self.params.no_ord {
            frame.header.swap_axes(1, logical, self.params.exch)?;
            if !self.hyper {
                frame.header.set_quad(logical, QuadFlag::Real)?;
            }
        }
        let transposed = frame.header.dim_order()[0] != 2;
        frame.header.set_transposed(transposed);
        Ok(())
    }

    fn process(&self, array: NmrArray, _vector_parallel: bool) -> Result<NmrArray> {
        let d = self.array_dim(array.ndim())?;
        transpose(array, d, self.hyper)
    }

    /// Chunks must leave the exchanged axes whole.
    fn chunkable(&self, array: &NmrArray) -> bool {
        array.ndim() > self.axis.logical()
    }

    fn update_header(&self, frame: &mut DataFrame) -> Result<()> {
        frame.sync_shape()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{Parallelism, TransformRunner};

    fn complex_ramp(shape: Vec<usize>) -> NmrArray {
        let n: usize = shape.iter().product();
        let values = (0..n)
            .map(|i| Complex32::new(i as f32, -(i as f32) - 0.5))
            .collect();
        NmrArray::complex(shape, values).unwrap()
    }

    fn complex_frame(shape: Vec<usize>) -> DataFrame {
        let mut frame = DataFrame::from_array(complex_ramp(shape));
        frame.header.set_quad(2, QuadFlag::Complex).unwrap();
        frame
    }

    #[test]
    fn test_hyper_transpose_is_involution() {
        let a = complex_ramp(vec![4, 3]);
        let once = transpose(a.clone(), 0, true).unwrap();
        assert_eq!(once.shape(), &[6, 2]);
        let twice = transpose(once, 0, true).unwrap();
        assert_eq!(twice, a);
    }

    #[test]
    fn test_hyper_mapping() {
        // rows: 0 = re(t1) part, 1 = im(t1) part of the same increment
        let a = NmrArray::complex(
            vec![2, 1],
            vec![Complex32::new(1.0, 2.0), Complex32::new(3.0, 4.0)],
        )
        .unwrap();
        let t = transpose(a, 0, true).unwrap();
        assert_eq!(t.shape(), &[2, 1]);
        assert_eq!(
            t.samples(),
            &Samples::Complex(vec![Complex32::new(1.0, 3.0), Complex32::new(2.0, 4.0)])
        );
    }

    #[test]
    fn test_plain_transpose() {
        let a = NmrArray::real(vec![2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let t = transpose(a, 0, false).unwrap();
        assert_eq!(t.shape(), &[3, 2]);
        assert_eq!(
            t.samples(),
            &Samples::Real(vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0])
        );
    }

    #[test]
    fn test_tp_updates_header() {
        let mut frame = complex_frame(vec![4, 8]);
        frame.header.set("NDSW", 5000.0, 1).unwrap();
        TransformRunner::new(Parallelism::serial())
            .run(&mut Tp::new(TpParams::default(), TpAxis::Y), &mut frame)
            .unwrap();
        assert_eq!(frame.array.shape(), &[16, 2]);
        assert_eq!(frame.header.dim_order(), [1, 2, 3, 4]);
        assert!(frame.header.is_transposed());
        assert_eq!(frame.header.get_float("FDSIZE", 0).unwrap(), 2.0);
        assert_eq!(frame.header.get_float("FDSPECNUM", 0).unwrap(), 16.0);
        // sizes stay positional while NDSIZE follows the swapped order
        assert_eq!(frame.header.get_float("NDSIZE", 1).unwrap(), 16.0);
        assert_eq!(frame.header.get_float("NDSIZE", 2).unwrap(), 2.0);
        // the old direct axis is now logical Y
        assert_eq!(frame.header.get_float("NDSW", 2).unwrap(), 5000.0);
    }

    #[test]
    fn test_tp_twice_restores_frame_array() {
        let mut frame = complex_frame(vec![4, 8]);
        let original = frame.array.clone();
        let runner = TransformRunner::new(Parallelism::serial());
        runner
            .run(&mut Tp::new(TpParams::default(), TpAxis::Y), &mut frame)
            .unwrap();
        runner
            .run(&mut Tp::new(TpParams::default(), TpAxis::Y), &mut frame)
            .unwrap();
        assert_eq!(frame.array, original);
        assert!(!frame.header.is_transposed());
    }

    #[test]
    fn test_3d_chunked_matches_serial() {
        let base = complex_frame(vec![5, 4, 6]);
        let mut serial = base.clone();
        TransformRunner::new(Parallelism::serial())
            .run(&mut Tp::new(TpParams::default(), TpAxis::Y), &mut serial)
            .unwrap();
        for workers in [2, 5] {
            let mut chunked = base.clone();
            let runner = TransformRunner::new(Parallelism {
                enabled: true,
                workers,
                threads: 1,
            });
            runner
                .run(&mut Tp::new(TpParams::default(), TpAxis::Y), &mut chunked)
                .unwrap();
            assert_eq!(chunked.array, serial.array);
        }
        assert_eq!(serial.array.shape(), &[5, 12, 2]);
        assert_eq!(serial.header.get_float("FDSLICECOUNT", 0).unwrap(), 60.0);
    }

    #[test]
    fn test_ztp_plain() {
        let array = NmrArray::real(vec![2, 3, 4], (0..24).map(|i| i as f32).collect()).unwrap();
        let mut frame = DataFrame::from_array(array);
        TransformRunner::new(Parallelism::serial())
            .run(&mut Tp::new(TpParams::default(), TpAxis::Z), &mut frame)
            .unwrap();
        assert_eq!(frame.array.shape(), &[4, 3, 2]);
        assert_eq!(frame.header.dim_order(), [3, 1, 2, 4]);
        match frame.array.samples() {
            // out[k][m][i] = in[i][m][k]
            Samples::Real(v) => {
                assert_eq!(v[0], 0.0);
                assert_eq!(v[1], 12.0);
                assert_eq!(v[2], 4.0);
            }
            other => panic!("unexpected samples {other:?}"),
        }
    }

    #[test]
    fn test_forced_hyper_on_real_data_fails() {
        let array = NmrArray::real(vec![4, 4], vec![0.0; 16]).unwrap();
        let mut frame = DataFrame::from_array(array);
        let params = TpParams {
            hyper: true,
            ..Default::default()
        };
        let err = TransformRunner::new(Parallelism::serial())
            .run(&mut Tp::new(params, TpAxis::Y), &mut frame)
            .unwrap_err();
        assert!(matches!(err, PipeError::Transform { .. }));
    }

    #[test]
    fn test_ztp_needs_three_dims() {
        let array = NmrArray::real(vec![4, 4], vec![0.0; 16]).unwrap();
        let mut frame = DataFrame::from_array(array);
        assert!(TransformRunner::new(Parallelism::serial())
            .run(&mut Tp::new(TpParams::default(), TpAxis::Z), &mut frame)
            .is_err());
    }
}
