//! FT: complex Fourier transform of the direct axis.

use crate::runner::{for_each_vector, Transform};
use nmrpipe_core::{DataFrame, NmrArray, Result};
use num_complex::Complex32;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FtParams {
    /// Inverse transform.
    pub inv: bool,
    /// Transform real data only; imaginaries are zeroed first.
    pub real: bool,
    /// Negate imaginaries before the forward transform.
    pub neg: bool,
    /// Sign-alternate the input before the forward transform.
    pub alt: bool,
}

impl FtParams {
    pub fn command(&self) -> String {
        let mut cmd = String::from("nmrPipe -fn FT");
        for (on, flag) in [
            (self.inv, " -inv"),
            (self.real, " -real"),
            (self.neg, " -neg"),
            (self.alt, " -alt"),
        ] {
            if on {
                cmd.push_str(flag);
            }
        }
        cmd
    }
}

#[derive(Debug, Clone, Default)]
pub struct Ft {
    params: FtParams,
}

impl Ft {
    pub fn new(params: FtParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &FtParams {
        &self.params
    }
}

fn alternate(vector: &mut [Complex32]) {
    for z in vector.iter_mut().skip(1).step_by(2) {
        *z = -*z;
    }
}

fn conjugate(vector: &mut [Complex32]) {
    for z in vector.iter_mut() {
        *z = z.conj();
    }
}

impl Transform for Ft {
    fn name(&self) -> &'static str {
        "FT"
    }

    fn initialize(&mut self, frame: &mut DataFrame) -> Result<()> {
        if frame.header.get_float("NDAPOD", 1)? == 0.0 {
            let len = frame.array.vector_len() as f32;
            frame.header.set("NDAPOD", len, 1)?;
        }
        Ok(())
    }

    fn process(&self, array: NmrArray, vector_parallel: bool) -> Result<NmrArray> {
        let shape = array.shape().to_vec();
        let n = array.vector_len();
        let mut data = array.to_complex32()?;
        if self.params.real {
            for z in data.iter_mut() {
                z.im = 0.0;
            }
        }

        let mut planner = FftPlanner::<f32>::new();
        let p = &self.params;
        if p.inv {
            let ifft = planner.plan_fft_inverse(n);
            let scale = 1.0 / n as f32;
            for_each_vector(&mut data, n, vector_parallel, |v| {
                // undo the display order of the forward transform
                v.reverse();
                v.rotate_right(n / 2);
                ifft.process(v);
                for z in v.iter_mut() {
                    *z *= scale;
                }
                if p.alt {
                    alternate(v);
                }
                if p.neg {
                    conjugate(v);
                }
            });
        } else {
            let fft = planner.plan_fft_forward(n);
            for_each_vector(&mut data, n, vector_parallel, |v| {
                if p.neg {
                    conjugate(v);
                }
                if p.alt {
                    alternate(v);
                }
                fft.process(v);
                // zero frequency to the centre, highest frequency first
                v.rotate_left(n / 2);
                v.reverse();
            });
        }
        NmrArray::complex(shape, data)
    }

    fn update_header(&self, frame: &mut DataFrame) -> Result<()> {
        let len = frame.array.vector_len() as f32;
        if self.params.inv {
            frame.header.set("NDFTFLAG", 0.0, 1)?;
        } else {
            frame.header.set("NDFTFLAG", 1.0, 1)?;
            frame.header.set("NDFTSIZE", len, 1)?;
        }
        frame.sync_shape()
    }
}
