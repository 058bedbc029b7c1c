//! PS: zero- and first-order phase correction of the direct axis.

use crate::runner::{for_each_vector, map_vectors, Transform};
use nmrpipe_core::{DataFrame, NmrArray, PipeError, Result, Samples};
use num_complex::Complex32;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PsParams {
    /// Zero-order phase, degrees.
    pub p0: f32,
    /// First-order phase, degrees.
    pub p1: f32,
    /// Apply the inverse correction.
    pub inv: bool,
    /// Take P0 and P1 from the header.
    pub hdr: bool,
    /// Do not record P0 and P1 in the header.
    pub noup: bool,
    /// Shift the first-order origin by the digital filter delay.
    pub df: bool,
}

impl PsParams {
    pub fn command(&self) -> String {
        let mut cmd = if self.hdr {
            String::from("nmrPipe -fn PS -hdr")
        } else {
            format!("nmrPipe -fn PS -p0 {:.2} -p1 {:.2}", self.p0, self.p1)
        };
        for (on, flag) in [(self.inv, " -inv"), (self.noup, " -noup"), (self.df, " -df")] {
            if on {
                cmd.push_str(flag);
            }
        }
        cmd
    }
}

#[derive(Debug, Clone, Default)]
pub struct Ps {
    params: PsParams,
    /// One factor per direct-axis point, built in `initialize`.
    phase: Vec<Complex32>,
}

impl Ps {
    pub fn new(params: PsParams) -> Self {
        Self {
            params,
            phase: Vec::new(),
        }
    }

    pub fn params(&self) -> &PsParams {
        &self.params
    }
}

/// `exp(i (p0 + p1 (x - origin) / size))` for `x` in `0..size`, angles in
/// degrees.
pub fn phase_vector(p0: f32, p1: f32, origin: f32, size: usize) -> Vec<Complex32> {
    let p0 = p0.to_radians();
    let p1 = p1.to_radians();
    let n = size.max(1) as f32;
    (0..size)
        .map(|x| Complex32::from_polar(1.0, p0 + p1 * (x as f32 - origin) / n))
        .collect()
}

impl Transform for Ps {
    fn name(&self) -> &'static str {
        "PS"
    }

    fn initialize(&mut self, frame: &mut DataFrame) -> Result<()> {
        let hdr = &mut frame.header;
        let (p0, p1) = if self.params.hdr {
            (hdr.get_float("NDP0", 1)?, hdr.get_float("NDP1", 1)?)
        } else {
            (self.params.p0, self.params.p1)
        };
        let origin = if self.params.df {
            hdr.get_float("FDDMXVAL", 0)?
        } else {
            0.0
        };

        let mut phase = phase_vector(p0, p1, origin, frame.array.vector_len());
        if self.params.inv {
            phase.iter_mut().for_each(|z| *z = z.conj());
        }
        self.phase = phase;

        if !self.params.noup && !self.params.inv {
            hdr.set("NDP0", p0, 1)?;
            hdr.set("NDP1", p1, 1)?;
        }
        Ok(())
    }

    fn process(&self, array: NmrArray, vector_parallel: bool) -> Result<NmrArray> {
        let n = array.vector_len();
        if self.phase.len() != n {
            return Err(PipeError::Shape(format!(
                "phase vector has {} points, data vectors have {}",
                self.phase.len(),
                n
            )));
        }
        let phase = &self.phase;
        let (shape, samples) = array.into_parts();
        let samples = match samples {
            Samples::Complex(mut v) => {
                for_each_vector(&mut v, n, vector_parallel, |vector| {
                    for (z, p) in vector.iter_mut().zip(phase) {
                        *z *= p;
                    }
                });
                Samples::Complex(v)
            }
            // real data keeps the real part of the rotation
            Samples::Real(v) => Samples::Real(map_vectors(&v, n, n, vector_parallel, |s, d| {
                for ((out, &x), p) in d.iter_mut().zip(s).zip(phase) {
                    *out = x * p.re;
                }
            })),
            _ => {
                return Err(PipeError::TypeMismatch(
                    "PS needs float32 samples".into(),
                ))
            }
        };
        NmrArray::new(shape, samples)
    }

    fn update_header(&self, _frame: &mut DataFrame) -> Result<()> {
        Ok(())
    }
}
