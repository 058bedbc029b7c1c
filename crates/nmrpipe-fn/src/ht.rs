//! HT: Hilbert transform, rebuilding imaginaries from the real part.

use crate::runner::{map_vectors, Transform};
use nmrpipe_core::{next_power2, DataFrame, NmrArray, Result};
use num_complex::Complex32;
use rustfft::{Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HtParams {
    /// Mirror-image HT, for data phased with P0 -90 and P1 180.
    pub ps90_180: bool,
    /// Temporary zero fill to twice the size.
    pub zf: bool,
    /// Record the time-domain size as half the current size.
    pub td: bool,
    /// Choose mirror mode and zero fill from the header phase.
    pub auto: bool,
    /// Ordinary HT even when the header phase says otherwise.
    pub ps0_0: bool,
    /// Never zero fill.
    pub nozf: bool,
}

impl HtParams {
    pub fn command(&self) -> String {
        let mut cmd = String::from("nmrPipe -fn HT");
        for (on, flag) in [
            (self.ps90_180, " -ps90-180"),
            (self.zf, " -zf"),
            (self.td, " -td"),
            (self.auto, " -auto"),
            (self.ps0_0, " -ps0-0"),
            (self.nozf, " -nozf"),
        ] {
            if on {
                cmd.push_str(flag);
            }
        }
        cmd
    }
}

#[derive(Debug, Clone, Default)]
pub struct Ht {
    params: HtParams,
    mirror: bool,
    zero_fill: bool,
}

impl Ht {
    pub fn new(params: HtParams) -> Self {
        Self {
            params,
            mirror: false,
            zero_fill: false,
        }
    }

    pub fn params(&self) -> &HtParams {
        &self.params
    }
}

/// Analytic signal of `x` computed over `size >= x.len()` points.
fn analytic_signal(
    x: &[f32],
    size: usize,
    fft: &Arc<dyn Fft<f32>>,
    ifft: &Arc<dyn Fft<f32>>,
) -> Vec<Complex32> {
    let mut buf = vec![Complex32::default(); size];
    for (z, &v) in buf.iter_mut().zip(x) {
        z.re = v;
    }
    fft.process(&mut buf);

    // keep DC and Nyquist, double positive frequencies, drop negative ones
    let half = size / 2;
    for (i, z) in buf.iter_mut().enumerate() {
        let h = if i == 0 || (size % 2 == 0 && i == half) {
            1.0
        } else if i < size.div_ceil(2) {
            2.0
        } else {
            0.0
        };
        *z *= h / size as f32;
    }
    ifft.process(&mut buf);
    buf
}

impl Transform for Ht {
    fn name(&self) -> &'static str {
        "HT"
    }

    fn initialize(&mut self, frame: &mut DataFrame) -> Result<()> {
        let p = &self.params;
        let header_mirror = if p.auto && !p.ps0_0 {
            let p0 = frame.header.get_float("NDP0", 1)?;
            let p1 = frame.header.get_float("NDP1", 1)?;
            (p0 + 90.0).abs() < 1.0 && (p1 - 180.0).abs() < 1.0
        } else {
            false
        };
        self.mirror = p.ps90_180 || header_mirror;
        self.zero_fill = (p.zf || p.auto) && !p.nozf;
        log::debug!("HT: mirror = {}, zero fill = {}", self.mirror, self.zero_fill);
        Ok(())
    }

    fn process(&self, array: NmrArray, vector_parallel: bool) -> Result<NmrArray> {
        let shape = array.shape().to_vec();
        let n = array.vector_len();
        let real: Vec<f32> = array.to_complex32()?.into_iter().map(|z| z.re).collect();

        let span = if self.mirror { 2 * n } else { n };
        let size = if self.zero_fill {
            next_power2(2 * span)
        } else {
            span
        };
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(size);
        let ifft = planner.plan_fft_inverse(size);
        let mirror = self.mirror;

        let out = map_vectors(&real, n, n, vector_parallel, |x, dst| {
            if mirror {
                let mut doubled: Vec<f32> = x.iter().rev().copied().collect();
                doubled.extend_from_slice(x);
                let z = analytic_signal(&doubled, size, &fft, &ifft);
                dst.copy_from_slice(&z[n..2 * n]);
            } else {
                let z = analytic_signal(x, size, &fft, &ifft);
                dst.copy_from_slice(&z[..n]);
            }
        });
        NmrArray::complex(shape, out)
    }

    fn update_header(&self, frame: &mut DataFrame) -> Result<()> {
        if self.params.td {
            let half = (frame.array.vector_len() / 2) as f32;
            frame.header.set("NDTDSIZE", half, 1)?;
        }
        frame.sync_shape()
    }
}
