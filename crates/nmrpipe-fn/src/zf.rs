//! ZF: zero fill (or trim) the direct axis.

use crate::runner::{map_vectors, Transform};
use nmrpipe_core::{DataFrame, NmrArray, PipeError, Result, Samples};
use serde::{Deserialize, Serialize};

/// Longest vector ZF produces: the largest length a header float holds
/// exactly.
pub const MAX_VECTOR_LEN: usize = 1 << 24;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZfParams {
    /// Number of times to double the size.
    pub count: usize,
    /// Zeros to append.
    pub pad: usize,
    /// Desired final size.
    pub size: usize,
    /// Round the final size up to a power of two.
    pub auto: bool,
    /// Extract the original time domain. `NDZF` still records the
    /// negated output size.
    pub inv: bool,
}

impl ZfParams {
    /// Output length for an input vector of `len` points. `apod` is the
    /// recorded valid time-domain size, used by `inv` without a count or pad.
    ///
    /// Sizes that overflow, or exceed [`MAX_VECTOR_LEN`], are a `Shape` error.
    pub fn output_size(&self, len: usize, apod: usize) -> Result<usize> {
        if self.inv {
            return Ok(if self.count > 0 {
                len.checked_shr(self.count as u32).unwrap_or(0).max(1)
            } else if self.pad > 0 {
                len.saturating_sub(self.pad).max(1)
            } else if apod > 0 && apod <= len {
                apod
            } else {
                (len / 2).max(1)
            });
        }
        let out = if self.size > 0 {
            Some(self.size)
        } else if self.pad > 0 {
            len.checked_add(self.pad)
        } else {
            u32::try_from(self.count.max(1))
                .ok()
                .and_then(|n| 1usize.checked_shl(n))
                .and_then(|factor| len.checked_mul(factor))
        };
        let out = if self.auto {
            out.and_then(usize::checked_next_power_of_two)
        } else {
            out
        };
        match out {
            Some(n) if (1..=MAX_VECTOR_LEN).contains(&n) => Ok(n),
            _ => Err(PipeError::Shape(format!(
                "zero fill of {len} points with {} is out of range (1..={MAX_VECTOR_LEN})",
                self.command()
            ))),
        }
    }

    pub fn command(&self) -> String {
        let mut cmd = String::from("nmrPipe -fn ZF");
        if self.size > 0 {
            cmd.push_str(&format!(" -size {}", self.size));
        } else if self.pad > 0 {
            cmd.push_str(&format!(" -pad {}", self.pad));
        } else if self.count > 0 {
            cmd.push_str(&format!(" -zf {}", self.count));
        }
        if self.auto {
            cmd.push_str(" -auto");
        }
        if self.inv {
            cmd.push_str(" -inv");
        }
        cmd
    }
}

#[derive(Debug, Clone, Default)]
pub struct Zf {
    params: ZfParams,
    out_size: usize,
}

impl Zf {
    pub fn new(params: ZfParams) -> Self {
        Self {
            params,
            out_size: 0,
        }
    }

    pub fn params(&self) -> &ZfParams {
        &self.params
    }
}

/// Copy the overlapping prefix of each vector; the rest stays zero.
fn resize_vectors(array: NmrArray, out_len: usize, parallel: bool) -> Result<NmrArray> {
    let in_len = array.vector_len();
    let (mut shape, samples) = array.into_parts();
    let keep = in_len.min(out_len);
    if let Some(last) = shape.last_mut() {
        *last = out_len;
    }
    let samples = match samples {
        Samples::Real(v) => Samples::Real(map_vectors(&v, in_len, out_len, parallel, |s, d| {
            d[..keep].copy_from_slice(&s[..keep])
        })),
        Samples::Complex(v) => {
            Samples::Complex(map_vectors(&v, in_len, out_len, parallel, |s, d| {
                d[..keep].copy_from_slice(&s[..keep])
            }))
        }
        Samples::Real64(v) => {
            Samples::Real64(map_vectors(&v, in_len, out_len, parallel, |s, d| {
                d[..keep].copy_from_slice(&s[..keep])
            }))
        }
        Samples::Complex64(v) => {
            Samples::Complex64(map_vectors(&v, in_len, out_len, parallel, |s, d| {
                d[..keep].copy_from_slice(&s[..keep])
            }))
        }
    };
    NmrArray::new(shape, samples)
}

impl Transform for Zf {
    fn name(&self) -> &'static str {
        "ZF"
    }

    fn initialize(&mut self, frame: &mut DataFrame) -> Result<()> {
        let hdr = &mut frame.header;
        let len = frame.array.vector_len();
        let apod = hdr.get_float("NDAPOD", 1)?.max(0.0) as usize;
        let out = self.params.output_size(len, apod)?;
        self.out_size = out;
        log::debug!("ZF: {len} -> {out} points");

        if hdr.is_freq(1)? {
            let center = hdr.get_float("NDCENTER", 1)?;
            hdr.set("NDCENTER", center + out as f32 - len as f32, 1)?;
            return Ok(());
        }

        let f_size = if hdr.get_float("NDQUADFLAG", 1)? == 1.0 {
            out as f32 / 2.0
        } else {
            out as f32
        };
        let x1 = hdr.get_float("NDX1", 1)?;
        let xn = hdr.get_float("NDXN", 1)?;
        if x1 == 0.0 && xn == 0.0 && f_size > 0.0 {
            let obs = hdr.get_float("NDOBS", 1)?;
            let car = hdr.get_float("NDCAR", 1)?;
            let sw = hdr.get_float("NDSW", 1)?;
            let mid = f_size / 2.0 + 1.0;
            let orig = obs * car - sw * (f_size - mid) / f_size;
            hdr.set("NDCENTER", mid, 1)?;
            hdr.set("NDORIG", orig, 1)?;
        }
        hdr.set("NDZF", -(out as f32), 1)
    }

    fn process(&self, array: NmrArray, vector_parallel: bool) -> Result<NmrArray> {
        let out = if self.out_size > 0 {
            self.out_size
        } else {
            self.params.output_size(array.vector_len(), 0)?
        };
        resize_vectors(array, out, vector_parallel)
    }

    fn update_header(&self, frame: &mut DataFrame) -> Result<()> {
        frame.sync_sizes()
    }
}
