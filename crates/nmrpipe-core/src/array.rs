//! `NmrArray`: row-major sample storage of 1 to 4 dimensions.
//!
//! The trailing axis is the directly detected dimension. A complex array
//! holds `Complex32` elements along that axis; complex indirect axes are
//! kept the way the format stores them, as interleaved real and imaginary
//! rows (or planes) along their own axis.

use crate::error::{PipeError, Result};
use num_complex::{Complex, Complex32};

pub type Complex64 = Complex<f64>;

#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    Real(Vec<f32>),
    Complex(Vec<Complex32>),
    /// High-precision working storage; narrow before encoding.
    Real64(Vec<f64>),
    Complex64(Vec<Complex64>),
}

impl Samples {
    pub fn len(&self) -> usize {
        match self {
            Self::Real(v) => v.len(),
            Self::Complex(v) => v.len(),
            Self::Real64(v) => v.len(),
            Self::Complex64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, Self::Complex(_) | Self::Complex64(_))
    }

    pub fn is_single_precision(&self) -> bool {
        matches!(self, Self::Real(_) | Self::Complex(_))
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Self::Real(_) => "float32",
            Self::Complex(_) => "complex64",
            Self::Real64(_) => "float64",
            Self::Complex64(_) => "complex128",
        }
    }

    fn slice(&self, range: std::ops::Range<usize>) -> Self {
        match self {
            Self::Real(v) => Self::Real(v[range].to_vec()),
            Self::Complex(v) => Self::Complex(v[range].to_vec()),
            Self::Real64(v) => Self::Real64(v[range].to_vec()),
            Self::Complex64(v) => Self::Complex64(v[range].to_vec()),
        }
    }

    fn extend(&mut self, other: Samples) -> Result<()> {
        match (self, other) {
            (Self::Real(a), Self::Real(b)) => a.extend(b),
            (Self::Complex(a), Self::Complex(b)) => a.extend(b),
            (Self::Real64(a), Self::Real64(b)) => a.extend(b),
            (Self::Complex64(a), Self::Complex64(b)) => a.extend(b),
            (a, b) => {
                return Err(PipeError::TypeMismatch(format!(
                    "cannot join {} samples with {} samples",
                    a.kind_name(),
                    b.kind_name()
                )))
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NmrArray {
    shape: Vec<usize>,
    samples: Samples,
}

impl NmrArray {
    /// Build an array, checking dimensionality and element count.
    pub fn new(shape: Vec<usize>, samples: Samples) -> Result<Self> {
        check_shape(&shape)?;
        let expected: usize = shape.iter().product();
        if samples.len() != expected {
            return Err(PipeError::Shape(format!(
                "shape {:?} needs {} samples, got {}",
                shape,
                expected,
                samples.len()
            )));
        }
        Ok(Self { shape, samples })
    }

    pub fn real(shape: Vec<usize>, data: Vec<f32>) -> Result<Self> {
        Self::new(shape, Samples::Real(data))
    }

    pub fn complex(shape: Vec<usize>, data: Vec<Complex32>) -> Result<Self> {
        Self::new(shape, Samples::Complex(data))
    }

    pub fn zeros(shape: Vec<usize>, complex: bool) -> Result<Self> {
        check_shape(&shape)?;
        let n = shape.iter().product();
        let samples = if complex {
            Samples::Complex(vec![Complex32::new(0.0, 0.0); n])
        } else {
            Samples::Real(vec![0.0; n])
        };
        Self::new(shape, samples)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_complex(&self) -> bool {
        self.samples.is_complex()
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    pub fn into_parts(self) -> (Vec<usize>, Samples) {
        (self.shape, self.samples)
    }

    /// Length of the trailing (direct) axis.
    pub fn vector_len(&self) -> usize {
        self.shape.last().copied().unwrap_or(0)
    }

    /// Number of trailing-axis vectors.
    pub fn vector_count(&self) -> usize {
        self.shape[..self.shape.len() - 1].iter().product()
    }

    /// Narrow 64-bit storage to the 32-bit element types of the format.
    pub fn narrow(self) -> Self {
        let samples = match self.samples {
            Samples::Real64(v) => Samples::Real(v.into_iter().map(|x| x as f32).collect()),
            Samples::Complex64(v) => Samples::Complex(
                v.into_iter()
                    .map(|z| Complex32::new(z.re as f32, z.im as f32))
                    .collect(),
            ),
            other => other,
        };
        Self {
            shape: self.shape,
            samples,
        }
    }

    /// Samples as complex values, promoting real data with zero imaginaries.
    pub fn to_complex32(&self) -> Result<Vec<Complex32>> {
        match &self.samples {
            Samples::Complex(v) => Ok(v.clone()),
            Samples::Real(v) => Ok(v.iter().map(|&x| Complex32::new(x, 0.0)).collect()),
            other => Err(PipeError::TypeMismatch(format!(
                "expected float32 storage, got {}",
                other.kind_name()
            ))),
        }
    }

    // ─── Leading-axis chunking ──────────────────────────────────────────

    /// Split the leading axis into at most `parts` contiguous chunks of
    /// `ceil(len / parts)` rows; the last chunk may be shorter. `parts == 0`
    /// or a 1-D array yields a single chunk.
    pub fn split_leading(&self, parts: usize) -> Vec<NmrArray> {
        if parts <= 1 || self.ndim() < 2 {
            return vec![self.clone()];
        }
        let lead = self.shape[0];
        let chunk = lead.div_ceil(parts);
        if chunk == 0 {
            return vec![self.clone()];
        }
        let row: usize = self.shape[1..].iter().product();
        (0..lead)
            .step_by(chunk)
            .map(|start| {
                let end = (start + chunk).min(lead);
                let mut shape = self.shape.clone();
                shape[0] = end - start;
                NmrArray {
                    shape,
                    samples: self.samples.slice(start * row..end * row),
                }
            })
            .collect()
    }

    /// Join chunks along the leading axis, in the order given.
    pub fn concat_leading(chunks: Vec<NmrArray>) -> Result<NmrArray> {
        let mut iter = chunks.into_iter();
        let mut out = iter
            .next()
            .ok_or_else(|| PipeError::Shape("no chunks to concatenate".into()))?;
        for chunk in iter {
            if chunk.ndim() != out.ndim() || chunk.shape[1..] != out.shape[1..] {
                return Err(PipeError::Shape(format!(
                    "chunk shape {:?} does not stack onto {:?}",
                    chunk.shape, out.shape
                )));
            }
            out.shape[0] += chunk.shape[0];
            out.samples.extend(chunk.samples)?;
        }
        Ok(out)
    }

    // ─── Planes ─────────────────────────────────────────────────────────

    /// Number of blocks made of the trailing `inner_dims` axes.
    pub fn block_count(&self, inner_dims: usize) -> usize {
        let split = self.ndim().saturating_sub(inner_dims);
        self.shape[..split].iter().product()
    }

    /// The `index`-th block of the trailing `inner_dims` axes, in row-major
    /// order over the remaining outer axes.
    pub fn block(&self, index: usize, inner_dims: usize) -> Result<NmrArray> {
        let split = self.ndim().saturating_sub(inner_dims);
        let count = self.block_count(inner_dims);
        if index >= count {
            return Err(PipeError::Shape(format!(
                "block {index} out of range for {count} blocks"
            )));
        }
        let inner = self.shape[split..].to_vec();
        let size: usize = inner.iter().product();
        Ok(NmrArray {
            shape: inner,
            samples: self.samples.slice(index * size..(index + 1) * size),
        })
    }

    /// Minimum and maximum of the real parts.
    pub fn real_min_max(&self) -> Option<(f32, f32)> {
        let fold = |acc: Option<(f32, f32)>, x: f32| match acc {
            None => Some((x, x)),
            Some((lo, hi)) => Some((lo.min(x), hi.max(x))),
        };
        match &self.samples {
            Samples::Real(v) => v.iter().copied().fold(None, fold),
            Samples::Complex(v) => v.iter().map(|z| z.re).fold(None, fold),
            Samples::Real64(v) => v.iter().map(|&x| x as f32).fold(None, fold),
            Samples::Complex64(v) => v.iter().map(|z| z.re as f32).fold(None, fold),
        }
    }
}

fn check_shape(shape: &[usize]) -> Result<()> {
    if shape.is_empty() || shape.len() > 4 {
        return Err(PipeError::Shape(format!(
            "{} dimensions not supported (1 to 4)",
            shape.len()
        )));
    }
    if shape.contains(&0) {
        return Err(PipeError::Shape(format!("empty axis in shape {shape:?}")));
    }
    Ok(())
}
