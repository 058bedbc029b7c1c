//! DECO: least-squares decomposition of a 1-D spectrum into basis spectra.
//!
//! The output is the best approximation of the input as a linear
//! combination of the bases. The combination coefficients are written to a
//! separate 1-D NMRPipe file.

use crate::runner::Transform;
use nmrpipe_core::{DataFrame, NmrArray, PipeError, Result, Samples};
use nmrpipe_io::{read_from_file, write_to_file};
use num_complex::{Complex32, Complex64};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoParams {
    /// Basis spectra, used in file-name order.
    pub bases: Vec<PathBuf>,
    /// Output file for the coefficients; overwritten if present.
    pub file: PathBuf,
}

impl DecoParams {
    pub fn command(&self) -> String {
        let bases: Vec<String> = self
            .bases
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        format!(
            "nmrPipe -fn DECO -basis {} -file {}",
            bases.join(" "),
            self.file.display()
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct Deco {
    params: DecoParams,
    /// Basis vectors, loaded in `initialize`.
    bases: Vec<Vec<Complex64>>,
}

impl Deco {
    pub fn new(params: DecoParams) -> Self {
        Self {
            params,
            bases: Vec::new(),
        }
    }

    pub fn params(&self) -> &DecoParams {
        &self.params
    }
}

fn widen(array: &NmrArray) -> Result<Vec<Complex64>> {
    Ok(array
        .to_complex32()?
        .into_iter()
        .map(|z| Complex64::new(z.re as f64, z.im as f64))
        .collect())
}

/// `upper(v)` followed by `lower(v)`, element-wise.
fn stacked<U, L>(v: &[Complex64], upper: U, lower: L) -> Vec<f64>
where
    U: Fn(&Complex64) -> f64,
    L: Fn(&Complex64) -> f64,
{
    v.iter().map(upper).chain(v.iter().map(lower)).collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Minimum-norm least-squares solution of the real system whose columns
/// are `cols`, by one-sided Jacobi SVD. Singular values at or below
/// `max(rows, cols) * EPSILON` times the largest are treated as zero, so a
/// rank-deficient system still gets a solution. `None` when every column
/// is zero.
fn min_norm_solve(cols: &[Vec<f64>], rhs: &[f64]) -> Option<Vec<f64>> {
    const MAX_SWEEPS: usize = 60;
    let m = cols.len();
    let rows = rhs.len();
    let mut u = cols.to_vec();
    let mut v: Vec<Vec<f64>> = (0..m)
        .map(|j| (0..m).map(|i| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for _ in 0..MAX_SWEEPS {
        let mut rotated = false;
        for p in 0..m {
            for q in p + 1..m {
                let alpha = dot(&u[p], &u[p]);
                let beta = dot(&u[q], &u[q]);
                let gamma = dot(&u[p], &u[q]);
                if gamma.abs() <= f64::EPSILON * (alpha * beta).sqrt() {
                    continue;
                }
                rotated = true;
                let zeta = (beta - alpha) / (2.0 * gamma);
                let t = zeta.signum() / (zeta.abs() + (1.0 + zeta * zeta).sqrt());
                let c = 1.0 / (1.0 + t * t).sqrt();
                let s = c * t;
                for w in [&mut u, &mut v] {
                    let (lo, hi) = w.split_at_mut(q);
                    for (x, y) in lo[p].iter_mut().zip(hi[0].iter_mut()) {
                        let (xp, xq) = (*x, *y);
                        *x = c * xp - s * xq;
                        *y = s * xp + c * xq;
                    }
                }
            }
        }
        if !rotated {
            break;
        }
    }

    let sigma: Vec<f64> = u.iter().map(|col| dot(col, col).sqrt()).collect();
    let largest = sigma.iter().copied().fold(0.0, f64::max);
    if largest == 0.0 {
        return None;
    }
    let cutoff = largest * rows.max(m) as f64 * f64::EPSILON;
    let mut x = vec![0.0; m];
    for j in (0..m).filter(|&j| sigma[j] > cutoff) {
        let weight = dot(&u[j], rhs) / (sigma[j] * sigma[j]);
        for (xi, vi) in x.iter_mut().zip(&v[j]) {
            *xi += weight * vi;
        }
    }
    Some(x)
}

/// Least-squares coefficients of `target` over `bases`, minimum-norm when
/// the bases are linearly dependent. `None` without bases or when every
/// basis is zero.
///
/// The complex system `A beta = b` is solved as the real system
/// `[Re A, -Im A; Im A, Re A] [Re beta; Im beta] = [Re b; Im b]`.
pub fn least_squares(bases: &[Vec<Complex64>], target: &[Complex64]) -> Option<Vec<Complex64>> {
    let k = bases.len();
    if k == 0 {
        return None;
    }
    let mut cols: Vec<Vec<f64>> = bases
        .iter()
        .map(|basis| stacked(basis, |z| z.re, |z| z.im))
        .collect();
    cols.extend(bases.iter().map(|basis| stacked(basis, |z| -z.im, |z| z.re)));
    let rhs = stacked(target, |z| z.re, |z| z.im);

    let x = min_norm_solve(&cols, &rhs)?;
    Some((0..k).map(|j| Complex64::new(x[j], x[k + j])).collect())
}

fn write_coefficients(beta: &[Complex64], path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let values = beta.iter().map(|z| z.re as f32).collect();
    let frame = DataFrame::from_array(NmrArray::real(vec![beta.len()], values)?);
    write_to_file(&frame, path, true)
}

impl Transform for Deco {
    fn name(&self) -> &'static str {
        "DECO"
    }

    fn initialize(&mut self, frame: &mut DataFrame) -> Result<()> {
        if frame.array.ndim() != 1 {
            return Err(PipeError::Shape(format!(
                "DECO supports 1-D data only, got {}-D",
                frame.array.ndim()
            )));
        }
        if self.params.bases.is_empty() {
            return Err(PipeError::Shape("DECO needs at least one basis".into()));
        }
        let len = frame.array.vector_len();
        let mut paths = self.params.bases.clone();
        paths.sort();

        self.bases.clear();
        for path in &paths {
            let basis = read_from_file(path)?.array;
            if basis.ndim() != 1 || basis.vector_len() != len {
                return Err(PipeError::Shape(format!(
                    "basis {} has shape {:?}, expected [{}]",
                    path.display(),
                    basis.shape(),
                    len
                )));
            }
            self.bases.push(widen(&basis)?);
        }
        log::debug!("DECO: loaded {} bases", self.bases.len());
        Ok(())
    }

    fn process(&self, array: NmrArray, _vector_parallel: bool) -> Result<NmrArray> {
        if array.ndim() != 1 {
            return Err(PipeError::Shape("DECO supports 1-D data only".into()));
        }
        let target = widen(&array)?;
        let Some(beta) = least_squares(&self.bases, &target) else {
            log::warn!("DECO: every basis is zero, data left unchanged");
            return Ok(array);
        };
        if let Err(err) = write_coefficients(&beta, &self.params.file) {
            log::warn!(
                "DECO: could not write coefficients to {}: {err}",
                self.params.file.display()
            );
            return Ok(array);
        }

        let approx: Vec<Complex64> = (0..target.len())
            .map(|i| {
                self.bases
                    .iter()
                    .zip(&beta)
                    .map(|(basis, c)| basis[i] * c)
                    .sum()
            })
            .collect();
        let shape = array.shape().to_vec();
        let samples = if array.is_complex() {
            Samples::Complex(
                approx
                    .iter()
                    .map(|z| Complex32::new(z.re as f32, z.im as f32))
                    .collect(),
            )
        } else {
            Samples::Real(approx.iter().map(|z| z.re as f32).collect())
        };
        NmrArray::new(shape, samples)
    }

    fn chunkable(&self, _array: &NmrArray) -> bool {
        false
    }

    fn update_header(&self, _frame: &mut DataFrame) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64) -> Complex64 {
        Complex64::new(re, 0.0)
    }

    #[test]
    fn test_exact_combination() {
        let b1 = vec![c(1.0), c(0.0), c(1.0), c(0.0)];
        let b2 = vec![c(0.0), c(1.0), c(0.0), c(2.0)];
        let target: Vec<Complex64> = b1
            .iter()
            .zip(&b2)
            .map(|(a, b)| *a * 3.0 + *b * -0.5)
            .collect();
        let beta = least_squares(&[b1, b2], &target).unwrap();
        assert!((beta[0].re - 3.0).abs() < 1e-9);
        assert!((beta[1].re + 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_duplicate_bases_split_evenly() {
        let b = vec![c(1.0), c(2.0)];
        // projection of (1, 1) onto (1, 2) is 3/5 of the basis
        let beta = least_squares(&[b.clone(), b], &[c(1.0), c(1.0)]).unwrap();
        assert!((beta[0].re - 0.3).abs() < 1e-9);
        assert!((beta[1].re - 0.3).abs() < 1e-9);
        assert!(beta.iter().all(|z| z.im.abs() < 1e-9));
    }

    #[test]
    fn test_complex_coefficients() {
        let b1 = vec![Complex64::new(1.0, 1.0), c(0.0), c(2.0)];
        let b2 = vec![c(0.0), Complex64::new(0.0, 1.0), c(1.0)];
        let (w1, w2) = (Complex64::new(2.0, -1.0), Complex64::new(0.5, 0.5));
        let target: Vec<Complex64> = b1.iter().zip(&b2).map(|(x, y)| x * w1 + y * w2).collect();
        let beta = least_squares(&[b1, b2], &target).unwrap();
        assert!((beta[0] - w1).norm() < 1e-9);
        assert!((beta[1] - w2).norm() < 1e-9);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(least_squares(&[], &[c(1.0)]).is_none());
        assert!(least_squares(&[vec![c(0.0), c(0.0)]], &[c(1.0), c(1.0)]).is_none());
    }

    #[test]
    fn test_rejects_2d_input() {
        let array = NmrArray::real(vec![2, 2], vec![0.0; 4]).unwrap();
        let mut frame = DataFrame::from_array(array);
        let mut deco = Deco::new(DecoParams {
            bases: vec![PathBuf::from("unused.fid")],
            file: PathBuf::from("coef.fid"),
        });
        assert!(matches!(
            deco.initialize(&mut frame),
            Err(PipeError::Shape(_))
        ));
    }
}
