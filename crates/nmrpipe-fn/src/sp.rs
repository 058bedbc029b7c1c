//! SP (alias SINE): adjustable sine-bell window on the direct axis.

use crate::runner::{for_each_vector, Transform};
use nmrpipe_core::{ApodCode, DataFrame, NmrArray, PipeError, Result, Samples};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpParams {
    /// Sine start, in units of pi (Q1).
    pub off: f32,
    /// Sine end, in units of pi (Q2).
    pub end: f32,
    /// Sine exponent (Q3).
    pub pow: f32,
    /// Window length; 0 uses the vector length.
    pub size: usize,
    /// First point of the window, 1-based.
    pub start: usize,
    /// First point scale.
    pub c: f32,
    /// Points outside the window are kept rather than zeroed.
    pub one: bool,
    /// Take Q1-Q3, LB, GB, GOFF and C1 from the header.
    pub hdr: bool,
    /// Divide by the window instead of multiplying.
    pub inv: bool,
    /// Shift the window for the digital filter delay.
    pub df: bool,
    /// Extra exponential line broadening, Hz.
    pub elb: f32,
    /// Extra gaussian broadening, Hz.
    pub glb: f32,
    /// Gaussian offset, 0 to 1.
    pub goff: f32,
}

impl Default for SpParams {
    fn default() -> Self {
        Self {
            off: 0.0,
            end: 1.0,
            pow: 1.0,
            size: 0,
            start: 1,
            c: 1.0,
            one: false,
            hdr: false,
            inv: false,
            df: false,
            elb: 0.0,
            glb: 0.0,
            goff: 0.0,
        }
    }
}

impl SpParams {
    pub fn command(&self) -> String {
        let mut cmd = if self.hdr {
            String::from("nmrPipe -fn SP -hdr")
        } else {
            format!(
                "nmrPipe -fn SP -off {:.3} -end {:.3} -pow {:.1} -c {:.1}",
                self.off, self.end, self.pow, self.c
            )
        };
        if self.size > 0 {
            cmd.push_str(&format!(" -size {}", self.size));
        }
        if self.start != 1 {
            cmd.push_str(&format!(" -start {}", self.start));
        }
        if self.elb != 0.0 {
            cmd.push_str(&format!(" -elb {:.3}", self.elb));
        }
        if self.glb != 0.0 {
            cmd.push_str(&format!(" -glb {:.3} -goff {:.3}", self.glb, self.goff));
        }
        for (on, flag) in [(self.one, " -one"), (self.inv, " -inv"), (self.df, " -df")] {
            if on {
                cmd.push_str(flag);
            }
        }
        cmd
    }

    /// Window values for a vector of `t_size` points, or `None` when the
    /// window leaves the data unchanged. `df` is the digital filter delay
    /// in points and `sw` the sweep width in Hz.
    pub fn window(&self, t_size: usize, df: f32, sw: f32) -> Option<Vec<f32>> {
        if self.pow == 0.0 || (self.off == 0.5 && self.end == 0.5) {
            return None;
        }
        let a_size = if self.size > 0 { self.size } else { t_size };
        let start = self.start.max(1);
        let m_size = if start + a_size - 1 > t_size {
            (t_size + 1).saturating_sub(start)
        } else {
            a_size
        };

        let (mut a1, a2, a3) = (self.off, self.end, self.pow);
        if df > 0.0 && m_size as f32 > df {
            a1 -= (a2 - a1) / (m_size as f32 - df);
        }
        let q = (a_size as f32 - 1.0).max(1.0);
        let in_unit = (0.0..=1.0).contains(&a1) && (0.0..=1.0).contains(&a2);

        let outside = if self.one { 1.0 } else { 0.0 };
        let mut w = vec![outside; t_size];
        for i in 0..m_size {
            let t = (i as f32 - df) / q;
            let mut a = (PI * a1 + PI * (a2 - a1) * t.abs()).sin().powf(a3);
            if in_unit {
                a = a.abs();
            }
            if sw > 0.0 {
                if self.elb != 0.0 {
                    a *= (-PI * self.elb * i as f32 / sw).exp();
                }
                if self.glb != 0.0 {
                    let center = self.goff * (m_size as f32 - 1.0);
                    let g = 0.6 * PI * self.glb * (center - i as f32) / sw;
                    a *= (-g * g).exp();
                }
            }
            w[start - 1 + i] = a;
        }
        if let Some(first) = w.first_mut() {
            *first *= self.c;
        }
        if self.inv {
            for v in w.iter_mut() {
                *v = if *v != 0.0 { 1.0 / *v } else { 0.0 };
            }
        }
        Some(w)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Sp {
    params: SpParams,
    /// Parameters after `-hdr` substitution.
    applied: SpParams,
    window: Option<Vec<f32>>,
}

impl Sp {
    pub fn new(params: SpParams) -> Self {
        Self {
            applied: params.clone(),
            params,
            window: None,
        }
    }

    pub fn params(&self) -> &SpParams {
        &self.params
    }
}

impl Transform for Sp {
    fn name(&self) -> &'static str {
        "SP"
    }

    fn initialize(&mut self, frame: &mut DataFrame) -> Result<()> {
        let hdr = &frame.header;
        let mut applied = self.params.clone();
        if self.params.hdr {
            applied.off = hdr.get_float("NDAPODQ1", 1)?;
            applied.end = hdr.get_float("NDAPODQ2", 1)?;
            applied.pow = hdr.get_float("NDAPODQ3", 1)?;
            applied.elb = hdr.get_float("NDLB", 1)?;
            applied.glb = hdr.get_float("NDGB", 1)?;
            applied.goff = hdr.get_float("NDGOFF", 1)?;
            applied.c = 1.0 + hdr.get_float("NDC1", 1)?;
        }
        let df = if applied.df {
            hdr.get_float("FDDMXVAL", 0)?
        } else {
            0.0
        };
        let sw = hdr.get_float("NDSW", 1)?;
        self.window = applied.window(frame.array.vector_len(), df, sw);
        if self.window.is_none() {
            log::debug!("SP: window is the identity");
        }
        self.applied = applied;
        Ok(())
    }

    fn process(&self, array: NmrArray, vector_parallel: bool) -> Result<NmrArray> {
        let Some(window) = &self.window else {
            return Ok(array);
        };
        let n = array.vector_len();
        if window.len() != n {
            return Err(PipeError::Shape(format!(
                "window has {} points, data vectors have {}",
                window.len(),
                n
            )));
        }
        let (shape, samples) = array.into_parts();
        let samples = match samples {
            Samples::Real(mut v) => {
                for_each_vector(&mut v, n, vector_parallel, |vector| {
                    vector.iter_mut().zip(window).for_each(|(x, w)| *x *= w);
                });
                Samples::Real(v)
            }
            Samples::Complex(mut v) => {
                for_each_vector(&mut v, n, vector_parallel, |vector| {
                    vector.iter_mut().zip(window).for_each(|(z, &w)| *z *= w);
                });
                Samples::Complex(v)
            }
            _ => {
                return Err(PipeError::TypeMismatch(
                    "SP needs float32 samples".into(),
                ))
            }
        };
        NmrArray::new(shape, samples)
    }

    fn update_header(&self, frame: &mut DataFrame) -> Result<()> {
        let a = &self.applied;
        let hdr = &mut frame.header;
        hdr.set("NDAPODQ1", a.off, 1)?;
        hdr.set("NDAPODQ2", a.end, 1)?;
        hdr.set("NDAPODQ3", a.pow, 1)?;
        hdr.set("NDLB", a.elb, 1)?;
        hdr.set("NDGB", a.glb, 1)?;
        hdr.set("NDGOFF", a.goff, 1)?;
        hdr.set("NDC1", a.c - 1.0, 1)?;
        hdr.set("NDAPODCODE", ApodCode::SineBell.as_f32(), 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{Parallelism, TransformRunner};

    #[test]
    fn test_default_window_is_half_sine() {
        let w = SpParams::default().window(5, 0.0, 0.0).unwrap();
        let expected = [0.0, 0.707_106_8, 1.0, 0.707_106_8, 0.0];
        for (a, b) in w.iter().zip(expected) {
            assert!((a - b).abs() < 1e-5, "{a} != {b}");
        }
    }

    #[test]
    fn test_identity_cases() {
        let p = SpParams {
            pow: 0.0,
            ..Default::default()
        };
        assert!(p.window(8, 0.0, 0.0).is_none());
        let p = SpParams {
            off: 0.5,
            end: 0.5,
            ..Default::default()
        };
        assert!(p.window(8, 0.0, 0.0).is_none());
    }

    #[test]
    fn test_partial_window_and_outside() {
        let p = SpParams {
            off: 0.5,
            size: 2,
            start: 2,
            one: true,
            c: 0.5,
            ..Default::default()
        };
        let w = p.window(4, 0.0, 0.0).unwrap();
        // first point is outside the window, so 1 * c
        assert_eq!(w[0], 0.5);
        assert!((w[1] - 1.0).abs() < 1e-6);
        assert!(w[2].abs() < 1e-6);
        assert_eq!(w[3], 1.0);
    }

    #[test]
    fn test_cosine_bell_applied_and_recorded() {
        let array = NmrArray::real(vec![2, 3], vec![2.0; 6]).unwrap();
        let mut frame = DataFrame::from_array(array);
        let params = SpParams {
            off: 0.5,
            pow: 2.0,
            ..Default::default()
        };
        TransformRunner::new(Parallelism::default())
            .run(&mut Sp::new(params), &mut frame)
            .unwrap();
        match frame.array.samples() {
            Samples::Real(v) => {
                assert!((v[0] - 2.0).abs() < 1e-5);
                assert!((v[1] - 1.0).abs() < 1e-5);
                assert!(v[2].abs() < 1e-5);
                assert_eq!(&v[..3], &v[3..]);
            }
            other => panic!("unexpected samples {other:?}"),
        }
        let h = &frame.header;
        assert_eq!(h.get_float("NDAPODQ1", 1).unwrap(), 0.5);
        assert_eq!(h.get_float("NDAPODQ3", 1).unwrap(), 2.0);
        assert_eq!(h.get_float("NDAPODCODE", 1).unwrap(), 1.0);
        assert_eq!(h.get_float("NDC1", 1).unwrap(), 0.0);
    }

    #[test]
    fn test_hdr_uses_recorded_window() {
        let array = NmrArray::real(vec![3], vec![1.0; 3]).unwrap();
        let mut frame = DataFrame::from_array(array);
        frame.header.set("NDAPODQ1", 0.5, 1).unwrap();
        frame.header.set("NDAPODQ2", 1.0, 1).unwrap();
        frame.header.set("NDAPODQ3", 1.0, 1).unwrap();
        let mut sp = Sp::new(SpParams {
            hdr: true,
            ..Default::default()
        });
        sp.initialize(&mut frame).unwrap();
        assert_eq!(sp.applied.off, 0.5);
        assert_eq!(sp.applied.c, 1.0);
    }
}
