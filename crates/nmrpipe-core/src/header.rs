//! `HeaderStore`: the named-field view of an FDATA header.
//!
//! Fields are addressed either by their physical `FD*` name or by a logical
//! `ND*` name that is resolved through the dimension order. `NDSIZE` on the
//! current X-axis of an untransposed dataset resolves to `FDF2SIZE`, which
//! the format stores in `FDSIZE`; the F1 size likewise lives in `FDSPECNUM`.

use crate::array::NmrArray;
use crate::enums::{Axis, QuadFlag};
use crate::error::{PipeError, Result};
use crate::fdata::*;
use std::fmt;

/// A header value as seen by callers.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Float(f32),
    Text(String),
}

/// Stored value; text keeps its raw bytes so re-encoding is exact.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Slot {
    Float(f32),
    Text(Vec<u8>),
}

/// Per-axis fields moved along with the axis when exchanging two axes.
const EXCHANGED_SUFFIXES: [&str; 5] = ["SIZE", "APOD", "SW", "QUADFLAG", "LABEL"];

#[derive(Clone, PartialEq)]
pub struct HeaderStore {
    /// One entry per [`FIELDS`] element, same order.
    pub(crate) values: Vec<Slot>,
    /// Physical axis code (1..4) for each logical axis position.
    pub(crate) dim_order: [usize; 4],
    current_dim: Axis,
}

impl Default for HeaderStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaderStore {
    /// All fields zero except the NMRPipe defaults: float format, byte
    /// order constant, dimension order 2 1 3 4, one dimension.
    pub fn new() -> Self {
        let mut store = Self::zeroed();
        store.put("FDFLTFORMAT", FD_IEEE_CONS as f32);
        store.put("FDFLTORDER", FD_ORDER_CONS);
        store.put("FD2DVIRGIN", 1.0);
        store.put("FDDIMCOUNT", 1.0);
        store.set_dim_order(DEFAULT_DIMORDER);
        store
    }

    /// Every field zero or empty; dimension order left at its default.
    pub(crate) fn zeroed() -> Self {
        let values = FIELDS
            .iter()
            .map(|field| match field.kind {
                FieldKind::Float => Slot::Float(0.0),
                FieldKind::Text(_) => Slot::Text(Vec::new()),
            })
            .collect();
        Self {
            values,
            dim_order: DEFAULT_DIMORDER,
            current_dim: Axis::X,
        }
    }

    /// Minimal header describing `array`: sizes, dimension count, slice
    /// count and quad flags. Used for synthesized outputs.
    pub fn for_array(array: &NmrArray) -> Self {
        let mut store = Self::new();
        let shape = array.shape();
        store.put("FDDIMCOUNT", shape.len() as f32);
        for (name, len) in positional_sizes(shape) {
            store.put(name, len as f32);
        }
        store.put("FDSLICECOUNT", array.vector_count() as f32);

        let x_quad = if array.is_complex() {
            QuadFlag::Complex
        } else {
            QuadFlag::Real
        };
        for code in 1..=4 {
            let flag = if code == 2 { x_quad } else { QuadFlag::Real };
            store.put(quad_field(code), flag.as_f32());
        }
        store.put("FDQUADFLAG", x_quad.as_f32());
        store
    }

    // ─── Addressing ─────────────────────────────────────────────────────

    /// Resolve a field name to its declared physical name.
    ///
    /// `axis` 0 means the first logical axis; 1..4 pick a logical axis.
    /// Only `ND*` names depend on `axis`.
    pub fn resolve(&self, name: &str, axis: usize) -> Result<&'static str> {
        if axis > 4 {
            return Err(PipeError::unknown_field(format!("{name} (axis {axis})")));
        }
        let physical = match name.strip_prefix("ND") {
            Some(suffix) => {
                let code = self.dim_order[axis.saturating_sub(1)];
                format!("FDF{code}{suffix}")
            }
            None => name.to_string(),
        };
        let physical = match physical.as_str() {
            "FDF2SIZE" => "FDSIZE",
            "FDF1SIZE" => "FDSPECNUM",
            other => other,
        };
        lookup_field(physical)
            .map(|field| field.name)
            .ok_or_else(|| PipeError::unknown_field(physical))
    }

    pub fn get(&self, name: &str, axis: usize) -> Result<HeaderValue> {
        let physical = self.resolve(name, axis)?;
        if let Some(pos) = dim_order_position(physical) {
            return Ok(HeaderValue::Float(self.dim_order[pos] as f32));
        }
        let idx = field_index(physical).ok_or_else(|| PipeError::unknown_field(physical))?;
        Ok(match &self.values[idx] {
            Slot::Float(v) => HeaderValue::Float(*v),
            Slot::Text(bytes) => HeaderValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        })
    }

    pub fn get_float(&self, name: &str, axis: usize) -> Result<f32> {
        match self.get(name, axis)? {
            HeaderValue::Float(v) => Ok(v),
            HeaderValue::Text(_) => Err(PipeError::TypeMismatch(format!(
                "{} holds text, not a float",
                self.resolve(name, axis)?
            ))),
        }
    }

    pub fn get_text(&self, name: &str, axis: usize) -> Result<String> {
        match self.get(name, axis)? {
            HeaderValue::Text(s) => Ok(s),
            HeaderValue::Float(_) => Err(PipeError::TypeMismatch(format!(
                "{} holds a float, not text",
                self.resolve(name, axis)?
            ))),
        }
    }

    /// Assign a float field. Text fields reject floats.
    pub fn set(&mut self, name: &str, value: f32, axis: usize) -> Result<()> {
        let physical = self.resolve(name, axis)?;
        let idx = field_index(physical).ok_or_else(|| PipeError::unknown_field(physical))?;
        if let Some(pos) = dim_order_position(physical) {
            if !(1.0..=4.0).contains(&value) || value.fract() != 0.0 {
                return Err(PipeError::Shape(format!(
                    "{physical} must be an axis code 1..4, got {value}"
                )));
            }
            self.dim_order[pos] = value as usize;
        }
        match &mut self.values[idx] {
            Slot::Float(v) => *v = value,
            Slot::Text(_) => {
                return Err(PipeError::TypeMismatch(format!(
                    "cannot store float {value} in text field {physical}"
                )))
            }
        }
        Ok(())
    }

    /// Assign a text field, cut at the first NUL and truncated to its
    /// declared width.
    pub fn set_text(&mut self, name: &str, value: &str, axis: usize) -> Result<()> {
        let physical = self.resolve(name, axis)?;
        let field = lookup_field(physical).ok_or_else(|| PipeError::unknown_field(physical))?;
        let width = match field.kind {
            FieldKind::Text(width) => width,
            FieldKind::Float => {
                return Err(PipeError::TypeMismatch(format!(
                    "cannot store text '{value}' in float field {physical}"
                )))
            }
        };
        // the format null-terminates text, so nothing past a NUL survives
        let raw = value.as_bytes();
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        let mut bytes = raw[..end].to_vec();
        bytes.truncate(width);
        if let Some(idx) = field_index(physical) {
            self.values[idx] = Slot::Text(bytes);
        }
        Ok(())
    }

    /// Set a value from its command-line form: floats parse, text fields
    /// take the string as is.
    pub fn set_from_str(&mut self, name: &str, value: &str, axis: usize) -> Result<()> {
        let physical = self.resolve(name, axis)?;
        match lookup_field(physical).map(|f| f.kind) {
            Some(FieldKind::Text(_)) => self.set_text(physical, value, 0),
            _ => {
                let v: f32 = value.trim().parse().map_err(|_| {
                    PipeError::TypeMismatch(format!("{physical} expects a number, got '{value}'"))
                })?;
                self.set(physical, v, 0)
            }
        }
    }

    /// Infallible write for names known to be declared floats.
    fn put(&mut self, name: &str, value: f32) {
        if let Some(idx) = field_index(name) {
            self.values[idx] = Slot::Float(value);
        }
    }

    fn float_or_zero(&self, name: &str) -> f32 {
        match field_index(name).map(|idx| &self.values[idx]) {
            Some(Slot::Float(v)) => *v,
            _ => 0.0,
        }
    }

    // ─── Dimension order ────────────────────────────────────────────────

    pub fn dim_count(&self) -> usize {
        self.float_or_zero("FDDIMCOUNT").max(0.0) as usize
    }

    pub fn set_dim_count(&mut self, n: usize) -> Result<()> {
        if !(1..=4).contains(&n) {
            return Err(PipeError::Shape(format!("dimension count {n} outside 1..4")));
        }
        self.put("FDDIMCOUNT", n as f32);
        Ok(())
    }

    pub fn dim_order(&self) -> [usize; 4] {
        self.dim_order
    }

    /// Replace the dimension order, mirroring it into `FDDIMORDER1..4`.
    pub fn set_dim_order(&mut self, order: [usize; 4]) {
        self.dim_order = order;
        for (i, code) in order.iter().enumerate() {
            self.put(DIMORDER_FIELDS[i], *code as f32);
        }
    }

    pub fn current_dim(&self) -> Axis {
        self.current_dim
    }

    pub fn set_current_dim(&mut self, axis: usize) -> Result<()> {
        self.current_dim = Axis::from_index(axis)
            .ok_or_else(|| PipeError::Shape(format!("current axis {axis} outside 1..4")))?;
        Ok(())
    }

    /// Swap logical axes `a` and `b` (1-based). With `exchange`, the size,
    /// apodization size, sweep width, quad flag and label of the two
    /// physical axes are swapped as well.
    pub fn swap_axes(&mut self, a: usize, b: usize, exchange: bool) -> Result<()> {
        for axis in [a, b] {
            if !(1..=4).contains(&axis) {
                return Err(PipeError::Shape(format!("cannot swap axis {axis}")));
            }
        }
        if exchange {
            for suffix in EXCHANGED_SUFFIXES {
                let nd = format!("ND{suffix}");
                let ia = field_index(self.resolve(&nd, a)?);
                let ib = field_index(self.resolve(&nd, b)?);
                if let (Some(ia), Some(ib)) = (ia, ib) {
                    self.values.swap(ia, ib);
                }
            }
        }
        let mut order = self.dim_order;
        order.swap(a - 1, b - 1);
        self.set_dim_order(order);
        Ok(())
    }

    // ─── Per-axis convenience ───────────────────────────────────────────

    pub fn is_complex(&self, axis: usize) -> Result<bool> {
        let flag = QuadFlag::from_header(self.get_float("NDQUADFLAG", axis)?);
        Ok(flag.is_some_and(QuadFlag::is_complex))
    }

    pub fn set_quad(&mut self, axis: usize, flag: QuadFlag) -> Result<()> {
        self.set("NDQUADFLAG", flag.as_f32(), axis)
    }

    /// Is this axis in the frequency domain?
    pub fn is_freq(&self, axis: usize) -> Result<bool> {
        Ok(self.get_float("NDFTFLAG", axis)? != 0.0)
    }

    pub fn set_transposed(&mut self, transposed: bool) {
        self.put("FDTRANSPOSED", if transposed { 1.0 } else { 0.0 });
    }

    pub fn is_transposed(&self) -> bool {
        self.float_or_zero("FDTRANSPOSED") as i32 != 0
    }

    // ─── Pipeline bookkeeping ───────────────────────────────────────────

    pub fn pipe_count(&self) -> u32 {
        self.float_or_zero("FDPIPECOUNT").max(0.0) as u32
    }

    pub fn increment_pipe_count(&mut self) {
        let next = self.pipe_count() + 1;
        self.put("FDPIPECOUNT", next as f32);
    }

    pub fn reset_pipe_count(&mut self) {
        self.put("FDPIPECOUNT", 0.0);
    }

    // ─── Title / Comment ────────────────────────────────────────────────

    pub fn title(&self) -> String {
        self.get_text("FDTITLE", 0).unwrap_or_default()
    }

    pub fn set_title(&mut self, title: &str) -> Result<()> {
        self.set_text("FDTITLE", title, 0)
    }

    pub fn comment(&self) -> String {
        self.get_text("FDCOMMENT", 0).unwrap_or_default()
    }

    pub fn set_comment(&mut self, comment: &str) -> Result<()> {
        self.set_text("FDCOMMENT", comment, 0)
    }
}

const DIMORDER_FIELDS: [&str; 4] = ["FDDIMORDER1", "FDDIMORDER2", "FDDIMORDER3", "FDDIMORDER4"];

fn dim_order_position(physical: &str) -> Option<usize> {
    DIMORDER_FIELDS.iter().position(|name| *name == physical)
}

fn quad_field(code: usize) -> &'static str {
    match code {
        1 => "FDF1QUADFLAG",
        2 => "FDF2QUADFLAG",
        3 => "FDF3QUADFLAG",
        _ => "FDF4QUADFLAG",
    }
}

/// Size fields paired with the trailing-first lengths of `shape`: the
/// vector length goes to `FDSIZE`, the next axis out to `FDSPECNUM`, then
/// `FDF3SIZE` and `FDF4SIZE`. Missing axes report length 1.
pub fn positional_sizes(shape: &[usize]) -> [(&'static str, usize); 4] {
    let len = |back: usize| -> usize {
        shape
            .len()
            .checked_sub(back)
            .map(|i| shape[i])
            .unwrap_or(1)
    };
    [
        ("FDSIZE", len(1)),
        ("FDSPECNUM", len(2)),
        ("FDF3SIZE", len(3)),
        ("FDF4SIZE", len(4)),
    ]
}

impl fmt::Debug for HeaderStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderStore")
            .field("dim_count", &self.dim_count())
            .field("dim_order", &self.dim_order)
            .field("current_dim", &self.current_dim())
            .field("x_size", &self.float_or_zero("FDSIZE"))
            .field("y_size", &self.float_or_zero("FDSPECNUM"))
            .field("z_size", &self.float_or_zero("FDF3SIZE"))
            .field("a_size", &self.float_or_zero("FDF4SIZE"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_header() {
        let hdr = HeaderStore::new();
        assert_eq!(hdr.dim_count(), 1);
        assert_eq!(hdr.dim_order(), [2, 1, 3, 4]);
        assert_eq!(hdr.get_float("FDDIMORDER2", 0).unwrap(), 1.0);
        assert_eq!(hdr.get_float("FDFLTORDER", 0).unwrap(), FD_ORDER_CONS);
    }

    #[test]
    fn test_resolve_size_aliases() {
        let hdr = HeaderStore::new();
        assert_eq!(hdr.resolve("NDSIZE", 0).unwrap(), "FDSIZE");
        assert_eq!(hdr.resolve("NDSIZE", 1).unwrap(), "FDSIZE");
        assert_eq!(hdr.resolve("NDSIZE", 2).unwrap(), "FDSPECNUM");
        assert_eq!(hdr.resolve("NDSIZE", 3).unwrap(), "FDF3SIZE");
        assert_eq!(hdr.resolve("NDSW", 2).unwrap(), "FDF1SW");
        assert_eq!(hdr.resolve("FDF1SIZE", 0).unwrap(), "FDSPECNUM");
    }

    #[test]
    fn test_resolve_follows_swapped_order() {
        let mut hdr = HeaderStore::new();
        hdr.swap_axes(1, 2, false).unwrap();
        assert_eq!(hdr.dim_order(), [1, 2, 3, 4]);
        assert_eq!(hdr.resolve("NDSIZE", 0).unwrap(), "FDSPECNUM");
        assert_eq!(hdr.resolve("NDSIZE", 2).unwrap(), "FDSIZE");
        assert_eq!(hdr.get_float("FDDIMORDER1", 0).unwrap(), 1.0);
    }

    #[test]
    fn test_unknown_fields() {
        let mut hdr = HeaderStore::new();
        assert!(matches!(
            hdr.get("FDBOGUS", 0),
            Err(PipeError::UnknownField { .. })
        ));
        assert!(matches!(
            hdr.set("NDBOGUS", 1.0, 1),
            Err(PipeError::UnknownField { .. })
        ));
        assert!(matches!(
            hdr.resolve("NDSIZE", 5),
            Err(PipeError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_kind_mismatch() {
        let mut hdr = HeaderStore::new();
        assert!(matches!(
            hdr.set("FDTITLE", 1.0, 0),
            Err(PipeError::TypeMismatch(_))
        ));
        assert!(matches!(
            hdr.set_text("FDSIZE", "abc", 0),
            Err(PipeError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_label_roundtrip_and_truncation() {
        let mut hdr = HeaderStore::new();
        hdr.set_text("NDLABEL", "1H", 1).unwrap();
        assert_eq!(hdr.get_text("FDF2LABEL", 0).unwrap(), "1H");
        hdr.set_text("NDLABEL", "VERYLONGLABEL", 2).unwrap();
        assert_eq!(hdr.get_text("NDLABEL", 2).unwrap(), "VERYLONG");
    }

    #[test]
    fn test_swap_with_exchange() {
        let mut hdr = HeaderStore::new();
        hdr.set("NDSW", 8000.0, 1).unwrap();
        hdr.set("NDSW", 2000.0, 2).unwrap();
        hdr.set_text("NDLABEL", "HN", 1).unwrap();
        hdr.set_text("NDLABEL", "N15", 2).unwrap();
        hdr.swap_axes(1, 2, true).unwrap();
        // physical values were exchanged, so each logical axis keeps its own
        assert_eq!(hdr.get_float("NDSW", 1).unwrap(), 8000.0);
        assert_eq!(hdr.get_float("FDF2SW", 0).unwrap(), 2000.0);
        assert_eq!(hdr.get_text("NDLABEL", 2).unwrap(), "N15");
    }

    #[test]
    fn test_set_from_str() {
        let mut hdr = HeaderStore::new();
        hdr.set_from_str("NDOBS", "600.13", 1).unwrap();
        assert!((hdr.get_float("FDF2OBS", 0).unwrap() - 600.13).abs() < 1e-3);
        hdr.set_from_str("FDTITLE", "demo", 0).unwrap();
        assert_eq!(hdr.title(), "demo");
        assert!(hdr.set_from_str("FDSIZE", "abc", 0).is_err());
    }

    #[test]
    fn test_pipe_count() {
        let mut hdr = HeaderStore::new();
        hdr.increment_pipe_count();
        hdr.increment_pipe_count();
        assert_eq!(hdr.pipe_count(), 2);
        hdr.reset_pipe_count();
        assert_eq!(hdr.pipe_count(), 0);
    }
}
