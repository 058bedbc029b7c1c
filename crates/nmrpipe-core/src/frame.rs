//! `DataFrame`: one header and one array, the unit passed between stages.

use crate::array::NmrArray;
use crate::enums::QuadFlag;
use crate::error::Result;
use crate::header::{positional_sizes, HeaderStore};

#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
    pub header: HeaderStore,
    pub array: NmrArray,
}

impl DataFrame {
    pub fn new(header: HeaderStore, array: NmrArray) -> Self {
        Self { header, array }
    }

    /// Frame with a header synthesized from the array.
    pub fn from_array(array: NmrArray) -> Self {
        Self {
            header: HeaderStore::for_array(&array),
            array,
        }
    }

    /// Record the array shape in the header: dimension count, the size of
    /// each trailing axis, and `FDSLICECOUNT` (number of trailing vectors).
    ///
    /// Sizes are positional: `FDSIZE` is always the trailing length, whatever
    /// the dimension order. After a transpose `NDSIZE` of logical axis 1 may
    /// therefore resolve to `FDSPECNUM` and report the outer length.
    pub fn sync_sizes(&mut self) -> Result<()> {
        let shape = self.array.shape().to_vec();
        self.header.set_dim_count(shape.len())?;
        for (name, len) in positional_sizes(&shape) {
            self.header.set(name, len as f32, 0)?;
        }
        self.header
            .set("FDSLICECOUNT", self.array.vector_count() as f32, 0)?;
        Ok(())
    }

    /// Mark the X-axis complex or real from the element type, then set
    /// `FDQUADFLAG` to real only when every axis in use is real.
    pub fn sync_quad_flags(&mut self) -> Result<()> {
        let x = if self.array.is_complex() {
            QuadFlag::Complex
        } else {
            QuadFlag::Real
        };
        self.header.set_quad(1, x)?;

        let mut all_real = true;
        for axis in 1..=self.array.ndim() {
            all_real &= !self.header.is_complex(axis)?;
        }
        let overall = if all_real {
            QuadFlag::Real
        } else {
            QuadFlag::Complex
        };
        self.header.set("FDQUADFLAG", overall.as_f32(), 0)
    }

    /// Both of the above.
    pub fn sync_shape(&mut self) -> Result<()> {
        self.sync_sizes()?;
        self.sync_quad_flags()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex32;

    #[test]
    fn test_sync_sizes_3d() {
        let array = NmrArray::real(vec![4, 3, 8], vec![0.0; 96]).unwrap();
        let mut frame = DataFrame::new(HeaderStore::new(), array);
        frame.sync_sizes().unwrap();
        let h = &frame.header;
        assert_eq!(h.dim_count(), 3);
        assert_eq!(h.get_float("FDSIZE", 0).unwrap(), 8.0);
        assert_eq!(h.get_float("FDSPECNUM", 0).unwrap(), 3.0);
        assert_eq!(h.get_float("FDF3SIZE", 0).unwrap(), 4.0);
        assert_eq!(h.get_float("FDSLICECOUNT", 0).unwrap(), 12.0);
    }

    #[test]
    fn test_quad_flags_follow_array() {
        let c = NmrArray::complex(vec![4], vec![Complex32::new(1.0, 0.0); 4]).unwrap();
        let mut frame = DataFrame::from_array(c);
        assert!(frame.header.is_complex(1).unwrap());
        assert_eq!(frame.header.get_float("FDQUADFLAG", 0).unwrap(), 0.0);

        frame.array = NmrArray::real(vec![4], vec![1.0; 4]).unwrap();
        frame.sync_quad_flags().unwrap();
        assert!(!frame.header.is_complex(1).unwrap());
        assert_eq!(frame.header.get_float("FDQUADFLAG", 0).unwrap(), 1.0);
    }
}
