//! Binary codec: header block and sample data to and from bytes.

use crate::array::{NmrArray, Samples};
use crate::enums::HdrStatus;
use crate::error::{PipeError, Result};
use crate::fdata::*;
use crate::header::{HeaderStore, Slot};
use byteorder::{ByteOrder, NativeEndian};
use num_complex::Complex32;

#[cfg(target_endian = "little")]
type SwappedEndian = byteorder::BigEndian;
#[cfg(target_endian = "big")]
type SwappedEndian = byteorder::LittleEndian;

// ─── Header ─────────────────────────────────────────────────────────────────

/// Decode a 2048-byte header block.
pub fn decode_header(bytes: &[u8]) -> Result<HeaderStore> {
    decode_header_with_order(bytes).map(|(header, _)| header)
}

/// Decode a header block and report whether it was byte-swapped.
pub fn decode_header_with_order(bytes: &[u8]) -> Result<(HeaderStore, HdrStatus)> {
    if bytes.len() != FDATA_BYTES {
        return Err(PipeError::decode(format!(
            "header block must be {} bytes, got {}",
            FDATA_BYTES,
            bytes.len()
        )));
    }
    let status = header_status(bytes);
    let read_word: fn(&[u8]) -> f32 = match status {
        HdrStatus::Ok => NativeEndian::read_f32,
        HdrStatus::Swapped => SwappedEndian::read_f32,
        HdrStatus::Bad => {
            return Err(PipeError::decode(
                "byte order check failed: FDFLTORDER is not 2.345",
            ))
        }
    };

    let mut header = HeaderStore::zeroed();
    for (value, field) in header.values.iter_mut().zip(FIELDS) {
        let start = field.slot * 4;
        *value = match field.kind {
            FieldKind::Float => Slot::Float(read_word(&bytes[start..start + 4])),
            FieldKind::Text(width) => {
                let raw = &bytes[start..start + width];
                let end = raw.iter().position(|&b| b == 0).unwrap_or(width);
                Slot::Text(raw[..end].to_vec())
            }
        };
    }

    let mut order = DEFAULT_DIMORDER;
    for (i, code) in order.iter_mut().enumerate() {
        let v = read_word(&bytes[(FDDIMORDER1 + i) * 4..(FDDIMORDER1 + i + 1) * 4]);
        if (1.0..=4.0).contains(&v) && v.fract() == 0.0 {
            *code = v as usize;
        }
    }
    header.dim_order = order;
    Ok((header, status))
}

/// Classify a header block by its byte-order constant.
pub fn header_status(bytes: &[u8]) -> HdrStatus {
    if bytes.len() < (FDFLTORDER + 1) * 4 {
        return HdrStatus::Bad;
    }
    let word = &bytes[FDFLTORDER * 4..(FDFLTORDER + 1) * 4];
    if (NativeEndian::read_f32(word) - FD_ORDER_CONS).abs() < 1e-3 {
        HdrStatus::Ok
    } else if (SwappedEndian::read_f32(word) - FD_ORDER_CONS).abs() < 1e-3 {
        HdrStatus::Swapped
    } else {
        HdrStatus::Bad
    }
}

/// Encode a header in native byte order. Undeclared slots are zero.
pub fn encode_header(header: &HeaderStore) -> [u8; FDATA_BYTES] {
    let mut buf = [0u8; FDATA_BYTES];
    for (value, field) in header.values.iter().zip(FIELDS) {
        let start = field.slot * 4;
        match value {
            Slot::Float(v) => NativeEndian::write_f32(&mut buf[start..start + 4], *v),
            Slot::Text(bytes) => {
                let n = bytes.len().min(field.width() * 4);
                buf[start..start + n].copy_from_slice(&bytes[..n]);
            }
        }
    }
    for (i, code) in header.dim_order.iter().enumerate() {
        let start = (FDDIMORDER1 + i) * 4;
        NativeEndian::write_f32(&mut buf[start..start + 4], *code as f32);
    }
    buf
}

// ─── Sample data ────────────────────────────────────────────────────────────

/// Number of bytes a dataset of `shape` occupies on the wire.
pub fn array_byte_len(shape: &[usize], is_complex: bool) -> usize {
    let floats: usize = shape.iter().product();
    floats * if is_complex { 2 } else { 1 } * 4
}

/// Decode native-order float32 samples. Complex data stores each trailing
/// vector as its real block followed by its imaginary block.
pub fn decode_array(bytes: &[u8], shape: &[usize], is_complex: bool) -> Result<NmrArray> {
    let expected = array_byte_len(shape, is_complex);
    if bytes.len() != expected {
        return Err(PipeError::decode(format!(
            "sample data for shape {:?} needs {} bytes, got {}",
            shape,
            expected,
            bytes.len()
        )));
    }
    let mut floats = vec![0f32; bytes.len() / 4];
    NativeEndian::read_f32_into(bytes, &mut floats);

    if !is_complex {
        return NmrArray::real(shape.to_vec(), floats);
    }
    let n = shape.last().copied().unwrap_or(0);
    let mut values = Vec::with_capacity(floats.len() / 2);
    if n > 0 {
        for vector in floats.chunks_exact(2 * n) {
            let (re, im) = vector.split_at(n);
            values.extend(re.iter().zip(im).map(|(&r, &i)| Complex32::new(r, i)));
        }
    }
    NmrArray::complex(shape.to_vec(), values)
}

/// Encode samples in native order. Only 32-bit storage is accepted.
pub fn encode_array(array: &NmrArray) -> Result<Vec<u8>> {
    let floats: Vec<f32> = match array.samples() {
        Samples::Real(v) => v.clone(),
        Samples::Complex(v) => {
            let n = array.vector_len();
            let mut out = Vec::with_capacity(v.len() * 2);
            for vector in v.chunks_exact(n) {
                out.extend(vector.iter().map(|z| z.re));
                out.extend(vector.iter().map(|z| z.im));
            }
            out
        }
        Samples::Real64(_) | Samples::Complex64(_) => {
            return Err(PipeError::TypeMismatch(
                "64-bit samples must be narrowed to float32 before encoding".into(),
            ))
        }
    };
    let mut buf = vec![0u8; floats.len() * 4];
    NativeEndian::write_f32_into(&floats, &mut buf);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> HeaderStore {
        let mut hdr = HeaderStore::new();
        hdr.set_dim_count(2).unwrap();
        hdr.set("NDSIZE", 512.0, 1).unwrap();
        hdr.set("NDSIZE", 128.0, 2).unwrap();
        hdr.set("NDSW", 12000.0, 1).unwrap();
        hdr.set("NDOBS", 600.13, 1).unwrap();
        hdr.set_text("NDLABEL", "1H", 1).unwrap();
        hdr.set_text("NDLABEL", "15N", 2).unwrap();
        hdr.set_title("roundtrip").unwrap();
        hdr
    }

    #[test]
    fn test_header_roundtrip() {
        let hdr = sample_header();
        let bytes = encode_header(&hdr);
        let back = decode_header(&bytes).unwrap();
        assert_eq!(encode_header(&back), bytes);
        assert_eq!(back.get_text("FDF1LABEL", 0).unwrap(), "15N");
        assert_eq!(back.get_float("FDSPECNUM", 0).unwrap(), 128.0);
        assert_eq!(back.title(), "roundtrip");
    }

    #[test]
    fn test_text_with_nul_reencodes_identically() {
        let mut hdr = sample_header();
        hdr.set_text("FDTITLE", "ab\0cd", 0).unwrap();
        assert_eq!(hdr.title(), "ab");
        let bytes = encode_header(&hdr);
        let back = decode_header(&bytes).unwrap();
        assert_eq!(encode_header(&back), bytes);
        assert_eq!(back.title(), "ab");
    }

    #[test]
    fn test_header_block_size() {
        let err = decode_header(&[0u8; 100]).unwrap_err();
        assert!(matches!(err, PipeError::Decode { .. }));
    }

    #[test]
    fn test_header_bad_order() {
        let err = decode_header(&[0u8; FDATA_BYTES]).unwrap_err();
        assert!(matches!(err, PipeError::Decode { .. }));
    }

    #[test]
    fn test_header_swapped() {
        let hdr = sample_header();
        let mut bytes = encode_header(&hdr);
        // swap every float word but leave text bytes alone
        for field in FIELDS {
            if field.kind == FieldKind::Float {
                bytes[field.slot * 4..field.slot * 4 + 4].reverse();
            }
        }
        let (back, status) = decode_header_with_order(&bytes).unwrap();
        assert_eq!(status, HdrStatus::Swapped);
        assert_eq!(back.get_float("NDSW", 1).unwrap(), 12000.0);
        assert_eq!(back.get_text("NDLABEL", 1).unwrap(), "1H");
        assert_eq!(back.dim_order(), [2, 1, 3, 4]);
    }

    #[test]
    fn test_complex_layout() {
        let a = NmrArray::complex(
            vec![2, 2],
            vec![
                Complex32::new(1.0, 10.0),
                Complex32::new(2.0, 20.0),
                Complex32::new(3.0, 30.0),
                Complex32::new(4.0, 40.0),
            ],
        )
        .unwrap();
        let bytes = encode_array(&a).unwrap();
        let mut floats = vec![0f32; 8];
        NativeEndian::read_f32_into(&bytes, &mut floats);
        assert_eq!(floats, vec![1.0, 2.0, 10.0, 20.0, 3.0, 4.0, 30.0, 40.0]);
        assert_eq!(decode_array(&bytes, &[2, 2], true).unwrap(), a);
    }

    #[test]
    fn test_array_byte_count() {
        let err = decode_array(&[0u8; 12], &[2, 2], false).unwrap_err();
        assert!(matches!(err, PipeError::Decode { .. }));
    }

    #[test]
    fn test_encode_rejects_f64() {
        let a = NmrArray::new(vec![3], Samples::Real64(vec![1.0, 2.0, 3.0])).unwrap();
        assert!(matches!(encode_array(&a), Err(PipeError::TypeMismatch(_))));
        assert!(encode_array(&a.narrow()).is_ok());
    }
}
