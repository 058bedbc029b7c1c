//! NMRPipe data reader: header + sample planes from files or streams.

use nmrpipe_core::codec::{array_byte_len, decode_array, decode_header_with_order};
use nmrpipe_core::enums::HdrStatus;
use nmrpipe_core::error::{PipeError, Result};
use nmrpipe_core::fdata::FDATA_BYTES;
use nmrpipe_core::{DataFrame, HeaderStore};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Read and decode the 2048-byte header block.
pub fn read_header<R: Read>(reader: &mut R) -> Result<(HeaderStore, HdrStatus)> {
    let mut buf = vec![0u8; FDATA_BYTES];
    read_exact_or_decode(reader, &mut buf, "header block")?;
    decode_header_with_order(&buf)
}

/// Array shape described by a header, and whether the X-axis is complex.
///
/// Sizes come from `(FDF4SIZE, FDF3SIZE, FDSPECNUM, FDSIZE)` limited to
/// `FDDIMCOUNT` axes; leading axes of length 1 are dropped.
pub fn data_shape(header: &HeaderStore) -> Result<(Vec<usize>, bool)> {
    let dims = header.dim_count();
    if !(1..=4).contains(&dims) {
        return Err(PipeError::decode(format!("invalid FDDIMCOUNT {dims}")));
    }
    let mut shape = Vec::with_capacity(dims);
    for name in ["FDF4SIZE", "FDF3SIZE", "FDSPECNUM", "FDSIZE"]
        .iter()
        .skip(4 - dims)
    {
        let v = header.get_float(name, 0)?;
        if v.is_nan() || v < 1.0 || v.fract() != 0.0 {
            return Err(PipeError::decode(format!("invalid {name} {v}")));
        }
        shape.push(v as usize);
    }
    while shape.len() > 1 && shape[0] == 1 {
        shape.remove(0);
    }
    Ok((shape, header.is_complex(1)?))
}

/// Read one dataset from a byte stream, consuming exactly its bytes.
pub fn read_from_stream<R: Read>(mut reader: R) -> Result<DataFrame> {
    let (header, status) = read_header(&mut reader)?;
    let (shape, is_complex) = data_shape(&header)?;
    log::debug!(
        "reading {:?} {} samples ({:?} byte order)",
        shape,
        if is_complex { "complex" } else { "real" },
        status
    );

    let mut buf = vec![0u8; array_byte_len(&shape, is_complex)];
    read_exact_or_decode(&mut reader, &mut buf, "sample data")?;
    if status == HdrStatus::Swapped {
        swap_words(&mut buf);
    }
    let array = decode_array(&buf, &shape, is_complex)?;
    Ok(DataFrame::new(header, array))
}

/// Read one dataset from a file.
pub fn read_from_file(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    let file = File::open(path)?;
    log::debug!("opened {}", path.display());
    read_from_stream(BufReader::new(file))
}

fn read_exact_or_decode<R: Read>(reader: &mut R, buf: &mut [u8], what: &str) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => {
            PipeError::decode_io(format!("truncated {what}: expected {} bytes", buf.len()), e)
        }
        _ => PipeError::Io(e),
    })
}

/// Reverse the bytes of every 4-byte word.
fn swap_words(buf: &mut [u8]) {
    for word in buf.chunks_exact_mut(4) {
        word.reverse();
    }
}
