//! NMRPipe data writer: header + sample planes to files or streams.

use nmrpipe_core::codec::{encode_array, encode_header};
use nmrpipe_core::error::{PipeError, Result};
use nmrpipe_core::{DataFrame, HeaderStore, NmrArray};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes NMRPipe data as a stream: the header once, then sample planes.
pub struct PipeWriter<W: Write> {
    writer: W,
    header_written: bool,
}

impl<W: Write> PipeWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            header_written: false,
        }
    }

    /// Write the header (must be called first).
    pub fn write_header(&mut self, header: &HeaderStore) -> Result<()> {
        self.writer.write_all(&encode_header(header))?;
        self.header_written = true;
        Ok(())
    }

    /// Write one block of samples in the format's on-wire layout.
    pub fn write_plane(&mut self, plane: &NmrArray) -> Result<()> {
        debug_assert!(self.header_written, "write_plane before write_header");
        self.writer.write_all(&encode_array(plane)?)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Consume and return the inner writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Write a frame to a byte stream.
///
/// 1-D and 2-D data go out in one write; 3-D data one write per Z plane;
/// 4-D data one write per (A, Z) plane. With `FDSCALEFLAG` set, 4-D output
/// records each plane's extrema in the in-memory header before the plane is
/// written; the header block itself has already been emitted by then.
pub fn write_to_stream<W: Write>(frame: &mut DataFrame, writer: W) -> Result<()> {
    let mut out = PipeWriter::new(writer);
    out.write_header(&frame.header)?;

    let ndim = frame.array.ndim();
    if ndim <= 2 {
        out.write_plane(&frame.array)?;
    } else {
        let planes = frame.array.block_count(2);
        let scale = ndim == 4 && frame.header.get_float("FDSCALEFLAG", 0)? == 1.0;
        for index in 0..planes {
            let plane = frame.array.block(index, 2)?;
            if scale {
                record_extrema(&mut frame.header, &plane)?;
            }
            out.write_plane(&plane)?;
        }
        log::debug!("streamed {planes} planes");
    }
    out.flush()
}

fn record_extrema(header: &mut HeaderStore, plane: &NmrArray) -> Result<()> {
    if let Some((lo, hi)) = plane.real_min_max() {
        header.set("FDMAX", hi, 0)?;
        header.set("FDDISPMAX", hi, 0)?;
        header.set("FDMIN", lo, 0)?;
        header.set("FDDISPMIN", lo, 0)?;
    }
    Ok(())
}

/// Write a frame to a file in one pass. An existing file is left untouched
/// unless `overwrite` is set.
pub fn write_to_file(frame: &DataFrame, path: impl AsRef<Path>, overwrite: bool) -> Result<()> {
    let path = path.as_ref();
    let file = open_output(path, overwrite)?;
    let mut out = PipeWriter::new(BufWriter::new(file));
    out.write_header(&frame.header)?;
    out.write_plane(&frame.array)?;
    out.flush()?;
    log::debug!("wrote {}", path.display());
    Ok(())
}

fn open_output(path: &Path, overwrite: bool) -> Result<File> {
    if overwrite {
        return Ok(File::create(path)?);
    }
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => PipeError::FileExists {
                path: path.to_path_buf(),
            },
            _ => PipeError::Io(e),
        })
}

/// Final destination of a pipeline.
pub enum Output<'a> {
    File { path: PathBuf, overwrite: bool },
    Stream(&'a mut dyn Write),
}

/// Write a frame to its destination, keeping `FDPIPECOUNT` as the number of
/// consecutive stream hand-offs: incremented for a stream, reset for a file.
pub fn write_output(frame: &mut DataFrame, output: Output<'_>) -> Result<()> {
    match output {
        Output::File { path, overwrite } => {
            frame.header.reset_pipe_count();
            write_to_file(frame, path, overwrite)
        }
        Output::Stream(writer) => {
            frame.header.increment_pipe_count();
            write_to_stream(frame, writer)
        }
    }
}
