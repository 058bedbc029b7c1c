//! NMRPipe I/O: reading and writing datasets as whole files or as
//! plane-by-plane byte streams.

pub mod reader;
pub mod writer;

pub use reader::*;
pub use writer::*;
