//! NMRPipe core types: header layout and field addressing, the binary
//! codec, in-memory arrays and the frame passed between processing stages.

pub mod array;
pub mod codec;
pub mod enums;
pub mod error;
pub mod fdata;
pub mod frame;
pub mod header;

pub use array::{NmrArray, Samples};
pub use codec::*;
pub use enums::*;
pub use error::{PipeError, Result, Stage};
pub use fdata::*;
pub use frame::DataFrame;
pub use header::{HeaderStore, HeaderValue};
