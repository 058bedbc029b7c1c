//! NMRPipe processing functions and the machinery that runs them.
//!
//! Each function implements [`Transform`] and is driven through
//! initialize, compute and header update by a [`TransformRunner`]. Compute
//! is split into leading-axis chunks on a rayon pool.

pub mod deco;
pub mod di;
pub mod ft;
pub mod history;
pub mod ht;
pub mod ps;
pub mod registry;
pub mod runner;
pub mod sp;
pub mod tp;
pub mod zf;

pub use deco::{Deco, DecoParams};
pub use di::Di;
pub use ft::{Ft, FtParams};
pub use history::{HistoryEntry, ProcessingHistory};
pub use ht::{Ht, HtParams};
pub use ps::{Ps, PsParams};
pub use registry::{lookup, run_all, FnCode, FnSpec, Function, REGISTRY};
pub use runner::{dispatch, Parallelism, Transform, TransformRunner};
pub use sp::{Sp, SpParams};
pub use tp::{Tp, TpAxis, TpParams};
pub use zf::{Zf, ZfParams};
