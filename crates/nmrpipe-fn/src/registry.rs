//! Function codes, serializable function specs, and the closed set of
//! runnable functions.

use crate::deco::{Deco, DecoParams};
use crate::di::Di;
use crate::ft::{Ft, FtParams};
use crate::history::ProcessingHistory;
use crate::ht::{Ht, HtParams};
use crate::ps::{Ps, PsParams};
use crate::runner::{Transform, TransformRunner};
use crate::sp::{Sp, SpParams};
use crate::tp::{Tp, TpAxis, TpParams};
use crate::zf::{Zf, ZfParams};
use nmrpipe_core::{DataFrame, NmrArray, Result};
use serde::{Deserialize, Serialize};

/// A function code and its one-line description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FnCode {
    pub code: &'static str,
    pub summary: &'static str,
}

const fn c(code: &'static str, summary: &'static str) -> FnCode {
    FnCode { code, summary }
}

pub static REGISTRY: &[FnCode] = &[
    c("FT", "Complex Fourier transform"),
    c("ZF", "Zero fill"),
    c("PS", "Phase correction"),
    c("TP", "2D plane transpose (X and Y)"),
    c("YTP", "2D plane transpose (X and Y)"),
    c("ZTP", "3D matrix transpose (X and Z)"),
    c("HT", "Hilbert transform"),
    c("DI", "Delete imaginaries"),
    c("SP", "Adjustable sine bell"),
    c("SINE", "Adjustable sine bell"),
    c("DECO", "Least-squares decomposition into bases"),
];

/// Look up a function code, ignoring case.
pub fn lookup(code: &str) -> Option<&'static FnCode> {
    REGISTRY.iter().find(|f| f.code.eq_ignore_ascii_case(code))
}

/// A function and its parameters, as stored in scripts and histories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "fn")]
pub enum FnSpec {
    #[serde(rename = "FT")]
    Ft(FtParams),
    #[serde(rename = "ZF")]
    Zf(ZfParams),
    #[serde(rename = "PS")]
    Ps(PsParams),
    #[serde(rename = "TP", alias = "YTP")]
    Tp(TpParams),
    #[serde(rename = "ZTP")]
    Ztp(TpParams),
    #[serde(rename = "HT")]
    Ht(HtParams),
    #[serde(rename = "DI")]
    Di,
    #[serde(rename = "SP", alias = "SINE")]
    Sp(SpParams),
    #[serde(rename = "DECO")]
    Deco(DecoParams),
}

impl FnSpec {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Ft(_) => "FT",
            Self::Zf(_) => "ZF",
            Self::Ps(_) => "PS",
            Self::Tp(_) => "TP",
            Self::Ztp(_) => "ZTP",
            Self::Ht(_) => "HT",
            Self::Di => "DI",
            Self::Sp(_) => "SP",
            Self::Deco(_) => "DECO",
        }
    }

    /// Equivalent NMRPipe command line.
    pub fn command(&self) -> String {
        match self {
            Self::Ft(p) => p.command(),
            Self::Zf(p) => p.command(),
            Self::Ps(p) => p.command(),
            Self::Tp(p) => p.command(TpAxis::Y),
            Self::Ztp(p) => p.command(TpAxis::Z),
            Self::Ht(p) => p.command(),
            Self::Di => Di::new().command(),
            Self::Sp(p) => p.command(),
            Self::Deco(p) => p.command(),
        }
    }

    pub fn build(&self) -> Function {
        match self {
            Self::Ft(p) => Function::Ft(Ft::new(p.clone())),
            Self::Zf(p) => Function::Zf(Zf::new(p.clone())),
            Self::Ps(p) => Function::Ps(Ps::new(p.clone())),
            Self::Tp(p) => Function::Tp(Tp::new(p.clone(), TpAxis::Y)),
            Self::Ztp(p) => Function::Tp(Tp::new(p.clone(), TpAxis::Z)),
            Self::Ht(p) => Function::Ht(Ht::new(p.clone())),
            Self::Di => Function::Di(Di::new()),
            Self::Sp(p) => Function::Sp(Sp::new(p.clone())),
            Self::Deco(p) => Function::Deco(Deco::new(p.clone())),
        }
    }
}

/// Every runnable function.
#[derive(Debug, Clone)]
pub enum Function {
    Ft(Ft),
    Zf(Zf),
    Ps(Ps),
    Tp(Tp),
    Ht(Ht),
    Di(Di),
    Sp(Sp),
    Deco(Deco),
}

impl Function {
    fn inner(&self) -> &dyn Transform {
        match self {
            Self::Ft(f) => f,
            Self::Zf(f) => f,
            Self::Ps(f) => f,
            Self::Tp(f) => f,
            Self::Ht(f) => f,
            Self::Di(f) => f,
            Self::Sp(f) => f,
            Self::Deco(f) => f,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Transform {
        match self {
            Self::Ft(f) => f,
            Self::Zf(f) => f,
            Self::Ps(f) => f,
            Self::Tp(f) => f,
            Self::Ht(f) => f,
            Self::Di(f) => f,
            Self::Sp(f) => f,
            Self::Deco(f) => f,
        }
    }
}

impl Transform for Function {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn initialize(&mut self, frame: &mut DataFrame) -> Result<()> {
        self.inner_mut().initialize(frame)
    }

    fn process(&self, array: NmrArray, vector_parallel: bool) -> Result<NmrArray> {
        self.inner().process(array, vector_parallel)
    }

    fn chunkable(&self, array: &NmrArray) -> bool {
        self.inner().chunkable(array)
    }

    fn update_header(&self, frame: &mut DataFrame) -> Result<()> {
        self.inner().update_header(frame)
    }
}

/// Run each spec in order, recording successful steps in `history`.
pub fn run_all(
    runner: &TransformRunner,
    frame: &mut DataFrame,
    specs: &[FnSpec],
    mut history: Option<&mut ProcessingHistory>,
) -> Result<()> {
    for spec in specs {
        let mut function = spec.build();
        runner.run(&mut function, frame)?;
        if let Some(history) = history.as_deref_mut() {
            history.record(spec, frame.array.shape());
        }
    }
    Ok(())
}
