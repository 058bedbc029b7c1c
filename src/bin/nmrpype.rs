//! nmrpype: run NMRPipe processing functions on a file or stream.

use clap::{Args, Parser, Subcommand};
use std::error::Error;
use std::fs;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;

use nmrpipe_core::DataFrame;
use nmrpipe_fn::{
    run_all, DecoParams, FnSpec, FtParams, HtParams, Parallelism, ProcessingHistory, PsParams,
    SpParams, TpParams, TransformRunner, ZfParams, REGISTRY,
};
use nmrpipe_io::{read_from_file, read_from_stream, write_output, Output};

#[derive(Parser)]
#[command(
    name = "nmrpype",
    version,
    about = "Process NMRPipe data from a file or stream"
)]
struct Cli {
    /// Input NMRPipe file (or - for stdin)
    #[arg(short, long, alias = "input", default_value = "-")]
    r#in: String,

    /// Output NMRPipe file (or - for stdout)
    #[arg(short, long, alias = "output", default_value = "-")]
    out: String,

    /// Overwrite an existing output file
    #[arg(long, default_value_t = false)]
    ov: bool,

    /// Set a header parameter before processing (repeatable)
    #[arg(long = "mod", num_args = 2, value_names = ["PARAM", "VALUE"], allow_negative_numbers = true)]
    modify: Vec<String>,

    /// Delete imaginaries after the function
    #[arg(long, default_value_t = false)]
    di: bool,

    /// Disable parallel processing
    #[arg(long, default_value_t = false)]
    mpd: bool,

    /// Number of worker chunks
    #[arg(long)]
    proc: Option<usize>,

    /// Threads per worker for vector-level parallelism
    #[arg(long)]
    threads: Option<usize>,

    /// JSON list of functions to run before the subcommand
    #[arg(long)]
    script: Option<PathBuf>,

    /// Save the processing history (.json, .sh, or text)
    #[arg(long)]
    history: Option<PathBuf>,

    /// List available functions and exit
    #[arg(long, default_value_t = false)]
    list: bool,

    #[command(subcommand)]
    function: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Complex Fourier transform
    #[command(name = "FT")]
    Ft(FtArgs),
    /// Zero fill
    #[command(name = "ZF")]
    Zf(ZfArgs),
    /// Phase correction
    #[command(name = "PS")]
    Ps(PsArgs),
    /// 2D plane transpose
    #[command(name = "TP", alias = "YTP")]
    Tp(TpArgs),
    /// 3D matrix transpose
    #[command(name = "ZTP")]
    Ztp(TpArgs),
    /// Hilbert transform
    #[command(name = "HT")]
    Ht(HtArgs),
    /// Delete imaginaries
    #[command(name = "DI")]
    Di,
    /// Adjustable sine bell
    #[command(name = "SP", alias = "SINE")]
    Sp(SpArgs),
    /// Least-squares decomposition into basis spectra
    #[command(name = "DECO")]
    Deco(DecoArgs),
}

#[derive(Args)]
struct FtArgs {
    /// Inverse transform
    #[arg(long)]
    inv: bool,
    /// Transform real data only
    #[arg(long)]
    real: bool,
    /// Negate imaginaries
    #[arg(long)]
    neg: bool,
    /// Sign-alternate the data
    #[arg(long)]
    alt: bool,
}

impl From<FtArgs> for FtParams {
    fn from(a: FtArgs) -> Self {
        Self {
            inv: a.inv,
            real: a.real,
            neg: a.neg,
            alt: a.alt,
        }
    }
}

#[derive(Args)]
struct ZfArgs {
    /// Number of times to double the size
    #[arg(long = "zf", default_value_t = 0)]
    count: usize,
    /// Zeros to add by padding
    #[arg(long, default_value_t = 0)]
    pad: usize,
    /// Desired final size
    #[arg(long, default_value_t = 0)]
    size: usize,
    /// Round the final size to a power of 2
    #[arg(long)]
    auto: bool,
    /// Extract the original time domain
    #[arg(long)]
    inv: bool,
}

impl From<ZfArgs> for ZfParams {
    fn from(a: ZfArgs) -> Self {
        Self {
            count: a.count,
            pad: a.pad,
            size: a.size,
            auto: a.auto,
            inv: a.inv,
        }
    }
}

#[derive(Args)]
struct PsArgs {
    /// Zero-order phase, degrees
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    p0: f32,
    /// First-order phase, degrees
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    p1: f32,
    /// Inverse phase correction
    #[arg(long)]
    inv: bool,
    /// Use P0 and P1 from the header
    #[arg(long)]
    hdr: bool,
    /// Do not update the header phase
    #[arg(long)]
    noup: bool,
    /// Adjust P1 for digital oversampling
    #[arg(long)]
    df: bool,
}

impl From<PsArgs> for PsParams {
    fn from(a: PsArgs) -> Self {
        Self {
            p0: a.p0,
            p1: a.p1,
            inv: a.inv,
            hdr: a.hdr,
            noup: a.noup,
            df: a.df,
        }
    }
}

#[derive(Args)]
struct TpArgs {
    /// Hypercomplex transpose
    #[arg(long)]
    hyper: bool,
    /// Plain transpose
    #[arg(long)]
    nohyper: bool,
    /// Choose the mode from the data
    #[arg(long)]
    auto: bool,
    /// Keep the dimension order
    #[arg(long)]
    noord: bool,
    /// Exchange axis parameters as well
    #[arg(long)]
    exch: bool,
}

impl From<TpArgs> for TpParams {
    fn from(a: TpArgs) -> Self {
        Self {
            hyper: a.hyper,
            nohyper: a.nohyper,
            auto: a.auto,
            no_ord: a.noord,
            exch: a.exch,
        }
    }
}

#[derive(Args)]
struct HtArgs {
    /// Mirror-image HT for P0 -90, P1 180 data
    #[arg(long = "ps90-180")]
    ps90_180: bool,
    /// Temporary zero fill
    #[arg(long)]
    zf: bool,
    /// Set the time-domain size to half the current size
    #[arg(long)]
    td: bool,
    /// Choose the mode from the header
    #[arg(long)]
    auto: bool,
    /// Ordinary HT regardless of the header phase
    #[arg(long = "ps0-0")]
    ps0_0: bool,
    /// No zero fill
    #[arg(long)]
    nozf: bool,
}

impl From<HtArgs> for HtParams {
    fn from(a: HtArgs) -> Self {
        Self {
            ps90_180: a.ps90_180,
            zf: a.zf,
            td: a.td,
            auto: a.auto,
            ps0_0: a.ps0_0,
            nozf: a.nozf,
        }
    }
}

#[derive(Args)]
struct SpArgs {
    /// Sine start * PI (Q1)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    off: f32,
    /// Sine end * PI (Q2)
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    end: f32,
    /// Sine exponent (Q3)
    #[arg(long, default_value_t = 1.0)]
    pow: f32,
    /// Apodize length
    #[arg(long, default_value_t = 0)]
    size: usize,
    /// Apodize start
    #[arg(long, default_value_t = 1)]
    start: usize,
    /// Point 1 scale
    #[arg(short, default_value_t = 1.0)]
    c: f32,
    /// Outside = 1
    #[arg(long)]
    one: bool,
    /// Use Q, LB, GB and GOFF from the header
    #[arg(long)]
    hdr: bool,
    /// Invert the window
    #[arg(long)]
    inv: bool,
    /// Adjust for digital oversampling
    #[arg(long)]
    df: bool,
    /// Additional exponential, Hz (LB)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    elb: f32,
    /// Additional gaussian, Hz (GB)
    #[arg(long, default_value_t = 0.0)]
    glb: f32,
    /// Gauss offset, 0 to 1 (GOFF)
    #[arg(long, default_value_t = 0.0)]
    goff: f32,
}

impl From<SpArgs> for SpParams {
    fn from(a: SpArgs) -> Self {
        Self {
            off: a.off,
            end: a.end,
            pow: a.pow,
            size: a.size,
            start: a.start,
            c: a.c,
            one: a.one,
            hdr: a.hdr,
            inv: a.inv,
            df: a.df,
            elb: a.elb,
            glb: a.glb,
            goff: a.goff,
        }
    }
}

#[derive(Args)]
struct DecoArgs {
    /// Basis files
    #[arg(long = "basis", alias = "bases", num_args = 1.., required = true)]
    bases: Vec<PathBuf>,
    /// Output file for the coefficients (overwritten)
    #[arg(long)]
    file: PathBuf,
}

impl From<DecoArgs> for DecoParams {
    fn from(a: DecoArgs) -> Self {
        Self {
            bases: a.bases,
            file: a.file,
        }
    }
}

impl From<Command> for FnSpec {
    fn from(cmd: Command) -> Self {
        match cmd {
            Command::Ft(a) => FnSpec::Ft(a.into()),
            Command::Zf(a) => FnSpec::Zf(a.into()),
            Command::Ps(a) => FnSpec::Ps(a.into()),
            Command::Tp(a) => FnSpec::Tp(a.into()),
            Command::Ztp(a) => FnSpec::Ztp(a.into()),
            Command::Ht(a) => FnSpec::Ht(a.into()),
            Command::Di => FnSpec::Di,
            Command::Sp(a) => FnSpec::Sp(a.into()),
            Command::Deco(a) => FnSpec::Deco(a.into()),
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .target(env_logger::Target::Stderr)
        .init();

    if let Err(err) = run(Cli::parse()) {
        log::error!("{err}");
        let mut source = err.source();
        while let Some(cause) = source {
            log::error!("  caused by: {cause}");
            source = cause.source();
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    if cli.list {
        for f in REGISTRY {
            println!("{:<6} {}", f.code, f.summary);
        }
        return Ok(());
    }

    let mut parallelism = if cli.mpd {
        Parallelism::serial()
    } else {
        Parallelism::default()
    };
    if let Some(proc) = cli.proc {
        parallelism.workers = proc.max(1);
    }
    if let Some(threads) = cli.threads {
        parallelism.threads = threads.max(1);
    }

    let mut specs: Vec<FnSpec> = match &cli.script {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => Vec::new(),
    };
    specs.extend(cli.function.map(FnSpec::from));
    if cli.di {
        specs.push(FnSpec::Di);
    }

    let mut frame = read_input(&cli.r#in)?;
    for pair in cli.modify.chunks_exact(2) {
        log::debug!("setting {} = {}", pair[0], pair[1]);
        frame.header.set_from_str(&pair[0], &pair[1], 0)?;
    }

    let mut history = ProcessingHistory::new();
    history.set_input(&cli.r#in);
    history.set_output(&cli.out);
    let runner = TransformRunner::new(parallelism);
    run_all(&runner, &mut frame, &specs, Some(&mut history))?;

    if cli.out == "-" {
        let stdout = io::stdout();
        let mut out = BufWriter::new(stdout.lock());
        write_output(&mut frame, Output::Stream(&mut out))?;
        out.flush()?;
    } else {
        write_output(
            &mut frame,
            Output::File {
                path: PathBuf::from(&cli.out),
                overwrite: cli.ov,
            },
        )?;
    }

    if let Some(path) = &cli.history {
        history.save(path)?;
        log::info!("history written to {}", path.display());
    }
    Ok(())
}

fn read_input(input: &str) -> nmrpipe_core::Result<DataFrame> {
    if input == "-" {
        let stdin = io::stdin();
        read_from_stream(BufReader::new(stdin.lock()))
    } else {
        read_from_file(input)
    }
}
