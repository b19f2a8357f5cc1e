//! `gng` — train a Growing Neural Gas on a CSV stream.
//!
//! ```text
//! gng -i points.csv -o graph.json --tau 100 --amax 50
//! cat points.csv | gng --snapshot-every 500 | plot_live
//! gng -t graph.json -i more_points.csv -o graph2.json --pretty
//! ```
//!
//! Signals come from `--input` (default stdin); snapshots go to `--output`
//! (default stdout). Periodic snapshots are compact JSON, one per line,
//! followed by the final one. Logs go to stderr.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing_subscriber::{EnvFilter, fmt};

use gng_rs::{CsvSignalSource, Error, GngConfig, GngEngine, Graph, Result, Snapshot};

/// Growing Neural Gas: learn the topology of a stream of vectors
#[derive(Parser)]
#[command(name = "gng")]
#[command(version)]
#[command(about = "Growing Neural Gas: learn the topology of a stream of vectors")]
struct Cli {
    /// Cycles between two node insertions [default: 100]
    #[arg(long)]
    tau: Option<u64>,

    /// Winner learning rate [default: 0.2]
    #[arg(long)]
    ethag: Option<f64>,

    /// Learning rate of the winner's neighbours [default: 0.006]
    #[arg(long)]
    ethav: Option<f64>,

    /// Maximum edge age [default: 50]
    #[arg(long)]
    amax: Option<u64>,

    /// Error decay of the two nodes split by an insertion [default: 0.5]
    #[arg(long)]
    alpha: Option<f64>,

    /// Global per-cycle error decay [default: 0.995]
    #[arg(long)]
    delta: Option<f64>,

    /// Stop after this many cycles
    #[arg(long)]
    max_iterations: Option<u64>,

    /// Write a snapshot every N cycles in addition to the final one
    #[arg(long, value_name = "N")]
    snapshot_every: Option<u64>,

    /// CSV file of signals (default: stdin)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Snapshot destination (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Resume from a saved snapshot instead of a random two-node seed
    #[arg(short, long, value_name = "SNAPSHOT")]
    topology: Option<PathBuf>,

    /// JSON file with learning parameters; command-line options win
    #[arg(long)]
    config: Option<PathBuf>,

    /// RNG seed for the initial two nodes
    #[arg(long)]
    seed: Option<u64>,

    /// Pretty-print the final snapshot
    #[arg(long)]
    pretty: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn gng_config(&self) -> Result<GngConfig> {
        let mut config = match &self.config {
            Some(path) => GngConfig::from_file(path)?,
            None => GngConfig::default(),
        };
        if let Some(v) = self.tau { config.tau = v; }
        if let Some(v) = self.ethag { config.ethag = v; }
        if let Some(v) = self.ethav { config.ethav = v; }
        if let Some(v) = self.amax { config.amax = v; }
        if let Some(v) = self.alpha { config.alpha = v; }
        if let Some(v) = self.delta { config.delta = v; }
        if self.max_iterations.is_some() { config.max_iterations = self.max_iterations; }
        if self.snapshot_every.is_some() { config.snapshot_interval = self.snapshot_every; }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "gng aborted");
            eprintln!("gng: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.gng_config()?;

    let reader: Box<dyn BufRead> = match &cli.input {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(io::stdin().lock()),
    };
    let mut source = CsvSignalSource::new(reader);

    let mut engine = match &cli.topology {
        Some(path) => {
            let snapshot = Snapshot::read_from(BufReader::new(File::open(path)?))?;
            let iteration = snapshot.iteration;
            tracing::info!(path = %path.display(), iteration, "resuming from snapshot");
            GngEngine::new(config, snapshot.restore()?)?.with_iteration(iteration)
        }
        None => {
            let dimension = source.peek()?.map(<[f64]>::len).ok_or(Error::EmptyInput)?;
            let mut rng = match cli.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            GngEngine::new(config, Graph::seeded(dimension, &mut rng)?)?
        }
    };

    let mut out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    engine.run(&mut source, |graph, t| {
        Snapshot::capture(graph, t).write_to(&mut *out, false)?;
        out.flush()?;
        Ok(())
    })?;

    Snapshot::capture(engine.graph(), engine.iteration()).write_to(&mut *out, cli.pretty)?;
    out.flush()?;
    Ok(())
}
