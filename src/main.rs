mod io;

use std::fmt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chunkwise::{Chunk, Interrupt, ParallelOps, PoolConfig, Reduction, WorkerPool};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::io::{create_progress_bar, NumberReader};

#[derive(Parser, Debug)]
#[command(name = "chunkwise")]
#[command(about = "Run parallel list operations over a sequence of integers", long_about = None)]
struct Args {
    #[command(subcommand)]
    op: Op,

    /// File of whitespace-separated integers
    #[arg(short, long, value_name = "FILE", global = true, conflicts_with = "range")]
    input: Option<PathBuf>,

    /// Use the values 0..N instead of an input file
    #[arg(long, value_name = "N", global = true)]
    range: Option<i64>,

    /// Number of worker threads (defaults to number of CPU cores)
    #[arg(short = 'j', long, global = true)]
    threads: Option<usize>,

    /// Run every round on one long-lived pool instead of a pool per call
    #[arg(long, global = true)]
    shared_pool: bool,

    /// Number of times to repeat the operation
    #[arg(long, default_value_t = 1, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    rounds: u64,

    /// Cross-check the result against a rayon computation
    #[arg(long, global = true)]
    verify: bool,

    /// Disable progress bar
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Op {
    /// Largest value
    Max,
    /// Smallest value
    Min,
    /// Number of even values
    CountEven,
    /// Whether any value is greater than VALUE
    AnyAbove {
        #[arg(allow_negative_numbers = true)]
        value: i64,
    },
    /// Whether every value is greater than VALUE
    AllAbove {
        #[arg(allow_negative_numbers = true)]
        value: i64,
    },
    /// Even values, in order
    FilterEven,
    /// Every value squared, in order
    Square,
    /// Decimal forms of all values, concatenated
    Join,
    /// Sum of all values, failing on overflow
    Sum,
}

#[derive(Debug, PartialEq)]
enum Outcome {
    Value(i64),
    Count(usize),
    Flag(bool),
    List(Vec<i64>),
    Text(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Value(v) => write!(f, "{}", v),
            Outcome::Count(n) => write!(f, "{}", n),
            Outcome::Flag(b) => write!(f, "{}", b),
            Outcome::Text(s) => write!(f, "{:?}", s),
            Outcome::List(values) => {
                write!(f, "[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Overflow-checked sum, exercising a merge that can fail
struct CheckedSum;

impl Reduction<i64> for CheckedSum {
    type Partial = i64;
    type Output = i64;

    fn compute(&self, chunk: &Chunk<i64>) -> Result<i64> {
        chunk.iter().try_fold(0i64, |acc, v| {
            acc.checked_add(*v)
                .with_context(|| format!("Sum overflows in chunk at offset {}", chunk.offset()))
        })
    }

    fn merge(&self, partials: Vec<i64>) -> Result<i64> {
        partials.into_iter().try_fold(0i64, |acc, v| {
            acc.checked_add(v).context("Sum of chunk totals overflows")
        })
    }

    fn default_result(&self) -> chunkwise::Result<i64> {
        Ok(0)
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);

    let values: Arc<[i64]> = load_values(&args)?.into();
    let config = PoolConfig::new(args.threads).thread_name("chunkwise-cli");
    let threads = config.resolved_threads();

    println!("Running {:?} over {} values", args.op, values.len());

    let interrupt = Interrupt::new();
    let handler_interrupt = interrupt.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, abandoning operation...");
        handler_interrupt.trigger();
    })
    .context("Failed to set signal handler")?;

    let shared_pool = if args.shared_pool {
        Some(Arc::new(
            WorkerPool::with_config(&config).context("Failed to start worker pool")?,
        ))
    } else {
        None
    };
    let ops = match &shared_pool {
        Some(pool) => ParallelOps::with_pool(Arc::clone(pool)),
        None => ParallelOps::new(),
    }
    .interruptible(interrupt);

    println!("Using {} worker threads", threads);

    let progress = if !args.quiet {
        let unit = format!("{} rounds", op_label(args.op));
        Some(create_progress_bar(args.rounds, &unit)?)
    } else {
        None
    };

    let start_time = Instant::now();
    let mut outcome = None;
    for round in 0..args.rounds {
        let result = execute(&ops, threads, args.op, Arc::clone(&values))
            .with_context(|| format!("Round {} failed", round + 1))?;
        outcome = Some(result);

        if let Some(ref pb) = progress {
            pb.inc(1);
        }
    }

    if let Some(ref pb) = progress {
        pb.finish_with_message("Done");
    }

    let elapsed = start_time.elapsed();
    let outcome = outcome.context("No rounds were run")?;
    info!(rounds = args.rounds, ?elapsed, "Finished");

    if args.verify {
        let expected = execute_rayon(args.op, &values)?;
        if expected != outcome {
            anyhow::bail!("Result mismatch: pool gave {}, rayon gave {}", outcome, expected);
        }
        println!("Verified against rayon");
    }

    println!("Completed {} round(s) in {:.2?}", args.rounds, elapsed);
    println!("Result: {}", outcome);

    if let Some(pool) = shared_pool {
        pool.close();
    }

    Ok(())
}

fn op_label(op: Op) -> &'static str {
    match op {
        Op::Max => "max",
        Op::Min => "min",
        Op::CountEven => "count-even",
        Op::AnyAbove { .. } => "any-above",
        Op::AllAbove { .. } => "all-above",
        Op::FilterEven => "filter-even",
        Op::Square => "square",
        Op::Join => "join",
        Op::Sum => "sum",
    }
}

fn load_values(args: &Args) -> Result<Vec<i64>> {
    match (&args.input, args.range) {
        (Some(path), _) => {
            if !path.exists() {
                anyhow::bail!("Input file does not exist: {}", path.display());
            }
            let reader = NumberReader::new(path)?;
            info!(bytes = reader.byte_len(), "Mapped input file");
            reader.read_values()
        }
        (None, Some(n)) => Ok((0..n.max(0)).collect()),
        (None, None) => anyhow::bail!("Either --input or --range is required"),
    }
}

fn execute(ops: &ParallelOps, threads: usize, op: Op, values: Arc<[i64]>) -> Result<Outcome> {
    let outcome = match op {
        Op::Max => Outcome::Value(ops.maximum(threads, values, i64::cmp)?),
        Op::Min => Outcome::Value(ops.minimum(threads, values, i64::cmp)?),
        Op::CountEven => Outcome::Count(ops.count(threads, values, |v: &i64| v % 2 == 0)?),
        Op::AnyAbove { value } => Outcome::Flag(ops.any(threads, values, move |v: &i64| *v > value)?),
        Op::AllAbove { value } => Outcome::Flag(ops.all(threads, values, move |v: &i64| *v > value)?),
        Op::FilterEven => Outcome::List(ops.filter(threads, values, |v: &i64| v % 2 == 0)?),
        Op::Square => Outcome::List(ops.map(threads, values, |v: &i64| v.wrapping_mul(*v))?),
        Op::Join => Outcome::Text(ops.join(threads, values)?),
        Op::Sum => Outcome::Value(ops.reduce(threads, values, CheckedSum)?),
    };
    Ok(outcome)
}

fn execute_rayon(op: Op, values: &[i64]) -> Result<Outcome> {
    let outcome = match op {
        Op::Max => Outcome::Value(values.par_iter().copied().max().context("No such element")?),
        Op::Min => Outcome::Value(values.par_iter().copied().min().context("No such element")?),
        Op::CountEven => Outcome::Count(values.par_iter().filter(|v| *v % 2 == 0).count()),
        Op::AnyAbove { value } => Outcome::Flag(values.par_iter().any(|v| *v > value)),
        Op::AllAbove { value } => Outcome::Flag(values.par_iter().all(|v| *v > value)),
        Op::FilterEven => {
            Outcome::List(values.par_iter().copied().filter(|v| v % 2 == 0).collect())
        }
        Op::Square => Outcome::List(values.par_iter().map(|v| v.wrapping_mul(*v)).collect()),
        Op::Join => Outcome::Text(values.par_iter().map(|v| v.to_string()).collect()),
        Op::Sum => Outcome::Value(
            values
                .par_iter()
                .try_fold(|| 0i64, |acc, v| acc.checked_add(*v))
                .try_reduce(|| 0i64, |a, b| a.checked_add(b))
                .context("Sum overflows")?,
        ),
    };
    Ok(outcome)
}

fn setup_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("chunkwise=warn"),
        1 => EnvFilter::new("chunkwise=info,warn"),
        _ => EnvFilter::new("chunkwise=debug,warn"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
