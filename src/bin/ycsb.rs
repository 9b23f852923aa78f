//! heapwal YCSB driver
//!
//! Loads `usertable`, runs a Zipf-keyed update/select mix against the WAL
//! engine and reports throughput. With `--recover`, reopens the data
//! directory read-only afterwards and rebuilds the indices from the log.

use std::process;
use std::time::Instant;

use clap::Parser;
use heapwal::workload::{YcsbBenchmark, YcsbConfig, USERTABLE};
use heapwal::{Config, Result, Statement, WalEngine};
use tracing_subscriber::{fmt, EnvFilter};

/// heapwal YCSB benchmark
#[derive(Parser, Debug)]
#[command(name = "heapwal-ycsb")]
#[command(about = "YCSB-style load and run against the heapwal WAL engine")]
#[command(version)]
struct Args {
    /// Directory for the log and heap files
    #[arg(short, long, default_value = "./heapwal_data")]
    fs_path: String,

    /// Milliseconds between group-commit syncs
    #[arg(short, long, default_value = "5")]
    gc_interval: u64,

    /// Keys loaded into usertable
    #[arg(short = 'k', long, default_value = "10000")]
    num_keys: u64,

    /// Statements in the run phase
    #[arg(short = 'x', long, default_value = "10000")]
    num_txns: u64,

    /// Key-space partitions
    #[arg(short = 'p', long, default_value = "1")]
    num_parts: u32,

    /// Value size in bytes
    #[arg(short = 'v', long, default_value = "100")]
    sz_value: usize,

    /// Fraction of run-phase statements that are updates
    #[arg(short = 'w', long, default_value = "0.1")]
    per_writes: f64,

    /// Zipf skew in [0, 1)
    #[arg(short = 's', long, default_value = "0.5")]
    skew: f64,

    /// RNG seed
    #[arg(long, default_value = "24301")]
    seed: u64,

    /// Replay the log on a read-only engine after the run
    #[arg(short, long)]
    recover: bool,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,heapwal=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("heapwal YCSB v{}", heapwal::VERSION);
    tracing::info!("Data directory: {}", args.fs_path);

    if let Err(e) = run(&args) {
        tracing::error!("Benchmark failed: {}", e);
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let mut bench = YcsbBenchmark::new(YcsbConfig {
        num_keys: args.num_keys,
        num_txns: args.num_txns,
        num_parts: args.num_parts,
        sz_value: args.sz_value,
        per_writes: args.per_writes,
        skew: args.skew,
        seed: args.seed,
    })?;

    let config = Config::builder()
        .fs_path(&args.fs_path)
        .gc_interval_ms(args.gc_interval)
        .truncate_on_open(true)
        .build();

    let engine = WalEngine::open(config.clone(), bench.catalog().clone(), false)?;

    let load = bench.dataset();
    execute_all(&engine, "load", load)?;

    let workload = bench.workload();
    execute_all(&engine, "run", workload)?;

    tracing::info!(
        rows = engine.table_len(USERTABLE)?,
        log_syncs = engine.log_sync_count(),
        "Run finished"
    );
    engine.close()?;

    if args.recover {
        let reopened = Config {
            truncate_on_open: false,
            ..config
        };
        let engine = WalEngine::open(reopened, bench.catalog().clone(), true)?;

        let started = Instant::now();
        let stats = engine.recover()?;
        tracing::info!(
            entries = stats.log.entries_recovered,
            rows = engine.table_len(USERTABLE)?,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Recovery finished"
        );
        engine.close()?;
    }

    Ok(())
}

fn execute_all(engine: &WalEngine, phase: &str, statements: Vec<Statement>) -> Result<()> {
    let count = statements.len();
    let started = Instant::now();

    for statement in statements {
        engine.txn_begin();
        engine.execute(statement)?;
        engine.txn_end(true);
    }

    let elapsed = started.elapsed();
    let throughput = count as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
    tracing::info!(
        phase,
        statements = count,
        elapsed_ms = elapsed.as_millis() as u64,
        throughput = format!("{:.0} stmt/s", throughput),
        "Phase complete"
    );
    Ok(())
}
