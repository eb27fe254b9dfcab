use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufReader, IsTerminal};
use std::path::PathBuf;

use memdb::config::DEFAULT_MAX_MEMORY;
use memdb::{Store, StoreConfig};
use memdb_cli::command::execute_line;
use memdb_cli::models::{LoadConfig, WorkloadConfig};
use memdb_cli::runner::LoadRunner;
use memdb_cli::session::run_session;
use memdb_cli::stats::LoadReport;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// In-memory key/value and sorted-set store
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Approximate memory budget in bytes
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_MEMORY)]
    max_memory: u64,

    /// Lock stripes per top-level map (default: based on CPU count)
    #[arg(long, global = true)]
    segments: Option<usize>,

    /// Log filter, e.g. "debug" or "memdb=trace" (default: RUST_LOG, then "warn")
    #[arg(long, global = true, value_name = "FILTER")]
    log_level: Option<String>,
}

/// Subcommands for the CLI
#[derive(Subcommand, Debug)]
enum Commands {
    /// Read commands line by line from stdin or a script file
    Repl {
        /// Read commands from this file instead of stdin
        #[arg(long, value_name = "PATH")]
        script: Option<PathBuf>,
    },

    /// Run each argument as one command
    Exec {
        /// Commands, e.g. "SET a 1" "GET a"
        #[arg(required = true, num_args = 1..)]
        commands: Vec<String>,
    },

    /// Drive a store from several threads with a random operation mix
    Load {
        /// Number of worker threads
        #[arg(long, default_value = "4")]
        threads: usize,

        /// Operations per worker thread
        #[arg(long, default_value = "100000")]
        ops: u64,

        /// Number of distinct scalar keys
        #[arg(long, default_value = "10000")]
        keys: u32,

        /// Number of distinct sorted collections
        #[arg(long, default_value = "16")]
        collections: u32,

        /// Length of SET values in bytes
        #[arg(long, default_value = "32")]
        value_size: usize,

        /// Percentage of SETs with a TTL (1-5 seconds)
        #[arg(long, default_value = "10")]
        ttl_percent: u8,

        /// Base random seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Export per-operation results to CSV file
        #[arg(long, value_name = "PATH")]
        output_csv: Option<PathBuf>,
    },
}

fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn store_config(max_memory: u64, segments: Option<usize>) -> StoreConfig {
    let config = StoreConfig::new().with_max_memory(max_memory);
    match segments {
        Some(segments) => config.with_segments(segments.max(1)),
        None => config,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args = Args::parse();
    init_tracing(args.log_level.as_deref());

    match args.command {
        Some(Commands::Exec { commands }) => {
            let store = Store::init(store_config(args.max_memory, args.segments));
            for line in &commands {
                println!("{}", execute_line(&store, line).text);
            }
            Ok(())
        }

        Some(Commands::Load {
            threads,
            ops,
            keys,
            collections,
            value_size,
            ttl_percent,
            seed,
            output_csv,
        }) => {
            let config = LoadConfig {
                threads,
                ops_per_thread: ops,
                seed,
                max_memory: args.max_memory,
                segments: args.segments,
                workload: WorkloadConfig {
                    keys,
                    collections,
                    value_size,
                    ttl_percent: ttl_percent.min(100),
                    ..WorkloadConfig::default()
                },
            };

            println!("memdb Load Run");
            println!("==============");
            println!("Threads: {threads}");
            println!("Operations per thread: {ops}");
            println!("Keys: {keys}, collections: {collections}, value size: {value_size}");
            println!(
                "Memory budget: {} bytes ({:.2} MB)",
                args.max_memory,
                args.max_memory as f64 / 1_048_576.0
            );

            let result = LoadRunner::new(config).run();
            let report = LoadReport::new(&result);
            report.print_summary();

            // Export to CSV if requested
            if let Some(csv_path) = output_csv {
                report.export_csv(&csv_path)?;
                println!("\nResults exported to: {}", csv_path.display());
            }
            Ok(())
        }

        Some(Commands::Repl { script }) => repl(args.max_memory, args.segments, script),
        None => repl(args.max_memory, args.segments, None),
    }
}

fn repl(
    max_memory: u64,
    segments: Option<usize>,
    script: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::init(store_config(max_memory, segments));
    let stdout = io::stdout().lock();

    let executed = match script {
        Some(path) => run_session(&store, BufReader::new(File::open(&path)?), stdout, None)?,
        None => {
            let stdin = io::stdin();
            let prompt = stdin.is_terminal().then_some("memdb> ");
            run_session(&store, stdin.lock(), stdout, prompt)?
        }
    };

    tracing::debug!(executed, "session finished");
    Ok(())
}
