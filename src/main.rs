#[macro_use]
extern crate log;

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use collatz_bench::config::{max_cpu_parallelism, BenchConfig};
use collatz_bench::montecarlo;
use collatz_bench::{BenchmarkHarness, Strategy};

#[derive(Parser)]
#[clap(name = "collatz-bench", version, about)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Time the work-distribution strategies over the items 1..=N.
    Bench(BenchArgs),
    /// Estimate pi with a Monte Carlo method over several thread counts.
    Pi(PiArgs),
    /// Serve the average step count over TCP.
    #[cfg(feature = "tokio")]
    Serve {
        #[clap(short, long, default_value = collatz_bench::service::DEFAULT_ADDRESS)]
        bind: String,
    },
    /// Ask a running service for the average step count of 1..=COUNT.
    #[cfg(feature = "tokio")]
    Query {
        #[clap(long, env = "COLLATZ_COUNT")]
        count: String,
        #[clap(long, env = "SERVER_HOST")]
        host: String,
        #[clap(long, env = "SERVER_PORT")]
        port: u16,
    },
}

#[derive(Args)]
struct BenchArgs {
    /// TOML file with the benchmark configuration, overridden by the other flags.
    #[clap(short, long)]
    config: Option<PathBuf>,
    /// Number of items.
    #[clap(short = 'n', long)]
    items: Option<u64>,
    /// Number of worker threads, defaults to the available parallelism.
    #[clap(short, long)]
    workers: Option<usize>,
    /// Capacity of the pipeline queues.
    #[clap(long)]
    queue_capacity: Option<usize>,
    /// Transitions after which an item is considered divergent.
    #[clap(long)]
    max_steps: Option<u64>,
    /// Strategies to run, in order.
    #[clap(short, long, value_enum, value_delimiter = ',')]
    strategies: Vec<Strategy>,
    /// Print the comparison as JSON.
    #[clap(long)]
    json: bool,
}

#[derive(Args)]
struct PiArgs {
    #[clap(short, long, default_value_t = 1_000_000)]
    points: u64,
    #[clap(short, long, value_delimiter = ',', default_values_t = [1, 2, 4, 8, 16, 32, 64, 256, 1024])]
    threads: Vec<usize>,
    #[clap(long, default_value_t = 42)]
    seed: u64,
    /// Where to write the report table.
    #[clap(short, long, default_value = "monte_carlo_pi_report.txt")]
    report: PathBuf,
}

impl BenchArgs {
    fn into_config(self) -> Result<BenchConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => BenchConfig::from_file(path)?,
            None => BenchConfig::default(),
        };
        if let Some(items) = self.items {
            config.items = items;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(queue_capacity) = self.queue_capacity {
            config.queue_capacity = queue_capacity;
        }
        if let Some(max_steps) = self.max_steps {
            config.max_steps = max_steps;
        }
        if !self.strategies.is_empty() {
            config.strategies = self.strategies;
        }
        config.validate()?;
        Ok(config)
    }
}

fn bench(args: BenchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let json = args.json;
    let config = args.into_config()?;
    info!(
        "computing Collatz step counts of {} items on {} threads ({} available)",
        config.items,
        config.workers,
        max_cpu_parallelism()
    );

    let comparison = BenchmarkHarness::from_config(&config).run();
    if json {
        println!("{}", serde_json::to_string_pretty(&comparison)?);
    } else {
        println!("{comparison}");
    }
    comparison.verify()?;
    if !comparison.failures.is_empty() {
        return Err(format!("{} strategies failed", comparison.failures.len()).into());
    }
    Ok(())
}

fn pi(args: PiArgs) -> Result<(), Box<dyn std::error::Error>> {
    let rows = montecarlo::sweep(args.points, &args.threads, args.seed)?;
    montecarlo::write_report(&mut std::io::stdout().lock(), args.points, &rows)?;

    let mut file = BufWriter::new(File::create(&args.report)?);
    montecarlo::write_report(&mut file, args.points, &rows)?;
    println!("\nReport saved to {}", args.report.display());
    Ok(())
}

#[cfg(feature = "tokio")]
fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread().enable_all().build()
}

#[cfg(feature = "tokio")]
fn serve(bind: &str) -> Result<(), Box<dyn std::error::Error>> {
    runtime()?.block_on(collatz_bench::service::run(bind))?;
    Ok(())
}

#[cfg(feature = "tokio")]
fn query(count: &str, host: &str, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let average = runtime()?.block_on(collatz_bench::service::client::query((host, port), count))?;
    println!("Average steps: {average:.2}");
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let result = match Cli::parse().command {
        Command::Bench(args) => bench(args),
        Command::Pi(args) => pi(args),
        #[cfg(feature = "tokio")]
        Command::Serve { bind } => serve(&bind),
        #[cfg(feature = "tokio")]
        Command::Query { count, host, port } => query(&count, &host, port),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
