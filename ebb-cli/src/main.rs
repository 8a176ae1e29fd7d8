//! CLI for the ebb retention store.
//!
//! Provides commands for inspecting, querying, compacting, and benchmarking
//! the store under an agent's data directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Instant, SystemTime};

use clap::{Parser, Subcommand, ValueEnum};
use ebb::clock::unix_millis;
use ebb::component::STORE_DIR;
use ebb::config::{format_duration, parse_duration};
use ebb::{
    Component, ComponentOptions, Durability, Labels, LogStore, LogStoreOptions, PersistentStore,
    RetentionConfig, Selector,
};
use tracing_subscriber::EnvFilter;

/// ebb: write-behind, short-retention time-series store CLI.
#[derive(Parser)]
#[command(name = "ebb", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Display series, entry counts, and disk usage of a store.
    Info {
        /// Component data directory (the store lives in `<data_path>/metrics`).
        data_path: PathBuf,
    },

    /// Query samples of one metric.
    Query {
        /// Component data directory.
        data_path: PathBuf,

        /// Metric name (`__name__` label) to query.
        metric: String,

        /// How far back to look (e.g., "90s", "30m", "1h").
        #[arg(long, default_value = "1h")]
        range: String,

        /// Output format.
        #[arg(long, default_value = "csv")]
        format: OutputFormat,
    },

    /// Run one maintenance pass: flush, evict expired entries, compact.
    Compact {
        /// Component data directory.
        data_path: PathBuf,
    },

    /// Run a concurrent commit benchmark in a temporary directory.
    Bench {
        /// Number of concurrent appender threads.
        #[arg(long, default_value = "4")]
        appenders: usize,

        /// Samples committed by each thread.
        #[arg(long, default_value = "100000")]
        samples: u64,

        /// Samples per commit.
        #[arg(long, default_value = "100")]
        batch: u64,

        /// Retention window.
        #[arg(long, default_value = "1h")]
        ttl: String,

        /// Fsync every commit instead of buffering.
        #[arg(long)]
        fsync: bool,
    },
}

/// Output format for query results.
#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Comma-separated values.
    Csv,
    /// JSON object with a sample array.
    Json,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Info { data_path } => cmd_info(&data_path),
        Commands::Query {
            data_path,
            metric,
            range,
            format,
        } => cmd_query(&data_path, &metric, &range, &format),
        Commands::Compact { data_path } => cmd_compact(&data_path),
        Commands::Bench {
            appenders,
            samples,
            batch,
            ttl,
            fsync,
        } => cmd_bench(appenders, samples, batch, &ttl, fsync),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Opens the store under `data_path` without starting a component.
fn open_store(data_path: &Path) -> Result<LogStore, Box<dyn std::error::Error>> {
    let dir = data_path.join(STORE_DIR);
    if !dir.is_dir() {
        return Err(format!("No store found at '{}'", dir.display()).into());
    }
    tracing::debug!(path = %dir.display(), "opening store");
    Ok(LogStore::open(&dir, LogStoreOptions::default())?)
}

/// Implements `ebb info <data_path>`.
fn cmd_info(data_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(data_path)?;
    let stats = store.stats();

    println!("Store: {}", store.path().display());
    println!();
    println!("Live entries: {}", stats.live_entries);
    println!("Log frames: {} ({} reclaimable)", stats.frames, stats.frames - stats.live_entries);
    println!("Log size: {} ({} bytes)", format_bytes(stats.log_bytes), stats.log_bytes);
    println!("Next sequence: {}", stats.next_sequence);

    let total_size = dir_size(store.path())?;
    println!("Total disk usage: {} ({total_size} bytes)", format_bytes(total_size));

    let series = store.series();
    if !series.is_empty() {
        println!();
        println!("Live series: {}", series.len());
        for labels in &series {
            println!("  - {labels} ({})", labels.fingerprint());
        }
    }

    store.close()?;
    Ok(())
}

/// Implements `ebb query <data_path> <metric>`.
fn cmd_query(
    data_path: &Path,
    metric: &str,
    range: &str,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(data_path)?;

    let range = parse_duration(range)?;
    let end_ms = unix_millis(SystemTime::now());
    let start_ms = end_ms.saturating_sub(i64::try_from(range.as_millis())?);

    let samples = store.select(&Selector::metric(metric), start_ms, end_ms)?;

    match format {
        OutputFormat::Csv => {
            println!("# metric={metric}, points={}", samples.len());
            println!("series,timestamp_ms,value,sequence");
            for s in &samples {
                let series = s.labels.to_string().replace('"', "\"\"");
                println!("\"{series}\",{},{},{}", s.timestamp_ms, s.value, s.sequence);
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "metric": metric,
                "start_ms": start_ms,
                "end_ms": end_ms,
                "count": samples.len(),
                "data": samples,
            });

            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    store.close()?;
    Ok(())
}

/// Implements `ebb compact <data_path>`.
fn cmd_compact(data_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(data_path)?;
    let before = store.stats();
    let report = store.maintain()?;
    let after = store.stats();
    store.close()?;

    println!("Expired entries reclaimed: {}", report.expired);
    println!("Live entries: {}", report.live);
    if report.compacted {
        println!(
            "Log compacted: {} -> {}",
            format_bytes(before.log_bytes),
            format_bytes(after.log_bytes)
        );
    } else {
        println!("Log not compacted ({} frames, {} live)", after.frames, after.live_entries);
    }

    Ok(())
}

/// Implements `ebb bench`.
#[allow(clippy::cast_precision_loss)] // Benchmark stats are fine with f64 precision
fn cmd_bench(
    appenders: usize,
    samples: u64,
    batch: u64,
    ttl: &str,
    fsync: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let ttl = parse_duration(ttl)?;
    let durability = if fsync {
        Durability::Fsync
    } else {
        Durability::Buffered
    };
    let batch = batch.max(1);

    println!("ebb commit benchmark");
    println!("  Appenders: {appenders}");
    println!("  Samples per appender: {samples}");
    println!("  Batch size: {batch}");
    println!("  TTL: {}", format_duration(ttl));
    println!("  Durability: {durability:?}");
    println!();

    let temp_dir = tempfile::tempdir()?;
    let options = ComponentOptions::new(temp_dir.path()).with_durability(durability);
    let component = Component::open_with(options, RetentionConfig::new(ttl)?)?;
    let failures = Arc::new(AtomicU64::new(0));

    let start = Instant::now();
    let workers: Vec<_> = (0..appenders)
        .map(|worker| {
            let component = component.clone();
            let failures = Arc::clone(&failures);
            thread::spawn(move || {
                let labels = Labels::metric("bench_metric", [("worker", worker.to_string())]);
                let mut remaining = samples;
                while remaining > 0 {
                    let n = remaining.min(batch);
                    remaining -= n;

                    let now_ms = unix_millis(SystemTime::now());
                    let mut app = component.new_appender();
                    let Ok(series) = app.add(&labels, now_ms, 0.0) else {
                        failures.fetch_add(1, Ordering::Relaxed);
                        continue;
                    };
                    for i in 1..n {
                        let ts = now_ms.saturating_sub(i64::try_from(i).unwrap_or(i64::MAX));
                        if app.add_fast(series, ts, i as f64).is_err() {
                            failures.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    if app.commit().is_err() {
                        failures.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    for worker in workers {
        worker
            .join()
            .map_err(|_| "benchmark worker panicked")?;
    }
    let elapsed = start.elapsed();

    let stats = component.stats();
    component.close()?;

    let total = stats.samples_written;
    let ns_per_sample = elapsed.as_nanos() as f64 / total.max(1) as f64;
    let samples_per_sec = total as f64 / elapsed.as_secs_f64().max(f64::EPSILON);

    println!("Results:");
    println!("  Commits: {}", stats.commits);
    println!("  Samples written: {total}");
    println!("  Dropped as stale: {}", stats.samples_dropped_stale);
    println!("  Errors: {}", failures.load(Ordering::Relaxed));
    println!("  Elapsed: {elapsed:.3?}");
    println!("  Avg latency: {ns_per_sample:.1} ns/sample");
    println!("  Throughput: {samples_per_sec:.0} samples/sec");
    println!(
        "  Disk usage: {}",
        format_bytes(dir_size(temp_dir.path()).unwrap_or_default())
    );

    Ok(())
}

/// Formats a byte count as a human-readable string.
#[allow(clippy::cast_precision_loss)] // Byte counts are display-only
fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_048_576 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}

/// Recursively calculates directory size.
fn dir_size(path: &Path) -> Result<u64, Box<dyn std::error::Error>> {
    let mut total = 0;
    if path.is_dir() {
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                total += dir_size(&path)?;
            } else {
                total += entry.metadata()?.len();
            }
        }
    }
    Ok(total)
}
