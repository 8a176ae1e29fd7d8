//! Example of an agent pipeline feeding an ebb component.
//!
//! This example shows how to:
//! - Open a component with a short retention window
//! - Run the maintenance loop alongside producers
//! - Commit batches that mix fresh and stale samples
//! - Shrink the retention window at runtime
//! - Read samples back and shut down cleanly
//!
//! Run with: `cargo run -p ebb --example agent_ingest`

use ebb::clock::unix_millis;
use ebb::{Component, ComponentOptions, Durability, Exports, Labels, RetentionConfig, Selector};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempfile::tempdir()?;
    println!("Data directory: {}", temp_dir.path().display());

    let options = ComponentOptions::new(temp_dir.path())
        .with_durability(Durability::Buffered)
        .on_state_change(Arc::new(|exports: Exports| {
            println!(
                "  [host] receiver published, ttl={:?}",
                exports.receiver.configuration().ttl
            );
        }));
    let component = Component::open_with(options, RetentionConfig::new(Duration::from_secs(300))?)?;

    let cancel = CancellationToken::new();
    let maintenance = {
        let component = component.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { component.run(cancel).await })
    };

    // Three scrapers committing concurrently.
    let now_ms = unix_millis(SystemTime::now());
    let mut scrapers = Vec::new();
    for host in ["web1", "web2", "db1"] {
        let component = component.clone();
        scrapers.push(tokio::task::spawn_blocking(move || {
            let mut app = component.new_appender();
            let cpu = app.add(&Labels::metric("cpu_usage", [("host", host)]), now_ms, 0.25)?;
            for i in 1..60 {
                app.add_fast(cpu, now_ms - i * 1_000, 0.25 + i as f64 / 100.0)?;
            }
            // A sample from ten minutes ago; outside the window.
            app.add_fast(cpu, now_ms - 600_000, 0.99)?;
            app.commit()
        }));
    }

    for scraper in scrapers {
        let outcome = scraper.await??;
        println!(
            "  committed {} samples, dropped {} stale, sequences {:?}",
            outcome.written, outcome.dropped, outcome.sequences
        );
    }

    // Shrink the window; the next commit judges staleness against 30s.
    component.update_configuration(RetentionConfig::new(Duration::from_secs(30))?)?;
    let mut app = component.new_appender();
    let mem = app.add(&Labels::metric("mem_rss_bytes", [("host", "web1")]), now_ms, 1.5e9)?;
    app.add_fast(mem, now_ms - 45_000, 1.4e9)?;
    let outcome = app.commit()?;
    println!("  after shrink: wrote {}, dropped {}", outcome.written, outcome.dropped);

    tokio::time::sleep(Duration::from_millis(1_200)).await;

    let result = component.query(&Selector::metric("cpu_usage"), now_ms - 10_000, now_ms)?;
    println!("\ncpu_usage over the last 10s ({} samples):", result.len());
    for sample in result {
        println!("  {} @ {} = {:.2}", sample.labels, sample.timestamp_ms, sample.value);
    }

    cancel.cancel();
    maintenance.await??;

    println!("\nStats: {}", serde_json::to_string_pretty(&component.stats())?);
    component.close()?;

    Ok(())
}
