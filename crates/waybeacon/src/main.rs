//! `waybc` - CLI for waybeacon
//!
//! This binary provides the command-line interface for running the uplink
//! service and interacting with the durable sample buffer.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::warn;

use waybeacon::cli::{BufferCommand, Cli, Command, ConfigCommand, RecordCommand};
use waybeacon::store::{keys, KvStore, MemoryStore, SqliteStore};
use waybeacon::{
    init_logging, Config, FlushOutcome, HttpTransport, LocationSample, RawFix, SampleBuffer,
    ServiceHandle, TelemetryUplinkClient, UplinkService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    // Execute the command
    match cli.command {
        Command::Run => handle_run(&config).await,
        Command::Status(cmd) => handle_status(&config, cmd.json),
        Command::Record(cmd) => handle_record(&config, &cmd),
        Command::Flush => handle_flush(&config).await,
        Command::Buffer(cmd) => handle_buffer(&config, &cmd),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

/// Open the configured durable store, degrading to an in-memory store if
/// the database cannot be opened. Samples recorded against the fallback are
/// lost on exit, but capture keeps working.
fn open_store(config: &Config) -> Arc<dyn KvStore> {
    match SqliteStore::open(config.store_path()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!("Store unavailable, continuing in-memory only: {e}");
            Arc::new(MemoryStore::new())
        }
    }
}

fn build_client(
    config: &Config,
    store: Arc<dyn KvStore>,
) -> anyhow::Result<Arc<TelemetryUplinkClient>> {
    let transport = Arc::new(HttpTransport::new(
        &config.uplink.base_url,
        config.request_timeout(),
    )?);
    Ok(Arc::new(TelemetryUplinkClient::new(
        store,
        transport,
        config.buffer.capacity,
    )))
}

async fn handle_run(config: &Config) -> anyhow::Result<()> {
    let store = open_store(config);
    let client = build_client(config, Arc::clone(&store))?;
    let service = UplinkService::new(client, store, config.flush_interval());
    let handle = ServiceHandle::new();

    // The binary ships no device integration; embedders hand clones of `tx`
    // to their fix sources. Standalone, `run` drains the durable buffer on
    // the flush interval.
    let (tx, rx) = mpsc::channel::<RawFix>(64);

    let loop_handle = handle.clone();
    let worker = tokio::spawn(async move { service.run(rx, loop_handle).await });

    println!("waybc running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    println!("Shutting down...");

    handle.stop();
    drop(tx);
    worker.await?;
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let store = open_store(config);
    let buffer = SampleBuffer::load(Arc::clone(&store), config.buffer.capacity);
    let active_trip = store.get(keys::ACTIVE_TRIP).ok().flatten();
    let token_present = matches!(store.get(keys::AUTH_TOKEN), Ok(Some(t)) if !t.is_empty());
    let ping_url = HttpTransport::ping_url(&config.uplink.base_url)?;

    if json {
        let status = serde_json::json!({
            "store_path": config.store_path(),
            "collector": ping_url.as_str(),
            "buffered": buffer.len(),
            "capacity": buffer.capacity(),
            "active_trip": active_trip,
            "token_present": token_present,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("waybc status");
        println!("------------");
        println!("Store:       {}", config.store_path().display());
        println!("Collector:   {ping_url}");
        println!("Buffered:    {} / {} samples", buffer.len(), buffer.capacity());
        println!(
            "Active trip: {}",
            active_trip.as_deref().unwrap_or("none")
        );
        println!(
            "Token:       {}",
            if token_present { "present" } else { "absent" }
        );
    }
    Ok(())
}

fn handle_record(config: &Config, cmd: &RecordCommand) -> anyhow::Result<()> {
    let store = open_store(config);
    let client = build_client(config, Arc::clone(&store))?;

    let trip_id = match &cmd.trip {
        Some(trip) => Some(trip.clone()),
        None => store.get(keys::ACTIVE_TRIP).ok().flatten(),
    };
    let sample = LocationSample::new(trip_id, cmd.lat, cmd.lon, cmd.accuracy, Utc::now())?;

    if client.record_sample(sample)? {
        println!("Recorded. {} samples buffered.", client.buffered_count());
    } else {
        println!("Dropped: identical to the newest buffered sample.");
    }
    Ok(())
}

async fn handle_flush(config: &Config) -> anyhow::Result<()> {
    let store = open_store(config);
    let client = build_client(config, store)?;

    match client.flush().await {
        FlushOutcome::Delivered { count } => {
            println!("Delivered {count} samples.");
            Ok(())
        }
        FlushOutcome::Skipped => {
            println!("Buffer is empty, nothing to deliver.");
            Ok(())
        }
        FlushOutcome::Failed { error } => {
            println!(
                "Delivery failed, {} samples retained.",
                client.buffered_count()
            );
            Err(waybeacon::Error::Delivery(error).into())
        }
    }
}

fn handle_buffer(config: &Config, cmd: &BufferCommand) -> anyhow::Result<()> {
    let store = open_store(config);
    let client = build_client(config, store)?;

    match cmd {
        BufferCommand::Show { json } => {
            let samples = client.buffered();
            if *json {
                println!("{}", serde_json::to_string_pretty(&samples)?);
            } else if samples.is_empty() {
                println!("Buffer is empty.");
            } else {
                println!("{} buffered samples (oldest first):", samples.len());
                for sample in &samples {
                    println!(
                        "  {}  {:>10.6}, {:>11.6}  ±{:.0}m  trip: {}",
                        sample.captured_at().to_rfc3339(),
                        sample.latitude(),
                        sample.longitude(),
                        sample.accuracy(),
                        sample.trip_id().unwrap_or("-")
                    );
                }
            }
        }
        BufferCommand::Clear { yes } => {
            if *yes {
                client.clear_buffer();
                println!("Buffer cleared.");
            } else {
                println!("This will drop every undelivered sample.");
                println!("Use --yes to confirm.");
            }
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Uplink]");
                println!("  Base URL:        {}", config.uplink.base_url);
                println!(
                    "  Request timeout: {}s",
                    config.uplink.request_timeout_secs
                );
                println!();
                println!("[Buffer]");
                println!("  Store path:      {}", config.store_path().display());
                println!("  Capacity:        {}", config.buffer.capacity);
                println!();
                println!("[Service]");
                println!(
                    "  Flush interval:  {}s",
                    config.service.flush_interval_secs
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
