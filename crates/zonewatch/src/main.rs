//! Zonewatch
//!
//! Runs the zone simulation and prints the dashboard read models as text.
//! Intents are read from stdin, one per line.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use zonewatch::{DashboardSnapshot, SimulationConfig, UserIntent, ZoneSimulationService};
use zonewatch_runtime::{ServiceHandle, ServiceManager};

/// Simulated HVAC zone dashboard
#[derive(Parser, Debug)]
#[command(name = "zonewatch")]
#[command(about = "Simulated HVAC zone dashboard", long_about = None)]
struct Args {
    /// Path to a TOML simulation config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of zones (overrides the config file)
    #[arg(long)]
    zones: Option<usize>,

    /// Milliseconds between ticks (overrides the config file)
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Exit after this many ticks (at least 1)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    ticks: Option<u64>,

    /// Initial filter text
    #[arg(long)]
    filter: Option<String>,

    /// Don't read intents from stdin
    #[arg(long)]
    no_input: bool,
}

fn main() -> Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("zonewatch=info,zonewatch_runtime=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    info!("Starting zonewatch v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path).await?,
        None => SimulationConfig::default(),
    };
    if let Some(zones) = args.zones {
        config.zone_count = zones;
    }
    if let Some(interval_ms) = args.interval_ms {
        config.tick_interval_ms = interval_ms;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }

    // Configuration errors stop us here, before anything is spawned
    let service = ZoneSimulationService::new(config)?;
    let mut snapshots = service.subscribe();

    let manager = ServiceManager::new_shared();
    let handle = manager.spawn(service).await?;

    if let Some(filter) = args.filter {
        handle
            .send_event(UserIntent::SetFilter(filter).to_event("cli"))
            .await?;
    }

    let (quit_tx, mut quit_rx) = mpsc::channel::<()>(1);
    if !args.no_input {
        tokio::spawn(forward_stdin(handle.clone(), quit_tx));
    }

    render(&snapshots.borrow_and_update());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            Some(()) = quit_rx.recv() => {
                break;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                render(&snapshot);

                if args.ticks.is_some_and(|limit| snapshot.zones.generation() >= limit) {
                    info!(ticks = snapshot.zones.generation(), "Tick limit reached");
                    break;
                }
            }
        }
    }

    for (service_id, state) in manager.list() {
        info!(service_id = %service_id, %state, "Stopping service");
    }
    manager.shutdown_all().await?;
    Ok(())
}

/// Read intents from stdin and forward them to the simulation
async fn forward_stdin(handle: ServiceHandle, quit_tx: mpsc::Sender<()>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read stdin: {}", e);
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("q") {
            let _ = quit_tx.send(()).await;
            return;
        }

        match line.parse::<UserIntent>() {
            Ok(intent) => {
                if let Err(e) = handle.send_event(intent.to_event("stdin")).await {
                    warn!("Simulation is no longer accepting input: {}", e);
                    return;
                }
            }
            Err(e) => warn!("{} (try: filter <text>, select <id>, clear, esc, quit)", e),
        }
    }
}

fn render(snapshot: &DashboardSnapshot) {
    let summary = snapshot.summary();
    let filter = if snapshot.filter.trim().is_empty() {
        String::new()
    } else {
        format!(" matching \"{}\"", snapshot.filter.trim())
    };

    println!(
        "[tick {} @ {}] {} zones, {} shown{}, {} need maintenance, {} degraded, mean {:.1}°C / {:.1}%",
        snapshot.zones.generation(),
        snapshot.updated_at.format("%H:%M:%S"),
        summary.total,
        summary.shown,
        filter,
        summary.alerting,
        summary.degraded,
        summary.mean_temperature,
        summary.mean_performance,
    );

    for alert in snapshot.alerts() {
        println!("  ! {}", alert.message);
    }

    if let Some(zone) = snapshot.selected() {
        println!(
            "  > {} ({}): {:.1}°C {:?}, HVAC {:.1}% {:?}{}",
            zone.name,
            zone.room,
            zone.temperature,
            zone.temperature_band(),
            zone.performance,
            zone.performance_band(),
            if zone.needs_maintenance() { " - needs maintenance" } else { "" },
        );
    }
}
