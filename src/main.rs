use std::sync::Arc;

use rover_link::telemetry::{BatteryMonitor, Observer, TelemetryStore};
use rover_link::{Command, LinkConfig, RoverLink};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Logs the newest sample every time the store grows.
struct ConsoleObserver;

impl Observer for ConsoleObserver {
    fn update(&self, store: &TelemetryStore) {
        let Some(s) = store.latest() else { return };
        tracing::info!(
            range = s.range,
            heading = s.mag,
            volts = s.voltage,
            amps = s.current,
            accel = ?(s.accel.x, s.accel.y, s.accel.z),
            gyro = ?(s.gyro.x, s.gyro.y, s.gyro.z),
            samples = store.total_samples(),
            "telemetry"
        );
    }
}

fn print_help() {
    println!("Commands:");
    for command in Command::ALL {
        println!("  {:<9} {}", command.token(), command.label());
    }
    println!("  {:<9} {}", "stats", "Show link statistics");
    println!("  {:<9} {}", "battery", "Show power draw and remaining energy");
    println!("  {:<9} {}", "help", "Show this list");
    println!("  {:<9} {}", "quit", "Stop the console");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Setup Logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // 2. Configuration: optional JSON file as the only argument
    let config = match std::env::args().nth(1) {
        Some(path) => LinkConfig::from_file(&path)?,
        None => LinkConfig::default(),
    };
    tracing::info!(vehicle = %config.vehicle_host, port = config.vehicle_port, "Starting rover console...");

    // 3. Connect
    let link = RoverLink::connect(config).await?;
    let battery = Arc::new(BatteryMonitor::new());
    link.register_listener([
        Arc::new(ConsoleObserver) as Arc<dyn Observer>,
        battery.clone() as Arc<dyn Observer>,
    ]);
    print_help();

    // 4. Operator input loop
    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted.");
                break;
            }
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!("Failed to read input: {}", e);
                        break;
                    }
                };
                let token = line.trim();
                match token {
                    "" => continue,
                    "quit" | "exit" => break,
                    "help" => print_help(),
                    "stats" => println!("{}", serde_json::to_string_pretty(&link.stats())?),
                    "battery" => println!("{}", serde_json::to_string_pretty(&battery.status())?),
                    _ => match Command::from_token(token) {
                        Some(command) => {
                            println!("Sending Command: {}", command.label());
                            if let Err(e) = link.transmit(command) {
                                println!("{e}");
                            }
                        }
                        None => println!("Unknown command '{token}', type 'help'"),
                    },
                }
            }
        }
    }

    link.shutdown().await;
    Ok(())
}
