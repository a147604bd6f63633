use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pidbot_drivetrain::config::{CMD_TIMEOUT, LOOP_HZ};
use pidbot_drivetrain::runtime::{self, RuntimeOptions};

/// Simulated drivetrain node: tank commands in, distance and heading out
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Control loop rate in Hz (1 to 1000)
    #[arg(long, default_value_t = LOOP_HZ, value_parser = clap::value_parser!(u64).range(1..=1000))]
    loop_hz: u64,

    /// Stop the drivetrain when no command arrives within this window
    #[arg(long, default_value_t = CMD_TIMEOUT.as_millis() as u64)]
    cmd_timeout_ms: u64,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let args = Args::parse();
    let options = RuntimeOptions {
        loop_hz: args.loop_hz,
        cmd_timeout: Duration::from_millis(args.cmd_timeout_ms),
    };

    if let Err(e) = runtime::run(options).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
