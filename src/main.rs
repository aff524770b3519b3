use clap::Parser;
use tracing_subscriber::EnvFilter;

use turret_drive_runtime::config::DEFAULT_BOARD_PORT;
use turret_drive_runtime::runtime::{self, RuntimeOptions};

/// Differential-drive control runtime for the turret vehicle
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Serial port of the motor-carrier board
    #[arg(long, default_value = DEFAULT_BOARD_PORT)]
    port: String,

    /// Run without hardware, tracing writes instead
    #[arg(long)]
    simulate: bool,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init(); // installs the subscriber globally

    let args = Args::parse();
    let options = RuntimeOptions {
        board_port: args.port,
        simulate: args.simulate,
    };

    if let Err(e) = runtime::run(options).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
