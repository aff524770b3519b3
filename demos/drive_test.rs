// Drive test: careful, step-by-step bring-up for the wheel motors
//
// Usage: cargo run --example drive_test -- [port]
// Example: cargo run --example drive_test -- /dev/ttyUSB0
//
// Safety features:
// - Explicit confirmation before any writes
// - Ramped duty changes only, stepped through low duty levels first
// - Easy abort with Ctrl+C

use std::io::{self, Write};
use std::thread::sleep;
use std::time::{Duration, Instant};

use turret_drive_runtime::config::{default_motor_configs, DEFAULT_BOARD_PORT};
use turret_drive_runtime::motor::{Direction, DriveBoard, MotorUnit};

fn confirm(prompt: &str) -> bool {
    print!("{} [y/N]: ", prompt);
    io::stdout().flush().unwrap();
    let mut input = String::new();
    io::stdin().read_line(&mut input).unwrap();
    input.trim().eq_ignore_ascii_case("y")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse().unwrap()),
        )
        .init();

    // Get port from args or use default
    let port = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_BOARD_PORT.to_string());

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║             Turret Drive Test (WITH WRITES)                  ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  ⚠  This tool WILL spin the wheel motors!                    ║");
    println!("║  ⚠  Make sure wheels are OFF THE GROUND before proceeding!   ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!("Serial port: {}", port);
    println!();

    if !confirm("Are the vehicle's wheels OFF THE GROUND (chassis on blocks)?") {
        println!("Please elevate the vehicle so the wheels can spin freely.");
        return Ok(());
    }

    println!();
    println!("Opening serial port...");
    let mut board = DriveBoard::open(&port)?;
    println!("✓ Connected");
    println!();

    // ========== STEP 1: Verify communication ==========
    println!("Step 1: Pinging the motor-carrier board...");
    if !board.ping()? {
        println!("  ✗ Board not responding - aborting");
        return Ok(());
    }
    println!("  ✓ Board responding");
    println!();

    // ========== STEP 2: Configure channels ==========
    let (left_config, right_config) = default_motor_configs();

    println!("Step 2: Configuring PWM channels...");
    board.set_frequency(left_config.pwm_channel, left_config.pwm_frequency_hz)?;
    board.set_frequency(right_config.pwm_channel, right_config.pwm_frequency_hz)?;
    println!(
        "  ✓ Channels {} and {} at {} Hz",
        left_config.pwm_channel, right_config.pwm_channel, left_config.pwm_frequency_hz
    );
    println!();

    let ramp_interval = left_config.ramp_interval;
    let mut left = MotorUnit::new(left_config)?;
    let mut right = MotorUnit::new(right_config)?;
    left.initialize(&mut board)?;
    right.initialize(&mut board)?;

    // ========== STEP 3: Ramped duty steps ==========
    println!("Step 3: Stepping both wheels through duty levels (ramped)");
    println!("  Sequence: 0% → 30% → 60% → 90% → 0%, forward");
    println!();
    println!("  ⚠  WATCH THE WHEELS - they should spin up and down smoothly!");
    println!("  ⚠  Press Ctrl+C at any time to abort!");
    println!();

    if !confirm("Proceed with the duty step test?") {
        stop_motors(&mut left, &mut right, &mut board)?;
        return Ok(());
    }

    let steps: [f32; 5] = [0.0, 30.0, 60.0, 90.0, 0.0];
    for duty in steps {
        println!("  Target {:.0}% forward on both wheels...", duty);
        left.set_target(duty, Direction::Forward);
        right.set_target(duty, Direction::Forward);

        run_ramp(&mut left, &mut right, &mut board, 20, ramp_interval)?;

        let l = left.snapshot();
        let r = right.snapshot();
        println!(
            "    LEFT: duty {:.2} | RIGHT: duty {:.2}",
            l.current_duty, r.current_duty
        );
        sleep(Duration::from_millis(500));
    }

    // ========== STEP 4: Direction change under ramp ==========
    println!();
    println!("Step 4: Direction reversal (duty ramps down before the flip)");
    if confirm("Spin both wheels 40% forward, then reverse to 40% backward?") {
        left.set_target(40.0, Direction::Forward);
        right.set_target(40.0, Direction::Forward);
        run_ramp(&mut left, &mut right, &mut board, 20, ramp_interval)?;

        left.set_target(40.0, Direction::Backward);
        right.set_target(40.0, Direction::Backward);
        run_ramp(&mut left, &mut right, &mut board, 30, ramp_interval)?;
        println!("  ✓ Reversal complete");
    }

    // ========== FINAL: Stop and cleanup ==========
    println!();
    println!("Step 5: Stopping motors...");
    stop_motors(&mut left, &mut right, &mut board)?;
    println!("  ✓ Motors stopped");

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                    Test Complete!                            ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!("If the wheels ramped as expected, the drive control is working.");
    println!("You can now try the full runtime with: cargo run");

    Ok(())
}

/// Tick both units at the ramp interval for a bounded number of steps.
fn run_ramp(
    left: &mut MotorUnit,
    right: &mut MotorUnit,
    board: &mut DriveBoard,
    max_steps: u32,
    interval: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    for _ in 0..max_steps {
        let now = Instant::now();
        left.tick(now, board)?;
        right.tick(now, board)?;
        sleep(interval);
    }
    Ok(())
}

fn stop_motors(
    left: &mut MotorUnit,
    right: &mut MotorUnit,
    board: &mut DriveBoard,
) -> Result<(), Box<dyn std::error::Error>> {
    left.emergency_stop(board)?;
    right.emergency_stop(board)?;
    Ok(())
}
