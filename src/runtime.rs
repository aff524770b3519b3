// Process wiring: zenoh command/telemetry bridge around the drive controller.
//
// The controller's loop owns the motors; this loop owns the network side. It
// drains the command topic, forwards parsed commands into the bounded queue
// (dropping on backpressure, as the queue contract demands) and republishes
// the controller's telemetry snapshot each cycle.

use std::time::Duration;

use tokio::time::interval;
use tracing::{info, warn};

use crate::config::{
    default_motor_configs, DriveConfig, LOOP_HZ, TOPIC_CMD_DRIVE, TOPIC_RT_DRIVE,
};
use crate::drive::{DifferentialDrive, SendError};
use crate::messages::DriveCommand;
use crate::motor::{DriveBoard, PwmOutput, SimPwm};

/// Hardware selection for the runtime binary.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Serial port of the motor-carrier board
    pub board_port: String,
    /// Run against the tracing-only collaborator instead of real hardware
    pub simulate: bool,
}

pub async fn run(options: RuntimeOptions) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if options.simulate {
        info!("simulation mode, hardware writes are traced only");
        run_with_pwm(SimPwm).await
    } else {
        info!("opening motor-carrier board on {}", options.board_port);
        let mut board = DriveBoard::open(&options.board_port)?;
        if !board.ping()? {
            return Err("motor-carrier board not responding to ping".into());
        }

        let (left, right) = default_motor_configs();
        board.set_frequency(left.pwm_channel, left.pwm_frequency_hz)?;
        board.set_frequency(right.pwm_channel, right.pwm_frequency_hz)?;

        run_with_pwm(board).await
    }
}

async fn run_with_pwm<P>(pwm: P) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    P: PwmOutput + Send + 'static,
{
    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let subscriber = session.declare_subscriber(TOPIC_CMD_DRIVE).await?;
    let pub_telemetry = session.declare_publisher(TOPIC_RT_DRIVE).await?;

    let config = DriveConfig::default();
    let (left, right) = default_motor_configs();
    let (drive, handle) = DifferentialDrive::new(config, left, right, pwm)?;

    let drive_task = tokio::spawn(drive.run());

    let mut tick = interval(Duration::from_millis(1000 / LOOP_HZ));

    info!("Runtime started: {}Hz bridge loop", LOOP_HZ);
    info!("Subscribed to: {}", TOPIC_CMD_DRIVE);
    info!("Publishing to: {}", TOPIC_RT_DRIVE);

    loop {
        tick.tick().await;

        // 1. Drain all pending command samples (non-blocking)
        while let Ok(Some(sample)) = subscriber.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<DriveCommand>(&payload) {
                Ok(cmd) => match handle.send_command(cmd) {
                    Ok(()) => {}
                    Err(SendError::QueueFull) => {
                        // Expected backpressure: the producer retries on its
                        // own schedule
                        warn!("command queue full, dropped ({}, {})", cmd.x, cmd.y);
                    }
                    Err(SendError::Closed) => {
                        warn!("drive loop has shut down, stopping bridge");
                        drive_task.await?;
                        return Ok(());
                    }
                },
                Err(e) => {
                    warn!("Failed to parse command: {}", e);
                }
            }
        }

        // 2. Publish the latest motor telemetry
        let telemetry_json = serde_json::to_string(&handle.telemetry())?;
        pub_telemetry.put(telemetry_json).await?;
    }
}
