// Differential drive controller: two motor units, a bounded command queue and
// the fixed-period control loop.
//
// Producers push `DriveCommand`s through a `DriveHandle`; the loop drains the
// queue with a bounded wait, maps each command through the kinematics, and
// advances both ramp state machines every period whether or not a command
// arrived. Ramping therefore continues at a steady cadence even when input
// goes quiet.

use std::time::Instant;

use tokio::sync::{mpsc, watch};
use tokio::time::{interval, timeout};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, DriveConfig, MotorConfig};
use crate::messages::{DriveCommand, DriveTelemetry};
use crate::motor::{compute, MotorUnit, PwmOutput};

/// Backpressure signal from `send_command`. The command was dropped, not
/// queued; the producer decides when to try again.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("command queue full, command dropped")]
    QueueFull,

    #[error("drive controller has shut down")]
    Closed,
}

/// Producer-side handle: enqueue commands, observe telemetry. Cheap to clone;
/// any task may hold one.
#[derive(Debug, Clone)]
pub struct DriveHandle {
    tx: mpsc::Sender<DriveCommand>,
    telemetry: watch::Receiver<DriveTelemetry>,
}

impl DriveHandle {
    /// Enqueue a drive command without blocking. A full queue drops the
    /// command and reports it; nothing already queued is evicted.
    pub fn send_command(&self, cmd: DriveCommand) -> Result<(), SendError> {
        self.tx.try_send(cmd).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SendError::Closed,
        })
    }

    /// Latest per-motor state published by the control loop.
    pub fn telemetry(&self) -> DriveTelemetry {
        self.telemetry.borrow().clone()
    }

    /// Watch half for tasks that want to await telemetry updates.
    pub fn telemetry_watch(&self) -> watch::Receiver<DriveTelemetry> {
        self.telemetry.clone()
    }
}

/// The controller. Owns both motors and the hardware collaborator; all motor
/// state is mutated exclusively by `run`'s task.
pub struct DifferentialDrive<P: PwmOutput> {
    config: DriveConfig,
    left: MotorUnit,
    right: MotorUnit,
    pwm: P,
    rx: mpsc::Receiver<DriveCommand>,
    telemetry_tx: watch::Sender<DriveTelemetry>,
    stopped: bool,
}

impl<P: PwmOutput> DifferentialDrive<P> {
    /// Validate configuration, construct both motor units and park the
    /// hardware outputs. Invalid configuration fails construction; it is
    /// never patched up.
    pub fn new(
        config: DriveConfig,
        left_config: MotorConfig,
        right_config: MotorConfig,
        mut pwm: P,
    ) -> Result<(Self, DriveHandle), ConfigError> {
        config.validate()?;

        let mut left = MotorUnit::new(left_config)?;
        let mut right = MotorUnit::new(right_config)?;

        if let Err(e) = left.initialize(&mut pwm) {
            warn!("failed to park left motor output: {}", e);
        }
        if let Err(e) = right.initialize(&mut pwm) {
            warn!("failed to park right motor output: {}", e);
        }

        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let (telemetry_tx, telemetry_rx) = watch::channel(DriveTelemetry::default());

        info!(
            "differential drive ready: max_input={}, queue depth {}, tick {:?}",
            config.max_input, config.queue_capacity, config.tick_period
        );

        Ok((
            Self {
                config,
                left,
                right,
                pwm,
                rx,
                telemetry_tx,
                stopped: false,
            },
            DriveHandle {
                tx,
                telemetry: telemetry_rx,
            },
        ))
    }

    /// The control loop. Runs until every `DriveHandle` is dropped, then
    /// emergency-stops both motors before returning.
    pub async fn run(mut self) {
        let mut tick = interval(self.config.tick_period);

        loop {
            tick.tick().await;

            // Bounded wait for a command; a timeout is not an error, the
            // motors keep ramping toward their last targets
            match timeout(self.config.recv_timeout, self.rx.recv()).await {
                Ok(Some(cmd)) => self.apply_command(cmd),
                Ok(None) => {
                    info!("all command producers gone, shutting down drive loop");
                    break;
                }
                Err(_) => {}
            }

            self.tick_motors(Instant::now());
            self.publish_telemetry();
        }

        self.emergency_stop();
    }

    /// Map an input vector to wheel targets and hand them to the motors.
    fn apply_command(&mut self, cmd: DriveCommand) {
        let (left, right) = compute(
            cmd.x,
            cmd.y,
            self.config.max_input,
            self.left.duty_limit(),
            self.right.duty_limit(),
        );

        debug!(
            "command ({}, {}) -> left {:.2}% {:?}, right {:.2}% {:?}",
            cmd.x, cmd.y, left.duty, left.direction, right.duty, right.direction
        );

        self.left.set_target(left.duty, left.direction);
        self.right.set_target(right.duty, right.direction);
    }

    /// Advance both ramp state machines. A failed hardware write is logged
    /// and retried on the next tick; it does not halt the loop.
    fn tick_motors(&mut self, now: Instant) {
        if let Err(e) = self.left.tick(now, &mut self.pwm) {
            warn!("left motor write failed: {}", e);
        }
        if let Err(e) = self.right.tick(now, &mut self.pwm) {
            warn!("right motor write failed: {}", e);
        }
    }

    fn publish_telemetry(&self) {
        // Receivers may all be gone; telemetry is best-effort
        let _ = self.telemetry_tx.send(DriveTelemetry {
            left: self.left.snapshot(),
            right: self.right.snapshot(),
        });
    }

    /// Synchronously stop both motors, bypassing the ramp.
    pub fn emergency_stop(&mut self) {
        if let Err(e) = self.left.emergency_stop(&mut self.pwm) {
            warn!("left motor emergency stop failed: {}", e);
        }
        if let Err(e) = self.right.emergency_stop(&mut self.pwm) {
            warn!("right motor emergency stop failed: {}", e);
        }
        self.stopped = true;
        info!("drive motors stopped");
    }
}

impl<P: PwmOutput> Drop for DifferentialDrive<P> {
    fn drop(&mut self) {
        // Park the motors even if the loop never ran or unwound early
        if !self.stopped {
            self.emergency_stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::*;
    use crate::config::default_motor_configs;
    use crate::motor::{Direction, PwmError};

    /// Shared recording collaborator: the test keeps one handle while the
    /// controller owns the other.
    #[derive(Debug, Clone, Default)]
    struct SharedPwm {
        writes: Arc<Mutex<Vec<(u8, f32)>>>,
    }

    impl PwmOutput for SharedPwm {
        fn write_pwm(&mut self, channel: u8, duty_percent: f32) -> Result<(), PwmError> {
            self.writes.lock().unwrap().push((channel, duty_percent));
            Ok(())
        }

        fn write_direction(&mut self, _gpio: u8, _level: bool) -> Result<(), PwmError> {
            Ok(())
        }
    }

    fn test_drive(
        queue_capacity: usize,
        pwm: SharedPwm,
    ) -> (DifferentialDrive<SharedPwm>, DriveHandle) {
        let config = DriveConfig {
            queue_capacity,
            ..DriveConfig::default()
        };
        let (left, right) = default_motor_configs();
        DifferentialDrive::new(config, left, right, pwm).unwrap()
    }

    #[tokio::test]
    async fn full_queue_drops_command_and_keeps_first() {
        let (mut drive, handle) = test_drive(1, SharedPwm::default());

        handle.send_command(DriveCommand { x: 0, y: 512 }).unwrap();
        let err = handle
            .send_command(DriveCommand { x: 512, y: 0 })
            .unwrap_err();
        assert!(matches!(err, SendError::QueueFull));

        // The surviving command is the first one: straight forward
        let cmd = drive.rx.recv().await.unwrap();
        assert_eq!((cmd.x, cmd.y), (0, 512));
        drive.apply_command(cmd);
        let snap = drive.left.snapshot();
        assert_eq!(snap.target_direction, Direction::Forward);
    }

    #[tokio::test]
    async fn commands_are_consumed_in_fifo_order() {
        let (mut drive, handle) = test_drive(4, SharedPwm::default());

        for y in [100, 200, 300] {
            handle.send_command(DriveCommand { x: 0, y }).unwrap();
        }
        for expected in [100, 200, 300] {
            assert_eq!(drive.rx.recv().await.unwrap().y, expected);
        }
    }

    #[tokio::test]
    async fn large_target_settles_in_predicted_tick_count() {
        let pwm = SharedPwm::default();
        let (mut drive, _handle) = test_drive(1, pwm.clone());

        // Full forward: both wheels target their 50% duty limit
        drive.apply_command(DriveCommand { x: 0, y: 512 });

        // ramp 10/step -> ceil(50/10) = 5 eligible ticks to settle
        let interval = drive.left.config().ramp_interval;
        let start = Instant::now();
        for i in 1..=5u32 {
            drive.tick_motors(start + interval * i);
        }
        assert_eq!(drive.left.snapshot().current_duty, 50.0);
        assert_eq!(drive.right.snapshot().current_duty, 50.0);

        // Settled: further ticks produce no hardware writes
        let writes_before = pwm.writes.lock().unwrap().len();
        for i in 6..=10u32 {
            drive.tick_motors(start + interval * i);
        }
        assert_eq!(pwm.writes.lock().unwrap().len(), writes_before);
    }

    #[tokio::test]
    async fn loop_exits_and_stops_motors_when_producers_drop() {
        let pwm = SharedPwm::default();
        let (drive, handle) = test_drive(2, pwm.clone());

        handle.send_command(DriveCommand { x: 0, y: 512 }).unwrap();
        let task = tokio::spawn(drive.run());

        // A couple of loop periods, then drop the only producer
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(handle);

        task.await.unwrap();

        // Teardown parked both channels at zero duty
        let writes = pwm.writes.lock().unwrap();
        let last_left = writes.iter().rev().find(|(ch, _)| *ch == 0).unwrap();
        let last_right = writes.iter().rev().find(|(ch, _)| *ch == 1).unwrap();
        assert_eq!(last_left.1, 0.0);
        assert_eq!(last_right.1, 0.0);
    }

    #[tokio::test]
    async fn telemetry_reflects_targets_after_command() {
        let (mut drive, handle) = test_drive(1, SharedPwm::default());

        drive.apply_command(DriveCommand { x: 512, y: 0 });
        drive.publish_telemetry();

        let telemetry = handle.telemetry();
        assert_eq!(telemetry.left.target_direction, Direction::Forward);
        assert_eq!(telemetry.right.target_direction, Direction::Backward);
        assert_eq!(telemetry.left.target_duty, 50.0);
        assert_eq!(telemetry.right.target_duty, 50.0);
    }

    #[test]
    fn invalid_config_fails_construction() {
        let (left, right) = default_motor_configs();
        let config = DriveConfig {
            max_input: -1,
            ..DriveConfig::default()
        };
        assert!(DifferentialDrive::new(config, left, right, SharedPwm::default()).is_err());
    }
}
