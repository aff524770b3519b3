// Tunables, topics and per-motor hardware descriptors.

use std::time::Duration;

// Control loop frequency
pub const LOOP_HZ: u64 = 50;

// Zenoh topics
pub const TOPIC_CMD_DRIVE: &str = "turret/cmd/drive"; // commands
pub const TOPIC_RT_DRIVE: &str = "turret/rt/drive"; // telemetry

// Serial port for the motor-carrier board
pub const DEFAULT_BOARD_PORT: &str = "/dev/ttyUSB0";

/// Rejected configuration values. Construction fails outright; the controller
/// never runs with silently corrected ramp or limit parameters.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("motor {id}: duty limit {value} outside [0, 100]")]
    DutyLimitOutOfRange { id: String, value: f32 },

    #[error("motor {id}: ramp rate must be positive, got {value}")]
    InvalidRampRate { id: String, value: f32 },

    #[error("motor {id}: direction hysteresis {value} outside [0, 100]")]
    HysteresisOutOfRange { id: String, value: f32 },

    #[error("motor {id}: PWM frequency must be non-zero")]
    ZeroPwmFrequency { id: String },

    #[error("max input must be positive, got {value}")]
    NonPositiveMaxInput { value: i16 },

    #[error("command queue capacity must be non-zero")]
    ZeroQueueCapacity,

    #[error("control loop tick period must be non-zero")]
    ZeroTickPeriod,
}

/// Immutable hardware and ramp tuning for one wheel motor.
#[derive(Debug, Clone)]
pub struct MotorConfig {
    /// Instance label used in logs and telemetry
    pub id: String,
    /// PWM channel on the motor-carrier board
    pub pwm_channel: u8,
    /// Direction GPIO on the motor-carrier board
    pub dir_gpio: u8,
    pub pwm_frequency_hz: u32,
    /// Duty-percent change allowed per ramp step
    pub ramp_rate: f32,
    /// Minimum time between ramp steps
    pub ramp_interval: Duration,
    /// Duty magnitude below which a direction flip is safe
    pub direction_hysteresis: f32,
    /// Hard ceiling on commanded duty, 0-100
    pub duty_limit: f32,
}

impl MotorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=100.0).contains(&self.duty_limit) {
            return Err(ConfigError::DutyLimitOutOfRange {
                id: self.id.clone(),
                value: self.duty_limit,
            });
        }
        if self.ramp_rate <= 0.0 {
            return Err(ConfigError::InvalidRampRate {
                id: self.id.clone(),
                value: self.ramp_rate,
            });
        }
        if !(0.0..=100.0).contains(&self.direction_hysteresis) {
            return Err(ConfigError::HysteresisOutOfRange {
                id: self.id.clone(),
                value: self.direction_hysteresis,
            });
        }
        if self.pwm_frequency_hz == 0 {
            return Err(ConfigError::ZeroPwmFrequency {
                id: self.id.clone(),
            });
        }
        Ok(())
    }
}

/// Controller-level configuration: input range, queue depth and loop timing.
#[derive(Debug, Clone)]
pub struct DriveConfig {
    /// Symmetric input range, inputs live in [-max_input, max_input]
    pub max_input: i16,
    /// Bounded command queue depth
    pub queue_capacity: usize,
    /// How long the loop blocks waiting for a command each cycle
    pub recv_timeout: Duration,
    /// Fixed control loop period
    pub tick_period: Duration,
}

impl DriveConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_input <= 0 {
            return Err(ConfigError::NonPositiveMaxInput {
                value: self.max_input,
            });
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        if self.tick_period.is_zero() {
            return Err(ConfigError::ZeroTickPeriod);
        }
        Ok(())
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            max_input: 512,
            queue_capacity: 8,
            recv_timeout: Duration::from_millis(10),
            tick_period: Duration::from_millis(1000 / LOOP_HZ),
        }
    }
}

/// Wheel tunings matching the vehicle's gearing. Left wheel on board channel
/// 0, right on channel 1.
pub fn default_motor_configs() -> (MotorConfig, MotorConfig) {
    let left = MotorConfig {
        id: "left".to_string(),
        pwm_channel: 0,
        dir_gpio: 0,
        pwm_frequency_hz: 20_000,
        ramp_rate: 10.0,
        ramp_interval: Duration::from_millis(50),
        direction_hysteresis: 5.0,
        duty_limit: 50.0,
    };
    let right = MotorConfig {
        id: "right".to_string(),
        pwm_channel: 1,
        dir_gpio: 1,
        ..left.clone()
    };
    (left, right)
}
