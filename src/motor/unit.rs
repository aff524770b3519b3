// One wheel motor: hardware configuration plus ramp state.
//
// `set_target` only records what the kinematics asked for; `tick` moves the
// live duty/direction toward it, at most `ramp_rate` percent per
// `ramp_interval`. Flipping the H-bridge direction under load risks a current
// spike, so a pending direction change first ramps the duty down into the
// hysteresis band and only then toggles the direction output.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::kinematics::Direction;
use super::pwm::{PwmError, PwmOutput};
use crate::config::{ConfigError, MotorConfig};

/// Read-only state snapshot for logging and telemetry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MotorSnapshot {
    pub current_duty: f32,
    pub target_duty: f32,
    pub current_direction: Direction,
    pub target_direction: Direction,
}

#[derive(Debug)]
struct MotorState {
    current_duty: f32,
    target_duty: f32,
    current_direction: Direction,
    target_direction: Direction,
    last_update: Option<Instant>,
}

/// Ramp state machine for a single motor.
#[derive(Debug)]
pub struct MotorUnit {
    config: MotorConfig,
    state: MotorState,
}

impl MotorUnit {
    pub fn new(config: MotorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            state: MotorState {
                current_duty: 0.0,
                target_duty: 0.0,
                current_direction: Direction::Stop,
                target_direction: Direction::Stop,
                last_update: None,
            },
        })
    }

    /// Park the hardware outputs in the stopped state before the loop starts.
    pub fn initialize<P: PwmOutput>(&mut self, pwm: &mut P) -> Result<(), PwmError> {
        self.write_outputs(pwm)
    }

    pub fn config(&self) -> &MotorConfig {
        &self.config
    }

    pub fn duty_limit(&self) -> f32 {
        self.config.duty_limit
    }

    /// Record a new target. Does not touch the hardware; the next `tick`
    /// starts ramping toward it. `Stop` always carries zero duty.
    pub fn set_target(&mut self, duty: f32, direction: Direction) {
        let duty = if direction == Direction::Stop {
            0.0
        } else {
            duty.clamp(0.0, self.config.duty_limit)
        };
        self.state.target_duty = duty;
        self.state.target_direction = direction;
    }

    /// Advance the ramp by one step if `ramp_interval` has elapsed, and push
    /// any change to the hardware. A settled motor does nothing, including no
    /// hardware write.
    pub fn tick<P: PwmOutput>(&mut self, now: Instant, pwm: &mut P) -> Result<(), PwmError> {
        if let Some(last) = self.state.last_update {
            if now.duration_since(last) < self.config.ramp_interval {
                return Ok(());
            }
        }

        let state = &mut self.state;
        let rate = self.config.ramp_rate;

        if state.current_direction != state.target_direction
            && state.current_duty > self.config.direction_hysteresis
        {
            // Ramp down toward the hysteresis band before flipping
            state.current_duty = (state.current_duty - rate).max(0.0);
        } else if state.current_direction != state.target_direction {
            // Within the band: flip the direction output now, duty unchanged
            state.current_direction = state.target_direction;
            if state.current_direction == Direction::Stop {
                state.current_duty = 0.0;
            }
        } else if state.current_duty < state.target_duty {
            state.current_duty = (state.current_duty + rate).min(state.target_duty);
        } else if state.current_duty > state.target_duty {
            state.current_duty = (state.current_duty - rate).max(state.target_duty);
        } else {
            // Settled
            return Ok(());
        }

        state.last_update = Some(now);
        debug!(
            "motor {}: duty {:.2} -> {:.2}, dir {:?} -> {:?}",
            self.config.id,
            self.state.current_duty,
            self.state.target_duty,
            self.state.current_direction,
            self.state.target_direction
        );

        self.write_outputs(pwm)
    }

    /// Immediate synchronous stop, bypassing the ramp. Used on teardown and
    /// fault paths.
    pub fn emergency_stop<P: PwmOutput>(&mut self, pwm: &mut P) -> Result<(), PwmError> {
        self.state.current_duty = 0.0;
        self.state.target_duty = 0.0;
        self.state.current_direction = Direction::Stop;
        self.state.target_direction = Direction::Stop;
        self.write_outputs(pwm)
    }

    pub fn snapshot(&self) -> MotorSnapshot {
        MotorSnapshot {
            current_duty: self.state.current_duty,
            target_duty: self.state.target_duty,
            current_direction: self.state.current_direction,
            target_direction: self.state.target_direction,
        }
    }

    fn write_outputs<P: PwmOutput>(&mut self, pwm: &mut P) -> Result<(), PwmError> {
        match self.state.current_direction {
            Direction::Forward => pwm.write_direction(self.config.dir_gpio, true)?,
            Direction::Backward => pwm.write_direction(self.config.dir_gpio, false)?,
            // Stopped: the GPIO level is irrelevant, the duty below is zero
            Direction::Stop => {}
        }

        let duty = self.state.current_duty.clamp(0.0, self.config.duty_limit);
        pwm.write_pwm(self.config.pwm_channel, duty)
    }
}
