// Hardware collaborator boundary: PWM duty and direction-GPIO writes.
//
// The control loop assumes these calls are synchronous and non-blocking. A
// failed write is reported upward, logged, and retried naturally on the next
// tick; persistent faults are the carrier board's problem (fault pin), not
// this core's.

use tracing::debug;

/// Errors surfaced by a PWM/GPIO collaborator.
#[derive(Debug, thiserror::Error)]
pub enum PwmError {
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid response from board: {reason}")]
    InvalidResponse { reason: String },

    #[error("checksum mismatch in board response")]
    ChecksumMismatch,

    #[error("board rejected command, status 0x{status:02X}")]
    Rejected { status: u8 },

    #[error("timeout waiting for board response")]
    Timeout,
}

/// Outbound interface to the motor-carrier hardware.
pub trait PwmOutput {
    /// Set the duty cycle (0-100 percent) on a PWM channel.
    fn write_pwm(&mut self, channel: u8, duty_percent: f32) -> Result<(), PwmError>;

    /// Drive a direction GPIO high or low.
    fn write_direction(&mut self, gpio: u8, level: bool) -> Result<(), PwmError>;
}

/// No-hardware collaborator for simulation and dry runs: accepts every write
/// and traces it.
#[derive(Debug, Default)]
pub struct SimPwm;

impl PwmOutput for SimPwm {
    fn write_pwm(&mut self, channel: u8, duty_percent: f32) -> Result<(), PwmError> {
        debug!("sim: pwm channel {} <- {:.2}%", channel, duty_percent);
        Ok(())
    }

    fn write_direction(&mut self, gpio: u8, level: bool) -> Result<(), PwmError> {
        debug!("sim: dir gpio {} <- {}", gpio, level);
        Ok(())
    }
}
