// Message types crossing the runtime boundary.

use serde::{Deserialize, Serialize};

use crate::motor::MotorSnapshot;

// Command from teleop/scripts -> controller.
// x: negative = left, positive = right. y: negative = backward, positive =
// forward. Both in [-max_input, max_input]; out-of-range values are clamped
// by the kinematics, not rejected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DriveCommand {
    pub x: i16,
    pub y: i16,
}

/// Per-motor state published by the control loop each cycle. Read-only
/// diagnostics for logging and remote monitoring.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriveTelemetry {
    pub left: MotorSnapshot,
    pub right: MotorSnapshot,
}
