// Differential-drive control runtime for the turret vehicle.
//
// Converts two-axis operator input into ramped PWM/direction commands for the
// two wheel motors. Producers (teleop, network bridges, test harnesses) push
// `DriveCommand`s through a bounded queue; a fixed-period control loop drains
// the queue, runs the skid-steer kinematics and advances each motor's ramp
// state machine toward its target.

pub mod config;
pub mod drive;
pub mod messages;
pub mod motor;
pub mod runtime;
