// Skid-steer kinematics for the two-wheel drive base.
// Converts a 2-D stick vector (x, y) to per-wheel duty and direction.
//
// Two regimes: with no forward/backward component the base pivots in place
// (wheels opposed at equal duty); otherwise it translates, slowing the inner
// wheel by the turn factor and, past the sharp-turn threshold, reversing the
// inner wheel for a pivot-assisted turn.

/// Input magnitude below which an axis is treated as zero (stick drift)
const DEADBAND: f32 = 0.20;

/// Turn factor above which the inner wheel reverses instead of slowing
const SHARP_TURN_THRESHOLD: f32 = 0.7;

/// Duty scale for the reversed inner wheel during a sharp turn
const SHARP_TURN_REVERSE_SCALE: f32 = 50.0;

/// Wheel rotation sense. `Stop` always pairs with zero duty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Backward,
    #[default]
    Stop,
}

impl Direction {
    /// Opposite rotation sense. `Stop` has none.
    pub fn inverted(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
            Direction::Stop => Direction::Stop,
        }
    }
}

/// Duty/direction target for one wheel, already scaled into that side's
/// configured duty ceiling. Consumed immediately by the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelTarget {
    pub duty: f32,
    pub direction: Direction,
}

impl WheelTarget {
    fn stopped() -> Self {
        Self {
            duty: 0.0,
            direction: Direction::Stop,
        }
    }
}

/// Map stick input to (left, right) wheel targets.
///
/// `x`, `y` are clamped into `[-max_input, max_input]`; `max_input` must be
/// positive (validated at construction). `left_limit`/`right_limit` are the
/// per-side absolute duty ceilings the 0-100 result is scaled into.
pub fn compute(
    x: i16,
    y: i16,
    max_input: i16,
    left_limit: f32,
    right_limit: f32,
) -> (WheelTarget, WheelTarget) {
    // Stop short-circuits everything else
    if x == 0 && y == 0 {
        return (WheelTarget::stopped(), WheelTarget::stopped());
    }

    // Normalize to [-1, 1]
    let mut h = (x as f32 / max_input as f32).clamp(-1.0, 1.0);
    let mut v = (y as f32 / max_input as f32).clamp(-1.0, 1.0);

    // Per-axis deadband against stick drift
    if h.abs() < DEADBAND {
        h = 0.0;
    }
    if v.abs() < DEADBAND {
        v = 0.0;
    }

    let mut left;
    let mut right;
    let left_dir;
    let right_dir;

    if v == 0.0 {
        // No translation component: rotate in place, wheels opposed
        left = h.abs() * 100.0;
        right = h.abs() * 100.0;

        if h > 0.0 {
            // Turning right (clockwise)
            left_dir = Direction::Forward;
            right_dir = Direction::Backward;
        } else if h < 0.0 {
            // Turning left (counter-clockwise)
            left_dir = Direction::Backward;
            right_dir = Direction::Forward;
        } else {
            // Both axes inside the deadband
            left = 0.0;
            right = 0.0;
            left_dir = Direction::Stop;
            right_dir = Direction::Stop;
        }
    } else {
        // Base direction from the vertical axis
        let base_dir = if v > 0.0 {
            Direction::Forward
        } else {
            Direction::Backward
        };
        let base_speed = v.abs();

        if h != 0.0 {
            let turn_factor = h.abs();

            if h > 0.0 {
                // Turning right: slow the right wheel
                left = base_speed * 100.0;
                right = base_speed * (1.0 - turn_factor) * 100.0;
                left_dir = base_dir;

                if turn_factor > SHARP_TURN_THRESHOLD {
                    // Reverse the inner wheel for a pivot-assisted turn
                    right = turn_factor * SHARP_TURN_REVERSE_SCALE;
                    right_dir = base_dir.inverted();
                } else {
                    right_dir = base_dir;
                }
            } else {
                // Turning left: slow the left wheel
                left = base_speed * (1.0 - turn_factor) * 100.0;
                right = base_speed * 100.0;
                right_dir = base_dir;

                if turn_factor > SHARP_TURN_THRESHOLD {
                    left = turn_factor * SHARP_TURN_REVERSE_SCALE;
                    left_dir = base_dir.inverted();
                } else {
                    left_dir = base_dir;
                }
            }
        } else {
            // Straight line
            left = base_speed * 100.0;
            right = base_speed * 100.0;
            left_dir = base_dir;
            right_dir = base_dir;
        }
    }

    // Clamp to [0, 100], then scale into each side's absolute ceiling
    let left = left.clamp(0.0, 100.0) / 100.0 * left_limit;
    let right = right.clamp(0.0, 100.0) / 100.0 * right_limit;

    (
        WheelTarget {
            duty: left,
            direction: left_dir,
        },
        WheelTarget {
            duty: right,
            direction: right_dir,
        },
    )
}
